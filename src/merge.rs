// src/merge.rs
//
// Builds the canonical record suggested for a duplicate group. Every field is
// resolved on its own, so the suggestion can combine values contributed by
// different members:
//   1. the first verified member (input order) that has a value,
//   2. otherwise the first member that has a value,
//   3. otherwise the field stays empty.
// Values are copied verbatim from a member; nothing is synthesized.

use crate::models::{present, EntityRecord};

/// Suggests a merged record for `group`, or `None` for an empty group.
pub fn suggest_merge(group: &[EntityRecord]) -> Option<EntityRecord> {
    let primary = primary_member(group)?;
    let earliest = group.iter().min_by_key(|r| r.created_at)?;

    let name = pick(group, |r| r.has_name())
        .map(|r| r.name.clone())
        .unwrap_or_else(|| primary.name.clone());

    Some(EntityRecord {
        id: primary.id.clone(),
        name,
        category: pick_text(group, |r| &r.category),
        address: pick_text(group, |r| &r.address),
        city: pick_text(group, |r| &r.city),
        state: pick_text(group, |r| &r.state),
        coordinates: primary.coordinates,
        phone: pick_text(group, |r| &r.phone),
        email: pick_text(group, |r| &r.email),
        website: pick_text(group, |r| &r.website),
        is_verified: group.iter().any(|r| r.is_verified),
        created_at: earliest.created_at,
    })
}

/// The member whose identity survives a merge: the first verified member,
/// else the first member.
pub fn primary_member(group: &[EntityRecord]) -> Option<&EntityRecord> {
    group
        .iter()
        .find(|r| r.is_verified)
        .or_else(|| group.first())
}

fn pick<F>(group: &[EntityRecord], has_value: F) -> Option<&EntityRecord>
where
    F: Fn(&EntityRecord) -> bool,
{
    group
        .iter()
        .find(|r| r.is_verified && has_value(r))
        .or_else(|| group.iter().find(|r| has_value(r)))
}

fn pick_text<F>(group: &[EntityRecord], field: F) -> Option<String>
where
    F: Fn(&EntityRecord) -> &Option<String>,
{
    pick(group, |r| present(field(r)).is_some()).and_then(|r| field(r).clone())
}
