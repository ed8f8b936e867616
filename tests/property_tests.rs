// tests/property_tests.rs

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use geodedupe_lib::{models::present, DeduplicationPipeline, EntityRecord, SimilarityScorer};

const NAMES: &[&str] = &[
    "Igreja Batista Central",
    "igreja batista central",
    "IGREJA BATISTA CENTRAL",
    "Igreja Batista Centro",
    "Paróquia São José",
    "Paroquia Sao Jose",
    "Congregação Cristã no Brasil",
    "Assembleia de Deus",
    "Assembléia de Deus Ministério Belém",
];

const ADDRESSES: &[&str] = &[
    "Rua das Flores, 10",
    "R. das Flores 10",
    "Av. Paulista, 1000",
    "Avenida Paulista 1000 Sala 3",
    "   ",
];

const CITIES: &[&str] = &["São Paulo", "sao paulo", "Campinas"];

const CATEGORIES: &[&str] = &["Batista", "Católica", "Pentecostal"];

// A handful of fixed spots, two of them close enough to share cells
const SPOTS: &[(f64, f64)] = &[
    (-23.5614, -46.6559),
    (-23.5614, -46.6559),
    (-23.5617, -46.6561),
    (-22.9056, -47.0608),
];

fn record_strategy() -> impl Strategy<Value = EntityRecord> {
    (
        prop::sample::select(NAMES),
        prop::option::of(prop::sample::select(ADDRESSES)),
        prop::option::of(prop::sample::select(CITIES)),
        prop::option::of(prop::sample::select(CATEGORIES)),
        prop::option::of("[0-9]{4}-[0-9]{4}"),
        any::<bool>(),
        0..SPOTS.len(),
        0i64..10_000,
    )
        .prop_map(
            |(name, address, city, category, phone, is_verified, spot, age)| {
                let (lat, lon) = SPOTS[spot];
                let mut r = EntityRecord::new("", name, lat, lon);
                r.address = address.map(str::to_string);
                r.city = city.map(str::to_string);
                r.category = category.map(str::to_string);
                r.phone = phone;
                r.is_verified = is_verified;
                r.created_at = Utc.timestamp_opt(1_600_000_000 + age * 60, 0).unwrap();
                r
            },
        )
}

fn records_strategy() -> impl Strategy<Value = Vec<EntityRecord>> {
    prop::collection::vec(record_strategy(), 0..24).prop_map(|mut records| {
        for (i, r) in records.iter_mut().enumerate() {
            r.id = format!("rec-{}", i).as_str().into();
        }
        records
    })
}

fn from_some_member<'a, F>(value: &Option<String>, members: &'a [EntityRecord], field: F) -> bool
where
    F: Fn(&'a EntityRecord) -> &'a Option<String>,
{
    match value {
        None => members.iter().all(|m| present(field(m)).is_none()),
        Some(v) => members.iter().any(|m| field(m).as_deref() == Some(v.as_str())),
    }
}

proptest! {
    #[test]
    fn prop_score_is_symmetric(a in record_strategy(), b in record_strategy()) {
        let scorer = SimilarityScorer::default();
        prop_assert_eq!(scorer.score(&a, &b), scorer.score(&b, &a));
    }

    #[test]
    fn prop_score_is_bounded_and_reflexive(a in record_strategy(), b in record_strategy()) {
        let scorer = SimilarityScorer::default();
        let s = scorer.score(&a, &b);
        prop_assert!((0.0..=1.0).contains(&s));
        prop_assert!((scorer.score(&a, &a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn prop_run_is_deterministic(records in records_strategy(), threshold in 0.5f64..=1.0) {
        let pipeline = DeduplicationPipeline::new();
        let first = pipeline.run(&records, 14, threshold).unwrap();
        let second = pipeline.run(&records, 14, threshold).unwrap();
        prop_assert_eq!(first.groups, second.groups);
    }

    #[test]
    fn prop_groups_are_never_singletons(records in records_strategy(), threshold in 0.5f64..=1.0) {
        let report = DeduplicationPipeline::new().run(&records, 14, threshold).unwrap();
        for group in &report.groups {
            prop_assert!(group.len() >= 2);
            prop_assert!(group.similarity_score >= threshold);
        }
    }

    #[test]
    fn prop_every_record_lands_in_at_most_one_group(records in records_strategy()) {
        let report = DeduplicationPipeline::new().run(&records, 14, 0.8).unwrap();
        let mut seen: Vec<_> = report.groups.iter().flat_map(|g| g.member_ids()).collect();
        let total = seen.len();
        seen.sort();
        seen.dedup();
        prop_assert_eq!(seen.len(), total);
    }

    #[test]
    fn prop_raising_threshold_never_adds_matching_pairs(
        records in records_strategy(),
        low in 0.5f64..0.9,
        step in 0.0f64..0.1,
    ) {
        let scorer = SimilarityScorer::default();
        let high = low + step;
        let matching = |t: f64| {
            let mut count = 0;
            for (i, a) in records.iter().enumerate() {
                for b in &records[i + 1..] {
                    if scorer.score(a, b) >= t {
                        count += 1;
                    }
                }
            }
            count
        };
        prop_assert!(matching(high) <= matching(low));
    }

    #[test]
    fn prop_merge_takes_every_value_from_a_member(records in records_strategy()) {
        let report = DeduplicationPipeline::new().run(&records, 14, 0.8).unwrap();
        for group in &report.groups {
            let merged = &group.suggested_merge;
            let members = &group.members;

            prop_assert!(members.iter().any(|m| m.id == merged.id));
            prop_assert!(members.iter().any(|m| m.name == merged.name));
            prop_assert!(members.iter().any(|m| m.coordinates == merged.coordinates));
            prop_assert!(from_some_member(&merged.address, members, |m| &m.address));
            prop_assert!(from_some_member(&merged.city, members, |m| &m.city));
            prop_assert!(from_some_member(&merged.category, members, |m| &m.category));
            prop_assert!(from_some_member(&merged.phone, members, |m| &m.phone));
            prop_assert_eq!(merged.is_verified, members.iter().any(|m| m.is_verified));
            prop_assert_eq!(
                Some(merged.created_at),
                members.iter().map(|m| m.created_at).min()
            );
        }
    }
}
