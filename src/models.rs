// src/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::matching::geospatial::CellId;

//------------------------------------------------------------------------------
// IDENTIFIER TYPES
//------------------------------------------------------------------------------

/// Strongly typed identifier for organization records
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        EntityId(value.to_string())
    }
}

//------------------------------------------------------------------------------
// CORE DOMAIN MODELS
//------------------------------------------------------------------------------

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Latitude in [-90, 90] and longitude in [-180, 180]; NaN and infinities are rejected.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// One organization (typically a church) as listed by the directory service.
///
/// The engine never mutates records it is given; the caller owns them and
/// persists whatever merges or deletions it accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRecord {
    /// Unique identifier for this record
    pub id: EntityId,

    /// Organization name, the only required free-text field
    pub name: String,

    /// Denomination or other organization category
    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub city: Option<String>,

    #[serde(default)]
    pub state: Option<String>,

    pub coordinates: Coordinates,

    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub website: Option<String>,

    /// Provenance flag; verified records are preferred as a source of truth
    #[serde(default)]
    pub is_verified: bool,

    /// Tie-break of last resort
    pub created_at: DateTime<Utc>,
}

impl EntityRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: EntityId(id.into()),
            name: name.into(),
            category: None,
            address: None,
            city: None,
            state: None,
            coordinates: Coordinates::new(latitude, longitude),
            phone: None,
            email: None,
            website: None,
            is_verified: false,
            created_at: Utc::now(),
        }
    }

    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// Returns the trimmed value of an optional text field, or `None` when the
/// field is absent or blank.
pub fn present(field: &Option<String>) -> Option<&str> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// All records whose coordinates hash into the same cell, in input order.
#[derive(Debug, Clone)]
pub struct SpatialCell {
    pub cell_id: CellId,
    pub resolution: u8,
    pub records: Vec<EntityRecord>,
}

/// Records believed to describe the same real-world organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    /// Members in input order; the first one is the cluster representative
    pub members: Vec<EntityRecord>,

    /// Lowest representative-to-member score that admitted a member
    pub similarity_score: f64,

    /// Cell every member was indexed into
    pub cell_id: CellId,

    /// Field-wise canonical suggestion; never applied automatically
    pub suggested_merge: EntityRecord,
}

impl DuplicateGroup {
    pub fn member_ids(&self) -> Vec<EntityId> {
        self.members.iter().map(|m| m.id.clone()).collect()
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.members.iter().any(|m| &m.id == id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Why a record was left out of clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum UnindexableReason {
    InvalidCoordinates { latitude: f64, longitude: f64 },
    MissingName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnindexableRecord {
    pub id: EntityId,
    pub reason: UnindexableReason,
}

/// Two records in adjacent cells that would have scored as duplicates had
/// they shared a cell. Reported only; never folded into a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryPair {
    pub entity_id_1: EntityId,
    pub cell_id_1: CellId,
    pub entity_id_2: EntityId,
    pub cell_id_2: CellId,
    pub score: f64,
    pub distance_m: f64,
}

/// What the caller's store must do to accept a group's merge: write
/// `canonical` and retire every id in `retired_ids`, atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeDecision {
    pub canonical: EntityRecord,
    pub retired_ids: Vec<EntityId>,
}
