// src/matching/geospatial/cell.rs
//
// Hierarchical quad grid over latitude/longitude.
//
// At resolution `r` latitude is split into 2^r bands and longitude into
// 2^(r+1) bands, so every cell spans the same number of degrees on both axes
// (180 / 2^r). Each cell has exactly four children at `r + 1` and one parent
// at `r - 1`, and a coordinate's cell at `r - 1` is always the parent of its
// cell at `r`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::utils::EARTH_RADIUS_M;
use crate::error::{DedupeError, DedupeResult};
use crate::models::Coordinates;

pub const MIN_RESOLUTION: u8 = 1;
pub const MAX_RESOLUTION: u8 = 26;

/// Identifier of one grid cell at a given resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    resolution: u8,
    lat_index: u32,
    lon_index: u32,
}

/// Checks a caller-supplied resolution and narrows it to the grid's range.
pub fn validate_resolution(resolution: i64) -> DedupeResult<u8> {
    if resolution < MIN_RESOLUTION as i64 || resolution > MAX_RESOLUTION as i64 {
        return Err(DedupeError::invalid_parameter(
            "resolution",
            resolution,
            format!(
                "must be between {} and {}",
                MIN_RESOLUTION, MAX_RESOLUTION
            ),
        ));
    }
    Ok(resolution as u8)
}

fn lat_bands(resolution: u8) -> u32 {
    1u32 << resolution
}

fn lon_bands(resolution: u8) -> u32 {
    1u32 << (resolution + 1)
}

/// Edge length of a cell in degrees.
pub fn cell_size_degrees(resolution: u8) -> f64 {
    180.0 / lat_bands(resolution) as f64
}

/// Upper bound, in meters, on the distance between any two points of a cell.
///
/// A meridian leg followed by a parallel leg connects any two points of a
/// cell, and neither leg is longer than the cell's edge measured at the
/// equator, so the geodesic is bounded by twice that edge.
pub fn max_cell_diameter_m(resolution: u8) -> f64 {
    2.0 * EARTH_RADIUS_M * cell_size_degrees(resolution).to_radians()
}

/// Area of a cell touching the equator, in square kilometers. Cells shrink
/// towards the poles.
pub fn approx_cell_area_km2(resolution: u8) -> f64 {
    let edge_km = EARTH_RADIUS_M * cell_size_degrees(resolution).to_radians() / 1000.0;
    edge_km * edge_km
}

/// Maps a coordinate to its cell. Total over valid coordinates; coordinates on
/// the north pole or the antimeridian fall into the last band.
pub fn cell_id(coordinates: &Coordinates, resolution: u8) -> DedupeResult<CellId> {
    if !(MIN_RESOLUTION..=MAX_RESOLUTION).contains(&resolution) {
        return Err(DedupeError::invalid_parameter(
            "resolution",
            resolution,
            format!(
                "must be between {} and {}",
                MIN_RESOLUTION, MAX_RESOLUTION
            ),
        ));
    }
    if !coordinates.is_valid() {
        return Err(DedupeError::InvalidCoordinates {
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
        });
    }

    let lat_fraction = (coordinates.latitude + 90.0) / 180.0;
    let lon_fraction = (coordinates.longitude + 180.0) / 360.0;

    Ok(CellId {
        resolution,
        lat_index: band_index(lat_fraction, lat_bands(resolution)),
        lon_index: band_index(lon_fraction, lon_bands(resolution)),
    })
}

fn band_index(fraction: f64, bands: u32) -> u32 {
    let raw = (fraction * bands as f64).floor();
    if raw <= 0.0 {
        0
    } else {
        (raw as u32).min(bands - 1)
    }
}

/// Indexes coordinates at one fixed resolution.
#[derive(Debug, Clone, Copy)]
pub struct GeoIndexer {
    resolution: u8,
}

impl GeoIndexer {
    pub fn new(resolution: i64) -> DedupeResult<Self> {
        Ok(Self {
            resolution: validate_resolution(resolution)?,
        })
    }

    pub fn resolution(&self) -> u8 {
        self.resolution
    }

    pub fn cell_id(&self, coordinates: &Coordinates) -> DedupeResult<CellId> {
        cell_id(coordinates, self.resolution)
    }
}

impl CellId {
    pub fn resolution(&self) -> u8 {
        self.resolution
    }

    pub fn lat_index(&self) -> u32 {
        self.lat_index
    }

    pub fn lon_index(&self) -> u32 {
        self.lon_index
    }

    /// Returns (min_lat, min_lon, max_lat, max_lon) in degrees.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let size = cell_size_degrees(self.resolution);
        let min_lat = -90.0 + self.lat_index as f64 * size;
        let min_lon = -180.0 + self.lon_index as f64 * size;
        (min_lat, min_lon, min_lat + size, min_lon + size)
    }

    pub fn center(&self) -> Coordinates {
        let (min_lat, min_lon, max_lat, max_lon) = self.bounds();
        Coordinates::new((min_lat + max_lat) / 2.0, (min_lon + max_lon) / 2.0)
    }

    /// The enclosing cell one resolution coarser, or `None` at the coarsest level.
    pub fn parent(&self) -> Option<CellId> {
        if self.resolution <= MIN_RESOLUTION {
            return None;
        }
        Some(CellId {
            resolution: self.resolution - 1,
            lat_index: self.lat_index >> 1,
            lon_index: self.lon_index >> 1,
        })
    }

    /// The four cells one resolution finer, or none at the finest level.
    pub fn children(&self) -> Vec<CellId> {
        if self.resolution >= MAX_RESOLUTION {
            return Vec::new();
        }
        let mut children = Vec::with_capacity(4);
        for lat_offset in 0..2 {
            for lon_offset in 0..2 {
                children.push(CellId {
                    resolution: self.resolution + 1,
                    lat_index: (self.lat_index << 1) | lat_offset,
                    lon_index: (self.lon_index << 1) | lon_offset,
                });
            }
        }
        children
    }

    /// Whether `self` lies inside `ancestor` (or is `ancestor`).
    pub fn is_descendant_of(&self, ancestor: &CellId) -> bool {
        if ancestor.resolution > self.resolution {
            return false;
        }
        let shift = self.resolution - ancestor.resolution;
        (self.lat_index >> shift) == ancestor.lat_index
            && (self.lon_index >> shift) == ancestor.lon_index
    }

    /// The 1-ring of adjacent cells. Longitude wraps around the antimeridian;
    /// cells touching a pole have no neighbors beyond it.
    pub fn neighbors(&self) -> Vec<CellId> {
        let lat_count = lat_bands(self.resolution) as i64;
        let lon_count = lon_bands(self.resolution) as i64;
        let mut ring = Vec::with_capacity(8);

        for lat_offset in -1i64..=1 {
            let lat = self.lat_index as i64 + lat_offset;
            if lat < 0 || lat >= lat_count {
                continue;
            }
            for lon_offset in -1i64..=1 {
                if lat_offset == 0 && lon_offset == 0 {
                    continue;
                }
                let lon = (self.lon_index as i64 + lon_offset).rem_euclid(lon_count);
                let neighbor = CellId {
                    resolution: self.resolution,
                    lat_index: lat as u32,
                    lon_index: lon as u32,
                };
                if neighbor != *self && !ring.contains(&neighbor) {
                    ring.push(neighbor);
                }
            }
        }
        ring
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}-{:x}-{:x}",
            self.resolution, self.lat_index, self.lon_index
        )
    }
}

impl FromStr for CellId {
    type Err = DedupeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || DedupeError::invalid_parameter("cell_id", s, "malformed cell id");

        let mut parts = s.split('-');
        let (Some(res), Some(lat), Some(lon), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };

        let resolution: u8 = res.parse().map_err(|_| malformed())?;
        let lat_index = u32::from_str_radix(lat, 16).map_err(|_| malformed())?;
        let lon_index = u32::from_str_radix(lon, 16).map_err(|_| malformed())?;

        if !(MIN_RESOLUTION..=MAX_RESOLUTION).contains(&resolution)
            || lat_index >= lat_bands(resolution)
            || lon_index >= lon_bands(resolution)
        {
            return Err(malformed());
        }

        Ok(CellId {
            resolution,
            lat_index,
            lon_index,
        })
    }
}

impl Serialize for CellId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CellId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::geospatial::utils::distance_m;

    fn coords(lat: f64, lon: f64) -> Coordinates {
        Coordinates::new(lat, lon)
    }

    #[test]
    fn test_resolution_validation() {
        assert!(validate_resolution(-1).is_err());
        assert!(validate_resolution(0).is_err());
        assert!(validate_resolution(27).is_err());
        assert_eq!(validate_resolution(14).unwrap(), 14);
        assert!(GeoIndexer::new(MAX_RESOLUTION as i64).is_ok());
    }

    #[test]
    fn test_invalid_coordinates_rejected() {
        assert!(matches!(
            cell_id(&coords(91.0, 0.0), 10),
            Err(DedupeError::InvalidCoordinates { .. })
        ));
        assert!(cell_id(&coords(0.0, -180.5), 10).is_err());
        assert!(cell_id(&coords(f64::NAN, 0.0), 10).is_err());
    }

    #[test]
    fn test_extreme_coordinates_are_indexable() {
        for (lat, lon) in [(90.0, 180.0), (-90.0, -180.0), (90.0, -180.0), (0.0, 0.0)] {
            let cell = cell_id(&coords(lat, lon), 12).unwrap();
            let (min_lat, min_lon, max_lat, max_lon) = cell.bounds();
            assert!(lat >= min_lat && lat <= max_lat);
            assert!(lon >= min_lon && lon <= max_lon);
        }
    }

    #[test]
    fn test_cell_contains_its_coordinates() {
        let point = coords(-23.5505, -46.6333);
        let cell = cell_id(&point, 14).unwrap();
        let (min_lat, min_lon, max_lat, max_lon) = cell.bounds();
        assert!(point.latitude >= min_lat && point.latitude < max_lat);
        assert!(point.longitude >= min_lon && point.longitude < max_lon);
    }

    #[test]
    fn test_parent_matches_coarser_index() {
        let point = coords(-22.9068, -43.1729);
        for resolution in 2..=MAX_RESOLUTION {
            let fine = cell_id(&point, resolution).unwrap();
            let coarse = cell_id(&point, resolution - 1).unwrap();
            assert_eq!(fine.parent(), Some(coarse));
            assert!(fine.is_descendant_of(&coarse));
            assert!(coarse.children().contains(&fine));
        }
        assert_eq!(cell_id(&point, 1).unwrap().parent(), None);
    }

    #[test]
    fn test_diameter_shrinks_with_resolution() {
        for resolution in MIN_RESOLUTION..MAX_RESOLUTION {
            assert!(max_cell_diameter_m(resolution + 1) < max_cell_diameter_m(resolution));
        }
        // ~1.2 km cells at the default resolution
        let area = approx_cell_area_km2(14);
        assert!(area > 1.0 && area < 2.0, "area was {}", area);
    }

    #[test]
    fn test_corners_within_diameter_bound() {
        let cell = cell_id(&coords(-15.7939, -47.8828), 13).unwrap();
        let (min_lat, min_lon, max_lat, max_lon) = cell.bounds();
        let diagonal = distance_m(&coords(min_lat, min_lon), &coords(max_lat, max_lon));
        assert!(diagonal <= max_cell_diameter_m(13));
    }

    #[test]
    fn test_neighbors_wrap_antimeridian() {
        let cell = cell_id(&coords(0.0, 179.99), 8).unwrap();
        let ring = cell.neighbors();
        assert_eq!(ring.len(), 8);
        assert!(ring.iter().any(|n| n.lon_index() == 0));
        assert!(!ring.contains(&cell));
    }

    #[test]
    fn test_neighbors_stop_at_pole() {
        let cell = cell_id(&coords(90.0, 10.0), 8).unwrap();
        assert_eq!(cell.neighbors().len(), 5);
    }

    #[test]
    fn test_display_round_trip() {
        let cell = cell_id(&coords(-8.0476, -34.8770), 17).unwrap();
        let rendered = cell.to_string();
        assert!(rendered.starts_with("17-"));
        assert_eq!(rendered.parse::<CellId>().unwrap(), cell);
        assert!("17-zz-1".parse::<CellId>().is_err());
        assert!("40-0-0".parse::<CellId>().is_err());
        assert!("03-8-0".parse::<CellId>().is_err());
    }
}
