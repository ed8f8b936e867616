// src/matching/geospatial/mod.rs

// Spatial indexing: maps coordinates onto a hierarchical grid so that only
// nearby records are ever compared.

mod cell;
mod utils;

pub use cell::{
    approx_cell_area_km2, cell_id, cell_size_degrees, max_cell_diameter_m, validate_resolution,
    CellId, GeoIndexer, MAX_RESOLUTION, MIN_RESOLUTION,
};
pub use utils::{calculate_haversine_distance, distance_m, EARTH_RADIUS_M};
