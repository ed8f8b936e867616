// src/matching/geospatial/utils.rs
//
// Utility functions for geospatial calculations

use geo::{HaversineDistance, Point};

use crate::models::Coordinates;

/// Mean Earth radius in meters, the same radius `geo` uses for haversine.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Calculate the Haversine distance between two points in meters
pub fn calculate_haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    // geo points are (x = longitude, y = latitude)
    Point::new(lon1, lat1).haversine_distance(&Point::new(lon2, lat2))
}

pub fn distance_m(a: &Coordinates, b: &Coordinates) -> f64 {
    calculate_haversine_distance(a.latitude, a.longitude, b.latitude, b.longitude)
}
