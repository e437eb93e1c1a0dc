//! Distance filtering and ranking.
//!
//! Distances are great-circle distances on a sphere of radius 6371 km. The
//! admitted set is sorted ascending by distance with a stable sort, so equal
//! distances keep registry fetch order.

use crate::domain::{Coordinate, Facility, Origin};

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points, in kilometres.
///
/// # Examples
///
/// ```
/// use facility_finder::domain::Coordinate;
/// use facility_finder::proximity::haversine_km;
///
/// let a = Coordinate::new(37.2636, 127.0286).unwrap();
/// let b = Coordinate::new(37.2640, 127.0290).unwrap();
/// let d = haversine_km(a, b);
/// assert!(d > 0.04 && d < 0.06);
/// ```
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude().to_radians();
    let lat2 = b.latitude().to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude() - a.longitude()).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1 for antipodal points
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Assign distances, keep facilities within `radius_km * near_miss_factor`,
/// and sort nearest first.
///
/// `near_miss_factor` below 1 (or non-finite) is treated as 1.
pub fn filter(
    facilities: Vec<Facility>,
    origin: &Origin,
    radius_km: f64,
    near_miss_factor: f64,
) -> Vec<Facility> {
    let factor = if near_miss_factor.is_finite() {
        near_miss_factor.max(1.0)
    } else {
        1.0
    };
    let limit = radius_km * factor;

    let mut admitted: Vec<Facility> = facilities
        .into_iter()
        .filter_map(|mut f| {
            let d = haversine_km(origin.position, f.position());
            if d <= limit {
                f.set_distance_km(d);
                Some(f)
            } else {
                None
            }
        })
        .collect();

    admitted.sort_by(|a, b| a.distance_km().total_cmp(&b.distance_km()));
    admitted
}
