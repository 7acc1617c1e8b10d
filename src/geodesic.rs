use crate::sample::GeoSample;

/// Mean Earth radius in miles
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Great-circle distance in miles between two lat/lon points (Haversine).
///
/// Inputs are not range-checked. Identical points yield exactly 0.0.
pub fn distance_miles(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    EARTH_RADIUS_MILES * c
}

/// Distance between two samples in miles
pub fn segment_miles(from: &GeoSample, to: &GeoSample) -> f64 {
    distance_miles(from.latitude, from.longitude, to.latitude, to.longitude)
}

/// Sum of consecutive segment distances over a track
pub fn total_distance(points: &[GeoSample]) -> f64 {
    points
        .windows(2)
        .map(|pair| segment_miles(&pair[0], &pair[1]))
        .sum()
}
