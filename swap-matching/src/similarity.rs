//! Geo and vector similarity primitives

use ndarray::ArrayView1;
use swap_core::Coordinates;

/// Mean earth radius used by the haversine distance
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Distance scale (km) of the candidate geo score
pub const GEO_DECAY_KM: f64 = 50.0;

/// Calculate cosine similarity between two vectors
///
/// Returns a value in [-1.0, 1.0]. A zero vector on either side, or a
/// dimension mismatch, yields 0.0.
///
/// Formula: cos(θ) = (A · B) / (||A|| ||B||)
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let a_view = ArrayView1::from(a);
    let b_view = ArrayView1::from(b);

    let dot_product = a_view.dot(&b_view);
    let norm_a = a_view.dot(&a_view).sqrt();
    let norm_b = b_view.dot(&b_view).sqrt();

    // Avoid division by zero
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Great-circle distance in kilometres (haversine formula)
pub fn haversine_km(a: &Coordinates, b: &Coordinates) -> f64 {
    let lat1_rad = a.latitude.to_radians();
    let lat2_rad = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// `exp(-value / scale)`
pub fn exp_decay(value: f64, scale: f64) -> f64 {
    (-value / scale).exp()
}

/// Proximity score for a distance: 1.0 at zero, decaying over [`GEO_DECAY_KM`]
pub fn geo_score(distance_km: f64) -> f64 {
    exp_decay(distance_km, GEO_DECAY_KM)
}

/// Proximity score between two optional locations; 0.5 when either is unknown
pub fn geo_score_between(a: Option<&Coordinates>, b: Option<&Coordinates>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => geo_score(haversine_km(a, b)),
        _ => 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&a, &a);
        assert!((sim - 1.0).abs() < 1e-9, "Identical vectors should have similarity ~1.0");
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = vec![0.3, 0.2, 0.9];
        let zero = vec![0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &zero), 0.0);
        assert_eq!(cosine_similarity(&zero, &a), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero), 0.0);
    }

    #[test]
    fn test_cosine_similarity_dimension_mismatch() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Paris -> London is roughly 344 km
        let paris = Coordinates::new(48.8566, 2.3522);
        let london = Coordinates::new(51.5074, -0.1278);
        let d = haversine_km(&paris, &london);
        assert!((d - 344.0).abs() < 5.0, "got {}", d);
    }

    #[test]
    fn test_geo_score_symmetric_and_unit_at_zero() {
        let a = Coordinates::new(40.7128, -74.0060);
        let b = Coordinates::new(40.8, -73.9);
        let ab = geo_score_between(Some(&a), Some(&b));
        let ba = geo_score_between(Some(&b), Some(&a));
        assert!((ab - ba).abs() < 1e-12);
        assert_eq!(geo_score(0.0), 1.0);
        assert!((geo_score_between(Some(&a), Some(&a)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_geo_score_missing_side_is_neutral() {
        let a = Coordinates::new(1.0, 1.0);
        assert_eq!(geo_score_between(Some(&a), None), 0.5);
        assert_eq!(geo_score_between(None, None), 0.5);
    }
}
