//! Geofence containment.
//!
//! Distances are great-circle distances on a sphere of radius
//! [`EARTH_RADIUS_M`], computed with the Haversine formula. Working on
//! angular differences keeps it well behaved at the poles and across the
//! antimeridian.

use serde::Serialize;
use utoipa::ToSchema;

use crate::model::attendance_config::GeoFence;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two (lat, lng) points in degrees.
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // rounding can push `a` a hair above 1 for antipodal points
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

pub fn is_within_fence(lat: f64, lng: f64, fence: &GeoFence) -> bool {
    haversine_distance(lat, lng, fence.latitude, fence.longitude) <= fence.radius
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct LocationCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_fence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Accepts any point when remote work is allowed; otherwise the first
/// fence (in list order) containing the point wins.
pub fn validate_location(lat: f64, lng: f64, fences: &[GeoFence], allow_remote: bool) -> LocationCheck {
    if allow_remote {
        return LocationCheck {
            valid: true,
            matched_fence: None,
            message: Some("Remote work allowed".to_string()),
        };
    }

    match fences.iter().find(|fence| is_within_fence(lat, lng, fence)) {
        Some(fence) => LocationCheck {
            valid: true,
            matched_fence: Some(fence.name.clone()),
            message: None,
        },
        None => LocationCheck {
            valid: false,
            matched_fence: None,
            message: Some("Location not within any allowed areas".to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fence(name: &str, lat: f64, lng: f64, radius: f64) -> GeoFence {
        GeoFence {
            name: name.to_string(),
            latitude: lat,
            longitude: lng,
            radius,
            address: None,
        }
    }

    /// Point reached by travelling `distance` meters from (lat, lng) on `bearing` degrees.
    fn destination(lat: f64, lng: f64, bearing: f64, distance: f64) -> (f64, f64) {
        let delta = distance / EARTH_RADIUS_M;
        let theta = bearing.to_radians();
        let phi1 = lat.to_radians();
        let lambda1 = lng.to_radians();

        let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
        let lambda2 = lambda1
            + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

        (phi2.to_degrees(), lambda2.to_degrees())
    }

    #[test]
    fn same_point_is_zero_distance() {
        assert_eq!(haversine_distance(23.81, 90.41, 23.81, 90.41), 0.0);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let d = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_195.0).abs() < 10.0, "got {d}");
    }

    #[test]
    fn antimeridian_neighbours_are_close() {
        let d = haversine_distance(0.0, 179.9995, 0.0, -179.9995);
        assert!(d < 120.0, "got {d}");
        assert!(is_within_fence(0.0, -179.9995, &fence("dateline", 0.0, 179.9995, 150.0)));
    }

    #[test]
    fn points_near_the_pole_stay_stable() {
        let d = haversine_distance(89.9999, 0.0, 89.9999, 180.0);
        assert!(d.is_finite());
        assert!(d < 30.0, "got {d}");
    }

    #[test]
    fn antipodal_points_do_not_produce_nan() {
        let d = haversine_distance(0.0, 0.0, 0.0, 180.0);
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1.0);
    }

    #[test]
    fn empty_fence_list_without_remote_is_invalid() {
        let check = validate_location(23.8, 90.4, &[], false);
        assert!(!check.valid);
        assert_eq!(check.message.as_deref(), Some("Location not within any allowed areas"));
    }

    #[test]
    fn first_matching_fence_is_reported() {
        let fences = vec![
            fence("far", 10.0, 10.0, 50.0),
            fence("campus", 23.8103, 90.4125, 500.0),
            fence("annex", 23.8103, 90.4125, 1_000.0),
        ];
        let check = validate_location(23.8105, 90.4127, &fences, false);
        assert!(check.valid);
        assert_eq!(check.matched_fence.as_deref(), Some("campus"));
    }

    proptest! {
        #[test]
        fn points_inside_the_radius_are_contained(
            lat in -80.0f64..80.0,
            lng in -179.0f64..179.0,
            radius in 10.0f64..5_000.0,
            bearing in 0.0f64..360.0,
            fraction in 0.0f64..0.99,
        ) {
            let (plat, plng) = destination(lat, lng, bearing, radius * fraction);
            prop_assert!(is_within_fence(plat, plng, &fence("f", lat, lng, radius)));
        }

        #[test]
        fn points_beyond_the_radius_are_not_contained(
            lat in -80.0f64..80.0,
            lng in -179.0f64..179.0,
            radius in 10.0f64..5_000.0,
            bearing in 0.0f64..360.0,
            factor in 1.01f64..20.0,
        ) {
            let (plat, plng) = destination(lat, lng, bearing, radius * factor);
            prop_assert!(!is_within_fence(plat, plng, &fence("f", lat, lng, radius)));
        }

        #[test]
        fn remote_work_is_always_valid(
            lat in -90.0f64..=90.0,
            lng in -180.0f64..=180.0,
            count in 0usize..4,
        ) {
            let fences: Vec<GeoFence> = (0..count)
                .map(|i| fence("f", -lat, -lng, i as f64))
                .collect();
            prop_assert!(validate_location(lat, lng, &fences, true).valid);
        }
    }
}
