//! Great-circle geometry for duplicate detection.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Haversine distance on a spherical Earth.
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push h a hair outside [0, 1] for antipodal points.
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

pub fn within_radius(a: GeoPoint, b: GeoPoint, radius_meters: f64) -> bool {
    distance_meters(a, b) <= radius_meters
}

/// Axis-aligned box that contains every point within `radius_meters` of `center`.
///
/// Used as a cheap index-friendly pre-filter; callers must still confirm with
/// [`within_radius`]. Near the poles or across the antimeridian the longitude
/// range widens to the full circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

pub fn bounding_box(center: GeoPoint, radius_meters: f64) -> BoundingBox {
    let angular = (radius_meters / EARTH_RADIUS_METERS).to_degrees();
    let reaches_pole = center.latitude + angular >= 90.0 || center.latitude - angular <= -90.0;
    let min_latitude = (center.latitude - angular).max(-90.0);
    let max_latitude = (center.latitude + angular).min(90.0);

    let cos_lat = center.latitude.to_radians().cos();
    let lng_span = if cos_lat <= f64::EPSILON {
        180.0
    } else {
        angular / cos_lat
    };

    // A circle over a pole holds every meridian.
    let (min_longitude, max_longitude) = if reaches_pole
        || lng_span >= 180.0
        || center.longitude - lng_span < -180.0
        || center.longitude + lng_span > 180.0
    {
        (-180.0, 180.0)
    } else {
        (center.longitude - lng_span, center.longitude + lng_span)
    };

    BoundingBox {
        min_latitude,
        max_latitude,
        min_longitude,
        max_longitude,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const MG_ROAD: GeoPoint = GeoPoint::new(12.9756, 77.6050);

    #[test]
    fn identical_points_are_zero_apart() {
        assert_eq!(distance_meters(MG_ROAD, MG_ROAD), 0.0);
        assert!(within_radius(MG_ROAD, MG_ROAD, 0.0));
    }

    #[test]
    fn known_city_distance() {
        // Bangalore centre to Mysore palace is about 126 km.
        let center = GeoPoint::new(12.9716, 77.5946);
        let mysore = GeoPoint::new(12.3052, 76.6552);
        let d = distance_meters(center, mysore);
        assert!((d - 126_000.0).abs() < 3_000.0, "got {d}");
    }

    #[test]
    fn fifty_meter_boundary() {
        // 0.0004 degrees of latitude is about 44.5 m, 0.0005 is about 55.6 m.
        let near = GeoPoint::new(MG_ROAD.latitude + 0.0004, MG_ROAD.longitude);
        let far = GeoPoint::new(MG_ROAD.latitude + 0.0005, MG_ROAD.longitude);
        assert!(within_radius(MG_ROAD, near, 50.0));
        assert!(!within_radius(MG_ROAD, far, 50.0));
    }

    #[test]
    fn antipodal_points_are_half_circumference_apart() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 180.0);
        let d = distance_meters(a, b);
        assert!((d - PI * EARTH_RADIUS_METERS).abs() < 1.0, "got {d}");
    }

    #[test]
    fn longitude_wraparound_is_short_distance() {
        let east = GeoPoint::new(10.0, 179.9999);
        let west = GeoPoint::new(10.0, -179.9999);
        let d = distance_meters(east, west);
        assert!(d < 30.0, "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GeoPoint::new(-33.8688, 151.2093);
        let b = GeoPoint::new(51.5074, -0.1278);
        assert!((distance_meters(a, b) - distance_meters(b, a)).abs() < 1e-6);
    }

    #[test]
    fn validity_bounds() {
        assert!(GeoPoint::new(90.0, -180.0).is_valid());
        assert!(!GeoPoint::new(90.1, 0.0).is_valid());
        assert!(!GeoPoint::new(0.0, 180.5).is_valid());
        assert!(!GeoPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn bounding_box_contains_radius() {
        let bbox = bounding_box(MG_ROAD, 50.0);
        let north = GeoPoint::new(MG_ROAD.latitude + 0.0004, MG_ROAD.longitude);
        assert!(north.latitude <= bbox.max_latitude);
        assert!(bbox.min_longitude < MG_ROAD.longitude && MG_ROAD.longitude < bbox.max_longitude);
    }

    #[test]
    fn bounding_box_widens_at_antimeridian_and_poles() {
        let bbox = bounding_box(GeoPoint::new(10.0, 179.9999), 50.0);
        assert_eq!((bbox.min_longitude, bbox.max_longitude), (-180.0, 180.0));

        let polar = bounding_box(GeoPoint::new(90.0, 0.0), 50.0);
        assert_eq!((polar.min_longitude, polar.max_longitude), (-180.0, 180.0));
        assert_eq!(polar.max_latitude, 90.0);

        // Centre just short of the pole: a neighbour across the pole is 179 degrees
        // of longitude away but inside the radius.
        let delta = (50.0 / EARTH_RADIUS_METERS).to_degrees();
        let near_pole = GeoPoint::new(90.0 - 0.9 * delta, 0.0);
        let across = GeoPoint::new(90.0 - 0.05 * delta, 179.0);
        assert!(within_radius(near_pole, across, 50.0));
        let bbox = bounding_box(near_pole, 50.0);
        assert_eq!((bbox.min_longitude, bbox.max_longitude), (-180.0, 180.0));
        assert!(across.latitude >= bbox.min_latitude && across.latitude <= bbox.max_latitude);

        let south = bounding_box(GeoPoint::new(-90.0 + 0.5 * delta, 42.0), 50.0);
        assert_eq!((south.min_longitude, south.max_longitude), (-180.0, 180.0));
        assert_eq!(south.min_latitude, -90.0);
    }
}
