//! Great-circle distance and ring densification.
//!
//! These use a spherical Earth. That is good enough to decide how finely to
//! subdivide a boundary or how large a tile is, not for surveying.

use glam::DVec3;

use crate::GeodeticPoint;
use crate::error::{GeoError, GeoResult};

/// Mean Earth radius in meters used by the spherical approximations.
pub const MEAN_EARTH_RADIUS: f64 = 6_371_000.0;

/// Endpoints closer than this (in degrees on both axes) are treated as equal.
const COINCIDENT_DEGREES: f64 = 1e-10;

/// Haversine distance in meters between two lat/lon pairs (degrees).
#[must_use]
pub fn geodesic_distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    MEAN_EARTH_RADIUS * c
}

/// Insert great-circle points along each edge of a closed ring so that no
/// chord is longer than `max_chord_meters`.
///
/// The ring is closed implicitly (the last point connects back to the
/// first). Original vertices are passed through untouched; inserted points
/// have height 0.
///
/// # Errors
///
/// Returns an error if `max_chord_meters` is not a positive finite number.
pub fn densify(ring: &[GeodeticPoint], max_chord_meters: f64) -> GeoResult<Vec<GeodeticPoint>> {
    if !(max_chord_meters.is_finite() && max_chord_meters > 0.0) {
        return Err(GeoError::InvalidParameter {
            context: "max chord",
            detail: format!("expected a positive length, got {max_chord_meters}"),
        });
    }

    let mut out = Vec::with_capacity(ring.len());
    for (i, &start) in ring.iter().enumerate() {
        let end = ring[(i + 1) % ring.len()];
        out.push(start);

        if (start.lon_deg - end.lon_deg).abs() < COINCIDENT_DEGREES
            && (start.lat_deg - end.lat_deg).abs() < COINCIDENT_DEGREES
        {
            continue;
        }

        let length =
            geodesic_distance_meters(start.lat_deg, start.lon_deg, end.lat_deg, end.lon_deg);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let segments = (length / max_chord_meters).ceil() as usize;
        if segments < 2 {
            continue;
        }

        let a = unit_vector(start);
        let b = unit_vector(end);
        #[allow(clippy::cast_precision_loss)]
        for k in 1..segments {
            let t = k as f64 / segments as f64;
            out.push(from_unit_vector(slerp(a, b, t)));
        }
    }

    Ok(out)
}

fn unit_vector(point: GeodeticPoint) -> DVec3 {
    let (sin_lat, cos_lat) = point.lat_deg.to_radians().sin_cos();
    let (sin_lon, cos_lon) = point.lon_deg.to_radians().sin_cos();
    DVec3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat)
}

fn from_unit_vector(v: DVec3) -> GeodeticPoint {
    GeodeticPoint {
        lon_deg: v.y.atan2(v.x).to_degrees(),
        lat_deg: v.z.atan2(v.x.hypot(v.y)).to_degrees(),
        height_m: 0.0,
    }
}

/// Spherical linear interpolation between two unit vectors.
fn slerp(a: DVec3, b: DVec3, t: f64) -> DVec3 {
    let theta = a.dot(b).clamp(-1.0, 1.0).acos();
    let sin_theta = theta.sin();

    // Nearly antipodal: the great circle is undefined, fall back to a chord.
    if sin_theta.abs() < 1e-12 {
        return a.lerp(b, t).normalize_or(a);
    }

    a * (((1.0 - t) * theta).sin() / sin_theta) + b * ((t * theta).sin() / sin_theta)
}
