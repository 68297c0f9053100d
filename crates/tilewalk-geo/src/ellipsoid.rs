//! WGS84 ellipsoid conversions.

use glam::{DMat3, DVec3};

use crate::GeodeticPoint;

/// WGS84 semi-major axis in meters.
pub const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// WGS84 flattening.
pub const FLATTENING: f64 = 1.0 / 298.257_223_563;

/// WGS84 semi-minor axis in meters.
pub const SEMI_MINOR_AXIS: f64 = SEMI_MAJOR_AXIS * (1.0 - FLATTENING);

/// WGS84 first eccentricity squared.
pub const ECCENTRICITY_SQUARED: f64 =
    1.0 - (SEMI_MINOR_AXIS * SEMI_MINOR_AXIS) / (SEMI_MAJOR_AXIS * SEMI_MAJOR_AXIS);

/// Number of latitude refinement passes in [`ecef_to_wgs84`].
const LATITUDE_ITERATIONS: usize = 5;

/// Prime vertical radius of curvature at the given latitude (radians).
fn prime_vertical_radius(lat_rad: f64) -> f64 {
    let sin_lat = lat_rad.sin();
    SEMI_MAJOR_AXIS / (1.0 - ECCENTRICITY_SQUARED * sin_lat * sin_lat).sqrt()
}

/// Convert geodetic coordinates (degrees, meters) to ECEF (meters).
#[must_use]
pub fn wgs84_to_ecef(lon_deg: f64, lat_deg: f64, height_m: f64) -> DVec3 {
    let lon = lon_deg.to_radians();
    let lat = lat_deg.to_radians();
    let n = prime_vertical_radius(lat);

    DVec3::new(
        (n + height_m) * lat.cos() * lon.cos(),
        (n + height_m) * lat.cos() * lon.sin(),
        (n * (1.0 - ECCENTRICITY_SQUARED) + height_m) * lat.sin(),
    )
}

/// Convert ECEF (meters) to geodetic coordinates.
///
/// Longitude is exact. Latitude and height are refined with a fixed five
/// passes and no convergence check, which keeps the cost constant and is
/// sub-centimeter at terrestrial heights. Not valid at the poles, where the
/// height term divides by `cos(lat)`.
#[must_use]
pub fn ecef_to_wgs84(position: DVec3) -> GeodeticPoint {
    let lon = position.y.atan2(position.x);
    let p = position.x.hypot(position.y);

    let mut lat = position.z.atan2(p * (1.0 - ECCENTRICITY_SQUARED));
    let mut height = 0.0;
    for _ in 0..LATITUDE_ITERATIONS {
        let n = prime_vertical_radius(lat);
        height = p / lat.cos() - n;
        lat = position
            .z
            .atan2(p * (1.0 - ECCENTRICITY_SQUARED * n / (n + height)));
    }

    GeodeticPoint {
        lon_deg: lon.to_degrees(),
        lat_deg: lat.to_degrees(),
        height_m: height,
    }
}

/// East, north and up unit vectors at a geodetic location.
///
/// Returned as the columns of a rotation matrix, so `basis * local` maps a
/// local east/north/up offset into an ECEF offset.
#[must_use]
pub fn enu_basis(lon_deg: f64, lat_deg: f64) -> DMat3 {
    let (sin_lon, cos_lon) = lon_deg.to_radians().sin_cos();
    let (sin_lat, cos_lat) = lat_deg.to_radians().sin_cos();

    DMat3::from_cols(
        DVec3::new(-sin_lon, cos_lon, 0.0),
        DVec3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat),
        DVec3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_equator_prime_meridian() {
        let p = wgs84_to_ecef(0.0, 0.0, 0.0);
        assert!((p.x - SEMI_MAJOR_AXIS).abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
        assert!(p.z.abs() < 1e-6);
    }

    #[test]
    fn test_north_pole_uses_semi_minor_axis() {
        let p = wgs84_to_ecef(0.0, 90.0, 0.0);
        assert!(p.x.abs() < 1e-6);
        assert!((p.z - SEMI_MINOR_AXIS).abs() < 1e-6);
    }

    #[test]
    fn test_known_point_new_york() {
        // Roughly 40.7°N, 74°W at sea level.
        let p = wgs84_to_ecef(-74.0, 40.7, 0.0);
        assert!((p.x - 1_334_741.342).abs() < 1e-2, "x = {}", p.x);
        assert!((p.y - -4_654_796.234).abs() < 1e-2, "y = {}", p.y);
        assert!((p.z - 4_137_222.717).abs() < 1e-2, "z = {}", p.z);
    }

    #[test]
    fn test_round_trip_height() {
        let p = wgs84_to_ecef(151.2, -33.8, 1234.5);
        let g = ecef_to_wgs84(p);
        assert!((g.lon_deg - 151.2).abs() < 1e-9);
        assert!((g.lat_deg - -33.8).abs() < 1e-6);
        assert!((g.height_m - 1234.5).abs() < 1e-3);
    }

    #[test]
    fn test_enu_basis_is_orthonormal() {
        let basis = enu_basis(12.5, 47.3);
        for i in 0..3 {
            assert!((basis.col(i).length() - 1.0).abs() < 1e-12);
            for j in (i + 1)..3 {
                assert!(basis.col(i).dot(basis.col(j)).abs() < 1e-12);
            }
        }

        // Up matches the direction of the ECEF position for a sphere-ish point.
        let up = basis.col(2);
        let radial = wgs84_to_ecef(12.5, 47.3, 0.0).normalize();
        assert!(up.dot(radial) > 0.99);
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            lon in -179.9f64..179.9,
            lat in -85.0f64..85.0,
            height in -500.0f64..9_000.0,
        ) {
            let g = ecef_to_wgs84(wgs84_to_ecef(lon, lat, height));
            prop_assert!((g.lon_deg - lon).abs() < 1e-6);
            prop_assert!((g.lat_deg - lat).abs() < 1e-6);
            prop_assert!((g.height_m - height).abs() < 1e-3);
        }
    }
}
