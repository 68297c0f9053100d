//! Precomputed ECEF summaries of an area of interest.

use glam::DVec3;

use crate::GeodeticPoint;
use crate::bounds::{Aabb, BoundingSphere, GeodeticRegion};
use crate::ellipsoid::{ecef_to_wgs84, enu_basis};
use crate::error::{GeoError, GeoResult};
use crate::obb::OrientedBox;

/// Vertical half extent of the AOI box in meters.
///
/// Large enough to cover the deepest trench and the highest summit.
pub const AOI_VERTICAL_HALF_EXTENT: f64 = 10_000.0;

/// The area of interest in the forms the pruning tests need.
///
/// Built once from a geodetic ring, then reused for every bounding volume
/// test so no node ever has to be converted back to geodetic form against
/// the AOI.
#[derive(Debug, Clone, PartialEq)]
pub struct AoiFootprint {
    center: GeodeticPoint,
    obb: OrientedBox,
    aabb: Aabb,
    sphere: BoundingSphere,
    relax_meters: f64,
    width_m: f64,
    height_m: f64,
    diagonal_m: f64,
}

impl AoiFootprint {
    /// Summarize a geodetic ring.
    ///
    /// The oriented box lies in the tangent plane at the ring's center, spans
    /// ±[`AOI_VERTICAL_HALF_EXTENT`] vertically and is widened horizontally by
    /// `relax_meters`. The AABB encloses that box. The sphere encloses the
    /// unrelaxed box; the relax margin is added to its radius when testing.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty ring, non-finite coordinates or a
    /// negative relax margin.
    pub fn from_ring(ring: &[GeodeticPoint], relax_meters: f64) -> GeoResult<Self> {
        if ring.is_empty() {
            return Err(GeoError::TooFewPoints {
                expected: 1,
                actual: 0,
            });
        }
        if ring.iter().any(|p| !p.is_finite()) {
            return Err(GeoError::NonFinite { context: "aoi ring" });
        }
        if !(relax_meters.is_finite() && relax_meters >= 0.0) {
            return Err(GeoError::InvalidParameter {
                context: "relax margin",
                detail: format!("expected a non-negative distance, got {relax_meters}"),
            });
        }

        let points: Vec<DVec3> = ring.iter().map(|p| p.to_ecef()).collect();
        let diagonal_m = Aabb::from_points(points.iter().copied()).map_or(0.0, |b| b.diagonal());
        #[allow(clippy::cast_precision_loss)]
        let mean = points.iter().copied().sum::<DVec3>() / points.len() as f64;
        let mean_geodetic = ecef_to_wgs84(mean);
        let center = GeodeticPoint::new(mean_geodetic.lon_deg, mean_geodetic.lat_deg, 0.0);
        let origin = center.to_ecef();
        let basis = enu_basis(center.lon_deg, center.lat_deg);
        let to_local = basis.transpose();

        let (lo, hi) = points.iter().fold(
            (DVec3::INFINITY, DVec3::NEG_INFINITY),
            |(lo, hi), p| {
                let local = to_local * (*p - origin);
                (lo.min(local), hi.max(local))
            },
        );

        let mid = (lo + hi) * 0.5;
        let half = (hi - lo) * 0.5;
        let box_center = origin + basis * mid;

        let tight = DVec3::new(half.x, half.y, half.z + AOI_VERTICAL_HALF_EXTENT);
        let relaxed = tight + DVec3::new(relax_meters, relax_meters, 0.0);

        let obb = OrientedBox::from_basis(box_center, basis, relaxed);
        let aabb = obb.aabb();
        let sphere = BoundingSphere::new(box_center, tight.length());

        Ok(Self {
            center,
            obb,
            aabb,
            sphere,
            relax_meters,
            width_m: hi.x - lo.x,
            height_m: hi.y - lo.y,
            diagonal_m,
        })
    }

    /// Geodetic center of the ring (height 0).
    #[must_use]
    pub fn center(&self) -> GeodeticPoint {
        self.center
    }

    /// East-west extent of the ring in meters, without relax.
    #[must_use]
    pub fn width_m(&self) -> f64 {
        self.width_m
    }

    /// North-south extent of the ring in meters, without relax.
    #[must_use]
    pub fn height_m(&self) -> f64 {
        self.height_m
    }

    /// Diagonal of the ECEF box around the ring points, without relax or
    /// vertical extent. This is the AOI size used for level-of-detail targets.
    #[must_use]
    pub fn diagonal_m(&self) -> f64 {
        self.diagonal_m
    }

    /// The relaxed oriented box.
    #[must_use]
    pub fn obb(&self) -> &OrientedBox {
        &self.obb
    }

    /// The relaxed axis-aligned box.
    #[must_use]
    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    /// The unrelaxed bounding sphere.
    #[must_use]
    pub fn sphere(&self) -> &BoundingSphere {
        &self.sphere
    }

    /// Relax margin in meters.
    #[must_use]
    pub fn relax_meters(&self) -> f64 {
        self.relax_meters
    }

    /// Test an oriented tile box against the AOI.
    ///
    /// Cheap AABB rejection first, then the face-normal separating axis test
    /// against the AOI's oriented box.
    #[must_use]
    pub fn intersects_box(&self, tile: &OrientedBox) -> bool {
        if self.aabb.is_disjoint(&tile.aabb()) {
            return false;
        }
        self.obb.intersects(tile)
    }

    /// Test a tile sphere against the AOI sphere grown by the relax margin.
    #[must_use]
    pub fn intersects_sphere(&self, tile: &BoundingSphere) -> bool {
        let relaxed =
            BoundingSphere::new(self.sphere.center, self.sphere.radius + self.relax_meters);
        relaxed.intersects(tile)
    }

    /// Test a geodetic region against the AOI box.
    #[must_use]
    pub fn intersects_region(&self, region: &GeodeticRegion) -> bool {
        !self.aabb.is_disjoint(&region.ecef_aabb())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wgs84_to_ecef;

    /// A roughly 1 km square around a point.
    fn square(lon: f64, lat: f64) -> Vec<GeodeticPoint> {
        let d = 0.0045;
        vec![
            GeodeticPoint::new(lon - d, lat - d, 0.0),
            GeodeticPoint::new(lon + d, lat - d, 0.0),
            GeodeticPoint::new(lon + d, lat + d, 0.0),
            GeodeticPoint::new(lon - d, lat + d, 0.0),
        ]
    }

    fn region_deg(west: f64, south: f64, east: f64, north: f64) -> GeodeticRegion {
        GeodeticRegion {
            west: west.to_radians(),
            south: south.to_radians(),
            east: east.to_radians(),
            north: north.to_radians(),
            min_height: -100.0,
            max_height: 500.0,
        }
    }

    #[test]
    fn test_rejects_empty_ring() {
        assert!(matches!(
            AoiFootprint::from_ring(&[], 0.0),
            Err(GeoError::TooFewPoints { .. })
        ));
    }

    #[test]
    fn test_rejects_negative_relax() {
        assert!(AoiFootprint::from_ring(&square(0.0, 0.0), -1.0).is_err());
    }

    #[test]
    fn test_dimensions() {
        let fp = AoiFootprint::from_ring(&square(10.0, 0.0), 0.0).unwrap();
        // 0.009° at the equator is ~1002 m on the ellipsoid.
        assert!((fp.width_m() - 1002.0).abs() < 5.0, "width {}", fp.width_m());
        assert!((fp.height_m() - 995.0).abs() < 10.0, "height {}", fp.height_m());
        assert!((fp.center().lon_deg - 10.0).abs() < 1e-9);
        assert!(fp.center().lat_deg.abs() < 1e-9);
    }

    #[test]
    fn test_diagonal_ignores_vertical_extent_and_relax() {
        let ring = square(8.55, 47.37);
        let strict = AoiFootprint::from_ring(&ring, 0.0).unwrap();
        let relaxed = AoiFootprint::from_ring(&ring, 500.0).unwrap();

        let points = ring.iter().map(|p| p.to_ecef());
        let expected = Aabb::from_points(points).unwrap().diagonal();
        assert!((strict.diagonal_m() - expected).abs() < 1e-9);
        assert_eq!(strict.diagonal_m(), relaxed.diagonal_m());

        // At least the ground diagonal, far below the ±10 km box.
        let ground = strict.width_m().hypot(strict.height_m());
        assert!(strict.diagonal_m() >= ground - 1.0, "{}", strict.diagonal_m());
        assert!(strict.diagonal_m() < 2.0 * ground, "{}", strict.diagonal_m());
    }

    #[test]
    fn test_region_containing_aoi_intersects() {
        let fp = AoiFootprint::from_ring(&square(8.55, 47.37), 0.0).unwrap();
        assert!(fp.intersects_region(&region_deg(8.0, 47.0, 9.0, 48.0)));
    }

    #[test]
    fn test_far_region_is_disjoint() {
        let fp = AoiFootprint::from_ring(&square(8.55, 47.37), 0.0).unwrap();
        assert!(!fp.intersects_region(&region_deg(-75.0, 40.0, -73.0, 41.0)));
    }

    #[test]
    fn test_global_region_intersects() {
        let fp = AoiFootprint::from_ring(&square(8.55, 47.37), 0.0).unwrap();
        assert!(fp.intersects_region(&region_deg(-180.0, -90.0, 180.0, 90.0)));
    }

    #[test]
    fn test_box_outside_aabb_is_pruned() {
        let fp = AoiFootprint::from_ring(&square(8.55, 47.37), 0.0).unwrap();
        let far = fp.aabb().max + DVec3::splat(1_000.0);
        let tile = OrientedBox::new(far, DVec3::X * 100.0, DVec3::Y * 100.0, DVec3::Z * 100.0);
        assert!(!fp.intersects_box(&tile));
    }

    #[test]
    fn test_box_around_center_intersects() {
        let fp = AoiFootprint::from_ring(&square(8.55, 47.37), 0.0).unwrap();
        let c = wgs84_to_ecef(8.55, 47.37, 0.0);
        let tile = OrientedBox::new(c, DVec3::X * 50.0, DVec3::Y * 50.0, DVec3::Z * 50.0);
        assert!(fp.intersects_box(&tile));
    }

    #[test]
    fn test_relax_reaches_neighbouring_box() {
        let ring = square(8.55, 47.37);
        let strict = AoiFootprint::from_ring(&ring, 0.0).unwrap();
        let relaxed = AoiFootprint::from_ring(&ring, 500.0).unwrap();

        // A small box ~250 m east of the AOI's eastern edge.
        let east = wgs84_to_ecef(8.55 + 0.0045 + 0.0033, 47.37, 0.0);
        let tile = OrientedBox::from_basis(
            east,
            enu_basis(8.5578, 47.37),
            DVec3::new(20.0, 20.0, 20.0),
        );
        assert!(!strict.intersects_box(&tile));
        assert!(relaxed.intersects_box(&tile));
    }

    #[test]
    fn test_sphere_relax() {
        let ring = square(0.0, 0.0);
        let strict = AoiFootprint::from_ring(&ring, 0.0).unwrap();
        let relaxed = AoiFootprint::from_ring(&ring, 1_000.0).unwrap();
        let gap = strict.sphere().radius + 500.0;
        let tile = BoundingSphere::new(strict.sphere().center + DVec3::X * (gap + 10.0), 10.0);
        assert!(!strict.intersects_sphere(&tile));
        assert!(relaxed.intersects_sphere(&tile));
    }
}
