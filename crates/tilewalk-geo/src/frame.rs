//! Local Cartesian model frames anchored to the ellipsoid.

use glam::{DMat3, DVec3};

use crate::GeodeticPoint;
use crate::ellipsoid::{ecef_to_wgs84, enu_basis};
use crate::error::{GeoError, GeoResult};

/// A geo-referenced local model frame.
///
/// Model coordinates are `(x, y, z)` in model units. The frame sits on the
/// tangent plane at `origin`: `z` is up, and `+y` points `heading_deg`
/// degrees clockwise from true north (so a heading of 0 makes `+x` east and
/// `+y` north).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    origin: GeodeticPoint,
    meters_per_unit: f64,
    heading_deg: f64,
    origin_ecef: DVec3,
    basis: DMat3,
}

impl LocalFrame {
    /// Create a frame in meters with `+y` pointing north.
    #[must_use]
    pub fn at(origin: GeodeticPoint) -> Self {
        Self {
            origin,
            meters_per_unit: 1.0,
            heading_deg: 0.0,
            origin_ecef: origin.to_ecef(),
            basis: enu_basis(origin.lon_deg, origin.lat_deg),
        }
    }

    /// Create a frame with a unit scale and heading.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is non-finite or the scale is not
    /// positive.
    pub fn new(origin: GeodeticPoint, meters_per_unit: f64, heading_deg: f64) -> GeoResult<Self> {
        if !origin.is_finite() || !heading_deg.is_finite() {
            return Err(GeoError::NonFinite {
                context: "local frame",
            });
        }
        if !(meters_per_unit.is_finite() && meters_per_unit > 0.0) {
            return Err(GeoError::InvalidParameter {
                context: "meters per unit",
                detail: format!("expected a positive scale, got {meters_per_unit}"),
            });
        }

        Ok(Self {
            meters_per_unit,
            heading_deg,
            ..Self::at(origin)
        })
    }

    /// The geodetic anchor of the frame.
    #[must_use]
    pub fn origin(&self) -> GeodeticPoint {
        self.origin
    }

    /// Meters per model unit.
    #[must_use]
    pub fn meters_per_unit(&self) -> f64 {
        self.meters_per_unit
    }

    /// Heading of `+y` from true north, clockwise, in degrees.
    #[must_use]
    pub fn heading_deg(&self) -> f64 {
        self.heading_deg
    }

    /// Model coordinates to an east/north/up offset in meters.
    fn model_to_enu(&self, local: DVec3) -> DVec3 {
        let (sin_h, cos_h) = self.heading_deg.to_radians().sin_cos();
        let m = local * self.meters_per_unit;
        DVec3::new(
            m.x * cos_h + m.y * sin_h,
            -m.x * sin_h + m.y * cos_h,
            m.z,
        )
    }

    fn enu_to_model(&self, enu: DVec3) -> DVec3 {
        let (sin_h, cos_h) = self.heading_deg.to_radians().sin_cos();
        DVec3::new(
            enu.x * cos_h - enu.y * sin_h,
            enu.x * sin_h + enu.y * cos_h,
            enu.z,
        ) / self.meters_per_unit
    }

    /// Model coordinates to ECEF.
    #[must_use]
    pub fn to_ecef(&self, local: DVec3) -> DVec3 {
        self.origin_ecef + self.basis * self.model_to_enu(local)
    }

    /// ECEF to model coordinates.
    #[must_use]
    #[allow(clippy::wrong_self_convention)]
    pub fn from_ecef(&self, ecef: DVec3) -> DVec3 {
        let enu = self.basis.transpose() * (ecef - self.origin_ecef);
        self.enu_to_model(enu)
    }

    /// Model coordinates to geodetic coordinates.
    #[must_use]
    pub fn to_geodetic(&self, local: DVec3) -> GeodeticPoint {
        ecef_to_wgs84(self.to_ecef(local))
    }
}
