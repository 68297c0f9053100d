//! Ellipsoidal coordinate conversions and intersection primitives for
//! geo-referenced tilesets.
//!
//! This crate provides pure synchronous geometry: WGS84 ↔ ECEF conversion,
//! great-circle distance and ring densification, local model frames, and the
//! broad-phase intersection tests used to prune tile trees against an area of
//! interest.
//!
//! # Design principles
//!
//! - **Synchronous**: No async, no I/O
//! - **Precomputed footprints**: The area of interest is converted to ECEF once
//!   ([`AoiFootprint`]) and reused for every bounding volume test
//! - **Broad phase only**: Tests may over-include, never under-include

mod bounds;
mod ellipsoid;
mod error;
mod footprint;
mod frame;
mod geodesic;
mod obb;

pub use bounds::{Aabb, BoundingSphere, GeodeticRegion};
pub use ellipsoid::{
    ECCENTRICITY_SQUARED, FLATTENING, SEMI_MAJOR_AXIS, SEMI_MINOR_AXIS, ecef_to_wgs84,
    enu_basis, wgs84_to_ecef,
};
pub use error::{GeoError, GeoResult};
pub use footprint::{AOI_VERTICAL_HALF_EXTENT, AoiFootprint};
pub use frame::LocalFrame;
pub use geodesic::{MEAN_EARTH_RADIUS, densify, geodesic_distance_meters};
pub use obb::OrientedBox;

/// A point on (or above) the WGS84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeodeticPoint {
    /// Longitude in degrees, positive east.
    pub lon_deg: f64,
    /// Latitude in degrees, positive north.
    pub lat_deg: f64,
    /// Height above the ellipsoid in meters.
    pub height_m: f64,
}

impl GeodeticPoint {
    /// Create a new geodetic point.
    #[must_use]
    pub const fn new(lon_deg: f64, lat_deg: f64, height_m: f64) -> Self {
        Self {
            lon_deg,
            lat_deg,
            height_m,
        }
    }

    /// Convert to Earth-centered, Earth-fixed coordinates.
    #[must_use]
    pub fn to_ecef(self) -> glam::DVec3 {
        wgs84_to_ecef(self.lon_deg, self.lat_deg, self.height_m)
    }

    pub(crate) fn is_finite(self) -> bool {
        self.lon_deg.is_finite() && self.lat_deg.is_finite() && self.height_m.is_finite()
    }
}
