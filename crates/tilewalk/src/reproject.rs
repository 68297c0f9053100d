//! Reprojection of tile vertices into a local model frame.
//!
//! Tile payloads store positions in glTF's Y-up convention, usually relative
//! to a center given by the tile's `RTC_CENTER`. ECEF is Z-up, so positions
//! are rotated before the offset is applied.

use glam::{DVec3, Vec3};
use tilewalk_geo::LocalFrame;

/// Converts tile vertex positions to local model coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshReprojector {
    frame: LocalFrame,
    rtc_center: DVec3,
    y_up: bool,
}

impl MeshReprojector {
    /// Reproject into `frame`, with no center offset and Y-up input.
    #[must_use]
    pub fn new(frame: LocalFrame) -> Self {
        Self {
            frame,
            rtc_center: DVec3::ZERO,
            y_up: true,
        }
    }

    /// ECEF offset added to every position.
    #[must_use]
    pub fn with_rtc_center(mut self, rtc_center: DVec3) -> Self {
        self.rtc_center = rtc_center;
        self
    }

    /// Whether input positions are Y-up.
    #[must_use]
    pub fn with_y_up(mut self, y_up: bool) -> Self {
        self.y_up = y_up;
        self
    }

    #[must_use]
    pub fn frame(&self) -> &LocalFrame {
        &self.frame
    }

    /// ECEF position of a tile vertex.
    #[must_use]
    pub fn to_ecef(&self, position: DVec3) -> DVec3 {
        let z_up = if self.y_up {
            DVec3::new(position.x, -position.z, position.y)
        } else {
            position
        };
        z_up + self.rtc_center
    }

    /// Local model position of a tile vertex.
    #[must_use]
    pub fn to_local(&self, position: DVec3) -> DVec3 {
        self.frame.from_ecef(self.to_ecef(position))
    }

    /// Reproject a vertex buffer.
    #[must_use]
    pub fn reproject(&self, positions: &[Vec3]) -> Vec<DVec3> {
        positions
            .iter()
            .map(|p| self.to_local(p.as_dvec3()))
            .collect()
    }

    /// Reproject positions stored as double precision, in place.
    pub fn reproject_in_place(&self, positions: &mut [DVec3]) {
        for p in positions {
            *p = self.to_local(*p);
        }
    }
}
