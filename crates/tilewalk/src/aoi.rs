//! Areas of interest.

use glam::DVec3;
use tilewalk_geo::{AoiFootprint, GeodeticPoint, LocalFrame, densify};

use crate::error::{Error, Result};

/// Longest boundary chord kept before the ring is summarized.
pub const AOI_DENSIFY_CHORD_METERS: f64 = 50.0;

/// The boundary that traversal is restricted to, as a closed geodetic ring.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaOfInterest {
    ring: Vec<GeodeticPoint>,
}

impl AreaOfInterest {
    /// Create an area from a geodetic ring.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for fewer than three points or non-finite
    /// coordinates.
    pub fn from_geodetic(ring: Vec<GeodeticPoint>) -> Result<Self> {
        if ring.len() < 3 {
            return Err(Error::Config {
                context: "area of interest",
                detail: format!("a boundary needs at least 3 points, got {}", ring.len()),
            });
        }
        if ring
            .iter()
            .any(|p| !(p.lon_deg.is_finite() && p.lat_deg.is_finite() && p.height_m.is_finite()))
        {
            return Err(Error::Config {
                context: "area of interest",
                detail: "boundary has non-finite coordinates".to_string(),
            });
        }
        Ok(Self { ring })
    }

    /// Create an area from a boundary in a local model frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the model has no geo-reference or the
    /// boundary is too short.
    pub fn from_local(frame: Option<&LocalFrame>, ring: &[DVec3]) -> Result<Self> {
        let Some(frame) = frame else {
            return Err(Error::Config {
                context: "area of interest",
                detail: "the boundary is not geo-referenced".to_string(),
            });
        };
        Self::from_geodetic(ring.iter().map(|p| frame.to_geodetic(*p)).collect())
    }

    /// Create a rectangular area from bounds in degrees.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for non-finite bounds.
    pub fn from_bounds(west: f64, south: f64, east: f64, north: f64) -> Result<Self> {
        Self::from_geodetic(vec![
            GeodeticPoint::new(west, south, 0.0),
            GeodeticPoint::new(east, south, 0.0),
            GeodeticPoint::new(east, north, 0.0),
            GeodeticPoint::new(west, north, 0.0),
        ])
    }

    /// The boundary as given.
    #[must_use]
    pub fn ring(&self) -> &[GeodeticPoint] {
        &self.ring
    }

    /// Densify the boundary and summarize it for intersection tests.
    ///
    /// # Errors
    ///
    /// Returns an error if `relax_meters` is negative or not finite.
    pub fn footprint(&self, relax_meters: f64) -> Result<AoiFootprint> {
        let dense = densify(&self.ring, AOI_DENSIFY_CHORD_METERS)?;
        Ok(AoiFootprint::from_ring(&dense, relax_meters)?)
    }
}
