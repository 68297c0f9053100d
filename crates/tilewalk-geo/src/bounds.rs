//! Axis-aligned boxes, spheres and geodetic regions.

use std::f64::consts::{FRAC_PI_4, TAU};

use glam::DVec3;

use crate::ellipsoid::{SEMI_MAJOR_AXIS, wgs84_to_ecef};

/// Meters per degree of latitude used by the equirectangular size estimate.
const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Widest angular gap between region samples before extra samples are added.
const MAX_SAMPLE_SPACING: f64 = FRAC_PI_4;

/// An axis-aligned bounding box in ECEF.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: DVec3,
    /// Maximum corner.
    pub max: DVec3,
}

impl Aabb {
    /// Create a box from its corners.
    #[must_use]
    pub const fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point. Returns `None` for no points.
    pub fn from_points<I: IntoIterator<Item = DVec3>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self::new(first, first), |acc, p| Self {
            min: acc.min.min(p),
            max: acc.max.max(p),
        }))
    }

    /// Grow the box by `margin` meters on every side.
    #[must_use]
    pub fn expanded(self, margin: f64) -> Self {
        Self {
            min: self.min - DVec3::splat(margin),
            max: self.max + DVec3::splat(margin),
        }
    }

    /// Center of the box.
    #[must_use]
    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Length of the space diagonal.
    #[must_use]
    pub fn diagonal(&self) -> f64 {
        (self.max - self.min).length()
    }

    /// True if the boxes share no volume on at least one axis.
    #[must_use]
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.max.x < other.min.x
            || other.max.x < self.min.x
            || self.max.y < other.min.y
            || other.max.y < self.min.y
            || self.max.z < other.min.z
            || other.max.z < self.min.z
    }
}

/// A bounding sphere in ECEF.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// Center in meters.
    pub center: DVec3,
    /// Radius in meters.
    pub radius: f64,
}

impl BoundingSphere {
    /// Create a new sphere.
    #[must_use]
    pub const fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// True if the spheres touch or overlap.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.center.distance(other.center) <= self.radius + other.radius
    }
}

/// A geodetic region: longitude/latitude bounds in radians plus a height
/// range in meters.
///
/// `east < west` describes a region crossing the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeodeticRegion {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
    pub min_height: f64,
    pub max_height: f64,
}

impl GeodeticRegion {
    /// Create a region from the six values used by tileset documents.
    #[must_use]
    pub const fn from_array(values: [f64; 6]) -> Self {
        Self {
            west: values[0],
            south: values[1],
            east: values[2],
            north: values[3],
            min_height: values[4],
            max_height: values[5],
        }
    }

    /// Longitude span in radians, accounting for antimeridian crossing.
    #[must_use]
    pub fn lon_span(&self) -> f64 {
        if self.east >= self.west {
            self.east - self.west
        } else {
            self.east - self.west + TAU
        }
    }

    /// Latitude span in radians.
    #[must_use]
    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    /// Approximate width and height in meters.
    ///
    /// Equirectangular estimate evaluated at the region's mean latitude.
    #[must_use]
    pub fn size_meters(&self) -> (f64, f64) {
        let mean_lat = 0.5 * (self.south + self.north);
        let meters_per_degree_lon = METERS_PER_DEGREE_LAT * mean_lat.cos();
        let width = self.lon_span().to_degrees() * meters_per_degree_lon;
        let height = self.lat_span().to_degrees() * METERS_PER_DEGREE_LAT;
        (width.abs(), height.abs())
    }

    /// ECEF box enclosing the region.
    ///
    /// Ordinary regions use their eight corners (four lon/lat corners at both
    /// heights). Wide regions are sampled on a lattice no coarser than 45°.
    /// The result is grown by the sagitta of one lattice cell so the surface
    /// bulging between samples stays inside.
    #[must_use]
    pub fn ecef_aabb(&self) -> Aabb {
        let lon_span = self.lon_span();
        let lat_span = self.lat_span();
        let lon_steps = sample_steps(lon_span);
        let lat_steps = sample_steps(lat_span);

        #[allow(clippy::cast_precision_loss)]
        let lon_step = lon_span / lon_steps as f64;
        #[allow(clippy::cast_precision_loss)]
        let lat_step = lat_span / lat_steps as f64;

        let mut points = Vec::with_capacity(2 * (lon_steps + 1) * (lat_steps + 1));
        for i in 0..=lon_steps {
            #[allow(clippy::cast_precision_loss)]
            let lon = (self.west + lon_step * i as f64).to_degrees();
            for j in 0..=lat_steps {
                #[allow(clippy::cast_precision_loss)]
                let lat = (self.south + lat_step * j as f64).to_degrees();
                points.push(wgs84_to_ecef(lon, lat, self.min_height));
                points.push(wgs84_to_ecef(lon, lat, self.max_height));
            }
        }

        let cell = lon_step.hypot(lat_step);
        let sagitta = (SEMI_MAJOR_AXIS + self.max_height.max(0.0)) * (1.0 - (0.5 * cell).cos());

        // The lattice always has at least four points, so this never falls back.
        Aabb::from_points(points)
            .unwrap_or(Aabb::new(DVec3::ZERO, DVec3::ZERO))
            .expanded(sagitta)
    }
}

fn sample_steps(span: f64) -> usize {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let steps = (span.abs() / MAX_SAMPLE_SPACING).ceil() as usize;
    steps.max(1)
}
