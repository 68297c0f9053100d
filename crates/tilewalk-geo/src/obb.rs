//! Oriented bounding boxes and the face-normal separating axis test.

use glam::{DMat3, DVec3};

use crate::bounds::Aabb;

/// An oriented bounding box.
///
/// The columns of `half_axes` are the box's half-axis vectors: their
/// directions are the box orientation and their lengths are the half
/// extents. This is the layout tileset documents use for `box` volumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    /// Center of the box.
    pub center: DVec3,
    /// Half-axis vectors as matrix columns.
    pub half_axes: DMat3,
}

impl OrientedBox {
    /// Create a box from a center and three half-axis vectors.
    #[must_use]
    pub fn new(center: DVec3, x_axis: DVec3, y_axis: DVec3, z_axis: DVec3) -> Self {
        Self {
            center,
            half_axes: DMat3::from_cols(x_axis, y_axis, z_axis),
        }
    }

    /// Create a box from the 12 numbers of a tileset `box` volume:
    /// center, then the x, y and z half-axis vectors.
    #[must_use]
    pub fn from_array(values: &[f64; 12]) -> Self {
        Self::new(
            DVec3::new(values[0], values[1], values[2]),
            DVec3::new(values[3], values[4], values[5]),
            DVec3::new(values[6], values[7], values[8]),
            DVec3::new(values[9], values[10], values[11]),
        )
    }

    /// Create a box from an orthonormal basis and half extents along it.
    #[must_use]
    pub fn from_basis(center: DVec3, basis: DMat3, half_extents: DVec3) -> Self {
        Self::new(
            center,
            basis.col(0) * half_extents.x,
            basis.col(1) * half_extents.y,
            basis.col(2) * half_extents.z,
        )
    }

    /// The eight corners of the box.
    #[must_use]
    pub fn corners(&self) -> [DVec3; 8] {
        let x = self.half_axes.col(0);
        let y = self.half_axes.col(1);
        let z = self.half_axes.col(2);
        let c = self.center;
        [
            c - x - y - z,
            c + x - y - z,
            c - x + y - z,
            c + x + y - z,
            c - x - y + z,
            c + x - y + z,
            c - x + y + z,
            c + x + y + z,
        ]
    }

    /// Axis-aligned box enclosing this box.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        let extent = self.half_axes.col(0).abs()
            + self.half_axes.col(1).abs()
            + self.half_axes.col(2).abs();
        Aabb::new(self.center - extent, self.center + extent)
    }

    /// Unit face normals of the box.
    ///
    /// A zero-length half axis (a flat box) takes its normal from the cross
    /// product of the other two. Axes that cannot be recovered are skipped.
    fn face_normals(&self) -> impl Iterator<Item = DVec3> + '_ {
        (0..3).filter_map(move |i| {
            let axis = self.half_axes.col(i);
            axis.try_normalize().or_else(|| {
                let a = self.half_axes.col((i + 1) % 3);
                let b = self.half_axes.col((i + 2) % 3);
                a.cross(b).try_normalize()
            })
        })
    }

    /// Separating axis test over the six face normals of both boxes.
    ///
    /// This is a broad-phase check: the nine edge-edge cross axes of the full
    /// test are not tried, so a few edge-grazing configurations report an
    /// overlap that does not exist. It never reports a gap that does not
    /// exist along the axes it checks.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        let ours = self.corners();
        let theirs = other.corners();

        !self
            .face_normals()
            .chain(other.face_normals())
            .any(|axis| {
                let (a_min, a_max) = project(&ours, axis);
                let (b_min, b_max) = project(&theirs, axis);
                a_max < b_min || b_max < a_min
            })
    }
}

/// Project points onto an axis, returning the covered interval.
fn project(points: &[DVec3; 8], axis: DVec3) -> (f64, f64) {
    points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        let d = p.dot(axis);
        (lo.min(d), hi.max(d))
    })
}
