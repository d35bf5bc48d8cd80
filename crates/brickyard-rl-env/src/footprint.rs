//! Oriented footprints of objects on the table plane.
//!
//! Overlap uses the Separating Axis Theorem on the rotated rectangles.

use nalgebra::{Point2, Vector2};

use crate::scene::{ObjectKind, ObjectState};

/// Corners of an oriented rectangle, counter-clockwise
pub type Corners = [Point2<f64>; 4];

/// Oriented rectangle on the table plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    /// Center
    pub center: Point2<f64>,
    /// Half width along the local x axis
    pub half_x: f64,
    /// Half length along the local y axis
    pub half_y: f64,
    /// Rotation about the vertical axis
    pub yaw: f64,
}

impl Footprint {
    /// Footprint of a kind placed at `center` with `yaw`
    #[must_use]
    pub fn of_kind(kind: ObjectKind, center: Point2<f64>, yaw: f64, unit: f64, scale: f64) -> Self {
        let (hx, hy) = kind.half_extents();
        Self {
            center,
            half_x: hx * unit * scale,
            half_y: hy * unit * scale,
            yaw,
        }
    }

    /// Footprint of a live object
    #[must_use]
    pub fn of_object(object: &ObjectState, unit: f64) -> Self {
        Self::of_kind(object.kind, object.xy(), object.yaw(), unit, object.scale)
    }

    /// Same rectangle grown by `margin` on every side
    #[must_use]
    pub fn inflated(&self, margin: f64) -> Self {
        Self {
            half_x: self.half_x + margin,
            half_y: self.half_y + margin,
            ..*self
        }
    }

    /// Corner points
    #[must_use]
    pub fn corners(&self) -> Corners {
        const SIGNS: [(f64, f64); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
        let (sin_r, cos_r) = self.yaw.sin_cos();
        SIGNS.map(|(sx, sy)| {
            let lx = sx * self.half_x;
            let ly = sy * self.half_y;
            Point2::new(
                self.center.x + lx * cos_r - ly * sin_r,
                self.center.y + lx * sin_r + ly * cos_r,
            )
        })
    }

    /// Whether `point` lies inside, with `margin` of slack
    #[must_use]
    pub fn contains(&self, point: &Point2<f64>, margin: f64) -> bool {
        let local = self.to_local(point);
        local.x.abs() <= self.half_x + margin && local.y.abs() <= self.half_y + margin
    }

    /// Offset of `point` expressed in this rectangle's frame
    #[must_use]
    pub fn to_local(&self, point: &Point2<f64>) -> Vector2<f64> {
        let d = point - self.center;
        let (sin_r, cos_r) = self.yaw.sin_cos();
        Vector2::new(d.x * cos_r + d.y * sin_r, -d.x * sin_r + d.y * cos_r)
    }

    /// True if the interiors overlap; touching edges do not count
    #[must_use]
    pub fn overlaps(&self, other: &Footprint) -> bool {
        corners_overlap(&self.corners(), &other.corners())
    }
}

fn project(corners: &Corners, axis: &Vector2<f64>) -> (f64, f64) {
    corners.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
        let dot = c.coords.dot(axis);
        (lo.min(dot), hi.max(dot))
    })
}

/// Separating axis test over the edge normals of both rectangles
#[must_use]
pub fn corners_overlap(a: &Corners, b: &Corners) -> bool {
    for corners in [a, b] {
        // Opposite edges are parallel, two normals per rectangle suffice.
        for i in 0..2 {
            let edge = corners[i + 1] - corners[i];
            let axis = Vector2::new(-edge.y, edge.x);
            let (min_a, max_a) = project(a, &axis);
            let (min_b, max_b) = project(b, &axis);
            if max_a <= min_b || max_b <= min_a {
                return false;
            }
        }
    }
    true
}
