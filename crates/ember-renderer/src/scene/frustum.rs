//! View frustum extraction and classification.
//!
//! Planes are extracted from the rows of `projection * view` using the
//! column-vector convention of glam (`clip = proj * view * world`) and the
//! `[0, 1]` clip-space depth range used by wgpu. Plane normals point into the
//! frustum, so a point is inside when its signed distance is non-negative.

use glam::{Mat4, Vec3, Vec4};

use super::{BoundingBox, TestResult};

/// A plane `normal . p + distance = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    /// Builds a normalized plane from `(a, b, c, d)` coefficients.
    pub fn from_coefficients(v: Vec4) -> Self {
        let normal = v.truncate();
        let len = normal.length();
        if len <= f32::EPSILON {
            return Self {
                normal,
                distance: v.w,
            };
        }
        Self {
            normal: normal / len,
            distance: v.w / len,
        }
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// Index of each plane in [`Frustum::planes`].
pub mod plane_index {
    pub const LEFT: usize = 0;
    pub const RIGHT: usize = 1;
    pub const BOTTOM: usize = 2;
    pub const TOP: usize = 3;
    pub const NEAR: usize = 4;
    pub const FAR: usize = 5;
}

/// Six-plane view frustum.
///
/// Immutable after construction, so one frustum can be shared across threads
/// for parallel culling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    planes: [Plane; 6],
}

impl Frustum {
    /// Extracts the planes of a combined `projection * view` matrix.
    pub fn from_matrix(view_proj: Mat4) -> Self {
        let r0 = view_proj.row(0);
        let r1 = view_proj.row(1);
        let r2 = view_proj.row(2);
        let r3 = view_proj.row(3);

        Self {
            planes: [
                Plane::from_coefficients(r3 + r0),
                Plane::from_coefficients(r3 - r0),
                Plane::from_coefficients(r3 + r1),
                Plane::from_coefficients(r3 - r1),
                Plane::from_coefficients(r2),
                Plane::from_coefficients(r3 - r2),
            ],
        }
    }

    pub fn from_view_projection(view: Mat4, projection: Mat4) -> Self {
        Self::from_matrix(projection * view)
    }

    pub fn planes(&self) -> &[Plane; 6] {
        &self.planes
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|p| p.signed_distance(point) >= 0.0)
    }

    /// Classifies an axis-aligned box.
    ///
    /// For each plane the corner furthest along the normal (p-vertex) decides
    /// whether the box is fully outside; the opposite corner (n-vertex) decides
    /// whether it crosses the plane. An empty box is always outside.
    pub fn test_aabb(&self, aabb: &BoundingBox) -> TestResult {
        if aabb.is_empty() {
            return TestResult::Outside;
        }

        let mut result = TestResult::Inside;

        for plane in &self.planes {
            let n = plane.normal;
            let positive = Vec3::select(n.cmpge(Vec3::ZERO), aabb.max, aabb.min);
            let negative = Vec3::select(n.cmpge(Vec3::ZERO), aabb.min, aabb.max);

            if plane.signed_distance(positive) < 0.0 {
                return TestResult::Outside;
            }
            if plane.signed_distance(negative) < 0.0 {
                result = TestResult::Intersect;
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn frustum() -> Frustum {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 50.0);
        Frustum::from_view_projection(view, proj)
    }

    #[test]
    fn test_planes_are_normalized() {
        for plane in frustum().planes() {
            assert_relative_eq!(plane.normal.length(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_near_and_far_distances() {
        let f = frustum();
        let near = f.planes()[plane_index::NEAR];
        let far = f.planes()[plane_index::FAR];
        // Camera at z = 10 looking down -Z.
        assert_relative_eq!(near.signed_distance(Vec3::new(0.0, 0.0, 9.9)), 0.0, epsilon = 1e-3);
        assert_relative_eq!(far.signed_distance(Vec3::new(0.0, 0.0, -40.0)), 0.0, epsilon = 1e-2);
    }

    #[test]
    fn test_box_inside() {
        let b = BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert_eq!(frustum().test_aabb(&b), TestResult::Inside);
    }

    #[test]
    fn test_box_outside_single_plane() {
        let b = BoundingBox::new(Vec3::new(40.0, -1.0, -1.0), Vec3::new(42.0, 1.0, 1.0));
        assert_eq!(frustum().test_aabb(&b), TestResult::Outside);
    }

    #[test]
    fn test_box_behind_camera() {
        let b = BoundingBox::new(Vec3::new(-1.0, -1.0, 20.0), Vec3::new(1.0, 1.0, 22.0));
        assert_eq!(b.test_frustum(&frustum()), TestResult::Outside);
    }

    #[test]
    fn test_box_straddling_left_plane() {
        // Half-width of the view at the origin is tan(30deg) * 10 ~ 5.77.
        let b = BoundingBox::new(Vec3::new(-7.0, -1.0, -1.0), Vec3::new(-4.0, 1.0, 1.0));
        let result = frustum().test_aabb(&b);
        assert_eq!(result, TestResult::Intersect);
        assert!(result.is_visible());
    }

    #[test]
    fn test_box_straddling_far_plane() {
        let b = BoundingBox::new(Vec3::new(-1.0, -1.0, -45.0), Vec3::new(1.0, 1.0, -35.0));
        assert_eq!(frustum().test_aabb(&b), TestResult::Intersect);
    }

    #[test]
    fn test_box_enclosing_frustum_intersects() {
        let b = BoundingBox::new(Vec3::splat(-100.0), Vec3::splat(100.0));
        assert_eq!(frustum().test_aabb(&b), TestResult::Intersect);
    }

    #[test]
    fn test_empty_box_is_outside() {
        let f = frustum();
        assert_eq!(f.test_aabb(&BoundingBox::empty()), TestResult::Outside);
        assert_eq!(BoundingBox::empty().test_frustum(&f), TestResult::Outside);
        assert!(!BoundingBox::empty().transform(&Mat4::from_scale(Vec3::splat(2.0))).test_frustum(&f).is_visible());
    }

    #[test]
    fn test_contains_point() {
        let f = frustum();
        assert!(f.contains_point(Vec3::ZERO));
        assert!(!f.contains_point(Vec3::new(0.0, 0.0, 11.0)));
    }
}
