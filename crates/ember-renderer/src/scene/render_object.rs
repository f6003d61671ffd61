//! Render object definition.

use glam::{Mat4, Quat, Vec3};
use uuid::Uuid;

use super::BoundingBox;
use crate::resources::MeshHandle;

/// A renderable object in the scene.
///
/// The transform is stored as translation, rotation and scale; every setter
/// recomputes the cached world-space bounds so culling always sees the
/// current placement.
#[derive(Debug, Clone)]
pub struct RenderObject {
    /// Unique identifier for this object.
    pub id: Uuid,

    /// Display name.
    pub name: String,

    /// Meshes drawn for this object, in order.
    pub meshes: Vec<MeshHandle>,

    /// Whether this object is visible.
    pub visible: bool,

    /// Whether this object is selected.
    pub selected: bool,

    translation: Vec3,
    rotation: Quat,
    scale: Vec3,
    local_bounds: BoundingBox,
    world_bounds: BoundingBox,
}

impl RenderObject {
    /// Creates a new render object at the origin.
    pub fn new(name: impl Into<String>, meshes: Vec<MeshHandle>, local_bounds: BoundingBox) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            meshes,
            visible: true,
            selected: false,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            local_bounds,
            world_bounds: local_bounds,
        }
    }

    /// Sets the translation.
    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.set_translation(translation);
        self
    }

    /// Sets the rotation.
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.set_rotation(rotation);
        self
    }

    /// Sets the scale.
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.set_scale(scale);
        self
    }

    /// Sets the visibility.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_translation(&mut self, translation: Vec3) {
        self.translation = translation;
        self.update_world_bounds();
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation.normalize();
        self.update_world_bounds();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.update_world_bounds();
    }

    /// Replaces the mesh-space bounds (e.g. after the mesh list changed).
    pub fn set_local_bounds(&mut self, bounds: BoundingBox) {
        self.local_bounds = bounds;
        self.update_world_bounds();
    }

    /// Returns the world transform matrix.
    pub fn transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Mesh-space bounding box.
    pub fn local_bounds(&self) -> BoundingBox {
        self.local_bounds
    }

    /// World-space bounding box for the current transform.
    pub fn world_bounds(&self) -> BoundingBox {
        self.world_bounds
    }

    fn update_world_bounds(&mut self) {
        self.world_bounds = self.local_bounds.transform(&self.transform());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube() -> RenderObject {
        RenderObject::new(
            "cube",
            Vec::new(),
            BoundingBox::new(Vec3::splat(-0.5), Vec3::splat(0.5)),
        )
    }

    #[test]
    fn test_world_bounds_follow_translation() {
        let mut obj = cube();
        assert_eq!(obj.world_bounds().center(), Vec3::ZERO);

        obj.set_translation(Vec3::new(3.0, 0.0, 0.0));
        assert_eq!(obj.world_bounds().center(), Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn test_world_bounds_follow_scale() {
        let obj = cube().with_scale(Vec3::splat(4.0));
        assert_eq!(obj.world_bounds().half_extents(), Vec3::splat(2.0));
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(cube().id, cube().id);
    }
}
