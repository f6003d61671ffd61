//! Scene management for renderable objects and lights.
//!
//! The scene keeps objects in insertion order; culling and drawing both walk
//! that order so frames are deterministic.

mod bounds;
mod frustum;
mod render_object;

pub use bounds::*;
pub use frustum::*;
pub use render_object::*;

use uuid::Uuid;

use crate::light::{DirectionalLight, PointLight};

/// Scene containing all renderable objects and lights.
pub struct Scene {
    objects: Vec<RenderObject>,
    point_lights: Vec<PointLight>,
    directional_lights: Vec<DirectionalLight>,
    selected: Option<Uuid>,
}

impl Scene {
    /// Creates a new empty scene.
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            point_lights: Vec::new(),
            directional_lights: Vec::new(),
            selected: None,
        }
    }

    /// Adds an object to the end of the scene.
    pub fn add_object(&mut self, object: RenderObject) -> Uuid {
        let id = object.id;
        self.objects.push(object);
        id
    }

    fn position(&self, id: Uuid) -> Option<usize> {
        self.objects.iter().position(|o| o.id == id)
    }

    /// Gets an object by ID.
    pub fn get_object(&self, id: Uuid) -> Option<&RenderObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    /// Gets a mutable reference to an object by ID.
    pub fn get_object_mut(&mut self, id: Uuid) -> Option<&mut RenderObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    /// Removes an object, keeping the order of the remaining objects.
    pub fn remove_object(&mut self, id: Uuid) -> Option<RenderObject> {
        if self.selected == Some(id) {
            self.selected = None;
        }
        let index = self.position(id)?;
        Some(self.objects.remove(index))
    }

    /// Returns true if the scene contains an object with the given ID.
    pub fn contains(&self, id: Uuid) -> bool {
        self.position(id).is_some()
    }

    /// Returns the number of objects in the scene.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if the scene has no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Clears all objects and lights.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.point_lights.clear();
        self.directional_lights.clear();
        self.selected = None;
    }

    /// All objects in insertion order.
    pub fn objects(&self) -> &[RenderObject] {
        &self.objects
    }

    pub fn add_point_light(&mut self, light: PointLight) {
        self.point_lights.push(light);
    }

    pub fn point_lights(&self) -> &[PointLight] {
        &self.point_lights
    }

    pub fn point_lights_mut(&mut self) -> &mut [PointLight] {
        &mut self.point_lights
    }

    pub fn add_directional_light(&mut self, light: DirectionalLight) {
        self.directional_lights.push(light);
    }

    pub fn directional_lights(&self) -> &[DirectionalLight] {
        &self.directional_lights
    }

    pub fn directional_lights_mut(&mut self) -> &mut [DirectionalLight] {
        &mut self.directional_lights
    }

    /// The shadow-casting light, if any.
    pub fn primary_directional_light(&self) -> Option<&DirectionalLight> {
        self.directional_lights.first()
    }

    /// The point light that casts omnidirectional shadows, if any.
    pub fn shadow_casting_point_light(&self) -> Option<&PointLight> {
        self.point_lights.first()
    }

    /// Gets the currently selected object ID.
    pub fn selected(&self) -> Option<Uuid> {
        self.selected
    }

    /// Sets the selected object.
    pub fn set_selected(&mut self, id: Option<Uuid>) {
        for obj in &mut self.objects {
            obj.selected = Some(obj.id) == id;
        }
        self.selected = id.filter(|id| self.objects.iter().any(|o| o.id == *id));
    }

    /// Gets the selected object.
    pub fn selected_object(&self) -> Option<&RenderObject> {
        self.selected.and_then(|id| self.get_object(id))
    }

    /// Computes the world bounding box of all visible objects.
    pub fn compute_bounds(&self) -> Option<BoundingBox> {
        self.objects
            .iter()
            .filter(|obj| obj.visible)
            .map(|obj| obj.world_bounds())
            .filter(|bounds| !bounds.is_empty())
            .reduce(|acc, b| acc.union(&b))
    }

    /// Returns the nearest visible object hit by `ray`.
    pub fn pick(&self, ray: &Ray) -> Option<Uuid> {
        self.objects
            .iter()
            .filter(|obj| obj.visible)
            .filter_map(|obj| obj.world_bounds().intersect_ray(ray).map(|t| (t, obj.id)))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, id)| id)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn cube_at(name: &str, x: f32) -> RenderObject {
        RenderObject::new(
            name,
            Vec::new(),
            BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0)),
        )
        .with_translation(Vec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn test_objects_keep_insertion_order() {
        let mut scene = Scene::new();
        for (i, name) in ["c", "a", "b"].iter().enumerate() {
            scene.add_object(cube_at(name, i as f32));
        }
        let names: Vec<&str> = scene.objects().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_remove_preserves_order() {
        let mut scene = Scene::new();
        scene.add_object(cube_at("a", 0.0));
        let b = scene.add_object(cube_at("b", 1.0));
        scene.add_object(cube_at("c", 2.0));

        assert!(scene.remove_object(b).is_some());
        assert!(!scene.contains(b));
        let names: Vec<&str> = scene.objects().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_selection() {
        let mut scene = Scene::new();
        let a = scene.add_object(cube_at("a", 0.0));
        let b = scene.add_object(cube_at("b", 5.0));

        scene.set_selected(Some(a));
        scene.set_selected(Some(b));
        assert_eq!(scene.selected(), Some(b));
        assert!(!scene.get_object(a).unwrap().selected);
        assert!(scene.selected_object().unwrap().selected);

        scene.remove_object(b);
        assert_eq!(scene.selected(), None);
    }

    #[test]
    fn test_compute_bounds_skips_hidden() {
        let mut scene = Scene::new();
        assert!(scene.compute_bounds().is_none());

        scene.add_object(cube_at("a", 0.0));
        scene.add_object(cube_at("hidden", 100.0).with_visible(false));
        let bounds = scene.compute_bounds().unwrap();
        assert_eq!(bounds.max.x, 1.0);
    }

    #[test]
    fn test_compute_bounds_skips_empty() {
        let mut scene = Scene::new();
        scene.add_object(RenderObject::new("no meshes", Vec::new(), BoundingBox::empty()));
        assert!(scene.compute_bounds().is_none());

        scene.add_object(cube_at("a", 2.0));
        let bounds = scene.compute_bounds().unwrap();
        assert_eq!(bounds.min.x, 1.0);
        assert_eq!(bounds.max.x, 3.0);
    }

    #[test]
    fn test_pick_returns_nearest() {
        let mut scene = Scene::new();
        let far = scene.add_object(cube_at("far", 0.0).with_translation(Vec3::new(0.0, 0.0, -10.0)));
        let near = scene.add_object(cube_at("near", 0.0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);

        assert_eq!(scene.pick(&ray), Some(near));
        scene.get_object_mut(near).unwrap().visible = false;
        assert_eq!(scene.pick(&ray), Some(far));
    }

    #[test]
    fn test_primary_directional_light() {
        let mut scene = Scene::new();
        assert!(scene.primary_directional_light().is_none());
        scene.add_directional_light(DirectionalLight::new(Vec3::Y, Vec3::ONE));
        scene.add_directional_light(DirectionalLight::new(Vec3::X, Vec3::ONE));
        assert_eq!(scene.primary_directional_light().unwrap().direction, Vec3::Y);
    }

    #[test]
    fn test_shadow_casting_point_light_is_first() {
        let mut scene = Scene::new();
        assert!(scene.shadow_casting_point_light().is_none());
        scene.add_point_light(PointLight::new(Vec3::Y, Vec3::ONE));
        scene.add_point_light(PointLight::new(Vec3::X, Vec3::ONE));
        assert_eq!(scene.shadow_casting_point_light().unwrap().position, Vec3::Y);
    }
}
