//! View-frustum visibility culling.

use glam::Mat4;

use crate::scene::{Frustum, RenderObject};

/// Objects that passed culling this frame, in scene order.
///
/// Holds borrowed references only and is rebuilt every frame.
#[derive(Debug, Default)]
pub struct RenderList<'s> {
    entries: Vec<&'s RenderObject>,
    tested: usize,
}

impl<'s> RenderList<'s> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            tested: 0,
        }
    }

    /// Every object in `objects`, unculled.
    pub fn from_objects(objects: &'s [RenderObject]) -> Self {
        Self {
            entries: objects.iter().collect(),
            tested: objects.len(),
        }
    }

    pub fn entries(&self) -> &[&'s RenderObject] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &'s RenderObject> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of objects tested to build this list.
    pub fn tested(&self) -> usize {
        self.tested
    }

    pub fn culled(&self) -> usize {
        self.tested - self.entries.len()
    }
}

/// Builds render lists by testing each object's world bounds against a frustum.
#[derive(Debug, Default, Clone, Copy)]
pub struct VisibilityCuller;

impl VisibilityCuller {
    pub fn new() -> Self {
        Self
    }

    /// Frustum of a camera's view and projection matrices.
    pub fn frustum(view: Mat4, projection: Mat4) -> Frustum {
        Frustum::from_view_projection(view, projection)
    }

    /// Keeps visible objects that are inside or intersecting the frustum.
    pub fn cull<'s>(&self, objects: &'s [RenderObject], frustum: &Frustum) -> RenderList<'s> {
        let entries: Vec<&RenderObject> = objects
            .iter()
            .filter(|object| is_visible(object, frustum))
            .collect();

        tracing::trace!(tested = objects.len(), visible = entries.len(), "Culled scene");
        RenderList {
            entries,
            tested: objects.len(),
        }
    }

    /// Same result as [`VisibilityCuller::cull`], splitting the objects into
    /// contiguous chunks tested on `workers` scoped threads.
    pub fn cull_parallel<'s>(
        &self,
        objects: &'s [RenderObject],
        frustum: &Frustum,
        workers: usize,
    ) -> RenderList<'s> {
        let workers = workers.max(1);
        if workers == 1 || objects.len() < workers * 2 {
            return self.cull(objects, frustum);
        }

        let chunk_size = objects.len().div_ceil(workers);
        let chunks: Vec<Vec<&'s RenderObject>> = std::thread::scope(|scope| {
            let handles: Vec<_> = objects
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .filter(|object| is_visible(object, frustum))
                            .collect::<Vec<&'s RenderObject>>()
                    })
                })
                .collect();

            // Joined in spawn order so the chunks concatenate in scene order.
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(visible) => visible,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        RenderList {
            entries: chunks.into_iter().flatten().collect(),
            tested: objects.len(),
        }
    }
}

fn is_visible(object: &RenderObject, frustum: &Frustum) -> bool {
    object.visible && object.world_bounds().test_frustum(frustum).is_visible()
}
