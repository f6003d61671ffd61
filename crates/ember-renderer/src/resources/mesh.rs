//! Mesh resource management.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::context::RenderContext;
use crate::resources::TextureHandle;
use crate::scene::BoundingBox;
use crate::vertex::MeshVertex;

/// Handle to a mesh stored in the MeshManager.
///
/// Handles are lightweight and can be copied freely.
/// The actual mesh data is stored in the MeshManager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MeshHandle(u64);

impl MeshHandle {
    /// Returns the raw handle value.
    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Creates a handle from a raw value.
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }
}

/// GPU mesh data.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: Option<wgpu::Buffer>,
    pub vertex_count: u32,
    pub index_count: u32,
    /// Diffuse texture; `None` draws with the white fallback.
    pub material: Option<TextureHandle>,
    pub bounds: BoundingBox,
}

impl GpuMesh {
    /// Returns true if this mesh uses indexed drawing.
    pub fn is_indexed(&self) -> bool {
        self.index_buffer.is_some() && self.index_count > 0
    }

    /// Binds the vertex/index buffers and issues the draw call.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        match &self.index_buffer {
            Some(indices) if self.index_count > 0 => {
                pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..self.index_count, 0, 0..1);
            }
            _ => pass.draw(0..self.vertex_count, 0..1),
        }
    }

    /// Bytes of GPU memory held by the buffers.
    pub fn memory_bytes(&self) -> u64 {
        self.vertex_buffer.size() + self.index_buffer.as_ref().map_or(0, |b| b.size())
    }
}

/// CPU mesh data for uploading to GPU.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Option<Vec<u32>>,
    pub material: Option<TextureHandle>,
    pub bounds: BoundingBox,
}

impl MeshData {
    /// Creates a new mesh data from vertices (non-indexed).
    pub fn new(vertices: Vec<MeshVertex>) -> Self {
        let bounds = Self::compute_bounds(&vertices);
        Self {
            vertices,
            indices: None,
            material: None,
            bounds,
        }
    }

    /// Creates a new indexed mesh data.
    pub fn indexed(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        let bounds = Self::compute_bounds(&vertices);
        Self {
            vertices,
            indices: Some(indices),
            material: None,
            bounds,
        }
    }

    /// Sets the diffuse texture.
    pub fn with_material(mut self, material: TextureHandle) -> Self {
        self.material = Some(material);
        self
    }

    fn compute_bounds(vertices: &[MeshVertex]) -> BoundingBox {
        BoundingBox::from_points(vertices.iter().map(|v| glam::Vec3::from(v.position)))
    }
}

/// Manager for GPU mesh resources.
pub struct MeshManager {
    meshes: HashMap<MeshHandle, GpuMesh>,
    next_handle: AtomicU64,
}

impl MeshManager {
    /// Creates a new mesh manager.
    pub fn new() -> Self {
        Self {
            meshes: HashMap::new(),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Uploads mesh data to the GPU and returns a handle.
    pub fn create(&mut self, ctx: &RenderContext, data: &MeshData) -> MeshHandle {
        let handle = MeshHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));

        let vertex_buffer = ctx.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = data.indices.as_ref().map(|indices| {
            ctx.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh Index Buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            })
        });

        let gpu_mesh = GpuMesh {
            vertex_buffer,
            index_buffer,
            vertex_count: data.vertices.len() as u32,
            index_count: data.indices.as_ref().map_or(0, |i| i.len() as u32),
            material: data.material,
            bounds: data.bounds,
        };

        self.meshes.insert(handle, gpu_mesh);
        handle
    }

    /// Gets a mesh by handle.
    pub fn get(&self, handle: MeshHandle) -> Option<&GpuMesh> {
        self.meshes.get(&handle)
    }

    /// Removes a mesh; its buffers are released when the GpuMesh is dropped.
    pub fn remove(&mut self, handle: MeshHandle) -> Option<GpuMesh> {
        self.meshes.remove(&handle)
    }

    pub fn contains(&self, handle: MeshHandle) -> bool {
        self.meshes.contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Union of the bounds of the given meshes, ignoring unknown handles.
    pub fn combined_bounds(&self, handles: &[MeshHandle]) -> BoundingBox {
        handles
            .iter()
            .filter_map(|h| self.meshes.get(h))
            .fold(BoundingBox::empty(), |acc, m| acc.union(&m.bounds))
    }

    pub fn memory_bytes(&self) -> u64 {
        self.meshes.values().map(GpuMesh::memory_bytes).sum()
    }

    pub fn clear(&mut self) {
        self.meshes.clear();
    }
}

impl Default for MeshManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_mesh_data_bounds() {
        let data = MeshData::new(vec![
            MeshVertex::new([-1.0, 0.0, 2.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            MeshVertex::new([3.0, -2.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0]),
        ]);
        assert_eq!(data.bounds.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(data.bounds.max, Vec3::new(3.0, 0.0, 2.0));
    }

    #[test]
    fn test_empty_mesh_has_empty_bounds() {
        assert!(MeshData::new(Vec::new()).bounds.is_empty());
    }
}
