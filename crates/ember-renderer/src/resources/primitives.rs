//! Built-in primitive meshes.

use super::MeshData;
use crate::vertex::MeshVertex;

/// Unit cube spanning `[-0.5, 0.5]` with per-face normals.
pub fn cube() -> MeshData {
    // (normal, tangent u, tangent v) for each face
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    const CORNERS: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (normal, u, v) in FACES {
        let base = vertices.len() as u32;
        for (su, sv) in CORNERS {
            let position = [
                0.5 * (normal[0] + su * u[0] + sv * v[0]),
                0.5 * (normal[1] + su * u[1] + sv * v[1]),
                0.5 * (normal[2] + su * u[2] + sv * v[2]),
            ];
            let uv = [(su + 1.0) * 0.5, 1.0 - (sv + 1.0) * 0.5];
            vertices.push(MeshVertex::new(position, normal, uv));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    MeshData::indexed(vertices, indices)
}

/// Horizontal plane on y = 0 spanning `[-half, half]` in x and z.
///
/// Texture coordinates repeat once per world unit.
pub fn plane(half: f32) -> MeshData {
    let n = [0.0, 1.0, 0.0];
    let vertices = vec![
        MeshVertex::new([-half, 0.0, half], n, [0.0, 0.0]),
        MeshVertex::new([half, 0.0, half], n, [2.0 * half, 0.0]),
        MeshVertex::new([half, 0.0, -half], n, [2.0 * half, 2.0 * half]),
        MeshVertex::new([-half, 0.0, -half], n, [0.0, 2.0 * half]),
    ];
    MeshData::indexed(vertices, vec![0, 1, 2, 0, 2, 3])
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_cube_counts_and_bounds() {
        let cube = cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.as_ref().unwrap().len(), 36);
        assert_eq!(cube.bounds.min, Vec3::splat(-0.5));
        assert_eq!(cube.bounds.max, Vec3::splat(0.5));
    }

    #[test]
    fn test_cube_faces_wind_counter_clockwise() {
        let cube = cube();
        let indices = cube.indices.unwrap();
        for tri in indices.chunks(3) {
            let p = |i: u32| Vec3::from(cube.vertices[i as usize].position);
            let face_normal = (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]));
            let normal = Vec3::from(cube.vertices[tri[0] as usize].normal);
            assert!(face_normal.dot(normal) > 0.0);
        }
    }

    #[test]
    fn test_plane_faces_up() {
        let plane = plane(10.0);
        let i = plane.indices.unwrap();
        let p = |k: u32| Vec3::from(plane.vertices[k as usize].position);
        let n = (p(i[1]) - p(i[0])).cross(p(i[2]) - p(i[0]));
        assert!(n.y > 0.0);
    }
}
