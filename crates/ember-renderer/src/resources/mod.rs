//! GPU resource management (meshes, textures, built-in primitives).

mod mesh;
pub mod primitives;
mod texture;

pub use mesh::*;
pub use texture::*;
