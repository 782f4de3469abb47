//! Asset loading: OBJ meshes and textures decoded into CPU-side data.

pub mod mesh;
pub mod obj;
pub mod texture;

pub use mesh::{MeshData, MeshVertex};
pub use texture::{PixelFormat, TextureData, TextureError};
