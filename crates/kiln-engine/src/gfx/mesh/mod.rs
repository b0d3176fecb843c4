//! Vertex formats and meshes packed into shared vertex arrays.

mod format;
mod storage;

pub use format::{AttribType, VertexAttrib, VertexFormat};
pub use storage::{Mesh, MeshError, MeshRange, MeshStorage, RenderAtom, VertexArray};
