//! Rendering core: the native API seam, render state caching, parameter buffers,
//! shader preprocessing, materials, meshes and the renderer tying them together.

pub mod api;
pub mod material;
pub mod mesh;
pub mod param;
pub mod shader;
pub mod state;
pub mod wgpu_backend;

mod renderer;

pub use renderer::Renderer;
