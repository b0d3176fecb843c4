//! [`GraphicsApi`](crate::gfx::api::GraphicsApi) on top of wgpu.
//!
//! GL-style global state is shadowed and baked into render pipelines lazily, one per
//! distinct (program, vertex format, primitive, state) combination. Shaders go through
//! naga's GLSL frontend after a small rewrite into Vulkan-flavored GLSL.

mod api;
mod compat;
mod conversions;
mod pipeline;

pub use api::WgpuApi;
