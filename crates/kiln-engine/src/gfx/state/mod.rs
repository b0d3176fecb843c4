//! Fixed-function pipeline state and its change-minimizing cache.

mod cache;
mod render_state;

pub use cache::RenderStateCache;
pub use render_state::{BlendFactor, BlendFn, DepthFn, RenderState};
