//! Core engine-facing contracts.
//!
//! Defines the interface between the runtime (platform loop) and the application,
//! with a consistent per-frame context.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, RenderTarget, WindowCtx};
