//! Screen-space coordinate types shared by the renderer and the runtime.
//!
//! Canonical space is physical pixels with the origin at the bottom-left corner of the
//! drawable, matching how immediate-mode viewports are specified.

mod viewport;

pub use viewport::Viewport;
