//! Kiln engine crate.
//!
//! The rendering core lives in [`gfx`]: render state caching, parameter buffers,
//! shader preprocessing, materials and meshes over a [`gfx::api::GraphicsApi`] seam.
//! The remaining modules are the platform and GPU runtime around it.

pub mod core;
pub mod device;
pub mod input;
pub mod time;
pub mod window;

pub mod coords;
pub mod gfx;
pub mod logging;
