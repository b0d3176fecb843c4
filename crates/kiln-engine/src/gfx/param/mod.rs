//! Typed shader parameters laid out as std140 uniform blocks.

mod buffer;
mod error;
mod layout;
mod registry;
mod types;

pub use buffer::ParamBuffer;
pub use error::ParamError;
pub use layout::{ParamDecl, ParamLayout, ParamLayoutBuilder};
pub use registry::{ParamRegistry, SharedParamBuffer};
pub use types::{ParamType, ParamValue};
