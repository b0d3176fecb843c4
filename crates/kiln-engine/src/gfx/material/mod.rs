//! Materials: compiled programs bound to a render state and param buffers.

mod manager;
mod compiled;

pub use manager::{MaterialDesc, MaterialManager};
pub use compiled::Material;
