//! GLSL source preprocessing: `#use` block expansion and `#version` normalization.

mod error;
mod preprocess;

pub use error::PreprocessError;
pub use preprocess::{PreprocessedSource, ShaderPreprocessor, UsedBlock};
