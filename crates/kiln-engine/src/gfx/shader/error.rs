use std::fmt;

/// A shader preprocessing error. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreprocessError {
    /// `#use` names a param buffer that is not registered.
    UnknownParamBuffer { line: usize, name: String },
    /// `#use` without exactly one identifier.
    MalformedUse { line: usize, text: String },
    /// `#version` without a parseable version number.
    MalformedVersion { line: usize, text: String },
}

impl PreprocessError {
    pub fn line(&self) -> usize {
        match self {
            PreprocessError::UnknownParamBuffer { line, .. }
            | PreprocessError::MalformedUse { line, .. }
            | PreprocessError::MalformedVersion { line, .. } => *line,
        }
    }
}

impl fmt::Display for PreprocessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreprocessError::UnknownParamBuffer { line, name } => {
                write!(f, "shader line {line}: unknown param buffer '{name}'")
            }
            PreprocessError::MalformedUse { line, text } => {
                write!(f, "shader line {line}: malformed #use directive: {text:?}")
            }
            PreprocessError::MalformedVersion { line, text } => {
                write!(f, "shader line {line}: malformed #version directive: {text:?}")
            }
        }
    }
}

impl std::error::Error for PreprocessError {}
