use std::fmt;

use super::ParamType;

/// Failure building, registering or writing parameter buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    /// No parameter with this name in the buffer's layout.
    UnknownParam { buffer: String, name: String },
    /// Parameter index past the end of the layout.
    IndexOutOfRange { buffer: String, index: usize },
    /// Value kind does not match the declared kind.
    TypeMismatch {
        name: String,
        expected: ParamType,
        found: ParamType,
    },
    /// Layout declares the same parameter twice.
    DuplicateParam { name: String },
    /// A buffer with this name is already registered.
    DuplicateBuffer { name: String },
    EmptyName,
    /// Name is not usable as a GLSL identifier.
    InvalidName { name: String },
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::UnknownParam { buffer, name } => {
                write!(f, "param buffer '{buffer}' has no parameter '{name}'")
            }
            ParamError::IndexOutOfRange { buffer, index } => {
                write!(f, "param buffer '{buffer}' has no parameter at index {index}")
            }
            ParamError::TypeMismatch { name, expected, found } => write!(
                f,
                "parameter '{name}' is {} but a {} value was given",
                expected.glsl_name(),
                found.glsl_name()
            ),
            ParamError::DuplicateParam { name } => write!(f, "parameter '{name}' declared twice"),
            ParamError::DuplicateBuffer { name } => {
                write!(f, "param buffer '{name}' is already registered")
            }
            ParamError::EmptyName => write!(f, "empty parameter or buffer name"),
            ParamError::InvalidName { name } => write!(f, "'{name}' is not a valid identifier"),
        }
    }
}

impl std::error::Error for ParamError {}

/// Accepts `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn check_identifier(name: &str) -> Result<(), ParamError> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(ParamError::EmptyName);
    };
    let valid = (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ParamError::InvalidName { name: name.to_string() })
    }
}
