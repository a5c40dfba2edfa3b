use crate::path::NodePath;
use thiserror::Error;

/// Validation failure raised while resolving a template.
///
/// Every failure surfaces as this one kind: directive shape errors,
/// expression evaluation errors, and strict-mode access violations. The path
/// locates the offending node in the template; the first error aborts the
/// whole resolution.
#[derive(Error, Debug, Clone)]
#[error("{message}. Path '{path}'")]
pub struct ValidationError {
    pub message: String,
    pub path: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>, path: &NodePath) -> Self {
        Self {
            message: message.into(),
            path: path.to_string(),
        }
    }
}
