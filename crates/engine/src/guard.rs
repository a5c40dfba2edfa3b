//! The strict-mode resource facade.

use stencil_path::{Document, PathError};
use stencil_value::Value;

/// Keys a guarded resource still answers, with null, so that type-name heads
/// resolve to nothing instead of raising.
const ALLOWED_KEYS: [&str; 1] = ["resourceType"];

/// Resource facade installed in strict mode.
///
/// Templates must reach the input document through the context (it stays
/// available as `%context`, or under any caller-supplied name), which forces
/// them to declare their data dependencies explicitly. Any direct property
/// access raises, and the resolver surfaces it as a validation error.
#[derive(Debug, Default, Clone, Copy)]
pub struct GuardedResource;

impl Document for GuardedResource {
    fn get_key(&self, key: &str) -> Result<Option<Value>, PathError> {
        if ALLOWED_KEYS.contains(&key) {
            return Ok(Some(Value::Null));
        }
        Err(PathError::Access(format!(
            "Forbidden access to resource property '{key}' in strict mode. Use context instead"
        )))
    }

    fn as_value(&self) -> Option<Value> {
        None
    }
}
