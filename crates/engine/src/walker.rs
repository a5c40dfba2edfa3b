//! Post-order traversal of the template tree.

use crate::error::ValidationError;
use crate::path::NodePath;
use crate::scope::Context;
use stencil_value::{Map, Value};

pub(crate) type TransformResult = Result<(Value, Context), ValidationError>;

/// Rewrites a template tree with `transform` applied at each node.
///
/// The walker owns the two container normalisation rules. Undefined children
/// are pruned: arrays are compacted and object keys dropped. Sequences are
/// flattened one level, which is what lets a block that expands to a
/// sequence splice into its enclosing sequence. A container left empty after
/// pruning collapses to undefined so the erasure propagates upward.
///
/// Mappings are transformed on entry; when a block handler replaces the
/// mapping with something else (a sequence expansion, a selected branch),
/// the walker re-dispatches on the replacement so it is normalised the same
/// way. Scalars and strings yield the transform's value verbatim.
pub(crate) fn walk<F>(
    path: &NodePath,
    node: Value,
    context: &Context,
    transform: &F,
) -> Result<Value, ValidationError>
where
    F: Fn(&NodePath, Value, &Context) -> TransformResult,
{
    match node {
        Value::Array(items) => {
            let mut children = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let child = walk(&path.child_index(index), item, context, transform)?;
                if !child.is_undefined() {
                    children.push(child);
                }
            }
            let mut flattened = Vec::with_capacity(children.len());
            for child in children {
                match child {
                    Value::Array(nested) => flattened.extend(nested),
                    other => flattened.push(other),
                }
            }
            Ok(if flattened.is_empty() {
                Value::Undefined
            } else {
                Value::Array(flattened)
            })
        }
        Value::Object(_) => {
            let (transformed, child_context) = transform(path, node, context)?;
            match transformed {
                Value::Object(map) => {
                    let mut out = Map::with_capacity(map.len());
                    for (key, value) in map {
                        let child =
                            walk(&path.child_key(&key), value, &child_context, transform)?;
                        if !child.is_undefined() {
                            out.insert(key, child);
                        }
                    }
                    Ok(if out.is_empty() {
                        Value::Undefined
                    } else {
                        Value::Object(out)
                    })
                }
                replacement => walk(path, replacement, &child_context, transform),
            }
        }
        scalar => Ok(transform(path, scalar, context)?.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Scope;
    use std::sync::Arc;

    fn identity(path: &NodePath, node: Value, context: &Context) -> TransformResult {
        let _ = path;
        Ok((node, Arc::clone(context)))
    }

    fn walk_identity(node: Value) -> Value {
        let context = Scope::root(Value::Null, None);
        walk(&NodePath::root(), node, &context, &identity).unwrap()
    }

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn test_arrays_flatten_one_level() {
        let result = walk_identity(v(serde_json::json!([[1, 2, 3], [4, 5, 6]])));
        assert_eq!(result, v(serde_json::json!([1, 2, 3, 4, 5, 6])));
    }

    #[test]
    fn test_nested_arrays_collapse_progressively() {
        let result = walk_identity(v(serde_json::json!([[[1]], [[2], [3]]])));
        assert_eq!(result, v(serde_json::json!([1, 2, 3])));
    }

    #[test]
    fn test_undefined_is_pruned_but_null_survives() {
        let result = walk_identity(Value::Array(vec![
            Value::Int(1),
            Value::Undefined,
            Value::Null,
            Value::Int(2),
        ]));
        assert_eq!(
            result,
            Value::Array(vec![Value::Int(1), Value::Null, Value::Int(2)])
        );
    }

    #[test]
    fn test_empty_containers_collapse_to_undefined() {
        assert!(walk_identity(v(serde_json::json!([]))).is_undefined());
        assert!(walk_identity(v(serde_json::json!({}))).is_undefined());
        assert!(walk_identity(v(serde_json::json!({ "a": [] }))).is_undefined());
        assert!(walk_identity(Value::Array(vec![Value::Undefined])).is_undefined());
    }

    #[test]
    fn test_object_keys_with_undefined_values_are_dropped_in_order() {
        let mut map = Map::new();
        map.insert("keep".to_string(), Value::Int(1));
        map.insert("drop".to_string(), Value::Undefined);
        map.insert("tail".to_string(), Value::Null);
        let result = walk_identity(Value::Object(map));
        let out = result.as_object().unwrap();
        let keys: Vec<&str> = out.keys().map(String::as_str).collect();
        assert_eq!(keys, ["keep", "tail"]);
    }

    #[test]
    fn test_scalars_pass_through() {
        assert_eq!(walk_identity(Value::Int(1)), Value::Int(1));
        assert_eq!(walk_identity(Value::Null), Value::Null);
        assert!(walk_identity(Value::Undefined).is_undefined());
    }
}
