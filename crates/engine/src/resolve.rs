//! The resolver: rewrites a template tree against a resource document.

use crate::blocks::{BlockKind, classify};
use crate::error::ValidationError;
use crate::guard::GuardedResource;
use crate::interpolate::interpolate;
use crate::options::ResolveOptions;
use crate::path::NodePath;
use crate::scope::{Context, Scope};
use crate::walker::walk;
use log::{debug, trace};
use std::sync::Arc;
use stencil_path::{Document, EvaluationContext, FunctionRegistry, evaluate_str};
use stencil_value::{Map, Value};

/// Resolves a template against a resource document.
///
/// The caller's context is merged over a reserved `context` variable bound to
/// the resource, so `%context` always names the root document. When `strict`
/// is set the resource is replaced by a guarded facade and templates must
/// reach the document through the context.
///
/// A template that resolves to nothing yields `Ok(Value::Null)`; the
/// undefined sentinel never escapes this boundary.
pub fn resolve_template(
    resource: &Value,
    template: &Value,
    context: Option<Map>,
    options: Option<ResolveOptions>,
    strict: bool,
) -> Result<Value, ValidationError> {
    let resolver = Resolver {
        options: options.unwrap_or_default(),
        functions: FunctionRegistry::default(),
    };
    // The resource stays reachable through the context even when strict mode
    // replaces the document itself.
    let scope = Scope::root(resource.clone(), context);
    let result = if strict {
        resolver.resolve(&NodePath::root(), &GuardedResource, template.clone(), &scope)?
    } else {
        resolver.resolve(&NodePath::root(), resource, template.clone(), &scope)?
    };
    Ok(match result {
        Value::Undefined => Value::Null,
        other => other,
    })
}

struct Resolver {
    options: ResolveOptions,
    functions: FunctionRegistry,
}

impl Resolver {
    fn resolve(
        &self,
        path: &NodePath,
        resource: &dyn Document,
        template: Value,
        context: &Context,
    ) -> Result<Value, ValidationError> {
        walk(path, template, context, &|p, node, ctx| {
            self.process_node(p, resource, node, ctx)
        })
    }

    /// The transformer applied at each node: the assign block always runs
    /// first, then the remaining handlers in fixed priority with first match
    /// winning. Strings go to the interpolator; other scalars pass through.
    fn process_node(
        &self,
        path: &NodePath,
        resource: &dyn Document,
        node: Value,
        context: &Context,
    ) -> Result<(Value, Context), ValidationError> {
        match node {
            Value::Object(map) => {
                let (map, context) = self.apply_assign(path, resource, map, context)?;
                if let Some(node) = self.apply_context_block(path, resource, &map, &context)? {
                    return Ok((node, context));
                }
                if let Some(node) = self.apply_merge_block(path, resource, &map, &context)? {
                    return Ok((node, context));
                }
                if let Some(node) = self.apply_for_block(path, resource, &map, &context)? {
                    return Ok((node, context));
                }
                if let Some(node) = self.apply_if_block(path, resource, &map, &context)? {
                    return Ok((node, context));
                }
                Ok((Value::Object(map), context))
            }
            Value::String(text) => {
                let value = interpolate(&text, |expression| {
                    self.evaluate_expression(path, resource, expression, context)
                })?;
                Ok((value, Arc::clone(context)))
            }
            scalar => Ok((scalar, Arc::clone(context))),
        }
    }

    /// `{% assign %}`: evaluates its bindings in order, each seeing the
    /// context produced by prior bindings, and strips the key from the node.
    /// An undefined binding value binds the name to null so later
    /// expressions can reference it without raising.
    fn apply_assign(
        &self,
        path: &NodePath,
        resource: &dyn Document,
        map: Map,
        context: &Context,
    ) -> Result<(Map, Context), ValidationError> {
        let Some(assign_key) = map
            .keys()
            .find(|key| matches!(classify(key), Some(BlockKind::Assign)))
            .cloned()
        else {
            return Ok((map, Arc::clone(context)));
        };

        let mut map = map;
        let bindings = map.shift_remove(&assign_key).unwrap_or(Value::Null);
        let mut context = Arc::clone(context);
        match bindings {
            Value::Array(items) => {
                for item in items {
                    let Value::Object(binding) = item else {
                        return Err(ValidationError::new(
                            "Assign block must accept only one key per object",
                            path,
                        ));
                    };
                    context = self.bind(path, resource, binding, &context)?;
                }
            }
            Value::Object(binding) if binding.len() == 1 => {
                context = self.bind(path, resource, binding, &context)?;
            }
            _ => {
                return Err(ValidationError::new(
                    "Assign block must accept array or object",
                    path,
                ));
            }
        }
        Ok((map, context))
    }

    fn bind(
        &self,
        path: &NodePath,
        resource: &dyn Document,
        binding: Map,
        context: &Context,
    ) -> Result<Context, ValidationError> {
        let mut entries = binding.into_iter();
        let Some((name, template)) = entries.next() else {
            return Err(ValidationError::new(
                "Assign block must accept only one key per object",
                path,
            ));
        };
        if entries.next().is_some() {
            return Err(ValidationError::new(
                "Assign block must accept only one key per object",
                path,
            ));
        }
        let resolved = self.resolve(&path.child_key(&name), resource, template, context)?;
        let bound = if resolved.is_undefined() {
            Value::Null
        } else {
            resolved
        };
        Ok(Scope::binding(context, &name, bound))
    }

    /// `{{ expr }}` used as the sole key: re-resolves the sub-template once
    /// per result element, with the element as the new resource.
    fn apply_context_block(
        &self,
        path: &NodePath,
        resource: &dyn Document,
        map: &Map,
        context: &Context,
    ) -> Result<Option<Value>, ValidationError> {
        let Some((key, expression)) = map.keys().find_map(|key| match classify(key) {
            Some(BlockKind::ContextExpr { expression }) => Some((key.clone(), expression)),
            _ => None,
        }) else {
            return Ok(None);
        };
        if map.len() > 1 {
            return Err(ValidationError::new(
                "Context block must be presented as single key",
                path,
            ));
        }
        let body = map.get(&key).cloned().unwrap_or(Value::Null);
        let answers = self.evaluate_expression(path, resource, &expression, context)?;
        debug!("context block at '{path}' expands into {} node(s)", answers.len());
        let mut expanded = Vec::with_capacity(answers.len());
        for answer in &answers {
            expanded.push(self.resolve(path, answer, body.clone(), context)?);
        }
        Ok(Some(Value::Array(expanded)))
    }

    /// `{% merge %}`: resolves its item(s) and folds the resulting mappings
    /// into the surrounding node in order, later writes winning. Null and
    /// undefined items are skipped; anything else is a shape error.
    fn apply_merge_block(
        &self,
        path: &NodePath,
        resource: &dyn Document,
        map: &Map,
        context: &Context,
    ) -> Result<Option<Value>, ValidationError> {
        let Some(merge_key) = map
            .keys()
            .find(|key| matches!(classify(key), Some(BlockKind::Merge)))
            .cloned()
        else {
            return Ok(None);
        };

        let mut merged = map.clone();
        let block = merged.shift_remove(&merge_key).unwrap_or(Value::Null);
        let items = match block {
            Value::Array(items) => items,
            other => vec![other],
        };
        for item in items {
            match self.resolve(path, resource, item, context)? {
                Value::Object(extra) => {
                    for (key, value) in extra {
                        merged.insert(key, value);
                    }
                }
                Value::Null | Value::Undefined => {}
                _ => {
                    return Err(ValidationError::new("Merge block must contain object", path));
                }
            }
        }
        Ok(Some(Value::Object(merged)))
    }

    /// `{% for [index,] item in expr %}` as the sole key: expands to a
    /// sequence by re-resolving the body once per element, with the loop
    /// variable (and optional 0-based index) bound in the child scope.
    fn apply_for_block(
        &self,
        path: &NodePath,
        resource: &dyn Document,
        map: &Map,
        context: &Context,
    ) -> Result<Option<Value>, ValidationError> {
        let Some((index_name, item_name, expression)) =
            map.keys().find_map(|key| match classify(key) {
                Some(BlockKind::For {
                    index,
                    item,
                    expression,
                }) => Some((index, item, expression)),
                _ => None,
            })
        else {
            return Ok(None);
        };
        if map.len() > 1 {
            return Err(ValidationError::new(
                "For block must be presented as single key",
                path,
            ));
        }
        let body = map.values().next().cloned().unwrap_or(Value::Null);
        let answers = self.evaluate_expression(path, resource, &expression, context)?;
        debug!("for block at '{path}' iterates {} element(s)", answers.len());
        let mut expanded = Vec::with_capacity(answers.len());
        for (position, answer) in answers.into_iter().enumerate() {
            let mut vars = Map::new();
            vars.insert(item_name.clone(), answer);
            if let Some(index_name) = &index_name {
                vars.insert(index_name.clone(), Value::Int(position as i64));
            }
            let child = Scope::extend(context, vars);
            expanded.push(self.resolve(path, resource, body.clone(), &child)?);
        }
        Ok(Some(Value::Array(expanded)))
    }

    /// `{% if cond %}` / `{% else %}`: selects a branch by wrapping the
    /// guard as `iif(cond, true, false)`. With no sibling keys the branch
    /// replaces the node; with siblings the branch must resolve to a
    /// mapping, null or undefined and is merged over them.
    fn apply_if_block(
        &self,
        path: &NodePath,
        resource: &dyn Document,
        map: &Map,
        context: &Context,
    ) -> Result<Option<Value>, ValidationError> {
        let mut if_entry: Option<(String, String)> = None;
        let mut else_key: Option<String> = None;
        for key in map.keys() {
            match classify(key) {
                Some(BlockKind::If { condition }) => {
                    if if_entry.is_some() {
                        return Err(ValidationError::new("If block must be presented once", path));
                    }
                    if_entry = Some((key.clone(), condition));
                }
                Some(BlockKind::Else) => {
                    if else_key.is_some() {
                        return Err(ValidationError::new(
                            "Else block must be presented once",
                            path,
                        ));
                    }
                    else_key = Some(key.clone());
                }
                _ => {}
            }
        }
        let Some((if_key, condition)) = if_entry else {
            if else_key.is_some() {
                return Err(ValidationError::new(
                    "Else block must be presented only when if block is presented",
                    path,
                ));
            }
            return Ok(None);
        };

        let guard = format!("iif({condition}, true, false)");
        let answer = self.evaluate_expression(path, resource, &guard, context)?;
        let branch = if stencil_path::truthy(&answer) {
            Some(map.get(&if_key).cloned().unwrap_or(Value::Null))
        } else {
            else_key
                .as_ref()
                .map(|key| map.get(key).cloned().unwrap_or(Value::Null))
        };
        let resolved = match branch {
            Some(template) => self.resolve(path, resource, template, context)?,
            None => Value::Undefined,
        };

        let directive_keys = 1 + usize::from(else_key.is_some());
        if map.len() != directive_keys {
            // Implicit merge: the branch folds into the surrounding node.
            let extra = match resolved {
                Value::Object(extra) => Some(extra),
                Value::Null | Value::Undefined => None,
                _ => {
                    return Err(ValidationError::new(
                        "If/else block must return object for implicit merge into existing node",
                        path,
                    ));
                }
            };
            let mut merged = Map::with_capacity(map.len());
            for (key, value) in map {
                if *key == if_key || Some(key) == else_key.as_ref() {
                    continue;
                }
                merged.insert(key.clone(), value.clone());
            }
            if let Some(extra) = extra {
                for (key, value) in extra {
                    merged.insert(key, value);
                }
            }
            return Ok(Some(Value::Object(merged)));
        }
        Ok(Some(resolved))
    }

    /// The expression gateway: splits the model out of the options, forwards
    /// the rest to the evaluator, and wraps every failure as a validation
    /// error naming the expression and the current path.
    fn evaluate_expression(
        &self,
        path: &NodePath,
        resource: &dyn Document,
        expression: &str,
        context: &Context,
    ) -> Result<Vec<Value>, ValidationError> {
        trace!("evaluating '{expression}' at '{path}'");
        let e_ctx = EvaluationContext {
            variables: context.as_ref(),
            functions: &self.functions,
            user_functions: self.options.user_invocation_table.as_deref(),
            model: self.options.model.as_deref(),
        };
        evaluate_str(resource, expression, &e_ctx).map_err(|error| {
            ValidationError::new(format!("Cannot evaluate '{expression}': {error}"), path)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    fn resolve(resource: serde_json::Value, template: serde_json::Value) -> Value {
        resolve_template(&v(resource), &v(template), None, None, false).unwrap()
    }

    #[test]
    fn test_literal_templates_pass_through() {
        assert_eq!(
            resolve(serde_json::json!({}), serde_json::json!({ "a": [1, null, "x"] })),
            v(serde_json::json!({ "a": [1, null, "x"] }))
        );
    }

    #[test]
    fn test_top_level_undefined_becomes_null() {
        let result =
            resolve_template(&v(serde_json::json!({})), &Value::Undefined, None, None, false)
                .unwrap();
        assert_eq!(result, Value::Null);
    }

    #[test]
    fn test_sibling_assigns_do_not_leak() {
        let result = resolve(
            serde_json::json!({}),
            serde_json::json!({
                "left": { "{% assign %}": { "x": 1 }, "value": "{{ %x }}" },
                "right": { "{% assign %}": { "x": 2 }, "value": "{{ %x }}" },
            }),
        );
        assert_eq!(
            result,
            v(serde_json::json!({ "left": { "value": 1 }, "right": { "value": 2 } }))
        );
    }

    #[test]
    fn test_error_paths_name_the_node() {
        let error = resolve_template(
            &v(serde_json::json!({})),
            &v(serde_json::json!({ "result": { "nested": "{{ item.where(linkId='a) }}" } })),
            None,
            None,
            false,
        )
        .unwrap_err();
        assert_eq!(error.path, "result.nested");
        assert!(error.message.starts_with("Cannot evaluate"));
    }
}
