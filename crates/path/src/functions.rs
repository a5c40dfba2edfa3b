//! Defines the registry and built-in implementations for path functions.
use crate::engine::{loose_eq, truthy};
use crate::error::PathError;
use itertools::Itertools;
use std::collections::HashMap;
use std::sync::Arc;

use stencil_value::Value;

/// The signature for a function implementation: the focus collection the
/// call was applied to, and the already-evaluated arguments.
pub type PathFunction = fn(input: &[Value], args: &[Value]) -> Result<Vec<Value>, PathError>;

/// A registry to hold all available functions for the evaluation engine.
pub struct FunctionRegistry {
    functions: HashMap<String, PathFunction>,
}

impl FunctionRegistry {
    /// Creates a new, empty function registry.
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Registers a new function.
    pub fn register(&mut self, name: &str, function: PathFunction) {
        self.functions.insert(name.to_string(), function);
    }

    /// Finds a function by name.
    pub fn get(&self, name: &str) -> Option<&PathFunction> {
        self.functions.get(name)
    }
}

impl Default for FunctionRegistry {
    /// Creates a new registry populated with all built-in functions.
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register("first", first);
        registry.register("last", last);
        registry.register("tail", tail);
        registry.register("count", count);
        registry.register("empty", empty);
        registry.register("not", not);
        registry.register("single", single);
        registry.register("distinct", distinct);
        registry.register("join", join);
        registry.register("upper", upper);
        registry.register("lower", lower);
        registry
    }
}

/// A caller-supplied function, invoked like a built-in.
pub type UserFunction =
    Arc<dyn Fn(&[Value], &[Value]) -> Result<Vec<Value>, PathError> + Send + Sync>;

/// Named caller-supplied functions, consulted after the built-in registry.
#[derive(Default, Clone)]
pub struct InvocationTable {
    functions: HashMap<String, UserFunction>,
}

impl InvocationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&[Value], &[Value]) -> Result<Vec<Value>, PathError> + Send + Sync + 'static,
    {
        self.functions.insert(name.to_string(), Arc::new(function));
    }

    pub fn get(&self, name: &str) -> Option<&UserFunction> {
        self.functions.get(name)
    }
}

// --- Built-in Function Implementations ---

fn first(input: &[Value], _args: &[Value]) -> Result<Vec<Value>, PathError> {
    Ok(input.first().cloned().into_iter().collect())
}

fn last(input: &[Value], _args: &[Value]) -> Result<Vec<Value>, PathError> {
    Ok(input.last().cloned().into_iter().collect())
}

fn tail(input: &[Value], _args: &[Value]) -> Result<Vec<Value>, PathError> {
    Ok(input.get(1..).map(<[Value]>::to_vec).unwrap_or_default())
}

fn count(input: &[Value], _args: &[Value]) -> Result<Vec<Value>, PathError> {
    Ok(vec![Value::Int(input.len() as i64)])
}

fn empty(input: &[Value], _args: &[Value]) -> Result<Vec<Value>, PathError> {
    Ok(vec![Value::Bool(input.is_empty())])
}

fn not(input: &[Value], _args: &[Value]) -> Result<Vec<Value>, PathError> {
    if input.is_empty() {
        return Ok(vec![]);
    }
    Ok(vec![Value::Bool(!truthy(input))])
}

fn single(input: &[Value], _args: &[Value]) -> Result<Vec<Value>, PathError> {
    match input {
        [] => Ok(vec![]),
        [item] => Ok(vec![item.clone()]),
        _ => Err(PathError::Function {
            function: "single".to_string(),
            message: format!("expected at most one item, got {}", input.len()),
        }),
    }
}

fn distinct(input: &[Value], _args: &[Value]) -> Result<Vec<Value>, PathError> {
    let mut seen: Vec<Value> = Vec::new();
    for item in input {
        if !seen.iter().any(|kept| loose_eq(kept, item)) {
            seen.push(item.clone());
        }
    }
    Ok(seen)
}

fn join(input: &[Value], args: &[Value]) -> Result<Vec<Value>, PathError> {
    let separator = match args.first() {
        None | Some(Value::Null) => "",
        Some(Value::String(s)) => s.as_str(),
        Some(other) => {
            return Err(PathError::Function {
                function: "join".to_string(),
                message: format!("separator must be a string, got {other:?}"),
            });
        }
    };
    Ok(vec![Value::String(
        input.iter().map(ToString::to_string).join(separator),
    )])
}

fn upper(input: &[Value], _args: &[Value]) -> Result<Vec<Value>, PathError> {
    map_strings("upper", input, |s| s.to_uppercase())
}

fn lower(input: &[Value], _args: &[Value]) -> Result<Vec<Value>, PathError> {
    map_strings("lower", input, |s| s.to_lowercase())
}

fn map_strings(
    name: &str,
    input: &[Value],
    f: impl Fn(&str) -> String,
) -> Result<Vec<Value>, PathError> {
    input
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(Value::String(f(s))),
            other => Err(PathError::Function {
                function: name.to_string(),
                message: format!("expected string input, got {other:?}"),
            }),
        })
        .collect()
}
