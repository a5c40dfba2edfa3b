//! Lexical variable scopes for template resolution.

use std::sync::Arc;
use stencil_path::Variables;
use stencil_value::{Map, Value};

/// One link in the scope chain.
///
/// Scopes are extended by creating a child link, never by mutating a parent,
/// so bindings introduced inside one subtree cannot leak into siblings. A
/// child shadows any parent binding of the same name.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    vars: Map,
    parent: Option<Context>,
}

/// A shared handle to a scope.
pub type Context = Arc<Scope>;

impl Scope {
    /// The root scope: binds the reserved `context` variable to the input
    /// resource, then the caller's variables, which may shadow it.
    pub fn root(resource: Value, caller: Option<Map>) -> Context {
        let mut vars = Map::new();
        vars.insert("context".to_string(), resource);
        if let Some(extra) = caller {
            vars.extend(extra);
        }
        Arc::new(Scope { vars, parent: None })
    }

    /// A child scope holding a single binding.
    pub fn binding(parent: &Context, name: &str, value: Value) -> Context {
        let mut vars = Map::new();
        vars.insert(name.to_string(), value);
        Arc::new(Scope {
            vars,
            parent: Some(Arc::clone(parent)),
        })
    }

    /// A child scope holding several bindings at once.
    pub fn extend(parent: &Context, vars: Map) -> Context {
        Arc::new(Scope {
            vars,
            parent: Some(Arc::clone(parent)),
        })
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars
            .get(name)
            .or_else(|| self.parent.as_ref().and_then(|parent| parent.get(name)))
    }
}

impl Variables for Scope {
    fn get_var(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_shadows_parent() {
        let root = Scope::root(Value::Null, None);
        let outer = Scope::binding(&root, "x", Value::Int(1));
        let inner = Scope::binding(&outer, "x", Value::Int(2));
        assert_eq!(inner.get("x"), Some(&Value::Int(2)));
        assert_eq!(outer.get("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_lookup_walks_the_chain() {
        let root = Scope::root(Value::from("doc"), None);
        let child = Scope::binding(&root, "y", Value::Int(3));
        assert_eq!(child.get("context"), Some(&Value::from("doc")));
        assert_eq!(child.get("missing"), None);
    }

    #[test]
    fn test_caller_vars_may_shadow_reserved_context() {
        let mut caller = Map::new();
        caller.insert("context".to_string(), Value::Int(9));
        let root = Scope::root(Value::Null, Some(caller));
        assert_eq!(root.get("context"), Some(&Value::Int(9)));
    }
}
