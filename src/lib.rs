// --- Module Structure ---
// `stencil-value`:  the tagged value model shared by every crate.
// `stencil-path`:   the path expression language embedded in templates.
// `stencil-engine`: the tree-rewriting template resolver built on both.

// --- Public API ---
// By exposing only these top-level items, we provide a clean and focused
// public interface for users of the library.

pub use stencil_engine::{
    Context, GuardedResource, NodePath, PathStep, ResolveOptions, Scope, ValidationError,
    resolve_template,
};
pub use stencil_path::{
    FunctionRegistry, InvocationTable, Model, PathError, parse_expression,
};
pub use stencil_value::{Map, Value};
