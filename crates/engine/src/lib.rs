//! The template resolver of the stencil mapping language.
//!
//! A template is an ordinary structured document with two kinds of
//! directives embedded in it: path expressions interpolated inside strings
//! (`{{ expr }}`, `{{+ expr +}}`, `{[ expr ]}`) and control blocks keyed
//! into objects (`{% assign %}`, `{% merge %}`, `{% for ... %}`,
//! `{% if ... %}` / `{% else %}`, and `{{ expr }}` context keys). Given a
//! resource document, [`resolve_template`] rewrites the template tree by
//! evaluating every expression and expanding every block.
//!
//! Resolution is a pure recursive function over immutable data: inputs are
//! never mutated, contexts live only for the subtree they cover, and the
//! first validation error aborts the whole run.

mod blocks;
mod error;
mod guard;
mod interpolate;
mod options;
mod path;
mod resolve;
mod scope;
mod walker;

// --- Public API ---
pub use error::ValidationError;
pub use guard::GuardedResource;
pub use options::ResolveOptions;
pub use path::{NodePath, PathStep};
pub use resolve::resolve_template;
pub use scope::{Context, Scope};
