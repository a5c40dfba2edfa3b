use std::sync::Arc;
use stencil_path::{InvocationTable, Model};

/// Evaluation options forwarded to the path engine.
///
/// Both fields are opaque to the resolver: the model is split out and the
/// rest handed to the evaluator untouched.
#[derive(Default, Clone)]
pub struct ResolveOptions {
    /// Domain model consulted during navigation.
    pub model: Option<Arc<Model>>,
    /// Caller-supplied functions made callable from expressions.
    pub user_invocation_table: Option<Arc<InvocationTable>>,
}
