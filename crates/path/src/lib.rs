//! A simple path and expression engine for structured documents.
//!
//! This crate provides a powerful way to select data from a document and
//! perform transformations using path expressions and custom functions. It is
//! the expression language embedded in stencil templates: everything inside
//! `{{ }}`, `{[ ]}` and the directive keys is parsed and evaluated here.

pub mod ast;
pub mod engine;
pub mod error;
pub mod functions;
mod parser;

// --- Public API ---
pub use ast::{BinaryOp, Expression, PathSegment, Selection, SelectionHead, UnaryOp};
pub use engine::{
    Document, EvaluationContext, Model, Variables, evaluate, evaluate_str, to_collection, truthy,
};
pub use error::PathError;
pub use functions::{FunctionRegistry, InvocationTable, PathFunction, UserFunction};
pub use parser::parse_expression;
