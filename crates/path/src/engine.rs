//! Evaluation engine for parsed path expressions.
//!
//! Every expression evaluates to a collection (`Vec<Value>`). A null value
//! spreads to the empty collection, an array spreads to its elements, and
//! anything else is a singleton. Operators use singleton semantics: an empty
//! operand usually produces an empty result rather than an error.

use crate::ast::{BinaryOp, Expression, PathSegment, Selection, SelectionHead, UnaryOp};
use crate::error::PathError;
use crate::functions::{FunctionRegistry, InvocationTable};
use std::collections::HashMap;
use stencil_value::Value;

/// Lookup surface for the document a path expression navigates from.
///
/// Plain values implement this with ordinary object lookup. The resolver's
/// strict mode supplies a second implementation that rejects key access.
pub trait Document {
    /// Looks up a top-level property of the document.
    fn get_key(&self, key: &str) -> Result<Option<Value>, PathError>;

    /// The whole document as a value, for expressions that reference it
    /// directly (type-name heads, the focus of free function calls).
    fn as_value(&self) -> Option<Value>;
}

impl Document for Value {
    fn get_key(&self, key: &str) -> Result<Option<Value>, PathError> {
        Ok(self.as_object().and_then(|map| map.get(key)).cloned())
    }

    fn as_value(&self) -> Option<Value> {
        Some(self.clone())
    }
}

/// Named-variable environment for `%name` references.
pub trait Variables {
    fn get_var(&self, name: &str) -> Option<&Value>;
}

impl Variables for stencil_value::Map {
    fn get_var(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

impl Variables for HashMap<String, Value> {
    fn get_var(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

/// Maps an abstract property name to the concrete keys that may carry it.
/// When object navigation misses a key directly, the model's candidates are
/// probed in order.
#[derive(Debug, Clone, Default)]
pub struct Model {
    aliases: HashMap<String, Vec<String>>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alias<S: Into<String>>(
        mut self,
        name: S,
        candidates: impl IntoIterator<Item = S>,
    ) -> Self {
        self.aliases.insert(
            name.into(),
            candidates.into_iter().map(Into::into).collect(),
        );
        self
    }

    fn candidates(&self, name: &str) -> Option<&[String]> {
        self.aliases.get(name).map(Vec::as_slice)
    }
}

/// Everything an evaluation needs besides the document itself.
pub struct EvaluationContext<'a> {
    pub variables: &'a dyn Variables,
    pub functions: &'a FunctionRegistry,
    pub user_functions: Option<&'a InvocationTable>,
    pub model: Option<&'a Model>,
}

/// Evaluates a parsed expression against a document.
pub fn evaluate(
    resource: &dyn Document,
    expression: &Expression,
    ctx: &EvaluationContext,
) -> Result<Vec<Value>, PathError> {
    Evaluator { resource, ctx }.eval(expression, None)
}

/// Parses and evaluates in one step.
pub fn evaluate_str(
    resource: &dyn Document,
    expression: &str,
    ctx: &EvaluationContext,
) -> Result<Vec<Value>, PathError> {
    let parsed = crate::parser::parse_expression(expression)?;
    evaluate(resource, &parsed, ctx)
}

/// Spreads a value into collection form: null vanishes, arrays contribute
/// their elements, anything else is a singleton.
pub fn to_collection(value: &Value) -> Vec<Value> {
    match value {
        Value::Null | Value::Undefined => vec![],
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

/// Collection truth: empty and `false` are falsy, everything else truthy.
pub fn truthy(collection: &[Value]) -> bool {
    match collection {
        [] => false,
        [Value::Bool(b)] => *b,
        _ => true,
    }
}

/// Structural equality with numeric coercion (`1 = 1.0` holds).
pub(crate) fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            a.as_f64() == b.as_f64()
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(v, w)| loose_eq(v, w))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| loose_eq(v, w)))
        }
        _ => a == b,
    }
}

struct Evaluator<'a> {
    resource: &'a dyn Document,
    ctx: &'a EvaluationContext<'a>,
}

impl Evaluator<'_> {
    fn eval(&self, expr: &Expression, this: Option<&Value>) -> Result<Vec<Value>, PathError> {
        match expr {
            Expression::Literal(v) => Ok(vec![v.clone()]),
            Expression::Empty => Ok(vec![]),
            Expression::Unary {
                op: UnaryOp::Neg,
                operand,
            } => self.eval_negation(operand, this),
            Expression::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs, this),
            Expression::Selection(selection) => self.eval_selection(selection, this),
        }
    }

    fn eval_selection(
        &self,
        selection: &Selection,
        this: Option<&Value>,
    ) -> Result<Vec<Value>, PathError> {
        let mut focus = self.eval_head(&selection.head, this)?;
        for segment in &selection.segments {
            focus = match segment {
                PathSegment::Key(key) => self.navigate_key(&focus, key),
                PathSegment::Index(i) => focus.get(*i).cloned().into_iter().collect(),
                PathSegment::Call { name, args } => self.call(name, focus, args, this)?,
            };
        }
        Ok(focus)
    }

    fn eval_head(
        &self,
        head: &SelectionHead,
        this: Option<&Value>,
    ) -> Result<Vec<Value>, PathError> {
        match head {
            SelectionHead::This => Ok(match this {
                Some(item) => vec![item.clone()],
                None => self.resource.as_value().into_iter().collect(),
            }),
            SelectionHead::Variable(name) => self
                .ctx
                .variables
                .get_var(name)
                .map(to_collection)
                .ok_or_else(|| PathError::UnknownVariable(name.clone())),
            SelectionHead::Key(key) => match this {
                // Inside a lambda, bare identifiers navigate from the focus item.
                Some(item) => Ok(self.navigate_key(std::slice::from_ref(item), key)),
                None => {
                    // A head matching the document's type name denotes the
                    // document itself.
                    if let Some(Value::String(type_name)) = self.resource.get_key("resourceType")?
                    {
                        if type_name == *key {
                            return Ok(self.resource.as_value().into_iter().collect());
                        }
                    }
                    Ok(self
                        .resource
                        .get_key(key)?
                        .as_ref()
                        .map(to_collection)
                        .unwrap_or_default())
                }
            },
            SelectionHead::Call { name, args } => {
                let input = match this {
                    Some(item) => vec![item.clone()],
                    None => self.resource.as_value().into_iter().collect(),
                };
                self.call(name, input, args, this)
            }
            SelectionHead::Group(inner) => self.eval(inner, this),
            SelectionHead::Literal(v) => Ok(vec![v.clone()]),
        }
    }

    fn navigate_key(&self, focus: &[Value], key: &str) -> Vec<Value> {
        let mut out = Vec::new();
        for item in focus {
            let Some(map) = item.as_object() else { continue };
            let found = map.get(key).or_else(|| {
                self.ctx
                    .model
                    .and_then(|model| model.candidates(key))
                    .and_then(|candidates| candidates.iter().find_map(|c| map.get(c)))
            });
            match found {
                None | Some(Value::Null) | Some(Value::Undefined) => {}
                Some(Value::Array(items)) => out.extend(items.iter().cloned()),
                Some(other) => out.push(other.clone()),
            }
        }
        out
    }

    fn call(
        &self,
        name: &str,
        input: Vec<Value>,
        args: &[Expression],
        this: Option<&Value>,
    ) -> Result<Vec<Value>, PathError> {
        match name {
            "where" => {
                let criteria = sole_lambda(name, args)?;
                let mut out = Vec::new();
                for item in input {
                    if truthy(&self.eval(criteria, Some(&item))?) {
                        out.push(item);
                    }
                }
                Ok(out)
            }
            "select" => {
                let projection = sole_lambda(name, args)?;
                let mut out = Vec::new();
                for item in input {
                    out.extend(self.eval(projection, Some(&item))?);
                }
                Ok(out)
            }
            "exists" => match args {
                [] => Ok(vec![Value::Bool(!input.is_empty())]),
                [criteria] => {
                    for item in input {
                        if truthy(&self.eval(criteria, Some(&item))?) {
                            return Ok(vec![Value::Bool(true)]);
                        }
                    }
                    Ok(vec![Value::Bool(false)])
                }
                _ => Err(arity_error(name, "at most one argument")),
            },
            "iif" => {
                if !(2..=3).contains(&args.len()) {
                    return Err(arity_error(name, "2 or 3 arguments"));
                }
                let condition = self.eval(&args[0], this)?;
                if truthy(&condition) {
                    self.eval(&args[1], this)
                } else if let Some(alternative) = args.get(2) {
                    self.eval(alternative, this)
                } else {
                    Ok(vec![])
                }
            }
            _ => {
                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push(singleton_arg(name, self.eval(arg, this)?)?);
                }
                if let Some(function) = self.ctx.functions.get(name) {
                    return function(&input, &evaluated);
                }
                if let Some(function) = self.ctx.user_functions.and_then(|t| t.get(name)) {
                    return function(&input, &evaluated);
                }
                Err(PathError::UnknownFunction(name.to_string()))
            }
        }
    }

    fn eval_negation(
        &self,
        operand: &Expression,
        this: Option<&Value>,
    ) -> Result<Vec<Value>, PathError> {
        let Some(value) = singleton("-", self.eval(operand, this)?)? else {
            return Ok(vec![]);
        };
        match value {
            Value::Int(i) => Ok(vec![Value::Int(-i)]),
            Value::Float(x) => Ok(vec![Value::Float(-x)]),
            other => Err(PathError::Type(format!(
                "cannot negate non-numeric value {other:?}"
            ))),
        }
    }

    fn eval_binary(
        &self,
        op: BinaryOp,
        lhs: &Expression,
        rhs: &Expression,
        this: Option<&Value>,
    ) -> Result<Vec<Value>, PathError> {
        let left = self.eval(lhs, this)?;
        let right = self.eval(rhs, this)?;
        match op {
            BinaryOp::And => Ok(match (bool_of(&left), bool_of(&right)) {
                (Some(false), _) | (_, Some(false)) => vec![Value::Bool(false)],
                (Some(true), Some(true)) => vec![Value::Bool(true)],
                _ => vec![],
            }),
            BinaryOp::Or => Ok(match (bool_of(&left), bool_of(&right)) {
                (Some(true), _) | (_, Some(true)) => vec![Value::Bool(true)],
                (Some(false), Some(false)) => vec![Value::Bool(false)],
                _ => vec![],
            }),
            BinaryOp::Eq | BinaryOp::Ne => {
                if left.is_empty() || right.is_empty() {
                    return Ok(vec![]);
                }
                let equal = left.len() == right.len()
                    && left.iter().zip(&right).all(|(a, b)| loose_eq(a, b));
                Ok(vec![Value::Bool(if op == BinaryOp::Eq {
                    equal
                } else {
                    !equal
                })])
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                self.compare(op, left, right)
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                self.arithmetic(op, left, right)
            }
        }
    }

    fn compare(
        &self,
        op: BinaryOp,
        left: Vec<Value>,
        right: Vec<Value>,
    ) -> Result<Vec<Value>, PathError> {
        let (Some(a), Some(b)) = (singleton("comparison", left)?, singleton("comparison", right)?)
        else {
            return Ok(vec![]);
        };
        let ordering = match (&a, &b) {
            (Value::String(x), Value::String(y)) => x.cmp(y),
            _ => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x
                    .partial_cmp(&y)
                    .ok_or_else(|| PathError::Type("cannot order NaN".to_string()))?,
                _ => {
                    return Err(PathError::Type(format!(
                        "cannot compare {a:?} with {b:?}"
                    )));
                }
            },
        };
        let result = match op {
            BinaryOp::Lt => ordering.is_lt(),
            BinaryOp::Le => ordering.is_le(),
            BinaryOp::Gt => ordering.is_gt(),
            BinaryOp::Ge => ordering.is_ge(),
            _ => unreachable!("compare called with non-comparison operator"),
        };
        Ok(vec![Value::Bool(result)])
    }

    fn arithmetic(
        &self,
        op: BinaryOp,
        left: Vec<Value>,
        right: Vec<Value>,
    ) -> Result<Vec<Value>, PathError> {
        let (Some(a), Some(b)) = (singleton("arithmetic", left)?, singleton("arithmetic", right)?)
        else {
            return Ok(vec![]);
        };
        if let (BinaryOp::Add, Value::String(x), Value::String(y)) = (op, &a, &b) {
            return Ok(vec![Value::String(format!("{x}{y}"))]);
        }
        let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) else {
            return Err(PathError::Type(format!(
                "operands of '{op:?}' must both be numbers or both strings, got {a:?} and {b:?}"
            )));
        };
        let result = match (op, &a, &b) {
            (BinaryOp::Add, Value::Int(i), Value::Int(j)) => {
                i.checked_add(*j).map_or(Value::Float(x + y), Value::Int)
            }
            (BinaryOp::Sub, Value::Int(i), Value::Int(j)) => {
                i.checked_sub(*j).map_or(Value::Float(x - y), Value::Int)
            }
            (BinaryOp::Mul, Value::Int(i), Value::Int(j)) => {
                i.checked_mul(*j).map_or(Value::Float(x * y), Value::Int)
            }
            (BinaryOp::Add, ..) => Value::Float(x + y),
            (BinaryOp::Sub, ..) => Value::Float(x - y),
            (BinaryOp::Mul, ..) => Value::Float(x * y),
            (BinaryOp::Div, ..) => {
                if y == 0.0 {
                    return Ok(vec![]);
                }
                Value::Float(x / y)
            }
            _ => unreachable!("arithmetic called with non-arithmetic operator"),
        };
        Ok(vec![result])
    }
}

fn bool_of(collection: &[Value]) -> Option<bool> {
    match collection {
        [] => None,
        [Value::Bool(b)] => Some(*b),
        _ => Some(true),
    }
}

fn singleton(context: &str, collection: Vec<Value>) -> Result<Option<Value>, PathError> {
    let mut iter = collection.into_iter();
    let first = iter.next();
    if iter.next().is_some() {
        return Err(PathError::Type(format!(
            "expected a single value for {context}, got a multi-item collection"
        )));
    }
    Ok(first)
}

fn singleton_arg(function: &str, collection: Vec<Value>) -> Result<Value, PathError> {
    let mut iter = collection.into_iter();
    let first = iter.next().unwrap_or(Value::Null);
    if iter.next().is_some() {
        return Err(PathError::Function {
            function: function.to_string(),
            message: "argument must be a single value".to_string(),
        });
    }
    Ok(first)
}

fn sole_lambda<'e>(name: &str, args: &'e [Expression]) -> Result<&'e Expression, PathError> {
    match args {
        [criteria] => Ok(criteria),
        _ => Err(arity_error(name, "exactly one argument")),
    }
}

fn arity_error(function: &str, expected: &str) -> PathError {
    PathError::Function {
        function: function.to_string(),
        message: format!("expected {expected}"),
    }
}
