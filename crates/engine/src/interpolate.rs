//! The string interpolator.
//!
//! Three syntaxes are recognised inside string leaves:
//!
//! * `{[ expr ]}` spanning the whole string — the raw sequence result,
//!   without first-element projection.
//! * `{{ expr }}` — the first element of the result; undefined when empty.
//! * `{{+ expr +}}` — the first element of the result; null when empty.
//!
//! A single-template match that spans the entire string substitutes the raw
//! typed value. Anything else stringifies each match in place, and an empty
//! result short-circuits the whole string.

use crate::error::ValidationError;
use regex::Regex;
use std::sync::LazyLock;
use stencil_value::Value;

static ARRAY_TEMPLATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\[\s*([\s\S]+?)\s*\]\}$").expect("array template pattern"));

static SINGLE_TEMPLATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\+?\s*([\s\S]+?)\s*\+?\}\}").expect("single template pattern")
});

pub(crate) fn interpolate<E>(input: &str, eval: E) -> Result<Value, ValidationError>
where
    E: Fn(&str) -> Result<Vec<Value>, ValidationError>,
{
    if let Some(captures) = ARRAY_TEMPLATE_RE.captures(input) {
        return Ok(Value::Array(eval(&captures[1])?));
    }

    let mut result = input.to_string();
    for captures in SINGLE_TEMPLATE_RE.captures_iter(input) {
        let matched = &captures[0];
        let answers = eval(&captures[1])?;
        let Some(first) = answers.into_iter().next() else {
            // An empty result short-circuits the whole string: the nullable
            // form keeps a null, the plain form erases the value.
            return Ok(if matched.starts_with("{{+") {
                Value::Null
            } else {
                Value::Undefined
            });
        };
        if matched == input {
            return Ok(first);
        }
        result = result.replace(matched, &first.to_string());
    }
    Ok(Value::String(result))
}
