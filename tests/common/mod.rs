#![allow(dead_code)]

use stencil::{Map, ResolveOptions, ValidationError, Value, resolve_template};
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialises logging once per test binary.
pub fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

pub fn v(json: serde_json::Value) -> Value {
    Value::from(json)
}

pub fn resolve(resource: serde_json::Value, template: serde_json::Value) -> Value {
    setup();
    resolve_template(&v(resource), &v(template), None, None, false).expect("resolution failed")
}

pub fn resolve_with_context(
    resource: serde_json::Value,
    template: serde_json::Value,
    context: serde_json::Value,
) -> Value {
    setup();
    resolve_template(&v(resource), &v(template), Some(object(context)), None, false)
        .expect("resolution failed")
}

pub fn resolve_strict(
    resource: serde_json::Value,
    template: serde_json::Value,
    context: serde_json::Value,
) -> Result<Value, ValidationError> {
    setup();
    resolve_template(&v(resource), &v(template), Some(object(context)), None, true)
}

pub fn resolve_with_options(
    resource: serde_json::Value,
    template: serde_json::Value,
    options: ResolveOptions,
) -> Result<Value, ValidationError> {
    setup();
    resolve_template(&v(resource), &v(template), None, Some(options), false)
}

pub fn resolve_err(resource: serde_json::Value, template: serde_json::Value) -> ValidationError {
    setup();
    resolve_template(&v(resource), &v(template), None, None, false)
        .expect_err("expected a validation error")
}

fn object(json: serde_json::Value) -> Map {
    match Value::from(json) {
        Value::Object(map) => map,
        other => panic!("context fixture must be an object, got {other:?}"),
    }
}
