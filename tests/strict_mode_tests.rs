//! Strict mode and evaluation options through the public API.

mod common;

use common::{resolve_strict, resolve_with_options, setup, v};
use serde_json::json;
use std::sync::Arc;
use stencil::{InvocationTable, Model, PathError, ResolveOptions, Value};

#[test]
fn test_strict_mode_rejects_direct_resource_access() {
    let resource = json!({ "list": [{ "key": 1 }, { "key": 2 }, { "key": 3 }] });
    let error = resolve_strict(
        resource,
        json!({ "resourceType": "Resource", "result": "{{ list.key }}" }),
        json!({}),
    )
    .unwrap_err();
    assert!(error.message.contains("Forbidden access"));
    assert_eq!(error.path, "result");
}

#[test]
fn test_strict_mode_rejects_type_name_heads() {
    let resource = json!({ "resourceType": "Resource", "key": [1, 2, 3] });
    assert!(
        resolve_strict(
            resource.clone(),
            json!({ "resourceType": "Resource", "result": "{{ Resource.key }}" }),
            json!({}),
        )
        .is_err()
    );
    assert!(
        resolve_strict(
            resource,
            json!({ "resourceType": "Resource", "result": "{{ UndefinedResource.key }}" }),
            json!({}),
        )
        .is_err()
    );
}

#[test]
fn test_strict_mode_allows_explicit_context_access() {
    let resource = json!({ "list": [{ "key": 1 }, { "key": 2 }, { "key": 3 }] });
    let result = resolve_strict(
        resource.clone(),
        json!({ "resourceType": "Resource", "result": "{{ %Resource.list.key }}" }),
        json!({ "Resource": resource }),
    )
    .unwrap();
    assert_eq!(result, v(json!({ "resourceType": "Resource", "result": 1 })));
}

#[test]
fn test_strict_mode_allows_implicit_context_access() {
    let resource = json!({ "list": [{ "key": 1 }, { "key": 2 }, { "key": 3 }] });
    let result = resolve_strict(
        resource,
        json!({ "resourceType": "Resource", "result": "{{ %context.list.key }}" }),
        json!({}),
    )
    .unwrap();
    assert_eq!(result, v(json!({ "resourceType": "Resource", "result": 1 })));
}

#[test]
fn test_user_invocation_table_is_callable_from_expressions() {
    setup();
    let mut table = InvocationTable::new();
    table.register("pow", |input, args| {
        let exponent = args.first().and_then(Value::as_f64).unwrap_or(2.0);
        input
            .iter()
            .map(|item| {
                item.as_f64()
                    .map(|base| Value::Int(base.powf(exponent) as i64))
                    .ok_or_else(|| PathError::Function {
                        function: "pow".to_string(),
                        message: "expected numeric input".to_string(),
                    })
            })
            .collect()
    });
    let options = ResolveOptions {
        user_invocation_table: Some(Arc::new(table)),
        ..ResolveOptions::default()
    };
    let result = resolve_with_options(
        json!({ "list": [{ "key": 5 }, { "key": 6 }, { "key": 7 }] }),
        json!({ "resourceType": "Resource", "result": "{{ list.key.pow(2) }}" }),
        options,
    )
    .unwrap();
    assert_eq!(result, v(json!({ "resourceType": "Resource", "result": 25 })));
}

#[test]
fn test_model_guides_navigation() {
    setup();
    let model = Model::new().with_alias("value", ["valueString", "valueInteger"]);
    let options = ResolveOptions {
        model: Some(Arc::new(model)),
        ..ResolveOptions::default()
    };
    let result = resolve_with_options(
        json!({ "answer": { "valueString": "yes" } }),
        json!({ "result": "{{ answer.value }}" }),
        options,
    )
    .unwrap();
    assert_eq!(result, v(json!({ "result": "yes" })));
}

#[test]
fn test_unknown_variable_is_a_validation_error() {
    setup();
    let error = resolve_with_options(json!({}), json!({ "r": "{{ %nope }}" }), ResolveOptions::default())
        .unwrap_err();
    assert!(error.message.contains("Cannot evaluate"));
}
