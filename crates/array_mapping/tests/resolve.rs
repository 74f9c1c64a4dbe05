use std::thread;

use array_mapping::{
    resolve, Arity, DependencyIssue, FunctionError, FunctionRegistry, MappingPlan, MappingSpec,
    ResolveError, Rule,
};
use serde_json::{json, Value as JsonValue};

fn concat_with_space() -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();
    registry.register_binary("concat", |first, last| {
        match (first.as_str(), last.as_str()) {
            (Some(first), Some(last)) => Ok(json!(format!("{} {}", first, last))),
            _ => Ok(JsonValue::Null),
        }
    });
    registry
}

fn dependent_spec() -> MappingSpec {
    MappingSpec::new()
        .rule("first_rule_key", Rule::new("x").source("a"))
        .rule(
            "second",
            Rule::new("y").source("b").depends_on(["first_rule_key"]),
        )
}

#[test]
fn plain_rules_copy_values() {
    let spec = MappingSpec::new()
        .rule("name", Rule::new("person.name").source("user.name"))
        .rule("age", Rule::new("age").source("user.age"));
    let input = json!({ "user": { "name": "Ada", "age": 36 } });

    let output = resolve(&spec, &FunctionRegistry::new(), &input).unwrap();

    assert_eq!(output, json!({ "person": { "name": "Ada" }, "age": 36 }));
}

#[test]
fn absent_value_without_default_is_skipped() {
    let spec = MappingSpec::new()
        .rule("name", Rule::new("name").source("user.name"))
        .rule("city", Rule::new("address.city").source("user.city"));
    let input = json!({ "user": { "name": "Ada", "city": null } });

    let output = resolve(&spec, &FunctionRegistry::new(), &input).unwrap();

    assert_eq!(output, json!({ "name": "Ada" }));
}

#[test]
fn default_replaces_absent_value_exactly() {
    let default = json!({ "tags": ["a", "b"], "level": 3 });
    let spec = MappingSpec::new().rule(
        "settings",
        Rule::new("settings")
            .source("prefs")
            .default_value(default.clone()),
    );

    let output = resolve(&spec, &FunctionRegistry::new(), &json!({})).unwrap();

    assert_eq!(output["settings"], default);
}

#[test]
fn default_replaces_explicit_null() {
    let spec = MappingSpec::new().rule(
        "status",
        Rule::new("status").source("status").default_value(json!("new")),
    );

    let output = resolve(&spec, &FunctionRegistry::new(), &json!({ "status": null })).unwrap();

    assert_eq!(output, json!({ "status": "new" }));
}

#[test]
fn rule_without_source_uses_default() {
    let spec = MappingSpec::new().rule("kind", Rule::new("meta.kind").default_value(json!("user")));

    let output = resolve(&spec, &FunctionRegistry::new(), &json!({})).unwrap();

    assert_eq!(output, json!({ "meta": { "kind": "user" } }));
}

#[test]
fn required_rule_fails_naming_source_path() {
    let spec = MappingSpec::new().rule("x_rule", Rule::new("x").source("a.b").required());

    let err = resolve(&spec, &FunctionRegistry::new(), &json!({})).unwrap_err();

    assert_eq!(
        err,
        ResolveError::RequiredFieldMissing {
            rule: "x_rule".to_string(),
            field: "a.b".to_string(),
        }
    );
    assert!(err.to_string().contains("a.b"));
}

#[test]
fn required_rule_without_source_is_named_by_key() {
    let spec = MappingSpec::new().rule("token", Rule::new("auth.token").required());

    let err = resolve(&spec, &FunctionRegistry::new(), &json!({})).unwrap_err();

    assert_eq!(
        err,
        ResolveError::RequiredFieldMissing {
            rule: "token".to_string(),
            field: "token".to_string(),
        }
    );
}

#[test]
fn required_rule_is_satisfied_by_default() {
    let spec = MappingSpec::new().rule(
        "lang",
        Rule::new("lang")
            .source("locale")
            .default_value(json!("en"))
            .required(),
    );

    let output = resolve(&spec, &FunctionRegistry::new(), &json!({})).unwrap();

    assert_eq!(output, json!({ "lang": "en" }));
}

#[test]
fn dependency_present_makes_rule_conditionally_required() {
    let err = resolve(&dependent_spec(), &FunctionRegistry::new(), &json!({ "a": 1 })).unwrap_err();

    assert_eq!(
        err,
        ResolveError::ConditionalRequiredFieldMissing {
            rule: "second".to_string(),
            field: "b".to_string(),
            dependencies: vec!["first_rule_key".to_string()],
        }
    );
}

#[test]
fn dependency_absent_leaves_rule_optional() {
    let output = resolve(&dependent_spec(), &FunctionRegistry::new(), &json!({})).unwrap();

    assert_eq!(output, json!({}));
}

#[test]
fn dependency_satisfied_and_value_present_writes_both() {
    let input = json!({ "a": 1, "b": 2 });

    let output = resolve(&dependent_spec(), &FunctionRegistry::new(), &input).unwrap();

    assert_eq!(output, json!({ "x": 1, "y": 2 }));
}

#[test]
fn every_dependency_must_be_present() {
    let spec = MappingSpec::new()
        .rule("street", Rule::new("address.street").source("street"))
        .rule("city", Rule::new("address.city").source("city"))
        .rule(
            "zip",
            Rule::new("address.zip")
                .source("zip")
                .depends_on(["street", "city"]),
        );

    let partial = resolve(&spec, &FunctionRegistry::new(), &json!({ "street": "Main" })).unwrap();
    assert_eq!(partial, json!({ "address": { "street": "Main" } }));

    let err = resolve(
        &spec,
        &FunctionRegistry::new(),
        &json!({ "street": "Main", "city": "Paris" }),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ResolveError::ConditionalRequiredFieldMissing { ref rule, .. } if rule == "zip"
    ));
}

#[test]
fn dependency_satisfied_by_default_of_earlier_rule() {
    let spec = MappingSpec::new()
        .rule("country", Rule::new("country").source("country").default_value(json!("FR")))
        .rule("vat", Rule::new("vat").source("vat").depends_on(["country"]));

    let err = resolve(&spec, &FunctionRegistry::new(), &json!({})).unwrap_err();

    assert_eq!(err.rule(), "vat");
}

#[test]
fn empty_dependency_list_always_applies() {
    let spec = MappingSpec::new().rule(
        "code",
        Rule::new("code").source("code").depends_on(Vec::<String>::new()),
    );

    let err = resolve(&spec, &FunctionRegistry::new(), &json!({})).unwrap_err();

    assert!(matches!(err, ResolveError::ConditionalRequiredFieldMissing { .. }));
}

#[test]
fn forward_dependency_fails_before_any_rule_runs() {
    let spec = MappingSpec::new()
        .rule("id", Rule::new("id").source("id").required())
        .rule("y", Rule::new("y").source("b").depends_on(["x"]))
        .rule("x", Rule::new("x").source("a"));

    // `id` would fail at resolution time, but the forward reference wins.
    let err = resolve(&spec, &FunctionRegistry::new(), &json!({})).unwrap_err();

    assert_eq!(
        err,
        ResolveError::InvalidDependencyReference {
            rule: "y".to_string(),
            dependency: "x".to_string(),
            reason: DependencyIssue::Forward,
        }
    );
}

#[test]
fn self_dependency_is_a_forward_reference() {
    let spec = MappingSpec::new().rule("x", Rule::new("x").source("a").depends_on(["x"]));

    let err = resolve(&spec, &FunctionRegistry::new(), &json!({ "a": 1 })).unwrap_err();

    assert!(matches!(
        err,
        ResolveError::InvalidDependencyReference {
            reason: DependencyIssue::Forward,
            ..
        }
    ));
}

#[test]
fn unknown_dependency_is_rejected() {
    let spec = MappingSpec::new().rule("y", Rule::new("y").source("b").depends_on(["ghost"]));

    let err = resolve(&spec, &FunctionRegistry::new(), &json!({ "b": 1 })).unwrap_err();

    assert_eq!(
        err,
        ResolveError::InvalidDependencyReference {
            rule: "y".to_string(),
            dependency: "ghost".to_string(),
            reason: DependencyIssue::Unknown,
        }
    );
}

#[test]
fn function_receives_values_from_input() {
    let spec = MappingSpec::new().rule("full", Rule::new("full").computed("concat", ["first", "last"]));
    let input = json!({ "first": "Jane", "last": "Doe" });

    let output = resolve(&spec, &concat_with_space(), &input).unwrap();

    assert_eq!(output, json!({ "full": "Jane Doe" }));
}

#[test]
fn function_ignores_source_path() {
    let spec = MappingSpec::new().rule(
        "full",
        Rule::new("full")
            .source("nickname")
            .computed("concat", ["first", "last"]),
    );
    let input = json!({ "nickname": "JD", "first": "Jane", "last": "Doe" });

    let output = resolve(&spec, &concat_with_space(), &input).unwrap();

    assert_eq!(output, json!({ "full": "Jane Doe" }));
}

#[test]
fn function_params_read_input_not_output() {
    let mut registry = FunctionRegistry::new();
    registry.register_unary("echo", |value| Ok(value.clone()));
    let spec = MappingSpec::new()
        .rule("a", Rule::new("copied").source("original"))
        .rule("b", Rule::new("echoed").computed("echo", ["copied"]));

    let output = resolve(&spec, &registry, &json!({ "original": 1 })).unwrap();

    assert_eq!(output, json!({ "copied": 1 }));
}

#[test]
fn missing_params_are_passed_as_null() {
    let mut registry = FunctionRegistry::new();
    registry.register("count_missing", Arity::AtLeast(0), |args| {
        Ok(json!(args.iter().filter(|value| value.is_null()).count()))
    });
    let spec = MappingSpec::new().rule(
        "missing",
        Rule::new("missing").computed("count_missing", ["a", "b", "c.d"]),
    );

    let output = resolve(&spec, &registry, &json!({ "a": 1, "c": 5 })).unwrap();

    assert_eq!(output, json!({ "missing": 2 }));
}

#[test]
fn function_null_result_falls_back_to_default() {
    let spec = MappingSpec::new().rule(
        "full",
        Rule::new("full")
            .computed("concat", ["first", "last"])
            .default_value(json!("unknown")),
    );

    let output = resolve(&spec, &concat_with_space(), &json!({ "first": "Jane" })).unwrap();

    assert_eq!(output, json!({ "full": "unknown" }));
}

#[test]
fn function_error_is_attributed_to_rule() {
    let mut registry = FunctionRegistry::new();
    registry.register_unary("fail", |_| Err(FunctionError::new("boom")));
    let spec = MappingSpec::new().rule("broken", Rule::new("out").computed("fail", ["a"]));

    let err = resolve(&spec, &registry, &json!({})).unwrap_err();

    assert_eq!(
        err,
        ResolveError::FunctionFailed {
            rule: "broken".to_string(),
            function: "fail".to_string(),
            message: "boom".to_string(),
        }
    );
}

#[test]
fn unknown_function_is_a_configuration_error() {
    let spec = MappingSpec::new()
        .rule("id", Rule::new("id").source("id").required())
        .rule("full", Rule::new("full").computed("nope", ["first"]));

    let err = resolve(&spec, &FunctionRegistry::new(), &json!({})).unwrap_err();

    assert_eq!(
        err,
        ResolveError::UnknownFunction {
            rule: "full".to_string(),
            function: "nope".to_string(),
        }
    );
}

#[test]
fn wrong_param_count_is_rejected() {
    let spec = MappingSpec::new().rule("full", Rule::new("full").computed("concat", ["first"]));

    let err = resolve(&spec, &concat_with_space(), &json!({})).unwrap_err();

    assert_eq!(
        err,
        ResolveError::ArityMismatch {
            rule: "full".to_string(),
            function: "concat".to_string(),
            expected: Arity::Exact(2),
            actual: 1,
        }
    );
}

#[test]
fn nested_target_creates_containers() {
    let spec = MappingSpec::new().rule("deep", Rule::new("a.b.c").source("value"));

    let output = resolve(&spec, &FunctionRegistry::new(), &json!({ "value": 7 })).unwrap();

    assert_eq!(output, json!({ "a": { "b": { "c": 7 } } }));
}

#[test]
fn later_rule_overwrites_same_target() {
    let spec = MappingSpec::new()
        .rule("first", Rule::new("name").source("a"))
        .rule("second", Rule::new("name").source("b"));

    let output = resolve(&spec, &FunctionRegistry::new(), &json!({ "a": 1, "b": 2 })).unwrap();

    assert_eq!(output, json!({ "name": 2 }));
}

#[test]
fn target_through_scalar_conflicts() {
    let spec = MappingSpec::new()
        .rule("name", Rule::new("user").source("name"))
        .rule("age", Rule::new("user.age").source("age"));

    let err = resolve(
        &spec,
        &FunctionRegistry::new(),
        &json!({ "name": "Ada", "age": 36 }),
    )
    .unwrap_err();

    assert_eq!(
        err,
        ResolveError::TargetConflict {
            rule: "age".to_string(),
            to: "user.age".to_string(),
        }
    );
}

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn compiled_plan_is_send_and_sync() {
    assert_send_sync::<MappingPlan<'static>>();
    assert_send_sync::<FunctionRegistry>();
}

#[test]
fn plan_is_shared_across_threads() {
    let spec = dependent_spec();
    let registry = FunctionRegistry::with_builtins();
    let plan = MappingPlan::compile(&spec, &registry).unwrap();

    let outputs: Vec<JsonValue> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|n| {
                let plan = &plan;
                scope.spawn(move || plan.resolve(&json!({ "a": n, "b": n * 10 })).unwrap())
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    for (n, output) in outputs.into_iter().enumerate() {
        assert_eq!(output, json!({ "x": n, "y": n * 10 }));
    }
}

#[test]
fn compiled_plan_resolves_many_inputs() {
    let registry = FunctionRegistry::new();
    let spec = dependent_spec();
    let plan = MappingPlan::compile(&spec, &registry).unwrap();

    assert_eq!(plan.len(), 2);
    assert_eq!(plan.resolve(&json!({})).unwrap(), json!({}));
    assert_eq!(plan.resolve(&json!({ "b": "only" })).unwrap(), json!({ "y": "only" }));
    assert!(plan.resolve(&json!({ "a": true })).is_err());
}
