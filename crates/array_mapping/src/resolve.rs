use std::collections::HashMap;

use serde_json::{Map, Value as JsonValue};

use crate::error::{DependencyIssue, PathField, ResolveError};
use crate::model::{MappingSpec, Rule};
use crate::path::{self, DottedPath};
use crate::registry::{FunctionRegistry, RegisteredFunction};

/// Resolves `spec` against `input` in one call.
///
/// Fails with the first configuration error before any rule runs, then with
/// the first constraint violation. No partial output is returned.
pub fn resolve(
    spec: &MappingSpec,
    registry: &FunctionRegistry,
    input: &JsonValue,
) -> Result<JsonValue, ResolveError> {
    MappingPlan::compile(spec, registry)?.resolve(input)
}

/// A mapping spec checked against a function registry, with every path
/// parsed and every dependency bound to an earlier rule.
///
/// A plan only reads its spec and registry, so one plan can resolve many
/// inputs, from several threads.
#[derive(Debug)]
pub struct MappingPlan<'a> {
    rules: Vec<PlannedRule<'a>>,
}

#[derive(Debug)]
struct PlannedRule<'a> {
    key: &'a str,
    rule: &'a Rule,
    to: DottedPath,
    value: ValueSource<'a>,
    dependencies: Option<Vec<usize>>,
}

#[derive(Debug)]
enum ValueSource<'a> {
    Function {
        function: &'a RegisteredFunction,
        params: Vec<DottedPath>,
    },
    Path(DottedPath),
    Nothing,
}

impl<'a> MappingPlan<'a> {
    pub fn compile(
        spec: &'a MappingSpec,
        registry: &'a FunctionRegistry,
    ) -> Result<Self, ResolveError> {
        let mut errors = Vec::new();
        let rules = compile_rules(spec, registry, &mut errors);
        match errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(Self { rules }),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn resolve(&self, input: &JsonValue) -> Result<JsonValue, ResolveError> {
        let mut out = JsonValue::Object(Map::new());
        for planned in &self.rules {
            self.apply_rule(planned, input, &mut out)?;
        }
        Ok(out)
    }

    fn apply_rule(
        &self,
        planned: &PlannedRule<'a>,
        input: &JsonValue,
        out: &mut JsonValue,
    ) -> Result<(), ResolveError> {
        let candidate = candidate_value(planned, input)?;

        if planned.rule.required && candidate.is_none() {
            return Err(ResolveError::RequiredFieldMissing {
                rule: planned.key.to_string(),
                field: field_name(planned),
            });
        }

        if let Some(dependencies) = &planned.dependencies {
            let satisfied = dependencies.iter().all(|&index| {
                path::is_present(path::read(&*out, self.rules[index].to.segments()))
            });
            if satisfied && candidate.is_none() {
                return Err(ResolveError::ConditionalRequiredFieldMissing {
                    rule: planned.key.to_string(),
                    field: field_name(planned),
                    dependencies: dependencies
                        .iter()
                        .map(|&index| self.rules[index].key.to_string())
                        .collect(),
                });
            }
        }

        if let Some(value) = candidate {
            path::write(out, planned.to.segments(), value).map_err(|_| {
                ResolveError::TargetConflict {
                    rule: planned.key.to_string(),
                    to: planned.to.to_string(),
                }
            })?;
        }
        Ok(())
    }
}

/// `None` means absent: nothing was found and no default applies.
fn candidate_value(
    planned: &PlannedRule<'_>,
    input: &JsonValue,
) -> Result<Option<JsonValue>, ResolveError> {
    let value = match &planned.value {
        ValueSource::Function { function, params } => {
            let args: Vec<JsonValue> = params
                .iter()
                .map(|param| {
                    path::read(input, param.segments())
                        .cloned()
                        .unwrap_or(JsonValue::Null)
                })
                .collect();
            let result = function
                .call(&args)
                .map_err(|err| ResolveError::FunctionFailed {
                    rule: planned.key.to_string(),
                    function: function.name().to_string(),
                    message: err.message,
                })?;
            Some(result)
        }
        ValueSource::Path(from) => path::read(input, from.segments()).cloned(),
        ValueSource::Nothing => None,
    };

    let value = value.filter(|value| !value.is_null());
    Ok(value.or_else(|| planned.rule.default.clone().filter(|value| !value.is_null())))
}

fn field_name(planned: &PlannedRule<'_>) -> String {
    planned
        .rule
        .from
        .clone()
        .unwrap_or_else(|| planned.key.to_string())
}

/// Every configuration error of `spec`, in rule order.
pub(crate) fn configuration_errors(
    spec: &MappingSpec,
    registry: &FunctionRegistry,
) -> Vec<ResolveError> {
    let mut errors = Vec::new();
    compile_rules(spec, registry, &mut errors);
    errors
}

/// Compiles every rule, pushing configuration errors in rule order. Rules
/// with errors are left out of the returned plan.
fn compile_rules<'a>(
    spec: &'a MappingSpec,
    registry: &'a FunctionRegistry,
    errors: &mut Vec<ResolveError>,
) -> Vec<PlannedRule<'a>> {
    // First position of each key; later duplicates are errors.
    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(spec.len());
    for (index, (key, _)) in spec.iter().enumerate() {
        positions.entry(key).or_insert(index);
    }

    let mut planned = Vec::with_capacity(spec.len());
    // Plan index of each spec rule that compiled.
    let mut plan_index: Vec<Option<usize>> = Vec::with_capacity(spec.len());

    for (index, (key, rule)) in spec.iter().enumerate() {
        let before = errors.len();

        if positions.get(key) != Some(&index) {
            errors.push(ResolveError::DuplicateRule {
                rule: key.to_string(),
            });
        }

        let to = if rule.to.trim().is_empty() {
            errors.push(ResolveError::MissingTarget {
                rule: key.to_string(),
            });
            None
        } else {
            parse_rule_path(key, PathField::To, &rule.to, errors)
        };

        let value = compile_value(key, rule, registry, errors);
        let dependencies = rule.dependencies.as_ref().map(|names| {
            names
                .iter()
                .filter_map(|name| {
                    compile_dependency(key, index, name, &positions, &plan_index, errors)
                })
                .collect::<Vec<usize>>()
        });

        match (to, value) {
            (Some(to), Some(value)) if errors.len() == before => {
                plan_index.push(Some(planned.len()));
                planned.push(PlannedRule {
                    key,
                    rule,
                    to,
                    value,
                    dependencies,
                });
            }
            _ => plan_index.push(None),
        }
    }

    planned
}

fn compile_value<'a>(
    key: &str,
    rule: &Rule,
    registry: &'a FunctionRegistry,
    errors: &mut Vec<ResolveError>,
) -> Option<ValueSource<'a>> {
    if let Some(call) = &rule.function {
        let function = registry.get(&call.name);
        if function.is_none() {
            errors.push(ResolveError::UnknownFunction {
                rule: key.to_string(),
                function: call.name.clone(),
            });
        }
        if let Some(function) = function {
            if !function.arity().accepts(call.params.len()) {
                errors.push(ResolveError::ArityMismatch {
                    rule: key.to_string(),
                    function: call.name.clone(),
                    expected: function.arity(),
                    actual: call.params.len(),
                });
            }
        }

        let params: Vec<Option<DottedPath>> = call
            .params
            .iter()
            .enumerate()
            .map(|(index, param)| parse_rule_path(key, PathField::Param(index), param, errors))
            .collect();
        let params: Option<Vec<DottedPath>> = params.into_iter().collect();

        return Some(ValueSource::Function {
            function: function?,
            params: params?,
        });
    }

    match &rule.from {
        Some(from) => parse_rule_path(key, PathField::From, from, errors).map(ValueSource::Path),
        None => Some(ValueSource::Nothing),
    }
}

fn compile_dependency(
    key: &str,
    index: usize,
    name: &str,
    positions: &HashMap<&str, usize>,
    plan_index: &[Option<usize>],
    errors: &mut Vec<ResolveError>,
) -> Option<usize> {
    let issue = match positions.get(name) {
        None => DependencyIssue::Unknown,
        Some(&position) if position >= index => DependencyIssue::Forward,
        Some(&position) => return plan_index[position],
    };
    errors.push(ResolveError::InvalidDependencyReference {
        rule: key.to_string(),
        dependency: name.to_string(),
        reason: issue,
    });
    None
}

fn parse_rule_path(
    key: &str,
    field: PathField,
    path: &str,
    errors: &mut Vec<ResolveError>,
) -> Option<DottedPath> {
    match DottedPath::parse(path) {
        Ok(parsed) => Some(parsed),
        Err(reason) => {
            errors.push(ResolveError::InvalidPath {
                rule: key.to_string(),
                field,
                path: path.to_string(),
                reason,
            });
            None
        }
    }
}
