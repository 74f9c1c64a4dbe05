use crate::error::ValidationResult;
use crate::model::MappingSpec;
use crate::registry::FunctionRegistry;
use crate::resolve::configuration_errors;

/// Checks `spec` against `registry` without resolving anything.
///
/// Unlike [`MappingPlan::compile`](crate::MappingPlan::compile), which stops
/// at the first problem, this reports every configuration error in rule
/// order.
pub fn validate_mapping_spec(spec: &MappingSpec, registry: &FunctionRegistry) -> ValidationResult {
    let errors = configuration_errors(spec, registry);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
