mod builtins;
mod error;
mod model;
pub mod path;
mod registry;
mod resolve;
mod validator;

pub use builtins::register_builtins;
pub use error::{DependencyIssue, ErrorKind, PathField, ResolveError, ValidationResult};
pub use model::{FunctionCall, MappingSpec, Rule};
pub use path::{DottedPath, PathError};
pub use registry::{Arity, FunctionError, FunctionRegistry, FunctionResult, RegisteredFunction};
pub use resolve::{resolve, MappingPlan};
pub use validator::validate_mapping_spec;
