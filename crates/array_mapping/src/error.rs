use thiserror::Error;

use crate::path::PathError;
use crate::registry::Arity;

/// Which field of a rule a path error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathField {
    From,
    To,
    Param(usize),
}

impl std::fmt::Display for PathField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathField::From => f.write_str("from"),
            PathField::To => f.write_str("to"),
            PathField::Param(index) => write!(f, "function.params[{}]", index),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyIssue {
    /// No rule with that key exists in the mapping.
    Unknown,
    /// The rule exists but is not resolved before the dependent rule.
    Forward,
}

impl DependencyIssue {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyIssue::Unknown => "unknown",
            DependencyIssue::Forward => "forward",
        }
    }
}

impl std::fmt::Display for DependencyIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DependencyIssue::Unknown => f.write_str("not defined in the mapping"),
            DependencyIssue::Forward => f.write_str("not resolved before this rule"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RequiredFieldMissing,
    ConditionalRequiredFieldMissing,
    UnknownFunction,
    InvalidDependencyReference,
    MissingTarget,
    InvalidPath,
    DuplicateRule,
    ArityMismatch,
    FunctionFailed,
    TargetConflict,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::RequiredFieldMissing => "RequiredFieldMissing",
            ErrorKind::ConditionalRequiredFieldMissing => "ConditionalRequiredFieldMissing",
            ErrorKind::UnknownFunction => "UnknownFunction",
            ErrorKind::InvalidDependencyReference => "InvalidDependencyReference",
            ErrorKind::MissingTarget => "MissingTarget",
            ErrorKind::InvalidPath => "InvalidPath",
            ErrorKind::DuplicateRule => "DuplicateRule",
            ErrorKind::ArityMismatch => "ArityMismatch",
            ErrorKind::FunctionFailed => "FunctionFailed",
            ErrorKind::TargetConflict => "TargetConflict",
        }
    }

    /// Configuration errors are detected before any rule is resolved.
    pub fn is_configuration(&self) -> bool {
        !matches!(
            self,
            ErrorKind::RequiredFieldMissing
                | ErrorKind::ConditionalRequiredFieldMissing
                | ErrorKind::FunctionFailed
                | ErrorKind::TargetConflict
        )
    }
}

/// Failure of a whole resolution call. Every variant carries the key of the
/// offending rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("field {field} is required (rule '{rule}')")]
    RequiredFieldMissing { rule: String, field: String },

    #[error(
        "field {field} is required when [{}] are present (rule '{rule}')",
        .dependencies.join(", ")
    )]
    ConditionalRequiredFieldMissing {
        rule: String,
        field: String,
        dependencies: Vec<String>,
    },

    #[error("function '{function}' is not registered (rule '{rule}')")]
    UnknownFunction { rule: String, function: String },

    #[error("dependency '{dependency}' is {reason} (rule '{rule}')")]
    InvalidDependencyReference {
        rule: String,
        dependency: String,
        reason: DependencyIssue,
    },

    #[error("rule '{rule}' has no target path")]
    MissingTarget { rule: String },

    #[error("{field} path '{path}' is invalid: {reason} (rule '{rule}')")]
    InvalidPath {
        rule: String,
        field: PathField,
        path: String,
        reason: PathError,
    },

    #[error("rule '{rule}' is defined more than once")]
    DuplicateRule { rule: String },

    #[error(
        "function '{function}' expects {expected} argument(s), got {actual} (rule '{rule}')"
    )]
    ArityMismatch {
        rule: String,
        function: String,
        expected: Arity,
        actual: usize,
    },

    #[error("function '{function}' failed: {message} (rule '{rule}')")]
    FunctionFailed {
        rule: String,
        function: String,
        message: String,
    },

    #[error("target path '{to}' conflicts with an existing non-container value (rule '{rule}')")]
    TargetConflict { rule: String, to: String },
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::RequiredFieldMissing { .. } => ErrorKind::RequiredFieldMissing,
            ResolveError::ConditionalRequiredFieldMissing { .. } => {
                ErrorKind::ConditionalRequiredFieldMissing
            }
            ResolveError::UnknownFunction { .. } => ErrorKind::UnknownFunction,
            ResolveError::InvalidDependencyReference { .. } => {
                ErrorKind::InvalidDependencyReference
            }
            ResolveError::MissingTarget { .. } => ErrorKind::MissingTarget,
            ResolveError::InvalidPath { .. } => ErrorKind::InvalidPath,
            ResolveError::DuplicateRule { .. } => ErrorKind::DuplicateRule,
            ResolveError::ArityMismatch { .. } => ErrorKind::ArityMismatch,
            ResolveError::FunctionFailed { .. } => ErrorKind::FunctionFailed,
            ResolveError::TargetConflict { .. } => ErrorKind::TargetConflict,
        }
    }

    /// Key of the rule that caused the error.
    pub fn rule(&self) -> &str {
        match self {
            ResolveError::RequiredFieldMissing { rule, .. }
            | ResolveError::ConditionalRequiredFieldMissing { rule, .. }
            | ResolveError::UnknownFunction { rule, .. }
            | ResolveError::InvalidDependencyReference { rule, .. }
            | ResolveError::MissingTarget { rule }
            | ResolveError::InvalidPath { rule, .. }
            | ResolveError::DuplicateRule { rule }
            | ResolveError::ArityMismatch { rule, .. }
            | ResolveError::FunctionFailed { rule, .. }
            | ResolveError::TargetConflict { rule, .. } => rule,
        }
    }
}

/// All configuration errors of a spec, in rule order.
pub type ValidationResult = Result<(), Vec<ResolveError>>;
