use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use thiserror::Error;

/// Error returned by a registered function. The resolver wraps it into
/// [`ResolveError::FunctionFailed`](crate::ResolveError::FunctionFailed).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FunctionError {
    pub message: String,
}

impl FunctionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type FunctionResult = Result<JsonValue, FunctionError>;

type Callable = Arc<dyn Fn(&[JsonValue]) -> FunctionResult + Send + Sync>;

/// Number of positional arguments a function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(expected) => count == expected,
            Arity::AtLeast(min) => count >= min,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(expected) => write!(f, "{}", expected),
            Arity::AtLeast(min) => write!(f, "at least {}", min),
        }
    }
}

#[derive(Clone)]
pub struct RegisteredFunction {
    name: String,
    arity: Arity,
    callable: Callable,
}

impl RegisteredFunction {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Arguments are passed positionally. A `null` return means the function
    /// produced no value.
    pub fn call(&self, args: &[JsonValue]) -> FunctionResult {
        if !self.arity.accepts(args.len()) {
            return Err(FunctionError::new(format!(
                "expected {} argument(s), got {}",
                self.arity,
                args.len()
            )));
        }
        (self.callable)(args)
    }
}

impl fmt::Debug for RegisteredFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Named functions that rules can reference through `function.name`.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, RegisteredFunction>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `function` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, arity: Arity, function: F) -> &mut Self
    where
        F: Fn(&[JsonValue]) -> FunctionResult + Send + Sync + 'static,
    {
        let name = name.into();
        self.functions.insert(
            name.clone(),
            RegisteredFunction {
                name,
                arity,
                callable: Arc::new(function),
            },
        );
        self
    }

    pub fn with<F>(mut self, name: impl Into<String>, arity: Arity, function: F) -> Self
    where
        F: Fn(&[JsonValue]) -> FunctionResult + Send + Sync + 'static,
    {
        self.register(name, arity, function);
        self
    }

    pub fn register_unary<F>(&mut self, name: impl Into<String>, function: F) -> &mut Self
    where
        F: Fn(&JsonValue) -> FunctionResult + Send + Sync + 'static,
    {
        self.register(name, Arity::Exact(1), move |args| function(&args[0]))
    }

    pub fn register_binary<F>(&mut self, name: impl Into<String>, function: F) -> &mut Self
    where
        F: Fn(&JsonValue, &JsonValue) -> FunctionResult + Send + Sync + 'static,
    {
        self.register(name, Arity::Exact(2), move |args| function(&args[0], &args[1]))
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredFunction> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
