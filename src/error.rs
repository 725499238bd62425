//! Error types and Result aliases for exprgen

use thiserror::Error;

/// Broad error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Generic error
    Error,
    /// Internal logic error (compiler defect)
    Internal,
    /// Operator invoked with the wrong number of arguments
    Arity,
    /// No generator registered for the requested signature
    NotFound,
}

impl ErrorCode {
    /// Get the code name as a string
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCode::Error => "error",
            ErrorCode::Internal => "internal",
            ErrorCode::Arity => "arity",
            ErrorCode::NotFound => "not found",
        }
    }
}

/// Compile-time error raised while generating or linking bytecode
#[derive(Debug, Clone, Error)]
#[error("{}", self.display_message())]
pub struct Error {
    code: ErrorCode,
    message: Option<String>,
}

impl Error {
    /// Create an error with just a code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            message: None,
        }
    }

    /// Create an error with a code and message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    /// Create an arity error for an operator invoked with the wrong
    /// number of arguments
    pub fn arity(name: &str, expected: usize, actual: usize) -> Self {
        Self::with_message(
            ErrorCode::Arity,
            format!("{} expects {} arguments, got {}", name, expected, actual),
        )
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the error message, if any
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    fn display_message(&self) -> String {
        match &self.message {
            Some(msg) => format!("{}: {}", self.code.name(), msg),
            None => self.code.name().to_string(),
        }
    }
}

/// Result type alias for exprgen operations
pub type Result<T> = std::result::Result<T, Error>;
