//! Structured error handling for storylogic
//!
//! Every failure the core can report is a [`CoreError`]. Errors carry the
//! offending text and enough structure (symbol name, expected and actual
//! arity, scope name) for a caller to build a corrective re-prompt.
//!
//! # Error Categories
//!
//! - `Syntax` - malformed formula text
//! - `UnresolvedRelation` / `ArityMismatch` / `SortMismatch` - symbol resolution
//! - `UnknownScope` - a formula routed to an undeclared scope
//! - `InvalidDeclaration` - malformed object/relation/scope declaration lines
//! - `Solver` - the satisfiability engine gave up (resource exhaustion)
//! - `Config` / `Io` - ambient layers
//!
//! # Example
//!
//! ```rust,ignore
//! use storylogic::error::{CoreError, ErrorCode};
//!
//! let err = CoreError::unresolved_relation("teleports");
//! assert_eq!(err.code(), ErrorCode::UnresolvedRelation);
//! assert!(err.is_recoverable());
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fol::SyntaxError;

// ============================================================================
// Error Codes
// ============================================================================

/// Unique error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Formula text errors (1xxx)
    /// Generic syntax error
    SyntaxError = 1000,
    /// Quote character inside a formula
    StringLiteral = 1001,
    /// Parentheses do not balance after auto-closing
    UnbalancedParens = 1002,
    /// Input ended before the formula was complete
    UnexpectedEof = 1003,
    /// Quantifier header without body or terminating dot
    UnterminatedQuantifier = 1004,
    /// Malformed `scope|:` prefix or macro line
    MalformedLine = 1005,

    // Symbol errors (2xxx)
    /// Application of an undeclared relation
    UnresolvedRelation = 2000,
    /// Wrong number of arguments
    ArityMismatch = 2001,
    /// Formula routed to an undeclared scope
    UnknownScope = 2002,
    /// Boolean relation used where an integer term is required
    SortMismatch = 2003,
    /// Malformed declaration line
    InvalidDeclaration = 2004,

    // Solver errors (3xxx)
    /// Satisfiability engine failure
    SolverError = 3000,

    // Config errors (7xxx)
    /// Generic config error
    ConfigError = 7000,

    // Internal errors (9xxx)
    /// I/O or serialization error
    IoError = 9000,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a short description of the error code
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::SyntaxError => "Syntax error",
            ErrorCode::StringLiteral => "String literal in formula",
            ErrorCode::UnbalancedParens => "Unbalanced parentheses",
            ErrorCode::UnexpectedEof => "Unexpected end of formula",
            ErrorCode::UnterminatedQuantifier => "Unterminated quantifier",
            ErrorCode::MalformedLine => "Malformed line",
            ErrorCode::UnresolvedRelation => "Relation not found",
            ErrorCode::ArityMismatch => "Arity mismatch",
            ErrorCode::UnknownScope => "Unknown scope",
            ErrorCode::SortMismatch => "Sort mismatch",
            ErrorCode::InvalidDeclaration => "Invalid declaration",
            ErrorCode::SolverError => "Solver error",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::IoError => "I/O error",
        }
    }

    /// Whether a caller may fix the input and resubmit the same turn
    pub fn is_recoverable(&self) -> bool {
        self.code() < 3000
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

// ============================================================================
// Main Error Type
// ============================================================================

/// The main error type for storylogic
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    #[error("Syntax error when parsing formula `{text}`: {error}")]
    Syntax { text: String, error: SyntaxError },

    #[error("Relation {name}() not found in relation table (in `{text}`)")]
    UnresolvedRelation { name: String, text: String },

    #[error("Relation {name} expects {expected} argument(s) but got {actual} (in `{text}`)")]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
        text: String,
    },

    #[error("Scope {scope} not found in scope table (in `{text}`)")]
    UnknownScope { scope: String, text: String },

    #[error("Sort mismatch: {detail} (in `{text}`)")]
    SortMismatch { detail: String, text: String },

    #[error("Invalid declaration `{line}`: {reason}")]
    InvalidDeclaration { line: String, reason: String },

    #[error("Solver error: {message}")]
    Solver { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {message}")]
    Io { message: String },
}

impl CoreError {
    // ========================================================================
    // Factory methods
    // ========================================================================

    /// A syntax error for the given formula text
    pub fn syntax(text: impl Into<String>, error: SyntaxError) -> Self {
        CoreError::Syntax { text: text.into(), error }
    }

    /// An application of an undeclared relation
    pub fn unresolved_relation(name: impl Into<String>) -> Self {
        CoreError::UnresolvedRelation { name: name.into(), text: String::new() }
    }

    /// An application with the wrong number of arguments
    pub fn arity_mismatch(name: impl Into<String>, expected: usize, actual: usize) -> Self {
        CoreError::ArityMismatch {
            name: name.into(),
            expected,
            actual,
            text: String::new(),
        }
    }

    /// A formula routed to an undeclared scope
    pub fn unknown_scope(scope: impl Into<String>, text: impl Into<String>) -> Self {
        CoreError::UnknownScope { scope: scope.into(), text: text.into() }
    }

    /// A boolean relation used as an integer term
    pub fn sort_mismatch(detail: impl Into<String>) -> Self {
        CoreError::SortMismatch { detail: detail.into(), text: String::new() }
    }

    /// A malformed declaration line
    pub fn invalid_declaration(line: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidDeclaration { line: line.into(), reason: reason.into() }
    }

    /// A solver failure
    pub fn solver(message: impl Into<String>) -> Self {
        CoreError::Solver { message: message.into() }
    }

    /// A configuration failure
    pub fn config(message: impl Into<String>) -> Self {
        CoreError::Config { message: message.into() }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Attach the offending formula text, replacing whatever was recorded
    pub fn with_text(mut self, source: impl Into<String>) -> Self {
        let source = source.into();
        match &mut self {
            CoreError::Syntax { text, .. }
            | CoreError::UnresolvedRelation { text, .. }
            | CoreError::ArityMismatch { text, .. }
            | CoreError::UnknownScope { text, .. }
            | CoreError::SortMismatch { text, .. } => *text = source,
            CoreError::InvalidDeclaration { line, .. } => *line = source,
            CoreError::Solver { .. } | CoreError::Config { .. } | CoreError::Io { .. } => {}
        }
        self
    }

    /// The offending input text, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            CoreError::Syntax { text, .. }
            | CoreError::UnresolvedRelation { text, .. }
            | CoreError::ArityMismatch { text, .. }
            | CoreError::UnknownScope { text, .. }
            | CoreError::SortMismatch { text, .. } => Some(text),
            CoreError::InvalidDeclaration { line, .. } => Some(line),
            CoreError::Solver { .. } | CoreError::Config { .. } | CoreError::Io { .. } => None,
        }
    }

    /// Error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::Syntax { error, .. } => match error {
                SyntaxError::StringLiteral { .. } => ErrorCode::StringLiteral,
                SyntaxError::UnbalancedParens { .. } => ErrorCode::UnbalancedParens,
                SyntaxError::UnexpectedEnd { .. } | SyntaxError::Empty => ErrorCode::UnexpectedEof,
                SyntaxError::UnterminatedQuantifier { .. } => ErrorCode::UnterminatedQuantifier,
                SyntaxError::MalformedLine { .. } => ErrorCode::MalformedLine,
                SyntaxError::UnexpectedChar { .. }
                | SyntaxError::InvalidInteger { .. }
                | SyntaxError::UnexpectedToken { .. } => ErrorCode::SyntaxError,
            },
            CoreError::UnresolvedRelation { .. } => ErrorCode::UnresolvedRelation,
            CoreError::ArityMismatch { .. } => ErrorCode::ArityMismatch,
            CoreError::UnknownScope { .. } => ErrorCode::UnknownScope,
            CoreError::SortMismatch { .. } => ErrorCode::SortMismatch,
            CoreError::InvalidDeclaration { .. } => ErrorCode::InvalidDeclaration,
            CoreError::Solver { .. } => ErrorCode::SolverError,
            CoreError::Config { .. } => ErrorCode::ConfigError,
            CoreError::Io { .. } => ErrorCode::IoError,
        }
    }

    /// Text-derived errors can be fixed by resubmitting corrected input
    pub fn is_recoverable(&self) -> bool {
        self.code().is_recoverable()
    }

    /// Message suitable for asking an upstream generator to fix its output
    pub fn correction_message(&self) -> String {
        match self {
            CoreError::Syntax { text, error } => format!(
                "Syntax error when parsing formula: {} ({}). Rewrite it using only declared \
                 relations, identifiers, integers and the connectives not/and/or/->/<->.",
                text, error
            ),
            CoreError::UnresolvedRelation { name, .. } => format!(
                "Function {}() not found in function table. Please remove any references to it \
                 and do not add in anything else.",
                name
            ),
            CoreError::ArityMismatch { name, expected, actual, text } => format!(
                "Error constructing function {} in `{}`: it takes {} argument(s), {} were given.",
                name, text, expected, actual
            ),
            CoreError::UnknownScope { scope, .. } => format!(
                "Scope {} not found in scope table. Please remove any related usage of this scope \
                 for now.",
                scope
            ),
            CoreError::SortMismatch { detail, text } => format!(
                "Error when building formula: {} {}. Relations are true/false statements and \
                 cannot be used as values.",
                text, detail
            ),
            CoreError::InvalidDeclaration { line, reason } => {
                format!("Invalid declaration: {}. Please correct the definition: {}", reason, line)
            }
            other => other.to_string(),
        }
    }
}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Io { message: err.to_string() }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Io { message: format!("JSON: {}", err) }
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(err: toml::de::Error) -> Self {
        CoreError::config(err.to_string())
    }
}

// ============================================================================
// Result type alias
// ============================================================================

/// A Result type using CoreError
pub type CoreResult<T> = Result<T, CoreError>;

// ============================================================================
// Serializable error record
// ============================================================================

/// Structured, JSON-friendly view of a [`CoreError`] for logs and retry loops
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (string form)
    pub code: String,
    /// Numeric error code
    pub code_num: u32,
    /// Whether the input can be corrected and resubmitted
    pub recoverable: bool,
    /// Error message
    pub message: String,
    /// Structured details
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, String>,
    /// Message for an upstream generator
    pub hint: String,
}

impl From<&CoreError> for ErrorResponse {
    fn from(err: &CoreError) -> Self {
        let mut details = HashMap::new();
        if let Some(text) = err.text() {
            details.insert("text".to_string(), text.to_string());
        }
        match err {
            CoreError::UnresolvedRelation { name, .. } => {
                details.insert("relation".to_string(), name.clone());
            }
            CoreError::ArityMismatch { name, expected, actual, .. } => {
                details.insert("relation".to_string(), name.clone());
                details.insert("expected".to_string(), expected.to_string());
                details.insert("actual".to_string(), actual.to_string());
            }
            CoreError::UnknownScope { scope, .. } => {
                details.insert("scope".to_string(), scope.clone());
            }
            _ => {}
        }
        let code = err.code();
        Self {
            code: format!("{:?}", code),
            code_num: code.code(),
            recoverable: code.is_recoverable(),
            message: err.to_string(),
            details,
            hint: err.correction_message(),
        }
    }
}

impl From<CoreError> for ErrorResponse {
    fn from(err: CoreError) -> Self {
        Self::from(&err)
    }
}

impl ErrorResponse {
    /// Convert to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":"{}","message":"{}"}}"#, self.code, self.message)
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
