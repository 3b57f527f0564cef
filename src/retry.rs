//! Bounded correction loop for generator output
//!
//! The core never retries on its own. Callers that feed text from a
//! generator can wrap an operation in [`retry_with_corrections`], which
//! hands each recoverable error's correction message back to the generator
//! and tries again with whatever text it returns.

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::error::CoreError;

/// Attempt budget of a correction loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy { max_attempts: 10 }
    }
}

impl From<&SessionConfig> for RetryPolicy {
    fn from(config: &SessionConfig) -> Self {
        RetryPolicy { max_attempts: config.max_retries }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetryError {
    /// Every attempt failed with a recoverable error
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: usize, last: CoreError },

    /// An error no corrected text can fix
    #[error("unrecoverable error: {0}")]
    Fatal(CoreError),

    /// The correction callback produced no new text
    #[error("no correction offered after {attempts} attempts: {last}")]
    Abandoned { attempts: usize, last: CoreError },
}

impl RetryError {
    /// The error of the final attempt
    pub fn last_error(&self) -> &CoreError {
        match self {
            RetryError::Exhausted { last, .. } | RetryError::Abandoned { last, .. } => last,
            RetryError::Fatal(err) => err,
        }
    }
}

/// Run `attempt` on `initial_text`, asking `correct` for new text after
/// each recoverable failure.
///
/// `correct` receives the error's correction message and the text that
/// failed; returning `None` abandons the loop.
pub fn retry_with_corrections<T, A, C>(
    policy: RetryPolicy,
    initial_text: impl Into<String>,
    mut attempt: A,
    mut correct: C,
) -> Result<T, RetryError>
where
    A: FnMut(&str) -> Result<T, CoreError>,
    C: FnMut(&str, &str) -> Option<String>,
{
    let mut text = initial_text.into();
    let mut attempts = 0;

    loop {
        attempts += 1;
        let err = match attempt(&text) {
            Ok(value) => {
                debug!(attempts, "attempt succeeded");
                return Ok(value);
            }
            Err(err) => err,
        };

        if !err.is_recoverable() {
            return Err(RetryError::Fatal(err));
        }
        if attempts >= policy.max_attempts {
            warn!(attempts, error = %err, "retry budget exhausted");
            return Err(RetryError::Exhausted { attempts, last: err });
        }

        debug!(attempts, code = err.code().code(), "requesting correction");
        match correct(&err.correction_message(), &text) {
            Some(corrected) => text = corrected,
            None => return Err(RetryError::Abandoned { attempts, last: err }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::translate;
    use crate::fol::ParseOptions;
    use crate::symbols::SymbolTable;

    fn table() -> SymbolTable {
        let mut table = SymbolTable::new();
        table.declare_relation("happy", &["a".to_string()], "a is happy");
        table
    }

    #[test]
    fn test_corrects_until_success() {
        let table = table();
        let mut messages = Vec::new();
        let result = retry_with_corrections(
            RetryPolicy::default(),
            "teleports(aleph)",
            |text| translate(text, &table, ParseOptions::default()),
            |message, _| {
                messages.push(message.to_string());
                Some("happy(aleph)".to_string())
            },
        );
        assert!(result.is_ok());
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("teleports"));
    }

    #[test]
    fn test_budget_exhausted() {
        let table = table();
        let mut calls = 0;
        let result = retry_with_corrections(
            RetryPolicy { max_attempts: 3 },
            "happy(\"aleph\")",
            |text| {
                calls += 1;
                translate(text, &table, ParseOptions::default())
            },
            |_, previous| Some(previous.to_string()),
        );
        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 3, .. })));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_fatal_error_stops_immediately() {
        let result: Result<(), _> = retry_with_corrections(
            RetryPolicy::default(),
            "anything",
            |_| Err(CoreError::solver("grounding budget exceeded")),
            |_, _| panic!("no correction expected"),
        );
        let err = result.unwrap_err();
        assert!(matches!(err, RetryError::Fatal(_)));
        assert!(!err.last_error().is_recoverable());
    }

    #[test]
    fn test_abandoned() {
        let table = table();
        let result = retry_with_corrections(
            RetryPolicy::default(),
            "ghost(a)",
            |text| translate(text, &table, ParseOptions::default()),
            |_, _| None,
        );
        assert!(matches!(result, Err(RetryError::Abandoned { attempts: 1, .. })));
    }

    #[test]
    fn test_policy_from_config() {
        let config = SessionConfig { max_retries: 4, ..SessionConfig::default() };
        assert_eq!(RetryPolicy::from(&config).max_attempts, 4);
    }
}
