//! storylogic - incremental consistency checking for narrative facts
//!
//! Facts extracted from a story arrive turn by turn as short first-order
//! formulas. The crate parses them, resolves their relation names against
//! the declarations made so far, expands exclusivity shorthand and decides
//! whether everything accumulated is still satisfiable.
//!
//! # Architecture
//!
//! - [`fol`] - lexer, parser and parse tree of the formula language
//! - [`builder`] - translation of parse trees into solver expressions
//! - [`macros`] - `[exclusive_arg]` / `[free_arg]` shorthand expansion
//! - [`symbols`] - append-only registry of objects, relations and scopes
//! - [`solver`] - finite-domain grounding and a CDCL SAT engine
//! - [`session`] - scoped turn history, verdicts and inconsistency scores
//! - [`declarations`] - parsing of declaration lines
//! - [`retry`] - bounded correction loop for generator output
//!
//! # Example
//!
//! ```rust,ignore
//! use storylogic::{Session, TurnInput, Verdict};
//!
//! let mut session = Session::new();
//! let report = session.process_turn(&TurnInput {
//!     objects: vec!["aleph: a dog".into(), "paris: a city".into(), "mount_everest: a mountain".into()],
//!     relations: vec!["locates_in(a, b): a is located in b | locates_in(aleph, paris)".into()],
//!     exclusivity: vec!["locates_in(a, [exclusive_arg])".into()],
//!     formulas: vec!["locates_in(aleph, mount_everest)".into(), "locates_in(aleph, paris)".into()],
//!     ..TurnInput::default()
//! })?;
//! assert_eq!(report.verdict("global"), Some(Verdict::Unsat));
//! ```

pub mod builder;
pub mod config;
pub mod declarations;
pub mod error;
pub mod fol;
pub mod logging;
pub mod logic;
pub mod macros;
pub mod retry;
pub mod session;
pub mod solver;
pub mod symbols;

// Re-export the formula language
pub use fol::{parse_formula, parse_formula_with, Formula, ParseOptions, SyntaxError};

// Re-export translation
pub use builder::{translate, ExprBuilder, RelationLookup};
pub use logic::{Expr, ExprTerm, RelationFn, RelationId};
pub use macros::{expand_exclusivity, ExclusivityMacro};

// Re-export declarations
pub use declarations::{divide_response_parts, parse_object_lines, parse_relation_line, parse_scope_lines};
pub use symbols::{Declared, SymbolTable};

// Re-export the consistency engine
pub use session::{ScopeVerdict, ScopedFormulas, Session, TurnInput, TurnPhase, TurnReport, GLOBAL_SCOPE};
pub use solver::{Domain, Solver, Verdict};

// Re-export configuration types
pub use config::{ConfigError, LogLevel, SessionConfig, SolverConfig, SolverProfile, StoryConfig};
pub use logging::init_logging;
pub use retry::{retry_with_corrections, RetryError, RetryPolicy};

// Re-export error types
pub use error::{CoreError, CoreResult, ErrorCode, ErrorResponse};
