//! First-order formula language
//!
//! This module implements the surface syntax that narrative facts are
//! written in: a small first-order language with quantifiers, the usual
//! connectives, relation applications and integer comparisons.
//!
//! ```text
//! forall x. (human(x) -> mortal(x))
//! exists x y. (parent(x, y) and not (x = y))
//! age(a) >= 18
//! ```
//!
//! Parsing is two-stage: [`lexer::tokenize`] turns text into tokens with
//! nom, and [`parser::parse_formula`] runs a recursive-descent parser over
//! them to produce an [`ast::Formula`].

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{Application, CompareOp, Formula, Term};
pub use lexer::{tokenize, Token, TokenKind};
pub use parser::{balance_parens, parse_formula, parse_formula_with, ParseOptions};

/// Why a piece of formula text was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    #[error("formulas should not contain strings (quote at byte {offset})")]
    StringLiteral { offset: usize },

    #[error("unexpected character '{ch}' at byte {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("integer literal {literal} at byte {offset} is out of range")]
    InvalidInteger { literal: String, offset: usize },

    #[error("expected {expected} at byte {offset}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        offset: usize,
    },

    #[error("unexpected end of formula, expected {expected}")]
    UnexpectedEnd { expected: String },

    #[error("unmatched ')' at byte {offset}")]
    UnbalancedParens { offset: usize },

    #[error("quantifier {quantifier} at byte {offset} needs variables, '.' and a body")]
    UnterminatedQuantifier { quantifier: String, offset: usize },

    #[error("malformed line: {reason}")]
    MalformedLine { reason: String },

    #[error("empty formula")]
    Empty,
}

/// Whether `s` is a valid identifier: a letter or `_` followed by letters,
/// digits or `_`, and not one of the reserved words.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !lexer::is_reserved(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("aleph"));
        assert!(is_identifier("_x1"));
        assert!(is_identifier("mount_everest"));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("forall"));
        assert!(!is_identifier("and"));
    }
}
