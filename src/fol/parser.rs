//! Recursive-descent parser over lexer tokens
//!
//! Precedence, loosest first: quantifier, `<->`, `->`, `or`, `and`, `not`.
//! `<->` and `->` do not chain; `a -> b -> c` must be parenthesized.

use std::borrow::Cow;

use tracing::debug;

use super::ast::{Application, CompareOp, Formula, Term};
use super::lexer::{tokenize, Token, TokenKind};
use super::SyntaxError;

/// Knobs for [`parse_formula_with`]
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Append missing `)` when the text has more `(` than `)`
    pub balance_parens: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions { balance_parens: true }
    }
}

/// Parse one formula with default options
pub fn parse_formula(input: &str) -> Result<Formula, SyntaxError> {
    parse_formula_with(input, ParseOptions::default())
}

/// Parse one formula
pub fn parse_formula_with(input: &str, options: ParseOptions) -> Result<Formula, SyntaxError> {
    let text = if options.balance_parens {
        balance_parens(input)
    } else {
        Cow::Borrowed(input)
    };
    let tokens = tokenize(&text)?;
    if tokens.is_empty() {
        return Err(SyntaxError::Empty);
    }
    let mut parser = Parser { tokens: &tokens, pos: 0 };
    let formula = parser.formula()?;
    if let Some(tok) = parser.peek() {
        if tok.kind == TokenKind::RParen {
            return Err(SyntaxError::UnbalancedParens { offset: tok.offset });
        }
        return Err(SyntaxError::UnexpectedToken {
            expected: "end of formula".to_string(),
            found: tok.kind.describe(),
            offset: tok.offset,
        });
    }
    Ok(formula)
}

/// Close trailing unclosed parentheses.
///
/// Only a net surplus of `(` is repaired; everything else is left for the
/// parser to reject.
pub fn balance_parens(input: &str) -> Cow<'_, str> {
    let open = input.matches('(').count();
    let close = input.matches(')').count();
    if open > close {
        let missing = open - close;
        debug!(missing, "auto-closing parentheses");
        let mut fixed = String::with_capacity(input.len() + missing);
        fixed.push_str(input.trim_end());
        fixed.extend(std::iter::repeat(')').take(missing));
        Cow::Owned(fixed)
    } else {
        Cow::Borrowed(input)
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&'t TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        match self.peek() {
            Some(tok) => SyntaxError::UnexpectedToken {
                expected: expected.to_string(),
                found: tok.kind.describe(),
                offset: tok.offset,
            },
            None => SyntaxError::UnexpectedEnd { expected: expected.to_string() },
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<(), SyntaxError> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    // formula := quant | biconditional
    fn formula(&mut self) -> Result<Formula, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Forall) | Some(TokenKind::Exists) => self.quantified(),
            _ => self.biconditional(),
        }
    }

    fn quantified(&mut self) -> Result<Formula, SyntaxError> {
        let Some(head) = self.advance() else {
            return Err(SyntaxError::UnexpectedEnd { expected: "quantifier".to_string() });
        };
        let universal = head.kind == TokenKind::Forall;
        let unterminated = || SyntaxError::UnterminatedQuantifier {
            quantifier: if universal { "forall" } else { "exists" }.to_string(),
            offset: head.offset,
        };

        let mut vars = Vec::new();
        while let Some(TokenKind::Ident(name)) = self.peek_kind() {
            vars.push(name.clone());
            self.pos += 1;
        }
        if vars.is_empty() || !self.eat(&TokenKind::Dot) || self.peek().is_none() {
            return Err(unterminated());
        }

        let body = Box::new(self.formula()?);
        Ok(if universal {
            Formula::ForAll(vars, body)
        } else {
            Formula::Exists(vars, body)
        })
    }

    // biconditional := implication ("<->" implication)?
    fn biconditional(&mut self) -> Result<Formula, SyntaxError> {
        let lhs = self.implication()?;
        if self.eat(&TokenKind::DoubleArrow) {
            let rhs = self.implication()?;
            return Ok(Formula::Iff(Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    // implication := disjunction ("->" disjunction)?
    fn implication(&mut self) -> Result<Formula, SyntaxError> {
        let lhs = self.disjunction()?;
        if self.eat(&TokenKind::Arrow) {
            let rhs = self.disjunction()?;
            return Ok(Formula::Implies(Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    // disjunction := conjunction ("or" conjunction)*
    fn disjunction(&mut self) -> Result<Formula, SyntaxError> {
        let mut items = vec![self.conjunction()?];
        while self.eat(&TokenKind::Or) {
            items.push(self.conjunction()?);
        }
        Ok(collapse(items, Formula::Or))
    }

    // conjunction := negation ("and" negation)*
    fn conjunction(&mut self) -> Result<Formula, SyntaxError> {
        let mut items = vec![self.negation()?];
        while self.eat(&TokenKind::And) {
            items.push(self.negation()?);
        }
        Ok(collapse(items, Formula::And))
    }

    // negation := "not" negation | atom
    fn negation(&mut self) -> Result<Formula, SyntaxError> {
        if self.eat(&TokenKind::Not) {
            return Ok(Formula::Not(Box::new(self.negation()?)));
        }
        self.atom()
    }

    // atom := "(" formula ")" | compare | funcapp
    fn atom(&mut self) -> Result<Formula, SyntaxError> {
        if self.eat(&TokenKind::LParen) {
            let inner = self.formula()?;
            self.expect(TokenKind::RParen, "')'")?;
            return Ok(inner);
        }

        let lhs = self.term()?;
        if let Some(op) = self.peek_kind().and_then(compare_op) {
            self.pos += 1;
            let rhs = self.term()?;
            return Ok(Formula::Compare(op, lhs, rhs));
        }
        match lhs {
            Term::App(app) => Ok(Formula::Atom(app)),
            _ => Err(self.unexpected("comparison operator")),
        }
    }

    // term := ident | integer | funcapp
    fn term(&mut self) -> Result<Term, SyntaxError> {
        let Some(tok) = self.peek() else {
            return Err(SyntaxError::UnexpectedEnd { expected: "term".to_string() });
        };
        match &tok.kind {
            TokenKind::Int(n) => {
                self.pos += 1;
                Ok(Term::Int(*n))
            }
            TokenKind::Ident(name) => {
                self.pos += 1;
                if self.eat(&TokenKind::LParen) {
                    let args = self.arguments()?;
                    Ok(Term::App(Application::new(name.clone(), args)))
                } else {
                    Ok(Term::Var(name.clone()))
                }
            }
            _ => Err(self.unexpected("identifier, integer or '('")),
        }
    }

    // (term ("," term)*)? ")"
    fn arguments(&mut self) -> Result<Vec<Term>, SyntaxError> {
        let mut args = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.term()?);
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::RParen, "',' or ')'")?;
            return Ok(args);
        }
    }
}

fn compare_op(kind: &TokenKind) -> Option<CompareOp> {
    match kind {
        TokenKind::Le => Some(CompareOp::Le),
        TokenKind::Ge => Some(CompareOp::Ge),
        TokenKind::Lt => Some(CompareOp::Lt),
        TokenKind::Gt => Some(CompareOp::Gt),
        TokenKind::Eq => Some(CompareOp::Eq),
        TokenKind::Ne => Some(CompareOp::Ne),
        _ => None,
    }
}

fn collapse(mut items: Vec<Formula>, wrap: fn(Vec<Formula>) -> Formula) -> Formula {
    if items.len() == 1 {
        items.remove(0)
    } else {
        wrap(items)
    }
}
