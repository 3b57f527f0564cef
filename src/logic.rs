//! Solver-side logic expressions
//!
//! [`Expr`] is what the builder produces from a parsed [`Formula`] once every
//! relation name has been resolved to a [`RelationFn`]. Terms are restricted
//! to the integer sort: names and integer literals. Relations are
//! boolean-valued and appear only as atoms.
//!
//! [`Formula`]: crate::fol::Formula

use std::fmt;

use indexmap::IndexSet;

use crate::fol::ast::{PREC_AND, PREC_ATOM, PREC_IFF, PREC_IMPLIES, PREC_NOT, PREC_OR, PREC_QUANT};
use crate::fol::CompareOp;

/// Identity of a declared relation inside one symbol table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationId(pub u32);

/// Handle to a declared boolean-valued relation over integers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationFn {
    id: RelationId,
    name: String,
    arity: usize,
}

/// Raised when a relation is applied to the wrong number of arguments
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("relation {name} takes {expected} argument(s), {actual} given")]
pub struct ArityError {
    pub name: String,
    pub expected: usize,
    pub actual: usize,
}

impl RelationFn {
    pub fn new(id: RelationId, name: impl Into<String>, arity: usize) -> Self {
        RelationFn { id, name: name.into(), arity }
    }

    pub fn id(&self) -> RelationId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Apply the relation, checking the argument count
    pub fn apply(&self, args: Vec<ExprTerm>) -> Result<Expr, ArityError> {
        if args.len() != self.arity {
            return Err(ArityError {
                name: self.name.clone(),
                expected: self.arity,
                actual: args.len(),
            });
        }
        Ok(Expr::App(self.clone(), args))
    }
}

/// An integer-sorted term
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExprTerm {
    /// A named symbol: bound variable or free constant
    Sym(String),
    Int(i64),
}

impl ExprTerm {
    pub fn sym(name: impl Into<String>) -> Self {
        ExprTerm::Sym(name.into())
    }
}

/// A boolean expression ready for grounding
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Const(bool),
    App(RelationFn, Vec<ExprTerm>),
    Cmp(CompareOp, ExprTerm, ExprTerm),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Implies(Box<Expr>, Box<Expr>),
    Iff(Box<Expr>, Box<Expr>),
    ForAll(Vec<String>, Box<Expr>),
    Exists(Vec<String>, Box<Expr>),
}

impl Expr {
    /// Conjunction, flattening nested conjunctions
    pub fn and(items: Vec<Expr>) -> Expr {
        let mut flat = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Expr::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Expr::Const(true),
            1 => flat.remove(0),
            _ => Expr::And(flat),
        }
    }

    /// Disjunction, flattening nested disjunctions
    pub fn or(items: Vec<Expr>) -> Expr {
        let mut flat = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Expr::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Expr::Const(false),
            1 => flat.remove(0),
            _ => Expr::Or(flat),
        }
    }

    pub fn not(inner: Expr) -> Expr {
        Expr::Not(Box::new(inner))
    }

    pub fn implies(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Implies(Box::new(lhs), Box::new(rhs))
    }

    pub fn iff(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Iff(Box::new(lhs), Box::new(rhs))
    }

    pub fn eq(lhs: ExprTerm, rhs: ExprTerm) -> Expr {
        Expr::Cmp(CompareOp::Eq, lhs, rhs)
    }

    /// Symbols not bound by an enclosing quantifier, in first-seen order
    pub fn free_symbols(&self) -> IndexSet<String> {
        let mut out = IndexSet::new();
        let mut bound = Vec::new();
        self.collect_free(&mut bound, &mut out);
        out
    }

    fn collect_free(&self, bound: &mut Vec<String>, out: &mut IndexSet<String>) {
        let visit_term = |t: &ExprTerm, bound: &Vec<String>, out: &mut IndexSet<String>| {
            if let ExprTerm::Sym(name) = t {
                if !bound.iter().any(|b| b == name) {
                    out.insert(name.clone());
                }
            }
        };
        match self {
            Expr::Const(_) => {}
            Expr::App(_, args) => {
                for arg in args {
                    visit_term(arg, bound, out);
                }
            }
            Expr::Cmp(_, l, r) => {
                visit_term(l, bound, out);
                visit_term(r, bound, out);
            }
            Expr::Not(inner) => inner.collect_free(bound, out),
            Expr::And(items) | Expr::Or(items) => {
                for item in items {
                    item.collect_free(bound, out);
                }
            }
            Expr::Implies(l, r) | Expr::Iff(l, r) => {
                l.collect_free(bound, out);
                r.collect_free(bound, out);
            }
            Expr::ForAll(vars, body) | Expr::Exists(vars, body) => {
                let mark = bound.len();
                bound.extend(vars.iter().cloned());
                body.collect_free(bound, out);
                bound.truncate(mark);
            }
        }
    }

    /// Every integer literal appearing anywhere in the expression
    pub fn int_literals(&self, out: &mut IndexSet<i64>) {
        let visit = |t: &ExprTerm, out: &mut IndexSet<i64>| {
            if let ExprTerm::Int(n) = t {
                out.insert(*n);
            }
        };
        match self {
            Expr::Const(_) => {}
            Expr::App(_, args) => args.iter().for_each(|a| visit(a, out)),
            Expr::Cmp(_, l, r) => {
                visit(l, out);
                visit(r, out);
            }
            Expr::Not(inner) | Expr::ForAll(_, inner) | Expr::Exists(_, inner) => {
                inner.int_literals(out)
            }
            Expr::And(items) | Expr::Or(items) => items.iter().for_each(|i| i.int_literals(out)),
            Expr::Implies(l, r) | Expr::Iff(l, r) => {
                l.int_literals(out);
                r.int_literals(out);
            }
        }
    }

    /// Equations `a = b` asserted positively at the top level (directly or
    /// as a conjunct). These override the unique-names assumption.
    pub fn explicit_equalities(&self) -> Vec<(ExprTerm, ExprTerm)> {
        let mut out = Vec::new();
        self.collect_equalities(&mut out);
        out
    }

    fn collect_equalities(&self, out: &mut Vec<(ExprTerm, ExprTerm)>) {
        match self {
            Expr::Cmp(CompareOp::Eq, l, r) => out.push((l.clone(), r.clone())),
            Expr::And(items) => items.iter().for_each(|i| i.collect_equalities(out)),
            _ => {}
        }
    }

    /// Whether asserting the expression claims that some element exists:
    /// an existential in positive position or a universal in negative
    /// position. Refuting such a claim over finitely many representatives
    /// says nothing about the integers.
    pub fn asserts_existence(&self) -> bool {
        self.existence_at(true)
    }

    fn existence_at(&self, positive: bool) -> bool {
        match self {
            Expr::Const(_) | Expr::App(..) | Expr::Cmp(..) => false,
            Expr::Not(inner) => inner.existence_at(!positive),
            Expr::And(items) | Expr::Or(items) => items.iter().any(|i| i.existence_at(positive)),
            Expr::Implies(l, r) => l.existence_at(!positive) || r.existence_at(positive),
            Expr::Iff(l, r) => [l, r].iter().any(|e| e.existence_at(true) || e.existence_at(false)),
            Expr::ForAll(_, body) => !positive || body.existence_at(positive),
            Expr::Exists(_, body) => positive || body.existence_at(positive),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::ForAll(..) | Expr::Exists(..) => PREC_QUANT,
            Expr::Iff(..) => PREC_IFF,
            Expr::Implies(..) => PREC_IMPLIES,
            Expr::Or(..) => PREC_OR,
            Expr::And(..) => PREC_AND,
            Expr::Not(..) => PREC_NOT,
            Expr::Const(_) | Expr::App(..) | Expr::Cmp(..) => PREC_ATOM,
        }
    }

    fn fmt_at(&self, f: &mut fmt::Formatter<'_>, required: u8) -> fmt::Result {
        if self.precedence() < required {
            write!(f, "(")?;
            self.fmt_inner(f)?;
            write!(f, ")")
        } else {
            self.fmt_inner(f)
        }
    }

    fn fmt_inner(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(b) => write!(f, "{}", b),
            Expr::App(rel, args) => {
                write!(f, "{}(", rel.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Cmp(op, l, r) => write!(f, "{} {} {}", l, op.symbol(), r),
            Expr::Not(inner) => {
                write!(f, "not ")?;
                inner.fmt_at(f, PREC_NOT)
            }
            Expr::And(items) => fmt_joined(f, items, " and ", PREC_NOT),
            Expr::Or(items) => fmt_joined(f, items, " or ", PREC_AND),
            Expr::Implies(l, r) => {
                l.fmt_at(f, PREC_OR)?;
                write!(f, " -> ")?;
                r.fmt_at(f, PREC_OR)
            }
            Expr::Iff(l, r) => {
                l.fmt_at(f, PREC_IMPLIES)?;
                write!(f, " <-> ")?;
                r.fmt_at(f, PREC_IMPLIES)
            }
            Expr::ForAll(vars, body) => {
                write!(f, "forall {}. ", vars.join(" "))?;
                body.fmt_at(f, PREC_QUANT)
            }
            Expr::Exists(vars, body) => {
                write!(f, "exists {}. ", vars.join(" "))?;
                body.fmt_at(f, PREC_QUANT)
            }
        }
    }
}

fn fmt_joined(f: &mut fmt::Formatter<'_>, items: &[Expr], sep: &str, required: u8) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        item.fmt_at(f, required)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_at(f, PREC_QUANT)
    }
}

impl fmt::Display for ExprTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprTerm::Sym(name) => write!(f, "{}", name),
            ExprTerm::Int(n) => write!(f, "{}", n),
        }
    }
}
