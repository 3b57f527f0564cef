//! Syntax tree for parsed formulas
//!
//! The tree mirrors the surface grammar. `Display` renders surface syntax
//! that parses back to the same tree, adding parentheses only where the
//! grammar needs them.

use std::fmt;

/// A term: a variable or constant name, an integer, or an application
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Var(String),
    Int(i64),
    App(Application),
}

/// `name(arg, ...)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Application {
    pub name: String,
    pub args: Vec<Term>,
}

impl Application {
    pub fn new(name: impl Into<String>, args: Vec<Term>) -> Self {
        Application { name: name.into(), args }
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Le,
    Ge,
    Lt,
    Gt,
    Eq,
    Ne,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
        }
    }
}

/// A parsed formula
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    Atom(Application),
    Compare(CompareOp, Term, Term),
    Not(Box<Formula>),
    /// Two or more conjuncts
    And(Vec<Formula>),
    /// Two or more disjuncts
    Or(Vec<Formula>),
    Implies(Box<Formula>, Box<Formula>),
    Iff(Box<Formula>, Box<Formula>),
    ForAll(Vec<String>, Box<Formula>),
    Exists(Vec<String>, Box<Formula>),
}

// Binding strength of each production. A child printed where a higher
// level is required gets parentheses.
pub(crate) const PREC_QUANT: u8 = 0;
pub(crate) const PREC_IFF: u8 = 1;
pub(crate) const PREC_IMPLIES: u8 = 2;
pub(crate) const PREC_OR: u8 = 3;
pub(crate) const PREC_AND: u8 = 4;
pub(crate) const PREC_NOT: u8 = 5;
pub(crate) const PREC_ATOM: u8 = 6;

impl Formula {
    fn precedence(&self) -> u8 {
        match self {
            Formula::ForAll(..) | Formula::Exists(..) => PREC_QUANT,
            Formula::Iff(..) => PREC_IFF,
            Formula::Implies(..) => PREC_IMPLIES,
            Formula::Or(..) => PREC_OR,
            Formula::And(..) => PREC_AND,
            Formula::Not(..) => PREC_NOT,
            Formula::Atom(..) | Formula::Compare(..) => PREC_ATOM,
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
            Formula::Atom(app) => write!(f, "{}", app),
            Formula::Compare(op, l, r) => write!(f, "{} {} {}", l, op.symbol(), r),
            Formula::Not(inner) => {
                write!(f, "not ")?;
                inner.fmt_at(f, PREC_NOT)
            }
            Formula::And(items) => fmt_joined(f, items, " and ", PREC_NOT),
            Formula::Or(items) => fmt_joined(f, items, " or ", PREC_AND),
            Formula::Implies(l, r) => {
                l.fmt_at(f, PREC_OR)?;
                write!(f, " -> ")?;
                r.fmt_at(f, PREC_OR)
            }
            Formula::Iff(l, r) => {
                l.fmt_at(f, PREC_IMPLIES)?;
                write!(f, " <-> ")?;
                r.fmt_at(f, PREC_IMPLIES)
            }
            Formula::ForAll(vars, body) => {
                write!(f, "forall {}. ", vars.join(" "))?;
                body.fmt_at(f, PREC_QUANT)
            }
            Formula::Exists(vars, body) => {
                write!(f, "exists {}. ", vars.join(" "))?;
                body.fmt_at(f, PREC_QUANT)
            }
        }
    }
}

fn fmt_joined(f: &mut fmt::Formatter<'_>, items: &[Formula], sep: &str, required: u8) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        item.fmt_at(f, required)?;
    }
    Ok(())
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_at(f, PREC_QUANT)
    }
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(name) => write!(f, "{}", name),
            Term::Int(n) => write!(f, "{}", n),
            Term::App(app) => write!(f, "{}", app),
        }
    }
}
