//! Exclusivity shorthand
//!
//! A line such as `locates_in(a, [exclusive_arg])` says that the marked
//! argument is functionally determined by the unmarked ones. It expands to
//!
//! ```text
//! forall a b1 b2. locates_in(a, b1) and locates_in(a, b2) -> b1 = b2
//! ```
//!
//! `[free_arg]` positions get independent variables and no constraint.
//! The written name of an unmarked argument is ignored; the relation's
//! declared parameter name is used instead.

use crate::builder::RelationLookup;
use crate::error::{CoreError, CoreResult};
use crate::fol::{is_identifier, SyntaxError};
use crate::logic::{Expr, ExprTerm};

pub const EXCLUSIVE_ARG: &str = "[exclusive_arg]";
pub const FREE_ARG: &str = "[free_arg]";

/// Whether a formula line is written in exclusivity shorthand
pub fn is_exclusivity_line(line: &str) -> bool {
    line.contains(EXCLUSIVE_ARG) || line.contains(FREE_ARG)
}

/// Marking of one argument position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroArg {
    Exclusive,
    Free,
    Shared(String),
}

/// A parsed shorthand line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusivityMacro {
    pub relation: String,
    pub args: Vec<MacroArg>,
}

fn malformed(reason: impl Into<String>) -> SyntaxError {
    SyntaxError::MalformedLine { reason: reason.into() }
}

impl ExclusivityMacro {
    /// Parse `name(arg, ...)` where args may be placeholders
    pub fn parse(line: &str) -> CoreResult<Self> {
        let line = line.trim();
        let syntax = |reason: &str| CoreError::syntax(line, malformed(reason));

        let open = line.find('(').ok_or_else(|| syntax("macro line needs an argument list"))?;
        let relation = line[..open].trim();
        if !is_identifier(relation) {
            return Err(syntax("macro line must start with a relation name"));
        }
        let rest = &line[open + 1..];
        let close = rest.find(')').ok_or_else(|| syntax("macro argument list is not closed"))?;
        if !rest[close + 1..].trim().is_empty() {
            return Err(syntax("unexpected text after macro argument list"));
        }

        let inner = rest[..close].trim();
        let args = if inner.is_empty() {
            Vec::new()
        } else {
            inner
                .split(',')
                .map(|arg| match arg.trim() {
                    EXCLUSIVE_ARG => Ok(MacroArg::Exclusive),
                    FREE_ARG => Ok(MacroArg::Free),
                    other if is_identifier(other) => Ok(MacroArg::Shared(other.to_string())),
                    other => Err(syntax(&format!("invalid macro argument `{}`", other))),
                })
                .collect::<CoreResult<Vec<_>>>()?
        };

        Ok(ExclusivityMacro { relation: relation.to_string(), args })
    }

    /// Expand into a quantified implication over two uses of the relation
    pub fn expand<L: RelationLookup + ?Sized>(&self, lookup: &L) -> CoreResult<Expr> {
        let function = lookup
            .lookup_relation(&self.relation)
            .ok_or_else(|| CoreError::unresolved_relation(&self.relation))?;
        if function.arity() != self.args.len() {
            return Err(CoreError::arity_mismatch(&self.relation, function.arity(), self.args.len()));
        }

        let params = parameter_names(function.arity(), lookup, &self.relation);
        let mut used: Vec<String> = Vec::new();
        let mut bound = Vec::new();
        let mut left = Vec::new();
        let mut right = Vec::new();
        let mut constraints = Vec::new();

        for (param, arg) in params.iter().zip(&self.args) {
            match arg {
                MacroArg::Exclusive | MacroArg::Free => {
                    let first = fresh_name(&format!("{}1", param), &mut used);
                    let second = fresh_name(&format!("{}2", param), &mut used);
                    if *arg == MacroArg::Exclusive {
                        constraints.push(Expr::eq(ExprTerm::sym(&first), ExprTerm::sym(&second)));
                    }
                    left.push(ExprTerm::sym(&first));
                    right.push(ExprTerm::sym(&second));
                    bound.push(first);
                    bound.push(second);
                }
                MacroArg::Shared(_) => {
                    let shared = fresh_name(param, &mut used);
                    left.push(ExprTerm::sym(&shared));
                    right.push(ExprTerm::sym(&shared));
                    bound.push(shared);
                }
            }
        }

        let apply = |args: Vec<ExprTerm>| {
            function
                .apply(args)
                .map_err(|e| CoreError::arity_mismatch(e.name, e.expected, e.actual))
        };
        let premise = Expr::and(vec![apply(left)?, apply(right)?]);
        let body = Expr::implies(premise, Expr::and(constraints));
        Ok(Expr::ForAll(bound, Box::new(body)))
    }
}

/// Parse and expand a shorthand line, attaching the text to any error
pub fn expand_exclusivity<L: RelationLookup + ?Sized>(line: &str, lookup: &L) -> CoreResult<Expr> {
    ExclusivityMacro::parse(line)?
        .expand(lookup)
        .map_err(|e| e.with_text(line.trim()))
}

/// Declared parameter names when the lookup can provide them, else `p0..pn`
fn parameter_names<L: RelationLookup + ?Sized>(arity: usize, lookup: &L, relation: &str) -> Vec<String> {
    match lookup.relation_params(relation) {
        Some(params) if params.len() == arity && params.iter().all(|p| is_identifier(p)) => params,
        _ => (0..arity).map(|i| format!("p{}", i)).collect(),
    }
}

fn fresh_name(base: &str, used: &mut Vec<String>) -> String {
    let mut name = base.to_string();
    while used.contains(&name) {
        name.push('_');
    }
    used.push(name.clone());
    name
}
