//! Translation from parsed formulas to solver expressions
//!
//! Every relation application is resolved through a caller-supplied
//! [`RelationLookup`] and checked for arity. Relations are boolean-valued,
//! so an application may only appear as an atom, or on both sides of `=` /
//! `!=`, where it reads as `<->` / its negation.

use crate::error::{CoreError, CoreResult};
use crate::fol::{self, Application, CompareOp, Formula, ParseOptions, Term};
use crate::logic::{Expr, ExprTerm, RelationFn};

/// Name-to-relation resolution used while building expressions
pub trait RelationLookup {
    fn lookup_relation(&self, name: &str) -> Option<RelationFn>;

    /// Declared parameter names, when the lookup keeps them
    fn relation_params(&self, _name: &str) -> Option<Vec<String>> {
        None
    }
}

impl<F> RelationLookup for F
where
    F: Fn(&str) -> Option<RelationFn>,
{
    fn lookup_relation(&self, name: &str) -> Option<RelationFn> {
        self(name)
    }
}

/// Walks a [`Formula`] and emits an [`Expr`]
pub struct ExprBuilder<'a, L: RelationLookup + ?Sized> {
    lookup: &'a L,
}

impl<'a, L: RelationLookup + ?Sized> ExprBuilder<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        ExprBuilder { lookup }
    }

    pub fn build(&self, formula: &Formula) -> CoreResult<Expr> {
        Ok(match formula {
            Formula::Atom(app) => self.application(app)?,
            Formula::Compare(op, lhs, rhs) => self.compare(*op, lhs, rhs)?,
            Formula::Not(inner) => Expr::not(self.build(inner)?),
            Formula::And(items) => Expr::and(self.build_all(items)?),
            Formula::Or(items) => Expr::or(self.build_all(items)?),
            Formula::Implies(l, r) => Expr::implies(self.build(l)?, self.build(r)?),
            Formula::Iff(l, r) => Expr::iff(self.build(l)?, self.build(r)?),
            Formula::ForAll(vars, body) => Expr::ForAll(vars.clone(), Box::new(self.build(body)?)),
            Formula::Exists(vars, body) => Expr::Exists(vars.clone(), Box::new(self.build(body)?)),
        })
    }

    fn build_all(&self, items: &[Formula]) -> CoreResult<Vec<Expr>> {
        items.iter().map(|f| self.build(f)).collect()
    }

    fn application(&self, app: &Application) -> CoreResult<Expr> {
        let function = self
            .lookup
            .lookup_relation(&app.name)
            .ok_or_else(|| CoreError::unresolved_relation(&app.name))?;
        let args = app
            .args
            .iter()
            .map(|t| self.term(t))
            .collect::<CoreResult<Vec<_>>>()?;
        function
            .apply(args)
            .map_err(|e| CoreError::arity_mismatch(e.name, e.expected, e.actual))
    }

    fn term(&self, term: &Term) -> CoreResult<ExprTerm> {
        match term {
            Term::Var(name) => Ok(ExprTerm::Sym(name.clone())),
            Term::Int(n) => Ok(ExprTerm::Int(*n)),
            Term::App(app) => {
                // resolve first so an undeclared name is reported as such
                self.application(app)?;
                Err(CoreError::sort_mismatch(format!(
                    "relation {} is true/false valued and cannot be used as a term",
                    app.name
                )))
            }
        }
    }

    fn compare(&self, op: CompareOp, lhs: &Term, rhs: &Term) -> CoreResult<Expr> {
        match (lhs, rhs) {
            (Term::App(l), Term::App(r)) => {
                let l = self.application(l)?;
                let r = self.application(r)?;
                match op {
                    CompareOp::Eq => Ok(Expr::iff(l, r)),
                    CompareOp::Ne => Ok(Expr::not(Expr::iff(l, r))),
                    other => Err(CoreError::sort_mismatch(format!(
                        "'{}' cannot compare true/false valued relations",
                        other.symbol()
                    ))),
                }
            }
            _ => Ok(Expr::Cmp(op, self.term(lhs)?, self.term(rhs)?)),
        }
    }
}

/// Parse `text` and build it against `lookup`, attaching the text to any
/// error.
pub fn translate<L: RelationLookup + ?Sized>(text: &str, lookup: &L, options: ParseOptions) -> CoreResult<Expr> {
    let formula = fol::parse_formula_with(text, options).map_err(|e| CoreError::syntax(text, e))?;
    ExprBuilder::new(lookup).build(&formula).map_err(|e| e.with_text(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::logic::RelationId;
    use crate::symbols::SymbolTable;

    fn table() -> SymbolTable {
        let mut table = SymbolTable::new();
        table.declare_relation("locates_in", &["a".into(), "b".into()], "a is located in b");
        table.declare_relation("happy", &["a".into()], "a is happy");
        table.declare_relation("alive", &["a".into()], "a is alive");
        table
    }

    fn build(text: &str) -> CoreResult<Expr> {
        translate(text, &table(), ParseOptions::default())
    }

    #[test]
    fn test_resolves_applications() {
        let expr = build("locates_in(aleph, mount_everest)").unwrap();
        match expr {
            Expr::App(rel, args) => {
                assert_eq!(rel.name(), "locates_in");
                assert_eq!(args, vec![ExprTerm::sym("aleph"), ExprTerm::sym("mount_everest")]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unresolved_relation_names_symbol() {
        let err = build("teleports(a, b)").unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnresolvedRelation);
        assert!(matches!(&err, CoreError::UnresolvedRelation { name, text }
            if name == "teleports" && text == "teleports(a, b)"));
    }

    #[test]
    fn test_arity_mismatch() {
        for text in ["locates_in(a)", "locates_in(a, b, c)", "forall x. happy(x, x)"] {
            let err = build(text).unwrap_err();
            assert_eq!(err.code(), ErrorCode::ArityMismatch, "{}", text);
        }
        let err = build("happy()").unwrap_err();
        assert!(matches!(err, CoreError::ArityMismatch { expected: 1, actual: 0, .. }));
    }

    #[test]
    fn test_relation_equality_is_iff() {
        let expr = build("happy(a) = alive(a)").unwrap();
        assert!(matches!(expr, Expr::Iff(..)));
        let expr = build("happy(a) != alive(a)").unwrap();
        assert!(matches!(expr, Expr::Not(ref inner) if matches!(**inner, Expr::Iff(..))));
    }

    #[test]
    fn test_sort_mismatch() {
        assert_eq!(build("happy(a) >= 3").unwrap_err().code(), ErrorCode::SortMismatch);
        assert_eq!(build("happy(a) < alive(a)").unwrap_err().code(), ErrorCode::SortMismatch);
        assert_eq!(build("locates_in(happy(a), b)").unwrap_err().code(), ErrorCode::SortMismatch);
        // unknown nested relation reported as unresolved
        assert_eq!(build("locates_in(ghost(a), b)").unwrap_err().code(), ErrorCode::UnresolvedRelation);
    }

    #[test]
    fn test_connectives_flatten() {
        let expr = build("happy(a) and (alive(a) and happy(b))").unwrap();
        assert!(matches!(expr, Expr::And(ref items) if items.len() == 3));
        let expr = build("forall x. happy(x) -> alive(x)").unwrap();
        assert!(matches!(expr, Expr::ForAll(ref vars, _) if vars == &vec!["x".to_string()]));
    }

    #[test]
    fn test_syntax_error_carries_text() {
        assert!(build("happy(a").is_ok());
        let err = build("happy(\"a\")").unwrap_err();
        assert_eq!(err.code(), ErrorCode::StringLiteral);
        assert_eq!(err.text(), Some("happy(\"a\")"));
    }

    #[test]
    fn test_closure_lookup() {
        let rel = RelationFn::new(RelationId(7), "p", 1);
        let lookup = |name: &str| (name == "p").then(|| rel.clone());
        assert!(translate("p(a)", &lookup, ParseOptions::default()).is_ok());
        assert!(translate("q(a)", &lookup, ParseOptions::default()).is_err());
    }
}
