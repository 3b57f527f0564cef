//! Property-based tests for the formula language and translation
//!
//! - printing a parsed formula and parsing it again gives the same tree
//! - applying a relation to the wrong number of terms is always an error

use proptest::prelude::*;
use storylogic::fol::{lexer::is_reserved, Application, CompareOp, Formula, Term};
use storylogic::{parse_formula, translate, ErrorCode, ParseOptions, RelationFn, RelationId};

// ===== Strategies =====

fn arb_ident() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,6}".prop_filter("keywords are not identifiers", |s| !is_reserved(s))
}

fn arb_term() -> impl Strategy<Value = Term> {
    let leaf = prop_oneof![
        arb_ident().prop_map(Term::Var),
        (-1000i64..1000).prop_map(Term::Int),
    ];
    leaf.prop_recursive(2, 8, 3, |inner| {
        (arb_ident(), prop::collection::vec(inner, 0..=3))
            .prop_map(|(name, args)| Term::App(Application::new(name, args)))
    })
}

fn arb_op() -> impl Strategy<Value = CompareOp> {
    prop_oneof![
        Just(CompareOp::Le),
        Just(CompareOp::Ge),
        Just(CompareOp::Lt),
        Just(CompareOp::Gt),
        Just(CompareOp::Eq),
        Just(CompareOp::Ne),
    ]
}

fn arb_formula() -> impl Strategy<Value = Formula> {
    let leaf = prop_oneof![
        (arb_ident(), prop::collection::vec(arb_term(), 0..=3))
            .prop_map(|(name, args)| Formula::Atom(Application::new(name, args))),
        (arb_op(), arb_term(), arb_term()).prop_map(|(op, l, r)| Formula::Compare(op, l, r)),
    ];

    leaf.prop_recursive(4, 64, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(|f| Formula::Not(Box::new(f))),
            prop::collection::vec(inner.clone(), 2..=3).prop_map(Formula::And),
            prop::collection::vec(inner.clone(), 2..=3).prop_map(Formula::Or),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Formula::Implies(Box::new(l), Box::new(r))),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Formula::Iff(Box::new(l), Box::new(r))),
            (prop::collection::vec(arb_ident(), 1..=3), inner.clone())
                .prop_map(|(vars, body)| Formula::ForAll(vars, Box::new(body))),
            (prop::collection::vec(arb_ident(), 1..=3), inner)
                .prop_map(|(vars, body)| Formula::Exists(vars, Box::new(body))),
        ]
    })
}

// ===== Properties =====

proptest! {
    #[test]
    fn prop_print_then_parse_is_identity(formula in arb_formula()) {
        let printed = formula.to_string();
        let reparsed = parse_formula(&printed);
        prop_assert!(reparsed.is_ok(), "failed to parse {:?}: {:?}", printed, reparsed);
        prop_assert_eq!(reparsed.unwrap(), formula);
    }

    #[test]
    fn prop_wrong_arg_count_is_arity_mismatch(
        arity in 0usize..4,
        given in 0usize..6,
        args in prop::collection::vec(arb_ident(), 6),
        wrap in 0u8..3,
    ) {
        prop_assume!(arity != given);
        let rel = RelationFn::new(RelationId(0), "rel", arity);
        let lookup = |name: &str| (name == "rel").then(|| rel.clone());

        let app = format!("rel({})", args[..given].join(", "));
        let text = match wrap {
            0 => app,
            1 => format!("forall q. not {}", app),
            _ => format!("rel_ok() or {}", app),
        };
        let lookup_with_ok = |name: &str| match name {
            "rel_ok" => Some(RelationFn::new(RelationId(1), "rel_ok", 0)),
            other => lookup(other),
        };

        let err = translate(&text, &lookup_with_ok, ParseOptions::default());
        prop_assert!(err.is_err());
        prop_assert_eq!(err.unwrap_err().code(), ErrorCode::ArityMismatch);
    }
}
