//! Turn-by-turn consistency tracking
//!
//! A [`Session`] owns the symbol table and the append-only turn history.
//! Each turn registers declarations, translates formula lines into scoped
//! expressions and re-checks everything accumulated so far:
//!
//! - global formulas of every turn are checked together;
//! - each named scope is checked together with the global formulas only.
//!
//! The inconsistency score of a turn is the size of the global unsat core
//! plus, for every scope, how much larger its core is than the global one.
//! A turn is committed to history only after its check succeeds.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::builder::translate;
use crate::config::StoryConfig;
use crate::declarations::{self, NamedDecl};
use crate::error::{CoreError, CoreResult};
use crate::fol::ParseOptions;
use crate::logic::{Expr, ExprTerm, RelationFn};
use crate::macros::{expand_exclusivity, is_exclusivity_line};
use crate::solver::{Domain, Solver, Verdict};
use crate::symbols::{Declared, SymbolTable};

/// Name of the partition checked with every scope
pub const GLOBAL_SCOPE: &str = "global";

/// Where a session is in processing its current turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Declaring,
    Translating,
    Solving,
    Logged,
}

/// A translated formula and the line it came from
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedFormula {
    pub source: String,
    pub expr: Expr,
}

/// Formulas of one turn, grouped by scope; the global scope comes first
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedFormulas {
    scopes: IndexMap<String, Vec<TrackedFormula>>,
}

impl Default for ScopedFormulas {
    fn default() -> Self {
        let mut scopes = IndexMap::new();
        scopes.insert(GLOBAL_SCOPE.to_string(), Vec::new());
        ScopedFormulas { scopes }
    }
}

impl ScopedFormulas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, scope: &str, formula: TrackedFormula) {
        self.scopes.entry(scope.to_string()).or_default().push(formula);
    }

    pub fn global(&self) -> &[TrackedFormula] {
        self.get(GLOBAL_SCOPE)
    }

    pub fn get(&self, scope: &str) -> &[TrackedFormula] {
        self.scopes.get(scope).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Scope names in first-use order, global first
    pub fn scope_names(&self) -> impl Iterator<Item = &str> {
        self.scopes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.scopes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `Scope: name` headers, one formula per line
    pub fn render(&self) -> String {
        let mut blocks = Vec::new();
        for (scope, formulas) in &self.scopes {
            if formulas.is_empty() {
                continue;
            }
            let mut block = format!("Scope: {}\n", scope);
            for formula in formulas {
                block.push_str(&format!("{}\n", formula.expr));
            }
            blocks.push(block);
        }
        blocks.join("\n")
    }
}

/// Everything the caller supplies for one turn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnInput {
    pub narrative: Option<String>,
    /// `name: meaning`
    pub objects: Vec<String>,
    /// `name(params): meaning | usage cases`
    pub relations: Vec<String>,
    /// `name: meaning`
    pub scopes: Vec<String>,
    /// Exclusivity shorthand lines
    pub exclusivity: Vec<String>,
    /// Formula lines, optionally prefixed `scope|: `
    pub formulas: Vec<String>,
}

/// Check outcome for one scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeVerdict {
    pub scope: String,
    pub verdict: Verdict,
    pub core_size: usize,
    /// Core size beyond the global core; the full core size for global
    pub core_growth: usize,
    pub core: Vec<String>,
}

/// Result of one committed turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReport {
    pub turn: usize,
    pub verdicts: Vec<ScopeVerdict>,
    pub inconsistency_score: usize,
    pub rendering: String,
}

impl TurnReport {
    pub fn verdict(&self, scope: &str) -> Option<Verdict> {
        self.verdicts.iter().find(|v| v.scope == scope).map(|v| v.verdict)
    }

    pub fn is_consistent(&self) -> bool {
        self.verdicts.iter().all(|v| v.verdict == Verdict::Sat)
    }
}

impl fmt::Display for TurnReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Turn {} (inconsistency score {})", self.turn, self.inconsistency_score)?;
        for v in &self.verdicts {
            write!(f, "  {}: {}", v.scope, v.verdict)?;
            if !v.core.is_empty() {
                write!(f, " [{}]", v.core.join(", "))?;
            }
            writeln!(f)?;
        }
        if !self.rendering.is_empty() {
            writeln!(f)?;
            write!(f, "{}", self.rendering)?;
        }
        Ok(())
    }
}

/// Log entry of a committed turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnLog {
    pub turn: usize,
    pub narrative: Option<String>,
    /// Declarations made since the previous logged turn
    pub new_declarations: Vec<String>,
    /// Source lines of the turn's formulas
    pub sources: Vec<String>,
    pub rendering: String,
    pub verdicts: Vec<ScopeVerdict>,
    pub inconsistency_score: usize,
}

/// Closing record of an export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub conversation: Vec<String>,
    pub formulas: Vec<String>,
    pub declarations: String,
    pub scopes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogRecord {
    Turn(TurnLog),
    Summary(SessionSummary),
}

/// A narrative's declarations and formula history
#[derive(Debug, Clone)]
pub struct Session {
    config: StoryConfig,
    symbols: SymbolTable,
    history: Vec<ScopedFormulas>,
    logs: Vec<TurnLog>,
    pending_declarations: Vec<String>,
    phase: TurnPhase,
}

impl Default for Session {
    fn default() -> Self {
        Self::with_config(StoryConfig::default())
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StoryConfig) -> Self {
        Session {
            config,
            symbols: SymbolTable::new(),
            history: Vec::new(),
            logs: Vec::new(),
            pending_declarations: Vec::new(),
            phase: TurnPhase::Idle,
        }
    }

    pub fn config(&self) -> &StoryConfig {
        &self.config
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Committed turns, oldest first
    pub fn history(&self) -> &[ScopedFormulas] {
        &self.history
    }

    pub fn logs(&self) -> &[TurnLog] {
        &self.logs
    }

    fn parse_options(&self) -> ParseOptions {
        ParseOptions { balance_parens: self.config.session.balance_parens }
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    pub fn declare_object(&mut self, name: &str, meaning: &str) -> Declared {
        self.phase = TurnPhase::Declaring;
        let outcome = self.symbols.declare_object(name, meaning);
        if outcome == Declared::Added {
            self.pending_declarations.push(format!("{}: {}", name, meaning));
        }
        outcome
    }

    /// Declare a relation; a redeclaration keeps the first binding
    pub fn declare_relation(&mut self, name: &str, params: &[String], meaning: &str) -> (RelationFn, Declared) {
        self.phase = TurnPhase::Declaring;
        let (function, outcome) = self.symbols.declare_relation(name, params, meaning);
        if outcome == Declared::Added {
            self.pending_declarations
                .push(format!("{}({}): {}", name, params.join(", "), meaning));
        }
        (function, outcome)
    }

    pub fn declare_scope(&mut self, name: &str, meaning: &str) -> Declared {
        self.phase = TurnPhase::Declaring;
        let outcome = self.symbols.declare_scope(name, meaning);
        if outcome == Declared::Added {
            self.pending_declarations.push(format!("scope {}: {}", name, meaning));
        }
        outcome
    }

    /// Register the declaration lines of a turn input
    pub fn declare(&mut self, input: &TurnInput) -> CoreResult<()> {
        for NamedDecl { name, meaning } in declarations::parse_object_lines(&input.objects.join("\n")) {
            self.declare_object(&name, &meaning);
        }
        for decl in declarations::parse_relation_lines(&input.relations.join("\n"))? {
            self.declare_relation(&decl.name, &decl.params, &decl.meaning);
        }
        for NamedDecl { name, meaning } in declarations::parse_scope_lines(&input.scopes.join("\n")) {
            self.declare_scope(&name, &meaning);
        }
        Ok(())
    }

    pub fn declarations_text(&self) -> String {
        self.symbols.declarations_text()
    }

    pub fn scopes_text(&self) -> String {
        self.symbols.scopes_text()
    }

    // ------------------------------------------------------------------
    // Translation
    // ------------------------------------------------------------------

    /// Translate formula lines into scoped expressions.
    ///
    /// Blank lines and code fences are skipped. A `scope|: ` prefix files
    /// the formula under that scope; an undeclared scope named after an
    /// object is adopted. The first failing line aborts the whole block.
    pub fn translate_lines<S: AsRef<str>>(&mut self, lines: &[S]) -> CoreResult<ScopedFormulas> {
        self.phase = TurnPhase::Translating;
        let result = self.translate_block(lines);
        if result.is_err() {
            self.phase = TurnPhase::Idle;
        }
        result
    }

    fn translate_block<S: AsRef<str>>(&mut self, lines: &[S]) -> CoreResult<ScopedFormulas> {
        let options = self.parse_options();
        let mut formulas = ScopedFormulas::new();

        for line in lines {
            let line = line.as_ref().trim();
            if line.is_empty() || line.contains("```") {
                continue;
            }
            let (scope, body) = match line.split_once("|:") {
                Some((scope, body)) => (scope.trim(), body.trim()),
                None => (GLOBAL_SCOPE, line),
            };
            if scope != GLOBAL_SCOPE
                && !self.symbols.has_scope(scope)
                && !self.symbols.adopt_object_as_scope(scope)
            {
                return Err(CoreError::unknown_scope(scope, line));
            }

            let expr = if is_exclusivity_line(body) {
                expand_exclusivity(body, &self.symbols)
            } else {
                translate(body, &self.symbols, options)
            }
            .map_err(|e| e.with_text(line))?;

            debug!(scope, formula = %expr, "translated");
            formulas.push(scope, TrackedFormula { source: line.to_string(), expr });
        }
        Ok(formulas)
    }

    // ------------------------------------------------------------------
    // Turns
    // ------------------------------------------------------------------

    /// Declare, translate and check one turn
    pub fn process_turn(&mut self, input: &TurnInput) -> CoreResult<TurnReport> {
        let result = self.declare(input).and_then(|()| {
            let lines: Vec<&str> = input
                .exclusivity
                .iter()
                .chain(&input.formulas)
                .map(String::as_str)
                .collect();
            self.translate_lines(&lines)
        });
        match result {
            Ok(formulas) => self.commit_turn(formulas, input.narrative.clone()),
            Err(err) => {
                self.phase = TurnPhase::Idle;
                Err(err)
            }
        }
    }

    /// Check `turn` against the history and commit it on success
    pub fn append_turn(&mut self, turn: ScopedFormulas) -> CoreResult<TurnReport> {
        self.commit_turn(turn, None)
    }

    fn commit_turn(&mut self, turn: ScopedFormulas, narrative: Option<String>) -> CoreResult<TurnReport> {
        self.phase = TurnPhase::Solving;
        let (verdicts, score) = match self.check(&turn) {
            Ok(result) => result,
            Err(err) => {
                self.phase = TurnPhase::Idle;
                return Err(err);
            }
        };

        let report = TurnReport {
            turn: self.history.len() + 1,
            verdicts,
            inconsistency_score: score,
            rendering: turn.render(),
        };
        let sources = turn
            .scopes
            .values()
            .flatten()
            .map(|f| f.source.clone())
            .collect();
        self.logs.push(TurnLog {
            turn: report.turn,
            narrative,
            new_declarations: std::mem::take(&mut self.pending_declarations),
            sources,
            rendering: report.rendering.clone(),
            verdicts: report.verdicts.clone(),
            inconsistency_score: score,
        });
        self.history.push(turn);
        self.phase = TurnPhase::Logged;
        info!(turn = report.turn, score, consistent = report.is_consistent(), "turn logged");
        Ok(report)
    }

    /// Check the history plus `turn` without committing anything
    fn check(&self, turn: &ScopedFormulas) -> CoreResult<(Vec<ScopeVerdict>, usize)> {
        let mut global: Vec<&TrackedFormula> = Vec::new();
        let mut scoped: IndexMap<&str, Vec<&TrackedFormula>> = IndexMap::new();
        for formulas in self.history.iter().chain(std::iter::once(turn)) {
            for (scope, items) in &formulas.scopes {
                if scope == GLOBAL_SCOPE {
                    global.extend(items);
                } else if !items.is_empty() {
                    scoped.entry(scope.as_str()).or_default().extend(items);
                }
            }
        }

        let solver_config = &self.config.solver;
        let mut base = Domain::builder();
        for object in self.symbols.objects() {
            base.name(&object.name);
        }
        for formula in global.iter().chain(scoped.values().flatten()) {
            base.expr(&formula.expr);
        }
        for formula in &global {
            base.equalities_of(&formula.expr);
        }
        base.witnesses(solver_config.witness_elements);
        let domain = base.build();
        debug!(elements = domain.len(), global = global.len(), scopes = scoped.len(), "checking");

        let mut solver = Solver::new(domain.clone(), solver_config);
        assert_tracked(&mut solver, GLOBAL_SCOPE, &global)?;
        let verdict = solver.check();
        let global_core = solver.unsat_core().to_vec();
        let global_size = global_core.len();
        let mut verdicts = vec![ScopeVerdict {
            scope: GLOBAL_SCOPE.to_string(),
            verdict,
            core_size: global_size,
            core_growth: global_size,
            core: global_core,
        }];
        let mut score = global_size;

        for (scope, formulas) in &scoped {
            let (verdict, core) = if introduces_equalities(&domain, formulas) {
                // the scope's equations must not leak into other scopes
                let mut builder = base.clone();
                for formula in formulas {
                    builder.equalities_of(&formula.expr);
                }
                let mut own = Solver::new(builder.build(), solver_config);
                assert_tracked(&mut own, GLOBAL_SCOPE, &global)?;
                assert_tracked(&mut own, scope, formulas)?;
                let verdict = own.check();
                (verdict, own.unsat_core().to_vec())
            } else {
                let mut frame = solver.frame();
                assert_tracked(&mut frame, scope, formulas)?;
                let verdict = frame.check();
                (verdict, frame.unsat_core().to_vec())
            };
            let growth = core.len().saturating_sub(global_size);
            debug!(scope, %verdict, core = core.len(), growth, "scope checked");
            score += growth;
            verdicts.push(ScopeVerdict {
                scope: scope.to_string(),
                verdict,
                core_size: core.len(),
                core_growth: growth,
                core,
            });
        }

        Ok((verdicts, score))
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Turn logs followed by a summary record
    pub fn log_records(&self) -> Vec<LogRecord> {
        let mut records: Vec<LogRecord> = self.logs.iter().cloned().map(LogRecord::Turn).collect();
        records.push(LogRecord::Summary(SessionSummary {
            conversation: self.logs.iter().filter_map(|l| l.narrative.clone()).collect(),
            formulas: self.history.iter().map(ScopedFormulas::render).collect(),
            declarations: self.declarations_text(),
            scopes: self.scopes_text(),
        }));
        records
    }

    /// Write [`Session::log_records`] as pretty JSON
    pub fn export_logs(&self, path: &Path) -> CoreResult<()> {
        let json = serde_json::to_string_pretty(&self.log_records())?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), turns = self.logs.len(), "exported logs");
        Ok(())
    }
}

fn assert_tracked(solver: &mut Solver, scope: &str, formulas: &[&TrackedFormula]) -> CoreResult<()> {
    for (i, formula) in formulas.iter().enumerate() {
        solver.assert_and_track(&formula.expr, format!("{}_assertion_{}", scope, i))?;
    }
    Ok(())
}

/// Whether any top-level equation of `formulas` equates two names the
/// domain keeps apart
fn introduces_equalities(domain: &Domain, formulas: &[&TrackedFormula]) -> bool {
    formulas
        .iter()
        .flat_map(|f| f.expr.explicit_equalities())
        .any(|(l, r)| match (&l, &r) {
            (ExprTerm::Sym(a), ExprTerm::Sym(b)) => !domain.same_element(a, b),
            _ => false,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SolverConfig;
    use crate::error::ErrorCode;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn aleph_input() -> TurnInput {
        TurnInput {
            narrative: Some("Aleph climbs Everest, then strolls through Paris.".into()),
            objects: lines(&["aleph: a dog", "mount_everest: a mountain", "paris: a city"]),
            relations: lines(&["locates_in(a, b): a is located in b | locates_in(aleph, paris)"]),
            exclusivity: lines(&["locates_in(a, [exclusive_arg])"]),
            formulas: lines(&["locates_in(aleph, mount_everest)", "locates_in(aleph, paris)"]),
            ..TurnInput::default()
        }
    }

    fn foo_session() -> Session {
        let mut session = Session::new();
        session.declare_relation("foo", &lines(&["a", "b"]), "a has b");
        session
    }

    #[test]
    fn test_aleph_is_inconsistent() {
        let mut session = Session::new();
        let report = session.process_turn(&aleph_input()).unwrap();
        assert_eq!(report.turn, 1);
        assert_eq!(report.verdict(GLOBAL_SCOPE), Some(Verdict::Unsat));
        assert_eq!(report.inconsistency_score, 3);
        assert!(!report.is_consistent());
        assert_eq!(session.phase(), TurnPhase::Logged);
        assert!(report.rendering.starts_with("Scope: global\n"));
    }

    #[test]
    fn test_aleph_contradiction_in_later_turn() {
        let mut session = Session::new();
        let first = TurnInput {
            objects: lines(&["aleph: a dog", "mount_everest: a mountain"]),
            relations: lines(&["locates_in(a, b): a is located in b | locates_in(aleph, mount_everest)"]),
            exclusivity: lines(&["locates_in(a, [exclusive_arg])"]),
            formulas: lines(&["locates_in(aleph, mount_everest)"]),
            ..TurnInput::default()
        };
        let report = session.process_turn(&first).unwrap();
        assert_eq!(report.verdict(GLOBAL_SCOPE), Some(Verdict::Sat));
        assert_eq!(report.inconsistency_score, 0);

        let later = TurnInput {
            objects: lines(&["paris: a city"]),
            formulas: lines(&["locates_in(aleph, paris)"]),
            ..TurnInput::default()
        };
        let report = session.process_turn(&later).unwrap();
        assert_eq!(report.turn, 2);
        assert_eq!(report.verdict(GLOBAL_SCOPE), Some(Verdict::Unsat));
        assert_eq!(report.inconsistency_score, 3);
        assert_eq!(
            report.verdicts[0].core,
            vec!["global_assertion_0", "global_assertion_1", "global_assertion_2"]
        );
    }

    #[test]
    fn test_unresolved_relation_commits_nothing() {
        let mut session = Session::new();
        session.process_turn(&aleph_input()).unwrap();
        let input = TurnInput { formulas: lines(&["teleports(a, b)"]), ..TurnInput::default() };
        let err = session.process_turn(&input).unwrap_err();
        assert!(matches!(&err, CoreError::UnresolvedRelation { name, .. } if name == "teleports"));
        assert!(err.correction_message().contains("teleports"));
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.logs().len(), 1);
        assert_eq!(session.phase(), TurnPhase::Idle);
    }

    #[test]
    fn test_failed_block_keeps_declarations() {
        let mut session = Session::new();
        let input = TurnInput {
            objects: lines(&["bet: a cat"]),
            formulas: lines(&["teleports(bet)"]),
            ..TurnInput::default()
        };
        assert!(session.process_turn(&input).is_err());
        assert!(session.symbols().object("bet").is_some());
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_exclusivity_with_distinct_objects() {
        let mut session = foo_session();
        let turn = session
            .translate_lines(&["foo(x, [exclusive_arg])", "foo(x, y)", "foo(x, z)"])
            .unwrap();
        let report = session.append_turn(turn).unwrap();
        assert_eq!(report.verdict(GLOBAL_SCOPE), Some(Verdict::Unsat));

        let mut session = foo_session();
        let turn = session
            .translate_lines(&["foo(x, [exclusive_arg])", "foo(x, y)", "foo(x, z)", "y = z"])
            .unwrap();
        let report = session.append_turn(turn).unwrap();
        assert_eq!(report.verdict(GLOBAL_SCOPE), Some(Verdict::Sat));
        assert_eq!(report.inconsistency_score, 0);

        let mut session = foo_session();
        let turn = session
            .translate_lines(&["foo(x, [exclusive_arg])", "foo(x, y)", "foo(x, y)"])
            .unwrap();
        assert!(session.append_turn(turn).unwrap().is_consistent());
    }

    #[test]
    fn test_scope_isolation() {
        let mut session = foo_session();
        session.declare_scope("dream", "a dream");
        session.declare_scope("memory", "a memory");
        let turn = session
            .translate_lines(&[
                "foo(x, [exclusive_arg])",
                "foo(x, y)",
                "dream|: not foo(x, y)",
                "memory|: foo(w, z)",
            ])
            .unwrap();
        let report = session.append_turn(turn).unwrap();
        assert_eq!(report.verdict(GLOBAL_SCOPE), Some(Verdict::Sat));
        assert_eq!(report.verdict("dream"), Some(Verdict::Unsat));
        assert_eq!(report.verdict("memory"), Some(Verdict::Sat));
        assert_eq!(report.inconsistency_score, 2);
        let scopes: Vec<_> = report.verdicts.iter().map(|v| v.scope.as_str()).collect();
        assert_eq!(scopes, vec!["global", "dream", "memory"]);
    }

    #[test]
    fn test_scope_equations_stay_in_scope() {
        let mut session = foo_session();
        session.declare_scope("dream", "a dream");
        session.declare_scope("nightmare", "a nightmare");
        let turn = session
            .translate_lines(&[
                "foo(x, [exclusive_arg])",
                "foo(x, y)",
                "dream|: foo(x, z) and y = z",
                "nightmare|: foo(x, z)",
            ])
            .unwrap();
        let report = session.append_turn(turn).unwrap();
        assert_eq!(report.verdict(GLOBAL_SCOPE), Some(Verdict::Sat));
        assert_eq!(report.verdict("dream"), Some(Verdict::Sat));
        assert_eq!(report.verdict("nightmare"), Some(Verdict::Unsat));
    }

    #[test]
    fn test_score_is_monotone() {
        let mut session = Session::new();
        let first = session.process_turn(&aleph_input()).unwrap();
        let input = TurnInput {
            objects: lines(&["bet: a cat"]),
            formulas: lines(&["locates_in(bet, paris)"]),
            ..TurnInput::default()
        };
        let second = session.process_turn(&input).unwrap();
        assert_eq!(second.turn, 2);
        assert!(second.inconsistency_score >= first.inconsistency_score);
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn test_declarations_only_turn_keeps_score() {
        let mut session = Session::new();
        let first = session.process_turn(&aleph_input()).unwrap();
        assert_eq!(first.inconsistency_score, 3);

        let input = TurnInput {
            objects: lines(&["bet: a cat", "gimel: a camel", "dalet: a door"]),
            ..TurnInput::default()
        };
        let second = session.process_turn(&input).unwrap();
        assert_eq!(second.verdict(GLOBAL_SCOPE), Some(Verdict::Unsat));
        assert_eq!(second.inconsistency_score, first.inconsistency_score);
    }

    fn p_session() -> Session {
        let mut session = Session::new();
        session.declare_object("a", "something");
        session.declare_relation("p", &lines(&["x"]), "x is p");
        session
    }

    #[test]
    fn test_claims_needing_fresh_elements_are_not_refuted() {
        let mut session = p_session();
        let turn = session
            .translate_lines(&["p(a)", "exists x y. x != y and not p(x) and not p(y)"])
            .unwrap();
        let first = session.append_turn(turn).unwrap();
        assert_ne!(first.verdict(GLOBAL_SCOPE), Some(Verdict::Unsat));
        assert_eq!(first.inconsistency_score, 0);

        // more named objects leave room for the claim
        session.declare_object("b", "another thing");
        session.declare_object("c", "a third thing");
        let second = session.append_turn(ScopedFormulas::new()).unwrap();
        assert!(second.inconsistency_score >= first.inconsistency_score);
        assert_eq!(second.verdict(GLOBAL_SCOPE), Some(Verdict::Sat));
    }

    #[test]
    fn test_unbounded_order_is_not_refuted() {
        let mut session = p_session();
        let turn = session.translate_lines(&["forall x. exists y. y > x"]).unwrap();
        let report = session.append_turn(turn).unwrap();
        assert_eq!(report.verdict(GLOBAL_SCOPE), Some(Verdict::Unknown));
        assert_eq!(report.inconsistency_score, 0);
        assert!(report.verdicts[0].core.is_empty());
    }

    #[test]
    fn test_names_range_over_integers() {
        let mut session = Session::new();
        let turn = session.translate_lines(&["x <= 18 and x >= 18"]).unwrap();
        let report = session.append_turn(turn).unwrap();
        assert_eq!(report.verdict(GLOBAL_SCOPE), Some(Verdict::Sat));

        let mut session = Session::new();
        let turn = session.translate_lines(&["y > 1 and y < 2"]).unwrap();
        let report = session.append_turn(turn).unwrap();
        assert_eq!(report.verdict(GLOBAL_SCOPE), Some(Verdict::Unsat));
        assert_eq!(report.inconsistency_score, 1);
    }

    #[test]
    fn test_redeclared_relation_is_reported() {
        let mut session = foo_session();
        let (first, outcome) = session.declare_relation("foo", &lines(&["a", "b", "c"]), "other");
        assert_eq!(outcome, Declared::Redeclared);
        assert_eq!(first.arity(), 2);
        let (_, outcome) = session.declare_relation("bar", &lines(&["a"]), "a is bar");
        assert_eq!(outcome, Declared::Added);
    }

    #[test]
    fn test_failed_translation_returns_to_idle() {
        let mut session = foo_session();
        assert!(session.translate_lines(&["foo(a)"]).is_err());
        assert_eq!(session.phase(), TurnPhase::Idle);
        session.translate_lines(&["foo(a, b)"]).unwrap();
        assert_eq!(session.phase(), TurnPhase::Translating);
    }

    #[test]
    fn test_scope_adoption_and_unknown_scope() {
        let mut session = Session::new();
        session.declare_object("alice", "the protagonist");
        session.declare_relation("happy", &lines(&["a"]), "a is happy");
        let turn = session.translate_lines(&["alice|: happy(alice)"]).unwrap();
        assert_eq!(turn.get("alice").len(), 1);
        assert!(session.symbols().has_scope("alice"));

        let err = session.translate_lines(&["bob|: happy(alice)"]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownScope);
        assert_eq!(err.text(), Some("bob|: happy(alice)"));
    }

    #[test]
    fn test_translate_skips_fences_and_blanks() {
        let mut session = foo_session();
        let turn = session.translate_lines(&["```", "", "foo(a, b)", "```"]).unwrap();
        assert_eq!(turn.len(), 1);
        assert_eq!(turn.global()[0].source, "foo(a, b)");
    }

    #[test]
    fn test_grounding_budget_commits_nothing() {
        let mut config = StoryConfig::default();
        config.solver = SolverConfig { max_ground_clauses: 3, ..SolverConfig::default() };
        let mut session = Session::with_config(config);
        let err = session.process_turn(&aleph_input()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SolverError);
        assert!(session.history().is_empty());
        assert!(session.logs().is_empty());
        assert_eq!(session.phase(), TurnPhase::Idle);
    }

    #[test]
    fn test_render_groups_by_scope() {
        let mut session = foo_session();
        session.declare_scope("dream", "a dream");
        let turn = session.translate_lines(&["dream|: foo(a, b)", "foo(b, a)"]).unwrap();
        assert_eq!(turn.render(), "Scope: global\nfoo(b, a)\n\nScope: dream\nfoo(a, b)\n");
    }

    #[test]
    fn test_export_logs() {
        let mut session = Session::new();
        session.process_turn(&aleph_input()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.json");
        session.export_logs(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\n  {"));
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        let records = value.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["turn"], 1);
        assert_eq!(records[0]["verdicts"][0]["verdict"], "unsat");
        assert_eq!(records[0]["new_declarations"].as_array().unwrap().len(), 4);
        assert!(records[1]["declarations"].as_str().unwrap().contains("locates_in(a, b)"));
        assert_eq!(records[1]["conversation"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_session_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Session>();
    }

    #[test]
    fn test_turn_input_from_json() {
        let input: TurnInput = serde_json::from_str(r#"{"formulas": ["happy(a)"]}"#).unwrap();
        assert_eq!(input.formulas, vec!["happy(a)"]);
        assert!(input.objects.is_empty());
        assert!(input.narrative.is_none());
    }
}
