//! Incremental satisfiability with tracked assertions
//!
//! [`Solver`] grounds expressions over a fixed [`Domain`] and hands the
//! clauses to the CDCL engine in [`sat`]. Tracked assertions are guarded by
//! selector variables that are solved as assumptions, so an unsatisfiable
//! check reports the labels of the assertions involved.
//!
//! The representatives only stand in for the integers, so refuting a claim
//! that some element exists proves nothing. When every unsat core needs
//! such a claim, [`Solver::check`] answers [`Verdict::Unknown`].
//!
//! Checkpoints nest strictly. [`Solver::frame`] returns a guard that pops on
//! drop, including during unwinding:
//!
//! ```rust,ignore
//! solver.assert_and_track(&fact, "global_assertion_0")?;
//! {
//!     let mut frame = solver.frame();
//!     frame.assert_and_track(&rumour, "alice_assertion_0")?;
//!     let verdict = frame.check();
//! } // popped here
//! ```

pub mod ground;
pub mod sat;

use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::SolverConfig;
use crate::error::CoreResult;
use crate::logic::Expr;

pub use ground::{Domain, DomainBuilder, ElemId, Element};
pub use sat::{CdclConfig, CdclSolver, Lit, SatResult, SolverStats, Var};

use ground::{Grounder, GrounderMark, Node};

/// Outcome of a satisfiability check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Sat,
    Unsat,
    Unknown,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Sat => "sat",
            Verdict::Unsat => "unsat",
            Verdict::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SatResult> for Verdict {
    fn from(result: SatResult) -> Self {
        match result {
            SatResult::Sat => Verdict::Sat,
            SatResult::Unsat => Verdict::Unsat,
            SatResult::Unknown => Verdict::Unknown,
        }
    }
}

impl From<&SolverConfig> for CdclConfig {
    fn from(config: &SolverConfig) -> Self {
        CdclConfig {
            restart_interval: config.restart_interval,
            restart_multiplier: config.restart_multiplier,
            max_conflicts: config.max_conflicts,
            ..CdclConfig::default()
        }
    }
}

#[derive(Debug, Clone)]
struct Tracked {
    label: String,
    selector: Var,
    existential: bool,
}

#[derive(Debug, Clone)]
struct FrameMark {
    tracked: usize,
    grounder: GrounderMark,
    existential_untracked: bool,
}

/// Incremental solver over one grounding domain
#[derive(Debug, Clone)]
pub struct Solver {
    sat: CdclSolver,
    grounder: Grounder,
    domain: Domain,
    tracked: Vec<Tracked>,
    frames: Vec<FrameMark>,
    core: Vec<String>,
    minimize_cores: bool,
    existential_untracked: bool,
}

impl Solver {
    pub fn new(domain: Domain, config: &SolverConfig) -> Self {
        Solver {
            sat: CdclSolver::with_config(CdclConfig::from(config)),
            grounder: Grounder::new(config.max_ground_clauses),
            domain,
            tracked: Vec::new(),
            frames: Vec::new(),
            core: Vec::new(),
            minimize_cores: config.minimize_cores,
            existential_untracked: false,
        }
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Assert an expression without tracking it
    pub fn assert(&mut self, expr: &Expr) -> CoreResult<()> {
        self.existential_untracked |= expr.asserts_existence();
        match self.grounder.ground(&mut self.sat, &self.domain, expr)? {
            Node::Const(true) => Ok(()),
            Node::Const(false) => self.grounder.add_clause(&mut self.sat, &[]),
            Node::Lit(lit) => self.grounder.add_clause(&mut self.sat, &[lit]),
        }
    }

    /// Assert an expression under `label`; the label is reported in unsat
    /// cores.
    pub fn assert_and_track(&mut self, expr: &Expr, label: impl Into<String>) -> CoreResult<()> {
        let label = label.into();
        let selector = self.sat.new_var();
        let guard = Lit::negative(selector);
        match self.grounder.ground(&mut self.sat, &self.domain, expr)? {
            Node::Const(true) => {}
            Node::Const(false) => self.grounder.add_clause(&mut self.sat, &[guard])?,
            Node::Lit(lit) => self.grounder.add_clause(&mut self.sat, &[guard, lit])?,
        }
        trace!(label = %label, "tracked assertion");
        self.tracked.push(Tracked {
            label,
            selector,
            existential: expr.asserts_existence(),
        });
        Ok(())
    }

    pub fn num_tracked(&self) -> usize {
        self.tracked.len()
    }

    /// Open a checkpoint
    pub fn push(&mut self) {
        self.sat.push();
        self.frames.push(FrameMark {
            tracked: self.tracked.len(),
            grounder: self.grounder.mark(),
            existential_untracked: self.existential_untracked,
        });
    }

    /// Drop everything asserted since the matching `push`
    pub fn pop(&mut self) {
        if let Some(mark) = self.frames.pop() {
            self.sat.pop();
            self.tracked.truncate(mark.tracked);
            self.grounder.restore(mark.grounder);
            self.existential_untracked = mark.existential_untracked;
            self.core.clear();
        }
    }

    /// Push a checkpoint that is popped when the guard goes out of scope
    pub fn frame(&mut self) -> SolverFrame<'_> {
        self.push();
        SolverFrame { solver: self }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Check every assertion made so far.
    ///
    /// An unsat answer whose core contains an existence claim is checked
    /// again without those claims; if the rest is not refuted on its own
    /// the verdict is unknown.
    pub fn check(&mut self) -> Verdict {
        self.core.clear();
        let all: Vec<usize> = (0..self.tracked.len()).collect();
        let mut result = self.solve_tracked(&all);
        if result == SatResult::Unsat {
            let mut core = self.failed_indices();
            if self.existential_untracked {
                debug!("refutation involves an untracked existence claim");
                result = SatResult::Unknown;
                core.clear();
            } else if core.iter().any(|&i| self.tracked[i].existential) {
                let universal: Vec<usize> = all.into_iter().filter(|&i| !self.tracked[i].existential).collect();
                result = self.solve_tracked(&universal);
                if result == SatResult::Unsat {
                    core = self.failed_indices();
                } else {
                    debug!("refutation needs an existence claim");
                    result = SatResult::Unknown;
                    core.clear();
                }
            }
            if result == SatResult::Unsat && self.minimize_cores {
                core = self.minimize(core);
            }
            self.core = core.into_iter().map(|i| self.tracked[i].label.clone()).collect();
        }
        let verdict = Verdict::from(result);
        debug!(
            %verdict,
            tracked = self.tracked.len(),
            core = self.core.len(),
            atoms = self.grounder.atom_count(),
            clauses = self.grounder.clause_count(),
            "check finished"
        );
        verdict
    }

    /// Labels of the assertions in the last unsat core, in assertion order
    pub fn unsat_core(&self) -> &[String] {
        &self.core
    }

    pub fn stats(&self) -> SolverStats {
        self.sat.stats()
    }

    fn solve_tracked(&mut self, indices: &[usize]) -> SatResult {
        let assumptions: Vec<Lit> = indices.iter().map(|&i| Lit::positive(self.tracked[i].selector)).collect();
        self.sat.solve_with_assumptions(&assumptions)
    }

    /// Indices into `tracked` of the failed assumptions, sorted
    fn failed_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .sat
            .failed_assumptions()
            .iter()
            .filter_map(|lit| self.tracked.binary_search_by_key(&lit.var(), |t| t.selector).ok())
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// Deletion-based shrinking: drop each member in turn and keep it out
    /// whenever the rest stays unsatisfiable.
    fn minimize(&mut self, mut core: Vec<usize>) -> Vec<usize> {
        let mut i = 0;
        while i < core.len() {
            let rest: Vec<usize> = core
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, &t)| t)
                .collect();
            match self.solve_tracked(&rest) {
                // members before i stay necessary in any subset, so the
                // sorted refined core keeps them at the front
                SatResult::Unsat => core = self.failed_indices(),
                SatResult::Sat => i += 1,
                SatResult::Unknown => break,
            }
        }
        core
    }
}

/// Checkpoint guard returned by [`Solver::frame`]
pub struct SolverFrame<'a> {
    solver: &'a mut Solver,
}

impl Deref for SolverFrame<'_> {
    type Target = Solver;

    fn deref(&self) -> &Solver {
        self.solver
    }
}

impl DerefMut for SolverFrame<'_> {
    fn deref_mut(&mut self) -> &mut Solver {
        self.solver
    }
}

impl Drop for SolverFrame<'_> {
    fn drop(&mut self) {
        self.solver.pop();
    }
}
