//! CDCL SAT solver
//!
//! Conflict-driven clause learning in the MiniSat style:
//!
//! - Two-watched-literal propagation
//! - VSIDS decision heuristic over an activity heap, with phase saving
//! - First-UIP learning and non-chronological backtracking
//! - Geometric restarts
//! - Solving under assumptions, with the failed assumptions as a core
//! - Checkpoints (`push` / `pop`) that discard everything added since
//!
//! Clauses are only ever added at decision level 0. Learned clauses are
//! stored after the clauses they were derived from, so truncating the
//! clause list on `pop` also drops every lemma that depended on them.

use std::fmt;

/// Variable index, starting at 0
pub type Var = u32;

/// A literal: a variable with a polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lit(u32);

impl Lit {
    /// `sign == true` is the positive literal
    pub fn new(var: Var, sign: bool) -> Self {
        Lit((var << 1) | (!sign as u32))
    }

    pub fn positive(var: Var) -> Self {
        Self::new(var, true)
    }

    pub fn negative(var: Var) -> Self {
        Self::new(var, false)
    }

    pub fn var(&self) -> Var {
        self.0 >> 1
    }

    pub fn sign(&self) -> bool {
        self.0 & 1 == 0
    }

    pub fn negated(&self) -> Self {
        Lit(self.0 ^ 1)
    }

    fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sign() {
            write!(f, "x{}", self.var())
        } else {
            write!(f, "!x{}", self.var())
        }
    }
}

/// Result of a solve call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SatResult {
    Sat,
    Unsat,
    /// Conflict budget exhausted
    Unknown,
}

/// Search parameters
#[derive(Debug, Clone)]
pub struct CdclConfig {
    /// Conflicts before the first restart
    pub restart_interval: u64,
    /// Growth factor of the restart interval
    pub restart_multiplier: f64,
    /// VSIDS activity decay
    pub var_decay: f64,
    /// Conflicts allowed per solve call; 0 means unlimited
    pub max_conflicts: u64,
}

impl Default for CdclConfig {
    fn default() -> Self {
        CdclConfig {
            restart_interval: 100,
            restart_multiplier: 1.5,
            var_decay: 0.95,
            max_conflicts: 0,
        }
    }
}

/// Running totals across solve calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    pub conflicts: u64,
    pub decisions: u64,
    pub propagations: u64,
    pub learned_clauses: u64,
    pub restarts: u64,
}

#[derive(Debug, Clone)]
struct Checkpoint {
    clauses: usize,
    vars: usize,
    trail: usize,
    root_conflict: bool,
}

/// Max-heap of variables keyed by activity
#[derive(Debug, Clone, Default)]
struct VarOrder {
    heap: Vec<Var>,
    positions: Vec<Option<usize>>,
}

impl VarOrder {
    fn grow(&mut self, num_vars: usize) {
        self.positions.resize(num_vars, None);
    }

    fn clear(&mut self) {
        self.heap.clear();
        self.positions.iter_mut().for_each(|p| *p = None);
    }

    fn insert(&mut self, var: Var, activity: &[f64]) {
        if self.positions[var as usize].is_some() {
            return;
        }
        let pos = self.heap.len();
        self.heap.push(var);
        self.positions[var as usize] = Some(pos);
        self.sift_up(pos, activity);
    }

    /// Restore heap order after `var`'s activity increased
    fn bump(&mut self, var: Var, activity: &[f64]) {
        if let Some(pos) = self.positions[var as usize] {
            self.sift_up(pos, activity);
        }
    }

    fn pop_max(&mut self, activity: &[f64]) -> Option<Var> {
        let last = self.heap.pop()?;
        if self.heap.is_empty() {
            self.positions[last as usize] = None;
            return Some(last);
        }
        let top = self.heap[0];
        self.positions[top as usize] = None;
        self.heap[0] = last;
        self.positions[last as usize] = Some(0);
        self.sift_down(0, activity);
        Some(top)
    }

    fn sift_up(&mut self, mut i: usize, activity: &[f64]) {
        let var = self.heap[i];
        while i > 0 {
            let parent = (i - 1) / 2;
            if activity[self.heap[parent] as usize] >= activity[var as usize] {
                break;
            }
            self.heap[i] = self.heap[parent];
            self.positions[self.heap[i] as usize] = Some(i);
            i = parent;
        }
        self.heap[i] = var;
        self.positions[var as usize] = Some(i);
    }

    fn sift_down(&mut self, mut i: usize, activity: &[f64]) {
        let var = self.heap[i];
        let len = self.heap.len();
        loop {
            let left = 2 * i + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && activity[self.heap[right] as usize] > activity[self.heap[left] as usize] {
                right
            } else {
                left
            };
            if activity[self.heap[child] as usize] <= activity[var as usize] {
                break;
            }
            self.heap[i] = self.heap[child];
            self.positions[self.heap[i] as usize] = Some(i);
            i = child;
        }
        self.heap[i] = var;
        self.positions[var as usize] = Some(i);
    }
}

fn lit_value(assigns: &[Option<bool>], lit: Lit) -> Option<bool> {
    assigns[lit.var() as usize].map(|v| v == lit.sign())
}

/// CDCL SAT solver
#[derive(Debug, Clone)]
pub struct CdclSolver {
    /// Stored clauses (length >= 2), original and learned interleaved
    clauses: Vec<Vec<Lit>>,
    /// Clauses watching each literal, indexed by literal
    watches: Vec<Vec<usize>>,
    assigns: Vec<Option<bool>>,
    level: Vec<u32>,
    reason: Vec<Option<usize>>,
    trail: Vec<Lit>,
    trail_lim: Vec<usize>,
    qhead: usize,
    activity: Vec<f64>,
    var_inc: f64,
    polarity: Vec<bool>,
    order: VarOrder,
    seen: Vec<bool>,
    /// The clause set is unsatisfiable without any assumptions
    root_conflict: bool,
    failed: Vec<Lit>,
    model: Vec<bool>,
    checkpoints: Vec<Checkpoint>,
    config: CdclConfig,
    stats: SolverStats,
}

impl CdclSolver {
    pub fn new() -> Self {
        Self::with_config(CdclConfig::default())
    }

    pub fn with_config(config: CdclConfig) -> Self {
        CdclSolver {
            clauses: Vec::new(),
            watches: Vec::new(),
            assigns: Vec::new(),
            level: Vec::new(),
            reason: Vec::new(),
            trail: Vec::new(),
            trail_lim: Vec::new(),
            qhead: 0,
            activity: Vec::new(),
            var_inc: 1.0,
            polarity: Vec::new(),
            order: VarOrder::default(),
            seen: Vec::new(),
            root_conflict: false,
            failed: Vec::new(),
            model: Vec::new(),
            checkpoints: Vec::new(),
            config,
            stats: SolverStats::default(),
        }
    }

    pub fn num_vars(&self) -> usize {
        self.assigns.len()
    }

    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    pub fn stats(&self) -> SolverStats {
        self.stats
    }

    pub fn set_max_conflicts(&mut self, max_conflicts: u64) {
        self.config.max_conflicts = max_conflicts;
    }

    /// Allocate a fresh variable
    pub fn new_var(&mut self) -> Var {
        let var = self.assigns.len() as Var;
        self.assigns.push(None);
        self.level.push(0);
        self.reason.push(None);
        self.activity.push(0.0);
        self.polarity.push(false);
        self.seen.push(false);
        self.watches.push(Vec::new());
        self.watches.push(Vec::new());
        self.order.grow(self.assigns.len());
        self.order.insert(var, &self.activity);
        var
    }

    fn value(&self, lit: Lit) -> Option<bool> {
        lit_value(&self.assigns, lit)
    }

    fn decision_level(&self) -> u32 {
        self.trail_lim.len() as u32
    }

    /// Add a clause. Returns false once the clause set is known to be
    /// unsatisfiable at the root.
    pub fn add_clause(&mut self, lits: &[Lit]) -> bool {
        self.cancel_until(0);
        if self.root_conflict {
            return false;
        }

        let mut clause = lits.to_vec();
        clause.sort_unstable();
        clause.dedup();
        // after dedup, two literals on one variable are complementary
        if clause.windows(2).any(|w| w[0].var() == w[1].var()) {
            return true;
        }
        if clause.iter().any(|&l| self.value(l) == Some(true)) {
            return true;
        }
        clause.retain(|&l| self.value(l).is_none());

        match clause.len() {
            0 => {
                self.root_conflict = true;
                false
            }
            1 => {
                self.enqueue(clause[0], None);
                if self.propagate().is_some() {
                    self.root_conflict = true;
                }
                !self.root_conflict
            }
            _ => {
                let idx = self.clauses.len();
                self.watches[clause[0].index()].push(idx);
                self.watches[clause[1].index()].push(idx);
                self.clauses.push(clause);
                true
            }
        }
    }

    fn enqueue(&mut self, lit: Lit, reason: Option<usize>) {
        let v = lit.var() as usize;
        self.assigns[v] = Some(lit.sign());
        self.level[v] = self.decision_level();
        self.reason[v] = reason;
        self.trail.push(lit);
    }

    fn new_decision_level(&mut self) {
        self.trail_lim.push(self.trail.len());
    }

    /// Unit propagation; returns a conflicting clause if one is found
    fn propagate(&mut self) -> Option<usize> {
        while self.qhead < self.trail.len() {
            let p = self.trail[self.qhead];
            self.qhead += 1;
            self.stats.propagations += 1;

            let false_lit = p.negated();
            let mut watchers = std::mem::take(&mut self.watches[false_lit.index()]);
            let mut conflict = None;
            let mut i = 0;
            while i < watchers.len() {
                let ci = watchers[i];
                let clause = &mut self.clauses[ci];
                if clause[0] == false_lit {
                    clause.swap(0, 1);
                }
                let first = clause[0];
                if lit_value(&self.assigns, first) == Some(true) {
                    i += 1;
                    continue;
                }

                let mut moved = false;
                for k in 2..clause.len() {
                    if lit_value(&self.assigns, clause[k]) != Some(false) {
                        clause.swap(1, k);
                        self.watches[clause[1].index()].push(ci);
                        moved = true;
                        break;
                    }
                }
                if moved {
                    watchers.swap_remove(i);
                    continue;
                }

                if lit_value(&self.assigns, first) == Some(false) {
                    conflict = Some(ci);
                    break;
                }
                self.enqueue(first, Some(ci));
                i += 1;
            }
            let slot = &mut self.watches[false_lit.index()];
            watchers.append(slot);
            *slot = watchers;

            if conflict.is_some() {
                self.qhead = self.trail.len();
                return conflict;
            }
        }
        None
    }

    fn bump_var(&mut self, var: Var) {
        let v = var as usize;
        self.activity[v] += self.var_inc;
        if self.activity[v] > 1e100 {
            for a in &mut self.activity {
                *a *= 1e-100;
            }
            self.var_inc *= 1e-100;
        }
        self.order.bump(var, &self.activity);
    }

    /// First-UIP conflict analysis. Returns the learned clause, asserting
    /// literal first, and the level to backjump to.
    fn analyze(&mut self, conflict: usize) -> (Vec<Lit>, u32) {
        let current = self.decision_level();
        let mut learnt = vec![Lit(0)];
        let mut pending = 0usize;
        let mut index = self.trail.len();
        let mut clause_idx = conflict;
        let mut skip_first = false;
        let uip = loop {
            let start = usize::from(skip_first);
            for j in start..self.clauses[clause_idx].len() {
                let q = self.clauses[clause_idx][j];
                let v = q.var() as usize;
                if !self.seen[v] && self.level[v] > 0 {
                    self.seen[v] = true;
                    self.bump_var(q.var());
                    if self.level[v] >= current {
                        pending += 1;
                    } else {
                        learnt.push(q);
                    }
                }
            }

            loop {
                index -= 1;
                if self.seen[self.trail[index].var() as usize] {
                    break;
                }
            }
            let p = self.trail[index];
            let v = p.var() as usize;
            self.seen[v] = false;
            pending -= 1;
            if pending == 0 {
                break p;
            }
            match self.reason[v] {
                Some(r) => {
                    clause_idx = r;
                    skip_first = true;
                }
                None => break p,
            }
        };
        learnt[0] = uip.negated();
        for lit in &learnt[1..] {
            self.seen[lit.var() as usize] = false;
        }

        let backjump = if learnt.len() == 1 {
            0
        } else {
            let mut max_i = 1;
            for i in 2..learnt.len() {
                if self.level[learnt[i].var() as usize] > self.level[learnt[max_i].var() as usize] {
                    max_i = i;
                }
            }
            learnt.swap(1, max_i);
            self.level[learnt[1].var() as usize]
        };
        (learnt, backjump)
    }

    /// Collect the assumptions responsible for `p` being false
    fn analyze_final(&mut self, p: Lit) -> Vec<Lit> {
        let mut core = vec![p];
        if self.decision_level() == 0 {
            return core;
        }
        let pv = p.var() as usize;
        self.seen[pv] = true;
        for i in (self.trail_lim[0]..self.trail.len()).rev() {
            let lit = self.trail[i];
            let v = lit.var() as usize;
            if !self.seen[v] {
                continue;
            }
            match self.reason[v] {
                None => {
                    if self.level[v] > 0 {
                        core.push(lit);
                    }
                }
                Some(r) => {
                    for j in 1..self.clauses[r].len() {
                        let q = self.clauses[r][j].var() as usize;
                        if self.level[q] > 0 {
                            self.seen[q] = true;
                        }
                    }
                }
            }
            self.seen[v] = false;
        }
        self.seen[pv] = false;
        core
    }

    fn learn(&mut self, learnt: Vec<Lit>) {
        self.stats.learned_clauses += 1;
        if learnt.len() == 1 {
            self.enqueue(learnt[0], None);
            return;
        }
        let idx = self.clauses.len();
        let asserting = learnt[0];
        self.watches[learnt[0].index()].push(idx);
        self.watches[learnt[1].index()].push(idx);
        self.clauses.push(learnt);
        self.enqueue(asserting, Some(idx));
    }

    fn cancel_until(&mut self, level: u32) {
        if self.decision_level() <= level {
            return;
        }
        let lim = self.trail_lim[level as usize];
        for i in (lim..self.trail.len()).rev() {
            let lit = self.trail[i];
            let v = lit.var() as usize;
            self.assigns[v] = None;
            self.reason[v] = None;
            self.polarity[v] = lit.sign();
            self.order.insert(lit.var(), &self.activity);
        }
        self.trail.truncate(lim);
        self.trail_lim.truncate(level as usize);
        self.qhead = lim;
    }

    fn pick_branch(&mut self) -> Option<Lit> {
        while let Some(var) = self.order.pop_max(&self.activity) {
            if self.assigns[var as usize].is_none() {
                return Some(Lit::new(var, self.polarity[var as usize]));
            }
        }
        None
    }

    pub fn solve(&mut self) -> SatResult {
        self.solve_with_assumptions(&[])
    }

    /// Solve with each assumption literal forced true.
    ///
    /// On `Unsat`, [`failed_assumptions`](Self::failed_assumptions) holds a
    /// subset of the assumptions that is already unsatisfiable.
    pub fn solve_with_assumptions(&mut self, assumptions: &[Lit]) -> SatResult {
        self.failed.clear();
        self.model.clear();
        self.cancel_until(0);
        if self.root_conflict || self.propagate().is_some() {
            self.root_conflict = true;
            return SatResult::Unsat;
        }

        let mut conflicts = 0u64;
        let mut since_restart = 0u64;
        let mut restart_limit = self.config.restart_interval.max(1) as f64;

        loop {
            if let Some(conflict) = self.propagate() {
                self.stats.conflicts += 1;
                conflicts += 1;
                since_restart += 1;
                if self.decision_level() == 0 {
                    self.root_conflict = true;
                    return SatResult::Unsat;
                }
                let (learnt, backjump) = self.analyze(conflict);
                self.cancel_until(backjump);
                self.learn(learnt);
                self.var_inc /= self.config.var_decay;

                if self.config.max_conflicts > 0 && conflicts >= self.config.max_conflicts {
                    self.cancel_until(0);
                    return SatResult::Unknown;
                }
                continue;
            }

            if since_restart as f64 >= restart_limit {
                since_restart = 0;
                restart_limit *= self.config.restart_multiplier.max(1.0);
                self.stats.restarts += 1;
                self.cancel_until(0);
                continue;
            }

            let level = self.decision_level() as usize;
            let next = if level < assumptions.len() {
                let assumption = assumptions[level];
                match self.value(assumption) {
                    Some(true) => {
                        self.new_decision_level();
                        continue;
                    }
                    Some(false) => {
                        self.failed = self.analyze_final(assumption);
                        self.cancel_until(0);
                        return SatResult::Unsat;
                    }
                    None => assumption,
                }
            } else {
                match self.pick_branch() {
                    Some(lit) => {
                        self.stats.decisions += 1;
                        lit
                    }
                    None => {
                        self.model = self.assigns.iter().map(|a| a.unwrap_or(false)).collect();
                        self.cancel_until(0);
                        return SatResult::Sat;
                    }
                }
            };
            self.new_decision_level();
            self.enqueue(next, None);
        }
    }

    /// Assumptions implicated in the last `Unsat` answer
    pub fn failed_assumptions(&self) -> &[Lit] {
        &self.failed
    }

    /// Value of `lit` in the model of the last `Sat` answer
    pub fn model_value(&self, lit: Lit) -> Option<bool> {
        self.model.get(lit.var() as usize).map(|&v| v == lit.sign())
    }

    /// Open a checkpoint
    pub fn push(&mut self) {
        self.cancel_until(0);
        self.checkpoints.push(Checkpoint {
            clauses: self.clauses.len(),
            vars: self.assigns.len(),
            trail: self.trail.len(),
            root_conflict: self.root_conflict,
        });
    }

    /// Discard every variable, clause and lemma added since the matching
    /// `push`
    pub fn pop(&mut self) {
        let Some(cp) = self.checkpoints.pop() else {
            return;
        };
        self.cancel_until(0);

        for lit in self.trail.drain(cp.trail..) {
            let v = lit.var() as usize;
            if v < cp.vars {
                self.assigns[v] = None;
                self.reason[v] = None;
            }
        }
        self.clauses.truncate(cp.clauses);
        self.assigns.truncate(cp.vars);
        self.level.truncate(cp.vars);
        self.reason.truncate(cp.vars);
        self.activity.truncate(cp.vars);
        self.polarity.truncate(cp.vars);
        self.seen.truncate(cp.vars);
        self.watches.truncate(2 * cp.vars);

        // clause literal order changed while propagating on the discarded
        // part of the trail, so watches are rebuilt and the root re-propagated
        for w in &mut self.watches {
            w.clear();
        }
        for (idx, clause) in self.clauses.iter().enumerate() {
            self.watches[clause[0].index()].push(idx);
            self.watches[clause[1].index()].push(idx);
        }
        self.qhead = 0;
        self.root_conflict = cp.root_conflict;

        self.order.clear();
        self.order.positions.truncate(cp.vars);
        for v in 0..cp.vars {
            if self.assigns[v].is_none() {
                self.order.insert(v as Var, &self.activity);
            }
        }
    }

    pub fn depth(&self) -> usize {
        self.checkpoints.len()
    }
}

impl Default for CdclSolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(solver: &mut CdclSolver, n: usize) -> Vec<Var> {
        (0..n).map(|_| solver.new_var()).collect()
    }

    /// `pigeons` pigeons into `holes` holes, one variable per placement
    fn pigeonhole(solver: &mut CdclSolver, pigeons: usize, holes: usize) {
        let p: Vec<Vec<Var>> = (0..pigeons).map(|_| vars(solver, holes)).collect();
        for row in &p {
            let clause: Vec<Lit> = row.iter().map(|&v| Lit::positive(v)).collect();
            solver.add_clause(&clause);
        }
        for h in 0..holes {
            for i in 0..pigeons {
                for j in (i + 1)..pigeons {
                    solver.add_clause(&[Lit::negative(p[i][h]), Lit::negative(p[j][h])]);
                }
            }
        }
    }

    #[test]
    fn test_literal_encoding() {
        let lit = Lit::positive(5);
        assert_eq!(lit.var(), 5);
        assert!(lit.sign());
        assert!(!lit.negated().sign());
        assert_eq!(lit.negated().negated(), lit);
        assert_eq!(Lit::negative(3).to_string(), "!x3");
    }

    #[test]
    fn test_simple_sat() {
        let mut solver = CdclSolver::new();
        let v = vars(&mut solver, 2);
        solver.add_clause(&[Lit::positive(v[0]), Lit::positive(v[1])]);
        solver.add_clause(&[Lit::negative(v[0]), Lit::positive(v[1])]);
        solver.add_clause(&[Lit::positive(v[0]), Lit::negative(v[1])]);

        assert_eq!(solver.solve(), SatResult::Sat);
        assert_eq!(solver.model_value(Lit::positive(v[0])), Some(true));
        assert_eq!(solver.model_value(Lit::positive(v[1])), Some(true));
    }

    #[test]
    fn test_simple_unsat() {
        let mut solver = CdclSolver::new();
        let v = solver.new_var();
        assert!(solver.add_clause(&[Lit::positive(v)]));
        assert!(!solver.add_clause(&[Lit::negative(v)]));
        assert_eq!(solver.solve(), SatResult::Unsat);
        assert!(solver.failed_assumptions().is_empty());
    }

    #[test]
    fn test_tautology_and_duplicates() {
        let mut solver = CdclSolver::new();
        let v = solver.new_var();
        assert!(solver.add_clause(&[Lit::positive(v), Lit::negative(v)]));
        assert_eq!(solver.num_clauses(), 0);
        assert!(solver.add_clause(&[Lit::positive(v), Lit::positive(v)]));
        assert_eq!(solver.solve(), SatResult::Sat);
        assert_eq!(solver.model_value(Lit::positive(v)), Some(true));
    }

    #[test]
    fn test_pigeonhole_needs_search() {
        let mut solver = CdclSolver::new();
        pigeonhole(&mut solver, 4, 3);
        assert_eq!(solver.solve(), SatResult::Unsat);
        assert!(solver.stats().conflicts > 0);

        let mut solver = CdclSolver::new();
        pigeonhole(&mut solver, 3, 3);
        assert_eq!(solver.solve(), SatResult::Sat);
    }

    #[test]
    fn test_conflict_budget() {
        let config = CdclConfig { max_conflicts: 1, ..CdclConfig::default() };
        let mut solver = CdclSolver::with_config(config);
        pigeonhole(&mut solver, 6, 5);
        assert_eq!(solver.solve(), SatResult::Unknown);
    }

    #[test]
    fn test_assumption_core() {
        let mut solver = CdclSolver::new();
        let v = vars(&mut solver, 5);
        let (s1, s2, s3, a, b) = (v[0], v[1], v[2], v[3], v[4]);
        // s1 -> a, s2 -> !a or b, s3 -> !b
        solver.add_clause(&[Lit::negative(s1), Lit::positive(a)]);
        solver.add_clause(&[Lit::negative(s2), Lit::negative(a), Lit::positive(b)]);
        solver.add_clause(&[Lit::negative(s3), Lit::negative(b)]);

        let assumptions = [Lit::positive(s1), Lit::positive(s2), Lit::positive(s3)];
        assert_eq!(solver.solve_with_assumptions(&assumptions), SatResult::Unsat);
        let mut core: Vec<Var> = solver.failed_assumptions().iter().map(|l| l.var()).collect();
        core.sort();
        assert_eq!(core, vec![s1, s2, s3]);

        // dropping any one selector restores satisfiability
        assert_eq!(solver.solve_with_assumptions(&assumptions[..2]), SatResult::Sat);
        assert_eq!(solver.solve_with_assumptions(&assumptions[1..]), SatResult::Sat);
    }

    #[test]
    fn test_core_excludes_irrelevant_assumptions() {
        let mut solver = CdclSolver::new();
        let v = vars(&mut solver, 4);
        let (s1, s2, s3, a) = (v[0], v[1], v[2], v[3]);
        solver.add_clause(&[Lit::negative(s1), Lit::positive(a)]);
        solver.add_clause(&[Lit::negative(s3), Lit::negative(a)]);

        let assumptions = [Lit::positive(s1), Lit::positive(s2), Lit::positive(s3)];
        assert_eq!(solver.solve_with_assumptions(&assumptions), SatResult::Unsat);
        let core: Vec<Var> = solver.failed_assumptions().iter().map(|l| l.var()).collect();
        assert!(!core.contains(&s2));
        assert!(core.contains(&s1) && core.contains(&s3));
    }

    #[test]
    fn test_push_pop_discards_clauses() {
        let mut solver = CdclSolver::new();
        let a = solver.new_var();
        let b = solver.new_var();
        solver.add_clause(&[Lit::positive(a), Lit::positive(b)]);

        solver.push();
        let c = solver.new_var();
        solver.add_clause(&[Lit::negative(a)]);
        solver.add_clause(&[Lit::negative(b), Lit::positive(c)]);
        solver.add_clause(&[Lit::negative(c)]);
        assert_eq!(solver.solve(), SatResult::Unsat);
        assert_eq!(solver.depth(), 1);
        solver.pop();

        assert_eq!(solver.depth(), 0);
        assert_eq!(solver.num_vars(), 2);
        assert_eq!(solver.num_clauses(), 1);
        assert_eq!(solver.solve(), SatResult::Sat);

        // the pre-checkpoint facts survive
        solver.push();
        solver.add_clause(&[Lit::negative(a)]);
        solver.add_clause(&[Lit::negative(b)]);
        assert_eq!(solver.solve(), SatResult::Unsat);
        solver.pop();
        assert_eq!(solver.solve(), SatResult::Sat);
    }

    #[test]
    fn test_pop_restores_root_units() {
        let mut solver = CdclSolver::new();
        let a = solver.new_var();
        let b = solver.new_var();
        solver.add_clause(&[Lit::positive(a)]);
        solver.add_clause(&[Lit::negative(a), Lit::positive(b)]);
        solver.push();
        solver.add_clause(&[Lit::negative(b)]);
        assert_eq!(solver.solve(), SatResult::Unsat);
        solver.pop();
        assert_eq!(solver.solve(), SatResult::Sat);
        assert_eq!(solver.model_value(Lit::positive(b)), Some(true));
    }
}
