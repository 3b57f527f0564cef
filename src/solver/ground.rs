//! Grounding of quantified expressions into clauses
//!
//! Formulas are interpreted over the integers. Quantifiers are expanded
//! over a finite set of representatives: every declared object, every free
//! name and integer literal mentioned by the formulas, and a few anonymous
//! witness elements standing for integers nobody named.
//!
//! Distinct names denote distinct integers, except where a formula states
//! `a = b` at its top level. A name may denote the same integer as a
//! literal. Each name and witness carries a position against the sorted
//! literals (`e < v` and `e <= v` for every literal `v`), so comparisons
//! with literals follow integer order, including the number of integers
//! that fit strictly between two literals. Order between two names or
//! witnesses uses one variable per pair, kept transitive and consistent
//! with those positions.

use fnv::{FnvBuildHasher, FnvHashMap};
use indexmap::{IndexMap, IndexSet};

use crate::error::{CoreError, CoreResult};
use crate::fol::CompareOp;
use crate::logic::{Expr, ExprTerm, RelationId};

use super::sat::{CdclSolver, Lit, Var};

/// Index of a domain element
pub type ElemId = u32;

/// A domain element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Element {
    Named(String),
    Int(i64),
    /// Anonymous element, not denoted by any name or literal
    Witness(usize),
}

/// The finite set of representatives formulas are grounded over
#[derive(Debug, Clone, Default)]
pub struct Domain {
    elements: Vec<Element>,
    names: FnvHashMap<String, ElemId>,
    ints: FnvHashMap<i64, ElemId>,
    /// Integer elements by ascending value
    literals: Vec<ElemId>,
}

impl Domain {
    pub fn builder() -> DomainBuilder {
        DomainBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn lookup_name(&self, name: &str) -> Option<ElemId> {
        self.names.get(name).copied()
    }

    pub fn lookup_int(&self, value: i64) -> Option<ElemId> {
        self.ints.get(&value).copied()
    }

    pub fn int_value(&self, id: ElemId) -> Option<i64> {
        match self.elements.get(id as usize) {
            Some(Element::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Whether two names denote the same element
    pub fn same_element(&self, a: &str, b: &str) -> bool {
        matches!((self.lookup_name(a), self.lookup_name(b)), (Some(x), Some(y)) if x == y)
    }

    pub fn is_named(&self, id: ElemId) -> bool {
        matches!(self.elements.get(id as usize), Some(Element::Named(_)))
    }

    /// Names and witnesses: elements whose integer value is open
    pub fn open_elements(&self) -> impl Iterator<Item = ElemId> + '_ {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, e)| !matches!(e, Element::Int(_)))
            .map(|(id, _)| id as ElemId)
    }

    pub fn literal_count(&self) -> usize {
        self.literals.len()
    }

    /// The literal element of the given rank, smallest first
    pub fn literal_at(&self, rank: usize) -> Option<ElemId> {
        self.literals.get(rank).copied()
    }

    /// Rank of an integer element among the literals
    pub fn literal_rank(&self, id: ElemId) -> Option<usize> {
        // literal ids are allocated in ascending value order
        self.literals.binary_search(&id).ok()
    }
}

/// Collects names, literals and explicit equations, then merges equated
/// names into shared elements.
#[derive(Debug, Clone, Default)]
pub struct DomainBuilder {
    names: IndexSet<String>,
    ints: IndexSet<i64>,
    equalities: Vec<(ExprTerm, ExprTerm)>,
    witnesses: usize,
}

impl DomainBuilder {
    pub fn name(&mut self, name: &str) -> &mut Self {
        self.names.insert(name.to_string());
        self
    }

    pub fn int(&mut self, value: i64) -> &mut Self {
        self.ints.insert(value);
        self
    }

    /// Add every free symbol and integer literal of `expr`
    pub fn expr(&mut self, expr: &Expr) -> &mut Self {
        self.names.extend(expr.free_symbols());
        expr.int_literals(&mut self.ints);
        self
    }

    /// Honour the top-level equations of `expr` between names
    pub fn equalities_of(&mut self, expr: &Expr) -> &mut Self {
        self.equalities.extend(expr.explicit_equalities());
        self
    }

    pub fn witnesses(&mut self, count: usize) -> &mut Self {
        self.witnesses = count;
        self
    }

    pub fn build(&self) -> Domain {
        let mut parent: Vec<usize> = (0..self.names.len()).collect();

        fn find(parent: &mut [usize], mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }

        // a name equated with a literal keeps its own element; the ladder
        // encoding places it at the literal
        for (l, r) in &self.equalities {
            let (ExprTerm::Sym(l), ExprTerm::Sym(r)) = (l, r) else {
                continue;
            };
            let (Some(a), Some(b)) = (self.names.get_index_of(l), self.names.get_index_of(r)) else {
                continue;
            };
            let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
            if ra != rb {
                parent[ra.max(rb)] = ra.min(rb);
            }
        }

        let mut domain = Domain::default();
        let mut element_of_root: FnvHashMap<usize, ElemId> = FnvHashMap::default();
        for (node, name) in self.names.iter().enumerate() {
            let root = find(&mut parent, node);
            let id = match element_of_root.get(&root) {
                Some(&id) => id,
                None => {
                    let id = domain.elements.len() as ElemId;
                    domain.elements.push(Element::Named(self.names[root].clone()));
                    element_of_root.insert(root, id);
                    id
                }
            };
            domain.names.insert(name.clone(), id);
        }

        let mut values: Vec<i64> = self.ints.iter().copied().collect();
        values.sort_unstable();
        for value in values {
            let id = domain.elements.len() as ElemId;
            domain.elements.push(Element::Int(value));
            domain.ints.insert(value, id);
            domain.literals.push(id);
        }

        for i in 0..self.witnesses {
            domain.elements.push(Element::Witness(i));
        }
        domain
    }
}

/// Truth value of a grounded subformula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Const(bool),
    Lit(Lit),
}

impl Node {
    pub fn negated(self) -> Node {
        match self {
            Node::Const(b) => Node::Const(!b),
            Node::Lit(l) => Node::Lit(l.negated()),
        }
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct AtomKey {
    relation: RelationId,
    args: Vec<ElemId>,
}

/// Position of an open element against the sorted literals
#[derive(Debug, Clone)]
struct Ladder {
    /// `e < v` per literal rank
    below: Vec<Var>,
    /// `e <= v` per literal rank
    upto: Vec<Var>,
    /// `e = v` per literal rank; empty for witnesses
    equal: Vec<Var>,
}

#[derive(Debug, Clone)]
pub(crate) struct GrounderMark {
    atoms: usize,
    ladders_ready: bool,
    order_ready: bool,
    clauses: usize,
}

/// Turns expressions into clauses on a [`CdclSolver`], caching ground atoms
#[derive(Debug, Clone)]
pub(crate) struct Grounder {
    atoms: IndexMap<AtomKey, Var, FnvBuildHasher>,
    ladders: Option<FnvHashMap<ElemId, Ladder>>,
    order: Option<FnvHashMap<(ElemId, ElemId), Var>>,
    clauses: usize,
    max_clauses: usize,
}

type Env<'e> = Vec<(&'e str, ElemId)>;

impl Grounder {
    pub(crate) fn new(max_clauses: usize) -> Self {
        Grounder {
            atoms: IndexMap::default(),
            ladders: None,
            order: None,
            clauses: 0,
            max_clauses,
        }
    }

    pub(crate) fn mark(&self) -> GrounderMark {
        GrounderMark {
            atoms: self.atoms.len(),
            ladders_ready: self.ladders.is_some(),
            order_ready: self.order.is_some(),
            clauses: self.clauses,
        }
    }

    pub(crate) fn restore(&mut self, mark: GrounderMark) {
        self.atoms.truncate(mark.atoms);
        if !mark.ladders_ready {
            self.ladders = None;
        }
        if !mark.order_ready {
            self.order = None;
        }
        self.clauses = mark.clauses;
    }

    pub(crate) fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub(crate) fn clause_count(&self) -> usize {
        self.clauses
    }

    pub(crate) fn add_clause(&mut self, sat: &mut CdclSolver, lits: &[Lit]) -> CoreResult<()> {
        self.clauses += 1;
        if self.max_clauses > 0 && self.clauses > self.max_clauses {
            return Err(CoreError::solver(format!(
                "grounding exceeded the limit of {} clauses",
                self.max_clauses
            )));
        }
        sat.add_clause(lits);
        Ok(())
    }

    /// Ground a closed expression
    pub(crate) fn ground(&mut self, sat: &mut CdclSolver, domain: &Domain, expr: &Expr) -> CoreResult<Node> {
        if self.ladders.is_none() && domain.literal_count() > 0 {
            self.build_ladders(sat, domain)?;
        }
        let mut env = Env::new();
        self.encode(sat, domain, expr, &mut env)
    }

    fn element(&self, domain: &Domain, env: &Env<'_>, term: &ExprTerm) -> CoreResult<ElemId> {
        match term {
            ExprTerm::Sym(name) => env
                .iter()
                .rev()
                .find(|(bound, _)| bound == name)
                .map(|(_, id)| *id)
                .or_else(|| domain.lookup_name(name))
                .ok_or_else(|| CoreError::solver(format!("symbol {} is outside the grounding domain", name))),
            ExprTerm::Int(v) => domain
                .lookup_int(*v)
                .ok_or_else(|| CoreError::solver(format!("integer {} is outside the grounding domain", v))),
        }
    }

    fn encode<'e>(
        &mut self,
        sat: &mut CdclSolver,
        domain: &Domain,
        expr: &'e Expr,
        env: &mut Env<'e>,
    ) -> CoreResult<Node> {
        match expr {
            Expr::Const(b) => Ok(Node::Const(*b)),
            Expr::App(rel, args) => {
                let args = args
                    .iter()
                    .map(|t| self.element(domain, env, t))
                    .collect::<CoreResult<Vec<_>>>()?;
                let var = self.atom(sat, domain, rel.id(), args)?;
                Ok(Node::Lit(Lit::positive(var)))
            }
            Expr::Cmp(op, l, r) => {
                let a = self.element(domain, env, l)?;
                let b = self.element(domain, env, r)?;
                match op {
                    CompareOp::Eq => self.equal(domain, a, b),
                    CompareOp::Ne => Ok(self.equal(domain, a, b)?.negated()),
                    CompareOp::Lt => self.less(sat, domain, a, b),
                    CompareOp::Gt => self.less(sat, domain, b, a),
                    CompareOp::Le => self.less_eq(sat, domain, a, b),
                    CompareOp::Ge => self.less_eq(sat, domain, b, a),
                }
            }
            Expr::Not(inner) => Ok(self.encode(sat, domain, inner, env)?.negated()),
            Expr::And(items) => {
                let mut nodes = Vec::with_capacity(items.len());
                for item in items {
                    let node = self.encode(sat, domain, item, env)?;
                    if node == Node::Const(false) {
                        return Ok(node);
                    }
                    nodes.push(node);
                }
                self.conjoin(sat, nodes)
            }
            Expr::Or(items) => {
                let mut nodes = Vec::with_capacity(items.len());
                for item in items {
                    let node = self.encode(sat, domain, item, env)?;
                    if node == Node::Const(true) {
                        return Ok(node);
                    }
                    nodes.push(node);
                }
                self.disjoin(sat, nodes)
            }
            Expr::Implies(l, r) => {
                let premise = self.encode(sat, domain, l, env)?;
                if premise == Node::Const(false) {
                    return Ok(Node::Const(true));
                }
                let conclusion = self.encode(sat, domain, r, env)?;
                self.disjoin(sat, vec![premise.negated(), conclusion])
            }
            Expr::Iff(l, r) => {
                let a = self.encode(sat, domain, l, env)?;
                let b = self.encode(sat, domain, r, env)?;
                self.equiv(sat, a, b)
            }
            Expr::ForAll(vars, body) => self.quantify(sat, domain, vars, body, env, true),
            Expr::Exists(vars, body) => self.quantify(sat, domain, vars, body, env, false),
        }
    }

    /// Variable of a ground atom. A new atom with a named argument is tied
    /// to the atom with that argument replaced by each literal, under the
    /// condition that the name denotes the literal.
    fn atom(&mut self, sat: &mut CdclSolver, domain: &Domain, relation: RelationId, args: Vec<ElemId>) -> CoreResult<Var> {
        let key = AtomKey { relation, args };
        if let Some(&var) = self.atoms.get(&key) {
            return Ok(var);
        }
        let var = sat.new_var();
        let args = key.args.clone();
        self.atoms.insert(key, var);

        if self.ladders.is_none() {
            return Ok(var);
        }
        let this = Lit::positive(var);
        for (pos, &arg) in args.iter().enumerate() {
            if !domain.is_named(arg) {
                continue;
            }
            for rank in 0..domain.literal_count() {
                let same = Lit::positive(self.ladder(arg)?.equal[rank]);
                let mut swapped = args.clone();
                swapped[pos] = domain
                    .literal_at(rank)
                    .ok_or_else(|| CoreError::solver(format!("no literal of rank {}", rank)))?;
                let other = Lit::positive(self.atom(sat, domain, relation, swapped)?);
                self.add_clause(sat, &[same.negated(), this.negated(), other])?;
                self.add_clause(sat, &[same.negated(), this, other.negated()])?;
            }
        }
        Ok(var)
    }

    fn quantify<'e>(
        &mut self,
        sat: &mut CdclSolver,
        domain: &Domain,
        vars: &'e [String],
        body: &'e Expr,
        env: &mut Env<'e>,
        universal: bool,
    ) -> CoreResult<Node> {
        if vars.is_empty() {
            return self.encode(sat, domain, body, env);
        }
        let size = domain.len();
        if size == 0 {
            return Ok(Node::Const(universal));
        }
        let instances = (size as u128).checked_pow(vars.len() as u32).unwrap_or(u128::MAX);
        if self.max_clauses > 0 && instances > self.max_clauses as u128 {
            return Err(CoreError::solver(format!(
                "quantifier over {} variable(s) needs {} instances on a domain of {}",
                vars.len(),
                instances,
                size
            )));
        }

        let mark = env.len();
        env.extend(vars.iter().map(|v| (v.as_str(), 0)));
        let mut counters = vec![0usize; vars.len()];
        let mut nodes = Vec::new();
        let result = loop {
            for (i, &c) in counters.iter().enumerate() {
                env[mark + i].1 = c as ElemId;
            }
            match self.encode(sat, domain, body, env)? {
                // a false instance decides a universal, a true one an existential
                Node::Const(b) if b != universal => break Node::Const(b),
                Node::Const(_) => {}
                node => nodes.push(node),
            }

            let mut i = vars.len();
            let exhausted = loop {
                if i == 0 {
                    break true;
                }
                i -= 1;
                counters[i] += 1;
                if counters[i] < size {
                    break false;
                }
                counters[i] = 0;
            };
            if exhausted {
                break if universal {
                    self.conjoin(sat, std::mem::take(&mut nodes))?
                } else {
                    self.disjoin(sat, std::mem::take(&mut nodes))?
                };
            }
        };
        env.truncate(mark);
        Ok(result)
    }

    /// Literals of `nodes`, or the constant the combination collapses to
    fn collect_lits(nodes: Vec<Node>, absorbing: bool) -> Result<Vec<Lit>, bool> {
        let mut lits = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Const(b) if b == absorbing => return Err(absorbing),
                Node::Const(_) => {}
                Node::Lit(l) => lits.push(l),
            }
        }
        lits.sort_unstable();
        lits.dedup();
        if lits.windows(2).any(|w| w[0].var() == w[1].var()) {
            return Err(absorbing);
        }
        Ok(lits)
    }

    fn conjoin(&mut self, sat: &mut CdclSolver, nodes: Vec<Node>) -> CoreResult<Node> {
        let lits = match Self::collect_lits(nodes, false) {
            Ok(lits) => lits,
            Err(b) => return Ok(Node::Const(b)),
        };
        match lits.len() {
            0 => Ok(Node::Const(true)),
            1 => Ok(Node::Lit(lits[0])),
            _ => {
                let out = Lit::positive(sat.new_var());
                for &l in &lits {
                    self.add_clause(sat, &[out.negated(), l])?;
                }
                let mut big: Vec<Lit> = lits.iter().map(|l| l.negated()).collect();
                big.push(out);
                self.add_clause(sat, &big)?;
                Ok(Node::Lit(out))
            }
        }
    }

    fn disjoin(&mut self, sat: &mut CdclSolver, nodes: Vec<Node>) -> CoreResult<Node> {
        let lits = match Self::collect_lits(nodes, true) {
            Ok(lits) => lits,
            Err(b) => return Ok(Node::Const(b)),
        };
        match lits.len() {
            0 => Ok(Node::Const(false)),
            1 => Ok(Node::Lit(lits[0])),
            _ => {
                let out = Lit::positive(sat.new_var());
                for &l in &lits {
                    self.add_clause(sat, &[out, l.negated()])?;
                }
                let mut big = lits;
                big.push(out.negated());
                self.add_clause(sat, &big)?;
                Ok(Node::Lit(out))
            }
        }
    }

    fn equiv(&mut self, sat: &mut CdclSolver, a: Node, b: Node) -> CoreResult<Node> {
        match (a, b) {
            (Node::Const(x), other) | (other, Node::Const(x)) => Ok(if x { other } else { other.negated() }),
            (Node::Lit(a), Node::Lit(b)) if a == b => Ok(Node::Const(true)),
            (Node::Lit(a), Node::Lit(b)) if a == b.negated() => Ok(Node::Const(false)),
            (Node::Lit(a), Node::Lit(b)) => {
                let out = Lit::positive(sat.new_var());
                let n = out.negated();
                self.add_clause(sat, &[n, a.negated(), b])?;
                self.add_clause(sat, &[n, a, b.negated()])?;
                self.add_clause(sat, &[out, a, b])?;
                self.add_clause(sat, &[out, a.negated(), b.negated()])?;
                Ok(Node::Lit(out))
            }
        }
    }

    /// At most `k` of `lits` hold (sequential counter)
    fn at_most(&mut self, sat: &mut CdclSolver, lits: &[Lit], k: usize) -> CoreResult<()> {
        if lits.len() <= k {
            return Ok(());
        }
        if k == 0 {
            for &l in lits {
                self.add_clause(sat, &[l.negated()])?;
            }
            return Ok(());
        }
        // count[j]: more than j of the literals seen so far hold
        let last = lits.len() - 1;
        let mut count: Vec<Lit> = Vec::new();
        for (i, &x) in lits.iter().enumerate() {
            if i > 0 {
                self.add_clause(sat, &[x.negated(), count[k - 1].negated()])?;
            }
            if i == last {
                break;
            }
            let next: Vec<Lit> = (0..k).map(|_| Lit::positive(sat.new_var())).collect();
            self.add_clause(sat, &[x.negated(), next[0]])?;
            if i == 0 {
                for s in &next[1..] {
                    self.add_clause(sat, &[s.negated()])?;
                }
            } else {
                for j in 0..k {
                    self.add_clause(sat, &[count[j].negated(), next[j]])?;
                    if j > 0 {
                        self.add_clause(sat, &[x.negated(), count[j - 1].negated(), next[j]])?;
                    }
                }
            }
            count = next;
        }
        Ok(())
    }

    fn ladder(&self, id: ElemId) -> CoreResult<&Ladder> {
        self.ladders
            .as_ref()
            .and_then(|ladders| ladders.get(&id))
            .ok_or_else(|| CoreError::solver(format!("element {} has no position among the literals", id)))
    }

    /// Positions of every open element against the sorted literals
    fn build_ladders(&mut self, sat: &mut CdclSolver, domain: &Domain) -> CoreResult<()> {
        let values: Vec<i64> = (0..domain.literal_count())
            .filter_map(|rank| domain.literal_at(rank).and_then(|id| domain.int_value(id)))
            .collect();
        let m = values.len();
        let open: Vec<ElemId> = domain.open_elements().collect();

        let mut ladders = FnvHashMap::default();
        for &e in &open {
            let named = domain.is_named(e);
            let ladder = Ladder {
                below: (0..m).map(|_| sat.new_var()).collect(),
                upto: (0..m).map(|_| sat.new_var()).collect(),
                equal: if named { (0..m).map(|_| sat.new_var()).collect() } else { Vec::new() },
            };

            for i in 0..m {
                let lt = Lit::positive(ladder.below[i]);
                let le = Lit::positive(ladder.upto[i]);
                self.add_clause(sat, &[lt.negated(), le])?;
                if i + 1 < m {
                    let next = Lit::positive(ladder.below[i + 1]);
                    self.add_clause(sat, &[le.negated(), next])?;
                    // no integer strictly between consecutive values
                    if values[i].checked_add(1) == Some(values[i + 1]) {
                        self.add_clause(sat, &[next.negated(), le])?;
                    }
                }
                if named {
                    let eq = Lit::positive(ladder.equal[i]);
                    self.add_clause(sat, &[eq.negated(), le])?;
                    self.add_clause(sat, &[eq.negated(), lt.negated()])?;
                    self.add_clause(sat, &[eq, le.negated(), lt])?;
                } else {
                    self.add_clause(sat, &[le.negated(), lt])?;
                }
            }
            ladders.insert(e, ladder);
        }

        // distinct names never share a literal
        for i in 0..m {
            let at_value: Vec<Lit> = open
                .iter()
                .filter_map(|e| ladders.get(e).and_then(|l| l.equal.get(i)))
                .map(|&v| Lit::positive(v))
                .collect();
            self.at_most(sat, &at_value, 1)?;
        }

        // only so many integers fit strictly between two literals
        for i in 1..m {
            let room = values[i] as i128 - values[i - 1] as i128 - 1;
            let room = usize::try_from(room).unwrap_or(usize::MAX);
            if room == 0 || room >= open.len() {
                continue;
            }
            let mut inside = Vec::with_capacity(open.len());
            for e in &open {
                let Some(ladder) = ladders.get(e) else { continue };
                let flag = Lit::positive(sat.new_var());
                let above_prev = Lit::positive(ladder.upto[i - 1]);
                let below_next = Lit::positive(ladder.below[i]);
                self.add_clause(sat, &[above_prev, below_next.negated(), flag])?;
                inside.push(flag);
            }
            self.at_most(sat, &inside, room)?;
        }

        self.ladders = Some(ladders);
        Ok(())
    }

    /// `a = b`
    fn equal(&self, domain: &Domain, a: ElemId, b: ElemId) -> CoreResult<Node> {
        if a == b {
            return Ok(Node::Const(true));
        }
        let (open, rank) = match (domain.literal_rank(a), domain.literal_rank(b)) {
            (None, Some(rank)) => (a, rank),
            (Some(rank), None) => (b, rank),
            // distinct literals, or distinct names and witnesses
            _ => return Ok(Node::Const(false)),
        };
        Ok(match self.ladder(open)?.equal.get(rank) {
            Some(&var) => Node::Lit(Lit::positive(var)),
            None => Node::Const(false),
        })
    }

    /// `a < b`
    fn less(&mut self, sat: &mut CdclSolver, domain: &Domain, a: ElemId, b: ElemId) -> CoreResult<Node> {
        if a == b {
            return Ok(Node::Const(false));
        }
        match (domain.literal_rank(a), domain.literal_rank(b)) {
            (Some(_), Some(_)) => Ok(Node::Const(domain.int_value(a) < domain.int_value(b))),
            (None, Some(rank)) => Ok(Node::Lit(Lit::positive(self.ladder(a)?.below[rank]))),
            (Some(rank), None) => Ok(Node::Lit(Lit::negative(self.ladder(b)?.upto[rank]))),
            (None, None) => {
                if self.order.is_none() {
                    self.build_order(sat, domain)?;
                }
                Ok(self.order_node(a, b))
            }
        }
    }

    /// `a <= b`
    fn less_eq(&mut self, sat: &mut CdclSolver, domain: &Domain, a: ElemId, b: ElemId) -> CoreResult<Node> {
        if a == b {
            return Ok(Node::Const(true));
        }
        match (domain.literal_rank(a), domain.literal_rank(b)) {
            (Some(_), Some(_)) => Ok(Node::Const(domain.int_value(a) <= domain.int_value(b))),
            (None, Some(rank)) => Ok(Node::Lit(Lit::positive(self.ladder(a)?.upto[rank]))),
            (Some(rank), None) => Ok(Node::Lit(Lit::negative(self.ladder(b)?.below[rank]))),
            // distinct open elements are never equal
            (None, None) => self.less(sat, domain, a, b),
        }
    }

    /// `a < b` between two open elements, once the order exists
    fn order_node(&self, a: ElemId, b: ElemId) -> Node {
        if a == b {
            return Node::Const(false);
        }
        let (lo, hi, forward) = if a < b { (a, b, true) } else { (b, a, false) };
        match self.order.as_ref().and_then(|m| m.get(&(lo, hi))) {
            Some(&var) => Node::Lit(Lit::new(var, forward)),
            None => Node::Const(false),
        }
    }

    /// One variable per pair of open elements, clauses forbidding both
    /// orientations of every 3-cycle, and agreement with the ladders
    fn build_order(&mut self, sat: &mut CdclSolver, domain: &Domain) -> CoreResult<()> {
        let open: Vec<ElemId> = domain.open_elements().collect();
        let mut pairs = FnvHashMap::default();
        for (x, &i) in open.iter().enumerate() {
            for &j in &open[x + 1..] {
                pairs.insert((i, j), sat.new_var());
            }
        }
        self.order = Some(pairs);

        for (x, &i) in open.iter().enumerate() {
            for (y, &j) in open.iter().enumerate().skip(x + 1) {
                for &k in &open[y + 1..] {
                    let ij = self.order_node(i, j);
                    let jk = self.order_node(j, k);
                    let ik = self.order_node(i, k);
                    for nodes in [[ij.negated(), jk.negated(), ik], [ij, jk, ik.negated()]] {
                        if let Ok(lits) = Self::collect_lits(nodes.to_vec(), true) {
                            self.add_clause(sat, &lits)?;
                        }
                    }
                }
            }
        }

        // e < f and f <= v give e < v, in both orientations
        let mut linking = Vec::new();
        if let Some(ladders) = &self.ladders {
            for (x, &e) in open.iter().enumerate() {
                for &f in &open[x + 1..] {
                    let (Some(at_e), Some(at_f), Node::Lit(ef)) =
                        (ladders.get(&e), ladders.get(&f), self.order_node(e, f))
                    else {
                        continue;
                    };
                    for rank in 0..domain.literal_count() {
                        linking.push([ef.negated(), Lit::negative(at_f.upto[rank]), Lit::positive(at_e.below[rank])]);
                        linking.push([ef, Lit::negative(at_e.upto[rank]), Lit::positive(at_f.below[rank])]);
                    }
                }
            }
        }
        for clause in linking {
            self.add_clause(sat, &clause)?;
        }
        Ok(())
    }
}
