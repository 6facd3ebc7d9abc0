//! Constraint graph construction and the fixed-point solver.
//!
//! [`ConstraintGraph::build`] turns a [`Program`] into a graph of variable
//! and operation nodes: branch conditions become conditional value ranges,
//! every statement becomes one operation, and constants and values defined
//! outside the program are seeded.
//!
//! [`ConstraintGraph::find_intervals`] then solves the graph one strongly
//! connected component at a time, in topological order. A component with a
//! single variable is evaluated once. Larger components go through a bounded
//! fixed pass, widening (jump-set widening, or growth for the crop-DFS
//! strategy), resolution of symbolic intersects and narrowing (or crop).
//!
//! ```
//! use range_analysis::config::SolverConfig;
//! use range_analysis::graph::ConstraintGraph;
//! use range_analysis::interval::Interval;
//! use range_analysis::ir::{BinaryOpcode, Expr, Program, StmtKind, Type};
//! use range_analysis::range::Range;
//!
//! let mut p = Program::new();
//! let bb = p.add_block();
//! let ty = Type::int(8, false);
//! let x = p.add_value("x", ty);
//! let y = p.add_value("y", ty);
//! let mask = p.add_int_constant(ty, 15);
//! let expr = Expr::Binary { opcode: BinaryOpcode::BitAnd, lhs: x, rhs: mask };
//! p.add_stmt(bb, StmtKind::Assign { dst: y, expr });
//!
//! let mut graph = ConstraintGraph::build(&p, SolverConfig::default());
//! graph.find_intervals();
//! assert_eq!(graph.range_of(y), Some(&Interval::Int(Range::regular(8, 0, 15))));
//! ```

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use log::{debug, warn};

use crate::apint::{APInt, MAX_BIT_INT};
use crate::config::{MeetStrategy, SolverConfig};
use crate::container::NodeContainer;
use crate::interval::Interval;
use crate::ir::{BinaryOpcode, Expr, Program, Stmt, StmtKind, UnaryOpcode};
use crate::meet::Meet;
use crate::op_node::OpKind;
use crate::predicate::Predicate;
use crate::range::Range;
use crate::scc::{self, PseudoEdges};
use crate::types::{BlockId, OpId, ValueId, VarId};
use crate::value_range::{ConditionalValueRange, SymbRange, ValueRange};

/// Operations of a component, keyed by the component variable they read.
type UseMap = HashMap<VarId, BTreeSet<OpId>>;

pub struct ConstraintGraph<'p> {
    program: &'p Program,
    config: SolverConfig,
    nodes: NodeContainer,
    dead_blocks: BTreeSet<BlockId>,
}

impl<'p> ConstraintGraph<'p> {
    pub fn build(program: &'p Program, config: SolverConfig) -> Self {
        let mut graph = Self {
            program,
            config,
            nodes: NodeContainer::new(),
            dead_blocks: BTreeSet::new(),
        };

        for stmt in program.stmts() {
            graph.build_cvr(stmt);
        }

        for block in program.blocks() {
            let (phis, others): (Vec<&Stmt>, Vec<&Stmt>) =
                program.block_stmts(block).partition(|s| s.kind.is_phi());
            for stmt in phis.into_iter().chain(others) {
                graph.nodes.add_operation(stmt, program, &graph.config.ranges);
            }
        }

        let ids: Vec<VarId> = graph.nodes.var_ids().collect();
        for id in ids {
            let outside = graph.nodes.def(id).is_none();
            graph.nodes.var_mut(id).init(program, outside);
        }

        debug!(
            "Built constraint graph: {} variables, {} operations, {} conditional ranges",
            graph.nodes.var_nodes().len(),
            graph.nodes.ops().len(),
            graph.nodes.cvrs().len()
        );
        graph
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn nodes(&self) -> &NodeContainer {
        &self.nodes
    }

    /// Current range of `value`, if it takes part in the graph.
    pub fn range_of(&self, value: ValueId) -> Option<&Interval> {
        self.nodes.var_id(value).map(|id| self.nodes.var(id).range())
    }

    /// Successors that a branch on constants never takes.
    pub fn dead_blocks(&self) -> &BTreeSet<BlockId> {
        &self.dead_blocks
    }

    /// Edges from the bound of every symbolic intersect to the sink it
    /// constrains.
    pub fn control_dependences(&self) -> PseudoEdges {
        let mut edges = PseudoEdges::new();
        for op in self.nodes.ops() {
            if let Some(bound) = self.symbolic_bound(op.symbolic_intersect()) {
                edges.entry(bound).or_default().insert(op.sink());
            }
        }
        edges
    }

    fn symbolic_bound(&self, symb: Option<&SymbRange>) -> Option<VarId> {
        symb.and_then(|s| self.nodes.var_id(s.bound()))
    }

    fn build_cvr(&mut self, stmt: &Stmt) {
        let StmtKind::Branch {
            pred,
            lhs,
            rhs,
            true_bb,
            false_bb,
        } = stmt.kind
        else {
            return;
        };
        let p = self.program;
        if true_bb == false_bb {
            return;
        }
        match (p.is_constant(lhs), p.is_constant(rhs)) {
            (true, true) => self.evaluate_branch(stmt, pred, lhs, rhs, true_bb, false_bb),
            (false, true) => self.constant_cvr(stmt, lhs, rhs, pred, true_bb, false_bb),
            (true, false) => self.constant_cvr(stmt, rhs, lhs, pred.swapped(), true_bb, false_bb),
            (false, false) => self.symbolic_cvr(stmt, lhs, rhs, pred, true_bb, false_bb),
        }
    }

    fn evaluate_branch(
        &mut self,
        stmt: &Stmt,
        pred: Predicate,
        lhs: ValueId,
        rhs: ValueId,
        true_bb: BlockId,
        false_bb: BlockId,
    ) {
        let p = self.program;
        let (Some(a), Some(b)) = (p.int_constant(lhs), p.int_constant(rhs)) else {
            warn!("{}: branch on real constants is not evaluated", stmt.id);
            return;
        };
        let signed = p.is_signed(lhs);
        let pred = if signed { pred } else { pred.to_unsigned() };
        let widen = |c: &APInt| {
            let c = c.ext_or_trunc(p.bit_width(lhs), signed);
            Range::constant(MAX_BIT_INT, c.ext_or_trunc(MAX_BIT_INT, signed))
        };
        let outcome = BinaryOpcode::Cmp(pred).evaluate(
            1,
            &widen(a),
            &widen(b),
            signed,
            &self.config.ranges,
        );
        if !outcome.is_constant() {
            return;
        }
        let dead = if outcome.unsigned_min().is_zero() { true_bb } else { false_bb };
        debug!("{}: branch always avoids {}", stmt.id, dead);
        self.dead_blocks.insert(dead);
    }

    fn constant_cvr(
        &mut self,
        stmt: &Stmt,
        var: ValueId,
        constant: ValueId,
        pred: Predicate,
        true_bb: BlockId,
        false_bb: BlockId,
    ) {
        let p = self.program;
        if p.is_real(var) {
            // Only equality says anything about the fields of a real.
            if matches!(pred, Predicate::Eq | Predicate::Uneq) && p.is_real(constant) {
                let mut cvr = ConditionalValueRange::new(var);
                cvr.add_vr(true_bb, ValueRange::Concrete(p.type_range(constant)));
                self.nodes.add_conditional_value_range(cvr);
            } else {
                warn!("{}: condition {} on a real is not analysed", stmt.id, pred.mnemonic());
            }
            return;
        }
        let Some(c) = p.int_constant(constant) else {
            warn!("{}: comparison of {} against a real constant", stmt.id, p.name(var));
            return;
        };
        let bw = p.bit_width(var);
        let pred = if p.is_signed(var) { pred } else { pred.to_unsigned() };
        let c = Range::constant(bw, c.ext_or_trunc(bw, p.is_signed(constant)));
        let taken = Range::satisfying_cmp_region(pred, &c);
        let not_taken = complement(&taken);

        let mut targets = vec![var];
        if let Some(src) = self.forwarded_source(var) {
            targets.push(src);
        }
        for target in targets {
            let mut cvr = ConditionalValueRange::new(target);
            cvr.add_vr(true_bb, ValueRange::Concrete(Interval::Int(taken.clone())));
            cvr.add_vr(false_bb, ValueRange::Concrete(Interval::Int(not_taken.clone())));
            self.nodes.add_conditional_value_range(cvr);
        }
    }

    /// The value `var` copies, if it is a copy or a same-width integer conversion.
    fn forwarded_source(&self, var: ValueId) -> Option<ValueId> {
        let p = self.program;
        let src = match p.def(var)?.kind {
            StmtKind::Assign { expr: Expr::Copy(src), .. } => src,
            StmtKind::Assign {
                expr: Expr::Unary {
                    opcode: UnaryOpcode::Convert,
                    arg,
                },
                ..
            } => arg,
            _ => return None,
        };
        let plain = !p.is_real(src) && !p.is_constant(src);
        (plain && p.bit_width(src) == p.bit_width(var)).then_some(src)
    }

    fn symbolic_cvr(
        &mut self,
        stmt: &Stmt,
        lhs: ValueId,
        rhs: ValueId,
        pred: Predicate,
        true_bb: BlockId,
        false_bb: BlockId,
    ) {
        let p = self.program;
        if p.is_real(lhs) || p.is_real(rhs) {
            warn!("{}: symbolic condition on a real is not analysed", stmt.id);
            return;
        }
        let pred = if p.is_signed(lhs) { pred } else { pred.to_unsigned() };
        let sides = [(lhs, rhs, pred), (rhs, lhs, pred.swapped())];
        for (var, bound, pred) in sides {
            let unknown = Interval::Int(Range::unknown(p.bit_width(var)));
            let mut cvr = ConditionalValueRange::new(var);
            cvr.add_vr(true_bb, ValueRange::Symbolic(SymbRange::new(unknown.clone(), bound, pred)));
            cvr.add_vr(
                false_bb,
                ValueRange::Symbolic(SymbRange::new(unknown, bound, pred.inverse())),
            );
            self.nodes.add_conditional_value_range(cvr);
        }
    }

    /// Operations whose symbolic intersect is bounded by each variable.
    fn symbolic_map(&self) -> HashMap<VarId, BTreeSet<OpId>> {
        let mut map: HashMap<VarId, BTreeSet<OpId>> = HashMap::new();
        for id in self.nodes.op_ids() {
            if let Some(bound) = self.symbolic_bound(self.nodes.op(id).symbolic_intersect()) {
                map.entry(bound).or_default().insert(id);
            }
        }
        map
    }

    pub fn find_intervals(&mut self) {
        let symb = self.symbolic_map();
        let components = scc::components(&self.nodes, &self.control_dependences());
        debug!("Solving {} components", components.len());

        for component in components {
            let members: BTreeSet<VarId> = component.iter().copied().collect();
            if let [var] = component[..] {
                self.solve_single(var, &symb);
            } else {
                self.solve_component(&members, &symb);
            }
            self.propagate_to_next_scc(&members);
        }
    }

    fn eval_into_sink(&mut self, op: OpId) {
        let r = self.nodes.op(op).eval(&self.nodes, self.program, &self.config.ranges);
        let sink = self.nodes.op(op).sink();
        self.nodes.var_mut(sink).set_range(r);
    }

    fn solve_single(&mut self, var: VarId, symb: &HashMap<VarId, BTreeSet<OpId>>) {
        if let Some(op) = self.nodes.def(var) {
            self.eval_into_sink(op);
        }
        if self.nodes.var(var).range().is_unknown() {
            self.nodes.var_mut(var).max_range(self.program);
        }
        self.solve_futures(var, symb);
    }

    fn solve_component(
        &mut self,
        members: &BTreeSet<VarId>,
        symb: &HashMap<VarId, BTreeSet<OpId>>,
    ) {
        debug!("Component of {} variables", members.len());
        let uses = self.component_uses(members);
        let constants = if self.config.use_jump_set {
            self.constant_vector(members)
        } else {
            Vec::new()
        };
        let budget = members.len() * self.config.iteration_factor;

        let entries = self.entry_points(members);
        self.update(&uses, entries, Meet::Fixed, Some(budget));

        let entries = self.entry_points(members);
        match self.config.meet {
            MeetStrategy::Cousot => self.update(&uses, entries, Meet::Widen(&constants), None),
            MeetStrategy::CropDfs => self.update(&uses, entries, Meet::Growth, None),
        }

        for &var in members {
            self.solve_futures(var, symb);
        }
        for &var in members {
            if self.nodes.var(var).range().is_unknown() {
                self.nodes.var_mut(var).max_range(self.program);
            }
        }

        match self.config.meet {
            MeetStrategy::Cousot => {
                let active: BTreeSet<VarId> = members
                    .iter()
                    .copied()
                    .filter(|v| !self.program.is_constant(self.nodes.var(*v).value()))
                    .collect();
                self.update(&uses, active, Meet::Narrow, Some(budget));
            }
            MeetStrategy::CropDfs => {
                for &var in members {
                    self.nodes.var_mut(var).store_abstract_state();
                }
                let starts: Vec<OpId> = self
                    .nodes
                    .op_ids()
                    .filter(|op| members.contains(&self.nodes.op(*op).sink()))
                    .collect();
                for op in starts {
                    self.crop_dfs(op, &uses, &mut HashSet::new());
                }
            }
        }
    }

    fn component_uses(&self, members: &BTreeSet<VarId>) -> UseMap {
        members
            .iter()
            .map(|&v| {
                let ops = self
                    .nodes
                    .uses(v)
                    .filter(|op| members.contains(&self.nodes.op(*op).sink()))
                    .collect();
                (v, ops)
            })
            .collect()
    }

    /// Program constants that widening may stop at, sorted and deduplicated.
    fn constant_vector(&self, members: &BTreeSet<VarId>) -> Vec<APInt> {
        let p = self.program;
        let mut constants = Vec::new();
        let mut push = |v: ValueId, c: APInt| constants.push(c.ext_or_trunc(p.bit_width(v), true));

        for &var in members {
            let value = self.nodes.var(var).value();
            if let Some(c) = p.int_constant(value) {
                push(value, c.clone());
            }
            let Some(op) = self.nodes.def(var) else {
                continue;
            };
            let op = self.nodes.op(op);
            match op.kind() {
                OpKind::Binary { .. } | OpKind::Phi { .. } => {
                    let predicate = match op.kind() {
                        OpKind::Binary { opcode, .. } => opcode.predicate(),
                        _ => None,
                    };
                    for source in op.sources() {
                        let source = self.nodes.var(source).value();
                        let Some(c) = p.int_constant(source) else {
                            continue;
                        };
                        match predicate {
                            Some(Predicate::Eq | Predicate::Ne | Predicate::Uneq) => {
                                push(source, c - 1);
                                push(source, c.clone());
                                push(source, c + 1);
                            }
                            Some(
                                Predicate::Gt | Predicate::Le | Predicate::Ugt | Predicate::Ule,
                            ) => {
                                push(source, c.clone());
                                push(source, c + 1);
                            }
                            Some(
                                Predicate::Ge | Predicate::Lt | Predicate::Uge | Predicate::Ult,
                            ) => {
                                push(source, c - 1);
                                push(source, c.clone());
                            }
                            None => push(source, c.clone()),
                        }
                    }
                }
                OpKind::Sigma { .. } => {
                    let Interval::Int(r) = op.intersect().range() else {
                        continue;
                    };
                    if r.is_unknown() || r.is_empty() {
                        continue;
                    }
                    let bounds = if r.is_anti() { r.get_anti() } else { r.clone() };
                    let (l, u) = (bounds.lower(), bounds.upper());
                    if !l.is_min_sentinel() {
                        push(value, l - 1);
                        push(value, l.clone());
                    }
                    if !u.is_max_sentinel() {
                        push(value, u.clone());
                        push(value, u + 1);
                    }
                }
                _ => {}
            }
        }
        constants.sort();
        constants.dedup();
        constants
    }

    /// Resolves pending sigmas, then returns the variables whose range is
    /// already known.
    fn entry_points(&mut self, members: &BTreeSet<VarId>) -> BTreeSet<VarId> {
        for &var in members {
            let Some(op) = self.nodes.def(var) else {
                continue;
            };
            if let OpKind::Sigma { unresolved: true, .. } = self.nodes.op(op).kind() {
                self.eval_into_sink(op);
                if let OpKind::Sigma { unresolved, .. } = self.nodes.op_mut(op).kind_mut() {
                    *unresolved = false;
                }
            }
        }
        members.iter().copied().filter(|v| !self.nodes.var(*v).range().is_unknown()).collect()
    }

    /// Applies `meet` along the component's def-use edges until nothing
    /// changes, or until `budget` evaluations were spent.
    fn update(
        &mut self,
        uses: &UseMap,
        entries: BTreeSet<VarId>,
        meet: Meet<'_>,
        budget: Option<usize>,
    ) {
        let mut worklist: VecDeque<VarId> = entries.into_iter().collect();
        let mut remaining = budget;
        while let Some(var) = worklist.pop_front() {
            for &op in uses.get(&var).into_iter().flatten() {
                if remaining == Some(0) {
                    warn!(
                        "{} pass stopped after its evaluation budget with {} pending",
                        meet.name(),
                        worklist.len() + 1,
                    );
                    return;
                }
                if let Some(r) = remaining.as_mut() {
                    *r -= 1;
                }
                if meet.apply(op, &mut self.nodes, self.program, &self.config.ranges) {
                    let sink = self.nodes.op(op).sink();
                    if !worklist.contains(&sink) {
                        worklist.push_back(sink);
                    }
                }
            }
        }
    }

    fn crop_dfs(&mut self, op: OpId, uses: &UseMap, visited: &mut HashSet<OpId>) {
        visited.insert(op);
        Meet::Crop.apply(op, &mut self.nodes, self.program, &self.config.ranges);
        let sink = self.nodes.op(op).sink();
        for &next in uses.get(&sink).into_iter().flatten() {
            if !visited.contains(&next) {
                self.crop_dfs(next, uses, visited);
            }
        }
    }

    /// Turns the symbolic intersects bounded by `var` into concrete ones.
    fn solve_futures(&mut self, var: VarId, symb: &HashMap<VarId, BTreeSet<OpId>>) {
        let Some(ops) = symb.get(&var) else {
            return;
        };
        let bound = self.nodes.var(var).range().clone();
        for &op in ops {
            let sink = self.nodes.var(self.nodes.op(op).sink()).range().clone();
            self.nodes.op_mut(op).solve_future(&bound, &sink);
        }
    }

    /// Pushes the component's results into the operations that leave it.
    fn propagate_to_next_scc(&mut self, members: &BTreeSet<VarId>) {
        for &var in members {
            let ops: Vec<OpId> = self.nodes.uses(var).collect();
            for op in ops {
                if members.contains(&self.nodes.op(op).sink()) {
                    continue;
                }
                self.eval_into_sink(op);
                let pending = self.nodes.op(op).intersect().range().is_unknown();
                if let OpKind::Sigma { unresolved, .. } = self.nodes.op_mut(op).kind_mut() {
                    if pending {
                        *unresolved = true;
                    }
                }
            }
        }
    }
}

/// Values outside a branch region, kept regular when they are contiguous.
fn complement(r: &Range) -> Range {
    let bw = r.bit_width();
    if r.is_empty() {
        return Range::full(bw);
    }
    if r.is_full_set() {
        return Range::empty(bw);
    }
    if r.is_regular() {
        let (l, u) = (r.lower(), r.upper());
        if *l == APInt::signed_min(bw) {
            return Range::regular(bw, u + 1, APInt::signed_max(bw));
        }
        if *u == APInt::signed_max(bw) {
            return Range::regular(bw, APInt::signed_min(bw), l - 1);
        }
    }
    r.get_anti()
}
