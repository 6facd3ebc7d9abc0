//! Owner of every node of the constraint graph.
//!
//! [`NodeContainer`] keeps the variable and operation arenas together with the
//! def/use maps and the branch-derived conditional ranges. Statements are
//! turned into operations by [`add_operation`][NodeContainer::add_operation],
//! which asks an ordered list of generators for the first one that
//! recognises the statement.
//!
//! # Float unpacking
//!
//! Integer views of a real (`view_convert`) are tracked through shifts and
//! masks with an [`UnpackSelector`]. When the selected bits are exactly the
//! sign, the exponent or the significand field, the operation is replaced by
//! the corresponding extract on the real range, which is far more precise
//! than masking the packed bit pattern.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use log::debug;

use crate::config::RangeConfig;
use crate::interval::Interval;
use crate::ir::{BinaryOpcode, Expr, Program, Stmt, StmtKind, UnaryOpcode};
use crate::op_node::{OpKind, OpNode};
use crate::predicate::Predicate;
use crate::range::{Range, RangeType};
use crate::real_range::{field_widths, RealRange};
use crate::types::{BitWidth, OpId, ValueId, VarId};
use crate::value_range::{ConditionalValueRange, ValueRange};
use crate::var_node::VarNode;

/// Bits of a real's pattern that an integer view still holds: `mask` over the
/// bit pattern of the real, of which the low `rshift` bits were shifted out.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct UnpackSelector {
    mask: u64,
    rshift: u8,
}

/// Field of an IEEE-754 pattern.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FloatField {
    Sign,
    Exponent,
    Significand,
}

impl UnpackSelector {
    pub const SIGN32: UnpackSelector = UnpackSelector::new(0x8000_0000, 31);
    pub const EXP32: UnpackSelector = UnpackSelector::new(0x7F80_0000, 23);
    pub const SIGF32: UnpackSelector = UnpackSelector::new(0x007F_FFFF, 0);
    pub const SIGN64: UnpackSelector = UnpackSelector::new(1 << 63, 63);
    pub const EXP64: UnpackSelector = UnpackSelector::new(0x7FF0_0000_0000_0000, 52);
    pub const SIGF64: UnpackSelector = UnpackSelector::new(0x000F_FFFF_FFFF_FFFF, 0);

    pub const fn new(mask: u64, rshift: u8) -> Self {
        Self { mask, rshift }
    }

    /// Every bit of a `bw`-bit pattern.
    pub fn whole(bw: BitWidth) -> Self {
        Self::new(low_mask(bw), 0)
    }

    pub fn mask(self) -> u64 {
        self.mask
    }

    pub fn rshift(self) -> u8 {
        self.rshift
    }

    /// Selector after `& m`.
    pub fn and(self, m: u64) -> Self {
        let shifted = ((m as u128) << self.rshift) as u64;
        Self::new(self.mask & shifted, self.rshift)
    }

    /// Selector after `>> s`.
    pub fn shr(self, s: u32) -> Self {
        let rs = self.rshift as u32 + s;
        if rs >= 64 {
            return Self::new(0, 64);
        }
        Self::new((self.mask >> rs) << rs, rs as u8)
    }

    /// The field of a `bw`-bit real this selector isolates, if any.
    pub fn field(self, bw: BitWidth) -> Option<FloatField> {
        match (bw, self) {
            (32, Self::SIGN32) | (64, Self::SIGN64) => Some(FloatField::Sign),
            (32, Self::EXP32) | (64, Self::EXP64) => Some(FloatField::Exponent),
            (32, Self::SIGF32) | (64, Self::SIGF64) => Some(FloatField::Significand),
            _ => None,
        }
    }
}

impl fmt::Display for UnpackSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}>>{}", self.mask, self.rshift)
    }
}

fn low_mask(bw: BitWidth) -> u64 {
    if bw >= 64 {
        u64::MAX
    } else {
        (1u64 << bw) - 1
    }
}

/// Deferred construction of the operation for one statement.
pub type OpBuilder<'a> = Box<dyn FnOnce(&mut NodeContainer) -> Option<OpId> + 'a>;

/// Recognises a statement and returns how to build its operation.
pub type OpGenerator = for<'a> fn(&'a Stmt, &'a Program, &'a RangeConfig) -> Option<OpBuilder<'a>>;

/// Generators in the order they are tried.
pub const GENERATORS: [OpGenerator; 6] = [
    load_generator,
    unary_generator,
    binary_generator,
    phi_generator,
    sigma_generator,
    ternary_generator,
];

#[derive(Debug, Clone, Default)]
pub struct NodeContainer {
    vars: Vec<VarNode>,
    var_ids: HashMap<ValueId, VarId>,
    ops: Vec<OpNode>,
    defs: HashMap<VarId, OpId>,
    uses: HashMap<VarId, BTreeSet<OpId>>,
    cvrs: BTreeMap<ValueId, ConditionalValueRange>,
    view_converts: HashMap<ValueId, (ValueId, UnpackSelector)>,
}

impl NodeContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node of `value`, created on first request.
    pub fn add_var_node(&mut self, value: ValueId, program: &Program) -> VarId {
        if let Some(&id) = self.var_ids.get(&value) {
            return id;
        }
        let id = VarId::new(self.vars.len());
        self.vars.push(VarNode::new(value, program));
        self.var_ids.insert(value, id);
        id
    }

    pub fn var_id(&self, value: ValueId) -> Option<VarId> {
        self.var_ids.get(&value).copied()
    }

    pub fn var(&self, id: VarId) -> &VarNode {
        &self.vars[id.index()]
    }

    pub fn var_mut(&mut self, id: VarId) -> &mut VarNode {
        &mut self.vars[id.index()]
    }

    pub fn var_nodes(&self) -> &[VarNode] {
        &self.vars
    }

    pub fn var_ids(&self) -> impl Iterator<Item = VarId> {
        (0..self.vars.len()).map(VarId::new)
    }

    pub fn op(&self, id: OpId) -> &OpNode {
        &self.ops[id.index()]
    }

    pub fn op_mut(&mut self, id: OpId) -> &mut OpNode {
        &mut self.ops[id.index()]
    }

    pub fn ops(&self) -> &[OpNode] {
        &self.ops
    }

    pub fn op_ids(&self) -> impl Iterator<Item = OpId> {
        (0..self.ops.len()).map(OpId::new)
    }

    pub fn defs(&self) -> &HashMap<VarId, OpId> {
        &self.defs
    }

    /// Operation defining `var`, if any.
    pub fn def(&self, var: VarId) -> Option<OpId> {
        self.defs.get(&var).copied()
    }

    /// Operations reading `var`, in creation order.
    pub fn uses(&self, var: VarId) -> impl Iterator<Item = OpId> + '_ {
        self.uses.get(&var).into_iter().flatten().copied()
    }

    pub fn cvrs(&self) -> &BTreeMap<ValueId, ConditionalValueRange> {
        &self.cvrs
    }

    /// Merges `cvr` into the conditions known for its value.
    pub fn add_conditional_value_range(&mut self, cvr: ConditionalValueRange) {
        match self.cvrs.get_mut(&cvr.var()) {
            Some(existing) => existing.merge(cvr),
            None => {
                self.cvrs.insert(cvr.var(), cvr);
            }
        }
    }

    pub fn view_convert(&self, value: ValueId) -> Option<(ValueId, UnpackSelector)> {
        self.view_converts.get(&value).copied()
    }

    /// Records that `value` holds the bits of `real` picked by `selector`.
    pub fn add_view_convert_mask(
        &mut self,
        value: ValueId,
        real: ValueId,
        selector: UnpackSelector,
    ) {
        let previous = self.view_converts.insert(value, (real, selector));
        assert!(previous.is_none(), "View-convert mask of {} recorded twice", value);
    }

    /// Adds `op` to the graph, wiring its sink and sources.
    pub fn push_operation(&mut self, op: OpNode) -> OpId {
        let id = OpId::new(self.ops.len());
        let sink = op.sink();
        let previous = self.defs.insert(sink, id);
        assert!(previous.is_none(), "Duplicate definition of {}", self.var(sink).value());
        for source in op.sources() {
            self.uses.entry(source).or_default().insert(id);
        }
        self.ops.push(op);
        id
    }

    /// Builds the operation of `stmt` with the first generator that
    /// recognises it.
    pub fn add_operation(
        &mut self,
        stmt: &Stmt,
        program: &Program,
        config: &RangeConfig,
    ) -> Option<OpId> {
        let builder = GENERATORS.iter().find_map(|generator| generator(stmt, program, config))?;
        let id = builder(self);
        if let Some(id) = id {
            debug!("{}: {}", stmt.id, self.op(id));
        }
        id
    }

    /// Adds `kind` defining `dst`, constrained by the range the program
    /// itself gives `dst`.
    fn push_simple(&mut self, stmt: &Stmt, program: &Program, dst: ValueId, kind: OpKind) -> OpId {
        let sink = self.add_var_node(dst, program);
        let intersect = ValueRange::Concrete(program.type_range(dst));
        self.push_operation(OpNode::new(sink, intersect, stmt.id, kind))
    }

    fn push_unary(
        &mut self,
        stmt: &Stmt,
        program: &Program,
        dst: ValueId,
        source: ValueId,
        opcode: UnaryOpcode,
    ) -> OpId {
        let source = self.add_var_node(source, program);
        self.push_simple(stmt, program, dst, OpKind::Unary { source, opcode })
    }
}

fn load_generator<'a>(
    stmt: &'a Stmt,
    program: &'a Program,
    _: &'a RangeConfig,
) -> Option<OpBuilder<'a>> {
    let StmtKind::Load { dst, mem } = stmt.kind else {
        return None;
    };
    Some(Box::new(move |c: &mut NodeContainer| {
        let memory = program.memory(mem);
        let bw = program.bit_width(dst);
        let zero = match memory.elem.range(RangeType::Empty) {
            Interval::Int(r) => Interval::Int(Range::constant(r.bit_width(), 0)),
            Interval::Real(r) => {
                let (e, s) = field_widths(r.bit_width());
                Interval::Real(RealRange::new(
                    Range::constant(1, 0),
                    Range::constant(e, 0),
                    Range::constant(s, 0),
                ))
            }
        };
        let mut initial = memory
            .init
            .iter()
            .fold(memory.elem.range(RangeType::Empty), |acc, v| {
                acc.union_with(&program.type_range(*v))
            });
        if memory.init.len() < memory.len {
            initial = initial.union_with(&zero);
        }
        let stores = if memory.read_only { Vec::new() } else { program.stores_to(mem) };
        let mut bound = stores
            .iter()
            .fold(initial.clone(), |acc, v| acc.union_with(&program.type_range(*v)));
        if bound.is_empty() {
            bound = memory.elem.range(RangeType::Regular);
        }
        let fit = |r: Interval| match r {
            Interval::Int(x) if x.bit_width() != bw => Interval::Int(x.zext_or_trunc(bw)),
            other => other,
        };
        let sources = stores.iter().map(|v| c.add_var_node(*v, program)).collect();
        let sink = c.add_var_node(dst, program);
        let kind = OpKind::Load {
            sources,
            initial: fit(initial),
        };
        Some(c.push_operation(OpNode::new(sink, ValueRange::Concrete(fit(bound)), stmt.id, kind)))
    }))
}

fn unary_generator<'a>(
    stmt: &'a Stmt,
    program: &'a Program,
    config: &'a RangeConfig,
) -> Option<OpBuilder<'a>> {
    let StmtKind::Assign { dst, ref expr } = stmt.kind else {
        return None;
    };
    let (arg, opcode) = match *expr {
        Expr::Copy(arg) => (arg, UnaryOpcode::Convert),
        Expr::Unary { opcode, arg } => (arg, opcode),
        _ => return None,
    };
    Some(Box::new(move |c: &mut NodeContainer| {
        if config.float_unpack {
            if let Some((real, selector)) = c.view_convert(arg) {
                let narrowed = selector.and(low_mask(program.bit_width(dst)));
                if opcode == UnaryOpcode::Convert
                    && program.bit_width(real) == 32
                    && narrowed == UnpackSelector::EXP32
                {
                    return Some(c.push_unary(
                        stmt,
                        program,
                        dst,
                        real,
                        UnaryOpcode::ExtractExponent,
                    ));
                }
                c.add_view_convert_mask(dst, real, narrowed);
            } else if opcode == UnaryOpcode::ViewConvert && program.is_real(arg) {
                c.add_view_convert_mask(dst, arg, UnpackSelector::whole(program.bit_width(arg)));
            }
        }
        Some(c.push_unary(stmt, program, dst, arg, opcode))
    }))
}

fn binary_generator<'a>(
    stmt: &'a Stmt,
    program: &'a Program,
    config: &'a RangeConfig,
) -> Option<OpBuilder<'a>> {
    let StmtKind::Assign {
        dst,
        expr: Expr::Binary { opcode, lhs, rhs },
    } = stmt.kind
    else {
        return None;
    };
    Some(Box::new(move |c: &mut NodeContainer| {
        if config.float_unpack {
            if let Some((real, selector)) = c.view_convert(lhs) {
                if let Some(extract) = unpack(c, program, dst, opcode, lhs, rhs, real, selector) {
                    return Some(c.push_unary(stmt, program, dst, real, extract));
                }
            }
        }
        let opcode = match opcode {
            BinaryOpcode::Cmp(pred) if !program.is_signed(lhs) => {
                BinaryOpcode::Cmp(pred.to_unsigned())
            }
            other => other,
        };
        let source1 = c.add_var_node(lhs, program);
        let source2 = c.add_var_node(rhs, program);
        Some(c.push_simple(stmt, program, dst, OpKind::Binary { source1, source2, opcode }))
    }))
}

/// Extract operation replacing `lhs opcode rhs` on an integer view of `real`,
/// or `None` after recording what the result still selects.
#[allow(clippy::too_many_arguments)]
fn unpack(
    c: &mut NodeContainer,
    program: &Program,
    dst: ValueId,
    opcode: BinaryOpcode,
    lhs: ValueId,
    rhs: ValueId,
    real: ValueId,
    selector: UnpackSelector,
) -> Option<UnaryOpcode> {
    let constant = program.int_constant(rhs)?.ext_or_trunc(program.bit_width(rhs), false).to_u64()?;
    let next = match opcode {
        BinaryOpcode::Shr => selector.shr(u32::try_from(constant).unwrap_or(u32::MAX).min(64)),
        BinaryOpcode::BitAnd => selector.and(constant),
        BinaryOpcode::Cmp(Predicate::Lt) if constant == 0 => {
            return Some(UnaryOpcode::ExtractSign { signed: false });
        }
        _ => return None,
    };
    match next.field(program.bit_width(real)) {
        Some(FloatField::Sign) => Some(UnaryOpcode::ExtractSign {
            signed: program.is_signed(lhs),
        }),
        Some(FloatField::Exponent) => Some(UnaryOpcode::ExtractExponent),
        Some(FloatField::Significand) => Some(UnaryOpcode::ExtractSignificand),
        None => {
            c.add_view_convert_mask(dst, real, next);
            None
        }
    }
}

fn phi_generator<'a>(
    stmt: &'a Stmt,
    program: &'a Program,
    _: &'a RangeConfig,
) -> Option<OpBuilder<'a>> {
    let StmtKind::Phi { dst, ref incoming } = stmt.kind else {
        return None;
    };
    if incoming.len() <= 1 {
        return None;
    }
    Some(Box::new(move |c: &mut NodeContainer| {
        let sources = incoming.iter().map(|(_, v)| c.add_var_node(*v, program)).collect();
        Some(c.push_simple(stmt, program, dst, OpKind::Phi { sources }))
    }))
}

fn sigma_generator<'a>(
    stmt: &'a Stmt,
    program: &'a Program,
    _: &'a RangeConfig,
) -> Option<OpBuilder<'a>> {
    let (dst, source) = match stmt.kind {
        StmtKind::Sigma { dst, source } => (dst, source),
        StmtKind::Phi { dst, ref incoming } if incoming.len() == 1 => (dst, incoming[0].1),
        _ => return None,
    };
    Some(Box::new(move |c: &mut NodeContainer| {
        let condition = c.cvrs().get(&source).and_then(|cvr| cvr.get(stmt.block)).cloned();
        let (intersect, symbolic_source) = match condition {
            Some(ValueRange::Symbolic(symb)) => {
                let bound = c.add_var_node(symb.bound(), program);
                (ValueRange::Symbolic(symb), Some(bound))
            }
            Some(concrete) => (concrete, None),
            None => (ValueRange::Concrete(program.type_range(dst)), None),
        };
        let source = c.add_var_node(source, program);
        let sink = c.add_var_node(dst, program);
        let kind = OpKind::Sigma {
            source,
            symbolic_source,
            unresolved: false,
        };
        Some(c.push_operation(OpNode::new(sink, intersect, stmt.id, kind)))
    }))
}

fn ternary_generator<'a>(
    stmt: &'a Stmt,
    program: &'a Program,
    _: &'a RangeConfig,
) -> Option<OpBuilder<'a>> {
    let StmtKind::Assign {
        dst,
        expr: Expr::Ternary { opcode, cond, lhs, rhs },
    } = stmt.kind
    else {
        return None;
    };
    Some(Box::new(move |c: &mut NodeContainer| {
        let source1 = c.add_var_node(cond, program);
        let source2 = c.add_var_node(lhs, program);
        let source3 = c.add_var_node(rhs, program);
        let kind = OpKind::Ternary {
            source1,
            source2,
            source3,
            opcode,
        };
        Some(c.push_simple(stmt, program, dst, kind))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Type;
    use crate::types::BlockId;
    use test_log::test;

    #[test]
    fn test_selector_algebra() {
        let whole = UnpackSelector::whole(32);
        assert_eq!(whole.shr(31).field(32), Some(FloatField::Sign));
        assert_eq!(whole.shr(23).and(0xFF).field(32), Some(FloatField::Exponent));
        assert_eq!(whole.shr(20).shr(3).and(0xFF), UnpackSelector::EXP32);
        assert_eq!(whole.and(0x7F_FFFF).field(32), Some(FloatField::Significand));
        assert_eq!(whole.and(0xFF).field(32), None);

        let whole = UnpackSelector::whole(64);
        assert_eq!(whole.shr(63).field(64), Some(FloatField::Sign));
        assert_eq!(whole.shr(52).and(0x7FF).field(64), Some(FloatField::Exponent));
        assert_eq!(whole.and(0xF_FFFF_FFFF_FFFF).field(64), Some(FloatField::Significand));
        // A single-precision field means nothing for a double.
        assert_eq!(UnpackSelector::EXP32.field(64), None);
        assert_eq!(whole.shr(70).mask(), 0);
    }

    #[test]
    fn test_var_nodes_are_memoized() {
        let mut p = Program::new();
        let x = p.add_value("x", Type::int(8, true));
        let mut c = NodeContainer::new();
        let a = c.add_var_node(x, &p);
        let b = c.add_var_node(x, &p);
        assert_eq!(a, b);
        assert_eq!(c.var_nodes().len(), 1);
        assert_eq!(c.var_id(x), Some(a));
    }

    fn assign(p: &mut Program, bb: BlockId, dst: ValueId, expr: Expr) -> Stmt {
        let id = p.add_stmt(bb, StmtKind::Assign { dst, expr });
        p.stmt(id).clone()
    }

    #[test]
    fn test_generators_dispatch() {
        let mut p = Program::new();
        let bb = p.add_block();
        let ty = Type::int(8, true);
        let x = p.add_value("x", ty);
        let y = p.add_value("y", ty);
        let z = p.add_value("z", ty);
        let one = p.add_int_constant(ty, 1);
        let s1 = assign(&mut p, bb, y, Expr::Copy(x));
        let s2 = assign(
            &mut p,
            bb,
            z,
            Expr::Binary { opcode: BinaryOpcode::Plus, lhs: y, rhs: one },
        );
        let mem = p.add_memory("m", ty, 4, false, vec![]);
        let store = p.add_stmt(bb, StmtKind::Store { mem, value: z });

        let config = RangeConfig::default();
        let mut c = NodeContainer::new();
        let op1 = c.add_operation(&s1, &p, &config).unwrap();
        let op2 = c.add_operation(&s2, &p, &config).unwrap();
        assert!(c.add_operation(p.stmt(store), &p, &config).is_none());

        assert!(matches!(c.op(op1).kind(), OpKind::Unary { opcode: UnaryOpcode::Convert, .. }));
        assert!(matches!(c.op(op2).kind(), OpKind::Binary { opcode: BinaryOpcode::Plus, .. }));
        let y_var = c.var_id(y).unwrap();
        assert_eq!(c.def(y_var), Some(op1));
        assert_eq!(c.uses(y_var).collect::<Vec<_>>(), vec![op2]);
        assert_eq!(c.defs().len(), 2);
    }

    #[test]
    fn test_unsigned_compare_predicate() {
        let mut p = Program::new();
        let bb = p.add_block();
        let ty = Type::int(8, false);
        let x = p.add_value("x", ty);
        let k = p.add_int_constant(ty, 3);
        let b = p.add_value("b", Type::Bool);
        let s = assign(
            &mut p,
            bb,
            b,
            Expr::Binary { opcode: BinaryOpcode::Cmp(Predicate::Lt), lhs: x, rhs: k },
        );
        let mut c = NodeContainer::new();
        let op = c.add_operation(&s, &p, &RangeConfig::default()).unwrap();
        assert!(matches!(
            c.op(op).kind(),
            OpKind::Binary { opcode: BinaryOpcode::Cmp(Predicate::Ult), .. },
        ));
    }

    #[test]
    fn test_float_unpack_exponent() {
        let mut p = Program::new();
        let bb = p.add_block();
        let f = p.add_value("f", Type::real(32));
        let bits = p.add_value("bits", Type::int(32, false));
        let shifted = p.add_value("shifted", Type::int(32, false));
        let exp = p.add_value("exp", Type::int(32, false));
        let c23 = p.add_int_constant(Type::int(32, false), 23);
        let cff = p.add_int_constant(Type::int(32, false), 0xFF);
        let stmts = [
            assign(&mut p, bb, bits, Expr::Unary { opcode: UnaryOpcode::ViewConvert, arg: f }),
            assign(
                &mut p,
                bb,
                shifted,
                Expr::Binary { opcode: BinaryOpcode::Shr, lhs: bits, rhs: c23 },
            ),
            assign(
                &mut p,
                bb,
                exp,
                Expr::Binary { opcode: BinaryOpcode::BitAnd, lhs: shifted, rhs: cff },
            ),
        ];
        let mut c = NodeContainer::new();
        let config = RangeConfig::default();
        let ops: Vec<OpId> = stmts
            .iter()
            .map(|s| c.add_operation(s, &p, &config).unwrap())
            .collect();
        assert_eq!(c.view_convert(bits), Some((f, UnpackSelector::whole(32))));
        assert!(matches!(c.op(ops[1]).kind(), OpKind::Binary { .. }));
        let OpKind::Unary { source, opcode } = c.op(ops[2]).kind() else {
            panic!("Expected an extract");
        };
        assert_eq!(*opcode, UnaryOpcode::ExtractExponent);
        assert_eq!(c.var(*source).value(), f);

        // With unpacking disabled the mask stays a plain binary op.
        let mut config = RangeConfig::default();
        config.float_unpack = false;
        let mut c = NodeContainer::new();
        let ops: Vec<OpId> = stmts
            .iter()
            .map(|s| c.add_operation(s, &p, &config).unwrap())
            .collect();
        assert!(matches!(c.op(ops[2]).kind(), OpKind::Binary { .. }));
    }

    #[test]
    fn test_sigma_uses_conditional_range() {
        let mut p = Program::new();
        let then_bb = p.add_block();
        let ty = Type::int(8, true);
        let x = p.add_value("x", ty);
        let xt = p.add_value("x.t", ty);
        let sid = p.add_stmt(then_bb, StmtKind::Sigma { dst: xt, source: x });

        let mut c = NodeContainer::new();
        let mut cvr = ConditionalValueRange::new(x);
        cvr.add_vr(then_bb, ValueRange::Concrete(Interval::Int(Range::regular(8, 0, 9))));
        c.add_conditional_value_range(cvr);
        let op = c.add_operation(p.stmt(sid), &p, &RangeConfig::default()).unwrap();
        assert!(c.op(op).is_sigma());
        assert_eq!(c.op(op).intersect().range(), &Interval::Int(Range::regular(8, 0, 9)));
    }

    #[test]
    fn test_load_initial_contents() {
        let mut p = Program::new();
        let bb = p.add_block();
        let ty = Type::int(8, true);
        let a = p.add_int_constant(ty, 3);
        let b = p.add_int_constant(ty, 7);
        let table = p.add_memory("table", ty, 2, true, vec![a, b]);
        let l = p.add_value("l", Type::int(16, true));
        let sid = p.add_stmt(bb, StmtKind::Load { dst: l, mem: table });
        let mut c = NodeContainer::new();
        let op = c.add_operation(p.stmt(sid), &p, &RangeConfig::default()).unwrap();
        assert_eq!(c.op(op).intersect().range(), &Interval::Int(Range::regular(16, 3, 7)));
        let value = c.op(op).eval(&c, &p, &RangeConfig::default());
        assert_eq!(value, Interval::Int(Range::regular(16, 3, 7)));
    }

    #[test]
    #[should_panic(expected = "Duplicate definition")]
    fn test_duplicate_sink() {
        let mut p = Program::new();
        let x = p.add_value("x", Type::int(8, true));
        let y = p.add_value("y", Type::int(8, true));
        let mut c = NodeContainer::new();
        let sx = c.add_var_node(x, &p);
        let sy = c.add_var_node(y, &p);
        let kind = || OpKind::Unary {
            source: sx,
            opcode: UnaryOpcode::Convert,
        };
        let full = || ValueRange::Concrete(Interval::Int(Range::full(8)));
        c.push_operation(OpNode::new(sy, full(), crate::types::StmtId::new(0), kind()));
        c.push_operation(OpNode::new(sy, full(), crate::types::StmtId::new(1), kind()));
    }

    #[test]
    #[should_panic(expected = "recorded twice")]
    fn test_duplicate_view_convert() {
        let mut c = NodeContainer::new();
        let v = ValueId::new(0);
        c.add_view_convert_mask(v, ValueId::new(1), UnpackSelector::SIGF32);
        c.add_view_convert_mask(v, ValueId::new(1), UnpackSelector::SIGF32);
    }
}
