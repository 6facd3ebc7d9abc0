//! Operations of the constraint graph.
//!
//! An [`OpNode`] defines exactly one sink variable from its sources. The
//! closed [`OpKind`] enum carries the operands of each kind; evaluation is a
//! pure function of the current source ranges, and the solver decides when
//! to store the result into the sink.
//!
//! After the kind-specific transfer function, every operation except sigma
//! intersects its result with the op's `intersect` constraint, as long as the
//! constraint is not the full set and the intersection is non-empty. A sigma
//! only takes the intersection when it strictly shrinks the source range.

use std::fmt;

use log::trace;

use crate::config::RangeConfig;
use crate::container::NodeContainer;
use crate::interval::Interval;
use crate::ir::{BinaryOpcode, Expr, Program, StmtKind, TernaryOpcode, Type, UnaryOpcode};
use crate::predicate::Predicate;
use crate::range::{Range, RangeType};
use crate::real_range::RealRange;
use crate::types::{BitWidth, StmtId, ValueId, VarId};
use crate::value_range::{SymbRange, ValueRange};

#[derive(Debug, Clone)]
pub enum OpKind {
    Unary {
        source: VarId,
        opcode: UnaryOpcode,
    },
    /// Copy of `source` restricted to one control-flow edge.
    Sigma {
        source: VarId,
        /// Bound of a symbolic intersect.
        symbolic_source: Option<VarId>,
        /// Set when the bound changed after the sigma was last evaluated.
        unresolved: bool,
    },
    Binary {
        source1: VarId,
        source2: VarId,
        opcode: BinaryOpcode,
    },
    Ternary {
        source1: VarId,
        source2: VarId,
        source3: VarId,
        opcode: TernaryOpcode,
    },
    Phi {
        sources: Vec<VarId>,
    },
    /// Join over every value stored to a memory object, plus its initial contents.
    Load {
        sources: Vec<VarId>,
        initial: Interval,
    },
}

#[derive(Debug, Clone)]
pub struct OpNode {
    sink: VarId,
    intersect: ValueRange,
    stmt: StmtId,
    kind: OpKind,
}

impl OpNode {
    pub fn new(sink: VarId, intersect: ValueRange, stmt: StmtId, kind: OpKind) -> Self {
        Self { sink, intersect, stmt, kind }
    }

    pub fn sink(&self) -> VarId {
        self.sink
    }

    pub fn stmt(&self) -> StmtId {
        self.stmt
    }

    pub fn kind(&self) -> &OpKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut OpKind {
        &mut self.kind
    }

    pub fn intersect(&self) -> &ValueRange {
        &self.intersect
    }

    pub fn set_intersect(&mut self, range: Interval) {
        self.intersect.set_range(range);
    }

    pub fn symbolic_intersect(&self) -> Option<&SymbRange> {
        self.intersect.as_symbolic()
    }

    /// Source variables, in operand order.
    pub fn sources(&self) -> Vec<VarId> {
        match &self.kind {
            OpKind::Unary { source, .. } | OpKind::Sigma { source, .. } => vec![*source],
            OpKind::Binary { source1, source2, .. } => vec![*source1, *source2],
            OpKind::Ternary { source1, source2, source3, .. } => vec![*source1, *source2, *source3],
            OpKind::Phi { sources } | OpKind::Load { sources, .. } => sources.clone(),
        }
    }

    pub fn is_sigma(&self) -> bool {
        matches!(self.kind, OpKind::Sigma { .. })
    }

    /// Resolves a symbolic intersect against the final range of its bound.
    pub fn solve_future(&mut self, bound: &Interval, sink: &Interval) {
        if let ValueRange::Symbolic(symb) = &self.intersect {
            let solved = symb.solve_future(bound, sink);
            trace!("{}: symbolic intersect {} solved to {}", self.stmt, symb, solved);
            self.intersect.set_range(solved);
        }
    }

    /// New range of the sink given the current source ranges.
    pub fn eval(&self, nodes: &NodeContainer, program: &Program, config: &RangeConfig) -> Interval {
        let sink_ty = program.ty(nodes.var(self.sink).value());
        let range = |v: VarId| nodes.var(v).range();
        let ty = |v: VarId| program.ty(nodes.var(v).value());
        let result = match &self.kind {
            OpKind::Sigma { source, .. } => return self.eval_sigma(range(*source)),
            OpKind::Unary { source, opcode } => eval_unary(
                *opcode,
                range(*source),
                ty(*source),
                sink_ty,
                config,
            ),
            OpKind::Binary { source1, source2, opcode } => {
                eval_binary(
                    *opcode,
                    range(*source1),
                    range(*source2),
                    ty(*source1),
                    sink_ty,
                    config,
                )
            }
            OpKind::Ternary {
                source1,
                source2,
                source3,
                opcode,
            } => self.eval_ternary(
                *opcode,
                [*source1, *source2, *source3],
                nodes,
                program,
                sink_ty,
                config,
            ),
            OpKind::Phi { sources } => sources
                .iter()
                .fold(sink_ty.range(RangeType::Empty), |acc, s| acc.union_with(range(*s))),
            OpKind::Load { sources, initial } => {
                if sources.is_empty() || !config.load {
                    return self.intersect.range().clone();
                }
                sources
                    .iter()
                    .map(|s| fit(range(*s), sink_ty.bit_width()))
                    .fold(initial.clone(), |acc, r| acc.union_with(&r))
            }
        };
        self.refine(result)
    }

    /// Applies the intersect constraint to a freshly computed range.
    fn refine(&self, result: Interval) -> Interval {
        let constraint = self.intersect.range();
        if constraint.is_unknown() || constraint.is_empty() || constraint.is_full_set() {
            return result;
        }
        let refined = result.intersect_with(constraint);
        if refined.is_empty() {
            result
        } else {
            refined
        }
    }

    fn eval_sigma(&self, source: &Interval) -> Interval {
        let constraint = self.intersect.range();
        if constraint.is_unknown() {
            return source.clone();
        }
        let refined = source.intersect_with(constraint);
        if refined.is_empty() {
            return source.clone();
        }
        let narrower = match (&refined, source) {
            (Interval::Int(r), Interval::Int(s)) => r.span() < s.span(),
            _ => true,
        };
        if narrower {
            refined
        } else {
            source.clone()
        }
    }

    fn eval_ternary(
        &self,
        opcode: TernaryOpcode,
        sources: [VarId; 3],
        nodes: &NodeContainer,
        program: &Program,
        sink_ty: Type,
        config: &RangeConfig,
    ) -> Interval {
        let [cond, lhs, rhs] = sources.map(|s| nodes.var(s).range());
        let concrete =
            |r: &Interval| matches!(r, Interval::Int(x) if x.is_regular() || x.is_anti());
        let result = if config.ternary && concrete(cond) && concrete(lhs) && concrete(rhs) {
            let (mut taken, mut not_taken) = (lhs.int().clone(), rhs.int().clone());
            match opcode {
                TernaryOpcode::CondExpr => {
                    let c = cond.int();
                    if c.is_constant() {
                        let picked = if c.unsigned_min().is_zero() { not_taken } else { taken };
                        return self.refine(Interval::Int(picked));
                    }
                    let selector = program.branch_op_recurse(nodes.var(sources[0]).value());
                    let arms = [nodes.var(sources[1]).value(), nodes.var(sources[2]).value()];
                    if let Some((var, region)) = selector_region(program, selector) {
                        if var == arms[0] {
                            taken = taken.intersect_with(&region);
                        }
                        if var == arms[1] {
                            not_taken = not_taken.intersect_with(&region.get_anti());
                        }
                    }
                }
            }
            Interval::Int(taken.union_with(&not_taken))
        } else if cond.is_empty() || lhs.is_empty() || rhs.is_empty() {
            sink_ty.range(RangeType::Empty)
        } else {
            sink_ty.range(RangeType::Regular)
        };
        self.refine(result)
    }
}

/// For a selector defined by `var pred constant`, the variable and the
/// region of values that make the selector true.
fn selector_region(program: &Program, selector: ValueId) -> Option<(ValueId, Range)> {
    let stmt = program.def(selector)?;
    let StmtKind::Assign {
        expr: Expr::Binary {
            opcode: BinaryOpcode::Cmp(pred),
            lhs,
            rhs,
        },
        ..
    } = &stmt.kind
    else {
        return None;
    };
    let (var, constant, pred) = match (program.int_constant(*lhs), program.int_constant(*rhs)) {
        (None, Some(_)) => (*lhs, *rhs, *pred),
        (Some(_), None) => (*rhs, *lhs, pred.swapped()),
        _ => return None,
    };
    if program.is_real(var) {
        return None;
    }
    let pred = if program.is_signed(var) { pred } else { pred.to_unsigned() };
    let constant = program.type_range(constant);
    Some((var, Range::satisfying_cmp_region(pred, constant.int())))
}

/// Resizes an integer range to `bw` bits by zero extension or truncation.
fn fit(r: &Interval, bw: BitWidth) -> Interval {
    match r {
        Interval::Int(x) if x.bit_width() != bw => Interval::Int(x.zext_or_trunc(bw)),
        _ => r.clone(),
    }
}

fn eval_unary(
    opcode: UnaryOpcode,
    source: &Interval,
    source_ty: Type,
    sink_ty: Type,
    config: &RangeConfig,
) -> Interval {
    let bw = sink_ty.bit_width();
    let full = sink_ty.range(RangeType::Regular);
    if source.is_empty() {
        return sink_ty.range(RangeType::Empty);
    }
    if source.is_unknown() {
        return sink_ty.range(RangeType::Unknown);
    }
    match source {
        Interval::Real(rr) => match opcode {
            UnaryOpcode::ExtractSignificand => Interval::Int(rr.significand().zext_or_trunc(bw)),
            UnaryOpcode::ExtractExponent => Interval::Int(rr.exponent().zext_or_trunc(bw)),
            UnaryOpcode::ExtractSign { signed: true } => Interval::Int(rr.sign().sext_or_trunc(bw)),
            UnaryOpcode::ExtractSign { signed: false } => {
                Interval::Int(rr.sign().zext_or_trunc(bw))
            }
            UnaryOpcode::ViewConvert if sink_ty.is_real() => Interval::Real(rr.clone()),
            UnaryOpcode::ViewConvert => {
                assert!(bw == 32 || bw == 64, "View-convert of a real into {} bits", bw);
                if config.view_convert {
                    Interval::Int(rr.range().zext_or_trunc(bw))
                } else {
                    full
                }
            }
            UnaryOpcode::Convert if sink_ty.is_real() => {
                if bw == 32 {
                    Interval::Real(rr.to_float32())
                } else {
                    Interval::Real(rr.to_float64())
                }
            }
            UnaryOpcode::Abs if config.abs => Interval::Real(rr.abs()),
            UnaryOpcode::Negate if config.negate => Interval::Real(rr.negate()),
            // Conversions to integers evaluate floating-point arithmetic.
            _ => full,
        },
        Interval::Int(r) => match opcode {
            UnaryOpcode::Abs if config.abs => Interval::Int(r.abs()),
            UnaryOpcode::Negate if config.negate => Interval::Int(r.negate()),
            UnaryOpcode::BitNot if config.not => Interval::Int(r.bit_not()),
            UnaryOpcode::Convert if !sink_ty.is_real() => convert(
                r,
                source_ty.is_signed(),
                bw,
                config,
            ).map_or(full, Interval::Int),
            UnaryOpcode::ViewConvert if sink_ty.is_real() => {
                if config.float_pack {
                    assert_eq!(r.bit_width(), bw, "View-convert between different widths");
                    Interval::Real(RealRange::from_view_convert(r))
                } else {
                    full
                }
            }
            UnaryOpcode::ViewConvert => convert(
                r,
                source_ty.is_signed(),
                bw,
                config,
            ).map_or(full, Interval::Int),
            UnaryOpcode::ExtractSign { .. }
            | UnaryOpcode::ExtractExponent
            | UnaryOpcode::ExtractSignificand => {
                panic!("{} applied to integer range {}", opcode.name(), r)
            }
            _ => full,
        },
    }
}

/// Integer-to-integer conversion; `None` when the needed cast is disabled.
fn convert(r: &Range, signed: bool, bw: BitWidth, config: &RangeConfig) -> Option<Range> {
    if bw < r.bit_width() && !config.trunc {
        return None;
    }
    if signed {
        (bw <= r.bit_width() || config.sext).then(|| r.sext_or_trunc(bw))
    } else {
        (bw <= r.bit_width() || config.zext).then(|| r.zext_or_trunc(bw))
    }
}

fn eval_binary(
    opcode: BinaryOpcode,
    a: &Interval,
    b: &Interval,
    source_ty: Type,
    sink_ty: Type,
    config: &RangeConfig,
) -> Interval {
    let bw = sink_ty.bit_width();
    if a.is_empty() || b.is_empty() {
        return sink_ty.range(RangeType::Empty);
    }
    if a.is_unknown() || b.is_unknown() {
        return sink_ty.range(RangeType::Unknown);
    }
    match (a, b) {
        (Interval::Int(x), Interval::Int(y)) => {
            let r = opcode.evaluate(bw, x, y, source_ty.is_signed(), config);
            Interval::Int(if r.bit_width() != bw { r.zext_or_trunc(bw) } else { r })
        }
        (Interval::Real(_), Interval::Real(_)) if !sink_ty.is_real() => match opcode {
            BinaryOpcode::Cmp(Predicate::Eq | Predicate::Uneq) => Interval::Int(a.equal(b, bw)),
            BinaryOpcode::Cmp(Predicate::Ne) => Interval::Int(a.not_equal(b, bw)),
            _ => sink_ty.range(RangeType::Regular),
        },
        _ => sink_ty.range(RangeType::Regular),
    }
}

impl BinaryOpcode {
    /// Transfer function of the opcode on integer ranges, with a result of
    /// `bw` bits for comparisons and width-changing operations.
    pub fn evaluate(
        self,
        bw: BitWidth,
        a: &Range,
        b: &Range,
        signed: bool,
        config: &RangeConfig,
    ) -> Range {
        let enabled = |on: bool, f: &dyn Fn() -> Range| if on { f() } else { Range::full(bw) };
        let extend = |r: &Range| if signed { r.sext_or_trunc(bw) } else { r.zext_or_trunc(bw) };
        match self {
            BinaryOpcode::Plus => enabled(config.add, &|| a.add(b)),
            BinaryOpcode::Minus => enabled(config.sub, &|| a.sub(b)),
            BinaryOpcode::Mult => enabled(config.mul, &|| a.mul(b)),
            BinaryOpcode::WidenMult => enabled(config.mul, &|| extend(a).mul(&extend(b))),
            BinaryOpcode::Div if signed => enabled(config.sdiv, &|| a.sdiv(b)),
            BinaryOpcode::Div => enabled(config.udiv, &|| a.udiv(b)),
            BinaryOpcode::Rem if signed => enabled(config.srem, &|| a.srem(b)),
            BinaryOpcode::Rem => enabled(config.urem, &|| a.urem(b)),
            BinaryOpcode::Shl => enabled(config.shl, &|| extend(a).shl(b)),
            BinaryOpcode::Shr if signed => {
                enabled(config.shr, &|| a.shr(b, true).sext_or_trunc(bw))
            }
            BinaryOpcode::Shr => enabled(config.shr, &|| a.shr(b, false).zext_or_trunc(bw)),
            BinaryOpcode::BitAnd => enabled(config.and, &|| a.bit_and(b)),
            BinaryOpcode::BitOr => enabled(config.or, &|| a.bit_or(b)),
            BinaryOpcode::BitXor => enabled(config.xor, &|| a.bit_xor(b)),
            BinaryOpcode::Cmp(pred @ (Predicate::Eq | Predicate::Uneq | Predicate::Ne)) => {
                let (x, y) = match a.bit_width().cmp(&b.bit_width()) {
                    std::cmp::Ordering::Less => (widen(a, b.bit_width(), signed), b.clone()),
                    std::cmp::Ordering::Greater => (a.clone(), widen(b, a.bit_width(), signed)),
                    std::cmp::Ordering::Equal => (a.clone(), b.clone()),
                };
                if pred == Predicate::Ne {
                    x.not_equal(&y, bw)
                } else {
                    x.equal(&y, bw)
                }
            }
            BinaryOpcode::Cmp(pred) => a.compare(pred, b, bw),
            BinaryOpcode::Min if signed => enabled(config.min, &|| a.smin(b)),
            BinaryOpcode::Min => enabled(config.min, &|| a.umin(b)),
            BinaryOpcode::Max if signed => enabled(config.max, &|| a.smax(b)),
            BinaryOpcode::Max => enabled(config.max, &|| a.umax(b)),
            BinaryOpcode::SatPlus if signed => enabled(config.add, &|| a.sat_add(b)),
            BinaryOpcode::SatPlus => enabled(config.add, &|| a.usat_add(b)),
            BinaryOpcode::SatMinus if signed => enabled(config.sub, &|| a.sat_sub(b)),
            BinaryOpcode::SatMinus => enabled(config.sub, &|| a.usat_sub(b)),
        }
    }
}

fn widen(r: &Range, bw: BitWidth, signed: bool) -> Range {
    if signed {
        r.sext_or_trunc(bw)
    } else {
        r.zext_or_trunc(bw)
    }
}

impl fmt::Display for OpNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match &self.kind {
            OpKind::Unary { opcode, .. } => opcode.name(),
            OpKind::Sigma { .. } => "sigma",
            OpKind::Binary { opcode, .. } => opcode.name(),
            OpKind::Ternary { opcode, .. } => opcode.name(),
            OpKind::Phi { .. } => "phi",
            OpKind::Load { .. } => "load",
        };
        write!(f, "{} = {}(", self.sink, name)?;
        for (i, s) in self.sources().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", s)?;
        }
        write!(f, ") & {}", self.intersect)
    }
}
