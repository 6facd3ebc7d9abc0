//! Minimal SSA-like program representation consumed by the analysis.
//!
//! A [`Program`] is a flat arena of values, statements, blocks and memory
//! objects. Every value has a [`Type`]; constants and values with known bits
//! additionally carry that information, which seeds the analysis.
//!
//! The IR is already in e-SSA form: each use of a variable on a specific
//! control-flow edge goes through a [`StmtKind::Sigma`] placed at the top of
//! the successor block (a single-incoming phi serves the same purpose).
//!
//! ```
//! use range_analysis::ir::{BinaryOpcode, Expr, Program, StmtKind, Type};
//!
//! let mut p = Program::new();
//! let bb = p.add_block();
//! let x = p.add_value("x", Type::int(8, true));
//! let one = p.add_int_constant(Type::int(8, true), 1);
//! let y = p.add_value("y", Type::int(8, true));
//! let expr = Expr::Binary { opcode: BinaryOpcode::Plus, lhs: x, rhs: one };
//! p.add_stmt(bb, StmtKind::Assign { dst: y, expr });
//! assert!(p.def(y).is_some());
//! ```

use std::fmt;

use crate::apint::APInt;
use crate::bit_lattice::{self, BitString};
use crate::interval::Interval;
use crate::predicate::Predicate;
use crate::range::{Range, RangeType};
use crate::real_range::RealRange;
use crate::types::{BitWidth, BlockId, MemoryId, StmtId, ValueId};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Type {
    Int { bw: BitWidth, signed: bool },
    Bool,
    /// IEEE-754 binary32 or binary64.
    Real { bw: BitWidth },
}

impl Type {
    pub fn int(bw: BitWidth, signed: bool) -> Self {
        Type::Int { bw, signed }
    }

    pub fn real(bw: BitWidth) -> Self {
        assert!(bw == 32 || bw == 64, "Unsupported floating-point width {}", bw);
        Type::Real { bw }
    }

    pub fn bit_width(&self) -> BitWidth {
        match *self {
            Type::Int { bw, .. } => bw,
            Type::Bool => 1,
            Type::Real { bw } => bw,
        }
    }

    pub fn is_signed(&self) -> bool {
        match *self {
            Type::Int { signed, .. } => signed,
            Type::Bool => false,
            Type::Real { .. } => true,
        }
    }

    pub fn is_real(&self) -> bool {
        matches!(self, Type::Real { .. })
    }

    /// Interval of kind `ty` covering this type; Regular means every value.
    pub fn range(&self, ty: RangeType) -> Interval {
        match *self {
            Type::Real { bw } => Interval::Real(RealRange::with_type(ty, bw)),
            _ => Interval::Int(Range::with_type(ty, self.bit_width())),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Type::Int { bw, signed: true } => write!(f, "i{}", bw),
            Type::Int { bw, signed: false } => write!(f, "u{}", bw),
            Type::Bool => write!(f, "bool"),
            Type::Real { bw } => write!(f, "f{}", bw),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Constant {
    Int(APInt),
    /// Raw IEEE-754 bit pattern.
    Real(u64),
}

#[derive(Debug, Clone)]
pub struct ValueInfo {
    pub name: String,
    pub ty: Type,
    pub constant: Option<Constant>,
    /// Known bits, most significant first, possibly shorter than the type.
    pub known_bits: Option<BitString>,
    pub def: Option<StmtId>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UnaryOpcode {
    Abs,
    Negate,
    BitNot,
    /// Value-preserving conversion between types (`nop`, `convert`).
    Convert,
    /// Bit-pattern reinterpretation between integers and reals.
    ViewConvert,
    /// Sign bit of a real, as produced by float unpacking.
    ExtractSign { signed: bool },
    ExtractExponent,
    ExtractSignificand,
}

impl UnaryOpcode {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOpcode::Abs => "abs",
            UnaryOpcode::Negate => "negate",
            UnaryOpcode::BitNot => "not",
            UnaryOpcode::Convert => "convert",
            UnaryOpcode::ViewConvert => "view_convert",
            UnaryOpcode::ExtractSign { .. } => "extract_sign",
            UnaryOpcode::ExtractExponent => "extract_exponent",
            UnaryOpcode::ExtractSignificand => "extract_significand",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BinaryOpcode {
    Plus,
    Minus,
    Mult,
    /// Multiplication into a wider result type.
    WidenMult,
    Div,
    Rem,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    Cmp(Predicate),
    Min,
    Max,
    SatPlus,
    SatMinus,
}

impl BinaryOpcode {
    pub fn name(self) -> &'static str {
        match self {
            BinaryOpcode::Plus => "plus",
            BinaryOpcode::Minus => "minus",
            BinaryOpcode::Mult => "mult",
            BinaryOpcode::WidenMult => "widen_mult",
            BinaryOpcode::Div => "div",
            BinaryOpcode::Rem => "rem",
            BinaryOpcode::Shl => "lshift",
            BinaryOpcode::Shr => "rshift",
            BinaryOpcode::BitAnd => "bit_and",
            BinaryOpcode::BitOr => "bit_ior",
            BinaryOpcode::BitXor => "bit_xor",
            BinaryOpcode::Cmp(p) => p.mnemonic(),
            BinaryOpcode::Min => "min",
            BinaryOpcode::Max => "max",
            BinaryOpcode::SatPlus => "sat_plus",
            BinaryOpcode::SatMinus => "sat_minus",
        }
    }

    pub fn predicate(self) -> Option<Predicate> {
        match self {
            BinaryOpcode::Cmp(p) => Some(p),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TernaryOpcode {
    /// `cond ? a : b`
    CondExpr,
}

impl TernaryOpcode {
    pub fn name(self) -> &'static str {
        match self {
            TernaryOpcode::CondExpr => "cond_expr",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Expr {
    Copy(ValueId),
    Unary { opcode: UnaryOpcode, arg: ValueId },
    Binary { opcode: BinaryOpcode, lhs: ValueId, rhs: ValueId },
    Ternary { opcode: TernaryOpcode, cond: ValueId, lhs: ValueId, rhs: ValueId },
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum StmtKind {
    Assign { dst: ValueId, expr: Expr },
    Phi { dst: ValueId, incoming: Vec<(BlockId, ValueId)> },
    /// Copy of `source` restricted to the edge entering this block.
    Sigma { dst: ValueId, source: ValueId },
    Load { dst: ValueId, mem: MemoryId },
    Store { mem: MemoryId, value: ValueId },
    /// `if lhs pred rhs goto true_bb else goto false_bb`
    Branch { pred: Predicate, lhs: ValueId, rhs: ValueId, true_bb: BlockId, false_bb: BlockId },
}

impl StmtKind {
    /// Value defined by the statement, if any.
    pub fn dst(&self) -> Option<ValueId> {
        match *self {
            StmtKind::Assign { dst, .. }
            | StmtKind::Phi { dst, .. }
            | StmtKind::Sigma { dst, .. }
            | StmtKind::Load { dst, .. } => Some(dst),
            StmtKind::Store { .. } | StmtKind::Branch { .. } => None,
        }
    }

    pub fn is_phi(&self) -> bool {
        matches!(self, StmtKind::Phi { .. } | StmtKind::Sigma { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: StmtId,
    pub block: BlockId,
    pub kind: StmtKind,
}

#[derive(Debug, Clone)]
pub struct MemoryObject {
    pub name: String,
    pub elem: Type,
    /// Number of elements.
    pub len: usize,
    pub read_only: bool,
    /// Constant initializers of the leading elements.
    pub init: Vec<ValueId>,
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    values: Vec<ValueInfo>,
    stmts: Vec<Stmt>,
    blocks: Vec<Vec<StmtId>>,
    memories: Vec<MemoryObject>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_block(&mut self) -> BlockId {
        self.blocks.push(Vec::new());
        BlockId::new(self.blocks.len() - 1)
    }

    pub fn add_value(&mut self, name: impl Into<String>, ty: Type) -> ValueId {
        self.values.push(ValueInfo {
            name: name.into(),
            ty,
            constant: None,
            known_bits: None,
            def: None,
        });
        ValueId::new(self.values.len() - 1)
    }

    pub fn add_int_constant(&mut self, ty: Type, value: impl Into<APInt>) -> ValueId {
        assert!(!ty.is_real(), "Integer constant of real type {}", ty);
        let value = value.into().ext_or_trunc(ty.bit_width(), ty.is_signed());
        let id = self.add_value(value.to_string(), ty);
        self.values[id.index()].constant = Some(Constant::Int(value));
        id
    }

    pub fn add_real_constant(&mut self, ty: Type, bits: u64) -> ValueId {
        assert!(ty.is_real(), "Real constant of integer type {}", ty);
        let name = match ty.bit_width() {
            32 => format!("{:?}", f32::from_bits(bits as u32)),
            _ => format!("{:?}", f64::from_bits(bits)),
        };
        let id = self.add_value(name, ty);
        self.values[id.index()].constant = Some(Constant::Real(bits));
        id
    }

    pub fn f32_constant(&mut self, value: f32) -> ValueId {
        self.add_real_constant(Type::real(32), value.to_bits() as u64)
    }

    pub fn f64_constant(&mut self, value: f64) -> ValueId {
        self.add_real_constant(Type::real(64), value.to_bits())
    }

    pub fn set_known_bits(&mut self, value: ValueId, bits: BitString) {
        let ty = self.values[value.index()].ty;
        assert!(!bits.is_empty(), "Empty known-bit string for {}", value);
        assert!(
            bits.len() <= ty.bit_width() as usize,
            "Known bits of {} longer than its type {}",
            value,
            ty,
        );
        assert!(
            !ty.is_real() || bits.len() == ty.bit_width() as usize,
            "Real known bits of {} must cover the whole type",
            value
        );
        self.values[value.index()].known_bits = Some(bits);
    }

    pub fn add_memory(
        &mut self,
        name: impl Into<String>,
        elem: Type,
        len: usize,
        read_only: bool,
        init: Vec<ValueId>,
    ) -> MemoryId {
        for &v in &init {
            assert!(self.constant(v).is_some(), "Memory initializer {} is not a constant", v);
        }
        assert!(init.len() <= len, "More initializers than elements");
        self.memories.push(MemoryObject {
            name: name.into(),
            elem,
            len,
            read_only,
            init,
        });
        MemoryId::new(self.memories.len() - 1)
    }

    pub fn add_stmt(&mut self, block: BlockId, kind: StmtKind) -> StmtId {
        let id = StmtId::new(self.stmts.len());
        if let Some(dst) = kind.dst() {
            let info = &mut self.values[dst.index()];
            assert!(info.def.is_none(), "Value {} defined twice", info.name);
            assert!(info.constant.is_none(), "Constant {} cannot be defined", info.name);
            info.def = Some(id);
        }
        self.blocks[block.index()].push(id);
        self.stmts.push(Stmt { id, block, kind });
        id
    }

    pub fn values(&self) -> impl Iterator<Item = ValueId> + '_ {
        (0..self.values.len()).map(ValueId::new)
    }

    pub fn value(&self, v: ValueId) -> &ValueInfo {
        &self.values[v.index()]
    }

    pub fn name(&self, v: ValueId) -> &str {
        &self.values[v.index()].name
    }

    pub fn ty(&self, v: ValueId) -> Type {
        self.values[v.index()].ty
    }

    pub fn bit_width(&self, v: ValueId) -> BitWidth {
        self.ty(v).bit_width()
    }

    pub fn is_signed(&self, v: ValueId) -> bool {
        self.ty(v).is_signed()
    }

    pub fn is_real(&self, v: ValueId) -> bool {
        self.ty(v).is_real()
    }

    pub fn constant(&self, v: ValueId) -> Option<&Constant> {
        self.values[v.index()].constant.as_ref()
    }

    pub fn is_constant(&self, v: ValueId) -> bool {
        self.constant(v).is_some()
    }

    pub fn int_constant(&self, v: ValueId) -> Option<&APInt> {
        match self.constant(v) {
            Some(Constant::Int(c)) => Some(c),
            _ => None,
        }
    }

    pub fn def(&self, v: ValueId) -> Option<&Stmt> {
        self.values[v.index()].def.map(|s| &self.stmts[s.index()])
    }

    pub fn stmt(&self, s: StmtId) -> &Stmt {
        &self.stmts[s.index()]
    }

    pub fn stmts(&self) -> &[Stmt] {
        &self.stmts
    }

    pub fn blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        (0..self.blocks.len()).map(BlockId::new)
    }

    pub fn block_stmts(&self, block: BlockId) -> impl Iterator<Item = &Stmt> + '_ {
        self.blocks[block.index()].iter().map(|s| &self.stmts[s.index()])
    }

    pub fn memory(&self, m: MemoryId) -> &MemoryObject {
        &self.memories[m.index()]
    }

    /// Values stored into `mem` anywhere in the program.
    pub fn stores_to(&self, mem: MemoryId) -> Vec<ValueId> {
        self.stmts
            .iter()
            .filter_map(|s| match s.kind {
                StmtKind::Store { mem: m, value } if m == mem => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Interval of kind `ty` for the type of `v`.
    pub fn range_for(&self, v: ValueId, ty: RangeType) -> Interval {
        self.ty(v).range(ty)
    }

    /// Everything the program itself says about `v`: its constant value,
    /// its known bits, or else its whole type.
    pub fn type_range(&self, v: ValueId) -> Interval {
        let info = self.value(v);
        let bw = info.ty.bit_width();
        match (&info.constant, &info.known_bits) {
            (Some(Constant::Int(c)), _) => Interval::Int(Range::constant(bw, c)),
            (Some(Constant::Real(bits)), _) => {
                let pattern = APInt::from(*bits);
                let mut bs = bit_lattice::bitstring_from_constant(&pattern, bw as usize, false);
                if bs.len() < bw as usize {
                    bs = bit_lattice::sign_extend(&bs, false, bw as usize);
                }
                Interval::Real(RealRange::from_bit_values(&bs))
            }
            (
                None,
                Some(bits),
            ) if info.ty.is_real() => Interval::Real(RealRange::from_bit_values(bits)),
            (None, Some(bits)) => {
                let len = bits.len() as BitWidth;
                let signed = info.ty.is_signed();
                let known = Range::full(len).intersect_with(&Range::from_bit_values(
                    bits,
                    len,
                    signed,
                ));
                Interval::Int(if signed {
                    known.sext_or_trunc(bw)
                } else {
                    known.zext_or_trunc(bw)
                })
            }
            (None, None) => info.ty.range(RangeType::Regular),
        }
    }

    /// Skips copies, conversions and single-incoming phis back to the value
    /// they forward.
    pub fn branch_op_recurse(&self, v: ValueId) -> ValueId {
        let Some(stmt) = self.def(v) else {
            return v;
        };
        match &stmt.kind {
            StmtKind::Assign { expr: Expr::Copy(src), .. }
            | StmtKind::Assign {
                expr: Expr::Unary { opcode: UnaryOpcode::Convert, arg: src },
                ..
            } => self.branch_op_recurse(*src),
            StmtKind::Sigma { source, .. } => self.branch_op_recurse(*source),
            StmtKind::Phi { incoming, .. } if incoming.len() == 1 => {
                self.branch_op_recurse(incoming[0].1)
            }
            _ => v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit_lattice::parse_bitstring;
    use test_log::test;

    #[test]
    fn test_type_queries() {
        assert_eq!(Type::int(16, false).bit_width(), 16);
        assert!(!Type::Bool.is_signed());
        assert_eq!(Type::Bool.range(RangeType::Regular), Interval::Int(Range::full(1)));
        assert!(Type::real(32).range(RangeType::Unknown).is_unknown());
        assert_eq!(Type::int(8, false).to_string(), "u8");
    }

    #[test]
    fn test_constant_ranges() {
        let mut p = Program::new();
        let c = p.add_int_constant(Type::int(8, true), 200);
        assert_eq!(p.type_range(c), Interval::Int(Range::constant(8, -56)));
        let f = p.f32_constant(1.0);
        let r = p.type_range(f);
        let real = r.as_real().unwrap();
        assert!(real.is_constant());
        assert_eq!(real.exponent().unsigned_min(), APInt::from(127));
        assert_eq!(p.name(f), "1.0");
    }

    #[test]
    fn test_known_bits_refine_type_range() {
        let mut p = Program::new();
        let v = p.add_value("v", Type::int(16, false));
        p.set_known_bits(v, parse_bitstring("0UU0"));
        assert_eq!(p.type_range(v), Interval::Int(Range::regular(16, 0, 6)));
    }

    #[test]
    fn test_branch_op_recurse() {
        let mut p = Program::new();
        let bb = p.add_block();
        let x = p.add_value("x", Type::int(32, true));
        let y = p.add_value("y", Type::int(32, true));
        let z = p.add_value("z", Type::int(32, true));
        p.add_stmt(bb, StmtKind::Assign { dst: y, expr: Expr::Copy(x) });
        p.add_stmt(bb, StmtKind::Sigma { dst: z, source: y });
        assert_eq!(p.branch_op_recurse(z), x);
        assert_eq!(p.branch_op_recurse(x), x);
    }

    #[test]
    #[should_panic(expected = "defined twice")]
    fn test_duplicate_definition() {
        let mut p = Program::new();
        let bb = p.add_block();
        let x = p.add_value("x", Type::int(8, true));
        let y = p.add_value("y", Type::int(8, true));
        p.add_stmt(bb, StmtKind::Assign { dst: y, expr: Expr::Copy(x) });
        p.add_stmt(bb, StmtKind::Assign { dst: y, expr: Expr::Copy(x) });
    }
}
