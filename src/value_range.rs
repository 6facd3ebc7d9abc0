//! Ranges attached to operations: concrete, or symbolic until the value they
//! depend on is known.

use std::collections::BTreeMap;
use std::fmt;

use crate::apint::APInt;
use crate::interval::Interval;
use crate::predicate::Predicate;
use crate::range::Range;
use crate::real_range::RealRange;
use crate::types::{BitWidth, BlockId, ValueId};

/// `x pred bound`, to be turned into a concrete interval for `x` once the
/// range of `bound` is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbRange {
    range: Interval,
    bound: ValueId,
    pred: Predicate,
}

impl SymbRange {
    pub fn new(range: Interval, bound: ValueId, pred: Predicate) -> Self {
        Self { range, bound, pred }
    }

    pub fn bound(&self) -> ValueId {
        self.bound
    }

    pub fn predicate(&self) -> Predicate {
        self.pred
    }

    pub fn range(&self) -> &Interval {
        &self.range
    }

    /// Concrete interval implied by the predicate, given the current range of
    /// the bound and of the constrained value (`sink`).
    pub fn solve_future(&self, bound: &Interval, sink: &Interval) -> Interval {
        match (bound, sink) {
            (Interval::Real(b), Interval::Real(s)) => Interval::Real(self.solve_real(b, s)),
            (Interval::Int(b), Interval::Int(s)) => Interval::Int(self.solve_int(b, s)),
            _ => panic!("Symbolic bound {} and sink {} mix integer and real ranges", bound, sink),
        }
    }

    fn solve_real(&self, bound: &RealRange, sink: &RealRange) -> RealRange {
        let eq = matches!(self.pred, Predicate::Eq | Predicate::Uneq);
        if eq && !bound.exponent().is_anti() && !bound.significand().is_anti() {
            bound.clone()
        } else {
            RealRange::full(sink.bit_width())
        }
    }

    fn solve_int(&self, bound: &Range, sink: &Range) -> Range {
        let bw = self.range.bit_width();
        let unsigned = matches!(
            self.pred,
            Predicate::Ult | Predicate::Ule | Predicate::Ugt | Predicate::Uge
        );
        let by_extremes = unsigned || bound.is_anti() || sink.is_anti();
        let (l, u) = limits(bound, by_extremes);
        let (lower, upper) = limits(sink, by_extremes);
        let (bottom, top) = if unsigned {
            (APInt::zero(), APInt::unsigned_max(bw))
        } else {
            (APInt::signed_min(bw), APInt::signed_max(bw))
        };
        match self.pred {
            Predicate::Eq | Predicate::Uneq => Range::regular(bw, l, u),
            Predicate::Le | Predicate::Ule => between(bw, lower, u),
            Predicate::Lt | Predicate::Ult => {
                if !u.is_max_sentinel() && u != top {
                    between(bw, lower, u - 1)
                } else {
                    between(bw, lower, u)
                }
            }
            Predicate::Ge | Predicate::Uge => between(bw, l, upper),
            Predicate::Gt | Predicate::Ugt => {
                if !l.is_min_sentinel() && l != bottom {
                    between(bw, l + 1, upper)
                } else {
                    between(bw, l, upper)
                }
            }
            Predicate::Ne => Range::full(sink.bit_width()),
        }
    }

    /// Textual form with the bound printed as `name`.
    pub fn describe(&self, name: &str) -> String {
        match self.pred {
            Predicate::Eq | Predicate::Uneq => format!("[lb({name}), ub({name})]"),
            Predicate::Ule => format!("[0, ub({name})]"),
            Predicate::Le => format!("[-inf, ub({name})]"),
            Predicate::Ult => format!("[0, ub({name}) - 1]"),
            Predicate::Lt => format!("[-inf, ub({name}) - 1]"),
            Predicate::Ge | Predicate::Uge => format!("[lb({name}), +inf]"),
            Predicate::Gt | Predicate::Ugt => format!("[lb({name}) + 1, +inf]"),
            Predicate::Ne => format!("){name}({name})("),
        }
    }
}

/// Bounds of `r`, or its unsigned extremes when `by_extremes` is set.
/// Unknown and empty ranges are unbounded.
fn limits(r: &Range, by_extremes: bool) -> (APInt, APInt) {
    if r.is_unknown() || r.is_empty() {
        (APInt::min_sentinel(), APInt::max_sentinel())
    } else if by_extremes {
        (r.unsigned_min(), r.unsigned_max())
    } else {
        (r.lower().clone(), r.upper().clone())
    }
}

fn between(bw: BitWidth, lo: APInt, hi: APInt) -> Range {
    if lo > hi {
        Range::empty(bw)
    } else {
        Range::regular(bw, lo, hi)
    }
}

impl fmt::Display for SymbRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe(&self.bound.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueRange {
    Concrete(Interval),
    Symbolic(SymbRange),
}

impl ValueRange {
    pub fn range(&self) -> &Interval {
        match self {
            ValueRange::Concrete(r) => r,
            ValueRange::Symbolic(s) => &s.range,
        }
    }

    pub fn set_range(&mut self, range: Interval) {
        match self {
            ValueRange::Concrete(r) => *r = range,
            ValueRange::Symbolic(s) => s.range = range,
        }
    }

    pub fn as_symbolic(&self) -> Option<&SymbRange> {
        match self {
            ValueRange::Concrete(_) => None,
            ValueRange::Symbolic(s) => Some(s),
        }
    }

    pub fn is_symbolic(&self) -> bool {
        matches!(self, ValueRange::Symbolic(_))
    }
}

impl From<Interval> for ValueRange {
    fn from(r: Interval) -> Self {
        ValueRange::Concrete(r)
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueRange::Concrete(r) => write!(f, "{}", r),
            ValueRange::Symbolic(s) => write!(f, "{}", s),
        }
    }
}

/// Per-successor-block constraints a branch places on one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalValueRange {
    var: ValueId,
    by_block: BTreeMap<BlockId, ValueRange>,
}

impl ConditionalValueRange {
    pub fn new(var: ValueId) -> Self {
        Self {
            var,
            by_block: BTreeMap::new(),
        }
    }

    pub fn var(&self) -> ValueId {
        self.var
    }

    /// Records the constraint for `block` unless one is already present.
    pub fn add_vr(&mut self, block: BlockId, vr: ValueRange) {
        self.by_block.entry(block).or_insert(vr);
    }

    pub fn get(&self, block: BlockId) -> Option<&ValueRange> {
        self.by_block.get(&block)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &ValueRange)> + '_ {
        self.by_block.iter().map(|(b, vr)| (*b, vr))
    }

    /// Keeps the existing entry for every block both sides know about.
    pub fn merge(&mut self, other: ConditionalValueRange) {
        assert_eq!(self.var, other.var, "Merging conditions of different values");
        for (block, vr) in other.by_block {
            self.add_vr(block, vr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn int(r: Range) -> Interval {
        Interval::Int(r)
    }

    fn symb(pred: Predicate) -> SymbRange {
        SymbRange::new(int(Range::unknown(8)), ValueId::new(1), pred)
    }

    #[test]
    fn test_solve_less_than() {
        let bound = int(Range::regular(8, 10, 20));
        let sink = int(Range::regular(8, 0, 100));
        assert_eq!(symb(Predicate::Lt).solve_future(&bound, &sink), int(Range::regular(8, 0, 19)));
        assert_eq!(symb(Predicate::Le).solve_future(&bound, &sink), int(Range::regular(8, 0, 20)));
    }

    #[test]
    fn test_solve_greater_than() {
        let bound = int(Range::regular(8, 10, 20));
        let sink = int(Range::regular(8, 0, 100));
        assert_eq!(
            symb(Predicate::Gt).solve_future(&bound, &sink),
            int(Range::regular(8, 11, 100)),
        );
        assert_eq!(
            symb(Predicate::Ge).solve_future(&bound, &sink),
            int(Range::regular(8, 10, 100)),
        );
    }

    #[test]
    fn test_solve_equal_and_not_equal() {
        let bound = int(Range::regular(8, 10, 20));
        let sink = int(Range::regular(8, 0, 100));
        assert_eq!(symb(Predicate::Eq).solve_future(&bound, &sink), bound);
        assert_eq!(symb(Predicate::Ne).solve_future(&bound, &sink), int(Range::full(8)));
    }

    #[test]
    fn test_solve_contradiction_is_empty() {
        let bound = int(Range::regular(8, 10, 20));
        let sink = int(Range::regular(8, 50, 100));
        assert!(symb(Predicate::Lt).solve_future(&bound, &sink).is_empty());
    }

    #[test]
    fn test_solve_unknown_sink_is_unbounded_below() {
        let bound = int(Range::regular(8, 10, 20));
        let sink = int(Range::unknown(8));
        assert_eq!(
            symb(Predicate::Lt).solve_future(&bound, &sink),
            int(Range::regular(8, -128, 19)),
        );
    }

    #[test]
    fn test_solve_unsigned_uses_unsigned_bounds() {
        // bound in [200, 255] as an unsigned byte
        let bound = int(Range::regular(8, -56, -1));
        let sink = int(Range::regular(8, 0, 10));
        let solved = symb(Predicate::Ult).solve_future(&bound, &sink);
        let solved = solved.int();
        for x in 0..=10 {
            assert!(solved.contains(&APInt::from(x)));
        }
    }

    #[test]
    fn test_solve_real() {
        let bound = Interval::Real(RealRange::new(
            Range::constant(1, 0),
            Range::constant(8, 127),
            Range::constant(23, 0),
        ));
        let sink = Interval::Real(RealRange::full(32));
        let s = SymbRange::new(
            Interval::Real(RealRange::unknown(32)),
            ValueId::new(0),
            Predicate::Eq,
        );
        assert_eq!(s.solve_future(&bound, &sink), bound);
        let s = SymbRange::new(
            Interval::Real(RealRange::unknown(32)),
            ValueId::new(0),
            Predicate::Lt,
        );
        assert!(s.solve_future(&bound, &sink).is_full_set());
    }

    #[test]
    fn test_display() {
        assert_eq!(symb(Predicate::Lt).to_string(), "[-inf, ub(v1) - 1]");
        assert_eq!(symb(Predicate::Ne).describe("n"), ")n(n)(");
        let vr = ValueRange::from(int(Range::regular(8, 1, 2)));
        assert_eq!(vr.to_string(), "[1,8,2]");
        assert!(!vr.is_symbolic());
    }

    #[test]
    fn test_conditional_keeps_first() {
        let mut cvr = ConditionalValueRange::new(ValueId::new(0));
        let bb = BlockId::new(1);
        cvr.add_vr(bb, int(Range::regular(8, 0, 1)).into());
        cvr.add_vr(bb, int(Range::regular(8, 5, 6)).into());
        assert_eq!(cvr.get(bb).unwrap().range(), &int(Range::regular(8, 0, 1)));

        let mut other = ConditionalValueRange::new(ValueId::new(0));
        other.add_vr(bb, int(Range::full(8)).into());
        other.add_vr(BlockId::new(2), int(Range::constant(8, 3)).into());
        cvr.merge(other);
        assert_eq!(cvr.get(bb).unwrap().range(), &int(Range::regular(8, 0, 1)));
        assert_eq!(cvr.iter().count(), 2);
    }
}
