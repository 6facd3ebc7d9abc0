//! The value stored in a constraint-graph slot: either an integer [`Range`]
//! or a decomposed floating-point [`RealRange`].

use std::fmt;

use crate::range::{Range, RangeType};
use crate::real_range::RealRange;
use crate::types::BitWidth;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Interval {
    Int(Range),
    Real(RealRange),
}

impl Interval {
    pub fn is_real(&self) -> bool {
        matches!(self, Interval::Real(_))
    }

    pub fn as_int(&self) -> Option<&Range> {
        match self {
            Interval::Int(r) => Some(r),
            Interval::Real(_) => None,
        }
    }

    pub fn as_real(&self) -> Option<&RealRange> {
        match self {
            Interval::Int(_) => None,
            Interval::Real(r) => Some(r),
        }
    }

    /// The integer range, panicking on a real value.
    pub fn int(&self) -> &Range {
        match self {
            Interval::Int(r) => r,
            Interval::Real(r) => panic!("Real range {} used as an integer", r),
        }
    }

    /// Same kind and width as `self`, of type `ty`.
    pub fn with_type_like(&self, ty: RangeType) -> Interval {
        match self {
            Interval::Int(r) => Interval::Int(Range::with_type(ty, r.bit_width())),
            Interval::Real(r) => Interval::Real(RealRange::with_type(ty, r.bit_width())),
        }
    }

    pub fn bit_width(&self) -> BitWidth {
        match self {
            Interval::Int(r) => r.bit_width(),
            Interval::Real(r) => r.bit_width(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Interval::Int(r) => r.is_empty(),
            Interval::Real(r) => r.is_empty(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        match self {
            Interval::Int(r) => r.is_unknown(),
            Interval::Real(r) => r.is_unknown(),
        }
    }

    pub fn is_anti(&self) -> bool {
        match self {
            Interval::Int(r) => r.is_anti(),
            Interval::Real(r) => r.is_anti(),
        }
    }

    pub fn is_regular(&self) -> bool {
        !self.is_empty() && !self.is_unknown() && !self.is_anti()
    }

    pub fn is_full_set(&self) -> bool {
        match self {
            Interval::Int(r) => r.is_full_set(),
            Interval::Real(r) => r.is_full_set(),
        }
    }

    pub fn is_constant(&self) -> bool {
        match self {
            Interval::Int(r) => r.is_constant(),
            Interval::Real(r) => r.is_constant(),
        }
    }

    pub fn is_single_element(&self) -> bool {
        match self {
            Interval::Int(r) => r.is_single_element(),
            Interval::Real(r) => r.is_single_element(),
        }
    }

    pub fn get_anti(&self) -> Interval {
        match self {
            Interval::Int(r) => Interval::Int(r.get_anti()),
            Interval::Real(r) => Interval::Real(r.get_anti()),
        }
    }

    pub fn intersect_with(&self, other: &Interval) -> Interval {
        match (self, other) {
            (Interval::Int(a), Interval::Int(b)) => Interval::Int(a.intersect_with(b)),
            (Interval::Real(a), Interval::Real(b)) => Interval::Real(a.intersect_with(b)),
            _ => panic!("Intersection of integer and real ranges: {} and {}", self, other),
        }
    }

    pub fn union_with(&self, other: &Interval) -> Interval {
        match (self, other) {
            (Interval::Int(a), Interval::Int(b)) => Interval::Int(a.union_with(b)),
            (Interval::Real(a), Interval::Real(b)) => Interval::Real(a.union_with(b)),
            _ => panic!("Union of integer and real ranges: {} and {}", self, other),
        }
    }

    /// Equality as a boolean range of width `bw`; a real never equals an integer.
    pub fn equal(&self, other: &Interval, bw: BitWidth) -> Range {
        match (self, other) {
            (Interval::Int(a), Interval::Int(b)) => a.equal(b, bw),
            (Interval::Real(a), Interval::Real(b)) => a.equal(b, bw),
            _ => Range::constant(bw, 0),
        }
    }

    pub fn not_equal(&self, other: &Interval, bw: BitWidth) -> Range {
        match (self, other) {
            (Interval::Int(a), Interval::Int(b)) => a.not_equal(b, bw),
            (Interval::Real(a), Interval::Real(b)) => a.not_equal(b, bw),
            _ => Range::constant(bw, 1),
        }
    }
}

impl From<Range> for Interval {
    fn from(r: Range) -> Self {
        Interval::Int(r)
    }
}

impl From<RealRange> for Interval {
    fn from(r: RealRange) -> Self {
        Interval::Real(r)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interval::Int(r) => write!(f, "{}", r),
            Interval::Real(r) => write!(f, "{}", r),
        }
    }
}
