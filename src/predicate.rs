//! Comparison predicates shared by branch conditions, compare operations and
//! symbolic ranges.

use std::fmt;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Predicate {
    Eq,
    Ne,
    /// Equality on operands of unsigned type.
    Uneq,
    Gt,
    Ge,
    Lt,
    Le,
    Ugt,
    Uge,
    Ult,
    Ule,
}

impl Predicate {
    /// Maps a signed predicate to its unsigned counterpart.
    pub fn to_unsigned(self) -> Self {
        match self {
            Predicate::Ge => Predicate::Uge,
            Predicate::Gt => Predicate::Ugt,
            Predicate::Le => Predicate::Ule,
            Predicate::Lt => Predicate::Ult,
            Predicate::Eq => Predicate::Uneq,
            other => other,
        }
    }

    /// Predicate with the operands exchanged: `a < b` iff `b > a`.
    pub fn swapped(self) -> Self {
        match self {
            Predicate::Ge => Predicate::Le,
            Predicate::Gt => Predicate::Lt,
            Predicate::Le => Predicate::Ge,
            Predicate::Lt => Predicate::Gt,
            Predicate::Uge => Predicate::Ule,
            Predicate::Ugt => Predicate::Ult,
            Predicate::Ule => Predicate::Uge,
            Predicate::Ult => Predicate::Ugt,
            Predicate::Eq | Predicate::Ne | Predicate::Uneq => self,
        }
    }

    /// Logical negation: `!(a < b)` iff `a >= b`.
    pub fn inverse(self) -> Self {
        match self {
            Predicate::Ge => Predicate::Lt,
            Predicate::Gt => Predicate::Le,
            Predicate::Le => Predicate::Gt,
            Predicate::Lt => Predicate::Ge,
            Predicate::Uge => Predicate::Ult,
            Predicate::Ugt => Predicate::Ule,
            Predicate::Ule => Predicate::Ugt,
            Predicate::Ult => Predicate::Uge,
            Predicate::Eq | Predicate::Uneq => Predicate::Ne,
            Predicate::Ne => Predicate::Eq,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Predicate::Eq => "eq",
            Predicate::Ne => "ne",
            Predicate::Uneq => "uneq",
            Predicate::Gt => "gt",
            Predicate::Ge => "ge",
            Predicate::Lt => "lt",
            Predicate::Le => "le",
            Predicate::Ugt => "ungt",
            Predicate::Uge => "unge",
            Predicate::Ult => "unlt",
            Predicate::Ule => "unle",
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
