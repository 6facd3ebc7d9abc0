//! Arbitrary-precision signed integers with a fixed logical maximum width.
//!
//! [`APInt`] wraps a [`BigInt`] and adds the handful of fixed-width notions the
//! interval domain needs: truncation/extension to `bw` bits, the usual
//! `bw`-bit extremes, and bit counting bounded by an explicit width.
//!
//! Values themselves are unbounded; a range never stores anything wider than
//! [`MAX_BIT_INT`] bits once normalized, but intermediate products (e.g. in
//! range multiplication) may temporarily need twice that.
//!
//! Bitwise operators follow infinite two's-complement semantics, which agree
//! with `MAX_BIT_INT`-bit arithmetic for every value in
//! `[APInt::min_sentinel(), APInt::max_sentinel()]`.

use std::fmt;
use std::ops::{
    Add, AddAssign, BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Div, DivAssign,
    Mul, MulAssign, Neg, Not, Rem, RemAssign, Shl, ShlAssign, Shr, ShrAssign, Sub, SubAssign,
};

use num_bigint::BigInt;

use crate::types::BitWidth;

/// Largest bit-width an analysed value may have.
pub const MAX_BIT_INT: BitWidth = 128;

/// Shift amounts beyond this are equivalent for every value the domain produces.
const SHIFT_LIMIT: u64 = 4 * MAX_BIT_INT as u64;

/// A signed integer with immutable-value semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct APInt(BigInt);

impl APInt {
    pub fn zero() -> Self {
        APInt(BigInt::from(0))
    }

    pub fn one() -> Self {
        APInt(BigInt::from(1))
    }

    /// Sentinel lower bound, `-2^(MAX_BIT_INT-1)`.
    pub fn min_sentinel() -> Self {
        Self::signed_min(MAX_BIT_INT)
    }

    /// Sentinel upper bound, `2^(MAX_BIT_INT-1) - 1`.
    pub fn max_sentinel() -> Self {
        Self::signed_max(MAX_BIT_INT)
    }

    pub fn is_min_sentinel(&self) -> bool {
        *self == Self::min_sentinel()
    }

    pub fn is_max_sentinel(&self) -> bool {
        *self == Self::max_sentinel()
    }

    /// Largest unsigned `bw`-bit value, `2^bw - 1`.
    pub fn unsigned_max(bw: BitWidth) -> Self {
        assert!(bw > 0, "Bit-width must be positive");
        APInt((BigInt::from(1) << bw as usize) - 1u8)
    }

    /// Smallest unsigned `bw`-bit value, always zero.
    pub fn unsigned_min(bw: BitWidth) -> Self {
        assert!(bw > 0, "Bit-width must be positive");
        Self::zero()
    }

    /// Largest signed `bw`-bit value, `2^(bw-1) - 1`.
    pub fn signed_max(bw: BitWidth) -> Self {
        assert!(bw > 0, "Bit-width must be positive");
        APInt((BigInt::from(1) << (bw - 1) as usize) - 1u8)
    }

    /// Smallest signed `bw`-bit value, `-2^(bw-1)`.
    pub fn signed_min(bw: BitWidth) -> Self {
        assert!(bw > 0, "Bit-width must be positive");
        APInt(-(BigInt::from(1) << (bw - 1) as usize))
    }

    pub fn as_bigint(&self) -> &BigInt {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == BigInt::from(0)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < BigInt::from(0)
    }

    /// Returns -1, 0 or 1 depending on the sign of the value.
    pub fn signum(&self) -> i32 {
        if self.is_negative() {
            -1
        } else if self.is_zero() {
            0
        } else {
            1
        }
    }

    pub fn abs(&self) -> Self {
        if self.is_negative() {
            -self
        } else {
            self.clone()
        }
    }

    /// Tests bit `n` of the two's-complement representation.
    pub fn bit(&self, n: u32) -> bool {
        self.0.bit(n as u64)
    }

    pub fn set_bit(&mut self, n: u32) {
        self.0.set_bit(n as u64, true);
    }

    pub fn clear_bit(&mut self, n: u32) {
        self.0.set_bit(n as u64, false);
    }

    /// Reinterprets the low `bw` bits as a signed (two's-complement) or
    /// unsigned quantity.
    pub fn ext_or_trunc(&self, bw: BitWidth, signed: bool) -> Self {
        assert!(bw > 0, "Bit-width must be positive");
        let modulus = BigInt::from(1) << bw as usize;
        let mask: BigInt = &modulus - 1u8;
        let mut value: BigInt = &self.0 & mask;
        if signed && value.bit((bw - 1) as u64) {
            value -= modulus;
        }
        APInt(value)
    }

    /// In-place variant of [`ext_or_trunc`][Self::ext_or_trunc].
    pub fn ext_or_trunc_mut(&mut self, bw: BitWidth, signed: bool) {
        *self = self.ext_or_trunc(bw, signed);
    }

    pub fn leading_zeros(&self, bw: BitWidth) -> BitWidth {
        let image = self.ext_or_trunc(bw, false);
        (0..bw).rev().take_while(|&i| !image.bit(i)).count() as BitWidth
    }

    pub fn leading_ones(&self, bw: BitWidth) -> BitWidth {
        let image = self.ext_or_trunc(bw, false);
        (0..bw).rev().take_while(|&i| image.bit(i)).count() as BitWidth
    }

    pub fn trailing_zeros(&self, bw: BitWidth) -> BitWidth {
        let image = self.ext_or_trunc(bw, false);
        (0..bw).take_while(|&i| !image.bit(i)).count() as BitWidth
    }

    pub fn trailing_ones(&self, bw: BitWidth) -> BitWidth {
        let image = self.ext_or_trunc(bw, false);
        (0..bw).take_while(|&i| image.bit(i)).count() as BitWidth
    }

    /// Minimum width able to hold the value with the requested signedness.
    ///
    /// A negative value has no unsigned representation; [`MAX_BIT_INT`] is
    /// returned in that case.
    pub fn min_bitwidth(&self, signed: bool) -> BitWidth {
        if signed {
            let magnitude = if self.is_negative() { !&self.0 } else { self.0.clone() };
            magnitude.bits() as BitWidth + 1
        } else if self.is_negative() {
            MAX_BIT_INT
        } else {
            (self.0.bits() as BitWidth).max(1)
        }
    }

    pub fn to_u64(&self) -> Option<u64> {
        u64::try_from(&self.0).ok()
    }

    pub fn to_i64(&self) -> Option<i64> {
        i64::try_from(&self.0).ok()
    }

    /// Converts a non-negative shift amount, saturating very large amounts.
    fn shift_amount(&self) -> usize {
        assert!(!self.is_negative(), "Negative shift amount {}", self);
        self.to_u64().map_or(SHIFT_LIMIT, |n| n.min(SHIFT_LIMIT)) as usize
    }
}

impl fmt::Display for APInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! from_primitive {
    ($($t:ty),*) => {
        $(
            impl From<$t> for APInt {
                fn from(value: $t) -> Self {
                    APInt(BigInt::from(value))
                }
            }
        )*
    };
}

from_primitive!(i32, i64, i128, u32, u64, u128, usize);

impl From<&APInt> for APInt {
    fn from(value: &APInt) -> Self {
        value.clone()
    }
}

impl From<BigInt> for APInt {
    fn from(value: BigInt) -> Self {
        APInt(value)
    }
}

impl PartialEq<i64> for APInt {
    fn eq(&self, other: &i64) -> bool {
        self.0 == BigInt::from(*other)
    }
}

impl PartialOrd<i64> for APInt {
    fn partial_cmp(&self, other: &i64) -> Option<std::cmp::Ordering> {
        self.0.partial_cmp(&BigInt::from(*other))
    }
}

fn add_impl(a: &APInt, b: &APInt) -> APInt {
    APInt(&a.0 + &b.0)
}

fn sub_impl(a: &APInt, b: &APInt) -> APInt {
    APInt(&a.0 - &b.0)
}

fn mul_impl(a: &APInt, b: &APInt) -> APInt {
    APInt(&a.0 * &b.0)
}

fn div_impl(a: &APInt, b: &APInt) -> APInt {
    assert!(!b.is_zero(), "APInt division by zero");
    APInt(&a.0 / &b.0)
}

fn rem_impl(a: &APInt, b: &APInt) -> APInt {
    assert!(!b.is_zero(), "APInt remainder by zero");
    APInt(&a.0 % &b.0)
}

fn and_impl(a: &APInt, b: &APInt) -> APInt {
    APInt(&a.0 & &b.0)
}

fn or_impl(a: &APInt, b: &APInt) -> APInt {
    APInt(&a.0 | &b.0)
}

fn xor_impl(a: &APInt, b: &APInt) -> APInt {
    APInt(&a.0 ^ &b.0)
}

macro_rules! binop {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $f:ident) => {
        impl $trait<&APInt> for &APInt {
            type Output = APInt;
            fn $method(self, rhs: &APInt) -> APInt {
                $f(self, rhs)
            }
        }

        impl $trait<APInt> for &APInt {
            type Output = APInt;
            fn $method(self, rhs: APInt) -> APInt {
                $f(self, &rhs)
            }
        }

        impl $trait<&APInt> for APInt {
            type Output = APInt;
            fn $method(self, rhs: &APInt) -> APInt {
                $f(&self, rhs)
            }
        }

        impl $trait<APInt> for APInt {
            type Output = APInt;
            fn $method(self, rhs: APInt) -> APInt {
                $f(&self, &rhs)
            }
        }

        impl $trait<i64> for &APInt {
            type Output = APInt;
            fn $method(self, rhs: i64) -> APInt {
                $f(self, &APInt::from(rhs))
            }
        }

        impl $trait<i64> for APInt {
            type Output = APInt;
            fn $method(self, rhs: i64) -> APInt {
                $f(&self, &APInt::from(rhs))
            }
        }

        impl $assign_trait<&APInt> for APInt {
            fn $assign_method(&mut self, rhs: &APInt) {
                *self = $f(self, rhs);
            }
        }

        impl $assign_trait<APInt> for APInt {
            fn $assign_method(&mut self, rhs: APInt) {
                *self = $f(self, &rhs);
            }
        }

        impl $assign_trait<i64> for APInt {
            fn $assign_method(&mut self, rhs: i64) {
                *self = $f(self, &APInt::from(rhs));
            }
        }
    };
}

binop!(Add, add, AddAssign, add_assign, add_impl);
binop!(Sub, sub, SubAssign, sub_assign, sub_impl);
binop!(Mul, mul, MulAssign, mul_assign, mul_impl);
binop!(Div, div, DivAssign, div_assign, div_impl);
binop!(Rem, rem, RemAssign, rem_assign, rem_impl);
binop!(BitAnd, bitand, BitAndAssign, bitand_assign, and_impl);
binop!(BitOr, bitor, BitOrAssign, bitor_assign, or_impl);
binop!(BitXor, bitxor, BitXorAssign, bitxor_assign, xor_impl);

impl Neg for &APInt {
    type Output = APInt;
    fn neg(self) -> APInt {
        APInt(-&self.0)
    }
}

impl Neg for APInt {
    type Output = APInt;
    fn neg(self) -> APInt {
        APInt(-self.0)
    }
}

impl Not for &APInt {
    type Output = APInt;
    fn not(self) -> APInt {
        APInt(!&self.0)
    }
}

impl Not for APInt {
    type Output = APInt;
    fn not(self) -> APInt {
        APInt(!self.0)
    }
}

impl Shl<u32> for &APInt {
    type Output = APInt;
    fn shl(self, rhs: u32) -> APInt {
        APInt(&self.0 << (rhs as u64).min(SHIFT_LIMIT) as usize)
    }
}

impl Shl<u32> for APInt {
    type Output = APInt;
    fn shl(self, rhs: u32) -> APInt {
        &self << rhs
    }
}

impl Shr<u32> for &APInt {
    type Output = APInt;
    fn shr(self, rhs: u32) -> APInt {
        APInt(&self.0 >> (rhs as u64).min(SHIFT_LIMIT) as usize)
    }
}

impl Shr<u32> for APInt {
    type Output = APInt;
    fn shr(self, rhs: u32) -> APInt {
        &self >> rhs
    }
}

impl Shl<&APInt> for &APInt {
    type Output = APInt;
    fn shl(self, rhs: &APInt) -> APInt {
        APInt(&self.0 << rhs.shift_amount())
    }
}

impl Shr<&APInt> for &APInt {
    type Output = APInt;
    fn shr(self, rhs: &APInt) -> APInt {
        APInt(&self.0 >> rhs.shift_amount())
    }
}

impl ShlAssign<u32> for APInt {
    fn shl_assign(&mut self, rhs: u32) {
        *self = &*self << rhs;
    }
}

impl ShrAssign<u32> for APInt {
    fn shr_assign(&mut self, rhs: u32) {
        *self = &*self >> rhs;
    }
}
