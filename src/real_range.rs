//! IEEE-754 bit patterns as three independent integer ranges.
//!
//! A [`RealRange`] tracks the sign, the biased exponent and the significand
//! fields of a 32-bit or 64-bit floating-point value. Nothing here evaluates
//! floating-point arithmetic: the fields are only moved between formats,
//! compared for equality or joined/met componentwise.

use std::cmp::{max, min};
use std::fmt;

use crate::apint::APInt;
use crate::bit_lattice::{self, BitString};
use crate::range::{Range, RangeType};
use crate::types::BitWidth;

/// Width of the exponent and significand fields for a given format width.
pub fn field_widths(bw: BitWidth) -> (BitWidth, BitWidth) {
    match bw {
        32 => (8, 23),
        64 => (11, 52),
        _ => panic!("Unsupported floating-point width {}", bw),
    }
}

/// Exponent re-bias between single and double precision (1023 - 127).
const EXPONENT_REBIAS: i64 = 896;
/// Significand alignment between single and double precision (52 - 23).
const SIGNIFICAND_SHIFT: i64 = 29;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct RealRange {
    sign: Range,
    exponent: Range,
    significand: Range,
}

impl RealRange {
    pub fn new(sign: Range, exponent: Range, significand: Range) -> Self {
        assert_eq!(sign.bit_width(), 1, "Sign field must be one bit wide");
        let total = sign.bit_width() + exponent.bit_width() + significand.bit_width();
        assert!(
            total == 32 || total == 64,
            "Invalid floating-point field widths (total {})",
            total
        );
        Self { sign, exponent, significand }
    }

    /// Every component of kind `ty` (Regular means full).
    pub fn with_type(ty: RangeType, bw: BitWidth) -> Self {
        let (e, s) = field_widths(bw);
        Self::new(Range::with_type(ty, 1), Range::with_type(ty, e), Range::with_type(ty, s))
    }

    pub fn full(bw: BitWidth) -> Self {
        Self::with_type(RangeType::Regular, bw)
    }

    pub fn unknown(bw: BitWidth) -> Self {
        Self::with_type(RangeType::Unknown, bw)
    }

    pub fn empty(bw: BitWidth) -> Self {
        Self::with_type(RangeType::Empty, bw)
    }

    /// Splits the range of a 32/64-bit pattern into its three fields.
    pub fn from_view_convert(vc: &Range) -> Self {
        let bw = vc.bit_width();
        let (e, s) = field_widths(bw);
        let sign = vc.slt(&Range::constant(bw, 0), 1);
        let exponent = vc.shr(&Range::constant(bw, s), false).zext_or_trunc(e);
        let significand = vc.zext_or_trunc(s);
        Self::new(sign, exponent, significand)
    }

    /// The exact real range of a known bit pattern.
    pub fn from_bit_values(bits: &BitString) -> Self {
        let bw = bits.len() as BitWidth;
        let (e, _) = field_widths(bw);
        let e = e as usize;
        let sign_bits: BitString = bits.iter().take(1).copied().collect();
        let exp_bits: BitString = bits.iter().skip(1).take(e).copied().collect();
        let sig_bits: BitString = bits.iter().skip(1 + e).copied().collect();
        let exp_bw = exp_bits.len() as BitWidth;
        let sig_bw = sig_bits.len() as BitWidth;
        Self::new(
            Range::from_bit_values(&sign_bits, 1, false),
            Range::from_bit_values(&exp_bits, exp_bw, true),
            Range::from_bit_values(&sig_bits, sig_bw, true),
        )
    }

    pub fn sign(&self) -> &Range {
        &self.sign
    }

    pub fn exponent(&self) -> &Range {
        &self.exponent
    }

    pub fn significand(&self) -> &Range {
        &self.significand
    }

    pub fn bit_width(&self) -> BitWidth {
        self.sign.bit_width() + self.exponent.bit_width() + self.significand.bit_width()
    }

    /// Recomposed bit pattern as an integer range.
    pub fn range(&self) -> Range {
        let bw = self.bit_width();
        let (_, s) = field_widths(bw);
        let sign = self.sign.zext_or_trunc(bw).shl(&Range::constant(bw, bw - 1));
        let exponent = self.exponent.zext_or_trunc(bw).shl(&Range::constant(bw, s));
        self.significand.zext_or_trunc(bw).bit_or(&exponent).bit_or(&sign)
    }

    /// Known bits of the pattern: the sign, then each field padded to its width.
    pub fn bit_values(&self) -> BitString {
        let mut bits: BitString = self.sign.bit_values(true).iter().take(1).copied().collect();
        for field in [&self.exponent, &self.significand] {
            let width = field.bit_width() as usize;
            let mut field_bits = field.bit_values(true);
            if field_bits.len() < width {
                field_bits = bit_lattice::sign_extend(&field_bits, true, width);
            }
            bits.extend(field_bits);
        }
        assert_eq!(bits.len(), self.bit_width() as usize);
        bits
    }

    fn zip(&self, other: &RealRange, f: impl Fn(&Range, &Range) -> Range) -> RealRange {
        RealRange::new(
            f(&self.sign, &other.sign),
            f(&self.exponent, &other.exponent),
            f(&self.significand, &other.significand),
        )
    }

    pub fn get_anti(&self) -> RealRange {
        RealRange::new(self.sign.get_anti(), self.exponent.get_anti(), self.significand.get_anti())
    }

    pub fn intersect_with(&self, other: &RealRange) -> RealRange {
        self.zip(other, Range::intersect_with)
    }

    pub fn union_with(&self, other: &RealRange) -> RealRange {
        self.zip(other, Range::union_with)
    }

    fn components(&self) -> [&Range; 3] {
        [&self.sign, &self.exponent, &self.significand]
    }

    pub fn is_empty(&self) -> bool {
        self.components().iter().any(|r| r.is_empty())
    }

    pub fn is_unknown(&self) -> bool {
        self.components().iter().any(|r| r.is_unknown())
    }

    pub fn is_full_set(&self) -> bool {
        self.components().iter().all(|r| r.is_full_set())
    }

    pub fn is_single_element(&self) -> bool {
        self.components().iter().all(|r| r.is_single_element())
    }

    pub fn is_constant(&self) -> bool {
        self.components().iter().all(|r| r.is_constant())
    }

    pub fn is_same_range(&self, other: &RealRange) -> bool {
        self == other
    }

    pub fn is_anti(&self) -> bool {
        self.components().iter().any(|r| r.is_anti())
    }

    pub fn set_unknown(&mut self) {
        *self = RealRange::unknown(self.bit_width());
    }

    /// Clears the sign bit.
    pub fn abs(&self) -> RealRange {
        RealRange::new(Range::constant(1, 0), self.exponent.clone(), self.significand.clone())
    }

    /// Flips a known sign; an unknown sign stays unknown.
    pub fn negate(&self) -> RealRange {
        if self.sign.is_anti() || self.sign.is_constant() {
            let flipped = if self.sign.unsigned_min().is_zero() { 1 } else { 0 };
            return RealRange::new(
                Range::constant(1, flipped),
                self.exponent.clone(),
                self.significand.clone(),
            );
        }
        self.clone()
    }

    /// 1-bit range telling whether the value may be +0 or -0.
    fn zero_contained(&self) -> Range {
        let zero_exp = self.exponent.equal(&Range::constant(self.exponent.bit_width(), 0), 1);
        let zero_sig = self.significand.equal(&Range::constant(self.significand.bit_width(), 0), 1);
        zero_exp.bit_and(&zero_sig)
    }

    /// IEEE equality of bit patterns, where +0 equals -0.
    pub fn equal(&self, other: &RealRange, bw: BitWidth) -> Range {
        let both_zero = self.zero_contained().bit_and(&other.zero_contained());
        if !both_zero.is_constant() || !both_zero.unsigned_min().is_zero() {
            return both_zero.zext_or_trunc(bw);
        }
        self.sign
            .equal(&other.sign, 1)
            .bit_and(&self.exponent.equal(&other.exponent, 1))
            .bit_and(&self.significand.equal(&other.significand, 1))
            .zext_or_trunc(bw)
    }

    pub fn not_equal(&self, other: &RealRange, bw: BitWidth) -> Range {
        self.equal(other, 1).bit_not().zext_or_trunc(bw)
    }

    /// Widens a single-precision pattern to double precision.
    pub fn to_float64(&self) -> RealRange {
        if self.bit_width() == 64 {
            return self.clone();
        }
        let exponent = if self.exponent.is_empty() || self.exponent.is_unknown() {
            Range::with_type(self.exponent.range_type(), 11)
        } else if self.exponent.is_constant() && self.exponent.unsigned_min().is_zero() {
            Range::constant(11, 0)
        } else if self.exponent.is_full_set() || self.exponent.is_anti() {
            Range::full(11)
        } else if self.exponent.unsigned_max() == APInt::unsigned_max(8) {
            // Infinity and NaN keep an all-ones exponent.
            if self.exponent.is_constant() {
                Range::constant(11, -1)
            } else {
                Range::full(11)
            }
        } else {
            let lo = (self.exponent.unsigned_min() + EXPONENT_REBIAS).ext_or_trunc(11, true);
            let hi = (self.exponent.unsigned_max() + EXPONENT_REBIAS).ext_or_trunc(11, true);
            Range::regular(11, lo, hi)
        };
        let significand = self.significand.zext_or_trunc(52).shl(&Range::constant(
            52,
            SIGNIFICAND_SHIFT,
        ));
        RealRange::new(self.sign.clone(), exponent, significand)
    }

    /// Narrows a double-precision pattern to single precision, saturating
    /// the exponent to zero or infinity.
    pub fn to_float32(&self) -> RealRange {
        if self.bit_width() == 32 {
            return self.clone();
        }
        let mut significand = self.significand.shr(
            &Range::constant(52, SIGNIFICAND_SHIFT),
            false,
        ).zext_or_trunc(23);
        if self.exponent.is_empty() || self.exponent.is_unknown() {
            let exponent = Range::with_type(self.exponent.range_type(), 8);
            return RealRange::new(self.sign.clone(), exponent, significand);
        }
        if self.exponent.is_anti() {
            return RealRange::new(self.sign.clone(), Range::full(8), significand);
        }
        if self.exponent.unsigned_max() == APInt::unsigned_max(11) {
            // Infinity and NaN keep an all-ones exponent.
            let exponent = if self.exponent.is_constant() { Range::constant(
                8,
                -1,
            ) } else { Range::full(8) };
            return RealRange::new(self.sign.clone(), exponent, significand);
        }
        let max_exp = APInt::unsigned_max(8);
        let lo = self.exponent.unsigned_min() - EXPONENT_REBIAS;
        let hi = self.exponent.unsigned_max() - EXPONENT_REBIAS;
        let exponent = if lo < 0 && hi > max_exp {
            Range::full(8)
        } else if self.exponent.is_constant() && lo < 0 {
            Range::constant(8, 0)
        } else if self.exponent.is_constant() && hi >= max_exp {
            significand = Range::constant(23, 0);
            Range::constant(8, -1)
        } else {
            let lo = max(lo, APInt::zero()).ext_or_trunc(8, true);
            let hi = min(hi, max_exp).ext_or_trunc(8, true);
            Range::regular(8, lo, hi)
        };
        RealRange::new(self.sign.clone(), exponent, significand)
    }
}

impl fmt::Display for RealRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ {}, {}, {}, {}]", self.sign, self.exponent, self.significand, self.bit_width())
    }
}
