//! Fixed-width integer ranges.
//!
//! A [`Range`] abstracts the set of values a `bw`-bit integer may take. It is
//! one of four kinds:
//!
//! - **Regular** `[l, u]`: every value between the bounds.
//! - **Anti** `)l, u(`: every value *except* those in the hole `[l, u]`.
//! - **Empty**: no value at all (unreachable code, impossible conditions).
//! - **Unknown**: not computed yet; absorbs every operation.
//!
//! Bounds are kept as signed values of the range's bit-width. The two
//! sentinels [`APInt::min_sentinel`] and [`APInt::max_sentinel`] stand for
//! minus and plus infinity; a Regular range built with
//! [`Range::with_type`] carries them and denotes the full set.
//!
//! Every constructor normalizes its bounds, so that results of arithmetic
//! that left the representable window wrap around exactly like machine
//! integers do. Transfer functions are all over-approximations: for any
//! `x` in `a` and `y` in `b`, `a.add(&b)` contains `x + y` (mod `2^bw`).

use std::cmp::{max, min};
use std::fmt;

use crate::apint::{APInt, MAX_BIT_INT};
use crate::bit_lattice::{self, BitString, BitValue};
use crate::predicate::Predicate;
use crate::types::BitWidth;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RangeType {
    Empty,
    Unknown,
    Regular,
    Anti,
}

/// Integer interval over a fixed bit-width.
///
/// Equality is structural: two ranges are equal iff they have the same
/// kind, width and bounds.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Range {
    ty: RangeType,
    bw: BitWidth,
    l: APInt,
    u: APInt,
}

fn normalize(ty: RangeType, bw: BitWidth, lb: APInt, ub: APInt) -> (RangeType, APInt, APInt) {
    let min_sentinel = APInt::min_sentinel();
    let max_sentinel = APInt::max_sentinel();
    let min_s = APInt::signed_min(bw);
    let max_s = APInt::signed_max(bw);
    let max_u = APInt::unsigned_max(bw);
    let full = (RangeType::Regular, min_s.clone(), max_s.clone());

    match ty {
        RangeType::Anti => {
            if lb > ub {
                return normalize(RangeType::Regular, bw, ub + 1, lb - 1);
            }
            if lb == min_sentinel && ub == max_sentinel {
                return (RangeType::Empty, min_sentinel, max_sentinel);
            }
            if lb == min_sentinel {
                return normalize(RangeType::Regular, bw, ub + 1, max_sentinel);
            }
            if ub == max_sentinel {
                return normalize(RangeType::Regular, bw, min_sentinel, lb - 1);
            }
            if &ub - &lb >= max_u {
                // A hole spanning exactly the window removes everything.
                if lb == min_s && ub == max_s {
                    return (RangeType::Empty, min_sentinel, max_sentinel);
                }
                return full;
            }
            let l = lb.ext_or_trunc(bw, true);
            let u = ub.ext_or_trunc(bw, true);
            if l <= u {
                (RangeType::Anti, l, u)
            } else {
                // The hole wraps around; what is left is contiguous.
                (RangeType::Regular, u + 1, l - 1)
            }
        }
        RangeType::Regular => {
            if &lb - 1 == ub {
                return full;
            }
            if lb > ub {
                return normalize(RangeType::Anti, bw, ub + 1, lb - 1);
            }
            if lb == min_sentinel && ub == max_sentinel {
                return full;
            }
            if ub == max_sentinel {
                return if lb < min_s {
                    full
                } else if lb <= max_s {
                    (RangeType::Regular, lb, max_s)
                } else if lb <= max_u {
                    (RangeType::Regular, lb.ext_or_trunc(bw, true), APInt::from(-1))
                } else {
                    full
                };
            }
            if lb == min_sentinel {
                return if ub < min_s {
                    full
                } else if ub <= max_s {
                    (RangeType::Regular, min_s, ub)
                } else if ub < max_u {
                    (RangeType::Anti, ub.ext_or_trunc(bw, true) + 1, APInt::from(-1))
                } else {
                    full
                };
            }
            if &ub - &lb >= max_u {
                return full;
            }
            let l = lb.ext_or_trunc(bw, true);
            let u = ub.ext_or_trunc(bw, true);
            if l <= u {
                (RangeType::Regular, l, u)
            } else {
                (RangeType::Anti, u + 1, l - 1)
            }
        }
        RangeType::Empty | RangeType::Unknown => (ty, min_sentinel, max_sentinel),
    }
}

fn print_bound(f: &mut fmt::Formatter<'_>, v: &APInt) -> fmt::Result {
    if v.is_min_sentinel() {
        f.write_str("-inf")
    } else if v.is_max_sentinel() {
        f.write_str("+inf")
    } else {
        write!(f, "{}", v)
    }
}

impl Range {
    /// Builds a normalized range of kind `ty`.
    ///
    /// Bounds are ignored for Empty and Unknown.
    pub fn new(ty: RangeType, bw: BitWidth, lb: impl Into<APInt>, ub: impl Into<APInt>) -> Self {
        assert!(bw > 0 && bw <= MAX_BIT_INT, "Invalid bit-width {}", bw);
        Self::build(ty, bw, lb.into(), ub.into())
    }

    /// Same as [`new`][Self::new] but accepts widths up to `2 * MAX_BIT_INT`,
    /// for intermediate products.
    fn build(ty: RangeType, bw: BitWidth, lb: APInt, ub: APInt) -> Self {
        assert!(bw > 0 && bw <= 2 * MAX_BIT_INT, "Invalid bit-width {}", bw);
        let (ty, l, u) = normalize(ty, bw, lb, ub);
        Range { ty, bw, l, u }
    }

    /// A range of kind `ty` without bounds: for Regular, the full set.
    pub fn with_type(ty: RangeType, bw: BitWidth) -> Self {
        assert!(bw > 0 && bw <= MAX_BIT_INT, "Invalid bit-width {}", bw);
        assert!(ty != RangeType::Anti, "Anti-range needs bounds");
        Range {
            ty,
            bw,
            l: APInt::min_sentinel(),
            u: APInt::max_sentinel(),
        }
    }

    pub fn full(bw: BitWidth) -> Self {
        Self::with_type(RangeType::Regular, bw)
    }

    pub fn empty(bw: BitWidth) -> Self {
        Self::with_type(RangeType::Empty, bw)
    }

    pub fn unknown(bw: BitWidth) -> Self {
        Self::with_type(RangeType::Unknown, bw)
    }

    pub fn regular(bw: BitWidth, lb: impl Into<APInt>, ub: impl Into<APInt>) -> Self {
        Self::new(RangeType::Regular, bw, lb, ub)
    }

    pub fn anti(bw: BitWidth, lb: impl Into<APInt>, ub: impl Into<APInt>) -> Self {
        Self::new(RangeType::Anti, bw, lb, ub)
    }

    pub fn constant(bw: BitWidth, value: impl Into<APInt>) -> Self {
        let value = value.into();
        Self::new(RangeType::Regular, bw, value.clone(), value)
    }

    /// 1-bit style boolean result: `[1,1]`, `[0,0]`, or `[0,1]` when unsure.
    pub fn boolean(bw: BitWidth, value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::regular(bw, 1, 1),
            Some(false) => Self::regular(bw, 0, 0),
            None => Self::regular(bw, 0, 1),
        }
    }

    pub fn range_type(&self) -> RangeType {
        self.ty
    }

    pub fn bit_width(&self) -> BitWidth {
        self.bw
    }

    pub fn lower(&self) -> &APInt {
        assert!(!self.is_anti(), "Lower bound of an anti-range");
        &self.l
    }

    pub fn upper(&self) -> &APInt {
        assert!(!self.is_anti(), "Upper bound of an anti-range");
        &self.u
    }

    pub fn is_empty(&self) -> bool {
        self.ty == RangeType::Empty
    }

    pub fn is_unknown(&self) -> bool {
        self.ty == RangeType::Unknown
    }

    pub fn is_regular(&self) -> bool {
        self.ty == RangeType::Regular
    }

    pub fn is_anti(&self) -> bool {
        self.ty == RangeType::Anti
    }

    pub fn is_full_set(&self) -> bool {
        assert!(!self.is_unknown(), "Full-set query on an unknown range");
        if self.is_empty() || self.is_anti() {
            return false;
        }
        APInt::signed_max(self.bw) <= self.u && APInt::signed_min(self.bw) >= self.l
    }

    pub fn is_single_element(&self) -> bool {
        !self.is_unknown() && !self.is_empty() && self.l == self.u
    }

    pub fn is_constant(&self) -> bool {
        self.is_regular() && self.l == self.u
    }

    pub fn is_same_range(&self, other: &Range) -> bool {
        self == other
    }

    pub fn is_same_type(&self, other: &Range) -> bool {
        self.ty == other.ty
    }

    /// Membership of a concrete value, taken modulo `2^bw`.
    pub fn contains(&self, value: &APInt) -> bool {
        let v = value.ext_or_trunc(self.bw, true);
        match self.ty {
            RangeType::Empty => false,
            RangeType::Unknown => true,
            RangeType::Regular => self.l <= v && v <= self.u,
            RangeType::Anti => !(self.l <= v && v <= self.u),
        }
    }

    pub fn signed_max(&self) -> APInt {
        let max_s = APInt::signed_max(self.bw);
        if self.is_regular() {
            min(self.u.clone(), max_s)
        } else {
            max_s
        }
    }

    pub fn signed_min(&self) -> APInt {
        let min_s = APInt::signed_min(self.bw);
        if self.is_regular() {
            max(self.l.clone(), min_s)
        } else {
            min_s
        }
    }

    pub fn unsigned_max(&self) -> APInt {
        if self.is_anti() {
            let below = &self.l - 1;
            let above = &self.u + 1;
            if below >= 0 || above < 0 {
                APInt::unsigned_max(self.bw)
            } else {
                below.ext_or_trunc(self.bw, false)
            }
        } else if self.u < 0 || self.l >= 0 {
            self.u.ext_or_trunc(self.bw, false)
        } else {
            APInt::unsigned_max(self.bw)
        }
    }

    pub fn unsigned_min(&self) -> APInt {
        if self.is_anti() {
            if self.l > 0 || self.u < 0 {
                APInt::zero()
            } else {
                &self.u + 1
            }
        } else if self.l > 0 || self.u < 0 {
            self.l.ext_or_trunc(self.bw, false)
        } else {
            APInt::zero()
        }
    }

    /// Number of values in the range.
    pub fn span(&self) -> APInt {
        let max_u = APInt::unsigned_max(self.bw);
        if self.is_empty() {
            return APInt::zero();
        }
        if self.is_unknown() || self.is_full_set() {
            return max_u + 1;
        }
        if self.is_anti() {
            return max_u - (&self.u - &self.l);
        }
        let u = if self.u.is_max_sentinel() { APInt::signed_max(self.bw) } else { self.u.clone() };
        let l = if self.l.is_min_sentinel() { APInt::signed_min(self.bw) } else { self.l.clone() };
        u - l + 1
    }

    /// Complement: Regular and Anti swap, Empty becomes full.
    pub fn get_anti(&self) -> Range {
        match self.ty {
            RangeType::Anti => Range::regular(self.bw, &self.l, &self.u),
            RangeType::Regular => Range::anti(self.bw, &self.l, &self.u),
            RangeType::Empty => Range::full(self.bw),
            RangeType::Unknown => self.clone(),
        }
    }

    /// Bits needed to hold both values.
    pub fn needed_bits(a: &APInt, b: &APInt, signed: bool) -> BitWidth {
        max(a.min_bitwidth(signed), b.min_bitwidth(signed))
    }

    /// Range described by a bitstring of known/unknown bits.
    pub fn from_bit_values(bits: &BitString, bw: BitWidth, signed: bool) -> Range {
        assert!(!bits.is_empty(), "Empty bitstring");
        assert!(bits.len() <= bw as usize, "Bitstring longer than bit-width");
        let mut max_bits = bits.clone();
        let mut min_bits = bits.clone();
        for (i, (hi, lo)) in max_bits.iter_mut().zip(min_bits.iter_mut()).enumerate() {
            if !hi.is_undetermined() {
                continue;
            }
            if i == 0 {
                *hi = if signed { BitValue::Zero } else { BitValue::One };
                *lo = if signed { BitValue::One } else { BitValue::Zero };
            } else {
                *hi = BitValue::One;
                *lo = BitValue::Zero;
            }
        }
        if bits.len() < bw as usize {
            max_bits = bit_lattice::sign_extend(&max_bits, signed, bw as usize);
            min_bits = bit_lattice::sign_extend(&min_bits, signed, bw as usize);
        }
        let value_of = |bs: &BitString| {
            let raw = bs.iter().fold(APInt::zero(), |acc, b| {
                let acc = acc << 1;
                if *b == BitValue::One {
                    acc + 1
                } else {
                    acc
                }
            });
            raw.ext_or_trunc(bw, signed)
        };
        let (lo, hi) = (value_of(&min_bits), value_of(&max_bits));
        assert!(lo <= hi, "Inverted bit values {} > {}", lo, hi);
        Range::regular(bw, lo, hi)
    }

    /// Bits common to every member, `U` where members disagree.
    pub fn bit_values(&self, signed: bool) -> BitString {
        let len = self.bw as usize;
        if self.is_empty() || self.is_anti() || self.is_unknown() {
            return bit_lattice::u_bitstring(len);
        }
        if self.is_constant() {
            let value = if signed { self.signed_min() } else { self.unsigned_min() };
            return bit_lattice::bitstring_from_constant(&value, len, signed);
        }
        let (lo, hi) = if signed {
            (self.signed_min(), self.signed_max())
        } else {
            (self.unsigned_min(), self.unsigned_max())
        };
        let mut lo_bits = bit_lattice::bitstring_from_constant(&lo, len, signed);
        let mut hi_bits = bit_lattice::bitstring_from_constant(&hi, len, signed);
        if lo_bits.len() < hi_bits.len() {
            lo_bits = bit_lattice::sign_extend(&lo_bits, signed, hi_bits.len());
        } else if hi_bits.len() < lo_bits.len() {
            hi_bits = bit_lattice::sign_extend(&hi_bits, signed, lo_bits.len());
        }
        let mut res: BitString = lo_bits
            .iter()
            .zip(hi_bits.iter())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| *a)
            .collect();
        while res.len() < lo_bits.len() {
            res.push_back(BitValue::U);
        }
        bit_lattice::sign_reduce(&mut res, signed);
        res
    }

    fn trivial_binary(&self, other: &Range, bw: BitWidth) -> Option<Range> {
        if self.is_empty() || other.is_empty() {
            Some(Range::empty(bw))
        } else if self.is_unknown() || other.is_unknown() {
            Some(Range::unknown(bw))
        } else {
            None
        }
    }

    pub fn add(&self, other: &Range) -> Range {
        let bw = self.bw;
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        if self.is_full_set() || other.is_full_set() {
            return Range::full(bw);
        }
        if self.is_anti() && other.is_constant() {
            return self.shift_anti(&other.l);
        }
        if other.is_anti() && self.is_constant() {
            return other.shift_anti(&self.l);
        }
        if self.is_anti() || other.is_anti() {
            return Range::full(bw);
        }
        if other.is_constant() {
            return Range::regular(bw, &self.l + &other.l, &self.u + &other.l);
        }
        if self.is_constant() {
            return Range::regular(bw, &other.l + &self.l, &other.u + &self.l);
        }
        let res = Range::regular(bw, &self.l + &other.l, &self.u + &other.u);
        if res.span() <= self.span() || res.span() <= other.span() {
            Range::full(bw)
        } else {
            res
        }
    }

    /// Moves the hole of an anti-range by `offset`.
    fn shift_anti(&self, offset: &APInt) -> Range {
        if offset >= &(APInt::max_sentinel() - &self.u)
            || &self.l <= &(APInt::min_sentinel() - offset)
        {
            return Range::full(self.bw);
        }
        Range::anti(self.bw, &self.l + offset, &self.u + offset)
    }

    pub fn sub(&self, other: &Range) -> Range {
        let bw = self.bw;
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        if self.is_full_set() || other.is_full_set() {
            return Range::full(bw);
        }
        if self.is_anti() && other.is_constant() {
            return self.shift_anti(&-&other.l);
        }
        if self.is_anti() || other.is_anti() {
            return Range::full(bw);
        }
        if other.is_constant() {
            return Range::regular(bw, &self.l - &other.l, &self.u - &other.l);
        }
        let res = Range::regular(bw, &self.l - &other.u, &self.u - &other.l);
        if res.span() < self.span() || res.span() < other.span() {
            Range::full(bw)
        } else {
            res
        }
    }

    pub fn mul(&self, other: &Range) -> Range {
        let bw = self.bw;
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        if self.is_full_set() || other.is_full_set() || self.is_anti() || other.is_anti() {
            return Range::full(bw);
        }
        let wide = 2 * bw;
        let unsigned = Range::build(
            RangeType::Regular,
            wide,
            self.unsigned_min() * other.unsigned_min(),
            self.unsigned_max() * other.unsigned_max(),
        )
        .truncate(bw);

        let (a, b) = (self.signed_min(), self.signed_max());
        let (c, d) = (other.signed_min(), other.signed_max());
        let corners = [&a * &c, &a * &d, &b * &c, &b * &d];
        let lo = corners.iter().min().cloned().unwrap_or_default();
        let hi = corners.iter().max().cloned().unwrap_or_default();
        let signed = Range::build(RangeType::Regular, wide, lo, hi).truncate(bw);

        if unsigned.span() < signed.span() {
            unsigned
        } else {
            signed
        }
    }

    pub fn udiv(&self, other: &Range) -> Range {
        let bw = self.bw;
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        if self.is_full_set() {
            return Range::full(bw);
        }
        let (a, b) = (self.unsigned_min(), self.unsigned_max());
        let (mut c, d) = (other.unsigned_min(), other.unsigned_max());
        if c.is_zero() && d.is_zero() {
            return Range::full(bw);
        }
        if c.is_zero() {
            c = APInt::one();
        }
        Range::regular(bw, a / d, b / c)
    }

    pub fn sdiv(&self, other: &Range) -> Range {
        let bw = self.bw;
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        if self.is_full_set() || self.is_anti() {
            return Range::full(bw);
        }
        let (a, b) = (self.l.clone(), self.u.clone());
        let (c1, d1, c2, d2, split) = if other.is_anti() {
            let mut below = &other.l - 1;
            if below.is_zero() {
                below = APInt::from(-1);
            } else if below > 0 {
                return Range::full(bw);
            }
            let mut above = &other.u + 1;
            if above.is_zero() {
                above = APInt::one();
            } else if above < 0 {
                return Range::full(bw);
            }
            (APInt::min_sentinel(), below, above, APInt::max_sentinel(), true)
        } else {
            let (mut lo, mut hi) = (other.l.clone(), other.u.clone());
            if lo.is_zero() && hi.is_zero() {
                return Range::full(bw);
            }
            // Divisor ranges straddling zero are split into a negative and a
            // positive part; zero itself is skipped.
            let zero_in = lo < 0 && hi > 0;
            let mut pos_lo = other.l.clone();
            if zero_in {
                hi = APInt::from(-1);
                pos_lo = APInt::one();
            } else if pos_lo.is_zero() {
                lo = APInt::one();
                pos_lo = APInt::one();
            }
            let mut pos_hi = other.u.clone();
            if pos_hi.is_zero() {
                hi = APInt::from(-1);
                pos_hi = APInt::from(-1);
            }
            (lo, hi, pos_lo, pos_hi, zero_in)
        };

        let mut candidates = vec![div_bound(
            &a,
            &c1,
        ), div_bound(&a, &d1), div_bound(&b, &c1), div_bound(&b, &d1)];
        if split {
            candidates.extend([div_bound(
                &a,
                &c2,
            ), div_bound(&a, &d2), div_bound(&b, &c2), div_bound(&b, &d2)]);
        }
        let lo = candidates.iter().min().cloned().unwrap_or_default();
        let hi = candidates.iter().max().cloned().unwrap_or_default();
        Range::regular(bw, lo, hi)
    }

    pub fn urem(&self, other: &Range) -> Range {
        let bw = self.bw;
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        if self.is_anti() || other.is_anti() {
            return Range::full(bw);
        }
        if other.is_constant() {
            if other.l.is_zero() {
                return Range::empty(bw);
            }
            if other.unsigned_min() == 1 {
                return Range::constant(bw, 0);
            }
        }
        let (a, b) = (self.unsigned_min(), self.unsigned_max());
        let (mut c, d) = (other.unsigned_min(), other.unsigned_max());
        if c.is_zero() && d.is_zero() {
            return Range::full(bw);
        }
        if c.is_zero() {
            c = APInt::one();
        }
        let below = |x: &APInt, y: &APInt, otherwise: APInt| {
            if x < y {
                x.clone()
            } else {
                otherwise
            }
        };
        let candidates = [
            below(&a, &c, APInt::zero()),
            below(&a, &d, APInt::zero()),
            below(&b, &c, APInt::zero()),
            below(&b, &d, APInt::zero()),
            below(&a, &c, &c - 1),
            below(&a, &d, &d - 1),
            below(&b, &c, &c - 1),
            below(&b, &d, &d - 1),
        ];
        let lo = candidates.iter().min().cloned().unwrap_or_default();
        let hi = candidates.iter().max().cloned().unwrap_or_default();
        Range::regular(bw, lo, hi)
    }

    /// Signed remainder. The result takes the sign of the dividend and its
    /// magnitude stays below the largest divisor magnitude.
    pub fn srem(&self, other: &Range) -> Range {
        let bw = self.bw;
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        if self.is_full_set() || self.is_anti() || other.is_anti() {
            return Range::full(bw);
        }
        if other.is_constant() {
            let divisor = other.signed_min();
            if divisor.is_zero() {
                return Range::empty(bw);
            }
            if divisor == 1 || divisor == -1 {
                return Range::constant(bw, 0);
            }
            if self.is_constant() {
                return Range::constant(bw, self.signed_min() % divisor);
            }
        }
        let (a, b) = (self.signed_min(), self.signed_max());
        let (c, d) = (other.signed_min(), other.signed_max());
        if c.is_zero() && d.is_zero() {
            return Range::full(bw);
        }
        if c > 0 || d < 0 {
            let smallest = min(c.abs(), d.abs());
            if max(a.abs(), b.abs()) < smallest {
                return self.clone();
            }
        }
        let limit = max(c.abs(), d.abs()) - 1;
        let lo = if a >= 0 { APInt::zero() } else { max(a, -&limit) };
        let hi = if b <= 0 { APInt::zero() } else { min(b, limit) };
        Range::regular(bw, lo, hi)
    }

    pub fn shl(&self, other: &Range) -> Range {
        let bw = self.bw;
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        if self.is_full_set() || other.is_full_set() || self.is_anti() || other.is_anti() {
            return Range::full(bw);
        }
        if self.is_constant() && other.is_constant() {
            let shifted = &self.l << &other.unsigned_min();
            return Range::constant(bw, shifted.ext_or_trunc(bw, true));
        }
        let (a, b) = (self.l.clone(), self.u.clone());
        let (c, d) = (other.unsigned_min(), other.unsigned_max());
        let width = APInt::from(bw);
        if c >= width {
            return Range::constant(bw, 0);
        }
        if d >= width {
            return Range::full(bw);
        }
        let headroom = |x: u32| d > APInt::from(x);
        if a < 0 && b < 0 {
            if headroom(a.leading_ones(bw)) {
                return Range::full(bw);
            }
            return Range::regular(bw, &a << &d, &b << &c);
        }
        if a < 0 {
            if headroom(min(a.leading_ones(bw), b.leading_zeros(bw))) {
                return Range::full(bw);
            }
            return Range::regular(bw, &a << &d, &b << &d);
        }
        if headroom(b.leading_zeros(bw)) {
            return Range::full(bw);
        }
        Range::regular(bw, &a << &c, &b << &d)
    }

    /// Right shift, arithmetic when `signed`.
    pub fn shr(&self, other: &Range, signed: bool) -> Range {
        let bw = self.bw;
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        if self.is_anti() || other.is_anti() {
            return Range::full(bw);
        }
        let (c, d) = (other.unsigned_min(), other.unsigned_max());
        if signed {
            let (a, b) = (self.signed_min(), self.signed_max());
            let lo = if a >= 0 { &a >> &d } else { &a >> &c };
            let hi = if b >= 0 { &b >> &c } else { &b >> &d };
            Range::regular(bw, lo, hi)
        } else {
            Range::regular(bw, &self.unsigned_min() >> &d, &self.unsigned_max() >> &c)
        }
    }

    /// Bounds used by the bitwise operations; holes are ignored.
    fn bitwise_bounds(&self) -> (APInt, APInt) {
        if self.is_anti() {
            (APInt::min_sentinel(), APInt::max_sentinel())
        } else {
            (self.l.clone(), self.u.clone())
        }
    }

    pub fn bit_or(&self, other: &Range) -> Range {
        let bw = self.bw;
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        if self.is_constant() && self.signed_max().is_zero() {
            return other.clone();
        }
        if other.is_constant() && other.signed_max().is_zero() {
            return self.clone();
        }
        let (a, b) = self.bitwise_bounds();
        let (c, d) = other.bitwise_bounds();
        let (lo, hi) = signed_or(&a, &b, &c, &d);
        Range::regular(bw, lo, hi)
    }

    pub fn bit_and(&self, other: &Range) -> Range {
        let bw = self.bw;
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        if self.is_constant() && self.signed_max() == -1 {
            return other.clone();
        }
        if other.is_constant() && other.signed_max() == -1 {
            return self.clone();
        }
        let (a, b) = self.bitwise_bounds();
        let (c, d) = other.bitwise_bounds();
        let (lo, hi) = signed_and(&a, &b, &c, &d);
        Range::regular(bw, lo, hi)
    }

    pub fn bit_xor(&self, other: &Range) -> Range {
        let bw = self.bw;
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        let (a, b) = self.bitwise_bounds();
        let (c, d) = other.bitwise_bounds();
        if a >= 0 && b >= 0 && c >= 0 && d >= 0 {
            return Range::regular(bw, min_xor(&a, &b, &c, &d), max_xor(&a, &b, &c, &d));
        }
        // x ^ -1 == -1 - x
        if a == -1 && b == -1 && c >= 0 && d >= 0 {
            return self.sub(other);
        }
        if c == -1 && d == -1 && a >= 0 && b >= 0 {
            return other.sub(self);
        }
        Range::full(bw)
    }

    pub fn bit_not(&self) -> Range {
        if self.is_empty() || self.is_unknown() {
            return self.clone();
        }
        Range::new(self.ty, self.bw, !&self.u, !&self.l)
    }

    /// Ranges to compare for (in)equality; `None` when the answer is surely `[0,1]`.
    fn equality(&self, other: &Range) -> Option<bool> {
        if self.is_anti() && other.is_anti() {
            return None;
        }
        if !self.is_anti() && !other.is_anti() {
            let unbounded = |r: &Range| {
                r.l.is_min_sentinel()
                    || r.l.is_max_sentinel()
                    || r.u.is_min_sentinel()
                    || r.u.is_max_sentinel()
            };
            if unbounded(self) || unbounded(other) {
                return None;
            }
        }
        let may_be_equal = !self.intersect_with(other).is_empty();
        let may_differ = !(self.l == self.u && self.is_same_range(other));
        match (may_be_equal, may_differ) {
            (true, true) => None,
            (true, false) => Some(true),
            (false, true) => Some(false),
            (false, false) => unreachable!(
                "Ranges {} and {} neither equal nor different",
                self,
                other,
            ),
        }
    }

    pub fn equal(&self, other: &Range, bw: BitWidth) -> Range {
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        Range::boolean(bw, self.equality(other))
    }

    pub fn not_equal(&self, other: &Range, bw: BitWidth) -> Range {
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        Range::boolean(bw, self.equality(other).map(|eq| !eq))
    }

    /// Shared shape of the ordered comparisons over `[a,b]` and `[c,d]`.
    fn ordered(
        &self,
        other: &Range,
        bw: BitWidth,
        signed: bool,
        decide: impl Fn(&APInt, &APInt, &APInt, &APInt) -> Option<bool>,
    ) -> Range {
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        if self.is_anti() || other.is_anti() {
            return Range::boolean(bw, None);
        }
        let (a, b, c, d) = if signed {
            (self.signed_min(), self.signed_max(), other.signed_min(), other.signed_max())
        } else {
            (self.unsigned_min(), self.unsigned_max(), other.unsigned_min(), other.unsigned_max())
        };
        Range::boolean(bw, decide(&a, &b, &c, &d))
    }

    pub fn ugt(&self, other: &Range, bw: BitWidth) -> Range {
        self.ordered(other, bw, false, gt_decision)
    }

    pub fn uge(&self, other: &Range, bw: BitWidth) -> Range {
        self.ordered(other, bw, false, ge_decision)
    }

    pub fn ult(&self, other: &Range, bw: BitWidth) -> Range {
        self.ordered(other, bw, false, lt_decision)
    }

    pub fn ule(&self, other: &Range, bw: BitWidth) -> Range {
        self.ordered(other, bw, false, le_decision)
    }

    pub fn sgt(&self, other: &Range, bw: BitWidth) -> Range {
        self.ordered(other, bw, true, gt_decision)
    }

    pub fn sge(&self, other: &Range, bw: BitWidth) -> Range {
        self.ordered(other, bw, true, ge_decision)
    }

    pub fn slt(&self, other: &Range, bw: BitWidth) -> Range {
        self.ordered(other, bw, true, lt_decision)
    }

    pub fn sle(&self, other: &Range, bw: BitWidth) -> Range {
        self.ordered(other, bw, true, le_decision)
    }

    /// Evaluates `self pred other` into a boolean range of width `bw`.
    pub fn compare(&self, pred: Predicate, other: &Range, bw: BitWidth) -> Range {
        match pred {
            Predicate::Eq | Predicate::Uneq => self.equal(other, bw),
            Predicate::Ne => self.not_equal(other, bw),
            Predicate::Gt => self.sgt(other, bw),
            Predicate::Ge => self.sge(other, bw),
            Predicate::Lt => self.slt(other, bw),
            Predicate::Le => self.sle(other, bw),
            Predicate::Ugt => self.ugt(other, bw),
            Predicate::Uge => self.uge(other, bw),
            Predicate::Ult => self.ult(other, bw),
            Predicate::Ule => self.ule(other, bw),
        }
    }

    /// Picks `self` when `test` is surely true, `other` when surely false,
    /// and `None` otherwise.
    fn select_by(&self, other: &Range, test: Range) -> Option<Range> {
        if !test.is_constant() {
            return None;
        }
        if test.unsigned_min().is_zero() {
            Some(other.clone())
        } else {
            Some(self.clone())
        }
    }

    pub fn smin(&self, other: &Range) -> Range {
        let bw = self.bw;
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        if self.is_anti() || other.is_anti() {
            return Range::full(bw);
        }
        if let Some(r) = self.select_by(other, self.slt(other, 1)) {
            return r;
        }
        Range::regular(
            bw,
            min(self.signed_min(), other.signed_min()),
            min(self.signed_max(), other.signed_max()),
        )
    }

    pub fn smax(&self, other: &Range) -> Range {
        let bw = self.bw;
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        if self.is_anti() || other.is_anti() {
            return Range::full(bw);
        }
        if let Some(r) = self.select_by(other, self.sgt(other, 1)) {
            return r;
        }
        Range::regular(
            bw,
            max(self.signed_min(), other.signed_min()),
            max(self.signed_max(), other.signed_max()),
        )
    }

    pub fn umin(&self, other: &Range) -> Range {
        let bw = self.bw;
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        if self.is_anti() || other.is_anti() {
            return Range::full(bw);
        }
        if let Some(r) = self.select_by(other, self.ult(other, 1)) {
            return r;
        }
        Range::regular(
            bw,
            min(self.unsigned_min(), other.unsigned_min()),
            min(self.unsigned_max(), other.unsigned_max()),
        )
    }

    pub fn umax(&self, other: &Range) -> Range {
        let bw = self.bw;
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        if self.is_anti() || other.is_anti() {
            return Range::full(bw);
        }
        if let Some(r) = self.select_by(other, self.ugt(other, 1)) {
            return r;
        }
        Range::regular(
            bw,
            max(self.unsigned_min(), other.unsigned_min()),
            max(self.unsigned_max(), other.unsigned_max()),
        )
    }

    /// Signed saturating addition.
    pub fn sat_add(&self, other: &Range) -> Range {
        let bw = self.bw;
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        let clamp = |v: APInt| v.clamp(APInt::signed_min(bw), APInt::signed_max(bw));
        Range::regular(
            bw,
            clamp(self.signed_min() + other.signed_min()),
            clamp(self.signed_max() + other.signed_max()),
        )
    }

    /// Unsigned saturating addition.
    pub fn usat_add(&self, other: &Range) -> Range {
        let bw = self.bw;
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        let max_u = APInt::unsigned_max(bw);
        Range::regular(
            bw,
            min(self.unsigned_min() + other.unsigned_min(), max_u.clone()),
            min(self.unsigned_max() + other.unsigned_max(), max_u),
        )
    }

    /// Signed saturating subtraction.
    pub fn sat_sub(&self, other: &Range) -> Range {
        let bw = self.bw;
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        let clamp = |v: APInt| v.clamp(APInt::signed_min(bw), APInt::signed_max(bw));
        Range::regular(
            bw,
            clamp(self.signed_min() - other.signed_max()),
            clamp(self.signed_max() - other.signed_min()),
        )
    }

    /// Unsigned saturating subtraction.
    pub fn usat_sub(&self, other: &Range) -> Range {
        let bw = self.bw;
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        Range::regular(
            bw,
            max(self.unsigned_min() - other.unsigned_max(), APInt::zero()),
            max(self.unsigned_max() - other.unsigned_min(), APInt::zero()),
        )
    }

    pub fn abs(&self) -> Range {
        let bw = self.bw;
        if self.is_empty() || self.is_unknown() {
            return self.clone();
        }
        let min_s = APInt::signed_min(bw);
        let max_s = APInt::signed_max(bw);
        if self.is_anti() {
            if self.u < 0 {
                if self.l == min_s {
                    return Range::regular(bw, 0, max_s);
                }
                return Range::anti(bw, min_s + 1, -1);
            }
            if self.l < 0 {
                if self.l == min_s {
                    return Range::regular(bw, &self.u + 1, max_s);
                }
                let nearest = min(-&self.l, self.u.clone());
                return Range::anti(bw, min_s + 1, nearest);
            }
            let top = if self.l.is_zero() { 0 } else { -1 };
            return Range::anti(bw, min_s + 1, top);
        }
        let (a, b) = (self.signed_min(), self.signed_max());
        if b < 0 {
            if a == min_s {
                return Range::anti(bw, a + 1, -b - 1);
            }
            return Range::regular(bw, -b, -a);
        }
        if a < 0 {
            if a == min_s {
                return Range::anti(bw, a + 1, -1);
            }
            return Range::regular(bw, 0, max(b, -a));
        }
        self.clone()
    }

    pub fn negate(&self) -> Range {
        match self.ty {
            RangeType::Empty | RangeType::Unknown => self.clone(),
            RangeType::Anti => Range::anti(self.bw, -&self.u, -&self.l),
            RangeType::Regular => Range::regular(self.bw, -&self.u, -&self.l),
        }
    }

    /// Keeps the low `bw` bits of every member.
    pub fn truncate(&self, bw: BitWidth) -> Range {
        assert!(bw > 0 && bw <= MAX_BIT_INT, "Invalid bit-width {}", bw);
        if self.is_empty() || self.is_unknown() {
            return Range::with_type(self.ty, bw);
        }
        let (a, b) = (self.signed_min(), self.signed_max());
        if self.is_full_set() || self.is_anti() || (&b - &a).abs() > APInt::unsigned_max(bw) {
            return Range::full(bw);
        }
        if bw == self.bw {
            return self.clone();
        }
        let low = a.ext_or_trunc(bw, true);
        let high = b.ext_or_trunc(bw, true);
        if a < 0 && b >= 0 {
            if high < 0 {
                // The positive part wrapped into the negatives.
                if high >= low {
                    return Range::full(bw);
                }
                let hole_end = if low < 0 { low } else { APInt::zero() };
                return Range::anti(bw, high + 1, hole_end - 1);
            }
            if low > 0 {
                // The negative part wrapped into the positives.
                if high >= low {
                    return Range::full(bw);
                }
                return Range::anti(bw, high + 1, low - 1);
            }
        }
        if low > high {
            return Range::anti(bw, high + 1, low - 1);
        }
        Range::regular(bw, low, high)
    }

    pub fn sext_or_trunc(&self, bw: BitWidth) -> Range {
        if bw <= self.bw {
            return self.truncate(bw);
        }
        if self.is_empty() || self.is_unknown() {
            return Range::with_type(self.ty, bw);
        }
        let a = self.signed_min().ext_or_trunc(bw, true);
        let b = self.signed_max().ext_or_trunc(bw, true);
        let res = Range::regular(bw, min(a.clone(), b.clone()), max(a, b));
        if res.is_full_set() {
            Range::full(bw)
        } else {
            res
        }
    }

    pub fn zext_or_trunc(&self, bw: BitWidth) -> Range {
        if bw <= self.bw {
            return self.truncate(bw);
        }
        if self.is_empty() || self.is_unknown() {
            return Range::with_type(self.ty, bw);
        }
        let max_u = APInt::unsigned_max(self.bw);
        if self.is_anti() {
            let umax = self.unsigned_max();
            if umax < max_u {
                return Range::regular(bw, &self.u + 1, umax);
            }
            return Range::regular(bw, 0, max_u);
        }
        let (a, b) = (self.signed_min(), self.signed_max());
        if a < 0 && b >= 0 {
            return Range::regular(bw, 0, max_u);
        }
        Range::regular(bw, a.ext_or_trunc(self.bw, false), b.ext_or_trunc(self.bw, false))
    }

    pub fn intersect_with(&self, other: &Range) -> Range {
        let bw = self.bw;
        if let Some(r) = self.trivial_binary(other, bw) {
            return r;
        }
        match (self.is_anti(), other.is_anti()) {
            (false, false) => {
                let l = max(self.l.clone(), other.l.clone());
                let u = min(self.u.clone(), other.u.clone());
                if l > u {
                    Range::empty(bw)
                } else {
                    Range::regular(bw, l, u)
                }
            }
            (true, false) => anti_meet_regular(self, other),
            (false, true) => anti_meet_regular(other, self),
            (true, true) => {
                let (first, second) = if self.l <= other.l { (self, other) } else { (other, self) };
                if second.l > &first.u + 1 {
                    // Disjoint holes: keep one of them.
                    return first.clone();
                }
                Range::anti(bw, first.l.clone(), max(first.u.clone(), second.u.clone()))
            }
        }
    }

    pub fn union_with(&self, other: &Range) -> Range {
        let bw = self.bw;
        if self.is_empty() || self.is_unknown() {
            return other.clone();
        }
        if other.is_empty() || other.is_unknown() {
            return self.clone();
        }
        match (self.is_anti(), other.is_anti()) {
            (false, false) => Range::regular(
                bw,
                min(self.l.clone(), other.l.clone()),
                max(self.u.clone(), other.u.clone()),
            ),
            (true, false) => anti_join_regular(self, other),
            (false, true) => anti_join_regular(other, self),
            (true, true) => {
                // The new hole is what both holes share.
                let l = max(self.l.clone(), other.l.clone());
                let u = min(self.u.clone(), other.u.clone());
                if l > u {
                    Range::full(bw)
                } else {
                    Range::anti(bw, l, u)
                }
            }
        }
    }

    /// Values `x` for which `x pred other` holds.
    pub fn satisfying_cmp_region(pred: Predicate, other: &Range) -> Range {
        let bw = other.bw;
        if other.is_unknown() || other.is_empty() {
            return other.clone();
        }
        if other.is_anti() && !matches!(pred, Predicate::Eq | Predicate::Ne | Predicate::Uneq) {
            panic!("Comparison region against anti-range {} with {}", other, pred);
        }
        let min_s = APInt::signed_min(bw);
        let max_s = APInt::signed_max(bw);
        let max_u = APInt::unsigned_max(bw);
        match pred {
            Predicate::Ge => Range::regular(bw, other.signed_max(), max_s),
            Predicate::Gt => Range::regular(bw, other.signed_max() + 1, max_s),
            Predicate::Le => Range::regular(bw, min_s, other.signed_min()),
            Predicate::Lt => Range::regular(bw, min_s, other.signed_min() - 1),
            Predicate::Uge => Range::regular(bw, other.unsigned_max(), max_u),
            Predicate::Ugt => Range::regular(bw, other.unsigned_max() + 1, max_u),
            Predicate::Ule => Range::regular(bw, 0, other.unsigned_min()),
            Predicate::Ult => Range::regular(bw, 0, other.unsigned_min() - 1),
            Predicate::Eq | Predicate::Uneq => other.clone(),
            Predicate::Ne => other.get_anti(),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            RangeType::Unknown => write!(f, "[Unknown,{}]", self.bw),
            RangeType::Empty => write!(f, "[Empty,{}]", self.bw),
            RangeType::Anti => {
                f.write_str(")")?;
                print_bound(f, &self.l)?;
                write!(f, ",{},", self.bw)?;
                print_bound(f, &self.u)?;
                f.write_str("(")
            }
            RangeType::Regular => {
                f.write_str("[")?;
                print_bound(f, &self.l)?;
                write!(f, ",{},", self.bw)?;
                print_bound(f, &self.u)?;
                f.write_str("]")
            }
        }
    }
}

fn anti_meet_regular(anti: &Range, reg: &Range) -> Range {
    let bw = anti.bw;
    let (al, au) = (&anti.l, &anti.u);
    let (ol, ou) = (&reg.l, &reg.u);
    if al <= ol {
        if ou <= au {
            return Range::empty(bw);
        }
        let lo = if ol > au { ol.clone() } else { au + 1 };
        return Range::regular(bw, lo, ou);
    }
    if au >= ou {
        let hi = if ou < al { ou.clone() } else { al - 1 };
        return Range::regular(bw, ol, hi);
    }
    // The hole sits strictly inside the regular range.
    if reg.is_full_set() {
        return anti.clone();
    }
    reg.clone()
}

fn anti_join_regular(anti: &Range, reg: &Range) -> Range {
    let bw = anti.bw;
    let (al, au) = (&anti.l, &anti.u);
    let (ol, ou) = (&reg.l, &reg.u);
    if al > ou || au < ol {
        anti.clone()
    } else if al > ol && au < ou {
        Range::full(bw)
    } else if al >= ol && au > ou {
        Range::anti(bw, ou + 1, au)
    } else if al < ol && au <= ou {
        Range::anti(bw, al, ol - 1)
    } else {
        Range::full(bw)
    }
}

/// `x / y` where the sentinels behave as infinities.
fn div_bound(x: &APInt, y: &APInt) -> APInt {
    let sign_of = |y: &APInt, neg: APInt, pos: APInt| {
        if *y < 0 {
            neg
        } else if y.is_zero() {
            APInt::zero()
        } else {
            pos
        }
    };
    if x.is_max_sentinel() {
        sign_of(y, APInt::min_sentinel(), APInt::max_sentinel())
    } else if y.is_max_sentinel() {
        APInt::zero()
    } else if x.is_min_sentinel() {
        sign_of(y, APInt::max_sentinel(), APInt::min_sentinel())
    } else if y.is_min_sentinel() {
        APInt::zero()
    } else {
        x / y
    }
}

fn gt_decision(a: &APInt, b: &APInt, c: &APInt, d: &APInt) -> Option<bool> {
    if a > d {
        Some(true)
    } else if c >= b {
        Some(false)
    } else {
        None
    }
}

fn ge_decision(a: &APInt, b: &APInt, c: &APInt, d: &APInt) -> Option<bool> {
    if a >= d {
        Some(true)
    } else if c > b {
        Some(false)
    } else {
        None
    }
}

fn lt_decision(a: &APInt, b: &APInt, c: &APInt, d: &APInt) -> Option<bool> {
    if b < c {
        Some(true)
    } else if d <= a {
        Some(false)
    } else {
        None
    }
}

fn le_decision(a: &APInt, b: &APInt, c: &APInt, d: &APInt) -> Option<bool> {
    if b <= c {
        Some(true)
    } else if d < a {
        Some(false)
    } else {
        None
    }
}

// Bounds of `x | y`, `x & y` and `x ^ y` for `x` in `[a,b]`, `y` in `[c,d]`,
// after Hacker's Delight, section 4-3.

fn top_mask() -> APInt {
    APInt::one() << (MAX_BIT_INT - 1)
}

fn has_bits(v: APInt) -> bool {
    !v.is_zero()
}

fn min_or(a: &APInt, b: &APInt, c: &APInt, d: &APInt) -> APInt {
    let (mut a, mut c) = (a.clone(), c.clone());
    let mut m = top_mask();
    while !m.is_zero() {
        if has_bits(!&a & &c & &m) {
            let temp = (&a | &m) & -&m;
            if &temp <= b {
                a = temp;
                break;
            }
        } else if has_bits(&a & !&c & &m) {
            let temp = (&c | &m) & -&m;
            if &temp <= d {
                c = temp;
                break;
            }
        }
        m >>= 1;
    }
    a | c
}

fn max_or(a: &APInt, b: &APInt, c: &APInt, d: &APInt) -> APInt {
    let (mut b, mut d) = (b.clone(), d.clone());
    let mut m = top_mask();
    while !m.is_zero() {
        if has_bits(&b & &d & &m) {
            let temp = (&b - &m) | (&m - 1);
            if &temp >= a {
                b = temp;
                break;
            }
            let temp = (&d - &m) | (&m - 1);
            if &temp >= c {
                d = temp;
                break;
            }
        }
        m >>= 1;
    }
    b | d
}

fn min_and(a: &APInt, b: &APInt, c: &APInt, d: &APInt) -> APInt {
    let (mut a, mut c) = (a.clone(), c.clone());
    let mut m = top_mask();
    while !m.is_zero() {
        if has_bits(!&a & !&c & &m) {
            let temp = (&a | &m) & -&m;
            if &temp <= b {
                a = temp;
                break;
            }
            let temp = (&c | &m) & -&m;
            if &temp <= d {
                c = temp;
                break;
            }
        }
        m >>= 1;
    }
    a & c
}

fn max_and(a: &APInt, b: &APInt, c: &APInt, d: &APInt) -> APInt {
    let (mut b, mut d) = (b.clone(), d.clone());
    let mut m = top_mask();
    while !m.is_zero() {
        if has_bits(&b & !&d & &m) {
            let temp = (&b & !&m) | (&m - 1);
            if &temp >= a {
                b = temp;
                break;
            }
        } else if has_bits(!&b & &d & &m) {
            let temp = (&d & !&m) | (&m - 1);
            if &temp >= c {
                d = temp;
                break;
            }
        }
        m >>= 1;
    }
    b & d
}

fn min_xor(a: &APInt, b: &APInt, c: &APInt, d: &APInt) -> APInt {
    let (mut a, mut c) = (a.clone(), c.clone());
    let mut m = top_mask();
    while !m.is_zero() {
        if has_bits(!&a & &c & &m) {
            let temp = (&a | &m) & -&m;
            if &temp <= b {
                a = temp;
            }
        } else if has_bits(&a & !&c & &m) {
            let temp = (&c | &m) & -&m;
            if &temp <= d {
                c = temp;
            }
        }
        m >>= 1;
    }
    a ^ c
}

fn max_xor(a: &APInt, b: &APInt, c: &APInt, d: &APInt) -> APInt {
    let (mut b, mut d) = (b.clone(), d.clone());
    let mut m = top_mask();
    while !m.is_zero() {
        if has_bits(&b & &d & &m) {
            let temp = (&b - &m) | (&m - 1);
            if &temp >= a {
                b = temp;
            } else {
                let temp = (&d - &m) | (&m - 1);
                if &temp >= c {
                    d = temp;
                }
            }
        }
        m >>= 1;
    }
    b ^ d
}

/// Sign pattern of the four bounds, one bit per non-negative bound.
fn sign_case(a: &APInt, b: &APInt, c: &APInt, d: &APInt) -> u8 {
    (u8::from(*a >= 0) << 3)
        | (u8::from(*b >= 0) << 2)
        | (u8::from(*c >= 0) << 1)
        | u8::from(*d >= 0)
}

fn signed_or(a: &APInt, b: &APInt, c: &APInt, d: &APInt) -> (APInt, APInt) {
    let minus_one = APInt::from(-1);
    let zero = APInt::zero();
    match sign_case(a, b, c, d) {
        0 | 3 | 12 | 15 => (min_or(a, b, c, d), max_or(a, b, c, d)),
        1 => (a.clone(), minus_one),
        4 => (c.clone(), minus_one),
        5 => (min(a, c).clone(), max_or(&zero, b, &zero, d)),
        7 => (min_or(a, &minus_one, c, d), max_or(&zero, b, c, d)),
        13 => (min_or(a, b, c, &minus_one), max_or(a, b, &zero, d)),
        case => unreachable!("Inconsistent bounds [{},{}] | [{},{}] (case {})", a, b, c, d, case),
    }
}

fn signed_and(a: &APInt, b: &APInt, c: &APInt, d: &APInt) -> (APInt, APInt) {
    let minus_one = APInt::from(-1);
    let zero = APInt::zero();
    match sign_case(a, b, c, d) {
        0 | 3 | 12 | 15 => (min_and(a, b, c, d), max_and(a, b, c, d)),
        1 => (min_and(a, b, c, &minus_one), max_and(a, b, &zero, d)),
        4 => (min_and(a, &minus_one, c, d), max_and(&zero, b, c, d)),
        5 => (min_and(a, &minus_one, c, &minus_one), max(b, d).clone()),
        7 => (zero, d.clone()),
        13 => (zero, b.clone()),
        case => unreachable!("Inconsistent bounds [{},{}] & [{},{}] (case {})", a, b, c, d, case),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit_lattice::{bitstring_to_string, parse_bitstring};
    use test_log::test;

    fn reg(bw: BitWidth, l: i64, u: i64) -> Range {
        Range::regular(bw, l, u)
    }

    fn anti(bw: BitWidth, l: i64, u: i64) -> Range {
        Range::anti(bw, l, u)
    }

    fn assert_bounds(r: &Range, l: i64, u: i64) {
        assert!(r.is_regular(), "{} is not regular", r);
        assert_eq!(*r.lower(), l, "lower bound of {}", r);
        assert_eq!(*r.upper(), u, "upper bound of {}", r);
    }

    fn assert_hole(r: &Range, l: i64, u: i64) {
        assert!(r.is_anti(), "{} is not an anti-range", r);
        assert_bounds(&r.get_anti(), l, u);
    }

    #[test]
    fn test_regular_normalization() {
        assert_bounds(&reg(8, 10, 113), 10, 113);
        assert_hole(&reg(8, -5, 132), -123, -6);
        assert_bounds(&reg(8, 129, 236), -127, -20);
        assert!(reg(8, -292, -36).is_full_set());
        assert!(reg(8, -3, 252).is_full_set());
        assert_hole(&reg(8, -130, -36), -35, 125);
        assert!(reg(8, 5, 4).is_full_set());
        assert_hole(&reg(8, 9, 3), 4, 8);
    }

    #[test]
    fn test_anti_normalization() {
        assert_bounds(&anti(8, -34, 210), -45, -35);
        assert!(anti(8, -34, 230).is_full_set());
        assert_bounds(&anti(8, -130, -67), -66, 125);
        assert!(anti(8, -323, -67).is_full_set());
        assert_hole(&anti(8, 132, 213), -124, -43);
        assert_bounds(&Range::anti(8, APInt::min_sentinel(), -57), -56, 127);
        assert_bounds(&Range::anti(8, 32, APInt::max_sentinel()), -128, 31);
        assert!(anti(8, -128, 127).is_empty());
        assert!(Range::anti(8, APInt::min_sentinel(), APInt::max_sentinel()).is_empty());
    }

    #[test]
    fn test_unsigned_bounds() {
        let r = reg(8, -111, -36);
        assert_eq!(r.unsigned_min(), 145);
        assert_eq!(r.unsigned_max(), 220);
        let a = anti(8, -5, 7);
        assert_eq!(a.unsigned_min(), 8);
        assert_eq!(a.unsigned_max(), 250);
        assert_eq!(anti(1, 0, 0).unsigned_min(), 1);
        assert_eq!(anti(1, 1, 1).unsigned_min(), 0);
        let top = anti(8, -128, -1);
        assert_eq!(top.unsigned_max(), 127);
    }

    #[test]
    fn test_signed_bounds_of_full() {
        let full = Range::full(8);
        assert_eq!(full.signed_min(), -128);
        assert_eq!(full.signed_max(), 127);
        assert_eq!(full.unsigned_max(), 255);
        assert_eq!(anti(8, -5, 7).signed_max(), 127);
    }

    #[test]
    fn test_span() {
        assert_eq!(Range::empty(8).span(), 0);
        assert_eq!(Range::unknown(8).span(), 256);
        assert_eq!(Range::full(8).span(), 256);
        assert_eq!(anti(8, -5, 7).span(), 243);
        assert_eq!(anti(8, -1, -1).span(), 255);
        assert_eq!(reg(8, 10, 20).span(), 11);
        assert_eq!(Range::anti(8, APInt::min_sentinel(), -1).span(), 128);
        assert!(anti(32, -55726, 0).span() > anti(32, -55727, 0).span());
    }

    #[test]
    fn test_predicates() {
        assert!(Range::constant(8, 4).is_constant());
        assert!(Range::constant(8, 4).is_single_element());
        assert!(anti(8, 4, 4).is_single_element());
        assert!(!anti(8, 4, 4).is_constant());
        assert!(!reg(8, 1, 2).is_single_element());
        assert!(reg(8, -128, 127).is_full_set());
        assert!(!anti(8, 0, 0).is_full_set());
        assert!(reg(8, 1, 2).is_same_range(&reg(8, 1, 2)));
        assert!(!reg(8, 1, 2).is_same_range(&reg(16, 1, 2)));
    }

    #[test]
    #[should_panic(expected = "Full-set query on an unknown range")]
    fn test_full_set_of_unknown() {
        Range::unknown(8).is_full_set();
    }

    #[test]
    #[should_panic(expected = "Lower bound of an anti-range")]
    fn test_anti_has_no_lower() {
        anti(8, 1, 5).lower();
    }

    #[test]
    fn test_get_anti() {
        assert_hole(&reg(8, 3, 9).get_anti(), 3, 9);
        assert_bounds(&anti(8, 3, 9).get_anti(), 3, 9);
        assert!(Range::empty(8).get_anti().is_full_set());
        assert!(Range::unknown(8).get_anti().is_unknown());
        assert!(Range::full(8).get_anti().is_empty());
    }

    #[test]
    fn test_needed_bits() {
        assert_eq!(Range::needed_bits(&APInt::from(100), &APInt::from(-3), true), 8);
        assert_eq!(Range::needed_bits(&APInt::from(5), &APInt::from(300), false), 9);
    }

    #[test]
    fn test_bit_values() {
        let r = reg(8, 10, 13);
        assert_eq!(bitstring_to_string(&r.bit_values(false)), "1UUU");
        assert_eq!(bitstring_to_string(&r.bit_values(true)), "01UUU");
        assert_eq!(bitstring_to_string(&Range::constant(8, 10).bit_values(false)), "1010");
        assert_eq!(bitstring_to_string(&anti(8, 1, 2).bit_values(false)), "UUUUUUUU");
    }

    #[test]
    fn test_from_bit_values() {
        assert_bounds(&Range::from_bit_values(&parse_bitstring("1U1U"), 8, false), 10, 15);
        assert_bounds(&Range::from_bit_values(&parse_bitstring("U01"), 8, true), -3, 1);
        assert_bounds(&Range::from_bit_values(&parse_bitstring("0110"), 8, false), 6, 6);
    }

    #[test]
    fn test_add() {
        assert_bounds(&reg(8, 1, 3).add(&reg(8, -5, -2)), -4, 1);
        assert_hole(&reg(8, 100, 120).add(&reg(8, 10, 20)), -115, 109);
        assert_hole(&anti(8, -5, 7).add(&Range::constant(8, 3)), -2, 10);
        assert_bounds(&reg(8, 10, 20).add(&Range::constant(8, 5)), 15, 25);
        assert!(Range::full(8).add(&reg(8, 1, 1)).is_full_set());
        assert!(anti(8, 1, 5).add(&reg(8, 1, 2)).is_full_set());
        assert!(Range::empty(8).add(&Range::unknown(8)).is_empty());
        assert!(Range::unknown(8).add(&reg(8, 1, 2)).is_unknown());
    }

    #[test]
    fn test_sub() {
        assert_bounds(&reg(8, 10, 20).sub(&reg(8, 1, 5)), 5, 19);
        assert_hole(&reg(8, -128, -120).sub(&Range::constant(8, 1)), -120, 126);
        assert_hole(&anti(8, 0, 10).sub(&Range::constant(8, 5)), -5, 5);
        assert_bounds(&Range::constant(8, 3).sub(&reg(8, 1, 2)), 1, 2);
    }

    #[test]
    fn test_mul() {
        assert_bounds(&reg(8, 2, 3).mul(&reg(8, 4, 5)), 8, 15);
        assert_bounds(&reg(8, -2, 3).mul(&reg(8, 4, 5)), -10, 15);
        assert!(reg(8, 20, 30).mul(&reg(8, 20, 30)).is_full_set());
        assert!(anti(8, 1, 2).mul(&reg(8, 1, 2)).is_full_set());
        assert_bounds(&reg(128, 2, 3).mul(&reg(128, 4, 5)), 8, 15);
    }

    #[test]
    fn test_udiv() {
        assert_bounds(&reg(8, 10, 20).udiv(&reg(8, 2, 5)), 2, 10);
        assert!(reg(8, 10, 20).udiv(&Range::constant(8, 0)).is_full_set());
        assert_bounds(&reg(8, 10, 20).udiv(&reg(8, 0, 2)), 5, 20);
    }

    #[test]
    fn test_sdiv() {
        assert_bounds(&reg(8, -20, 10).sdiv(&reg(8, 2, 5)), -10, 5);
        assert_bounds(&reg(8, -20, 10).sdiv(&reg(8, -2, 3)), -20, 20);
        assert_bounds(&reg(8, 20, 40).sdiv(&reg(8, -5, 0)), -40, -4);
        assert!(reg(8, 1, 2).sdiv(&Range::constant(8, 0)).is_full_set());
        assert!(anti(8, 1, 2).sdiv(&reg(8, 1, 2)).is_full_set());
    }

    #[test]
    fn test_urem() {
        assert_bounds(&reg(8, 5, 9).urem(&Range::constant(8, 4)), 0, 3);
        assert_bounds(&reg(8, 5, 9).urem(&reg(8, 7, 8)), 0, 7);
        assert_bounds(&reg(8, 1, 3).urem(&reg(8, 5, 8)), 1, 3);
        assert!(reg(8, 5, 9).urem(&Range::constant(8, 0)).is_empty());
        assert_bounds(&reg(8, 5, 9).urem(&Range::constant(8, 1)), 0, 0);
    }

    #[test]
    fn test_srem() {
        assert_bounds(&reg(8, 5, 9).srem(&reg(8, 1, 1)), 0, 0);
        assert_bounds(&reg(8, 5, 9).srem(&reg(8, 3, 6)), 0, 5);
        assert_bounds(&reg(8, 5, 9).srem(&reg(8, -6, -3)), 0, 5);
        assert_bounds(&reg(8, -9, -5).srem(&reg(8, 3, 6)), -5, 0);
        assert_bounds(&reg(8, 1, 2).srem(&reg(8, 5, 7)), 1, 2);
        assert_bounds(&Range::constant(8, -7).srem(&Range::constant(8, 3)), -1, -1);
        assert!(reg(8, 1, 2).srem(&Range::constant(8, 0)).is_empty());
    }

    #[test]
    fn test_shl() {
        assert_bounds(&reg(8, 1, 3).shl(&reg(8, 1, 2)), 2, 12);
        assert_bounds(&Range::constant(8, -1).shl(&reg(8, 0, 7)), -128, -1);
        assert_bounds(&reg(8, 1, 2).shl(&reg(8, 8, 9)), 0, 0);
        assert_bounds(&Range::constant(8, 3).shl(&Range::constant(8, 2)), 12, 12);
        assert_bounds(&reg(8, -27, 43).shl(&reg(8, 0, 1)), -54, 86);
        assert!(reg(8, 1, 2).shl(&reg(8, 0, 9)).is_full_set());
        assert!(reg(8, 1, 100).shl(&reg(8, 0, 2)).is_full_set());
    }

    #[test]
    fn test_shr() {
        assert_bounds(&reg(8, -16, 32).shr(&reg(8, 1, 2), true), -8, 16);
        assert_bounds(&reg(8, -16, 32).shr(&reg(8, 1, 2), false), 0, 127);
        assert_bounds(&reg(8, 64, 100).shr(&reg(8, 1, 3), false), 8, 50);
        assert!(anti(8, 1, 2).shr(&reg(8, 1, 2), true).is_full_set());
    }

    #[test]
    fn test_bitwise() {
        assert_bounds(&reg(8, 10, 20).bit_and(&reg(8, 7, 27)), 0, 20);
        assert_bounds(&reg(8, 1, 2).bit_or(&Range::constant(8, 4)), 5, 6);
        assert_bounds(&Range::constant(8, 0).bit_or(&reg(8, 3, 9)), 3, 9);
        assert_bounds(&Range::constant(8, -1).bit_and(&reg(8, 3, 9)), 3, 9);
        assert_bounds(&reg(8, 1, 2).bit_xor(&Range::constant(8, 4)), 5, 6);
        assert_bounds(&Range::constant(8, -1).bit_xor(&reg(8, 3, 9)), -10, -4);
        assert!(reg(8, -3, 2).bit_xor(&reg(8, 1, 2)).is_full_set());
        assert_bounds(&reg(8, 3, 9).bit_not(), -10, -4);
        assert_hole(&anti(8, 3, 9).bit_not(), -10, -4);
        assert!(Range::full(8).bit_not().is_full_set());
    }

    #[test]
    fn test_comparisons() {
        let yes = |r: Range| r.is_constant() && r.unsigned_min() == 1;
        let no = |r: Range| r.is_constant() && r.unsigned_min().is_zero();
        assert!(yes(reg(8, 1, 3).slt(&reg(8, 5, 6), 1)));
        assert!(no(reg(8, 1, 3).sgt(&reg(8, 5, 6), 1)));
        assert!(reg(8, 1, 6).ult(&reg(8, 5, 6), 1).is_full_set());
        assert!(yes(reg(8, -1, -1).ugt(&reg(8, 5, 6), 1)));
        assert!(no(reg(8, -1, -1).sgt(&reg(8, 5, 6), 1)));
        assert!(yes(reg(8, 5, 6).uge(&reg(8, 2, 5), 1)));
        assert!(yes(reg(8, 5, 6).sle(&reg(8, 6, 9), 1)));
        assert!(anti(8, 1, 3).slt(&reg(8, 5, 6), 1).is_full_set());
    }

    #[test]
    fn test_equality() {
        let yes = |r: Range| r.is_constant() && r.unsigned_min() == 1;
        let no = |r: Range| r.is_constant() && r.unsigned_min().is_zero();
        assert!(yes(Range::constant(8, 3).equal(&Range::constant(8, 3), 1)));
        assert!(no(reg(8, 1, 2).equal(&reg(8, 5, 6), 1)));
        assert!(reg(8, 1, 5).equal(&reg(8, 5, 6), 1).is_full_set());
        assert!(yes(reg(8, 1, 2).not_equal(&reg(8, 5, 6), 1)));
        assert!(no(anti(8, 0, 9).equal(&reg(8, 2, 5), 1)));
        assert!(anti(8, 1, 2).equal(&anti(8, 5, 6), 1).is_full_set());
        assert!(Range::full(8).equal(&reg(8, 1, 1), 1).is_full_set());
        assert_bounds(
            &Range::constant(8, 3).compare(Predicate::Eq, &Range::constant(8, 3), 8),
            1,
            1,
        );
    }

    #[test]
    fn test_min_max() {
        assert_bounds(&reg(8, 1, 3).smin(&reg(8, 5, 6)), 1, 3);
        assert_bounds(&reg(8, 1, 6).smax(&reg(8, 2, 3)), 2, 6);
        assert_bounds(&reg(8, 1, 6).smin(&reg(8, 2, 3)), 1, 3);
        assert_bounds(&reg(8, -1, -1).umin(&reg(8, 5, 6)), 5, 6);
        assert_bounds(&reg(8, -1, -1).umax(&reg(8, 5, 6)), -1, -1);
        assert!(anti(8, 1, 2).smax(&reg(8, 1, 2)).is_full_set());
    }

    #[test]
    fn test_saturating() {
        assert_bounds(&reg(8, 100, 120).sat_add(&reg(8, 10, 20)), 110, 127);
        let sum = reg(8, 200, 250).usat_add(&Range::constant(8, 10));
        assert_eq!(sum.unsigned_min(), 210);
        assert_eq!(sum.unsigned_max(), 255);
        assert_bounds(&reg(8, -120, -100).sat_sub(&reg(8, 10, 20)), -128, -110);
        assert_bounds(&reg(8, 5, 10).usat_sub(&reg(8, 7, 8)), 0, 3);
    }

    #[test]
    fn test_abs() {
        let r = reg(8, -128, 31).abs();
        assert!(r.is_anti());
        assert_eq!(r.signed_min(), -128);
        assert_eq!(r.unsigned_min(), 0);
        assert_bounds(&reg(8, -10, -5).abs(), 5, 10);
        assert_bounds(&reg(8, -3, 7).abs(), 0, 7);
        assert_bounds(&reg(8, 2, 7).abs(), 2, 7);
        assert_hole(&reg(8, -128, -5).abs(), -127, 4);
        assert_hole(&anti(8, -5, 7).abs(), -127, 5);
        assert!(Range::empty(8).abs().is_empty());
    }

    #[test]
    fn test_negate() {
        assert_hole(&reg(8, -128, 5).negate(), -127, -6);
        assert_bounds(&reg(8, 3, 9).negate(), -9, -3);
        assert_hole(&anti(8, 3, 9).negate(), -9, -3);
        assert_bounds(&anti(8, -128, 4).negate(), -127, -5);
    }

    #[test]
    fn test_truncate() {
        assert_hole(&reg(16, -3786, -3703).truncate(8), -118, 53);
        assert!(reg(16, 1250, 2277).truncate(8).is_full_set());
        assert_bounds(&reg(8, 0b11100111, 0b11101111).truncate(5), 7, 15);
        assert_bounds(&reg(8, 0b11111001, 0b1010).truncate(5), -7, 10);
        assert_hole(&reg(8, 0b11101101, 10).truncate(5), 11, 12);
        assert_hole(&reg(8, 0b11111111, 0b11000).truncate(5), -7, -2);
        assert_bounds(&reg(32, 122, 124).truncate(7), -6, -4);
        assert_bounds(&reg(8, -33, -30).truncate(5), -1, 2);
        assert_hole(&reg(16, 120, 140).truncate(8), -115, 119);
        assert!(Range::empty(16).truncate(8).is_empty());
        assert_eq!(Range::unknown(16).truncate(8).bit_width(), 8);
    }

    #[test]
    fn test_extend() {
        assert_bounds(&reg(8, -5, 7).zext_or_trunc(16), 0, 255);
        assert_bounds(&anti(8, -5, 7).zext_or_trunc(16), 8, 250);
        assert_bounds(&reg(8, -5, -1).zext_or_trunc(16), 251, 255);
        assert_bounds(&reg(8, 3, 9).sext_or_trunc(16), 3, 9);
        assert_bounds(&reg(8, -3, 9).sext_or_trunc(16), -3, 9);
        assert_bounds(&anti(8, -3, 9).sext_or_trunc(16), -128, 127);
        assert!(Range::unknown(8).zext_or_trunc(16).is_unknown());
    }

    #[test]
    fn test_intersect() {
        assert_bounds(&reg(8, 1, 10).intersect_with(&reg(8, 5, 20)), 5, 10);
        assert!(reg(8, 1, 4).intersect_with(&reg(8, 5, 20)).is_empty());
        assert_bounds(&anti(8, 3, 7).intersect_with(&reg(8, 1, 10)), 1, 10);
        assert_bounds(&anti(8, 3, 7).intersect_with(&reg(8, 5, 20)), 8, 20);
        assert_bounds(&reg(8, -5, 5).intersect_with(&anti(8, 3, 7)), -5, 2);
        assert!(anti(8, 3, 7).intersect_with(&reg(8, 4, 6)).is_empty());
        assert_hole(&anti(8, 3, 7).intersect_with(&Range::full(8)), 3, 7);
        assert_hole(&anti(8, 1, 3).intersect_with(&anti(8, 4, 6)), 1, 6);
        assert_hole(&anti(8, 1, 3).intersect_with(&anti(8, 6, 9)), 1, 3);
        assert!(Range::empty(8).intersect_with(&reg(8, 1, 2)).is_empty());
    }

    #[test]
    fn test_union() {
        assert_bounds(&reg(8, 1, 3).union_with(&reg(8, 7, 9)), 1, 9);
        assert_hole(&anti(8, 3, 7).union_with(&reg(8, 5, 20)), 3, 4);
        assert_hole(&reg(8, -10, 4).union_with(&anti(8, 3, 7)), 5, 7);
        assert!(anti(8, 3, 7).union_with(&reg(8, 1, 10)).is_full_set());
        assert_hole(&anti(8, 3, 7).union_with(&reg(8, 10, 20)), 3, 7);
        assert_hole(&anti(8, 1, 5).union_with(&anti(8, 3, 9)), 3, 5);
        assert!(anti(8, 1, 2).union_with(&anti(8, 5, 6)).is_full_set());
        assert_bounds(&Range::unknown(8).union_with(&reg(8, 1, 2)), 1, 2);
        assert_bounds(&reg(8, 1, 2).union_with(&Range::empty(8)), 1, 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(reg(8, 1, 5).to_string(), "[1,8,5]");
        assert_eq!(anti(8, 3, 7).to_string(), ")3,8,7(");
        assert_eq!(Range::full(8).to_string(), "[-inf,8,+inf]");
        assert_eq!(Range::empty(8).to_string(), "[Empty,8]");
        assert_eq!(Range::unknown(16).to_string(), "[Unknown,16]");
    }

    #[test]
    fn test_satisfying_region() {
        let ten = Range::constant(8, 10);
        assert_bounds(&Range::satisfying_cmp_region(Predicate::Lt, &ten), -128, 9);
        assert_bounds(&Range::satisfying_cmp_region(Predicate::Ge, &ten), 10, 127);
        assert_bounds(&Range::satisfying_cmp_region(Predicate::Ult, &ten), 0, 9);
        assert_hole(&Range::satisfying_cmp_region(Predicate::Ne, &ten), 10, 10);
        assert_bounds(&Range::satisfying_cmp_region(Predicate::Eq, &ten), 10, 10);
        assert!(Range::satisfying_cmp_region(Predicate::Lt, &Range::empty(8)).is_empty());
    }

    #[test]
    #[should_panic(expected = "Comparison region against anti-range")]
    fn test_satisfying_region_of_anti() {
        Range::satisfying_cmp_region(Predicate::Lt, &anti(8, 1, 4));
    }

    #[test]
    fn test_add_and_sdiv_bounds() {
        assert_bounds(&reg(8, 5, 9).add(&reg(8, 3, 6)), 8, 15);
        assert_bounds(&reg(8, 5, 9).sdiv(&reg(8, -6, -3)), -3, 0);
    }

    // Exhaustive soundness over every operand pair at small bit-widths.

    const WIDTHS: [BitWidth; 2] = [3, 4];

    fn smin(bw: BitWidth) -> i64 {
        -(1 << (bw - 1))
    }

    fn smax(bw: BitWidth) -> i64 {
        (1 << (bw - 1)) - 1
    }

    fn umax(bw: BitWidth) -> i64 {
        (1 << bw) - 1
    }

    fn all_ranges(bw: BitWidth) -> Vec<Range> {
        let mut res = Vec::new();
        for l in smin(bw)..=smax(bw) {
            for u in l..=smax(bw) {
                res.push(reg(bw, l, u));
                let a = anti(bw, l, u);
                if !a.is_empty() {
                    res.push(a);
                }
            }
        }
        res
    }

    fn members(r: &Range) -> Vec<i64> {
        let bw = r.bit_width();
        (smin(bw)..=smax(bw)).filter(|&v| r.contains(&APInt::from(v))).collect()
    }

    fn unsigned(v: i64, bw: BitWidth) -> i64 {
        v.rem_euclid(1 << bw)
    }

    fn check_binary(
        bw: BitWidth,
        name: &str,
        op: impl Fn(&Range, &Range) -> Range, concrete: impl Fn(i64,
        i64) -> Option<i64>,
    ) {
        let ranges = all_ranges(bw);
        for x in &ranges {
            for y in &ranges {
                let res = op(x, y);
                for a in members(x) {
                    for b in members(y) {
                        if let Some(v) = concrete(a, b) {
                            assert!(
                                res.contains(&APInt::from(v)),
                                "{}: {} op {} = {} misses {} ({} op {})",
                                name,
                                x,
                                y,
                                res,
                                v,
                                a,
                                b
                            );
                        }
                    }
                }
            }
        }
    }

    fn check_compare(
        bw: BitWidth,
        name: &str,
        op: impl Fn(&Range, &Range, BitWidth) -> Range, concrete: impl Fn(i64,
        i64) -> bool,
    ) {
        let ranges = all_ranges(bw);
        for x in &ranges {
            for y in &ranges {
                let res = op(x, y, 1);
                for a in members(x) {
                    for b in members(y) {
                        let v = APInt::from(i64::from(concrete(a, b)));
                        assert!(
                            res.contains(&v),
                            "{}: {} vs {} = {} misses ({} , {})",
                            name,
                            x,
                            y,
                            res,
                            a,
                            b,
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_sound_arithmetic() {
        for bw in WIDTHS {
            let u = |v| unsigned(v, bw);
            check_binary(bw, "add", Range::add, |a, b| Some(a + b));
            check_binary(bw, "sub", Range::sub, |a, b| Some(a - b));
            check_binary(bw, "mul", Range::mul, |a, b| Some(a * b));
            check_binary(bw, "udiv", Range::udiv, |a, b| (b != 0).then(|| u(a) / u(b)));
            check_binary(bw, "sdiv", Range::sdiv, |a, b| (b != 0).then(|| a / b));
            check_binary(bw, "urem", Range::urem, |a, b| (b != 0).then(|| u(a) % u(b)));
            check_binary(bw, "srem", Range::srem, |a, b| (b != 0).then(|| a % b));
        }
    }

    #[test]
    fn test_sound_saturating() {
        for bw in WIDTHS {
            let u = |v| unsigned(v, bw);
            let clamp = |v: i64| v.clamp(smin(bw), smax(bw));
            check_binary(bw, "sat_add", Range::sat_add, |a, b| Some(clamp(a + b)));
            check_binary(bw, "sat_sub", Range::sat_sub, |a, b| Some(clamp(a - b)));
            check_binary(bw, "usat_add", Range::usat_add, |a, b| Some((u(a) + u(b)).min(umax(bw))));
            check_binary(bw, "usat_sub", Range::usat_sub, |a, b| Some((u(a) - u(b)).max(0)));
        }
    }

    #[test]
    fn test_sound_shifts() {
        for bw in WIDTHS {
            let u = |v| unsigned(v, bw);
            let amount = |b: i64| (u(b) < i64::from(bw)).then(|| u(b));
            check_binary(bw, "shl", Range::shl, |a, b| amount(b).map(|s| a << s));
            check_binary(bw, "ashr", |x, y| x.shr(y, true), |a, b| amount(b).map(|s| a >> s));
            check_binary(bw, "lshr", |x, y| x.shr(y, false), |a, b| amount(b).map(|s| u(a) >> s));
        }
    }

    #[test]
    fn test_sound_bitwise() {
        for bw in WIDTHS {
            let u = |v| unsigned(v, bw);
            check_binary(bw, "and", Range::bit_and, |a, b| Some(a & b));
            check_binary(bw, "or", Range::bit_or, |a, b| Some(a | b));
            check_binary(bw, "xor", Range::bit_xor, |a, b| Some(a ^ b));
            check_binary(bw, "smin", Range::smin, |a, b| Some(a.min(b)));
            check_binary(bw, "smax", Range::smax, |a, b| Some(a.max(b)));
            check_binary(bw, "umin", Range::umin, |a, b| Some(if u(a) <= u(b) { a } else { b }));
            check_binary(bw, "umax", Range::umax, |a, b| Some(if u(a) >= u(b) { a } else { b }));
        }
    }

    #[test]
    fn test_sound_comparisons() {
        for bw in WIDTHS {
            let u = |v| unsigned(v, bw);
            check_compare(bw, "eq", Range::equal, |a, b| a == b);
            check_compare(bw, "ne", Range::not_equal, |a, b| a != b);
            check_compare(bw, "slt", Range::slt, |a, b| a < b);
            check_compare(bw, "sle", Range::sle, |a, b| a <= b);
            check_compare(bw, "sgt", Range::sgt, |a, b| a > b);
            check_compare(bw, "sge", Range::sge, |a, b| a >= b);
            check_compare(bw, "ult", Range::ult, |a, b| u(a) < u(b));
            check_compare(bw, "ule", Range::ule, |a, b| u(a) <= u(b));
            check_compare(bw, "ugt", Range::ugt, |a, b| u(a) > u(b));
            check_compare(bw, "uge", Range::uge, |a, b| u(a) >= u(b));
        }
    }

    #[test]
    fn test_sound_unary() {
        for bw in WIDTHS {
            for x in all_ranges(bw) {
                let (abs, neg, not) = (x.abs(), x.negate(), x.bit_not());
                for a in members(&x) {
                    assert!(
                        abs.contains(&APInt::from(a.abs())),
                        "abs {} = {} misses {}",
                        x,
                        abs,
                        a,
                    );
                    assert!(neg.contains(&APInt::from(-a)), "neg {} = {} misses {}", x, neg, a);
                    assert!(not.contains(&APInt::from(!a)), "not {} = {} misses {}", x, not, a);
                }
            }
        }
    }

    #[test]
    fn test_sound_casts() {
        for bw in WIDTHS {
            for x in all_ranges(bw) {
                for w in 1..=7 {
                    let (zext, sext) = (x.zext_or_trunc(w), x.sext_or_trunc(w));
                    let trunc = (w <= bw).then(|| x.truncate(w));
                    for a in members(&x) {
                        // Narrower targets wrap, which `contains` applies.
                        let z = if w > bw { unsigned(a, bw) } else { a };
                        assert!(
                            zext.contains(&APInt::from(z)),
                            "zext {} to {} = {} misses {}",
                            x,
                            w,
                            zext,
                            a,
                        );
                        assert!(
                            sext.contains(&APInt::from(a)),
                            "sext {} to {} = {} misses {}",
                            x,
                            w,
                            sext,
                            a,
                        );
                        if let Some(trunc) = &trunc {
                            assert!(
                                trunc.contains(&APInt::from(a)),
                                "trunc {} to {} = {} misses {}",
                                x,
                                w,
                                trunc,
                                a,
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_sound_set_operations() {
        for bw in WIDTHS {
            let ranges = all_ranges(bw);
            for x in &ranges {
                assert!(x.intersect_with(&x.get_anti()).is_empty(), "{} meets its complement", x);
                for y in &ranges {
                    let (meet, join) = (x.intersect_with(y), x.union_with(y));
                    for v in smin(bw)..=smax(bw) {
                        let v = APInt::from(v);
                        if x.contains(&v) && y.contains(&v) {
                            assert!(meet.contains(&v), "{} meet {} = {} misses {}", x, y, meet, v);
                        }
                        if x.contains(&v) || y.contains(&v) {
                            assert!(join.contains(&v), "{} join {} = {} misses {}", x, y, join, v);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_double_complement() {
        for bw in WIDTHS {
            for x in all_ranges(bw) {
                let back = x.get_anti().get_anti();
                assert_eq!(members(&back), members(&x), "{} complemented twice is {}", x, back);
                let (inside, outside) = (members(&x), members(&x.get_anti()));
                assert_eq!(
                    inside.len() + outside.len(),
                    (umax(bw) + 1) as usize,
                    "{} and its complement",
                    x,
                );
            }
        }
    }
}
