//! Four-valued bit lattice.
//!
//! Each bit of a value is one of `0`, `1`, `U` (unknown, may be either) or
//! `X` (don't care). A bitstring is stored most-significant bit first; its
//! length may be shorter than the type width, in which case the front bit
//! acts as the sign (signed strings) or zero-extension applies (unsigned).
//!
//! `sup` joins two strings (the result covers both), `inf` meets them.

use std::collections::VecDeque;
use std::fmt;

use crate::apint::APInt;

/// One bit of the lattice.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BitValue {
    Zero,
    One,
    /// Unknown: the bit may take either value.
    U,
    /// Don't care: no value of the bit is observable.
    X,
}

impl BitValue {
    pub fn from_char(c: char) -> Self {
        match c {
            '0' => BitValue::Zero,
            '1' => BitValue::One,
            'U' => BitValue::U,
            'X' => BitValue::X,
            _ => panic!("Invalid bit lattice character '{}'", c),
        }
    }

    pub fn as_char(self) -> char {
        match self {
            BitValue::Zero => '0',
            BitValue::One => '1',
            BitValue::U => 'U',
            BitValue::X => 'X',
        }
    }

    /// Either `U` or `X`.
    pub fn is_undetermined(self) -> bool {
        matches!(self, BitValue::U | BitValue::X)
    }
}

impl fmt::Display for BitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Bits, most significant first.
pub type BitString = VecDeque<BitValue>;

/// Parses a string over `0`, `1`, `U`, `X`.
///
/// # Panics
///
/// Panics on any other character.
pub fn parse_bitstring(s: &str) -> BitString {
    s.chars().map(BitValue::from_char).collect()
}

pub fn bitstring_to_string(bits: &BitString) -> String {
    bits.iter().map(|b| b.as_char()).collect()
}

/// Join of two bits.
pub fn bit_sup(a: BitValue, b: BitValue) -> BitValue {
    if a == b {
        a
    } else if a == BitValue::X || b == BitValue::X {
        BitValue::X
    } else if a == BitValue::U {
        b
    } else if b == BitValue::U {
        a
    } else {
        BitValue::X
    }
}

/// Meet of two bits.
pub fn bit_inf(a: BitValue, b: BitValue) -> BitValue {
    if a == b {
        a
    } else if a == BitValue::U || b == BitValue::U {
        BitValue::U
    } else if a == BitValue::X {
        b
    } else if b == BitValue::X {
        a
    } else {
        BitValue::U
    }
}

/// Removes redundant leading bits.
///
/// Signed strings drop repeated sign bits; unsigned strings drop leading
/// zeros (and doubled don't-cares).
pub fn sign_reduce(bits: &mut BitString, signed: bool) {
    assert!(!bits.is_empty(), "Cannot reduce an empty bitstring");
    while bits.len() > 1 {
        let (first, second) = (bits[0], bits[1]);
        let redundant = if signed {
            first != BitValue::U && first == second
        } else {
            (first == BitValue::X && second == BitValue::X)
                || (first == BitValue::Zero && second != BitValue::X)
        };
        if !redundant {
            break;
        }
        bits.pop_front();
    }
}

/// Extends `bits` to `final_size` with its sign bit (signed, or leading `X`)
/// or with zeros.
pub fn sign_extend(bits: &BitString, signed: bool, final_size: usize) -> BitString {
    assert!(final_size > 0, "Cannot sign extend a bitstring to size 0");
    assert!(final_size > bits.len(), "Useless sign extension");
    let mut res = bits.clone();
    if res.is_empty() {
        res.push_front(BitValue::X);
    }
    let sign_bit = if signed || res[0] == BitValue::X { res[0] } else { BitValue::Zero };
    while res.len() < final_size {
        res.push_front(sign_bit);
    }
    res
}

/// Join of two bitstrings, shaped for an output of `out_size` bits.
pub fn sup(
    a: &BitString,
    b: &BitString,
    out_size: usize,
    signed: bool,
    is_bool: bool,
) -> BitString {
    assert!(!a.is_empty() && !b.is_empty(), "Cannot join empty bitstrings");
    assert!(out_size > 0, "Size can not be zero");
    assert!(!is_bool || out_size == 1, "Boolean with type size != 1");
    let mut res = BitString::new();
    if is_bool {
        res.push_back(bit_sup(a[a.len() - 1], b[b.len() - 1]));
        return res;
    }

    let (
        mut longer,
        mut shorter,
    ) = if a.len() >= b.len() { (a.clone(), b.clone()) } else { (b.clone(), a.clone()) };
    while longer.len() > out_size {
        longer.pop_front();
    }
    while shorter.len() > out_size {
        shorter.pop_front();
    }
    if longer.len() < out_size {
        longer = sign_extend(&longer, signed, out_size);
    }
    if shorter.len() < out_size {
        shorter = sign_extend(&shorter, signed, out_size);
    }

    for (&x, &y) in longer.iter().rev().zip(shorter.iter().rev()) {
        res.push_front(bit_sup(x, y));
    }
    if res.is_empty() {
        res.push_front(BitValue::X);
    }
    sign_reduce(&mut res, signed);

    if signed {
        let a_sign_is_x = a[0] == BitValue::X;
        let b_sign_is_x = b[0] == BitValue::X;
        let preferred = if a_sign_is_x == b_sign_is_x {
            a.len().min(b.len())
        } else if a_sign_is_x {
            a.len()
        } else {
            b.len()
        };
        let final_size = out_size.min(preferred);
        let sign_bit = res[0];
        while res.len() > final_size {
            res.pop_front();
        }
        if sign_bit != BitValue::X && res[0] == BitValue::X {
            res[0] = sign_bit;
        }
    } else {
        let final_size = out_size.min(a.len().min(b.len()));
        assert!(final_size > 0, "Final size of sup cannot be 0");
        while res.len() > final_size {
            if res[0] != BitValue::Zero || (res.len() > 1 && res[1] != BitValue::X) {
                res.pop_front();
            } else {
                break;
            }
        }
    }
    res
}

/// Meet of two bitstrings, truncated to `out_size` bits.
pub fn inf(
    a: &BitString,
    b: &BitString,
    out_size: usize,
    signed: bool,
    is_bool: bool,
) -> BitString {
    assert!(!(a.is_empty() && b.is_empty()), "Cannot meet two empty bitstrings");
    assert!(out_size > 0, "Size can not be zero");
    assert!(!is_bool || out_size == 1, "Boolean with type size != 1");
    let mut res = BitString::new();
    if is_bool {
        let last = |s: &BitString| s.back().copied().unwrap_or(BitValue::X);
        res.push_back(bit_inf(last(a), last(b)));
        return res;
    }

    let reduced = |s: &BitString| {
        let mut s = s.clone();
        if !s.is_empty() {
            sign_reduce(&mut s, signed);
        }
        s
    };
    let (a_copy, b_copy) = (reduced(a), reduced(b));
    let (
        longer,
        mut shorter,
    ) = if a_copy.len() >= b_copy.len() { (a_copy, b_copy) } else { (b_copy, a_copy) };
    if longer.len() > shorter.len() {
        shorter = sign_extend(&shorter, signed, longer.len());
    }

    for (&x, &y) in longer.iter().rev().zip(shorter.iter().rev()) {
        res.push_front(bit_inf(x, y));
    }
    if res.is_empty() {
        res.push_front(BitValue::X);
    }
    sign_reduce(&mut res, signed);
    while res.len() > out_size {
        res.pop_front();
    }
    res
}

/// A string of `n` unknown bits.
pub fn u_bitstring(n: usize) -> BitString {
    std::iter::repeat(BitValue::U).take(n).collect()
}

/// A string of `n` don't-care bits.
pub fn x_bitstring(n: usize) -> BitString {
    std::iter::repeat(BitValue::X).take(n).collect()
}

/// Bit pattern of the low `len` bits of `value`, without redundant leading
/// zeros. Signed strings get one leading `0` when there is room for it.
pub fn bitstring_from_constant(value: &APInt, len: usize, signed: bool) -> BitString {
    let mut res = BitString::new();
    let mut image = value.ext_or_trunc(len as u32, false);
    if image.is_zero() {
        res.push_front(BitValue::Zero);
        return res;
    }
    let mut bit = 0;
    while bit < len && !image.is_zero() {
        res.push_front(if image.bit(0) { BitValue::One } else { BitValue::Zero });
        image >>= 1;
        bit += 1;
    }
    if bit < len && signed {
        res.push_front(BitValue::Zero);
    }
    res
}

/// True when no bit is `U` or `X`.
pub fn is_constant_bitstring(bits: &BitString) -> bool {
    bits.iter().all(|b| !b.is_undetermined())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn bs(s: &str) -> BitString {
        parse_bitstring(s)
    }

    #[test]
    fn test_parse_and_print() {
        let bits = bs("01UX");
        assert_eq!(bits.len(), 4);
        assert_eq!(bits[2], BitValue::U);
        assert_eq!(bitstring_to_string(&bits), "01UX");
    }

    #[test]
    #[should_panic(expected = "Invalid bit lattice character")]
    fn test_parse_rejects_garbage() {
        parse_bitstring("01a");
    }

    #[test]
    fn test_bit_sup_and_inf() {
        use BitValue::*;
        assert_eq!(bit_sup(Zero, Zero), Zero);
        assert_eq!(bit_sup(Zero, One), X);
        assert_eq!(bit_sup(U, One), One);
        assert_eq!(bit_sup(X, U), X);
        assert_eq!(bit_inf(Zero, One), U);
        assert_eq!(bit_inf(X, One), One);
        assert_eq!(bit_inf(X, U), U);
    }

    #[test]
    fn test_sign_reduce() {
        let mut signed = bs("111010");
        sign_reduce(&mut signed, true);
        assert_eq!(bitstring_to_string(&signed), "1010");

        let mut unsigned = bs("00101");
        sign_reduce(&mut unsigned, false);
        assert_eq!(bitstring_to_string(&unsigned), "101");

        let mut guarded = bs("0X1");
        sign_reduce(&mut guarded, false);
        assert_eq!(bitstring_to_string(&guarded), "0X1");

        let mut unknown = bs("UU1");
        sign_reduce(&mut unknown, true);
        assert_eq!(bitstring_to_string(&unknown), "UU1");
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(bitstring_to_string(&sign_extend(&bs("10"), true, 4)), "1110");
        assert_eq!(bitstring_to_string(&sign_extend(&bs("10"), false, 4)), "0010");
        assert_eq!(bitstring_to_string(&sign_extend(&bs("X1"), false, 4)), "XXX1");
        assert_eq!(bitstring_to_string(&sign_extend(&BitString::new(), true, 2)), "XX");
    }

    #[test]
    #[should_panic(expected = "Useless sign extension")]
    fn test_sign_extend_must_grow() {
        sign_extend(&bs("101"), true, 3);
    }

    #[test]
    fn test_sup_merges_values() {
        // 0b0101 and 0b0111 differ in bit 1.
        let res = sup(&bs("0101"), &bs("0111"), 8, false, false);
        assert_eq!(bitstring_to_string(&res), "1X1");
        let res = sup(&bs("0"), &bs("1"), 1, false, true);
        assert_eq!(bitstring_to_string(&res), "X");
    }

    #[test]
    fn test_inf_refines() {
        let res = inf(&bs("1X1"), &bs("X01"), 8, false, false);
        assert_eq!(bitstring_to_string(&res), "101");
        let res = inf(&bs("10"), &bs("X0"), 2, true, false);
        assert_eq!(bitstring_to_string(&res), "10");
    }

    #[test]
    fn test_bitstring_from_constant() {
        assert_eq!(
            bitstring_to_string(&bitstring_from_constant(&APInt::from(10), 8, false)),
            "1010",
        );
        assert_eq!(
            bitstring_to_string(&bitstring_from_constant(&APInt::from(10), 8, true)),
            "01010",
        );
        assert_eq!(
            bitstring_to_string(&bitstring_from_constant(&APInt::from(-5), 8, true)),
            "11111011",
        );
        assert_eq!(bitstring_to_string(&bitstring_from_constant(&APInt::zero(), 8, true)), "0");
    }

    #[test]
    fn test_constant_strings() {
        assert!(is_constant_bitstring(&bs("0110")));
        assert!(!is_constant_bitstring(&bs("01U0")));
        assert_eq!(u_bitstring(3), bs("UUU"));
        assert_eq!(x_bitstring(2), bs("XX"));
    }
}
