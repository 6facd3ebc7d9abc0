//! Meet operators used while solving a strongly connected component.
//!
//! Each operator combines the current range of a sink (`old`) with a fresh
//! evaluation of its defining operation (`new`):
//!
//! - **fixed**: plain assignment, used for bounded iteration.
//! - **widen**: jumps growing bounds to the next program constant, or to
//!   infinity when none is left.
//! - **growth**: widening without a jump set.
//! - **narrow**: recovers the bounds widening pushed to infinity.
//! - **crop**: the narrowing of the crop-DFS strategy, guided by which ends
//!   of the range were unbounded after growth.
//!
//! Real ranges are met field by field.

use log::trace;

use crate::apint::APInt;
use crate::config::RangeConfig;
use crate::container::NodeContainer;
use crate::interval::Interval;
use crate::ir::Program;
use crate::range::Range;
use crate::real_range::RealRange;
use crate::types::OpId;
use crate::var_node::{is_neg_inf, is_pos_inf, AbstractState};

#[derive(Debug, Copy, Clone)]
pub enum Meet<'a> {
    Fixed,
    /// Widening to the given sorted jump set.
    Widen(&'a [APInt]),
    Growth,
    Narrow,
    Crop,
}

impl Meet<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Meet::Fixed => "fixed",
            Meet::Widen(_) => "widen",
            Meet::Growth => "growth",
            Meet::Narrow => "narrow",
            Meet::Crop => "crop",
        }
    }

    /// Re-evaluates `op` and merges the result into its sink.
    ///
    /// Returns whether the sink's range changed.
    pub fn apply(
        self,
        op: OpId,
        nodes: &mut NodeContainer,
        program: &Program,
        config: &RangeConfig,
    ) -> bool {
        let new = nodes.op(op).eval(nodes, program, config);
        let sink = nodes.op(op).sink();
        let node = nodes.var(sink);
        let old = node.range().clone();
        let merged = match self {
            Meet::Fixed => new,
            Meet::Widen(constants) => widen(&old, &new, constants),
            Meet::Growth => growth(&old, &new),
            Meet::Narrow => narrow(&old, &new),
            Meet::Crop => crop(&old, &new, node.abstract_state()),
        };
        let changed = !same_range(&old, &merged);
        trace!("{} {}: {} -> {}", self.name(), node.value(), old, merged);
        nodes.var_mut(sink).set_range(merged);
        changed
    }
}

/// Equality of ranges, with every representation of the full set equal.
pub fn same_range(a: &Interval, b: &Interval) -> bool {
    match (a, b) {
        (Interval::Int(x), Interval::Int(y)) => same_int(x, y),
        (Interval::Real(x), Interval::Real(y)) => {
            same_int(x.sign(), y.sign()) && same_int(x.exponent(), y.exponent()) && same_int(
                x.significand(),
                y.significand(),
            )
        }
        _ => false,
    }
}

fn same_int(x: &Range, y: &Range) -> bool {
    x == y || (x.is_regular() && y.is_regular() && x.is_full_set() && y.is_full_set())
}

fn fieldwise(old: &Interval, new: &Interval, f: impl Fn(&Range, &Range) -> Range) -> Interval {
    match (old, new) {
        (Interval::Int(o), Interval::Int(n)) => Interval::Int(f(o, n)),
        (Interval::Real(o), Interval::Real(n)) => Interval::Real(RealRange::new(
            f(o.sign(), n.sign()),
            f(o.exponent(), n.exponent()),
            f(o.significand(), n.significand()),
        )),
        _ => panic!("Meet of {} and {} mixes integer and real ranges", old, new),
    }
}

pub fn widen(old: &Interval, new: &Interval, constants: &[APInt]) -> Interval {
    match (old, new) {
        (Interval::Int(o), Interval::Int(n)) => Interval::Int(widen_int(o, n, constants)),
        // The jump set only holds integer constants.
        _ => fieldwise(old, new, |o, n| widen_int(o, n, &[])),
    }
}

pub fn growth(old: &Interval, new: &Interval) -> Interval {
    fieldwise(old, new, |o, n| widen_int(o, n, &[]))
}

pub fn narrow(old: &Interval, new: &Interval) -> Interval {
    fieldwise(old, new, narrow_int)
}

pub fn crop(old: &Interval, new: &Interval, state: AbstractState) -> Interval {
    fieldwise(old, new, |o, n| crop_int(o, n, state))
}

/// Smallest constant not below `v`, or plus infinity.
fn first_greater(constants: &[APInt], v: &APInt) -> APInt {
    constants.iter().find(|c| *c >= v).cloned().unwrap_or_else(APInt::max_sentinel)
}

/// Largest constant not above `v`, or minus infinity.
fn first_less(constants: &[APInt], v: &APInt) -> APInt {
    constants.iter().rev().find(|c| *c <= v).cloned().unwrap_or_else(APInt::min_sentinel)
}

/// Bounds of the hole of an anti-range.
fn hole(r: &Range) -> (APInt, APInt) {
    let h = r.get_anti();
    (h.lower().clone(), h.upper().clone())
}

fn is_irregular(r: &Range) -> bool {
    r.is_unknown() || r.is_empty() || r.is_anti()
}

fn widen_int(old: &Range, new: &Range, constants: &[APInt]) -> Range {
    let bw = old.bit_width();
    if new.is_unknown() {
        return old.clone();
    }
    if is_irregular(old) || is_irregular(new) {
        if old.is_anti() && new.is_anti() {
            if old == new {
                return old.clone();
            }
            // Widening an anti-range shrinks its hole.
            let (ol, ou) = hole(old);
            let (nl, nu) = hole(new);
            if nl <= ol && nu >= ou {
                return old.clone();
            }
            let l = if nl > ol { first_greater(constants, &nl) } else { ol };
            let u = if nu < ou { first_less(constants, &nu) } else { ou };
            return if l > u { Range::full(bw) } else { Range::anti(bw, l, u) };
        }
        if old.is_unknown() || old.is_empty() {
            return new.clone();
        }
        if new.is_empty() || old.is_full_set() {
            return old.clone();
        }
        // One side is anti: the join is anti or full, so chains stay finite.
        return old.union_with(new);
    }
    let (ol, ou) = (old.lower(), old.upper());
    let (nl, nu) = (new.lower(), new.upper());
    if nl >= ol && nu <= ou {
        return old.clone();
    }
    let l = if nl < ol { first_less(constants, nl) } else { ol.clone() };
    let u = if nu > ou { first_greater(constants, nu) } else { ou.clone() };
    Range::regular(bw, l, u)
}

fn narrow_int(old: &Range, new: &Range) -> Range {
    let bw = old.bit_width();
    if new.is_unknown() {
        return old.clone();
    }
    if new.is_constant() {
        return new.clone();
    }
    if is_irregular(old) || is_irregular(new) {
        if old.is_anti() && new.is_anti() {
            let (ol, ou) = hole(old);
            let (nl, nu) = hole(new);
            return if nl <= ol && nu >= ou { new.clone() } else { old.clone() };
        }
        return if new.is_empty() || !new.is_full_set() { new.clone() } else { old.clone() };
    }
    let (ol, ou) = (old.lower(), old.upper());
    let (nl, nu) = (new.lower(), new.upper());
    let l = if (is_neg_inf(old, ol) && !is_neg_inf(new, nl)) || nl < ol {
        nl
    } else {
        ol
    };
    let u = if (is_pos_inf(old, ou) && !is_pos_inf(new, nu)) || nu > ou {
        nu
    } else {
        ou
    };
    if l == ol && u == ou {
        return old.clone();
    }
    Range::regular(bw, l.clone(), u.clone())
}

fn crop_int(old: &Range, new: &Range, state: AbstractState) -> Range {
    let bw = old.bit_width();
    if new.is_unknown() {
        return old.clone();
    }
    if is_irregular(old) || is_irregular(new) {
        return new.clone();
    }
    let (ol, ou) = (old.lower(), old.upper());
    let (nl, nu) = (new.lower(), new.upper());
    if state.lower_open() && nl > ol {
        Range::regular(bw, nl.clone(), ou.clone())
    } else if state.upper_open() && nu < ou {
        Range::regular(bw, ol.clone(), nu.clone())
    } else {
        old.clone()
    }
}
