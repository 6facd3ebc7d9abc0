//! Abstract-value slots of the constraint graph.

use std::fmt;

use crate::apint::APInt;
use crate::interval::Interval;
use crate::ir::Program;
use crate::range::{Range, RangeType};
use crate::types::ValueId;

/// Which ends of a node's range were still unbounded before narrowing.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum AbstractState {
    /// Both ends are bounded.
    #[default]
    Bounded,
    /// Lower end at minus infinity.
    Lower,
    /// Upper end at plus infinity.
    Upper,
    /// Neither end is bounded.
    Both,
}

impl AbstractState {
    pub fn as_char(self) -> char {
        match self {
            AbstractState::Bounded => '0',
            AbstractState::Lower => '-',
            AbstractState::Upper => '+',
            AbstractState::Both => '?',
        }
    }

    pub fn lower_open(self) -> bool {
        matches!(self, AbstractState::Lower | AbstractState::Both)
    }

    pub fn upper_open(self) -> bool {
        matches!(self, AbstractState::Upper | AbstractState::Both)
    }
}

/// Lower bound at minus infinity for its width.
pub(crate) fn is_neg_inf(r: &Range, v: &APInt) -> bool {
    v.is_min_sentinel() || *v == APInt::signed_min(r.bit_width())
}

/// Upper bound at plus infinity for its width.
pub(crate) fn is_pos_inf(r: &Range, v: &APInt) -> bool {
    v.is_max_sentinel() || *v == APInt::signed_max(r.bit_width())
}

#[derive(Debug, Clone)]
pub struct VarNode {
    value: ValueId,
    interval: Interval,
    abstract_state: AbstractState,
}

impl VarNode {
    /// A fresh node with an Unknown range of the value's type.
    pub fn new(value: ValueId, program: &Program) -> Self {
        Self {
            value,
            interval: program.range_for(value, RangeType::Unknown),
            abstract_state: AbstractState::default(),
        }
    }

    pub fn value(&self) -> ValueId {
        self.value
    }

    pub fn range(&self) -> &Interval {
        &self.interval
    }

    pub fn set_range(&mut self, interval: Interval) {
        assert_eq!(
            interval.is_real(),
            self.interval.is_real(),
            "Changing the kind of {} from {} to {}",
            self.value,
            self.interval,
            interval
        );
        self.interval = interval;
    }

    /// Seeds the range: constants get their value, values defined outside
    /// the analysed code (`outside`) their type range. Others stay Unknown.
    pub fn init(&mut self, program: &Program, outside: bool) {
        if !self.interval.is_unknown() {
            return;
        }
        if program.is_constant(self.value) || outside {
            self.interval = program.type_range(self.value);
        }
    }

    /// Gives up on the node: every value its type allows.
    pub fn max_range(&mut self, program: &Program) {
        self.interval = program.type_range(self.value);
    }

    pub fn abstract_state(&self) -> AbstractState {
        self.abstract_state
    }

    pub fn store_abstract_state(&mut self) {
        self.abstract_state = match &self.interval {
            Interval::Real(_) => AbstractState::Both,
            Interval::Int(r) if r.is_anti() || r.is_empty() || r.is_unknown() => {
                AbstractState::Both
            }
            Interval::Int(r) => match (is_neg_inf(r, r.lower()), is_pos_inf(r, r.upper())) {
                (true, true) => AbstractState::Both,
                (true, false) => AbstractState::Lower,
                (false, true) => AbstractState::Upper,
                (false, false) => AbstractState::Bounded,
            },
        };
    }
}

impl fmt::Display for VarNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Type;
    use test_log::test;

    #[test]
    fn test_init() {
        let mut p = Program::new();
        let x = p.add_value("x", Type::int(8, false));
        let c = p.add_int_constant(Type::int(8, true), 5);

        let mut nx = VarNode::new(x, &p);
        assert!(nx.range().is_unknown());
        nx.init(&p, false);
        assert!(nx.range().is_unknown());
        nx.init(&p, true);
        assert!(nx.range().is_full_set());

        let mut nc = VarNode::new(c, &p);
        nc.init(&p, false);
        assert_eq!(nc.range(), &Interval::Int(Range::constant(8, 5)));
        // Only Unknown nodes are seeded.
        nc.init(&p, true);
        assert_eq!(nc.range(), &Interval::Int(Range::constant(8, 5)));
    }

    #[test]
    fn test_abstract_state() {
        let mut p = Program::new();
        let x = p.add_value("x", Type::int(8, true));
        let mut n = VarNode::new(x, &p);

        n.set_range(Interval::Int(Range::regular(8, -128, 5)));
        n.store_abstract_state();
        assert_eq!(n.abstract_state(), AbstractState::Lower);

        n.set_range(Interval::Int(Range::regular(8, 0, 127)));
        n.store_abstract_state();
        assert_eq!(n.abstract_state().as_char(), '+');

        n.set_range(Interval::Int(Range::regular(8, 1, 2)));
        n.store_abstract_state();
        assert_eq!(n.abstract_state().as_char(), '0');

        n.max_range(&p);
        n.store_abstract_state();
        assert_eq!(n.abstract_state(), AbstractState::Both);
        assert!(n.abstract_state().lower_open() && n.abstract_state().upper_open());
    }

    #[test]
    #[should_panic(expected = "Changing the kind")]
    fn test_kind_is_fixed() {
        let mut p = Program::new();
        let x = p.add_value("x", Type::real(32));
        let mut n = VarNode::new(x, &p);
        n.set_range(Interval::Int(Range::full(32)));
    }
}
