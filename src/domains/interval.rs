//! Interval domain over `i64` with infinite bounds.

use std::fmt;
use std::rc::Rc;

use crate::domain::{DomainDescriptor, DomainOps};
use crate::ids::DomId;

pub static INTERVAL_DOMAIN: DomainDescriptor = DomainDescriptor {
    id: DomId::new(0),
    name: "interval",
    description: "ranges of machine integers with infinite bounds",
    default_fn: || Rc::new(Interval::top()),
    bottom_fn: || Rc::new(Interval::bottom()),
};

/// One end of an interval. Derived ordering puts `NegInf` below every
/// finite bound and `PosInf` above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bound {
    NegInf,
    Int(i64),
    PosInf,
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::NegInf => write!(f, "-inf"),
            Bound::Int(x) => write!(f, "{x}"),
            Bound::PosInf => write!(f, "+inf"),
        }
    }
}

/// A contiguous range of integers, or bottom.
///
/// The representation is canonical: every non-bottom value satisfies
/// `lb <= ub`, so derived equality and hashing agree with the lattice
/// order. `normalize` folds an inverted range to bottom; the constructors
/// and mutating ops never produce one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    Bottom,
    Range { lb: Bound, ub: Bound },
}

impl Interval {
    #[must_use]
    pub const fn top() -> Self {
        Interval::Range {
            lb: Bound::NegInf,
            ub: Bound::PosInf,
        }
    }

    #[must_use]
    pub const fn bottom() -> Self {
        Interval::Bottom
    }

    #[must_use]
    pub fn new(lb: i64, ub: i64) -> Self {
        if lb > ub {
            return Interval::Bottom;
        }
        Interval::Range {
            lb: Bound::Int(lb),
            ub: Bound::Int(ub),
        }
    }

    #[must_use]
    pub const fn singleton(x: i64) -> Self {
        Interval::Range {
            lb: Bound::Int(x),
            ub: Bound::Int(x),
        }
    }

    #[must_use]
    pub const fn at_least(lb: i64) -> Self {
        Interval::Range {
            lb: Bound::Int(lb),
            ub: Bound::PosInf,
        }
    }

    #[must_use]
    pub const fn at_most(ub: i64) -> Self {
        Interval::Range {
            lb: Bound::NegInf,
            ub: Bound::Int(ub),
        }
    }

    fn bounds(&self) -> Option<(Bound, Bound)> {
        match *self {
            Interval::Bottom => None,
            Interval::Range { lb, ub } => Some((lb, ub)),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interval::Bottom => write!(f, "_|_"),
            Interval::Range { lb, ub } => write!(f, "[{lb}, {ub}]"),
        }
    }
}

impl DomainOps for Interval {
    fn descriptor() -> &'static DomainDescriptor {
        &INTERVAL_DOMAIN
    }

    fn default_val() -> Self {
        Interval::top()
    }

    fn bottom_val() -> Self {
        Interval::bottom()
    }

    fn join(&mut self, other: &Self) {
        let Some((olb, oub)) = other.bounds() else {
            return;
        };
        match self.bounds() {
            None => *self = *other,
            Some((lb, ub)) => {
                *self = Interval::Range {
                    lb: lb.min(olb),
                    ub: ub.max(oub),
                };
            }
        }
    }

    fn widen(&mut self, other: &Self) {
        let Some((olb, oub)) = other.bounds() else {
            return;
        };
        match self.bounds() {
            None => *self = *other,
            Some((lb, ub)) => {
                // An unstable bound jumps straight to infinity so that
                // ascending chains stabilize.
                let lb = if olb < lb { Bound::NegInf } else { lb };
                let ub = if oub > ub { Bound::PosInf } else { ub };
                *self = Interval::Range { lb, ub };
            }
        }
    }

    fn meet(&mut self, other: &Self) {
        let (Some((lb, ub)), Some((olb, oub))) = (self.bounds(), other.bounds()) else {
            *self = Interval::Bottom;
            return;
        };
        let lb = lb.max(olb);
        let ub = ub.min(oub);
        *self = if lb > ub {
            Interval::Bottom
        } else {
            Interval::Range { lb, ub }
        };
    }

    fn narrow(&mut self, other: &Self) {
        let (Some((lb, ub)), Some((olb, oub))) = (self.bounds(), other.bounds()) else {
            *self = Interval::Bottom;
            return;
        };
        // Only bounds that widening pushed to infinity are refined.
        let lb = if lb == Bound::NegInf { olb } else { lb };
        let ub = if ub == Bound::PosInf { oub } else { ub };
        *self = if lb > ub {
            Interval::Bottom
        } else {
            Interval::Range { lb, ub }
        };
    }

    fn leq(&self, other: &Self) -> bool {
        match (self.bounds(), other.bounds()) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some((lb, ub)), Some((olb, oub))) => olb <= lb && ub <= oub,
        }
    }

    fn equals(&self, other: &Self) -> bool {
        self == other
    }

    fn is_bottom(&self) -> bool {
        matches!(self, Interval::Bottom)
    }

    fn is_top(&self) -> bool {
        matches!(
            self,
            Interval::Range {
                lb: Bound::NegInf,
                ub: Bound::PosInf,
            }
        )
    }

    fn set_to_bottom(&mut self) {
        *self = Interval::Bottom;
    }

    fn set_to_top(&mut self) {
        *self = Interval::top();
    }

    fn normalize(&mut self) {
        if let Interval::Range { lb, ub } = *self
            && lb > ub
        {
            *self = Interval::Bottom;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_takes_the_hull() {
        let mut a = Interval::new(0, 3);
        a.join(&Interval::new(5, 9));
        assert_eq!(a, Interval::new(0, 9));
    }

    #[test]
    fn bottom_is_join_identity() {
        let mut a = Interval::bottom();
        a.join(&Interval::new(2, 4));
        assert_eq!(a, Interval::new(2, 4));

        let mut b = Interval::new(2, 4);
        b.join(&Interval::bottom());
        assert_eq!(b, Interval::new(2, 4));
    }

    #[test]
    fn meet_intersects_and_bottoms_out_when_disjoint() {
        let mut a = Interval::new(0, 5);
        a.meet(&Interval::new(3, 9));
        assert_eq!(a, Interval::new(3, 5));

        let mut b = Interval::new(0, 1);
        b.meet(&Interval::new(5, 6));
        assert!(b.is_bottom());
    }

    #[test]
    fn widen_pushes_unstable_bounds_to_infinity() {
        let mut a = Interval::new(0, 10);
        a.widen(&Interval::new(0, 11));
        assert_eq!(a, Interval::at_least(0));

        let mut b = Interval::new(0, 10);
        b.widen(&Interval::new(-1, 10));
        assert_eq!(b, Interval::at_most(10));
    }

    #[test]
    fn widen_stabilizes_an_ascending_chain() {
        let mut cur = Interval::new(0, 0);
        let mut steps = 0;
        loop {
            let mut next = cur;
            next.join(&Interval::new(0, steps + 1));
            let mut widened = cur;
            widened.widen(&next);
            if widened == cur {
                break;
            }
            cur = widened;
            steps += 1;
            assert!(steps < 10, "widening failed to stabilize");
        }
        assert_eq!(cur, Interval::at_least(0));
    }

    #[test]
    fn narrow_recovers_widened_bounds() {
        let mut a = Interval::at_least(0);
        a.narrow(&Interval::new(0, 100));
        assert_eq!(a, Interval::new(0, 100));
    }

    #[test]
    fn leq_is_containment() {
        assert!(Interval::new(1, 2).leq(&Interval::new(0, 3)));
        assert!(!Interval::new(0, 3).leq(&Interval::new(1, 2)));
        assert!(Interval::bottom().leq(&Interval::new(7, 7)));
        assert!(Interval::new(7, 7).leq(&Interval::top()));
    }

    #[test]
    fn inverted_range_normalizes_to_bottom() {
        let mut weird = Interval::Range {
            lb: Bound::Int(5),
            ub: Bound::Int(1),
        };
        weird.normalize();
        assert!(weird.is_bottom());
        weird.normalize();
        assert!(weird.is_bottom());
    }

    #[test]
    fn dump_format() {
        assert_eq!(Interval::bottom().to_string(), "_|_");
        assert_eq!(Interval::new(1, 4).to_string(), "[1, 4]");
        assert_eq!(Interval::at_least(0).to_string(), "[0, +inf]");
    }
}
