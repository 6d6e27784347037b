//! Non-relational map domain: one interval per declaration.
//!
//! A missing key means "no information" (top) for that declaration, so
//! the map stays sparse. The representation is canonical: stored entries
//! are never top, and a map that learned any bottom entry collapses to
//! the bottom element as a whole. Canonical form is what makes derived
//! equality and hashing agree with the lattice order.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::domain::{DomainDescriptor, DomainOps};
use crate::domains::interval::Interval;
use crate::frontend::DeclRef;
use crate::ids::DomId;

pub static VAR_MAP_DOMAIN: DomainDescriptor = DomainDescriptor {
    id: DomId::new(1),
    name: "var-map",
    description: "non-relational map from declarations to intervals",
    default_fn: || Rc::new(VarMap::top()),
    bottom_fn: || Rc::new(VarMap::bottom()),
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VarMap {
    Bottom,
    Env(BTreeMap<DeclRef, Interval>),
}

impl VarMap {
    #[must_use]
    pub fn top() -> Self {
        VarMap::Env(BTreeMap::new())
    }

    #[must_use]
    pub const fn bottom() -> Self {
        VarMap::Bottom
    }

    /// The tracked interval of `decl`; top when nothing is known.
    #[must_use]
    pub fn value_of(&self, decl: DeclRef) -> Interval {
        match self {
            VarMap::Bottom => Interval::bottom(),
            VarMap::Env(entries) => entries.get(&decl).copied().unwrap_or_else(Interval::top),
        }
    }

    /// Record `itv` for `decl`, keeping the representation canonical.
    pub fn assign(&mut self, decl: DeclRef, itv: Interval) {
        let VarMap::Env(entries) = self else {
            return;
        };
        if itv.is_bottom() {
            *self = VarMap::Bottom;
        } else if itv.is_top() {
            entries.remove(&decl);
        } else {
            entries.insert(decl, itv);
        }
    }

    /// Drop what is known about `decl`.
    pub fn forget(&mut self, decl: DeclRef) {
        if let VarMap::Env(entries) = self {
            entries.remove(&decl);
        }
    }

    fn pointwise(
        &self,
        other: &Self,
        keep_self_only: bool,
        keep_other_only: bool,
        combine: impl Fn(&mut Interval, &Interval),
    ) -> VarMap {
        let (VarMap::Env(entries), VarMap::Env(other_entries)) = (self, other) else {
            unreachable!("bottom cases are handled by the callers");
        };
        let mut result = BTreeMap::new();
        for (decl, itv) in entries {
            match other_entries.get(decl) {
                Some(other_itv) => {
                    let mut combined = *itv;
                    combine(&mut combined, other_itv);
                    if combined.is_bottom() {
                        return VarMap::Bottom;
                    }
                    if !combined.is_top() {
                        result.insert(*decl, combined);
                    }
                }
                None if keep_self_only => {
                    result.insert(*decl, *itv);
                }
                None => {}
            }
        }
        if keep_other_only {
            for (decl, itv) in other_entries {
                if !entries.contains_key(decl) {
                    result.insert(*decl, *itv);
                }
            }
        }
        VarMap::Env(result)
    }
}

impl fmt::Display for VarMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarMap::Bottom => write!(f, "_|_"),
            VarMap::Env(entries) => {
                write!(f, "{{")?;
                for (i, (decl, itv)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{decl}: {itv}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl DomainOps for VarMap {
    fn descriptor() -> &'static DomainDescriptor {
        &VAR_MAP_DOMAIN
    }

    fn default_val() -> Self {
        VarMap::top()
    }

    fn bottom_val() -> Self {
        VarMap::bottom()
    }

    fn join(&mut self, other: &Self) {
        match (&*self, other) {
            (VarMap::Bottom, _) => *self = other.clone(),
            (_, VarMap::Bottom) => {}
            // A key missing on either side is top there, and joining
            // anything with top is top, so only shared keys survive.
            _ => *self = self.pointwise(other, false, false, Interval::join),
        }
    }

    fn widen(&mut self, other: &Self) {
        match (&*self, other) {
            (VarMap::Bottom, _) => *self = other.clone(),
            (_, VarMap::Bottom) => {}
            _ => *self = self.pointwise(other, false, false, Interval::widen),
        }
    }

    fn meet(&mut self, other: &Self) {
        match (&*self, other) {
            (VarMap::Bottom, _) => {}
            (_, VarMap::Bottom) => *self = VarMap::Bottom,
            // Meeting with a missing (top) entry keeps the present one.
            _ => *self = self.pointwise(other, true, true, Interval::meet),
        }
    }

    fn narrow(&mut self, other: &Self) {
        match (&*self, other) {
            (VarMap::Bottom, _) => {}
            (_, VarMap::Bottom) => *self = VarMap::Bottom,
            _ => *self = self.pointwise(other, true, true, Interval::narrow),
        }
    }

    fn leq(&self, other: &Self) -> bool {
        match (self, other) {
            (VarMap::Bottom, _) => true,
            (_, VarMap::Bottom) => false,
            (VarMap::Env(entries), VarMap::Env(other_entries)) => {
                other_entries
                    .iter()
                    .all(|(decl, other_itv)| match entries.get(decl) {
                        Some(itv) => itv.leq(other_itv),
                        // Missing on self means top, and a canonical
                        // entry on other is strictly below top.
                        None => false,
                    })
            }
        }
    }

    fn equals(&self, other: &Self) -> bool {
        self == other
    }

    fn is_bottom(&self) -> bool {
        matches!(self, VarMap::Bottom)
    }

    fn is_top(&self) -> bool {
        matches!(self, VarMap::Env(entries) if entries.is_empty())
    }

    fn set_to_bottom(&mut self) {
        *self = VarMap::Bottom;
    }

    fn set_to_top(&mut self) {
        *self = VarMap::top();
    }

    fn normalize(&mut self) {
        let VarMap::Env(entries) = self else {
            return;
        };
        if entries.values().any(Interval::is_bottom) {
            *self = VarMap::Bottom;
        } else {
            entries.retain(|_, itv| !itv.is_top());
        }
    }
}
