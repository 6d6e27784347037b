//! The abstract-domain contract.
//!
//! A domain is a lattice whose elements over-approximate sets of concrete
//! program values. Domain authors implement the typed [`DomainOps`]
//! trait; program states store values behind the object-safe
//! [`AbstractDom`] trait, which a blanket impl derives from `DomainOps`
//! by downcasting the right-hand side. Mixing values of two different
//! domains in one operation is a programming error and panics.
//!
//! Required lattice laws:
//! - `leq` is a partial order; `equals` holds iff `leq` holds both ways.
//! - `join` is the least upper bound, `meet` the greatest lower bound.
//! - `widen` over-approximates `join` and stabilizes every ascending
//!   chain it is applied to in finitely many steps.
//! - `narrow` under-approximates, bounded below by `meet`.
//! - `normalize` is idempotent and preserves the abstract meaning.
//! - The `Hash` impl must be consistent with `equals`.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::ids::DomId;

/// A domain value shared between program states.
///
/// Values are immutable once published behind an `Rc`; all mutation
/// happens on boxed clones before re-wrapping.
pub type SharedVal = Rc<dyn AbstractDom>;

/// An owned, mutable domain value.
pub type OwnedVal = Box<dyn AbstractDom>;

/// Static metadata describing a domain kind, including the two value
/// factories the state manager uses to build default and bottom states.
#[derive(Debug)]
pub struct DomainDescriptor {
    pub id: DomId,
    pub name: &'static str,
    pub description: &'static str,
    /// Identity for `join`; the value a fresh state starts from.
    pub default_fn: fn() -> SharedVal,
    /// The lattice's least element.
    pub bottom_fn: fn() -> SharedVal,
}

/// Typed lattice operations a domain author implements.
///
/// The binary operations receive `&Self`; the framework guarantees both
/// sides belong to the same domain before they are called. Optional
/// operations default to their mandatory counterpart: the loop-head and
/// consecutive-iteration joins and `widen` fall back to `join`, `narrow`
/// falls back to `meet`, `equals` to `leq` both ways, and `normalize` to
/// a no-op.
pub trait DomainOps: Clone + fmt::Debug + fmt::Display + PartialEq + Hash + 'static {
    fn descriptor() -> &'static DomainDescriptor;

    /// Identity for `join`; typically bottom or a well-defined initial.
    fn default_val() -> Self;

    /// The lattice's least element.
    fn bottom_val() -> Self;

    fn join(&mut self, other: &Self);

    fn join_at_loop_head(&mut self, other: &Self) {
        self.join(other);
    }

    fn join_consecutive_iter(&mut self, other: &Self) {
        self.join(other);
    }

    fn widen(&mut self, other: &Self) {
        self.join(other);
    }

    fn meet(&mut self, other: &Self);

    fn narrow(&mut self, other: &Self) {
        self.meet(other);
    }

    /// Inclusion check: does `self` describe a subset of `other`?
    fn leq(&self, other: &Self) -> bool;

    fn equals(&self, other: &Self) -> bool {
        self.leq(other) && other.leq(self)
    }

    fn is_bottom(&self) -> bool;

    fn is_top(&self) -> bool;

    fn set_to_bottom(&mut self);

    fn set_to_top(&mut self);

    /// Canonicalize the internal representation. Must not change the
    /// abstract meaning.
    fn normalize(&mut self) {}
}

/// Object-safe capability set the program state composes over.
///
/// Obtained for free via the blanket impl over [`DomainOps`]; not meant
/// to be implemented by hand.
pub trait AbstractDom: fmt::Debug + 'static {
    fn dom_id(&self) -> DomId;

    fn descriptor(&self) -> &'static DomainDescriptor;

    fn as_any(&self) -> &dyn Any;

    fn clone_box(&self) -> OwnedVal;

    fn clone_shared(&self) -> SharedVal;

    fn join_with(&mut self, other: &dyn AbstractDom);

    fn join_with_at_loop_head(&mut self, other: &dyn AbstractDom);

    fn join_consecutive_iter_with(&mut self, other: &dyn AbstractDom);

    fn widen_with(&mut self, other: &dyn AbstractDom);

    fn meet_with(&mut self, other: &dyn AbstractDom);

    fn narrow_with(&mut self, other: &dyn AbstractDom);

    fn leq_with(&self, other: &dyn AbstractDom) -> bool;

    fn equals_with(&self, other: &dyn AbstractDom) -> bool;

    fn is_bottom(&self) -> bool;

    fn is_top(&self) -> bool;

    fn set_to_bottom(&mut self);

    fn set_to_top(&mut self);

    fn normalize(&mut self);

    /// Hash of the abstract value, consistent with `equals_with`.
    fn dom_hash(&self) -> u64;

    fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result;
}

/// Downcast the erased right-hand side of a binary op to the receiver's
/// domain. A mismatch means the state map paired two different domains
/// under one id, which cannot happen through the public surface.
fn expect_same<D: DomainOps>(other: &dyn AbstractDom) -> &D {
    other.as_any().downcast_ref::<D>().unwrap_or_else(|| {
        panic!(
            "incompatible domains: expected `{}`, got {}",
            <D as DomainOps>::descriptor().name,
            other.descriptor().name
        )
    })
}

impl<D: DomainOps> AbstractDom for D {
    fn dom_id(&self) -> DomId {
        <D as DomainOps>::descriptor().id
    }

    fn descriptor(&self) -> &'static DomainDescriptor {
        <D as DomainOps>::descriptor()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> OwnedVal {
        Box::new(self.clone())
    }

    fn clone_shared(&self) -> SharedVal {
        Rc::new(self.clone())
    }

    fn join_with(&mut self, other: &dyn AbstractDom) {
        <D as DomainOps>::join(self, expect_same::<D>(other));
    }

    fn join_with_at_loop_head(&mut self, other: &dyn AbstractDom) {
        <D as DomainOps>::join_at_loop_head(self, expect_same::<D>(other));
    }

    fn join_consecutive_iter_with(&mut self, other: &dyn AbstractDom) {
        <D as DomainOps>::join_consecutive_iter(self, expect_same::<D>(other));
    }

    fn widen_with(&mut self, other: &dyn AbstractDom) {
        <D as DomainOps>::widen(self, expect_same::<D>(other));
    }

    fn meet_with(&mut self, other: &dyn AbstractDom) {
        <D as DomainOps>::meet(self, expect_same::<D>(other));
    }

    fn narrow_with(&mut self, other: &dyn AbstractDom) {
        <D as DomainOps>::narrow(self, expect_same::<D>(other));
    }

    fn leq_with(&self, other: &dyn AbstractDom) -> bool {
        <D as DomainOps>::leq(self, expect_same::<D>(other))
    }

    fn equals_with(&self, other: &dyn AbstractDom) -> bool {
        <D as DomainOps>::equals(self, expect_same::<D>(other))
    }

    fn is_bottom(&self) -> bool {
        <D as DomainOps>::is_bottom(self)
    }

    fn is_top(&self) -> bool {
        <D as DomainOps>::is_top(self)
    }

    fn set_to_bottom(&mut self) {
        <D as DomainOps>::set_to_bottom(self);
    }

    fn set_to_top(&mut self) {
        <D as DomainOps>::set_to_top(self);
    }

    fn normalize(&mut self) {
        <D as DomainOps>::normalize(self);
    }

    fn dom_hash(&self) -> u64 {
        let mut hasher = std::hash::DefaultHasher::new();
        Hash::hash(self, &mut hasher);
        hasher.finish()
    }

    fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{self}")
    }
}
