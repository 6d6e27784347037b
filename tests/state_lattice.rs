//! Lattice behavior of interned program states.

mod support;

use std::rc::Rc;

use flowstate::domain::DomainOps;
use flowstate::domains::interval::Interval;
use flowstate::domains::map::VarMap;
use flowstate::frontend::{SExprRef, StmtRef};
use flowstate::region::RegionRef;

use support::{Flag, FlagHost, Mode, NumericHost, manager_with, state_manager_for};

#[test]
fn default_state_of_bottom_valued_domains_is_bottom() {
    let mgr = manager_with(FlagHost);
    let states = state_manager_for(&mgr);

    let state = states.get_default_state();
    assert!(state.is_bottom());
    assert!(!state.is_top());
}

#[test]
fn dump_names_each_domain_and_value() {
    let mgr = manager_with(FlagHost);
    let states = state_manager_for(&mgr);

    let state = states.get_default_state();
    let mut out = String::new();
    state.dump(&mut out).expect("dump into a string");
    assert!(out.contains("[flag]: bottom"), "dump was: {out}");
    assert!(out.contains("[mode]: bottom"), "dump was: {out}");
}

#[test]
fn equal_states_are_the_same_pool_slot() {
    let mgr = manager_with(NumericHost);
    let states = state_manager_for(&mgr);

    let s1 = states.get_default_state();
    let via_set = s1.set(Interval::new(0, 9));
    let via_set_again = s1.set(Interval::new(0, 9));
    assert!(Rc::ptr_eq(&via_set, &via_set_again));
    assert!(via_set.equals(&via_set_again));

    assert!(!Rc::ptr_eq(&s1, &via_set));
    assert!(!s1.equals(&via_set));
}

#[test]
fn setting_an_equal_value_returns_the_same_state() {
    let mgr = manager_with(NumericHost);
    let states = state_manager_for(&mgr);

    let s1 = states.get_default_state();
    let value = s1
        .get_clone::<Interval>()
        .expect("default state carries the interval domain");
    let s2 = s1.set(value);
    assert!(Rc::ptr_eq(&s1, &s2));
}

#[test]
fn mutators_leave_the_receiver_untouched() {
    let mgr = manager_with(NumericHost);
    let states = state_manager_for(&mgr);

    let original = states.get_default_state();
    let updated = original.set(Interval::new(3, 7));

    assert!(original.get_ref::<Interval>().expect("present").is_top());
    assert_eq!(
        updated.get_clone::<Interval>(),
        Some(Interval::new(3, 7))
    );

    let with_sexpr = original.set_region_sexpr(RegionRef::new(0), SExprRef::new(42));
    assert_eq!(original.get_region_sexpr(RegionRef::new(0)), None);
    assert_eq!(
        with_sexpr.get_region_sexpr(RegionRef::new(0)),
        Some(SExprRef::new(42))
    );
}

#[test]
fn leq_is_reflexive_and_transitive() {
    let mgr = manager_with(NumericHost);
    let states = state_manager_for(&mgr);

    let base = states.get_default_state();
    let s1 = base.set(Interval::new(1, 2));
    let s2 = base.set(Interval::new(0, 5));
    let s3 = base.set(Interval::new(0, 100));

    assert!(s1.leq(&s1));
    assert!(s1.leq(&s2));
    assert!(s2.leq(&s3));
    assert!(s1.leq(&s3));
    assert!(!s3.leq(&s1));
}

#[test]
fn join_is_an_upper_bound_and_meet_a_lower_bound() {
    let mgr = manager_with(NumericHost);
    let states = state_manager_for(&mgr);

    let base = states.get_default_state();
    let a = base.set(Interval::new(0, 3));
    let b = base.set(Interval::new(5, 9));

    let joined = a.join(&b);
    assert!(a.leq(&joined));
    assert!(b.leq(&joined));
    assert_eq!(joined.get_clone::<Interval>(), Some(Interval::new(0, 9)));

    let met = a.meet(&b);
    assert!(met.leq(&a));
    assert!(met.leq(&b));
    assert!(met.is_bottom());

    let widened = a.widen(&b);
    assert!(a.leq(&widened));
    assert!(b.leq(&widened));
}

#[test]
fn join_meet_and_normalize_are_idempotent() {
    let mgr = manager_with(NumericHost);
    let states = state_manager_for(&mgr);

    let a = states.get_default_state().set(Interval::new(2, 4));
    assert!(Rc::ptr_eq(&a.join(&a), &a));
    assert!(Rc::ptr_eq(&a.meet(&a), &a));

    let normalized = a.normalize();
    assert!(Rc::ptr_eq(&normalized.normalize(), &normalized));
}

#[test]
fn bottom_and_top_states_absorb() {
    let mgr = manager_with(NumericHost);
    let states = state_manager_for(&mgr);

    let bottom = states.get_bottom_state();
    let top = states.get_default_state();
    assert!(bottom.is_bottom());
    assert!(top.is_top());

    let a = top.set(Interval::new(1, 8));
    assert!(Rc::ptr_eq(&bottom.join(&a), &a));
    assert!(Rc::ptr_eq(&top.meet(&a), &a));

    assert!(Rc::ptr_eq(&a.set_to_bottom(), &bottom));
    assert!(Rc::ptr_eq(&a.set_to_top(), &top));
}

#[test]
fn pointwise_join_and_meet_reach_top_and_bottom() {
    let mgr = manager_with(FlagHost);
    let states = state_manager_for(&mgr);

    let base = states.get_default_state();
    let s_a = base.set(Flag::Sym('a'));
    let s_b = base.set(Flag::Sym('b'));

    let joined = s_a.join(&s_b);
    assert_eq!(joined.get_clone::<Flag>(), Some(Flag::Top));
    assert!(s_a.leq(&joined));

    let met = s_a.meet(&s_b);
    assert_eq!(met.get_clone::<Flag>(), Some(Flag::Bottom));
}

#[test]
fn asymmetric_key_sets_compare_per_the_closure_rules() {
    let mgr = manager_with(FlagHost);
    let states = state_manager_for(&mgr);
    let base = states.get_default_state();

    // Key only on self must be bottom; key only on other must be top.
    let x_bottom = base.remove::<Mode>();
    let y_top = base.remove::<Flag>().set(Mode::Top);
    assert!(x_bottom.leq(&y_top));
    assert!(!y_top.leq(&x_bottom));

    // A non-bottom value with no counterpart breaks the order.
    let x_sym = base.remove::<Mode>().set(Flag::Sym('a'));
    assert!(!x_sym.leq(&y_top));

    // A non-top value on the other side breaks it too, in both directions.
    let y_bottom = base.remove::<Flag>();
    assert!(!x_bottom.leq(&y_bottom));
    assert!(!y_bottom.leq(&x_bottom));
}

#[test]
fn widening_a_growing_state_stabilizes() {
    let mgr = manager_with(NumericHost);
    let states = state_manager_for(&mgr);
    let base = states.get_default_state();

    let mut cur = base.set(Interval::new(0, 0));
    let mut steps = 0;
    loop {
        let next = base.set(Interval::new(0, steps + 1));
        let widened = cur.widen(&next);
        if Rc::ptr_eq(&widened, &cur) {
            break;
        }
        cur = widened;
        steps += 1;
        assert!(steps < 10, "state widening failed to stabilize");
    }
    assert_eq!(cur.get_clone::<Interval>(), Some(Interval::at_least(0)));
}

#[test]
fn lattice_ops_keep_the_receivers_sexpr_bindings() {
    let mgr = manager_with(NumericHost);
    let states = state_manager_for(&mgr);
    let base = states.get_default_state();

    let left = base
        .set(Interval::new(0, 1))
        .set_stmt_sexpr(StmtRef::new(0), SExprRef::new(5));
    let right = base
        .set(Interval::new(4, 6))
        .set_stmt_sexpr(StmtRef::new(1), SExprRef::new(7));

    let joined = left.join(&right);
    assert_eq!(joined.get_stmt_sexpr(StmtRef::new(0)), Some(SExprRef::new(5)));
    assert_eq!(joined.get_stmt_sexpr(StmtRef::new(1)), None);

    let met = left.meet(&right);
    assert_eq!(met.get_stmt_sexpr(StmtRef::new(0)), Some(SExprRef::new(5)));
    assert_eq!(met.get_stmt_sexpr(StmtRef::new(1)), None);
}

#[test]
fn sexpr_bindings_participate_in_interning() {
    let mgr = manager_with(NumericHost);
    let states = state_manager_for(&mgr);
    let base = states.get_default_state();

    let bound = base.set_stmt_sexpr(StmtRef::new(3), SExprRef::new(9));
    assert!(!Rc::ptr_eq(&base, &bound));
    assert!(!base.equals(&bound));

    let bound_again = base.set_stmt_sexpr(StmtRef::new(3), SExprRef::new(9));
    assert!(Rc::ptr_eq(&bound, &bound_again));
}

#[test]
fn removed_domains_read_back_as_their_default() {
    let mgr = manager_with(NumericHost);
    let states = state_manager_for(&mgr);

    let base = states.get_default_state().set(VarMap::top());
    let without = base.remove::<VarMap>();
    assert!(!without.exists::<VarMap>());
    assert!(without.get_clone::<VarMap>().is_none());
    assert!(without.get_or_default::<VarMap>().is_top());
}
