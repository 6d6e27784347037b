//! Program states and the hash-consing state manager.
//!
//! A [`ProgramState`] is the immutable map from domain id to abstract
//! value at one program point, together with two auxiliary maps binding
//! regions and statements to symbolic expressions. States are produced
//! only through the [`StateManager`], which interns them: equal states
//! share one allocation, so handle identity is state equality and the
//! fixpoint driver can compare iterations by pointer.
//!
//! Every mutator returns a new interned state; nothing is modified in
//! place. Lattice operations are lifted pointwise over the domain map.
//! The auxiliary maps of the receiver are carried through lattice ops
//! untouched; they track per-path facts that the fixpoint loop resolves
//! at its own granularity, not lattice content to be merged.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::rc::{Rc, Weak};

use crate::analysis::AnalysisManager;
use crate::domain::{AbstractDom, DomainDescriptor, DomainOps, SharedVal};
use crate::frame::StackFrame;
use crate::frontend::{SExprRef, StmtRef};
use crate::ids::DomId;
use crate::region::{RegionManager, RegionRef};

/// Shared handle to an interned program state.
///
/// Retain/release is scoped: cloning the handle retains, dropping
/// releases; when the last handle goes away the pool slot is reclaimed.
pub type ProgramStateRef = Rc<ProgramState>;

pub type DomValMap = BTreeMap<DomId, SharedVal>;
pub type RegionSExprMap = BTreeMap<RegionRef, SExprRef>;
pub type StmtSExprMap = BTreeMap<StmtRef, SExprRef>;

fn entry_hash(tag: u8, key: u64, val: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    (tag, key, val).hash(&mut hasher);
    hasher.finish()
}

/// The abstract program state at one program point.
pub struct ProgramState {
    dom_val: DomValMap,
    region_sexpr: RegionSExprMap,
    stmt_sexpr: StmtSExprMap,
    mgr: StateManager,
}

impl ProgramState {
    /// The manager this state was interned by.
    #[must_use]
    pub fn manager(&self) -> &StateManager {
        &self.mgr
    }

    #[must_use]
    pub fn dom_val(&self) -> &DomValMap {
        &self.dom_val
    }

    #[must_use]
    pub fn region_sexpr(&self) -> &RegionSExprMap {
        &self.region_sexpr
    }

    #[must_use]
    pub fn stmt_sexpr(&self) -> &StmtSExprMap {
        &self.stmt_sexpr
    }

    /// Does the state carry a value for domain `D`?
    #[must_use]
    pub fn exists<D: DomainOps>(&self) -> bool {
        self.dom_val.contains_key(&D::descriptor().id)
    }

    /// Borrow the value of domain `D`, if present.
    #[must_use]
    pub fn get_ref<D: DomainOps>(&self) -> Option<&D> {
        self.dom_val.get(&D::descriptor().id).map(|val| {
            val.as_any().downcast_ref::<D>().unwrap_or_else(|| {
                panic!(
                    "state entry for {} does not belong to domain `{}`",
                    D::descriptor().id,
                    D::descriptor().name
                )
            })
        })
    }

    /// Owned copy of the value of domain `D`, if present.
    #[must_use]
    pub fn get_clone<D: DomainOps>(&self) -> Option<D> {
        self.get_ref::<D>().cloned()
    }

    /// Owned copy of the value of domain `D`, or its default.
    #[must_use]
    pub fn get_or_default<D: DomainOps>(&self) -> D {
        self.get_clone::<D>().unwrap_or_else(D::default_val)
    }

    /// Replace or insert the value of domain `D`.
    #[must_use]
    pub fn set<D: DomainOps>(&self, val: D) -> ProgramStateRef {
        self.set_shared(Rc::new(val))
    }

    /// Replace or insert a value under its own domain id.
    #[must_use]
    pub fn set_shared(&self, val: SharedVal) -> ProgramStateRef {
        let mut dom_val = self.dom_val.clone();
        dom_val.insert(val.dom_id(), val);
        self.mgr.intern_with_dom_val(self, dom_val)
    }

    /// Erase the value of domain `D`.
    #[must_use]
    pub fn remove<D: DomainOps>(&self) -> ProgramStateRef {
        let mut dom_val = self.dom_val.clone();
        dom_val.remove(&D::descriptor().id);
        self.mgr.intern_with_dom_val(self, dom_val)
    }

    /// Canonicalize every domain value.
    #[must_use]
    pub fn normalize(&self) -> ProgramStateRef {
        let mut dom_val = DomValMap::new();
        for (id, val) in &self.dom_val {
            let mut owned = val.clone_box();
            owned.normalize();
            dom_val.insert(*id, Rc::from(owned));
        }
        self.mgr.intern_with_dom_val(self, dom_val)
    }

    /// A state is bottom as soon as any domain has no concrete states.
    #[must_use]
    pub fn is_bottom(&self) -> bool {
        self.dom_val.values().any(|val| val.is_bottom())
    }

    /// A state is top when every domain knows nothing.
    #[must_use]
    pub fn is_top(&self) -> bool {
        self.dom_val.values().all(|val| val.is_top())
    }

    #[must_use]
    pub fn set_to_bottom(&self) -> ProgramStateRef {
        self.mgr.get_bottom_state()
    }

    #[must_use]
    pub fn set_to_top(&self) -> ProgramStateRef {
        let mut dom_val = DomValMap::new();
        for (id, val) in &self.dom_val {
            let mut owned = val.clone_box();
            owned.set_to_top();
            dom_val.insert(*id, Rc::from(owned));
        }
        self.mgr.intern_with_dom_val(self, dom_val)
    }

    fn union_pointwise(
        &self,
        other: &ProgramState,
        apply: impl Fn(&mut dyn AbstractDom, &dyn AbstractDom),
    ) -> ProgramStateRef {
        let mut dom_val = self.dom_val.clone();
        for (id, other_val) in &other.dom_val {
            match self.dom_val.get(id) {
                Some(self_val) => {
                    let mut combined = self_val.clone_box();
                    apply(combined.as_mut(), other_val.as_ref());
                    dom_val.insert(*id, Rc::from(combined));
                }
                None => {
                    dom_val.insert(*id, other_val.clone_shared());
                }
            }
        }
        self.mgr.intern_with_dom_val(self, dom_val)
    }

    fn intersect_pointwise(
        &self,
        other: &ProgramState,
        apply: impl Fn(&mut dyn AbstractDom, &dyn AbstractDom),
    ) -> ProgramStateRef {
        let mut dom_val = DomValMap::new();
        for (id, other_val) in &other.dom_val {
            if let Some(self_val) = self.dom_val.get(id) {
                let mut combined = self_val.clone_box();
                apply(combined.as_mut(), other_val.as_ref());
                dom_val.insert(*id, Rc::from(combined));
            }
        }
        self.mgr.intern_with_dom_val(self, dom_val)
    }

    #[must_use]
    pub fn join(&self, other: &ProgramState) -> ProgramStateRef {
        self.union_pointwise(other, |a, b| a.join_with(b))
    }

    #[must_use]
    pub fn join_at_loop_head(&self, other: &ProgramState) -> ProgramStateRef {
        self.union_pointwise(other, |a, b| a.join_with_at_loop_head(b))
    }

    #[must_use]
    pub fn join_consecutive_iter(&self, other: &ProgramState) -> ProgramStateRef {
        self.union_pointwise(other, |a, b| a.join_consecutive_iter_with(b))
    }

    #[must_use]
    pub fn widen(&self, other: &ProgramState) -> ProgramStateRef {
        self.union_pointwise(other, |a, b| a.widen_with(b))
    }

    #[must_use]
    pub fn meet(&self, other: &ProgramState) -> ProgramStateRef {
        self.intersect_pointwise(other, |a, b| a.meet_with(b))
    }

    #[must_use]
    pub fn narrow(&self, other: &ProgramState) -> ProgramStateRef {
        self.intersect_pointwise(other, |a, b| a.narrow_with(b))
    }

    /// Inclusion over states.
    ///
    /// A domain missing on one side reads as bottom for that side, so the
    /// first pass requires every own value to be included in the other's
    /// (or be bottom where the other has no entry). A key present only on
    /// `other` must be top: absence on `self` is an upward-closure claim,
    /// not a free pass.
    #[must_use]
    pub fn leq(&self, other: &ProgramState) -> bool {
        for (id, val) in &self.dom_val {
            match other.dom_val.get(id) {
                Some(other_val) => {
                    if !val.leq_with(other_val.as_ref()) {
                        return false;
                    }
                }
                None => {
                    if !val.is_bottom() {
                        return false;
                    }
                }
            }
        }
        for (id, other_val) in &other.dom_val {
            if !self.dom_val.contains_key(id) && !other_val.is_top() {
                return false;
            }
        }
        true
    }

    /// Structural equality: same domains with equal values, same
    /// auxiliary bindings.
    #[must_use]
    pub fn equals(&self, other: &ProgramState) -> bool {
        if self.dom_val.len() != other.dom_val.len() {
            return false;
        }
        for (id, val) in &self.dom_val {
            match other.dom_val.get(id) {
                Some(other_val) => {
                    if !val.equals_with(other_val.as_ref()) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        self.region_sexpr == other.region_sexpr && self.stmt_sexpr == other.stmt_sexpr
    }

    /// The region of `decl` in `frame`, if the region model covers it.
    #[must_use]
    pub fn get_region(&self, decl: crate::frontend::DeclRef, frame: &Rc<StackFrame>) -> Option<RegionRef> {
        self.mgr.region_manager().get_region(decl, frame)
    }

    #[must_use]
    pub fn set_region_sexpr(&self, region: RegionRef, sexpr: SExprRef) -> ProgramStateRef {
        let mut region_sexpr = self.region_sexpr.clone();
        region_sexpr.insert(region, sexpr);
        self.mgr.intern_with_region_sexpr(self, region_sexpr)
    }

    #[must_use]
    pub fn get_region_sexpr(&self, region: RegionRef) -> Option<SExprRef> {
        self.region_sexpr.get(&region).copied()
    }

    #[must_use]
    pub fn set_stmt_sexpr(&self, stmt: StmtRef, sexpr: SExprRef) -> ProgramStateRef {
        let mut stmt_sexpr = self.stmt_sexpr.clone();
        stmt_sexpr.insert(stmt, sexpr);
        self.mgr.intern_with_stmt_sexpr(self, stmt_sexpr)
    }

    #[must_use]
    pub fn get_stmt_sexpr(&self, stmt: StmtRef) -> Option<SExprRef> {
        self.stmt_sexpr.get(&stmt).copied()
    }

    /// Order-independent hash over every entry of the three maps,
    /// consistent with [`ProgramState::equals`]. This is the interning
    /// key.
    #[must_use]
    pub fn profile(&self) -> u64 {
        let mut acc: u64 = 0;
        for (id, val) in &self.dom_val {
            acc = acc.wrapping_add(entry_hash(0, u64::from(id.get()), val.dom_hash()));
        }
        for (region, sexpr) in &self.region_sexpr {
            acc = acc.wrapping_add(entry_hash(1, u64::from(region.get()), u64::from(sexpr.get())));
        }
        for (stmt, sexpr) in &self.stmt_sexpr {
            acc = acc.wrapping_add(entry_hash(2, u64::from(stmt.get()), u64::from(sexpr.get())));
        }
        acc
    }

    /// Write one `[domain]: value` line per entry, ascending domain id.
    pub fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        for (i, val) in self.dom_val.values().enumerate() {
            if i > 0 {
                writeln!(out)?;
            }
            write!(out, "[{}]: ", val.descriptor().name)?;
            val.dump(out)?;
        }
        Ok(())
    }
}

impl PartialEq for ProgramState {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Display for ProgramState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump(f)
    }
}

impl fmt::Debug for ProgramState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProgramState {{ ")?;
        self.dump(f)?;
        write!(f, " }}")
    }
}

#[derive(Default)]
struct StatePool {
    buckets: HashMap<u64, Vec<Weak<ProgramState>>>,
}

struct StateManagerInner {
    /// Descriptors of every domain registered under a required analysis,
    /// ascending by id.
    domains: Vec<&'static DomainDescriptor>,
    dom_ids: BTreeSet<DomId>,
    region_mgr: Rc<RegionManager>,
    pool: RefCell<StatePool>,
}

/// Hash-consed pool of program states.
///
/// Cheap to clone; every clone is a handle to the same pool. Built after
/// analysis registration from the manager's table of required domains.
#[derive(Clone)]
pub struct StateManager {
    inner: Rc<StateManagerInner>,
}

impl StateManager {
    #[must_use]
    pub fn new(analysis_mgr: &AnalysisManager, region_mgr: Rc<RegionManager>) -> Self {
        Self::from_domain_table(analysis_mgr.required_domain_table(), region_mgr)
    }

    fn from_domain_table(
        mut domains: Vec<&'static DomainDescriptor>,
        region_mgr: Rc<RegionManager>,
    ) -> Self {
        domains.sort_by_key(|d| d.id);
        let dom_ids = domains.iter().map(|d| d.id).collect();
        Self {
            inner: Rc::new(StateManagerInner {
                domains,
                dom_ids,
                region_mgr,
                pool: RefCell::new(StatePool::default()),
            }),
        }
    }

    #[must_use]
    pub fn region_manager(&self) -> &RegionManager {
        &self.inner.region_mgr
    }

    /// Ids of the domains states of this manager may carry.
    #[must_use]
    pub fn dom_ids(&self) -> &BTreeSet<DomId> {
        &self.inner.dom_ids
    }

    /// State carrying every required domain's default value.
    #[must_use]
    pub fn get_default_state(&self) -> ProgramStateRef {
        let dom_val = self
            .inner
            .domains
            .iter()
            .map(|d| (d.id, (d.default_fn)()))
            .collect();
        self.intern_parts(dom_val, BTreeMap::new(), BTreeMap::new())
    }

    /// State carrying every required domain's bottom value.
    #[must_use]
    pub fn get_bottom_state(&self) -> ProgramStateRef {
        let dom_val = self
            .inner
            .domains
            .iter()
            .map(|d| (d.id, (d.bottom_fn)()))
            .collect();
        self.intern_parts(dom_val, BTreeMap::new(), BTreeMap::new())
    }

    /// Intern a candidate state: return the pooled equivalent if one is
    /// live, otherwise move the candidate into the pool.
    ///
    /// Panics if the candidate carries a domain id outside the required
    /// table; such a state cannot have been built through the public
    /// surface.
    #[must_use]
    pub fn intern(&self, candidate: ProgramState) -> ProgramStateRef {
        for id in candidate.dom_val.keys() {
            assert!(
                self.inner.dom_ids.contains(id),
                "state references unregistered domain {id}"
            );
        }

        let profile = candidate.profile();
        let mut pool = self.inner.pool.borrow_mut();
        let bucket = pool.buckets.entry(profile).or_default();

        let mut free_slot = None;
        for (i, slot) in bucket.iter().enumerate() {
            match slot.upgrade() {
                Some(live) => {
                    if live.equals(&candidate) {
                        return live;
                    }
                }
                None => {
                    if free_slot.is_none() {
                        free_slot = Some(i);
                    }
                }
            }
        }

        let state = Rc::new(candidate);
        match free_slot {
            // A released state's slot is reused instead of growing the bucket.
            Some(i) => bucket[i] = Rc::downgrade(&state),
            None => bucket.push(Rc::downgrade(&state)),
        }
        state
    }

    /// Intern a copy of `state` with `dom_val` replaced.
    #[must_use]
    pub fn intern_with_dom_val(&self, state: &ProgramState, dom_val: DomValMap) -> ProgramStateRef {
        self.intern_parts(dom_val, state.region_sexpr.clone(), state.stmt_sexpr.clone())
    }

    /// Intern a copy of `state` with `region_sexpr` replaced.
    #[must_use]
    pub fn intern_with_region_sexpr(
        &self,
        state: &ProgramState,
        region_sexpr: RegionSExprMap,
    ) -> ProgramStateRef {
        self.intern_parts(state.dom_val.clone(), region_sexpr, state.stmt_sexpr.clone())
    }

    /// Intern a copy of `state` with `stmt_sexpr` replaced.
    #[must_use]
    pub fn intern_with_stmt_sexpr(
        &self,
        state: &ProgramState,
        stmt_sexpr: StmtSExprMap,
    ) -> ProgramStateRef {
        self.intern_parts(state.dom_val.clone(), state.region_sexpr.clone(), stmt_sexpr)
    }

    fn intern_parts(
        &self,
        dom_val: DomValMap,
        region_sexpr: RegionSExprMap,
        stmt_sexpr: StmtSExprMap,
    ) -> ProgramStateRef {
        self.intern(ProgramState {
            dom_val,
            region_sexpr,
            stmt_sexpr,
            mgr: self.clone(),
        })
    }

    /// Number of live states in the pool.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.inner
            .pool
            .borrow()
            .buckets
            .values()
            .flatten()
            .filter(|slot| slot.strong_count() > 0)
            .count()
    }

    /// Number of pool slots, live or released.
    #[must_use]
    pub fn pool_slots(&self) -> usize {
        self.inner.pool.borrow().buckets.values().map(Vec::len).sum()
    }
}

impl fmt::Debug for StateManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateManager")
            .field("domains", &self.inner.domains.len())
            .field("pool_size", &self.pool_size())
            .finish()
    }
}
