//! Analysis management: registration, dependencies, ordering, dispatch.
//!
//! An analysis is registered once per kind, installs callbacks for the
//! events it cares about, and declares the abstract domains it owns. The
//! manager computes the closure of required analyses over the dependency
//! edges, a full linear order consistent with them, and dispatches every
//! event to the matching callbacks in that order.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap};
use std::rc::Rc;

use crate::context::AnalysisContext;
use crate::domain::{DomainDescriptor, DomainOps};
use crate::error::{Error, Result};
use crate::frontend::{NodeRef, StmtRef};
use crate::ids::{AnalysisDescriptor, AnalysisId, DomId, KindRegistry};

/// A registered analysis instance. The manager holds one per enabled
/// kind; callbacks keep their own shared handle to the instance they
/// were installed by.
pub trait Analysis: 'static {
    fn descriptor(&self) -> &'static AnalysisDescriptor;
}

/// Registration hook for analysis kinds.
///
/// `register_callbacks` receives the shared instance so the installed
/// closures can capture clones of it.
pub trait RegisterableAnalysis: Analysis + Sized {
    fn kind() -> &'static AnalysisDescriptor;

    fn register_callbacks(this: &Rc<Self>, mgr: &mut AnalysisManager);
}

/// Which phase of a statement visit a callback fires in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StmtVisitKind {
    Pre,
    Eval,
    Post,
}

/// Statement filter deciding whether a callback is interested.
pub type MatchStmtFn = fn(StmtRef) -> bool;

/// Accept every statement.
pub fn match_any_stmt(_: StmtRef) -> bool {
    true
}

struct BeginFunctionCallback {
    analysis: AnalysisId,
    run: Box<dyn Fn(&mut AnalysisContext<'_>)>,
}

struct EndFunctionCallback {
    analysis: AnalysisId,
    run: Box<dyn Fn(NodeRef, &mut AnalysisContext<'_>)>,
}

struct StmtCallback {
    analysis: AnalysisId,
    visit: StmtVisitKind,
    matches: MatchStmtFn,
    run: Box<dyn Fn(StmtRef, &mut AnalysisContext<'_>)>,
}

/// The analysis manager which holds all the registered analyses.
#[derive(Default)]
pub struct AnalysisManager {
    kinds: KindRegistry,

    /// All registered analyses.
    analyses: BTreeSet<AnalysisId>,
    /// Dependency edges: an analysis maps to the analyses that must run
    /// before it.
    dependencies: HashMap<AnalysisId, BTreeSet<AnalysisId>>,
    /// Analyses forced into the required set regardless of selection.
    privileged: BTreeSet<AnalysisId>,
    /// Closure of privileged + user-selected analyses.
    required: BTreeSet<AnalysisId>,
    /// Enabled instances; the key set converges to the required set.
    enabled: HashMap<AnalysisId, Rc<dyn Analysis>>,

    /// Registered domains and their owners.
    domain_owner: HashMap<DomId, AnalysisId>,
    domain_descs: BTreeMap<DomId, &'static DomainDescriptor>,
    analysis_domains: HashMap<AnalysisId, BTreeSet<DomId>>,

    begin_function_callbacks: Vec<BeginFunctionCallback>,
    end_function_callbacks: Vec<EndFunctionCallback>,
    stmt_callbacks: Vec<StmtCallback>,

    /// Linear order of the required set, dependencies first.
    full_order: Vec<AnalysisId>,
    order_index: HashMap<AnalysisId, usize>,
}

impl AnalysisManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn kind_registry(&self) -> &KindRegistry {
        &self.kinds
    }

    /// Construct and register an analysis, giving it the chance to
    /// install its callbacks. The returned handle is handed back through
    /// [`AnalysisManager::enable_analysis`] once the caller is done
    /// configuring it.
    ///
    /// Re-registering an already-registered kind is not an error; the
    /// analysis set is idempotent and the duplicate only warns.
    pub fn register<A: RegisterableAnalysis>(&mut self, analysis: A) -> Rc<A> {
        let desc = A::kind();
        self.kinds.register_analysis_kind(desc);
        if !self.analyses.insert(desc.id) {
            tracing::warn!(analysis = desc.name, "analysis is already registered");
        }
        let instance = Rc::new(analysis);
        A::register_callbacks(&instance, self);
        instance
    }

    /// Transfer ownership of a configured instance to the manager.
    pub fn enable_analysis(&mut self, analysis: Rc<dyn Analysis>) {
        self.enabled.insert(analysis.descriptor().id, analysis);
    }

    #[must_use]
    pub fn get_analysis(&self, id: AnalysisId) -> Option<&Rc<dyn Analysis>> {
        self.enabled.get(&id)
    }

    /// Add `id` to the required set.
    pub fn add_required_analysis(&mut self, id: AnalysisId) -> Result<()> {
        if !self.analyses.contains(&id) {
            return Err(Error::UnregisteredAnalysis(id));
        }
        self.required.insert(id);
        Ok(())
    }

    /// Record that `id` must run after `required_id`.
    pub fn add_analysis_dependency(&mut self, id: AnalysisId, required_id: AnalysisId) -> Result<()> {
        if !self.analyses.contains(&id) {
            return Err(Error::UnregisteredAnalysis(id));
        }
        if !self.analyses.contains(&required_id) {
            return Err(Error::UnregisteredAnalysis(required_id));
        }
        self.dependencies.entry(id).or_default().insert(required_id);
        Ok(())
    }

    /// Analyses that must run before `id`.
    #[must_use]
    pub fn analysis_dependencies(&self, id: AnalysisId) -> BTreeSet<AnalysisId> {
        self.dependencies.get(&id).cloned().unwrap_or_default()
    }

    /// Force `A` into the required set regardless of user selection.
    pub fn set_privileged<A: RegisterableAnalysis>(&mut self) -> Result<()> {
        let id = A::kind().id;
        if !self.analyses.contains(&id) {
            return Err(Error::UnregisteredAnalysis(id));
        }
        self.privileged.insert(id);
        self.required.insert(id);
        Ok(())
    }

    #[must_use]
    pub fn is_analysis_required(&self, id: AnalysisId) -> bool {
        self.required.contains(&id)
    }

    #[must_use]
    pub fn required_analyses(&self) -> &BTreeSet<AnalysisId> {
        &self.required
    }

    /// Close the required set over the dependency edges: whatever a
    /// required analysis depends on is required too, transitively.
    pub fn compute_all_required_analyses_by_dependencies(&mut self) {
        let mut worklist: Vec<AnalysisId> =
            self.required.union(&self.privileged).copied().collect();
        let mut visited = BTreeSet::new();
        while let Some(id) = worklist.pop() {
            if !visited.insert(id) {
                continue;
            }
            self.required.insert(id);
            if let Some(deps) = self.dependencies.get(&id) {
                worklist.extend(deps.iter().copied());
            }
        }
    }

    /// Compute the full linear order of the required set: a topological
    /// sort of the dependency graph, dependencies first, ties broken by
    /// ascending id. A cycle is a fatal configuration error.
    pub fn compute_full_order_analyses_after_registry(&mut self) -> Result<()> {
        let mut in_degree: BTreeMap<AnalysisId, usize> = BTreeMap::new();
        let mut dependents: HashMap<AnalysisId, Vec<AnalysisId>> = HashMap::new();
        for &id in &self.required {
            let deps = self.dependencies.get(&id);
            let in_required = deps
                .map(|deps| deps.iter().filter(|d| self.required.contains(*d)).count())
                .unwrap_or(0);
            in_degree.insert(id, in_required);
            if let Some(deps) = deps {
                for &dep in deps {
                    if self.required.contains(&dep) {
                        dependents.entry(dep).or_default().push(id);
                    }
                }
            }
        }

        let mut ready: BinaryHeap<Reverse<AnalysisId>> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| Reverse(*id))
            .collect();

        let mut order = Vec::with_capacity(self.required.len());
        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);
            if let Some(deps) = dependents.get(&id) {
                for &dependent in deps {
                    let degree = in_degree
                        .get_mut(&dependent)
                        .expect("dependent is in the required set");
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse(dependent));
                    }
                }
            }
        }

        if order.len() != self.required.len() {
            let stuck: Vec<String> = self
                .required
                .iter()
                .copied()
                .filter(|id| !order.contains(id))
                .map(|id| {
                    self.kinds
                        .analysis_name(id)
                        .map_or_else(|| id.to_string(), str::to_owned)
                })
                .collect();
            return Err(Error::dependency_cycle(stuck));
        }

        self.order_index = order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        self.full_order = order;
        Ok(())
    }

    /// The full order, dependencies first.
    #[must_use]
    pub fn full_order(&self) -> &[AnalysisId] {
        &self.full_order
    }

    /// Project the full order onto `subset`, preserving order.
    #[must_use]
    pub fn get_ordered_analyses(&self, subset: &BTreeSet<AnalysisId>) -> Vec<AnalysisId> {
        self.full_order
            .iter()
            .copied()
            .filter(|id| subset.contains(id))
            .collect()
    }

    /// Bind domain `D` to analysis `A`, recording the owner and the
    /// default/bottom factories the state manager builds states from.
    ///
    /// `A` must have been registered first; wiring a domain to an unknown
    /// analysis is a programming error.
    pub fn add_domain_dependency<A: RegisterableAnalysis, D: DomainOps>(&mut self) {
        let analysis_id = A::kind().id;
        assert!(
            self.analyses.contains(&analysis_id),
            "analysis `{}` must be registered before its domains",
            A::kind().name
        );
        let desc = D::descriptor();
        self.kinds.register_domain_kind(desc);
        self.domain_owner.insert(desc.id, analysis_id);
        self.domain_descs.insert(desc.id, desc);
        self.analysis_domains
            .entry(analysis_id)
            .or_default()
            .insert(desc.id);
    }

    /// Domains registered under `id`.
    #[must_use]
    pub fn registered_domains_in(&self, id: AnalysisId) -> BTreeSet<DomId> {
        self.analysis_domains.get(&id).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn domain_owner(&self, id: DomId) -> Option<AnalysisId> {
        self.domain_owner.get(&id).copied()
    }

    #[must_use]
    pub fn domain_descriptor(&self, id: DomId) -> Option<&'static DomainDescriptor> {
        self.domain_descs.get(&id).copied()
    }

    /// Descriptors of every domain owned by a required analysis,
    /// ascending by id. This is the table the state manager snapshots.
    #[must_use]
    pub fn required_domain_table(&self) -> Vec<&'static DomainDescriptor> {
        self.domain_descs
            .values()
            .filter(|d| {
                self.domain_owner
                    .get(&d.id)
                    .is_some_and(|owner| self.required.contains(owner))
            })
            .copied()
            .collect()
    }

    /// Install a begin-function callback on behalf of `analysis`.
    pub fn register_for_begin_function(
        &mut self,
        analysis: AnalysisId,
        run: impl Fn(&mut AnalysisContext<'_>) + 'static,
    ) {
        self.begin_function_callbacks.push(BeginFunctionCallback {
            analysis,
            run: Box::new(run),
        });
    }

    /// Install an end-function callback on behalf of `analysis`.
    pub fn register_for_end_function(
        &mut self,
        analysis: AnalysisId,
        run: impl Fn(NodeRef, &mut AnalysisContext<'_>) + 'static,
    ) {
        self.end_function_callbacks.push(EndFunctionCallback {
            analysis,
            run: Box::new(run),
        });
    }

    /// Install a statement callback on behalf of `analysis`, firing in
    /// phase `visit` for statements accepted by `matches`.
    pub fn register_for_stmt(
        &mut self,
        analysis: AnalysisId,
        visit: StmtVisitKind,
        matches: MatchStmtFn,
        run: impl Fn(StmtRef, &mut AnalysisContext<'_>) + 'static,
    ) {
        self.stmt_callbacks.push(StmtCallback {
            analysis,
            visit,
            matches,
            run: Box::new(run),
        });
    }

    fn order_position(&self, id: AnalysisId) -> Option<usize> {
        self.order_index.get(&id).copied()
    }

    pub fn run_analyses_for_begin_function(&self, ctx: &mut AnalysisContext<'_>) {
        let mut picked: Vec<(usize, &BeginFunctionCallback)> = self
            .begin_function_callbacks
            .iter()
            .filter(|cb| self.is_analysis_required(cb.analysis))
            .filter_map(|cb| self.order_position(cb.analysis).map(|pos| (pos, cb)))
            .collect();
        picked.sort_by_key(|(pos, _)| *pos);
        for (_, cb) in picked {
            (cb.run)(ctx);
        }
    }

    pub fn run_analyses_for_end_function(&self, node: NodeRef, ctx: &mut AnalysisContext<'_>) {
        let mut picked: Vec<(usize, &EndFunctionCallback)> = self
            .end_function_callbacks
            .iter()
            .filter(|cb| self.is_analysis_required(cb.analysis))
            .filter_map(|cb| self.order_position(cb.analysis).map(|pos| (pos, cb)))
            .collect();
        picked.sort_by_key(|(pos, _)| *pos);
        for (_, cb) in picked {
            (cb.run)(node, ctx);
        }
    }

    fn run_analyses_for_stmt(
        &self,
        stmt: StmtRef,
        visit: StmtVisitKind,
        ctx: &mut AnalysisContext<'_>,
    ) {
        let mut picked: Vec<(usize, &StmtCallback)> = self
            .stmt_callbacks
            .iter()
            .filter(|cb| cb.visit == visit && (cb.matches)(stmt))
            .filter(|cb| self.is_analysis_required(cb.analysis))
            .filter_map(|cb| self.order_position(cb.analysis).map(|pos| (pos, cb)))
            .collect();
        // Stable sort keeps registration order within one analysis.
        picked.sort_by_key(|(pos, _)| *pos);
        for (_, cb) in picked {
            (cb.run)(stmt, ctx);
        }
    }

    pub fn run_analyses_for_pre_stmt(&self, stmt: StmtRef, ctx: &mut AnalysisContext<'_>) {
        self.run_analyses_for_stmt(stmt, StmtVisitKind::Pre, ctx);
    }

    pub fn run_analyses_for_eval_stmt(&self, stmt: StmtRef, ctx: &mut AnalysisContext<'_>) {
        self.run_analyses_for_stmt(stmt, StmtVisitKind::Eval, ctx);
    }

    pub fn run_analyses_for_post_stmt(&self, stmt: StmtRef, ctx: &mut AnalysisContext<'_>) {
        self.run_analyses_for_stmt(stmt, StmtVisitKind::Post, ctx);
    }
}
