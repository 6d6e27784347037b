//! Shared fixtures: small test domains and the analyses that own them.
#![allow(dead_code)]

use std::fmt;
use std::rc::Rc;

use flowstate::analysis::{Analysis, AnalysisManager, RegisterableAnalysis};
use flowstate::domain::{DomainDescriptor, DomainOps};
use flowstate::domains::interval::Interval;
use flowstate::domains::map::VarMap;
use flowstate::ids::{AnalysisDescriptor, AnalysisId, DomId};
use flowstate::region::RegionManager;
use flowstate::state::StateManager;

pub static FLAG_DOMAIN: DomainDescriptor = DomainDescriptor {
    id: DomId::new(10),
    name: "flag",
    description: "flat lattice over named symbols",
    default_fn: || Rc::new(Flag::Bottom),
    bottom_fn: || Rc::new(Flag::Bottom),
};

/// Flat lattice: bottom below every symbol, top above, symbols unordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    Bottom,
    Sym(char),
    Top,
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::Bottom => write!(f, "bottom"),
            Flag::Sym(c) => write!(f, "{c}"),
            Flag::Top => write!(f, "top"),
        }
    }
}

impl DomainOps for Flag {
    fn descriptor() -> &'static DomainDescriptor {
        &FLAG_DOMAIN
    }

    fn default_val() -> Self {
        Flag::Bottom
    }

    fn bottom_val() -> Self {
        Flag::Bottom
    }

    fn join(&mut self, other: &Self) {
        *self = match (*self, *other) {
            (Flag::Bottom, x) | (x, Flag::Bottom) => x,
            (Flag::Sym(a), Flag::Sym(b)) if a == b => Flag::Sym(a),
            _ => Flag::Top,
        };
    }

    fn meet(&mut self, other: &Self) {
        *self = match (*self, *other) {
            (Flag::Top, x) | (x, Flag::Top) => x,
            (Flag::Sym(a), Flag::Sym(b)) if a == b => Flag::Sym(a),
            _ => Flag::Bottom,
        };
    }

    fn leq(&self, other: &Self) -> bool {
        matches!((self, other), (Flag::Bottom, _) | (_, Flag::Top)) || self == other
    }

    fn is_bottom(&self) -> bool {
        matches!(self, Flag::Bottom)
    }

    fn is_top(&self) -> bool {
        matches!(self, Flag::Top)
    }

    fn set_to_bottom(&mut self) {
        *self = Flag::Bottom;
    }

    fn set_to_top(&mut self) {
        *self = Flag::Top;
    }
}

pub static MODE_DOMAIN: DomainDescriptor = DomainDescriptor {
    id: DomId::new(11),
    name: "mode",
    description: "second flat lattice, for asymmetric-key scenarios",
    default_fn: || Rc::new(Mode::Bottom),
    bottom_fn: || Rc::new(Mode::Bottom),
};

/// Same shape as [`Flag`] under its own domain id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Bottom,
    Sym(char),
    Top,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Bottom => write!(f, "bottom"),
            Mode::Sym(c) => write!(f, "{c}"),
            Mode::Top => write!(f, "top"),
        }
    }
}

impl DomainOps for Mode {
    fn descriptor() -> &'static DomainDescriptor {
        &MODE_DOMAIN
    }

    fn default_val() -> Self {
        Mode::Bottom
    }

    fn bottom_val() -> Self {
        Mode::Bottom
    }

    fn join(&mut self, other: &Self) {
        *self = match (*self, *other) {
            (Mode::Bottom, x) | (x, Mode::Bottom) => x,
            (Mode::Sym(a), Mode::Sym(b)) if a == b => Mode::Sym(a),
            _ => Mode::Top,
        };
    }

    fn meet(&mut self, other: &Self) {
        *self = match (*self, *other) {
            (Mode::Top, x) | (x, Mode::Top) => x,
            (Mode::Sym(a), Mode::Sym(b)) if a == b => Mode::Sym(a),
            _ => Mode::Bottom,
        };
    }

    fn leq(&self, other: &Self) -> bool {
        matches!((self, other), (Mode::Bottom, _) | (_, Mode::Top)) || self == other
    }

    fn is_bottom(&self) -> bool {
        matches!(self, Mode::Bottom)
    }

    fn is_top(&self) -> bool {
        matches!(self, Mode::Top)
    }

    fn set_to_bottom(&mut self) {
        *self = Mode::Bottom;
    }

    fn set_to_top(&mut self) {
        *self = Mode::Top;
    }
}

pub static FLAG_HOST: AnalysisDescriptor = AnalysisDescriptor {
    id: AnalysisId::new(20),
    name: "flag-host",
    description: "owns the flat test domains",
};

/// Analysis owning [`Flag`] and [`Mode`]; registers no callbacks.
pub struct FlagHost;

impl Analysis for FlagHost {
    fn descriptor(&self) -> &'static AnalysisDescriptor {
        &FLAG_HOST
    }
}

impl RegisterableAnalysis for FlagHost {
    fn kind() -> &'static AnalysisDescriptor {
        &FLAG_HOST
    }

    fn register_callbacks(_this: &Rc<Self>, mgr: &mut AnalysisManager) {
        mgr.add_domain_dependency::<FlagHost, Flag>();
        mgr.add_domain_dependency::<FlagHost, Mode>();
    }
}

pub static NUMERIC_HOST: AnalysisDescriptor = AnalysisDescriptor {
    id: AnalysisId::new(21),
    name: "numeric-host",
    description: "owns the bundled numeric domains",
};

/// Analysis owning the bundled [`Interval`] and [`VarMap`] domains.
pub struct NumericHost;

impl Analysis for NumericHost {
    fn descriptor(&self) -> &'static AnalysisDescriptor {
        &NUMERIC_HOST
    }
}

impl RegisterableAnalysis for NumericHost {
    fn kind() -> &'static AnalysisDescriptor {
        &NUMERIC_HOST
    }

    fn register_callbacks(_this: &Rc<Self>, mgr: &mut AnalysisManager) {
        mgr.add_domain_dependency::<NumericHost, Interval>();
        mgr.add_domain_dependency::<NumericHost, VarMap>();
    }
}

/// Register, enable and require `analysis`, then compute closure + order.
pub fn manager_with<A: RegisterableAnalysis>(analysis: A) -> AnalysisManager {
    let mut mgr = AnalysisManager::new();
    let instance = mgr.register(analysis);
    let id = instance.descriptor().id;
    mgr.enable_analysis(instance);
    mgr.add_required_analysis(id).expect("analysis is registered");
    mgr.compute_all_required_analyses_by_dependencies();
    mgr.compute_full_order_analyses_after_registry()
        .expect("no dependency cycles");
    mgr
}

pub fn state_manager_for(mgr: &AnalysisManager) -> StateManager {
    StateManager::new(mgr, Rc::new(RegionManager::new()))
}
