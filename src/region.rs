//! Memory-region boundary.
//!
//! The region model lives outside the core; what the core consumes is a
//! pure lookup from `(declaration, stack frame)` to an opaque region
//! handle. Only value-like declarations are modeled; asking for the
//! region of anything else returns `None`, which callers must treat as
//! "unmodeled construct" and decide policy for themselves.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::frame::StackFrame;
use crate::frontend::{DeclKind, DeclRef};

/// Opaque reference to a memory region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionRef(u32);

impl RegionRef {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RegionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region#{}", self.0)
    }
}

/// Hands out region handles for declarations in stack frames.
///
/// Lookups are interned: the same declaration in the same frame always
/// resolves to the same handle over a run.
#[derive(Debug, Default)]
pub struct RegionManager {
    regions: RefCell<HashMap<(DeclRef, usize), RegionRef>>,
    next: Cell<u32>,
}

impl RegionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The region of `decl` in `frame`, or `None` for declaration kinds
    /// the region model does not cover.
    pub fn get_region(&self, decl: DeclRef, frame: &Rc<StackFrame>) -> Option<RegionRef> {
        if !matches!(decl.kind(), DeclKind::Var | DeclKind::Param) {
            tracing::debug!(decl = %decl, kind = ?decl.kind(), "no region for unmodeled declaration kind");
            return None;
        }
        let key = (decl, Rc::as_ptr(frame) as usize);
        let mut regions = self.regions.borrow_mut();
        let region = regions.entry(key).or_insert_with(|| {
            let raw = self.next.get();
            self.next.set(raw + 1);
            RegionRef::new(raw)
        });
        Some(*region)
    }
}
