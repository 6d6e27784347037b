//! The per-event handle passed to analysis callbacks.
//!
//! A callback reads the current interned state, derives a new one through
//! the state API, and installs it back; because states are interned, the
//! installation is a pointer update. The driver owns the context, moves
//! the current frame across call boundaries and rebuilds or discards the
//! context as it pleases. A context never outlives the managers it
//! borrows.

use std::rc::Rc;

use crate::frame::StackFrame;
use crate::frontend::{AstContext, DeclRef, SourceManager};
use crate::region::RegionManager;
use crate::state::ProgramStateRef;

pub struct AnalysisContext<'mgr> {
    state: ProgramStateRef,
    frame: Rc<StackFrame>,
    region_mgr: &'mgr RegionManager,
    ast: &'mgr AstContext,
    source_mgr: &'mgr SourceManager,
}

impl<'mgr> AnalysisContext<'mgr> {
    pub fn new(
        state: ProgramStateRef,
        frame: Rc<StackFrame>,
        region_mgr: &'mgr RegionManager,
        ast: &'mgr AstContext,
        source_mgr: &'mgr SourceManager,
    ) -> Self {
        Self {
            state,
            frame,
            region_mgr,
            ast,
            source_mgr,
        }
    }

    /// The current interned state.
    #[must_use]
    pub fn get_state(&self) -> ProgramStateRef {
        Rc::clone(&self.state)
    }

    /// Install a derived state as current.
    pub fn set_state(&mut self, state: ProgramStateRef) {
        self.state = state;
    }

    #[must_use]
    pub fn get_current_stack_frame(&self) -> &Rc<StackFrame> {
        &self.frame
    }

    pub fn set_current_stack_frame(&mut self, frame: Rc<StackFrame>) {
        self.frame = frame;
    }

    /// The declaration under analysis, from the current frame.
    #[must_use]
    pub fn get_current_decl(&self) -> DeclRef {
        self.frame.decl()
    }

    #[must_use]
    pub fn get_region_manager(&self) -> &'mgr RegionManager {
        self.region_mgr
    }

    #[must_use]
    pub fn get_ast_context(&self) -> &'mgr AstContext {
        self.ast
    }

    #[must_use]
    pub fn get_source_manager(&self) -> &'mgr SourceManager {
        self.source_mgr
    }
}
