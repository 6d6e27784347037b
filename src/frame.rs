//! Stack frames: the procedural context an analysis runs under.
//!
//! A frame names the declaration being analyzed and, for inlined calls,
//! the call site it was entered through. Frames are interned by the
//! [`FrameManager`], so the same `(decl, parent, call site)` triple
//! always yields the same handle and frame identity is pointer identity.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::frontend::{DeclRef, NodeRef, StmtRef};

/// Where a non-top frame was entered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSiteInfo {
    /// The call expression itself.
    pub call_expr: StmtRef,
    /// The CFG node containing the call.
    pub node: NodeRef,
    /// Index of the call within that node's statements.
    pub stmt_idx: u32,
}

/// One entry of the abstract call stack.
#[derive(Debug)]
pub struct StackFrame {
    decl: DeclRef,
    parent: Option<Rc<StackFrame>>,
    call_site: Option<CallSiteInfo>,
}

impl StackFrame {
    #[must_use]
    pub fn decl(&self) -> DeclRef {
        self.decl
    }

    #[must_use]
    pub fn parent(&self) -> Option<&Rc<StackFrame>> {
        self.parent.as_ref()
    }

    #[must_use]
    pub fn is_top_frame(&self) -> bool {
        self.parent.is_none()
    }

    #[must_use]
    pub fn call_site(&self) -> Option<&CallSiteInfo> {
        self.call_site.as_ref()
    }

    /// The call expression this frame was entered through.
    ///
    /// Panics on the top frame, which has no call site.
    #[must_use]
    pub fn call_site_expr(&self) -> StmtRef {
        self.call_site
            .as_ref()
            .expect("top frame has no call site")
            .call_expr
    }

    /// The CFG node of the call this frame was entered through.
    ///
    /// Panics on the top frame, which has no call site.
    #[must_use]
    pub fn call_site_node(&self) -> NodeRef {
        self.call_site
            .as_ref()
            .expect("top frame has no call site")
            .node
    }

    /// Is `self` a proper ancestor of `other` on the call stack?
    #[must_use]
    pub fn is_ancestor_of(self: &Rc<Self>, other: &Rc<StackFrame>) -> bool {
        let mut cur = other.parent.clone();
        while let Some(frame) = cur {
            if Rc::ptr_eq(self, &frame) {
                return true;
            }
            cur = frame.parent.clone();
        }
        false
    }

    pub fn dump(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{}", self.decl)?;
        if let Some(site) = &self.call_site {
            write!(out, " via {} at {}", site.call_expr, site.node)?;
        }
        if let Some(parent) = &self.parent {
            write!(out, " <- ")?;
            parent.dump(out)?;
        }
        Ok(())
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump(f)
    }
}

/// Key identifying a frame: declaration, parent identity, call site.
type FrameKey = (DeclRef, usize, Option<CallSiteInfo>);

/// Interning arena for stack frames.
#[derive(Debug, Default)]
pub struct FrameManager {
    frames: RefCell<HashMap<FrameKey, Rc<StackFrame>>>,
}

impl FrameManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame for analyzing `decl` as an entry point.
    pub fn create_top_frame(&self, decl: DeclRef) -> Rc<StackFrame> {
        self.intern(decl, None, None)
    }

    /// Frame for analyzing `decl` as a callee entered from `parent`.
    pub fn create_from_call(
        &self,
        parent: &Rc<StackFrame>,
        decl: DeclRef,
        call_expr: StmtRef,
        node: NodeRef,
        stmt_idx: u32,
    ) -> Rc<StackFrame> {
        let site = CallSiteInfo {
            call_expr,
            node,
            stmt_idx,
        };
        self.intern(decl, Some(Rc::clone(parent)), Some(site))
    }

    fn intern(
        &self,
        decl: DeclRef,
        parent: Option<Rc<StackFrame>>,
        call_site: Option<CallSiteInfo>,
    ) -> Rc<StackFrame> {
        let parent_key = parent.as_ref().map_or(0, |p| Rc::as_ptr(p) as usize);
        let key = (decl, parent_key, call_site);
        let mut frames = self.frames.borrow_mut();
        if let Some(existing) = frames.get(&key) {
            return Rc::clone(existing);
        }
        let frame = Rc::new(StackFrame {
            decl,
            parent,
            call_site,
        });
        frames.insert(key, Rc::clone(&frame));
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{AstContext, DeclKind};

    #[test]
    fn equal_inputs_intern_to_the_same_frame() {
        let ast = AstContext::new();
        let mgr = FrameManager::new();
        let main = ast.make_decl(DeclKind::Function);

        let f1 = mgr.create_top_frame(main);
        let f2 = mgr.create_top_frame(main);
        assert!(Rc::ptr_eq(&f1, &f2));
    }

    #[test]
    fn ancestry_follows_the_parent_chain() {
        let ast = AstContext::new();
        let mgr = FrameManager::new();
        let main = ast.make_decl(DeclKind::Function);
        let callee = ast.make_decl(DeclKind::Function);

        let top = mgr.create_top_frame(main);
        let inner = mgr.create_from_call(&top, callee, ast.make_stmt(), ast.make_node(), 0);

        assert!(top.is_top_frame());
        assert!(!inner.is_top_frame());
        assert!(top.is_ancestor_of(&inner));
        assert!(!inner.is_ancestor_of(&top));
        assert!(!top.is_ancestor_of(&top));
    }

    #[test]
    #[should_panic(expected = "top frame has no call site")]
    fn top_frame_call_site_is_a_programming_error() {
        let ast = AstContext::new();
        let mgr = FrameManager::new();
        let top = mgr.create_top_frame(ast.make_decl(DeclKind::Function));
        let _ = top.call_site_expr();
    }
}
