//! Opaque handles at the front-end boundary.
//!
//! The core never inspects statements, declarations or CFG nodes; it
//! carries identity-comparable handles minted by the front-end and hands
//! them back through callbacks and state lookups. Handles are plain
//! indices into arenas the front-end owns and stay stable over a run.

use std::cell::Cell;
use std::fmt;
use std::path::{Path, PathBuf};

/// Opaque reference to a statement of the translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StmtRef(u32);

/// Opaque reference to a node of a procedural CFG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef(u32);

/// Opaque reference to a symbolic expression.
///
/// Equality is identity: two handles are the same expression iff they
/// carry the same index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SExprRef(u32);

macro_rules! impl_handle {
    ($name:ident, $tag:literal) => {
        impl $name {
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "#{}"), self.0)
            }
        }
    };
}

impl_handle!(StmtRef, "stmt");
impl_handle!(NodeRef, "node");
impl_handle!(SExprRef, "sexpr");

/// Coarse classification of a declaration, minted with the handle.
///
/// The region model only covers value-like declarations; everything else
/// resolves to no region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeclKind {
    Var,
    Param,
    Function,
    Record,
    Other,
}

/// Opaque reference to a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeclRef {
    index: u32,
    kind: DeclKind,
}

impl DeclRef {
    pub const fn new(index: u32, kind: DeclKind) -> Self {
        Self { index, kind }
    }

    pub const fn get(self) -> u32 {
        self.index
    }

    pub const fn kind(self) -> DeclKind {
        self.kind
    }
}

impl fmt::Display for DeclRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decl#{}", self.index)
    }
}

/// Identity authority over a translation unit.
///
/// Mints fresh statement, declaration and node handles. The real AST
/// lives in the front-end; the core only needs handles with stable
/// identity, which monotonically increasing indices provide.
#[derive(Debug, Default)]
pub struct AstContext {
    next_stmt: Cell<u32>,
    next_decl: Cell<u32>,
    next_node: Cell<u32>,
}

impl AstContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn make_stmt(&self) -> StmtRef {
        let raw = self.next_stmt.get();
        self.next_stmt.set(raw + 1);
        StmtRef::new(raw)
    }

    pub fn make_decl(&self, kind: DeclKind) -> DeclRef {
        let raw = self.next_decl.get();
        self.next_decl.set(raw + 1);
        DeclRef::new(raw, kind)
    }

    pub fn make_node(&self) -> NodeRef {
        let raw = self.next_node.get();
        self.next_node.set(raw + 1);
        NodeRef::new(raw)
    }
}

/// Pass-through surface for source bookkeeping.
///
/// Diagnostic rendering and location tracking are outside the core; this
/// only records which file the run is about so callbacks can report it.
#[derive(Debug, Default)]
pub struct SourceManager {
    main_file: Option<PathBuf>,
}

impl SourceManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_main_file(&mut self, path: impl Into<PathBuf>) {
        self.main_file = Some(path.into());
    }

    #[must_use]
    pub fn main_file(&self) -> Option<&Path> {
        self.main_file.as_deref()
    }
}
