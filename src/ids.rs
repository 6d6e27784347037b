//! Identifier spaces for analyses, checkers and abstract domains.
//!
//! Each space is a dense small-integer id with a bijection to a stable
//! human-readable name. Ids are carried by `&'static` kind descriptors
//! and validated by the [`KindRegistry`], which the analysis manager owns
//! and populates at registration time. There is no global registry: the
//! manager constructs one explicitly, so nothing depends on static
//! initialization order.

use std::collections::HashMap;
use std::fmt;

use crate::domain::DomainDescriptor;

/// Dense identifier of an analysis kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnalysisId(u8);

/// Dense identifier of a checker kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CheckerId(u8);

/// Dense identifier of an abstract domain kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DomId(u8);

macro_rules! impl_id {
    ($name:ident, $tag:literal) => {
        impl $name {
            pub const fn new(raw: u8) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u8 {
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

impl_id!(AnalysisId, "analysis");
impl_id!(CheckerId, "checker");
impl_id!(DomId, "dom");

/// Static metadata describing an analysis kind.
///
/// Ids are assigned by the developer and must be unique across the
/// analysis space; the [`KindRegistry`] enforces this at registration.
#[derive(Debug)]
pub struct AnalysisDescriptor {
    pub id: AnalysisId,
    pub name: &'static str,
    pub description: &'static str,
}

/// Static metadata describing a checker kind.
#[derive(Debug)]
pub struct CheckerDescriptor {
    pub id: CheckerId,
    pub name: &'static str,
    pub description: &'static str,
}

/// Registry over the three kind spaces.
///
/// Registration is idempotent for the same descriptor. A *different*
/// descriptor claiming an already-taken id or name is a programming error
/// and aborts: kind tables are wired at startup and a collision there can
/// only be a bad descriptor constant.
#[derive(Debug, Default)]
pub struct KindRegistry {
    analyses: HashMap<AnalysisId, &'static AnalysisDescriptor>,
    checkers: HashMap<CheckerId, &'static CheckerDescriptor>,
    domains: HashMap<DomId, &'static DomainDescriptor>,
}

impl KindRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_analysis_kind(&mut self, desc: &'static AnalysisDescriptor) {
        if let Some(existing) = self.analyses.get(&desc.id) {
            assert!(
                std::ptr::eq(*existing, desc),
                "analysis id collision: {} is claimed by both `{}` and `{}`",
                desc.id,
                existing.name,
                desc.name
            );
            return;
        }
        assert!(
            !self.analyses.values().any(|d| d.name == desc.name),
            "analysis name collision: `{}` is registered under two ids",
            desc.name
        );
        self.analyses.insert(desc.id, desc);
    }

    pub fn register_checker_kind(&mut self, desc: &'static CheckerDescriptor) {
        if let Some(existing) = self.checkers.get(&desc.id) {
            assert!(
                std::ptr::eq(*existing, desc),
                "checker id collision: {} is claimed by both `{}` and `{}`",
                desc.id,
                existing.name,
                desc.name
            );
            return;
        }
        assert!(
            !self.checkers.values().any(|d| d.name == desc.name),
            "checker name collision: `{}` is registered under two ids",
            desc.name
        );
        self.checkers.insert(desc.id, desc);
    }

    pub fn register_domain_kind(&mut self, desc: &'static DomainDescriptor) {
        if let Some(existing) = self.domains.get(&desc.id) {
            assert!(
                std::ptr::eq(*existing, desc),
                "domain id collision: {} is claimed by both `{}` and `{}`",
                desc.id,
                existing.name,
                desc.name
            );
            return;
        }
        assert!(
            !self.domains.values().any(|d| d.name == desc.name),
            "domain name collision: `{}` is registered under two ids",
            desc.name
        );
        self.domains.insert(desc.id, desc);
    }

    #[must_use]
    pub fn analysis_name(&self, id: AnalysisId) -> Option<&'static str> {
        self.analyses.get(&id).map(|d| d.name)
    }

    #[must_use]
    pub fn checker_name(&self, id: CheckerId) -> Option<&'static str> {
        self.checkers.get(&id).map(|d| d.name)
    }

    #[must_use]
    pub fn domain_name(&self, id: DomId) -> Option<&'static str> {
        self.domains.get(&id).map(|d| d.name)
    }

    pub fn analysis_kinds(&self) -> impl Iterator<Item = &'static AnalysisDescriptor> + '_ {
        self.analyses.values().copied()
    }

    pub fn checker_kinds(&self) -> impl Iterator<Item = &'static CheckerDescriptor> + '_ {
        self.checkers.values().copied()
    }

    pub fn domain_kinds(&self) -> impl Iterator<Item = &'static DomainDescriptor> + '_ {
        self.domains.values().copied()
    }
}
