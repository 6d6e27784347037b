//! Boundary configuration surface.
//!
//! The driver resolves options from `flowstate.toml` (or wherever it
//! pleases) and feeds them to the core; the only field the core itself
//! consumes is the `analyses` filter, which picks the user-selected
//! analyses that seed the required set.

use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::globs::Globs;
use crate::ids::{AnalysisId, KindRegistry};

/// Default file name for configuration that flowstate searches for.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "flowstate.toml";

/// A checker-specific option value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OptValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

/// Options consumed at the analysis boundary.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyzerOptions {
    /// Checkers filter (glob list).
    pub checkers: String,

    /// Analyses filter (glob list). The only option the core consumes.
    pub analyses: String,

    /// Header file extensions.
    pub header_extensions: BTreeSet<String>,

    /// Implementation file extensions.
    pub impl_extensions: BTreeSet<String>,

    /// Checker-specific options.
    pub checker_opts: HashMap<String, OptValue>,

    /// The user running the analysis.
    pub user: String,

    /// Use color in output.
    pub use_color: bool,

    /// View the control flow graph.
    pub view_cfg: bool,

    /// Dump the control flow graph.
    pub dump_cfg: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        let exts = |items: &[&str]| items.iter().map(|s| (*s).to_owned()).collect();
        Self {
            checkers: String::new(),
            analyses: String::new(),
            header_extensions: exts(&["h", "hh", "hpp", "hxx"]),
            impl_extensions: exts(&["c", "cc", "cpp", "cxx"]),
            checker_opts: HashMap::new(),
            user: "unknown".to_owned(),
            use_color: false,
            view_cfg: false,
            dump_cfg: false,
        }
    }
}

/// Walk up from `start_dir` to find the nearest `flowstate.toml`, if any.
#[must_use]
pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut cur = Some(start_dir);
    while let Some(dir) = cur {
        let candidate = dir.join(DEFAULT_CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        cur = dir.parent();
    }
    None
}

/// Load and parse an options file from disk.
pub fn load_options_file(path: &Path) -> Result<AnalyzerOptions> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::config(path, format!("failed to read: {e}")))?;
    let options: AnalyzerOptions = toml::from_str(&raw)?;
    Ok(options)
}

/// Load options from an explicit path or by searching from `start_dir`.
pub fn load_options(
    explicit_path: Option<&Path>,
    start_dir: &Path,
) -> Result<Option<(PathBuf, AnalyzerOptions)>> {
    if let Some(p) = explicit_path {
        let options = load_options_file(p)?;
        return Ok(Some((p.to_path_buf(), options)));
    }

    let Some(p) = find_config_file(start_dir) else {
        return Ok(None);
    };
    let options = load_options_file(&p)?;
    Ok(Some((p, options)))
}

/// Resolve the `analyses` filter against the registered analysis kinds.
///
/// The result, ascending by id, is what the driver feeds to
/// `add_required_analysis`. A filter that names no registered analysis at
/// all (and is not empty) is reported as a configuration error, since it
/// is almost certainly a typo.
pub fn resolve_analyses_filter(spec: &str, registry: &KindRegistry) -> Result<Vec<AnalysisId>> {
    let globs = Globs::new(spec);
    let mut selected: Vec<AnalysisId> = registry
        .analysis_kinds()
        .filter(|desc| globs.matches(desc.name))
        .map(|desc| desc.id)
        .collect();
    selected.sort_unstable();

    if selected.is_empty() && !spec.trim().is_empty() {
        return Err(Error::unknown_analysis(spec.trim()));
    }
    Ok(selected)
}
