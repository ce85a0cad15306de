//! Candidate classification and the `--cleanup-scope` token grammar.

use std::collections::HashSet;
use std::sync::OnceLock;

use anyhow::{Result, bail};
use regex::Regex;
use serde::Serialize;

use crate::config::PruneConfig;
use crate::scan::{CleanupType, ScanItem};

/// Policy-facing family of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateType {
    Artifact,
    Asset,
    NodeModules,
    #[serde(rename = "pm-cache")]
    PmCache,
}

pub const ALL_CANDIDATE_TYPES: &[CandidateType] = &[
    CandidateType::Artifact,
    CandidateType::Asset,
    CandidateType::NodeModules,
    CandidateType::PmCache,
];

/// Families that need an explicit opt-in before non-interactive deletion.
pub fn is_apply_protected(candidate: CandidateType) -> bool {
    matches!(
        candidate,
        CandidateType::NodeModules | CandidateType::PmCache
    )
}

/// Derive the policy family for a scan item. The discovery tag wins where
/// it is specific; otherwise the path itself is inspected.
pub fn classify(item: &ScanItem) -> CandidateType {
    match item.cleanup_type {
        CleanupType::Asset => return CandidateType::Asset,
        CleanupType::PmCache => return CandidateType::PmCache,
        CleanupType::WorkspaceNodeModules => return CandidateType::NodeModules,
        CleanupType::Artifact => {}
    }

    let normalized = item.path.to_string_lossy().replace('\\', "/").to_lowercase();
    if node_modules_marker().is_match(&normalized) {
        CandidateType::NodeModules
    } else if pm_cache_markers().iter().any(|re| re.is_match(&normalized)) {
        CandidateType::PmCache
    } else {
        CandidateType::Artifact
    }
}

fn node_modules_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(^|/)node_modules(/|$)").expect("static regex"))
}

fn pm_cache_markers() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            r"(^|/)\.pnpm-store(/|$)",
            r"(^|/)\.pnpm-cache(/|$)",
            r"(^|/)\.npm(/|$)",
            r"(^|/)\.yarn/cache(/|$)",
            r"(^|/)\.yarn/unplugged(/|$)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static regex"))
        .collect()
    })
}

/// Parse a comma-separated `--cleanup-scope` selector into the set of
/// allowed candidate types. Empty input allows everything; an unknown
/// token is an error.
pub fn parse_cleanup_scope(input: &str) -> Result<HashSet<CandidateType>> {
    let mut allowed: HashSet<CandidateType> = HashSet::new();
    if input.trim().is_empty() {
        allowed.extend(ALL_CANDIDATE_TYPES);
        return Ok(allowed);
    }

    for token in input.split(',') {
        let token = token.trim().to_lowercase();
        if token.is_empty() {
            continue;
        }
        match token.as_str() {
            "default" | "all" | "cold-storage" | "coldstorage" | "archive" | "project"
            | "workspace" => allowed.extend(ALL_CANDIDATE_TYPES),
            "safe" | "artifacts" | "artifact" => {
                allowed.insert(CandidateType::Artifact);
                allowed.insert(CandidateType::Asset);
            }
            "node-modules" | "node_modules" | "nodemodules" => {
                allowed.insert(CandidateType::NodeModules);
            }
            "pm-caches" | "pm_caches" | "pmcaches" => {
                allowed.insert(CandidateType::PmCache);
            }
            unknown => bail!("unknown cleanup scope token: {unknown}"),
        }
    }
    Ok(allowed)
}

/// The final allow-set for a run: scope tokens, then the include flags
/// subtract their families.
pub fn allowed_candidate_types(
    scope_arg: Option<&str>,
    config: &PruneConfig,
) -> Result<HashSet<CandidateType>> {
    let mut allowed = parse_cleanup_scope(scope_arg.unwrap_or(""))?;
    if !config.include_node_modules {
        allowed.remove(&CandidateType::NodeModules);
    }
    if !config.include_project_local_pm_caches {
        allowed.remove(&CandidateType::PmCache);
    }
    Ok(allowed)
}
