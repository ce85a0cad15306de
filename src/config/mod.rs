//! Per-project configuration.
//!
//! Two optional sources at the scan root: the `next-prune` key of
//! `package.json`, and `.next-prunerc.json` (which wins on key
//! collisions). Both are merged over defaults. Read or parse failures are
//! silent; a broken config degrades to default behavior, never an error.

use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::pattern::normalize_path_pattern;

pub const RC_FILE_NAME: &str = ".next-prunerc.json";
pub const PACKAGE_JSON_KEY: &str = "next-prune";

/// Whether a candidate was discovered in the root project or inside a
/// monorepo workspace member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupScope {
    Project,
    Workspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonorepoMode {
    Auto,
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkspaceDiscoveryMode {
    ManifestFallback,
    ManifestOnly,
    HeuristicOnly,
}

impl WorkspaceDiscoveryMode {
    /// Accepts the canonical names plus the legacy aliases `auto`,
    /// `manifest`, and `heuristic`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "manifest-fallback" | "auto" => Some(Self::ManifestFallback),
            "manifest-only" | "manifest" => Some(Self::ManifestOnly),
            "heuristic-only" | "heuristic" => Some(Self::HeuristicOnly),
            _ => None,
        }
    }
}

/// Fully normalized project configuration. Every field is concrete; raw
/// JSON shapes never leave this module.
#[derive(Debug, Clone, PartialEq)]
pub struct PruneConfig {
    pub always_delete: Vec<String>,
    pub never_delete: Vec<String>,
    pub check_unused_assets: bool,
    pub monorepo_mode: MonorepoMode,
    pub workspace_discovery_mode: WorkspaceDiscoveryMode,
    /// `None` = not configured (defaults to project + workspace);
    /// `Some(vec![])` = explicitly empty, meaning "scan nothing".
    pub cleanup_scopes: Option<Vec<CleanupScope>>,
    pub include_node_modules: bool,
    pub include_project_local_pm_caches: bool,
    pub max_scan_depth: Option<usize>,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self {
            always_delete: Vec::new(),
            never_delete: Vec::new(),
            check_unused_assets: false,
            monorepo_mode: MonorepoMode::Auto,
            workspace_discovery_mode: WorkspaceDiscoveryMode::ManifestFallback,
            cleanup_scopes: None,
            include_node_modules: true,
            include_project_local_pm_caches: true,
            max_scan_depth: None,
        }
    }
}

impl PruneConfig {
    /// The scopes the scanner should use. Explicit empty stays empty.
    pub fn effective_scopes(&self) -> Vec<CleanupScope> {
        match &self.cleanup_scopes {
            Some(scopes) => scopes.clone(),
            None => vec![CleanupScope::Project, CleanupScope::Workspace],
        }
    }
}

/// Load and normalize configuration from `root`.
pub async fn load_config(root: &Path) -> PruneConfig {
    let pkg = read_json(&root.join("package.json"))
        .await
        .and_then(|doc| doc.get(PACKAGE_JSON_KEY).cloned())
        .filter(Value::is_object);
    let rc = read_json(&root.join(RC_FILE_NAME))
        .await
        .filter(Value::is_object);

    if pkg.is_none() && rc.is_none() {
        log::debug!("no next-prune configuration found in {}", root.display());
    }

    let mut raw = RawConfig::default();
    if let Some(doc) = &pkg {
        raw.absorb(doc);
    }
    if let Some(doc) = &rc {
        raw.absorb(doc);
    }
    raw.normalize()
}

async fn read_json(path: &Path) -> Option<Value> {
    let content = tokio::fs::read_to_string(path).await.ok()?;
    serde_json::from_str(&content).ok()
}

/// Raw field values straight out of JSON. Later sources overwrite earlier
/// ones key by key, so `.next-prunerc.json` wins over `package.json`.
#[derive(Default)]
struct RawConfig {
    always_delete: Option<Value>,
    never_delete: Option<Value>,
    check_unused_assets: Option<Value>,
    monorepo_mode: Option<Value>,
    workspace_discovery_mode: Option<Value>,
    cleanup_scopes: Option<Value>,
    include_node_modules: Option<Value>,
    include_project_local_pm_caches: Option<Value>,
    max_scan_depth: Option<Value>,
}

impl RawConfig {
    fn absorb(&mut self, doc: &Value) {
        let mut take = |key: &str, slot: &mut Option<Value>| {
            if let Some(v) = doc.get(key) {
                *slot = Some(v.clone());
            }
        };
        take("alwaysDelete", &mut self.always_delete);
        take("neverDelete", &mut self.never_delete);
        take("checkUnusedAssets", &mut self.check_unused_assets);
        take("monorepoMode", &mut self.monorepo_mode);
        take("workspaceDiscoveryMode", &mut self.workspace_discovery_mode);
        take("cleanupScopes", &mut self.cleanup_scopes);
        take("includeNodeModules", &mut self.include_node_modules);
        take(
            "includeProjectLocalPmCaches",
            &mut self.include_project_local_pm_caches,
        );
        take("maxScanDepth", &mut self.max_scan_depth);
    }

    fn normalize(self) -> PruneConfig {
        let defaults = PruneConfig::default();
        PruneConfig {
            always_delete: pattern_list(self.always_delete.as_ref()),
            never_delete: pattern_list(self.never_delete.as_ref()),
            check_unused_assets: bool_or(
                self.check_unused_assets.as_ref(),
                defaults.check_unused_assets,
            ),
            monorepo_mode: monorepo_mode(self.monorepo_mode.as_ref()),
            workspace_discovery_mode: discovery_mode(self.workspace_discovery_mode.as_ref()),
            cleanup_scopes: scope_list(self.cleanup_scopes.as_ref()),
            include_node_modules: bool_or(
                self.include_node_modules.as_ref(),
                defaults.include_node_modules,
            ),
            include_project_local_pm_caches: bool_or(
                self.include_project_local_pm_caches.as_ref(),
                defaults.include_project_local_pm_caches,
            ),
            max_scan_depth: depth(self.max_scan_depth.as_ref()),
        }
    }
}

/// Filter an array to valid normalized patterns, deduplicating while
/// preserving first occurrence. Invalid entries drop silently.
fn pattern_list(value: Option<&Value>) -> Vec<String> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let Some(normalized) = item.as_str().and_then(normalize_path_pattern) else {
            continue;
        };
        if !out.contains(&normalized) {
            out.push(normalized);
        }
    }
    out
}

fn bool_or(value: Option<&Value>, fallback: bool) -> bool {
    value.and_then(Value::as_bool).unwrap_or(fallback)
}

fn monorepo_mode(value: Option<&Value>) -> MonorepoMode {
    match value.and_then(Value::as_str) {
        Some("on") => MonorepoMode::On,
        Some("off") => MonorepoMode::Off,
        _ => MonorepoMode::Auto,
    }
}

fn discovery_mode(value: Option<&Value>) -> WorkspaceDiscoveryMode {
    value
        .and_then(Value::as_str)
        .and_then(WorkspaceDiscoveryMode::parse)
        .unwrap_or(WorkspaceDiscoveryMode::ManifestFallback)
}

fn scope_list(value: Option<&Value>) -> Option<Vec<CleanupScope>> {
    let items = value.and_then(Value::as_array)?;
    let mut out: Vec<CleanupScope> = Vec::new();
    for item in items {
        let scope = match item.as_str() {
            Some("project") => CleanupScope::Project,
            Some("workspace") => CleanupScope::Workspace,
            _ => continue,
        };
        if !out.contains(&scope) {
            out.push(scope);
        }
    }
    Some(out)
}

fn depth(value: Option<&Value>) -> Option<usize> {
    value.and_then(Value::as_u64).map(|n| n as usize)
}
