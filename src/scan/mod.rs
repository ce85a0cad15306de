//! Concurrent, symlink-safe artifact discovery.
//!
//! The scanner walks one scan root per active cleanup scope (the project
//! root, plus every discovered workspace), classifies directory entries
//! against the artifact tables, and aggregates recursive statistics for
//! every surviving candidate. Two safety rules hold throughout: a
//! candidate whose real path leaves the root is dropped, and no real path
//! is ever reported twice.

use std::collections::{HashMap, HashSet, hash_map::Entry};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use anyhow::{Context, Result};
use futures::future::{BoxFuture, join_all};
use regex::Regex;
use serde::Serialize;
use tokio::fs;
use tokio::sync::Semaphore;

use crate::config::{CleanupScope, MonorepoMode, PruneConfig, WorkspaceDiscoveryMode};
use crate::pattern::normalize_path_pattern;
use crate::workspace;

pub mod stats;

pub use stats::ArtifactStats;

/// Directory names that are always deletion candidates and never entered.
pub const ARTIFACT_DIR_NAMES: &[&str] = &[
    ".next",
    "out",
    ".turbo",
    ".vercel_build_output",
    "coverage",
    ".swc",
    ".docusaurus",
    "storybook-static",
];

/// Names the walk never descends into (and does not emit by name alone).
pub const DEFAULT_SKIP_DIRS: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    ".next",
    ".turbo",
    ".vercel",
    "node_modules",
    "coverage",
    ".swc",
    ".docusaurus",
    "storybook-static",
];

/// Package-manager cache locations probed directly under each scan root.
pub const PROJECT_PM_CACHE_DIRS: &[&str] = &[
    ".npm",
    ".pnpm-store",
    ".yarn/cache",
    ".yarn/unplugged",
    ".bun/install/cache",
];

const NEXT_CONFIG_FILES: &[&str] = &[
    "next.config.js",
    "next.config.mjs",
    "next.config.cjs",
    "next.config.ts",
    "next.config.mts",
    "next.config.cts",
];

/// Cap on simultaneously open directory handles across the scan.
const FD_LIMIT: usize = 64;

/// Fine-grained origin tag preserved from discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CleanupType {
    Artifact,
    Asset,
    PmCache,
    WorkspaceNodeModules,
}

/// One deletion candidate: the logical (un-followed) path for display,
/// the real path for identity, stats, and its discovery origin.
#[derive(Debug, Clone)]
pub struct ScanItem {
    pub path: PathBuf,
    pub real_path: PathBuf,
    pub stats: ArtifactStats,
    pub scope: CleanupScope,
    pub cleanup_type: CleanupType,
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Extra directory names to skip, merged into [`DEFAULT_SKIP_DIRS`].
    pub skip_dirs: Vec<String>,
    pub monorepo_mode: MonorepoMode,
    pub workspace_discovery_mode: WorkspaceDiscoveryMode,
    pub cleanup_scopes: Vec<CleanupScope>,
    pub include_node_modules: bool,
    pub include_project_local_pm_caches: bool,
    pub max_depth: Option<usize>,
}

impl ScanOptions {
    pub fn from_config(config: &PruneConfig) -> Self {
        Self {
            skip_dirs: Vec::new(),
            monorepo_mode: config.monorepo_mode,
            workspace_discovery_mode: config.workspace_discovery_mode,
            cleanup_scopes: config.effective_scopes(),
            include_node_modules: config.include_node_modules,
            include_project_local_pm_caches: config.include_project_local_pm_caches,
            max_depth: config.max_scan_depth,
        }
    }
}

/// Scan `root` and return all candidates, sorted by size descending then
/// path ascending. Only an unresolvable root is an error; everything else
/// degrades to skipped subtrees or per-item stat errors.
pub async fn scan_artifacts(root: &Path, options: &ScanOptions) -> Result<Vec<ScanItem>> {
    let root_real = fs::canonicalize(root)
        .await
        .with_context(|| format!("failed to resolve scan root {}", root.display()))?;

    if options.cleanup_scopes.is_empty() {
        log::debug!("no cleanup scopes active, nothing to scan");
        return Ok(Vec::new());
    }

    let workspace_scope_active = options.cleanup_scopes.contains(&CleanupScope::Workspace);
    let mut workspaces: Vec<PathBuf> = Vec::new();
    if workspace_scope_active && options.monorepo_mode != MonorepoMode::Off {
        workspaces = workspace::discover_workspaces(root, options.workspace_discovery_mode)
            .await?
            .workspace_directories;
    }

    let mut scan_roots: Vec<(PathBuf, CleanupScope)> = Vec::new();
    if options.cleanup_scopes.contains(&CleanupScope::Project) {
        scan_roots.push((root.to_path_buf(), CleanupScope::Project));
    }
    for dir in &workspaces {
        scan_roots.push((dir.clone(), CleanupScope::Workspace));
    }

    let fd_limit = Semaphore::new(FD_LIMIT);
    let ctx = ScanContext {
        root_real: &root_real,
        options,
        skip: skip_names(options),
        workspace_real: workspaces.iter().cloned().collect(),
        workspace_scope_active,
        discovered: Mutex::new(HashMap::new()),
        fd_limit: &fd_limit,
    };

    let ctx_ref = &ctx;
    join_all(scan_roots.iter().map(|(dir, scope)| async move {
        ctx_ref.probe_pm_caches(dir, *scope).await;
        ctx_ref.walk(dir, 0, *scope).await;
    }))
    .await;

    let discovered = ctx.discovered.into_inner().expect("scan poisoned");
    let mut items: Vec<ScanItem> = join_all(discovered.into_iter().map(|(real, found)| {
        let fd_limit = &fd_limit;
        async move {
            let stats = stats::collect_stats(&found.logical, fd_limit).await;
            ScanItem {
                path: found.logical,
                real_path: real,
                stats,
                scope: found.scope,
                cleanup_type: found.cleanup_type,
            }
        }
    }))
    .await;

    items.sort_by(|a, b| {
        b.stats
            .size
            .cmp(&a.stats.size)
            .then_with(|| a.path.cmp(&b.path))
    });
    Ok(items)
}

fn skip_names(options: &ScanOptions) -> HashSet<String> {
    DEFAULT_SKIP_DIRS
        .iter()
        .map(|s| s.to_string())
        .chain(options.skip_dirs.iter().cloned())
        .collect()
}

struct Found {
    logical: PathBuf,
    scope: CleanupScope,
    cleanup_type: CleanupType,
}

struct ScanContext<'a> {
    root_real: &'a Path,
    options: &'a ScanOptions,
    skip: HashSet<String>,
    workspace_real: HashSet<PathBuf>,
    workspace_scope_active: bool,
    /// Keyed by real path; workspace-scope discoveries replace
    /// project-scope ones for the same path, never the reverse.
    discovered: Mutex<HashMap<PathBuf, Found>>,
    fd_limit: &'a Semaphore,
}

impl ScanContext<'_> {
    /// Record a candidate after symlink resolution and containment. A path
    /// whose real location is the root itself or anywhere outside it is
    /// silently dropped.
    async fn emit(&self, logical: PathBuf, scope: CleanupScope, cleanup_type: CleanupType) {
        let Ok(real) = fs::canonicalize(&logical).await else {
            return;
        };
        if real == self.root_real || !real.starts_with(self.root_real) {
            log::debug!("dropping candidate outside root: {}", logical.display());
            return;
        }

        let mut discovered = self.discovered.lock().expect("scan poisoned");
        match discovered.entry(real) {
            Entry::Vacant(slot) => {
                slot.insert(Found {
                    logical,
                    scope,
                    cleanup_type,
                });
            }
            Entry::Occupied(mut slot) => {
                if slot.get().scope == CleanupScope::Project && scope == CleanupScope::Workspace {
                    slot.insert(Found {
                        logical,
                        scope,
                        cleanup_type,
                    });
                }
            }
        }
    }

    /// Probe the fixed package-manager cache locations directly under a
    /// scan root.
    async fn probe_pm_caches(&self, scan_root: &Path, scope: CleanupScope) {
        if !self.options.include_project_local_pm_caches {
            return;
        }
        for rel in PROJECT_PM_CACHE_DIRS {
            let path = scan_root.join(rel);
            if is_dir(&path).await {
                self.emit(path, scope, CleanupType::PmCache).await;
            }
        }
    }

    /// Process one directory: candidates among its entries, a possible
    /// custom `distDir`, then fan out into the surviving subdirectories.
    /// `depth` is the depth of this directory's entries; 0 means direct
    /// children of the scan root.
    fn walk<'a>(&'a self, dir: &'a Path, depth: usize, scope: CleanupScope) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let listing = {
                let _permit = self.fd_limit.acquire().await;
                let Ok(mut entries) = fs::read_dir(dir).await else {
                    log::debug!("unreadable directory skipped: {}", dir.display());
                    return;
                };
                let mut listing = Vec::new();
                while let Ok(Some(entry)) = entries.next_entry().await {
                    let Ok(file_type) = entry.file_type().await else {
                        continue;
                    };
                    let name = entry.file_name().to_string_lossy().into_owned();
                    listing.push((name, entry.path(), file_type));
                }
                listing
            };

            self.check_next_config(dir, &listing, scope).await;

            let mut recurse: Vec<&Path> = Vec::new();
            for (name, path, file_type) in &listing {
                let is_dir = file_type.is_dir();
                if !is_dir && !file_type.is_symlink() {
                    continue;
                }

                if ARTIFACT_DIR_NAMES.contains(&name.as_str()) {
                    // Symlinked artifact dirs are still candidates; emit()
                    // drops them if their target leaves the root.
                    if is_dir || symlink_to_dir(path).await {
                        self.emit(path.clone(), scope, CleanupType::Artifact).await;
                    }
                    continue;
                }
                if name == "node_modules" {
                    if self.options.include_node_modules && (is_dir || symlink_to_dir(path).await) {
                        let cleanup_type = if scope == CleanupScope::Workspace {
                            CleanupType::WorkspaceNodeModules
                        } else {
                            CleanupType::Artifact
                        };
                        self.emit(path.clone(), scope, cleanup_type).await;
                    }
                    continue;
                }
                if !is_dir {
                    // Remaining rules all describe real directories; plain
                    // symlinks are never traversed.
                    continue;
                }
                if name == ".vercel" {
                    let output = path.join("output");
                    if is_dir_no_symlink(&output).await {
                        self.emit(output, scope, CleanupType::Artifact).await;
                    }
                    continue;
                }
                if self.skip.contains(name.as_str()) {
                    continue;
                }
                if self.options.max_depth.is_some_and(|max| depth >= max) {
                    continue;
                }
                if scope == CleanupScope::Project && self.workspace_scope_active {
                    // Workspace roots re-enter via their own scan root.
                    if let Ok(real) = fs::canonicalize(path).await {
                        if self.workspace_real.contains(&real) {
                            continue;
                        }
                    }
                }
                recurse.push(path);
            }

            join_all(
                recurse
                    .into_iter()
                    .map(|child| self.walk(child, depth + 1, scope)),
            )
            .await;
        })
    }

    /// Look for a Next.js config among this directory's files and emit a
    /// custom `distDir` as an artifact candidate.
    async fn check_next_config(
        &self,
        dir: &Path,
        listing: &[(String, PathBuf, std::fs::FileType)],
        scope: CleanupScope,
    ) {
        let files: HashSet<&str> = listing
            .iter()
            .filter(|(_, _, ft)| ft.is_file())
            .map(|(name, _, _)| name.as_str())
            .collect();

        let Some(config_name) = NEXT_CONFIG_FILES.iter().find(|name| files.contains(**name)) else {
            return;
        };

        let Ok(source) = fs::read_to_string(dir.join(config_name)).await else {
            return;
        };
        let Some(dist_dir) = extract_dist_dir(&source) else {
            return;
        };

        let target = dir.join(&dist_dir);
        if is_dir(&target).await {
            log::debug!("custom distDir {} in {}", dist_dir, dir.display());
            self.emit(target, scope, CleanupType::Artifact).await;
        }
    }
}

/// Pull a `distDir` value out of Next.js config source. Comments are
/// stripped first so a commented-out setting does not win.
fn extract_dist_dir(source: &str) -> Option<String> {
    static BLOCK_COMMENT: OnceLock<Regex> = OnceLock::new();
    static LINE_COMMENT: OnceLock<Regex> = OnceLock::new();
    static DIST_DIR: OnceLock<Regex> = OnceLock::new();

    let block = BLOCK_COMMENT.get_or_init(|| Regex::new(r"(?s)/\*.*?\*/").expect("static regex"));
    let line = LINE_COMMENT.get_or_init(|| Regex::new(r"//[^\n]*").expect("static regex"));
    let dist = DIST_DIR.get_or_init(|| {
        Regex::new(r#"\bdistDir\s*:\s*(?:'([^']*)'|"([^"]*)"|`([^`]*)`)"#).expect("static regex")
    });

    let stripped = block.replace_all(source, "");
    let stripped = line.replace_all(&stripped, "");
    let captures = dist.captures(&stripped)?;
    let value = captures
        .get(1)
        .or_else(|| captures.get(2))
        .or_else(|| captures.get(3))?
        .as_str();
    sanitize_dist_dir(value)
}

/// A usable distDir is a non-empty relative POSIX path that stays inside
/// its directory lexically. Absolute paths, drive prefixes, and traversal
/// are rejected.
fn sanitize_dist_dir(value: &str) -> Option<String> {
    let cleaned = value.trim().replace('\\', "/");
    if cleaned.is_empty() || cleaned.starts_with('/') {
        return None;
    }
    normalize_path_pattern(&cleaned)
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}

/// Directory check that refuses symlinks (`.vercel/output` must be the
/// real thing).
async fn is_dir_no_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path).await.is_ok_and(|m| m.is_dir())
}

async fn symlink_to_dir(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as sfs;

    fn options() -> ScanOptions {
        ScanOptions::from_config(&PruneConfig::default())
    }

    fn write(root: &Path, path: &str, bytes: usize) {
        let full = root.join(path);
        sfs::create_dir_all(full.parent().unwrap()).unwrap();
        sfs::write(full, vec![0u8; bytes]).unwrap();
    }

    fn rel(path: &Path, root: &Path) -> String {
        let stripped = sfs::canonicalize(root)
            .ok()
            .and_then(|real| path.strip_prefix(real).ok().map(Path::to_path_buf))
            .or_else(|| path.strip_prefix(root).ok().map(Path::to_path_buf))
            .unwrap();
        stripped.to_string_lossy().into_owned()
    }

    fn names(items: &[ScanItem], root: &Path) -> Vec<String> {
        items.iter().map(|i| rel(&i.path, root)).collect()
    }

    // ── extract_dist_dir ──────────────────────────────────────────────────────

    #[test]
    fn dist_dir_single_quotes() {
        assert_eq!(
            extract_dist_dir("module.exports = { distDir: 'build/output' }"),
            Some("build/output".to_string())
        );
    }

    #[test]
    fn dist_dir_backticks_and_spacing() {
        assert_eq!(
            extract_dist_dir("const c = {\n  distDir : `dist`\n}"),
            Some("dist".to_string())
        );
    }

    #[test]
    fn dist_dir_ignores_comments() {
        let source = "// distDir: 'commented'\n/* distDir: \"blocked\" */\nmodule.exports = { distDir: \"real\" }";
        assert_eq!(extract_dist_dir(source), Some("real".to_string()));
    }

    #[test]
    fn dist_dir_rejects_unsafe_values() {
        assert_eq!(extract_dist_dir("distDir: '/abs'"), None);
        assert_eq!(extract_dist_dir("distDir: '../up'"), None);
        assert_eq!(extract_dist_dir("distDir: 'C:/x'"), None);
        assert_eq!(extract_dist_dir("distDir: ''"), None);
        assert_eq!(extract_dist_dir("no config here"), None);
    }

    // ── basic discovery ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn finds_artifacts_sorted_by_size() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, ".next/cache/chunk.js", 5000);
        write(root, "coverage/lcov.info", 100);
        write(root, "src/index.ts", 50);

        let items = scan_artifacts(root, &options()).await.unwrap();
        let root_real = sfs::canonicalize(root).unwrap();
        assert_eq!(names(&items, root), vec![".next", "coverage"]);
        assert_eq!(items[0].stats.size, 5000);
        assert!(items[0].stats.is_directory);
        assert_eq!(items[0].cleanup_type, CleanupType::Artifact);
        for item in &items {
            assert!(item.real_path.starts_with(&root_real));
            assert_ne!(item.real_path, root_real);
        }
    }

    #[tokio::test]
    async fn artifacts_inside_skipped_dirs_stay_hidden() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, "node_modules/pkg/.next/trace", 10);
        write(root, ".git/objects/aa", 10);

        let items = scan_artifacts(root, &options()).await.unwrap();
        // node_modules itself is the only candidate; nothing inside it or
        // .git is reported.
        assert_eq!(names(&items, root), vec!["node_modules"]);
    }

    #[tokio::test]
    async fn node_modules_toggle() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, "node_modules/pkg/index.js", 10);

        let mut opts = options();
        opts.include_node_modules = false;
        let items = scan_artifacts(root, &opts).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn pm_caches_probed_at_root_only() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, ".npm/_cacache/x", 10);
        write(root, ".yarn/cache/pkg.zip", 10);
        write(root, "deep/.npm/x", 10);

        let items = scan_artifacts(root, &options()).await.unwrap();
        let mut found = names(&items, root);
        found.sort();
        // deep/.npm is not probed (pm caches are root-level only) and the
        // walk does not treat .npm as an artifact name.
        assert_eq!(found, vec![".npm", ".yarn/cache"]);
        assert!(items.iter().all(|i| i.cleanup_type == CleanupType::PmCache));
    }

    #[tokio::test]
    async fn pm_caches_probed_under_workspace_roots() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        sfs::write(
            root.join("package.json"),
            r#"{"workspaces": ["packages/*"]}"#,
        )
        .unwrap();
        write(root, "packages/web/package.json", 2);
        write(root, "packages/web/.pnpm-store/v3/x", 10);

        let items = scan_artifacts(root, &options()).await.unwrap();
        assert_eq!(names(&items, root), vec!["packages/web/.pnpm-store"]);
        assert_eq!(items[0].cleanup_type, CleanupType::PmCache);
        assert_eq!(items[0].scope, CleanupScope::Workspace);
    }

    #[tokio::test]
    async fn pm_cache_toggle() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, ".pnpm-store/v3/files/x", 10);

        let mut opts = options();
        opts.include_project_local_pm_caches = false;
        let items = scan_artifacts(root, &opts).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn vercel_output_is_the_candidate() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, ".vercel/output/static/app.js", 10);
        write(root, ".vercel/project.json", 10);

        let items = scan_artifacts(root, &options()).await.unwrap();
        assert_eq!(names(&items, root), vec![".vercel/output"]);
        assert_eq!(items[0].cleanup_type, CleanupType::Artifact);
    }

    #[tokio::test]
    async fn custom_dist_dir_from_next_config() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, "build/output/main.js", 10);
        sfs::write(
            root.join("next.config.js"),
            "// custom output\nmodule.exports = { distDir: 'build/output' };\n",
        )
        .unwrap();

        let items = scan_artifacts(root, &options()).await.unwrap();
        assert_eq!(names(&items, root), vec!["build/output"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_dist_dir_outside_root_is_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("repo");
        let outside = tmp.path().join("outside/dist-output");
        sfs::create_dir_all(&root).unwrap();
        sfs::create_dir_all(&outside).unwrap();
        sfs::write(outside.join("big.bin"), vec![0u8; 1000]).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("dist-link")).unwrap();
        sfs::write(
            root.join("next.config.js"),
            "module.exports = { distDir: 'dist-link' };\n",
        )
        .unwrap();

        let items = scan_artifacts(&root, &options()).await.unwrap();
        assert!(items.is_empty());
        assert!(outside.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_artifact_name_outside_root_is_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("repo");
        let outside = tmp.path().join("elsewhere");
        sfs::create_dir_all(&root).unwrap();
        sfs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, root.join(".next")).unwrap();

        let items = scan_artifacts(&root, &options()).await.unwrap();
        assert!(items.is_empty());
    }

    // ── depth semantics ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn max_depth_gates_descent_not_emission() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, ".next/x", 10); // depth 0
        write(root, "a/.turbo/y", 10); // depth 1, under a (depth 0)
        write(root, "a/b/coverage/z", 10); // depth 2, needs descent past b

        let mut opts = options();
        opts.max_depth = Some(1);
        let items = scan_artifacts(root, &opts).await.unwrap();
        let mut found = names(&items, root);
        found.sort();
        // a (depth 0) may be entered; its entries sit at depth 1 where
        // the artifact match still fires, but b is not descended.
        assert_eq!(found, vec![".next", "a/.turbo"]);
    }

    #[tokio::test]
    async fn max_depth_zero_sees_only_root_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, "out/index.html", 10);
        write(root, "a/.next/x", 10);

        let mut opts = options();
        opts.max_depth = Some(0);
        let items = scan_artifacts(root, &opts).await.unwrap();
        assert_eq!(names(&items, root), vec!["out"]);
    }

    // ── scopes and workspaces ─────────────────────────────────────────────────

    #[tokio::test]
    async fn empty_scopes_scan_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, ".next/x", 10);

        let mut opts = options();
        opts.cleanup_scopes = Vec::new();
        let items = scan_artifacts(root, &opts).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn workspace_candidates_carry_workspace_scope() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        sfs::write(
            root.join("package.json"),
            r#"{"workspaces": ["packages/*"]}"#,
        )
        .unwrap();
        write(root, "packages/web/package.json", 2);
        write(root, "packages/web/.next/chunk", 10);
        write(root, "packages/web/node_modules/dep/i.js", 10);
        write(root, "node_modules/root-dep/i.js", 10);

        let items = scan_artifacts(root, &options()).await.unwrap();
        let by_name: HashMap<String, &ScanItem> =
            items.iter().map(|i| (rel(&i.path, root), i)).collect();

        let web_next = by_name["packages/web/.next"];
        assert_eq!(web_next.scope, CleanupScope::Workspace);

        let web_nm = by_name["packages/web/node_modules"];
        assert_eq!(web_nm.scope, CleanupScope::Workspace);
        assert_eq!(web_nm.cleanup_type, CleanupType::WorkspaceNodeModules);

        let root_nm = by_name["node_modules"];
        assert_eq!(root_nm.scope, CleanupScope::Project);
        assert_eq!(root_nm.cleanup_type, CleanupType::Artifact);
    }

    #[tokio::test]
    async fn workspace_only_scope_ignores_project_candidates() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        sfs::write(
            root.join("pnpm-workspace.yaml"),
            "packages:\n  - apps/*\n  - '!apps/ignored'\n",
        )
        .unwrap();
        write(root, "apps/site/package.json", 2);
        write(root, "apps/site/.next/x", 10);
        write(root, "apps/ignored/package.json", 2);
        write(root, "apps/ignored/.next/x", 10);
        write(root, ".next/x", 10);

        let mut opts = options();
        opts.cleanup_scopes = vec![CleanupScope::Workspace];
        let items = scan_artifacts(root, &opts).await.unwrap();
        assert_eq!(names(&items, root), vec!["apps/site/.next"]);
        assert_eq!(items[0].scope, CleanupScope::Workspace);
    }

    #[tokio::test]
    async fn monorepo_off_disables_workspace_roots() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        sfs::write(
            root.join("package.json"),
            r#"{"workspaces": ["packages/*"]}"#,
        )
        .unwrap();
        write(root, "packages/web/package.json", 2);
        write(root, "packages/web/.next/x", 10);

        let mut opts = options();
        opts.monorepo_mode = MonorepoMode::Off;
        let items = scan_artifacts(root, &opts).await.unwrap();
        // With workspace discovery off the project walk reaches the same
        // directory, so it reports with project scope.
        assert_eq!(names(&items, root), vec!["packages/web/.next"]);
        assert_eq!(items[0].scope, CleanupScope::Project);
    }

    #[tokio::test]
    async fn workspace_discovery_wins_collisions() {
        let tmp = tempfile::tempdir().unwrap();
        let root = sfs::canonicalize(tmp.path()).unwrap();
        let nm = root.join("packages/web/node_modules");
        sfs::create_dir_all(&nm).unwrap();

        let opts = options();
        let fd_limit = Semaphore::new(4);
        let ctx = ScanContext {
            root_real: &root,
            options: &opts,
            skip: skip_names(&opts),
            workspace_real: HashSet::new(),
            workspace_scope_active: true,
            discovered: Mutex::new(HashMap::new()),
            fd_limit: &fd_limit,
        };

        ctx.emit(nm.clone(), CleanupScope::Project, CleanupType::Artifact)
            .await;
        ctx.emit(
            nm.clone(),
            CleanupScope::Workspace,
            CleanupType::WorkspaceNodeModules,
        )
        .await;
        // A later project-scope sighting must not downgrade it back.
        ctx.emit(nm.clone(), CleanupScope::Project, CleanupType::Artifact)
            .await;

        let discovered = ctx.discovered.into_inner().unwrap();
        assert_eq!(discovered.len(), 1);
        let found = discovered.values().next().unwrap();
        assert_eq!(found.scope, CleanupScope::Workspace);
        assert_eq!(found.cleanup_type, CleanupType::WorkspaceNodeModules);
    }

    #[tokio::test]
    async fn real_paths_are_unique() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        sfs::write(
            root.join("package.json"),
            r#"{"workspaces": ["packages/*"]}"#,
        )
        .unwrap();
        write(root, "packages/web/package.json", 2);
        write(root, "packages/web/.next/x", 10);
        write(root, ".next/y", 10);

        let items = scan_artifacts(root, &options()).await.unwrap();
        let mut reals: Vec<_> = items.iter().map(|i| i.real_path.clone()).collect();
        reals.sort();
        reals.dedup();
        assert_eq!(reals.len(), items.len());
    }

    #[tokio::test]
    async fn stats_attach_file_counts() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        write(root, ".turbo/a", 10);
        write(root, ".turbo/sub/b", 20);

        let items = scan_artifacts(root, &options()).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].stats.file_count, 2);
        assert_eq!(items[0].stats.size, 30);
    }
}
