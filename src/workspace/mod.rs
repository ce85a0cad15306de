//! Workspace enumeration for monorepos.
//!
//! Workspaces are discovered from manifest files (`package.json`
//! `workspaces`, `pnpm-workspace.yaml`, `lerna.json`) or, when no manifest
//! yields anything, from a heuristic sweep of conventional parent
//! directories. Every discovered directory is symlink-resolved and must
//! stay strictly inside the root; the result is deduplicated and sorted
//! so discovery order never leaks into output.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use tokio::fs;

use crate::config::WorkspaceDiscoveryMode;
use crate::pattern::{matches_workspace_pattern, normalize_workspace_pattern, segment_regex};

/// Directory names never traversed while expanding workspace patterns.
pub const WORKSPACE_SKIP_DIRS: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "node_modules",
    ".next",
    ".turbo",
    ".vercel",
    "coverage",
    ".swc",
    ".docusaurus",
    "storybook-static",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceSource {
    Manifest,
    Heuristic,
    None,
}

#[derive(Debug, Clone)]
pub struct WorkspaceDiscoveryResult {
    pub root_realpath: PathBuf,
    /// Real paths, strictly inside the root, sorted lexicographically.
    pub workspace_directories: Vec<PathBuf>,
    pub source: WorkspaceSource,
    /// Normalized patterns collected from manifests, negations included.
    pub manifest_patterns: Vec<String>,
    pub has_manifest: bool,
}

/// Enumerate workspace directories under `root` according to `mode`.
///
/// Only a root that cannot be resolved is an error; unreadable or
/// malformed manifests silently contribute nothing.
pub async fn discover_workspaces(
    root: &Path,
    mode: WorkspaceDiscoveryMode,
) -> Result<WorkspaceDiscoveryResult> {
    let root_realpath = fs::canonicalize(root)
        .await
        .with_context(|| format!("failed to resolve scan root {}", root.display()))?;

    let (raw_patterns, has_manifest) = collect_manifest_patterns(root).await;
    let manifest_patterns: Vec<String> = raw_patterns
        .iter()
        .filter_map(|p| normalize_workspace_pattern(p))
        .collect();

    let use_manifest = mode != WorkspaceDiscoveryMode::HeuristicOnly;
    let mut candidates: Vec<PathBuf> = Vec::new();
    let mut source = WorkspaceSource::None;

    if use_manifest {
        candidates = expand_manifest_patterns(root, &manifest_patterns).await;
        if !candidates.is_empty() {
            source = WorkspaceSource::Manifest;
        }
    }

    let heuristic_allowed = mode == WorkspaceDiscoveryMode::HeuristicOnly
        || (mode == WorkspaceDiscoveryMode::ManifestFallback && candidates.is_empty());
    if heuristic_allowed && candidates.is_empty() {
        candidates = heuristic_workspaces(root).await;
        if !candidates.is_empty() {
            source = WorkspaceSource::Heuristic;
        }
    }

    let workspace_directories = contain_and_dedupe(&root_realpath, candidates).await;
    if workspace_directories.is_empty() {
        source = WorkspaceSource::None;
    }
    log::debug!(
        "workspace discovery: {} directories via {:?} (manifest present: {})",
        workspace_directories.len(),
        source,
        has_manifest
    );

    Ok(WorkspaceDiscoveryResult {
        root_realpath,
        workspace_directories,
        source,
        manifest_patterns,
        has_manifest,
    })
}

// ── Manifest collection ───────────────────────────────────────────────────────

/// Gather raw workspace pattern strings from the three manifest sources.
/// The boolean reports whether *any* source yielded a candidate, even one
/// that later fails normalization.
async fn collect_manifest_patterns(root: &Path) -> (Vec<String>, bool) {
    let mut raw: Vec<String> = Vec::new();

    if let Some(doc) = read_json(&root.join("package.json")).await {
        raw.extend(package_json_workspaces(&doc));
    }
    if let Ok(content) = fs::read_to_string(root.join("pnpm-workspace.yaml")).await {
        raw.extend(pnpm_workspace_packages(&content));
    }
    if let Some(doc) = read_json(&root.join("lerna.json")).await {
        raw.extend(string_array(doc.get("packages")));
    }

    let has_manifest = !raw.is_empty();
    (raw, has_manifest)
}

async fn read_json(path: &Path) -> Option<Value> {
    let content = fs::read_to_string(path).await.ok()?;
    serde_json::from_str(&content).ok()
}

/// `workspaces` is either an array of strings or `{ "packages": [...] }`.
fn package_json_workspaces(doc: &Value) -> Vec<String> {
    match doc.get("workspaces") {
        Some(Value::Array(_)) => string_array(doc.get("workspaces")),
        Some(Value::Object(obj)) => string_array(obj.get("packages")),
        _ => Vec::new(),
    }
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Narrow line-based `pnpm-workspace.yaml` reader: the `packages:` list
/// only, terminated by the next top-level key. Not a YAML parser.
fn pnpm_workspace_packages(content: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut in_packages = false;

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if is_top_level_key(line) {
            in_packages = line.trim_start().starts_with("packages")
                && line
                    .trim_start()
                    .trim_start_matches("packages")
                    .trim_start()
                    .starts_with(':');
            continue;
        }

        if in_packages {
            if let Some(item) = list_item(trimmed) {
                out.push(item);
            }
        }
    }
    out
}

/// `^[A-Za-z0-9_-]+\s*:` at column zero.
fn is_top_level_key(line: &str) -> bool {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len()
        && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b'-')
    {
        i += 1;
    }
    if i == 0 {
        return false;
    }
    line[i..].trim_start().starts_with(':')
}

/// `- pattern`, optionally single- or double-quoted.
fn list_item(trimmed: &str) -> Option<String> {
    let rest = trimmed.strip_prefix('-')?.trim();
    let rest = rest
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .or_else(|| rest.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')))
        .unwrap_or(rest);
    let rest = rest.trim();
    (!rest.is_empty()).then(|| rest.to_string())
}

// ── Pattern expansion ─────────────────────────────────────────────────────────

/// Expand include patterns, then drop anything a negated pattern matches.
async fn expand_manifest_patterns(root: &Path, patterns: &[String]) -> Vec<PathBuf> {
    let (excludes, includes): (Vec<&String>, Vec<&String>) =
        patterns.iter().partition(|p| p.starts_with('!'));

    let mut dirs: Vec<PathBuf> = Vec::new();
    for pattern in includes {
        let segments: Vec<String> = pattern.split('/').map(str::to_string).collect();
        dirs.extend(expand_segments(root, &segments).await);
    }

    dirs.retain(|dir| {
        let Ok(rel) = dir.strip_prefix(root) else {
            return true;
        };
        let rel = posix_relative(rel);
        !excludes
            .iter()
            .any(|ex| matches_workspace_pattern(&rel, ex.trim_start_matches('!')))
    });
    dirs
}

fn posix_relative(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Walk pattern segments from `dir`. A directory is a workspace only if
/// every segment is consumed and it holds a `package.json` file.
fn expand_segments<'a>(dir: &'a Path, segments: &'a [String]) -> BoxFuture<'a, Vec<PathBuf>> {
    Box::pin(async move {
        let Some((segment, rest)) = segments.split_first() else {
            return if is_file(&dir.join("package.json")).await {
                vec![dir.to_path_buf()]
            } else {
                Vec::new()
            };
        };

        let mut found = Vec::new();
        if segment == "**" {
            // Match zero segments…
            found.extend(expand_segments(dir, rest).await);
            // …and one or more: descend into every non-skipped child.
            for child in child_directories(dir).await {
                found.extend(expand_segments(&child, segments).await);
            }
        } else if segment.contains(['*', '?']) {
            let Some(re) = segment_regex(segment) else {
                return found;
            };
            for child in child_directories(dir).await {
                let name = child.file_name().map(|n| n.to_string_lossy().into_owned());
                if name.is_some_and(|n| re.is_match(&n)) {
                    found.extend(expand_segments(&child, rest).await);
                }
            }
        } else {
            let next = dir.join(segment);
            if is_dir(&next).await {
                found.extend(expand_segments(&next, rest).await);
            }
        }
        found
    })
}

/// Direct subdirectories, skip set applied. Listing failures yield nothing.
async fn child_directories(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let Ok(mut entries) = fs::read_dir(dir).await else {
        return out;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().into_owned();
        if WORKSPACE_SKIP_DIRS.contains(&name.as_str()) {
            continue;
        }
        if entry.file_type().await.is_ok_and(|ft| ft.is_dir()) {
            out.push(entry.path());
        }
    }
    out
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_file())
}

// ── Heuristic discovery ───────────────────────────────────────────────────────

const HEURISTIC_PARENTS: &[&str] = &["apps", "packages", "services", "libs"];

/// Conventional monorepo parents first; when none of them yields a
/// workspace, fall back to direct children of the root so flat layouts
/// still work.
async fn heuristic_workspaces(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for parent in HEURISTIC_PARENTS {
        found.extend(package_directories(&root.join(parent)).await);
    }
    if found.is_empty() {
        found = package_directories(root).await;
    }
    found
}

async fn package_directories(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for child in child_directories(dir).await {
        if is_file(&child.join("package.json")).await {
            out.push(child);
        }
    }
    out
}

// ── Containment ───────────────────────────────────────────────────────────────

/// Resolve every candidate, drop anything that escapes (or equals) the
/// root, deduplicate by real path, sort for determinism.
async fn contain_and_dedupe(root_realpath: &Path, candidates: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut out: Vec<PathBuf> = Vec::new();

    for candidate in candidates {
        let Ok(real) = fs::canonicalize(&candidate).await else {
            continue;
        };
        if real == *root_realpath || !real.starts_with(root_realpath) {
            log::debug!("dropping workspace outside root: {}", candidate.display());
            continue;
        }
        if seen.insert(real.clone()) {
            out.push(real);
        }
    }

    out.sort();
    out
}
