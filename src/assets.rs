//! Unused public asset detection.
//!
//! Correlates the image files under `public/` against the textual source
//! tree by substring reference. The matching is deliberately
//! conservative: a bare-filename fallback only applies when that filename
//! is globally unique under `public/`, so a second `logo.png` somewhere
//! else can never mark this one as used by accident. False positives keep
//! files; false negatives delete them, so the bias is one-directional.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::config::CleanupScope;
use crate::scan::{self, CleanupType, ScanItem};

pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "webp", "avif", "ico", "bmp",
];

pub const SOURCE_EXTENSIONS: &[&str] = &[
    "js", "jsx", "ts", "tsx", "css", "scss", "sass", "less", "html", "md", "mdx",
];

pub const DEFAULT_SOURCE_DIRS: &[&str] =
    &["src", "app", "pages", "components", "lib", "utils", "hooks"];

/// Extra names excluded from the source sweep on top of the scanner's
/// skip table: referencing an asset from generated output does not make
/// it used.
const ASSET_EXTRA_SKIP_DIRS: &[&str] = &["public", "dist", "build", "out"];

struct AssetFile {
    full_path: PathBuf,
    filename: String,
    /// POSIX path relative to `public/`.
    relative_path: String,
}

/// Full paths of `public/` images no source file references, sorted.
pub async fn find_unused_assets(
    root: &Path,
    source_dirs: Option<&[String]>,
    extra_skip: &[String],
) -> Vec<PathBuf> {
    let public = root.join("public");
    if !fs::metadata(&public).await.is_ok_and(|m| m.is_dir()) {
        return Vec::new();
    }

    let assets = collect_assets(&public).await;
    if assets.is_empty() {
        return Vec::new();
    }

    let mut basename_counts: HashMap<&str, usize> = HashMap::new();
    for asset in &assets {
        *basename_counts.entry(asset.filename.as_str()).or_default() += 1;
    }

    let sources = collect_source_files(root, source_dirs, extra_skip).await;
    log::debug!(
        "asset check: {} assets against {} source files",
        assets.len(),
        sources.len()
    );

    let mut unresolved: HashSet<usize> = (0..assets.len()).collect();
    for source in sources {
        if unresolved.is_empty() {
            break;
        }
        let Ok(content) = fs::read_to_string(&source).await else {
            continue;
        };
        unresolved.retain(|&idx| {
            let asset = &assets[idx];
            if content.contains(&asset.relative_path) {
                return false;
            }
            let unique = basename_counts.get(asset.filename.as_str()) == Some(&1);
            !(unique && content.contains(&asset.filename))
        });
    }

    let mut unused: Vec<PathBuf> = unresolved
        .into_iter()
        .map(|idx| assets[idx].full_path.clone())
        .collect();
    unused.sort();
    unused
}

/// [`find_unused_assets`] lifted into scan items so the rest of the
/// pipeline treats assets like any other candidate.
pub async fn unused_asset_items(
    root: &Path,
    source_dirs: Option<&[String]>,
    extra_skip: &[String],
) -> Vec<ScanItem> {
    let fd_limit = tokio::sync::Semaphore::new(16);
    let mut items = Vec::new();
    for path in find_unused_assets(root, source_dirs, extra_skip).await {
        let Ok(real_path) = fs::canonicalize(&path).await else {
            continue;
        };
        let stats = scan::stats::collect_stats(&path, &fd_limit).await;
        items.push(ScanItem {
            path,
            real_path,
            stats,
            scope: CleanupScope::Project,
            cleanup_type: CleanupType::Asset,
        });
    }
    items
}

async fn collect_assets(public: &Path) -> Vec<AssetFile> {
    let mut assets = Vec::new();
    let mut stack = vec![public.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let Ok(mut entries) = fs::read_dir(&dir).await else {
            continue;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() && has_extension(&path, IMAGE_EXTENSIONS) {
                let Ok(rel) = path.strip_prefix(public) else {
                    continue;
                };
                let filename = entry.file_name().to_string_lossy().into_owned();
                assets.push(AssetFile {
                    relative_path: posix(rel),
                    filename,
                    full_path: path,
                });
            }
        }
    }
    assets
}

/// Source corpus: files directly in the root (non-recursive) plus a
/// recursive walk of each existing source directory.
async fn collect_source_files(
    root: &Path,
    source_dirs: Option<&[String]>,
    extra_skip: &[String],
) -> Vec<PathBuf> {
    let skip: HashSet<String> = scan::DEFAULT_SKIP_DIRS
        .iter()
        .chain(ASSET_EXTRA_SKIP_DIRS)
        .map(|s| s.to_string())
        .chain(extra_skip.iter().cloned())
        .collect();

    let mut sources = Vec::new();

    if let Ok(mut entries) = fs::read_dir(root).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if entry.file_type().await.is_ok_and(|ft| ft.is_file())
                && has_extension(&path, SOURCE_EXTENSIONS)
            {
                sources.push(path);
            }
        }
    }

    let defaults: Vec<String> = DEFAULT_SOURCE_DIRS.iter().map(|s| s.to_string()).collect();
    let dirs = source_dirs.unwrap_or(&defaults);
    for dir in dirs {
        let mut stack = vec![root.join(dir)];
        while let Some(dir) = stack.pop() {
            let Ok(mut entries) = fs::read_dir(&dir).await else {
                continue;
            };
            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().into_owned();
                let Ok(file_type) = entry.file_type().await else {
                    continue;
                };
                if file_type.is_dir() {
                    if !skip.contains(&name) {
                        stack.push(path);
                    }
                } else if file_type.is_file() && has_extension(&path, SOURCE_EXTENSIONS) {
                    sources.push(path);
                }
            }
        }
    }
    sources
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .is_some_and(|ext| extensions.contains(&ext.as_str()))
}

fn posix(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
