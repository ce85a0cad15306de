//! Protection and pre-approval rules applied to the candidate set.
//!
//! `neverDelete` runs first in the pipeline, so a path matched by both
//! lists is protected, never deleted.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::classify::{classify, is_apply_protected};
use crate::pattern::matches_config_pattern;
use crate::scan::ScanItem;

/// Drop every item whose cwd-relative path matches a never-delete
/// pattern. An empty pattern list is the identity.
pub fn filter_never_delete(
    items: Vec<ScanItem>,
    cwd: &Path,
    patterns: &[String],
) -> Vec<ScanItem> {
    if patterns.is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| {
            let Some(rel) = relative_posix(item, cwd) else {
                return true;
            };
            let protected = patterns
                .iter()
                .any(|pattern| matches_config_pattern(&rel, pattern));
            if protected {
                log::debug!("never-delete protects {}", item.path.display());
            }
            !protected
        })
        .collect()
}

/// Absolute paths pre-approved for deletion by an always-delete pattern.
pub fn select_always_delete_paths(
    items: &[ScanItem],
    cwd: &Path,
    patterns: &[String],
) -> HashSet<PathBuf> {
    if patterns.is_empty() {
        return HashSet::new();
    }
    items
        .iter()
        .filter(|item| {
            relative_posix(item, cwd).is_some_and(|rel| {
                patterns
                    .iter()
                    .any(|pattern| matches_config_pattern(&rel, pattern))
            })
        })
        .map(|item| item.path.clone())
        .collect()
}

pub fn contains_apply_protected(items: &[ScanItem]) -> bool {
    items.iter().any(|item| is_apply_protected(classify(item)))
}

/// The logical path relative to `cwd` in POSIX form; workspace items
/// carry resolved paths, so fall back to the real path before giving up.
fn relative_posix(item: &ScanItem, cwd: &Path) -> Option<String> {
    let rel = item
        .path
        .strip_prefix(cwd)
        .or_else(|_| item.real_path.strip_prefix(cwd))
        .ok()?;
    Some(
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CleanupScope;
    use crate::scan::{ArtifactStats, CleanupType};

    fn item(root: &Path, rel: &str, cleanup_type: CleanupType) -> ScanItem {
        let path = root.join(rel);
        ScanItem {
            real_path: path.clone(),
            path,
            stats: ArtifactStats {
                size: 10,
                file_count: 1,
                mtime: None,
                is_directory: true,
                error: None,
            },
            scope: CleanupScope::Project,
            cleanup_type,
        }
    }

    #[test]
    fn empty_never_delete_is_identity() {
        let root = Path::new("/repo");
        let items = vec![item(root, ".next", CleanupType::Artifact)];
        let kept = filter_never_delete(items.clone(), root, &[]);
        assert_eq!(kept.len(), items.len());
    }

    #[test]
    fn never_delete_partitions_items() {
        let root = Path::new("/repo");
        let items = vec![
            item(root, ".next", CleanupType::Artifact),
            item(root, "packages/keep/.next", CleanupType::Artifact),
            item(root, "packages/other/.next", CleanupType::Artifact),
        ];
        let patterns = vec!["packages/keep".to_string()];
        let kept = filter_never_delete(items.clone(), root, &patterns);

        assert_eq!(kept.len(), 2);
        assert!(
            kept.iter()
                .all(|i| !i.path.starts_with(root.join("packages/keep")))
        );
        // Partition: kept plus matched equals the original set.
        let matched = items.len() - kept.len();
        assert_eq!(matched, 1);
    }

    #[test]
    fn never_delete_matches_whole_segments_only() {
        let root = Path::new("/repo");
        let items = vec![item(root, "packages/keeper/.next", CleanupType::Artifact)];
        let patterns = vec!["packages/keep".to_string()];
        let kept = filter_never_delete(items, root, &patterns);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn always_delete_selects_matching_paths() {
        let root = Path::new("/repo");
        let items = vec![
            item(root, ".next", CleanupType::Artifact),
            item(root, "coverage", CleanupType::Artifact),
        ];
        let selected = select_always_delete_paths(&items, root, &[".next".to_string()]);
        assert_eq!(selected.len(), 1);
        assert!(selected.contains(&root.join(".next")));
    }

    #[test]
    fn items_outside_cwd_are_never_matched() {
        let root = Path::new("/repo");
        let items = vec![item(Path::new("/elsewhere"), ".next", CleanupType::Artifact)];
        let kept = filter_never_delete(items, root, &[".next".to_string()]);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn protection_detection_spots_caches() {
        let root = Path::new("/repo");
        let safe = vec![item(root, ".next", CleanupType::Artifact)];
        assert!(!contains_apply_protected(&safe));

        let risky = vec![item(root, ".npm", CleanupType::PmCache)];
        assert!(contains_apply_protected(&risky));

        let modules = vec![item(
            root,
            "packages/web/node_modules",
            CleanupType::WorkspaceNodeModules,
        )];
        assert!(contains_apply_protected(&modules));
    }
}
