//! Recursive size/mtime aggregation for discovered candidates.

use std::path::Path;
use std::time::SystemTime;

use futures::future::{BoxFuture, join_all};
use tokio::fs;
use tokio::sync::Semaphore;

/// Aggregate statistics for one candidate path.
///
/// Directories sum their contents recursively; the mtime is the newest
/// of the entry itself and everything under it. A failed stat or listing
/// leaves zeroed numbers and an `error` message instead of aborting the
/// scan.
#[derive(Debug, Clone)]
pub struct ArtifactStats {
    pub size: u64,
    pub file_count: u64,
    pub mtime: Option<SystemTime>,
    pub is_directory: bool,
    pub error: Option<String>,
}

impl ArtifactStats {
    fn failed(error: String, mtime: Option<SystemTime>) -> Self {
        Self {
            size: 0,
            file_count: 0,
            mtime,
            is_directory: false,
            error: Some(error),
        }
    }
}

/// Compute stats for `path` without following symlinks (`lstat`
/// semantics: a symlink counts as itself, never its target). Directory
/// listings take a semaphore permit only while the directory is open, so
/// deep trees cannot exhaust file descriptors or deadlock the pool.
pub fn collect_stats<'a>(path: &'a Path, fd_limit: &'a Semaphore) -> BoxFuture<'a, ArtifactStats> {
    Box::pin(async move {
        let meta = match fs::symlink_metadata(path).await {
            Ok(meta) => meta,
            Err(err) => return ArtifactStats::failed(err.to_string(), None),
        };
        let mtime = meta.modified().ok();

        if !meta.is_dir() {
            return ArtifactStats {
                size: meta.len(),
                file_count: 1,
                mtime,
                is_directory: false,
                error: None,
            };
        }

        let mut stats = ArtifactStats {
            size: 0,
            file_count: 0,
            mtime,
            is_directory: true,
            error: None,
        };

        let children = {
            let _permit = fd_limit.acquire().await;
            let mut entries = match fs::read_dir(path).await {
                Ok(entries) => entries,
                Err(err) => {
                    stats.error = Some(err.to_string());
                    return stats;
                }
            };
            let mut children = Vec::new();
            while let Ok(Some(entry)) = entries.next_entry().await {
                children.push(entry.path());
            }
            children
        };

        let child_stats = join_all(
            children
                .iter()
                .map(|child| collect_stats(child, fd_limit)),
        )
        .await;

        for child in child_stats {
            stats.size += child.size;
            stats.file_count += child.file_count;
            stats.mtime = match (stats.mtime, child.mtime) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };
        }
        stats
    })
}
