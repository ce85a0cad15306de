//! Deletion engine with per-item accounting.
//!
//! One failed removal never stops the batch; partial progress is the
//! success mode, and the summary reports exactly what happened.

use std::io;
use std::path::{Path, PathBuf};

use futures::future::join_all;
use indicatif::ProgressBar;
use tokio::fs;

#[derive(Debug, Clone)]
pub struct DeleteResult {
    pub path: PathBuf,
    pub ok: bool,
    pub reclaimed_size: u64,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct DeleteSummary {
    pub results: Vec<DeleteResult>,
    pub deleted_count: usize,
    pub failure_count: usize,
    pub reclaimed_bytes: u64,
}

impl DeleteSummary {
    pub fn from_results(results: Vec<DeleteResult>) -> Self {
        let deleted_count = results.iter().filter(|r| r.ok).count();
        let failure_count = results.len() - deleted_count;
        let reclaimed_bytes = results
            .iter()
            .filter(|r| r.ok)
            .map(|r| r.reclaimed_size)
            .sum();
        Self {
            results,
            deleted_count,
            failure_count,
            reclaimed_bytes,
        }
    }
}

/// Remove one path recursively. A path that no longer exists counts as
/// success (someone else got there first, the space is reclaimed either
/// way).
pub async fn delete_item(path: &Path, size: u64) -> DeleteResult {
    let removal = match fs::symlink_metadata(path).await {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
        Ok(meta) => {
            if meta.is_dir() {
                fs::remove_dir_all(path).await
            } else {
                fs::remove_file(path).await
            }
        }
    };

    match removal {
        Ok(()) => DeleteResult {
            path: path.to_path_buf(),
            ok: true,
            reclaimed_size: size,
            error: None,
        },
        Err(err) => {
            log::warn!("failed to remove {}: {err}", path.display());
            DeleteResult {
                path: path.to_path_buf(),
                ok: false,
                reclaimed_size: size,
                error: Some(err.to_string()),
            }
        }
    }
}

/// Delete all targets in parallel and collect the outcome of each.
pub async fn delete_items(
    targets: &[(PathBuf, u64)],
    progress: Option<&ProgressBar>,
) -> DeleteSummary {
    let results = join_all(targets.iter().map(|(path, size)| async move {
        let result = delete_item(path, *size).await;
        if let Some(bar) = progress {
            bar.inc(1);
        }
        result
    }))
    .await;

    DeleteSummary::from_results(results)
}
