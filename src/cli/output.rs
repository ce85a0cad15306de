//! Listing, summary, and JSON rendering.

use std::collections::BTreeMap;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use serde::Serialize;

use crate::classify::{CandidateType, classify};
use crate::config::CleanupScope;
use crate::delete::DeleteSummary;
use crate::format::{human_size, time_ago};
use crate::scan::{CleanupType, ScanItem};
use crate::theme::{candidate_style, dim_style, header_style, paint, size_style};

fn display_path(item: &ScanItem, cwd: &Path) -> String {
    item.path
        .strip_prefix(cwd)
        .map(|rel| rel.display().to_string())
        .unwrap_or_else(|_| item.path.display().to_string())
}

fn candidate_tag(candidate: CandidateType) -> &'static str {
    match candidate {
        CandidateType::Artifact => "artifact",
        CandidateType::Asset => "asset",
        CandidateType::NodeModules => "node_modules",
        CandidateType::PmCache => "pm-cache",
    }
}

fn total_size(items: &[ScanItem]) -> u64 {
    items.iter().map(|i| i.stats.size).sum()
}

/// One line per candidate: rank, family tag, relative path, size, age.
fn print_item_line(index: usize, item: &ScanItem, cwd: &Path, color: bool, now: SystemTime) {
    let candidate = classify(item);
    let age = time_ago(item.stats.mtime, now);
    let age_part = if age.is_empty() {
        String::new()
    } else {
        format!("  {}", paint(color, age, dim_style()))
    };
    let error_part = match &item.stats.error {
        Some(err) => format!("  {}", paint(color, format!("⚠ {err}"), dim_style())),
        None => String::new(),
    };
    println!(
        "  {}{} {} {}{}{}",
        paint(color, format!("{index:>3}."), dim_style()),
        paint(
            color,
            format!(" [{}]", candidate_tag(candidate)),
            candidate_style(candidate)
        ),
        display_path(item, cwd),
        paint(
            color,
            format!("({})", human_size(Some(item.stats.size))),
            size_style()
        ),
        age_part,
        error_part,
    );
}

/// The full human-readable listing used by `--list`.
pub(super) fn print_listing(items: &[ScanItem], cwd: &Path) {
    let color = io::stdout().is_terminal();
    let now = SystemTime::now();

    if items.is_empty() {
        println!("✨ Nothing to prune. The tree is already clean.");
        return;
    }

    println!(
        "{} {}",
        paint(color, "📦 Prune candidates:", header_style()),
        paint(
            color,
            format!(
                "{} items ({})",
                items.len(),
                human_size(Some(total_size(items)))
            ),
            size_style()
        ),
    );
    for (i, item) in items.iter().enumerate() {
        print_item_line(i + 1, item, cwd, color, now);
    }
    println!();
    print_family_breakdown(items, color);
}

/// Per-family counts, sorted by reclaimable size.
fn print_family_breakdown(items: &[ScanItem], color: bool) {
    let mut families: BTreeMap<&'static str, (usize, u64, CandidateType)> = BTreeMap::new();
    for item in items {
        let candidate = classify(item);
        let entry = families
            .entry(candidate_tag(candidate))
            .or_insert((0, 0, candidate));
        entry.0 += 1;
        entry.1 += item.stats.size;
    }

    println!("{}", paint(color, "By family:", header_style()));
    for (tag, (count, bytes, candidate)) in families {
        println!(
            "  {}: {} items {}",
            paint(color, tag, candidate_style(candidate)),
            count,
            paint(color, format!("({})", human_size(Some(bytes))), size_style()),
        );
    }
}

/// Scan overview shown before prompting: totals plus the ten largest.
pub(super) fn print_scan_summary(items: &[ScanItem], cwd: &Path) {
    let color = io::stdout().is_terminal();
    let now = SystemTime::now();

    println!();
    println!(
        "{} {}",
        paint(color, "📊 Summary:", header_style()),
        paint(
            color,
            format!(
                "{} items ({}) can be removed",
                items.len(),
                human_size(Some(total_size(items)))
            ),
            size_style()
        ),
    );
    println!();

    let show_n = 10.min(items.len());
    for (i, item) in items.iter().take(show_n).enumerate() {
        print_item_line(i + 1, item, cwd, color, now);
    }
    if items.len() > show_n {
        println!(
            "  {}",
            paint(
                color,
                format!("… and {} more candidates", items.len() - show_n),
                dim_style()
            )
        );
    }
    println!();
    print_family_breakdown(items, color);
    println!();
}

pub(super) fn print_dry_run_summary(items: &[ScanItem], cwd: &Path) {
    let color = io::stdout().is_terminal();
    if items.is_empty() {
        println!("✨ Nothing to prune. The tree is already clean.");
        return;
    }
    println!(
        "{} {}",
        paint(color, "🏜  Dry run:", header_style()),
        paint(
            color,
            format!(
                "would remove {} items ({})",
                items.len(),
                human_size(Some(total_size(items)))
            ),
            size_style()
        ),
    );
    let now = SystemTime::now();
    for (i, item) in items.iter().enumerate() {
        print_item_line(i + 1, item, cwd, color, now);
    }
    println!("\nNothing was deleted. Re-run without --dry-run to reclaim the space.");
}

pub(super) fn print_removal_summary(summary: &DeleteSummary) {
    let color = io::stdout().is_terminal();
    println!(
        "{} {}",
        paint(color, "🧹 Removed:", header_style()),
        paint(
            color,
            format!(
                "{} items, reclaimed {}",
                summary.deleted_count,
                human_size(Some(summary.reclaimed_bytes))
            ),
            size_style()
        ),
    );
    if summary.failure_count > 0 {
        eprintln!("⚠️  {} items could not be removed:", summary.failure_count);
        for result in summary.results.iter().filter(|r| !r.ok) {
            eprintln!(
                "   {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

// ── JSON output ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport {
    root: String,
    total_size: u64,
    items: Vec<JsonItem>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonItem {
    path: String,
    size: u64,
    file_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    mtime_ms: Option<u64>,
    is_directory: bool,
    cleanup_scope: CleanupScope,
    cleanup_type: CleanupType,
    candidate_type: CandidateType,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub(super) fn render_json(items: &[ScanItem], cwd: &Path) -> Result<String> {
    let report = JsonReport {
        root: cwd.display().to_string(),
        total_size: total_size(items),
        items: items
            .iter()
            .map(|item| JsonItem {
                path: item.path.display().to_string(),
                size: item.stats.size,
                file_count: item.stats.file_count,
                mtime_ms: item.stats.mtime.and_then(|t| {
                    t.duration_since(UNIX_EPOCH).ok().map(|d| d.as_millis() as u64)
                }),
                is_directory: item.stats.is_directory,
                cleanup_scope: item.scope,
                cleanup_type: item.cleanup_type,
                candidate_type: classify(item),
                error: item.stats.error.clone(),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}
