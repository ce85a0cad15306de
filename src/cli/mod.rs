//! Command-line surface and pipeline orchestration.
//!
//! The flow is config → workspace discovery → scan → classification →
//! optional asset check → protection rules → (confirmation) → deletion.
//! Validation problems and refusals surface as errors so the process
//! exits 1; the scan itself only fails when the root cannot be resolved.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, ValueHint};
use indicatif::{ProgressBar, ProgressStyle};

use crate::assets;
use crate::classify::{CandidateType, allowed_candidate_types, classify, is_apply_protected};
use crate::config::{self, MonorepoMode, WorkspaceDiscoveryMode};
use crate::delete;
use crate::policy::{contains_apply_protected, filter_never_delete, select_always_delete_paths};
use crate::scan::{self, ScanItem, ScanOptions};

mod output;
mod prompt;

use output::{
    print_dry_run_summary, print_listing, print_removal_summary, print_scan_summary, render_json,
};
use prompt::{prompt_step_by_step, stdin_is_interactive};

/// Find and delete build artifacts, package manager caches, and unused
/// public assets in JavaScript monorepos.
#[derive(Debug, Parser)]
#[command(name = "next-prune", version)]
pub struct CliArgs {
    /// Run non-interactively and delete everything discovered.
    #[clap(short = 'y', long = "yes")]
    yes: bool,

    /// Report what would be removed without deleting anything.
    #[clap(long)]
    dry_run: bool,

    /// The directory to scan.
    #[clap(
        long,
        value_hint = ValueHint::DirPath,
        default_value = ".",
        value_name = "DIR"
    )]
    cwd: PathBuf,

    /// Print a human-readable listing and exit.
    #[clap(long)]
    list: bool,

    /// Print a JSON listing and exit (implies --list).
    #[clap(long)]
    json: bool,

    /// Force monorepo handling even without a workspace manifest.
    #[clap(long)]
    monorepo: bool,

    /// Candidate families to include, comma-separated
    /// (e.g. "safe", "node-modules,pm-caches", "all").
    #[clap(long = "cleanup-scope", value_name = "TOKENS")]
    cleanup_scope: Option<String>,

    /// Exclude node_modules directories.
    #[clap(long = "no-node-modules")]
    no_node_modules: bool,

    /// Exclude project-local package manager caches.
    #[clap(long = "no-pm-caches")]
    no_pm_caches: bool,

    /// Force manifest-based workspace detection with heuristic fallback.
    #[clap(long = "workspace-detect")]
    workspace_detect: bool,

    /// Maximum directory depth to descend below each scan root.
    #[clap(long = "max-depth", value_name = "N")]
    max_depth: Option<String>,

    /// Confirm deletion of node_modules / pm caches with --yes.
    #[clap(long)]
    apply: bool,

    /// Enable verbose output (debug logging).
    #[clap(short = 'v', long = "verbose")]
    verbose: bool,
}

impl CliArgs {
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub async fn run(self) -> Result<()> {
        let cwd = tokio::fs::canonicalize(&self.cwd)
            .await
            .with_context(|| format!("cannot resolve --cwd {}", self.cwd.display()))?;

        // Validated here rather than by clap so bad input exits 1.
        let max_depth = match &self.max_depth {
            Some(raw) => Some(
                raw.parse::<usize>()
                    .map_err(|_| anyhow!("invalid --max-depth value: {raw}"))?,
            ),
            None => None,
        };

        let mut config = config::load_config(&cwd).await;
        if self.monorepo {
            config.monorepo_mode = MonorepoMode::On;
        }
        if self.workspace_detect {
            config.workspace_discovery_mode = WorkspaceDiscoveryMode::ManifestFallback;
        }
        if self.no_node_modules {
            config.include_node_modules = false;
        }
        if self.no_pm_caches {
            config.include_project_local_pm_caches = false;
        }
        if max_depth.is_some() {
            config.max_scan_depth = max_depth;
        }

        let allowed = allowed_candidate_types(self.cleanup_scope.as_deref(), &config)?;

        let options = ScanOptions::from_config(&config);
        let mut items = scan::scan_artifacts(&cwd, &options).await?;
        items.retain(|item| allowed.contains(&classify(item)));

        if config.check_unused_assets && allowed.contains(&CandidateType::Asset) {
            items.extend(assets::unused_asset_items(&cwd, None, &[]).await);
        }

        let mut items = filter_never_delete(items, &cwd, &config.never_delete);
        items.sort_by(|a, b| {
            b.stats
                .size
                .cmp(&a.stats.size)
                .then_with(|| a.path.cmp(&b.path))
        });

        if self.json {
            println!("{}", render_json(&items, &cwd)?);
            return Ok(());
        }
        if self.list {
            print_listing(&items, &cwd);
            return Ok(());
        }

        if items.is_empty() {
            println!("✨ Nothing to prune. The tree is already clean.");
            return Ok(());
        }

        if self.dry_run {
            print_dry_run_summary(&items, &cwd);
            return Ok(());
        }

        let selection: Vec<&ScanItem> = if self.yes {
            if !self.apply && contains_apply_protected(&items) {
                bail!(
                    "selection includes node_modules or package manager caches; \
                     re-run with --apply to confirm, or narrow with --cleanup-scope=safe"
                );
            }
            items.iter().collect()
        } else if !stdin_is_interactive() {
            print_listing(&items, &cwd);
            println!("\nStdin is not a terminal; nothing was deleted. Re-run with --yes to proceed.");
            return Ok(());
        } else {
            print_scan_summary(&items, &cwd);

            let always = select_always_delete_paths(&items, &cwd, &config.always_delete);
            let mut auto: Vec<&ScanItem> = Vec::new();
            let mut safe: Vec<&ScanItem> = Vec::new();
            let mut protected: Vec<&ScanItem> = Vec::new();
            for item in &items {
                if always.contains(&item.path) {
                    auto.push(item);
                } else if is_apply_protected(classify(item)) {
                    protected.push(item);
                } else {
                    safe.push(item);
                }
            }

            let sel = prompt_step_by_step(&safe, &protected)?;
            let mut chosen = auto;
            if sel.remove_safe {
                chosen.extend(safe);
            }
            if sel.remove_protected {
                chosen.extend(protected);
            }
            chosen
        };

        if selection.is_empty() {
            println!("Nothing selected; no files were removed.");
            return Ok(());
        }

        let targets: Vec<(PathBuf, u64)> = selection
            .iter()
            .map(|item| (item.path.clone(), item.stats.size))
            .collect();

        let bar = ProgressBar::new(targets.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} items {msg}")
                .unwrap()
                .progress_chars("=>-"),
        );
        bar.set_message("Pruning...");
        let summary = delete::delete_items(&targets, Some(&bar)).await;
        bar.finish_and_clear();

        print_removal_summary(&summary);
        if summary.failure_count > 0 {
            bail!(
                "{} of {} deletions failed",
                summary.failure_count,
                summary.results.len()
            );
        }
        Ok(())
    }
}
