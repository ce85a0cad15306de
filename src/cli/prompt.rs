//! Interactive confirmation prompts.
//!
//! Safe candidates and apply-protected candidates (node_modules, package
//! manager caches) are confirmed separately, then a final combined
//! confirmation gates the whole batch.

use std::io::{self, IsTerminal, Write};

use anyhow::Result;

use crate::format::human_size;
use crate::scan::ScanItem;
use crate::theme::{danger_style, dim_style, paint, prompt_style, size_style};

/// Which candidate groups the user approved.
#[derive(Default)]
pub(super) struct PruneSelection {
    pub(super) remove_safe: bool,
    pub(super) remove_protected: bool,
}

impl PruneSelection {
    pub(super) fn any(&self) -> bool {
        self.remove_safe || self.remove_protected
    }
}

pub(super) fn ask_yes_no(prompt: &str) -> Result<bool> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let answer = input.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

pub(super) fn stdin_is_interactive() -> bool {
    io::stdin().is_terminal()
}

fn total_size(items: &[&ScanItem]) -> u64 {
    items.iter().map(|i| i.stats.size).sum()
}

pub(super) fn prompt_step_by_step(
    safe: &[&ScanItem],
    protected: &[&ScanItem],
) -> Result<PruneSelection> {
    let color = io::stdout().is_terminal();
    let mut sel = PruneSelection::default();

    // ── Step 1: regenerable artifacts and unused assets ──────────────────────
    if !safe.is_empty() {
        let prompt = format!(
            "{} Remove {} build artifacts ({})? [y/N]: ",
            paint(color, "❯", prompt_style()),
            paint(color, safe.len().to_string(), size_style()),
            paint(color, human_size(Some(total_size(safe))), size_style()),
        );
        sel.remove_safe = ask_yes_no(&prompt)?;
    }

    // ── Step 2: node_modules and package manager caches ──────────────────────
    if !protected.is_empty() {
        println!();
        println!(
            "{}",
            paint(
                color,
                "⚠  These need to be reinstalled after removal:",
                danger_style()
            )
        );
        let show_n = 5.min(protected.len());
        for item in protected.iter().take(show_n) {
            println!(
                "  {}  {} {}",
                paint(color, "🗑", danger_style()),
                paint(color, item.path.display().to_string(), dim_style()),
                paint(
                    color,
                    format!("({})", human_size(Some(item.stats.size))),
                    size_style()
                ),
            );
        }
        if protected.len() > show_n {
            println!(
                "  {}",
                paint(
                    color,
                    format!("… and {} more", protected.len() - show_n),
                    dim_style()
                )
            );
        }

        let prompt = format!(
            "{} Remove {} dependency/cache directories ({})? [y/N]: ",
            paint(color, "❯", prompt_style()),
            paint(color, protected.len().to_string(), size_style()),
            paint(color, human_size(Some(total_size(protected))), size_style()),
        );
        sel.remove_protected = ask_yes_no(&prompt)?;
    }

    // ── Final combined confirmation ──────────────────────────────────────────
    if sel.any() {
        let mut parts: Vec<String> = Vec::new();
        let mut total = 0u64;
        if sel.remove_safe {
            parts.push(format!("{} artifacts", safe.len()));
            total += total_size(safe);
        }
        if sel.remove_protected {
            parts.push(format!("{} dependency dirs", protected.len()));
            total += total_size(protected);
        }
        let prompt = format!(
            "\n{} Remove {} ({})? [y/N]: ",
            paint(color, "❯", prompt_style()),
            paint(color, parts.join(" + "), size_style()),
            paint(color, human_size(Some(total)), size_style()),
        );
        if !ask_yes_no(&prompt)? {
            sel.remove_safe = false;
            sel.remove_protected = false;
        }
    }

    Ok(sel)
}
