//! Centralized ANSI styling for terminal output.
//!
//! All user-facing color goes through [`paint`], which is a no-op when the
//! destination is not a terminal, so piped output stays clean.

use anstyle::{AnsiColor, Reset, Style};

use crate::classify::CandidateType;

pub fn paint(enabled: bool, text: impl AsRef<str>, style: Style) -> String {
    if !enabled {
        return text.as_ref().to_string();
    }
    format!("{style}{}{}", text.as_ref(), Reset)
}

pub fn header_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::Cyan.into())).bold()
}

pub fn size_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::Green.into())).bold()
}

pub fn prompt_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::Yellow.into())).bold()
}

pub fn danger_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::Red.into())).bold()
}

pub fn dim_style() -> Style {
    Style::new().fg_color(Some(AnsiColor::BrightBlack.into()))
}

/// Stable per-family color so listings read consistently across runs.
pub fn candidate_style(candidate: CandidateType) -> Style {
    let color = match candidate {
        CandidateType::Artifact => AnsiColor::Cyan,
        CandidateType::Asset => AnsiColor::Magenta,
        CandidateType::NodeModules => AnsiColor::Yellow,
        CandidateType::PmCache => AnsiColor::Blue,
    };
    Style::new().fg_color(Some(color.into()))
}
