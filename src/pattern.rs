//! Canonicalization and matching of user-supplied path patterns.
//!
//! Config patterns (`alwaysDelete` / `neverDelete`) are plain relative
//! paths matched by segment prefix. Workspace patterns additionally allow
//! `*`, `?`, and `**` wildcards plus a leading `!` negation marker.
//! Both normalize to POSIX form: forward slashes only, no leading `./` or
//! `/`, no duplicate or trailing slashes, no `..` escape, no drive prefix.

use regex::Regex;

/// Canonicalize a config path pattern. `None` means the input is invalid
/// (empty after cleanup, traversal, or a Windows drive prefix).
pub fn normalize_path_pattern(value: &str) -> Option<String> {
    normalize(value, false)
}

/// Canonicalize a workspace pattern, preserving a leading `!` marker.
pub fn normalize_workspace_pattern(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if let Some(inner) = trimmed.strip_prefix('!') {
        return normalize(inner, false).map(|p| format!("!{p}"));
    }
    normalize(trimmed, false)
}

fn normalize(value: &str, allow_empty: bool) -> Option<String> {
    let mut s = value.trim().replace('\\', "/");

    while let Some(rest) = s.strip_prefix("./") {
        s = rest.to_string();
    }
    s = s.trim_start_matches('/').to_string();

    while s.contains("//") {
        s = s.replace("//", "/");
    }
    s = s.trim_end_matches('/').to_string();

    if s.is_empty() || s == "." {
        return allow_empty.then(String::new);
    }

    let s = lexical_normalize(&s);

    if s.is_empty() || s == "." {
        return allow_empty.then(String::new);
    }
    if s == ".." || s.starts_with("../") || s.contains("/../") {
        return None;
    }
    if is_drive_prefixed(&s) {
        return None;
    }

    Some(s)
}

/// Purely lexical POSIX normalization: drops `.` segments and resolves
/// `..` against preceding segments without touching the filesystem.
/// Unresolvable `..` segments survive at the front (and are rejected by
/// the caller).
fn lexical_normalize(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if matches!(stack.last(), Some(&last) if last != "..") {
                    stack.pop();
                } else {
                    stack.push("..");
                }
            }
            other => stack.push(other),
        }
    }
    stack.join("/")
}

fn is_drive_prefixed(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/'
}

/// Does `relative_path` fall under `pattern`? This is a prefix match on
/// whole path segments, not a glob: `a/b` matches pattern `a/b` and
/// pattern `a`, but not pattern `a/bc`.
pub fn matches_config_pattern(relative_path: &str, pattern: &str) -> bool {
    let Some(pat) = normalize_path_pattern(pattern) else {
        return false;
    };
    let Some(rel) = normalize(relative_path, true) else {
        return false;
    };
    rel == pat || rel.starts_with(&format!("{pat}/"))
}

/// Segment-wise glob match for workspace patterns.
///
/// `*` and `?` match within a single segment, `**` spans any number of
/// segments (including zero). A leading `!` inverts the match, so a
/// negated pattern "matches" exactly the paths its body does not.
pub fn matches_workspace_pattern(relative_path: &str, pattern: &str) -> bool {
    let trimmed = pattern.trim();
    if let Some(inner) = trimmed.strip_prefix('!') {
        return !matches_workspace_pattern(relative_path, inner);
    }
    let Some(pat) = normalize_workspace_pattern(trimmed) else {
        return false;
    };

    let posix = relative_path.replace('\\', "/");
    let path_segs: Vec<&str> = posix.split('/').filter(|s| !s.is_empty()).collect();
    let pat_segs: Vec<&str> = pat.split('/').filter(|s| !s.is_empty()).collect();

    match_segments(&path_segs, &pat_segs)
}

fn match_segments(path: &[&str], pat: &[&str]) -> bool {
    let Some((&head, rest)) = pat.split_first() else {
        return path.is_empty();
    };
    if head == "**" {
        if rest.is_empty() {
            // Trailing ** swallows the remainder, including nothing.
            return true;
        }
        // Try consuming 0..=N leading path segments.
        (0..=path.len()).any(|skip| match_segments(&path[skip..], rest))
    } else {
        let Some((&first, path_rest)) = path.split_first() else {
            return false;
        };
        segment_matches(head, first) && match_segments(path_rest, rest)
    }
}

/// Match one pattern segment against one path segment.
pub fn segment_matches(pattern_segment: &str, name: &str) -> bool {
    if !pattern_segment.contains(['*', '?']) {
        return pattern_segment == name;
    }
    match segment_regex(pattern_segment) {
        Some(re) => re.is_match(name),
        None => false,
    }
}

/// Compile a single-segment wildcard into an anchored regex. Callers that
/// loop over directory listings compile once per segment and reuse it.
pub fn segment_regex(pattern_segment: &str) -> Option<Regex> {
    Regex::new(&wildcard_to_regex(pattern_segment)).ok()
}

fn wildcard_to_regex(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len() + 8);
    out.push('^');
    for ch in segment.chars() {
        match ch {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}
