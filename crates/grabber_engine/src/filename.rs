use std::path::{Path, PathBuf};

use crate::TargetCodec;

/// Title used when the resolver gives none, or sanitizing leaves nothing.
pub const PLACEHOLDER_TITLE: &str = "Unknown";

const MAX_STEM_CHARS: usize = 120;

/// Where a download of `title` transcoded to `codec` ends up inside `dir`.
pub fn output_path(dir: &Path, title: &str, codec: TargetCodec) -> PathBuf {
    dir.join(format!("{}.{}", sanitize_title(title), codec.extension()))
}

/// Windows-safe file stem derived from a video title.
pub fn sanitize_title(input: &str) -> String {
    let replaced: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();

    let mut compacted = String::with_capacity(replaced.len());
    let mut prev_underscore = false;
    for c in replaced.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }

    let trimmed = trim_edges(&compacted);
    let mut stem: String = trimmed.chars().take(MAX_STEM_CHARS).collect();
    // Truncation can expose a trailing dot or space again.
    stem = trim_edges(&stem).to_string();
    if stem.is_empty() {
        return PLACEHOLDER_TITLE.to_string();
    }
    if is_reserved_windows_name(&stem) {
        stem.push('_');
    }
    stem
}

fn trim_edges(s: &str) -> &str {
    s.trim_matches(|c: char| c == '_' || c == '.' || c.is_whitespace())
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}' | '\u{7F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}
