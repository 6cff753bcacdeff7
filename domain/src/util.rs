//! Shared utility functions.

/// Shorten `s` to at most `max_chars` characters for log output, appending
/// `...` when anything was cut.
pub fn preview(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &s[..end]),
        None => s.to_string(),
    }
}
