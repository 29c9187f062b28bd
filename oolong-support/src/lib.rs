use std::borrow::Cow;
use std::fmt;

/// Rewrites `raw` so it is safe to embed in a generated Go identifier.
/// Letters, digits and underscores pass through; every other byte becomes
/// an underscore. A leading digit gains an underscore prefix.
pub fn sanitize_identifier(raw: &str) -> Cow<'_, str> {
    let clean = raw
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if clean && !raw.starts_with(|ch: char| ch.is_ascii_digit()) {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len() + 1);
    if raw.starts_with(|ch: char| ch.is_ascii_digit()) {
        out.push('_');
    }
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    Cow::Owned(out)
}

/// Joins already-sanitized name parts with single underscores, skipping
/// empty parts so repeated separators never appear in generated names.
pub fn join_mangled<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for part in parts {
        if part.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('_');
        }
        out.push_str(part);
    }
    out
}

pub fn format_positioned_error(
    file: &str,
    line: usize,
    column: usize,
    category: impl fmt::Display,
    message: impl fmt::Display,
) -> String {
    format!("{file}:{line}:{column}: {category}: {message}")
}

pub fn format_unpositioned_error(
    file: &str,
    category: impl fmt::Display,
    message: impl fmt::Display,
) -> String {
    format!("{file}: {category}: {message}")
}

pub fn format_hint(hint: impl fmt::Display) -> String {
    format!("\thint: {hint}")
}
