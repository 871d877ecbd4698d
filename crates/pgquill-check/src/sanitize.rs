//! Text normalization for identifiers, literals and file paths.
//!
//! These are plain character-class filters. Nothing here depends on a regex
//! engine, so the contract is exactly what the functions document.

/// Returns `true` for characters allowed in a sanitized identifier: `[A-Za-z0-9_-]`.
pub fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Strip every character outside `[A-Za-z0-9_-]`, keeping the rest in order.
///
/// Sanitizing an already clean identifier returns it unchanged.
///
/// # Example
/// ```
/// use pgquill_check::to_alphanumeric;
///
/// assert_eq!(to_alphanumeric("users; --"), "users--");
/// assert_eq!(to_alphanumeric("user_id"), "user_id");
/// ```
pub fn to_alphanumeric(s: &str) -> String {
    s.chars().filter(|c| is_ident_char(*c)).collect()
}

/// Escape quote characters in a literal by prefixing `\`, `"` and `'` with a backslash.
///
/// The result is meant to be wrapped in a PostgreSQL escape string (`E'...'`).
///
/// # Example
/// ```
/// use pgquill_check::escape_quotes;
///
/// assert_eq!(escape_quotes(r#"it's "quoted""#), r#"it\'s \"quoted\""#);
/// ```
pub fn escape_quotes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '"' | '\'') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Keep only the characters allowed in a file-backed data source path.
///
/// Allowed: word characters, whitespace and `- : \ / @ $ # ! + ~ . ,`.
pub fn sanitize_path(s: &str) -> String {
    s.chars()
        .filter(|c| {
            c.is_ascii_alphanumeric()
                || c.is_ascii_whitespace()
                || matches!(
                    c,
                    '_' | '-' | ':' | '\\' | '/' | '@' | '$' | '#' | '!' | '+' | '~' | '.' | ','
                )
        })
        .collect()
}
