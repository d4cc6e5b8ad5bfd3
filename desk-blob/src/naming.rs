//! Stored names are `{epochMillis}-{originalName}`.
//!
//! Parsing splits on the first `-`. A prefix that is not an integer yields
//! no timestamp, and the whole name is treated as the original name.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredName(String);

impl StoredName {
    /// Build the on-disk name for an upload made at `now_ms`.
    pub fn generate(original_name: &str, now_ms: i64) -> Self {
        Self(format!("{now_ms}-{original_name}"))
    }

    /// Generate using the current wall clock.
    pub fn now(original_name: &str) -> Self {
        Self::generate(original_name, chrono::Utc::now().timestamp_millis())
    }

    pub fn from_string(name: String) -> Self {
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// `(timestampMillis, originalName)`
    pub fn parse(&self) -> (Option<i64>, &str) {
        parse_stored_name(&self.0)
    }

    pub fn timestamp_ms(&self) -> Option<i64> {
        self.parse().0
    }

    pub fn original_name(&self) -> &str {
        self.parse().1
    }
}

impl fmt::Display for StoredName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StoredName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub fn parse_stored_name(name: &str) -> (Option<i64>, &str) {
    match name.split_once('-') {
        Some((prefix, rest))
            if !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) =>
        {
            match prefix.parse::<i64>() {
                Ok(ms) => (Some(ms), rest),
                Err(_) => (None, name),
            }
        }
        _ => (None, name),
    }
}

/// Reduce a client supplied file name to its last path component.
///
/// Returns `None` for names that are empty or only dots.
pub fn sanitize_original_name(raw: &str) -> Option<String> {
    let last = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .replace('\0', "");

    if last.is_empty() || last.chars().all(|c| c == '.') {
        return None;
    }
    Some(last)
}

/// True when `name` addresses a single entry inside the uploads directory.
pub fn is_safe_stored_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_then_parse() {
        let name = StoredName::generate("holiday photo.png", 1_700_000_000_123);
        assert_eq!(name.as_str(), "1700000000123-holiday photo.png");
        assert_eq!(name.parse(), (Some(1_700_000_000_123), "holiday photo.png"));
    }

    #[test]
    fn only_the_first_dash_splits() {
        let name = StoredName::from_string("1000-my-cat-2.png".into());
        assert_eq!(name.timestamp_ms(), Some(1000));
        assert_eq!(name.original_name(), "my-cat-2.png");
    }

    #[test]
    fn non_numeric_prefix_has_no_timestamp() {
        assert_eq!(parse_stored_name("cat-1000.png"), (None, "cat-1000.png"));
        assert_eq!(parse_stored_name("plain.png"), (None, "plain.png"));
        assert_eq!(parse_stored_name("-x.png"), (None, "-x.png"));
        assert_eq!(parse_stored_name("+12-x.png"), (None, "+12-x.png"));
    }

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_original_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_original_name("C:\\Users\\me\\a.png").as_deref(), Some("a.png"));
        assert_eq!(sanitize_original_name("  a.mp4 ").as_deref(), Some("a.mp4"));
        assert_eq!(sanitize_original_name(".."), None);
        assert_eq!(sanitize_original_name("dir/"), None);
        assert_eq!(sanitize_original_name(""), None);
    }

    #[test]
    fn safe_names() {
        assert!(is_safe_stored_name("1-a.png"));
        assert!(!is_safe_stored_name("../1-a.png"));
        assert!(!is_safe_stored_name(".."));
        assert!(!is_safe_stored_name(""));
    }
}
