//! Name and version normalization shared by the creator and refresher.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9.-]").unwrap());
static DOT_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.+").unwrap());

/// Derive the serialized name (stable slug) from a display name.
///
/// Lowercases, turns whitespace runs into `.`, drops everything outside
/// `[a-z0-9.-]`, collapses `.` runs and trims leading/trailing dots.
/// Applying it twice yields the same string.
pub fn serialize_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let dotted = WHITESPACE.replace_all(&lowered, ".");
    let filtered = DISALLOWED.replace_all(&dotted, "");
    let collapsed = DOT_RUNS.replace_all(&filtered, ".");
    collapsed.trim_matches('.').to_string()
}

/// Put `version` at the front of `versions`, removing any earlier copy.
///
/// The relative order of the other versions is preserved.
pub fn merge_version(versions: &[String], version: &str) -> Vec<String> {
    let mut merged = Vec::with_capacity(versions.len() + 1);
    merged.push(version.to_string());
    merged.extend(versions.iter().filter(|v| v.as_str() != version).cloned());
    merged
}
