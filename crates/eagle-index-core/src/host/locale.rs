//! Localization references in manifest fields
//!
//! A manifest `name` or `description` may be written as `{{app.title}}`,
//! meaning "look up `app.title` in `_locales/en.json`". Resolution never
//! fails: anything that does not resolve to a string leaf leaves the raw
//! value untouched.

use serde_json::Value;

/// A manifest value after localization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Localized {
    pub value: String,
    /// True when the value came from the locale document.
    pub resolved: bool,
}

/// Extract the dotted key from a `{{...}}` reference, if `raw` is one.
pub fn localization_key(raw: &str) -> Option<&str> {
    if !(raw.starts_with("{{") && raw.ends_with("}}")) {
        return None;
    }
    let key = raw.trim_matches(|c| c == '{' || c == '}').trim();
    if key.is_empty() { None } else { Some(key) }
}

/// Walk `doc` along the dot-separated `key`, returning the string leaf.
pub fn lookup<'a>(doc: &'a Value, key: &str) -> Option<&'a str> {
    let mut current = doc;
    for segment in key.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    current.as_str()
}

/// Resolve `raw` against an optional locale document.
pub fn resolve(raw: &str, locales: Option<&Value>) -> Localized {
    let resolved = localization_key(raw)
        .zip(locales)
        .and_then(|(key, doc)| lookup(doc, key));

    match resolved {
        Some(value) => Localized {
            value: value.to_string(),
            resolved: true,
        },
        None => Localized {
            value: raw.to_string(),
            resolved: false,
        },
    }
}

/// Parse locale file text; malformed documents are treated as absent.
pub fn parse_locales(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(doc) => Some(doc),
        Err(err) => {
            tracing::warn!(error = %err, "ignoring malformed locale file");
            None
        }
    }
}
