//! Index documents: the membership ledger and the per-type entry files.
//!
//! `alldex.json` maps every plugin id to its entry type and is the only
//! source of truth for membership. `candidate.json` and `primary.json` hold
//! the entry details, keyed by the same ids.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

use crate::types::EntryType;

/// Membership ledger: plugin id -> entry type.
///
/// Tags other than `candidate`/`primary` are kept verbatim so they survive a
/// rewrite, but they never match a type file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllIndex {
    entries: BTreeMap<String, EntryType>,
    other: BTreeMap<String, Value>,
}

impl AllIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry type of `id`, if it carries a known tag.
    pub fn get(&self, id: &str) -> Option<&EntryType> {
        self.entries.get(id)
    }

    /// Raw tag of `id`, known or not.
    pub fn tag(&self, id: &str) -> Option<&str> {
        match self.entries.get(id) {
            Some(entry_type) => Some(entry_type.as_str()),
            None => self
                .other
                .get(id)
                .map(|value| value.as_str().unwrap_or("unknown")),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id) || self.other.contains_key(id)
    }

    pub fn insert(&mut self, id: String, entry_type: EntryType) -> Option<EntryType> {
        self.other.remove(&id);
        self.entries.insert(id, entry_type)
    }

    /// Number of ids in the ledger, including unknown tags.
    pub fn len(&self) -> usize {
        self.entries.len() + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids with a known tag.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &EntryType)> {
        self.entries.iter()
    }

    /// Ids whose tag is not a known entry type.
    pub fn unknown_ids(&self) -> impl Iterator<Item = &String> {
        self.other.keys()
    }
}

impl FromIterator<(String, EntryType)> for AllIndex {
    fn from_iter<I: IntoIterator<Item = (String, EntryType)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            other: BTreeMap::new(),
        }
    }
}

impl<const N: usize> From<[(String, EntryType); N]> for AllIndex {
    fn from(entries: [(String, EntryType); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl Serialize for AllIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut merged: BTreeMap<&str, Value> = self
            .other
            .iter()
            .map(|(id, value)| (id.as_str(), value.clone()))
            .collect();
        for (id, entry_type) in &self.entries {
            merged.insert(id.as_str(), Value::String(entry_type.as_str().to_string()));
        }
        merged.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AllIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let mut alldex = AllIndex::new();
        for (id, value) in raw {
            match value.as_str().and_then(|tag| tag.parse::<EntryType>().ok()) {
                Some(entry_type) => {
                    alldex.entries.insert(id, entry_type);
                }
                None => {
                    warn!(%id, tag = %value, "unknown entry type in alldex.json");
                    alldex.other.insert(id, value);
                }
            }
        }
        Ok(alldex)
    }
}

/// Entry details for one entry type: plugin id -> entry.
pub type TypeIndex = BTreeMap<String, IndexEntry>;

/// A plugin record inside a type index file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub serialized_name: String,

    /// Most recent first, no duplicates
    #[serde(default)]
    pub versions: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,

    /// Source repository as `owner/repo`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    /// Fields written by other tools, kept as-is
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl IndexEntry {
    pub fn latest_version(&self) -> Option<&str> {
        self.versions.first().map(String::as_str)
    }

    /// Parsed `lastModified`; `None` when missing, `Some(Err)` when unparseable.
    pub fn last_modified_at(&self) -> Option<Result<DateTime<Utc>, chrono::ParseError>> {
        self.last_modified.as_deref().map(parse_timestamp)
    }

    /// Set `lastModified` to `now`, never moving it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        let previous = self
            .last_modified_at()
            .and_then(Result::ok)
            .filter(|previous| *previous > now);
        let stamp = previous.unwrap_or(now);
        self.last_modified = Some(format_timestamp(stamp));
    }
}

/// RFC 3339 UTC with microseconds and a `Z` suffix.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|at| at.with_timezone(&Utc))
}
