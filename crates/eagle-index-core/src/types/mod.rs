//! Shared core types used across the host, store and index layers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Classification of a plugin inside the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Unreviewed submission.
    Candidate,
    /// Reviewed and promoted plugin.
    Primary,
}

impl EntryType {
    /// All entry types, in the order the refresher walks them.
    pub const ALL: [EntryType; 2] = [EntryType::Candidate, EntryType::Primary];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Candidate => "candidate",
            EntryType::Primary => "primary",
        }
    }

    /// File name of the type index document, e.g. `candidate.json`.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Entry type must be 'candidate' or 'primary' (got '{0}')")]
pub struct EntryTypeError(pub String);

impl FromStr for EntryType {
    type Err = EntryTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "candidate" => Ok(EntryType::Candidate),
            "primary" => Ok(EntryType::Primary),
            other => Err(EntryTypeError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Repository name must be in format 'owner/repo' (got '{0}')")]
pub struct RepoIdError(pub String);

/// GitHub repository identifier in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoId {
    owner: String,
    name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, RepoIdError> {
        let owner = owner.into();
        let name = name.into();
        if owner.is_empty() || name.is_empty() || owner.contains('/') || name.contains('/') {
            return Err(RepoIdError(format!("{owner}/{name}")));
        }
        Ok(Self { owner, name })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for RepoId {
    type Err = RepoIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (owner, name) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| RepoIdError(s.to_string()))?;
        Self::new(owner, name).map_err(|_| RepoIdError(s.to_string()))
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_owner_and_name() {
        let repo: RepoId = "eagle-cooler/eagle-webdav".parse().unwrap();
        assert_eq!(repo.owner(), "eagle-cooler");
        assert_eq!(repo.name(), "eagle-webdav");
        assert_eq!(repo.to_string(), "eagle-cooler/eagle-webdav");
    }

    #[test]
    fn rejects_malformed_repo_ids() {
        for bad in ["", "owner", "owner/", "/repo", "a/b/c"] {
            assert!(bad.parse::<RepoId>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn entry_type_round_trips_through_str() {
        for ty in EntryType::ALL {
            assert_eq!(ty.as_str().parse::<EntryType>().unwrap(), ty);
        }
        assert!("secondary".parse::<EntryType>().is_err());
        assert_eq!(EntryType::Primary.file_name(), "primary.json");
    }

    #[test]
    fn entry_type_serializes_lowercase() {
        let json = serde_json::to_string(&EntryType::Candidate).unwrap();
        assert_eq!(json, "\"candidate\"");
    }
}
