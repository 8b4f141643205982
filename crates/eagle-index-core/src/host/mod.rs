//! Repository host abstraction
//!
//! The index only ever needs four read operations from the host holding a
//! plugin repository. Every operation yields a [`Fetched`] value: either the
//! decoded resource or a typed [`Absence`]. Missing, forbidden and malformed
//! resources are ordinary outcomes here, never errors.

pub mod github;
pub mod locale;
pub mod throttle;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::types::RepoId;

pub use github::GitHubHost;
pub use throttle::Throttle;

/// Why a resource could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Absence {
    /// HTTP 404: missing, or private to us.
    #[error("not found or no access")]
    NotFound,
    /// Any other non-success HTTP status.
    #[error("HTTP {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(String),
    /// The resource exists but could not be decoded.
    #[error("{0}")]
    Malformed(String),
    /// The listing call succeeded but returned nothing.
    #[error("empty listing")]
    Empty,
}

/// Outcome of a host read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched<T> {
    Found(T),
    Absent(Absence),
}

impl<T> Fetched<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Fetched::Found(value) => Some(value),
            Fetched::Absent(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Fetched::Found(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        match self {
            Fetched::Found(value) => Fetched::Found(f(value)),
            Fetched::Absent(absence) => Fetched::Absent(absence),
        }
    }

    /// Chain a decoding step that may itself turn the value into an absence.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Fetched<U>) -> Fetched<U> {
        match self {
            Fetched::Found(value) => f(value),
            Fetched::Absent(absence) => Fetched::Absent(absence),
        }
    }
}

/// Root manifest of a plugin repository.
///
/// Fields missing from the document decode as empty strings so the
/// verifier can report each one individually.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
}

impl Manifest {
    /// Names of required fields that are missing or empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.version.trim().is_empty() {
            missing.push("version");
        }
        if self.id.trim().is_empty() {
            missing.push("id");
        }
        missing
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAuthor {
    #[serde(default)]
    pub login: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub browser_download_url: String,
}

/// A published release, as listed newest-first by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub author: Option<ReleaseAuthor>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

impl Release {
    pub fn author_login(&self) -> &str {
        self.author.as_ref().map(|a| a.login.as_str()).unwrap_or("")
    }
}

/// A configured CI workflow definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub state: String,
}

/// Read-only capability surface over the repository host.
///
/// Implementations must not retry; callers treat every [`Absence`] as
/// "requirement not met".
pub trait RepositoryHost: Send + Sync {
    /// Latest release (first in the newest-first listing).
    fn fetch_latest_release(&self, repo: &RepoId)
    -> impl Future<Output = Fetched<Release>> + Send;

    /// Decoded text of a root-relative file.
    fn fetch_file(&self, repo: &RepoId, path: &str)
    -> impl Future<Output = Fetched<String>> + Send;

    /// Configured CI workflows.
    fn list_workflows(&self, repo: &RepoId) -> impl Future<Output = Fetched<Vec<Workflow>>> + Send;

    /// Root manifest, decoded from `path`.
    fn fetch_manifest(
        &self,
        repo: &RepoId,
        path: &str,
    ) -> impl Future<Output = Fetched<Manifest>> + Send {
        async move {
            self.fetch_file(repo, path)
                .await
                .and_then(|text| decode_manifest(&text))
        }
    }
}

/// Decode manifest text, mapping JSON errors to [`Absence::Malformed`].
pub fn decode_manifest(text: &str) -> Fetched<Manifest> {
    match serde_json::from_str::<Manifest>(text) {
        Ok(manifest) => Fetched::Found(manifest),
        Err(err) => Fetched::Absent(Absence::Malformed(err.to_string())),
    }
}
