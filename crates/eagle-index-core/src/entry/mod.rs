//! Creating and updating index entries
//!
//! An entry is only ever written for a repository that passes verification.
//! The manifest supplies the identity, the latest release supplies the
//! version, and the write keeps `alldex.json` and the type files consistent:
//! an id lives in exactly the type file the ledger names.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::host::locale::{self, Localized};
use crate::host::{Manifest, RepositoryHost};
use crate::index::{IndexEntry, format_timestamp};
use crate::normalize::{merge_version, serialize_name};
use crate::store::{DocumentStore, IndexStore, StoreError};
use crate::types::{EntryType, RepoId};
use crate::verify::{PublishPolicy, RepoVerifier};

/// Snapshot of the entry after a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryInfo {
    pub plugin_id: String,
    pub plugin_name: String,
    pub plugin_description: String,
    pub serialized_name: String,
    pub latest_version: String,
    pub entry_type: EntryType,
    pub repository: String,
    /// Name or description came from the locale file
    pub localized: bool,
    pub created_at: String,
    pub last_modified: String,
    /// Type the entry had before this write, if it already existed
    pub previous_type: Option<EntryType>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateReport {
    pub success: bool,
    pub messages: Vec<String>,
    pub entry: Option<EntryInfo>,
}

impl CreateReport {
    fn note(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    fn fail(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        warn!("{message}");
        self.messages.push(message);
        self.success = false;
        self
    }
}

/// Everything derived from the repository before touching the store.
struct Draft {
    plugin_id: String,
    name: Localized,
    description: Localized,
    serialized_name: String,
    version: String,
    repository: String,
}

enum WriteOutcome {
    /// Carries the ledger's current tag.
    AlreadyExists(String),
    Written {
        entry: IndexEntry,
        previous_type: Option<EntryType>,
    },
}

pub struct EntryCreator<'a, H, S> {
    host: &'a H,
    store: &'a IndexStore<S>,
    policy: &'a PublishPolicy,
}

impl<'a, H: RepositoryHost, S: DocumentStore> EntryCreator<'a, H, S> {
    pub fn new(host: &'a H, store: &'a IndexStore<S>, policy: &'a PublishPolicy) -> Self {
        Self {
            host,
            store,
            policy,
        }
    }

    /// Verify `repo` and write its entry as `entry_type`.
    ///
    /// An id that is already indexed is only rewritten with `force_update`;
    /// verification applies either way.
    pub async fn create_or_update(
        &self,
        repo: &RepoId,
        entry_type: EntryType,
        force_update: bool,
    ) -> CreateReport {
        let mut report = CreateReport::default();

        let verification = RepoVerifier::new(self.host, self.policy).verify(repo).await;
        if !verification.passed {
            report.messages.push("Repository verification failed:".to_string());
            report
                .messages
                .extend(verification.issues.iter().map(|issue| format!("  - {issue}")));
            return report;
        }
        report.note("Repository verification passed");

        let draft = match self.draft(repo).await {
            Ok(draft) => draft,
            Err(message) => return report.fail(message),
        };

        match self.write(&draft, entry_type, force_update) {
            Ok(WriteOutcome::AlreadyExists(existing)) => report.fail(format!(
                "Entry already exists as '{existing}'. Use --force-update to override."
            )),
            Ok(WriteOutcome::Written {
                entry,
                previous_type,
            }) => {
                let action = if previous_type.is_some() { "Updated" } else { "Created" };
                let message = format!("{action} {entry_type} entry for {}", draft.plugin_id);
                info!("{message}");
                report.note(message);
                if let Some(previous) = previous_type.filter(|previous| *previous != entry_type) {
                    report.note(format!("Moved {} from {previous} to {entry_type}", draft.plugin_id));
                }

                report.entry = Some(EntryInfo {
                    plugin_id: draft.plugin_id,
                    plugin_name: draft.name.value,
                    plugin_description: draft.description.value,
                    serialized_name: draft.serialized_name,
                    latest_version: draft.version,
                    entry_type,
                    repository: draft.repository,
                    localized: draft.name.resolved || draft.description.resolved,
                    created_at: entry.created_at.unwrap_or_default(),
                    last_modified: entry.last_modified.unwrap_or_default(),
                    previous_type,
                });
                report.success = true;
                report
            }
            Err(err) => report.fail(format!("Failed to update index files: {err}")),
        }
    }

    async fn draft(&self, repo: &RepoId) -> Result<Draft, String> {
        let manifest = self
            .host
            .fetch_manifest(repo, &self.policy.manifest_path)
            .await
            .found()
            .ok_or_else(|| format!("Failed to fetch {}", self.policy.manifest_path))?;

        let locales = self.fetch_locales(repo, &manifest).await;
        let name = locale::resolve(&manifest.name, locales.as_ref());
        let description = locale::resolve(&manifest.description, locales.as_ref());

        let plugin_id = manifest.id.trim().to_string();
        if plugin_id.is_empty() || name.value.trim().is_empty() {
            return Err(format!(
                "{} missing required fields (id or name)",
                self.policy.manifest_path
            ));
        }

        let release = self
            .host
            .fetch_latest_release(repo)
            .await
            .found()
            .ok_or_else(|| "Failed to fetch release information".to_string())?;

        let version = if release.tag_name.trim().is_empty() {
            manifest.version.clone()
        } else {
            release.tag_name.clone()
        };

        Ok(Draft {
            serialized_name: serialize_name(&name.value),
            plugin_id,
            name,
            description,
            version,
            repository: repo.to_string(),
        })
    }

    /// Fetch the locale document only when a manifest field references it.
    async fn fetch_locales(&self, repo: &RepoId, manifest: &Manifest) -> Option<Value> {
        let referenced = locale::localization_key(&manifest.name).is_some()
            || locale::localization_key(&manifest.description).is_some();
        if !referenced {
            return None;
        }

        let text = self
            .host
            .fetch_file(repo, &self.policy.locale_path)
            .await
            .found();
        if text.is_none() {
            warn!(%repo, path = %self.policy.locale_path, "locale file unavailable, keeping raw values");
        }
        text.and_then(|text| locale::parse_locales(&text))
    }

    /// Apply the draft to the store inside one locked section.
    ///
    /// Write order: target type file, then the ledger, then the removal
    /// from any other type file.
    fn write(
        &self,
        draft: &Draft,
        entry_type: EntryType,
        force_update: bool,
    ) -> Result<WriteOutcome, StoreError> {
        let _lock = self.store.lock()?;

        let mut alldex = self.store.load_alldex()?.unwrap_or_default();
        let previous_type = alldex.get(&draft.plugin_id).copied();
        if let Some(existing) = alldex.tag(&draft.plugin_id).filter(|_| !force_update) {
            return Ok(WriteOutcome::AlreadyExists(existing.to_string()));
        }

        let mut target = self.store.load_type_index(entry_type)?.unwrap_or_default();

        // Any other type file still holding the id loses it; its record
        // seeds the new one so history and createdAt carry over.
        let mut others = Vec::new();
        for other in EntryType::ALL.into_iter().filter(|t| *t != entry_type) {
            let Some(mut index) = self.store.load_type_index(other)? else {
                continue;
            };
            if let Some(entry) = index.remove(&draft.plugin_id) {
                others.push((other, index, entry));
            }
        }

        let base = target
            .remove(&draft.plugin_id)
            .or_else(|| others.first().map(|(_, _, entry)| entry.clone()));
        let entry = build_entry(base, draft, Utc::now());
        target.insert(draft.plugin_id.clone(), entry.clone());

        self.store.save_type_index(entry_type, &target)?;

        alldex.insert(draft.plugin_id.clone(), entry_type);
        self.store.save_alldex(&alldex)?;

        for (other, index, _) in &others {
            self.store.save_type_index(*other, index)?;
            info!(plugin = %draft.plugin_id, from = %other, "removed entry from previous type file");
        }

        Ok(WriteOutcome::Written {
            entry,
            previous_type,
        })
    }
}

/// Fold the draft into an existing record, or start a new one.
fn build_entry(base: Option<IndexEntry>, draft: &Draft, now: DateTime<Utc>) -> IndexEntry {
    match base {
        Some(mut entry) => {
            entry.name = draft.name.value.clone();
            entry.description = draft.description.value.clone();
            entry.serialized_name = draft.serialized_name.clone();
            entry.versions = merge_version(&entry.versions, &draft.version);
            entry.repository = Some(draft.repository.clone());
            if entry.created_at.is_none() {
                entry.created_at = Some(format_timestamp(now));
            }
            entry.touch(now);
            entry
        }
        None => IndexEntry {
            name: draft.name.value.clone(),
            description: draft.description.value.clone(),
            serialized_name: draft.serialized_name.clone(),
            versions: vec![draft.version.clone()],
            created_at: Some(format_timestamp(now)),
            last_modified: Some(format_timestamp(now)),
            repository: Some(draft.repository.clone()),
            extra: Default::default(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draft(version: &str) -> Draft {
        Draft {
            plugin_id: "p1".to_string(),
            name: Localized {
                value: "My Tool".to_string(),
                resolved: false,
            },
            description: Localized {
                value: "Does things".to_string(),
                resolved: false,
            },
            serialized_name: "my.tool".to_string(),
            version: version.to_string(),
            repository: "owner/tool".to_string(),
        }
    }

    #[test]
    fn new_entry_stamps_both_timestamps() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let entry = build_entry(None, &draft("1.0"), now);

        assert_eq!(entry.versions, vec!["1.0".to_string()]);
        assert_eq!(entry.created_at.as_deref(), Some("2024-05-01T12:00:00.000000Z"));
        assert_eq!(entry.created_at, entry.last_modified);
        assert_eq!(entry.repository.as_deref(), Some("owner/tool"));
    }

    #[test]
    fn existing_entry_keeps_created_at_and_extras() {
        let then = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let mut base = build_entry(None, &draft("1.0"), then);
        base.extra.insert("homepage".to_string(), Value::String("https://x".into()));

        let entry = build_entry(Some(base), &draft("1.1"), now);
        assert_eq!(entry.created_at.as_deref(), Some("2023-01-01T00:00:00.000000Z"));
        assert_eq!(entry.last_modified.as_deref(), Some("2024-05-01T12:00:00.000000Z"));
        assert_eq!(entry.versions, vec!["1.1".to_string(), "1.0".to_string()]);
        assert!(entry.extra.contains_key("homepage"));
    }

    #[test]
    fn existing_entry_without_created_at_gets_one() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let base = IndexEntry {
            versions: vec!["0.9".into()],
            ..Default::default()
        };
        let entry = build_entry(Some(base), &draft("0.9"), now);
        assert_eq!(entry.created_at.as_deref(), Some("2024-05-01T12:00:00.000000Z"));
        assert_eq!(entry.versions, vec!["0.9".to_string()]);
    }
}
