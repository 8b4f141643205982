//! Periodic maintenance of the type index files
//!
//! Walks `candidate.json` then `primary.json`. Entries the ledger no longer
//! attributes to the file are pruned; entries touched recently get their
//! latest release re-checked and recorded. One budget caps the number of
//! entries examined across both files, and host calls are spaced by a
//! [`Throttle`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::host::{Fetched, RepositoryHost, Throttle};
use crate::index::{AllIndex, IndexEntry, TypeIndex};
use crate::normalize::merge_version;
use crate::store::{DocumentStore, IndexStore};
use crate::types::{EntryType, RepoId};
use crate::verify::{PublishPolicy, check_release};

/// Upper bound on entries examined in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    limit: usize,
    used: usize,
}

impl Budget {
    pub fn new(limit: usize) -> Self {
        Self { limit, used: 0 }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn exhausted(&self) -> bool {
        self.used >= self.limit
    }

    pub fn spend(&mut self) {
        self.used += 1;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub processed: usize,
    pub updated: usize,
    pub pruned: usize,
    pub save_failures: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub success: bool,
    pub messages: Vec<String>,
    pub stats: RefreshStats,
}

impl RefreshReport {
    fn note(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }
}

/// What happened to one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
enum EntryOutcome {
    /// Not in the ledger at all.
    Orphaned,
    /// The ledger places it elsewhere; carries the ledger's tag.
    Moved(String),
    Skipped(String),
    Updated(String),
    Current(String),
}

pub struct IndexRefresher<'a, H, S> {
    host: &'a H,
    store: &'a IndexStore<S>,
    policy: &'a PublishPolicy,
    throttle: Throttle,
}

impl<'a, H: RepositoryHost, S: DocumentStore> IndexRefresher<'a, H, S> {
    pub fn new(
        host: &'a H,
        store: &'a IndexStore<S>,
        policy: &'a PublishPolicy,
        request_delay: Duration,
    ) -> Self {
        Self {
            host,
            store,
            policy,
            throttle: Throttle::new(request_delay),
        }
    }

    /// Refresh both type files.
    ///
    /// Only entries modified within `days_threshold` days are re-fetched;
    /// at most `max_updates` entries are examined in total.
    pub async fn refresh(&mut self, days_threshold: u32, max_updates: usize) -> RefreshReport {
        let mut report = RefreshReport::default();

        let alldex = match self.load_alldex() {
            Some(alldex) => alldex,
            None => {
                warn!("failed to load alldex.json");
                report.note("Failed to load alldex.json");
                return report;
            }
        };
        report.note(format!("Loaded alldex.json with {} entries", alldex.len()));

        let now = Utc::now();
        // Out-of-range thresholds mean nothing is stale.
        let cutoff = now
            .checked_sub_signed(chrono::Duration::days(i64::from(days_threshold)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut budget = Budget::new(max_updates);

        for entry_type in EntryType::ALL {
            if budget.exhausted() {
                report.note(format!(
                    "Reached maximum update limit ({max_updates}), stopping"
                ));
                break;
            }
            self.refresh_file(entry_type, &alldex, cutoff, now, &mut budget, &mut report)
                .await;
        }

        report.stats.processed = budget.used();
        report.note("Update summary:");
        report.note(format!("  - Total entries processed: {}", report.stats.processed));
        report.note(format!("  - Entries updated: {}", report.stats.updated));
        report.note(format!("  - Entries pruned: {}", report.stats.pruned));
        if report.stats.save_failures > 0 {
            report.note(format!("  - Files failed to save: {}", report.stats.save_failures));
        }
        info!(
            processed = report.stats.processed,
            updated = report.stats.updated,
            pruned = report.stats.pruned,
            save_failures = report.stats.save_failures,
            "index refresh finished"
        );

        report.success = true;
        report
    }

    fn load_alldex(&self) -> Option<AllIndex> {
        let loaded = self.store.lock().and_then(|_lock| self.store.load_alldex());
        match loaded {
            Ok(alldex) => alldex,
            Err(err) => {
                warn!(error = %err, "could not read alldex.json");
                None
            }
        }
    }

    async fn refresh_file(
        &mut self,
        entry_type: EntryType,
        alldex: &AllIndex,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
        budget: &mut Budget,
        report: &mut RefreshReport,
    ) {
        let file = entry_type.file_name();

        let _lock = match self.store.lock() {
            Ok(lock) => lock,
            Err(err) => {
                report.note(format!("Failed to lock index for {file}: {err}"));
                return;
            }
        };

        let mut index: TypeIndex = match self.store.load_type_index(entry_type) {
            Ok(Some(index)) => index,
            Ok(None) => {
                report.note(format!("Index file {file} not found, skipping"));
                return;
            }
            Err(err) => {
                warn!(%file, error = %err, "failed to load type index");
                report.note(format!("Failed to load {file}: {err}"));
                return;
            }
        };
        report.note(format!("Processing {file} ({} entries)", index.len()));

        let mut marked = Vec::new();
        let mut examined = 0usize;
        let ids: Vec<String> = index.keys().cloned().collect();

        for id in ids {
            if budget.exhausted() {
                report.note(format!(
                    "  Reached quota limit for {entry_type}, stopping at {examined} entries"
                ));
                break;
            }
            let Some(entry) = index.get_mut(&id) else {
                continue;
            };

            let outcome = self
                .refresh_entry(&id, entry, entry_type, alldex, cutoff, now, budget)
                .await;
            match outcome {
                EntryOutcome::Orphaned => {
                    report.note(format!("  Marking {id} for removal (not in alldex)"));
                    marked.push(id);
                    continue;
                }
                EntryOutcome::Moved(actual) => {
                    report.note(format!("  Marking {id} for removal (type changed to {actual})"));
                    marked.push(id);
                    continue;
                }
                EntryOutcome::Skipped(reason) => {
                    report.note(format!("  Skipping {id} ({reason})"));
                }
                EntryOutcome::Updated(version) => {
                    report.stats.updated += 1;
                    report.note(format!("  Updated {id} to version {version}"));
                }
                EntryOutcome::Current(version) => {
                    report.note(format!("  {id} already up to date ({version})"));
                }
            }
            examined += 1;
        }

        for id in &marked {
            index.remove(id);
        }

        match self.store.save_type_index(entry_type, &index) {
            Ok(()) => {
                report.stats.pruned += marked.len();
                report.note(format!("  Saved {file}"));
            }
            Err(err) => {
                warn!(%file, error = %err, "failed to save type index");
                report.stats.save_failures += 1;
                report.note(format!("  Failed to save {file}: {err}"));
            }
        }
    }

    /// Decide and apply the refresh for a single entry.
    ///
    /// Pruning decisions are free; every other path spends one unit of
    /// `budget`, whether or not the host is contacted.
    #[allow(clippy::too_many_arguments)]
    async fn refresh_entry(
        &mut self,
        id: &str,
        entry: &mut IndexEntry,
        entry_type: EntryType,
        alldex: &AllIndex,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
        budget: &mut Budget,
    ) -> EntryOutcome {
        match alldex.tag(id) {
            None => return EntryOutcome::Orphaned,
            Some(tag) if alldex.get(id) != Some(&entry_type) => {
                return EntryOutcome::Moved(tag.to_string());
            }
            Some(_) => {}
        }

        budget.spend();

        let last_modified = match entry.last_modified_at() {
            None => return EntryOutcome::Skipped("no lastModified timestamp".to_string()),
            Some(Err(_)) => {
                return EntryOutcome::Skipped("invalid lastModified timestamp".to_string());
            }
            Some(Ok(at)) => at,
        };
        if last_modified < cutoff {
            return EntryOutcome::Skipped(format!(
                "last modified {}, older than cutoff {}",
                last_modified.format("%Y-%m-%d"),
                cutoff.format("%Y-%m-%d")
            ));
        }

        let Some(raw_repo) = entry.repository.as_deref() else {
            return EntryOutcome::Skipped("no repository field".to_string());
        };
        let repo: RepoId = match raw_repo.parse() {
            Ok(repo) => repo,
            Err(_) => {
                return EntryOutcome::Skipped(format!("invalid repository field '{raw_repo}'"));
            }
        };

        self.throttle.wait().await;
        let release = match self.host.fetch_latest_release(&repo).await {
            Fetched::Found(release) => release,
            Fetched::Absent(absence) => {
                debug!(%id, %repo, %absence, "latest release unavailable");
                return EntryOutcome::Skipped(format!(
                    "could not fetch latest release from {repo}: {absence}"
                ));
            }
        };

        let issues = check_release(&release, self.policy);
        if !issues.is_empty() {
            return EntryOutcome::Skipped(format!(
                "latest release of {repo} not eligible: {}",
                issues.join("; ")
            ));
        }
        let version = release.tag_name.trim();
        if version.is_empty() {
            return EntryOutcome::Skipped(format!("latest release of {repo} has no tag"));
        }

        if entry.latest_version() == Some(version) {
            return EntryOutcome::Current(version.to_string());
        }

        entry.versions = merge_version(&entry.versions, version);
        entry.touch(now);
        info!(%id, %version, "recorded new latest version");
        EntryOutcome::Updated(version.to_string())
    }
}
