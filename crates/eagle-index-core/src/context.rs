//! Application context wiring configuration to the host and the store.

use std::path::{Path, PathBuf};

use crate::config::IndexConfig;
use crate::entry::{CreateReport, EntryCreator};
use crate::host::{GitHubHost, RepositoryHost};
use crate::refresh::{IndexRefresher, RefreshReport};
use crate::store::{DocumentStore, FsStore, IndexStore};
use crate::types::{EntryType, RepoId};
use crate::verify::{PublishPolicy, RepoVerifier, VerifyReport};

/// Shared services for the three index operations.
///
/// Frontends build this once and call the operations on it.
#[derive(Debug, Clone)]
pub struct IndexContext<H, S> {
    host: H,
    store: IndexStore<S>,
    policy: PublishPolicy,
    config: IndexConfig,
}

impl IndexContext<GitHubHost, FsStore> {
    /// Context talking to GitHub and writing into `config.index_dir`.
    pub fn from_config(config: IndexConfig) -> anyhow::Result<Self> {
        let host = GitHubHost::new(&config.github)?;
        let store = FsStore::new(config.index_dir.clone());
        Ok(Self::new(host, store, config))
    }

    pub fn index_dir(&self) -> &Path {
        self.store.inner().root()
    }
}

impl<H: RepositoryHost, S: DocumentStore> IndexContext<H, S> {
    pub fn new(host: H, store: S, config: IndexConfig) -> Self {
        Self {
            host,
            store: IndexStore::new(store),
            policy: PublishPolicy::from(&config.policy),
            config,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn store(&self) -> &IndexStore<S> {
        &self.store
    }

    pub fn policy(&self) -> &PublishPolicy {
        &self.policy
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub async fn verify(&self, repo: &RepoId) -> VerifyReport {
        RepoVerifier::new(&self.host, &self.policy).verify(repo).await
    }

    pub async fn create_entry(
        &self,
        repo: &RepoId,
        entry_type: EntryType,
        force_update: bool,
    ) -> CreateReport {
        EntryCreator::new(&self.host, &self.store, &self.policy)
            .create_or_update(repo, entry_type, force_update)
            .await
    }

    /// Refresh the index; `None` falls back to the configured defaults.
    pub async fn refresh(&self, days: Option<u32>, max_updates: Option<usize>) -> RefreshReport {
        let days = days.unwrap_or(self.config.refresh.days);
        let max_updates = max_updates.unwrap_or(self.config.refresh.max_updates);
        IndexRefresher::new(
            &self.host,
            &self.store,
            &self.policy,
            self.config.github.request_delay(),
        )
        .refresh(days, max_updates)
        .await
    }
}

/// Resolve the config path: explicit, or `eagle-index.toml` in `cwd`.
pub fn config_path(explicit: Option<PathBuf>, cwd: &Path) -> PathBuf {
    explicit.unwrap_or_else(|| cwd.join(crate::config::CONFIG_FILE_NAME))
}
