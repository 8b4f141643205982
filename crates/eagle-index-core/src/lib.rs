//! Eagle Index Core Library
//!
//! Maintains the community plugin index: verifies plugin repositories,
//! creates and updates their index entries, and periodically refreshes
//! the index against the repository host.

pub mod config;
pub mod context;
pub mod entry;
pub mod host;
pub mod index;
pub mod normalize;
pub mod refresh;
pub mod store;
pub mod types;
pub mod verify;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{IndexConfig, load_or_default};
    pub use crate::context::IndexContext;

    // Host
    pub use crate::host::{Absence, Fetched, GitHubHost, Manifest, Release, RepositoryHost};

    // Index
    pub use crate::index::{AllIndex, IndexEntry, TypeIndex};
    pub use crate::store::{DocumentStore, FsStore, IndexStore, MemoryStore, StoreError};
    pub use crate::types::{EntryType, RepoId};

    // Operations
    pub use crate::entry::{CreateReport, EntryCreator, EntryInfo};
    pub use crate::refresh::{IndexRefresher, RefreshReport, RefreshStats};
    pub use crate::verify::{PublishPolicy, RepoVerifier, VerifyReport};
}
