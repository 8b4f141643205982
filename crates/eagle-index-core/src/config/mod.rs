//! Configuration for the index tools
//!
//! A single optional `eagle-index.toml` controls where the index lives,
//! which host API is used and what the publishing policy requires.

pub mod parser;
pub mod schema;

pub use parser::{load_or_default, parse_index_toml, parse_index_toml_str};
pub use schema::{GitHubConfig, IndexConfig, PolicyConfig, RefreshConfig};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "eagle-index.toml";
