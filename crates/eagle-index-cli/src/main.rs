//! eagle-index - Eagle Community Index maintenance
//!
//! Usage:
//!   eagle-index verify <owner/repo>
//!   eagle-index create-entry <owner/repo> <candidate|primary> [--force-update]
//!   eagle-index update-index [--days N] [--max-updates N]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eagle_index_core::config;
use eagle_index_core::context::{IndexContext, config_path};
use eagle_index_core::entry::EntryInfo;
use eagle_index_core::types::{EntryType, RepoId};

#[derive(Parser)]
#[command(name = "eagle-index")]
#[command(about = "Eagle Community Index maintenance", long_about = None)]
struct Cli {
    /// Config file (defaults to ./eagle-index.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the index directory from the config
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a repository meets the publishing requirements
    Verify {
        /// Repository in owner/repo form
        repo: String,
    },

    /// Create or update the index entry for a repository
    CreateEntry {
        /// Repository in owner/repo form
        repo: String,
        /// Entry type (candidate or primary)
        entry_type: String,
        /// Overwrite an entry that already exists
        #[arg(long)]
        force_update: bool,
    },

    /// Refresh existing entries and prune stale ones
    UpdateIndex {
        /// Only re-fetch entries modified within this many days
        #[arg(long)]
        days: Option<u32>,
        /// Maximum number of entries to process
        #[arg(long)]
        max_updates: Option<usize>,
    },
}

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eagle_index=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("Failed to determine working directory")?;
    let mut config = config::load_or_default(&config_path(cli.config, &cwd))?;
    if let Some(index_dir) = cli.index_dir {
        config.index_dir = index_dir;
    }

    let ctx = IndexContext::from_config(config)?;
    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    match cli.command {
        Commands::Verify { repo } => {
            let Some(repo) = parse_repo(&repo) else {
                return Ok(ExitCode::FAILURE);
            };
            runtime.block_on(run_verify(&ctx, &repo))
        }
        Commands::CreateEntry {
            repo,
            entry_type,
            force_update,
        } => {
            let Some(repo) = parse_repo(&repo) else {
                return Ok(ExitCode::FAILURE);
            };
            let entry_type = match entry_type.parse::<EntryType>() {
                Ok(entry_type) => entry_type,
                Err(err) => {
                    eprintln!("Error: {err}");
                    return Ok(ExitCode::FAILURE);
                }
            };
            runtime.block_on(run_create_entry(&ctx, &repo, entry_type, force_update))
        }
        Commands::UpdateIndex { days, max_updates } => {
            runtime.block_on(run_update_index(&ctx, days, max_updates))
        }
    }
}

fn parse_repo(raw: &str) -> Option<RepoId> {
    match raw.parse::<RepoId>() {
        Ok(repo) => Some(repo),
        Err(err) => {
            eprintln!("Error: {err}");
            None
        }
    }
}

type AppContext = IndexContext<eagle_index_core::host::GitHubHost, eagle_index_core::store::FsStore>;

async fn run_verify(ctx: &AppContext, repo: &RepoId) -> Result<ExitCode> {
    println!("Verifying repository: {repo}");
    println!("{}", "-".repeat(50));

    let report = ctx.verify(repo).await;
    let policy = ctx.policy();

    if report.passed {
        println!("Repository verification PASSED");
        println!("All requirements met:");
        println!("  - Latest release uploaded by {}", policy.trusted_publisher);
        println!("  - Release contains {} files", policy.package_marker);
        println!("  - GitHub Actions are configured");
        println!(
            "  - {} exists at repository root and contains valid JSON",
            policy.manifest_path
        );
        Ok(ExitCode::SUCCESS)
    } else {
        println!("Repository verification FAILED");
        println!("Issues found:");
        for issue in &report.issues {
            println!("  - {issue}");
        }
        Ok(ExitCode::FAILURE)
    }
}

async fn run_create_entry(
    ctx: &AppContext,
    repo: &RepoId,
    entry_type: EntryType,
    force_update: bool,
) -> Result<ExitCode> {
    println!("Creating {entry_type} entry for repository: {repo}");
    if force_update {
        println!("Force update enabled - will override existing entries");
    }
    println!("{}", "-".repeat(50));

    let report = ctx.create_entry(repo, entry_type, force_update).await;
    for message in &report.messages {
        println!("  {message}");
    }

    match (&report.entry, report.success) {
        (Some(entry), true) => {
            println!();
            println!("Index entry operation COMPLETED");
            print_entry(entry);
            println!();
            println!("Files updated:");
            println!("  - {}", ctx.index_dir().join("alldex.json").display());
            println!("  - {}", ctx.index_dir().join(entry_type.file_name()).display());
            Ok(ExitCode::SUCCESS)
        }
        _ => {
            println!();
            println!("Index entry operation FAILED");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_entry(entry: &EntryInfo) {
    println!("Entry details:");
    println!("  - Plugin ID: {}", entry.plugin_id);
    println!("  - Plugin Name: {}", entry.plugin_name);
    println!("  - Entry Type: {}", entry.entry_type);
    println!("  - Latest Version: {}", entry.latest_version);
    println!("  - Serialized Name: {}", entry.serialized_name);
    println!("  - Repository: {}", entry.repository);
    if entry.localized {
        println!("  - Localization: resolved name/description from locale file");
    }
    if let Some(previous) = entry.previous_type {
        println!("  - Previous Type: {previous}");
    }
    println!("  - Created At: {}", entry.created_at);
    println!("  - Last Modified: {}", entry.last_modified);
}

async fn run_update_index(
    ctx: &AppContext,
    days: Option<u32>,
    max_updates: Option<usize>,
) -> Result<ExitCode> {
    let refresh = &ctx.config().refresh;
    println!("Starting index update");
    println!("  - Days threshold: {}", days.unwrap_or(refresh.days));
    println!("  - Max updates: {}", max_updates.unwrap_or(refresh.max_updates));
    println!("{}", "-".repeat(50));

    let report = ctx.refresh(days, max_updates).await;
    for message in &report.messages {
        println!("{message}");
    }

    if report.success {
        println!();
        println!("Index update COMPLETED");
        Ok(ExitCode::SUCCESS)
    } else {
        anyhow::bail!("Index update FAILED")
    }
}
