#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use eagle_index_core::host::{
    Absence, Fetched, Release, ReleaseAsset, ReleaseAuthor, RepositoryHost, Workflow,
};
use eagle_index_core::types::RepoId;

pub const BOT: &str = "github-actions[bot]";

/// Scripted repository host; anything not configured is `NotFound`.
#[derive(Default)]
pub struct FakeHost {
    releases: HashMap<String, Fetched<Release>>,
    files: HashMap<(String, String), String>,
    workflows: HashMap<String, Vec<Workflow>>,
    release_calls: Mutex<Vec<String>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_release(mut self, repo: &str, release: Release) -> Self {
        self.releases.insert(repo.to_string(), Fetched::Found(release));
        self
    }

    pub fn with_release_absent(mut self, repo: &str, absence: Absence) -> Self {
        self.releases.insert(repo.to_string(), Fetched::Absent(absence));
        self
    }

    pub fn with_file(mut self, repo: &str, path: &str, text: &str) -> Self {
        self.files
            .insert((repo.to_string(), path.to_string()), text.to_string());
        self
    }

    pub fn with_workflows(mut self, repo: &str, count: usize) -> Self {
        let workflows = (0..count)
            .map(|i| Workflow {
                id: i as u64 + 1,
                name: format!("build-{i}"),
                path: format!(".github/workflows/build-{i}.yml"),
                state: "active".to_string(),
            })
            .collect();
        self.workflows.insert(repo.to_string(), workflows);
        self
    }

    /// A repository that passes every check.
    pub fn with_compliant_repo(self, repo: &str, manifest: &str, tag: &str) -> Self {
        self.with_release(repo, bot_release(tag))
            .with_workflows(repo, 1)
            .with_file(repo, "manifest.json", manifest)
    }

    /// Repositories whose latest release was requested, in call order.
    pub fn release_calls(&self) -> Vec<String> {
        self.release_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl RepositoryHost for FakeHost {
    async fn fetch_latest_release(&self, repo: &RepoId) -> Fetched<Release> {
        let key = repo.to_string();
        if let Ok(mut calls) = self.release_calls.lock() {
            calls.push(key.clone());
        }
        self.releases
            .get(&key)
            .cloned()
            .unwrap_or(Fetched::Absent(Absence::NotFound))
    }

    async fn fetch_file(&self, repo: &RepoId, path: &str) -> Fetched<String> {
        match self.files.get(&(repo.to_string(), path.to_string())) {
            Some(text) => Fetched::Found(text.clone()),
            None => Fetched::Absent(Absence::NotFound),
        }
    }

    async fn list_workflows(&self, repo: &RepoId) -> Fetched<Vec<Workflow>> {
        match self.workflows.get(&repo.to_string()) {
            Some(workflows) => Fetched::Found(workflows.clone()),
            None => Fetched::Absent(Absence::NotFound),
        }
    }
}

pub fn release(login: &str, tag: &str, urls: &[&str]) -> Release {
    Release {
        tag_name: tag.to_string(),
        author: Some(ReleaseAuthor {
            login: login.to_string(),
        }),
        assets: urls
            .iter()
            .map(|url| ReleaseAsset {
                name: url.rsplit('/').next().unwrap_or_default().to_string(),
                browser_download_url: url.to_string(),
            })
            .collect(),
    }
}

/// Release by the trusted publisher carrying a plugin package.
pub fn bot_release(tag: &str) -> Release {
    release(
        BOT,
        tag,
        &[&format!(
            "https://github.com/o/r/releases/download/{tag}/plugin.eagleplugin"
        )],
    )
}

pub fn repo(raw: &str) -> RepoId {
    raw.parse().unwrap()
}
