//! Repository compliance checks
//!
//! A repository may enter the index only if:
//! 1. its latest release was published by the trusted publisher and ships a
//!    plugin package asset,
//! 2. it has at least one CI workflow configured,
//! 3. its root manifest decodes and carries `name`, `version` and `id`.
//!
//! All three checks always run so the report lists every problem at once.

use tracing::{info, warn};

use crate::config::PolicyConfig;
use crate::host::{Absence, Fetched, Release, RepositoryHost};
use crate::types::RepoId;

/// Publishing requirements and the repository layout they are checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPolicy {
    pub trusted_publisher: String,
    pub package_marker: String,
    pub manifest_path: String,
    pub locale_path: String,
}

impl From<&PolicyConfig> for PublishPolicy {
    fn from(config: &PolicyConfig) -> Self {
        Self {
            trusted_publisher: config.trusted_publisher.clone(),
            package_marker: config.package_marker.clone(),
            manifest_path: config.manifest_path.clone(),
            locale_path: config.locale_path.clone(),
        }
    }
}

impl Default for PublishPolicy {
    fn default() -> Self {
        Self::from(&PolicyConfig::default())
    }
}

/// Outcome of [`RepoVerifier::verify`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub passed: bool,
    pub issues: Vec<String>,
}

impl VerifyReport {
    fn from_issues(issues: Vec<String>) -> Self {
        Self {
            passed: issues.is_empty(),
            issues,
        }
    }
}

/// Issues with a release under `policy`; empty means eligible.
pub fn check_release(release: &Release, policy: &PublishPolicy) -> Vec<String> {
    let mut issues = Vec::new();

    let login = release.author_login();
    if login != policy.trusted_publisher {
        issues.push(format!(
            "Latest release not uploaded by {} (found: {})",
            policy.trusted_publisher, login
        ));
    }

    let has_package = release
        .assets
        .iter()
        .any(|asset| asset.browser_download_url.contains(&policy.package_marker));
    if !has_package {
        issues.push(format!(
            "Release does not contain {} files",
            policy.package_marker
        ));
    }

    issues
}

/// Issues for a fetched latest release, including its absence.
pub fn check_latest_release(fetched: &Fetched<Release>, policy: &PublishPolicy) -> Vec<String> {
    match fetched {
        Fetched::Found(release) => check_release(release, policy),
        Fetched::Absent(Absence::NotFound) => vec!["Repository not found or no access".to_string()],
        Fetched::Absent(Absence::Empty) => vec!["No releases found".to_string()],
        Fetched::Absent(absence) => vec![format!("Failed to fetch releases: {absence}")],
    }
}

pub struct RepoVerifier<'a, H> {
    host: &'a H,
    policy: &'a PublishPolicy,
}

impl<'a, H: RepositoryHost> RepoVerifier<'a, H> {
    pub fn new(host: &'a H, policy: &'a PublishPolicy) -> Self {
        Self { host, policy }
    }

    /// Run every compliance check against `repo`.
    pub async fn verify(&self, repo: &RepoId) -> VerifyReport {
        let mut issues = Vec::new();

        let release = self.host.fetch_latest_release(repo).await;
        issues.extend(check_latest_release(&release, self.policy));
        issues.extend(self.check_workflows(repo).await);
        issues.extend(self.check_manifest(repo).await);

        let report = VerifyReport::from_issues(issues);
        if report.passed {
            info!(%repo, "repository verification passed");
        } else {
            warn!(%repo, issues = report.issues.len(), "repository verification failed");
        }
        report
    }

    async fn check_workflows(&self, repo: &RepoId) -> Vec<String> {
        match self.host.list_workflows(repo).await {
            Fetched::Found(workflows) if workflows.is_empty() => {
                vec!["No GitHub Actions workflows found".to_string()]
            }
            Fetched::Found(_) => Vec::new(),
            Fetched::Absent(Absence::NotFound) => {
                vec!["Cannot access repository workflows".to_string()]
            }
            Fetched::Absent(absence) => vec![format!("Failed to fetch workflows: {absence}")],
        }
    }

    async fn check_manifest(&self, repo: &RepoId) -> Vec<String> {
        let path = &self.policy.manifest_path;
        match self.host.fetch_manifest(repo, path).await {
            Fetched::Found(manifest) => manifest
                .missing_fields()
                .into_iter()
                .map(|field| format!("{path} missing '{field}' field"))
                .collect(),
            Fetched::Absent(Absence::NotFound) => {
                vec![format!("{path} file not found at repository root")]
            }
            Fetched::Absent(Absence::Malformed(reason)) => {
                vec![format!("{path} contains invalid JSON: {reason}")]
            }
            Fetched::Absent(absence) => vec![format!("Failed to check {path}: {absence}")],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{ReleaseAsset, ReleaseAuthor};

    fn release(login: &str, urls: &[&str]) -> Release {
        Release {
            tag_name: "v1.0.0".to_string(),
            author: Some(ReleaseAuthor {
                login: login.to_string(),
            }),
            assets: urls
                .iter()
                .map(|url| ReleaseAsset {
                    name: String::new(),
                    browser_download_url: url.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn compliant_release_has_no_issues() {
        let policy = PublishPolicy::default();
        let release = release(
            "github-actions[bot]",
            &["https://example.com/a.zip", "https://example.com/tool.eagleplugin"],
        );
        assert!(check_release(&release, &policy).is_empty());
    }

    #[test]
    fn wrong_author_and_missing_package_are_both_reported() {
        let policy = PublishPolicy::default();
        let issues = check_release(&release("someone", &["https://example.com/a.zip"]), &policy);
        assert_eq!(
            issues,
            vec![
                "Latest release not uploaded by github-actions[bot] (found: someone)".to_string(),
                "Release does not contain .eagleplugin files".to_string(),
            ]
        );
    }

    #[test]
    fn missing_author_reports_empty_login() {
        let policy = PublishPolicy::default();
        let mut release = release("x", &["tool.eagleplugin"]);
        release.author = None;
        assert_eq!(
            check_release(&release, &policy),
            vec!["Latest release not uploaded by github-actions[bot] (found: )".to_string()]
        );
    }

    #[test]
    fn absent_release_messages() {
        let policy = PublishPolicy::default();
        assert_eq!(
            check_latest_release(&Fetched::Absent(Absence::NotFound), &policy),
            vec!["Repository not found or no access".to_string()]
        );
        assert_eq!(
            check_latest_release(&Fetched::Absent(Absence::Empty), &policy),
            vec!["No releases found".to_string()]
        );
        assert_eq!(
            check_latest_release(&Fetched::Absent(Absence::Status(500)), &policy),
            vec!["Failed to fetch releases: HTTP 500".to_string()]
        );
    }
}
