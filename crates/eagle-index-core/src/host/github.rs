//! GitHub REST API implementation of [`RepositoryHost`]

use anyhow::Context;
use base64::Engine;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{Absence, Fetched, Release, RepositoryHost, Workflow};
use crate::config::GitHubConfig;
use crate::types::RepoId;

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// Talks to `api.github.com` (or a compatible API at another base URL).
#[derive(Debug, Clone)]
pub struct GitHubHost {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

/// Body of `GET /repos/{owner}/{repo}/contents/{path}` for a file.
#[derive(Debug, Deserialize)]
struct ContentsResponse {
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Debug, Deserialize)]
struct WorkflowsResponse {
    #[serde(default)]
    workflows: Vec<Workflow>,
}

impl GitHubHost {
    /// Build a host client from configuration.
    pub fn new(config: &GitHubConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self::with_client(client, &config.api_url, config.token()))
    }

    pub fn with_client(client: reqwest::Client, api_url: &str, token: Option<String>) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// `{api}/repos/{owner}/{repo}/{suffix}`
    fn endpoint(&self, repo: &RepoId, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_url,
            repo.owner(),
            repo.name(),
            suffix.trim_start_matches('/')
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Fetched<T> {
        debug!(%url, "GET");

        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                debug!(%url, error = %err, "request failed");
                return Fetched::Absent(Absence::Transport(err.to_string()));
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(%url, "not found");
            return Fetched::Absent(Absence::NotFound);
        }
        if !status.is_success() {
            debug!(%url, %status, "non-success status");
            return Fetched::Absent(Absence::Status(status.as_u16()));
        }

        match response.json::<T>().await {
            Ok(body) => Fetched::Found(body),
            Err(err) => Fetched::Absent(Absence::Malformed(err.to_string())),
        }
    }
}

impl RepositoryHost for GitHubHost {
    async fn fetch_latest_release(&self, repo: &RepoId) -> Fetched<Release> {
        let url = self.endpoint(repo, "releases?per_page=1");
        self.get_json::<Vec<Release>>(&url)
            .await
            .and_then(|releases| match releases.into_iter().next() {
                Some(release) => Fetched::Found(release),
                None => Fetched::Absent(Absence::Empty),
            })
    }

    async fn fetch_file(&self, repo: &RepoId, path: &str) -> Fetched<String> {
        let url = self.endpoint(repo, &format!("contents/{}", path.trim_start_matches('/')));
        self.get_json::<ContentsResponse>(&url)
            .await
            .and_then(|body| decode_contents(&body))
    }

    async fn list_workflows(&self, repo: &RepoId) -> Fetched<Vec<Workflow>> {
        let url = self.endpoint(repo, "actions/workflows");
        self.get_json::<WorkflowsResponse>(&url)
            .await
            .map(|body| body.workflows)
    }
}

/// Decode the base64 payload of a contents response into UTF-8 text.
///
/// GitHub wraps the payload at 60 columns, so whitespace is dropped first.
fn decode_contents(body: &ContentsResponse) -> Fetched<String> {
    if !body.encoding.is_empty() && body.encoding != "base64" {
        return Fetched::Absent(Absence::Malformed(format!(
            "unsupported content encoding '{}'",
            body.encoding
        )));
    }

    let compact: String = body
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = match base64::engine::general_purpose::STANDARD.decode(compact) {
        Ok(bytes) => bytes,
        Err(err) => return Fetched::Absent(Absence::Malformed(format!("invalid base64: {err}"))),
    };

    match String::from_utf8(bytes) {
        Ok(text) => Fetched::Found(text),
        Err(err) => Fetched::Absent(Absence::Malformed(format!("invalid UTF-8: {err}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(api_url: &str) -> GitHubHost {
        GitHubHost::with_client(reqwest::Client::new(), api_url, None)
    }

    #[test]
    fn test_endpoint_construction() {
        let repo: RepoId = "eagle-cooler/eagle-webdav".parse().unwrap();
        let host = host("https://api.github.com/");

        assert_eq!(
            host.endpoint(&repo, "actions/workflows"),
            "https://api.github.com/repos/eagle-cooler/eagle-webdav/actions/workflows"
        );
        assert_eq!(
            host.endpoint(&repo, "/contents/manifest.json"),
            "https://api.github.com/repos/eagle-cooler/eagle-webdav/contents/manifest.json"
        );
    }

    #[test]
    fn test_decode_wrapped_base64() {
        // "{\"id\": \"x\"}" split across lines the way GitHub returns it
        let body = ContentsResponse {
            content: "eyJpZCI6\nICJ4In0=\n".to_string(),
            encoding: "base64".to_string(),
        };
        assert_eq!(decode_contents(&body), Fetched::Found("{\"id\": \"x\"}".to_string()));
    }

    #[test]
    fn test_decode_invalid_base64_is_malformed() {
        let body = ContentsResponse {
            content: "!!!not-base64!!!".to_string(),
            encoding: "base64".to_string(),
        };
        assert!(matches!(decode_contents(&body), Fetched::Absent(Absence::Malformed(_))));
    }

    #[test]
    fn test_decode_unknown_encoding_is_malformed() {
        let body = ContentsResponse {
            content: String::new(),
            encoding: "none".to_string(),
        };
        assert!(matches!(decode_contents(&body), Fetched::Absent(Absence::Malformed(_))));
    }

    #[test]
    fn test_workflows_response_parses() {
        let body: WorkflowsResponse = serde_json::from_str(
            r#"{"total_count":1,"workflows":[{"id":7,"name":"Release","path":".github/workflows/release.yml","state":"active"}]}"#,
        )
        .unwrap();
        assert_eq!(body.workflows.len(), 1);
        assert_eq!(body.workflows[0].name, "Release");
    }
}
