//! TOML parser with helpful error messages

use super::schema::IndexConfig;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse eagle-index.toml with detailed error messages
pub fn parse_index_toml(path: &Path) -> Result<IndexConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_index_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse eagle-index.toml content from string
pub fn parse_index_toml_str(content: &str) -> Result<IndexConfig> {
    let config: IndexConfig =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;

    config.validate()?;

    Ok(config)
}

/// Load the config at `path` if it exists, defaults otherwise.
pub fn load_or_default(path: &Path) -> Result<IndexConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(IndexConfig::default());
    }
    parse_index_toml(path)
}

fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let message = error.message().to_string();

    match error.span() {
        Some(span) => {
            let line_num = content[..span.start.min(content.len())].lines().count().max(1);
            let context = get_line_context(content, line_num);
            anyhow::anyhow!(
                "TOML parsing error at line {}:\n{}\n\nError: {}",
                line_num,
                context,
                message
            )
        }
        None => anyhow::anyhow!("TOML parsing error: {}", message),
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 2).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = parse_index_toml_str("").unwrap();
        assert_eq!(config.index_dir, std::path::PathBuf::from("index"));
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.github.request_delay_ms, 1000);
        assert_eq!(config.policy.trusted_publisher, "github-actions[bot]");
        assert_eq!(config.policy.package_marker, ".eagleplugin");
        assert_eq!(config.refresh.days, 3);
        assert_eq!(config.refresh.max_updates, 200);
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
index_dir = "data/index"

[github]
api_url = "http://localhost:8080"
request_delay_ms = 0

[refresh]
max_updates = 5
"#;
        let config = parse_index_toml_str(toml).unwrap();
        assert_eq!(config.index_dir, std::path::PathBuf::from("data/index"));
        assert_eq!(config.github.api_url, "http://localhost:8080");
        assert_eq!(config.github.request_delay_ms, 0);
        assert_eq!(config.github.token_env, "GITHUB_TOKEN");
        assert_eq!(config.refresh.max_updates, 5);
        assert_eq!(config.refresh.days, 3);
    }

    #[test]
    fn test_parse_invalid_toml_reports_line() {
        let toml = "index_dir = \"index\"\n[github\napi_url = \"x\"\n";
        let err = parse_index_toml_str(toml).unwrap_err().to_string();
        assert!(err.contains("TOML parsing error"));
    }

    #[test]
    fn test_invalid_api_url_rejected() {
        let toml = "[github]\napi_url = \"not a url\"\n";
        let err = parse_index_toml_str(toml).unwrap_err();
        assert!(format!("{err:#}").contains("github.api_url"));
    }

    #[test]
    fn test_empty_marker_rejected() {
        let toml = "[policy]\npackage_marker = \"\"\n";
        assert!(parse_index_toml_str(toml).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[policy]\ntrusted_publisher = \"release-bot\"").unwrap();

        let config = parse_index_toml(file.path()).unwrap();
        assert_eq!(config.policy.trusted_publisher, "release-bot");
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = load_or_default(&dir.path().join("eagle-index.toml")).unwrap();
        assert_eq!(config.refresh.max_updates, 200);
    }
}
