use super::extends::ExtendsSource;
use crate::error::{LintError, Result};
use crate::models::RuleSet;
use tokio_util::sync::CancellationToken;

/// Deserialise ruleset bytes (YAML, or JSON as a YAML subset)
pub fn parse_ruleset(bytes: &[u8]) -> Result<RuleSet> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(LintError::EmptyRuleset);
    }
    serde_yaml::from_slice(bytes).map_err(|e| LintError::RulesetParse(e.to_string()))
}

/// Read and parse the ruleset behind a local or remote extends source.
///
/// Only fetches and parses; the ruleset's own `extends` are left for the
/// composer to walk.
pub async fn load_ruleset(
    source: &ExtendsSource,
    client: Option<&reqwest::Client>,
    cancellation: &CancellationToken,
) -> Result<RuleSet> {
    let bytes = match source {
        ExtendsSource::Local(path) => read_local(path).await?,
        ExtendsSource::Remote(location) => {
            let client = client.cloned().unwrap_or_default();
            fetch_remote(location, &client, cancellation).await?
        }
        ExtendsSource::Preset(..) => {
            return Err(LintError::RulesetParse(format!(
                "'{}' is a built-in preset, not a ruleset file",
                source.key()
            )));
        }
    };
    parse_ruleset(&bytes)
}

async fn read_local(path: &str) -> Result<Vec<u8>> {
    tracing::debug!("Reading ruleset {}", path);
    tokio::fs::read(path).await.map_err(|e| LintError::LocalRead {
        location: path.to_string(),
        cause: e.to_string(),
    })
}

async fn fetch_remote(
    location: &str,
    client: &reqwest::Client,
    cancellation: &CancellationToken,
) -> Result<Vec<u8>> {
    tracing::debug!("Fetching ruleset {}", location);
    let fetch_error = |cause: String| LintError::RemoteFetch {
        location: location.to_string(),
        cause,
    };

    let request = async {
        let response = client.get(location).send().await?.error_for_status()?;
        response.bytes().await
    };
    let bytes = tokio::select! {
        _ = cancellation.cancelled() => return Err(fetch_error("cancelled".to_string())),
        fetched = request => fetched.map_err(|e| fetch_error(e.to_string()))?,
    };

    if bytes.is_empty() {
        return Err(LintError::EmptyRuleset);
    }
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_yaml_and_json() {
        let yaml = parse_ruleset(b"rules:\n  info-contact: off\n").unwrap();
        assert_eq!(yaml.rule_definitions.len(), 1);

        let json = parse_ruleset(br#"{"extends": "spectral:oas", "rules": {}}"#).unwrap();
        assert!(json.extends.is_some());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_ruleset(b"  \n"), Err(LintError::EmptyRuleset)));
        assert!(matches!(parse_ruleset(b"rules: [1, 2"), Err(LintError::RulesetParse(_))));
        assert!(matches!(parse_ruleset(b"- just\n- a list\n"), Err(LintError::RulesetParse(_))));
    }

    #[tokio::test]
    async fn test_load_local() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rules:\n  operation-tags: error").unwrap();
        let source = ExtendsSource::Local(file.path().to_string_lossy().into_owned());

        let ruleset = load_ruleset(&source, None, &CancellationToken::new()).await.unwrap();
        assert!(ruleset.rule_definitions.contains_key("operation-tags"));
    }

    #[tokio::test]
    async fn test_load_missing_local() {
        let source = ExtendsSource::Local("/definitely/not/here.yaml".to_string());
        let result = load_ruleset(&source, None, &CancellationToken::new()).await;
        assert!(matches!(result, Err(LintError::LocalRead { .. })));
    }

    #[tokio::test]
    async fn test_cancelled_fetch() {
        let token = CancellationToken::new();
        token.cancel();
        let source = ExtendsSource::Remote("http://127.0.0.1:9/ruleset.yaml".to_string());
        let result = load_ruleset(&source, None, &token).await;
        assert!(matches!(result, Err(LintError::RemoteFetch { .. })));
    }
}
