use crate::legacy::AdvancedProperties;
use crate::rules::TuningRule;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum TuningError {
    #[error("unable to read the rules document")]
    Io(#[from] std::io::Error),
    #[error("the rules document is not valid JSON5")]
    Syntax(#[from] json5::Error),
    #[error("the rules document is neither a rule list ({list}) nor legacy advanced properties ({legacy})")]
    Format {
        list: serde_json::Error,
        legacy: serde_json::Error,
    },
}

/// Parses a rules document. Comments and trailing commas are allowed. The rule list format is
/// tried first, then the legacy advanced properties.
pub fn parse_rules(content: &str) -> Result<Vec<TuningRule>, TuningError> {
    if content.trim().is_empty() {
        return Ok(vec![]);
    }
    let document: serde_json::Value = json5::from_str(content)?;
    let list_error = match serde_json::from_value::<Vec<TuningRule>>(document.clone()) {
        Ok(rules) => return Ok(rules),
        Err(error) => error,
    };
    match serde_json::from_value::<AdvancedProperties>(document) {
        Ok(properties) => Ok(properties.into_rules()),
        Err(legacy_error) => Err(TuningError::Format {
            list: list_error,
            legacy: legacy_error,
        }),
    }
}

async fn read_document(path: &Path) -> Result<String, TuningError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        // A missing document means that there is nothing to tune
        Err(error) if error.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(error) => Err(error.into()),
    }
}

pub async fn load_rules(path: &Path) -> Result<Vec<TuningRule>, TuningError> {
    parse_rules(&read_document(path).await?)
}

/// Watches a rules document by polling.
pub struct RulesWatcher {
    path: PathBuf,
    last_content: Option<String>,
}

impl RulesWatcher {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            last_content: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the parsed rules when the document changed since the last poll. A document which
    /// fails to parse is reported once and not retried until it changes again.
    pub async fn poll(&mut self) -> Result<Option<Vec<TuningRule>>, TuningError> {
        let content = read_document(&self.path).await?;
        if self.last_content.as_ref() == Some(&content) {
            return Ok(None);
        }
        let rules = parse_rules(&content);
        self.last_content = Some(content);
        rules.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_comments_and_trailing_commas() {
        let rules = parse_rules(
            r#"[
                // Fix the name received from the contest system
                {"type": "overrideContestSettings", "name": "Finals",},
                /* queue */ {"type": "overrideQueue", "maxQueueSize": 15},
            ]"#,
        )
        .unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].kind(), "overrideQueue");
    }

    #[test]
    fn should_fall_back_to_legacy_format() {
        let rules = parse_rules(r#"{contestName: "Legacy", queueSettings: {maxQueueSize: 3},}"#)
            .unwrap();
        let kinds: Vec<&str> = rules.iter().map(TuningRule::kind).collect();
        assert_eq!(kinds, vec!["overrideContestSettings", "overrideQueue"]);
    }

    #[test]
    fn should_treat_empty_document_as_no_rules() {
        assert!(parse_rules("  \n").unwrap().is_empty());
    }

    #[test]
    fn should_report_both_formats_on_failure() {
        let error = parse_rules(r#"{"unknown": true}"#).unwrap_err();
        assert!(matches!(error, TuningError::Format { .. }));
        assert!(matches!(parse_rules("[{"), Err(TuningError::Syntax(_))));
    }

    #[tokio::test]
    async fn should_only_return_changed_rules() {
        let path =
            std::env::temp_dir().join(format!("scorecast-rules-{}.json", std::process::id()));
        tokio::fs::write(&path, r#"[{"type": "addMedals", "gold": 1}]"#)
            .await
            .unwrap();
        let mut watcher = RulesWatcher::new(path.clone());

        assert_eq!(watcher.poll().await.unwrap().map(|rules| rules.len()), Some(1));
        assert!(watcher.poll().await.unwrap().is_none());

        tokio::fs::write(&path, "[oops").await.unwrap();
        assert!(watcher.poll().await.is_err());
        assert!(watcher.poll().await.unwrap().is_none());

        tokio::fs::remove_file(&path).await.unwrap();
        assert_eq!(watcher.poll().await.unwrap(), Some(vec![]));
    }
}
