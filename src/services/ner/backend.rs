//! Pluggable NER backends and the command-based built-in.

use std::collections::BTreeMap;
use std::io::Write;
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};

use super::NerError;

/// One predicted entity, in character offsets of the text handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Prediction {
    pub start: usize,
    pub end: usize,
    #[serde(alias = "tag", alias = "entity_group")]
    pub label: String,
}

impl Prediction {
    pub fn new(start: usize, end: usize, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }

    pub fn overlaps(&self, other: &Prediction) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Trait for pluggable NER backends.
///
/// Implementations are called from a blocking worker thread and may take
/// as long as they need.
pub trait NerBackend: Send + Sync {
    /// Human-readable backend identifier.
    fn backend_id(&self) -> &str;

    fn is_available(&self) -> bool;

    /// What to do when the backend is unavailable.
    fn availability_hint(&self) -> String;

    /// Predict entities in `text`.
    fn predict(&self, text: &str) -> Result<Vec<Prediction>, NerError>;
}

/// `ner` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NerConfig {
    /// Executable receiving text on stdin and printing predictions on stdout.
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    /// Window size in characters.
    #[serde(default = "default_window_chars")]
    pub window_chars: usize,
    /// Characters shared by consecutive windows.
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
    /// Backend label → entity tag.
    #[serde(default)]
    pub label_map: BTreeMap<String, String>,
}

fn default_window_chars() -> usize {
    2000
}

fn default_overlap_chars() -> usize {
    200
}

impl Default for NerConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            window_chars: default_window_chars(),
            overlap_chars: default_overlap_chars(),
            label_map: BTreeMap::new(),
        }
    }
}

/// Backend that runs an external command per text window.
///
/// The text is written to the command's stdin. Stdout must hold either a
/// JSON array of `{start, end, label}` objects or one such object per line.
pub struct CommandNerBackend {
    command: String,
    args: Vec<String>,
}

impl CommandNerBackend {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// Backend from configuration, if a command is configured.
    pub fn from_config(config: &NerConfig) -> Option<Self> {
        config
            .command
            .as_ref()
            .filter(|c| !c.trim().is_empty())
            .map(|c| Self::new(c.clone(), config.args.clone()))
    }
}

impl NerBackend for CommandNerBackend {
    fn backend_id(&self) -> &str {
        &self.command
    }

    fn is_available(&self) -> bool {
        which::which(&self.command).is_ok()
    }

    fn availability_hint(&self) -> String {
        format!("Install or add to PATH: {}", self.command)
    }

    fn predict(&self, text: &str) -> Result<Vec<Prediction>, NerError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| NerError::CommandFailed(format!("Failed to run {}: {}", self.command, e)))?;

        // Stdin is fed from its own thread while stdout is drained here.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = text.as_bytes().to_vec();
            std::thread::spawn(move || stdin.write_all(&input))
        });

        let output = child
            .wait_with_output()
            .map_err(|e| NerError::CommandFailed(format!("{} failed: {}", self.command, e)))?;

        if let Some(handle) = writer {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => {
                    return Err(NerError::CommandFailed(format!(
                        "Failed to write to {}: {}",
                        self.command, e
                    )))
                }
                Err(_) => {
                    return Err(NerError::CommandFailed(format!(
                        "Writer thread for {} panicked",
                        self.command
                    )))
                }
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(NerError::CommandFailed(format!(
                "{} failed (exit code {:?}): {}",
                self.command,
                output.status.code(),
                stderr.lines().take(5).collect::<Vec<_>>().join("\n")
            )));
        }

        parse_predictions(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse a JSON array or JSON lines of predictions.
pub fn parse_predictions(output: &str) -> Result<Vec<Prediction>, NerError> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(NerError::InvalidOutput);
    }
    trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).map_err(NerError::InvalidOutput))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_array_and_lines() {
        let array = r#"[{"start": 0, "end": 4, "label": "PER"}]"#;
        assert_eq!(
            parse_predictions(array).unwrap(),
            vec![Prediction::new(0, 4, "PER")]
        );

        let lines = "{\"start\": 1, \"end\": 3, \"entity_group\": \"ORG\"}\n\n{\"start\": 5, \"end\": 9, \"tag\": \"LOC\"}\n";
        assert_eq!(
            parse_predictions(lines).unwrap(),
            vec![Prediction::new(1, 3, "ORG"), Prediction::new(5, 9, "LOC")]
        );

        assert!(parse_predictions("  \n").unwrap().is_empty());
        assert!(matches!(
            parse_predictions("not json"),
            Err(NerError::InvalidOutput(_))
        ));
    }

    #[test]
    fn test_from_config_requires_command() {
        assert!(CommandNerBackend::from_config(&NerConfig::default()).is_none());
        let config = NerConfig {
            command: Some("ner-tool".into()),
            ..Default::default()
        };
        let backend = CommandNerBackend::from_config(&config).unwrap();
        assert_eq!(backend.backend_id(), "ner-tool");
    }

    #[test]
    fn test_missing_command_is_unavailable() {
        let backend = CommandNerBackend::new("annie-definitely-missing-ner-tool", Vec::new());
        assert!(!backend.is_available());
        assert!(backend.availability_hint().contains("annie-definitely-missing-ner-tool"));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_backend_reads_stdout() {
        let backend = CommandNerBackend::new(
            "sh",
            vec![
                "-c".into(),
                "cat > /dev/null; echo '[{\"start\":0,\"end\":5,\"label\":\"PER\"}]'".into(),
            ],
        );
        let predictions = backend.predict("Alice went home").unwrap();
        assert_eq!(predictions, vec![Prediction::new(0, 5, "PER")]);
    }
}
