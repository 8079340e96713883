//! Analysis collaborator
//!
//! The analyzer receives a [`MetricsRecord`] and answers with a structured
//! verdict. Its output is free-form text that is expected to contain a JSON
//! object; every field is validated on its own and falls back to a fixed
//! default when absent or of the wrong shape.

use super::{run_command, CollaboratorError, CommandSpec};
use crate::scout::MetricsRecord;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Default analyzer timeout in seconds.
pub const DEFAULT_ANALYZER_TIMEOUT_SECS: u64 = 120;

const NOT_AVAILABLE: &str = "N/A";
const NO_SCORE: &str = "0%";

const REPORT_FIELDS: &[&str] = &[
    "recommendation",
    "readiness_score",
    "correlation",
    "comparison",
    "post_text",
    "reasoning",
];

/// Validated analysis result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub recommendation: String,
    pub readiness_score: String,
    pub correlation: String,
    pub comparison: String,
    pub post_text: String,
    pub reasoning: String,
}

impl Default for AnalysisReport {
    fn default() -> Self {
        Self {
            recommendation: NOT_AVAILABLE.to_string(),
            readiness_score: NO_SCORE.to_string(),
            correlation: NOT_AVAILABLE.to_string(),
            comparison: NOT_AVAILABLE.to_string(),
            post_text: String::new(),
            reasoning: String::new(),
        }
    }
}

impl AnalysisReport {
    /// Parse analyzer output.
    ///
    /// Accepts a bare JSON object or one embedded in surrounding prose or code
    /// fences. Output with no JSON object at all is `MalformedOutput`.
    pub fn parse(raw: &str) -> Result<Self, CollaboratorError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CollaboratorError::EmptyOutput);
        }

        let object = parse_object(trimmed)
            .or_else(|| embedded_object(trimmed))
            .ok_or_else(|| {
                CollaboratorError::MalformedOutput(format!(
                    "no JSON object in analyzer output: {}",
                    preview(trimmed)
                ))
            })?;

        let defaults = Self::default();
        Ok(Self {
            recommendation: text_field(&object, "recommendation", defaults.recommendation),
            readiness_score: text_field(&object, "readiness_score", defaults.readiness_score),
            correlation: text_field(&object, "correlation", defaults.correlation),
            comparison: text_field(&object, "comparison", defaults.comparison),
            post_text: text_field(&object, "post_text", defaults.post_text),
            reasoning: text_field(&object, "reasoning", defaults.reasoning),
        })
    }
}

/// Produces an [`AnalysisReport`] for a metrics record.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, metrics: &MetricsRecord) -> Result<AnalysisReport, CollaboratorError>;
}

/// Analyzer backed by an external program.
///
/// The serialized metrics are written to the program's stdin; its stdout is
/// parsed with [`AnalysisReport::parse`].
#[derive(Debug, Clone)]
pub struct CommandAnalyzer {
    spec: CommandSpec,
}

impl CommandAnalyzer {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }

    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }
}

#[async_trait]
impl Analyzer for CommandAnalyzer {
    async fn analyze(&self, metrics: &MetricsRecord) -> Result<AnalysisReport, CollaboratorError> {
        let payload = serde_json::to_vec(metrics)
            .map_err(|e| CollaboratorError::MalformedOutput(format!("metrics encoding: {e}")))?;
        let timeout = self.spec.timeout_or(DEFAULT_ANALYZER_TIMEOUT_SECS);

        let stdout = run_command(&self.spec, &[], Some(payload.as_slice()), timeout).await?;
        let report = AnalysisReport::parse(&stdout)?;
        info!(
            design = %metrics.design_name,
            score = %report.readiness_score,
            recommendation = %report.recommendation,
            "Analysis received"
        );
        Ok(report)
    }
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// First JSON object embedded in `text`, trying every `{` in turn so braces
/// in surrounding prose are skipped. An object carrying a report field wins
/// over an earlier one that carries none.
fn embedded_object(text: &str) -> Option<Map<String, Value>> {
    let mut fallback = None;
    for (start, _) in text.match_indices('{') {
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        if let Some(Ok(Value::Object(map))) = values.next() {
            if REPORT_FIELDS.iter().any(|key| map.contains_key(*key)) {
                return Some(map);
            }
            fallback.get_or_insert(map);
        }
    }
    fallback
}

fn text_field(object: &Map<String, Value>, key: &str, default: String) -> String {
    match object.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        None | Some(Value::Null) => default,
        Some(other) => {
            warn!(field = key, kind = kind_of(other), "Unexpected analyzer field type; using default");
            default
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn preview(text: &str) -> String {
    const MAX: usize = 80;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complete_object() {
        let raw = r#"{
            "recommendation": "GO",
            "readiness_score": "85%",
            "correlation": "Matches a 130nm MCU block",
            "comparison": "Smaller than the reference",
            "post_text": "spm is ready",
            "reasoning": "Timing met with margin"
        }"#;
        let report = AnalysisReport::parse(raw).unwrap();
        assert_eq!(report.recommendation, "GO");
        assert_eq!(report.readiness_score, "85%");
        assert_eq!(report.post_text, "spm is ready");
        assert_eq!(report.reasoning, "Timing met with margin");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let report = AnalysisReport::parse(r#"{"post_text": "hi"}"#).unwrap();
        assert_eq!(report.post_text, "hi");
        assert_eq!(report.recommendation, "N/A");
        assert_eq!(report.readiness_score, "0%");
        assert_eq!(report.correlation, "N/A");
        assert_eq!(report.comparison, "N/A");
        assert_eq!(report.reasoning, "");
    }

    #[test]
    fn object_inside_code_fence() {
        let raw = "Here you go:\n```json\n{\"recommendation\": \"HOLD\"}\n```\nThanks";
        let report = AnalysisReport::parse(raw).unwrap();
        assert_eq!(report.recommendation, "HOLD");
    }

    #[test]
    fn braces_in_leading_prose_are_skipped() {
        let raw = "Use {design} as the key, or {} if unknown.\n{\"recommendation\": \"GO\", \"readiness_score\": \"91%\"}\nDone {ok}";
        let report = AnalysisReport::parse(raw).unwrap();
        assert_eq!(report.recommendation, "GO");
        assert_eq!(report.readiness_score, "91%");
    }

    #[test]
    fn wrong_typed_fields_fall_back_individually() {
        let raw = r#"{"recommendation": ["GO"], "readiness_score": 72, "post_text": null}"#;
        let report = AnalysisReport::parse(raw).unwrap();
        assert_eq!(report.recommendation, "N/A");
        assert_eq!(report.readiness_score, "72");
        assert_eq!(report.post_text, "");
    }

    #[test]
    fn prose_without_json_is_malformed() {
        let err = AnalysisReport::parse("I could not analyze this design.").unwrap_err();
        assert!(matches!(err, CollaboratorError::MalformedOutput(_)));
    }

    #[test]
    fn top_level_array_is_malformed() {
        let err = AnalysisReport::parse("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, CollaboratorError::MalformedOutput(_)));
    }

    #[test]
    fn blank_output_is_empty() {
        let err = AnalysisReport::parse("  \n").unwrap_err();
        assert!(matches!(err, CollaboratorError::EmptyOutput));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_analyzer_sends_metrics_on_stdin() {
        // Echo the design name back through the post text.
        let script = r#"read -r line; name=$(printf '%s' "$line" | sed 's/.*"design_name":"\([^"]*\)".*/\1/'); printf '{"post_text":"%s","readiness_score":"90%%"}' "$name""#;
        let analyzer =
            CommandAnalyzer::new(CommandSpec::new("/bin/sh").with_args(["-c", script]));
        let metrics = MetricsRecord {
            design_name: "spm".to_string(),
            ..MetricsRecord::default()
        };

        let report = analyzer.analyze(&metrics).await.unwrap();
        assert_eq!(report.post_text, "spm");
        assert_eq!(report.readiness_score, "90%");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_analyzer_failure_is_an_error() {
        let analyzer =
            CommandAnalyzer::new(CommandSpec::new("/bin/sh").with_args(["-c", "exit 1"]));
        let err = analyzer.analyze(&MetricsRecord::default()).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Exit { .. }));
    }
}
