//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(
        mut self,
        suggestions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// No designs root from the command line or config file
    pub fn missing_designs_root(config_path: &Path) -> Self {
        Self::new("No designs directory configured")
            .with_context("Commands that look for runs need a designs root")
            .with_suggestions([
                "TRY: Pass it directly: tapeout latest --root /path/to/designs".to_string(),
                format!(
                    "TRY: Set designs_root in {}",
                    config_path.display()
                ),
            ])
    }

    /// `kind` is "analyzer" or "publisher"
    pub fn missing_collaborator(kind: &str, config_path: &Path) -> Self {
        Self::new(format!("No {} program configured", kind))
            .with_context(format!(
                "The [{}] section is missing from {}",
                kind,
                config_path.display()
            ))
            .with_suggestions([
                format!(
                    "TRY: Add to the config file:\n\n    [{}]\n    program = \"/path/to/{}\"\n    args = []",
                    kind, kind
                ),
                "TRY: Inspect the resolved settings: tapeout config".to_string(),
            ])
    }

    /// Config file exists but cannot be used
    pub fn invalid_config(path: &Path, details: &str) -> Self {
        Self::new(format!("Cannot load config: {}", path.display()))
            .with_context(details.to_string())
            .with_suggestions([
                format!("TRY: Check the file syntax: cat {}", path.display()),
                "TRY: Known keys: designs_root, database_path, metrics_snapshot_path, [analyzer], [publisher]".to_string(),
            ])
    }

    /// Database could not be opened
    pub fn database_unavailable(path: &Path, details: &str) -> Self {
        Self::new(format!("Cannot open database: {}", path.display()))
            .with_context(details.to_string())
            .with_suggestions([
                format!("TRY: Check permissions: ls -la {}", path.display()),
                "TRY: Point at another file with --db PATH".to_string(),
            ])
    }

    /// `--status` value that is not a post state
    pub fn invalid_status(value: &str) -> Self {
        Self::new(format!("Invalid post status: '{}'", value))
            .with_context("Posts are pending, cancelled or published")
            .with_suggestion("TRY: tapeout posts --status pending")
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

/// Print a command failure as JSON on stdout.
pub fn print_json_error(err: &anyhow::Error) {
    let value = match err.downcast_ref::<HelpfulError>() {
        Some(helpful) => serde_json::json!({
            "status": "error",
            "error": helpful.message,
            "context": helpful.context,
            "suggestions": helpful.suggestions,
        }),
        None => serde_json::json!({
            "status": "error",
            "error": format!("{:#}", err),
        }),
    };
    println!("{}", value);
}
