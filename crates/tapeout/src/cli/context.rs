//! Shared state for one CLI invocation

use super::error::HelpfulError;
use anyhow::Result;
use std::path::{Path, PathBuf};
use tapeout::collab::{CommandAnalyzer, CommandPublisher};
use tapeout::config::{default_config_path, ConfigError, TapeoutConfig};
use tapeout_db::{DbError, DraftDb};

pub struct CliContext {
    pub config: TapeoutConfig,
    /// File the config was (or would be) loaded from.
    pub config_path: PathBuf,
    db_override: Option<PathBuf>,
}

impl CliContext {
    pub fn load(config_path: Option<PathBuf>, db_override: Option<PathBuf>) -> Result<Self> {
        let config = TapeoutConfig::load_or_default(config_path.as_deref())
            .map_err(|err| config_error(&err, config_path.as_deref()))?;
        Ok(Self {
            config,
            config_path: config_path.unwrap_or_else(default_config_path),
            db_override,
        })
    }

    pub fn designs_root(&self, cli_root: Option<&Path>) -> Result<PathBuf> {
        self.config
            .designs_root(cli_root)
            .map_err(|_| HelpfulError::missing_designs_root(&self.config_path).into())
    }

    pub fn database_path(&self) -> PathBuf {
        self.config.database_path(self.db_override.as_deref())
    }

    /// Open the database, creating it if needed.
    pub async fn open_db(&self) -> Result<DraftDb> {
        let path = self.database_path();
        DraftDb::open(&path)
            .await
            .map_err(|err| HelpfulError::database_unavailable(&path, &err.to_string()).into())
    }

    /// Open the database only if it already exists.
    pub async fn open_existing_db(&self) -> Result<Option<DraftDb>> {
        let path = self.database_path();
        match DraftDb::open_existing(&path).await {
            Ok(db) => Ok(Some(db)),
            Err(DbError::NotFound(_)) => Ok(None),
            Err(err) => Err(HelpfulError::database_unavailable(&path, &err.to_string()).into()),
        }
    }

    pub fn analyzer(&self) -> Result<CommandAnalyzer> {
        let spec = self
            .config
            .analyzer_spec()
            .map_err(|_| HelpfulError::missing_collaborator("analyzer", &self.config_path))?;
        Ok(CommandAnalyzer::new(spec))
    }

    pub fn publisher(&self) -> Result<CommandPublisher> {
        let spec = self
            .config
            .publisher_spec()
            .map_err(|_| HelpfulError::missing_collaborator("publisher", &self.config_path))?;
        Ok(CommandPublisher::new(spec))
    }
}

fn config_error(err: &ConfigError, explicit: Option<&Path>) -> anyhow::Error {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);
    HelpfulError::invalid_config(&path, &err.to_string()).into()
}
