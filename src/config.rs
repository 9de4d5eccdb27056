//! `tql.toml` configuration.
//!
//! ```toml
//! database = "app.db"
//! format = "json"
//! log_level = "tql=debug"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{TqlError, TqlResult};

pub const CONFIG_FILE: &str = "tql.toml";

/// How the command-line tool prints rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TqlConfig {
    pub database: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub log_level: Option<String>,
}

impl TqlConfig {
    pub fn from_toml(content: &str) -> TqlResult<Self> {
        toml::from_str(content).map_err(|e| TqlError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> TqlResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// `./tql.toml`, else `<config dir>/tql/config.toml`, else defaults.
    pub fn discover() -> TqlResult<Self> {
        match Self::candidates().into_iter().find(|p| p.exists()) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("tql").join("config.toml"));
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_config() {
        let config = TqlConfig::from_toml(
            r#"
            database = "app.db"
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(
            config,
            TqlConfig {
                database: Some(PathBuf::from("app.db")),
                format: Some(OutputFormat::Json),
                log_level: None,
            }
        );
    }

    #[test]
    fn test_empty_config() {
        assert_eq!(TqlConfig::from_toml("").unwrap(), TqlConfig::default());
    }

    #[test]
    fn test_unknown_key() {
        assert!(matches!(
            TqlConfig::from_toml("colour = true"),
            Err(TqlError::Config(_))
        ));
    }
}
