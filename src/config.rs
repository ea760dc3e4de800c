//! Runtime configuration loaded from environment variables.

use std::path::PathBuf;

use anyhow::Result;

pub const DEFAULT_PORT: u16 = 3000;

/// Server and storage settings.
#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    /// Database file (from SYSREV_DB). `None` means the platform data directory.
    pub db_path: Option<PathBuf>,
    /// HTTP port (from SYSREV_PORT).
    pub port: Option<u16>,
    /// Allowed CORS origins (from SYSREV_CORS_ORIGINS, comma-separated).
    /// `None` allows any origin.
    pub cors_origins: Option<Vec<String>>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup("SYSREV_DB")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let port = lookup("SYSREV_PORT").and_then(|s| s.trim().parse::<u16>().ok());

        let cors_origins = lookup("SYSREV_CORS_ORIGINS").map(|s| {
            s.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        Self {
            db_path,
            port,
            cors_origins,
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Configured database path, or the platform default.
    pub fn resolve_db_path(&self) -> Result<PathBuf> {
        match &self.db_path {
            Some(path) => Ok(path.clone()),
            None => default_db_path(),
        }
    }
}

/// `<platform data dir>/sysrev.db`.
pub fn default_db_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "sysrev")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("sysrev.db"))
}
