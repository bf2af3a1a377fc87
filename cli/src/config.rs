use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

use macrotrack_core::engine::EngineKind;

pub const DB_ENV: &str = "MACROTRACK_DB";
pub const ENGINE_ENV: &str = "MACROTRACK_ENGINE";

pub struct Config {
    pub db_path: PathBuf,
    pub engine: EngineKind,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs = ProjectDirs::from("", "", "macrotrack")
            .context("Could not determine home directory")?;
        let data_dir = proj_dirs.data_dir().to_path_buf();

        let config = Self::resolve(
            &data_dir,
            std::env::var(DB_ENV).ok(),
            std::env::var(ENGINE_ENV).ok(),
        )?;

        if let Some(parent) = config.db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;
        }
        tracing::debug!(db = %config.db_path.display(), engine = %config.engine, "loaded config");

        Ok(config)
    }

    /// Apply environment overrides on top of the platform data directory.
    fn resolve(
        data_dir: &std::path::Path,
        db_override: Option<String>,
        engine_override: Option<String>,
    ) -> Result<Self> {
        let db_path = match db_override.filter(|s| !s.trim().is_empty()) {
            Some(path) => PathBuf::from(path),
            None => data_dir.join("macrotrack.db"),
        };

        let engine = match engine_override.filter(|s| !s.trim().is_empty()) {
            Some(name) => name
                .parse()
                .with_context(|| format!("Invalid {ENGINE_ENV}"))?,
            None => EngineKind::default(),
        };

        Ok(Config { db_path, engine })
    }
}
