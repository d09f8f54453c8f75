use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat, FileSourceFile};
use serde::Deserialize;

use crate::path_utils;

/// Base name of the optional config file (`gcode-archiver.toml`, `.yaml`, `.json`).
pub const CONFIG_FILE_NAME: &str = "gcode-archiver";

/// Prefix for environment overrides, e.g. `GCODE_ARCHIVER_KEEP=17`.
pub const ENV_PREFIX: &str = "GCODE_ARCHIVER";

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 7125;
pub const DEFAULT_ENDPOINT: &str = "/server/database/item?namespace=gcode_metadata";
pub const DEFAULT_TIMEOUT_SECS: f64 = 10.0;
pub const DEFAULT_KEEP: usize = 42;
pub const DEFAULT_GCODE_DIR: &str = "~/printer_data/gcode";
pub const DEFAULT_ARCHIVE_DIR: &str = "~/printer_data/gcode/archive";

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub endpoint: String,

    /// HTTP timeout in seconds.
    pub timeout_secs: f64,

    /// Number of most-recent files to keep in place.
    pub keep: usize,

    pub gcode_dir: String,
    pub archive_dir: String,

    /// Optional file that receives a copy of the log stream.
    pub log_file: Option<String>,
}

impl AppConfig {
    /// Defaults, then `gcode-archiver.*` in the working directory, then
    /// `GCODE_ARCHIVER_*` environment variables (a `.env` file is honoured).
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Self::from_sources(
            File::with_name(CONFIG_FILE_NAME).required(false),
            Environment::with_prefix(ENV_PREFIX).try_parsing(true),
        )
    }

    pub fn from_sources(
        file: File<FileSourceFile, FileFormat>,
        env: Environment,
    ) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("host", DEFAULT_HOST)?
            .set_default("port", DEFAULT_PORT as i64)?
            .set_default("endpoint", DEFAULT_ENDPOINT)?
            .set_default("timeout_secs", DEFAULT_TIMEOUT_SECS)?
            .set_default("keep", DEFAULT_KEEP as i64)?
            .set_default("gcode_dir", DEFAULT_GCODE_DIR)?
            .set_default("archive_dir", DEFAULT_ARCHIVE_DIR)?
            .add_source(file)
            .add_source(env);

        let config: Self = builder.build()?.try_deserialize()?;

        if config.timeout_secs <= 0.0 || Duration::try_from_secs_f64(config.timeout_secs).is_err() {
            return Err(ConfigError::Message(format!(
                "timeout_secs must be a positive, representable number of seconds, got {}",
                config.timeout_secs
            )));
        }

        Ok(config)
    }

    pub fn gcode_dir_path(&self) -> PathBuf {
        path_utils::get_path(&self.gcode_dir)
    }

    pub fn archive_dir_path(&self) -> PathBuf {
        path_utils::get_path(&self.archive_dir)
    }

    pub fn log_file_path(&self) -> Option<PathBuf> {
        self.log_file.as_deref().map(path_utils::get_path)
    }
}
