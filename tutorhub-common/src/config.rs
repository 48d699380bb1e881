//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a TOML file. Every section and key is
//! optional: a missing file or missing key falls back to compiled defaults so
//! the service can start with zero configuration.
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `TUTORHUB_ROOT_FOLDER` environment variable
//! 3. `root_folder` key of the TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "TUTORHUB_ROOT_FOLDER";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// HTTP server port
    pub port: u16,

    /// Root folder holding the database and uploaded media
    pub root_folder: Option<PathBuf>,

    /// Database file, relative to the root folder unless absolute
    pub database_path: PathBuf,

    pub logging: LoggingConfig,
    pub api: ApiConfig,
    pub jwt: JwtConfig,
    pub message_queue: MessageQueueConfig,
    pub smtp: SmtpConfig,
    pub storage: StorageConfig,
    pub schedule: ScheduleConfig,
    pub bootstrap: BootstrapConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: 5080,
            root_folder: None,
            database_path: PathBuf::from("tutorhub.db"),
            logging: LoggingConfig::default(),
            api: ApiConfig::default(),
            jwt: JwtConfig::default(),
            message_queue: MessageQueueConfig::default(),
            smtp: SmtpConfig::default(),
            storage: StorageConfig::default(),
            schedule: ScheduleConfig::default(),
            bootstrap: BootstrapConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// API behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Rows per page for every paginated listing
    pub page_size: i64,
    /// Base URL used when building links to uploaded media and emails
    pub public_base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            public_base_url: "http://localhost:5080".to_string(),
        }
    }
}

/// Bearer token configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// Signing secret; empty means "load or generate from the settings table"
    pub secret: String,
    pub expiry_minutes: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            expiry_minutes: 24 * 60,
        }
    }
}

/// Outbound email queue
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessageQueueConfig {
    pub queue_name: String,
    pub capacity: usize,
}

impl Default for MessageQueueConfig {
    fn default() -> Self {
        Self {
            queue_name: "tutorhub-email".to_string(),
            capacity: 256,
        }
    }
}

/// SMTP sender configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    /// When false, emails are logged instead of sent
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "localhost".to_string(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from: "TutorHub <no-reply@tutorhub.local>".to_string(),
        }
    }
}

/// Media upload limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub max_upload_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Schedule generator cadence
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub generation_interval_minutes: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            generation_interval_minutes: 360,
        }
    }
}

/// Initial manager account created on first start
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub manager_email: String,
    pub manager_password: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            manager_email: "manager@tutorhub.local".to_string(),
            manager_password: "ChangeMe123!".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Load configuration from a file
    ///
    /// A missing file yields the compiled defaults with a warning. A file that
    /// exists but does not parse is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path.map(PathBuf::from).or_else(default_config_file) {
            Some(p) => p,
            None => {
                warn!("No configuration file found, using compiled defaults");
                return Ok(Self::default());
            }
        };

        if !path.exists() {
            warn!(
                "Configuration file {} not found, using compiled defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Platform config file location (`~/.config/tutorhub/config.toml` on Linux)
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("tutorhub").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/tutorhub/config.toml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("tutorhub"))
        .unwrap_or_else(|| PathBuf::from("./tutorhub_data"))
}

/// Resolves the root folder following the documented priority order
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_value: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>, toml_value: Option<PathBuf>) -> Self {
        Self { cli_arg, toml_value }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_value {
            return path.clone();
        }

        default_root_folder()
    }
}

/// Creates the root folder layout on first run
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create root and media directories if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            info!("Creating root folder: {}", self.root_folder.display());
        }
        std::fs::create_dir_all(self.media_path())?;
        Ok(())
    }

    /// Database path; relative paths are resolved under the root folder
    pub fn database_path(&self, configured: &Path) -> PathBuf {
        if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            self.root_folder.join(configured)
        }
    }

    /// Directory holding uploaded media blobs
    pub fn media_path(&self) -> PathBuf {
        self.root_folder.join("media")
    }
}
