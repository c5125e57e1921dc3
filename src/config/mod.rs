mod file_config;

pub use file_config::FileConfig;

use crate::server::{RequestsLoggingLevel, ServerConfig};
use crate::user::{HashCost, SigningSecret};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const JWT_SECRET_ENV_VAR: &str = "JWT_SECRET_KEY";
pub const DEFAULT_MAX_UPLOAD_MB: usize = 50;

const MAX_HASH_MEMORY_KIB: u32 = 1024 * 1024;
const MAX_HASH_ITERATIONS: u32 = 16;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub media_path: Option<PathBuf>,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub allowed_origins: Vec<String>,
    pub max_upload_mb: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub media_path: PathBuf,
    pub port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,

    pub signing_secret: SigningSecret,
    pub hash_cost: HashCost,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments, optional TOML file config and
    /// the signing secret read from the environment.
    /// TOML values override CLI and environment values where present.
    pub fn resolve(
        cli: &CliConfig,
        file_config: Option<FileConfig>,
        env_secret: Option<String>,
    ) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        // TOML overrides CLI for each field
        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let media_path = file
            .media_path
            .map(PathBuf::from)
            .or_else(|| cli.media_path.clone())
            .unwrap_or_else(|| db_dir.clone());

        let port = file.port.unwrap_or(cli.port);

        let logging_level = match file.logging_level {
            Some(s) => parse_logging_level(&s).ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid logging_level in config file: {:?} (expected none, path, headers or body)",
                    s
                )
            })?,
            None => cli.logging_level.clone(),
        };

        let allowed_origins = file
            .allowed_origins
            .unwrap_or_else(|| cli.allowed_origins.clone());
        let allowed_origins = if allowed_origins.is_empty() {
            vec![crate::server::config::DEFAULT_ALLOWED_ORIGIN.to_owned()]
        } else {
            allowed_origins
        };

        let max_upload_mb = file.max_upload_mb.unwrap_or(cli.max_upload_mb);
        if max_upload_mb == 0 {
            bail!("max_upload_mb must be greater than zero");
        }

        let signing_secret = match file.jwt_secret.or(env_secret) {
            Some(secret) => SigningSecret::new(secret),
            None => bail!(
                "Token signing secret must be set via {} or jwt_secret in config file",
                JWT_SECRET_ENV_VAR
            ),
        };

        let default_cost = HashCost::default();
        let hash_cost = HashCost {
            memory_kib: file
                .password_hash_memory_kib
                .unwrap_or(default_cost.memory_kib),
            iterations: file
                .password_hash_iterations
                .unwrap_or(default_cost.iterations),
        };
        if hash_cost.memory_kib > MAX_HASH_MEMORY_KIB {
            bail!(
                "password_hash_memory_kib must be at most {}",
                MAX_HASH_MEMORY_KIB
            );
        }
        if hash_cost.iterations > MAX_HASH_ITERATIONS {
            bail!(
                "password_hash_iterations must be at most {}",
                MAX_HASH_ITERATIONS
            );
        }

        Ok(Self {
            db_dir,
            media_path,
            port,
            logging_level,
            allowed_origins,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            signing_secret,
            hash_cost,
        })
    }

    pub fn user_db_path(&self) -> PathBuf {
        self.db_dir.join("user.db")
    }

    pub fn library_db_path(&self) -> PathBuf {
        self.db_dir.join("library.db")
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            requests_logging_level: self.logging_level.clone(),
            port: self.port,
            allowed_origins: self.allowed_origins.clone(),
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
