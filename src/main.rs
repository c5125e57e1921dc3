use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use music_library_server::config::{
    AppConfig, CliConfig, FileConfig, DEFAULT_MAX_UPLOAD_MB, JWT_SECRET_ENV_VAR,
};
use music_library_server::library::SqliteLibraryStore;
use music_library_server::media::MediaStorage;
use music_library_server::server::{run_server, RequestsLoggingLevel, ServerState};
use music_library_server::user::{
    PasswordHasher, SqliteUserStore, TokenIssuer, TokenVerifier, UserManager,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding the user and library SQLite databases.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Directory where uploaded songs are stored. Defaults to the db directory.
    #[clap(long, value_parser = parse_path)]
    pub media_path: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 8080)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to a TOML config file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Origin allowed to make cross-origin requests. Can be repeated.
    #[clap(long = "allowed-origin")]
    pub allowed_origins: Vec<String>,

    /// Maximum accepted size of an uploaded song, in MiB.
    #[clap(long, default_value_t = DEFAULT_MAX_UPLOAD_MB)]
    pub max_upload_mb: usize,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            media_path: self.media_path.clone(),
            port: self.port,
            logging_level: self.logging_level.clone(),
            allowed_origins: self.allowed_origins.clone(),
            max_upload_mb: self.max_upload_mb,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let env_secret = std::env::var(JWT_SECRET_ENV_VAR).ok();
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config, env_secret)?;

    if config.signing_secret.is_empty() {
        warn!(
            "Token signing secret is empty, issued tokens are only as safe as this instance's configuration"
        );
    }

    info!(
        "Opening SQLite library database at {:?}...",
        config.library_db_path()
    );
    let library = Arc::new(SqliteLibraryStore::new(config.library_db_path())?);

    info!("Opening SQLite user database at {:?}...", config.user_db_path());
    let user_store = Arc::new(SqliteUserStore::new(config.user_db_path())?);

    let media = Arc::new(MediaStorage::new(&config.media_path));
    media
        .init()
        .await
        .with_context(|| format!("Failed to prepare media directory {:?}", config.media_path))?;
    info!("Storing songs under {:?}", media.songs_dir());

    let user_manager = UserManager::new(
        user_store,
        library.clone(),
        PasswordHasher::new(config.hash_cost)?,
        TokenIssuer::new(&config.signing_secret),
    )?;

    let state = ServerState::new(
        config.server_config(),
        Arc::new(user_manager),
        library,
        media,
        Arc::new(TokenVerifier::new(&config.signing_secret)),
    );

    info!("Ready to serve at port {}!", config.port);
    run_server(state).await
}
