use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use chrono::Duration;
use clap::{Args, Parser, Subcommand};
use rand::{distributions::Alphanumeric, Rng};
use thiserror::Error;

use crate::{
    error::StoreError, jwt::TokenIssuer, media::MediaStore, memory::MemoryStore,
    postgres::PgStore, state::AppState, store::Store,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("MEDIA_URL must be a single path segment such as /media/, got {0:?}")]
    MediaUrl(String),
    #[error("TOKEN_LIFETIME_HOURS must be positive, got {0}")]
    TokenLifetime(i64),
    #[error("DATABASE_MAX_CONNECTIONS must be positive")]
    MaxConnections,
    #[error("Invalid token secret: {0}")]
    TokenSecret(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Parser)]
#[command(author, version, about = "Recipe API server")]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Create a staff user with superuser rights
    CreateSuperuser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "")]
        name: String,
    },
}

#[derive(Debug, Clone, Args)]
pub struct Config {
    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:8000")]
    pub bind_address: SocketAddr,

    /// PostgreSQL connection string; the in-memory store is used when unset
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    pub database_max_connections: u32,

    #[arg(long, env = "TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,

    #[arg(long, env = "TOKEN_LIFETIME_HOURS", default_value_t = 24)]
    pub token_lifetime_hours: i64,

    #[arg(long, env = "MEDIA_ROOT", default_value = "./media")]
    pub media_root: PathBuf,

    #[arg(long, env = "MEDIA_URL", default_value = "/media/")]
    pub media_url: String,

    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_upload_bytes: u64,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let segment = self.media_url.trim_matches('/');
        if segment.is_empty() || segment.contains('/') {
            return Err(ConfigError::MediaUrl(self.media_url.to_owned()));
        }
        if self.token_lifetime_hours <= 0 {
            return Err(ConfigError::TokenLifetime(self.token_lifetime_hours));
        }
        if self.database_max_connections == 0 {
            return Err(ConfigError::MaxConnections);
        }
        Ok(())
    }

    /// The configured secret, or a random one that dies with the process.
    pub fn token_secret(&self) -> String {
        match &self.token_secret {
            Some(secret) if !secret.is_empty() => secret.to_owned(),
            _ => {
                log::warn!("TOKEN_SECRET is not set, issued tokens will not survive a restart");
                rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(64)
                    .map(char::from)
                    .collect()
            }
        }
    }

    pub fn token_issuer(&self) -> Result<TokenIssuer, ConfigError> {
        TokenIssuer::new(
            self.token_secret().as_bytes(),
            Duration::hours(self.token_lifetime_hours),
        )
        .map_err(|e| ConfigError::TokenSecret(format!("{e}")))
    }

    pub fn media(&self) -> MediaStore {
        MediaStore::new(self.media_root.to_owned(), &self.media_url)
    }

    /// Connects and migrates PostgreSQL, or falls back to memory.
    pub async fn store(&self) -> Result<Arc<dyn Store>, ConfigError> {
        match &self.database_url {
            Some(url) => {
                let store = PgStore::connect(url, self.database_max_connections).await?;
                store.migrate().await?;
                log::info!("Connected to PostgreSQL");
                Ok(Arc::new(store))
            }
            None => {
                log::warn!("DATABASE_URL is not set, data is kept in memory only");
                Ok(Arc::new(MemoryStore::new()))
            }
        }
    }

    pub async fn state(&self) -> Result<AppState, ConfigError> {
        self.validate()?;

        let state = AppState::new(self.store().await?, self.token_issuer()?, self.media())
            .with_max_upload_bytes(self.max_upload_bytes);

        Ok(state)
    }
}
