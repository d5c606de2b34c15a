/// Environment-driven configuration
///
/// All settings come from `EXAMFLOW_*` variables, with a `.env` file
/// honored for local development. The JWT secret has no default.
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

const DEFAULT_UPLOAD_LIMIT: usize = 10 * 1024 * 1024;
const DEFAULT_TOKEN_TTL: i64 = 7 * 24 * 3600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Maximum accepted document upload size in bytes
    pub upload_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    pub document_directory: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Access token lifetime in seconds
    pub token_ttl: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl ServiceConfig {
    fn from_env() -> AppResult<Self> {
        let port = var_or("EXAMFLOW_PORT", "8080")
            .parse()
            .map_err(|_| AppError::Validation("Invalid port number".to_string()))?;
        let upload_limit = env::var("EXAMFLOW_UPLOAD_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_UPLOAD_LIMIT);

        Ok(Self {
            hostname: var_or("EXAMFLOW_HOSTNAME", "localhost"),
            port,
            upload_limit,
        })
    }
}

impl StorageConfig {
    fn from_env() -> Self {
        let data_directory: PathBuf = var_or("EXAMFLOW_DATA_DIRECTORY", "./data").into();
        let database = env::var("EXAMFLOW_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("examflow.sqlite"));
        let document_directory = env::var("EXAMFLOW_DOCUMENT_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("documents"));

        Self {
            data_directory,
            database,
            document_directory,
        }
    }
}

impl AuthConfig {
    fn from_env() -> AppResult<Self> {
        let jwt_secret = env::var("EXAMFLOW_JWT_SECRET")
            .map_err(|_| AppError::Validation("JWT secret required".to_string()))?;
        let token_ttl = env::var("EXAMFLOW_TOKEN_TTL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TOKEN_TTL);

        Ok(Self {
            jwt_secret,
            token_ttl,
        })
    }
}

impl ServerConfig {
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        Ok(ServerConfig {
            service: ServiceConfig::from_env()?,
            storage: StorageConfig::from_env(),
            authentication: AuthConfig::from_env()?,
            logging: LoggingConfig {
                level: var_or("RUST_LOG", "info"),
            },
        })
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AppError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(AppError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        Ok(())
    }
}
