/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `JWT_SECRET`: Secret key for JWT signing (required, >= 32 chars)
/// - `MEDIA_ROOT`: Directory for stored media files (default: media)
/// - `MEDIA_URL`: URL prefix for serving media (default: /media)
/// - `AVATAR_MAX_DIMENSION`: Post-processing size bound (default: 200)
/// - `AVATAR_QUALITY`: JPEG re-encode quality (default: 85)
/// - `ALLOWED_AVATAR_EXTENSIONS`: Comma-separated allow-list
///   (default: .jpg,.jpeg,.png,.gif)
/// - `RUST_LOG`: Log level (default: info)
///
/// # Example
///
/// ```no_run
/// use rosterd_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use rosterd_shared::media::MediaConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Media storage and avatar post-processing configuration
    pub media: MediaConfig,

    /// URL prefix under which media files are served read-only
    pub media_url: String,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be kept secret and at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or have
    /// invalid values.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let media_root =
            PathBuf::from(env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string()));
        let media_url = env::var("MEDIA_URL").unwrap_or_else(|_| "/media".to_string());

        let max_dimension = env::var("AVATAR_MAX_DIMENSION")
            .unwrap_or_else(|_| "200".to_string())
            .parse::<u32>()?;
        let jpeg_quality = env::var("AVATAR_QUALITY")
            .unwrap_or_else(|_| "85".to_string())
            .parse::<u8>()?;

        let default_media = MediaConfig::default();
        let allowed_extensions = match env::var("ALLOWED_AVATAR_EXTENSIONS") {
            Ok(list) => list
                .split(',')
                .map(|e| e.trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
            Err(_) => default_media.allowed_extensions,
        };

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            media: MediaConfig {
                root: media_root,
                avatar_dir: default_media.avatar_dir,
                allowed_extensions,
                max_dimension,
                jpeg_quality,
            },
            media_url,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Builds the public URL for a stored media-relative path
    pub fn media_file_url(&self, relative: &str) -> String {
        format!("{}/{}", self.media_url.trim_end_matches('/'), relative)
    }
}
