use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Quotedesk
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QuotedeskConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Login, session and bootstrap settings
    pub auth: AuthConfig,
    /// Database settings (optional, in-memory store when absent)
    pub database: Option<DatabaseConfig>,
    /// File upload settings
    pub uploads: UploadConfig,
    /// Read-time name lookup cache
    pub enrichment: EnrichmentConfig,
    /// Approval workflow settings
    pub workflow: WorkflowConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Socket address to bind, e.g. 0.0.0.0:8000
    pub bind: String,
    /// Allow any origin (development setups)
    pub cors_permissive: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Lifetime of an access token
    pub token_ttl_minutes: i64,
    /// bcrypt work factor
    pub bcrypt_cost: u32,
    /// Login attempts allowed per email per minute
    pub login_attempts_per_minute: u32,
    /// Admin account created by `quotedesk seed` and at startup
    pub bootstrap_admin_email: String,
    /// Password for the bootstrap admin (can be set via env var)
    pub bootstrap_admin_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite file path or connection string)
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    pub upload_dir: String,
    pub max_upload_bytes: usize,
    pub allowed_content_types: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnrichmentConfig {
    pub cache_ttl_seconds: u64,
    pub cache_capacity: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// Role names allowed to override opportunity stage gating
    pub executive_roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            cors_permissive: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_minutes: 12 * 60,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            login_attempts_per_minute: 5,
            bootstrap_admin_email: "admin@quotedesk.local".to_string(),
            bootstrap_admin_password: None, // Read from QUOTEDESK_ADMIN_PASSWORD when unset
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            upload_dir: ".quotedesk/uploads".to_string(),
            max_upload_bytes: 5 * 1024 * 1024,
            allowed_content_types: vec![
                "image/png".to_string(),
                "image/jpeg".to_string(),
                "application/pdf".to_string(),
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                    .to_string(),
                "text/plain".to_string(),
            ],
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 300,
            cache_capacity: 10_000,
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            executive_roles: vec!["admin".to_string(), "executive".to_string()],
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
        }
    }
}

impl Default for QuotedeskConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            database: None,
            uploads: UploadConfig::default(),
            enrichment: EnrichmentConfig::default(),
            workflow: WorkflowConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl QuotedeskConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (quotedesk.toml, .quotedesk-rc)
    /// 3. Environment variables (prefixed with QUOTEDESK_, nested with __)
    pub fn load() -> Result<Self> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&QuotedeskConfig::default())?);

        if Path::new("quotedesk.toml").exists() {
            builder = builder.add_source(File::with_name("quotedesk"));
        }

        if Path::new(".quotedesk-rc").exists() {
            builder = builder.add_source(File::with_name(".quotedesk-rc").format(config::FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("QUOTEDESK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut quotedesk_config: QuotedeskConfig = builder.build()?.try_deserialize()?;

        if quotedesk_config.auth.bootstrap_admin_password.is_none() {
            if let Ok(password) = std::env::var("QUOTEDESK_ADMIN_PASSWORD") {
                quotedesk_config.auth.bootstrap_admin_password = Some(password);
            }
        }

        Ok(quotedesk_config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<QuotedeskConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = QuotedeskConfig::load_env_file();
        QuotedeskConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static QuotedeskConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable_without_any_files() {
        let config = QuotedeskConfig::default();
        assert!(config.database.is_none());
        assert_eq!(config.auth.login_attempts_per_minute, 5);
        assert!(config.workflow.executive_roles.contains(&"executive".to_string()));
        assert!(config
            .uploads
            .allowed_content_types
            .iter()
            .any(|t| t == "image/png"));
    }

    #[test]
    fn save_writes_toml_that_parses_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotedesk.toml");
        let mut config = QuotedeskConfig::default();
        config.server.bind = "0.0.0.0:9000".to_string();
        config.save_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: QuotedeskConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.server.bind, "0.0.0.0:9000");
        assert_eq!(parsed.auth.bcrypt_cost, config.auth.bcrypt_cost);
    }
}
