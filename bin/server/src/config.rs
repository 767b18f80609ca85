//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables. Nested keys use
//! a double underscore, e.g. `DATABASE__MAX_CONNECTIONS`.

use serde::Deserialize;

/// Server configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Connection pool configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Connection pool configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_config_has_correct_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn missing_optional_keys_use_defaults() {
        let config: ServerConfig = config::Config::builder()
            .set_override("database_url", "postgres://localhost/automa")
            .expect("override")
            .build()
            .expect("build")
            .try_deserialize()
            .expect("deserialize");

        assert_eq!(config.listen_addr, "127.0.0.1:3000");
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn nested_pool_size_is_read() {
        let config: ServerConfig = config::Config::builder()
            .set_override("database_url", "postgres://localhost/automa")
            .expect("override")
            .set_override("database.max_connections", 12)
            .expect("override")
            .build()
            .expect("build")
            .try_deserialize()
            .expect("deserialize");

        assert_eq!(config.database.max_connections, 12);
    }

    #[test]
    fn database_url_is_required() {
        let result = config::Config::builder()
            .build()
            .expect("build")
            .try_deserialize::<ServerConfig>();
        assert!(result.is_err());
    }
}
