// Configuration module entry point
// Loads layered configuration and holds the shared application state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{
    Config, DatabaseConfig, HttpConfig, LoggingConfig, PerformanceConfig, RoutingConfig,
    ServerConfig, ViewsConfig,
};

/// Default config file name (extension resolved by the `config` crate)
pub const DEFAULT_CONFIG_PATH: &str = "config";

/// Environment variable prefix, nested keys use `__` (`FRONTDESK_DATABASE__HOST`)
pub const ENV_PREFIX: &str = "FRONTDESK";

impl Config {
    /// Load configuration from the default location (`config.toml`)
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from specified file path (without extension)
    /// Missing files are allowed, defaults and environment fill the gaps
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        Self::build(config_path, environment())
    }

    fn build(config_path: &str, env: config::Environment) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(env)
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "frontdesk/0.1")?
            .set_default("database.enabled", false)?
            .set_default("database.host", "127.0.0.1")?
            .set_default("database.port", 5432)?
            .set_default("database.username", "")?
            .set_default("database.password", "")?
            .set_default("database.database", "")?
            .set_default("database.connect_timeout_ms", 1000)?
            .set_default("views.base_dir", "views")?
            .set_default("views.extension", "html")?
            .set_default("views.site_title", "frontdesk")?
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

/// `FRONTDESK_SECTION__KEY` overrides; list keys take comma-separated values
fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("routing.disabled_handlers")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let cfg = Config::load_from("does-not-exist/frontdesk").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert!(!cfg.database.enabled);
        assert_eq!(cfg.views.extension, "html");
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert!(cfg.routing.disabled_handlers.is_empty());
        assert_eq!(cfg.get_socket_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9090

[database]
enabled = true
host = "db.internal"
password = "hunter2"

[views]
base_dir = "/srv/views"

[routing]
disabled_handlers = ["Blog"]
"#
        )
        .unwrap();

        let path = file.path().with_extension("");
        let cfg = Config::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert!(cfg.database.enabled);
        assert_eq!(cfg.database.host, "db.internal");
        assert_eq!(cfg.views.base_dir, std::path::PathBuf::from("/srv/views"));
        assert_eq!(cfg.routing.disabled_handlers, ["Blog"]);
    }

    #[test]
    fn test_environment_overrides() {
        let vars = [
            ("FRONTDESK_SERVER__PORT", "9443"),
            ("FRONTDESK_DATABASE__ENABLED", "true"),
            ("FRONTDESK_DATABASE__PASSWORD", "1234"),
            ("FRONTDESK_ROUTING__DISABLED_HANDLERS", "Blog,UserProfile"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let cfg = Config::build("does-not-exist/frontdesk", environment().source(Some(vars))).unwrap();
        assert_eq!(cfg.server.port, 9443);
        assert!(cfg.database.enabled);
        assert_eq!(cfg.database.password, "1234");
        assert_eq!(cfg.routing.disabled_handlers, ["Blog", "UserProfile"]);
    }

    #[test]
    fn test_debug_hides_password() {
        let cfg = Config::load_from("does-not-exist/frontdesk").unwrap();
        let mut db = cfg.database;
        db.password = "hunter2".to_string();
        let printed = format!("{db:?}");
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("***"));
    }
}
