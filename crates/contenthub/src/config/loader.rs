use std::path::{Path, PathBuf};

use crate::config::schema::{Config, CONFIG_VERSION};
use crate::error::ConfigError;

pub const ENV_DATA_HOME: &str = "DATA_HOME";
pub const ENV_PORT: &str = "PORT";
pub const ENV_DATABASE: &str = "CONTENTHUB_DATABASE";
pub const ENV_YTDLP: &str = "CONTENTHUB_YTDLP";
pub const ENV_FFMPEG: &str = "CONTENTHUB_FFMPEG";
pub const ENV_JOB_TIMEOUT: &str = "CONTENTHUB_JOB_TIMEOUT_SECS";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

/// `~/.config/contenthub/config.json` (platform equivalent), if a config
/// directory exists for the current user.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("contenthub").join("config.json"))
}

impl Config {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Overrides fields from the process environment. Unset and empty
    /// variables are ignored.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_DATA_HOME) {
            self.data_home = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_DATABASE) {
            self.database_path = Some(PathBuf::from(v));
        }
        if let Some(v) = get(ENV_PORT) {
            self.server.port = parse_env(ENV_PORT, &v)?;
        }
        if let Some(v) = get(ENV_YTDLP) {
            self.tools.downloader = v;
        }
        if let Some(v) = get(ENV_FFMPEG) {
            self.tools.transcoder = v;
        }
        if let Some(v) = get(ENV_JOB_TIMEOUT) {
            self.jobs.timeout_secs = parse_env(ENV_JOB_TIMEOUT, &v)?;
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name: name.to_string(),
        value: value.to_string(),
    })
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.data_home.as_os_str().is_empty() {
        return Err(ConfigError::Validation {
            message: "data_home must not be empty".to_string(),
        });
    }

    if config.server.port == 0 {
        return Err(ConfigError::Validation {
            message: "server.port must be between 1 and 65535".to_string(),
        });
    }

    if config.jobs.timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "jobs.timeout_secs must be greater than zero".to_string(),
        });
    }

    for (field, value) in [
        ("tools.downloader", &config.tools.downloader),
        ("tools.transcoder", &config.tools.transcoder),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: format!("{} must not be empty", field),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = load_config_from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.database_path(), PathBuf::from("data/contenthub.db"));
        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.jobs.timeout().as_secs(), 3600);
    }

    #[test]
    fn test_load_full_config() {
        let config_json = r#"
        {
            "version": "1.0",
            "data_home": "/srv/contenthub",
            "database_path": "/var/lib/contenthub/db.sqlite",
            "server": { "host": "127.0.0.1", "port": 9000 },
            "tools": { "downloader": "/opt/bin/yt-dlp", "transcoder": "/opt/bin/ffmpeg" },
            "jobs": { "timeout_secs": 120 }
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.data_home, PathBuf::from("/srv/contenthub"));
        assert_eq!(
            config.database_path(),
            PathBuf::from("/var/lib/contenthub/db.sqlite")
        );
        assert_eq!(config.server.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.tools.downloader, "/opt/bin/yt-dlp");
        assert_eq!(config.jobs.timeout_secs, 120);
    }

    #[test]
    fn test_invalid_version() {
        let result = load_config_from_str(r#"{ "version": "2.0" }"#);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_zero_port_and_timeout_rejected() {
        assert!(load_config_from_str(r#"{ "server": { "port": 0 } }"#).is_err());
        assert!(load_config_from_str(r#"{ "jobs": { "timeout_secs": 0 } }"#).is_err());
    }

    #[test]
    fn test_empty_tool_rejected() {
        let err = load_config_from_str(r#"{ "tools": { "transcoder": " " } }"#).unwrap_err();
        assert!(err.to_string().contains("tools.transcoder"));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            load_config_from_str("{ not json"),
            Err(ConfigError::ParseJson(_))
        ));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "data_home": "media" }}"#).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.data_home, PathBuf::from("media"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config("/nonexistent/contenthub.json").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_DATA_HOME, "/tmp/media"),
            (ENV_PORT, "9999"),
            (ENV_YTDLP, "/usr/local/bin/yt-dlp"),
            (ENV_FFMPEG, ""),
            (ENV_JOB_TIMEOUT, "60"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.data_home, PathBuf::from("/tmp/media"));
        assert_eq!(config.database_path(), PathBuf::from("/tmp/media/contenthub.db"));
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.tools.downloader, "/usr/local/bin/yt-dlp");
        // Empty values are ignored.
        assert_eq!(config.tools.transcoder, "ffmpeg");
        assert_eq!(config.jobs.timeout_secs, 60);
    }

    #[test]
    fn test_invalid_override() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|name| (name == ENV_PORT).then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref name, .. } if name == ENV_PORT));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var(ENV_DATA_HOME, "/tmp/contenthub-env-test");
        std::env::set_var(ENV_DATABASE, "/tmp/contenthub-env-test/other.db");
        let config = Config::from_env();
        std::env::remove_var(ENV_DATA_HOME);
        std::env::remove_var(ENV_DATABASE);

        let config = config.unwrap();
        assert_eq!(config.data_home, PathBuf::from("/tmp/contenthub-env-test"));
        assert_eq!(
            config.database_path(),
            PathBuf::from("/tmp/contenthub-env-test/other.db")
        );
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_zero_timeout() {
        std::env::set_var(ENV_JOB_TIMEOUT, "0");
        let result = Config::from_env();
        std::env::remove_var(ENV_JOB_TIMEOUT);

        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }
}
