use forwarder::config::Config as ForwarderConfig;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub sentry_dsn: String,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(flatten)]
    pub forwarder: ForwarderConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }

    /// Reads `path` when given, then applies overrides from the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;

        Ok(config)
    }

    /// Environment variables take precedence over the file.
    pub fn apply_overrides<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Values from `.env` files and secret mounts often carry a trailing newline
        let trimmed = |name: &str| var(name).map(|value| value.trim().to_string());

        let mailchimp = &mut self.forwarder.mailchimp;
        if let Some(api_key) = trimmed("MAILCHIMP_API_KEY") {
            mailchimp.api_key = api_key;
        }
        if let Some(audience_id) = trimmed("MAILCHIMP_AUDIENCE_ID") {
            mailchimp.audience_id = audience_id;
        }
        if let Some(data_center) = trimmed("MAILCHIMP_DC") {
            mailchimp.data_center = data_center;
        }

        if let Some(tags) = var("ALLOWED_TAGS") {
            self.forwarder.allowed_tags = tags
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(port) = var("PORT") {
            self.forwarder.listener.port = match port.trim().parse() {
                Ok(port) => port,
                Err(_) => return Err(ConfigError::InvalidEnv { name: "PORT", value: port }),
            };
        }

        Ok(())
    }
}

// The DSN carries a project key.
impl std::fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("sentry_dsn", &"<redacted>")
            .finish()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid value {value:?} for environment variable {name}")]
    InvalidEnv { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn full_config() {
        let yaml = r#"
            listener:
                host: 0.0.0.0
                port: 3000
            admin_listener:
                host: 127.0.0.1
                port: 3001
            mailchimp:
                api_key: abc123-us18
                audience_id: aud1
                data_center: us18
                timeout_secs: 5
            allowed_tags: [newsletter]
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            logging:
                sentry_dsn: https://key@sentry.example.com/1
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        assert_eq!(config.forwarder.listener.port, 3000);
        assert_eq!(config.forwarder.mailchimp.data_center, "us18");
        assert_eq!(config.forwarder.mailchimp.timeout_secs, 5);
        assert_eq!(config.forwarder.allowed_tags, vec!["newsletter"]);
        assert_eq!(
            config.common.metrics,
            Some(MetricsConfig {
                statsd_host: "127.0.0.1".into(),
                statsd_port: 8125,
            })
        );
        assert_eq!(
            config.common.logging.expect("logging config").sentry_dsn,
            "https://key@sentry.example.com/1"
        );
        assert!(config.forwarder.validate().is_ok());
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let tmp = write_tmp_file("mailchimp:\n    data_center: us1\n");
        let config = Config::from_file(tmp.path()).expect("load config");

        assert_eq!(config.common, CommonConfig::default());
        assert_eq!(config.forwarder.listener.address(), "0.0.0.0:8080");
        assert_eq!(config.forwarder.admin_listener.address(), "127.0.0.1:8081");
        assert_eq!(
            config.forwarder.mailchimp.missing_fields(),
            vec!["MAILCHIMP_API_KEY", "MAILCHIMP_AUDIENCE_ID"]
        );
    }

    #[test]
    fn missing_file_is_load_error() {
        let err = Config::from_file(Path::new("/nonexistent/bridge.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::LoadError(_)));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let tmp = write_tmp_file("listener: {host: 0.0.0.0, port: nope}");
        let err = Config::from_file(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn environment_overrides_file() {
        let tmp = write_tmp_file(
            r#"
            listener: {host: 0.0.0.0, port: 3000}
            mailchimp: {api_key: from-file, audience_id: aud-file, data_center: us1}
            allowed_tags: [from-file]
            "#,
        );
        let mut config = Config::from_file(tmp.path()).expect("load config");

        config
            .apply_overrides(env(&[
                ("MAILCHIMP_API_KEY", "from-env"),
                ("MAILCHIMP_DC", "us18"),
                ("ALLOWED_TAGS", " newsletter, ,VIP "),
                ("PORT", "9090"),
            ]))
            .expect("apply overrides");

        let forwarder = &config.forwarder;
        assert_eq!(forwarder.mailchimp.api_key, "from-env");
        assert_eq!(forwarder.mailchimp.audience_id, "aud-file");
        assert_eq!(forwarder.mailchimp.data_center, "us18");
        assert_eq!(forwarder.allowed_tags, vec!["newsletter", "VIP"]);
        assert_eq!(forwarder.listener.port, 9090);
    }

    #[test]
    fn credential_overrides_are_trimmed() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                ("MAILCHIMP_API_KEY", "abc123-us18\n"),
                ("MAILCHIMP_AUDIENCE_ID", " aud1 "),
                ("MAILCHIMP_DC", "us18\r\n"),
            ]))
            .expect("apply overrides");

        let mailchimp = &config.forwarder.mailchimp;
        assert_eq!(mailchimp.api_key, "abc123-us18");
        assert_eq!(mailchimp.audience_id, "aud1");
        assert_eq!(mailchimp.data_center, "us18");
        assert!(mailchimp.missing_fields().is_empty());
    }

    #[test]
    fn invalid_port_override() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(env(&[("PORT", "eighty")]))
            .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidEnv { name: "PORT", ref value } if value == "eighty"
        ));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[("MAILCHIMP_API_KEY", "very-secret-us1")]))
            .expect("apply overrides");
        config.common.logging = Some(LoggingConfig {
            sentry_dsn: "https://public-key@sentry.example.com/1".into(),
        });

        let rendered = format!("{config:?}");
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("public-key"));
    }
}
