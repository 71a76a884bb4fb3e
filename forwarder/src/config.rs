use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Mailchimp timeout cannot be 0")]
    InvalidTimeout,

    #[error("Webhook and admin listeners share the address {0}")]
    ListenerCollision(String),
}

/// Forwarder configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Listener for webhook deliveries
    pub listener: Listener,
    /// Admin listener for liveness and readiness checks
    pub admin_listener: Listener,
    /// Mailchimp credentials and client tuning
    pub mailchimp: MailchimpConfig,
    /// Tags allowed through to Mailchimp. Empty allows every tag.
    pub allowed_tags: Vec<String>,
}

impl Config {
    /// Validates the parts of the configuration that make startup impossible.
    ///
    /// Missing Mailchimp credentials are not an error here. They surface as a
    /// failing readiness check and as 500s on the webhook endpoint.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.listener == self.admin_listener {
            return Err(ValidationError::ListenerCollision(self.listener.address()));
        }

        if self.mailchimp.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listener: Listener::default(),
            admin_listener: Listener::admin(),
            mailchimp: MailchimpConfig::default(),
            allowed_tags: Vec::new(),
        }
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    fn admin() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 8081,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validates the listener configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

#[derive(Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct MailchimpConfig {
    pub api_key: String,
    /// Audience (list) id members are upserted into
    pub audience_id: String,
    /// Regional prefix of the API host, e.g. `us18`
    pub data_center: String,
    /// Upper bound for each outbound call, body included
    pub timeout_secs: u64,
    /// Replaces `https://{data_center}.api.mailchimp.com/3.0`. Only useful for
    /// pointing the client at a test double.
    pub base_url: Option<Url>,
}

impl MailchimpConfig {
    /// Names of the required settings that are empty, spelled as the
    /// environment variables that provide them.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("MAILCHIMP_API_KEY", &self.api_key),
            ("MAILCHIMP_AUDIENCE_ID", &self.audience_id),
            ("MAILCHIMP_DC", &self.data_center),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

impl Default for MailchimpConfig {
    fn default() -> Self {
        MailchimpConfig {
            api_key: String::new(),
            audience_id: String::new(),
            data_center: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            base_url: None,
        }
    }
}

// Keeps the API key out of logs and panics.
impl std::fmt::Debug for MailchimpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailchimpConfig")
            .field("api_key", &redact(&self.api_key))
            .field("audience_id", &self.audience_id)
            .field("data_center", &self.data_center)
            .field("timeout_secs", &self.timeout_secs)
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "<unset>" } else { "<redacted>" }
}
