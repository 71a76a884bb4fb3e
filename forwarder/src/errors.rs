use crate::fields::EMAIL;
use hyper::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Errors that end a single webhook delivery
#[derive(Error, Debug)]
pub enum ForwardError {
    /// The payload cannot be turned into a contact
    #[error("{0}")]
    Validation(String),

    #[error("Failed to read request body: {0}")]
    InvalidBody(String),

    #[error("Request body exceeds {0} bytes")]
    BodyTooLarge(usize),

    /// Required Mailchimp settings are empty
    #[error("Missing Mailchimp configuration: {}", .0.join(", "))]
    Config(Vec<&'static str>),

    #[error("Mailchimp upsert failed with status {status}")]
    Upsert { status: u16, body: String },

    /// The member was upserted but tagging it failed. The upsert is left in place.
    #[error("Mailchimp tag apply failed with status {status}")]
    Tag { status: u16, body: String },

    #[error("Mailchimp {0} request timed out")]
    UpstreamTimeout(&'static str),

    #[error("Internal error: {0}")]
    Unexpected(String),
}

/// JSON body returned to the webhook caller on failure
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    pub details: String,
}

impl ForwardError {
    pub fn email_required() -> Self {
        ForwardError::Validation(format!("{} is required", EMAIL.name))
    }

    /// Caller-fixable failures map to 400, operator-side ones to 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ForwardError::Validation(_)
            | ForwardError::InvalidBody(_)
            | ForwardError::Upsert { .. }
            | ForwardError::Tag { .. } => StatusCode::BAD_REQUEST,
            ForwardError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ForwardError::Config(_)
            | ForwardError::UpstreamTimeout(_)
            | ForwardError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for metric tags and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::Validation(_) => "validation",
            ForwardError::InvalidBody(_) => "invalid_body",
            ForwardError::BodyTooLarge(_) => "body_too_large",
            ForwardError::Config(_) => "config",
            ForwardError::Upsert { .. } => "upsert",
            ForwardError::Tag { .. } => "tag",
            ForwardError::UpstreamTimeout(_) => "timeout",
            ForwardError::Unexpected(_) => "unexpected",
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let (error, details) = match self {
            ForwardError::Validation(message) => (
                message.clone(),
                format!("provide one of: {}", EMAIL.aliases.join(", ")),
            ),
            ForwardError::InvalidBody(reason) => ("invalid JSON body".to_string(), reason.clone()),
            ForwardError::BodyTooLarge(limit) => (
                "request body too large".to_string(),
                format!("limit is {limit} bytes"),
            ),
            ForwardError::Config(missing) => (
                "Missing Mailchimp configuration".to_string(),
                missing.join(", "),
            ),
            // Upstream bodies are passed through verbatim for diagnosis
            ForwardError::Upsert { body, .. } | ForwardError::Tag { body, .. } => {
                (self.to_string(), body.clone())
            }
            ForwardError::UpstreamTimeout(_) => {
                (self.to_string(), "no response within the configured timeout".to_string())
            }
            ForwardError::Unexpected(message) => ("Server error".to_string(), message.clone()),
        };

        ErrorBody { error, details }
    }
}

/// Errors that stop the service itself
#[derive(Error, Debug)]
pub enum ForwarderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] crate::config::ValidationError),
}
