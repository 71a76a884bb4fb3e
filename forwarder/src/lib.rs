pub mod config;
pub mod contact;
pub mod errors;
pub mod fields;
pub mod forwarding;
pub mod http;
pub mod mailchimp;
pub mod metrics_defs;
pub mod service;

#[cfg(test)]
mod testutils;

pub use errors::{ForwardError, ForwarderError};
pub use forwarding::{ForwardOutcome, Forwarder, ForwarderSettings};

use mailchimp::MailchimpClient;
use service::WebhookService;
use shared::admin_service::AdminService;
use shared::http::run_http_service;

/// Serves webhook deliveries and the admin endpoints until either listener fails.
pub async fn run(config: config::Config) -> Result<(), ForwarderError> {
    config.validate()?;

    let settings = ForwarderSettings::from(&config);
    let ready = settings.is_ready();
    if !ready {
        tracing::warn!(
            missing = ?settings.missing_config(),
            "Mailchimp configuration is incomplete, webhook deliveries will be rejected"
        );
    }

    let forwarder = Forwarder::new(settings, MailchimpClient::new(&config.mailchimp));

    let webhook_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        WebhookService::new(forwarder),
    );
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::<_, ForwarderError>::new(move || ready),
    );

    tokio::try_join!(webhook_task, admin_task)?;
    Ok(())
}
