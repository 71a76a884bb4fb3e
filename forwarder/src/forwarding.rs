use crate::config::{Config, MailchimpConfig};
use crate::contact::{AllowList, NormalizedContact, SubscriberHash};
use crate::errors::ForwardError;
use crate::mailchimp::{MailchimpApi, UpsertMember};
use crate::metrics_defs::{TAGS_APPLIED, TAGS_FILTERED};
use serde::Serialize;
use serde_json::Value;

/// Immutable inputs of the forwarding operation, fixed at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwarderSettings {
    missing_config: Vec<&'static str>,
    allow_list: AllowList,
}

impl ForwarderSettings {
    pub fn new<S: AsRef<str>>(mailchimp: &MailchimpConfig, allowed_tags: &[S]) -> Self {
        ForwarderSettings {
            missing_config: mailchimp.missing_fields(),
            allow_list: AllowList::new(allowed_tags),
        }
    }

    /// True when every required Mailchimp setting is present.
    pub fn is_ready(&self) -> bool {
        self.missing_config.is_empty()
    }

    pub fn missing_config(&self) -> &[&'static str] {
        &self.missing_config
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }
}

impl From<&Config> for ForwarderSettings {
    fn from(config: &Config) -> Self {
        ForwarderSettings::new(&config.mailchimp, config.allowed_tags.as_slice())
    }
}

/// What a successful delivery did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardOutcome {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Tags sent to Mailchimp, after allow-list filtering
    pub applied_tags: Vec<String>,
    #[serde(skip)]
    pub subscriber_hash: SubscriberHash,
}

/// Turns webhook payloads into Mailchimp member updates
pub struct Forwarder<A> {
    settings: ForwarderSettings,
    api: A,
}

impl<A: MailchimpApi> Forwarder<A> {
    pub fn new(settings: ForwarderSettings, api: A) -> Self {
        Forwarder { settings, api }
    }

    pub fn settings(&self) -> &ForwarderSettings {
        &self.settings
    }

    /// Upserts the contact carried by `event`, then applies its tags.
    ///
    /// The tag call is only made after the upsert succeeded and only when
    /// tags survive the allow-list. A failed tag call is reported as
    /// [`ForwardError::Tag`]; the member stays upserted.
    pub async fn forward(&self, event: &Value) -> Result<ForwardOutcome, ForwardError> {
        let result = self.upsert_and_tag(event).await;

        match &result {
            Ok(outcome) => tracing::info!(
                subscriber_hash = %outcome.subscriber_hash,
                applied_tags = ?outcome.applied_tags,
                "Forwarded contact to Mailchimp"
            ),
            Err(e) if e.status_code().is_client_error() => tracing::warn!(
                kind = e.kind(),
                error = %e,
                details = %e.to_body().details,
                "Rejected webhook"
            ),
            Err(e) => tracing::error!(
                kind = e.kind(),
                error = %e,
                details = %e.to_body().details,
                "Failed to forward webhook"
            ),
        }

        result
    }

    async fn upsert_and_tag(&self, event: &Value) -> Result<ForwardOutcome, ForwardError> {
        if !self.settings.is_ready() {
            return Err(ForwardError::Config(self.settings.missing_config.clone()));
        }

        let contact = NormalizedContact::from_event(event)?;
        let subscriber_hash = contact.subscriber_hash();

        let applied_tags = self.settings.allow_list.filter(&contact.tags);
        let filtered = contact.tags.len() - applied_tags.len();
        if filtered > 0 {
            tracing::debug!(
                %subscriber_hash,
                filtered,
                "Dropped tags not on the allow-list"
            );
            shared::counter!(TAGS_FILTERED).increment(filtered as u64);
        }

        let upserted = self
            .api
            .upsert_member(&subscriber_hash, &UpsertMember::from(&contact))
            .await?;
        if !upserted.is_success() {
            return Err(ForwardError::Upsert {
                status: upserted.status.as_u16(),
                body: upserted.body,
            });
        }

        if !applied_tags.is_empty() {
            let tagged = self.api.add_tags(&subscriber_hash, &applied_tags).await?;
            if !tagged.is_success() {
                return Err(ForwardError::Tag {
                    status: tagged.status.as_u16(),
                    body: tagged.body,
                });
            }
            shared::counter!(TAGS_APPLIED).increment(applied_tags.len() as u64);
        }

        Ok(ForwardOutcome {
            email: contact.email,
            first_name: contact.first_name,
            last_name: contact.last_name,
            applied_tags,
            subscriber_hash,
        })
    }
}
