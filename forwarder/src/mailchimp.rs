//! Outbound Mailchimp Marketing API calls.
//!
//! Two endpoints are used, both keyed by the member's [`SubscriberHash`]:
//!
//! - `PUT /lists/{audience_id}/members/{hash}` creates or fully replaces the
//!   member. `status_if_new` only applies when the member did not exist yet.
//! - `POST /lists/{audience_id}/members/{hash}/tags` marks tags active. Tags
//!   already active stay active, so repeating the call is harmless.
//!
//! Non-2xx responses are not errors at this layer; they are returned as an
//! [`UpstreamResponse`] and the caller decides what they mean.

use crate::config::MailchimpConfig;
use crate::contact::{NormalizedContact, SubscriberHash};
use crate::errors::ForwardError;
use crate::metrics_defs::UPSTREAM_REQUEST_DURATION;
use async_trait::async_trait;
use http::StatusCode;
use http::header::AUTHORIZATION;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use url::Url;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Subscribed,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MergeFields {
    #[serde(rename = "FNAME")]
    pub first_name: String,
    #[serde(rename = "LNAME")]
    pub last_name: String,
}

/// Body of the member upsert. Names are always sent, empty when unknown.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UpsertMember {
    pub email_address: String,
    pub status_if_new: MemberStatus,
    pub merge_fields: MergeFields,
}

impl From<&NormalizedContact> for UpsertMember {
    fn from(contact: &NormalizedContact) -> Self {
        UpsertMember {
            email_address: contact.email.clone(),
            status_if_new: MemberStatus::Subscribed,
            merge_fields: MergeFields {
                first_name: contact.first_name.clone(),
                last_name: contact.last_name.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TagStatus {
    Active,
}

#[derive(Debug, Serialize)]
struct MemberTag<'a> {
    name: &'a str,
    status: TagStatus,
}

#[derive(Debug, Serialize)]
struct MemberTags<'a> {
    tags: Vec<MemberTag<'a>>,
}

impl<'a> MemberTags<'a> {
    fn active(tags: &'a [String]) -> Self {
        MemberTags {
            tags: tags
                .iter()
                .map(|name| MemberTag {
                    name,
                    status: TagStatus::Active,
                })
                .collect(),
        }
    }
}

/// Status and raw body of a completed Mailchimp call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: String,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// The Mailchimp operations the forwarder depends on
#[async_trait]
pub trait MailchimpApi: Send + Sync {
    /// Create-or-replace the member identified by `hash`.
    async fn upsert_member(
        &self,
        hash: &SubscriberHash,
        member: &UpsertMember,
    ) -> Result<UpstreamResponse, ForwardError>;

    /// Mark every tag in `tags` active on the member identified by `hash`.
    async fn add_tags(
        &self,
        hash: &SubscriberHash,
        tags: &[String],
    ) -> Result<UpstreamResponse, ForwardError>;
}

#[async_trait]
impl<T: MailchimpApi + ?Sized> MailchimpApi for Arc<T> {
    async fn upsert_member(
        &self,
        hash: &SubscriberHash,
        member: &UpsertMember,
    ) -> Result<UpstreamResponse, ForwardError> {
        (**self).upsert_member(hash, member).await
    }

    async fn add_tags(
        &self,
        hash: &SubscriberHash,
        tags: &[String],
    ) -> Result<UpstreamResponse, ForwardError> {
        (**self).add_tags(hash, tags).await
    }
}

/// [`MailchimpApi`] over HTTPS
#[derive(Clone)]
pub struct MailchimpClient {
    client: reqwest::Client,
    api_key: String,
    audience_id: String,
    data_center: String,
    base_url: Option<Url>,
    timeout: Duration,
}

impl MailchimpClient {
    pub fn new(config: &MailchimpConfig) -> Self {
        MailchimpClient {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            audience_id: config.audience_id.clone(),
            data_center: config.data_center.clone(),
            base_url: config.base_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `{base}/lists/{audience_id}/members/{hash}` followed by `tail`.
    fn member_url(&self, hash: &SubscriberHash, tail: &[&str]) -> Result<Url, ForwardError> {
        let mut url = match &self.base_url {
            Some(base) => base.clone(),
            None => Url::parse(&format!("https://{}.api.mailchimp.com/3.0", self.data_center))
                .map_err(|e| {
                    ForwardError::Unexpected(format!(
                        "invalid Mailchimp data center {:?}: {e}",
                        self.data_center
                    ))
                })?,
        };

        url.path_segments_mut()
            .map_err(|()| {
                ForwardError::Unexpected("Mailchimp base URL cannot carry a path".to_string())
            })?
            .pop_if_empty()
            .extend(["lists", self.audience_id.as_str(), "members", hash.as_str()])
            .extend(tail);

        Ok(url)
    }

    fn authorization(&self) -> String {
        format!("apikey {}", self.api_key)
    }

    /// Sends `request` and collects the whole body within the configured timeout.
    ///
    /// The connection is released back to the pool once the body has been
    /// read, or dropped when the timeout fires.
    async fn send(
        &self,
        call: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<UpstreamResponse, ForwardError> {
        let started = Instant::now();

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>(UpstreamResponse { status, body })
        };

        let response = timeout(self.timeout, exchange)
            .await
            // Outer error: the timeout elapsed
            .map_err(|_| ForwardError::UpstreamTimeout(call))?
            // Inner error: connection or protocol failure
            .map_err(|e| ForwardError::Unexpected(format!("Mailchimp {call} request failed: {e}")))?;

        let elapsed = started.elapsed();
        shared::histogram!(
            UPSTREAM_REQUEST_DURATION,
            "call" => call,
            "status" => response.status.as_str().to_string()
        )
        .record(elapsed.as_secs_f64());

        tracing::debug!(
            call,
            status = %response.status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Mailchimp responded"
        );

        Ok(response)
    }
}

#[async_trait]
impl MailchimpApi for MailchimpClient {
    async fn upsert_member(
        &self,
        hash: &SubscriberHash,
        member: &UpsertMember,
    ) -> Result<UpstreamResponse, ForwardError> {
        let url = self.member_url(hash, &[])?;
        let request = self
            .client
            .put(url)
            .header(AUTHORIZATION, self.authorization())
            .json(member);

        self.send("upsert", request).await
    }

    async fn add_tags(
        &self,
        hash: &SubscriberHash,
        tags: &[String],
    ) -> Result<UpstreamResponse, ForwardError> {
        let url = self.member_url(hash, &["tags"])?;
        let request = self
            .client
            .post(url)
            .header(AUTHORIZATION, self.authorization())
            .json(&MemberTags::active(tags));

        self.send("tags", request).await
    }
}
