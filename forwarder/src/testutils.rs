use crate::config::MailchimpConfig;
use crate::contact::SubscriberHash;
use crate::errors::ForwardError;
use crate::forwarding::ForwarderSettings;
use crate::mailchimp::{MailchimpApi, UpsertMember, UpstreamResponse};
use async_trait::async_trait;
use http::StatusCode;
use std::sync::Mutex;

pub fn complete_mailchimp_config() -> MailchimpConfig {
    MailchimpConfig {
        api_key: "test-key-us1".into(),
        audience_id: "aud123".into(),
        data_center: "us1".into(),
        ..Default::default()
    }
}

pub fn test_settings(allowed_tags: &[&str]) -> ForwarderSettings {
    ForwarderSettings::new(&complete_mailchimp_config(), allowed_tags)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Upsert {
        hash: SubscriberHash,
        member: UpsertMember,
    },
    AddTags {
        hash: SubscriberHash,
        tags: Vec<String>,
    },
}

/// In-memory [`MailchimpApi`] that records every call and answers with
/// fixed statuses.
pub struct RecordingApi {
    upsert_status: StatusCode,
    tags_status: StatusCode,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingApi {
    pub fn ok() -> Self {
        Self::with_statuses(StatusCode::OK, StatusCode::NO_CONTENT)
    }

    pub fn with_statuses(upsert_status: StatusCode, tags_status: StatusCode) -> Self {
        RecordingApi {
            upsert_status,
            tags_status,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn upsert_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RecordedCall::Upsert { .. }))
            .count()
    }

    pub fn tag_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, RecordedCall::AddTags { .. }))
            .count()
    }

    fn respond(status: StatusCode) -> UpstreamResponse {
        UpstreamResponse {
            status,
            body: format!(r#"{{"status":{}}}"#, status.as_u16()),
        }
    }
}

#[async_trait]
impl MailchimpApi for RecordingApi {
    async fn upsert_member(
        &self,
        hash: &SubscriberHash,
        member: &UpsertMember,
    ) -> Result<UpstreamResponse, ForwardError> {
        self.calls.lock().unwrap().push(RecordedCall::Upsert {
            hash: hash.clone(),
            member: member.clone(),
        });
        Ok(Self::respond(self.upsert_status))
    }

    async fn add_tags(
        &self,
        hash: &SubscriberHash,
        tags: &[String],
    ) -> Result<UpstreamResponse, ForwardError> {
        self.calls.lock().unwrap().push(RecordedCall::AddTags {
            hash: hash.clone(),
            tags: tags.to_vec(),
        });
        Ok(Self::respond(self.tags_status))
    }
}
