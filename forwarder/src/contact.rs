use crate::errors::ForwardError;
use crate::fields::{EMAIL, FIRST_NAME, FULL_NAME, LAST_NAME, TAGS};
use md5::{Digest, Md5};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Trims and lower-cases an email address. `None` when nothing is left.
pub fn normalize_email(raw: &str) -> Option<String> {
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Mailchimp's member key: hex MD5 of the lower-cased address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriberHash(String);

impl SubscriberHash {
    /// Normalizes `email` before hashing, so casing and surrounding
    /// whitespace never change the result.
    pub fn for_email(email: &str) -> Self {
        let normalized = email.trim().to_lowercase();
        SubscriberHash(format!("{:x}", Md5::digest(normalized.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accepts `["a", "b"]` or `"a, b"`.
///
/// Entries are trimmed, blanks dropped and duplicates removed keeping the
/// first occurrence. Sequence entries are taken whole, never split on commas.
pub fn parse_tags(value: &Value) -> Vec<String> {
    let candidates: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(tag_text).collect(),
        Value::String(joined) => joined.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

fn tag_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Splits `"Jane Q Public"` into `("Jane", "Q Public")`.
pub fn split_full_name(full_name: &str) -> (String, String) {
    let mut tokens = full_name.split_whitespace();
    let first = tokens.next().unwrap_or_default().to_string();
    let rest = tokens.collect::<Vec<_>>().join(" ");
    (first, rest)
}

/// Configured tag allow-list, matched case-insensitively.
///
/// An empty list lets every tag through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    allowed: HashSet<String>,
}

impl AllowList {
    pub fn new<S: AsRef<str>>(tags: &[S]) -> Self {
        let allowed = tags
            .iter()
            .map(|tag| tag.as_ref().trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect();
        AllowList { allowed }
    }

    pub fn is_restricted(&self) -> bool {
        !self.allowed.is_empty()
    }

    pub fn permits(&self, tag: &str) -> bool {
        !self.is_restricted() || self.allowed.contains(&tag.to_lowercase())
    }

    /// Keeps permitted tags in their original spelling and order.
    pub fn filter(&self, tags: &[String]) -> Vec<String> {
        tags.iter().filter(|tag| self.permits(tag)).cloned().collect()
    }
}

/// A contact extracted from a webhook payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedContact {
    /// Trimmed and lower-cased, never empty
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// De-duplicated in first-seen order, before allow-list filtering
    pub tags: Vec<String>,
}

impl NormalizedContact {
    pub fn from_event(event: &Value) -> Result<Self, ForwardError> {
        let email = EMAIL
            .resolve_text(event)
            .and_then(|raw| normalize_email(&raw))
            .ok_or_else(ForwardError::email_required)?;

        let (fallback_first, fallback_last) = FULL_NAME
            .resolve_text(event)
            .map(|full_name| split_full_name(&full_name))
            .unwrap_or_default();

        Ok(NormalizedContact {
            email,
            first_name: FIRST_NAME.resolve_text(event).unwrap_or(fallback_first),
            last_name: LAST_NAME.resolve_text(event).unwrap_or(fallback_last),
            tags: TAGS.resolve_tags(event),
        })
    }

    pub fn subscriber_hash(&self) -> SubscriberHash {
        SubscriberHash::for_email(&self.email)
    }
}
