//! Alias table for inbound webhook fields.
//!
//! CRM webhooks deliver the same attribute under different spellings depending
//! on how the workflow was configured: snake_case, camelCase, Mailchimp merge
//! field style, or nested under `contact`. Each canonical [`Field`] lists the
//! spellings it accepts in priority order; the first alias holding a usable
//! value wins. Dotted aliases walk nested objects.

use crate::contact::parse_tags;
use serde_json::Value;

/// A canonical inbound field and the paths it may arrive under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

pub const EMAIL: Field = Field {
    name: "email",
    aliases: &["email", "Email", "contact.email"],
};

pub const FIRST_NAME: Field = Field {
    name: "first_name",
    aliases: &[
        "first_name",
        "firstName",
        "FNAME",
        "fname",
        "contact.first_name",
        "contact.firstName",
    ],
};

pub const LAST_NAME: Field = Field {
    name: "last_name",
    aliases: &[
        "last_name",
        "lastName",
        "LNAME",
        "lname",
        "contact.last_name",
        "contact.lastName",
    ],
};

/// Only consulted when first or last name are missing
pub const FULL_NAME: Field = Field {
    name: "full_name",
    aliases: &[
        "full_name",
        "fullName",
        "contact.full_name",
        "contact.fullName",
    ],
};

pub const TAGS: Field = Field {
    name: "tags",
    aliases: &["apply_tags", "applyTags", "tags", "tag", "contact.tags"],
};

impl Field {
    /// Values present under any alias, highest priority first.
    pub fn values(self, event: &Value) -> impl Iterator<Item = &Value> {
        self.aliases
            .iter()
            .filter_map(move |alias| lookup(event, alias))
    }

    /// First alias holding non-blank text, trimmed.
    pub fn resolve_text(self, event: &Value) -> Option<String> {
        self.values(event).find_map(text_value)
    }

    /// First alias that yields at least one tag.
    pub fn resolve_tags(self, event: &Value) -> Vec<String> {
        self.values(event)
            .map(parse_tags)
            .find(|tags| !tags.is_empty())
            .unwrap_or_default()
    }
}

/// Resolves a dotted path such as `contact.email` against nested objects.
pub fn lookup<'a>(event: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(event, |value, segment| value.as_object()?.get(segment))
}

fn text_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_nested_paths() {
        let event = json!({"contact": {"email": "a@b.co", "meta": {"id": 7}}});

        assert_eq!(lookup(&event, "contact.email"), Some(&json!("a@b.co")));
        assert_eq!(lookup(&event, "contact.meta.id"), Some(&json!(7)));
        assert_eq!(lookup(&event, "contact.missing"), None);
        // Walking through a non-object stops the lookup
        assert_eq!(lookup(&event, "contact.email.domain"), None);
    }

    #[test]
    fn test_alias_priority() {
        let event = json!({
            "contact": {"email": "nested@example.com"},
            "Email": "upper@example.com",
        });
        assert_eq!(
            EMAIL.resolve_text(&event).as_deref(),
            Some("upper@example.com")
        );

        let event = json!({
            "email": "top@example.com",
            "Email": "upper@example.com",
        });
        assert_eq!(EMAIL.resolve_text(&event).as_deref(), Some("top@example.com"));
    }

    #[test]
    fn test_blank_values_fall_through() {
        let event = json!({
            "first_name": "   ",
            "firstName": null,
            "FNAME": "Ada",
        });
        assert_eq!(FIRST_NAME.resolve_text(&event).as_deref(), Some("Ada"));
    }

    #[test]
    fn test_every_name_alias_is_reachable() {
        for alias in FIRST_NAME.aliases {
            let event = match alias.split_once('.') {
                Some((parent, child)) => json!({ parent: { child: "Grace" } }),
                None => json!({ *alias: "Grace" }),
            };

            assert_eq!(
                FIRST_NAME.resolve_text(&event).as_deref(),
                Some("Grace"),
                "alias {alias} was not resolved"
            );
        }
    }

    #[test]
    fn test_numbers_are_rendered_as_text() {
        let event = json!({"lname": 42});
        assert_eq!(LAST_NAME.resolve_text(&event).as_deref(), Some("42"));
    }

    #[test]
    fn test_non_object_event_resolves_nothing() {
        for event in [json!(null), json!("email"), json!(["email"]), json!(3)] {
            assert_eq!(EMAIL.resolve_text(&event), None);
            assert!(TAGS.resolve_tags(&event).is_empty());
        }
    }

    #[test]
    fn test_tags_skip_aliases_without_usable_tags() {
        let event = json!({
            "apply_tags": "",
            "applyTags": [" ", ""],
            "tags": "newsletter, vip",
            "contact": {"tags": ["ignored"]},
        });
        assert_eq!(TAGS.resolve_tags(&event), vec!["newsletter", "vip"]);

        let event = json!({"contact": {"tags": ["from-contact"]}});
        assert_eq!(TAGS.resolve_tags(&event), vec!["from-contact"]);
    }
}
