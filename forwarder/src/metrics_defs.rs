//! Metrics definitions for the forwarder.

use shared::metrics_defs::{MetricDef, MetricType};

pub const WEBHOOK_REQUESTS: MetricDef = MetricDef {
    name: "webhook.requests",
    metric_type: MetricType::Counter,
    description: "Webhook deliveries handled. Tagged with outcome (success or the error kind).",
};

pub const UPSTREAM_REQUEST_DURATION: MetricDef = MetricDef {
    name: "upstream.request.duration",
    metric_type: MetricType::Histogram,
    description: "Duration of completed Mailchimp calls in seconds. Tagged with call, status.",
};

pub const TAGS_APPLIED: MetricDef = MetricDef {
    name: "tags.applied",
    metric_type: MetricType::Counter,
    description: "Number of tags marked active on Mailchimp members",
};

pub const TAGS_FILTERED: MetricDef = MetricDef {
    name: "tags.filtered",
    metric_type: MetricType::Counter,
    description: "Number of inbound tags dropped by the allow-list",
};

pub const ALL_METRICS: &[MetricDef] = &[
    WEBHOOK_REQUESTS,
    UPSTREAM_REQUEST_DURATION,
    TAGS_APPLIED,
    TAGS_FILTERED,
];
