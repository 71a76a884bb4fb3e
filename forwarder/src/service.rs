use crate::errors::{ForwardError, ForwarderError};
use crate::forwarding::{ForwardOutcome, Forwarder};
use crate::http::{json_response, read_json_body};
use crate::mailchimp::MailchimpApi;
use crate::metrics_defs::WEBHOOK_REQUESTS;
use http_body_util::combinators::BoxBody;
use hyper::body::{Body, Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use shared::http::{make_boxed_error_response, make_text_response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub const WEBHOOK_PATH: &str = "/webhooks/ghl-to-mailchimp";
pub const HEALTH_BODY: &str = "OK - Mailchimp X GHL backend running";
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Serialize)]
struct SuccessBody<'a> {
    success: bool,
    #[serde(flatten)]
    outcome: &'a ForwardOutcome,
}

/// Public listener: the CRM webhook endpoint and a plain-text health page
pub struct WebhookService<A> {
    forwarder: Arc<Forwarder<A>>,
}

impl<A: MailchimpApi> WebhookService<A> {
    pub fn new(forwarder: Forwarder<A>) -> Self {
        WebhookService {
            forwarder: Arc::new(forwarder),
        }
    }
}

impl<A> Service<Request<Incoming>> for WebhookService<A>
where
    A: MailchimpApi + 'static,
{
    type Response = Response<BoxBody<Bytes, Self::Error>>;
    type Error = ForwarderError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let forwarder = self.forwarder.clone();
        Box::pin(async move { Ok(route(&forwarder, req).await) })
    }
}

/// Dispatches one request. Every failure is rendered as a response.
pub async fn route<A, B, E>(forwarder: &Forwarder<A>, req: Request<B>) -> Response<BoxBody<Bytes, E>>
where
    A: MailchimpApi,
    B: Body,
    B::Error: std::error::Error + Send + Sync + 'static,
    E: 'static,
{
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/") => make_text_response(StatusCode::OK, HEALTH_BODY),
        (&Method::POST, WEBHOOK_PATH) => handle_webhook(forwarder, req.into_body()).await,
        _ => make_boxed_error_response(StatusCode::NOT_FOUND),
    }
}

async fn handle_webhook<A, B, E>(forwarder: &Forwarder<A>, body: B) -> Response<BoxBody<Bytes, E>>
where
    A: MailchimpApi,
    B: Body,
    B::Error: std::error::Error + Send + Sync + 'static,
    E: 'static,
{
    let result = match read_json_body(body, MAX_BODY_BYTES).await {
        Ok(event) => forwarder.forward(&event).await,
        Err(e) => {
            tracing::warn!(kind = e.kind(), error = %e, "Rejected webhook body");
            Err(e)
        }
    };

    match result {
        Ok(outcome) => {
            shared::counter!(WEBHOOK_REQUESTS, "outcome" => "success").increment(1);
            json_response(
                StatusCode::OK,
                &SuccessBody {
                    success: true,
                    outcome: &outcome,
                },
            )
        }
        Err(e) => error_response(&e),
    }
}

fn error_response<E: 'static>(error: &ForwardError) -> Response<BoxBody<Bytes, E>> {
    shared::counter!(WEBHOOK_REQUESTS, "outcome" => error.kind()).increment(1);
    json_response(error.status_code(), &error.to_body())
}
