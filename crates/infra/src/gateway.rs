//! HTTPS submission gateway
//!
//! POSTs the transformed document to the partner endpoint and classifies
//! the response. Only transport-level failures (timeout, connect, DNS)
//! are retried, with exponential backoff; an authentication or API
//! rejection would fail identically on a resend, so those return
//! immediately. Every attempt builds a fresh client, so no pooled
//! connection is reused across attempts or files.

use std::time::Duration;

use async_trait::async_trait;
use porelay_core::SubmissionGateway;
use porelay_domain::constants::{
    OPERATION_NAME, SOAP_ACTION_HEADER, TOKEN_HEADER, XML_CONTENT_TYPE,
};
use porelay_domain::{Document, RelayConfig, SubmissionOutcome, Token};
use tracing::{debug, info, warn};

/// Gateway to the partner's purchase-order endpoint.
pub struct HttpSubmissionGateway {
    endpoint: String,
    timeout: Duration,
    max_attempts: u32,
    base_backoff: Duration,
}

enum Attempt {
    Response { status: u16, body: String },
    Transport { detail: String },
}

impl HttpSubmissionGateway {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        max_attempts: u32,
        base_backoff: Duration,
    ) -> Self {
        Self { endpoint: endpoint.into(), timeout, max_attempts: max_attempts.max(1), base_backoff }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            config.endpoint_url(),
            config.request_timeout(),
            config.http.max_attempts,
            config.retry_backoff(),
        )
    }

    async fn attempt(&self, document: &Document, token: &Token) -> Attempt {
        let client = match reqwest::Client::builder().timeout(self.timeout).no_proxy().build() {
            Ok(client) => client,
            Err(err) => return Attempt::Transport { detail: format!("client setup failed: {err}") },
        };

        let response = client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, XML_CONTENT_TYPE)
            .header(TOKEN_HEADER, &token.value)
            .header(SOAP_ACTION_HEADER, OPERATION_NAME)
            .body(document.content.clone())
            .send()
            .await;

        match response {
            Ok(response) => {
                let status = response.status().as_u16();
                match response.text().await {
                    Ok(body) => Attempt::Response { status, body },
                    Err(err) => {
                        Attempt::Transport { detail: format!("failed to read response body: {err}") }
                    }
                }
            }
            Err(err) => Attempt::Transport { detail: describe_transport_error(&err, self.timeout) },
        }
    }

    fn backoff_delay(&self, retry_number: u32) -> Duration {
        let shift = retry_number.saturating_sub(1).min(8);
        self.base_backoff.saturating_mul(1 << shift)
    }
}

#[async_trait]
impl SubmissionGateway for HttpSubmissionGateway {
    async fn submit(&self, document: &Document, token: &Token) -> SubmissionOutcome {
        let mut last_failure = String::new();

        for attempt in 1..=self.max_attempts {
            debug!(
                endpoint = %self.endpoint,
                attempt,
                max_attempts = self.max_attempts,
                "sending submission request"
            );

            match self.attempt(document, token).await {
                Attempt::Response { status, body } => {
                    info!(endpoint = %self.endpoint, status, attempt, "received response");
                    return classify_response(status, body);
                }
                Attempt::Transport { detail } => {
                    warn!(endpoint = %self.endpoint, attempt, error = %detail, "transport failure");
                    last_failure = detail;
                    if attempt < self.max_attempts {
                        let delay = self.backoff_delay(attempt);
                        debug!(delay_ms = delay.as_millis() as u64, "backing off before retry");
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        warn!(
            endpoint = %self.endpoint,
            attempts = self.max_attempts,
            "retries exhausted, surfacing last network failure"
        );
        SubmissionOutcome::NetworkFailure {
            detail: format!("{last_failure} (after {} attempts)", self.max_attempts),
        }
    }
}

/// Map an HTTP status onto the outcome taxonomy: 2xx success, 401/403
/// authentication, everything else an API failure. Neither failure class
/// is retried.
fn classify_response(status: u16, body: String) -> SubmissionOutcome {
    match status {
        200..=299 => SubmissionOutcome::Success { status, body },
        401 | 403 => SubmissionOutcome::AuthFailure {
            status,
            detail: truncate(&body, 500),
        },
        _ => SubmissionOutcome::ApiFailure {
            status,
            detail: truncate(&body, 500),
        },
    }
}

fn describe_transport_error(err: &reqwest::Error, timeout: Duration) -> String {
    if err.is_timeout() {
        format!("request timed out after {}s", timeout.as_secs())
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        format!("request failed: {err}")
    }
}

fn truncate(body: &str, max: usize) -> String {
    if body.len() <= max {
        body.to_string()
    } else {
        let mut end = max;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::path::PathBuf;

    use chrono::Utc;
    use porelay_domain::DocumentShape;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn document() -> Document {
        Document {
            source_path: PathBuf::from("order.xml"),
            content: "<soapenv:Envelope/>".to_string(),
            shape: DocumentShape::Enveloped,
        }
    }

    fn token() -> Token {
        Token {
            value: "header.payload.signature".to_string(),
            issuer: "acme".to_string(),
            subject: "ACME-1".to_string(),
            expires_at: Utc::now() + chrono::Duration::minutes(5),
        }
    }

    fn gateway(endpoint: &str, timeout_ms: u64, attempts: u32) -> HttpSubmissionGateway {
        HttpSubmissionGateway::new(
            endpoint,
            Duration::from_millis(timeout_ms),
            attempts,
            Duration::from_millis(5),
        )
    }

    #[tokio::test]
    async fn success_captures_the_response_body_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("Content-Type", XML_CONTENT_TYPE))
            .and(header(SOAP_ACTION_HEADER, OPERATION_NAME))
            .and(header(TOKEN_HEADER, "header.payload.signature"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<ack>PO-77421</ack>"))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = gateway(&server.uri(), 1_000, 3).submit(&document(), &token()).await;

        assert_eq!(
            outcome,
            SubmissionOutcome::Success { status: 200, body: "<ack>PO-77421</ack>".to_string() }
        );
    }

    #[tokio::test]
    async fn auth_rejection_is_never_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = gateway(&server.uri(), 1_000, 3).submit(&document(), &token()).await;

        match outcome {
            SubmissionOutcome::AuthFailure { status: 401, detail } => {
                assert!(detail.contains("token expired"));
            }
            other => panic!("expected auth failure, got {other:?}"),
        }
        assert_eq!(server.received_requests().await.expect("requests").len(), 1);
    }

    #[tokio::test]
    async fn forbidden_is_an_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = gateway(&server.uri(), 1_000, 3).submit(&document(), &token()).await;
        assert!(matches!(outcome, SubmissionOutcome::AuthFailure { status: 403, .. }));
    }

    #[tokio::test]
    async fn server_error_is_an_api_failure_and_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = gateway(&server.uri(), 1_000, 3).submit(&document(), &token()).await;

        assert!(matches!(outcome, SubmissionOutcome::ApiFailure { status: 500, .. }));
        assert_eq!(server.received_requests().await.expect("requests").len(), 1);
    }

    #[tokio::test]
    async fn timeout_is_retried_exactly_the_configured_number_of_times() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_delay(Duration::from_millis(250)),
            )
            .expect(3)
            .mount(&server)
            .await;

        let outcome = gateway(&server.uri(), 50, 3).submit(&document(), &token()).await;

        match outcome {
            SubmissionOutcome::NetworkFailure { detail } => {
                assert!(detail.contains("after 3 attempts"), "detail: {detail}");
            }
            other => panic!("expected network failure, got {other:?}"),
        }
        assert_eq!(server.received_requests().await.expect("requests").len(), 3);
    }

    #[tokio::test]
    async fn connection_refused_surfaces_as_network_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener); // release the port so requests fail with ECONNREFUSED

        let outcome =
            gateway(&format!("http://{addr}"), 1_000, 2).submit(&document(), &token()).await;

        assert!(matches!(outcome, SubmissionOutcome::NetworkFailure { .. }), "got {outcome:?}");
    }

    #[test]
    fn backoff_doubles_per_retry() {
        let gateway = gateway("http://localhost", 1_000, 5);
        assert_eq!(gateway.backoff_delay(1), Duration::from_millis(5));
        assert_eq!(gateway.backoff_delay(2), Duration::from_millis(10));
        assert_eq!(gateway.backoff_delay(3), Duration::from_millis(20));
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let body = "x".repeat(2_000);
        match classify_response(500, body) {
            SubmissionOutcome::ApiFailure { detail, .. } => {
                assert!(detail.len() <= 503); // 500 chars + ellipsis
            }
            other => panic!("expected api failure, got {other:?}"),
        }
    }
}
