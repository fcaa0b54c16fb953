//! End-to-end scenarios through the CLI entry point: a real config file,
//! real directories, the RS256 signer over the fixture key, and a mock
//! partner endpoint.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use porelay_cli::{run, Cli};
use tempfile::TempDir;
use wiremock::matchers::{body_string, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRIVATE_KEY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/test_key.pem");

const BARE_PO: &str = "<DistiPODataRq><DistiPONumber>PO-31337</DistiPONumber></DistiPODataRq>";

struct Workspace {
    root: TempDir,
    config_path: PathBuf,
}

impl Workspace {
    /// Lay out directories and a config file pointing at `endpoint`.
    fn new(endpoint: &str, key_path: &str, timeout_seconds: u64, max_attempts: u32) -> Self {
        std::env::remove_var("PORELAY_ENVIRONMENT");

        let root = tempfile::tempdir().expect("tempdir");
        let contents = format!(
            r#"
environment = "uat"

[api.uat]
url = "{endpoint}"

[api.production]
url = "https://partner.example/ws"

[token]
issuer = "acme-integrations"
customer_id = "ACME-0042"
private_key_path = "{key_path}"

[paths]
input = "{base}/input"
output = "{base}/output"
archive_success = "{base}/archive/success"
archive_error = "{base}/archive/error"

[http]
timeout_seconds = {timeout_seconds}
max_attempts = {max_attempts}
retry_backoff_seconds = 0
"#,
            base = root.path().display(),
        );

        let config_path = root.path().join("porelay.toml");
        std::fs::write(&config_path, contents).expect("write config");
        Workspace { root, config_path }
    }

    fn drop_input(&self, name: &str, content: &str) -> PathBuf {
        let input_dir = self.root.path().join("input");
        std::fs::create_dir_all(&input_dir).expect("create input dir");
        let path = input_dir.join(name);
        std::fs::write(&path, content).expect("write input");
        path
    }

    async fn process(&self, input: &Path) -> i32 {
        let cli = Cli::parse_from([
            "porelay",
            "--config",
            self.config_path.to_str().expect("utf-8 path"),
            "process",
            "--input",
            input.to_str().expect("utf-8 path"),
        ]);
        run(cli).await
    }

    fn entries(&self, relative: &str) -> Vec<String> {
        let dir = self.root.path().join(relative);
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|entries| {
                entries.flatten().map(|e| e.file_name().to_string_lossy().into_owned()).collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

#[tokio::test]
async fn bare_document_is_wrapped_submitted_and_archived_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("Content-Type", "text/xml"))
        .and(header("SOAPAction", "GetPurchaseOrder"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<ack>PO-31337</ack>"))
        .expect(1)
        .mount(&server)
        .await;

    let workspace = Workspace::new(&server.uri(), PRIVATE_KEY, 5, 3);
    let input = workspace.drop_input("order.xml", BARE_PO);

    let code = workspace.process(&input).await;

    assert_eq!(code, 0);
    assert!(!input.exists(), "input file was claimed and moved");

    let archived = workspace.entries("archive/success");
    assert_eq!(archived.len(), 1, "archived: {archived:?}");
    assert!(archived[0].starts_with("order_") && archived[0].ends_with(".xml"));
    assert!(workspace.entries("archive/error").is_empty());

    let responses = workspace.entries("output");
    assert_eq!(responses, ["response_PO-31337.xml"]);
    let body = std::fs::read_to_string(
        workspace.root.path().join("output").join(&responses[0]),
    )
    .expect("read response");
    assert_eq!(body, "<ack>PO-31337</ack>");

    // The request carried a signed compact token.
    let requests = server.received_requests().await.expect("requests");
    let jwt = requests[0].headers.get("x-frontline-jwt").expect("token header");
    assert_eq!(jwt.to_str().expect("ascii").split('.').count(), 3);
}

#[tokio::test]
async fn already_enveloped_document_is_submitted_byte_identical() {
    let enveloped = concat!(
        "<soap:Envelope xmlns:soap=\"http://schemas.xmlsoap.org/soap/envelope/\">\n",
        "  <soap:Body><Existing>payload</Existing></soap:Body>\n",
        "</soap:Envelope>",
    );

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string(enveloped))
        .respond_with(ResponseTemplate::new(200).set_body_string("<ack/>"))
        .expect(1)
        .mount(&server)
        .await;

    let workspace = Workspace::new(&server.uri(), PRIVATE_KEY, 5, 3);
    let input = workspace.drop_input("wrapped.xml", enveloped);

    let code = workspace.process(&input).await;

    assert_eq!(code, 0, "an enveloped document must pass through unchanged");
    assert_eq!(workspace.entries("archive/success").len(), 1);
}

#[tokio::test]
async fn auth_rejection_exits_two_without_retrying() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("signature rejected"))
        .expect(1)
        .mount(&server)
        .await;

    let workspace = Workspace::new(&server.uri(), PRIVATE_KEY, 5, 3);
    let input = workspace.drop_input("order.xml", BARE_PO);

    let code = workspace.process(&input).await;

    assert_eq!(code, 2);
    assert_eq!(server.received_requests().await.expect("requests").len(), 1);

    let entries = workspace.entries("archive/error");
    let sidecar = entries.iter().find(|n| n.ends_with(".error.txt")).expect("sidecar");
    let detail = std::fs::read_to_string(
        workspace.root.path().join("archive/error").join(sidecar),
    )
    .expect("read sidecar");
    assert!(detail.contains("AuthFailure"), "detail: {detail}");
    assert!(detail.contains("signature rejected"), "detail: {detail}");
}

#[tokio::test]
async fn persistent_timeouts_exhaust_retries_and_exit_four() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .expect(2)
        .mount(&server)
        .await;

    let workspace = Workspace::new(&server.uri(), PRIVATE_KEY, 1, 2);
    let input = workspace.drop_input("order.xml", BARE_PO);

    let code = workspace.process(&input).await;

    assert_eq!(code, 4);
    assert_eq!(server.received_requests().await.expect("requests").len(), 2);
    assert_eq!(workspace.entries("archive/error").len(), 2, "archived file plus sidecar");
    assert!(workspace.entries("archive/success").is_empty());
}

#[tokio::test]
async fn missing_signing_key_fails_before_any_network_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let workspace = Workspace::new(&server.uri(), "/nonexistent/signing.pem", 5, 3);
    let input = workspace.drop_input("order.xml", BARE_PO);

    let code = workspace.process(&input).await;

    assert_eq!(code, 2, "a key failure is an authentication failure");
    assert!(server.received_requests().await.expect("requests").is_empty());

    let entries = workspace.entries("archive/error");
    assert_eq!(entries.len(), 2, "archived file plus sidecar: {entries:?}");
    let sidecar = entries.iter().find(|n| n.ends_with(".error.txt")).expect("sidecar");
    let detail = std::fs::read_to_string(
        workspace.root.path().join("archive/error").join(sidecar),
    )
    .expect("read sidecar");
    assert!(detail.contains("AuthFailure"), "detail: {detail}");
}
