//! Transport behaviour against real sockets.

use crate::integration::mock_server::{
    closed_port, delayed_server, init_tracing, localhost_certificate, response_head,
    scripted_server, staged_server, tls_server, MockServerFixture,
};
use groonga_client::config::{default_user_agent, VerifyMode};
use groonga_client::transport::SynchronousTransport;
use groonga_client::{Client, ClientOptions, Command, Error, Parameters, TransportError};
use mockito::Matcher;
use std::time::Duration;

fn params(pairs: &[(&str, &str)]) -> Parameters {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn transport(base_url: &str) -> SynchronousTransport {
    SynchronousTransport::new(&ClientOptions {
        url: base_url.to_string(),
        ..ClientOptions::default()
    })
    .expect("transport")
}

fn send_raw(transport: &SynchronousTransport, command: &Command) -> groonga_client::Result<String> {
    let mut delivered = Vec::new();
    transport.send(command, |body| delivered.push(body))?;
    assert_eq!(delivered.len(), 1, "callback must run exactly once");
    Ok(delivered.remove(0))
}

#[test]
fn get_carries_parameters_in_query() {
    let mut fixture = MockServerFixture::new();
    let mock = fixture
        .server
        .mock("GET", "/d/select")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("table".into(), "Users".into()),
            Matcher::UrlEncoded("query".into(), "name:@alice".into()),
        ]))
        .match_header("user-agent", default_user_agent().as_str())
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body("[[0,1,1]]")
        .create();

    let command = Command::new("select", params(&[("table", "Users"), ("query", "name:@alice")]));
    let body = send_raw(&transport(&fixture.base_url), &command).unwrap();
    assert_eq!(body, "[[0,1,1]]");
    mock.assert();
}

#[test]
fn bad_request_body_is_delivered() {
    let mut fixture = MockServerFixture::new();
    let mock = fixture.mock_response("GET", "/d/select", 400, "[[[-22,1,1]]]");

    let command = Command::new("select", Parameters::new());
    let body = send_raw(&transport(&fixture.base_url), &command).unwrap();
    assert_eq!(body, "[[[-22,1,1]]]");
    mock.assert();
}

#[test]
fn not_found_is_a_protocol_error() {
    let mut fixture = MockServerFixture::new();
    let _mock = fixture.mock_response("GET", "/d/nonexistent", 404, "not found");

    let command = Command::new("nonexistent", Parameters::new());
    let err = send_raw(&transport(&fixture.base_url), &command).unwrap_err();
    match &err {
        Error::Protocol(protocol) => {
            assert_eq!(protocol.status, 404);
            assert_eq!(protocol.body, "not found");
        }
        other => panic!("expected protocol error, got {:?}", other),
    }
    assert_eq!(err.to_string(), "404 Not Found: not found");
}

#[test]
fn server_error_with_envelope_prefix_is_delivered() {
    // Known false positive of the "[[" rule: a 500 page shaped like an array passes.
    let mut fixture = MockServerFixture::new();
    let _mock = fixture.mock_response("GET", "/d/status", 500, "[[error]]");

    let command = Command::new("status", Parameters::new());
    let body = send_raw(&transport(&fixture.base_url), &command).unwrap();
    assert_eq!(body, "[[error]]");
}

#[test]
fn server_error_without_envelope_is_a_protocol_error() {
    let mut fixture = MockServerFixture::new();
    let _mock = fixture.mock_response("GET", "/d/status", 500, "boom");

    let err = send_raw(&transport(&fixture.base_url), &Command::new("status", Parameters::new()))
        .unwrap_err();
    assert_eq!(err.to_string(), "500 Internal Server Error: boom");
}

#[test]
fn base_path_prefixes_command_path() {
    let mut fixture = MockServerFixture::new();
    let mock = fixture.mock_response("GET", "/groonga/d/status", 200, "[[0,1,1],{}]");

    let transport = transport(&format!("{}/groonga/", fixture.base_url));
    send_raw(&transport, &Command::new("status", Parameters::new())).unwrap();
    mock.assert();
}

#[test]
fn load_sends_values_as_sized_json_body() {
    let mut fixture = MockServerFixture::new();
    let payload = r#"[{"_key":"alice"},{"_key":"bob"}]"#;
    let mock = fixture
        .server
        .mock("POST", "/d/load")
        .match_query(Matcher::Exact("table=Users".into()))
        .match_header("content-type", "application/json")
        .match_header("content-length", payload.len().to_string().as_str())
        .match_body(payload)
        .with_status(200)
        .with_body("[[0,1,1],2]")
        .create();

    let command = Command::new("load", params(&[("table", "Users"), ("values", payload)]));
    let body = send_raw(&transport(&fixture.base_url), &command).unwrap();
    assert_eq!(body, "[[0,1,1],2]");
    mock.assert();
}

#[test]
fn load_uses_chunked_encoding_when_requested() {
    let mut fixture = MockServerFixture::new();
    let payload = r#"[{"_key":"alice"}]"#;
    let mock = fixture
        .server
        .mock("POST", "/d/load")
        .match_query(Matcher::Exact("table=Users".into()))
        .match_header("transfer-encoding", "chunked")
        .match_header("content-length", Matcher::Missing)
        .match_body(payload)
        .with_status(200)
        .with_body("[[0,1,1],1]")
        .create();

    let transport = SynchronousTransport::new(&ClientOptions {
        url: fixture.base_url.clone(),
        chunk: true,
        ..ClientOptions::default()
    })
    .unwrap();
    let command = Command::new("load", params(&[("table", "Users"), ("values", payload)]));
    send_raw(&transport, &command).unwrap();
    mock.assert();
}

#[test]
fn embedded_credentials_become_basic_auth() {
    let mut fixture = MockServerFixture::new();
    let expected = format!(
        "Basic {}",
        base64::Engine::encode(&base64::engine::general_purpose::STANDARD, "us@er:p:ss")
    );
    let mock = fixture
        .server
        .mock("GET", "/d/status")
        .match_query(Matcher::Any)
        .match_header("authorization", expected.as_str())
        .with_status(200)
        .with_body("[[0,1,1],{}]")
        .create();

    let url = fixture.base_url.replacen("http://", "http://us%40er:p%3Ass@", 1);
    send_raw(&transport(&url), &Command::new("status", Parameters::new())).unwrap();
    mock.assert();
}

#[test]
fn plus_in_userinfo_decodes_to_space() {
    let mut fixture = MockServerFixture::new();
    let mock = fixture
        .server
        .mock("GET", "/d/status")
        .match_query(Matcher::Any)
        .match_header("authorization", "Basic YSBiOmMgZA==")
        .with_status(200)
        .with_body("[[0,1,1],{}]")
        .create();

    let url = fixture.base_url.replacen("http://", "http://a+b:c+d@", 1);
    send_raw(&transport(&url), &Command::new("status", Parameters::new())).unwrap();
    mock.assert();
}

#[test]
fn missing_reason_phrase_reads_unknown() {
    init_tracing();
    let (addr, server) = staged_server("HTTP/1.1 599 ", Duration::ZERO, &["boom"]);

    let err = send_raw(
        &transport(&format!("http://{}", addr)),
        &Command::new("status", Parameters::new()),
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "599 Unknown: boom");
    server.join().unwrap();
}

#[test]
fn steady_response_outlasting_read_timeout_completes() {
    init_tracing();
    // Every write is preceded by 150ms: 450ms in total, but no single read
    // waits for the 250ms limit.
    let (addr, server) = staged_server(
        "HTTP/1.1 200 OK",
        Duration::from_millis(150),
        &["[[0,1.0,0.1],", "true]"],
    );
    let client = Client::builder()
        .url(format!("http://{}", addr))
        .read_timeout(0.25)
        .build()
        .unwrap();

    let response = client.execute("status", &Parameters::new()).unwrap();
    assert!(response.success());
    assert_eq!(response.body, serde_json::Value::Bool(true));
    server.join().unwrap();
}

#[test]
fn stall_between_body_parts_surfaces_as_timeout() {
    init_tracing();
    let first = "[[0,1.0,0.1],";
    let rest = "true]";
    let (addr, server) = scripted_server(vec![
        (
            Duration::ZERO,
            format!("{}{}", response_head("HTTP/1.1 200 OK", first.len() + rest.len()), first),
        ),
        (Duration::from_millis(800), rest.to_string()),
    ]);
    let client = Client::builder()
        .url(format!("http://{}", addr))
        .read_timeout(0.25)
        .build()
        .unwrap();

    let err = client.execute("status", &Parameters::new()).unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got {:?}", err);
    server.join().unwrap();
}

#[test]
fn verify_none_accepts_self_signed_server() {
    init_tracing();
    let certificate = localhost_certificate();
    let (addr, server) = tls_server(&certificate);
    let client = Client::builder()
        .url(format!("https://localhost:{}", addr.port()))
        .verify_mode(VerifyMode::None)
        .read_timeout(5.0)
        .build()
        .unwrap();

    let response = client.execute("status", &Parameters::new()).unwrap();
    assert!(response.success());
    server.join().unwrap();
}

#[test]
fn ca_file_trusts_self_signed_server() {
    init_tracing();
    let certificate = localhost_certificate();
    let dir = tempfile::tempdir().unwrap();
    let ca_file = dir.path().join("ca.pem");
    std::fs::write(&ca_file, certificate.cert.pem()).unwrap();
    let (addr, server) = tls_server(&certificate);
    let client = Client::builder()
        .url(format!("https://localhost:{}", addr.port()))
        .verify_mode(VerifyMode::Peer)
        .ca_file(&ca_file)
        .read_timeout(5.0)
        .build()
        .unwrap();

    let response = client.execute("status", &Parameters::new()).unwrap();
    assert!(response.success());
    server.join().unwrap();
}

#[test]
fn peer_verification_rejects_unknown_issuer() {
    init_tracing();
    let certificate = localhost_certificate();
    let (addr, server) = tls_server(&certificate);
    let client = Client::builder()
        .url(format!("https://localhost:{}", addr.port()))
        .read_timeout(5.0)
        .build()
        .unwrap();

    let err = client.execute("status", &Parameters::new()).unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "expected transport error, got {:?}", err);
    assert!(!err.is_timeout());
    server.join().unwrap();
}

#[test]
fn stalled_read_surfaces_as_timeout() {
    init_tracing();
    let (addr, server) = delayed_server(Duration::from_secs(2));
    let client = Client::builder()
        .url(format!("http://{}", addr))
        .read_timeout(0.2)
        .build()
        .unwrap();

    let err = client.execute("status", &Parameters::new()).unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got {:?}", err);
    server.join().unwrap();
}

#[test]
fn negative_read_timeout_waits_for_slow_server() {
    init_tracing();
    let (addr, server) = delayed_server(Duration::from_millis(500));
    let client = Client::builder()
        .url(format!("http://{}", addr))
        .read_timeout(-1.0)
        .build()
        .unwrap();

    let response = client.execute("status", &Parameters::new()).unwrap();
    assert!(response.success());
    server.join().unwrap();
}

#[test]
fn refused_connection_is_a_connection_error() {
    init_tracing();
    let addr = closed_port();
    let client = Client::builder().url(format!("http://{}", addr)).build().unwrap();

    let err = client.execute("status", &Parameters::new()).unwrap_err();
    assert!(
        matches!(err, Error::Transport(TransportError::Connection { .. })),
        "expected connection error, got {:?}",
        err
    );
    assert!(!err.is_timeout());
}
