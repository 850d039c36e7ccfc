//! Request execution: memoization, application errors and extensions.

use crate::integration::mock_server::MockServerFixture;
use groonga_client::{Error, Extension, FnExtension, LoadRequest, Request, Response, SelectRequest};
use mockito::Matcher;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

const STATUS_OK: &str = r#"[[0,1372430096.70991,0.0005],{"alloc_count":3,"uptime":10}]"#;

#[test]
fn response_is_fetched_once_and_cached() {
    let mut fixture = MockServerFixture::new();
    let mock = fixture
        .server
        .mock("GET", "/d/status")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(STATUS_OK)
        .expect(1)
        .create();
    let client = fixture.client();

    let request = Request::new("status");
    assert!(request.cached_response().is_none());
    let first = request.response(&client).unwrap().clone();
    let second = request.response(&client).unwrap();
    assert_eq!(&first, second);
    assert_eq!(second.body["uptime"], 10);
    mock.assert();
}

#[test]
fn derived_requests_do_not_share_the_cache() {
    let mut fixture = MockServerFixture::new();
    let mock = fixture
        .server
        .mock("GET", "/d/status")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(STATUS_OK)
        .expect(2)
        .create();
    let client = fixture.client();

    let request = Request::new("status");
    request.response(&client).unwrap();
    let derived = request.parameter("output_pretty", "yes");
    assert!(derived.cached_response().is_none());
    derived.response(&client).unwrap();
    mock.assert();
}

#[test]
fn failed_command_raises_application_error() {
    let mut fixture = MockServerFixture::new();
    let _mock = fixture.mock_response(
        "GET",
        "/d/select",
        400,
        r#"[[-22,1.0,0.1,"invalid table name: <Nonexistent>"],[]]"#,
    );
    let client = fixture.client();

    let request = SelectRequest::new().table("Nonexistent");
    let err = request.response(&client).unwrap_err();
    match &err {
        Error::Application { response } => {
            assert_eq!(response.return_code(), -22);
            assert_eq!(response.command_name, "select");
        }
        other => panic!("expected application error, got {:?}", other),
    }
    assert_eq!(
        err.response().and_then(Response::error_message),
        Some("invalid table name: <Nonexistent>")
    );
    assert!(request.as_request().cached_response().is_none());
}

#[test]
fn select_body_is_parsed_from_response() {
    let mut fixture = MockServerFixture::new();
    let mock = fixture
        .server
        .mock("GET", "/d/select")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("table".into(), "Users".into()),
            Matcher::UrlEncoded("output_columns".into(), "_key, age".into()),
            Matcher::UrlEncoded("sort_keys".into(), "-age".into()),
            Matcher::UrlEncoded("sortby".into(), "-age".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"[[0,1.0,0.1],[[[2],[["_key","ShortText"],["age","UInt8"]],["bob",31],["alice",29]]]]"#,
        )
        .create();
    let client = fixture.client();

    let body = SelectRequest::new()
        .table("Users")
        .output_columns(["_key", "age"])
        .sort_keys(["-age"])
        .body(&client)
        .unwrap();
    assert_eq!(body.n_hits, 2);
    assert_eq!(body.records[0]["_key"], "bob");
    assert_eq!(body.records[1]["age"], 29);
    mock.assert();
}

#[test]
fn load_request_posts_serialized_values() {
    let mut fixture = MockServerFixture::new();
    let mock = fixture
        .server
        .mock("POST", "/d/load")
        .match_query(Matcher::Exact("table=Users".into()))
        .match_body(Matcher::Json(json!([{"_key": "alice", "age": 29}])))
        .with_status(200)
        .with_body("[[0,1.0,0.1],1]")
        .create();
    let client = fixture.client();

    let request = LoadRequest::new()
        .table("Users")
        .values(&json!([{"_key": "alice", "age": 29}]))
        .unwrap();
    let response = request.response(&client).unwrap();
    assert_eq!(response.body, 1);
    mock.assert();
}

struct CountingExtension {
    calls: Arc<AtomicUsize>,
}

impl Extension for CountingExtension {
    fn name(&self) -> &str {
        "counting"
    }

    fn decorate(&self, response: Response) -> groonga_client::Result<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(response)
    }
}

#[test]
fn extensions_decorate_in_order_once() {
    let mut fixture = MockServerFixture::new();
    let _mock = fixture.mock_response("GET", "/d/status", 200, STATUS_OK);
    let client = fixture.client();
    let calls = Arc::new(AtomicUsize::new(0));

    let request = Request::new("status")
        .extension(CountingExtension { calls: calls.clone() })
        .extension(FnExtension::new("tag", |mut response: Response| {
            response.body["tagged"] = json!(true);
            Ok(response)
        }))
        .extension(CountingExtension { calls: calls.clone() });

    assert_eq!(request.extension_names(), vec!["counting", "tag"]);
    let response = request.response(&client).unwrap();
    assert_eq!(response.body["tagged"], true);
    request.response(&client).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn requests_run_concurrently_from_threads() {
    let mut fixture = MockServerFixture::new();
    let mock = fixture
        .server
        .mock("GET", "/d/status")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(STATUS_OK)
        .expect(4)
        .create();
    let client = Arc::new(fixture.client());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let client = client.clone();
            thread::spawn(move || {
                let request = Request::new("status");
                let success = request.response(&client).map(Response::success);
                success
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap().unwrap());
    }
    assert!(!client.connected());
    mock.assert();
}
