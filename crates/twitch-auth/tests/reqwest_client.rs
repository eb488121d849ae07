//! Tests for the reqwest-backed [`HttpClient`].
//!
//! Each test binds a one-shot HTTP server on an ephemeral port, points the
//! request builder at it, and checks both what went over the wire and the
//! completion the client reported.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use twitch_auth::{
    Dispatched, Endpoint, HttpClient, HttpVerb, ReqwestHttpClient, RequestBuilder,
    ResponseDispatcher,
};

// ── helpers ──────────────────────────────────────────────────────────────────

/// Serve one canned response; resolves to the raw request text.
async fn one_shot_server(status_line: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("local addr"));

    let response = format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let mut buf = [0u8; 4096];
        let n = stream.read(&mut buf).await.expect("read");
        stream.write_all(response.as_bytes()).await.expect("write");
        stream.flush().await.expect("flush");
        String::from_utf8_lossy(&buf[..n]).into_owned()
    });

    (base, handle)
}

fn client() -> ReqwestHttpClient {
    ReqwestHttpClient::new(Duration::from_secs(5)).expect("client")
}

// ── tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sends_kraken_headers_and_reads_body() {
    let (base, server) = one_shot_server("200 OK", r#"{"_id":"1","name":"bob"}"#).await;

    let request = RequestBuilder::new(&base, "client-xyz")
        .build(Endpoint::User, HttpVerb::Get, Some("abc123"))
        .unwrap();
    let completion = client().execute(&request).await;

    assert!(completion.succeeded);
    let response = completion.response.expect("response");
    assert_eq!(response.status, 200);
    assert_eq!(response.body, r#"{"_id":"1","name":"bob"}"#);

    let raw = server.await.unwrap().to_ascii_lowercase();
    assert!(raw.starts_with("get /user http/1.1"));
    assert!(raw.contains("authorization: oauth abc123"));
    assert!(raw.contains("client-id: client-xyz"));
    assert!(raw.contains("accept: application/vnd.twitchtv.v5+json"));
}

#[tokio::test]
async fn non_success_status_is_still_a_completed_transport() {
    let (base, _server) = one_shot_server("404 Not Found", r#"{"error":"Not Found"}"#).await;

    let request = RequestBuilder::new(&base, "c")
        .build(Endpoint::User, HttpVerb::Get, None)
        .unwrap();
    let completion = client().execute(&request).await;

    assert!(completion.succeeded);
    assert_eq!(completion.response.map(|r| r.status), Some(404));
}

#[tokio::test]
async fn connection_refused_reports_failure() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let request = RequestBuilder::new(format!("http://{addr}"), "c")
        .build(Endpoint::User, HttpVerb::Get, None)
        .unwrap();
    let completion = client().execute(&request).await;

    assert!(!completion.succeeded);
    assert!(completion.response.is_none());
}

#[tokio::test]
async fn verb_is_sent_on_the_wire() {
    let (base, server) = one_shot_server("204 No Content", "").await;

    let request = RequestBuilder::new(&base, "c")
        .build(Endpoint::Channels, HttpVerb::Delete, Some("t"))
        .unwrap();
    let completion = client().execute(&request).await;
    assert!(completion.succeeded);

    let raw = server.await.unwrap();
    assert!(raw.starts_with("DELETE /channel HTTP/1.1"));
}

#[tokio::test]
async fn dispatches_profile_from_live_response() {
    let (base, _server) =
        one_shot_server("200 OK", r#"{"display_name":"Bob","email":null}"#).await;

    let request = RequestBuilder::new(&base, "c")
        .build(Endpoint::User, HttpVerb::Get, Some("t"))
        .unwrap();
    let mut dispatcher = ResponseDispatcher::new();
    dispatcher.track(&request);

    let completion = client().execute(&request).await;
    match dispatcher.dispatch(request.id, completion).unwrap() {
        Dispatched::UserProfile(profile) => {
            assert_eq!(profile.display_name, "Bob");
            assert_eq!(profile.email, "");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}
