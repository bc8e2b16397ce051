//! End-to-end tests over the real reqwest adapter, against a wiremock server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scriptnet_bridge::net::ConnectHook;
use scriptnet_bridge::{
    DownloadParams, ErrorKind, FetchOutput, FetchParams, Outcome, Session,
};

#[tokio::test]
async fn fetch_resolves_body_status_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/greeting"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-kind", "greeting")
                .set_body_string("hello from the wire"),
        )
        .mount(&server)
        .await;

    let session = Session::new();
    let promise = session
        .fetch(FetchParams {
            url: Some(format!("{}/greeting", server.uri())),
            ..Default::default()
        })
        .unwrap();

    match promise.settle().await {
        Outcome::Resolved(FetchOutput::Response { body, status, headers }) => {
            assert_eq!(body, "hello from the wire");
            assert_eq!(status, 200);
            assert_eq!(headers.get("x-kind").unwrap(), "greeting");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn fetch_applies_method_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/submit"))
        .and(header("x-token", "abc"))
        .and(body_string("name=ferris"))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .mount(&server)
        .await;

    let session = Session::new();
    let output = session
        .fetch(FetchParams {
            url: Some(format!("{}/submit", server.uri())),
            method: Some("POST".to_string()),
            data: Some("name=ferris".to_string()),
            headers: Some(vec![("x-token".to_string(), "abc".to_string())]),
            ..Default::default()
        })
        .unwrap()
        .settle()
        .await
        .unwrap();

    match output {
        FetchOutput::Response { body, status, .. } => {
            assert_eq!(status, 201);
            assert_eq!(body, "created");
        }
        other => panic!("unexpected output: {other:?}"),
    }
}

#[tokio::test]
async fn connect_hook_sees_status_and_switches_output_to_body_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(ResponseTemplate::new(200).set_body_string("streamed text"))
        .mount(&server)
        .await;

    let calls = Arc::new(AtomicUsize::new(0));
    let calls2 = calls.clone();
    let hook: ConnectHook = Box::new(move |status, _headers| {
        assert_eq!(status, 200);
        calls2.fetch_add(1, Ordering::SeqCst);
    });

    let session = Session::new();
    let output = session
        .fetch(FetchParams {
            url: Some(format!("{}/stream", server.uri())),
            on_connect: Some(hook),
            ..Default::default()
        })
        .unwrap()
        .settle()
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(output, FetchOutput::Body("streamed text".to_string()));
}

#[tokio::test]
async fn fetch_network_failure_rejects_with_transport_message() {
    // Nothing listens on this port.
    let session = Session::new();
    let err = session
        .fetch(FetchParams {
            url: Some("http://127.0.0.1:9/unreachable".to_string()),
            ..Default::default()
        })
        .unwrap()
        .settle()
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Network);
    assert!(!err.message.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn download_transfers_the_exact_bytes() {
    let payload: Vec<u8> = (0..64 * 1024u32).map(|i| (i % 250) as u8).collect();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blob"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("blob.bin");

    let session = Session::new();
    let started = session
        .download(DownloadParams {
            url: Some(format!("{}/blob", server.uri())),
            destination: Some(dest.to_string_lossy().into_owned()),
            ..Default::default()
        })
        .unwrap()
        .settle()
        .await
        .unwrap();

    assert_eq!(started.length, payload.len() as u64);
    assert_eq!(started.promise.settle().await.unwrap(), "Success");

    assert_eq!(std::fs::read(&dest).unwrap(), payload);
    assert_eq!(
        started.progress.get().unwrap().parse::<u64>().unwrap(),
        payload.len() as u64
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn download_appends_to_an_existing_destination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tail"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"-tail".to_vec()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("log.bin");
    std::fs::write(&dest, b"head").unwrap();

    let session = Session::new();
    let started = session
        .download(DownloadParams {
            url: Some(format!("{}/tail", server.uri())),
            destination: Some(dest.to_string_lossy().into_owned()),
            // Validated but not applied; the file is opened in append mode.
            offset: Some("4".to_string()),
            ..Default::default()
        })
        .unwrap()
        .settle()
        .await
        .unwrap();

    started.promise.settle().await.unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), b"head-tail");
}

#[tokio::test]
async fn aborting_before_the_response_rejects_the_outer_promise() {
    use std::time::Duration;

    use scriptnet_bridge::AbortSignal;
    use scriptnet_bridge::Settler;

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"late".to_vec())
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let signal = AbortSignal::new();
    let session = Session::new();
    let promise = session
        .download(DownloadParams {
            url: Some(format!("{}/slow", server.uri())),
            destination: Some("/tmp/never-written".to_string()),
            signal: Some(signal.clone()),
            ..Default::default()
        })
        .unwrap();

    let (settler, rx) = Settler::channel();
    promise.launch(settler);
    signal.abort();

    match rx.await.unwrap() {
        Outcome::Rejected(err) => assert_eq!(err.kind, ErrorKind::Cancelled),
        Outcome::Resolved(_) => panic!("expected rejection"),
    }
}
