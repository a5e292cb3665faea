//! End-to-end tests: a real gRPC server, a mock HTTP backend and the generated
//! ext_proc client standing in for the proxy.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use envoy_types::pb::envoy::config::core::v3::{HeaderMap, HeaderValue};
use envoy_types::pb::envoy::service::ext_proc::v3::external_processor_client::ExternalProcessorClient;
use envoy_types::pb::envoy::service::ext_proc::v3::{
    body_mutation::Mutation, common_response::ResponseStatus, processing_request::Request,
    processing_response::Response, HttpBody, HttpHeaders, HttpTrailers, ProcessingRequest,
    ProcessingResponse,
};
use ext_proc_aggregator::config::FailurePolicy;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Code, Streaming};
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;
use tonic_health::pb::HealthCheckRequest;

mod common;

const SCENARIO_A_BODY: &str = r#"{"albums":[{"id":1,"userId":42,"title":"x"}],"posts":[{"id":9,"userId":42,"title":"y","body":"z"}]}"#;

fn request_headers(pairs: &[(&str, &str)]) -> ProcessingRequest {
    let headers = pairs
        .iter()
        .map(|(k, v)| HeaderValue {
            key: k.to_string(),
            raw_value: v.as_bytes().to_vec().into(),
            ..Default::default()
        })
        .collect();
    ProcessingRequest {
        request: Some(Request::RequestHeaders(HttpHeaders {
            headers: Some(HeaderMap { headers }),
            ..Default::default()
        })),
        ..Default::default()
    }
}

fn with(request: Request) -> ProcessingRequest {
    ProcessingRequest {
        request: Some(request),
        ..Default::default()
    }
}

async fn open_stream(
    server: &common::TestServer,
) -> (mpsc::Sender<ProcessingRequest>, Streaming<ProcessingResponse>) {
    let mut client = ExternalProcessorClient::new(server.channel().await);
    let (tx, rx) = mpsc::channel(16);
    let responses = client
        .process(ReceiverStream::new(rx))
        .await
        .expect("process call failed")
        .into_inner();
    (tx, responses)
}

fn replaced_body(response: &ProcessingResponse) -> Option<Vec<u8>> {
    let Some(Response::RequestHeaders(headers)) = &response.response else {
        return None;
    };
    let common = headers.response.as_ref()?;
    assert_eq!(common.status, ResponseStatus::ContinueAndReplace as i32);
    match common.body_mutation.as_ref()?.mutation.as_ref()? {
        Mutation::Body(body) => Some(body.to_vec()),
        _ => None,
    }
}

fn is_passthrough(response: &ProcessingResponse) -> bool {
    matches!(&response.response, Some(Response::RequestHeaders(h)) if h.response.is_none())
}

#[tokio::test]
async fn test_identifier_header_replaces_body() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_by_backend = seen.clone();
    let backend = common::start_programmable_backend(move |path| {
        seen_by_backend.lock().unwrap().push(path.clone());
        async move {
            if path.ends_with("/albums") {
                (200, common::ALBUMS.to_string())
            } else {
                (200, common::POSTS.to_string())
            }
        }
    })
    .await;
    let server = common::start_server(format!("http://{}", backend), FailurePolicy::Reject).await;
    let (tx, mut responses) = open_stream(&server).await;

    tx.send(request_headers(&[(":path", "/"), ("UserId", "42")])).await.unwrap();
    let response = responses.message().await.unwrap().expect("no response");

    assert_eq!(replaced_body(&response).unwrap(), SCENARIO_A_BODY.as_bytes());

    let mut paths = seen.lock().unwrap().clone();
    paths.sort();
    assert_eq!(paths, vec!["/users/42/albums", "/users/42/posts"]);

    drop(tx);
    assert!(responses.message().await.unwrap().is_none());
    server.shutdown.trigger();
}

#[tokio::test]
async fn test_no_identifier_passes_through() {
    let backend = common::start_fixture_backend().await;
    let server = common::start_server(format!("http://{}", backend), FailurePolicy::Reject).await;
    let (tx, mut responses) = open_stream(&server).await;

    tx.send(request_headers(&[])).await.unwrap();
    let response = responses.message().await.unwrap().expect("no response");
    assert!(is_passthrough(&response));

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_mixed_events_get_paired_responses_in_order() {
    let backend = common::start_fixture_backend().await;
    let server = common::start_server(format!("http://{}", backend), FailurePolicy::Reject).await;
    let (tx, mut responses) = open_stream(&server).await;

    let events = vec![
        request_headers(&[("userid", "42")]),
        with(Request::RequestBody(HttpBody::default())),
        with(Request::RequestTrailers(HttpTrailers::default())),
        with(Request::ResponseHeaders(HttpHeaders::default())),
        with(Request::ResponseBody(HttpBody::default())),
        with(Request::ResponseTrailers(HttpTrailers::default())),
        request_headers(&[(":path", "/")]),
    ];
    let count = events.len();
    for event in events {
        tx.send(event).await.unwrap();
    }
    drop(tx);

    let mut received = Vec::new();
    while let Some(response) = responses.message().await.unwrap() {
        received.push(response);
    }
    assert_eq!(received.len(), count);

    assert_eq!(replaced_body(&received[0]).unwrap(), SCENARIO_A_BODY.as_bytes());
    assert!(matches!(received[1].response, Some(Response::RequestBody(_))));
    assert!(matches!(received[2].response, Some(Response::RequestTrailers(_))));
    assert!(matches!(received[3].response, Some(Response::ResponseHeaders(_))));
    assert!(matches!(received[4].response, Some(Response::ResponseBody(_))));
    assert!(matches!(received[5].response, Some(Response::ResponseTrailers(_))));
    assert!(is_passthrough(&received[6]));

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_backend_failure_rejects_stream() {
    let backend = common::start_programmable_backend(|path| async move {
        if path.ends_with("/albums") {
            (500, "oops".to_string())
        } else {
            (200, common::POSTS.to_string())
        }
    })
    .await;
    let server = common::start_server(format!("http://{}", backend), FailurePolicy::Reject).await;
    let (tx, mut responses) = open_stream(&server).await;

    tx.send(request_headers(&[("userid", "42")])).await.unwrap();
    let status = responses.message().await.unwrap_err();

    assert_eq!(status.code(), Code::Unavailable);
    assert!(status.message().contains("albums"));

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_backend_does_not_affect_other_streams() {
    let server =
        common::start_server("http://127.0.0.1:1".to_string(), FailurePolicy::Reject).await;

    let (failing_tx, mut failing) = open_stream(&server).await;
    let (healthy_tx, mut healthy) = open_stream(&server).await;

    failing_tx.send(request_headers(&[("userid", "42")])).await.unwrap();
    assert_eq!(failing.message().await.unwrap_err().code(), Code::Unavailable);

    healthy_tx.send(request_headers(&[])).await.unwrap();
    assert!(is_passthrough(&healthy.message().await.unwrap().unwrap()));

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_backend_failure_passthrough_policy() {
    let backend = common::start_programmable_backend(|path| async move {
        if path.ends_with("/posts") {
            (200, "not json".to_string())
        } else {
            (200, common::ALBUMS.to_string())
        }
    })
    .await;
    let server =
        common::start_server(format!("http://{}", backend), FailurePolicy::Passthrough).await;
    let (tx, mut responses) = open_stream(&server).await;

    tx.send(request_headers(&[("userid", "42")])).await.unwrap();
    let response = responses.message().await.unwrap().expect("no response");
    assert!(is_passthrough(&response));
    assert!(replaced_body(&response).is_none());

    // The stream stays usable.
    tx.send(with(Request::ResponseHeaders(HttpHeaders::default()))).await.unwrap();
    let response = responses.message().await.unwrap().expect("no response");
    assert!(matches!(response.response, Some(Response::ResponseHeaders(_))));

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_health_service() {
    let server =
        common::start_server("http://127.0.0.1:1".to_string(), FailurePolicy::Reject).await;
    let mut client = HealthClient::new(server.channel().await);

    let response = client
        .check(HealthCheckRequest {
            service: String::new(),
        })
        .await
        .unwrap();
    assert_eq!(response.get_ref().status, ServingStatus::Serving as i32);

    let status = client
        .watch(HealthCheckRequest {
            service: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unimplemented);

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_shutdown_cancels_open_streams_after_grace_period() {
    let backend = common::start_fixture_backend().await;
    let server = common::start_server(format!("http://{}", backend), FailurePolicy::Reject).await;
    let (tx, mut responses) = open_stream(&server).await;

    tx.send(request_headers(&[])).await.unwrap();
    assert!(responses.message().await.unwrap().is_some());

    // Keep `tx` open so the stream would otherwise live forever.
    server.shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(10), server.handle)
        .await
        .expect("server did not stop after the grace period")
        .unwrap();
    assert!(result.is_ok());
    drop(tx);
}
