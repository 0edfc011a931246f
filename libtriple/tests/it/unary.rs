//! End-to-end completion tests: transport event → executor → pending call.

use std::time::Duration;

use bytes::Bytes;
use libtriple::{
    Code, LegacyStatus, Metadata, Outcome, RequestId, RpcException, Status, TripleError,
    legacy::translate,
    metadata::{EXCEPTION_TW_BIN, STATUS_DETAIL_KEY},
    proto::{DEBUG_INFO_TYPE, DebugInfo, ExceptionEnvelope, RpcStatus, pack},
    stream::DESERIALIZE_FAILED,
};
use prost::Message;
use tokio::time::timeout;

use crate::common::{Item, VALIDATION_EXCEPTION, init_logger, item_client};

const WAIT: Duration = Duration::from_secs(5);

fn envelope_trailer(meta: &mut Metadata, message: &str) {
    let envelope = ExceptionEnvelope {
        language: "java".into(),
        serialization: "json".into(),
        class_name: VALIDATION_EXCEPTION.into(),
        data: serde_json::to_vec(&serde_json::json!({ "message": message })).unwrap(),
    };
    meta.insert_bin(EXCEPTION_TW_BIN, &envelope.encode_to_vec());
}

fn status_detail_trailer(meta: &mut Metadata, code: i32, message: &str, frames: &[&str]) {
    let info = DebugInfo {
        stack_entries: frames.iter().map(|f| (*f).to_owned()).collect(),
        detail: String::new(),
    };
    let status = RpcStatus {
        code,
        message: message.into(),
        details: vec![pack(DEBUG_INFO_TYPE, &info)],
    };
    meta.insert_bin(STATUS_DETAIL_KEY, &status.encode_to_vec());
}

#[tokio::test(flavor = "multi_thread")]
async fn successful_completion_delivers_value() {
    init_logger();
    let client = item_client();
    let (stream, rx) = client.start(RequestId(1)).unwrap();

    let body = Item {
        name: "widget".into(),
        count: 3,
    }
    .encode_to_vec();
    let trailers = Metadata::from_pairs([("grpc-status", "0"), ("x-region", "eu")]);
    stream.on_complete(Bytes::from(body), trailers);

    let response = timeout(WAIT, rx).await.unwrap().unwrap();
    assert_eq!(response.id(), RequestId(1));
    assert_eq!(response.version(), "3.0.0");
    assert_eq!(response.status(), None);
    let item = response.result().get_value().unwrap();
    assert_eq!(item.name, "widget");
    assert_eq!(item.count, 3);

    let attachments = response.result().attachments();
    assert_eq!(attachments.len(), 1);
    assert_eq!(
        attachments.get("x-region").and_then(|v| v.as_str()),
        Some("eu")
    );
    assert!(client.pending().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn not_found_without_reserved_keys() {
    init_logger();
    let client = item_client();
    let (stream, rx) = client.start(RequestId(2)).unwrap();

    stream.on_error(
        Status::from_code(Code::from_i32(5)).with_description("no such item"),
        Metadata::new(),
    );

    let response = timeout(WAIT, rx).await.unwrap().unwrap();
    assert_eq!(response.id(), RequestId(2));
    assert!(!response.result().has_exception());
    assert_eq!(response.status(), Some(translate(Code::NotFound)));
    assert_eq!(response.error_message(), Some("no such item"));
}

#[tokio::test(flavor = "multi_thread")]
async fn typed_exception_suppresses_legacy_status() {
    init_logger();
    let client = item_client();
    let (stream, rx) = client.start(RequestId(3)).unwrap();

    let mut trailers = Metadata::from_pairs([("x-trace", "t-1")]);
    envelope_trailer(&mut trailers, "validation failed: field X");
    status_detail_trailer(&mut trailers, 3, "ignored", &["ignored()"]);
    stream.on_error(Status::unknown("server raised"), trailers);

    let response = timeout(WAIT, rx).await.unwrap().unwrap();
    assert_eq!(response.status(), None);
    assert_eq!(response.error_message(), Some("server raised"));
    match response.result().outcome() {
        Outcome::Exception(RpcException::Typed(e)) => {
            assert_eq!(e.type_name, VALIDATION_EXCEPTION);
            assert_eq!(e.message, "validation failed: field X");
        }
        other => panic!("expected typed exception, got {other:?}"),
    }
    let attachments = response.result().attachments();
    assert!(!attachments.contains_key(EXCEPTION_TW_BIN));
    assert!(attachments.contains_key("x-trace"));
}

#[tokio::test(flavor = "multi_thread")]
async fn status_detail_frames_are_rendered() {
    init_logger();
    let client = item_client();
    let (stream, rx) = client.start(RequestId(4)).unwrap();

    let mut trailers = Metadata::new();
    status_detail_trailer(&mut trailers, 13, "raw", &["a()", "b()"]);
    stream.on_error(Status::internal("server failed"), trailers);

    let response = timeout(WAIT, rx).await.unwrap().unwrap();
    assert_eq!(response.status(), None);
    let exception = response.result().exception().unwrap();
    match exception {
        RpcException::Protocol(e) => assert_eq!(e.code(), Code::Internal),
        RpcException::Typed(_) => panic!("expected protocol exception"),
    }
    let message = exception.message();
    let a = message.find("a()").unwrap();
    let b = message.find("b()").unwrap();
    assert!(a < b);
}

#[tokio::test(flavor = "multi_thread")]
async fn undecodable_body_is_normalized() {
    init_logger();
    let client = item_client();
    let (stream, rx) = client.start(RequestId(5)).unwrap();

    stream.on_complete(Bytes::from_static(&[0xff, 0xff, 0xff]), Metadata::new());

    let response = timeout(WAIT, rx).await.unwrap().unwrap();
    assert_eq!(response.error_message(), Some(DESERIALIZE_FAILED));
    assert_eq!(response.status(), Some(LegacyStatus::SERVER_ERROR));
    assert!(response.result().get_value().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_calls_each_get_their_own_response() {
    init_logger();
    let client = item_client();

    let mut calls = Vec::new();
    for id in 100..132u64 {
        let (stream, rx) = client.start(RequestId(id)).unwrap();
        calls.push((id, stream, rx));
    }

    for (id, stream, _) in &calls {
        let body = Item {
            name: format!("item-{id}"),
            count: 1,
        }
        .encode_to_vec();
        stream.on_complete(Bytes::from(body), Metadata::new());
        // A duplicate completion must not produce a second delivery.
        stream.on_error(Status::internal("duplicate"), Metadata::new());
    }

    for (id, _, rx) in calls {
        let response = timeout(WAIT, rx).await.unwrap().unwrap();
        assert_eq!(response.id(), RequestId(id));
        assert_eq!(
            response.result().get_value().map(|i| i.name.clone()),
            Some(format!("item-{id}"))
        );
    }
    assert!(client.pending().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn late_response_after_cancel_is_dropped() {
    init_logger();
    let client = item_client();
    let (stream, rx) = client.start(RequestId(7)).unwrap();
    assert!(client.cancel(RequestId(7)));

    stream.on_error(Status::deadline_exceeded("late"), Metadata::new());

    assert!(timeout(WAIT, rx).await.unwrap().is_err());
    assert!(stream.is_completed());
}

#[tokio::test(flavor = "multi_thread")]
async fn pending_id_cannot_be_reused() {
    init_logger();
    let client = item_client();
    let (stream, rx) = client.start(RequestId(8)).unwrap();
    assert!(matches!(
        client.start(RequestId(8)),
        Err(TripleError::DuplicateRequest(RequestId(8)))
    ));

    stream.on_error(Status::not_found("no such item"), Metadata::new());
    let response = timeout(WAIT, rx).await.unwrap().unwrap();
    assert_eq!(response.error_message(), Some("no such item"));

    // Delivered calls free their id.
    assert!(client.start(RequestId(8)).is_ok());
}
