//! # Anthropic Batch Provider Tests
//!
//! Verifies the Message Batches wire protocol against a `wiremock` server.

use flightscan::extract::BatchOptions;
use flightscan::payload::{assemble_requests, ExtractionInput};
use flightscan::providers::ai::{
    anthropic::AnthropicBatchProvider, BatchProvider, BatchStatus, CallParams, CallSpec, Message,
    MessageContent, ResultEnvelope, Role,
};
use flightscan::{BatchExtractor, ExtractError, ExtractionResult, SanityCheck, TextContext};
use flightscan_test_utils::setup_tracing;
use futures::StreamExt;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-key";

fn provider(server: &MockServer) -> AnthropicBatchProvider {
    AnthropicBatchProvider::new(server.uri(), API_KEY.to_string()).unwrap()
}

fn call_spec(custom_id: &str) -> CallSpec {
    CallSpec {
        custom_id: custom_id.to_string(),
        params: CallParams {
            model: "claude-3-5-sonnet-latest".to_string(),
            max_tokens: 1024,
            temperature: 0.0,
            top_p: 1.0,
            system: "system".to_string(),
            messages: vec![
                Message {
                    role: Role::User,
                    content: MessageContent::Text("hello".to_string()),
                },
                Message {
                    role: Role::Assistant,
                    content: MessageContent::Text("{".to_string()),
                },
            ],
        },
    }
}

fn batch_body(id: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "type": "message_batch",
        "processing_status": status,
        "request_counts": {"processing": 0, "succeeded": 0, "errored": 0, "canceled": 0, "expired": 0}
    })
}

#[tokio::test]
async fn test_submit_batch_sends_authorized_request() {
    // --- 1. Arrange ---
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages/batches"))
        .and(header("x-api-key", API_KEY))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "requests": [{
                "custom_id": "req-1",
                "params": {
                    "model": "claude-3-5-sonnet-latest",
                    "max_tokens": 1024,
                    "system": "system",
                    "messages": [
                        {"role": "user", "content": "hello"},
                        {"role": "assistant", "content": "{"}
                    ]
                }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(batch_body("msgbatch_1", "in_progress")))
        .expect(1)
        .mount(&server)
        .await;

    // --- 2. Act ---
    let job_id = provider(&server)
        .submit_batch(&[call_spec("req-1")])
        .await
        .unwrap();

    // --- 3. Assert ---
    assert_eq!(job_id, "msgbatch_1");
}

#[tokio::test]
async fn test_rejected_submission_is_a_submission_error() {
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages/batches"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "type": "error",
            "error": {"type": "invalid_request_error", "message": "too many requests in batch"}
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .submit_batch(&[call_spec("req-1")])
        .await
        .unwrap_err();

    match err {
        ExtractError::Submission(message) => {
            assert!(message.contains("400"), "unexpected message: {message}");
            assert!(message.contains("too many requests in batch"));
        }
        other => panic!("expected a submission error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_get_status_maps_processing_status() {
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/messages/batches/msgbatch_running"))
        .respond_with(ResponseTemplate::new(200).set_body_json(batch_body("msgbatch_running", "in_progress")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/messages/batches/msgbatch_done"))
        .respond_with(ResponseTemplate::new(200).set_body_json(batch_body("msgbatch_done", "ended")))
        .mount(&server)
        .await;

    let provider = provider(&server);
    assert_eq!(
        provider.get_status("msgbatch_running").await.unwrap(),
        BatchStatus::Processing
    );
    assert_eq!(
        provider.get_status("msgbatch_done").await.unwrap(),
        BatchStatus::Ended
    );
}

#[tokio::test]
async fn test_get_status_surfaces_api_errors() {
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/messages/batches/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not_found_error"))
        .mount(&server)
        .await;

    let err = provider(&server).get_status("missing").await.unwrap_err();
    assert!(matches!(err, ExtractError::AiApi(body) if body.contains("not_found_error")));
}

#[tokio::test]
async fn test_stream_results_parses_jsonl() {
    setup_tracing();
    let server = MockServer::start().await;
    let body = [
        r#"{"custom_id":"b","result":{"type":"succeeded","message":{"id":"msg_b","type":"message","role":"assistant","content":[{"type":"text","text":"}"}]}}}"#,
        r#"{"custom_id":"a","result":{"type":"succeeded","message":{"id":"msg_a","type":"message","role":"assistant","content":[{"type":"text","text":"\"x\": "},{"type":"text","text":"1}"}]}}}"#,
        "",
        "not json",
        r#"{"custom_id":"c","result":{"type":"errored","error":{"type":"overloaded_error","message":"Overloaded"}}}"#,
        r#"{"custom_id":"d","result":{"type":"expired"}}"#,
    ]
    .join("\n");
    Mock::given(method("GET"))
        .and(path("/v1/messages/batches/msgbatch_1/results"))
        .and(header("x-api-key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let envelopes: Vec<ResultEnvelope> = provider(&server)
        .stream_results("msgbatch_1")
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(envelopes.len(), 4);
    assert_eq!(envelopes[0], ResultEnvelope::output("b", "}"));
    assert_eq!(envelopes[1], ResultEnvelope::output("a", "\"x\": 1}"));
    assert_eq!(envelopes[2].correlation_id, "c");
    assert!(matches!(
        &envelopes[2].outcome,
        flightscan::providers::ai::ResultOutcome::Failed(reason) if reason.contains("Overloaded")
    ));
    assert_eq!(envelopes[3], ResultEnvelope::failed("d", "expired"));
}

#[tokio::test]
async fn test_cancel_batch_posts_to_cancel_endpoint() {
    setup_tracing();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages/batches/msgbatch_1/cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(batch_body("msgbatch_1", "canceling")))
        .expect(1)
        .mount(&server)
        .await;

    provider(&server).cancel_batch("msgbatch_1").await.unwrap();
}

#[test]
fn test_blank_api_key_is_rejected() {
    let err = AnthropicBatchProvider::new("http://localhost".to_string(), "  ".to_string())
        .unwrap_err();
    assert!(matches!(err, ExtractError::MissingApiKey));
}

#[tokio::test]
async fn test_engine_runs_against_http_service() {
    // --- 1. Arrange ---
    setup_tracing();
    let server = MockServer::start().await;
    let requests = assemble_requests::<SanityCheck>(vec![
        ExtractionInput::new(
            "with-word",
            TextContext::from([
                ("word".to_string(), "solo".to_string()),
                ("text".to_string(), "han solo".to_string()),
            ]),
        ),
        ExtractionInput::new(
            "without-word",
            TextContext::from([
                ("word".to_string(), "solo".to_string()),
                ("text".to_string(), "chewbacca".to_string()),
            ]),
        ),
    ])
    .unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/messages/batches"))
        .respond_with(ResponseTemplate::new(200).set_body_json(batch_body("msgbatch_e2e", "in_progress")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/messages/batches/msgbatch_e2e"))
        .respond_with(ResponseTemplate::new(200).set_body_json(batch_body("msgbatch_e2e", "ended")))
        .mount(&server)
        .await;

    let result_line = |id: &str, text: &str| {
        json!({
            "custom_id": id,
            "result": {"type": "succeeded", "message": {"content": [{"type": "text", "text": text}]}}
        })
        .to_string()
    };
    let results = [
        result_line(requests[1].correlation_id(), "\"is_there_text_in_the_prompt\": false}"),
        result_line(requests[0].correlation_id(), "\"is_there_text_in_the_prompt\": true}"),
    ]
    .join("\n");
    Mock::given(method("GET"))
        .and(path("/v1/messages/batches/msgbatch_e2e/results"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results))
        .mount(&server)
        .await;

    let options = BatchOptions {
        poll_interval: Duration::from_millis(10),
        ..Default::default()
    };
    let extractor =
        BatchExtractor::<SanityCheck>::new(Box::new(provider(&server)), options).unwrap();

    // --- 2. Act ---
    let items = extractor.extract(&requests).await.unwrap();

    // --- 3. Assert ---
    assert_eq!(items[0].identifier, "with-word");
    assert_eq!(
        items[0].result,
        ExtractionResult::Record(SanityCheck {
            is_there_text_in_the_prompt: true
        })
    );
    assert_eq!(
        items[1].result,
        ExtractionResult::Record(SanityCheck {
            is_there_text_in_the_prompt: false
        })
    );
}
