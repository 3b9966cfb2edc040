use flate2::read::GzDecoder;
use prost::Message;
use rask_log_shipper::app::StderrPrinter;
use rask_log_shipper::buffer::{Batch, BatchType};
use rask_log_shipper::domain::{LogRecord, Timestamp};
use rask_log_shipper::sender::{
    BatchSink, Encoding, HttpClientConfig, HttpTransmitter, PushRequest, TransmissionError,
};
use rask_log_shipper::{Client, ClientConfig, Fields, LogLevel};
use serde_json::Value;
use std::io::Read;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const PUSH_PATH: &str = "/loki/api/v1/push";

fn client_config(server: &MockServer, encoding: Encoding) -> ClientConfig {
    ClientConfig {
        push_url: format!("{}{}", server.uri(), PUSH_PATH),
        labels: "{job=\"wiremock\",env=\"test\"}".to_string(),
        send_level: LogLevel::Info,
        print_level: LogLevel::Error,
        batch_entries_number: 2,
        batch_wait: Duration::from_secs(30),
        encoding,
        request_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

fn msg(text: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert("msg".to_string(), Value::String(text.to_string()));
    fields
}

fn decode_protobuf(request: &Request) -> PushRequest {
    let raw = snap::raw::Decoder::new()
        .decompress_vec(&request.body)
        .expect("snappy body");
    PushRequest::decode(raw.as_slice()).expect("push request")
}

fn messages(request: &PushRequest) -> Vec<String> {
    request.streams[0]
        .entries
        .iter()
        .map(|entry| {
            let value: Value = serde_json::from_str(&entry.line).unwrap();
            value["msg"].as_str().unwrap().to_string()
        })
        .collect()
}

async fn wait_for_requests(server: &MockServer, count: usize) -> Vec<Request> {
    for _ in 0..200 {
        let requests = server.received_requests().await.unwrap_or_default();
        if requests.len() >= count {
            return requests;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {count} push requests");
}

fn sample_batch(lines: &[&str]) -> Batch {
    let entries = lines
        .iter()
        .map(|line| LogRecord::new(Timestamp::now(), *line))
        .collect();
    Batch::new("{job=\"direct\"}", entries, BatchType::SizeBased)
}

#[tokio::test]
async fn pushes_snappy_protobuf_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PUSH_PATH))
        .and(header("content-type", "application/x-protobuf"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::new(client_config(&server, Encoding::Protobuf)).unwrap();
    client.info(msg("first")).await;
    client.warn(msg("second")).await;

    let requests = wait_for_requests(&server, 1).await;
    client.shutdown().await;

    let push = decode_protobuf(&requests[0]);
    assert_eq!(push.streams.len(), 1);
    assert_eq!(push.streams[0].labels, "{job=\"wiremock\",env=\"test\"}");
    assert_eq!(messages(&push), vec!["first", "second"]);
    assert!(push.streams[0].entries.iter().all(|e| e.timestamp.is_some()));

    let stats = client.stats();
    assert_eq!(stats.batches_sent, 1);
    assert_eq!(stats.entries_sent, 2);
}

#[tokio::test]
async fn pushes_gzipped_json_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PUSH_PATH))
        .and(header("content-type", "application/json"))
        .and(header("content-encoding", "gzip"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::new(client_config(&server, Encoding::Json)).unwrap();
    client.info(msg("a")).await;
    client.error(msg("b")).await;

    let requests = wait_for_requests(&server, 1).await;
    client.shutdown().await;

    let mut body = String::new();
    GzDecoder::new(requests[0].body.as_slice())
        .read_to_string(&mut body)
        .unwrap();
    let push: Value = serde_json::from_str(&body).unwrap();

    let stream = &push["streams"][0];
    assert_eq!(stream["labels"], "{job=\"wiremock\",env=\"test\"}");
    let entries = stream["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[0]["ts"].as_str().unwrap().ends_with('Z'));
    assert!(entries[1]["line"].as_str().unwrap().contains("\"msg\": \"b\""));
}

#[tokio::test]
async fn shutdown_pushes_partial_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PUSH_PATH))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = Client::new(client_config(&server, Encoding::Protobuf)).unwrap();
    client.info(msg("lonely")).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(server.received_requests().await.unwrap().is_empty());

    client.shutdown().await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(messages(&decode_protobuf(&requests[0])), vec!["lonely"]);
}

#[tokio::test]
async fn shutdown_with_empty_batch_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let client = Client::new(client_config(&server, Encoding::Protobuf)).unwrap();
    client.shutdown().await;

    assert!(server.received_requests().await.unwrap().is_empty());
    assert_eq!(client.stats().batches_sent, 0);
}

#[tokio::test]
async fn rejected_push_does_not_stop_later_batches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("ingester unavailable"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = Client::new(client_config(&server, Encoding::Protobuf)).unwrap();
    client.info(msg("dropped-1")).await;
    client.info(msg("dropped-2")).await;
    wait_for_requests(&server, 1).await;

    client.info(msg("kept-1")).await;
    client.info(msg("kept-2")).await;
    let requests = wait_for_requests(&server, 2).await;
    client.shutdown().await;

    assert_eq!(
        messages(&decode_protobuf(&requests[1])),
        vec!["kept-1", "kept-2"]
    );

    let stats = client.stats();
    assert_eq!(stats.batches_dropped, 1);
    assert_eq!(stats.entries_dropped, 2);
    assert_eq!(stats.batches_sent, 1);
}

#[tokio::test]
async fn only_no_content_counts_as_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let client = Client::new(client_config(&server, Encoding::Protobuf)).unwrap();
    client.info(msg("a")).await;
    client.info(msg("b")).await;
    wait_for_requests(&server, 1).await;
    client.shutdown().await;

    let stats = client.stats();
    assert_eq!(stats.batches_sent, 0);
    assert_eq!(stats.batches_dropped, 1);
}

#[tokio::test]
async fn transmitter_reports_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PUSH_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid labels"))
        .mount(&server)
        .await;

    let transmitter = HttpTransmitter::from_config(
        HttpClientConfig {
            push_url: format!("{}{}", server.uri(), PUSH_PATH),
            ..Default::default()
        },
        Encoding::Protobuf,
    )
    .unwrap();

    let result = transmitter.send_batch(sample_batch(&["x"])).await;
    match result {
        Err(TransmissionError::UnexpectedStatus { status, body }) => {
            assert_eq!(status, 400);
            assert_eq!(body, "invalid labels");
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn transmitter_returns_result_on_204() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PUSH_PATH))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let transmitter = HttpTransmitter::from_config(
        HttpClientConfig {
            push_url: format!("{}{}", server.uri(), PUSH_PATH),
            ..Default::default()
        },
        Encoding::Json,
    )
    .unwrap();

    let batch = sample_batch(&["x", "y", "z"]);
    let batch_id = batch.id().to_string();
    let result = transmitter.send_batch(batch).await.unwrap();

    assert_eq!(result.status_code, 204);
    assert_eq!(result.entries, 3);
    assert_eq!(result.batch_id, batch_id);
    assert!(result.bytes_sent > 0);
}

#[tokio::test]
async fn unreachable_endpoint_is_a_request_error() {
    let transmitter = HttpTransmitter::from_config(
        HttpClientConfig {
            push_url: "http://127.0.0.1:1/loki/api/v1/push".to_string(),
            timeout: Duration::from_secs(2),
            connection_timeout: Duration::from_secs(1),
            ..Default::default()
        },
        Encoding::Protobuf,
    )
    .unwrap();

    let result = transmitter.send_batch(sample_batch(&["x"])).await;
    assert!(matches!(result, Err(TransmissionError::RequestError(_))));
}

#[tokio::test]
async fn transport_failures_are_absorbed_by_the_client() {
    let config = ClientConfig {
        push_url: "http://127.0.0.1:1/loki/api/v1/push".to_string(),
        batch_entries_number: 1,
        connect_timeout: Duration::from_secs(1),
        request_timeout: Duration::from_secs(2),
        ..Default::default()
    };
    let client =
        Client::with_parts(config.clone(), transmitter_for(&config), StderrPrinter).unwrap();

    client.info(msg("nowhere")).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    client.shutdown().await;

    let stats = client.stats();
    assert_eq!(stats.batches_sent, 0);
    assert_eq!(stats.batches_dropped, 1);
    assert_eq!(stats.entries_dropped, 1);
}

fn transmitter_for(config: &ClientConfig) -> HttpTransmitter {
    HttpTransmitter::from_config(config.http_client_config(), config.encoding).unwrap()
}
