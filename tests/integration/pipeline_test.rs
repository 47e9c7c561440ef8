//! End-to-end tests: materialize then transform.

use super::fixtures::{SqliteFixture, BLOB};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use sql_result_transformer::{
    transform_query, JsonLinesTransformer, JsonTransformer, ResultSet, SrtError, Transformer,
};

/// A transformer that refuses every input.
struct RejectingTransformer;

impl Transformer for RejectingTransformer {
    fn transform(&self, _result: &ResultSet) -> sql_result_transformer::Result<Vec<u8>> {
        Err(SrtError::transform("format cannot represent this result"))
    }
}

#[tokio::test]
async fn test_scenario_to_json() {
    let fixture = SqliteFixture::scenario().await;
    let encoded = STANDARD.encode(BLOB);

    let bytes = transform_query(
        &fixture.client,
        "SELECT * FROM srt_test;",
        &JsonTransformer::new(),
    )
    .await
    .unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(
        value,
        json!([
            {"intField": 1, "textField": "hello", "boolField": true, "realField": 1.0, "blobField": encoded},
            {"intField": 2, "textField": "world", "boolField": false, "realField": null, "blobField": encoded},
            {"intField": 3, "textField": null, "boolField": null, "realField": 1.2, "blobField": null},
            {"intField": null, "textField": "hello", "boolField": true, "realField": 1.3, "blobField": encoded},
        ])
    );
}

#[tokio::test]
async fn test_blob_round_trips_through_base64() {
    let fixture = SqliteFixture::scenario().await;

    let bytes = transform_query(
        &fixture.client,
        "SELECT blobField FROM srt_test WHERE intField = 1",
        &JsonTransformer::new(),
    )
    .await
    .unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap();

    let decoded = STANDARD
        .decode(value[0]["blobField"].as_str().unwrap())
        .unwrap();
    assert_eq!(decoded, BLOB.to_vec());
}

#[tokio::test]
async fn test_empty_blob_renders_empty_string() {
    let fixture = SqliteFixture::new(
        "CREATE TABLE blobs (id int, data blob);
         INSERT INTO blobs VALUES (1, X''), (2, NULL);",
    )
    .await;

    let bytes = transform_query(
        &fixture.client,
        "SELECT id, data FROM blobs ORDER BY id",
        &JsonTransformer::new(),
    )
    .await
    .unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(value, json!([{"id": 1, "data": ""}, {"id": 2, "data": null}]));
}

#[tokio::test]
async fn test_zero_rows_renders_empty_array() {
    let fixture = SqliteFixture::scenario().await;

    let bytes = transform_query(
        &fixture.client,
        "SELECT * FROM srt_test WHERE intField > 100",
        &JsonTransformer::new(),
    )
    .await
    .unwrap();

    assert_eq!(bytes, b"[]".to_vec());
}

#[tokio::test]
async fn test_json_lines_output() {
    let fixture = SqliteFixture::scenario().await;

    let bytes = transform_query(
        &fixture.client,
        "SELECT intField FROM srt_test ORDER BY rowid",
        &JsonLinesTransformer,
    )
    .await
    .unwrap();
    let text = String::from_utf8(bytes).unwrap();

    assert_eq!(
        text,
        "{\"intField\":1}\n{\"intField\":2}\n{\"intField\":3}\n{\"intField\":null}\n"
    );
}

#[tokio::test]
async fn test_query_error_produces_no_output() {
    let fixture = SqliteFixture::scenario().await;

    let result = transform_query(
        &fixture.client,
        "SELECT * FROM srt_missing",
        &JsonTransformer::new(),
    )
    .await;

    assert!(matches!(result, Err(SrtError::Query(_))));
}

#[tokio::test]
async fn test_transform_error_is_surfaced() {
    let fixture = SqliteFixture::scenario().await;

    let result = transform_query(&fixture.client, "SELECT * FROM srt_test", &RejectingTransformer)
        .await;

    match result {
        Err(SrtError::Transform(msg)) => assert!(msg.contains("cannot represent")),
        other => panic!("Expected transform error, got {other:?}"),
    }
}
