use chrono::{NaiveDate, TimeZone, Utc};
use schemastore_core::{
    DecodeError, GatewayConfig, GatewayError, LogRange, LogRow, MemoryBackend, Notifier,
    StorageGateway,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<(&'static str, String)>>,
}

impl RecordingNotifier {
    fn messages(&self) -> Vec<(&'static str, String)> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.messages.lock().unwrap().push(("success", message.to_string()));
    }

    fn error(&self, message: &str) {
        self.messages.lock().unwrap().push(("error", message.to_string()));
    }
}

fn gateway() -> (StorageGateway<MemoryBackend>, MemoryBackend, Arc<RecordingNotifier>) {
    let backend = MemoryBackend::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let gateway = StorageGateway::with_backend(
        GatewayConfig::new("https://project.example.test", "service-key"),
        backend.clone(),
    )
    .with_notifier(notifier.clone());
    (gateway, backend, notifier)
}

#[test]
fn upload_then_download_roundtrips_value() {
    let (gateway, backend, notifier) = gateway();
    let document = json!({
        "events": [{"name": "checkout", "params": {"value": 12.5, "currency": "EUR"}}],
        "version": 3,
        "draft": false,
        "owner": null
    });

    gateway.upload_json(&document, "a.json", false).unwrap();
    let loaded: Option<Value> = gateway.download_json("a.json").unwrap();

    assert_eq!(loaded, Some(document));
    let stored = backend.object("schemas", "a.json").unwrap();
    assert_eq!(stored.content_type, "application/json");
    assert_eq!(
        notifier.messages(),
        vec![("success", "Upload completed successfully!".to_string())]
    );
}

#[test]
fn upload_overwrites_existing_object() {
    let (gateway, _backend, _notifier) = gateway();

    gateway.upload_json(&json!({"v": 1}), "a.json", true).unwrap();
    gateway.upload_json(&json!({"v": 2}), "a.json", true).unwrap();

    let loaded: Option<Value> = gateway.download_json("a.json").unwrap();
    assert_eq!(loaded, Some(json!({"v": 2})));
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct EventSchema {
    name: String,
    required: Vec<String>,
}

#[test]
fn typed_documents_roundtrip() {
    let (gateway, _backend, _notifier) = gateway();
    let schema = EventSchema {
        name: "purchase".to_string(),
        required: vec!["value".to_string(), "currency".to_string()],
    };

    gateway.upload_json(&schema, "schemas/purchase.json", true).unwrap();
    let loaded: Option<EventSchema> = gateway.download_json("schemas/purchase.json").unwrap();

    assert_eq!(loaded, Some(schema));
}

#[test]
fn download_missing_object_returns_none() {
    let (gateway, _backend, notifier) = gateway();

    let loaded: Option<Value> = gateway.download_json("missing.json").unwrap();

    assert!(loaded.is_none());
    assert!(notifier.messages().is_empty());
}

#[test]
fn download_rejects_malformed_documents() {
    let (gateway, backend, _notifier) = gateway();
    backend.put_raw("schemas", "broken.json", "{not json");
    backend.put_raw("schemas", "binary.json", vec![0xff, 0xfe, 0x00]);

    let err = gateway.download_json::<Value>("broken.json").unwrap_err();
    assert!(matches!(err, GatewayError::Decode(DecodeError::Json(_))));

    let err = gateway.download_json::<Value>("binary.json").unwrap_err();
    assert!(matches!(err, GatewayError::Decode(DecodeError::Utf8(_))));
}

#[test]
fn list_returns_only_json_names_in_remote_order() {
    let (gateway, backend, _notifier) = gateway();
    gateway.upload_json(&json!({}), "b.json", true).unwrap();
    gateway.upload_json(&json!({}), "a.json", true).unwrap();
    backend.put_raw("schemas", "b.txt", "plain text");
    gateway.upload_json(&json!({}), "drafts/c.json", true).unwrap();

    let names = gateway.list_json_names("").unwrap();
    assert_eq!(names, vec!["a.json", "b.json"]);

    let nested = gateway.list_json_names("drafts").unwrap();
    assert_eq!(nested, vec!["c.json"]);
}

#[test]
fn delete_then_download_returns_none() {
    let (gateway, _backend, _notifier) = gateway();
    gateway.upload_json(&json!({"k": 1}), "a.json", true).unwrap();

    gateway.delete_blob("a.json").unwrap();

    let loaded: Option<Value> = gateway.download_json("a.json").unwrap();
    assert!(loaded.is_none());
    assert!(gateway.list_json_names("").unwrap().is_empty());
}

#[test]
fn fetch_logs_returns_rows_inside_inclusive_range() {
    let (gateway, _backend, _notifier) = gateway();
    let rows = vec![
        LogRow::new("2024-05-01T08:00:00Z").with_field("event_name", "before"),
        LogRow::new("2024-05-02T00:00:00Z").with_field("event_name", "start_edge"),
        LogRow::new("2024-05-02T12:00:00+02:00").with_field("event_name", "inside"),
        LogRow::new("2024-05-03T00:00:00Z").with_field("event_name", "end_edge"),
        LogRow::new("2024-05-03T00:00:01Z").with_field("event_name", "after"),
    ];
    assert_eq!(gateway.insert_logs(&rows).unwrap(), 5);

    let range = LogRange::new(
        Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 0).unwrap(),
    );
    let fetched = gateway.fetch_logs(&range).unwrap();

    let names: Vec<&str> = fetched
        .iter()
        .filter_map(|row| row.field("event_name").and_then(Value::as_str))
        .collect();
    assert_eq!(names, vec!["start_edge", "inside", "end_edge"]);
}

#[test]
fn fetch_logs_for_whole_days_includes_evening_rows() {
    let (gateway, _backend, _notifier) = gateway();
    gateway
        .insert_logs(&[
            LogRow::new("2024-05-02T23:30:00Z").with_field("status", "valid"),
            LogRow::new("2024-05-03T00:00:00Z").with_field("status", "valid"),
        ])
        .unwrap();

    let range = LogRange::whole_days(
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
    );
    let fetched = gateway.fetch_logs(&range).unwrap();

    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].timestamp, "2024-05-02T23:30:00Z");
}

#[test]
fn fetch_logs_failure_is_reported_to_user() {
    let (gateway, backend, notifier) = gateway();
    backend.set_unavailable(true);

    let range = LogRange::whole_days(
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
    );
    let err = gateway.fetch_logs(&range).unwrap_err();

    assert!(matches!(err, GatewayError::Remote(_)));
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "error");
    assert!(messages[0].1.starts_with("Error fetching logs:"));
}

#[test]
fn upload_failure_is_reported_unless_silent() {
    let (gateway, backend, notifier) = gateway();
    backend.set_unavailable(true);

    assert!(gateway.upload_json(&json!({}), "a.json", true).is_err());
    assert!(notifier.messages().is_empty());

    assert!(gateway.upload_json(&json!({}), "a.json", false).is_err());
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].1.starts_with("Upload failed:"));
}

#[test]
fn unencodable_value_is_an_encode_error() {
    let (gateway, backend, notifier) = gateway();
    let mut by_cell: HashMap<(i32, i32), i32> = HashMap::new();
    by_cell.insert((0, 1), 7);

    let err = gateway.upload_json(&by_cell, "grid.json", true).unwrap_err();
    assert!(matches!(err, GatewayError::Encode(_)));
    assert!(notifier.messages().is_empty());

    let err = gateway.upload_json(&by_cell, "grid.json", false).unwrap_err();
    assert!(matches!(err, GatewayError::Encode(_)));
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "error");
    assert!(messages[0].1.starts_with("Upload failed:"));
    assert!(backend.object("schemas", "grid.json").is_none());
}

#[test]
fn remote_failures_on_read_paths_are_not_user_reported() {
    let (gateway, backend, notifier) = gateway();
    backend.set_unavailable(true);

    assert!(matches!(
        gateway.download_json::<Value>("a.json"),
        Err(GatewayError::Remote(_))
    ));
    assert!(gateway.list_json_names("").is_err());
    assert!(gateway.delete_blob("a.json").is_err());
    assert!(notifier.messages().is_empty());
}

#[test]
fn repo_document_saves_silently_under_configured_name() {
    let backend = MemoryBackend::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let mut config = GatewayConfig::new("https://project.example.test", "service-key");
    config.repo_file_name = "params/repo.json".to_string();
    let gateway = StorageGateway::with_backend(config, backend.clone())
        .with_notifier(notifier.clone());

    gateway.save_repo_document(&json!({"k": 1})).unwrap();
    let loaded: Option<Value> = gateway.get_repo_document().unwrap();

    assert_eq!(loaded, Some(json!({"k": 1})));
    assert!(backend.object("schemas", "params/repo.json").is_some());
    assert!(notifier.messages().is_empty());
}

#[test]
fn insert_logs_appends_rows_in_order() {
    let (gateway, backend, _notifier) = gateway();

    let written = gateway
        .insert_logs(&[
            LogRow::new("2024-05-02T10:00:00Z")
                .with_field("status", "invalid")
                .with_field("field", "currency"),
            LogRow::new("2024-05-02T10:00:01Z")
                .with_field("status", "invalid")
                .with_field("field", "value"),
        ])
        .unwrap();

    assert_eq!(written, 2);
    let stored = backend.rows("event_logs");
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].field("field"), Some(&json!("value")));
}
