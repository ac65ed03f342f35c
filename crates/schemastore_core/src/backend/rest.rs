//! Blocking HTTP backend for the hosted platform's storage and REST APIs.
//!
//! # Responsibility
//! - Translate `ObjectStore` / `LogTable` calls into single HTTP requests.
//! - Map HTTP failures into `BackendError` without leaking response bodies
//!   into logs.
//!
//! # Invariants
//! - Every request carries `apikey` and bearer `Authorization` headers.
//! - Object paths keep their `/` separators; every other byte is escaped per
//!   path segment.
//! - One call, one request. Nothing is retried here.

use super::{BackendError, BackendResult, Connector, LogTable, ObjectStore};
use crate::config::{Credentials, GatewayConfig};
use crate::logging::sanitize_message;
use crate::model::log_row::LogRow;
use crate::model::object_entry::ObjectEntry;
use log::debug;
use reqwest::blocking::{Client, Response};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use url::Url;

const STORAGE_API: &str = "storage/v1";
const REST_API: &str = "rest/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const LIST_LIMIT: u32 = 100;
const UPLOAD_CACHE_CONTROL: &str = "max-age=3600";
const MAX_ERROR_MESSAGE_CHARS: usize = 200;

const APIKEY_HEADER: &str = "apikey";
const UPSERT_HEADER: &str = "x-upsert";
const PREFER_HEADER: &str = "prefer";

/// Connects gateways to the hosted platform over HTTPS.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestConnector;

impl Connector for RestConnector {
    type Backend = RestBackend;

    fn connect(
        &self,
        credentials: &Credentials,
        _config: &GatewayConfig,
    ) -> BackendResult<RestBackend> {
        RestBackend::new(&credentials.endpoint_url, &credentials.access_key)
    }
}

/// HTTP client bound to one platform endpoint and access key.
#[derive(Debug, Clone)]
pub struct RestBackend {
    base: Url,
    client: Client,
}

impl RestBackend {
    /// Builds a client for `endpoint_url` authenticated with `access_key`.
    ///
    /// # Errors
    /// - `InvalidSettings` when the endpoint is not an absolute http(s) URL,
    ///   the key cannot be sent as a header, or the HTTP client fails to build.
    pub fn new(endpoint_url: &str, access_key: &str) -> BackendResult<Self> {
        let base = parse_endpoint(endpoint_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(APIKEY_HEADER), sensitive_header(access_key)?);
        headers.insert(AUTHORIZATION, sensitive_header(&format!("Bearer {access_key}"))?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| {
                BackendError::InvalidSettings(format!("failed to build HTTP client: {err}"))
            })?;

        Ok(Self { base, client })
    }

    /// Endpoint this backend talks to.
    pub fn endpoint(&self) -> &Url {
        &self.base
    }

    fn url(&self, api: &str, parts: &[&str]) -> BackendResult<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                BackendError::InvalidSettings("endpoint cannot carry a path".to_string())
            })?;
            segments.pop_if_empty();
            segments.extend(api.split('/'));
            for part in parts {
                segments.extend(part.split('/').filter(|segment| !segment.is_empty()));
            }
        }
        Ok(url)
    }
}

impl ObjectStore for RestBackend {
    fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> BackendResult<()> {
        let url = self.url(STORAGE_API, &["object", bucket, path])?;
        let started_at = Instant::now();
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, content_type)
            .header(CACHE_CONTROL, UPLOAD_CACHE_CONTROL)
            .header(UPSERT_HEADER, if upsert { "true" } else { "false" })
            .body(bytes)
            .send()?;
        ensure_success(response, path)?;
        trace_call("storage_upload", started_at);
        Ok(())
    }

    fn download(&self, bucket: &str, path: &str) -> BackendResult<Vec<u8>> {
        let url = self.url(STORAGE_API, &["object", bucket, path])?;
        let started_at = Instant::now();
        let response = ensure_success(self.client.get(url).send()?, path)?;
        let bytes = response.bytes()?;
        trace_call("storage_download", started_at);
        Ok(bytes.to_vec())
    }

    fn list(&self, bucket: &str, prefix: &str) -> BackendResult<Vec<ObjectEntry>> {
        let url = self.url(STORAGE_API, &["object", "list", bucket])?;
        let body = json!({
            "prefix": prefix,
            "limit": LIST_LIMIT,
            "offset": 0,
            "sortBy": { "column": "name", "order": "asc" },
        });
        let started_at = Instant::now();
        let response = ensure_success(self.client.post(url).json(&body).send()?, bucket)?;
        let entries = decode_json(response)?;
        trace_call("storage_list", started_at);
        Ok(entries)
    }

    fn remove(&self, bucket: &str, paths: &[&str]) -> BackendResult<()> {
        let url = self.url(STORAGE_API, &["object", bucket])?;
        let started_at = Instant::now();
        let response = self
            .client
            .delete(url)
            .json(&json!({ "prefixes": paths }))
            .send()?;
        ensure_success(response, bucket)?;
        trace_call("storage_remove", started_at);
        Ok(())
    }
}

impl LogTable for RestBackend {
    fn select_range(
        &self,
        table: &str,
        column: &str,
        gte: &str,
        lte: &str,
    ) -> BackendResult<Vec<LogRow>> {
        let mut url = self.url(REST_API, &[table])?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair(column, &format!("gte.{gte}"))
            .append_pair(column, &format!("lte.{lte}"));

        let started_at = Instant::now();
        let response = ensure_success(self.client.get(url).send()?, table)?;
        let rows = decode_json(response)?;
        trace_call("table_select", started_at);
        Ok(rows)
    }

    fn insert(&self, table: &str, rows: &[LogRow]) -> BackendResult<()> {
        let url = self.url(REST_API, &[table])?;
        let started_at = Instant::now();
        let response = self
            .client
            .post(url)
            .header(PREFER_HEADER, "return=minimal")
            .json(rows)
            .send()?;
        ensure_success(response, table)?;
        trace_call("table_insert", started_at);
        Ok(())
    }
}

fn parse_endpoint(endpoint_url: &str) -> BackendResult<Url> {
    let trimmed = endpoint_url.trim();
    let url = Url::parse(trimmed).map_err(|err| {
        BackendError::InvalidSettings(format!("endpoint `{trimmed}` is not a valid URL: {err}"))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(BackendError::InvalidSettings(format!(
            "endpoint scheme must be http or https, got `{}`",
            url.scheme()
        )));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(BackendError::InvalidSettings(format!(
            "endpoint `{trimmed}` has no host"
        )));
    }
    Ok(url)
}

fn sensitive_header(value: &str) -> BackendResult<HeaderValue> {
    let mut header = HeaderValue::from_str(value).map_err(|_| {
        BackendError::InvalidSettings(
            "access key contains characters not allowed in headers".to_string(),
        )
    })?;
    header.set_sensitive(true);
    Ok(header)
}

fn ensure_success(response: Response, subject: &str) -> BackendResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(classify_failure(status, &body, subject))
}

fn decode_json<T: DeserializeOwned>(response: Response) -> BackendResult<T> {
    let bytes = response.bytes()?;
    serde_json::from_slice(&bytes)
        .map_err(|err| BackendError::InvalidResponse(format!("unexpected response body: {err}")))
}

/// Maps a failed response onto `NotFound` or `Status`.
///
/// Storage answers missing objects with `400` and a JSON body whose
/// `statusCode` is `"404"`, so the body is inspected as well as the status.
pub(crate) fn classify_failure(status: StatusCode, body: &str, subject: &str) -> BackendError {
    let parsed = serde_json::from_str::<Value>(body).ok();
    if status == StatusCode::NOT_FOUND || parsed.as_ref().is_some_and(says_not_found) {
        return BackendError::NotFound(subject.to_string());
    }

    let message = parsed
        .as_ref()
        .and_then(|value| {
            value
                .get("message")
                .or_else(|| value.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .or_else(|| Some(body.trim().to_string()).filter(|text| !text.is_empty()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

    BackendError::Status {
        code: status.as_u16(),
        message: sanitize_message(&message, MAX_ERROR_MESSAGE_CHARS),
    }
}

fn says_not_found(body: &Value) -> bool {
    let status_code_is_404 = match body.get("statusCode") {
        Some(Value::String(code)) => code == "404",
        Some(Value::Number(code)) => code.as_u64() == Some(404),
        _ => false,
    };
    let text_mentions_not_found = ["error", "message"].iter().any(|key| {
        body.get(*key)
            .and_then(Value::as_str)
            .map(|text| {
                let lowered = text.to_ascii_lowercase();
                lowered.contains("not found") || lowered.contains("not_found")
            })
            .unwrap_or(false)
    });
    status_code_is_404 || text_mentions_not_found
}

fn trace_call(operation: &str, started_at: Instant) {
    debug!(
        "event=remote_call module=backend op={} status=ok duration_ms={}",
        operation,
        started_at.elapsed().as_millis()
    );
}

#[cfg(test)]
mod tests {
    use super::{classify_failure, RestBackend};
    use crate::backend::BackendError;
    use reqwest::StatusCode;

    #[test]
    fn storage_404_body_maps_to_not_found() {
        let err = classify_failure(
            StatusCode::BAD_REQUEST,
            r#"{"statusCode":"404","error":"not_found","message":"Object not found"}"#,
            "a.json",
        );
        assert!(matches!(err, BackendError::NotFound(ref name) if name == "a.json"));
    }

    #[test]
    fn plain_404_maps_to_not_found() {
        let err = classify_failure(StatusCode::NOT_FOUND, "", "event_logs");
        assert!(err.is_not_found());
    }

    #[test]
    fn other_failures_keep_status_and_message() {
        let err = classify_failure(
            StatusCode::UNAUTHORIZED,
            r#"{"message":"Invalid API key"}"#,
            "a.json",
        );
        match err {
            BackendError::Status { code, message } => {
                assert_eq!(code, 401);
                assert_eq!(message, "Invalid API key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_failure_body_falls_back_to_reason_phrase() {
        let err = classify_failure(StatusCode::BAD_GATEWAY, "", "a.json");
        assert_eq!(err.to_string(), "remote error 502: Bad Gateway");
    }

    #[test]
    fn endpoint_must_be_http_url() {
        let err = RestBackend::new("ftp://example.test", "key").expect_err("ftp is rejected");
        assert!(matches!(err, BackendError::InvalidSettings(_)));

        let err = RestBackend::new("not a url", "key").expect_err("garbage is rejected");
        assert!(matches!(err, BackendError::InvalidSettings(_)));
    }

    #[test]
    fn access_key_must_be_header_safe() {
        let err = RestBackend::new("https://example.test", "bad\nkey")
            .expect_err("newline in key is rejected");
        assert!(err.to_string().contains("access key"));
    }

    #[test]
    fn object_paths_keep_separators_and_escape_segments() {
        let backend = RestBackend::new("https://example.test/", "key").expect("valid settings");
        let url = backend
            .url("storage/v1", &["object", "schemas", "drafts/my doc.json"])
            .expect("url builds");
        assert_eq!(
            url.as_str(),
            "https://example.test/storage/v1/object/schemas/drafts/my%20doc.json"
        );
    }
}
