//! `StorageGateway` implementation.
//!
//! # Responsibility
//! - Resolve the backend handle on first use and cache it.
//! - Encode/decode JSON documents and filter listings to `.json` names.
//! - Report user-facing outcomes through the configured `Notifier`.
//!
//! # Invariants
//! - Silent calls suppress upload outcome messages only; a missing or failed
//!   handle is reported on every call.
//! - Payload bytes and access keys are never logged.

use super::{DecodeError, GatewayError, GatewayResult};
use crate::backend::{Backend, BackendError, Connector, RestBackend, RestConnector};
use crate::config::GatewayConfig;
use crate::model::log_row::{LogRange, LogRow, TIMESTAMP_COLUMN};
use crate::notify::{LogNotifier, Notifier};
use log::{debug, error, info, warn};
use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Content type attached to every uploaded document.
pub const JSON_CONTENT_TYPE: &str = "application/json";

const UPLOAD_SUCCESS_MESSAGE: &str = "Upload completed successfully!";

type BoxedConnector<B> = Box<dyn Connector<Backend = B> + Send + Sync>;

/// Gateway for JSON documents in object storage and rows in the log table.
///
/// Construct one per application at startup and share it by reference or
/// `Arc`; every operation routes through the same backend handle.
pub struct StorageGateway<B: Backend> {
    config: GatewayConfig,
    connector: Option<BoxedConnector<B>>,
    handle: OnceCell<B>,
    notifier: Arc<dyn Notifier>,
}

impl StorageGateway<RestBackend> {
    /// Creates a gateway that connects to the hosted platform on first use.
    pub fn from_config(config: GatewayConfig) -> Self {
        Self::lazy(config, RestConnector)
    }
}

impl<B: Backend> StorageGateway<B> {
    /// Creates a gateway that builds its handle through `connector` on first use.
    pub fn lazy<C>(config: GatewayConfig, connector: C) -> Self
    where
        C: Connector<Backend = B> + Send + Sync + 'static,
    {
        Self {
            config,
            connector: Some(Box::new(connector)),
            handle: OnceCell::new(),
            notifier: Arc::new(LogNotifier),
        }
    }

    /// Creates a gateway around an already constructed backend.
    pub fn with_backend(config: GatewayConfig, backend: B) -> Self {
        Self {
            config,
            connector: None,
            handle: OnceCell::with_value(backend),
            notifier: Arc::new(LogNotifier),
        }
    }

    /// Replaces the notifier receiving user-facing messages.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Returns whether a backend handle is currently cached.
    pub fn is_connected(&self) -> bool {
        self.handle.get().is_some()
    }

    /// Returns the cached backend handle, creating it when absent.
    ///
    /// # Errors
    /// - `GatewayError::Config` when endpoint or key is missing.
    /// - `GatewayError::Connect` when the backend constructor fails.
    ///
    /// Both failures are reported to the notifier on every call, including
    /// calls made in silent mode.
    pub fn handle(&self) -> GatewayResult<&B> {
        if let Some(backend) = self.handle.get() {
            return Ok(backend);
        }
        self.connect()
    }

    /// Serializes `data` and upserts it at `name` as `application/json`.
    ///
    /// Overwrites any existing object. Unless `silent`, the outcome is
    /// reported to the notifier.
    pub fn upload_json<T>(&self, data: &T, name: &str, silent: bool) -> GatewayResult<()>
    where
        T: Serialize + ?Sized,
    {
        let started_at = Instant::now();
        let result = self.upload_inner(data, name);

        match &result {
            Ok(bytes) => {
                info!(
                    "event=json_upload module=gateway status=ok name={} bytes={} duration_ms={}",
                    name,
                    bytes,
                    started_at.elapsed().as_millis()
                );
                if !silent {
                    self.notifier.success(UPLOAD_SUCCESS_MESSAGE);
                }
            }
            Err(err) => {
                error!(
                    "event=json_upload module=gateway status=error name={} duration_ms={} error={}",
                    name,
                    started_at.elapsed().as_millis(),
                    err
                );
                if !silent && !err.is_not_initialized() {
                    self.notifier.error(&format!("Upload failed: {err}"));
                }
            }
        }

        result.map(|_| ())
    }

    /// Downloads and decodes the JSON document at `name`.
    ///
    /// Returns `Ok(None)` when the object does not exist.
    pub fn download_json<T: DeserializeOwned>(&self, name: &str) -> GatewayResult<Option<T>> {
        let backend = self.handle()?;
        let bytes = match backend.download(&self.config.storage_bucket, name) {
            Ok(bytes) => bytes,
            Err(err) if err.is_not_found() => {
                warn!("event=json_download module=gateway status=not_found name={name}");
                return Ok(None);
            }
            Err(err) => {
                error!("event=json_download module=gateway status=error name={name} error={err}");
                return Err(GatewayError::Remote(err));
            }
        };

        match decode_document(bytes) {
            Ok(value) => {
                debug!("event=json_download module=gateway status=ok name={name}");
                Ok(Some(value))
            }
            Err(err) => {
                error!(
                    "event=json_download module=gateway status=error error_code=decode_failed name={name} error={err}"
                );
                Err(err.into())
            }
        }
    }

    /// Lists names under `prefix` ending in `.json`, in remote order.
    pub fn list_json_names(&self, prefix: &str) -> GatewayResult<Vec<String>> {
        let backend = self.handle()?;
        let entries = backend
            .list(&self.config.storage_bucket, prefix)
            .map_err(|err| {
                error!("event=blob_list module=gateway status=error prefix={prefix} error={err}");
                GatewayError::Remote(err)
            })?;

        let names: Vec<String> = entries
            .into_iter()
            .filter(|entry| entry.is_json())
            .map(|entry| entry.name)
            .collect();
        debug!(
            "event=blob_list module=gateway status=ok prefix={} count={}",
            prefix,
            names.len()
        );
        Ok(names)
    }

    /// Removes the object at `name`.
    pub fn delete_blob(&self, name: &str) -> GatewayResult<()> {
        let backend = self.handle()?;
        backend
            .remove(&self.config.storage_bucket, &[name])
            .map_err(|err| {
                error!("event=blob_delete module=gateway status=error name={name} error={err}");
                GatewayError::Remote(err)
            })?;
        info!("event=blob_delete module=gateway status=ok name={name}");
        Ok(())
    }

    /// Fetches log rows whose `timestamp` lies in the inclusive `range`.
    ///
    /// Rows come back in whatever order the remote returns them.
    pub fn fetch_logs(&self, range: &LogRange) -> GatewayResult<Vec<LogRow>> {
        let backend = self.handle()?;
        let started_at = Instant::now();
        match backend.select_range(
            &self.config.db_table,
            TIMESTAMP_COLUMN,
            &range.gte_bound(),
            &range.lte_bound(),
        ) {
            Ok(rows) => {
                info!(
                    "event=logs_fetch module=gateway status=ok count={} duration_ms={}",
                    rows.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(rows)
            }
            Err(err) => {
                error!(
                    "event=logs_fetch module=gateway status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                self.notifier.error(&format!("Error fetching logs: {err}"));
                Err(GatewayError::Remote(err))
            }
        }
    }

    /// Appends `rows` to the log table in one call.
    ///
    /// Empty input is a no-op that does not touch the backend handle.
    /// Returns the number of rows written.
    pub fn insert_logs(&self, rows: &[LogRow]) -> GatewayResult<usize> {
        if rows.is_empty() {
            debug!("event=logs_insert module=gateway status=skipped count=0");
            return Ok(0);
        }

        let backend = self.handle()?;
        backend
            .insert(&self.config.db_table, rows)
            .map_err(|err| {
                error!(
                    "event=logs_insert module=gateway status=error count={} error={}",
                    rows.len(),
                    err
                );
                GatewayError::Remote(err)
            })?;

        let first = &rows[0];
        let outcome = if first.status() == Some("valid") {
            "valid"
        } else {
            "invalid"
        };
        let kind = if first.field("field").is_some() {
            "fields"
        } else {
            "events"
        };
        info!(
            "event=logs_insert module=gateway status=ok count={} outcome={} kind={} table={}",
            rows.len(),
            outcome,
            kind,
            self.config.db_table
        );
        Ok(rows.len())
    }

    /// Downloads the repository document.
    pub fn get_repo_document<T: DeserializeOwned>(&self) -> GatewayResult<Option<T>> {
        self.download_json(&self.config.repo_file_name)
    }

    /// Uploads the repository document without user-facing notifications.
    pub fn save_repo_document<T>(&self, data: &T) -> GatewayResult<()>
    where
        T: Serialize + ?Sized,
    {
        self.upload_json(data, &self.config.repo_file_name, true)
    }

    fn upload_inner<T>(&self, data: &T, name: &str) -> GatewayResult<usize>
    where
        T: Serialize + ?Sized,
    {
        let backend = self.handle()?;
        let bytes = serde_json::to_vec(data).map_err(GatewayError::Encode)?;
        let len = bytes.len();
        backend
            .upload(
                &self.config.storage_bucket,
                name,
                bytes,
                JSON_CONTENT_TYPE,
                true,
            )
            .map_err(GatewayError::Remote)?;
        Ok(len)
    }

    fn connect(&self) -> GatewayResult<&B> {
        let credentials = match self.config.credentials() {
            Ok(credentials) => credentials,
            Err(err) => {
                warn!(
                    "event=gateway_connect module=gateway status=error error_code=config_missing error={err}"
                );
                self.notifier
                    .error(&format!("Storage not initialized: {err}"));
                return Err(err.into());
            }
        };

        let Some(connector) = self.connector.as_ref() else {
            // Only gateways built with a ready backend lack a connector, and
            // their handle is always set.
            return Err(GatewayError::Connect(BackendError::InvalidSettings(
                "no connector configured".to_string(),
            )));
        };

        let started_at = Instant::now();
        self.handle
            .get_or_try_init(|| -> Result<B, BackendError> {
                let backend = connector.connect(&credentials, &self.config)?;
                info!(
                    "event=gateway_connect module=gateway status=ok bucket={} table={} duration_ms={}",
                    self.config.storage_bucket,
                    self.config.db_table,
                    started_at.elapsed().as_millis()
                );
                Ok(backend)
            })
            .map_err(|err| {
                warn!(
                    "event=gateway_connect module=gateway status=error error_code=connect_failed duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                self.notifier.error(&format!("Storage init error: {err}"));
                GatewayError::Connect(err)
            })
    }
}

fn decode_document<T: DeserializeOwned>(bytes: Vec<u8>) -> Result<T, DecodeError> {
    let text = String::from_utf8(bytes).map_err(DecodeError::Utf8)?;
    serde_json::from_str(&text).map_err(DecodeError::Json)
}
