//! Remote platform access contracts and implementations.
//!
//! # Responsibility
//! - Define the object storage and log table seams used by the gateway.
//! - Keep HTTP/wire details inside backend implementations.
//!
//! # Invariants
//! - Backends report missing objects as `BackendError::NotFound`, never as a
//!   generic status error.
//! - Backends perform exactly one remote call per trait method; no retries.

use crate::config::{Credentials, GatewayConfig};
use crate::model::log_row::LogRow;
use crate::model::object_entry::ObjectEntry;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory;
pub mod rest;

pub use memory::MemoryBackend;
pub use rest::{RestBackend, RestConnector};

pub type BackendResult<T> = Result<T, BackendError>;

/// Failure of a single remote call or of backend construction.
#[derive(Debug)]
pub enum BackendError {
    /// Requested object or resource does not exist.
    NotFound(String),
    /// Remote answered with a non-success status.
    Status { code: u16, message: String },
    /// Request never produced a response (DNS, TLS, timeout, ...).
    Transport(reqwest::Error),
    /// Response arrived but could not be interpreted.
    InvalidResponse(String),
    /// Backend could not be constructed from the given settings.
    InvalidSettings(String),
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::Status { code, message } => write!(f, "remote error {code}: {message}"),
            Self::Transport(err) => write!(f, "transport error: {err}"),
            Self::InvalidResponse(message) => write!(f, "invalid response: {message}"),
            Self::InvalidSettings(message) => write!(f, "invalid backend settings: {message}"),
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value)
    }
}

impl BackendError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Object container operations.
pub trait ObjectStore {
    /// Writes `bytes` at `path`; replaces an existing object when `upsert`.
    fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> BackendResult<()>;
    fn download(&self, bucket: &str, path: &str) -> BackendResult<Vec<u8>>;
    /// Lists entries directly under `prefix`, in remote order.
    fn list(&self, bucket: &str, prefix: &str) -> BackendResult<Vec<ObjectEntry>>;
    fn remove(&self, bucket: &str, paths: &[&str]) -> BackendResult<()>;
}

/// Log table operations.
pub trait LogTable {
    /// Selects rows with `gte <= column <= lte`, in remote order.
    fn select_range(
        &self,
        table: &str,
        column: &str,
        gte: &str,
        lte: &str,
    ) -> BackendResult<Vec<LogRow>>;
    fn insert(&self, table: &str, rows: &[LogRow]) -> BackendResult<()>;
}

/// Full remote surface needed by the gateway.
pub trait Backend: ObjectStore + LogTable {}

impl<T: ObjectStore + LogTable> Backend for T {}

/// Builds a backend handle from resolved credentials.
///
/// Called lazily by the gateway; a failed call leaves nothing cached.
pub trait Connector {
    type Backend: Backend;

    fn connect(
        &self,
        credentials: &Credentials,
        config: &GatewayConfig,
    ) -> BackendResult<Self::Backend>;
}
