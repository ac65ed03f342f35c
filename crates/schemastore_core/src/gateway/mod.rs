//! JSON document and log gateway over the remote platform.
//!
//! # Responsibility
//! - Own the lazily created backend handle.
//! - Expose document, listing and log operations with typed results.
//!
//! # Invariants
//! - At most one backend handle exists per gateway instance.
//! - A failed handle creation caches nothing; the next call retries.
//! - Gateway operations never panic; every failure is a `GatewayError`.

use crate::backend::BackendError;
use crate::config::ConfigError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::string::FromUtf8Error;

mod storage_gateway;

pub use storage_gateway::{StorageGateway, JSON_CONTENT_TYPE};

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failure of a gateway operation, grouped by cause.
#[derive(Debug)]
pub enum GatewayError {
    /// Required configuration is absent.
    Config(ConfigError),
    /// Backend handle construction failed.
    Connect(BackendError),
    /// Remote call failed.
    Remote(BackendError),
    /// Value could not be serialized to JSON.
    Encode(serde_json::Error),
    /// Stored bytes are not valid UTF-8 JSON of the requested shape.
    Decode(DecodeError),
}

/// Decode failure detail for downloaded documents.
#[derive(Debug)]
pub enum DecodeError {
    Utf8(FromUtf8Error),
    Json(serde_json::Error),
}

impl GatewayError {
    /// Returns whether the gateway had no usable handle.
    pub fn is_not_initialized(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Connect(_))
    }
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "storage not initialized: {err}"),
            Self::Connect(err) => write!(f, "storage not initialized: {err}"),
            Self::Remote(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode JSON: {err}"),
            Self::Decode(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GatewayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Connect(err) => Some(err),
            Self::Remote(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::Decode(err) => Some(err),
        }
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Utf8(err) => write!(f, "stored document is not UTF-8: {err}"),
            Self::Json(err) => write!(f, "stored document is not valid JSON: {err}"),
        }
    }
}

impl Error for DecodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Utf8(err) => Some(err),
            Self::Json(err) => Some(err),
        }
    }
}

impl From<ConfigError> for GatewayError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DecodeError> for GatewayError {
    fn from(value: DecodeError) -> Self {
        Self::Decode(value)
    }
}
