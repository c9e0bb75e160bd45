//! Error types for altlb

use thiserror::Error;

/// Main error type for altlb
#[derive(Error, Debug)]
pub enum LbError {
    // Configuration errors
    #[error("bootstrap node list cannot be empty")]
    EmptyBootstrap,

    #[error("invalid node address {address:?}: {reason}")]
    InvalidNodeAddress { address: String, reason: String },

    #[error("invalid scheme: {0}, supported schemes: http, https")]
    InvalidScheme(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("node returned empty list, datacenter or rack might be incorrect ({0})")]
    UnknownRackOrDatacenter(String),

    // Transport errors
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("network timeout")]
    Timeout,

    // Protocol errors
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("malformed node list: {0}")]
    MalformedBody(String),

    #[error("node returned empty list")]
    EmptyNodeList,

    // Internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl LbError {
    pub fn invalid_address(address: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidNodeAddress {
            address: address.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::ConnectionFailed(_) | Self::Timeout)
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::EmptyBootstrap
                | Self::InvalidNodeAddress { .. }
                | Self::InvalidScheme(_)
                | Self::InvalidConfig(_)
                | Self::UnknownRackOrDatacenter(_)
        )
    }

    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedStatus { .. } | Self::MalformedBody(_) | Self::EmptyNodeList
        )
    }
}

impl From<serde_json::Error> for LbError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedBody(err.to_string())
    }
}

/// Result type alias for altlb
pub type Result<T> = std::result::Result<T, LbError>;
