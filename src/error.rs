//! Error types and result alias for the record store.
//!
//! All store and resolver operations return [`Result<T>`], which wraps the
//! canonical [`StoreError`] variants. Ledger client implementations must map
//! their internal failures to these variants so that the store can tell a
//! missing chain from a rejected commit from a transport failure.
//!
//! # Error Types
//!
//! - [`StoreError::NotFound`] - Resource or transaction does not exist
//! - [`StoreError::Rejected`] - The ledger refused to commit a transaction
//! - [`StoreError::Connection`] - Network or connection-related failures
//! - [`StoreError::Timeout`] - Operation exceeded its time limit
//! - [`StoreError::Serialization`] - Payload encoding/decoding failures
//! - [`StoreError::EmptyChain`] - An asset id resolved to a chain with no transactions
//! - [`StoreError::Config`] - Invalid store configuration
//! - [`StoreError::Internal`] - Anything that does not fit the above

use std::sync::Arc;

use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during store and ledger operations.
///
/// Errors preserve their source chain via the `#[source]` attribute, enabling
/// debugging tools to display the full error context.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]` — new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The requested resource or transaction was not found.
    ///
    /// This is a recoverable error indicating that no live chain (or no
    /// ledger transaction) exists for the given identifier.
    #[error("not found: {what}")]
    NotFound {
        /// The identifier that could not be resolved.
        what: String,
    },

    /// The ledger refused to commit a transaction.
    ///
    /// Covers malformed payloads, signature mismatches, and attempts to
    /// spend an already-consumed output (a stale tip). The store never
    /// retries rejections: a double-spend rejection means another writer
    /// advanced the chain, and the caller must re-read before acting.
    #[error("ledger rejected the transaction: {reason}")]
    Rejected {
        /// The ledger's stated reason for the rejection.
        reason: String,
    },

    /// Connection or network error.
    ///
    /// Transport-level failure to reach the ledger service. Transient:
    /// retried with backoff on the read and search paths.
    #[error("connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
        /// The underlying error that caused this connection failure.
        #[source]
        source: Option<BoxError>,
    },

    /// Operation timed out.
    ///
    /// Timeouts are owned by the ledger client; this layer only classifies
    /// them as transient for retry purposes.
    #[error("operation timeout")]
    Timeout,

    /// Payload encoding or decoding error.
    ///
    /// Record payloads are JSON objects; this error surfaces when a payload
    /// cannot carry an embedded resource id or cannot be decoded from the
    /// ledger's representation.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
        /// The underlying error that caused serialization to fail.
        #[source]
        source: Option<BoxError>,
    },

    /// An asset id resolved to a chain with no transactions.
    ///
    /// Every chain is rooted by exactly one CREATE transaction, so an empty
    /// lineage means the asset id never existed or the ledger's view is
    /// inconsistent. Callers that obtained the asset id from
    /// `resolve_root` should treat this as an internal invariant violation.
    #[error("asset chain {asset_id} has no transactions")]
    EmptyChain {
        /// The asset id whose lineage came back empty.
        asset_id: String,
    },

    /// Invalid store configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error that does not fit another category.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StoreError {
    /// Creates a new `NotFound` error for the given identifier.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Creates a new `Rejected` error with the ledger's reason.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected { reason: reason.into() }
    }

    /// Creates a new `Connection` error with the given message.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Creates a new `Connection` error with a message and source error.
    #[must_use]
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Timeout
    }

    /// Creates a new `Serialization` error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into(), source: None }
    }

    /// Creates a new `Serialization` error with a message and source error.
    #[must_use]
    pub fn serialization_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Internal` error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Returns `true` if the error is transient and the operation may be
    /// retried.
    ///
    /// Only connection and timeout errors qualify. Rejections are never
    /// transient: a commit that was refused may nonetheless have been
    /// applied by an earlier attempt, so blind retry risks double-writing.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization_with_source("invalid JSON payload", err)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StoreError::connection("refused").is_transient());
        assert!(StoreError::timeout().is_transient());

        assert!(!StoreError::not_found("r1").is_transient());
        assert!(!StoreError::rejected("double spend").is_transient());
        assert!(!StoreError::serialization("bad payload").is_transient());
        assert!(!StoreError::internal("oops").is_transient());
        assert!(!StoreError::Config("empty namespace".into()).is_transient());
        assert!(!StoreError::EmptyChain { asset_id: "a".into() }.is_transient());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(StoreError::not_found("r1").to_string(), "not found: r1");
        assert_eq!(
            StoreError::rejected("output already spent").to_string(),
            "ledger rejected the transaction: output already spent",
        );
        assert_eq!(
            StoreError::EmptyChain { asset_id: "abc".into() }.to_string(),
            "asset chain abc has no transactions",
        );
    }

    #[test]
    fn test_connection_source_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = StoreError::connection_with_source("dial failed", io);

        let source = std::error::Error::source(&err);
        assert!(source.is_some());
        assert_eq!(source.unwrap().to_string(), "refused");
    }

    #[test]
    fn test_serde_json_error_maps_to_serialization() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = StoreError::from(json_err);
        assert!(matches!(err, StoreError::Serialization { .. }));
    }
}
