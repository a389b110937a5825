//! Configuration for the record store.
//!
//! This module provides [`RecordStoreConfig`], which fixes a store's
//! namespace, signer identity, burn sink, and retry policy at construction
//! time. The ledger client itself is not part of the configuration — it is
//! passed to [`RecordStore::new`](crate::RecordStore::new) directly, so its
//! lifecycle stays with the caller.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, StoreError},
    keys::{BURN_ADDRESS, KeyPair, PublicKey},
    transaction::BURNED_NAMESPACE,
};

/// Default maximum number of retry attempts for transient failures.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default initial backoff between retry attempts (100 milliseconds).
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Default maximum backoff between retry attempts (10 seconds).
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Retry policy for transient failures on the read and search paths.
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the initial call.
    #[serde(default = "default_max_retries")]
    #[builder(default = default_max_retries())]
    pub max_retries: u32,

    /// Initial backoff duration.
    #[serde(with = "humantime_serde", default = "default_initial_backoff")]
    #[builder(default = default_initial_backoff())]
    pub initial_backoff: Duration,

    /// Maximum backoff duration.
    #[serde(with = "humantime_serde", default = "default_max_backoff")]
    #[builder(default = default_max_backoff())]
    pub max_backoff: Duration,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_initial_backoff() -> Duration {
    DEFAULT_INITIAL_BACKOFF
}

fn default_max_backoff() -> Duration {
    DEFAULT_MAX_BACKOFF
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
        }
    }
}

/// Configuration for [`RecordStore`](crate::RecordStore).
///
/// # Namespace
///
/// All records written by a store carry its namespace, and all listing and
/// querying is scoped to it. The namespace `"burned"` is reserved for burn
/// transfers and rejected at build time.
///
/// # Example
///
/// ```
/// use crab_store::{KeyPair, RecordStoreConfig};
///
/// let config = RecordStoreConfig::builder()
///     .namespace("ocean")
///     .key_pair(KeyPair::new("pk-service", "sk-service"))
///     .build()?;
/// # Ok::<(), crab_store::StoreError>(())
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordStoreConfig {
    /// Namespace all records are written under.
    pub(crate) namespace: String,

    /// Signer identity for every mutation.
    pub(crate) key_pair: KeyPair,

    /// Recipient address of burn transfers.
    #[serde(default = "default_burn_address")]
    pub(crate) burn_address: PublicKey,

    /// Retry policy for transient failures.
    #[serde(default)]
    pub(crate) retry: RetryConfig,
}

fn default_burn_address() -> PublicKey {
    PublicKey::from(BURN_ADDRESS)
}

#[bon::bon]
impl RecordStoreConfig {
    /// Creates a new configuration, validating all required fields.
    ///
    /// # Arguments
    ///
    /// * `namespace` - Namespace all records are written under.
    /// * `key_pair` - Signer identity for every mutation.
    ///
    /// # Optional Fields
    ///
    /// * `burn_address` - Recipient of burn transfers (default: [`BURN_ADDRESS`]).
    /// * `retry` - Retry policy (default: [`RetryConfig::default`]).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if:
    /// - The namespace is empty or the reserved `"burned"` namespace
    /// - The public key is empty
    /// - The burn address is empty or equals the signer's own public key (a store that owned the
    ///   sink could resurrect burned chains, so delete would not be terminal)
    #[builder]
    pub fn new(
        #[builder(into)] namespace: String,
        key_pair: KeyPair,
        #[builder(into, default = default_burn_address())] burn_address: PublicKey,
        #[builder(default)] retry: RetryConfig,
    ) -> Result<Self> {
        if namespace.is_empty() {
            return Err(StoreError::Config("namespace cannot be empty".into()));
        }

        if namespace == BURNED_NAMESPACE {
            return Err(StoreError::Config(format!(
                "namespace {BURNED_NAMESPACE:?} is reserved for burn transfers"
            )));
        }

        if key_pair.public.as_str().is_empty() {
            return Err(StoreError::Config("public key cannot be empty".into()));
        }

        if burn_address.as_str().is_empty() {
            return Err(StoreError::Config("burn address cannot be empty".into()));
        }

        if burn_address == key_pair.public {
            return Err(StoreError::Config(
                "burn address must not be the signer's own public key".into(),
            ));
        }

        Ok(Self { namespace, key_pair, burn_address, retry })
    }

    /// Returns the configured namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the signer key pair.
    #[must_use]
    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    /// Returns the burn sink address.
    #[must_use]
    pub fn burn_address(&self) -> &PublicKey {
        &self.burn_address
    }

    /// Returns the retry policy.
    #[must_use]
    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }
}
