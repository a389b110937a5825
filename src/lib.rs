//! Mutable key-value records over an append-only ledger.
//!
//! This crate implements the CRAB discipline — **C**reate, **R**etrieve,
//! **A**ppend, **B**urn — presenting ordinary create/read/update/delete/
//! list/query semantics on top of a ledger that natively supports only
//! asset creation and asset transfer and never mutates or deletes a
//! committed transaction.
//!
//! Every logical record is an *asset chain*: one CREATE transaction roots
//! the lineage, each update appends a TRANSFER consuming the previous
//! transaction's output, and deletion transfers the chain tip to an
//! unspendable sink address. The chain's most recent unconsumed transaction
//! — its tip — carries the record's current value.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Caller                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │                     RecordStore                             │
//! │        write │ read │ update │ delete │ list │ query        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    ChainResolver                            │
//! │      resolve_root │ latest_unspent │ namespace scan         │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 LedgerClient (trait)                        │
//! │   prepare │ fulfill │ send_commit │ retrieve │ get │ search │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    Ledger Service                           │
//! │     Consensus │ validation │ signature verification         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use crab_store::{RecordStore, RecordStoreConfig, testutil};
//! use serde_json::json;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), crab_store::StoreError> {
//!     let ledger = Arc::new(testutil::MemoryLedger::new());
//!     let config = RecordStoreConfig::builder()
//!         .namespace("ocean")
//!         .key_pair(testutil::key_pair("service"))
//!         .build()?;
//!     let store = RecordStore::new(ledger, config);
//!
//!     // Create, update, and read a record
//!     store.write(json!({"title": "A"}), Some("r1")).await?;
//!     store.update("r1", json!({"title": "B"})).await?;
//!     let value = store.read("r1").await?;
//!     assert_eq!(value.unwrap()["title"], "B");
//!
//!     // Burn it; the chain can never be extended again
//!     store.delete("r1").await?;
//!     assert!(store.read("r1").await?.is_none());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Versioning Without an Index
//!
//! There is no auxiliary index mapping resource ids to current
//! transactions. The resolver reconstructs that mapping from the ledger's
//! own metadata search on every lookup, keeping the ledger the single
//! source of truth. Lookups are O(namespace size); callers that need a
//! cache must treat it as non-authoritative and invalidate it on every
//! mutation.
//!
//! # Concurrency Model
//!
//! Tip resolution is read-then-act. If two writers race on one chain, the
//! ledger's double-spend prevention rejects the loser's commit and the
//! store surfaces [`StoreError::Rejected`] without retrying. Callers must
//! uphold "one resource, one concurrent writer" themselves.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod error;
mod keys;
mod resolver;
mod retry;
mod store;
mod transaction;

/// In-memory ledger and key helpers for tests.
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;

/// The consumed ledger interface and its search result types.
pub use client::{AssetMatch, LedgerClient, MetadataMatch};
/// Configuration types and default constants for the record store.
pub use config::{
    DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF, DEFAULT_MAX_RETRIES, RecordStoreConfig,
    RetryConfig,
};
/// Error types and result alias.
pub use error::{BoxError, Result, StoreError};
/// Signer key material and the burn sink address.
pub use keys::{BURN_ADDRESS, KeyPair, PrivateKey, PublicKey};
/// Chain lineage resolution.
pub use resolver::{ChainResolver, ScanEntry, ScanStatus};
/// The public record store surface.
pub use store::RecordStore;
/// Ledger transaction data model.
pub use transaction::{
    Asset, AssetDefinition, AssetId, BURNED_NAMESPACE, Condition, ConditionDetails, Input,
    Metadata, Operation, Output, OutputRef, RESOURCE_ID_KEY, SPENDABLE_OUTPUT, Transaction,
    TransactionSpec, TxId, UnsignedInput, UnsignedTransaction,
};
