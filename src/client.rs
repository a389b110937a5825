//! Interface to the external ledger service.
//!
//! This module defines [`LedgerClient`], the boundary between the store and
//! the ledger's network client. Implementations are expected to be
//! network-backed, possibly slow, and free to reject requests; consensus,
//! validation, and signature verification are the ledger's own business and
//! assumed correct behind this trait.
//!
//! The store takes a constructed client at build time — client lifecycle,
//! connection setup, and credentials are owned by the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::Result,
    keys::PrivateKey,
    transaction::{AssetId, Metadata, Transaction, TransactionSpec, TxId, UnsignedTransaction},
};

/// A candidate returned by the metadata search surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetadataMatch {
    /// Id of the transaction whose metadata matched.
    pub tx_id: TxId,
    /// The matching metadata.
    pub metadata: Metadata,
}

/// A match returned by the asset search surface.
///
/// Asset search sees CREATE transactions only, so a match identifies a chain
/// by its root and carries the asset payload as written at creation time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetMatch {
    /// Root of the matching chain.
    pub asset_id: AssetId,
    /// Namespace recorded in the asset definition.
    pub namespace: String,
    /// The asset payload as written at creation time.
    pub data: Value,
}

/// Client interface to the ledger service.
///
/// Implementations must be `Send + Sync`; the store shares one client across
/// its resolver and mutation paths. Every method is a blocking round trip
/// from the caller's perspective — the store never overlaps them.
///
/// # Error Mapping
///
/// Implementations map their transport and protocol errors to
/// [`StoreError`](crate::StoreError) variants: refused commits to
/// [`Rejected`](crate::StoreError::Rejected), missing transactions to
/// [`NotFound`](crate::StoreError::NotFound), and transport failures to
/// [`Connection`](crate::StoreError::Connection) or
/// [`Timeout`](crate::StoreError::Timeout) so the store's retry policy can
/// classify them.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Prepares an unsigned transaction from the given spec.
    ///
    /// For a CREATE this derives the initial input and the owner output; for
    /// a TRANSFER it assembles the consuming input, root link, and recipient
    /// output. Preparation performs no commit and is safe to repeat.
    async fn prepare(&self, spec: TransactionSpec) -> Result<UnsignedTransaction>;

    /// Signs a prepared transaction, assigning its ledger id.
    async fn fulfill(&self, unsigned: UnsignedTransaction, key: &PrivateKey)
    -> Result<Transaction>;

    /// Submits a signed transaction and waits for commit.
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`](crate::StoreError::Rejected) if the ledger
    /// refuses the transaction — malformed payload, signature mismatch, or
    /// an attempt to spend an already-consumed output.
    async fn send_commit(&self, tx: &Transaction) -> Result<()>;

    /// Retrieves a committed transaction by id.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`](crate::StoreError::NotFound) if no such
    /// transaction exists.
    async fn retrieve(&self, tx_id: &TxId) -> Result<Transaction>;

    /// Returns all transactions of an asset chain, oldest to newest.
    ///
    /// The last element is the chain's current tip. An unknown asset id
    /// yields an empty vector.
    async fn get(&self, asset_id: &AssetId) -> Result<Vec<Transaction>>;

    /// Full-text search over transaction metadata.
    ///
    /// The query is an opaque search string; matches may include historical
    /// chain members and text-level false positives, so callers must filter
    /// structurally.
    async fn search_metadata(&self, query: &str) -> Result<Vec<MetadataMatch>>;

    /// Full-text search over asset payloads.
    ///
    /// Not namespace-scoped at the protocol level; callers must filter
    /// matches to their own namespace.
    async fn search_assets(&self, query: &str) -> Result<Vec<AssetMatch>>;
}
