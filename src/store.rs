//! The public record store surface.
//!
//! [`RecordStore`] presents ordinary create/read/update/delete/list/query
//! semantics on top of the ledger's CREATE/TRANSFER primitives. Every
//! mutation is one prepare → fulfill → send-commit round trip; updates
//! append a self-transfer consuming the chain tip, and deletes transfer the
//! tip to the burn sink.
//!
//! # Concurrency
//!
//! Tip resolution is read-then-act: if another writer extends the same
//! chain between this store's resolution and its commit, the ledger rejects
//! the commit as a double-spend and the rejection propagates as
//! [`StoreError::Rejected`]. The store does not retry that conflict — the
//! design assumes at most one concurrent writer per resource.

use std::sync::Arc;

use serde_json::Value;

use crate::{
    client::{AssetMatch, LedgerClient},
    config::{RecordStoreConfig, RetryConfig},
    error::{Result, StoreError},
    keys::{KeyPair, PublicKey},
    resolver::{ChainResolver, ScanStatus},
    retry::with_retry,
    transaction::{
        AssetDefinition, Metadata, RESOURCE_ID_KEY, Transaction, TransactionSpec, TxId,
    },
};

/// Mutable key-value records over an append-only ledger.
///
/// One store instance is bound to a namespace and a signer key pair. The
/// ledger client is injected at construction and shared with the store's
/// [`ChainResolver`]; its lifecycle belongs to the caller.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use crab_store::{RecordStore, RecordStoreConfig, testutil};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), crab_store::StoreError> {
/// let ledger = Arc::new(testutil::MemoryLedger::new());
/// let config = RecordStoreConfig::builder()
///     .namespace("ocean")
///     .key_pair(testutil::key_pair("alice"))
///     .build()?;
/// let store = RecordStore::new(ledger, config);
///
/// store.write(json!({"title": "A"}), Some("r1")).await?;
/// let value = store.read("r1").await?;
/// assert_eq!(value.unwrap()["title"], "A");
/// # Ok(())
/// # }
/// ```
pub struct RecordStore<C> {
    client: Arc<C>,
    resolver: ChainResolver<C>,
    namespace: String,
    key_pair: KeyPair,
    burn_address: PublicKey,
    retry: RetryConfig,
}

impl<C> std::fmt::Debug for RecordStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("namespace", &self.namespace)
            .field("public_key", &self.key_pair.public)
            .finish_non_exhaustive()
    }
}

impl<C: LedgerClient> RecordStore<C> {
    /// Creates a store over the given ledger client.
    #[must_use]
    pub fn new(client: Arc<C>, config: RecordStoreConfig) -> Self {
        let resolver =
            ChainResolver::new(Arc::clone(&client), config.namespace.clone(), config.retry.clone());
        Self {
            client,
            resolver,
            namespace: config.namespace,
            key_pair: config.key_pair,
            burn_address: config.burn_address,
            retry: config.retry,
        }
    }

    /// Returns the store's namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the resolver for direct lineage lookups.
    #[must_use]
    pub fn resolver(&self) -> &ChainResolver<C> {
        &self.resolver
    }

    /// Creates a new record chain, returning the root transaction id.
    ///
    /// When `resource_id` is supplied it is embedded into the payload under
    /// `"_id"` so that later reads and updates can find the chain. The
    /// payload is duplicated into both the asset definition and the
    /// transaction metadata so the ledger's asset-search and
    /// metadata-search surfaces both see it.
    ///
    /// The returned id is the chain's permanent asset id, stable across all
    /// subsequent updates.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialization`] if a resource id is supplied
    /// but the payload is not a JSON object, and [`StoreError::Rejected`]
    /// if the ledger refuses the commit.
    pub async fn write(&self, value: Value, resource_id: Option<&str>) -> Result<TxId> {
        let payload = embed_resource_id(value, resource_id)?;

        let spec = TransactionSpec::Create {
            signer: self.key_pair.public.clone(),
            asset: AssetDefinition { namespace: self.namespace.clone(), data: payload.clone() },
            metadata: Metadata::new(&self.namespace, payload),
        };

        let tx = self.submit(spec).await?;
        tracing::debug!(tx_id = %tx.id, resource_id, "created record chain");
        Ok(tx.id)
    }

    /// Reads the current value of a record.
    ///
    /// Returns `Ok(None)` when no live chain embeds `resource_id` — the
    /// record was never written, or its chain was burned.
    pub async fn read(&self, resource_id: &str) -> Result<Option<Value>> {
        let Some(tx_id) = self.resolver.find_current_tx_id(resource_id).await? else {
            return Ok(None);
        };

        let (_, tip) = self.resolver.chain_tip(&tx_id).await?;
        Ok(tip.metadata.data)
    }

    /// Replaces a record's value by appending a self-transfer to its chain.
    ///
    /// The transfer consumes the chain tip's canonical output and names the
    /// store's own key as the new owner, so ownership never changes across
    /// updates. If no live chain holds `resource_id`, the update degrades
    /// to [`write`](Self::write) — updating a missing record creates it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Rejected`] if the ledger refuses the transfer,
    /// which includes losing a race against a concurrent writer that
    /// already consumed the tip.
    pub async fn update(&self, resource_id: &str, value: Value) -> Result<TxId> {
        let Some(tx_id) = self.resolver.find_current_tx_id(resource_id).await? else {
            return self.write(value, Some(resource_id)).await;
        };

        let (root, tip) = self.resolver.chain_tip(&tx_id).await?;
        let payload = embed_resource_id(value, Some(resource_id))?;

        let spec = TransactionSpec::Transfer {
            input: tip.spendable_input()?,
            root,
            recipient: self.key_pair.public.clone(),
            metadata: Metadata::new(&self.namespace, payload),
        };

        let tx = self.submit(spec).await?;
        tracing::debug!(tx_id = %tx.id, resource_id, "appended record version");
        Ok(tx.id)
    }

    /// Deletes a record by transferring its chain tip to the burn sink.
    ///
    /// The sink's private key is not held by any writer, so the chain can
    /// never be extended again; a later [`write`](Self::write) or
    /// [`update`](Self::update) of the same resource id starts a fresh
    /// chain with a new root.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no live chain holds
    /// `resource_id`.
    pub async fn delete(&self, resource_id: &str) -> Result<()> {
        let tx_id = self
            .resolver
            .find_current_tx_id(resource_id)
            .await?
            .ok_or_else(|| StoreError::not_found(resource_id))?;

        let (root, tip) = self.resolver.chain_tip(&tx_id).await?;

        let spec = TransactionSpec::Transfer {
            input: tip.spendable_input()?,
            root,
            recipient: self.burn_address.clone(),
            metadata: Metadata::burned(),
        };

        self.submit(spec).await?;
        tracing::debug!(resource_id, "burned record chain");
        Ok(())
    }

    /// Lists the current values of all live records in the namespace.
    ///
    /// One entry per chain regardless of how many updates it has seen;
    /// burned chains are excluded and unreadable chains are skipped with a
    /// `warn` diagnostic (emitted by the scan). The scan is redone from the
    /// start on every call.
    pub async fn list(&self, limit: Option<usize>) -> Result<Vec<Value>> {
        let mut values = Vec::new();

        for entry in self.resolver.scan().await? {
            if let ScanStatus::Live { record, .. } = entry.status {
                values.push(record);
            }
        }

        if let Some(limit) = limit {
            values.truncate(limit);
        }
        Ok(values)
    }

    /// Searches asset payloads with a raw query string.
    ///
    /// The ledger's asset search is full-text and not namespace-scoped at
    /// the protocol level, so matches are filtered structurally to the
    /// store's namespace before being returned.
    pub async fn query(&self, query: &str) -> Result<Vec<AssetMatch>> {
        let matches =
            with_retry(&self.retry, "search_assets", || self.client.search_assets(query)).await?;

        Ok(matches.into_iter().filter(|m| m.namespace == self.namespace).collect())
    }

    /// Runs one prepare → fulfill → send-commit round trip.
    ///
    /// Commits are never retried; see the retry module.
    async fn submit(&self, spec: TransactionSpec) -> Result<Transaction> {
        let unsigned = self.client.prepare(spec).await?;
        let signed = self.client.fulfill(unsigned, &self.key_pair.private).await?;
        self.client.send_commit(&signed).await?;
        Ok(signed)
    }
}

/// Embeds `resource_id` into the payload under [`RESOURCE_ID_KEY`].
///
/// Passing `None` leaves the payload untouched.
fn embed_resource_id(mut value: Value, resource_id: Option<&str>) -> Result<Value> {
    if let Some(id) = resource_id {
        let object = value.as_object_mut().ok_or_else(|| {
            StoreError::serialization("record payload must be a JSON object to carry a resource id")
        })?;
        object.insert(RESOURCE_ID_KEY.to_owned(), Value::String(id.to_owned()));
    }
    Ok(value)
}
