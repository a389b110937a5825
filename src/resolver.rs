//! Chain lineage resolution.
//!
//! This module provides [`ChainResolver`], which maps resource ids and
//! transaction ids to ledger lineage facts: the chain root, the current
//! unspent tip, and the set of live chains visible in a namespace.
//!
//! There is no auxiliary index from resource id to current transaction; the
//! resolver reconstructs that mapping from the ledger's own metadata search
//! on every lookup. This is O(namespace size) per lookup, which keeps the
//! ledger the single source of truth at the cost of scan work.

use std::{collections::HashSet, sync::Arc};

use serde_json::Value;

use crate::{
    client::LedgerClient,
    config::RetryConfig,
    error::{Result, StoreError},
    retry::with_retry,
    transaction::{AssetId, RESOURCE_ID_KEY, Transaction, TxId},
};

/// One chain observed during a namespace scan.
#[derive(Clone, Debug)]
pub struct ScanEntry {
    /// The metadata-search candidate that surfaced the chain. May be a
    /// historical chain member, not the tip.
    pub candidate: TxId,
    /// What the candidate's chain resolved to.
    pub status: ScanStatus,
}

/// Resolution outcome for a scanned chain.
///
/// Scans never silently drop a candidate: chains that cannot be read are
/// reported as [`Unreadable`](Self::Unreadable) so callers can tell a
/// shrunken listing from a clean one.
#[derive(Clone, Debug)]
pub enum ScanStatus {
    /// The chain's tip carries a live record in the scanned namespace.
    Live {
        /// The chain root.
        asset_id: AssetId,
        /// Id of the current tip transaction.
        tip: TxId,
        /// The record payload at the tip.
        record: Value,
    },
    /// The chain was transferred to the sink address; the record is deleted.
    Burned {
        /// The chain root.
        asset_id: AssetId,
    },
    /// The chain's tip exists but is not a live record in the scanned
    /// namespace: the record moved to another namespace, or the tip carries
    /// no payload. Unlike [`Burned`](Self::Burned), the chain itself is
    /// still spendable.
    NotLive {
        /// The chain root.
        asset_id: AssetId,
        /// Id of the current tip transaction.
        tip: TxId,
    },
    /// The candidate could not be resolved to a readable record.
    Unreadable {
        /// Why resolution failed.
        reason: String,
    },
}

/// Maps resource ids and transaction ids to ledger lineage facts.
///
/// Shares the ledger client with the owning
/// [`RecordStore`](crate::RecordStore); reads and searches go through the
/// configured retry policy, and scan results are typed per chain rather
/// than silently filtered.
pub struct ChainResolver<C> {
    client: Arc<C>,
    namespace: String,
    retry: RetryConfig,
}

impl<C> std::fmt::Debug for ChainResolver<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainResolver")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl<C: LedgerClient> ChainResolver<C> {
    /// Creates a resolver over the given client, scoped to `namespace`.
    pub(crate) fn new(client: Arc<C>, namespace: impl Into<String>, retry: RetryConfig) -> Self {
        Self { client, namespace: namespace.into(), retry }
    }

    /// Resolves any chain member to the chain's root asset id.
    ///
    /// A single retrieval suffices: a CREATE roots its own chain, and a
    /// TRANSFER carries the root link directly rather than referencing its
    /// immediate predecessor.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no transaction with the given id
    /// exists.
    pub async fn resolve_root(&self, tx_id: &TxId) -> Result<AssetId> {
        let tx = with_retry(&self.retry, "retrieve", || self.client.retrieve(tx_id)).await?;
        Ok(tx.chain_root())
    }

    /// Returns the current unspent tip of the given chain.
    ///
    /// The ledger returns chain members oldest to newest, and consumption
    /// forms a strict total order, so the last element is the single live
    /// tip.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptyChain`] if the asset id has no
    /// transactions — callers must have established that a CREATE exists,
    /// normally by obtaining the asset id from [`resolve_root`](Self::resolve_root).
    pub async fn latest_unspent(&self, asset_id: &AssetId) -> Result<Transaction> {
        let txs = with_retry(&self.retry, "get", || self.client.get(asset_id)).await?;
        txs.into_iter()
            .next_back()
            .ok_or_else(|| StoreError::EmptyChain { asset_id: asset_id.to_string() })
    }

    /// Resolves any chain member to `(root, current tip)` in one pass.
    pub async fn chain_tip(&self, tx_id: &TxId) -> Result<(AssetId, Transaction)> {
        let root = self.resolve_root(tx_id).await?;
        let tip = self.latest_unspent(&root).await?;
        Ok((root, tip))
    }

    /// Finds the tip transaction id of the live chain holding `resource_id`.
    ///
    /// Returns `Ok(None)` — a sentinel, not an error — when no live chain
    /// embeds the id, since callers use the distinction to choose between
    /// create and update.
    pub async fn find_current_tx_id(&self, resource_id: &str) -> Result<Option<TxId>> {
        for entry in self.scan().await? {
            if let ScanStatus::Live { tip, record, .. } = entry.status {
                if record.get(RESOURCE_ID_KEY).and_then(Value::as_str) == Some(resource_id) {
                    return Ok(Some(tip));
                }
            }
        }
        Ok(None)
    }

    /// Scans every chain visible in the namespace, resolved to its current
    /// state.
    ///
    /// Candidates come from the ledger's metadata search, which matches
    /// text anywhere in the metadata and returns historical chain members;
    /// the scan filters to structural namespace matches and deduplicates by
    /// chain root. Transient failures abort the scan; per-candidate
    /// resolution failures become [`ScanStatus::Unreadable`] entries and a
    /// `warn` diagnostic rather than failing the whole scan.
    pub async fn scan(&self) -> Result<Vec<ScanEntry>> {
        let candidates = with_retry(&self.retry, "search_metadata", || {
            self.client.search_metadata(&self.namespace)
        })
        .await?;

        let mut seen_roots: HashSet<AssetId> = HashSet::new();
        let mut entries = Vec::new();

        for candidate in candidates {
            // The search surface matches the namespace string anywhere in
            // the metadata; only structural matches count.
            if candidate.metadata.namespace != self.namespace {
                continue;
            }

            let (asset_id, tip) = match self.chain_tip(&candidate.tx_id).await {
                Ok(state) => state,
                Err(err) if err.is_transient() => return Err(err),
                Err(err) => {
                    tracing::warn!(
                        candidate = %candidate.tx_id,
                        error = %err,
                        "skipping unreadable chain during scan",
                    );
                    entries.push(ScanEntry {
                        candidate: candidate.tx_id,
                        status: ScanStatus::Unreadable { reason: err.to_string() },
                    });
                    continue;
                },
            };

            // Every chain member's metadata matches the search, so one chain
            // can surface many candidates.
            if !seen_roots.insert(asset_id.clone()) {
                continue;
            }

            let status = match tip.metadata.data {
                Some(record) if tip.metadata.namespace == self.namespace => {
                    ScanStatus::Live { asset_id, tip: tip.id, record }
                },
                _ if tip.metadata.is_burned() => ScanStatus::Burned { asset_id },
                _ => {
                    // Tip moved outside this namespace, or a live namespace
                    // entry with no payload; nothing to list, but the chain
                    // was not burned.
                    tracing::debug!(
                        asset_id = %asset_id,
                        tip = %tip.id,
                        "chain tip is not a live record in this namespace",
                    );
                    ScanStatus::NotLive { asset_id, tip: tip.id }
                },
            };

            entries.push(ScanEntry { candidate: candidate.tx_id, status });
        }

        Ok(entries)
    }
}
