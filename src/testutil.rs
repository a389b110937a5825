//! In-memory ledger for tests.
//!
//! This module provides [`MemoryLedger`], an in-memory [`LedgerClient`]
//! implementation that enforces the ledger's native rules: append-only
//! commits, double-spend rejection, chain-membership checks, and a
//! signature check matching the fulfillment to the consumed output's owner.
//! It is feature-gated behind `testutil` to prevent leaking into production
//! builds.
//!
//! Signing is simulated, not cryptographic: [`key_pair`] derives pairs of
//! the form `pk-<seed>` / `sk-<seed>`, and [`fulfill`](LedgerClient::fulfill)
//! records which public key the private key stands for. The burn address has
//! no derivable private key, so spending a burned tip is always rejected —
//! the property the store's delete semantics rely on.

use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{
    client::{AssetMatch, LedgerClient, MetadataMatch},
    error::{Result, StoreError},
    keys::{KeyPair, PrivateKey, PublicKey},
    transaction::{
        Asset, AssetId, ConditionDetails, Input, Operation, Output, SPENDABLE_OUTPUT, Transaction,
        TransactionSpec, TxId, UnsignedInput, UnsignedTransaction,
    },
};

/// Derives a deterministic key pair from a seed.
///
/// The pair is `pk-<seed>` / `sk-<seed>`; [`MemoryLedger`] treats a
/// fulfillment made with `sk-<seed>` as a valid signature for the owner
/// `pk-<seed>`.
#[must_use]
pub fn key_pair(seed: &str) -> KeyPair {
    KeyPair::new(format!("pk-{seed}"), format!("sk-{seed}"))
}

/// Returns the public key a private key signs for, if derivable.
fn public_for(key: &PrivateKey) -> Option<PublicKey> {
    key.as_str().strip_prefix("sk-").map(|seed| PublicKey::from(format!("pk-{seed}")))
}

/// Renders the simulated signature a given owner's key produces.
fn signature_of(owner: &PublicKey) -> String {
    format!("signed-by:{owner}")
}

#[derive(Default)]
struct LedgerState {
    /// All committed transactions by id.
    transactions: HashMap<TxId, Transaction>,
    /// Chain members per asset, oldest to newest.
    chains: HashMap<AssetId, Vec<TxId>>,
    /// Consumed outputs.
    spent: HashSet<(TxId, usize)>,
    /// Commit order, for deterministic search results.
    log: Vec<TxId>,
}

/// In-memory [`LedgerClient`] with native ledger rules enforced.
///
/// # Validation at Commit
///
/// Like the real service, `prepare` and `fulfill` accept anything
/// well-formed; validation happens at [`send_commit`](LedgerClient::send_commit):
///
/// - CREATE must carry an inline asset definition and a non-consuming input
/// - TRANSFER must link a known asset, consume an existing, unspent output of that same chain,
///   name the consumed output's owners as `owners_before`, and carry a fulfillment signed by one
///   of those owners
/// - Committing the same transaction twice is rejected
///
/// # Fault Injection
///
/// [`inject_read_faults`](Self::inject_read_faults) makes the next N
/// retrieval/search calls fail with a transient connection error, for
/// exercising retry behavior. [`inject_commit_faults`](Self::inject_commit_faults)
/// does the same for [`send_commit`](LedgerClient::send_commit), with
/// [`commit_attempts`](Self::commit_attempts) counting every invocation.
/// [`poison`](Self::poison) makes retrieval of one transaction fail
/// non-transiently, simulating a corrupt ledger record.
#[derive(Default)]
pub struct MemoryLedger {
    state: RwLock<LedgerState>,
    next_id: AtomicU64,
    read_faults: AtomicU64,
    commit_faults: AtomicU64,
    commit_attempts: AtomicU64,
    poisoned: RwLock<HashSet<TxId>>,
}

impl MemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` retrieval and search calls fail with a transient
    /// connection error.
    pub fn inject_read_faults(&self, n: u64) {
        self.read_faults.store(n, Ordering::SeqCst);
    }

    /// Makes the next `n` commit calls fail with a transient connection
    /// error. Attempts still count toward [`commit_attempts`](Self::commit_attempts).
    pub fn inject_commit_faults(&self, n: u64) {
        self.commit_faults.store(n, Ordering::SeqCst);
    }

    /// Returns how many times [`send_commit`](LedgerClient::send_commit) was
    /// called, failed or not.
    #[must_use]
    pub fn commit_attempts(&self) -> u64 {
        self.commit_attempts.load(Ordering::SeqCst)
    }

    /// Makes every retrieval of `tx_id` fail with a non-transient internal
    /// error, as if the stored record were corrupt.
    pub fn poison(&self, tx_id: TxId) {
        self.poisoned.write().insert(tx_id);
    }

    /// Returns the number of committed transactions.
    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.state.read().transactions.len()
    }

    /// Returns the number of unspent transactions in a chain.
    ///
    /// A consistent chain always has exactly one: the tip.
    #[must_use]
    pub fn unspent_count(&self, asset_id: &AssetId) -> usize {
        let state = self.state.read();
        state.chains.get(asset_id).map_or(0, |members| {
            members
                .iter()
                .filter(|id| !state.spent.contains(&((*id).clone(), SPENDABLE_OUTPUT)))
                .count()
        })
    }

    fn check_fault(&self) -> Result<()> {
        if take_fault(&self.read_faults) {
            return Err(StoreError::connection("injected transport fault"));
        }
        Ok(())
    }

    fn commit_create(state: &mut LedgerState, tx: &Transaction) -> Result<()> {
        if !matches!(tx.asset, Asset::Definition(_)) {
            return Err(StoreError::rejected("CREATE requires an inline asset definition"));
        }

        let input = tx
            .inputs
            .first()
            .ok_or_else(|| StoreError::rejected("transaction has no inputs"))?;
        if input.fulfills.is_some() {
            return Err(StoreError::rejected("CREATE input must not consume an output"));
        }
        verify_signature(input, &input.owners_before)?;

        if tx.outputs.is_empty() {
            return Err(StoreError::rejected("transaction has no outputs"));
        }

        let asset_id = AssetId::from(tx.id.clone());
        state.chains.insert(asset_id, vec![tx.id.clone()]);
        Ok(())
    }

    fn commit_transfer(state: &mut LedgerState, tx: &Transaction) -> Result<()> {
        let Asset::Link { id: root } = &tx.asset else {
            return Err(StoreError::rejected("TRANSFER requires an asset link"));
        };
        if !state.chains.contains_key(root) {
            return Err(StoreError::rejected(format!("unknown asset {root}")));
        }

        let input = tx
            .inputs
            .first()
            .ok_or_else(|| StoreError::rejected("transaction has no inputs"))?;
        let fulfills = input
            .fulfills
            .as_ref()
            .ok_or_else(|| StoreError::rejected("TRANSFER must consume an output"))?;

        let consumed = state
            .transactions
            .get(&fulfills.transaction_id)
            .ok_or_else(|| StoreError::rejected("input references an unknown transaction"))?;
        if consumed.chain_root() != *root {
            return Err(StoreError::rejected("input does not belong to the transferred asset"));
        }

        let output = consumed
            .outputs
            .get(fulfills.output_index)
            .ok_or_else(|| StoreError::rejected("input references a missing output"))?;

        let spent_key = (fulfills.transaction_id.clone(), fulfills.output_index);
        if state.spent.contains(&spent_key) {
            return Err(StoreError::rejected(format!(
                "output {}:{} already spent",
                fulfills.transaction_id, fulfills.output_index,
            )));
        }

        if input.owners_before != output.public_keys {
            return Err(StoreError::rejected("owners_before does not match the consumed output"));
        }
        verify_signature(input, &output.public_keys)?;

        if tx.outputs.is_empty() {
            return Err(StoreError::rejected("transaction has no outputs"));
        }

        state.spent.insert(spent_key);
        if let Some(members) = state.chains.get_mut(root) {
            members.push(tx.id.clone());
        }
        Ok(())
    }
}

/// Consumes one injected fault from `counter`, if any remain.
fn take_fault(counter: &AtomicU64) -> bool {
    loop {
        let remaining = counter.load(Ordering::SeqCst);
        if remaining == 0 {
            return false;
        }
        if counter
            .compare_exchange(remaining, remaining - 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            return true;
        }
    }
}

/// Checks that the input's fulfillment was signed by one of `owners`.
fn verify_signature(input: &Input, owners: &[PublicKey]) -> Result<()> {
    if owners.iter().any(|owner| input.fulfillment == signature_of(owner)) {
        Ok(())
    } else {
        Err(StoreError::rejected("fulfillment does not satisfy the output condition"))
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn prepare(&self, spec: TransactionSpec) -> Result<UnsignedTransaction> {
        let unsigned = match spec {
            TransactionSpec::Create { signer, asset, metadata } => UnsignedTransaction {
                operation: Operation::Create,
                asset: Asset::Definition(asset),
                inputs: vec![UnsignedInput {
                    fulfillment: ConditionDetails::ed25519(signer.clone()),
                    fulfills: None,
                    owners_before: vec![signer.clone()],
                }],
                outputs: vec![Output::owned_by(signer)],
                metadata,
            },
            TransactionSpec::Transfer { input, root, recipient, metadata } => UnsignedTransaction {
                operation: Operation::Transfer,
                asset: Asset::Link { id: root },
                inputs: vec![input],
                outputs: vec![Output::owned_by(recipient)],
                metadata,
            },
        };
        Ok(unsigned)
    }

    async fn fulfill(
        &self,
        unsigned: UnsignedTransaction,
        key: &PrivateKey,
    ) -> Result<Transaction> {
        let signer = public_for(key);
        let fulfillment = match &signer {
            Some(public) => signature_of(public),
            // Underivable keys still "sign"; the commit-time check fails.
            None => format!("signed-with:{}", key.as_str()),
        };

        let sequence = self.next_id.fetch_add(1, Ordering::SeqCst);
        let inputs = unsigned
            .inputs
            .into_iter()
            .map(|input| Input {
                fulfillment: fulfillment.clone(),
                fulfills: input.fulfills,
                owners_before: input.owners_before,
            })
            .collect();

        Ok(Transaction {
            id: TxId::from(format!("{sequence:064x}")),
            operation: unsigned.operation,
            asset: unsigned.asset,
            inputs,
            outputs: unsigned.outputs,
            metadata: unsigned.metadata,
        })
    }

    async fn send_commit(&self, tx: &Transaction) -> Result<()> {
        self.commit_attempts.fetch_add(1, Ordering::SeqCst);
        if take_fault(&self.commit_faults) {
            return Err(StoreError::connection("injected transport fault"));
        }

        let mut state = self.state.write();

        if state.transactions.contains_key(&tx.id) {
            return Err(StoreError::rejected(format!("duplicate transaction {}", tx.id)));
        }

        match tx.operation {
            Operation::Create => Self::commit_create(&mut state, tx)?,
            Operation::Transfer => Self::commit_transfer(&mut state, tx)?,
        }

        state.transactions.insert(tx.id.clone(), tx.clone());
        state.log.push(tx.id.clone());
        Ok(())
    }

    async fn retrieve(&self, tx_id: &TxId) -> Result<Transaction> {
        self.check_fault()?;
        if self.poisoned.read().contains(tx_id) {
            return Err(StoreError::internal(format!("corrupt transaction record {tx_id}")));
        }
        self.state
            .read()
            .transactions
            .get(tx_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(tx_id.as_str()))
    }

    async fn get(&self, asset_id: &AssetId) -> Result<Vec<Transaction>> {
        self.check_fault()?;
        let state = self.state.read();
        let members = state.chains.get(asset_id).map(Vec::as_slice).unwrap_or_default();
        Ok(members.iter().filter_map(|id| state.transactions.get(id).cloned()).collect())
    }

    async fn search_metadata(&self, query: &str) -> Result<Vec<MetadataMatch>> {
        self.check_fault()?;
        let state = self.state.read();

        let mut matches = Vec::new();
        for id in &state.log {
            let Some(tx) = state.transactions.get(id) else { continue };
            let rendered = serde_json::to_string(&tx.metadata)?;
            if rendered.contains(query) {
                matches
                    .push(MetadataMatch { tx_id: tx.id.clone(), metadata: tx.metadata.clone() });
            }
        }
        Ok(matches)
    }

    async fn search_assets(&self, query: &str) -> Result<Vec<AssetMatch>> {
        self.check_fault()?;
        let state = self.state.read();

        let mut matches = Vec::new();
        for id in &state.log {
            let Some(tx) = state.transactions.get(id) else { continue };
            let Asset::Definition(def) = &tx.asset else { continue };
            let rendered = serde_json::to_string(def)?;
            if rendered.contains(query) {
                matches.push(AssetMatch {
                    asset_id: AssetId::from(tx.id.clone()),
                    namespace: def.namespace.clone(),
                    data: def.data.clone(),
                });
            }
        }
        Ok(matches)
    }
}
