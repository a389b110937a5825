//! Ledger transaction data model.
//!
//! The ledger natively supports two operations — [`Operation::Create`] and
//! [`Operation::Transfer`] — and never mutates or deletes a committed
//! transaction. A logical record is therefore represented as an *asset
//! chain*: one CREATE transaction rooting the lineage, followed by TRANSFER
//! transactions each consuming output 0 of its predecessor. The most recent
//! unconsumed transaction (the *tip*) carries the record's current value in
//! its metadata.
//!
//! This module defines the wire types for both halves of the
//! prepare/fulfill split — [`UnsignedTransaction`] before signing,
//! [`Transaction`] after — plus the helpers that turn a chain tip into the
//! input of the transfer that extends it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{Result, StoreError},
    keys::PublicKey,
};

/// Metadata key under which a caller-supplied resource id is embedded in
/// record payloads.
pub const RESOURCE_ID_KEY: &str = "_id";

/// Reserved namespace carried by burn transfers.
///
/// A tip whose metadata names this namespace is terminal; store
/// configurations must not use it as their own namespace.
pub const BURNED_NAMESPACE: &str = "burned";

/// Index of the canonical spendable slot.
///
/// Every transaction built by this crate carries exactly one output, and all
/// chain walks consume output 0.
pub const SPENDABLE_OUTPUT: usize = 0;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Returns the id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

define_id!(
    /// Ledger-assigned transaction id.
    ///
    /// Opaque to this layer; assigned by the ledger protocol when a prepared
    /// transaction is fulfilled.
    TxId
);

define_id!(
    /// Identity of an asset chain.
    ///
    /// Equal to the id of the chain's root CREATE transaction and stable
    /// across every subsequent TRANSFER. Wrapping this in its own type
    /// prevents passing a chain-member [`TxId`] where the root is expected.
    AssetId
);

impl From<TxId> for AssetId {
    fn from(id: TxId) -> Self {
        Self(id.0)
    }
}

/// The two native ledger operations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Roots a new asset chain.
    #[serde(rename = "CREATE")]
    Create,
    /// Extends an existing chain by consuming a prior output.
    #[serde(rename = "TRANSFER")]
    Transfer,
}

/// Inline asset payload of a CREATE transaction.
///
/// The record value is duplicated here and in the transaction metadata so
/// that both the asset-search and metadata-search surfaces can find it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetDefinition {
    /// Namespace the record belongs to.
    pub namespace: String,
    /// The record value at creation time.
    pub data: Value,
}

/// Asset field of a transaction.
///
/// CREATE transactions carry the inline [`AssetDefinition`]; TRANSFER
/// transactions carry a link to the chain root. The link always names the
/// root directly, never the immediate predecessor, which is what makes
/// root resolution a single retrieval rather than a recursive walk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Asset {
    /// Reference to the chain's root CREATE transaction (TRANSFER only).
    Link {
        /// The chain root.
        id: AssetId,
    },
    /// Inline payload rooting a new chain (CREATE only).
    Definition(AssetDefinition),
}

/// Spending condition attached to an output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// The fulfillment template a spender must satisfy.
    pub details: ConditionDetails,
}

/// Fulfillment template naming the signature scheme and the owner key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionDetails {
    /// Signature scheme identifier.
    #[serde(rename = "type")]
    pub scheme: String,
    /// The key whose signature satisfies the condition.
    pub public_key: PublicKey,
}

impl ConditionDetails {
    /// The single signature scheme used by this crate.
    pub const ED25519: &'static str = "ed25519-sha-256";

    /// Builds an Ed25519 signature condition for the given owner.
    #[must_use]
    pub fn ed25519(owner: PublicKey) -> Self {
        Self { scheme: Self::ED25519.to_owned(), public_key: owner }
    }
}

/// A spendable transaction output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    /// The condition a later transfer must fulfill to consume this output.
    pub condition: Condition,
    /// Owner public keys. Single-owner throughout this crate.
    pub public_keys: Vec<PublicKey>,
}

impl Output {
    /// Builds a single-owner output spendable by `owner`.
    #[must_use]
    pub fn owned_by(owner: PublicKey) -> Self {
        Self {
            condition: Condition { details: ConditionDetails::ed25519(owner.clone()) },
            public_keys: vec![owner],
        }
    }
}

/// Reference to the output a transfer consumes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputRef {
    /// The transaction whose output is being spent.
    pub transaction_id: TxId,
    /// Index of the output within that transaction.
    pub output_index: usize,
}

/// Transaction input prior to signing.
///
/// Carries the consumed output's fulfillment template instead of a
/// signature; [`fulfill`](crate::LedgerClient::fulfill) replaces the
/// template with the actual proof. CREATE inputs consume nothing and have
/// `fulfills: None`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnsignedInput {
    /// Fulfillment template copied from the consumed output's condition.
    pub fulfillment: ConditionDetails,
    /// The output being spent, absent on CREATE.
    pub fulfills: Option<OutputRef>,
    /// Owners of the consumed output, who must sign.
    pub owners_before: Vec<PublicKey>,
}

/// Signed transaction input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Input {
    /// Serialized fulfillment proof.
    pub fulfillment: String,
    /// The output being spent, absent on CREATE.
    pub fulfills: Option<OutputRef>,
    /// Owners of the consumed output.
    pub owners_before: Vec<PublicKey>,
}

/// Transaction metadata.
///
/// Every transaction built by a store carries its namespace plus the record
/// payload; burn transfers carry the reserved [`BURNED_NAMESPACE`] and no
/// payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Namespace the transaction belongs to.
    pub namespace: String,
    /// The record payload, absent on burn transfers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Metadata {
    /// Builds metadata carrying a record payload in the given namespace.
    #[must_use]
    pub fn new(namespace: impl Into<String>, data: Value) -> Self {
        Self { namespace: namespace.into(), data: Some(data) }
    }

    /// Builds the terminal metadata of a burn transfer.
    #[must_use]
    pub fn burned() -> Self {
        Self { namespace: BURNED_NAMESPACE.to_owned(), data: None }
    }

    /// Returns `true` if this metadata marks a burned tip.
    #[must_use]
    pub fn is_burned(&self) -> bool {
        self.namespace == BURNED_NAMESPACE
    }
}

/// What to prepare, passed to [`LedgerClient::prepare`](crate::LedgerClient::prepare).
#[derive(Clone, Debug, PartialEq)]
pub enum TransactionSpec {
    /// Root a new asset chain owned by `signer`.
    Create {
        /// Owner of the new chain's first output, and sole signer.
        signer: PublicKey,
        /// Inline asset payload.
        asset: AssetDefinition,
        /// Transaction metadata (duplicates the payload for search).
        metadata: Metadata,
    },
    /// Extend a chain by spending its tip's canonical output.
    Transfer {
        /// Input built from the chain tip via [`Transaction::spendable_input`].
        input: UnsignedInput,
        /// The chain root, from [`Transaction::chain_root`].
        root: AssetId,
        /// New owner of the transferred output. The signer itself on
        /// updates, the burn address on deletes.
        recipient: PublicKey,
        /// Transaction metadata.
        metadata: Metadata,
    },
}

/// A prepared, not yet signed transaction.
///
/// Produced by [`LedgerClient::prepare`](crate::LedgerClient::prepare); has
/// no id because ids are assigned by the ledger protocol at fulfillment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    /// The native ledger operation.
    pub operation: Operation,
    /// Inline definition (CREATE) or root link (TRANSFER).
    pub asset: Asset,
    /// Inputs awaiting fulfillment.
    pub inputs: Vec<UnsignedInput>,
    /// Outputs the transaction will make spendable.
    pub outputs: Vec<Output>,
    /// Transaction metadata.
    pub metadata: Metadata,
}

/// A fulfilled (signed) ledger transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Ledger-assigned id. For a CREATE this doubles as the asset id of the
    /// chain it roots.
    pub id: TxId,
    /// The native ledger operation.
    pub operation: Operation,
    /// Inline definition (CREATE) or root link (TRANSFER).
    pub asset: Asset,
    /// Signed inputs.
    pub inputs: Vec<Input>,
    /// Spendable outputs.
    pub outputs: Vec<Output>,
    /// Transaction metadata.
    pub metadata: Metadata,
}

impl Transaction {
    /// Returns the root of the chain this transaction belongs to.
    ///
    /// A CREATE roots its own chain, so its id is the asset id; a TRANSFER
    /// already carries the root link. Either way this is a pure field read —
    /// no predecessor walk is ever needed.
    #[must_use]
    pub fn chain_root(&self) -> AssetId {
        match &self.asset {
            Asset::Link { id } => id.clone(),
            Asset::Definition(_) => AssetId::from(self.id.clone()),
        }
    }

    /// Builds the transfer input that spends this transaction's canonical
    /// output.
    ///
    /// This is the chain-extension step: the returned input references
    /// output [`SPENDABLE_OUTPUT`] of `self` and copies its condition
    /// template and owners, so that fulfilling it with the owner's key
    /// produces a valid spend.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Internal`] if the transaction has no outputs,
    /// which cannot happen for transactions built by this crate.
    pub fn spendable_input(&self) -> Result<UnsignedInput> {
        let output = self.outputs.get(SPENDABLE_OUTPUT).ok_or_else(|| {
            StoreError::internal(format!("transaction {} has no spendable output", self.id))
        })?;

        Ok(UnsignedInput {
            fulfillment: output.condition.details.clone(),
            fulfills: Some(OutputRef {
                transaction_id: self.id.clone(),
                output_index: SPENDABLE_OUTPUT,
            }),
            owners_before: output.public_keys.clone(),
        })
    }

    /// Returns the resource id embedded in this transaction's payload, if
    /// the payload carries one.
    #[must_use]
    pub fn resource_id(&self) -> Option<&str> {
        self.metadata.data.as_ref()?.get(RESOURCE_ID_KEY)?.as_str()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn create_tx(id: &str, owner: &str, namespace: &str, data: Value) -> Transaction {
        Transaction {
            id: TxId::from(id),
            operation: Operation::Create,
            asset: Asset::Definition(AssetDefinition {
                namespace: namespace.to_owned(),
                data: data.clone(),
            }),
            inputs: vec![Input {
                fulfillment: "sig".to_owned(),
                fulfills: None,
                owners_before: vec![PublicKey::from(owner)],
            }],
            outputs: vec![Output::owned_by(PublicKey::from(owner))],
            metadata: Metadata::new(namespace, data),
        }
    }

    #[test]
    fn test_operation_wire_names() {
        assert_eq!(serde_json::to_string(&Operation::Create).unwrap(), r#""CREATE""#);
        assert_eq!(serde_json::to_string(&Operation::Transfer).unwrap(), r#""TRANSFER""#);
    }

    #[test]
    fn test_asset_link_serializes_as_bare_id_object() {
        let asset = Asset::Link { id: AssetId::from("root-1") };
        assert_eq!(serde_json::to_string(&asset).unwrap(), r#"{"id":"root-1"}"#);

        let back: Asset = serde_json::from_str(r#"{"id":"root-1"}"#).unwrap();
        assert_eq!(back, asset);
    }

    #[test]
    fn test_asset_definition_deserializes_untagged() {
        let json = r#"{"namespace":"ocean","data":{"title":"A"}}"#;
        let asset: Asset = serde_json::from_str(json).unwrap();
        match asset {
            Asset::Definition(def) => {
                assert_eq!(def.namespace, "ocean");
                assert_eq!(def.data, json!({"title": "A"}));
            },
            Asset::Link { .. } => panic!("definition parsed as link"),
        }
    }

    #[test]
    fn test_burned_metadata_omits_data_field() {
        let json = serde_json::to_string(&Metadata::burned()).unwrap();
        assert_eq!(json, r#"{"namespace":"burned"}"#);
        assert!(Metadata::burned().is_burned());
        assert!(!Metadata::new("ocean", json!({})).is_burned());
    }

    #[test]
    fn test_chain_root_of_create_is_own_id() {
        let tx = create_tx("tx-1", "pk-a", "ocean", json!({"title": "A"}));
        assert_eq!(tx.chain_root(), AssetId::from("tx-1"));
    }

    #[test]
    fn test_chain_root_of_transfer_is_link_target() {
        let mut tx = create_tx("tx-2", "pk-a", "ocean", json!({}));
        tx.operation = Operation::Transfer;
        tx.asset = Asset::Link { id: AssetId::from("tx-1") };

        assert_eq!(tx.chain_root(), AssetId::from("tx-1"));
    }

    #[test]
    fn test_spendable_input_references_canonical_output() {
        let tx = create_tx("tx-1", "pk-a", "ocean", json!({}));
        let input = tx.spendable_input().unwrap();

        assert_eq!(
            input.fulfills,
            Some(OutputRef { transaction_id: TxId::from("tx-1"), output_index: SPENDABLE_OUTPUT }),
        );
        assert_eq!(input.owners_before, vec![PublicKey::from("pk-a")]);
        assert_eq!(input.fulfillment, tx.outputs[0].condition.details);
    }

    #[test]
    fn test_spendable_input_fails_without_outputs() {
        let mut tx = create_tx("tx-1", "pk-a", "ocean", json!({}));
        tx.outputs.clear();

        assert!(matches!(tx.spendable_input(), Err(StoreError::Internal { .. })));
    }

    #[test]
    fn test_resource_id_extraction() {
        let tx = create_tx("tx-1", "pk-a", "ocean", json!({"title": "A", "_id": "r1"}));
        assert_eq!(tx.resource_id(), Some("r1"));

        let no_id = create_tx("tx-2", "pk-a", "ocean", json!({"title": "B"}));
        assert_eq!(no_id.resource_id(), None);

        let mut burned = create_tx("tx-3", "pk-a", "ocean", json!({}));
        burned.metadata = Metadata::burned();
        assert_eq!(burned.resource_id(), None);
    }
}
