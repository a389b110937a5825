//! Signer key material and the burn sink address.
//!
//! Key generation and loading belong to the caller; this module only defines
//! the opaque wrappers the store needs to name owners and sign transfers.
//! Passing a `PrivateKey` where a `PublicKey` is expected is a compile-time
//! error, and private keys never appear in `Debug` output.

use serde::{Deserialize, Serialize};

/// A fixed recipient address with no known controlling key.
///
/// Transferring a chain's tip to this address makes the chain permanently
/// unspendable (logical delete). The address is valid on the wire but no
/// writer holds its private key.
pub const BURN_ADDRESS: &str = "BurnBurnBurnBurnBurnBurnBurnBurnBurnBurnBurn";

/// Public half of a signing key pair, used as an owner address on outputs.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicKey(String);

impl PublicKey {
    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PublicKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PublicKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Private half of a signing key pair.
///
/// The inner value is only reachable through [`as_str`](Self::as_str); the
/// `Debug` implementation is redacted so key material cannot leak through
/// logging of configs or stores.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrivateKey(String);

impl PrivateKey {
    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PrivateKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PrivateKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// The signer identity of a store instance.
///
/// Every mutation is signed with `private` and every self-transfer names
/// `public` as the new owner. The pair is fixed per store instance; there is
/// no support for multi-signer resources.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    /// Owner address placed on outputs.
    pub public: PublicKey,
    /// Signing key used to fulfill transactions.
    pub private: PrivateKey,
}

impl KeyPair {
    /// Creates a key pair from its two halves.
    #[must_use]
    pub fn new(public: impl Into<PublicKey>, private: impl Into<PrivateKey>) -> Self {
        Self { public: public.into(), private: private.into() }
    }
}
