//! # Asset Identity & Registry
//!
//! Defines how CAIRN names things. Every account and every accepted asset
//! is a 32-byte identifier. Asset identifiers are deterministic BLAKE3
//! hashes of the asset's canonical properties (symbol, issuer), so the
//! same asset always gets the same id regardless of when or where it is
//! registered -- no coordination required.
//!
//! The [`AssetRegistry`] is append-only by design: an asset, once
//! accepted, stays accepted. Re-registering an id overwrites its metadata;
//! there is no removal path. Balances in a custody ledger must never
//! become unreachable because someone edited a list.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

use crate::config::{NATIVE_DECIMALS, NATIVE_SYMBOL};

/// Issuer string used for protocol-level identifiers. Not backed by any
/// key material; identifiers under this issuer are fixed by the protocol.
const SYSTEM_ISSUER: &str = "cairn:system";

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// An opaque 32-byte account identifier.
///
/// The engine does not interpret account ids; they are whatever the host
/// platform uses to name callers. The all-zero id is reserved and rejected
/// as input everywhere value could otherwise be burned or conjured.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountId([u8; 32]);

impl AccountId {
    /// The reserved all-zero account.
    pub const ZERO: AccountId = AccountId([0u8; 32]);

    /// Creates an `AccountId` from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derives an `AccountId` from a human-readable label.
    ///
    /// Convenience for tests and demos; real deployments carry platform
    /// account identifiers.
    pub fn named(label: &str) -> Self {
        Self(*blake3::hash(label.as_bytes()).as_bytes())
    }

    /// Returns the raw 32-byte identifier.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the hex-encoded account id.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a hex-encoded account id.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }

    /// Returns `true` if this is the reserved zero account.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({}...)", &self.to_hex()[..12])
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// A unique, content-addressed identifier for an accepted asset.
///
/// Computed as `BLAKE3(symbol || 0x00 || issuer)`. The separator byte
/// prevents ambiguity when one field's suffix matches another's prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetId([u8; 32]);

impl AssetId {
    /// The reserved all-zero asset id.
    pub const ZERO: AssetId = AssetId([0u8; 32]);

    /// Creates an `AssetId` from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derives an `AssetId` from the asset's canonical properties.
    pub fn derive(symbol: &str, issuer: &str) -> Self {
        let mut preimage = Vec::with_capacity(symbol.len() + issuer.len() + 1);
        preimage.extend_from_slice(symbol.as_bytes());
        preimage.push(0x00);
        preimage.extend_from_slice(issuer.as_bytes());
        Self(*blake3::hash(&preimage).as_bytes())
    }

    /// Returns the raw 32-byte identifier.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the hex-encoded asset id.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a hex-encoded asset id.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }

    /// Returns `true` if this is the reserved zero id.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({}...)", &self.to_hex()[..12])
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for AssetId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// Both id types serialize as hex strings so that maps keyed by them are
// plain JSON objects. Deriving serde on the inner array would produce
// non-string map keys, which serde_json rejects at runtime.
macro_rules! impl_hex_serde {
    ($ty:ident) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                $ty::from_hex(&s).map_err(D::Error::custom)
            }
        }
    };
}

impl_hex_serde!(AccountId);
impl_hex_serde!(AssetId);

// ---------------------------------------------------------------------------
// Well-known assets
// ---------------------------------------------------------------------------

/// Returns the [`AssetId`] of the native chain currency.
///
/// Every vault generation accepts this asset; its registry entry is
/// seeded at construction.
pub fn native_asset_id() -> AssetId {
    AssetId::derive(NATIVE_SYMBOL, SYSTEM_ISSUER)
}

/// Returns the registry entry for the native chain currency.
pub fn native_asset_info() -> AssetInfo {
    AssetInfo {
        symbol: NATIVE_SYMBOL.to_string(),
        decimals: NATIVE_DECIMALS,
    }
}

// ---------------------------------------------------------------------------
// AssetInfo
// ---------------------------------------------------------------------------

/// Denomination metadata for a registered asset.
///
/// Presence in the registry is what makes an asset *supported*; there is
/// no separate flag to get out of sync with the map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Display symbol (e.g. "USDC"). Not interpreted by the engine.
    pub symbol: String,

    /// Number of fractional digits of the asset's smallest unit.
    ///
    /// Used by the valuation layer to reconcile denominations. The engine
    /// never divides for display purposes.
    pub decimals: u8,
}

// ---------------------------------------------------------------------------
// AssetRegistry
// ---------------------------------------------------------------------------

/// The append-only registry of accepted assets.
///
/// Pure data structure: privilege gating for mutation happens at the
/// vault layer. Reads are cheap and never mutate.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AssetRegistry {
    assets: HashMap<AssetId, AssetInfo>,
}

impl AssetRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an asset, or overwrites its metadata if the id is
    /// already present. There is no removal path: acceptance is
    /// permanent by design.
    pub fn add(&mut self, id: AssetId, info: AssetInfo) {
        self.assets.insert(id, info);
    }

    /// Returns `true` if the asset has been registered.
    pub fn is_supported(&self, id: &AssetId) -> bool {
        self.assets.contains_key(id)
    }

    /// Returns the fractional-digit count of a registered asset.
    pub fn decimals_of(&self, id: &AssetId) -> Option<u8> {
        self.assets.get(id).map(|info| info.decimals)
    }

    /// Returns the display symbol of a registered asset.
    pub fn symbol_of(&self, id: &AssetId) -> Option<&str> {
        self.assets.get(id).map(|info| info.symbol.as_str())
    }

    /// Returns the number of registered assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Returns `true` if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Iterates over all registered assets.
    pub fn iter(&self) -> impl Iterator<Item = (&AssetId, &AssetInfo)> {
        self.assets.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_id_derivation_is_deterministic() {
        let a = AssetId::derive("USDC", "cairn:issuer");
        let b = AssetId::derive("USDC", "cairn:issuer");
        assert_eq!(a, b);
    }

    #[test]
    fn different_symbols_produce_different_ids() {
        let a = AssetId::derive("USDC", "cairn:issuer");
        let b = AssetId::derive("USDT", "cairn:issuer");
        assert_ne!(a, b);
    }

    #[test]
    fn different_issuers_produce_different_ids() {
        let a = AssetId::derive("USDC", "cairn:alice");
        let b = AssetId::derive("USDC", "cairn:bob");
        assert_ne!(a, b);
    }

    #[test]
    fn separator_prevents_field_bleed() {
        // "AB" + "C" must not collide with "A" + "BC".
        let a = AssetId::derive("AB", "C");
        let b = AssetId::derive("A", "BC");
        assert_ne!(a, b);
    }

    #[test]
    fn asset_id_hex_roundtrip() {
        let id = AssetId::derive("USDC", "cairn:issuer");
        assert_eq!(AssetId::from_hex(&id.to_hex()).unwrap(), id);
    }

    #[test]
    fn zero_ids_are_recognized() {
        assert!(AssetId::ZERO.is_zero());
        assert!(AccountId::ZERO.is_zero());
        assert!(!native_asset_id().is_zero());
        assert!(!AccountId::named("alice").is_zero());
    }

    #[test]
    fn native_asset_id_is_stable() {
        assert_eq!(native_asset_id(), native_asset_id());
        assert_eq!(native_asset_info().decimals, NATIVE_DECIMALS);
    }

    #[test]
    fn registry_add_and_lookup() {
        let mut registry = AssetRegistry::new();
        let id = AssetId::derive("USDC", "cairn:issuer");

        assert!(!registry.is_supported(&id));
        registry.add(
            id,
            AssetInfo {
                symbol: "USDC".into(),
                decimals: 6,
            },
        );

        assert!(registry.is_supported(&id));
        assert_eq!(registry.decimals_of(&id), Some(6));
        assert_eq!(registry.symbol_of(&id), Some("USDC"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn reregistering_overwrites_metadata() {
        let mut registry = AssetRegistry::new();
        let id = AssetId::derive("USDC", "cairn:issuer");

        registry.add(
            id,
            AssetInfo {
                symbol: "USDC".into(),
                decimals: 6,
            },
        );
        registry.add(
            id,
            AssetInfo {
                symbol: "USDC.e".into(),
                decimals: 6,
            },
        );

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.symbol_of(&id), Some("USDC.e"));
    }

    #[test]
    fn unknown_asset_lookups_return_none() {
        let registry = AssetRegistry::new();
        let id = AssetId::derive("GHOST", "cairn:nowhere");
        assert_eq!(registry.decimals_of(&id), None);
        assert_eq!(registry.symbol_of(&id), None);
    }

    #[test]
    fn registry_serialization_roundtrip() {
        let mut registry = AssetRegistry::new();
        registry.add(native_asset_id(), native_asset_info());

        let json = serde_json::to_string(&registry).expect("serialize");
        let recovered: AssetRegistry = serde_json::from_str(&json).expect("deserialize");
        assert!(recovered.is_supported(&native_asset_id()));
        assert_eq!(recovered.decimals_of(&native_asset_id()), Some(18));
    }

    #[test]
    fn account_id_serializes_as_hex_string() {
        let account = AccountId::named("alice");
        let json = serde_json::to_string(&account).expect("serialize");
        assert_eq!(json, format!("\"{}\"", account.to_hex()));
    }
}
