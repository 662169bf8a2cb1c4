//! Wallet provider resolution
//!
//! Maps a wallet address to the key-management mechanism behind it, and
//! presents that mechanism in the two vocabularies our sinks expect:
//!
//! | Wallet group | Metrics sink | Product sink |
//! |--------------|--------------|--------------|
//! | Mnemonic, created in the wallet | `generated` | `Recovery Phrase` |
//! | Mnemonic, imported | `mnemonic` | `Recovery Phrase` |
//! | Private key | `privateKey` | `Private Key` |
//! | Hardware (Ledger) | `ledger` | `Hardware` |
//! | Hardware (Trezor) | `trezor` | `Hardware` |
//! | Hardware (other) | `hardware` | `Hardware` |
//! | Hosted signer | `hosted` | `Hosted Signer` |
//! | Watched address | `readonly` | `Watch Only` |
//!
//! The two vocabularies are kept as separate lookup functions so that either
//! sink can change its naming without touching the other.

use serde::{Deserialize, Serialize};

/// Resolves an address to its wallet group from live wallet state.
///
/// Returns `None` when wallet state is not loaded yet or the address is not
/// managed by this wallet. Implementations must not cache across calls.
pub trait WalletGroupResolver: Send + Sync {
    fn resolve(&self, address: &str) -> Option<WalletGroup>;
}

/// The wallet group an address belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletGroup {
    pub kind: WalletKind,
    #[serde(default)]
    pub origin: WalletOrigin,
    /// User-facing group name
    #[serde(default)]
    pub name: Option<String>,
}

/// Key-management mechanism backing a wallet group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletKind {
    Mnemonic,
    PrivateKey,
    Hardware(HardwareVendor),
    Hosted,
    Readonly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardwareVendor {
    Ledger,
    Trezor,
    Other,
}

/// Whether the secret was generated by the wallet or brought in by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletOrigin {
    Created,
    #[default]
    Imported,
}

/// Provider name as understood by the primary metrics sink.
pub fn metrics_provider(group: &WalletGroup) -> &'static str {
    match (group.kind, group.origin) {
        (WalletKind::Mnemonic, WalletOrigin::Created) => "generated",
        (WalletKind::Mnemonic, WalletOrigin::Imported) => "mnemonic",
        (WalletKind::PrivateKey, _) => "privateKey",
        (WalletKind::Hardware(HardwareVendor::Ledger), _) => "ledger",
        (WalletKind::Hardware(HardwareVendor::Trezor), _) => "trezor",
        (WalletKind::Hardware(HardwareVendor::Other), _) => "hardware",
        (WalletKind::Hosted, _) => "hosted",
        (WalletKind::Readonly, _) => "readonly",
    }
}

/// Provider name as understood by the secondary product analytics sink.
pub fn product_provider(group: &WalletGroup) -> &'static str {
    match group.kind {
        WalletKind::Mnemonic => "Recovery Phrase",
        WalletKind::PrivateKey => "Private Key",
        WalletKind::Hardware(_) => "Hardware",
        WalletKind::Hosted => "Hosted Signer",
        WalletKind::Readonly => "Watch Only",
    }
}

/// Both presentations of an address's provider, derived on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderIdentity {
    pub metrics: Option<&'static str>,
    pub product: Option<&'static str>,
}

impl ProviderIdentity {
    pub fn from_group(group: &WalletGroup) -> Self {
        Self {
            metrics: Some(metrics_provider(group)),
            product: Some(product_provider(group)),
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }
}

/// Resolve the provider for an optional address.
///
/// A missing address or failed resolution yields an unknown provider; the
/// surrounding record is still built and delivered.
pub fn resolve_provider(resolver: &dyn WalletGroupResolver, address: Option<&str>) -> ProviderIdentity {
    let Some(address) = address.filter(|a| !a.is_empty()) else {
        return ProviderIdentity::unknown();
    };

    match resolver.resolve(address) {
        Some(group) => ProviderIdentity::from_group(&group),
        None => {
            tracing::debug!(address, "Wallet group not resolved, provider unknown");
            ProviderIdentity::unknown()
        }
    }
}
