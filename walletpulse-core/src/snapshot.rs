//! In-memory wallet state
//!
//! A [`WalletSnapshot`] answers the read-only questions translators ask of
//! the wallet (which group owns an address, who is signed in, which network
//! a chain id is). The CLI loads one from TOML to replay recorded events.
//!
//! ```toml
//! user_id = "u-42"
//!
//! [wallets."0x42f1..."]
//! kind = "mnemonic"
//! origin = "created"
//!
//! [[networks]]
//! id = "ethereum"
//! name = "Ethereum"
//! chain_id = "0x1"
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::collaborators::{NetworkInfo, NetworkRegistry};
use crate::error::{Error, Result};
use crate::provider::{WalletGroup, WalletGroupResolver};
use crate::record::SessionIdentity;
use crate::types::ChainId;

/// Snapshot of wallet state.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletSnapshot {
    /// Signed-in user, if any
    #[serde(default)]
    pub user_id: Option<String>,

    /// Wallet groups keyed by address (compared case-insensitively)
    #[serde(default)]
    wallets: HashMap<String, WalletGroup>,

    /// Known networks
    #[serde(default)]
    pub networks: Vec<NetworkInfo>,
}

impl WalletSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot from a TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read wallet snapshot {:?}: {}", path, e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let parsed: WalletSnapshot = toml::from_str(content)?;
        // Re-key so lookups do not depend on the file's address casing
        let wallets = parsed
            .wallets
            .into_iter()
            .map(|(address, group)| (address.to_lowercase(), group))
            .collect();
        Ok(Self { wallets, ..parsed })
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_wallet(mut self, address: &str, group: WalletGroup) -> Self {
        self.wallets.insert(address.to_lowercase(), group);
        self
    }

    pub fn with_network(mut self, network: NetworkInfo) -> Self {
        self.networks.push(network);
        self
    }

    pub fn wallet_count(&self) -> usize {
        self.wallets.len()
    }
}

impl WalletGroupResolver for WalletSnapshot {
    fn resolve(&self, address: &str) -> Option<WalletGroup> {
        self.wallets.get(&address.to_lowercase()).cloned()
    }
}

impl SessionIdentity for WalletSnapshot {
    fn user_id(&self) -> Option<String> {
        self.user_id.clone()
    }
}

#[async_trait]
impl NetworkRegistry for WalletSnapshot {
    async fn lookup(&self, chain_id: &ChainId) -> Option<NetworkInfo> {
        self.networks
            .iter()
            .find(|network| &network.chain_id == chain_id)
            .cloned()
    }
}
