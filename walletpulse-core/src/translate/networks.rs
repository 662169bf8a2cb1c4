//! Custom EVM networks added through `wallet_addEthereumChain`.

use serde_json::json;

use super::Translator;
use crate::dispatch::Emission;
use crate::types::ChainAdded;

impl Translator {
    /// One `add_custom_evm` per added network. These carry `user_id`.
    pub fn chain_added(&self, event: &ChainAdded) -> Vec<Emission> {
        let identity = self.collaborators.identity.as_ref();

        event
            .values
            .iter()
            .map(|network| {
                let native_symbol = network
                    .native_asset
                    .as_ref()
                    .and_then(|asset| asset.symbol.clone());

                Emission::metrics(self.builder.build_with_identity(
                    "add_custom_evm",
                    json!({
                        "network_external_id": network.external_id,
                        "network_rpc_url_internal": network.rpc_url_internal,
                        "network_name": network.name,
                        "network_native_asset_symbol": native_symbol,
                        "network_explorer_home_url": network.explorer_home_url,
                    }),
                    identity,
                ))
            })
            .collect()
    }
}
