//! Per-dapp provider injection ("MetaMask mode") toggles.

use serde_json::json;

use super::Translator;
use crate::dispatch::Emission;
use crate::types::PreferencesChanged;

impl Translator {
    /// One `metamask_mode` per dapp whose flag flipped.
    ///
    /// Not latency sensitive; the tracker runs this from the idle queue.
    pub fn preferences_changed(&self, event: &PreferencesChanged) -> Vec<Emission> {
        let changes = self
            .collaborators
            .preferences
            .diff(&event.prev_state, &event.state);

        let enabled = changes.newly_enabled.iter().map(|dapp| (dapp, true));
        let disabled = changes.newly_disabled.iter().map(|dapp| (dapp, false));

        enabled
            .chain(disabled)
            .map(|(dapp, enabled)| {
                Emission::metrics(self.builder.build(
                    "metamask_mode",
                    json!({
                        "enabled": enabled,
                        "dapp_domain": dapp,
                    }),
                ))
            })
            .collect()
    }
}
