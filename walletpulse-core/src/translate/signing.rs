//! Message and typed data signatures.

use serde_json::json;

use super::{origin_of_str, Translator};
use crate::dispatch::Emission;
use crate::types::{EventKind, MessageSigned, TypedDataSigned};

/// Initiator of requests the wallet makes on its own behalf. Signatures with
/// this initiator are not dapp activity and are not reported.
pub const INTERNAL_ORIGIN: &str = "internal";

/// `type` reported for a signing event without a known signing method.
pub const UNEXPECTED_SIGNING_TYPE: &str = "unexpected type";

const SIGNING_METHODS: &[(&str, &str)] = &[
    ("messageSigned", "personal_sign"),
    ("typedDataSigned", "eth_signTypedData_v4"),
];

/// RPC signing method behind a signing event, by bus name.
pub fn signing_method(event_name: &str) -> &'static str {
    SIGNING_METHODS
        .iter()
        .find(|(name, _)| *name == event_name)
        .map(|(_, method)| *method)
        .unwrap_or(UNEXPECTED_SIGNING_TYPE)
}

impl Translator {
    /// `signed_message` for `personal_sign`.
    pub fn message_signed(&self, event: &MessageSigned) -> Option<Emission> {
        self.signed_message(
            EventKind::MessageSigned,
            event.initiator.as_deref(),
            event.address.as_deref(),
        )
    }

    /// `signed_message` for `eth_signTypedData_v4`.
    pub fn typed_data_signed(&self, event: &TypedDataSigned) -> Option<Emission> {
        self.signed_message(
            EventKind::TypedDataSigned,
            event.initiator.as_deref(),
            event.address.as_deref(),
        )
    }

    fn signed_message(
        &self,
        kind: EventKind,
        initiator: Option<&str>,
        address: Option<&str>,
    ) -> Option<Emission> {
        if initiator == Some(INTERNAL_ORIGIN) {
            tracing::debug!(event = %kind, "Skipping internally initiated signature");
            return None;
        }

        let provider = self.provider(address);
        let record = self.builder.build(
            "signed_message",
            json!({
                "type": signing_method(kind.bus_name()),
                "wallet_address": address,
                "wallet_provider": provider.metrics,
                "dapp_domain": initiator.and_then(origin_of_str),
            }),
        );
        Some(Emission::metrics(record))
    }
}
