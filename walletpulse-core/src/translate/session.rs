//! Dapp connections, screen views and Daylight actions.

use serde_json::{json, Value};

use super::Translator;
use crate::dispatch::Emission;
use crate::types::{DappConnection, DaylightAction, DomainEvent, ScreenView};

/// Product analytics name for dapp connections
pub const DAPP_CONNECTION_PRODUCT_EVENT: &str = "DApp: DApp Connection";

impl Translator {
    /// `dapp_connection`, plus its product mirror.
    pub fn dapp_connection(&self, event: &DappConnection) -> Vec<Emission> {
        let provider = self.provider(event.address.as_deref());
        let record = self.builder.build(
            "dapp_connection",
            json!({
                "wallet_address": event.address,
                "dapp_domain": event.origin,
                "wallet_provider": provider.metrics,
            }),
        );

        let mirror = record
            .without_field("wallet_address")
            .with_field("wallet_provider", Value::from(provider.product));

        vec![
            Emission::metrics(record),
            Emission::product(DAPP_CONNECTION_PRODUCT_EVENT, mirror),
        ]
    }

    /// `screen_view`. Built without identity.
    pub fn screen_view(&self, event: &ScreenView) -> Emission {
        let provider = self.provider(event.address.as_deref());
        Emission::metrics(self.builder.build(
            "screen_view",
            json!({
                "screen_name": event.pathname,
                "previous_screen_name": event.previous,
                "screen_size": event.screen_size,
                "wallet_address": event.address,
                "wallet_provider": provider.metrics,
            }),
        ))
    }

    /// `daylight_action`: event fields pass through, the builder keeps the
    /// ones in the schema.
    pub fn daylight_action(&self, event: &DaylightAction) -> Emission {
        let mut fields = event.fields.clone();
        fields.insert("event_name".into(), Value::from(event.event_name.clone()));
        fields.insert("wallet_address".into(), Value::from(event.address.clone()));

        Emission::metrics(self.builder.build("daylight_action", Value::Object(fields)))
    }
}
