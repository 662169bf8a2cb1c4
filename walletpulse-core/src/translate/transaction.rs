//! Signed transactions.

use serde_json::{Map, Value};
use url::Url;

use super::{origin_of, Translator};
use crate::collaborators::describe_action;
use crate::dispatch::Emission;
use crate::types::TransactionSent;

/// Context of a transaction initiated from the extension's own UI
pub const EXTENSION_CONTEXT: &str = "Extension";
/// Context of a transaction requested by a dapp
pub const EXTERNAL_DAPP_CONTEXT: &str = "External Dapp";
/// Screen name used when the initiator URL has no path
pub const TRANSACTION_REQUEST_SCREEN: &str = "Transaction Request";
/// Product analytics name for signed transactions
pub const SIGNED_TRANSACTION_PRODUCT_EVENT: &str = "Transaction: Signed Transaction";

/// What the initiator URL tells us about where a transaction came from.
#[derive(Debug, PartialEq, Eq)]
struct InitiatorInfo {
    context: &'static str,
    dapp_domain: Option<String>,
    screen_name: Option<String>,
}

impl Translator {
    /// `signed_transaction`, plus its product mirror.
    pub async fn transaction_sent(&self, event: &TransactionSent) -> Vec<Emission> {
        let transaction = &event.transaction;

        let chain = match &transaction.chain_id {
            Some(chain_id) => Some(
                self.collaborators
                    .networks
                    .lookup(chain_id)
                    .await
                    .map(|network| network.id)
                    .unwrap_or_else(|| chain_id.to_string()),
            ),
            None => None,
        };

        let initiator = self.classify_initiator(event.initiator.as_deref());
        let provider = self.provider(transaction.from.as_deref());

        let action_fields = self
            .collaborators
            .actions
            .record_fields(event.address_action.as_ref(), event.quote.as_ref());
        tracing::trace!(action = %describe_action(&action_fields), "Address action fields");

        let mut fields: Map<String, Value> = action_fields;
        let own_fields = [
            ("hash", Value::from(transaction.hash.clone())),
            ("chain", Value::from(chain)),
            ("context", Value::from(initiator.context)),
            ("dapp_domain", Value::from(initiator.dapp_domain)),
            ("screen_name", Value::from(initiator.screen_name)),
            ("wallet_address", Value::from(transaction.from.clone())),
            ("wallet_provider", Value::from(provider.metrics)),
            ("gas", Value::from(transaction.gas_limit.clone())),
            ("network_fee", Value::from(event.fee_value_common.clone())),
            // Not computed yet: amounts sent and gas price stay null
            ("gas_price", Value::Null),
            ("asset_amount_sent", Value::Null),
            ("usd_amount_sent", Value::Null),
        ];
        for (key, value) in own_fields {
            fields.insert(key.to_string(), value);
        }

        let record = self
            .builder
            .build("signed_transaction", Value::Object(fields));
        let mirror = record
            .without_field("wallet_address")
            .with_field("wallet_provider", Value::from(provider.product));

        vec![
            Emission::metrics(record),
            Emission::product(SIGNED_TRANSACTION_PRODUCT_EVENT, mirror),
        ]
    }

    fn classify_initiator(&self, initiator: Option<&str>) -> InitiatorInfo {
        let parsed = initiator.and_then(|raw| Url::parse(raw).ok().map(|url| (raw, url)));
        let Some((raw, url)) = parsed else {
            return InitiatorInfo {
                context: EXTERNAL_DAPP_CONTEXT,
                dapp_domain: None,
                screen_name: None,
            };
        };

        let origin = origin_of(&url);
        let screen_name = if origin.as_deref() == Some(raw) {
            TRANSACTION_REQUEST_SCREEN.to_string()
        } else {
            url.path().to_string()
        };

        if origin.as_deref() == Some(self.app_origin.as_str()) {
            InitiatorInfo {
                context: EXTENSION_CONTEXT,
                dapp_domain: None,
                screen_name: Some(screen_name),
            }
        } else {
            InitiatorInfo {
                context: EXTERNAL_DAPP_CONTEXT,
                dapp_domain: origin,
                screen_name: Some(screen_name),
            }
        }
    }
}
