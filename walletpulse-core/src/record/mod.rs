//! Normalized analytics records
//!
//! An [`AnalyticsRecord`] is the flat payload sent to the metrics endpoint:
//! field name to JSON scalar or `null`. Records are produced only by the
//! [`RecordBuilder`], which guarantees that
//!
//! - `request_name` is always present,
//! - only fields listed in [`SCHEMA_FIELDS`] appear,
//! - values are scalars (nested values are flattened to JSON strings).

mod builder;

pub use builder::{Clock, ClientInfo, RecordBuilder, SessionIdentity, SystemClock};

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Every field any translation rule may emit.
pub const SCHEMA_FIELDS: &[&str] = &[
    // common
    "request_name",
    "timestamp",
    "client_name",
    "client_version",
    "platform",
    "user_id",
    // wallet
    "wallet_address",
    "wallet_provider",
    // navigation
    "dapp_domain",
    "screen_name",
    "previous_screen_name",
    "screen_size",
    // daylight
    "event_name",
    "ability_id",
    "ability_type",
    "ability_status",
    // transactions and signatures
    "hash",
    "chain",
    "context",
    "type",
    "gas",
    "gas_price",
    "network_fee",
    "asset_amount_sent",
    "usd_amount_sent",
    "action_type",
    "action_name",
    "asset_name_sent",
    "asset_address_sent",
    "asset_name_received",
    "asset_address_received",
    "asset_amount_received",
    "usd_amount_received",
    "output_chain",
    "slippage",
    "service_fee_percentage",
    "service_fee_usd_amount",
    // custom networks
    "network_external_id",
    "network_rpc_url_internal",
    "network_name",
    "network_native_asset_symbol",
    "network_explorer_home_url",
    // preferences
    "enabled",
];

/// Returns true if `field` belongs to the outbound schema.
pub fn is_schema_field(field: &str) -> bool {
    SCHEMA_FIELDS.contains(&field)
}

/// A built analytics record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AnalyticsRecord {
    fields: BTreeMap<String, Value>,
}

impl AnalyticsRecord {
    /// The record type discriminator.
    pub fn request_name(&self) -> &str {
        self.fields
            .get("request_name")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns the field as a string, `None` if absent, null or not a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// True if the field is present with an explicit `null`.
    pub fn is_null(&self, field: &str) -> bool {
        matches!(self.fields.get(field), Some(Value::Null))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Serialize to a JSON value (always an object).
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Derive a copy with one field replaced. The field must be in the schema
    /// and `request_name` cannot be changed.
    pub(crate) fn with_field(&self, field: &str, value: Value) -> Self {
        let mut fields = self.fields.clone();
        if is_schema_field(field) && field != "request_name" {
            fields.insert(field.to_string(), builder::flatten_value(value));
        }
        Self { fields }
    }

    /// Derive a copy with one field removed. `request_name` is always kept.
    pub(crate) fn without_field(&self, field: &str) -> Self {
        let mut fields = self.fields.clone();
        if field != "request_name" {
            fields.remove(field);
        }
        Self { fields }
    }
}
