//! Collaborators the translators read from
//!
//! The wallet owns all of this state; translators only read it. The traits
//! here are the seams, and each comes with the default implementation the
//! pipeline uses when the host does not supply its own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{ChainId, GlobalPreferences};

// ============================================
// Network registry
// ============================================

/// A network known to the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// Human chain identifier (e.g. "ethereum", "polygon")
    pub id: String,
    /// Display name
    pub name: String,
    /// EVM chain id
    pub chain_id: ChainId,
}

/// Looks up networks by chain id. May suspend (registry refresh) and may miss.
#[async_trait]
pub trait NetworkRegistry: Send + Sync {
    async fn lookup(&self, chain_id: &ChainId) -> Option<NetworkInfo>;
}

// ============================================
// Address action adapter
// ============================================

/// Derives record fields from a transaction's interpreted action and quote.
pub trait AddressActionAdapter: Send + Sync {
    fn record_fields(&self, action: Option<&Value>, quote: Option<&Value>) -> Map<String, Value>;
}

/// Default adapter over the wallet backend's address action / quote shapes.
///
/// ```json
/// {"type": {"value": "trade", "display_value": "Swap"},
///  "content": {"transfers": {
///     "outgoing": [{"asset": {"symbol": "ETH", "address": "0xeee..."}, "amount": {"value": 1.5}}],
///     "incoming": [{"asset": {"symbol": "USDC", "address": "0xa0b..."}, "amount": {"value": 3000, "usd_value": 3001.2}}]}}}
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionFieldsAdapter;

impl AddressActionAdapter for ActionFieldsAdapter {
    fn record_fields(&self, action: Option<&Value>, quote: Option<&Value>) -> Map<String, Value> {
        let mut fields = Map::new();

        if let Some(action) = action {
            fields.insert("action_type".into(), lookup(action, &["type", "value"]));
            fields.insert("action_name".into(), lookup(action, &["type", "display_value"]));

            let outgoing = lookup(action, &["content", "transfers", "outgoing", "0"]);
            let incoming = lookup(action, &["content", "transfers", "incoming", "0"]);
            fields.insert("asset_name_sent".into(), lookup(&outgoing, &["asset", "symbol"]));
            fields.insert("asset_address_sent".into(), lookup(&outgoing, &["asset", "address"]));
            fields.insert("asset_name_received".into(), lookup(&incoming, &["asset", "symbol"]));
            fields.insert(
                "asset_address_received".into(),
                lookup(&incoming, &["asset", "address"]),
            );
            fields.insert(
                "asset_amount_received".into(),
                lookup(&incoming, &["amount", "value"]),
            );
            fields.insert(
                "usd_amount_received".into(),
                lookup(&incoming, &["amount", "usd_value"]),
            );
        }

        if let Some(quote) = quote {
            fields.insert("slippage".into(), lookup(quote, &["slippage"]));
            fields.insert("output_chain".into(), lookup(quote, &["output_chain"]));
            fields.insert(
                "service_fee_percentage".into(),
                lookup(quote, &["protocol_fee", "percentage"]),
            );
            fields.insert(
                "service_fee_usd_amount".into(),
                lookup(quote, &["protocol_fee", "amount_usd"]),
            );
        }

        fields
    }
}

/// Walk `path` through objects and arrays (numeric segments index arrays).
/// Any miss yields `null`.
fn lookup(value: &Value, path: &[&str]) -> Value {
    let mut current = value;
    for segment in path {
        let next = match current {
            Value::Object(map) => map.get(*segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(v) => current = v,
            None => return Value::Null,
        }
    }
    current.clone()
}

// ============================================
// Preference diff
// ============================================

/// Keys whose flag flipped between two preference snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceChanges {
    pub newly_enabled: BTreeSet<String>,
    pub newly_disabled: BTreeSet<String>,
}

impl PreferenceChanges {
    pub fn is_empty(&self) -> bool {
        self.newly_enabled.is_empty() && self.newly_disabled.is_empty()
    }

    pub fn len(&self) -> usize {
        self.newly_enabled.len() + self.newly_disabled.len()
    }
}

/// Diffs two preference snapshots.
pub trait PreferenceDiff: Send + Sync {
    fn diff(&self, previous: &GlobalPreferences, next: &GlobalPreferences) -> PreferenceChanges;
}

/// Diffs the per-dapp provider injection flags. An absent key counts as
/// `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlagDiff;

impl PreferenceDiff for FlagDiff {
    fn diff(&self, previous: &GlobalPreferences, next: &GlobalPreferences) -> PreferenceChanges {
        diff_flags(&previous.provider_injection, &next.provider_injection)
    }
}

fn diff_flags(previous: &BTreeMap<String, bool>, next: &BTreeMap<String, bool>) -> PreferenceChanges {
    let was = |key: &str| previous.get(key).copied().unwrap_or(false);
    let is = |key: &str| next.get(key).copied().unwrap_or(false);

    let mut changes = PreferenceChanges::default();
    for key in previous.keys().chain(next.keys()) {
        match (was(key), is(key)) {
            (false, true) => {
                changes.newly_enabled.insert(key.clone());
            }
            (true, false) => {
                changes.newly_disabled.insert(key.clone());
            }
            _ => {}
        }
    }
    changes
}

/// A quote-free summary of what the adapter extracted, for debug logging.
pub(crate) fn describe_action(fields: &Map<String, Value>) -> Value {
    json!({
        "action_type": fields.get("action_type").cloned().unwrap_or(Value::Null),
        "field_count": fields.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs(flags: &[(&str, bool)]) -> GlobalPreferences {
        GlobalPreferences {
            provider_injection: flags.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    fn set(keys: &[&str]) -> BTreeSet<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_flag_diff_transitions() {
        let old = prefs(&[("a.xyz", false), ("b.xyz", true)]);
        let new = prefs(&[("a.xyz", true), ("b.xyz", true), ("c.xyz", true)]);

        let changes = FlagDiff.diff(&old, &new);
        assert_eq!(changes.newly_enabled, set(&["a.xyz", "c.xyz"]));
        assert!(changes.newly_disabled.is_empty());
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn test_flag_diff_disables() {
        let old = prefs(&[("a.xyz", true), ("b.xyz", true)]);
        let new = prefs(&[("a.xyz", false)]);

        let changes = FlagDiff.diff(&old, &new);
        assert!(changes.newly_enabled.is_empty());
        assert_eq!(changes.newly_disabled, set(&["a.xyz", "b.xyz"]));
    }

    #[test]
    fn test_flag_diff_no_change() {
        let old = prefs(&[("a.xyz", true), ("b.xyz", false)]);
        let new = prefs(&[("a.xyz", true)]);
        assert!(FlagDiff.diff(&old, &new).is_empty());
    }

    #[test]
    fn test_action_fields_from_swap() {
        let action = json!({
            "type": {"value": "trade", "display_value": "Swap"},
            "content": {"transfers": {
                "outgoing": [{"asset": {"symbol": "ETH", "address": "0xeee"}, "amount": {"value": 1.5}}],
                "incoming": [{"asset": {"symbol": "USDC", "address": "0xa0b"}, "amount": {"value": 3000, "usd_value": 3001.2}}]
            }}
        });
        let quote = json!({"slippage": 0.5, "protocol_fee": {"percentage": 0.8, "amount_usd": 24.0}});

        let fields = ActionFieldsAdapter.record_fields(Some(&action), Some(&quote));
        assert_eq!(fields["action_type"], "trade");
        assert_eq!(fields["action_name"], "Swap");
        assert_eq!(fields["asset_name_sent"], "ETH");
        assert_eq!(fields["asset_name_received"], "USDC");
        assert_eq!(fields["usd_amount_received"], 3001.2);
        assert_eq!(fields["slippage"], 0.5);
        assert_eq!(fields["service_fee_percentage"], 0.8);
        assert_eq!(fields["output_chain"], Value::Null);
    }

    #[test]
    fn test_action_fields_tolerate_missing_shapes() {
        let fields = ActionFieldsAdapter.record_fields(Some(&json!({"type": "weird"})), None);
        assert_eq!(fields["action_type"], Value::Null);
        assert_eq!(fields["asset_name_sent"], Value::Null);
        assert!(!fields.contains_key("slippage"));

        assert!(ActionFieldsAdapter.record_fields(None, None).is_empty());
    }
}
