//! Domain events consumed from the wallet's background process
//!
//! Events arrive as JSON objects tagged with their bus name:
//!
//! ```json
//! {"event": "dappConnection", "origin": "https://app.uniswap.org", "address": "0xabc..."}
//! ```
//!
//! Every payload field that a producer might omit is optional. A partially
//! populated event still deserializes and translates to a record with `null`
//! fields; it is never rejected.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================
// Event tags
// ============================================

/// Discriminant of a [`DomainEvent`], used as the key of the handler table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    DappConnection,
    ScreenView,
    DaylightAction,
    TransactionSent,
    MessageSigned,
    TypedDataSigned,
    ChainAdded,
    PreferencesChanged,
}

impl EventKind {
    /// Every kind, in registration order.
    pub const ALL: [EventKind; 8] = [
        EventKind::DappConnection,
        EventKind::ScreenView,
        EventKind::DaylightAction,
        EventKind::TransactionSent,
        EventKind::MessageSigned,
        EventKind::TypedDataSigned,
        EventKind::ChainAdded,
        EventKind::PreferencesChanged,
    ];

    /// Name of the event on the wallet's event bus
    pub fn bus_name(&self) -> &'static str {
        match self {
            EventKind::DappConnection => "dappConnection",
            EventKind::ScreenView => "screenView",
            EventKind::DaylightAction => "daylightAction",
            EventKind::TransactionSent => "transactionSent",
            EventKind::MessageSigned => "messageSigned",
            EventKind::TypedDataSigned => "typedDataSigned",
            EventKind::ChainAdded => "addEthereumChain",
            EventKind::PreferencesChanged => "globalPreferencesChange",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.bus_name())
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.bus_name() == s)
            .ok_or_else(|| format!("unknown event: {}", s))
    }
}

// ============================================
// Domain events
// ============================================

/// An occurrence inside the wallet that may be of analytic interest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum DomainEvent {
    #[serde(rename = "dappConnection")]
    DappConnection(DappConnection),
    #[serde(rename = "screenView")]
    ScreenView(ScreenView),
    #[serde(rename = "daylightAction")]
    DaylightAction(DaylightAction),
    #[serde(rename = "transactionSent")]
    TransactionSent(TransactionSent),
    #[serde(rename = "messageSigned")]
    MessageSigned(MessageSigned),
    #[serde(rename = "typedDataSigned")]
    TypedDataSigned(TypedDataSigned),
    #[serde(rename = "addEthereumChain")]
    ChainAdded(ChainAdded),
    #[serde(rename = "globalPreferencesChange")]
    PreferencesChanged(PreferencesChanged),
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::DappConnection(_) => EventKind::DappConnection,
            DomainEvent::ScreenView(_) => EventKind::ScreenView,
            DomainEvent::DaylightAction(_) => EventKind::DaylightAction,
            DomainEvent::TransactionSent(_) => EventKind::TransactionSent,
            DomainEvent::MessageSigned(_) => EventKind::MessageSigned,
            DomainEvent::TypedDataSigned(_) => EventKind::TypedDataSigned,
            DomainEvent::ChainAdded(_) => EventKind::ChainAdded,
            DomainEvent::PreferencesChanged(_) => EventKind::PreferencesChanged,
        }
    }

    /// Parse one event from its JSON form, as published on the bus.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A dapp was granted access to an address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DappConnection {
    #[serde(default, deserialize_with = "lenient::string")]
    pub origin: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub address: Option<String>,
}

/// The extension UI navigated to a new screen.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenView {
    #[serde(default, deserialize_with = "lenient::string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub pathname: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub previous: Option<String>,
    /// Viewport width in CSS pixels
    #[serde(default, deserialize_with = "lenient::count")]
    pub screen_size: Option<u32>,
}

/// An interaction with a Daylight ability card.
///
/// Producers attach arbitrary extra fields; the ones the record schema knows
/// about are forwarded, the rest are dropped by the record builder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaylightAction {
    #[serde(default, deserialize_with = "lenient::string")]
    pub event_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub address: Option<String>,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// A transaction was signed and broadcast.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSent {
    #[serde(default)]
    pub transaction: Transaction,
    /// Full URL of the page that requested the transaction
    #[serde(default, deserialize_with = "lenient::string")]
    pub initiator: Option<String>,
    /// Network fee in the chain's native units, as a decimal string
    #[serde(default, deserialize_with = "lenient::string")]
    pub fee_value_common: Option<String>,
    /// Interpreted action (swap, send, ...) as produced by the wallet backend
    #[serde(default)]
    pub address_action: Option<serde_json::Value>,
    /// Quote the transaction was built from, when it came from a swap form
    #[serde(default)]
    pub quote: Option<serde_json::Value>,
}

/// The parts of a broadcast transaction analytics cares about.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default, deserialize_with = "lenient::string")]
    pub hash: Option<String>,
    #[serde(default, deserialize_with = "lenient::chain_id")]
    pub chain_id: Option<ChainId>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub from: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub gas_limit: Option<String>,
}

/// EVM chain id in canonical `0x`-prefixed lowercase hex.
///
/// Producers send either a hex string or a plain number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawChainId", into = "String")]
pub struct ChainId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawChainId {
    Number(u64),
    Text(String),
}

impl From<RawChainId> for ChainId {
    fn from(raw: RawChainId) -> Self {
        match raw {
            RawChainId::Number(n) => ChainId::from_number(n),
            RawChainId::Text(s) => ChainId::new(&s),
        }
    }
}

impl From<ChainId> for String {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

impl ChainId {
    /// Normalize a textual chain id. Decimal strings are converted to hex;
    /// anything unparseable is kept verbatim (lowercased).
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(hex) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            return match u64::from_str_radix(hex, 16) {
                Ok(n) => ChainId::from_number(n),
                Err(_) => ChainId(trimmed.to_lowercase()),
            };
        }
        match trimmed.parse::<u64>() {
            Ok(n) => ChainId::from_number(n),
            Err(_) => ChainId(trimmed.to_lowercase()),
        }
    }

    pub fn from_number(n: u64) -> Self {
        ChainId(format!("{:#x}", n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Field deserializers that tolerate producers sending the wrong JSON type.
///
/// A mistyped optional field becomes `None` (or is coerced when the intent is
/// unambiguous) instead of rejecting the whole event.
mod lenient {
    use super::ChainId;
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use std::collections::BTreeMap;

    /// Strings pass through; numbers and booleans keep their JSON text.
    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }

    /// Non-negative whole numbers, or strings holding one.
    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn chain_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<ChainId>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_u64().map(ChainId::from_number),
            Value::String(s) => Some(ChainId::new(&s)),
            _ => None,
        })
    }

    /// Nested objects whose own fields are lenient; anything else is `None`.
    pub fn object<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Value::deserialize(d)?;
        if !value.is_object() {
            return Ok(None);
        }
        Ok(serde_json::from_value(value).ok())
    }

    /// Keeps only the entries whose value is a boolean.
    pub fn flags<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<String, bool>, D::Error> {
        let Value::Object(map) = Value::deserialize(d)? else {
            return Ok(BTreeMap::new());
        };
        Ok(map
            .into_iter()
            .filter_map(|(key, value)| value.as_bool().map(|flag| (key, flag)))
            .collect())
    }
}

/// A `personal_sign` request was approved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageSigned {
    #[serde(default, deserialize_with = "lenient::string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub initiator: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub address: Option<String>,
}

/// An `eth_signTypedData_v4` request was approved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataSigned {
    #[serde(default)]
    pub typed_data: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub initiator: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub address: Option<String>,
}

/// One or more custom EVM networks were added (`wallet_addEthereumChain`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainAdded {
    #[serde(default)]
    pub values: Vec<NetworkConfig>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub origin: Option<String>,
}

/// A network definition as stored by the wallet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default, deserialize_with = "lenient::string")]
    pub external_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub rpc_url_internal: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::object")]
    pub native_asset: Option<NativeAsset>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub explorer_home_url: Option<String>,
}

/// Native currency of a network; only the symbol is reported.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NativeAsset {
    #[serde(default, deserialize_with = "lenient::string")]
    pub symbol: Option<String>,
}

/// Global preferences were written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesChanged {
    #[serde(default)]
    pub state: GlobalPreferences,
    #[serde(default)]
    pub prev_state: GlobalPreferences,
}

/// Snapshot of the wallet's global preferences.
///
/// Only the per-dapp provider injection flags ("MetaMask mode") are of
/// analytic interest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalPreferences {
    #[serde(default, deserialize_with = "lenient::flags")]
    pub provider_injection: BTreeMap<String, bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_round_trips_bus_names() {
        for kind in EventKind::ALL {
            assert_eq!(kind.bus_name().parse::<EventKind>().unwrap(), kind);
        }
        assert!("walletCreated".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_parse_transaction_event() {
        let json = r#"{
            "event": "transactionSent",
            "transaction": {"hash": "0xdead", "chainId": "0x89"},
            "initiator": "https://app.uniswap.org/swap",
            "feeValueCommon": "0.0021"
        }"#;
        let event: DomainEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind(), EventKind::TransactionSent);

        let DomainEvent::TransactionSent(tx) = event else {
            panic!("expected transactionSent");
        };
        assert_eq!(tx.transaction.chain_id, Some(ChainId::from_number(137)));
        assert_eq!(tx.initiator.as_deref(), Some("https://app.uniswap.org/swap"));
        assert!(tx.address_action.is_none());
    }

    #[test]
    fn test_partial_events_still_parse() {
        let event: DomainEvent = serde_json::from_str(r#"{"event": "screenView"}"#).unwrap();
        let DomainEvent::ScreenView(view) = event else {
            panic!("expected screenView");
        };
        assert!(view.pathname.is_none());
        assert!(view.screen_size.is_none());
    }

    #[test]
    fn test_daylight_extra_fields_are_captured() {
        let json = r#"{"event": "daylightAction", "event_name": "Open", "ability_id": "abc", "nested": {"x": 1}}"#;
        let DomainEvent::DaylightAction(action) = serde_json::from_str(json).unwrap() else {
            panic!("expected daylightAction");
        };
        assert_eq!(action.event_name.as_deref(), Some("Open"));
        assert_eq!(action.fields["ability_id"], "abc");
        assert!(action.fields.contains_key("nested"));
    }

    #[test]
    fn test_chain_id_normalization() {
        assert_eq!(ChainId::new("0x1").as_str(), "0x1");
        assert_eq!(ChainId::new("0X0A").as_str(), "0xa");
        assert_eq!(ChainId::new("137").as_str(), "0x89");
        assert_eq!(ChainId::new("not-a-chain").as_str(), "not-a-chain");

        let numeric: ChainId = serde_json::from_str("10").unwrap();
        assert_eq!(numeric.as_str(), "0xa");
    }

    #[test]
    fn test_parse_preferences_change() {
        let json = r#"{
            "event": "globalPreferencesChange",
            "state": {"providerInjection": {"app.uniswap.org": true}},
            "prevState": {}
        }"#;
        let DomainEvent::PreferencesChanged(change) = serde_json::from_str(json).unwrap() else {
            panic!("expected globalPreferencesChange");
        };
        assert_eq!(change.state.provider_injection.len(), 1);
        assert!(change.prev_state.provider_injection.is_empty());
    }

    #[test]
    fn test_from_json_reports_json_error() {
        let event = DomainEvent::from_json(r#"{"event": "dappConnection", "origin": "https://a.io"}"#)
            .unwrap();
        assert_eq!(event.kind(), EventKind::DappConnection);

        assert!(matches!(
            DomainEvent::from_json("not json"),
            Err(crate::Error::Json(_))
        ));
        assert!(matches!(
            DomainEvent::from_json(r#"{"event": "walletCreated"}"#),
            Err(crate::Error::Json(_))
        ));
    }

    #[test]
    fn test_numeric_scalars_are_kept_as_text() {
        let json = r#"{
            "event": "transactionSent",
            "transaction": {"hash": "0xdead", "chainId": 8453, "gasLimit": 21000},
            "feeValueCommon": 0.00042
        }"#;
        let DomainEvent::TransactionSent(tx) = DomainEvent::from_json(json).unwrap() else {
            panic!("expected transactionSent");
        };
        assert_eq!(tx.transaction.gas_limit.as_deref(), Some("21000"));
        assert_eq!(tx.transaction.chain_id, Some(ChainId::from_number(8453)));
        assert_eq!(tx.fee_value_common.as_deref(), Some("0.00042"));
    }

    #[test]
    fn test_mistyped_fields_do_not_reject_event() {
        let json = r#"{"event": "screenView", "pathname": "/overview", "screenSize": 1280.5, "previous": ["x"]}"#;
        let DomainEvent::ScreenView(view) = DomainEvent::from_json(json).unwrap() else {
            panic!("expected screenView");
        };
        assert_eq!(view.pathname.as_deref(), Some("/overview"));
        assert!(view.screen_size.is_none());
        assert!(view.previous.is_none());

        let json = r#"{"event": "screenView", "screenSize": "360"}"#;
        let DomainEvent::ScreenView(view) = DomainEvent::from_json(json).unwrap() else {
            panic!("expected screenView");
        };
        assert_eq!(view.screen_size, Some(360));

        let json = r#"{"event": "transactionSent", "transaction": {"chainId": {"id": 1}}}"#;
        let DomainEvent::TransactionSent(tx) = DomainEvent::from_json(json).unwrap() else {
            panic!("expected transactionSent");
        };
        assert!(tx.transaction.chain_id.is_none());
    }

    #[test]
    fn test_native_asset_tolerates_extra_and_mistyped_fields() {
        let json = r#"{
            "event": "addEthereumChain",
            "values": [
                {"name": "Arbitrum One", "native_asset": {"symbol": "ETH", "decimals": "18"}},
                {"name": "Broken", "native_asset": "ETH"}
            ]
        }"#;
        let DomainEvent::ChainAdded(added) = DomainEvent::from_json(json).unwrap() else {
            panic!("expected addEthereumChain");
        };
        let asset = added.values[0].native_asset.as_ref().unwrap();
        assert_eq!(asset.symbol.as_deref(), Some("ETH"));
        assert_eq!(added.values[1].name.as_deref(), Some("Broken"));
        assert!(added.values[1].native_asset.is_none());
    }

    #[test]
    fn test_non_boolean_injection_flags_are_dropped() {
        let json = r#"{
            "event": "globalPreferencesChange",
            "state": {"providerInjection": {"app.uniswap.org": true, "opensea.io": "yes"}}
        }"#;
        let DomainEvent::PreferencesChanged(change) = DomainEvent::from_json(json).unwrap() else {
            panic!("expected globalPreferencesChange");
        };
        assert_eq!(change.state.provider_injection.len(), 1);
        assert_eq!(change.state.provider_injection.get("app.uniswap.org"), Some(&true));
    }
}
