//! Record builder: defaults, identity, and schema normalization.

use super::{is_schema_field, AnalyticsRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Fields only the builder sets; caller-supplied values for them are dropped.
const RESERVED_FIELDS: &[&str] = &[
    "request_name",
    "timestamp",
    "client_name",
    "client_version",
    "platform",
    "user_id",
];

/// Abstraction over system time so records can be built deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Identity of the user signed in to the wallet, if any.
///
/// Only rules that need an identity ask for it; frequent low-value events
/// (screen views, dapp connections) are built without it.
pub trait SessionIdentity: Send + Sync {
    fn user_id(&self) -> Option<String>;
}

/// Client metadata stamped on every record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub client_name: String,
    pub client_version: String,
    pub platform: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        crate::config::AppConfig::default().client_info()
    }
}

/// Builds [`AnalyticsRecord`]s from caller-supplied fields.
#[derive(Clone)]
pub struct RecordBuilder {
    client: ClientInfo,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RecordBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordBuilder")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl RecordBuilder {
    pub fn new(client: ClientInfo, clock: Arc<dyn Clock>) -> Self {
        Self { client, clock }
    }

    /// Build a record without user identity.
    ///
    /// `fields` is expected to be a JSON object; anything else contributes no
    /// fields. The defaults and `user_id` cannot be set by the caller.
    pub fn build(&self, request_name: &str, fields: Value) -> AnalyticsRecord {
        let mut record = self.defaults(request_name);
        merge_fields(&mut record, request_name, fields);
        AnalyticsRecord { fields: record }
    }

    /// Build a record and attach `user_id` from the current session.
    ///
    /// `user_id` is `null` when no user is signed in.
    pub fn build_with_identity(
        &self,
        request_name: &str,
        fields: Value,
        identity: &dyn SessionIdentity,
    ) -> AnalyticsRecord {
        let mut record = self.defaults(request_name);
        record.insert(
            "user_id".to_string(),
            identity.user_id().map(Value::String).unwrap_or(Value::Null),
        );
        merge_fields(&mut record, request_name, fields);
        AnalyticsRecord { fields: record }
    }

    fn defaults(&self, request_name: &str) -> BTreeMap<String, Value> {
        let mut record = BTreeMap::new();
        record.insert("request_name".to_string(), Value::from(request_name));
        record.insert(
            "timestamp".to_string(),
            Value::from(self.clock.now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        record.insert(
            "client_name".to_string(),
            Value::from(self.client.client_name.as_str()),
        );
        record.insert(
            "client_version".to_string(),
            Value::from(self.client.client_version.as_str()),
        );
        record.insert(
            "platform".to_string(),
            Value::from(self.client.platform.as_str()),
        );
        record
    }
}

fn merge_fields(record: &mut BTreeMap<String, Value>, request_name: &str, fields: Value) {
    let Value::Object(fields) = fields else {
        return;
    };

    for (key, value) in fields {
        if RESERVED_FIELDS.contains(&key.as_str()) {
            tracing::debug!(request_name, field = %key, "Ignoring caller value for reserved field");
            continue;
        }
        if !is_schema_field(&key) {
            tracing::trace!(request_name, field = %key, "Dropping field outside record schema");
            continue;
        }
        record.insert(key, flatten_value(value));
    }
}

/// Keep records flat: nested objects and arrays become compact JSON strings.
pub(super) fn flatten_value(value: Value) -> Value {
    match value {
        Value::Object(_) | Value::Array(_) => Value::String(value.to_string()),
        scalar => scalar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    struct SignedIn(Option<&'static str>);

    impl SessionIdentity for SignedIn {
        fn user_id(&self) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    fn builder() -> RecordBuilder {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        RecordBuilder::new(
            ClientInfo {
                client_name: "wallet-extension".to_string(),
                client_version: "1.14.0".to_string(),
                platform: "extension".to_string(),
            },
            Arc::new(clock),
        )
    }

    #[test]
    fn test_defaults_are_applied() {
        let record = builder().build("screen_view", json!({}));

        assert_eq!(record.request_name(), "screen_view");
        assert_eq!(record.get_str("timestamp"), Some("2024-03-01T12:00:00.000Z"));
        assert_eq!(record.get_str("client_version"), Some("1.14.0"));
        assert_eq!(record.get_str("platform"), Some("extension"));
        assert!(!record.contains_key("user_id"));
    }

    #[test]
    fn test_null_fields_are_kept() {
        let address: Option<String> = None;
        let record = builder().build("screen_view", json!({"wallet_address": address}));
        assert!(record.is_null("wallet_address"));
    }

    #[test]
    fn test_unknown_fields_are_dropped() {
        let record = builder().build(
            "screen_view",
            json!({"screen_name": "/overview", "private_key": "0xsecret"}),
        );
        assert_eq!(record.get_str("screen_name"), Some("/overview"));
        assert!(!record.contains_key("private_key"));
    }

    #[test]
    fn test_request_name_cannot_be_overridden() {
        let record = builder().build("screen_view", json!({"request_name": "spoofed"}));
        assert_eq!(record.request_name(), "screen_view");
    }

    #[test]
    fn test_reserved_fields_cannot_be_overridden() {
        let record = builder().build(
            "daylight_action",
            json!({
                "user_id": "someone@example.com",
                "timestamp": "1999",
                "client_name": "spoofed",
                "client_version": "0.0.1",
                "platform": "web",
                "event_name": "Ability Opened",
            }),
        );
        assert!(!record.contains_key("user_id"));
        assert_eq!(record.get_str("timestamp"), Some("2024-03-01T12:00:00.000Z"));
        assert_eq!(record.get_str("client_name"), Some("wallet-extension"));
        assert_eq!(record.get_str("client_version"), Some("1.14.0"));
        assert_eq!(record.get_str("platform"), Some("extension"));
        assert_eq!(record.get_str("event_name"), Some("Ability Opened"));
    }

    #[test]
    fn test_session_user_id_wins_over_caller_field() {
        let record = builder().build_with_identity(
            "add_custom_evm",
            json!({"user_id": "someone@example.com"}),
            &SignedIn(Some("u-42")),
        );
        assert_eq!(record.get_str("user_id"), Some("u-42"));

        let anonymous = builder().build_with_identity(
            "add_custom_evm",
            json!({"user_id": "someone@example.com"}),
            &SignedIn(None),
        );
        assert!(anonymous.is_null("user_id"));
    }

    #[test]
    fn test_nested_values_are_flattened() {
        let record = builder().build("daylight_action", json!({"ability_type": ["mint", "claim"]}));
        assert_eq!(record.get_str("ability_type"), Some(r#"["mint","claim"]"#));
    }

    #[test]
    fn test_identity_builder_attaches_user_id() {
        let record =
            builder().build_with_identity("add_custom_evm", json!({}), &SignedIn(Some("u-42")));
        assert_eq!(record.get_str("user_id"), Some("u-42"));

        let anonymous =
            builder().build_with_identity("add_custom_evm", json!({}), &SignedIn(None));
        assert!(anonymous.is_null("user_id"));
    }

    #[test]
    fn test_non_object_fields_are_ignored() {
        let record = builder().build("screen_view", json!("not an object"));
        assert_eq!(record.request_name(), "screen_view");
        assert_eq!(record.len(), 5);
    }
}
