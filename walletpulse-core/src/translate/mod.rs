//! Event translation rules
//!
//! Converts each [`DomainEvent`] into the records it should produce.
//!
//! | Event | Record | Identity | Product mirror |
//! |-------|--------|----------|----------------|
//! | `dappConnection` | `dapp_connection` | no | yes |
//! | `screenView` | `screen_view` | no | no |
//! | `daylightAction` | `daylight_action` | no | no |
//! | `transactionSent` | `signed_transaction` | no | yes |
//! | `messageSigned` / `typedDataSigned` | `signed_message` | no | no |
//! | `addEthereumChain` | `add_custom_evm` (one per network) | yes | no |
//! | `globalPreferencesChange` | `metamask_mode` (one per changed dapp) | no | no |
//!
//! Translation never fails. Missing payload fields become `null`, failed
//! lookups become `null`, internally-initiated signatures produce nothing.

mod networks;
mod preferences;
mod session;
mod signing;
mod transaction;

pub use session::DAPP_CONNECTION_PRODUCT_EVENT;
pub use signing::{signing_method, INTERNAL_ORIGIN, UNEXPECTED_SIGNING_TYPE};
pub use transaction::{
    EXTENSION_CONTEXT, EXTERNAL_DAPP_CONTEXT, SIGNED_TRANSACTION_PRODUCT_EVENT,
    TRANSACTION_REQUEST_SCREEN,
};

use std::sync::Arc;

use url::Url;

use crate::collaborators::{
    ActionFieldsAdapter, AddressActionAdapter, FlagDiff, NetworkRegistry, PreferenceDiff,
};
use crate::dispatch::Emission;
use crate::provider::{resolve_provider, ProviderIdentity, WalletGroupResolver};
use crate::record::{RecordBuilder, SessionIdentity};
use crate::snapshot::WalletSnapshot;
use crate::types::DomainEvent;

/// Wallet-side state the translators read.
#[derive(Clone)]
pub struct Collaborators {
    pub wallets: Arc<dyn WalletGroupResolver>,
    pub identity: Arc<dyn SessionIdentity>,
    pub networks: Arc<dyn NetworkRegistry>,
    pub actions: Arc<dyn AddressActionAdapter>,
    pub preferences: Arc<dyn PreferenceDiff>,
}

impl Collaborators {
    /// Read everything from one snapshot, with the default action adapter
    /// and preference diff.
    pub fn from_snapshot(snapshot: Arc<WalletSnapshot>) -> Self {
        Self {
            wallets: snapshot.clone(),
            identity: snapshot.clone(),
            networks: snapshot,
            actions: Arc::new(ActionFieldsAdapter),
            preferences: Arc::new(FlagDiff),
        }
    }
}

/// Applies the translation rules.
pub struct Translator {
    collaborators: Collaborators,
    builder: RecordBuilder,
    app_origin: String,
}

impl Translator {
    /// `app_origin` is the running extension's own origin.
    pub fn new(collaborators: Collaborators, builder: RecordBuilder, app_origin: &str) -> Self {
        let app_origin = Url::parse(app_origin)
            .ok()
            .and_then(|url| origin_of(&url))
            .unwrap_or_else(|| app_origin.trim_end_matches('/').to_string());

        Self {
            collaborators,
            builder,
            app_origin,
        }
    }

    pub fn app_origin(&self) -> &str {
        &self.app_origin
    }

    /// Translate any event into its emissions.
    ///
    /// Only `transactionSent` suspends (network registry lookup).
    pub async fn translate(&self, event: &DomainEvent) -> Vec<Emission> {
        match event {
            DomainEvent::TransactionSent(e) => self.transaction_sent(e).await,
            other => self.translate_immediate(other).unwrap_or_default(),
        }
    }

    /// Translate an event without suspending.
    ///
    /// Returns `None` for `transactionSent`, which has to await the network
    /// registry; use [`Translator::transaction_sent`] for it.
    pub fn translate_immediate(&self, event: &DomainEvent) -> Option<Vec<Emission>> {
        let emissions = match event {
            DomainEvent::DappConnection(e) => self.dapp_connection(e),
            DomainEvent::ScreenView(e) => vec![self.screen_view(e)],
            DomainEvent::DaylightAction(e) => vec![self.daylight_action(e)],
            DomainEvent::TransactionSent(_) => return None,
            DomainEvent::MessageSigned(e) => self.message_signed(e).into_iter().collect(),
            DomainEvent::TypedDataSigned(e) => self.typed_data_signed(e).into_iter().collect(),
            DomainEvent::ChainAdded(e) => self.chain_added(e),
            DomainEvent::PreferencesChanged(e) => self.preferences_changed(e),
        };

        tracing::trace!(
            event = %event.kind(),
            emissions = emissions.len(),
            "Translated event"
        );
        Some(emissions)
    }

    fn provider(&self, address: Option<&str>) -> ProviderIdentity {
        resolve_provider(self.collaborators.wallets.as_ref(), address)
    }
}

/// `scheme://host[:port]` of a URL, including non-special schemes such as
/// `chrome-extension://`. `None` for URLs without a host.
pub(crate) fn origin_of(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let mut origin = format!("{}://{}", url.scheme(), host);
    if let Some(port) = url.port() {
        origin.push_str(&format!(":{}", port));
    }
    Some(origin)
}

/// Origin of a URL string, `None` if it does not parse or has no host.
pub(crate) fn origin_of_str(raw: &str) -> Option<String> {
    Url::parse(raw).ok().and_then(|url| origin_of(&url))
}
