//! Wallet session lifecycle.
//!
//! Owns the connection handshake against the provider and the single
//! account-change subscription. Session *state* (active account, balance)
//! lives in the orchestrator's central view state; this module produces it.

use std::sync::{Arc, Mutex};

use crate::error::ClientError;
use crate::provider::{AccountSubscription, WalletProvider};
use crate::types::{Address, Amount};

/// Connection state as seen by the view layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub account: Option<Address>,
    pub native_balance: Option<Amount>,
    pub connected: bool,
}

impl Session {
    /// The disconnected session.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn connected(account: Address, native_balance: Amount) -> Self {
        Self {
            account: Some(account),
            native_balance: Some(native_balance),
            connected: true,
        }
    }
}

/// Where the one account-change subscription currently is.
///
/// `Taken` is terminal: once the embedder owns the receiver, reconnects must
/// not open a second one.
#[derive(Debug)]
enum EventsSlot {
    Unsubscribed,
    Held(AccountSubscription),
    Taken,
}

/// Connection lifecycle against the injected provider.
pub struct WalletSession<P: WalletProvider> {
    provider: Arc<P>,
    events: Mutex<EventsSlot>,
}

impl<P: WalletProvider> WalletSession<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            events: Mutex::new(EventsSlot::Unsubscribed),
        }
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Run the connection handshake: request account access, resolve the
    /// active account, read its native balance.
    ///
    /// Safe to re-run on account-change notifications; the account-change
    /// subscription is opened on the first call only and never duplicated.
    pub async fn connect(&self) -> Result<Session, ClientError> {
        let accounts = self
            .provider
            .request_accounts()
            .await
            .map_err(ClientError::from_connect)?;
        let Some(account) = accounts.into_iter().next() else {
            return Err(ClientError::ConnectionRejected(
                "the provider granted access to no accounts".to_string(),
            ));
        };
        let balance = self
            .provider
            .balance_of(&account)
            .await
            .map_err(ClientError::from_call)?;

        self.ensure_subscribed();
        log::info!("wallet connected: {account}");
        Ok(Session::connected(account, balance))
    }

    /// Re-read the native balance of the given account.
    pub async fn refresh_balance(&self, account: &Address) -> Result<Amount, ClientError> {
        self.provider
            .balance_of(account)
            .await
            .map_err(ClientError::from_call)
    }

    /// Hand the account-change subscription to the embedder's event loop.
    ///
    /// Returns `Some` exactly once. Dropping the returned subscription is its
    /// teardown; there is no way to accidentally accumulate listeners.
    pub fn take_account_events(&self) -> Option<AccountSubscription> {
        let mut slot = self.events.lock().expect("events slot lock poisoned");
        match std::mem::replace(&mut *slot, EventsSlot::Taken) {
            EventsSlot::Unsubscribed => Some(self.provider.subscribe_accounts()),
            EventsSlot::Held(subscription) => Some(subscription),
            EventsSlot::Taken => None,
        }
    }

    fn ensure_subscribed(&self) {
        let mut slot = self.events.lock().expect("events slot lock poisoned");
        if matches!(*slot, EventsSlot::Unsubscribed) {
            *slot = EventsSlot::Held(self.provider.subscribe_accounts());
        }
    }
}
