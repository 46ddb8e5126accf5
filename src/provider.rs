//! The wallet provider boundary.
//!
//! Everything this crate knows about the outside world goes through
//! [`WalletProvider`]: account access, native balances, contract reads,
//! signed writes, confirmation waits, and account-change notifications.
//! Keeping the boundary a trait lets the whole client run against an
//! in-memory chain in tests.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::types::{Address, Amount, TxHash};

/// Failures raised at the provider boundary, before classification into the
/// crate-level taxonomy.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// No provider is reachable at all.
    #[error("provider unreachable: {0}")]
    Unavailable(String),

    /// The wallet user declined the request.
    #[error("rejected by the wallet user: {0}")]
    UserRejected(String),

    /// The remote side answered with an error object.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The request never completed.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The response arrived but could not be decoded.
    #[error("undecodable provider response: {0}")]
    Decode(String),
}

/// A contract invocation, read or write, addressed to one of the deployed
/// registries and attributed to the active signing identity.
///
/// Arguments are JSON values in the ledger's native encodings; monetary
/// arguments are [`Amount`]s, which serialize as base-unit decimal strings.
#[derive(Debug, Clone, Serialize)]
pub struct CallRequest {
    /// Deployed contract the call is addressed to.
    pub to: Address,
    /// Signing identity the call is attributed to.
    pub from: Address,
    /// Contract method name.
    pub method: String,
    /// Positional arguments.
    pub args: Vec<Value>,
    /// Native currency attached to a payable write.
    pub value: Option<Amount>,
}

/// Confirmation result for a submitted transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    /// `false` means the call reverted on chain.
    pub succeeded: bool,
}

/// Account access, signing and contract-call capabilities of an injected
/// wallet provider.
///
/// Reads ([`call`](Self::call)) never mutate remote state and may be retried
/// freely. Writes ([`submit`](Self::submit)) return the pending transaction
/// hash without waiting; confirmation is a separate, explicit step.
pub trait WalletProvider {
    /// Request account access. An empty list means access was granted to no
    /// account; callers treat that the same as a decline.
    fn request_accounts(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Address>, ProviderError>>;

    /// Native balance of an account, in base units.
    fn balance_of(
        &self,
        account: &Address,
    ) -> impl std::future::Future<Output = Result<Amount, ProviderError>>;

    /// Execute a read-only contract call and return its raw JSON result.
    fn call(
        &self,
        request: CallRequest,
    ) -> impl std::future::Future<Output = Result<Value, ProviderError>>;

    /// Sign and submit a state-mutating call. Resolves as soon as the
    /// transaction is accepted into the provider's pipeline.
    fn submit(
        &self,
        request: CallRequest,
    ) -> impl std::future::Future<Output = Result<TxHash, ProviderError>>;

    /// Wait until the ledger confirms (or reverts) a submitted transaction.
    fn await_confirmation(
        &self,
        hash: &TxHash,
    ) -> impl std::future::Future<Output = Result<TxReceipt, ProviderError>>;

    /// Open a subscription to account-change notifications. Each call opens
    /// an independent subscription; the session layer is responsible for
    /// opening at most one.
    fn subscribe_accounts(&self) -> AccountSubscription;
}

/// Receiving half of an account-change subscription.
///
/// Dropping the subscription is its teardown: the provider-side notifier
/// observes the closed channel and stops delivering.
#[derive(Debug)]
pub struct AccountSubscription {
    rx: mpsc::UnboundedReceiver<Vec<Address>>,
}

impl AccountSubscription {
    /// Create a connected notifier/subscription pair.
    pub fn channel() -> (AccountsNotifier, AccountSubscription) {
        let (tx, rx) = mpsc::unbounded_channel();
        (AccountsNotifier { tx }, AccountSubscription { rx })
    }

    /// Next account-change notification. `None` once the provider side has
    /// dropped its notifier.
    pub async fn next(&mut self) -> Option<Vec<Address>> {
        self.rx.recv().await
    }
}

/// Sending half held by the provider implementation.
#[derive(Debug, Clone)]
pub struct AccountsNotifier {
    tx: mpsc::UnboundedSender<Vec<Address>>,
}

impl AccountsNotifier {
    /// Deliver a new account list. Returns `false` if the subscription has
    /// been torn down.
    pub fn notify(&self, accounts: Vec<Address>) -> bool {
        self.tx.send(accounts).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscription_delivers_in_order_and_ends_on_teardown() {
        let (notifier, mut sub) = AccountSubscription::channel();
        let a: Address = "0x00000000000000000000000000000000000000aa".parse().unwrap();
        assert!(notifier.notify(vec![a.clone()]));
        assert!(notifier.notify(vec![]));
        assert_eq!(sub.next().await, Some(vec![a]));
        assert_eq!(sub.next().await, Some(vec![]));
        drop(notifier);
        assert_eq!(sub.next().await, None);
    }

    #[test]
    fn teardown_is_visible_to_the_notifier() {
        let (notifier, sub) = AccountSubscription::channel();
        drop(sub);
        assert!(!notifier.notify(vec![]));
    }
}
