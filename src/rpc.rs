//! JSON-RPC 2.0 implementation of the provider boundary.
//!
//! Talks HTTP to a node that holds unlocked accounts, the setup used against
//! a local development chain. Confirmation is a bounded poll for the
//! transaction receipt. The account-change subscription is live but quiet:
//! a remote node never switches accounts on its own, and
//! [`JsonRpcProvider::notify_accounts`] is how an embedder injects switches.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::provider::{
    AccountSubscription, AccountsNotifier, CallRequest, ProviderError, TxReceipt, WalletProvider,
};
use crate::types::{Address, Amount, TxHash};

/// Error code a wallet-style endpoint answers when the user declines.
const USER_REJECTED_CODE: i64 = 4001;

/// How often and how long to poll for a receipt before giving up.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);
const RECEIPT_POLL_ATTEMPTS: u32 = 60;

/// JSON-RPC 2.0 provider over HTTP.
pub struct JsonRpcProvider {
    http: reqwest::Client,
    endpoint: String,
    next_id: AtomicU64,
    notifiers: Mutex<Vec<AccountsNotifier>>,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl JsonRpcProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            next_id: AtomicU64::new(1),
            notifiers: Mutex::new(Vec::new()),
        }
    }

    /// Push an account switch to every open subscription. Torn-down
    /// subscriptions are pruned as they are discovered.
    pub fn notify_accounts(&self, accounts: Vec<Address>) {
        let mut notifiers = self.notifiers.lock().expect("notifier list lock poisoned");
        notifiers.retain(|n| n.notify(accounts.clone()));
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        log::debug!("rpc -> {method} (id {id})");

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ProviderError::Unavailable(format!("{}: {e}", self.endpoint))
                } else {
                    ProviderError::Transport(e.to_string())
                }
            })?;

        let envelope: RpcEnvelope = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        if let Some(err) = envelope.error {
            log::debug!("rpc <- {method} error {}: {}", err.code, err.message);
            if err.code == USER_REJECTED_CODE {
                return Err(ProviderError::UserRejected(err.message));
            }
            return Err(ProviderError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        serde_json::from_value(envelope.result.unwrap_or(Value::Null))
            .map_err(|e| ProviderError::Decode(format!("{method} result: {e}")))
    }
}

impl WalletProvider for JsonRpcProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.request("wallet_requestAccounts", json!([])).await
    }

    async fn balance_of(&self, account: &Address) -> Result<Amount, ProviderError> {
        self.request("wallet_getBalance", json!([account])).await
    }

    async fn call(&self, request: CallRequest) -> Result<Value, ProviderError> {
        self.request("contract_call", json!([request])).await
    }

    async fn submit(&self, request: CallRequest) -> Result<TxHash, ProviderError> {
        self.request("contract_submit", json!([request])).await
    }

    async fn await_confirmation(&self, hash: &TxHash) -> Result<TxReceipt, ProviderError> {
        for attempt in 0..RECEIPT_POLL_ATTEMPTS {
            let receipt: Option<TxReceipt> =
                self.request("chain_getReceipt", json!([hash])).await?;
            if let Some(receipt) = receipt {
                log::debug!(
                    "transaction {hash} confirmed in block {} after {attempt} polls",
                    receipt.block_number
                );
                return Ok(receipt);
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
        Err(ProviderError::Transport(format!(
            "transaction {hash} not confirmed after {RECEIPT_POLL_ATTEMPTS} polls"
        )))
    }

    fn subscribe_accounts(&self) -> AccountSubscription {
        let (notifier, subscription) = AccountSubscription::channel();
        self.notifiers
            .lock()
            .expect("notifier list lock poisoned")
            .push(notifier);
        subscription
    }
}
