//! In-memory chain double.
//!
//! Implements the full provider boundary against two simulated registries so
//! the client can be exercised end to end without a node. Writes are applied
//! at submission and confirmed through a gate the test controls; a write the
//! registries refuse is recorded as a reverted receipt, the way a real chain
//! mines a failing transaction.

// Not every test binary touches every helper.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::watch;

use crowdfund_client::{
    AccountSubscription, AccountsNotifier, Address, Amount, CallRequest, DeploymentConfig,
    ProviderError, RawCampaign, TxHash, TxReceipt, VerificationRecord, WalletProvider,
};

/// Deterministic test address `0x…00nn`.
pub fn addr(n: u8) -> Address {
    format!("0x{n:040x}").parse().expect("test address")
}

pub fn admin() -> Address {
    addr(0xad)
}

fn kyc_registry() -> Address {
    addr(0xb1)
}

fn crowdfunding() -> Address {
    addr(0xc2)
}

struct ChainState {
    accounts: Vec<Address>,
    balances: HashMap<Address, Amount>,
    records: HashMap<Address, VerificationRecord>,
    pending: Vec<Address>,
    campaigns: Vec<RawCampaign>,
    receipts: HashMap<TxHash, bool>,
    next_tx: u64,
    next_block: u64,
    call_count: u64,
    submit_count: u64,
    provider_available: bool,
    decline_connect: Option<String>,
    reject_next_submit: Option<String>,
    revert_next_write: bool,
}

pub struct MockChain {
    state: Mutex<ChainState>,
    notifiers: Mutex<Vec<AccountsNotifier>>,
    confirm_gate: watch::Sender<bool>,
}

impl MockChain {
    /// Fresh chain with the administrator as the active provider account.
    pub fn new() -> Arc<Self> {
        let mut balances = HashMap::new();
        balances.insert(admin(), Amount::from_coins(100));
        let (confirm_gate, _) = watch::channel(true);
        Arc::new(Self {
            state: Mutex::new(ChainState {
                accounts: vec![admin()],
                balances,
                records: HashMap::new(),
                pending: Vec::new(),
                campaigns: Vec::new(),
                receipts: HashMap::new(),
                next_tx: 1,
                next_block: 0,
                call_count: 0,
                submit_count: 0,
                provider_available: true,
                decline_connect: None,
                reject_next_submit: None,
                revert_next_write: false,
            }),
            notifiers: Mutex::new(Vec::new()),
            confirm_gate,
        })
    }

    pub fn config(&self) -> DeploymentConfig {
        DeploymentConfig::new("mockchain", kyc_registry(), crowdfunding())
    }

    fn lock(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().expect("chain state lock poisoned")
    }

    // Test controls

    /// Make `account` the provider's active account, funding it on first use.
    pub fn use_account(&self, account: Address) {
        let mut st = self.lock();
        st.balances.entry(account.clone()).or_insert(Amount::from_coins(100));
        st.accounts = vec![account];
    }

    pub fn fund(&self, account: &Address, amount: Amount) {
        self.lock().balances.insert(account.clone(), amount);
    }

    pub fn balance(&self, account: &Address) -> Amount {
        self.lock().balances.get(account).copied().unwrap_or(Amount::ZERO)
    }

    /// Mark an account verified directly in the registry.
    pub fn seed_verified(&self, account: &Address, name: &str, national_id: &str) {
        self.lock().records.insert(
            account.clone(),
            VerificationRecord {
                name: name.to_string(),
                national_id: national_id.to_string(),
                verified: true,
                exists: true,
                rejected: false,
            },
        );
    }

    /// Seed an open verification request.
    pub fn seed_pending(&self, account: &Address, name: &str, national_id: &str) {
        let mut st = self.lock();
        st.records.insert(
            account.clone(),
            VerificationRecord {
                name: name.to_string(),
                national_id: national_id.to_string(),
                verified: false,
                exists: true,
                rejected: false,
            },
        );
        st.pending.push(account.clone());
    }

    /// Seed a campaign record verbatim, malformed ordinals included.
    pub fn seed_campaign(&self, raw: RawCampaign) {
        self.lock().campaigns.push(raw);
    }

    pub fn record(&self, account: &Address) -> Option<VerificationRecord> {
        self.lock().records.get(account).cloned()
    }

    pub fn broadcast_accounts(&self, accounts: Vec<Address>) {
        let mut notifiers = self.notifiers.lock().expect("notifier lock poisoned");
        notifiers.retain(|n| n.notify(accounts.clone()));
    }

    pub fn notifier_count(&self) -> usize {
        self.notifiers.lock().expect("notifier lock poisoned").len()
    }

    /// Park confirmations until released. `send_replace` stores the value
    /// even while no confirmation is waiting yet.
    pub fn hold_confirmations(&self) {
        self.confirm_gate.send_replace(false);
    }

    pub fn release_confirmations(&self) {
        self.confirm_gate.send_replace(true);
    }

    pub fn make_unavailable(&self) {
        self.lock().provider_available = false;
    }

    /// Decline the next account-access request.
    pub fn decline_next_connect(&self, reason: &str) {
        self.lock().decline_connect = Some(reason.to_string());
    }

    /// Reject the next signed submission at the provider, before it reaches
    /// the chain.
    pub fn reject_next_submit(&self, reason: &str) {
        self.lock().reject_next_submit = Some(reason.to_string());
    }

    /// Force the next write to mine as a reverted transaction.
    pub fn revert_next_write(&self) {
        self.lock().revert_next_write = true;
    }

    pub fn call_count(&self) -> u64 {
        self.lock().call_count
    }

    pub fn submit_count(&self) -> u64 {
        self.lock().submit_count
    }
}

fn rpc_err(message: impl Into<String>) -> ProviderError {
    ProviderError::Rpc {
        code: -32000,
        message: message.into(),
    }
}

fn arg<T: DeserializeOwned>(request: &CallRequest, index: usize) -> Result<T, ProviderError> {
    let value = request
        .args
        .get(index)
        .cloned()
        .ok_or_else(|| rpc_err(format!("{}: missing argument {index}", request.method)))?;
    serde_json::from_value(value)
        .map_err(|e| rpc_err(format!("{}: bad argument {index}: {e}", request.method)))
}

fn dispatch_read(st: &ChainState, request: &CallRequest) -> Result<Value, ProviderError> {
    if request.to == kyc_registry() {
        match request.method.as_str() {
            "administrator" => Ok(json!(admin())),
            "isVerified" => {
                let account: Address = arg(request, 0)?;
                let verified = st.records.get(&account).map(|r| r.verified).unwrap_or(false);
                Ok(json!(verified))
            }
            "getVerificationRecord" => {
                let account: Address = arg(request, 0)?;
                let record = st.records.get(&account).cloned().unwrap_or_default();
                Ok(json!(record))
            }
            "listPendingRequests" => Ok(json!(st.pending)),
            other => Err(rpc_err(format!("unknown registry method {other}"))),
        }
    } else if request.to == crowdfunding() {
        match request.method.as_str() {
            "listAllCampaigns" => Ok(json!(st.campaigns)),
            other => Err(rpc_err(format!("unknown escrow method {other}"))),
        }
    } else {
        Err(rpc_err(format!("no contract deployed at {}", request.to)))
    }
}

/// Apply a write to the registries. `Err` means the contracts refused, which
/// mines as a reverted receipt.
fn apply_write(st: &mut ChainState, request: &CallRequest) -> Result<(), String> {
    let from = request.from.clone();
    if request.to == kyc_registry() {
        match request.method.as_str() {
            "submitVerification" => {
                let name: String = arg(request, 0).map_err(|e| e.to_string())?;
                let national_id: String = arg(request, 1).map_err(|e| e.to_string())?;
                if st.records.get(&from).map(|r| r.exists).unwrap_or(false) {
                    return Err("verification already submitted".to_string());
                }
                st.records.insert(
                    from.clone(),
                    VerificationRecord {
                        name,
                        national_id,
                        verified: false,
                        exists: true,
                        rejected: false,
                    },
                );
                st.pending.push(from);
                Ok(())
            }
            "approveVerification" | "rejectVerification" => {
                if from != admin() {
                    return Err("caller is not the administrator".to_string());
                }
                let applicant: Address = arg(request, 0).map_err(|e| e.to_string())?;
                let record = st
                    .records
                    .get_mut(&applicant)
                    .filter(|r| r.exists)
                    .ok_or_else(|| "no verification request for account".to_string())?;
                if request.method == "approveVerification" {
                    record.verified = true;
                    record.rejected = false;
                } else {
                    record.rejected = true;
                }
                st.pending.retain(|a| *a != applicant);
                Ok(())
            }
            other => Err(format!("unknown registry method {other}")),
        }
    } else if request.to == crowdfunding() {
        match request.method.as_str() {
            "createCampaign" => {
                let verified = st.records.get(&from).map(|r| r.verified).unwrap_or(false);
                if !verified && from != admin() {
                    return Err("creator is not verified".to_string());
                }
                let title: String = arg(request, 0).map_err(|e| e.to_string())?;
                let description: String = arg(request, 1).map_err(|e| e.to_string())?;
                let goal: Amount = arg(request, 2).map_err(|e| e.to_string())?;
                if goal.is_zero() {
                    return Err("goal must be greater than zero".to_string());
                }
                let id = st.campaigns.len() as u64;
                st.campaigns.push(RawCampaign {
                    id,
                    title,
                    description,
                    goal,
                    funds_raised: Amount::ZERO,
                    creator: from,
                    status: 0,
                });
                Ok(())
            }
            "contribute" => {
                let id: u64 = arg(request, 0).map_err(|e| e.to_string())?;
                let value = request.value.ok_or_else(|| "no value attached".to_string())?;
                if value.is_zero() {
                    return Err("zero contribution".to_string());
                }
                let balance = st.balances.get(&from).copied().unwrap_or(Amount::ZERO);
                let remaining = balance
                    .checked_sub(value)
                    .ok_or_else(|| "insufficient balance".to_string())?;
                let campaign = st
                    .campaigns
                    .iter_mut()
                    .find(|c| c.id == id)
                    .ok_or_else(|| "no such campaign".to_string())?;
                if campaign.status != 0 {
                    return Err("campaign is not active".to_string());
                }
                campaign.funds_raised = campaign
                    .funds_raised
                    .checked_add(value)
                    .ok_or_else(|| "raised amount overflow".to_string())?;
                if campaign.funds_raised >= campaign.goal {
                    campaign.status = 1;
                }
                st.balances.insert(from, remaining);
                Ok(())
            }
            "withdrawFunds" => {
                let id: u64 = arg(request, 0).map_err(|e| e.to_string())?;
                let campaign = st
                    .campaigns
                    .iter_mut()
                    .find(|c| c.id == id)
                    .ok_or_else(|| "no such campaign".to_string())?;
                if campaign.status != 1 {
                    return Err("campaign is not completed".to_string());
                }
                if campaign.creator != from {
                    return Err("caller is not the campaign creator".to_string());
                }
                let raised = campaign.funds_raised;
                campaign.status = 2;
                let balance = st.balances.get(&from).copied().unwrap_or(Amount::ZERO);
                st.balances
                    .insert(from, balance.checked_add(raised).unwrap_or(balance));
                Ok(())
            }
            other => Err(format!("unknown escrow method {other}")),
        }
    } else {
        Err(format!("no contract deployed at {}", request.to))
    }
}

impl WalletProvider for MockChain {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let mut st = self.lock();
        if !st.provider_available {
            return Err(ProviderError::Unavailable("no injected provider".to_string()));
        }
        if let Some(reason) = st.decline_connect.take() {
            return Err(ProviderError::UserRejected(reason));
        }
        Ok(st.accounts.clone())
    }

    async fn balance_of(&self, account: &Address) -> Result<Amount, ProviderError> {
        let st = self.lock();
        if !st.provider_available {
            return Err(ProviderError::Unavailable("no injected provider".to_string()));
        }
        Ok(st.balances.get(account).copied().unwrap_or(Amount::ZERO))
    }

    async fn call(&self, request: CallRequest) -> Result<Value, ProviderError> {
        let mut st = self.lock();
        if !st.provider_available {
            return Err(ProviderError::Unavailable("no injected provider".to_string()));
        }
        st.call_count += 1;
        dispatch_read(&st, &request)
    }

    async fn submit(&self, request: CallRequest) -> Result<TxHash, ProviderError> {
        let mut st = self.lock();
        if !st.provider_available {
            return Err(ProviderError::Unavailable("no injected provider".to_string()));
        }
        if let Some(reason) = st.reject_next_submit.take() {
            return Err(ProviderError::UserRejected(reason));
        }
        st.submit_count += 1;
        let hash = TxHash::new(format!("0x{:064x}", st.next_tx));
        st.next_tx += 1;
        let mined_ok = if std::mem::take(&mut st.revert_next_write) {
            false
        } else {
            apply_write(&mut st, &request).is_ok()
        };
        st.receipts.insert(hash.clone(), mined_ok);
        Ok(hash)
    }

    async fn await_confirmation(&self, hash: &TxHash) -> Result<TxReceipt, ProviderError> {
        let mut rx = self.confirm_gate.subscribe();
        rx.wait_for(|open| *open)
            .await
            .map_err(|_| ProviderError::Transport("confirmation gate closed".to_string()))?;
        let mut st = self.lock();
        let succeeded = *st
            .receipts
            .get(hash)
            .ok_or_else(|| rpc_err(format!("unknown transaction {hash}")))?;
        st.next_block += 1;
        Ok(TxReceipt {
            tx_hash: hash.clone(),
            block_number: st.next_block,
            succeeded,
        })
    }

    fn subscribe_accounts(&self) -> AccountSubscription {
        let (notifier, subscription) = AccountSubscription::channel();
        self.notifiers
            .lock()
            .expect("notifier lock poisoned")
            .push(notifier);
        subscription
    }
}
