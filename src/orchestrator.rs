//! Transaction orchestration and the central view state.
//!
//! Every state-mutating action follows the same path: validate locally,
//! submit through the gateway, await the ledger's confirmation, then re-run
//! the relevant read refreshes so the view reflects confirmed chain state.
//! At most one transaction is ever in flight; a second submit while the
//! machine is busy is rejected, not queued. Whatever happens on the way,
//! the machine always comes back to `Idle`, so no action can be permanently
//! blocked by a previous failure.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::try_join_all;

use crate::access::{self, RoleFlags};
use crate::campaign::{self, Campaign, CampaignFilter};
use crate::config::DeploymentConfig;
use crate::error::ClientError;
use crate::gateway::ContractGateway;
use crate::kyc::{self, PendingRequest, VerificationStatus};
use crate::provider::{AccountSubscription, WalletProvider};
use crate::session::{Session, WalletSession};
use crate::types::{Address, Amount, TxHash};

/// Where the one in-flight transaction currently stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TxPhase {
    #[default]
    Idle,
    Submitting,
    AwaitingConfirmation,
    Succeeded,
    Failed,
}

/// Transient transaction state surfaced to the view. One instance
/// process-wide; `message` survives the return to `Idle` so the outcome of
/// the last action stays visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionState {
    pub phase: TxPhase,
    pub message: String,
}

impl TransactionState {
    /// The single mutation entry point for phase changes.
    fn transition(&mut self, phase: TxPhase, message: impl Into<String>) {
        let message = message.into();
        log::debug!("tx phase {:?} -> {:?}: {message}", self.phase, phase);
        self.phase = phase;
        self.message = message;
    }

    /// Update the user-visible message without touching the phase.
    fn note(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }
}

/// The one centrally-owned view-state record.
///
/// All component-local mutable state lives here, behind one lock, with a
/// dedicated mutation method per transition. The lock is never held across
/// an await point.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub session: Session,
    pub roles: RoleFlags,
    pub kyc_status: VerificationStatus,
    pub campaigns: Vec<Campaign>,
    pub pending_requests: Vec<PendingRequest>,
    pub tx: TransactionState,
}

impl AppState {
    fn set_session(&mut self, session: Session) {
        self.session = session;
    }

    fn set_roles(&mut self, roles: RoleFlags) {
        self.roles = roles;
    }

    fn set_kyc_status(&mut self, status: VerificationStatus) {
        self.kyc_status = status;
    }

    fn set_campaigns(&mut self, campaigns: Vec<Campaign>) {
        self.campaigns = campaigns;
    }

    fn set_pending_requests(&mut self, pending: Vec<PendingRequest>) {
        self.pending_requests = pending;
    }

    fn set_balance(&mut self, balance: Amount) {
        self.session.native_balance = Some(balance);
    }

    /// Clear the session and everything derived from it. The transaction
    /// machine is left alone: a confirmation already in flight still resolves
    /// and is reflected back to `Idle` afterwards.
    fn reset_derived(&mut self) {
        self.session = Session::empty();
        self.roles = RoleFlags::default();
        self.kyc_status = VerificationStatus::default();
        self.campaigns.clear();
        self.pending_requests.clear();
    }
}

/// Which caches a confirmed action must rebuild.
#[derive(Debug, Clone, Copy, Default)]
struct Refresh {
    campaigns: bool,
    pending: bool,
    balance: bool,
    verification: bool,
}

impl Refresh {
    const CAMPAIGNS: Self = Self {
        campaigns: true,
        pending: false,
        balance: false,
        verification: false,
    };
    const CAMPAIGNS_AND_BALANCE: Self = Self {
        campaigns: true,
        pending: false,
        balance: true,
        verification: false,
    };
    const PENDING_REQUESTS: Self = Self {
        campaigns: false,
        pending: true,
        balance: false,
        verification: false,
    };
    const VERIFICATION: Self = Self {
        campaigns: false,
        pending: false,
        balance: false,
        verification: true,
    };
}

/// Serializes mutating actions against the two registries and keeps the view
/// state consistent with confirmed ledger state.
pub struct Orchestrator<P: WalletProvider> {
    session: WalletSession<P>,
    config: DeploymentConfig,
    state: Mutex<AppState>,
}

impl<P: WalletProvider> Orchestrator<P> {
    pub fn new(provider: Arc<P>, config: DeploymentConfig) -> Self {
        Self {
            session: WalletSession::new(provider),
            config,
            state: Mutex::new(AppState::default()),
        }
    }

    /// Snapshot of the current view state.
    pub fn view(&self) -> AppState {
        self.state().clone()
    }

    /// Current campaign cache narrowed by a selector.
    pub fn campaigns(&self, filter: CampaignFilter) -> Vec<Campaign> {
        campaign::filter_campaigns(&self.state().campaigns, filter)
    }

    /// Hand out the account-change subscription for the embedder's event
    /// loop. `Some` exactly once per process.
    pub fn take_account_events(&self) -> Option<AccountSubscription> {
        self.session.take_account_events()
    }

    // Connection lifecycle

    /// Establish (or re-establish) the session and populate the initial view
    /// state: roles, verification status, campaign cache, and the pending
    /// queue when the account is the administrator.
    ///
    /// Idempotent; account-change notifications re-enter here.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let connected = match self.session.connect().await {
            Ok(session) => session,
            Err(err) => {
                self.state().tx.note(format!("Error: {err}"));
                return Err(err);
            }
        };
        let account = connected
            .account
            .clone()
            .ok_or(ClientError::NotConnected)?;
        self.state().set_session(connected);

        let gateway = self.bind_gateway(account);
        let roles = match access::derive_roles(&gateway).await {
            Ok(roles) => roles,
            Err(err) => {
                self.state().tx.note(format!("Error: {err}"));
                return Err(err);
            }
        };
        self.state().set_roles(roles);

        if let Err(err) = self.refresh_verification().await {
            log::warn!("verification status refresh failed: {err}");
        }
        if let Err(err) = self.refresh_campaigns().await {
            log::warn!("campaign refresh failed: {err}");
        }
        if roles.is_admin {
            if let Err(err) = self.refresh_pending_requests().await {
                log::warn!("pending-request refresh failed: {err}");
            }
        }

        self.state().tx.note("Wallet connected");
        Ok(())
    }

    /// React to an account-change notification from the provider.
    ///
    /// A non-empty list re-runs the connect sequence against the new active
    /// account; an empty list clears the session and all derived state.
    pub async fn handle_accounts_changed(&self, accounts: Vec<Address>) {
        if accounts.is_empty() {
            log::info!("provider reports no accounts; clearing session state");
            self.state().reset_derived();
            return;
        }
        if let Err(err) = self.connect().await {
            log::error!("reconnect after account change failed: {err}");
        }
    }

    // Read-side refreshes. These absorb nothing themselves; callers decide
    // whether a failure is fatal. The post-confirmation path logs and moves
    // on, mirroring how stale-but-displayable state beats a wedged view.

    /// Rebuild the campaign cache from the escrow registry. Records with an
    /// undecodable status are dropped from the view, not fatal.
    pub async fn refresh_campaigns(&self) -> Result<(), ClientError> {
        if self.refresh_deferred() {
            return Ok(());
        }
        let gateway = self.current_gateway()?;
        let raw = gateway.all_campaigns().await?;
        let mut campaigns = Vec::with_capacity(raw.len());
        for record in raw {
            match campaign::normalize(record) {
                Ok(c) => campaigns.push(c),
                Err(err) => log::warn!("dropping campaign record: {err}"),
            }
        }
        self.state().set_campaigns(campaigns);
        Ok(())
    }

    /// Rebuild the pending-request queue. A no-op for non-administrators,
    /// who cannot see the queue at all.
    pub async fn refresh_pending_requests(&self) -> Result<(), ClientError> {
        if self.refresh_deferred() || !self.state().roles.is_admin {
            return Ok(());
        }
        let gateway = self.current_gateway()?;
        let addresses = gateway.pending_requests().await?;
        let lookups: Vec<_> = addresses
            .iter()
            .map(|address| gateway.verification_record(address))
            .collect();
        let records = try_join_all(lookups).await?;
        let pending = addresses
            .iter()
            .zip(records.iter())
            .filter_map(|(address, record)| kyc::pending_projection(address, record))
            .collect();
        self.state().set_pending_requests(pending);
        Ok(())
    }

    /// Re-read the active account's native balance.
    pub async fn refresh_balance(&self) -> Result<(), ClientError> {
        if self.refresh_deferred() {
            return Ok(());
        }
        let account = self.active_account()?;
        let balance = self.session.refresh_balance(&account).await?;
        self.state().set_balance(balance);
        Ok(())
    }

    /// Re-derive the active account's verification status and role flags.
    pub async fn refresh_verification(&self) -> Result<(), ClientError> {
        if self.refresh_deferred() {
            return Ok(());
        }
        let gateway = self.current_gateway()?;
        let record = gateway.verification_record(gateway.bound_account()).await?;
        let status = kyc::derive_status(&record);
        let mut state = self.state();
        state.set_kyc_status(status);
        let roles = RoleFlags {
            is_verified: record.verified,
            ..state.roles
        };
        state.set_roles(roles);
        Ok(())
    }

    // Mutating actions

    /// Submit the active account's verification request.
    pub async fn submit_verification(
        &self,
        name: &str,
        national_id: &str,
    ) -> Result<(), ClientError> {
        if name.trim().is_empty() || national_id.trim().is_empty() {
            return Err(self.reject_input("please provide both name and national id"));
        }
        let gateway = self.current_gateway()?;
        self.begin("Submitting verification request...")?;
        let submitted = gateway.submit_verification(name, national_id).await;
        self.settle(submitted, "Verification request submitted", Refresh::VERIFICATION)
            .await
    }

    /// Approve a pending verification request. Administrator only.
    pub async fn approve_verification(&self, applicant: &Address) -> Result<(), ClientError> {
        let gateway = self.current_gateway()?;
        self.begin("Approving verification...")?;
        let submitted = gateway.approve_verification(applicant).await;
        self.settle(submitted, "Verification approved", Refresh::PENDING_REQUESTS)
            .await
    }

    /// Reject a pending verification request. Administrator only.
    pub async fn reject_verification(&self, applicant: &Address) -> Result<(), ClientError> {
        let gateway = self.current_gateway()?;
        self.begin("Rejecting verification...")?;
        let submitted = gateway.reject_verification(applicant).await;
        self.settle(submitted, "Verification rejected", Refresh::PENDING_REQUESTS)
            .await
    }

    /// Create a new campaign. Requires a verified account (or the
    /// administrator); the registry enforces the same rule, this check just
    /// fails the cheap way.
    pub async fn create_campaign(
        &self,
        title: &str,
        description: &str,
        goal: Amount,
    ) -> Result<(), ClientError> {
        if title.trim().is_empty() || description.trim().is_empty() {
            return Err(self.reject_input("please fill in all campaign fields"));
        }
        let roles = self.state().roles;
        if !(roles.is_verified || roles.is_admin) {
            let err = ClientError::NotAuthorized(
                "only verified accounts may create campaigns".to_string(),
            );
            self.state().tx.note(format!("Error: {err}"));
            return Err(err);
        }
        let gateway = self.current_gateway()?;
        self.begin("Creating campaign...")?;
        let submitted = gateway.create_campaign(title, description, goal).await;
        self.settle(submitted, "Campaign created", Refresh::CAMPAIGNS)
            .await
    }

    /// Contribute native currency to an active campaign.
    pub async fn contribute(&self, campaign_id: u64, amount: Amount) -> Result<(), ClientError> {
        if amount.is_zero() {
            return Err(self.reject_input("contribution amount must be greater than zero"));
        }
        let gateway = self.current_gateway()?;
        self.begin("Processing contribution...")?;
        let submitted = gateway.contribute(campaign_id, amount).await;
        self.settle(submitted, "Contribution successful", Refresh::CAMPAIGNS_AND_BALANCE)
            .await
    }

    /// Withdraw the raised funds of a completed campaign. The registry
    /// enforces that only the creator of a completed campaign may withdraw.
    pub async fn withdraw_funds(&self, campaign_id: u64) -> Result<(), ClientError> {
        let gateway = self.current_gateway()?;
        self.begin("Withdrawing funds...")?;
        let submitted = gateway.withdraw_funds(campaign_id).await;
        self.settle(submitted, "Funds withdrawn", Refresh::CAMPAIGNS_AND_BALANCE)
            .await
    }

    // State machine internals

    fn state(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().expect("view state lock poisoned")
    }

    /// A refresh requested between a transaction's submission and its own
    /// post-confirmation refresh would read transiently stale state twice.
    /// Such refreshes are skipped; the transaction's refresh supersedes them.
    fn refresh_deferred(&self) -> bool {
        let phase = self.state().tx.phase;
        if matches!(phase, TxPhase::Submitting | TxPhase::AwaitingConfirmation) {
            log::debug!("refresh deferred: transaction in flight");
            return true;
        }
        false
    }

    fn active_account(&self) -> Result<Address, ClientError> {
        self.state()
            .session
            .account
            .clone()
            .ok_or(ClientError::NotConnected)
    }

    fn bind_gateway(&self, account: Address) -> ContractGateway<P> {
        ContractGateway::bind(self.session.provider().clone(), &self.config, account)
    }

    /// Gateway bound to the session's current account. Rebuilt on every use,
    /// under the same lock that guards session updates, so the signing
    /// identity can never lag behind an observed account change.
    fn current_gateway(&self) -> Result<ContractGateway<P>, ClientError> {
        Ok(self.bind_gateway(self.active_account()?))
    }

    /// Record a validation failure without entering the state machine.
    fn reject_input(&self, why: &str) -> ClientError {
        let err = ClientError::Validation(why.to_string());
        self.state().tx.note(format!("Error: {err}"));
        err
    }

    /// Claim the single in-flight slot, or refuse.
    fn begin(&self, message: &str) -> Result<(), ClientError> {
        let mut state = self.state();
        if state.tx.phase != TxPhase::Idle {
            return Err(ClientError::ConcurrentTransaction);
        }
        state.tx.transition(TxPhase::Submitting, message);
        Ok(())
    }

    /// Drive a submitted write to its terminal phase and back to `Idle`.
    ///
    /// Every exit path ends on `Idle`; a failure here can delay the next
    /// action but never block it.
    async fn settle(
        &self,
        submitted: Result<TxHash, ClientError>,
        success_message: &str,
        refresh: Refresh,
    ) -> Result<(), ClientError> {
        let outcome = match submitted {
            Ok(hash) => {
                self.state()
                    .tx
                    .transition(TxPhase::AwaitingConfirmation, "Waiting for confirmation...");
                match self
                    .session
                    .provider()
                    .await_confirmation(&hash)
                    .await
                    .map_err(ClientError::from_call)
                {
                    Ok(receipt) if receipt.succeeded => Ok(()),
                    Ok(receipt) => Err(ClientError::ContractCall(format!(
                        "transaction {} reverted on chain",
                        receipt.tx_hash
                    ))),
                    Err(err) => Err(err),
                }
            }
            Err(err) => Err(err),
        };

        match &outcome {
            Ok(()) => {
                self.state().tx.transition(TxPhase::Succeeded, success_message);
                self.run_refresh(refresh).await;
            }
            Err(err) => {
                log::error!("transaction failed: {err}");
                self.state()
                    .tx
                    .transition(TxPhase::Failed, format!("Error: {err}"));
            }
        }

        let mut state = self.state();
        let message = state.tx.message.clone();
        state.tx.transition(TxPhase::Idle, message);
        drop(state);

        outcome
    }

    /// Post-confirmation refreshes. Failures are logged and absorbed: the
    /// ledger state is already committed, and a stale cache is recoverable
    /// by any later refresh, so they must not fail the action.
    async fn run_refresh(&self, refresh: Refresh) {
        if refresh.campaigns {
            if let Err(err) = self.refresh_campaigns().await {
                log::warn!("campaign refresh failed: {err}");
            }
        }
        if refresh.pending {
            if let Err(err) = self.refresh_pending_requests().await {
                log::warn!("pending-request refresh failed: {err}");
            }
        }
        if refresh.balance {
            if let Err(err) = self.refresh_balance().await {
                log::warn!("balance refresh failed: {err}");
            }
        }
        if refresh.verification {
            if let Err(err) = self.refresh_verification().await {
                log::warn!("verification refresh failed: {err}");
            }
        }
    }
}
