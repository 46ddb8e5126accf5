//! Typed façade over the two deployed registries.
//!
//! One method per remote capability, each encoding its arguments the way the
//! ledger expects them. Reads return decoded values and may be retried
//! freely. Writes sign and submit through the provider and hand back the
//! pending transaction hash without waiting for confirmation; awaiting the
//! receipt is the orchestrator's job, which keeps this layer stateless.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::campaign::RawCampaign;
use crate::config::DeploymentConfig;
use crate::error::ClientError;
use crate::kyc::VerificationRecord;
use crate::provider::{CallRequest, WalletProvider};
use crate::types::{Address, Amount, TxHash};

/// Read/write access to the verification and escrow registries, bound to one
/// signing identity.
///
/// A gateway is cheap to construct and is rebuilt from current session state
/// whenever it is needed, so a write can never be issued against a stale
/// identity after an account change.
pub struct ContractGateway<P: WalletProvider> {
    provider: Arc<P>,
    kyc_registry: Address,
    crowdfunding: Address,
    from: Address,
}

impl<P: WalletProvider> ContractGateway<P> {
    /// Bind a gateway to the deployed addresses and the active account.
    pub fn bind(provider: Arc<P>, config: &DeploymentConfig, from: Address) -> Self {
        Self {
            provider,
            kyc_registry: config.contracts.kyc_registry.clone(),
            crowdfunding: config.contracts.crowdfunding.clone(),
            from,
        }
    }

    /// The signing identity this gateway is bound to.
    pub fn bound_account(&self) -> &Address {
        &self.from
    }

    // Verification registry, reads

    pub async fn administrator(&self) -> Result<Address, ClientError> {
        self.read(&self.kyc_registry, "administrator", vec![]).await
    }

    pub async fn is_verified(&self, account: &Address) -> Result<bool, ClientError> {
        self.read(&self.kyc_registry, "isVerified", vec![json!(account)])
            .await
    }

    pub async fn verification_record(
        &self,
        account: &Address,
    ) -> Result<VerificationRecord, ClientError> {
        self.read(
            &self.kyc_registry,
            "getVerificationRecord",
            vec![json!(account)],
        )
        .await
    }

    pub async fn pending_requests(&self) -> Result<Vec<Address>, ClientError> {
        self.read(&self.kyc_registry, "listPendingRequests", vec![])
            .await
    }

    // Verification registry, writes

    pub async fn submit_verification(
        &self,
        name: &str,
        national_id: &str,
    ) -> Result<TxHash, ClientError> {
        self.write(
            &self.kyc_registry,
            "submitVerification",
            vec![json!(name), json!(national_id)],
            None,
        )
        .await
    }

    pub async fn approve_verification(&self, account: &Address) -> Result<TxHash, ClientError> {
        self.write(
            &self.kyc_registry,
            "approveVerification",
            vec![json!(account)],
            None,
        )
        .await
    }

    pub async fn reject_verification(&self, account: &Address) -> Result<TxHash, ClientError> {
        self.write(
            &self.kyc_registry,
            "rejectVerification",
            vec![json!(account)],
            None,
        )
        .await
    }

    // Escrow registry, reads

    pub async fn all_campaigns(&self) -> Result<Vec<RawCampaign>, ClientError> {
        self.read(&self.crowdfunding, "listAllCampaigns", vec![]).await
    }

    // Escrow registry, writes

    pub async fn create_campaign(
        &self,
        title: &str,
        description: &str,
        goal: Amount,
    ) -> Result<TxHash, ClientError> {
        self.write(
            &self.crowdfunding,
            "createCampaign",
            vec![json!(title), json!(description), json!(goal)],
            None,
        )
        .await
    }

    /// Payable: `amount` rides along as the transaction value.
    pub async fn contribute(&self, campaign_id: u64, amount: Amount) -> Result<TxHash, ClientError> {
        self.write(
            &self.crowdfunding,
            "contribute",
            vec![json!(campaign_id)],
            Some(amount),
        )
        .await
    }

    pub async fn withdraw_funds(&self, campaign_id: u64) -> Result<TxHash, ClientError> {
        self.write(
            &self.crowdfunding,
            "withdrawFunds",
            vec![json!(campaign_id)],
            None,
        )
        .await
    }

    // Call plumbing

    async fn read<T: DeserializeOwned>(
        &self,
        to: &Address,
        method: &str,
        args: Vec<Value>,
    ) -> Result<T, ClientError> {
        log::debug!("read {method} on {to}");
        let value = self
            .provider
            .call(self.request(to, method, args, None))
            .await
            .map_err(ClientError::from_call)?;
        serde_json::from_value(value).map_err(|e| {
            ClientError::MalformedRecord(format!("{method} returned an undecodable value: {e}"))
        })
    }

    async fn write(
        &self,
        to: &Address,
        method: &str,
        args: Vec<Value>,
        value: Option<Amount>,
    ) -> Result<TxHash, ClientError> {
        log::info!("submit {method} on {to} from {}", self.from);
        self.provider
            .submit(self.request(to, method, args, value))
            .await
            .map_err(ClientError::from_call)
    }

    fn request(
        &self,
        to: &Address,
        method: &str,
        args: Vec<Value>,
        value: Option<Amount>,
    ) -> CallRequest {
        CallRequest {
            to: to.clone(),
            from: self.from.clone(),
            method: method.to_string(),
            args,
            value,
        }
    }
}
