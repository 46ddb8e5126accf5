//! Crowdfund client: state synchronization and transaction orchestration for
//! a KYC-gated crowdfunding ledger.
//!
//! This crate mediates between an operator and two on-chain registries, an
//! identity-verification registry and a fund-escrow registry, reachable only
//! through a wallet provider. Remote state is authoritative; the client
//! derives a display-ready view from raw contract reads and reconciles it
//! after every confirmed write.
//!
//! # Architecture
//!
//! - **WalletSession**: connection lifecycle and the single account-change
//!   subscription
//! - **ContractGateway**: typed read/write façade over the two registries,
//!   bound to the active signing identity
//! - **Orchestrator**: serialized mutating actions, one in flight at most,
//!   with post-confirmation refresh and failure classification
//! - **Pure view logic**: verification-status derivation, campaign
//!   normalization and filtering, display formatting
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use crowdfund_client::{DeploymentConfig, JsonRpcProvider, Orchestrator};
//!
//! let config = DeploymentConfig::from_file("deployments/deployment-localhost.json")?;
//! let provider = Arc::new(JsonRpcProvider::new("http://localhost:8545"));
//! let orchestrator = Orchestrator::new(provider, config);
//!
//! orchestrator.connect().await?;
//!
//! // Drive account-change notifications from the embedder's event loop.
//! let mut events = orchestrator.take_account_events().expect("first take");
//! while let Some(accounts) = events.next().await {
//!     orchestrator.handle_accounts_changed(accounts).await;
//! }
//! ```

pub mod access;
pub mod campaign;
pub mod config;
pub mod error;
pub mod format;
pub mod gateway;
pub mod kyc;
pub mod orchestrator;
pub mod provider;
pub mod rpc;
pub mod session;
pub mod types;

pub use access::RoleFlags;
pub use campaign::{
    filter_campaigns, normalize, percent_funded, Campaign, CampaignFilter, CampaignStatus,
    RawCampaign,
};
pub use config::{ContractAddresses, DeploymentConfig};
pub use error::ClientError;
pub use gateway::ContractGateway;
pub use kyc::{derive_status, PendingRequest, VerificationRecord, VerificationStatus};
pub use orchestrator::{AppState, Orchestrator, TransactionState, TxPhase};
pub use provider::{
    AccountSubscription, AccountsNotifier, CallRequest, ProviderError, TxReceipt, WalletProvider,
};
pub use rpc::JsonRpcProvider;
pub use session::{Session, WalletSession};
pub use types::{Address, Amount, TxHash};

/// Common result type.
pub type Result<T> = std::result::Result<T, ClientError>;
