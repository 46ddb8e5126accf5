//! Deployment descriptor: where the contracts live.
//!
//! The deployment step publishes a JSON descriptor with the target network
//! and the deployed registry addresses. This layer only reads it.

use std::env;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::types::Address;

/// Static contract-address descriptor consumed at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Target network identifier, e.g. `localhost` or `sepolia`.
    pub network: String,
    pub contracts: ContractAddresses,
}

/// Logical contract names mapped to deployed addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractAddresses {
    #[serde(rename = "KYCRegistry")]
    pub kyc_registry: Address,
    #[serde(rename = "Crowdfunding")]
    pub crowdfunding: Address,
}

impl DeploymentConfig {
    pub fn new(network: impl Into<String>, kyc_registry: Address, crowdfunding: Address) -> Self {
        Self {
            network: network.into(),
            contracts: ContractAddresses {
                kyc_registry,
                crowdfunding,
            },
        }
    }

    /// Load the descriptor written by the deployment step.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| {
            ClientError::Config(format!("cannot parse {}: {e}", path.display()))
        })?;
        log::info!(
            "loaded deployment descriptor for network '{}' from {}",
            config.network,
            path.display()
        );
        Ok(config)
    }

    /// Load the descriptor from environment variables.
    ///
    /// Environment variables:
    /// - `KYC_REGISTRY_ADDRESS` (required)
    /// - `CROWDFUNDING_ADDRESS` (required)
    /// - `CHAIN_NETWORK` (optional, defaults to `localhost`)
    pub fn from_env() -> Result<Self, ClientError> {
        let kyc_registry = required_address("KYC_REGISTRY_ADDRESS")?;
        let crowdfunding = required_address("CROWDFUNDING_ADDRESS")?;
        let network = env::var("CHAIN_NETWORK").unwrap_or_else(|_| "localhost".to_string());
        Ok(Self::new(network, kyc_registry, crowdfunding))
    }
}

fn required_address(var: &str) -> Result<Address, ClientError> {
    let raw = env::var(var)
        .map_err(|_| ClientError::Config(format!("{var} environment variable not set")))?;
    Address::from_str(&raw).map_err(|e| ClientError::Config(format!("{var} is invalid: {e}")))
}
