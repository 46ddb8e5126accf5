//! Error taxonomy for wallet, gateway and orchestrator operations.
//!
//! Every failure in this crate is classified into one of the variants below
//! before it reaches the view layer. Nothing here is fatal to the process:
//! the orchestrator always returns its state machine to `Idle`, and the user
//! may retry any action from there.

use thiserror::Error;

use crate::provider::ProviderError;

/// Core error type for the crowdfunding client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// No wallet provider is reachable. Fatal to the connection attempt;
    /// the user needs a working provider before anything else can happen.
    #[error("no wallet provider is available: {0}")]
    ProviderUnavailable(String),

    /// The provider answered but refused to grant account access.
    #[error("wallet connection rejected: {0}")]
    ConnectionRejected(String),

    /// An action was invoked without an active session.
    #[error("not connected to a wallet")]
    NotConnected,

    /// Local input validation failed. Raised before any ledger contact.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The active account lacks the role an action requires.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// A remote call reverted, or the provider rejected the call outright.
    /// Carries the remote-provided reason when one is available.
    #[error("contract call failed: {0}")]
    ContractCall(String),

    /// A mutating action was requested while another is still in flight.
    #[error("another transaction is already in flight")]
    ConcurrentTransaction,

    /// The ledger returned a record this layer cannot decode, e.g. an
    /// out-of-range status ordinal. The affected record is dropped from the
    /// view instead of failing the whole refresh.
    #[error("malformed ledger record: {0}")]
    MalformedRecord(String),

    /// The deployment descriptor is missing or unreadable at startup.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Classify a provider failure raised while establishing the session.
    ///
    /// During connection the distinction that matters is "is there a usable
    /// provider at all" versus "the provider declined us".
    pub(crate) fn from_connect(err: ProviderError) -> Self {
        match err {
            ProviderError::Unavailable(msg)
            | ProviderError::Transport(msg)
            | ProviderError::Decode(msg) => Self::ProviderUnavailable(msg),
            ProviderError::UserRejected(msg) => Self::ConnectionRejected(msg),
            ProviderError::Rpc { message, .. } => Self::ConnectionRejected(message),
        }
    }

    /// Classify a provider failure raised by a contract read or write.
    ///
    /// A user declining the signing prompt and a remote revert both surface
    /// as a failed call here; only a vanished provider keeps its own class.
    pub(crate) fn from_call(err: ProviderError) -> Self {
        match err {
            ProviderError::Unavailable(msg) => Self::ProviderUnavailable(msg),
            other => Self::ContractCall(other.to_string()),
        }
    }
}
