//! Role derivation for the active account.

use futures::future::try_join;

use crate::error::ClientError;
use crate::gateway::ContractGateway;
use crate::provider::WalletProvider;

/// Role flags gating user actions. Recomputed on every session change and
/// never cached across accounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleFlags {
    pub is_admin: bool,
    pub is_verified: bool,
}

/// Derive the role flags for the gateway's bound account.
///
/// `is_admin` compares the registry's configured administrator against the
/// active account; `Address` normalizes to lowercase, so the comparison is
/// case-insensitive as ledger addresses require. `is_verified` is read
/// directly from the registry, independent of the derived verification
/// status, since an administrator may act without being verified.
pub async fn derive_roles<P: WalletProvider>(
    gateway: &ContractGateway<P>,
) -> Result<RoleFlags, ClientError> {
    let account = gateway.bound_account();
    let (administrator, is_verified) =
        try_join(gateway.administrator(), gateway.is_verified(account)).await?;
    Ok(RoleFlags {
        is_admin: administrator == *account,
        is_verified,
    })
}
