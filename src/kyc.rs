//! Identity-verification records and status derivation.
//!
//! The verification registry owns the records; this module only projects
//! them into display-ready form.

use serde::{Deserialize, Serialize};

use crate::types::Address;

/// Per-account identity-check record, as stored by the verification registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    pub name: String,
    pub national_id: String,
    pub verified: bool,
    pub exists: bool,
    pub rejected: bool,
}

/// Display status derived from a [`VerificationRecord`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VerificationStatus {
    #[default]
    NotSubmitted,
    Pending,
    Verified,
    Rejected,
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NotSubmitted => "Not Submitted",
            Self::Pending => "Pending",
            Self::Verified => "Verified",
            Self::Rejected => "Rejected",
        })
    }
}

/// Map a raw record to its display status.
///
/// Evaluation order is fixed: a record that does not exist is `NotSubmitted`
/// whatever its other flags say, and `verified` wins over `rejected` should
/// the registry ever report both.
pub fn derive_status(record: &VerificationRecord) -> VerificationStatus {
    if !record.exists {
        VerificationStatus::NotSubmitted
    } else if record.verified {
        VerificationStatus::Verified
    } else if record.rejected {
        VerificationStatus::Rejected
    } else {
        VerificationStatus::Pending
    }
}

/// An open verification request awaiting an administrator decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequest {
    pub address: Address,
    pub name: String,
    pub national_id: String,
}

/// Project a record into a [`PendingRequest`] if it is actually pending.
pub fn pending_projection(address: &Address, record: &VerificationRecord) -> Option<PendingRequest> {
    if record.exists && !record.verified && !record.rejected {
        Some(PendingRequest {
            address: address.clone(),
            name: record.name.clone(),
            national_id: record.national_id.clone(),
        })
    } else {
        None
    }
}
