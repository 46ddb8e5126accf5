//! Escrow-campaign records: normalization, funding math, filtering.
//!
//! Campaign state is owned by the escrow registry. The client keeps a
//! read-through cache of normalized records, refreshed on load and after
//! every confirmed mutating call; nothing here is authoritative.

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::types::{Address, Amount};

/// Campaign record as the escrow registry returns it: amounts in base units,
/// lifecycle status as an integer ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCampaign {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub goal: Amount,
    pub funds_raised: Amount,
    pub creator: Address,
    pub status: u8,
}

/// Campaign lifecycle status. Transitions are monotonic and driven only by
/// the remote registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignStatus {
    Active,
    Completed,
    Withdrawn,
}

impl CampaignStatus {
    /// Fixed ordinal mapping used on the wire.
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(Self::Active),
            1 => Some(Self::Completed),
            2 => Some(Self::Withdrawn),
            _ => None,
        }
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Active => "Active",
            Self::Completed => "Completed",
            Self::Withdrawn => "Withdrawn",
        })
    }
}

/// Normalized, display-ready campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Campaign {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub goal: Amount,
    pub funds_raised: Amount,
    pub creator: Address,
    pub status: CampaignStatus,
}

/// Normalize a raw ledger record.
///
/// Fails with [`ClientError::MalformedRecord`] when the status ordinal is out
/// of range; callers drop the offending record and keep the rest of the
/// refresh.
pub fn normalize(raw: RawCampaign) -> Result<Campaign, ClientError> {
    let status = CampaignStatus::from_ordinal(raw.status).ok_or_else(|| {
        ClientError::MalformedRecord(format!(
            "campaign {} has status ordinal {} out of range",
            raw.id, raw.status
        ))
    })?;
    Ok(Campaign {
        id: raw.id,
        title: raw.title,
        description: raw.description,
        goal: raw.goal,
        funds_raised: raw.funds_raised,
        creator: raw.creator,
        status,
    })
}

/// Funding progress in percent, clamped to `[0, 100]`.
///
/// A zero goal yields 0 rather than an error; rejecting zero goals at
/// creation time is the ledger's job, not this layer's.
pub fn percent_funded(campaign: &Campaign) -> f64 {
    if campaign.goal.is_zero() {
        return 0.0;
    }
    let ratio = campaign.funds_raised.base_units() as f64 / campaign.goal.base_units() as f64;
    (ratio * 100.0).clamp(0.0, 100.0)
}

/// Campaign list selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignFilter {
    All,
    Status(CampaignStatus),
}

/// Stable-order subset of `campaigns` matching the selector.
pub fn filter_campaigns(campaigns: &[Campaign], filter: CampaignFilter) -> Vec<Campaign> {
    match filter {
        CampaignFilter::All => campaigns.to_vec(),
        CampaignFilter::Status(wanted) => campaigns
            .iter()
            .filter(|c| c.status == wanted)
            .cloned()
            .collect(),
    }
}
