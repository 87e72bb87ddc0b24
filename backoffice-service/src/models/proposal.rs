//! Proposal model for backoffice-service.

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Proposal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Draft,
    Sent,
    Viewed,
    Accepted,
    Rejected,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Draft => "draft",
            ProposalStatus::Sent => "sent",
            ProposalStatus::Viewed => "viewed",
            ProposalStatus::Accepted => "accepted",
            ProposalStatus::Rejected => "rejected",
        }
    }
}

/// Proposal document. Feeds conversion statistics; an accepted proposal may
/// be linked from the invoice raised for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub amount: f64,
    pub status: ProposalStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
