use chrono::{DateTime as ChronoDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Proposal, ProposalStatus};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProposalRequest {
    pub client_id: Uuid,
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[validate(range(min = 0.0, message = "amount cannot be negative"))]
    pub amount: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProposalStatusRequest {
    pub status: ProposalStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListProposalsQuery {
    pub status: Option<ProposalStatus>,
}

#[derive(Debug, Serialize)]
pub struct ProposalResponse {
    pub id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub amount: f64,
    pub status: ProposalStatus,
    pub created_at: ChronoDateTime<Utc>,
    pub updated_at: ChronoDateTime<Utc>,
}

impl From<Proposal> for ProposalResponse {
    fn from(proposal: Proposal) -> Self {
        ProposalResponse {
            id: proposal.id,
            client_id: proposal.client_id,
            title: proposal.title,
            amount: proposal.amount,
            status: proposal.status,
            created_at: proposal.created_at.to_chrono(),
            updated_at: proposal.updated_at.to_chrono(),
        }
    }
}
