//! Proposal endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use backoffice_core::error::AppError;
use mongodb::bson::DateTime;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{
    CreateProposalRequest, ListProposalsQuery, ProposalResponse, UpdateProposalStatusRequest,
};
use crate::models::{Proposal, ProposalStatus};
use crate::startup::AppState;

pub async fn create_proposal(
    State(state): State<AppState>,
    Json(payload): Json<CreateProposalRequest>,
) -> Result<(StatusCode, Json<ProposalResponse>), AppError> {
    payload.validate()?;

    state
        .repository
        .find_client(payload.client_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;

    let now = DateTime::now();
    let proposal = Proposal {
        id: Uuid::new_v4(),
        client_id: payload.client_id,
        title: payload.title,
        amount: payload.amount,
        status: ProposalStatus::Draft,
        created_at: now,
        updated_at: now,
    };
    state.repository.create_proposal(&proposal).await?;

    info!(proposal_id = %proposal.id, "Proposal created");
    Ok((StatusCode::CREATED, Json(ProposalResponse::from(proposal))))
}

pub async fn list_proposals(
    State(state): State<AppState>,
    Query(query): Query<ListProposalsQuery>,
) -> Result<Json<Vec<ProposalResponse>>, AppError> {
    let proposals = state.repository.list_proposals(query.status).await?;
    Ok(Json(
        proposals.into_iter().map(ProposalResponse::from).collect(),
    ))
}

pub async fn get_proposal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProposalResponse>, AppError> {
    let proposal = state
        .repository
        .find_proposal(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Proposal not found")))?;

    Ok(Json(ProposalResponse::from(proposal)))
}

pub async fn update_proposal_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProposalStatusRequest>,
) -> Result<Json<ProposalResponse>, AppError> {
    let proposal = state
        .repository
        .update_proposal_status(id, payload.status)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Proposal not found")))?;

    info!(proposal_id = %id, status = payload.status.as_str(), "Proposal status updated");
    Ok(Json(ProposalResponse::from(proposal)))
}
