//! Client endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use backoffice_core::error::AppError;
use mongodb::bson::DateTime;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{ClientResponse, CreateClientRequest};
use crate::models::Client;
use crate::startup::AppState;

pub async fn create_client(
    State(state): State<AppState>,
    Json(payload): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<ClientResponse>), AppError> {
    payload.validate()?;

    let now = DateTime::now();
    let client = Client {
        id: Uuid::new_v4(),
        name: payload.name,
        email: payload.email,
        company: payload.company,
        total_revenue: 0.0,
        created_at: now,
        updated_at: now,
    };
    state.repository.create_client(&client).await?;

    info!(client_id = %client.id, "Client created");
    Ok((StatusCode::CREATED, Json(ClientResponse::from(client))))
}

pub async fn list_clients(
    State(state): State<AppState>,
) -> Result<Json<Vec<ClientResponse>>, AppError> {
    let clients = state.repository.list_clients().await?;
    Ok(Json(clients.into_iter().map(ClientResponse::from).collect()))
}

pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClientResponse>, AppError> {
    let client = state
        .repository
        .find_client(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;

    Ok(Json(ClientResponse::from(client)))
}
