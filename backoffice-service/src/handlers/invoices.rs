//! Invoice endpoints: CRUD, lifecycle transitions, payments and reminders.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use backoffice_core::error::AppError;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{
    CreateInvoiceRequest, InvoiceResponse, ListInvoicesQuery, MarkPaidRequest,
    RecordPaymentRequest, RecordPaymentResponse, SendReminderRequest, UpdateInvoiceRequest,
};
use crate::models::ListInvoicesFilter;
use crate::services::payments::PaymentInput;
use crate::startup::AppState;

pub async fn create_invoice(
    State(state): State<AppState>,
    Json(payload): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    payload.validate()?;

    let invoice = state.ledger.create(payload.into()).await?;

    Ok((
        StatusCode::CREATED,
        Json(InvoiceResponse::from_invoice(&invoice, Utc::now())),
    ))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<Vec<InvoiceResponse>>, AppError> {
    let filter: ListInvoicesFilter = query.try_into()?;
    let invoices = state.repository.list_invoices(&filter).await?;

    let now = Utc::now();
    let responses = invoices
        .iter()
        .map(|invoice| InvoiceResponse::from_invoice(invoice, now))
        .collect();

    Ok(Json(responses))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = state
        .repository
        .find_invoice(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

    Ok(Json(InvoiceResponse::from_invoice(&invoice, Utc::now())))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInvoiceRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = state.ledger.update(id, payload.into()).await?;

    Ok(Json(InvoiceResponse::from_invoice(&invoice, Utc::now())))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.ledger.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_sent(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = state.ledger.mark_sent(id).await?;
    Ok(Json(InvoiceResponse::from_invoice(&invoice, Utc::now())))
}

pub async fn mark_viewed(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = state.ledger.mark_viewed(id).await?;
    Ok(Json(InvoiceResponse::from_invoice(&invoice, Utc::now())))
}

pub async fn cancel_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = state.ledger.cancel(id).await?;
    Ok(Json(InvoiceResponse::from_invoice(&invoice, Utc::now())))
}

pub async fn record_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordPaymentRequest>,
) -> Result<Json<RecordPaymentResponse>, AppError> {
    payload.validate()?;

    let input = PaymentInput {
        amount: payload.amount,
        method: payload.method,
        reference: payload.reference,
        notes: payload.notes,
    };
    let amount = input.amount;
    let (invoice, settlement) = state.payments.record_payment(id, input).await?;

    Ok(Json(RecordPaymentResponse {
        settlement: settlement.as_str().to_string(),
        amount_applied: amount,
        invoice: InvoiceResponse::from_invoice(&invoice, Utc::now()),
    }))
}

pub async fn mark_paid(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MarkPaidRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let details = PaymentInput {
        amount: 0.0,
        method: payload.method,
        reference: payload.reference,
        notes: payload.notes,
    };
    let invoice = state.payments.mark_as_paid(id, details).await?;

    Ok(Json(InvoiceResponse::from_invoice(&invoice, Utc::now())))
}

pub async fn send_reminder(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SendReminderRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = state
        .ledger
        .send_reminder(id, payload.method, payload.notes)
        .await?;

    info!(invoice_id = %id, "Reminder sent");
    Ok(Json(InvoiceResponse::from_invoice(&invoice, Utc::now())))
}
