//! Request and response shapes for the invoice endpoints.

use backoffice_core::error::AppError;
use chrono::{DateTime as ChronoDateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    CreateInvoice, Invoice, InvoiceStatus, LineItem, ListInvoicesFilter, PaymentRecord,
    ReminderRecord, UpdateInvoice,
};

#[derive(Debug, Clone, Deserialize)]
pub struct LineItemRequest {
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
}

impl From<LineItemRequest> for LineItem {
    fn from(item: LineItemRequest) -> Self {
        LineItem {
            description: item.description,
            quantity: item.quantity,
            rate: item.rate,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateInvoiceRequest {
    pub client_id: Uuid,
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[serde(default)]
    pub line_items: Vec<LineItemRequest>,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "tax rate cannot be negative"))]
    pub tax_rate: f64,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "discount rate cannot be negative"))]
    pub discount_rate: f64,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub issue_date: Option<ChronoDateTime<Utc>>,
    pub due_date: Option<ChronoDateTime<Utc>>,
    pub proposal_id: Option<Uuid>,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
}

impl From<CreateInvoiceRequest> for CreateInvoice {
    fn from(req: CreateInvoiceRequest) -> Self {
        CreateInvoice {
            client_id: req.client_id,
            proposal_id: req.proposal_id,
            title: req.title,
            line_items: req.line_items.into_iter().map(LineItem::from).collect(),
            tax_rate: req.tax_rate,
            discount_rate: req.discount_rate,
            amount: req.amount,
            currency: req.currency.unwrap_or_else(|| "USD".to_string()),
            issue_date: req.issue_date,
            due_date: req.due_date,
            invoice_number: req.invoice_number,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateInvoiceRequest {
    pub title: Option<String>,
    pub line_items: Option<Vec<LineItemRequest>>,
    pub tax_rate: Option<f64>,
    pub discount_rate: Option<f64>,
    pub amount: Option<f64>,
    pub due_date: Option<ChronoDateTime<Utc>>,
    pub notes: Option<String>,
}

impl From<UpdateInvoiceRequest> for UpdateInvoice {
    fn from(req: UpdateInvoiceRequest) -> Self {
        UpdateInvoice {
            title: req.title,
            line_items: req
                .line_items
                .map(|items| items.into_iter().map(LineItem::from).collect()),
            tax_rate: req.tax_rate,
            discount_rate: req.discount_rate,
            amount: req.amount,
            due_date: req.due_date,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecordPaymentRequest {
    #[validate(range(min = 0.01, message = "amount must be positive"))]
    pub amount: f64,
    pub method: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MarkPaidRequest {
    pub method: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendReminderRequest {
    #[serde(default = "default_reminder_method")]
    pub method: String,
    pub notes: Option<String>,
}

fn default_reminder_method() -> String {
    "email".to_string()
}

#[derive(Debug, Default, Deserialize)]
pub struct ListInvoicesQuery {
    pub client_id: Option<Uuid>,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TryFrom<ListInvoicesQuery> for ListInvoicesFilter {
    type Error = AppError;

    fn try_from(query: ListInvoicesQuery) -> Result<Self, Self::Error> {
        let status = query
            .status
            .as_deref()
            .map(|s| s.parse::<InvoiceStatus>())
            .transpose()?;
        Ok(ListInvoicesFilter {
            client_id: query.client_id,
            status,
            start_date: query.start_date,
            end_date: query.end_date,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentEntryResponse {
    pub amount: f64,
    pub method: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub date_paid: ChronoDateTime<Utc>,
    pub date_recorded: ChronoDateTime<Utc>,
}

impl From<&PaymentRecord> for PaymentEntryResponse {
    fn from(record: &PaymentRecord) -> Self {
        PaymentEntryResponse {
            amount: record.amount,
            method: record.method.clone(),
            reference: record.reference.clone(),
            notes: record.notes.clone(),
            date_paid: record.date_paid.to_chrono(),
            date_recorded: record.date_recorded.to_chrono(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReminderEntryResponse {
    pub sent_at: ChronoDateTime<Utc>,
    pub method: String,
    pub notes: Option<String>,
}

impl From<&ReminderRecord> for ReminderEntryResponse {
    fn from(record: &ReminderRecord) -> Self {
        ReminderEntryResponse {
            sent_at: record.sent_at.to_chrono(),
            method: record.method.clone(),
            notes: record.notes.clone(),
        }
    }
}

/// Invoice as served to clients: stored fields plus the derived status,
/// overdue flag and balance due.
#[derive(Debug, Serialize)]
pub struct InvoiceResponse {
    pub id: Uuid,
    pub invoice_number: String,
    pub client_id: Uuid,
    pub proposal_id: Option<Uuid>,
    pub title: String,
    pub line_items: Vec<LineItem>,
    pub subtotal: f64,
    pub tax_rate: f64,
    pub tax_amount: f64,
    pub discount_rate: f64,
    pub discount_amount: f64,
    pub amount: f64,
    pub amount_paid: f64,
    pub balance_due: f64,
    pub currency: String,
    pub status: InvoiceStatus,
    pub is_overdue: bool,
    pub issue_date: ChronoDateTime<Utc>,
    pub due_date: ChronoDateTime<Utc>,
    pub sent_date: Option<ChronoDateTime<Utc>>,
    pub paid_date: Option<ChronoDateTime<Utc>>,
    pub payment_history: Vec<PaymentEntryResponse>,
    pub reminders_sent: Vec<ReminderEntryResponse>,
    pub last_reminder_date: Option<ChronoDateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: ChronoDateTime<Utc>,
    pub updated_at: ChronoDateTime<Utc>,
}

impl InvoiceResponse {
    pub fn from_invoice(invoice: &Invoice, now: ChronoDateTime<Utc>) -> Self {
        InvoiceResponse {
            id: invoice.id,
            invoice_number: invoice.invoice_number.clone(),
            client_id: invoice.client_id,
            proposal_id: invoice.proposal_id,
            title: invoice.title.clone(),
            line_items: invoice.line_items.clone(),
            subtotal: invoice.subtotal,
            tax_rate: invoice.tax_rate,
            tax_amount: invoice.tax_amount,
            discount_rate: invoice.discount_rate,
            discount_amount: invoice.discount_amount,
            amount: invoice.amount,
            amount_paid: invoice.amount_paid,
            balance_due: invoice.balance_due(),
            currency: invoice.currency.clone(),
            status: invoice.effective_status(now),
            is_overdue: invoice.is_overdue(now),
            issue_date: invoice.issue_date.to_chrono(),
            due_date: invoice.due_date.to_chrono(),
            sent_date: invoice.sent_date.map(|d| d.to_chrono()),
            paid_date: invoice.paid_date.map(|d| d.to_chrono()),
            payment_history: invoice
                .payment_history
                .iter()
                .map(PaymentEntryResponse::from)
                .collect(),
            reminders_sent: invoice
                .reminders_sent
                .iter()
                .map(ReminderEntryResponse::from)
                .collect(),
            last_reminder_date: invoice.last_reminder_date.map(|d| d.to_chrono()),
            notes: invoice.notes.clone(),
            created_at: invoice.created_at.to_chrono(),
            updated_at: invoice.updated_at.to_chrono(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecordPaymentResponse {
    pub settlement: String,
    pub amount_applied: f64,
    pub invoice: InvoiceResponse,
}
