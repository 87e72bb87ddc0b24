//! Payment recorder: the only code allowed to move `amount_paid` and the
//! payment-driven status transitions.

use backoffice_core::error::AppError;
use chrono::{DateTime as ChronoDateTime, Utc};
use mongodb::bson::DateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{Invoice, InvoiceStatus, PaymentRecord, PAYMENT_EPSILON};
use crate::services::{metrics, update_invoice_with_retry, BackofficeRepository};

/// How a recorded payment was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Full,
    Partial,
}

impl Settlement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Settlement::Full => "full",
            Settlement::Partial => "partial",
        }
    }
}

/// A payment to apply against an invoice.
#[derive(Debug, Clone)]
pub struct PaymentInput {
    pub amount: f64,
    pub method: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

/// Apply a payment to an invoice in memory.
///
/// Remainders inside the 0.01 epsilon are treated as zero, so an exact
/// payment settles in full regardless of floating-point representation.
/// Payments beyond the balance due (plus epsilon) are rejected rather than
/// silently clamped, and settled or cancelled invoices take no further
/// payments.
pub fn apply_payment(
    invoice: &mut Invoice,
    input: &PaymentInput,
    now: ChronoDateTime<Utc>,
) -> Result<Settlement, AppError> {
    if invoice.payment_closed() {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Invoice {} is {} and takes no further payments",
            invoice.invoice_number,
            invoice.status.as_str()
        )));
    }
    if input.amount <= 0.0 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Payment amount must be positive"
        )));
    }

    let balance_due = invoice.balance_due();
    if input.amount > balance_due + PAYMENT_EPSILON {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Payment amount {} exceeds balance due {}",
            input.amount,
            balance_due
        )));
    }

    let new_total_paid = invoice.amount_paid + input.amount;
    let remaining = invoice.amount - new_total_paid;

    let settlement = if input.amount >= balance_due || remaining.abs() < PAYMENT_EPSILON {
        invoice.status = InvoiceStatus::Paid;
        invoice.paid_date = Some(DateTime::from_chrono(now));
        // Clamp so an epsilon-sized excess never shows as overpayment.
        invoice.amount_paid = invoice.amount;
        Settlement::Full
    } else {
        invoice.status = InvoiceStatus::Partial;
        invoice.amount_paid = new_total_paid;
        Settlement::Partial
    };

    invoice.payment_history.push(PaymentRecord {
        amount: input.amount,
        method: input.method.clone(),
        reference: input.reference.clone(),
        notes: input.notes.clone(),
        date_paid: DateTime::from_chrono(now),
        date_recorded: DateTime::from_chrono(now),
    });

    Ok(settlement)
}

/// Settle an invoice in full in one step, returning the amount applied.
///
/// Routed through the same arithmetic as [`apply_payment`]: the amount
/// applied is the outstanding balance, never the invoice total, so the
/// client revenue cache cannot be double-credited for earlier partials.
pub fn settle_in_full(
    invoice: &mut Invoice,
    details: &PaymentInput,
    now: ChronoDateTime<Utc>,
) -> Result<f64, AppError> {
    if invoice.payment_closed() {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Invoice {} is {} and takes no further payments",
            invoice.invoice_number,
            invoice.status.as_str()
        )));
    }

    let applied = invoice.balance_due().max(0.0);
    invoice.status = InvoiceStatus::Paid;
    invoice.paid_date = Some(DateTime::from_chrono(now));
    invoice.amount_paid = invoice.amount;
    invoice.payment_history.push(PaymentRecord {
        amount: applied,
        method: details.method.clone(),
        reference: details.reference.clone(),
        notes: details.notes.clone(),
        date_paid: DateTime::from_chrono(now),
        date_recorded: DateTime::from_chrono(now),
    });

    Ok(applied)
}

#[derive(Clone)]
pub struct PaymentRecorder {
    repository: BackofficeRepository,
}

impl PaymentRecorder {
    pub fn new(repository: BackofficeRepository) -> Self {
        Self { repository }
    }

    /// Record a payment and credit the owning client's revenue cache with
    /// exactly the amount applied.
    ///
    /// The invoice write and the client `$inc` are separate operations; if
    /// the increment fails after the invoice persisted, the error surfaces
    /// to the caller and the cache lags until reconciled.
    #[instrument(skip(self, input), fields(invoice_id = %invoice_id, amount = input.amount))]
    pub async fn record_payment(
        &self,
        invoice_id: Uuid,
        input: PaymentInput,
    ) -> Result<(Invoice, Settlement), AppError> {
        let (invoice, settlement) =
            update_invoice_with_retry(&self.repository, invoice_id, |invoice| {
                apply_payment(invoice, &input, Utc::now())
            })
            .await?;

        self.repository
            .increment_client_revenue(invoice.client_id, input.amount)
            .await?;

        metrics::record_payment(settlement.as_str(), &invoice.currency, input.amount);

        info!(
            invoice_id = %invoice.id,
            settlement = settlement.as_str(),
            amount_paid = invoice.amount_paid,
            balance_due = invoice.balance_due(),
            "Payment recorded"
        );

        Ok((invoice, settlement))
    }

    /// Settle an invoice in one step (no partial history expected).
    #[instrument(skip(self, details), fields(invoice_id = %invoice_id))]
    pub async fn mark_as_paid(
        &self,
        invoice_id: Uuid,
        details: PaymentInput,
    ) -> Result<Invoice, AppError> {
        let (invoice, applied) =
            update_invoice_with_retry(&self.repository, invoice_id, |invoice| {
                settle_in_full(invoice, &details, Utc::now())
            })
            .await?;

        if applied > 0.0 {
            self.repository
                .increment_client_revenue(invoice.client_id, applied)
                .await?;
        }

        metrics::record_payment(Settlement::Full.as_str(), &invoice.currency, applied);

        info!(
            invoice_id = %invoice.id,
            applied = applied,
            "Invoice marked as paid"
        );

        Ok(invoice)
    }
}
