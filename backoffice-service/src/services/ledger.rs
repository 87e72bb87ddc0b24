//! Invoice ledger: creation and the non-payment status transitions.

use backoffice_core::error::AppError;
use chrono::{Duration, Utc};
use mongodb::bson::DateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{
    CreateInvoice, Invoice, InvoiceStatus, InvoiceTotals, ReminderRecord, UpdateInvoice,
    PAYMENT_EPSILON,
};
use crate::services::{update_invoice_with_retry, BackofficeRepository};

#[derive(Clone)]
pub struct InvoiceLedger {
    repository: BackofficeRepository,
}

impl InvoiceLedger {
    pub fn new(repository: BackofficeRepository) -> Self {
        Self { repository }
    }

    /// Create a draft invoice.
    ///
    /// Totals are derived from line items when present; otherwise the
    /// caller-supplied flat amount is used as-is. The due date defaults to
    /// thirty days after the issue date.
    #[instrument(skip(self, input), fields(client_id = %input.client_id))]
    pub async fn create(&self, input: CreateInvoice) -> Result<Invoice, AppError> {
        if input.title.trim().is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!("Title is required")));
        }

        self.repository
            .find_client(input.client_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;

        let totals = if input.line_items.is_empty() {
            let amount = input.amount.ok_or_else(|| {
                AppError::BadRequest(anyhow::anyhow!(
                    "An amount is required when no line items are provided"
                ))
            })?;
            InvoiceTotals::flat(amount)
        } else {
            InvoiceTotals::from_line_items(&input.line_items, input.tax_rate, input.discount_rate)
        };
        validate_totals(&totals)?;

        let now = Utc::now();
        let issue_date = input.issue_date.unwrap_or(now);
        let due_date = input.due_date.unwrap_or(issue_date + Duration::days(30));

        let invoice_number = match input.invoice_number {
            Some(number) => number,
            None => self.repository.next_invoice_number().await?,
        };

        let invoice = Invoice {
            id: Uuid::new_v4(),
            invoice_number,
            client_id: input.client_id,
            proposal_id: input.proposal_id,
            title: input.title,
            line_items: input.line_items,
            subtotal: totals.subtotal,
            tax_rate: input.tax_rate,
            tax_amount: totals.tax_amount,
            discount_rate: input.discount_rate,
            discount_amount: totals.discount_amount,
            amount: totals.amount,
            amount_paid: 0.0,
            currency: input.currency,
            status: InvoiceStatus::Draft,
            issue_date: DateTime::from_chrono(issue_date),
            due_date: DateTime::from_chrono(due_date),
            sent_date: None,
            paid_date: None,
            payment_history: vec![],
            reminders_sent: vec![],
            last_reminder_date: None,
            notes: input.notes,
            version: 0,
            created_at: DateTime::from_chrono(now),
            updated_at: DateTime::from_chrono(now),
        };

        self.repository.create_invoice(&invoice).await?;

        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            amount = invoice.amount,
            "Draft invoice created"
        );

        Ok(invoice)
    }

    /// Update an invoice, re-deriving totals when the line items change.
    #[instrument(skip(self, input), fields(invoice_id = %id))]
    pub async fn update(&self, id: Uuid, input: UpdateInvoice) -> Result<Invoice, AppError> {
        let (invoice, _) = update_invoice_with_retry(&self.repository, id, |invoice| {
            if invoice.payment_closed() {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Paid or cancelled invoices cannot be edited"
                )));
            }

            if let Some(ref title) = input.title {
                if title.trim().is_empty() {
                    return Err(AppError::BadRequest(anyhow::anyhow!("Title is required")));
                }
                invoice.title = title.clone();
            }
            if let Some(tax_rate) = input.tax_rate {
                invoice.tax_rate = tax_rate;
            }
            if let Some(discount_rate) = input.discount_rate {
                invoice.discount_rate = discount_rate;
            }
            if let Some(due_date) = input.due_date {
                invoice.due_date = DateTime::from_chrono(due_date);
            }
            if let Some(ref notes) = input.notes {
                invoice.notes = Some(notes.clone());
            }

            let items_changed = input.line_items.is_some();
            if let Some(ref items) = input.line_items {
                invoice.line_items = items.clone();
            }

            // Same derivation as creation whenever the inputs to it moved.
            if items_changed || input.tax_rate.is_some() || input.discount_rate.is_some() {
                if invoice.line_items.is_empty() {
                    let amount = input.amount.unwrap_or(invoice.amount);
                    apply_totals(invoice, InvoiceTotals::flat(amount))?;
                } else {
                    let totals = InvoiceTotals::from_line_items(
                        &invoice.line_items,
                        invoice.tax_rate,
                        invoice.discount_rate,
                    );
                    apply_totals(invoice, totals)?;
                }
            } else if let Some(amount) = input.amount {
                if invoice.line_items.is_empty() {
                    apply_totals(invoice, InvoiceTotals::flat(amount))?;
                }
            }

            Ok(())
        })
        .await?;

        info!(invoice_id = %invoice.id, "Invoice updated");
        Ok(invoice)
    }

    /// Transition a draft invoice to sent.
    #[instrument(skip(self), fields(invoice_id = %id))]
    pub async fn mark_sent(&self, id: Uuid) -> Result<Invoice, AppError> {
        let (invoice, _) = update_invoice_with_retry(&self.repository, id, |invoice| {
            if invoice.status != InvoiceStatus::Draft {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Only draft invoices can be sent"
                )));
            }
            invoice.status = InvoiceStatus::Sent;
            invoice.sent_date = Some(DateTime::now());
            Ok(())
        })
        .await?;

        info!(invoice_id = %invoice.id, "Invoice sent");
        Ok(invoice)
    }

    /// Record that the client viewed the invoice. Anything other than a
    /// sent invoice is left untouched rather than treated as an error.
    #[instrument(skip(self), fields(invoice_id = %id))]
    pub async fn mark_viewed(&self, id: Uuid) -> Result<Invoice, AppError> {
        let current = self
            .repository
            .find_invoice(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

        if current.status != InvoiceStatus::Sent {
            return Ok(current);
        }

        let (invoice, _) = update_invoice_with_retry(&self.repository, id, |invoice| {
            if invoice.status == InvoiceStatus::Sent {
                invoice.status = InvoiceStatus::Viewed;
            }
            Ok(())
        })
        .await?;

        Ok(invoice)
    }

    /// Cancel any invoice that has not been paid.
    #[instrument(skip(self), fields(invoice_id = %id))]
    pub async fn cancel(&self, id: Uuid) -> Result<Invoice, AppError> {
        let (invoice, _) = update_invoice_with_retry(&self.repository, id, |invoice| {
            if invoice.payment_closed() {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Only open invoices can be cancelled"
                )));
            }
            invoice.status = InvoiceStatus::Cancelled;
            Ok(())
        })
        .await?;

        info!(invoice_id = %invoice.id, "Invoice cancelled");
        Ok(invoice)
    }

    /// Delete a draft invoice.
    #[instrument(skip(self), fields(invoice_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let invoice = self
            .repository
            .find_invoice(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

        if invoice.status != InvoiceStatus::Draft {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Only draft invoices can be deleted"
            )));
        }

        if !self.repository.delete_draft_invoice(id).await? {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Invoice is no longer a draft"
            )));
        }

        info!(invoice_id = %id, "Draft invoice deleted");
        Ok(())
    }

    /// Append a reminder to the invoice's trail. No status change and no
    /// rate limiting; the trail is append-only.
    #[instrument(skip(self, notes), fields(invoice_id = %id))]
    pub async fn send_reminder(
        &self,
        id: Uuid,
        method: String,
        notes: Option<String>,
    ) -> Result<Invoice, AppError> {
        let reminder = ReminderRecord {
            sent_at: DateTime::now(),
            method,
            notes,
        };

        if !self.repository.append_reminder(id, &reminder).await? {
            return Err(AppError::NotFound(anyhow::anyhow!("Invoice not found")));
        }

        let invoice = self
            .repository
            .find_invoice(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

        info!(invoice_id = %id, reminders = invoice.reminders_sent.len(), "Reminder recorded");
        Ok(invoice)
    }
}

fn validate_totals(totals: &InvoiceTotals) -> Result<(), AppError> {
    if totals.subtotal < 0.0 || totals.amount < 0.0 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Invoice amounts cannot be negative"
        )));
    }
    Ok(())
}

fn apply_totals(invoice: &mut Invoice, totals: InvoiceTotals) -> Result<(), AppError> {
    validate_totals(&totals)?;
    // An edit must not push the total below what has already been collected;
    // the resulting negative balance could never be settled.
    if totals.amount + PAYMENT_EPSILON < invoice.amount_paid {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Amount {} cannot drop below the {} already paid",
            totals.amount,
            invoice.amount_paid
        )));
    }
    invoice.subtotal = totals.subtotal;
    invoice.tax_amount = totals.tax_amount;
    invoice.discount_amount = totals.discount_amount;
    invoice.amount = totals.amount;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partially_paid_invoice(amount: f64, amount_paid: f64) -> Invoice {
        let now = DateTime::now();
        Invoice {
            id: Uuid::new_v4(),
            invoice_number: "INV-000007".to_string(),
            client_id: Uuid::new_v4(),
            proposal_id: None,
            title: "Retainer".to_string(),
            line_items: vec![],
            subtotal: amount,
            tax_rate: 0.0,
            tax_amount: 0.0,
            discount_rate: 0.0,
            discount_amount: 0.0,
            amount,
            amount_paid,
            currency: "USD".to_string(),
            status: InvoiceStatus::Partial,
            issue_date: now,
            due_date: now,
            sent_date: None,
            paid_date: None,
            payment_history: vec![],
            reminders_sent: vec![],
            last_reminder_date: None,
            notes: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn edit_cannot_reduce_amount_below_amount_paid() {
        let mut invoice = partially_paid_invoice(1000.0, 400.0);

        let err = apply_totals(&mut invoice, InvoiceTotals::flat(300.0)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        // The rejected edit leaves the invoice untouched.
        assert_eq!(invoice.amount, 1000.0);

        apply_totals(&mut invoice, InvoiceTotals::flat(500.0)).unwrap();
        assert_eq!(invoice.amount, 500.0);
        assert_eq!(invoice.balance_due(), 100.0);
    }

    #[test]
    fn negative_totals_are_rejected() {
        let mut invoice = partially_paid_invoice(100.0, 0.0);
        assert!(matches!(
            apply_totals(&mut invoice, InvoiceTotals::flat(-1.0)),
            Err(AppError::BadRequest(_))
        ));
    }
}
