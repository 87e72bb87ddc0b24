//! Invoice model for backoffice-service.

use backoffice_core::error::AppError;
use chrono::{DateTime as ChronoDateTime, NaiveDate, Utc};
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tolerance, in currency units, below which a floating-point remainder is
/// treated as zero when classifying settlements.
pub const PAYMENT_EPSILON: f64 = 0.01;

/// Invoice lifecycle status.
///
/// `Overdue` is derived on read from `due_date` and is never persisted; the
/// stored status stays whatever the lifecycle last set it to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Viewed,
    Partial,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Viewed => "viewed",
            InvoiceStatus::Partial => "partial",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

}

impl std::str::FromStr for InvoiceStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(InvoiceStatus::Draft),
            "sent" => Ok(InvoiceStatus::Sent),
            "viewed" => Ok(InvoiceStatus::Viewed),
            "partial" => Ok(InvoiceStatus::Partial),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            other => Err(AppError::BadRequest(anyhow::anyhow!(
                "Unknown invoice status '{}'",
                other
            ))),
        }
    }
}

/// A billable line on an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
}

impl LineItem {
    pub fn amount(&self) -> f64 {
        self.quantity * self.rate
    }
}

/// One entry in the append-only payment audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub amount: f64,
    pub method: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub date_paid: DateTime,
    pub date_recorded: DateTime,
}

/// One entry in the append-only reminder trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderRecord {
    pub sent_at: DateTime,
    pub method: String,
    pub notes: Option<String>,
}

/// Invoice document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(rename = "_id")]
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
    pub currency: String,
    pub status: InvoiceStatus,
    pub issue_date: DateTime,
    pub due_date: DateTime,
    pub sent_date: Option<DateTime>,
    pub paid_date: Option<DateTime>,
    pub payment_history: Vec<PaymentRecord>,
    pub reminders_sent: Vec<ReminderRecord>,
    pub last_reminder_date: Option<DateTime>,
    pub notes: Option<String>,
    /// Optimistic-concurrency token; bumped on every write.
    pub version: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Invoice {
    pub fn balance_due(&self) -> f64 {
        self.amount - self.amount_paid
    }

    /// Whether the lifecycle accepts further payments.
    pub fn payment_closed(&self) -> bool {
        matches!(self.status, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }

    pub fn is_overdue(&self, now: ChronoDateTime<Utc>) -> bool {
        !self.payment_closed() && now > self.due_date.to_chrono()
    }

    /// Stored status, with `Overdue` substituted when the due date has passed.
    pub fn effective_status(&self, now: ChronoDateTime<Utc>) -> InvoiceStatus {
        if self.is_overdue(now) {
            InvoiceStatus::Overdue
        } else {
            self.status
        }
    }
}

/// Derived monetary totals for an invoice.
///
/// Tax and discount rates are applied as percentages of the line-item
/// subtotal; the final amount is `subtotal + tax − discount`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvoiceTotals {
    pub subtotal: f64,
    pub tax_amount: f64,
    pub discount_amount: f64,
    pub amount: f64,
}

impl InvoiceTotals {
    pub fn from_line_items(items: &[LineItem], tax_rate: f64, discount_rate: f64) -> Self {
        let subtotal: f64 = items.iter().map(LineItem::amount).sum();
        let tax_amount = subtotal * tax_rate / 100.0;
        let discount_amount = subtotal * discount_rate / 100.0;
        Self {
            subtotal,
            tax_amount,
            discount_amount,
            amount: subtotal + tax_amount - discount_amount,
        }
    }

    /// Caller-supplied flat amount, used when an invoice carries no line items.
    pub fn flat(amount: f64) -> Self {
        Self {
            subtotal: amount,
            tax_amount: 0.0,
            discount_amount: 0.0,
            amount,
        }
    }
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub client_id: Uuid,
    pub proposal_id: Option<Uuid>,
    pub title: String,
    pub line_items: Vec<LineItem>,
    pub tax_rate: f64,
    pub discount_rate: f64,
    /// Flat total, used only when `line_items` is empty.
    pub amount: Option<f64>,
    pub currency: String,
    pub issue_date: Option<ChronoDateTime<Utc>>,
    pub due_date: Option<ChronoDateTime<Utc>>,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
}

/// Input for updating an invoice.
#[derive(Debug, Clone, Default)]
pub struct UpdateInvoice {
    pub title: Option<String>,
    pub line_items: Option<Vec<LineItem>>,
    pub tax_rate: Option<f64>,
    pub discount_rate: Option<f64>,
    pub amount: Option<f64>,
    pub due_date: Option<ChronoDateTime<Utc>>,
    pub notes: Option<String>,
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct ListInvoicesFilter {
    pub client_id: Option<Uuid>,
    pub status: Option<InvoiceStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base_invoice(status: InvoiceStatus, due_in_days: i64) -> Invoice {
        let now = Utc::now();
        Invoice {
            id: Uuid::new_v4(),
            invoice_number: "INV-000001".to_string(),
            client_id: Uuid::new_v4(),
            proposal_id: None,
            title: "Test".to_string(),
            line_items: vec![],
            subtotal: 100.0,
            tax_rate: 0.0,
            tax_amount: 0.0,
            discount_rate: 0.0,
            discount_amount: 0.0,
            amount: 100.0,
            amount_paid: 0.0,
            currency: "USD".to_string(),
            status,
            issue_date: DateTime::from_chrono(now),
            due_date: DateTime::from_chrono(now + Duration::days(due_in_days)),
            sent_date: None,
            paid_date: None,
            payment_history: vec![],
            reminders_sent: vec![],
            last_reminder_date: None,
            notes: None,
            version: 0,
            created_at: DateTime::from_chrono(now),
            updated_at: DateTime::from_chrono(now),
        }
    }

    #[test]
    fn balance_due_is_amount_minus_paid() {
        let mut invoice = base_invoice(InvoiceStatus::Sent, 10);
        invoice.amount_paid = 40.0;
        assert_eq!(invoice.balance_due(), 60.0);
    }

    #[test]
    fn past_due_sent_invoice_reads_as_overdue() {
        let invoice = base_invoice(InvoiceStatus::Sent, -1);
        let now = Utc::now();
        assert!(invoice.is_overdue(now));
        assert_eq!(invoice.effective_status(now), InvoiceStatus::Overdue);
    }

    #[test]
    fn paid_and_cancelled_invoices_are_never_overdue() {
        let now = Utc::now();
        assert!(!base_invoice(InvoiceStatus::Paid, -30).is_overdue(now));
        assert!(!base_invoice(InvoiceStatus::Cancelled, -30).is_overdue(now));
    }

    #[test]
    fn status_parses_known_values_and_rejects_the_rest() {
        assert_eq!(
            "partial".parse::<InvoiceStatus>().unwrap(),
            InvoiceStatus::Partial
        );
        assert!(matches!(
            "bogus".parse::<InvoiceStatus>(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn totals_apply_tax_and_discount_as_percentages() {
        let items = vec![
            LineItem {
                description: "design".to_string(),
                quantity: 2.0,
                rate: 50.0,
            },
            LineItem {
                description: "hosting".to_string(),
                quantity: 1.0,
                rate: 25.0,
            },
        ];
        let totals = InvoiceTotals::from_line_items(&items, 10.0, 5.0);
        assert_eq!(totals.subtotal, 125.0);
        assert_eq!(totals.tax_amount, 12.5);
        assert_eq!(totals.discount_amount, 6.25);
        assert_eq!(totals.amount, 131.25);
    }
}
