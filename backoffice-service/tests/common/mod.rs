//! Builders shared by the integration tests.
#![allow(dead_code)]

use backoffice_service::models::{Invoice, InvoiceStatus, Proposal, ProposalStatus};
use chrono::{DateTime as ChronoDateTime, Duration, TimeZone, Utc};
use mongodb::bson::DateTime;
use uuid::Uuid;

pub fn at(year: i32, month: u32, day: u32) -> ChronoDateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

pub fn invoice(amount: f64, status: InvoiceStatus) -> Invoice {
    let now = Utc::now();
    Invoice {
        id: Uuid::new_v4(),
        invoice_number: "INV-000042".to_string(),
        client_id: Uuid::new_v4(),
        proposal_id: None,
        title: "Consulting".to_string(),
        line_items: vec![],
        subtotal: amount,
        tax_rate: 0.0,
        tax_amount: 0.0,
        discount_rate: 0.0,
        discount_amount: 0.0,
        amount,
        amount_paid: 0.0,
        currency: "USD".to_string(),
        status,
        issue_date: DateTime::from_chrono(now),
        due_date: DateTime::from_chrono(now + Duration::days(30)),
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

pub fn invoice_due(amount: f64, status: InvoiceStatus, due: ChronoDateTime<Utc>) -> Invoice {
    let mut inv = invoice(amount, status);
    inv.due_date = DateTime::from_chrono(due);
    inv
}

pub fn paid_invoice(
    amount: f64,
    issued: ChronoDateTime<Utc>,
    paid: ChronoDateTime<Utc>,
) -> Invoice {
    let mut inv = invoice(amount, InvoiceStatus::Paid);
    inv.amount_paid = amount;
    inv.issue_date = DateTime::from_chrono(issued);
    inv.paid_date = Some(DateTime::from_chrono(paid));
    inv
}

pub fn proposal(status: ProposalStatus) -> Proposal {
    let now = DateTime::now();
    Proposal {
        id: Uuid::new_v4(),
        client_id: Uuid::new_v4(),
        title: "Website redesign".to_string(),
        amount: 5000.0,
        status,
        created_at: now,
        updated_at: now,
    }
}
