//! Payment application and settlement classification.

mod common;

use backoffice_core::error::AppError;
use backoffice_service::models::{InvoiceStatus, PAYMENT_EPSILON};
use backoffice_service::services::payments::{
    apply_payment, settle_in_full, PaymentInput, Settlement,
};
use chrono::{Duration, Utc};

use common::{invoice, invoice_due};

fn payment(amount: f64) -> PaymentInput {
    PaymentInput {
        amount,
        method: Some("bank_transfer".to_string()),
        reference: None,
        notes: None,
    }
}

#[test]
fn partial_then_final_payment_settles_invoice() {
    let mut inv = invoice(1000.0, InvoiceStatus::Sent);
    let now = Utc::now();

    let first = apply_payment(&mut inv, &payment(600.0), now).unwrap();
    assert_eq!(first, Settlement::Partial);
    assert_eq!(inv.status, InvoiceStatus::Partial);
    assert_eq!(inv.amount_paid, 600.0);
    assert!(inv.paid_date.is_none());

    let second = apply_payment(&mut inv, &payment(400.0), now).unwrap();
    assert_eq!(second, Settlement::Full);
    assert_eq!(inv.status, InvoiceStatus::Paid);
    assert_eq!(inv.amount_paid, inv.amount);
    assert!(inv.paid_date.is_some());
    assert_eq!(inv.balance_due(), 0.0);
    assert_eq!(inv.payment_history.len(), 2);
}

#[test]
fn remainder_inside_epsilon_settles_in_full() {
    let mut inv = invoice(1000.0, InvoiceStatus::Sent);

    let settlement = apply_payment(&mut inv, &payment(999.995), Utc::now()).unwrap();

    assert_eq!(settlement, Settlement::Full);
    assert_eq!(inv.status, InvoiceStatus::Paid);
    // The epsilon-sized remainder is forgiven, not carried.
    assert_eq!(inv.amount_paid, inv.amount);
    assert_eq!(inv.balance_due(), 0.0);
}

#[test]
fn excess_inside_epsilon_never_records_overpayment() {
    let mut inv = invoice(1000.0, InvoiceStatus::Sent);

    apply_payment(&mut inv, &payment(1000.0 + PAYMENT_EPSILON / 2.0), Utc::now()).unwrap();

    assert_eq!(inv.amount_paid, inv.amount);
    assert_eq!(inv.balance_due(), 0.0);
}

#[test]
fn overpayment_beyond_epsilon_is_rejected() {
    let mut inv = invoice(1000.0, InvoiceStatus::Sent);

    let err = apply_payment(&mut inv, &payment(1100.0), Utc::now()).unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(inv.amount_paid, 0.0);
    assert!(inv.payment_history.is_empty());
}

#[test]
fn non_positive_amounts_are_rejected() {
    let mut inv = invoice(1000.0, InvoiceStatus::Sent);

    assert!(matches!(
        apply_payment(&mut inv, &payment(0.0), Utc::now()),
        Err(AppError::BadRequest(_))
    ));
    assert!(matches!(
        apply_payment(&mut inv, &payment(-50.0), Utc::now()),
        Err(AppError::BadRequest(_))
    ));
}

#[test]
fn settled_and_cancelled_invoices_take_no_payments() {
    let now = Utc::now();

    let mut paid = invoice(1000.0, InvoiceStatus::Paid);
    assert!(matches!(
        apply_payment(&mut paid, &payment(100.0), now),
        Err(AppError::Conflict(_))
    ));

    let mut cancelled = invoice(1000.0, InvoiceStatus::Cancelled);
    assert!(matches!(
        apply_payment(&mut cancelled, &payment(100.0), now),
        Err(AppError::Conflict(_))
    ));
}

#[test]
fn full_payment_clears_overdue_reading() {
    let now = Utc::now();
    let mut inv = invoice_due(500.0, InvoiceStatus::Sent, now - Duration::days(10));
    assert_eq!(inv.effective_status(now), InvoiceStatus::Overdue);

    apply_payment(&mut inv, &payment(500.0), now).unwrap();

    assert_eq!(inv.effective_status(now), InvoiceStatus::Paid);
    assert!(!inv.is_overdue(now));
}

#[test]
fn settle_in_full_applies_only_outstanding_balance() {
    let mut inv = invoice(1000.0, InvoiceStatus::Partial);
    inv.amount_paid = 400.0;

    let applied = settle_in_full(&mut inv, &payment(0.0), Utc::now()).unwrap();

    assert_eq!(applied, 600.0);
    assert_eq!(inv.status, InvoiceStatus::Paid);
    assert_eq!(inv.amount_paid, inv.amount);
    assert_eq!(inv.payment_history.len(), 1);
    assert_eq!(inv.payment_history[0].amount, 600.0);
}

#[test]
fn settle_in_full_rejects_closed_invoices() {
    let mut inv = invoice(1000.0, InvoiceStatus::Cancelled);
    assert!(matches!(
        settle_in_full(&mut inv, &payment(0.0), Utc::now()),
        Err(AppError::Conflict(_))
    ));
}
