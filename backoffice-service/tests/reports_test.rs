//! Revenue, aging and conversion derivations.

mod common;

use backoffice_service::models::{InvoiceStatus, ProposalStatus};
use backoffice_service::services::analytics::{
    aging_buckets, average_payment_time, conversion_rate, revenue_by_period, revenue_stats,
    Granularity,
};
use chrono::{Duration, NaiveDate, Utc};

use common::{at, invoice, invoice_due, paid_invoice, proposal};

#[test]
fn revenue_series_groups_paid_invoices_by_month() {
    let invoices = vec![
        paid_invoice(1000.0, at(2026, 1, 5), at(2026, 1, 20)),
        paid_invoice(500.0, at(2026, 1, 10), at(2026, 1, 25)),
        paid_invoice(2000.0, at(2026, 3, 1), at(2026, 3, 15)),
        // Wrong year, unpaid and cancelled entries stay out of the series.
        paid_invoice(9999.0, at(2025, 12, 1), at(2025, 12, 20)),
        invoice(700.0, InvoiceStatus::Sent),
        invoice(800.0, InvoiceStatus::Cancelled),
    ];

    let buckets = revenue_by_period(&invoices, Granularity::Month, 2026);

    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].period, "2026-01");
    assert_eq!(buckets[0].revenue, 1500.0);
    assert_eq!(buckets[0].count, 2);
    assert_eq!(buckets[0].avg_invoice, 750.0);
    assert_eq!(buckets[1].period, "2026-03");
    assert_eq!(buckets[1].revenue, 2000.0);
}

#[test]
fn revenue_series_supports_quarter_and_year_buckets() {
    let invoices = vec![
        paid_invoice(100.0, at(2026, 2, 1), at(2026, 2, 10)),
        paid_invoice(200.0, at(2026, 5, 1), at(2026, 5, 10)),
        paid_invoice(300.0, at(2026, 11, 1), at(2026, 11, 10)),
    ];

    let quarters = revenue_by_period(&invoices, Granularity::Quarter, 2026);
    let labels: Vec<&str> = quarters.iter().map(|b| b.period.as_str()).collect();
    assert_eq!(labels, vec!["2026-Q1", "2026-Q2", "2026-Q4"]);

    let years = revenue_by_period(&invoices, Granularity::Year, 2026);
    assert_eq!(years.len(), 1);
    assert_eq!(years[0].revenue, 600.0);
    assert_eq!(years[0].count, 3);
}

#[test]
fn granularity_parses_known_values_only() {
    assert_eq!("quarter".parse::<Granularity>().unwrap(), Granularity::Quarter);
    assert!("weekly".parse::<Granularity>().is_err());
}

#[test]
fn stats_count_partial_cash_and_open_receivables() {
    let mut partial = invoice(500.0, InvoiceStatus::Partial);
    partial.amount_paid = 200.0;

    let invoices = vec![
        paid_invoice(1000.0, at(2026, 1, 5), at(2026, 1, 20)),
        partial,
        invoice(300.0, InvoiceStatus::Sent),
        invoice(400.0, InvoiceStatus::Cancelled),
    ];

    let stats = revenue_stats(&invoices, None, None);

    // 1000 settled plus 200 of partial cash.
    assert_eq!(stats.total_revenue, 1200.0);
    assert_eq!(stats.invoice_count, 2);
    // Receivables carry the full face amount of partial and sent invoices.
    assert_eq!(stats.total_unpaid, 800.0);
    assert_eq!(stats.unpaid_count, 2);
}

#[test]
fn stats_date_range_filters_revenue_but_not_receivables() {
    let invoices = vec![
        paid_invoice(1000.0, at(2026, 1, 5), at(2026, 1, 20)),
        paid_invoice(2000.0, at(2026, 6, 5), at(2026, 6, 20)),
        invoice(300.0, InvoiceStatus::Sent),
    ];

    let start = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
    let stats = revenue_stats(&invoices, Some(start), None);

    assert_eq!(stats.total_revenue, 2000.0);
    assert_eq!(stats.invoice_count, 1);
    // The receivable is a point-in-time figure and ignores the range.
    assert_eq!(stats.total_unpaid, 300.0);
    assert_eq!(stats.unpaid_count, 1);
}

#[test]
fn aging_assigns_boundary_days_to_reporting_buckets() {
    let now = Utc::now();
    let invoices = vec![
        invoice_due(100.0, InvoiceStatus::Sent, now + Duration::days(5)),
        invoice_due(200.0, InvoiceStatus::Sent, now - Duration::days(10)),
        invoice_due(300.0, InvoiceStatus::Partial, now - Duration::days(45)),
        invoice_due(400.0, InvoiceStatus::Viewed, now - Duration::days(75)),
        invoice_due(500.0, InvoiceStatus::Sent, now - Duration::days(120)),
        invoice_due(9999.0, InvoiceStatus::Paid, now - Duration::days(120)),
    ];

    let buckets = aging_buckets(&invoices, now);

    assert_eq!(buckets.len(), 5);
    assert_eq!(buckets[0].label, "not_yet_due");
    assert_eq!(buckets[0].total, 100.0);
    assert_eq!(buckets[1].label, "0-30");
    assert_eq!(buckets[1].total, 200.0);
    assert_eq!(buckets[2].label, "31-60");
    assert_eq!(buckets[2].total, 300.0);
    assert_eq!(buckets[3].label, "61-90");
    assert_eq!(buckets[3].total, 400.0);
    assert_eq!(buckets[4].label, "90+");
    assert_eq!(buckets[4].total, 500.0);
}

#[test]
fn aging_emits_every_bucket_even_when_empty() {
    let buckets = aging_buckets(&[], Utc::now());

    assert_eq!(buckets.len(), 5);
    assert!(buckets.iter().all(|b| b.total == 0.0 && b.count == 0));
}

#[test]
fn conversion_counts_accepted_share_of_decided_proposals() {
    let proposals = vec![
        proposal(ProposalStatus::Accepted),
        proposal(ProposalStatus::Rejected),
        proposal(ProposalStatus::Sent),
        // Drafts never reached a client and stay out of the funnel.
        proposal(ProposalStatus::Draft),
    ];

    assert_eq!(conversion_rate(&proposals), 33.3);
}

#[test]
fn conversion_is_zero_without_decided_proposals() {
    assert_eq!(conversion_rate(&[]), 0.0);
    assert_eq!(conversion_rate(&[proposal(ProposalStatus::Draft)]), 0.0);
}

#[test]
fn payment_time_averages_days_between_issue_and_payment() {
    let invoices = vec![
        paid_invoice(100.0, at(2026, 1, 1), at(2026, 1, 11)),
        paid_invoice(200.0, at(2026, 2, 1), at(2026, 2, 21)),
        invoice(300.0, InvoiceStatus::Sent),
    ];

    let stats = average_payment_time(&invoices).unwrap();

    assert_eq!(stats.average_days, 15.0);
    assert_eq!(stats.min_days, 10);
    assert_eq!(stats.max_days, 20);
    assert_eq!(stats.count, 2);
}

#[test]
fn payment_time_is_absent_without_settled_invoices() {
    assert!(average_payment_time(&[invoice(100.0, InvoiceStatus::Sent)]).is_none());
}
