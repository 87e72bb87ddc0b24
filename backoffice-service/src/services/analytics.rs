//! Revenue aggregator: read-only derivations over the invoice and proposal
//! collections for the reporting views.
//!
//! The derivations are pure functions over loaded documents so they can be
//! exercised without a database; the [`RevenueAggregator`] wires them to the
//! repository.

use backoffice_core::error::AppError;
use chrono::{DateTime as ChronoDateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::instrument;

use crate::models::{Invoice, InvoiceStatus, Proposal, ProposalStatus};
use crate::services::BackofficeRepository;

/// Time bucketing for revenue series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Day,
    Month,
    Quarter,
    Year,
}

impl FromStr for Granularity {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Granularity::Day),
            "month" => Ok(Granularity::Month),
            "quarter" => Ok(Granularity::Quarter),
            "year" => Ok(Granularity::Year),
            other => Err(AppError::BadRequest(anyhow::anyhow!(
                "Unknown granularity '{}' (expected day, month, quarter or year)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueBucket {
    pub period: String,
    pub revenue: f64,
    pub count: u64,
    pub avg_invoice: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueStats {
    pub total_revenue: f64,
    pub invoice_count: u64,
    pub total_unpaid: f64,
    pub unpaid_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgingBucket {
    pub label: String,
    pub total: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentTimeStats {
    pub average_days: f64,
    pub min_days: i64,
    pub max_days: i64,
    pub count: u64,
}

/// Paid-invoice revenue grouped by truncated paid date.
///
/// Only `paid` invoices enter the series; partial payments are real cash but
/// stay out of this view and show up in [`revenue_stats`] instead.
pub fn revenue_by_period(
    invoices: &[Invoice],
    granularity: Granularity,
    year: i32,
) -> Vec<RevenueBucket> {
    let mut buckets: BTreeMap<String, (f64, u64)> = BTreeMap::new();

    for invoice in invoices {
        if invoice.status != InvoiceStatus::Paid {
            continue;
        }
        let Some(paid_date) = invoice.paid_date else {
            continue;
        };
        let paid = paid_date.to_chrono();
        if paid.year() != year {
            continue;
        }

        let period = match granularity {
            Granularity::Day => paid.format("%Y-%m-%d").to_string(),
            Granularity::Month => paid.format("%Y-%m").to_string(),
            Granularity::Quarter => format!("{}-Q{}", year, (paid.month() - 1) / 3 + 1),
            Granularity::Year => year.to_string(),
        };

        let entry = buckets.entry(period).or_insert((0.0, 0));
        entry.0 += invoice.amount;
        entry.1 += 1;
    }

    buckets
        .into_iter()
        .map(|(period, (revenue, count))| RevenueBucket {
            period,
            revenue,
            count,
            avg_invoice: revenue / count as f64,
        })
        .collect()
}

/// Headline revenue numbers.
///
/// Recognized revenue takes `amount_paid` as primary truth and falls back to
/// `amount` for paid invoices that predate payment tracking. The unpaid half
/// sums the face amount of every invoice that is neither paid nor cancelled
/// and ignores the date range on purpose: it is a point-in-time receivable,
/// not a period figure.
pub fn revenue_stats(
    invoices: &[Invoice],
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> RevenueStats {
    let mut stats = RevenueStats {
        total_revenue: 0.0,
        invoice_count: 0,
        total_unpaid: 0.0,
        unpaid_count: 0,
    };

    for invoice in invoices {
        if invoice.status != InvoiceStatus::Cancelled {
            let recognized = if invoice.amount_paid > 0.0 {
                invoice.amount_paid
            } else if invoice.status == InvoiceStatus::Paid {
                invoice.amount
            } else {
                0.0
            };

            if recognized > 0.0 {
                let recognized_on = invoice
                    .paid_date
                    .unwrap_or(invoice.issue_date)
                    .to_chrono()
                    .date_naive();
                let after_start = start.map_or(true, |s| recognized_on >= s);
                let before_end = end.map_or(true, |e| recognized_on <= e);
                if after_start && before_end {
                    stats.total_revenue += recognized;
                    stats.invoice_count += 1;
                }
            }
        }

        if !invoice.payment_closed() {
            stats.total_unpaid += invoice.amount;
            stats.unpaid_count += 1;
        }
    }

    stats
}

/// Receivables grouped by how far past due they are.
///
/// Paid and cancelled invoices never appear. Boundaries follow the
/// reporting convention: not yet due, 0-30, 31-60, 61-90, then everything
/// beyond 90 days in the last bucket.
pub fn aging_buckets(invoices: &[Invoice], now: ChronoDateTime<Utc>) -> Vec<AgingBucket> {
    const LABELS: [&str; 5] = ["not_yet_due", "0-30", "31-60", "61-90", "90+"];
    let mut totals = [(0.0f64, 0u64); 5];

    for invoice in invoices {
        if invoice.payment_closed() {
            continue;
        }
        let days_overdue = (now - invoice.due_date.to_chrono()).num_days();
        let idx = if days_overdue < 0 {
            0
        } else if days_overdue < 30 {
            1
        } else if days_overdue < 60 {
            2
        } else if days_overdue < 90 {
            3
        } else {
            4
        };
        totals[idx].0 += invoice.amount;
        totals[idx].1 += 1;
    }

    LABELS
        .iter()
        .zip(totals)
        .map(|(label, (total, count))| AgingBucket {
            label: label.to_string(),
            total,
            count,
        })
        .collect()
}

/// Accepted share of all proposals that reached a client, as a percentage
/// with one decimal place. Drafts never entered the funnel and are excluded.
pub fn conversion_rate(proposals: &[Proposal]) -> f64 {
    let mut accepted = 0u64;
    let mut decided = 0u64;

    for proposal in proposals {
        match proposal.status {
            ProposalStatus::Accepted => {
                accepted += 1;
                decided += 1;
            }
            ProposalStatus::Sent | ProposalStatus::Viewed | ProposalStatus::Rejected => {
                decided += 1;
            }
            ProposalStatus::Draft => {}
        }
    }

    if decided == 0 {
        return 0.0;
    }
    (accepted as f64 / decided as f64 * 1000.0).round() / 10.0
}

/// Days between issue and payment over settled invoices.
pub fn average_payment_time(invoices: &[Invoice]) -> Option<PaymentTimeStats> {
    let mut total_days = 0i64;
    let mut min_days = i64::MAX;
    let mut max_days = i64::MIN;
    let mut count = 0u64;

    for invoice in invoices {
        if invoice.status != InvoiceStatus::Paid {
            continue;
        }
        let Some(paid_date) = invoice.paid_date else {
            continue;
        };
        let days = (paid_date.to_chrono() - invoice.issue_date.to_chrono()).num_days();
        total_days += days;
        min_days = min_days.min(days);
        max_days = max_days.max(days);
        count += 1;
    }

    if count == 0 {
        return None;
    }
    Some(PaymentTimeStats {
        average_days: total_days as f64 / count as f64,
        min_days,
        max_days,
        count,
    })
}

#[derive(Clone)]
pub struct RevenueAggregator {
    repository: BackofficeRepository,
}

impl RevenueAggregator {
    pub fn new(repository: BackofficeRepository) -> Self {
        Self { repository }
    }

    #[instrument(skip(self))]
    pub async fn revenue_by_period(
        &self,
        granularity: Granularity,
        year: i32,
    ) -> Result<Vec<RevenueBucket>, AppError> {
        let invoices = self
            .repository
            .find_invoices_by_statuses(&[InvoiceStatus::Paid])
            .await?;
        Ok(revenue_by_period(&invoices, granularity, year))
    }

    #[instrument(skip(self))]
    pub async fn revenue_stats(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<RevenueStats, AppError> {
        let invoices = self.repository.find_all_invoices().await?;
        Ok(revenue_stats(&invoices, start, end))
    }

    #[instrument(skip(self))]
    pub async fn aging(&self) -> Result<Vec<AgingBucket>, AppError> {
        let invoices = self
            .repository
            .find_invoices_by_statuses(&[
                InvoiceStatus::Draft,
                InvoiceStatus::Sent,
                InvoiceStatus::Viewed,
                InvoiceStatus::Partial,
            ])
            .await?;
        Ok(aging_buckets(&invoices, Utc::now()))
    }

    #[instrument(skip(self))]
    pub async fn conversion_rate(&self) -> Result<f64, AppError> {
        let proposals = self.repository.list_proposals(None).await?;
        Ok(conversion_rate(&proposals))
    }

    #[instrument(skip(self))]
    pub async fn average_payment_time(&self) -> Result<Option<PaymentTimeStats>, AppError> {
        let invoices = self
            .repository
            .find_invoices_by_statuses(&[InvoiceStatus::Paid])
            .await?;
        Ok(average_payment_time(&invoices))
    }
}
