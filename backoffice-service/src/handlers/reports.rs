//! Reporting endpoints backed by the revenue aggregator.

use axum::extract::{Query, State};
use axum::Json;
use backoffice_core::error::AppError;
use chrono::{Datelike, Utc};

use crate::dtos::{ConversionResponse, RevenueQuery, RevenueStatsQuery};
use crate::services::analytics::{
    AgingBucket, Granularity, PaymentTimeStats, RevenueBucket, RevenueStats,
};
use crate::startup::AppState;

pub async fn revenue_by_period(
    State(state): State<AppState>,
    Query(query): Query<RevenueQuery>,
) -> Result<Json<Vec<RevenueBucket>>, AppError> {
    let granularity = match query.granularity.as_deref() {
        Some(s) => s.parse()?,
        None => Granularity::Month,
    };
    let year = query.year.unwrap_or_else(|| Utc::now().year());

    let buckets = state.analytics.revenue_by_period(granularity, year).await?;
    Ok(Json(buckets))
}

pub async fn revenue_stats(
    State(state): State<AppState>,
    Query(query): Query<RevenueStatsQuery>,
) -> Result<Json<RevenueStats>, AppError> {
    let stats = state
        .analytics
        .revenue_stats(query.start_date, query.end_date)
        .await?;
    Ok(Json(stats))
}

pub async fn aging_report(
    State(state): State<AppState>,
) -> Result<Json<Vec<AgingBucket>>, AppError> {
    let buckets = state.analytics.aging().await?;
    Ok(Json(buckets))
}

pub async fn conversion_rate(
    State(state): State<AppState>,
) -> Result<Json<ConversionResponse>, AppError> {
    let conversion_rate = state.analytics.conversion_rate().await?;
    Ok(Json(ConversionResponse { conversion_rate }))
}

pub async fn payment_time(
    State(state): State<AppState>,
) -> Result<Json<Option<PaymentTimeStats>>, AppError> {
    let stats = state.analytics.average_payment_time().await?;
    Ok(Json(stats))
}
