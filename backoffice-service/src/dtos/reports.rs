use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct RevenueQuery {
    pub granularity: Option<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RevenueStatsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct ConversionResponse {
    pub conversion_rate: f64,
}
