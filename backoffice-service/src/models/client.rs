//! Client model for backoffice-service.

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Client document.
///
/// `total_revenue` is a denormalized cache of payments applied against the
/// client's invoices. It is only ever updated through an atomic `$inc` from
/// the payment recorder; the source of truth remains the invoices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub company: Option<String>,
    pub total_revenue: f64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}
