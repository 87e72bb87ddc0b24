//! MongoDB repository for backoffice-service.
//!
//! All invoice writes go through either an atomic update operator or a
//! version-checked replace, so concurrent writers never silently overwrite
//! each other.

use backoffice_core::error::AppError;
use chrono::NaiveDate;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, DateTime};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument};
use mongodb::{Collection, Database, IndexModel};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Client, Invoice, InvoiceStatus, ListInvoicesFilter, Proposal, ProposalStatus, ReminderRecord,
};

/// Sequence document backing invoice-number assignment.
#[derive(Debug, Serialize, Deserialize)]
struct Counter {
    #[serde(rename = "_id")]
    id: String,
    seq: i64,
}

#[derive(Clone)]
pub struct BackofficeRepository {
    invoices: Collection<Invoice>,
    clients: Collection<Client>,
    proposals: Collection<Proposal>,
    counters: Collection<Counter>,
}

impl BackofficeRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            invoices: db.collection("invoices"),
            clients: db.collection("clients"),
            proposals: db.collection("proposals"),
            counters: db.collection("counters"),
        }
    }

    /// Initialize database indexes.
    pub async fn init_indexes(&self) -> Result<(), AppError> {
        let client_idx = IndexModel::builder()
            .keys(doc! { "client_id": 1, "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("client_status_idx".to_string())
                    .build(),
            )
            .build();

        let status_due_idx = IndexModel::builder()
            .keys(doc! { "status": 1, "due_date": 1 })
            .options(
                IndexOptions::builder()
                    .name("status_due_idx".to_string())
                    .build(),
            )
            .build();

        let paid_date_idx = IndexModel::builder()
            .keys(doc! { "status": 1, "paid_date": 1 })
            .options(
                IndexOptions::builder()
                    .name("status_paid_date_idx".to_string())
                    .build(),
            )
            .build();

        let number_idx = IndexModel::builder()
            .keys(doc! { "invoice_number": 1 })
            .options(
                IndexOptions::builder()
                    .name("invoice_number_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.invoices
            .create_indexes([client_idx, status_due_idx, paid_date_idx, number_idx], None)
            .await?;

        let proposal_status_idx = IndexModel::builder()
            .keys(doc! { "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("proposal_status_idx".to_string())
                    .build(),
            )
            .build();

        self.proposals
            .create_indexes([proposal_status_idx], None)
            .await?;

        tracing::info!("Backoffice indexes initialized");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Invoice Operations
    // -------------------------------------------------------------------------

    /// Assign the next invoice number from an atomic counter.
    pub async fn next_invoice_number(&self) -> Result<String, AppError> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let counter = self
            .counters
            .find_one_and_update(
                doc! { "_id": "invoice_number" },
                doc! { "$inc": { "seq": 1i64 } },
                options,
            )
            .await?
            .ok_or_else(|| {
                AppError::DatabaseError(anyhow::anyhow!("Invoice counter upsert returned nothing"))
            })?;

        Ok(format!("INV-{:06}", counter.seq))
    }

    pub async fn create_invoice(&self, invoice: &Invoice) -> Result<(), AppError> {
        self.invoices.insert_one(invoice, None).await?;
        Ok(())
    }

    pub async fn find_invoice(&self, id: Uuid) -> Result<Option<Invoice>, AppError> {
        let invoice = self
            .invoices
            .find_one(doc! { "_id": id.to_string() }, None)
            .await?;
        Ok(invoice)
    }

    /// Replace an invoice if its stored version still matches the one the
    /// caller loaded. Returns the saved invoice, or `None` when a concurrent
    /// writer got there first and the caller should re-read and retry.
    pub async fn replace_invoice(&self, invoice: &Invoice) -> Result<Option<Invoice>, AppError> {
        let mut updated = invoice.clone();
        updated.version = invoice.version + 1;
        updated.updated_at = DateTime::now();

        let filter = doc! {
            "_id": invoice.id.to_string(),
            "version": invoice.version,
        };
        let result = self.invoices.replace_one(filter, &updated, None).await?;

        if result.matched_count > 0 {
            Ok(Some(updated))
        } else {
            Ok(None)
        }
    }

    /// Delete a draft invoice. The status guard lives in the ledger; the
    /// filter repeats it so a concurrent transition cannot race the delete.
    pub async fn delete_draft_invoice(&self, id: Uuid) -> Result<bool, AppError> {
        let result = self
            .invoices
            .delete_one(
                doc! { "_id": id.to_string(), "status": InvoiceStatus::Draft.as_str() },
                None,
            )
            .await?;
        Ok(result.deleted_count > 0)
    }

    pub async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError> {
        let mut query = doc! {};
        if let Some(client_id) = filter.client_id {
            query.insert("client_id", client_id.to_string());
        }
        if let Some(status) = filter.status {
            query.insert("status", status.as_str());
        }
        let mut issue_range = doc! {};
        if let Some(start) = filter.start_date {
            issue_range.insert("$gte", start_of_day(start));
        }
        if let Some(end) = filter.end_date {
            issue_range.insert("$lt", start_of_day(end.succ_opt().unwrap_or(end)));
        }
        if !issue_range.is_empty() {
            query.insert("issue_date", issue_range);
        }

        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();
        let cursor = self.invoices.find(query, options).await?;
        let invoices: Vec<Invoice> = cursor.try_collect().await?;
        Ok(invoices)
    }

    pub async fn find_invoices_by_statuses(
        &self,
        statuses: &[InvoiceStatus],
    ) -> Result<Vec<Invoice>, AppError> {
        let values: Vec<Bson> = statuses.iter().map(|s| Bson::from(s.as_str())).collect();
        let cursor = self
            .invoices
            .find(doc! { "status": { "$in": values } }, None)
            .await?;
        let invoices: Vec<Invoice> = cursor.try_collect().await?;
        Ok(invoices)
    }

    pub async fn find_all_invoices(&self) -> Result<Vec<Invoice>, AppError> {
        let cursor = self.invoices.find(None, None).await?;
        let invoices: Vec<Invoice> = cursor.try_collect().await?;
        Ok(invoices)
    }

    /// Append a reminder to an invoice's trail.
    ///
    /// Uses `$push`/`$set` so the append is atomic, and bumps the version so
    /// any in-flight version-checked replace re-reads the new trail.
    pub async fn append_reminder(
        &self,
        id: Uuid,
        reminder: &ReminderRecord,
    ) -> Result<bool, AppError> {
        let reminder_bson = mongodb::bson::to_bson(reminder)
            .map_err(|e| AppError::InternalError(anyhow::Error::new(e)))?;
        let update = doc! {
            "$push": { "reminders_sent": reminder_bson },
            "$set": {
                "last_reminder_date": reminder.sent_at,
                "updated_at": DateTime::now(),
            },
            "$inc": { "version": 1i64 },
        };
        let result = self
            .invoices
            .update_one(doc! { "_id": id.to_string() }, update, None)
            .await?;
        Ok(result.matched_count > 0)
    }

    // -------------------------------------------------------------------------
    // Client Operations
    // -------------------------------------------------------------------------

    pub async fn create_client(&self, client: &Client) -> Result<(), AppError> {
        self.clients.insert_one(client, None).await?;
        Ok(())
    }

    pub async fn find_client(&self, id: Uuid) -> Result<Option<Client>, AppError> {
        let client = self
            .clients
            .find_one(doc! { "_id": id.to_string() }, None)
            .await?;
        Ok(client)
    }

    pub async fn list_clients(&self) -> Result<Vec<Client>, AppError> {
        let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
        let cursor = self.clients.find(None, options).await?;
        let clients: Vec<Client> = cursor.try_collect().await?;
        Ok(clients)
    }

    /// Atomically add an applied payment amount to the client's revenue cache.
    pub async fn increment_client_revenue(
        &self,
        client_id: Uuid,
        amount: f64,
    ) -> Result<(), AppError> {
        let result = self
            .clients
            .update_one(
                doc! { "_id": client_id.to_string() },
                doc! {
                    "$inc": { "total_revenue": amount },
                    "$set": { "updated_at": DateTime::now() },
                },
                None,
            )
            .await?;

        if result.matched_count == 0 {
            tracing::warn!(
                client_id = %client_id,
                amount = amount,
                "Revenue increment targeted a missing client"
            );
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Proposal Operations
    // -------------------------------------------------------------------------

    pub async fn create_proposal(&self, proposal: &Proposal) -> Result<(), AppError> {
        self.proposals.insert_one(proposal, None).await?;
        Ok(())
    }

    pub async fn find_proposal(&self, id: Uuid) -> Result<Option<Proposal>, AppError> {
        let proposal = self
            .proposals
            .find_one(doc! { "_id": id.to_string() }, None)
            .await?;
        Ok(proposal)
    }

    pub async fn list_proposals(
        &self,
        status: Option<ProposalStatus>,
    ) -> Result<Vec<Proposal>, AppError> {
        let filter = status.map(|s| doc! { "status": s.as_str() });
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();
        let cursor = self.proposals.find(filter, options).await?;
        let proposals: Vec<Proposal> = cursor.try_collect().await?;
        Ok(proposals)
    }

    pub async fn update_proposal_status(
        &self,
        id: Uuid,
        status: ProposalStatus,
    ) -> Result<Option<Proposal>, AppError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let proposal = self
            .proposals
            .find_one_and_update(
                doc! { "_id": id.to_string() },
                doc! { "$set": {
                    "status": status.as_str(),
                    "updated_at": DateTime::now(),
                } },
                options,
            )
            .await?;
        Ok(proposal)
    }
}

fn start_of_day(date: NaiveDate) -> DateTime {
    DateTime::from_chrono(date.and_time(chrono::NaiveTime::MIN).and_utc())
}
