pub mod analytics;
pub mod ledger;
pub mod metrics;
pub mod payments;
pub mod repository;

pub use analytics::RevenueAggregator;
pub use ledger::InvoiceLedger;
pub use payments::PaymentRecorder;
pub use repository::BackofficeRepository;

use backoffice_core::error::AppError;
use uuid::Uuid;

use crate::models::Invoice;

const MAX_WRITE_ATTEMPTS: usize = 3;

/// Load-modify-replace with optimistic-concurrency retry.
///
/// The closure mutates a freshly loaded invoice; when the version-checked
/// replace loses to a concurrent writer, the invoice is re-read and the
/// closure applied again.
pub(crate) async fn update_invoice_with_retry<T>(
    repository: &BackofficeRepository,
    id: Uuid,
    mut apply: impl FnMut(&mut Invoice) -> Result<T, AppError>,
) -> Result<(Invoice, T), AppError> {
    for _ in 0..MAX_WRITE_ATTEMPTS {
        let mut invoice = repository
            .find_invoice(id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

        let out = apply(&mut invoice)?;

        if let Some(saved) = repository.replace_invoice(&invoice).await? {
            return Ok((saved, out));
        }
        tracing::debug!(invoice_id = %id, "Invoice version conflict, retrying");
    }

    Err(AppError::Conflict(anyhow::anyhow!(
        "Invoice was modified concurrently; please retry"
    )))
}
