mod client;
mod invoice;
mod proposal;

pub use client::Client;
pub use invoice::{
    CreateInvoice, Invoice, InvoiceStatus, InvoiceTotals, LineItem, ListInvoicesFilter,
    PaymentRecord, ReminderRecord, UpdateInvoice, PAYMENT_EPSILON,
};
pub use proposal::{Proposal, ProposalStatus};
