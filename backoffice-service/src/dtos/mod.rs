mod clients;
mod invoices;
mod proposals;
mod reports;

pub use clients::{ClientResponse, CreateClientRequest};
pub use invoices::{
    CreateInvoiceRequest, InvoiceResponse, LineItemRequest, ListInvoicesQuery, MarkPaidRequest,
    PaymentEntryResponse, RecordPaymentRequest, RecordPaymentResponse, ReminderEntryResponse,
    SendReminderRequest, UpdateInvoiceRequest,
};
pub use proposals::{
    CreateProposalRequest, ListProposalsQuery, ProposalResponse, UpdateProposalStatusRequest,
};
pub use reports::{ConversionResponse, RevenueQuery, RevenueStatsQuery};
