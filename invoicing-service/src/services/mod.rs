//! Services module for invoicing-service.

pub mod invoicing;
pub mod repository;

pub use invoicing::{invoice_total_amount, BatchStatus, BatchSummary, InvoicingError, InvoicingService};
pub use repository::{
    InvoiceRepository, InvoiceStore, LineItemRepository, LineItemStore, OrderRepository,
    OrderStore, PartRepository, PartStore,
};
