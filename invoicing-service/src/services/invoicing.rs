//! Batch creation of invoices from fulfilled, uninvoiced line items.
//!
//! One run selects every eligible line item, groups them by owning order,
//! and turns each group into one invoice. Groups are processed concurrently
//! and fail independently; there is no rollback of work already applied.
//! Runs are expected to be externally serialized — two concurrent batches
//! over the same data can double-invoice.

use crate::models::{self, CreateInvoice, Invoice, LineItem, Order};
use crate::services::repository::{InvoiceStore, LineItemStore, OrderStore, PartStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Domain failures scoped to a single order group.
#[derive(Debug, Error)]
pub enum InvoicingError {
    #[error("invoice total for order {order_id} is negative: {total_amount}")]
    NegativeTotal { order_id: Uuid, total_amount: f64 },

    #[error("order {order_id} not found")]
    OrderNotFound { order_id: Uuid },

    #[error("line item {item_id} belongs to order {item_order_id}, not {order_id}")]
    MixedGroup {
        item_id: Uuid,
        item_order_id: Uuid,
        order_id: Uuid,
    },
}

impl From<InvoicingError> for AppError {
    fn from(err: InvoicingError) -> Self {
        match err {
            e @ InvoicingError::OrderNotFound { .. } => AppError::NotFound(anyhow::Error::new(e)),
            e => AppError::Validation(anyhow::Error::new(e)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Completed,
    CompletedWithFailures,
}

/// Outcome of one invoicing batch.
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub status: BatchStatus,
    pub message: String,
    pub invoice_ids: Vec<Uuid>,
}

/// Total owed on the next invoice for `order`, given the invoices already
/// issued for it.
///
/// Delivery fees replace the parts total on the first invoice rather than
/// adding to it, and the wallet/discount adjustments consider only the most
/// recent prior invoice. With no prior invoices neither adjustment applies.
pub fn invoice_total_amount(
    order: &Order,
    prior_invoices: &[Invoice],
    parts_total_amount: f64,
) -> f64 {
    let mut total = parts_total_amount;

    if order.delivery_fees != 0.0 && prior_invoices.is_empty() {
        total = order.delivery_fees;
    }

    if order.wallet_payment_amount != 0.0 {
        if let Some(prior) = prior_invoices.last() {
            let adjustment = (order.wallet_payment_amount - prior.wallet_payment_amount).min(0.0);
            total -= adjustment.min(total);
        }
    }

    if order.discount_amount != 0.0 {
        if let Some(prior) = prior_invoices.last() {
            let adjustment = order.discount_amount.min(prior.discount_amount);
            total -= adjustment.min(total);
        }
    }

    total
}

/// Orchestrates selection, aggregation, and persistence of new invoices.
pub struct InvoicingService {
    line_items: Arc<dyn LineItemStore>,
    parts: Arc<dyn PartStore>,
    orders: Arc<dyn OrderStore>,
    invoices: Arc<dyn InvoiceStore>,
    cutoff: DateTime<Utc>,
}

impl InvoicingService {
    pub fn new(
        line_items: Arc<dyn LineItemStore>,
        parts: Arc<dyn PartStore>,
        orders: Arc<dyn OrderStore>,
        invoices: Arc<dyn InvoiceStore>,
        cutoff: DateTime<Utc>,
    ) -> Self {
        Self {
            line_items,
            parts,
            orders,
            invoices,
            cutoff,
        }
    }

    /// Run one invoicing batch.
    ///
    /// A selector failure fails the whole run. Once groups are dispatched,
    /// each failure is logged and counted without touching its siblings.
    pub async fn create_invoices(&self) -> Result<BatchSummary, AppError> {
        let eligible = self.eligible_line_items().await?;
        if eligible.is_empty() {
            return Ok(BatchSummary {
                status: BatchStatus::Completed,
                message: "No uninvoiced line items found".to_string(),
                invoice_ids: Vec::new(),
            });
        }

        let groups = models::group_by_order(eligible);
        let group_count = groups.len();
        tracing::info!(groups = group_count, "dispatching invoice creation");

        let results = futures::future::join_all(groups.into_iter().map(
            |(order_id, items)| async move {
                (order_id, self.process_group(order_id, items).await)
            },
        ))
        .await;

        let mut invoice_ids = Vec::new();
        let mut failed = 0usize;
        for (order_id, result) in results {
            match result {
                Ok(invoice_id) => invoice_ids.push(invoice_id),
                Err(err) => {
                    failed += 1;
                    tracing::error!(order_id = %order_id, error = %err, "failed to invoice order group");
                }
            }
        }

        let (status, message) = if failed == 0 {
            (
                BatchStatus::Completed,
                "Invoices have been created successfully".to_string(),
            )
        } else {
            (
                BatchStatus::CompletedWithFailures,
                format!("{failed} of {group_count} order groups failed"),
            )
        };

        Ok(BatchSummary {
            status,
            message,
            invoice_ids,
        })
    }

    /// Both item kinds are fetched concurrently and merged into one working
    /// set.
    async fn eligible_line_items(&self) -> Result<Vec<LineItem>, AppError> {
        let (mut items, request_parts) = tokio::try_join!(
            self.line_items.find_eligible(self.cutoff),
            self.parts.find_eligible_request_parts(self.cutoff),
        )?;
        items.extend(request_parts);
        Ok(items)
    }

    /// Turn one order group into one invoice and stamp its source records.
    async fn process_group(&self, order_id: Uuid, items: Vec<LineItem>) -> Result<Uuid, AppError> {
        if let Some(stray) = items.iter().find(|item| item.order_id != order_id) {
            return Err(InvoicingError::MixedGroup {
                item_id: stray.id,
                item_order_id: stray.order_id,
                order_id,
            }
            .into());
        }

        let (order, prior_invoices) = tokio::try_join!(
            self.orders.find(order_id),
            self.invoices.find_by_order(order_id),
        )?;
        let order = order.ok_or(InvoicingError::OrderNotFound { order_id })?;

        let classified = models::classify(items);
        let total_parts_amount = models::parts_total_amount(&classified);
        let total_amount = invoice_total_amount(&order, &prior_invoices, total_parts_amount);
        if total_amount < 0.0 {
            return Err(InvoicingError::NegativeTotal {
                order_id,
                total_amount,
            }
            .into());
        }

        let part_ids = models::extract_ids(&classified.stock_and_quota);
        let request_part_ids = models::extract_ids(&classified.requested);

        let invoice = self
            .invoices
            .insert(CreateInvoice {
                order_id,
                part_ids: part_ids.clone(),
                request_part_ids: request_part_ids.clone(),
                total_parts_amount,
                total_amount,
                delivery_fees: order.delivery_fees,
                wallet_payment_amount: order.wallet_payment_amount,
                discount_amount: order.discount_amount,
            })
            .await?;

        // Stamp the source records: stock/quota items accumulate invoice
        // ids, requested parts carry exactly one.
        let stamp_stock_and_quota = futures::future::try_join_all(
            part_ids
                .iter()
                .map(|item_id| self.line_items.add_invoice_ref(*item_id, invoice.id)),
        );
        let stamp_requested = futures::future::try_join_all(
            request_part_ids
                .iter()
                .map(|part_id| self.parts.set_invoice_ref(*part_id, invoice.id)),
        );
        tokio::try_join!(stamp_stock_and_quota, stamp_requested)?;

        tracing::info!(
            order_id = %order_id,
            invoice_id = %invoice.id,
            total_amount,
            "invoice created"
        );
        Ok(invoice.id)
    }
}
