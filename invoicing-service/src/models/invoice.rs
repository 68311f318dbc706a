use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable financial record summarizing one batch of line items on one
/// order. An order accumulates one invoice per fulfillment batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub order_id: Uuid,
    pub part_ids: Vec<Uuid>,
    pub request_part_ids: Vec<Uuid>,
    pub total_parts_amount: f64,
    pub total_amount: f64,
    pub delivery_fees: f64,
    pub wallet_payment_amount: f64,
    pub discount_amount: f64,
    pub created_at: DateTime,
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub order_id: Uuid,
    pub part_ids: Vec<Uuid>,
    pub request_part_ids: Vec<Uuid>,
    pub total_parts_amount: f64,
    pub total_amount: f64,
    pub delivery_fees: f64,
    pub wallet_payment_amount: f64,
    pub discount_amount: f64,
}
