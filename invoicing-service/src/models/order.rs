use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The parent entity line items and invoices belong to. Owned by the
/// order-management subsystem; this service only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(default)]
    pub part_ids: Vec<Uuid>,
    #[serde(default)]
    pub request_part_ids: Vec<Uuid>,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub delivery_fees: f64,
    #[serde(default)]
    pub wallet_payment_amount: f64,
}
