//! Fulfilled order line items and the pure aggregation over them.

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Sourcing class of a line item, as stored on the documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartClass {
    StockPart,
    QuotaPart,
    #[serde(rename = "requestPart")]
    RequestPart,
    /// Classes this service does not bill. Kept as a catch-all so foreign
    /// records deserialize instead of failing the whole batch.
    #[serde(other)]
    Unknown,
}

/// One billable unit of an order.
///
/// Stock/quota items and custom-requested items live in different
/// collections but share this shape once selected: stock/quota items carry
/// `price_before_discount` and a set of invoice references, requested items
/// carry `premium_price_before_discount` and a single reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub order_id: Uuid,
    pub class: PartClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_before_discount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium_price_before_discount: Option<f64>,
    pub created_at: DateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfillment_completed_at: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priced_at: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_ids: Option<Vec<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<Uuid>,
}

/// Eligible line items of one order group, split by billing class.
#[derive(Debug, Default)]
pub struct ClassifiedParts {
    pub stock_and_quota: Vec<LineItem>,
    pub requested: Vec<LineItem>,
}

/// Partition items by class.
///
/// Items with an unrecognized class belong to neither partition: they are
/// dropped and logged, and stay eligible for a later run.
pub fn classify(items: Vec<LineItem>) -> ClassifiedParts {
    let mut split = ClassifiedParts::default();
    for item in items {
        match item.class {
            PartClass::StockPart | PartClass::QuotaPart => split.stock_and_quota.push(item),
            PartClass::RequestPart => split.requested.push(item),
            PartClass::Unknown => {
                tracing::warn!(item_id = %item.id, "dropping line item with unrecognized part class");
            }
        }
    }
    split
}

/// Sum of `price_before_discount` over stock/quota items.
pub fn stock_and_quota_total(items: &[LineItem]) -> f64 {
    items.iter().filter_map(|item| item.price_before_discount).sum()
}

/// Sum of `premium_price_before_discount` over requested items.
pub fn requested_total(items: &[LineItem]) -> f64 {
    items
        .iter()
        .filter_map(|item| item.premium_price_before_discount)
        .sum()
}

/// Total billable amount for one group of eligible items, rounded to cents.
pub fn parts_total_amount(classified: &ClassifiedParts) -> f64 {
    round_to_cents(
        stock_and_quota_total(&classified.stock_and_quota) + requested_total(&classified.requested),
    )
}

/// Round to two decimals, half away from zero on the scaled value.
pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// The `_id` of every item, in input order.
pub fn extract_ids(items: &[LineItem]) -> Vec<Uuid> {
    items.iter().map(|item| item.id).collect()
}

/// Group eligible items by their owning order.
///
/// Every item lands in exactly one group; group iteration order is
/// unspecified.
pub fn group_by_order(items: Vec<LineItem>) -> HashMap<Uuid, Vec<LineItem>> {
    let mut groups: HashMap<Uuid, Vec<LineItem>> = HashMap::new();
    for item in items {
        groups.entry(item.order_id).or_default().push(item);
    }
    groups
}
