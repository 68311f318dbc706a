//! MongoDB repositories for the invoicing collections.
//!
//! Each repository wraps one collection behind a narrow store trait so the
//! invoicing flow can run against an in-memory double in tests.

use crate::models::{CreateInvoice, Invoice, LineItem, Order};
use async_trait::async_trait;
use chrono::{DateTime as ChronoDateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, DateTime},
    options::IndexOptions,
    Collection, Database, IndexModel,
};
use service_core::error::AppError;
use uuid::Uuid;

/// Read/update access to stock and quota order line items.
#[async_trait]
pub trait LineItemStore: Send + Sync {
    /// All fulfillment-completed items created after `cutoff` that no
    /// invoice references yet.
    async fn find_eligible(&self, cutoff: ChronoDateTime<Utc>) -> Result<Vec<LineItem>, AppError>;

    /// Record `invoice_id` on the item. Set semantics: stamping the same
    /// invoice twice leaves a single reference.
    async fn add_invoice_ref(&self, item_id: Uuid, invoice_id: Uuid) -> Result<(), AppError>;
}

/// Read/update access to custom-requested parts.
#[async_trait]
pub trait PartStore: Send + Sync {
    /// All priced request parts created after `cutoff` that belong to an
    /// order and carry no invoice reference yet.
    async fn find_eligible_request_parts(
        &self,
        cutoff: ChronoDateTime<Utc>,
    ) -> Result<Vec<LineItem>, AppError>;

    /// Record `invoice_id` as the part's single invoice reference.
    async fn set_invoice_ref(&self, part_id: Uuid, invoice_id: Uuid) -> Result<(), AppError>;
}

/// Read access to orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find(&self, order_id: Uuid) -> Result<Option<Order>, AppError>;
}

/// Read/insert access to invoices.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Invoices already issued for the order.
    async fn find_by_order(&self, order_id: Uuid) -> Result<Vec<Invoice>, AppError>;

    /// Persist a new invoice, assigning its id.
    async fn insert(&self, input: CreateInvoice) -> Result<Invoice, AppError>;
}

#[derive(Clone)]
pub struct LineItemRepository {
    collection: Collection<LineItem>,
}

impl LineItemRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("order_line_items"),
        }
    }

    /// Index backing the eligibility query.
    pub async fn init_indexes(&self) -> Result<(), AppError> {
        let eligibility_index = IndexModel::builder()
            .keys(doc! { "fulfillment_completed_at": 1, "created_at": 1 })
            .options(
                IndexOptions::builder()
                    .name("line_item_eligibility_idx".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(eligibility_index, None).await?;
        Ok(())
    }
}

#[async_trait]
impl LineItemStore for LineItemRepository {
    async fn find_eligible(&self, cutoff: ChronoDateTime<Utc>) -> Result<Vec<LineItem>, AppError> {
        let filter = doc! {
            "created_at": { "$gt": DateTime::from_chrono(cutoff) },
            "fulfillment_completed_at": { "$exists": true },
            "invoice_ids": { "$exists": false },
        };
        let cursor = self.collection.find(filter, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn add_invoice_ref(&self, item_id: Uuid, invoice_id: Uuid) -> Result<(), AppError> {
        let filter = doc! { "_id": item_id.to_string() };
        let update = doc! { "$addToSet": { "invoice_ids": invoice_id.to_string() } };
        self.collection.update_one(filter, update, None).await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PartRepository {
    collection: Collection<LineItem>,
}

impl PartRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("parts"),
        }
    }

    pub async fn init_indexes(&self) -> Result<(), AppError> {
        let eligibility_index = IndexModel::builder()
            .keys(doc! { "class": 1, "priced_at": 1, "created_at": 1 })
            .options(
                IndexOptions::builder()
                    .name("part_eligibility_idx".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(eligibility_index, None).await?;
        Ok(())
    }
}

#[async_trait]
impl PartStore for PartRepository {
    async fn find_eligible_request_parts(
        &self,
        cutoff: ChronoDateTime<Utc>,
    ) -> Result<Vec<LineItem>, AppError> {
        let filter = doc! {
            "order_id": { "$exists": true },
            "created_at": { "$gt": DateTime::from_chrono(cutoff) },
            "class": "requestPart",
            "priced_at": { "$exists": true },
            "invoice_id": { "$exists": false },
        };
        let cursor = self.collection.find(filter, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn set_invoice_ref(&self, part_id: Uuid, invoice_id: Uuid) -> Result<(), AppError> {
        let filter = doc! { "_id": part_id.to_string() };
        let update = doc! { "$set": { "invoice_id": invoice_id.to_string() } };
        self.collection.update_one(filter, update, None).await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct OrderRepository {
    collection: Collection<Order>,
}

impl OrderRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("orders"),
        }
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn find(&self, order_id: Uuid) -> Result<Option<Order>, AppError> {
        let filter = doc! { "_id": order_id.to_string() };
        Ok(self.collection.find_one(filter, None).await?)
    }
}

#[derive(Clone)]
pub struct InvoiceRepository {
    collection: Collection<Invoice>,
}

impl InvoiceRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("invoices"),
        }
    }

    /// Index on the owning order for prior-invoice lookups.
    pub async fn init_indexes(&self) -> Result<(), AppError> {
        let order_index = IndexModel::builder()
            .keys(doc! { "order_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("invoice_order_idx".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(order_index, None).await?;
        Ok(())
    }
}

#[async_trait]
impl InvoiceStore for InvoiceRepository {
    async fn find_by_order(&self, order_id: Uuid) -> Result<Vec<Invoice>, AppError> {
        let filter = doc! { "order_id": order_id.to_string() };
        let cursor = self.collection.find(filter, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert(&self, input: CreateInvoice) -> Result<Invoice, AppError> {
        let invoice = Invoice {
            id: Uuid::new_v4(),
            order_id: input.order_id,
            part_ids: input.part_ids,
            request_part_ids: input.request_part_ids,
            total_parts_amount: input.total_parts_amount,
            total_amount: input.total_amount,
            delivery_fees: input.delivery_fees,
            wallet_payment_amount: input.wallet_payment_amount,
            discount_amount: input.discount_amount,
            created_at: DateTime::now(),
        };
        self.collection.insert_one(&invoice, None).await?;
        Ok(invoice)
    }
}
