//! In-memory stand-ins for the MongoDB repositories, backing the
//! end-to-end invoicing tests.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use invoicing_service::models::{CreateInvoice, Invoice, LineItem, Order, PartClass};
use invoicing_service::services::{
    InvoiceStore, InvoicingService, LineItemStore, OrderStore, PartStore,
};
use mongodb::bson::DateTime as BsonDateTime;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryLineItems {
    pub items: Mutex<HashMap<Uuid, LineItem>>,
}

#[async_trait]
impl LineItemStore for InMemoryLineItems {
    async fn find_eligible(&self, cutoff: DateTime<Utc>) -> Result<Vec<LineItem>, AppError> {
        let items = self.items.lock().unwrap();
        Ok(items
            .values()
            .filter(|item| item.fulfillment_completed_at.is_some())
            .filter(|item| item.created_at.to_chrono() > cutoff)
            .filter(|item| item.invoice_ids.is_none())
            .cloned()
            .collect())
    }

    async fn add_invoice_ref(&self, item_id: Uuid, invoice_id: Uuid) -> Result<(), AppError> {
        let mut items = self.items.lock().unwrap();
        if let Some(item) = items.get_mut(&item_id) {
            let refs = item.invoice_ids.get_or_insert_with(Vec::new);
            if !refs.contains(&invoice_id) {
                refs.push(invoice_id);
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryParts {
    pub items: Mutex<HashMap<Uuid, LineItem>>,
}

#[async_trait]
impl PartStore for InMemoryParts {
    async fn find_eligible_request_parts(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<LineItem>, AppError> {
        let items = self.items.lock().unwrap();
        Ok(items
            .values()
            .filter(|item| item.class == PartClass::RequestPart)
            .filter(|item| item.priced_at.is_some())
            .filter(|item| item.created_at.to_chrono() > cutoff)
            .filter(|item| item.invoice_id.is_none())
            .cloned()
            .collect())
    }

    async fn set_invoice_ref(&self, part_id: Uuid, invoice_id: Uuid) -> Result<(), AppError> {
        let mut items = self.items.lock().unwrap();
        if let Some(item) = items.get_mut(&part_id) {
            item.invoice_id = Some(invoice_id);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryOrders {
    pub orders: Mutex<HashMap<Uuid, Order>>,
}

#[async_trait]
impl OrderStore for InMemoryOrders {
    async fn find(&self, order_id: Uuid) -> Result<Option<Order>, AppError> {
        Ok(self.orders.lock().unwrap().get(&order_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryInvoices {
    pub invoices: Mutex<Vec<Invoice>>,
}

#[async_trait]
impl InvoiceStore for InMemoryInvoices {
    async fn find_by_order(&self, order_id: Uuid) -> Result<Vec<Invoice>, AppError> {
        Ok(self
            .invoices
            .lock()
            .unwrap()
            .iter()
            .filter(|invoice| invoice.order_id == order_id)
            .cloned()
            .collect())
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
            created_at: BsonDateTime::now(),
        };
        self.invoices.lock().unwrap().push(invoice.clone());
        Ok(invoice)
    }
}

/// The four stores wired into one service, mirroring the production setup.
pub struct TestStore {
    pub line_items: Arc<InMemoryLineItems>,
    pub parts: Arc<InMemoryParts>,
    pub orders: Arc<InMemoryOrders>,
    pub invoices: Arc<InMemoryInvoices>,
}

impl TestStore {
    pub fn new() -> Self {
        Self {
            line_items: Arc::new(InMemoryLineItems::default()),
            parts: Arc::new(InMemoryParts::default()),
            orders: Arc::new(InMemoryOrders::default()),
            invoices: Arc::new(InMemoryInvoices::default()),
        }
    }

    pub fn service(&self) -> InvoicingService {
        let cutoff = Utc.with_ymd_and_hms(2021, 4, 1, 0, 0, 0).unwrap();
        InvoicingService::new(
            self.line_items.clone(),
            self.parts.clone(),
            self.orders.clone(),
            self.invoices.clone(),
            cutoff,
        )
    }

    pub fn add_order(&self, order: Order) -> Uuid {
        let id = order.id;
        self.orders.orders.lock().unwrap().insert(id, order);
        id
    }

    pub fn add_stock_item(&self, item: LineItem) -> Uuid {
        let id = item.id;
        self.line_items.items.lock().unwrap().insert(id, item);
        id
    }

    pub fn add_request_part(&self, item: LineItem) -> Uuid {
        let id = item.id;
        self.parts.items.lock().unwrap().insert(id, item);
        id
    }
}

pub fn order(delivery_fees: f64, wallet_payment_amount: f64, discount_amount: f64) -> Order {
    Order {
        id: Uuid::new_v4(),
        part_ids: Vec::new(),
        request_part_ids: Vec::new(),
        discount_amount,
        delivery_fees,
        wallet_payment_amount,
    }
}

pub fn stock_item(order_id: Uuid, price: f64) -> LineItem {
    LineItem {
        id: Uuid::new_v4(),
        order_id,
        class: PartClass::StockPart,
        price_before_discount: Some(price),
        premium_price_before_discount: None,
        created_at: BsonDateTime::now(),
        fulfillment_completed_at: Some(BsonDateTime::now()),
        priced_at: None,
        invoice_ids: None,
        invoice_id: None,
    }
}

pub fn request_part(order_id: Uuid, premium_price: f64) -> LineItem {
    LineItem {
        id: Uuid::new_v4(),
        order_id,
        class: PartClass::RequestPart,
        price_before_discount: None,
        premium_price_before_discount: Some(premium_price),
        created_at: BsonDateTime::now(),
        fulfillment_completed_at: None,
        priced_at: Some(BsonDateTime::now()),
        invoice_ids: None,
        invoice_id: None,
    }
}

pub fn unknown_class_item(order_id: Uuid, price: f64) -> LineItem {
    LineItem {
        class: PartClass::Unknown,
        ..stock_item(order_id, price)
    }
}
