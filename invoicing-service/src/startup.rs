//! Application wiring and batch lifecycle.

use crate::config::Config;
use crate::services::{
    BatchSummary, InvoiceRepository, InvoicingService, LineItemRepository, OrderRepository,
    PartRepository,
};
use chrono::NaiveTime;
use mongodb::{options::ClientOptions, Client};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use std::sync::Arc;

/// Application container for one invoicing worker.
pub struct Application {
    service: InvoicingService,
    db: mongodb::Database,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: Config) -> Result<Self, AppError> {
        let mut client_options = ClientOptions::parse(config.database.url.expose_secret())
            .await
            .map_err(|e| {
                tracing::error!("Failed to parse MongoDB connection string: {}", e);
                AppError::DatabaseError(e.into())
            })?;
        client_options.app_name = Some(config.service_name.clone());

        let client = Client::with_options(client_options).map_err(|e| {
            tracing::error!("Failed to create MongoDB client: {}", e);
            AppError::DatabaseError(e.into())
        })?;
        let db = client.database(&config.database.db_name);

        let line_items = LineItemRepository::new(&db);
        let parts = PartRepository::new(&db);
        let orders = OrderRepository::new(&db);
        let invoices = InvoiceRepository::new(&db);

        line_items.init_indexes().await?;
        parts.init_indexes().await?;
        invoices.init_indexes().await?;

        let cutoff = config
            .invoicing
            .cutoff_date
            .and_time(NaiveTime::MIN)
            .and_utc();

        let service = InvoicingService::new(
            Arc::new(line_items),
            Arc::new(parts),
            Arc::new(orders),
            Arc::new(invoices),
            cutoff,
        );

        Ok(Self { service, db })
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &mongodb::Database {
        &self.db
    }

    /// Execute one invoicing batch.
    pub async fn run_once(&self) -> Result<BatchSummary, AppError> {
        self.service.create_invoices().await
    }
}
