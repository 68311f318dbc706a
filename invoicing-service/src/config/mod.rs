use anyhow::Result;
use chrono::NaiveDate;
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub database: DatabaseConfig,
    pub invoicing: InvoicingConfig,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub db_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct InvoicingConfig {
    /// Line items created on or before this date are never picked up for
    /// invoicing.
    pub cutoff_date: NaiveDate,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let db_url =
            env::var("INVOICING_DATABASE_URL").expect("INVOICING_DATABASE_URL must be set");
        let db_name = env::var("INVOICING_DATABASE_NAME")
            .unwrap_or_else(|_| "fulfillment_db".to_string());

        let cutoff_date = env::var("INVOICING_CUTOFF_DATE")
            .unwrap_or_else(|_| "2021-04-01".to_string())
            .parse()?;

        Ok(Self {
            database: DatabaseConfig {
                url: Secret::new(db_url),
                db_name,
            },
            invoicing: InvoicingConfig { cutoff_date },
            service_name: "invoicing-service".to_string(),
        })
    }
}
