use invoicing_service::{config::Config, startup::Application};
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("invoicing-service", "info");

    let config = Config::from_env().expect("Failed to load configuration");
    let application = Application::build(config).await?;
    let summary = application.run_once().await?;

    tracing::info!(
        status = ?summary.status,
        invoices = summary.invoice_ids.len(),
        "{}",
        summary.message
    );

    Ok(())
}
