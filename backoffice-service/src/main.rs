use backoffice_core::observability::init_tracing;
use backoffice_service::{config::Config, Application};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("backoffice-service", "info");

    let config = Config::from_env()?;
    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    Ok(())
}
