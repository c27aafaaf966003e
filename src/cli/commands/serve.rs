//! `lexrag serve`

use anyhow::Result;

use crate::application::Application;
use crate::domain::models::Config;
use crate::infrastructure::logging::LoggerImpl;

/// Run the service until Ctrl-C.
pub async fn execute(config: Config) -> Result<()> {
    let _logger = LoggerImpl::init(&config.logging)?;

    tracing::info!(
        upload_dir = %config.storage.upload_dir.display(),
        index_path = %config.storage.index_path.display(),
        embedding = ?config.embedding.provider,
        completion = ?config.completion.provider,
        "starting lexrag"
    );

    let app = Application::build(config).await?;
    app.run(shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
