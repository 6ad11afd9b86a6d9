use anyhow::Context;

use configserver_infra::Settings;
use configserver_observability::LogFormat;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load settings")?;

    let format: LogFormat = settings.log.format.parse()?;
    configserver_observability::init(format);

    let app = configserver_api::app::build_app(&settings).await?;

    let listener = tokio::net::TcpListener::bind(&settings.http.bind)
        .await
        .with_context(|| format!("failed to bind {}", settings.http.bind))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
