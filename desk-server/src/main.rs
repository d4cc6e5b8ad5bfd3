use anyhow::Result;
use desk_server::Settings;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("desk_server=info,desk_blob=info,desk_axum=info,tower_http=info")
            }),
        )
        .init();

    let ax = desk_server::build().await?;
    let settings = Settings::from_snapshot(&ax.app.config_snapshot())?;

    ax.listen(settings.addr()).await
}
