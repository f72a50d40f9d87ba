use anyhow::Context;
use bookshelf_events::EventBus;
use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        address = %settings.server.bind_address(),
        "bookshelf-app bootstrap starting"
    );

    let events = EventBus::default();
    let mut registry = ModuleRegistry::new();
    bookshelf_app::register_all(&mut registry, &events)?;

    let ctx = InitCtx {
        settings: &settings,
        events: &events,
    };
    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    let served = bookshelf_http::start_server(&registry, &settings, shutdown_signal()).await;

    registry.stop_all().await?;
    served?;

    tracing::info!("bookshelf-app stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        return;
    }
    tracing::info!("shutdown signal received");
}
