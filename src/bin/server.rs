use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use saved_items_service::db::schema::create_tables;
use saved_items_service::db::storage::Storage;
use saved_items_service::events::ItemsEventEmitter;
use saved_items_service::events::sinks::{EventSink, broadcast::BroadcastSink, webhook::WebhookSink};
use saved_items_service::resolver::ParserClient;
use saved_items_service::server::config::ServerConfig;
use saved_items_service::web::create_axum_router;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "saved-items.log");
    let file_layer = fmt::layer().with_writer(file_appender).with_ansi(false).json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sea_orm=warn,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

/// Without a webhook, events go to an in-process channel whose only
/// subscriber logs them.
fn build_event_sink(
    webhook_url: Option<&str>,
) -> Result<Arc<dyn EventSink>, Box<dyn std::error::Error + Send + Sync>> {
    if let Some(url) = webhook_url {
        info!(url, "Delivering item events to webhook.");
        return Ok(Arc::new(WebhookSink::new(url)?));
    }

    let sink = BroadcastSink::new(EVENT_CHANNEL_CAPACITY);
    let mut rx = sink.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => debug!(
                    event_id = %event.event_id,
                    kind = %event.kind,
                    item_id = %event.saved_item.id,
                    user_id = event.user.user_id,
                    "Item event."
                ),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event log subscriber lagged."),
                Err(RecvError::Closed) => break,
            }
        }
    });
    Ok(Arc::new(sink))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal.");
    }
    info!("Shutdown signal received.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let config = match ServerConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load server configuration: {e}");
            return Err(e.into());
        }
    };

    init_logging(&config.log_dir);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting saved items service.");

    let storage = Storage::connect(
        &config.database_url,
        config.replica_database_url.as_deref(),
        config.db_max_connections,
    )
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to connect to the database.");
        e
    })?;

    if config.bootstrap_schema {
        create_tables(storage.write_context().conn()).await?;
        info!("Schema bootstrap complete.");
    }

    let resolver = Arc::new(ParserClient::new(config.parser_endpoint.clone())?);
    let sink = build_event_sink(config.event_webhook_url.as_deref())?;
    let emitter = ItemsEventEmitter::with_tracing_reporter(sink);

    let router = create_axum_router(storage, resolver, emitter);
    let listener = TcpListener::bind(&config.http_addr).await?;
    info!(addr = %config.http_addr, "HTTP server listening.");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}
