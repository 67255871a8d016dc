//! Helpdesk bot entry point.
//!
//! Loads configuration, compiles the menu document, wires one dispatcher
//! per served line and serves the inbound webhook until shutdown. A
//! background task hot-reloads the menu document; another sweeps expired
//! session records.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use helpdesk_bot::adapters::exec::TokioCommandRunner;
use helpdesk_bot::adapters::gateway::RestMessageGateway;
use helpdesk_bot::adapters::http::{webhook_routes, WebhookState};
use helpdesk_bot::adapters::qna::RestKnowledgeBase;
use helpdesk_bot::adapters::storage::InMemorySessionStore;
use helpdesk_bot::adapters::ticketing::RestTicketingSystem;
use helpdesk_bot::application::{BotRegistry, Dispatcher, DispatcherSettings};
use helpdesk_bot::config::AppConfig;
use helpdesk_bot::domain::menu::MenuRegistry;
use helpdesk_bot::ports::MessageGateway;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();
    info!("application starting");

    let menus = Arc::new(MenuRegistry::load(&config.bot.menu_path)?);
    let store = Arc::new(InMemorySessionStore::new(config.bot.session_ttl()));
    let runner = Arc::new(TokioCommandRunner::new());
    let settings = DispatcherSettings::new(&config.bot, &config.ticketing);

    // One gateway client and dispatcher per served line.
    let mut registry = BotRegistry::new();
    let mut gateways: Vec<Arc<RestMessageGateway>> = Vec::new();
    for line in config.gateway.line_ids()? {
        let gateway = Arc::new(RestMessageGateway::new(&config.gateway, line)?);
        let qna = Arc::new(RestKnowledgeBase::new(&config.gateway, line)?);
        let ticketing = Arc::new(RestTicketingSystem::new(&config.ticketing, line)?);

        let dispatcher = Dispatcher::new(
            line,
            menus.clone(),
            store.clone(),
            gateway.clone(),
            qna,
            ticketing,
            runner.clone(),
            settings.clone(),
        );
        registry.insert(line, Arc::new(dispatcher));
        gateways.push(gateway);
        info!(%line, "dispatcher ready");
    }

    register_hooks(&config, &gateways).await;
    spawn_reload_poller(&config, menus.clone());
    spawn_session_sweeper(store.clone());

    let app = webhook_routes(WebhookState {
        bots: Arc::new(registry),
    })
    .layer(
        tower::ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            ))),
    );

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "application started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    remove_hooks(&gateways).await;
    info!("application stopped");
    Ok(())
}

/// Register the inbound webhook on every served line.
async fn register_hooks(config: &AppConfig, gateways: &[Arc<RestMessageGateway>]) {
    let Some(public_url) = config.server.public_url.as_deref() else {
        warn!("no public_url configured, skipping webhook registration");
        return;
    };
    let callback = format!("{}/push/receive/", public_url.trim_end_matches('/'));

    for gateway in gateways {
        match gateway.register_hook(&callback).await {
            Ok(()) => info!(line = %gateway.line_id(), "webhook registered"),
            Err(err) => error!(line = %gateway.line_id(), error = %err, "webhook registration failed"),
        }
    }
}

/// Remove the webhooks on shutdown, best effort.
async fn remove_hooks(gateways: &[Arc<RestMessageGateway>]) {
    for gateway in gateways {
        if let Err(err) = gateway.remove_hook().await {
            warn!(line = %gateway.line_id(), error = %err, "webhook removal failed");
        }
    }
}

/// Poll the menu document's modification time and hot-reload on change.
/// A rejected document keeps the active graph.
fn spawn_reload_poller(config: &AppConfig, menus: Arc<MenuRegistry>) {
    let path = config.bot.menu_path.clone();
    let period = config.bot.reload_poll();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        let mut last_seen: Option<SystemTime> = modified_at(&path).await;
        loop {
            interval.tick().await;
            let Some(modified) = modified_at(&path).await else {
                continue;
            };
            if last_seen != Some(modified) {
                last_seen = Some(modified);
                if menus.reload().await.is_err() {
                    warn!("menu document rejected, still serving the previous graph");
                }
            }
        }
    });
}

async fn modified_at(path: &std::path::Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}

/// Periodically drop expired session records.
fn spawn_session_sweeper(store: Arc<InMemorySessionStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let dropped = store.purge_expired().await;
            if dropped > 0 {
                info!(dropped, "expired sessions removed");
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install interrupt handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => error!(error = %err, "failed to install terminate handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
