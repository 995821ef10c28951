use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wordserweb::session::{cleanup_task::start_session_sweeper, generators::SystemClock};
use wordserweb::{
    build_router, AllowList, AppState, InMemorySessionStore, InMemoryUserStore, KeyMaterial,
    SessionConfig, SessionService,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wordserweb=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting wordserweb");

    let config = match SessionConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid session configuration");
            std::process::exit(1);
        }
    };

    // Missing or unreadable keys are fatal, never retried
    let keys = match KeyMaterial::load(&config.pub_key_path, &config.priv_key_path) {
        Ok(keys) => keys,
        Err(e) => {
            error!(error = %e, "Cannot start without signing keys");
            std::process::exit(1);
        }
    };

    warn!("Sessions are held in process memory and will not survive a restart");
    let session_store = Arc::new(InMemorySessionStore::new());
    // Account storage lives in an external database in production
    let user_store = Arc::new(InMemoryUserStore::new());

    let session_service = SessionService::with_defaults(
        keys,
        session_store.clone(),
        user_store.clone(),
        &config,
    );

    let sweep_interval = config
        .sweep_interval
        .to_std()
        .unwrap_or(std::time::Duration::from_secs(900));
    tokio::spawn(start_session_sweeper(
        session_store,
        Arc::new(SystemClock::new()),
        sweep_interval,
    ));

    let app_state = AppState::new(
        Arc::new(session_service),
        user_store,
        AllowList::default(),
        config,
    );
    let app = build_router(app_state);

    let addr = std::env::var("WORDSERWEB_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutting down");
}
