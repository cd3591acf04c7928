use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tradenexus_core::autoblog::random::OsRandom;
use tradenexus_core::autoblog::{AutoBlogTrigger, Publisher};
use tradenexus_core::domain::session::AccessGate;
use tradenexus_core::llm::gemini::GeminiClient;
use tradenexus_core::storage::{FileKv, Store};
use tradenexus_core::time::clock::SystemClock;

mod routes;
mod session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = tradenexus_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    if let Err(e) = settings.require_gemini_api_key() {
        tracing::warn!(error = %e, "generator credential missing; every generation will fail");
    }

    let clock = Arc::new(SystemClock);
    let backend = FileKv::open(&settings.store_dir).await?;
    let dir = backend.dir().display().to_string();
    let store = Store::new(Arc::new(backend), clock.clone());
    tracing::info!(backend = store.backend_name(), %dir, "store opened");

    let generator = GeminiClient::from_settings(&settings)?;
    let publisher = Publisher::new(store.clone(), Arc::new(generator), clock, Arc::new(OsRandom));
    let trigger = Arc::new(AutoBlogTrigger::new(publisher.clone()));

    let period = Duration::from_secs(settings.autoblog_check_interval_secs);
    let trigger_handle = trigger.clone().spawn(period);
    tracing::info!(period_secs = period.as_secs(), "auto blog trigger started");

    let state = routes::AppState {
        store,
        publisher,
        trigger,
        gate: AccessGate::new(settings.admin_access_code.clone()),
        sessions: session::Sessions::default(),
    };

    let app = routes::router(state).layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    trigger_handle.abort();
    let _ = trigger_handle.await;

    result?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &tradenexus_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
