use std::path::Path;
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use tower_http::cors::CorsLayer;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use hive_invest::backend::{Backend, RestBackend};
use hive_invest::config::AppConfig;
use hive_invest::onboarding::{History, OnboardingManager, OnboardingRouteState, onboarding_routes};
use hive_invest::services::{ProfileService, ServiceContext};
use hive_invest::session::{InactivityMonitor, SessionProvider, session_routes, spawn_token_refresh};

/// Refresh token of a session to restore at startup.
const REFRESH_TOKEN_VAR: &str = "HIVE_REFRESH_TOKEN";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export HIVE_BACKEND_URL=https://<project>.example.co");
        eprintln!("  export HIVE_BACKEND_KEY=<anon key>");
        std::process::exit(1);
    });

    let _log_guard = init_tracing(config.log_dir.as_deref());

    eprintln!("🐝 Hive Invest v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {}", config.backend_url);
    eprintln!("   View API: http://0.0.0.0:{}/api", config.http_port);
    if let Some(dir) = &config.log_dir {
        eprintln!("   Logs: {}", dir.display());
    }

    // ── Backend + session ───────────────────────────────────────────────
    let backend: Arc<dyn Backend> = Arc::new(RestBackend::new(
        config.backend_url.clone(),
        config.backend_key.clone(),
        config.request_timeout,
    )?);
    let session = SessionProvider::new(Arc::clone(&backend));

    let refresh_token = std::env::var(REFRESH_TOKEN_VAR).ok().filter(|t| !t.trim().is_empty());
    let snapshot = session.initialize(refresh_token.as_deref()).await;
    match &snapshot.identity {
        Some(identity) => eprintln!("   Session: restored ({})", identity.id),
        None => eprintln!("   Session: signed out"),
    }

    let _refresh_task = spawn_token_refresh(Arc::clone(&session), config.refresh_interval);
    let monitor = Arc::new(InactivityMonitor::spawn(
        Arc::clone(&session),
        config.inactivity_timeout,
    ));
    eprintln!(
        "   Inactivity sign-out: {}s, token refresh every {}s",
        monitor.timeout().as_secs(),
        config.refresh_interval.as_secs(),
    );

    // ── View API ────────────────────────────────────────────────────────
    let ctx = ServiceContext::new(Arc::clone(&backend), Arc::clone(&session));
    let onboarding = OnboardingRouteState {
        manager: Arc::new(OnboardingManager::new(ProfileService::new(ctx))),
        history: History::new(),
    };

    let activity = Arc::clone(&monitor);
    let app = onboarding_routes(onboarding)
        .merge(session_routes(Arc::clone(&session)))
        .layer(axum::middleware::from_fn(move |req: Request, next: Next| {
            let activity = Arc::clone(&activity);
            async move {
                activity.touch();
                next.run(req).await
            }
        }))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http_port)).await?;
    tracing::info!(port = config.http_port, "View API started");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown requested");
        })
        .await?;

    Ok(())
}

/// Log to stderr, and also to a daily-rotated file when a log directory is set.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let (subscriber, guard) = log_subscriber(log_dir);
    subscriber.init();
    guard
}

fn log_subscriber(
    log_dir: Option<&Path>,
) -> (impl Subscriber + Send + Sync + use<>, Option<WorkerGuard>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let stderr = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "hive-invest.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file);
    (subscriber, guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_dir_adds_a_file_writer() {
        let dir = tempfile::tempdir().unwrap();

        let (subscriber, guard) = log_subscriber(Some(dir.path()));
        assert!(guard.is_some());
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(step = "country", "Written to the rolling file");
        });
        // Dropping the guard flushes the non-blocking writer.
        drop(guard);

        let logged: String = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| std::fs::read_to_string(entry.unwrap().path()).unwrap())
            .collect();
        assert!(logged.contains("Written to the rolling file"));
        assert!(logged.contains("step=\"country\""));
    }

    #[test]
    fn no_log_dir_means_no_file_writer() {
        let (_subscriber, guard) = log_subscriber(None);
        assert!(guard.is_none());
    }
}
