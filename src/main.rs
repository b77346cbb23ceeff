use assessment_service::{
    config::{get_config, init_config},
    routes, AppState,
};
use chrono::Utc;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

const EVICTION_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    init_config()?;
    let config = get_config()?;

    let app_state = AppState::new(config)?;
    info!(backend = %config.tests_api_url, "Tests backend configured");

    {
        let sessions = app_state.sessions.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Burst);
            loop {
                interval.tick().await;
                if let Err(e) = sessions.tick_all() {
                    tracing::error!("Session ticker error: {:?}", e);
                }
            }
        });
    }

    {
        let sessions = app_state.sessions.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = sessions.evict_finished(Utc::now()) {
                    tracing::error!("Session eviction error: {:?}", e);
                }
                tokio::time::sleep(EVICTION_INTERVAL).await;
            }
        });
    }

    let app = routes::router()
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
