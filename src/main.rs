use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use vn_stock_advisor::analysis_service::AnalysisService;
use vn_stock_advisor::api;
use vn_stock_advisor::config::AppConfig;
use vn_stock_advisor::crew::CrewClient;
use vn_stock_advisor::poller::JobPoller;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let app_config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Configuration error: set CREW_URL and BEARER_TOKEN");
            return ExitCode::FAILURE;
        }
    };

    // Set a global span with node_name for all subsequent logs
    let _span = tracing::info_span!("node", name = %app_config.node_name).entered();

    tracing::info!("Starting vn-stock-advisor");
    tracing::info!(
        environment = %app_config.environment,
        port = app_config.port,
        max_attempts = app_config.poller.max_attempts,
        poll_interval = ?app_config.poller.poll_interval,
        cache_ttl = ?app_config.cache_ttl,
        "Loaded configuration"
    );

    let crew_client = match CrewClient::new(
        &app_config.crew.url,
        &app_config.crew.bearer_token,
        app_config.request_timeout,
    ) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize crew client");
            return ExitCode::FAILURE;
        }
    };

    let poller = JobPoller::new(crew_client, app_config.poller.clone());
    let service = Arc::new(AnalysisService::new(poller, app_config.cache_ttl));
    let app = api::router(service);

    let addr = SocketAddr::from(([0, 0, 0, 0], app_config.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(%addr, "Server listening");

    if let Err(e) = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await {
        tracing::error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
