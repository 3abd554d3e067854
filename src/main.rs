use alira_backend::app;
use alira_backend::config::AppConfig;
use alira_backend::db::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "alira_backend=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env();
    tracing::info!(app = %config.app_name, env = ?config.environment, "starting");

    let (host, port) = (config.host.clone(), config.port);
    let state = AppState::init(config).await?;
    let app = app::build_app(state);
    app::serve(app, &host, port).await
}
