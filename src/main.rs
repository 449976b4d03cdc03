use std::sync::Arc;

use qa_hub_mcp::{
    analysis_engine::{AnalysisEngine, LocalAnalysisEngine, OllamaAnalysisEngine},
    build_app,
    config::{AiProvider, Config},
    data_generator::FakeDataGenerator,
    domain::Collaborators,
    logging,
    mcp::{capabilities::CapabilityRegistry, server::McpServer},
    AppState,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;

    let analysis_engine: Arc<dyn AnalysisEngine> = match config.ai_provider {
        AiProvider::Mock => Arc::new(LocalAnalysisEngine),
        AiProvider::Ollama => Arc::new(OllamaAnalysisEngine::new(
            config.ollama_base_url.clone(),
            config.ollama_model.clone(),
            config.collaborator_timeout,
        )?),
    };
    let collaborators = Collaborators {
        data_generator: Arc::new(FakeDataGenerator::new()),
        analysis_engine,
        call_timeout: config.collaborator_timeout,
    };

    let capabilities = CapabilityRegistry::new(config.capabilities, config.identity.clone());
    let server = McpServer::new(capabilities, collaborators)?;

    if config.api_token.is_none() {
        warn!("MCP_API_TOKEN is not set, /mcp routes are unauthenticated");
    }

    let bind_socket = config.bind_socket()?;
    let state = AppState::new(config.api_token.clone(), server);
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        server_name = %config.identity.name,
        ai_provider = ?config.ai_provider,
        "server starting"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
