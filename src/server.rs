//! MCP server transports.
//!
//! Opens the Knowledge Store once (never resetting it), builds the
//! [`ToolDispatcher`], and serves it over one of two transports:
//!
//! | Transport | Entry point | Used by |
//! |-----------|-------------|---------|
//! | stdio | [`serve_stdio`] | Claude Desktop, Cursor, any client that spawns the binary |
//! | Streamable HTTP | [`serve_http`] | Clients connecting to `http://{server.bind}/mcp` |
//!
//! stdout belongs to the protocol on the stdio transport; logs go to stderr.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use rmcp::ServiceExt;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::dispatcher::ToolDispatcher;
use crate::knowledge::KnowledgeStore;
use crate::mcp::PersonalityMcpServer;
use crate::retrieval::RetrievalLimits;

/// Open the store and wrap it in an MCP server handler.
pub async fn build_server(config: &Config) -> Result<PersonalityMcpServer> {
    let store = KnowledgeStore::open_sqlite(config, false)
        .await
        .context("Failed to initialize database")?;
    let dispatcher = ToolDispatcher::new(
        Arc::new(store),
        RetrievalLimits::from(&config.retrieval),
    );
    Ok(PersonalityMcpServer::new(
        config.server.name.clone(),
        Arc::new(dispatcher),
    ))
}

/// Serve MCP over stdin/stdout until the client disconnects.
pub async fn serve_stdio(config: &Config) -> Result<()> {
    let server = build_server(config).await?;
    tracing::info!(
        name = %config.server.name,
        db_path = %config.db.path.display(),
        collection = %config.db.collection,
        transport = "stdio",
        "MCP server starting"
    );

    let running = server
        .serve(rmcp::transport::stdio())
        .await
        .context("Failed to start MCP stdio transport")?;
    running.waiting().await?;

    tracing::info!("MCP client disconnected");
    Ok(())
}

/// Serve MCP over Streamable HTTP at `config.server.bind`.
pub async fn serve_http(config: &Config) -> Result<()> {
    let server = build_server(config).await?;

    let mcp_service = StreamableHttpService::new(
        move || Ok(server.clone()),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig::default(),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest_service("/mcp", mcp_service)
        .route("/health", get(handle_health))
        .layer(cors);

    let bind_addr = config.server.bind.as_str();
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    tracing::info!(
        name = %config.server.name,
        db_path = %config.db.path.display(),
        collection = %config.db.collection,
        transport = "http",
        "MCP server listening on http://{}/mcp",
        bind_addr
    );

    axum::serve(listener, app).await?;
    Ok(())
}

async fn handle_health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
