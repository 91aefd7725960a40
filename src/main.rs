use docsearch_mcp::config::Config;
use docsearch_mcp::server::DocSearchServer;
use docsearch_mcp::worker::{ServerState, spawn_reload_worker};
use rmcp::{ServiceExt, transport::stdio};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr to avoid interfering with MCP protocol on stdout
    docsearch_mcp::tracing::init();

    tracing::info!("Starting docsearch-mcp server");

    let mut config = Config::load()?;
    if let Some(path) = std::env::args().nth(1) {
        config.payload = Some(PathBuf::from(path));
    }

    let state = Arc::new(ServerState::new(config));

    // Initial build; a bad payload leaves the server running with an empty index
    if let Some(path) = state.payload_path().await {
        match state.reload_from_path(&path).await {
            Ok(outcome) => tracing::info!(
                "Loaded {} documents from {}",
                outcome.snapshot().document_count(),
                path.display()
            ),
            Err(e) => tracing::warn!("Initial index build failed: {:#}", e),
        }
    } else {
        tracing::info!("No payload configured; waiting for reload_index");
    }

    let _worker = spawn_reload_worker(Arc::clone(&state));

    // Create and serve the MCP server over stdio
    let server = DocSearchServer::new(state);
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("Error serving MCP server: {:?}", e);
    })?;

    // Wait for the service to complete
    service.waiting().await?;

    Ok(())
}
