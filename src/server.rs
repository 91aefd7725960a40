//! MCP server exposing the documentation search tools.

use crate::tools::reload::{ReloadRequest, handle_reload};
use crate::tools::search::{SearchRequest, handle_search};
use crate::tools::status::handle_index_status;
use crate::worker::ServerState;
use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars::{JsonSchema, generate::SchemaSettings},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

/// MCP Server for documentation search queries
#[derive(Clone)]
pub struct DocSearchServer {
    /// Shared server state (engine, config, payload path)
    state: Arc<ServerState>,

    /// Tool router for handling MCP tool calls
    tool_router: ToolRouter<Self>,
}

impl std::fmt::Debug for DocSearchServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocSearchServer")
            .field("state", &self.state)
            .finish()
    }
}

#[tool_router]
impl DocSearchServer {
    /// Create a new server around shared state.
    pub fn new(state: Arc<ServerState>) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }

    /// Get a reference to the shared state.
    pub const fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    #[tool(
        description = "Search the documentation. All words must match; titles weigh more than body text. Quote a phrase for an exact sequence and end a word with * for prefix matching. Returns ranked entries with page, title, category, location and a text snippet.",
        input_schema = inline_schema_for_type::<SearchRequest>()
    )]
    async fn search(
        &self,
        Parameters(request): Parameters<SearchRequest>,
    ) -> std::result::Result<String, String> {
        handle_search(&self.state, request).await
    }

    #[tool(
        description = "Rebuild the search index from the generated documentation payload. Without a path, re-reads the current payload. If the payload cannot be parsed the previous index keeps serving.",
        input_schema = inline_schema_for_type::<ReloadRequest>()
    )]
    async fn reload_index(
        &self,
        Parameters(request): Parameters<ReloadRequest>,
    ) -> std::result::Result<String, String> {
        handle_reload(&self.state, request).await
    }

    #[tool(
        description = "Report the search index state (empty, building, ready, rebuilding), document and term counts, and records skipped during the last build."
    )]
    async fn index_status(&self) -> std::result::Result<String, String> {
        Ok(handle_index_status(&self.state).await)
    }
}

#[tool_handler]
impl ServerHandler for DocSearchServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_protocol_version(ProtocolVersion::V_2024_11_05)
            .with_server_info(Implementation::from_build_env())
            .with_instructions(
                "docsearch-mcp: full-text search over a generated documentation site. \
                 Use search to find pages, sections, types and methods. \
                 Use reload_index after the documentation is regenerated, and index_status to inspect the index."
                    .to_string(),
            )
    }
}

/// Generate an inline JSON schema for MCP tools
///
/// Unlike rmcp's default `schema_for_type()`, this function sets `inline_subschemas = true`
/// to generate inline definitions instead of $ref patterns.
pub fn inline_schema_for_type<T: JsonSchema>() -> Arc<JsonObject> {
    let mut settings = SchemaSettings::draft07();
    settings.transforms = vec![Box::new(rmcp::schemars::transform::AddNullable::default())];
    settings.inline_subschemas = true;

    let generator = settings.into_generator();
    let schema = generator.into_root_schema_for::<T>();
    let object = serde_json::to_value(schema).expect("failed to serialize schema");

    let json_object = match object {
        serde_json::Value::Object(object) => object,
        _ => panic!("Schema serialization produced non-object value"),
    };

    Arc::new(json_object)
}
