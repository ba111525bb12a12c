//! MCP JSON-RPC protocol bridge.
//!
//! Adapts the [`ToolDispatcher`] to the MCP server protocol: the three
//! personality tools are listed via `list_tools` and invoked via
//! `call_tool`. Per-query answers (including "no data" and parameter
//! errors) come back as successful text content; an unknown tool name is a
//! JSON-RPC `METHOD_NOT_FOUND` error.

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler};

use crate::dispatcher::{DispatchError, ToolDispatcher};

/// Bridges the dispatcher to the MCP JSON-RPC protocol.
///
/// Each MCP session receives a clone of this struct; all sessions share
/// one dispatcher and therefore one Knowledge Store.
#[derive(Clone)]
pub struct PersonalityMcpServer {
    name: String,
    dispatcher: Arc<ToolDispatcher>,
}

impl PersonalityMcpServer {
    pub fn new(name: impl Into<String>, dispatcher: Arc<ToolDispatcher>) -> Self {
        Self {
            name: name.into(),
            dispatcher,
        }
    }

    /// Convert a dispatcher tool into an rmcp `Tool` descriptor.
    fn to_mcp_tool(tool: &dyn crate::dispatcher::Tool) -> Tool {
        let input_schema: Arc<serde_json::Map<String, serde_json::Value>> =
            match tool.parameters_schema() {
                serde_json::Value::Object(map) => Arc::new(map),
                _ => Arc::new(serde_json::Map::new()),
            };

        Tool {
            name: Cow::Owned(tool.name().to_string()),
            title: None,
            description: Some(Cow::Owned(tool.description().to_string())),
            input_schema,
            output_schema: None,
            annotations: Some(ToolAnnotations::new().read_only(true)),
            execution: None,
            icons: None,
            meta: None,
        }
    }
}

impl PersonalityMcpServer {
    /// Run one tool call. Answers are success text; an unknown name is
    /// `METHOD_NOT_FOUND`.
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        let args = arguments
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Null);

        match self.dispatcher.call(name, args).await {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(e @ DispatchError::UnknownTool(_)) => {
                tracing::warn!(tool = %name, "Rejected call to unknown tool");
                Err(McpError::new(ErrorCode::METHOD_NOT_FOUND, e.to_string(), None))
            }
        }
    }
}

impl ServerHandler for PersonalityMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: self.name.clone(),
                title: Some("AI Personalities".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Character personality lookup. Use search_personality to find passages about a \
                 character, get_character_dialogue_style for how they speak, and \
                 get_character_traits for what they are like."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools: Vec<Tool> = self
            .dispatcher
            .tools()
            .iter()
            .map(|t| Self::to_mcp_tool(t.as_ref()))
            .collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn get_tool(&self, name: &str) -> Option<Tool> {
        self.dispatcher.find(name).map(Self::to_mcp_tool)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: rmcp::service::RequestContext<rmcp::RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(&request.name, request.arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_personalities_core::embedding::Embedder;
    use ai_personalities_core::index::memory::InMemoryIndex;
    use serde_json::json;

    use crate::dispatcher::{GET_CHARACTER_DIALOGUE_STYLE, GET_CHARACTER_TRAITS, SEARCH_PERSONALITY};
    use crate::embedding::HashEmbedder;
    use crate::knowledge::{KnowledgeStore, StoreOptions};
    use crate::retrieval::{RetrievalLimits, MISSING_CHARACTER};

    async fn server() -> PersonalityMcpServer {
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(32).unwrap());
        let store = KnowledgeStore::open(
            Arc::new(InMemoryIndex::new()),
            embedder,
            StoreOptions::new("personality"),
        )
        .await
        .unwrap();
        let dispatcher = ToolDispatcher::new(Arc::new(store), RetrievalLimits::default());
        PersonalityMcpServer::new("ai-personalities", Arc::new(dispatcher))
    }

    fn text_of(result: &CallToolResult) -> String {
        result
            .content
            .iter()
            .filter_map(|c| c.as_text().map(|t| t.text.clone()))
            .collect()
    }

    fn required(tool: &Tool) -> Vec<String> {
        tool.input_schema
            .get("required")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_tools_are_read_only_with_object_schemas() {
        let server = server().await;

        let tools: Vec<Tool> = server
            .dispatcher
            .tools()
            .iter()
            .map(|t| PersonalityMcpServer::to_mcp_tool(t.as_ref()))
            .collect();
        let names: Vec<&str> = tools.iter().map(|t| &*t.name).collect();
        assert_eq!(
            names,
            vec![SEARCH_PERSONALITY, GET_CHARACTER_DIALOGUE_STYLE, GET_CHARACTER_TRAITS]
        );

        for tool in &tools {
            assert_eq!(tool.input_schema.get("type"), Some(&json!("object")));
            assert!(tool.description.as_deref().is_some_and(|d| !d.is_empty()));
            let read_only = tool.annotations.as_ref().and_then(|a| a.read_only_hint);
            assert_eq!(read_only, Some(true));
        }

        assert_eq!(required(&tools[0]), vec!["query", "character"]);
        assert_eq!(required(&tools[1]), vec!["character"]);
        assert_eq!(required(&tools[2]), vec!["character"]);

        assert!(server.get_tool(GET_CHARACTER_TRAITS).is_some());
        assert!(server.get_tool("x").is_none());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_method_not_found() {
        let server = server().await;
        let err = server.dispatch("x", None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::METHOD_NOT_FOUND);
        assert_eq!(err.message, "Unknown tool: x");
    }

    #[tokio::test]
    async fn test_answers_are_success_text() {
        let server = server().await;

        let mut args = JsonObject::new();
        args.insert("character".to_string(), json!(""));
        let result = server
            .dispatch(GET_CHARACTER_TRAITS, Some(args))
            .await
            .unwrap();
        assert_ne!(result.is_error, Some(true));
        assert_eq!(text_of(&result), MISSING_CHARACTER);

        let result = server.dispatch(GET_CHARACTER_DIALOGUE_STYLE, None).await.unwrap();
        assert_eq!(text_of(&result), MISSING_CHARACTER);

        let mut args = JsonObject::new();
        args.insert("query".to_string(), json!("greeting"));
        args.insert("character".to_string(), json!("Hiro"));
        let result = server.dispatch(SEARCH_PERSONALITY, Some(args)).await.unwrap();
        assert_eq!(
            text_of(&result),
            "No personality data found for Hiro with query: greeting"
        );
    }
}
