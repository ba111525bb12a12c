//! Tool Dispatcher: named operations over the Retrieval Service.
//!
//! Each operation is a [`Tool`] with a name, a description, and a JSON
//! Schema for its parameters. The [`ToolDispatcher`] owns a registry of
//! the three built-in tools and a [`PersonalityRetriever`] built from a
//! Knowledge Store that the caller opened up front.
//!
//! ```text
//! call(name, args)
//!   ├─ search_personality            → retriever.search_personality(query, character, n_results)
//!   ├─ get_character_dialogue_style  → retriever.dialogue_style(character)
//!   ├─ get_character_traits          → retriever.traits(character)
//!   └─ anything else                 → Err(DispatchError::UnknownTool)
//! ```
//!
//! Parameter problems are answered with text, like every other per-query
//! condition. Only an unknown tool name is an error.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::knowledge::KnowledgeStore;
use crate::retrieval::{PersonalityRetriever, RetrievalLimits, MISSING_CHARACTER, MISSING_SEARCH_PARAMS};

pub const SEARCH_PERSONALITY: &str = "search_personality";
pub const GET_CHARACTER_DIALOGUE_STYLE: &str = "get_character_dialogue_style";
pub const GET_CHARACTER_TRAITS: &str = "get_character_traits";

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

/// A named operation exposed to calling agents.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Lowercase identifier with underscores, e.g. `"search_personality"`.
    fn name(&self) -> &str;

    /// One-line description for agent discovery.
    fn description(&self) -> &str;

    /// JSON Schema (`type: "object"`) for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Run the tool. `params` is always a JSON object.
    async fn execute(&self, params: &Value, retriever: &PersonalityRetriever) -> String;
}

/// Read a string parameter; anything other than a string counts as absent.
fn str_param<'a>(params: &'a Value, key: &str) -> &'a str {
    params.get(key).and_then(Value::as_str).unwrap_or("")
}

pub struct SearchPersonalityTool;

#[async_trait]
impl Tool for SearchPersonalityTool {
    fn name(&self) -> &str {
        SEARCH_PERSONALITY
    }

    fn description(&self) -> &str {
        "Search a character's personality data for passages relevant to a query"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "What to look for (e.g. 'how they greet friends')" },
                "character": { "type": "string", "description": "Character name" },
                "n_results": {
                    "type": "integer",
                    "description": "Number of results to return (max 20)",
                    "default": 3,
                    "minimum": 1,
                    "maximum": 20
                }
            },
            "required": ["query", "character"]
        })
    }

    async fn execute(&self, params: &Value, retriever: &PersonalityRetriever) -> String {
        let query = str_param(params, "query");
        let character = str_param(params, "character");
        if query.is_empty() || character.is_empty() {
            return MISSING_SEARCH_PARAMS.to_string();
        }

        let n_results = match params.get("n_results") {
            None | Some(Value::Null) => None,
            Some(value) => match integer_param(value) {
                Some(n) => Some(n),
                None => return "Error: n_results must be an integer".to_string(),
            },
        };

        retriever
            .search_personality(query, character, n_results)
            .await
    }
}

/// Accept JSON integers and whole-valued floats (`5.0`).
fn integer_param(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    if let Some(n) = value.as_u64() {
        return Some(i64::try_from(n).unwrap_or(i64::MAX));
    }
    value
        .as_f64()
        .filter(|f| f.is_finite() && f.fract() == 0.0)
        .map(|f| f as i64)
}

pub struct DialogueStyleTool;

#[async_trait]
impl Tool for DialogueStyleTool {
    fn name(&self) -> &str {
        GET_CHARACTER_DIALOGUE_STYLE
    }

    fn description(&self) -> &str {
        "Get a character's dialogue style and speech patterns"
    }

    fn parameters_schema(&self) -> Value {
        character_only_schema()
    }

    async fn execute(&self, params: &Value, retriever: &PersonalityRetriever) -> String {
        let character = str_param(params, "character");
        if character.is_empty() {
            return MISSING_CHARACTER.to_string();
        }
        retriever.dialogue_style(character).await
    }
}

pub struct CharacterTraitsTool;

#[async_trait]
impl Tool for CharacterTraitsTool {
    fn name(&self) -> &str {
        GET_CHARACTER_TRAITS
    }

    fn description(&self) -> &str {
        "Get a character's personality traits and behavior"
    }

    fn parameters_schema(&self) -> Value {
        character_only_schema()
    }

    async fn execute(&self, params: &Value, retriever: &PersonalityRetriever) -> String {
        let character = str_param(params, "character");
        if character.is_empty() {
            return MISSING_CHARACTER.to_string();
        }
        retriever.traits(character).await
    }
}

fn character_only_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "character": { "type": "string", "description": "Character name" }
        },
        "required": ["character"]
    })
}

/// Routes tool calls by name to the registered tools.
pub struct ToolDispatcher {
    tools: Vec<Box<dyn Tool>>,
    retriever: PersonalityRetriever,
}

impl ToolDispatcher {
    /// Dispatcher with the three built-in tools over an already opened store.
    pub fn new(store: Arc<KnowledgeStore>, limits: RetrievalLimits) -> Self {
        Self {
            tools: vec![
                Box::new(SearchPersonalityTool),
                Box::new(DialogueStyleTool),
                Box::new(CharacterTraitsTool),
            ],
            retriever: PersonalityRetriever::new(store, limits),
        }
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Invoke `name` with `args` (a JSON object, or null for no arguments).
    pub async fn call(&self, name: &str, args: Value) -> Result<String, DispatchError> {
        let tool = self
            .find(name)
            .ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;

        let params = match args {
            Value::Object(_) => args,
            _ => Value::Object(serde_json::Map::new()),
        };

        tracing::debug!(tool = name, "Calling tool");
        Ok(tool.execute(&params, &self.retriever).await)
    }
}
