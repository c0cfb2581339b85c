//! Tool type definitions for the reasoning variants.
//!
//! Provides provider-agnostic types for tool definitions, calls, and
//! results, plus the two variant toolsets: grid navigation for the tabular
//! agent and document navigation for the structured agent.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// A tool definition that can be sent to an LLM for function-calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match the dispatch table in the executor).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema object describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call (assigned by the provider).
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded arguments for the tool.
    pub arguments: String,
}

/// The result of executing a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this result corresponds to.
    pub tool_call_id: String,
    /// Result content (JSON string on success, error message on failure).
    pub content: String,
    /// Whether this result represents an error.
    pub is_error: bool,
}

/// A set of tool definitions scoped to a reasoning variant.
///
/// - Tabular sessions navigate the grid: `list_properties`,
///   `list_contributions`, `get_row`, `get_cell`.
/// - Structured sessions navigate the flattened document: `list_keys`,
///   `get_value`.
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    definitions: Vec<ToolDefinition>,
}

impl ToolSet {
    /// Returns the tool definitions in this set.
    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Returns `true` if this set contains no tools.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Returns the number of tools in this set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Tool set for tabular (grid) sessions.
    #[must_use]
    pub fn grid_tools() -> Self {
        Self {
            definitions: vec![
                def_list_properties(),
                def_list_contributions(),
                def_get_row(),
                def_get_cell(),
            ],
        }
    }

    /// Tool set for structured (document) sessions.
    #[must_use]
    pub fn document_tools() -> Self {
        Self {
            definitions: vec![def_list_keys(), def_get_value()],
        }
    }
}

// ---------------------------------------------------------------------------
// Tool schema definitions
// ---------------------------------------------------------------------------

/// Defines the `list_properties` tool.
fn def_list_properties() -> ToolDefinition {
    ToolDefinition {
        name: "list_properties".to_string(),
        description: "List the property labels (row headers) of the comparison table."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
    }
}

/// Defines the `list_contributions` tool.
fn def_list_contributions() -> ToolDefinition {
    ToolDefinition {
        name: "list_contributions".to_string(),
        description: "List the contribution labels (column headers) of the comparison table."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
    }
}

/// Defines the `get_row` tool.
fn def_get_row() -> ToolDefinition {
    ToolDefinition {
        name: "get_row".to_string(),
        description: "Get all cells of one property row, keyed by contribution. Cells may \
                       hold zero, one, or multiple values."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "property": {
                    "type": "string",
                    "description": "Property label (case-insensitive)."
                }
            },
            "required": ["property"],
            "additionalProperties": false
        }),
    }
}

/// Defines the `get_cell` tool.
fn def_get_cell() -> ToolDefinition {
    ToolDefinition {
        name: "get_cell".to_string(),
        description: "Get the values of a single cell addressed by property and contribution."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "property": {
                    "type": "string",
                    "description": "Property label (case-insensitive)."
                },
                "contribution": {
                    "type": "string",
                    "description": "Contribution label (case-insensitive)."
                }
            },
            "required": ["property", "contribution"],
            "additionalProperties": false
        }),
    }
}

/// Defines the `list_keys` tool.
fn def_list_keys() -> ToolDefinition {
    ToolDefinition {
        name: "list_keys".to_string(),
        description: "List the keys at a dotted path inside the comparison document. An \
                       empty path lists the top-level contributions."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Dotted path, e.g. \"Paper A\" or \"Paper A.method\". \
                                    Empty for the document root.",
                    "default": ""
                }
            },
            "additionalProperties": false
        }),
    }
}

/// Defines the `get_value` tool.
fn def_get_value() -> ToolDefinition {
    ToolDefinition {
        name: "get_value".to_string(),
        description: "Get the value at a dotted path inside the comparison document. Long \
                       values are truncated to the session's per-field budget."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Dotted path to the value, e.g. \"Paper A.year\"."
                }
            },
            "required": ["path"],
            "additionalProperties": false
        }),
    }
}
