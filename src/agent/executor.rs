//! Tool executor that dispatches calls against the session's table view.
//!
//! Maps tool names to direct lookups on the owned [`ComparisonTable`] (grid
//! view) or the flattened document (structured view). No subprocess, no
//! network: tools are in-memory reads over data fetched once per query.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::core::{CellValue, ComparisonTable};
use crate::error::AgentError;

use super::tool::{ToolCall, ToolResult};

/// Maximum raw byte length of tool argument JSON from the LLM.
const MAX_TOOL_ARGS_LEN: usize = 10_000;

/// The data a session's tools operate on.
enum DataView {
    /// The comparison as a grid of rows and columns.
    Grid(ComparisonTable),
    /// The comparison flattened into a nested document, with a per-field
    /// truncation budget for rendered values.
    Document {
        root: Value,
        max_value_length: usize,
    },
}

/// Executes tool calls against the table view owned by the session.
pub struct ToolExecutor {
    view: DataView,
}

impl ToolExecutor {
    /// Creates an executor over the grid view of a table.
    #[must_use]
    pub fn grid(table: ComparisonTable) -> Self {
        Self {
            view: DataView::Grid(table),
        }
    }

    /// Creates an executor over the flattened document of a table.
    #[must_use]
    pub fn document(root: Value, max_value_length: usize) -> Self {
        Self {
            view: DataView::Document {
                root,
                max_value_length,
            },
        }
    }

    /// Dispatches a tool call to the appropriate lookup.
    ///
    /// Validates raw argument size before dispatch; failures become error
    /// results fed back to the model, never session failures.
    #[must_use]
    pub fn execute(&self, call: &ToolCall) -> ToolResult {
        if call.arguments.len() > MAX_TOOL_ARGS_LEN {
            return ToolResult {
                tool_call_id: call.id.clone(),
                content: format!(
                    "tool arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})",
                    call.arguments.len()
                ),
                is_error: true,
            };
        }

        let result = match (&self.view, call.name.as_str()) {
            (DataView::Grid(table), "list_properties") => Ok(json_list(table.properties())),
            (DataView::Grid(table), "list_contributions") => Ok(json_list(table.contributions())),
            (DataView::Grid(table), "get_row") => Self::tool_get_row(table, &call.arguments),
            (DataView::Grid(table), "get_cell") => Self::tool_get_cell(table, &call.arguments),
            (DataView::Document { root, .. }, "list_keys") => {
                Self::tool_list_keys(root, &call.arguments)
            }
            (
                DataView::Document {
                    root,
                    max_value_length,
                },
                "get_value",
            ) => Self::tool_get_value(root, *max_value_length, &call.arguments),
            (_, other) => Err(AgentError::ToolExecution {
                name: other.to_string(),
                message: "unknown tool for this variant".to_string(),
            }),
        };

        match result {
            Ok(content) => ToolResult {
                tool_call_id: call.id.clone(),
                content,
                is_error: false,
            },
            Err(e) => ToolResult {
                tool_call_id: call.id.clone(),
                content: e.to_string(),
                is_error: true,
            },
        }
    }

    // -----------------------------------------------------------------------
    // Grid tools
    // -----------------------------------------------------------------------

    /// Returns one property row keyed by contribution.
    fn tool_get_row(table: &ComparisonTable, args: &str) -> Result<String, AgentError> {
        #[derive(Deserialize)]
        struct Args {
            property: String,
        }
        let args: Args = parse_args("get_row", args)?;

        let row = table
            .property_index(&args.property)
            .ok_or_else(|| AgentError::ToolExecution {
                name: "get_row".to_string(),
                message: format!("unknown property: {:?}", args.property),
            })?;

        let entries: serde_json::Map<String, Value> = table
            .contributions()
            .iter()
            .enumerate()
            .map(|(col, label)| (label.clone(), cell_json(table.cell(row, col))))
            .collect();

        serialize("get_row", &Value::Object(entries))
    }

    /// Returns one cell addressed by property and contribution.
    fn tool_get_cell(table: &ComparisonTable, args: &str) -> Result<String, AgentError> {
        #[derive(Deserialize)]
        struct Args {
            property: String,
            contribution: String,
        }
        let args: Args = parse_args("get_cell", args)?;

        let row = table
            .property_index(&args.property)
            .ok_or_else(|| AgentError::ToolExecution {
                name: "get_cell".to_string(),
                message: format!("unknown property: {:?}", args.property),
            })?;
        let col = table.contribution_index(&args.contribution).ok_or_else(|| {
            AgentError::ToolExecution {
                name: "get_cell".to_string(),
                message: format!("unknown contribution: {:?}", args.contribution),
            }
        })?;

        serialize("get_cell", &cell_json(table.cell(row, col)))
    }

    // -----------------------------------------------------------------------
    // Document tools
    // -----------------------------------------------------------------------

    /// Lists the keys at a dotted path.
    fn tool_list_keys(root: &Value, args: &str) -> Result<String, AgentError> {
        #[derive(Deserialize)]
        struct Args {
            #[serde(default)]
            path: String,
        }
        let args: Args = parse_args("list_keys", args)?;
        let value = navigate(root, &args.path, "list_keys")?;

        let keys = match value {
            Value::Object(map) => map.keys().cloned().collect::<Vec<_>>(),
            Value::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            other => {
                return Err(AgentError::ToolExecution {
                    name: "list_keys".to_string(),
                    message: format!(
                        "value at {:?} is a {} with no keys; use get_value instead",
                        args.path,
                        type_name(other)
                    ),
                });
            }
        };

        serialize("list_keys", &json!(keys))
    }

    /// Returns the value at a dotted path, truncated to the field budget.
    fn tool_get_value(
        root: &Value,
        max_value_length: usize,
        args: &str,
    ) -> Result<String, AgentError> {
        #[derive(Deserialize)]
        struct Args {
            path: String,
        }
        let args: Args = parse_args("get_value", args)?;
        let value = navigate(root, &args.path, "get_value")?;

        let mut rendered = serialize("get_value", value)?;
        if rendered.len() > max_value_length {
            let cut = floor_char_boundary(&rendered, max_value_length);
            rendered.truncate(cut);
            rendered.push_str("…(truncated)");
        }
        Ok(rendered)
    }
}

/// Parses tool arguments, mapping serde errors to tool failures.
fn parse_args<'a, T: Deserialize<'a>>(name: &str, args: &'a str) -> Result<T, AgentError> {
    serde_json::from_str(args).map_err(|e| AgentError::ToolExecution {
        name: name.to_string(),
        message: format!("invalid arguments: {e}"),
    })
}

/// Serializes a JSON value, mapping errors to tool failures.
fn serialize(name: &str, value: &Value) -> Result<String, AgentError> {
    serde_json::to_string(value).map_err(|e| AgentError::ToolExecution {
        name: name.to_string(),
        message: format!("serialization failed: {e}"),
    })
}

/// Renders a cell's values: `null` empty, scalar single, array otherwise.
fn cell_json(cell: Option<&[CellValue]>) -> Value {
    match cell {
        None | Some([]) => Value::Null,
        Some([single]) => single.to_json(),
        Some(many) => Value::Array(many.iter().map(CellValue::to_json).collect()),
    }
}

/// Renders a slice of labels as a JSON array.
fn json_list(labels: &[String]) -> String {
    serde_json::to_string(labels).unwrap_or_else(|_| "[]".to_string())
}

/// Walks a dotted path through objects and arrays.
fn navigate<'a>(root: &'a Value, path: &str, tool: &str) -> Result<&'a Value, AgentError> {
    let mut current = root;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|idx| items.get(idx)),
            _ => None,
        }
        .ok_or_else(|| AgentError::ToolExecution {
            name: tool.to_string(),
            message: format!("no value at path {path:?} (missing segment {segment:?})"),
        })?;
    }
    Ok(current)
}

/// Human name of a JSON value's type, for error messages.
const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Largest index `<= max` that falls on a char boundary of `s`.
fn floor_char_boundary(s: &str, max: usize) -> usize {
    let mut idx = max.min(s.len());
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> ComparisonTable {
        ComparisonTable::new(
            vec!["method".to_string(), "year".to_string()],
            vec!["Paper A".to_string(), "Paper B".to_string()],
            vec![
                vec![
                    vec![CellValue::Text("LSTM".to_string())],
                    vec![
                        CellValue::Text("CNN".to_string()),
                        CellValue::Text("GRU".to_string()),
                    ],
                ],
                vec![vec![CellValue::Number(2019.0)], vec![]],
            ],
        )
        .unwrap_or_else(|e| unreachable!("sample table is well-formed: {e}"))
    }

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[test]
    fn test_grid_list_tools() {
        let exec = ToolExecutor::grid(sample_table());
        let result = exec.execute(&call("list_properties", "{}"));
        assert!(!result.is_error);
        assert_eq!(result.content, r#"["method","year"]"#);

        let result = exec.execute(&call("list_contributions", "{}"));
        assert_eq!(result.content, r#"["Paper A","Paper B"]"#);
    }

    #[test]
    fn test_grid_get_row() {
        let exec = ToolExecutor::grid(sample_table());
        let result = exec.execute(&call("get_row", r#"{"property":"METHOD"}"#));
        assert!(!result.is_error);
        let value: Value =
            serde_json::from_str(&result.content).unwrap_or_else(|e| unreachable!("json: {e}"));
        assert_eq!(value["Paper A"], json!("LSTM"));
        assert_eq!(value["Paper B"], json!(["CNN", "GRU"]));
    }

    #[test]
    fn test_grid_get_cell_and_empty_cell() {
        let exec = ToolExecutor::grid(sample_table());
        let result = exec.execute(&call(
            "get_cell",
            r#"{"property":"year","contribution":"Paper A"}"#,
        ));
        assert_eq!(result.content, "2019.0");

        let result = exec.execute(&call(
            "get_cell",
            r#"{"property":"year","contribution":"Paper B"}"#,
        ));
        assert_eq!(result.content, "null");
    }

    #[test]
    fn test_grid_unknown_property_is_tool_error() {
        let exec = ToolExecutor::grid(sample_table());
        let result = exec.execute(&call("get_row", r#"{"property":"venue"}"#));
        assert!(result.is_error);
        assert!(result.content.contains("unknown property"));
    }

    #[test]
    fn test_unknown_tool_for_variant() {
        let exec = ToolExecutor::grid(sample_table());
        let result = exec.execute(&call("list_keys", "{}"));
        assert!(result.is_error);
        assert!(result.content.contains("unknown tool"));
    }

    #[test]
    fn test_document_list_keys() {
        let exec = ToolExecutor::document(sample_table().to_document(), 4000);
        let result = exec.execute(&call("list_keys", r#"{"path":""}"#));
        assert!(!result.is_error);
        assert_eq!(result.content, r#"["Paper A","Paper B"]"#);

        let result = exec.execute(&call("list_keys", r#"{"path":"Paper A"}"#));
        assert_eq!(result.content, r#"["method","year"]"#);
    }

    #[test]
    fn test_document_get_value_and_missing_path() {
        let exec = ToolExecutor::document(sample_table().to_document(), 4000);
        let result = exec.execute(&call("get_value", r#"{"path":"Paper B.method"}"#));
        assert_eq!(result.content, r#"["CNN","GRU"]"#);

        let result = exec.execute(&call("get_value", r#"{"path":"Paper C.method"}"#));
        assert!(result.is_error);
        assert!(result.content.contains("no value at path"));
    }

    #[test]
    fn test_document_value_truncation() {
        let long = "x".repeat(100);
        let root = json!({ "Paper A": { "abstract": long } });
        let exec = ToolExecutor::document(root, 20);
        let result = exec.execute(&call("get_value", r#"{"path":"Paper A.abstract"}"#));
        assert!(!result.is_error);
        assert!(result.content.ends_with("…(truncated)"));
        assert!(result.content.len() < 60);
    }

    #[test]
    fn test_list_keys_on_scalar_is_error() {
        let exec = ToolExecutor::document(sample_table().to_document(), 4000);
        let result = exec.execute(&call("list_keys", r#"{"path":"Paper A.method"}"#));
        assert!(result.is_error);
        assert!(result.content.contains("get_value"));
    }

    #[test]
    fn test_oversized_arguments_rejected() {
        let exec = ToolExecutor::grid(sample_table());
        let huge = format!(r#"{{"property":"{}"}}"#, "x".repeat(MAX_TOOL_ARGS_LEN));
        let result = exec.execute(&call("get_row", &huge));
        assert!(result.is_error);
        assert!(result.content.contains("too large"));
    }
}
