//! System prompts and template builders for the reasoning variants.
//!
//! The query wrapper is fixed: it is prepended verbatim to every user
//! query and is not configurable per call. Variant system prompts define
//! how each agent navigates its view of the comparison.

use std::fmt::Write;

use crate::core::{CellValue, ComparisonTable};

/// The exact reply the model must give when it cannot determine an answer.
pub const UNKNOWN_ANSWER_REPLY: &str = "Sorry!, I do not know.";

/// Models with chat-class context windows.
///
/// Sessions backed by these models get the larger per-field truncation
/// budget for the structured document view.
pub const CHAT_MODELS: &[&str] = &[
    "gpt-4",
    "gpt-3.5-turbo",
    "gpt-3.5-turbo-16k",
    "gpt-3.5-turbo-0613",
    "gpt-3.5-turbo-16k-0613",
    "gpt-4-32k",
];

/// Per-field truncation budget for chat-class models.
const CHAT_MODEL_VALUE_BUDGET: usize = 13_000;
/// Per-field truncation budget for completion-class models.
const BASE_MODEL_VALUE_BUDGET: usize = 4_000;

/// Instructional wrapper prepended to every user query.
const QUERY_WRAPPER: &str = "\
This is a table of data extracted from a scholarly knowledge graph that \
represents a comparison of several research papers. The rows are properties \
of the papers, and the columns are the papers (contributions) themselves.

The questions will need you to look into the values, sometimes across \
multiple columns. The cells could contain multiple values and not just a \
single value.

If there is a date in there you might need to parse it to find answers \
about the year or the month.

If you do not know the answer, reply as follows:
\"Sorry!, I do not know.\"

Return all output as a string.

Lets think step by step.

Below is the query.
Query:
";

/// System prompt for the tabular (grid) agent.
///
/// The serialized grid is appended by [`build_tabular_system_prompt`].
const TABULAR_SYSTEM_PROMPT: &str = "\
You are a data analyst answering questions about a comparison table of \
research papers. The full table is included below; rows are properties, \
columns are contributions.

## Instructions

1. Read the table and the query carefully.
2. Use the tools (`list_properties`, `list_contributions`, `get_row`, \
`get_cell`) to re-check any cell you rely on rather than guessing from \
the rendered table.
3. Cells may hold zero, one, or multiple values; treat an empty cell as \
unknown, not as zero.
4. When you have the answer, respond with plain text only — no tool calls.

## Rules

- Answer from the table only; never invent values.
- Keep the final answer to a single string.
";

/// System prompt for the structured (document) agent.
const STRUCTURED_SYSTEM_PROMPT: &str = "\
You are a data analyst answering questions about a comparison of research \
papers, provided as a nested document: contributions at the top level, each \
mapping property names to values.

## Instructions

1. Start with `list_keys` on the empty path to see the contributions.
2. Navigate with `list_keys` and read with `get_value`, using dotted paths \
such as \"Paper A.year\".
3. Values may be null (unknown), a single scalar, or an array of scalars.
4. When you have the answer, respond with plain text only — no tool calls.

## Rules

- Keep tool calls purposeful; every step costs time from a short budget.
- Answer from the document only; never invent values.
- Keep the final answer to a single string.
";

/// Prepends the fixed instructional wrapper to a user query.
#[must_use]
pub fn wrap_query(query: &str) -> String {
    format!("{QUERY_WRAPPER}{query}")
}

/// Per-field truncation budget for the structured view, by model capability.
#[must_use]
pub fn context_budget(model: &str) -> usize {
    if CHAT_MODELS.contains(&model) {
        CHAT_MODEL_VALUE_BUDGET
    } else {
        BASE_MODEL_VALUE_BUDGET
    }
}

/// Builds the tabular system prompt with the grid embedded verbatim.
#[must_use]
pub fn build_tabular_system_prompt(table: &ComparisonTable) -> String {
    format!("{TABULAR_SYSTEM_PROMPT}\n## Table\n\n{}", render_grid(table))
}

/// Returns the structured system prompt.
#[must_use]
pub fn structured_system_prompt() -> String {
    STRUCTURED_SYSTEM_PROMPT.to_string()
}

/// Renders the table as a markdown grid, multi-valued cells joined with `; `.
#[must_use]
pub fn render_grid(table: &ComparisonTable) -> String {
    let mut out = String::new();

    let _ = write!(out, "| property |");
    for contribution in table.contributions() {
        let _ = write!(out, " {contribution} |");
    }
    out.push('\n');

    let _ = write!(out, "| --- |");
    for _ in table.contributions() {
        let _ = write!(out, " --- |");
    }
    out.push('\n');

    for (row, property) in table.properties().iter().enumerate() {
        let _ = write!(out, "| {property} |");
        for col in 0..table.contributions().len() {
            let rendered = table
                .cell(row, col)
                .filter(|values| !values.is_empty())
                .map_or_else(String::new, |values| {
                    values
                        .iter()
                        .map(CellValue::to_string)
                        .collect::<Vec<_>>()
                        .join("; ")
                });
            let _ = write!(out, " {rendered} |");
        }
        out.push('\n');
    }

    out
}
