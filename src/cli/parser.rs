//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};

/// CQA-RS: question answering over research-paper comparisons.
///
/// Asks an LLM-backed reasoning agent natural-language questions about a
/// comparison table, optionally streaming its intermediate thoughts.
#[derive(Parser, Debug)]
#[command(name = "cqa-rs")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question about a comparison.
    ///
    /// Prints the final answer, or — with `--stream` — each reasoning
    /// event as an NDJSON frame followed by the answer frame.
    #[command(after_help = r#"Examples:
  cqa-rs query R1234 "What years are covered?"
  cqa-rs query R1234 "Compare the result sections" --agent structured
  cqa-rs query R1234 "How many papers use method X?" --stream | jq .text
"#)]
    Query {
        /// Comparison id to query.
        comparison_id: String,

        /// The natural-language question.
        question: String,

        /// Strategy tag: tabular or structured.
        #[arg(short, long, default_value = "tabular", env = "CQA_AGENT")]
        agent: String,

        /// Stream reasoning events instead of waiting for the answer.
        #[arg(short, long)]
        stream: bool,
    },

    /// Start the HTTP/WebSocket query service.
    Serve {
        /// Host to bind.
        #[arg(long, default_value = "127.0.0.1", env = "CQA_HOST")]
        host: String,

        /// Port to bind.
        #[arg(short, long, default_value = "8380", env = "CQA_PORT")]
        port: u16,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_query_parsing() {
        let cli = Cli::try_parse_from([
            "cqa-rs", "query", "R1234", "What years?", "--agent", "structured", "--stream",
        ])
        .unwrap_or_else(|e| unreachable!("args parse: {e}"));
        match cli.command {
            Commands::Query {
                comparison_id,
                question,
                agent,
                stream,
            } => {
                assert_eq!(comparison_id, "R1234");
                assert_eq!(question, "What years?");
                assert_eq!(agent, "structured");
                assert!(stream);
            }
            Commands::Serve { .. } => unreachable!("parsed the wrong command"),
        }
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["cqa-rs", "serve"])
            .unwrap_or_else(|e| unreachable!("args parse: {e}"));
        match cli.command {
            Commands::Serve { host, port } => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(port, 8380);
            }
            Commands::Query { .. } => unreachable!("parsed the wrong command"),
        }
    }
}
