use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use policy_rag::PromptVersion;
use tracing_subscriber::EnvFilter;

mod commands;
mod setup;

use setup::Embedder;

/// Ask questions about company policy documents.
#[derive(Parser, Debug)]
#[command(name = "policy-rag", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    options: Options,

    #[command(subcommand)]
    command: Command,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct Options {
    /// Directory holding the Markdown policy documents
    #[arg(long, global = true, default_value = "./data")]
    pub data_dir: PathBuf,

    /// Directory holding the persisted vector index
    #[arg(long, global = true, default_value = "./index")]
    pub index_dir: PathBuf,

    /// Answer prompt template (v1 or v2)
    #[arg(long, global = true, default_value = "v2")]
    pub prompt: PromptVersion,

    /// Disable keyword-overlap reranking
    #[arg(long, global = true)]
    pub no_rerank: bool,

    /// Number of chunks to retrieve per question
    #[arg(long, global = true)]
    pub top_k: Option<usize>,

    /// Embedding backend; must match the one used to build the index
    #[arg(long, global = true, value_enum, default_value_t = Embedder::Hashing)]
    pub embedder: Embedder,

    /// Primary chat model
    #[arg(long, global = true, default_value = policy_rag::DEFAULT_PRIMARY_MODEL)]
    pub model: String,

    /// Chat model tried when the primary fails
    #[arg(long, global = true, default_value = policy_rag::DEFAULT_FALLBACK_MODEL)]
    pub fallback_model: String,

    /// Use no language model: keyword intent routing and raw-context answers
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chunk, embed and index the documents, replacing any existing index
    Build,

    /// Answer one question, or start an interactive session when none is given
    Ask {
        /// The question to answer
        question: Option<String>,
    },

    /// Run the built-in evaluation questions and write a JSON report
    Eval {
        /// Report path (default: evaluation_results/eval_<prompt>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Evaluate both prompt versions and print their verdicts side by side
        #[arg(long, conflicts_with = "output")]
        compare: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Build => commands::build(&cli.options).await,
        Command::Ask { question: Some(question) } => {
            commands::ask_once(&cli.options, &question).await
        }
        Command::Ask { question: None } => commands::interactive(&cli.options).await,
        Command::Eval { output, compare } => commands::eval(&cli.options, output, compare).await,
    }
}
