use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pdf_rag::Result;
use pdf_rag::commands::{ask_question, process_files, show_status};
use pdf_rag::config::{Config, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "pdf-rag")]
#[command(about = "Ask questions about your PDF documents with local Ollama models")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the knowledge base (defaults to $PDF_RAG_HOME)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection, models, and chunking
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Extract, chunk, and embed documents into a new knowledge base
    Process {
        /// PDF, text, or Markdown files to process
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Ask a question about the processed documents
    Ask {
        question: String,
        /// Number of chunks to retrieve as context
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Show the state of the knowledge base and Ollama models
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let base_dir = match cli.data_dir {
        Some(dir) => dir,
        None => Config::default_dir()?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&Config::load(&base_dir)?);
            } else {
                run_interactive_config(&base_dir)?;
            }
        }
        Commands::Process { files } => {
            process_files(&Config::load(&base_dir)?, &files)?;
        }
        Commands::Ask { question, top_k } => {
            ask_question(&Config::load(&base_dir)?, &question, top_k)?;
        }
        Commands::Status => {
            show_status(&Config::load(&base_dir)?)?;
        }
    }

    Ok(())
}
