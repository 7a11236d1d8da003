use std::path::PathBuf;

use console::style;
use tracing::info;

use crate::Result;
use crate::config::Config;
use crate::embeddings::OllamaEmbedder;
use crate::generation::OllamaGenerator;
use crate::ollama::OllamaClient;
use crate::pipeline::{self, SNIPPET_CHARS};
use crate::store::check_consistency;

/// Build the knowledge base from `files`
#[inline]
pub fn process_files(config: &Config, files: &[PathBuf]) -> Result<()> {
    let embedder = OllamaEmbedder::connect(&config.ollama)?;
    let report = pipeline::process_documents(config, &embedder, files)?;

    println!(
        "{} Processed {} documents into {} chunks ({} dimensions) in {:.1?}",
        style("✓").green(),
        report.documents,
        report.chunks,
        report.dimension,
        report.elapsed
    );
    println!("   Build: {}", report.build_id);
    println!("   Data:  {}", config.data_dir().display());
    Ok(())
}

/// Answer `question` and print the answer with its sources
#[inline]
pub fn ask_question(config: &Config, question: &str, top_k: Option<usize>) -> Result<()> {
    // Fail on a missing index before contacting any model
    pipeline::require_index(config)?;

    let embedder = OllamaEmbedder::connect(&config.ollama)?;
    let generator = OllamaGenerator::connect(&config.ollama, &config.generation)?;
    let k = top_k.unwrap_or(config.retrieval.top_k);
    info!("Answering question with top_k = {}", k);

    let answer = pipeline::ask(config, &embedder, &generator, question, k)?;

    println!("{}", style("Answer:").bold().cyan());
    println!("{}", answer.text);
    println!();
    println!("{}", style("Sources:").bold().yellow());
    for (rank, (source, snippet)) in answer
        .sources
        .iter()
        .zip(answer.snippets(SNIPPET_CHARS))
        .enumerate()
    {
        println!(
            "{}. [chunk {}, score {:.3}] {}...",
            rank + 1,
            source.position,
            source.score,
            snippet
        );
    }
    Ok(())
}

/// Print the state of the stored knowledge base and the Ollama server
#[inline]
pub fn show_status(config: &Config) -> Result<()> {
    println!("📊 PDF RAG Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🤖 Ollama Status:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => {
            for model in [&config.ollama.model, &config.generation.model] {
                match client.validate_model(model) {
                    Ok(()) => println!("   ✅ {}: available", model),
                    Err(e) => println!("   ⚠️  {}: {:#}", model, e),
                }
            }
        }
        Err(e) => println!("   ❌ Ollama: invalid configuration - {:#}", e),
    }

    println!();
    println!("🗂️  Knowledge Base ({}):", config.data_dir().display());
    let report = check_consistency(&config.store_paths())?;

    let show = |label: &str, value: Option<usize>| match value {
        Some(value) => println!("   {}: {}", label, value),
        None => println!("   {}: -", label),
    };
    show("Chunks", report.chunk_count);
    show("Stored vectors", report.vector_rows);
    show("Indexed vectors", report.index_vectors);
    show("Dimension", report.index_dimension);
    if let Some(model) = &report.embedding_model {
        println!("   Embedding model: {}", model);
    }

    println!();
    if report.is_consistent {
        println!("   ✅ {}", report.summary());
    } else {
        println!("   ❌ {}", report.summary());
        for issue in &report.issues {
            println!("      - {}", issue);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RagError;
    use tempfile::TempDir;

    fn offline_config(temp_dir: &TempDir) -> Config {
        let mut config = Config::with_base_dir(temp_dir.path());
        config.ollama.host = "127.0.0.1".to_string();
        config.ollama.port = 9;
        config
    }

    #[test]
    fn ask_without_index_reports_missing_index() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let config = offline_config(&temp_dir);

        let result = ask_question(&config, "what?", None);
        assert!(matches!(result, Err(RagError::IndexNotFound(_))));
    }

    #[test]
    fn process_without_server_reports_embedding_unavailable() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let config = offline_config(&temp_dir);

        let result = process_files(&config, &[temp_dir.path().join("doc.txt")]);
        assert!(matches!(result, Err(RagError::EmbeddingUnavailable(_))));
    }

    #[test]
    fn status_works_without_server_or_index() {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let config = offline_config(&temp_dir);

        assert!(show_status(&config).is_ok());
    }
}
