// Text extraction module
// Turns source documents into plain text ahead of chunking


use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tracing::{debug, warn};

use crate::{RagError, Result};

/// Extension-agnostic document reader
pub trait TextExtractor {
    fn extract(&self, path: &Path) -> Result<String>;
}

/// PDF text via `pdf-extract`, page by page
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

/// UTF-8 text and Markdown files, read verbatim
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PdfExtractor {
    #[inline]
    fn extract(&self, path: &Path) -> Result<String> {
        // pdf-extract panics on some malformed inputs
        let pages = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_by_pages(path)
        }))
        .map_err(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!("PDF parser panicked on {}: {}", path.display(), message);
            RagError::ExtractionFailed(format!("{}: {}", path.display(), message))
        })?
        .map_err(|e| RagError::ExtractionFailed(format!("{}: {}", path.display(), e)))?;

        debug!("Extracted {} pages from {}", pages.len(), path.display());
        Ok(join_pages(pages))
    }
}

impl TextExtractor for PlainTextExtractor {
    #[inline]
    fn extract(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path)
            .map_err(|e| RagError::ExtractionFailed(format!("{}: {}", path.display(), e)))
    }
}

/// Concatenate pages in order, each followed by a newline
fn join_pages(pages: Vec<String>) -> String {
    let mut text = String::with_capacity(pages.iter().map(|p| p.len() + 1).sum());
    for page in pages {
        text.push_str(&page);
        text.push('\n');
    }
    text
}

/// Choose an extractor from the file extension
#[inline]
pub fn extractor_for(path: &Path) -> Result<Box<dyn TextExtractor>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("pdf") => Ok(Box::new(PdfExtractor)),
        Some("txt" | "md" | "markdown") => Ok(Box::new(PlainTextExtractor)),
        _ => Err(RagError::ExtractionFailed(format!(
            "unsupported document type: {}",
            path.display()
        ))),
    }
}

/// Extract the text of one document
#[inline]
pub fn extract_document(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(RagError::ExtractionFailed(format!(
            "{} is not a readable file",
            path.display()
        )));
    }

    let text = extractor_for(path)?.extract(path)?;
    debug!(
        "Extracted {} characters from {}",
        text.chars().count(),
        path.display()
    );
    Ok(text)
}
