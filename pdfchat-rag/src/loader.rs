//! Page extraction from source documents.
//!
//! [`PdfLoader`] extracts one [`Page`] per PDF page with `pdf-extract`.
//! [`TextLoader`] treats form feeds in a plain-text file as page breaks.

use async_trait::async_trait;
use tracing::{debug, error};

use crate::document::{Document, Page};
use crate::error::{RagError, Result};

/// Turns a [`Document`] into ordered pages of text.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Extract the pages of `document`.
    ///
    /// Blank pages are kept so page numbers stay aligned with the source.
    async fn load(&self, document: &Document) -> Result<Vec<Page>>;
}

/// Extracts text from PDF files.
///
/// Extraction is CPU-bound and runs on the blocking thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfLoader;

impl PdfLoader {
    /// Create a new PDF loader.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentLoader for PdfLoader {
    async fn load(&self, document: &Document) -> Result<Vec<Page>> {
        debug!(path = %document.path.display(), bytes = document.bytes.len(), "extracting PDF");

        let bytes = document.bytes.clone();
        let texts = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| extraction_error(document, format!("extraction task failed: {e}")))?
        .map_err(|e| extraction_error(document, e))?;

        Ok(pages_from_texts(&document.source(), texts))
    }
}

/// Loads UTF-8 text files, splitting pages on form feed (`\x0C`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLoader;

impl TextLoader {
    /// Create a new text loader.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentLoader for TextLoader {
    async fn load(&self, document: &Document) -> Result<Vec<Page>> {
        let text = std::str::from_utf8(&document.bytes)
            .map_err(|e| extraction_error(document, format!("file is not valid UTF-8: {e}")))?;
        let texts = text.split('\x0C').map(str::to_string).collect();
        Ok(pages_from_texts(&document.source(), texts))
    }
}

fn extraction_error(document: &Document, message: String) -> RagError {
    error!(path = %document.path.display(), error = %message, "text extraction failed");
    RagError::ExtractionError { path: document.path.clone(), message }
}

fn pages_from_texts(source: &str, texts: Vec<String>) -> Vec<Page> {
    let total_pages = texts.len();
    texts
        .into_iter()
        .enumerate()
        .map(|(page, text)| {
            let mut page = Page::new(source, page, total_pages, text);
            page.metadata.insert("file_path".to_string(), source.to_string());
            page.metadata.insert("total_pages".to_string(), total_pages.to_string());
            page
        })
        .collect()
}
