use crate::domain::conversion::PipelineError;
use async_trait::async_trait;

/// Extracts raw text from an uploaded document.
/// Abstracts the concrete parser so the pipeline can be tested without one.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the full text of the document.
    ///
    /// # Errors
    /// Returns `PipelineError::Extraction` if the document cannot be parsed.
    async fn extract(&self, document: Vec<u8>) -> Result<String, PipelineError>;
}

/// PDF text extraction via lopdf, run on the blocking pool since parsing a
/// 50 MB document is CPU-bound.
pub struct PdfTextExtractor;

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, document: Vec<u8>) -> Result<String, PipelineError> {
        tokio::task::spawn_blocking(move || extract_pdf_text(&document))
            .await
            .map_err(|e| PipelineError::Extraction(format!("extraction task failed: {e}")))?
    }
}

fn extract_pdf_text(document: &[u8]) -> Result<String, PipelineError> {
    let doc = lopdf::Document::load_mem(document)
        .map_err(|e| PipelineError::Extraction(format!("failed to parse PDF: {e}")))?;

    let mut pages: Vec<u32> = doc.get_pages().keys().cloned().collect();
    pages.sort();
    let page_count = pages.len();

    let mut full_text = String::new();
    for page_num in &pages {
        // A page that fails text extraction contributes nothing rather than
        // failing the document; scanned pages have no text layer.
        let page_text = doc.extract_text(&[*page_num]).unwrap_or_default();
        full_text.push_str(&page_text);
        if !page_text.ends_with('\n') && !page_text.is_empty() {
            full_text.push('\n');
        }
    }

    tracing::debug!(
        page_count,
        text_length = full_text.len(),
        "PDF text extracted"
    );

    Ok(full_text)
}
