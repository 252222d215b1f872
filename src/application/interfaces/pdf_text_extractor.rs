use crate::domain::DomainError;

/// Turns the bytes of a PDF document into plain text.
pub trait PdfTextExtractor: Send + Sync {
    fn extract_text(&self, data: &[u8]) -> Result<String, DomainError>;
}
