use anyhow::{Context, Result};

use super::super::Container;

pub struct ExtractController<'a> {
    container: &'a Container,
}

impl<'a> ExtractController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn extract(&self, path: String) -> Result<String> {
        let data = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {}", path))?;

        let extractor = self.container.pdf_extractor();
        let text = tokio::task::spawn_blocking(move || extractor.extract_text(&data))
            .await?
            .with_context(|| format!("Failed to extract text from {}", path))?;

        Ok(text)
    }
}
