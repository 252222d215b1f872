use anyhow::{anyhow, Result};

use crate::application::PendingFile;

use super::super::Container;
use super::transcript::send_and_render;

pub struct AskController<'a> {
    container: &'a Container,
}

impl<'a> AskController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    /// Sends a single message and streams the answer to stdout.
    pub async fn ask(
        &self,
        message: String,
        attach: Vec<String>,
        server: Option<String>,
    ) -> Result<String> {
        let uploads = self.container.upload_service();
        if !attach.is_empty() {
            let mut batch = Vec::with_capacity(attach.len());
            for path in &attach {
                batch.push(PendingFile::from_path(path).await?);
            }
            uploads
                .upload(batch)
                .await
                .map_err(|e| anyhow!(e.user_message()))?;
        }

        let orchestrator = self.container.orchestrator(server.as_deref());
        send_and_render(&orchestrator, &message, uploads.files().await)
            .await
            .map_err(|e| anyhow!(e.user_message()))?;

        Ok(String::new())
    }
}
