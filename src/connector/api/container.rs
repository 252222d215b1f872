use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::application::{
    ChatOrchestrator, ChatTransport, CompletionGateway, CompletionProvider, FileUploadService,
    PdfTextExtractor,
};
use crate::connector::adapter::{
    HayroPdfExtractor, HttpChatTransport, MockCompletionProvider, OpenAiCompletionProvider,
};

pub struct ContainerConfig {
    /// Answer with the offline echo provider instead of calling OpenAI.
    pub mock_provider: bool,
    /// Overrides `OPENAI_MODEL`.
    pub model: Option<String>,
}

pub struct Container {
    gateway: Arc<CompletionGateway>,
    pdf_extractor: Arc<dyn PdfTextExtractor>,
}

impl Container {
    pub fn new(config: ContainerConfig) -> Result<Self> {
        let provider: Arc<dyn CompletionProvider> = if config.mock_provider {
            debug!("Using mock completion provider");
            Arc::new(MockCompletionProvider::new())
        } else {
            let mut client = OpenAiCompletionProvider::from_env()?;
            if let Some(model) = &config.model {
                client = client.with_model(model.clone());
            }
            if !client.has_api_key() {
                warn!("OPENAI_API_KEY is not set; chat requests will fail until it is configured");
            }
            debug!("Using OpenAI provider at {} ({})", client.endpoint(), client.model());
            Arc::new(client)
        };

        Ok(Self {
            gateway: Arc::new(CompletionGateway::new(provider)),
            pdf_extractor: Arc::new(HayroPdfExtractor::new()),
        })
    }

    pub fn gateway(&self) -> Arc<CompletionGateway> {
        Arc::clone(&self.gateway)
    }

    pub fn pdf_extractor(&self) -> Arc<dyn PdfTextExtractor> {
        Arc::clone(&self.pdf_extractor)
    }

    pub fn upload_service(&self) -> FileUploadService {
        FileUploadService::new(self.pdf_extractor())
    }

    /// Talks to a remote server when `server` is given, otherwise relays
    /// in-process through the gateway.
    pub fn transport(&self, server: Option<&str>) -> Arc<dyn ChatTransport> {
        match server {
            Some(url) => {
                debug!("Using chat server at {}", url);
                Arc::new(HttpChatTransport::new(url))
            }
            None => self.gateway(),
        }
    }

    pub fn orchestrator(&self, server: Option<&str>) -> ChatOrchestrator {
        ChatOrchestrator::new(self.transport(server))
    }
}
