pub mod application;
pub mod cli;
pub mod connector;
pub mod domain;

pub use cli::Commands;

pub use application::{
    ChatOrchestrator, ChatTransport, CompletionGateway, CompletionProvider, CompletionRequest,
    ConversationStore, FileUploadService, FragmentStream, PdfTextExtractor, PendingFile,
    SamplingSettings,
};

pub use connector::api::{Container, ContainerConfig, Router};
pub use connector::{
    HayroPdfExtractor, HttpChatTransport, MockCompletionProvider, OpenAiCompletionProvider,
};

pub use domain::{
    Attachment, AttachmentKind, ChatRequest, DomainError, ErrorBody, HistoryEntry, Message,
    PromptMessage, ProviderFailure, Role, UploadLimits, UploadRejection,
};
