use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::application::PdfTextExtractor;
use crate::domain::{
    mime_type_for_name, Attachment, DomainError, UploadLimits, UploadRejection, PDF_MIME_TYPE,
};

/// A file picked for upload but not yet read into an attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    name: String,
    mime_type: String,
    data: Vec<u8>,
}

impl PendingFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Like [`PendingFile::new`] with the MIME type guessed from the name.
    pub fn guess_type(name: impl Into<String>, data: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = mime_type_for_name(&name);
        Self::new(name, mime_type, data)
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| DomainError::invalid_input(format!("not a file: {}", path.display())))?;
        let data = tokio::fs::read(path).await?;
        Ok(Self::guess_type(name, data))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Keeps the list of files attached to the next message.
///
/// A batch is checked as a whole before anything is read; a rejected batch
/// leaves the list untouched.
pub struct FileUploadService {
    limits: UploadLimits,
    extractor: Arc<dyn PdfTextExtractor>,
    files: Mutex<Vec<Attachment>>,
}

impl FileUploadService {
    pub fn new(extractor: Arc<dyn PdfTextExtractor>) -> Self {
        Self::with_limits(extractor, UploadLimits::default())
    }

    pub fn with_limits(extractor: Arc<dyn PdfTextExtractor>, limits: UploadLimits) -> Self {
        Self {
            limits,
            extractor,
            files: Mutex::new(Vec::new()),
        }
    }

    pub async fn upload(&self, batch: Vec<PendingFile>) -> Result<Vec<Attachment>, DomainError> {
        let mut files = self.files.lock().await;

        if let Err(rejection) = self.validate(files.len(), &batch) {
            warn!("Upload rejected: {}", rejection);
            return Err(rejection.into());
        }

        let mut uploaded = Vec::with_capacity(batch.len());
        for file in batch {
            uploaded.push(self.read_file(file).await?);
        }

        files.extend(uploaded.iter().cloned());
        info!(
            "{} file{} uploaded successfully",
            uploaded.len(),
            if uploaded.len() == 1 { "" } else { "s" }
        );

        Ok(uploaded)
    }

    pub async fn remove(&self, id: &str) -> bool {
        let mut files = self.files.lock().await;
        let before = files.len();
        files.retain(|f| f.id() != id);
        before != files.len()
    }

    pub async fn clear(&self) {
        self.files.lock().await.clear();
    }

    pub async fn files(&self) -> Vec<Attachment> {
        self.files.lock().await.clone()
    }

    fn validate(&self, current: usize, batch: &[PendingFile]) -> Result<(), UploadRejection> {
        if current + batch.len() > self.limits.max_files() {
            return Err(UploadRejection::TooManyFiles {
                max: self.limits.max_files(),
            });
        }

        for file in batch {
            if file.size() > self.limits.max_file_size() {
                return Err(UploadRejection::FileTooLarge {
                    name: file.name.clone(),
                    max_bytes: self.limits.max_file_size(),
                });
            }

            if !self.limits.accepts(&file.name, &file.mime_type) {
                return Err(UploadRejection::UnsupportedType {
                    name: file.name.clone(),
                });
            }
        }

        Ok(())
    }

    async fn read_file(&self, file: PendingFile) -> Result<Attachment, DomainError> {
        let mut attachment = Attachment::from_bytes(&file.name, &file.mime_type, &file.data);

        if attachment.is_image() {
            let preview = attachment.content().to_string();
            attachment = attachment.with_preview(preview);
        }

        if file.mime_type == PDF_MIME_TYPE {
            debug!("Processing PDF file {} ({} bytes)", file.name, file.size());
            let text = self.extract_pdf(&file.name, file.data).await?;
            debug!("Extracted {} characters from {}", text.chars().count(), file.name);
            attachment = attachment.with_parsed_content(text);
        }

        Ok(attachment)
    }

    async fn extract_pdf(&self, name: &str, data: Vec<u8>) -> Result<String, DomainError> {
        let extractor = Arc::clone(&self.extractor);
        tokio::task::spawn_blocking(move || extractor.extract_text(&data))
            .await
            .map_err(|e| DomainError::internal(format!("PDF extraction task failed: {e}")))?
            .map_err(|e| DomainError::parse(format!("Failed to process PDF file {name}: {e}")))
    }
}
