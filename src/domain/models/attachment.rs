use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// A file attached to a user message.
///
/// `content` holds the file as a `data:<mime>;base64,...` URL, the same shape a
/// browser `FileReader` produces, so requests built elsewhere deserialize as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    id: String,
    name: String,
    size: u64,
    #[serde(rename = "type")]
    mime_type: String,
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parsed_content: Option<String>,
}

/// How an attachment is rendered into prompt text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentKind<'a> {
    Pdf { extracted_text: &'a str },
    Generic { raw_bytes: Vec<u8>, mime_type: &'a str },
}

impl Attachment {
    pub fn new(
        name: impl Into<String>,
        size: u64,
        mime_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            size,
            mime_type: mime_type.into(),
            content: content.into(),
            preview: None,
            parsed_content: None,
        }
    }

    /// Encodes `bytes` into a data URL and records their length as the size.
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        let mime_type = mime_type.into();
        let content = format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes));
        Self::new(name, bytes.len() as u64, mime_type, content)
    }

    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = Some(preview.into());
        self
    }

    pub fn with_parsed_content(mut self, text: impl Into<String>) -> Self {
        self.parsed_content = Some(text.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn parsed_content(&self) -> Option<&str> {
        self.parsed_content.as_deref()
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn kind(&self) -> AttachmentKind<'_> {
        if self.mime_type == PDF_MIME_TYPE {
            if let Some(text) = self.parsed_content.as_deref() {
                return AttachmentKind::Pdf {
                    extracted_text: text,
                };
            }
        }

        AttachmentKind::Generic {
            raw_bytes: self.decoded_bytes(),
            mime_type: &self.mime_type,
        }
    }

    /// Payload after the data URL prefix, base64-decoded when possible.
    ///
    /// Content that is not valid base64 is returned as its own bytes.
    fn decoded_bytes(&self) -> Vec<u8> {
        let payload = match self.content.strip_prefix("data:") {
            Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(rest),
            None => self.content.as_str(),
        };

        STANDARD
            .decode(payload)
            .unwrap_or_else(|_| payload.as_bytes().to_vec())
    }
}
