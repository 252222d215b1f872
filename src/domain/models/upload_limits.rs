pub const MAX_FILES: usize = 5;
pub const MAX_FILE_SIZE: u64 = 4 * 1024 * 1024;
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// MIME types accepted for upload with the file extensions that imply them.
pub const ACCEPTED_FILE_TYPES: &[(&str, &[&str])] = &[
    ("image/jpeg", &[".jpg", ".jpeg"]),
    ("image/png", &[".png"]),
    ("image/gif", &[".gif"]),
    ("application/pdf", &[".pdf"]),
    ("text/plain", &[".txt"]),
    ("text/markdown", &[".md"]),
    ("text/csv", &[".csv"]),
    ("application/json", &[".json"]),
    ("application/msword", &[".doc"]),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        &[".docx"],
    ),
];

/// Fixed constraints applied to every upload batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadLimits {
    max_files: usize,
    max_file_size: u64,
}

impl UploadLimits {
    pub fn new(max_files: usize, max_file_size: u64) -> Self {
        Self {
            max_files,
            max_file_size,
        }
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// A file passes when its MIME type is listed or its name carries a listed extension.
    pub fn accepts(&self, name: &str, mime_type: &str) -> bool {
        let lower = name.to_lowercase();
        ACCEPTED_FILE_TYPES.iter().any(|(mime, extensions)| {
            *mime == mime_type || extensions.iter().any(|ext| lower.ends_with(ext))
        })
    }
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self::new(MAX_FILES, MAX_FILE_SIZE)
    }
}

/// Guesses a MIME type from a file name using the accepted-type table.
pub fn mime_type_for_name(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    ACCEPTED_FILE_TYPES
        .iter()
        .find(|(_, extensions)| extensions.iter().any(|ext| lower.ends_with(ext)))
        .map(|(mime, _)| *mime)
        .unwrap_or(FALLBACK_MIME_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_by_mime_or_extension() {
        let limits = UploadLimits::default();
        assert!(limits.accepts("notes", "text/plain"));
        assert!(limits.accepts("REPORT.PDF", FALLBACK_MIME_TYPE));
        assert!(!limits.accepts("tool.exe", FALLBACK_MIME_TYPE));
    }

    #[test]
    fn mime_type_guess_prefers_table() {
        assert_eq!(mime_type_for_name("photo.JPEG"), "image/jpeg");
        assert_eq!(
            mime_type_for_name("cv.docx"),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(mime_type_for_name("archive.zip"), FALLBACK_MIME_TYPE);
    }
}
