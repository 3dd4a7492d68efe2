use std::path::Path;

use serde::Serialize;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// What the extractor does with a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Docx,
    Text,
    Image,
    Unsupported,
}

impl FileKind {
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        if mime == PDF_MIME {
            FileKind::Pdf
        } else if mime == DOCX_MIME {
            FileKind::Docx
        } else if mime.starts_with("text/") {
            FileKind::Text
        } else if mime.starts_with("image/") {
            FileKind::Image
        } else {
            FileKind::Unsupported
        }
    }
}

/// A file received from the browser, already base64-decoded.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    /// Uses the declared MIME type, or guesses one from the file name when
    /// the browser sent nothing useful.
    pub fn new(name: impl Into<String>, declared_mime: Option<&str>, data: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = match declared_mime.map(str::trim) {
            Some(m) if !m.is_empty() && m != "application/octet-stream" => m.to_string(),
            _ => mime_guess::from_path(&name)
                .first_or_octet_stream()
                .to_string(),
        };
        UploadedFile { name, mime_type, data }
    }

    pub fn kind(&self) -> FileKind {
        FileKind::from_mime(&self.mime_type)
    }

    pub fn icon(&self) -> &'static str {
        file_icon(&self.name)
    }
}

pub fn file_icon(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "📕",
        "docx" | "doc" => "📘",
        "txt" => "📄",
        "jpg" | "jpeg" | "png" => "🖼️",
        _ => "📁",
    }
}

/// Inline preview returned to the page for one uploaded file.
#[derive(Debug, Clone, Serialize)]
pub struct FilePreview {
    pub name: String,
    pub icon: &'static str,
    pub kind: FileKind,
    /// Leading part of the extracted text, for text-like formats.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    /// `data:` URL for the embedded PDF viewer or the inline image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
}
