use crate::foundation::error::{InkreelError, InkreelResult};

const DOCUMENT_EXTS: [&str; 9] = ["doc", "docx", "ppt", "pptx", "xls", "xlsx", "txt", "csv", "rtf"];
const IMAGE_EXTS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "gif"];

/// What kind of artifact a session reviews.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Multi-page PDF, rasterized and stitched into one tall image.
    Pdf,
    /// Single raster image.
    Image,
    /// Office or text document: download-only, no markup.
    Document,
}

impl ArtifactKind {
    /// Classify an uploaded file by its extension (case-insensitive).
    pub fn from_file_name(name: &str) -> InkreelResult<Self> {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .ok_or_else(|| {
                InkreelError::validation(format!("'{name}' has no file extension"))
            })?;
        if ext == "pdf" {
            Ok(Self::Pdf)
        } else if DOCUMENT_EXTS.contains(&ext.as_str()) {
            Ok(Self::Document)
        } else if IMAGE_EXTS.contains(&ext.as_str()) {
            Ok(Self::Image)
        } else {
            Err(InkreelError::validation(format!(
                "unsupported artifact type '.{ext}'"
            )))
        }
    }

    /// Whether reviewers can draw on this kind of artifact.
    pub fn supports_markup(self) -> bool {
        !matches!(self, Self::Document)
    }

    /// Lowercase name as stored in session records.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Document => "document",
        }
    }

    /// Parse the stored name.
    pub fn parse(s: &str) -> InkreelResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "image" => Ok(Self::Image),
            "document" => Ok(Self::Document),
            other => Err(InkreelError::validation(format!(
                "unknown artifact kind '{other}'"
            ))),
        }
    }
}

/// Upload content type for a file name, falling back to `application/octet-stream`.
pub fn content_type_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "rtf" => "application/rtf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "webm" => "video/webm",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
#[path = "../../tests/unit/artifact/kind.rs"]
mod tests;
