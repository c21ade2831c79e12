//! Classification helpers for URL-ingested artifacts.
//!
//! The fetching itself (Google export, page screenshots) is done by an external service; these
//! helpers map its observable outcomes onto [`FetchErrorKind`].

use crate::foundation::error::{FetchErrorKind, InkreelError, InkreelResult};

/// Largest artifact accepted from URL ingestion.
pub const MAX_FETCH_BYTES: u64 = 50 * 1024 * 1024;

/// Which ingestion path a URL takes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceUrl {
    /// A Google Docs document, exported as PDF.
    GoogleDocs {
        /// Document id from the URL path.
        doc_id: String,
    },
    /// A Google Slides deck, exported as PDF.
    GoogleSlides {
        /// Presentation id from the URL path.
        doc_id: String,
    },
    /// Any other page, captured as a screenshot.
    Generic,
}

impl SourceUrl {
    /// PDF export URL for Google sources.
    pub fn export_url(&self) -> Option<String> {
        match self {
            SourceUrl::GoogleDocs { doc_id } => Some(format!(
                "https://docs.google.com/document/d/{doc_id}/export?format=pdf"
            )),
            SourceUrl::GoogleSlides { doc_id } => Some(format!(
                "https://docs.google.com/presentation/d/{doc_id}/export?format=pdf"
            )),
            SourceUrl::Generic => None,
        }
    }

    /// Source type stored on the session record.
    pub fn source_type(&self) -> &'static str {
        match self {
            SourceUrl::GoogleDocs { .. } => "google_docs",
            SourceUrl::GoogleSlides { .. } => "google_slides",
            SourceUrl::Generic => "url",
        }
    }
}

/// Detect Google Docs/Slides URLs. Anything else is [`SourceUrl::Generic`].
pub fn detect_source_url(url: &str) -> InkreelResult<SourceUrl> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(InkreelError::validation("A URL is required."));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(InkreelError::validation("Invalid URL format."));
    }
    if let Some(doc_id) = id_after(trimmed, "docs.google.com/document/d/") {
        return Ok(SourceUrl::GoogleDocs { doc_id });
    }
    if let Some(doc_id) = id_after(trimmed, "docs.google.com/presentation/d/") {
        return Ok(SourceUrl::GoogleSlides { doc_id });
    }
    Ok(SourceUrl::Generic)
}

fn id_after(url: &str, marker: &str) -> Option<String> {
    let start = url.find(marker)? + marker.len();
    let id: String = url[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    (!id.is_empty()).then_some(id)
}

/// Reject artifacts above [`MAX_FETCH_BYTES`].
pub fn check_fetch_size(len: u64) -> InkreelResult<()> {
    if len > MAX_FETCH_BYTES {
        return Err(InkreelError::fetch(
            FetchErrorKind::TooLarge,
            format!("artifact is {len} bytes, limit is {MAX_FETCH_BYTES}"),
        ));
    }
    Ok(())
}

/// Classify an export/capture HTTP response.
///
/// A Google export that answers with HTML instead of a PDF means the document is not shared.
pub fn classify_fetch_response(status: u16, content_type: &str) -> InkreelResult<()> {
    let kind = match status {
        404 => FetchErrorKind::NotFound,
        429 => FetchErrorKind::RateLimited,
        200..=299 if content_type.contains("text/html") => FetchErrorKind::PrivateDocument,
        200..=299 => return Ok(()),
        _ => FetchErrorKind::Failed,
    };
    Err(InkreelError::fetch(
        kind,
        format!("fetch returned status {status} ({content_type})"),
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/artifact/fetch.rs"]
mod tests;
