/// Convenience result type used across inkreel.
pub type InkreelResult<T> = Result<T, InkreelError>;

/// Why a URL-ingested artifact could not be fetched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// The source document does not exist.
    NotFound,
    /// The document exists but is not shared publicly.
    PrivateDocument,
    /// The exported artifact exceeds the size limit.
    TooLarge,
    /// The capture service asked us to back off.
    RateLimited,
    /// Anything else.
    Failed,
}

impl FetchErrorKind {
    /// Message shown to the sender for this failure class.
    pub fn user_message(self) -> &'static str {
        match self {
            Self::NotFound => "Document not found. Check the URL and try again.",
            Self::PrivateDocument => {
                "This document is not publicly shared. Change sharing to 'Anyone with the link' and try again."
            }
            Self::TooLarge => "The exported document is too large (max 50 MB).",
            Self::RateLimited => "Too many requests. Please wait a moment and try again.",
            Self::Failed => "Failed to fetch the artifact. Check the URL and try again.",
        }
    }
}

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum InkreelError {
    /// Invalid caller-provided data or an illegal state transition.
    #[error("validation error: {0}")]
    Validation(String),

    /// Camera or microphone access was denied by the user.
    #[error("permission error: {0}")]
    Permission(String),

    /// No usable capture device, or the device failed while acquiring.
    #[error("device error: {0}")]
    Device(String),

    /// The platform encoder could not start or failed mid-recording.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Upload to the storage or record collaborator failed.
    #[error("upload error: {0}")]
    Upload(String),

    /// The transcription collaborator reported a failure.
    #[error("transcription error: {0}")]
    Transcription(String),

    /// URL ingestion failed.
    #[error("artifact fetch error: {message}")]
    ArtifactFetch {
        /// Failure class.
        kind: FetchErrorKind,
        /// Diagnostic detail (not shown to users).
        message: String,
    },

    /// Rasterization or compositing failed.
    #[error("render error: {0}")]
    Render(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl InkreelError {
    /// Build an [`InkreelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build an [`InkreelError::Permission`] value.
    pub fn permission(msg: impl Into<String>) -> Self {
        Self::Permission(msg.into())
    }

    /// Build an [`InkreelError::Device`] value.
    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    /// Build an [`InkreelError::Encoding`] value.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Build an [`InkreelError::Upload`] value.
    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    /// Build an [`InkreelError::Transcription`] value.
    pub fn transcription(msg: impl Into<String>) -> Self {
        Self::Transcription(msg.into())
    }

    /// Build an [`InkreelError::ArtifactFetch`] value.
    pub fn fetch(kind: FetchErrorKind, msg: impl Into<String>) -> Self {
        Self::ArtifactFetch {
            kind,
            message: msg.into(),
        }
    }

    /// Build an [`InkreelError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build an [`InkreelError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Human-readable cause suitable for display in the review UI.
    pub fn user_message(&self) -> String {
        match self {
            Self::Permission(_) => {
                "Camera and microphone access is required to record feedback.".to_string()
            }
            Self::Device(_) => "Could not access camera or microphone.".to_string(),
            Self::Encoding(_) => "Recording failed unexpectedly.".to_string(),
            Self::Upload(msg) => format!("Upload failed: {msg}"),
            Self::Transcription(_) => "Transcript unavailable.".to_string(),
            Self::ArtifactFetch { kind, .. } => kind.user_message().to_string(),
            other => other.to_string(),
        }
    }

    /// `true` for failures the user can retry without re-recording.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upload(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
