use std::time::Duration;
use thiserror::Error;

/// Failure taxonomy shared by every media operation.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Unreadable video: {0}")]
    UnreadableMedia(String),

    #[error("Video decode failed: {0}")]
    DecodeError(String),

    #[error("Unreadable image: {0}")]
    UnreadableImage(String),

    #[error("Invalid time range: {0}")]
    InvalidRange(String),

    #[error("Resource limit exceeded: {0}")]
    ResourceExhausted(String),

    #[error("Operation timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable, transport-independent classification of a [`MediaError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnreadableMedia,
    DecodeError,
    UnreadableImage,
    InvalidRange,
    ResourceExhausted,
    TimedOut,
    Cancelled,
    Internal,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::UnreadableMedia => "unreadable_media",
            ErrorKind::DecodeError => "decode_error",
            ErrorKind::UnreadableImage => "unreadable_image",
            ErrorKind::InvalidRange => "invalid_range",
            ErrorKind::ResourceExhausted => "resource_exhausted",
            ErrorKind::TimedOut => "timed_out",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal",
        }
    }
}

impl MediaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MediaError::UnreadableMedia(_) => ErrorKind::UnreadableMedia,
            MediaError::DecodeError(_) => ErrorKind::DecodeError,
            MediaError::UnreadableImage(_) => ErrorKind::UnreadableImage,
            MediaError::InvalidRange(_) => ErrorKind::InvalidRange,
            MediaError::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            MediaError::TimedOut(_) => ErrorKind::TimedOut,
            MediaError::Cancelled => ErrorKind::Cancelled,
            MediaError::Archive(_) | MediaError::Io(_) => ErrorKind::Internal,
        }
    }

    /// Message suitable for showing to the person who submitted the request.
    pub fn user_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::UnreadableMedia => {
                "Could not read the video. Try an MP4 file encoded with H.264."
            }
            ErrorKind::DecodeError => "The video stream is damaged and could not be decoded.",
            ErrorKind::UnreadableImage => "The file is not a supported image.",
            ErrorKind::InvalidRange => "The requested start, end or interval is not valid.",
            ErrorKind::ResourceExhausted => "The request is too large to process.",
            ErrorKind::TimedOut => "Processing took too long and was stopped.",
            ErrorKind::Cancelled => "Processing was cancelled.",
            ErrorKind::Internal => "An internal error occurred while building the result.",
        }
    }
}

impl From<image::ImageError> for MediaError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Limits(e) => MediaError::ResourceExhausted(e.to_string()),
            other => MediaError::UnreadableImage(other.to_string()),
        }
    }
}

pub type MediaResult<T> = std::result::Result<T, MediaError>;
