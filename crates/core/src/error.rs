//! Error types for the cutout-core library.
//!
//! This module provides granular error variants for the different failure
//! modes of the editing workflow, plus the single user-facing message every
//! pipeline failure collapses into.

use thiserror::Error;

/// Message shown to the user for any failure past validation.
pub const PIPELINE_FAILURE_MESSAGE: &str = "Image processing failed, please try again";

/// Errors that can occur within the cutout-core library.
///
/// Each variant represents a specific failure mode with contextual information
/// to help diagnose and handle errors appropriately.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (missing keys, invalid values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A selection was confirmed before any source image was loaded.
    #[error("No image loaded")]
    NoImageLoaded,

    /// A manual selection mode is active but the selection is under 10x10.
    #[error("Selection is smaller than the minimum {min}x{min} pixels")]
    SelectionTooSmall {
        /// The minimum edge length in image pixels.
        min: f32,
    },

    /// The segmentation service could not be reached (connect, timeout, body read).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The segmentation service answered with a failure or malformed payload.
    #[error("Segmentation service error: {0}")]
    Service(String),

    /// The bytes returned by the service are not a decodable image.
    #[error("Failed to decode segmentation result: {0}")]
    ResultDecodeFailed(String),

    /// A newer request was issued while this one was in flight.
    ///
    /// Internal signal only; it never reaches the user.
    #[error("Result of request {request_id} discarded in favour of a newer request")]
    StaleResultDiscarded {
        /// The id of the request whose result was dropped.
        request_id: u64,
    },

    /// Image processing or encoding failed.
    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    /// A result was requested before any segmentation was published.
    #[error("No segmentation result available")]
    NoResult,

    /// The crop area rounds to zero width or height.
    #[error("Selection area is empty or invalid")]
    EmptySelection,

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an image processing error with the given message.
    pub fn image(msg: impl Into<String>) -> Self {
        Self::ImageProcessing(msg.into())
    }

    /// Creates a transport error with the given message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Creates a service error with the given message.
    pub fn service(msg: impl Into<String>) -> Self {
        Self::Service(msg.into())
    }

    /// Creates a decode error with the given message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::ResultDecodeFailed(msg.into())
    }

    /// Returns the string the view layer should display, if any.
    ///
    /// Validation failures keep their own wording. Everything that happens
    /// after a request is issued shares one generic message so transport or
    /// decoder detail never reaches the user.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::NoImageLoaded => Some("Please upload an image first"),
            Self::SelectionTooSmall { .. } => {
                Some("Selection is too small, please draw a larger area")
            }
            Self::StaleResultDiscarded { .. } => None,
            Self::NoResult => Some("There is no result to download yet"),
            _ => Some(PIPELINE_FAILURE_MESSAGE),
        }
    }

    /// Whether this error is the supersession signal.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleResultDiscarded { .. })
    }
}

/// A convenient alias for Result with [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_failures_share_one_message() {
        let errors = [
            AppError::transport("connection refused"),
            AppError::service("HTTP 500: model crashed"),
            AppError::decode("unexpected EOF"),
            AppError::image("encoder failed"),
        ];
        for err in errors {
            assert_eq!(err.user_message(), Some(PIPELINE_FAILURE_MESSAGE));
        }
    }

    #[test]
    fn stale_result_is_silent() {
        let err = AppError::StaleResultDiscarded { request_id: 3 };
        assert!(err.is_stale());
        assert_eq!(err.user_message(), None);
    }

    #[test]
    fn validation_errors_keep_their_own_wording() {
        assert_ne!(
            AppError::NoImageLoaded.user_message(),
            Some(PIPELINE_FAILURE_MESSAGE)
        );
        assert_ne!(
            AppError::SelectionTooSmall { min: 10.0 }.user_message(),
            Some(PIPELINE_FAILURE_MESSAGE)
        );
        assert_ne!(AppError::NoResult.user_message(), Some(PIPELINE_FAILURE_MESSAGE));
    }
}
