//! Error types for the Gravity relay.

use thiserror::Error;

/// Result type alias using the Gravity error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the relay.
///
/// Everything here is caught at the update-handler boundary; nothing
/// escapes to crash the process or to change the webhook status code.
#[derive(Error, Debug)]
pub enum Error {
    /// Neither a prompt nor an image was supplied
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// Completion API did not answer within the deadline
    #[error("Completion request timed out")]
    UpstreamTimeout,

    /// Completion API returned an error status or a malformed payload
    #[error("Completion API error (status {status:?}): {message}")]
    UpstreamHttp {
        status: Option<u16>,
        message: String,
    },

    /// Telegram Bot API call failed (file retrieval, keyboard send, ...)
    #[error("Telegram API error: {0}")]
    Telegram(String),

    /// Formatted send failed and the plain-text fallback failed too
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Session snapshot persistence failed
    #[error("Session store I/O error: {0}")]
    StoreIo(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the user should be told about this failure at all.
    ///
    /// Store I/O degradation is deliberately invisible: the turn continues
    /// on in-memory state and the failure is only logged.
    pub const fn is_user_visible(&self) -> bool {
        !matches!(self, Self::StoreIo(_) | Self::Config(_))
    }

    /// Short reply shown in chat for a recoverable failure, in the
    /// session's language. Unknown language codes fall back to English.
    ///
    /// Never leaks internal detail; upstream errors all collapse into the
    /// same bounded apology.
    pub fn user_message(&self, language: &str) -> &'static str {
        match (self, language) {
            (Self::MissingInput(_), "uz") => "✍️ Iltimos, matn yoki rasm yuboring.",
            (Self::MissingInput(_), _) => "✍️ Please send text or an image.",
            (Self::Telegram(_), "uz") => "❌ Rasmni qayta ishlashda xatolik yuz berdi.",
            (Self::Telegram(_), _) => "❌ Failed to process the image. Please try again.",
            (_, "uz") => "❌ Xatolik yuz berdi. Iltimos, birozdan so'ng urinib ko'ring.",
            (_, _) => "❌ Something went wrong. Please try again shortly.",
        }
    }
}
