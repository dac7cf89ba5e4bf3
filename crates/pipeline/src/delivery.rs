//! Traits at the platform seam: outbound delivery and media byte access.
//!
//! The channel adapter owns the network client; the pipeline only sees these
//! two traits plus the typed failure split it needs for retry policy.

use std::time::Duration;

use async_trait::async_trait;

use tgrelay_common::types::{ChannelPost, MediaInfo};

/// Typed delivery failures. The transient/permanent split drives the retry
/// policy; everything else about the platform error stays in the adapter.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Retryable: network trouble, platform rate limiting.
    #[error("transient delivery failure: {message}")]
    Transient {
        message: String,
        /// Platform-suggested wait before the next attempt.
        retry_after: Option<Duration>,
    },

    /// Not retryable: the platform rejected the content.
    #[error("permanent delivery failure: {message}")]
    Permanent { message: String },

    /// The attempt exceeded the configured deadline. Treated as transient.
    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),
}

impl DeliveryError {
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            retry_after: None,
        }
    }

    #[must_use]
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Permanent { .. })
    }

    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Transient { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Send a relayed copy of `post` to the target channel.
#[async_trait]
pub trait MediaDelivery: Send + Sync {
    /// Deliver with the rewritten caption (empty string clears the caption).
    /// Returns the target-channel message id.
    async fn deliver(
        &self,
        post: &ChannelPost,
        caption: &str,
        thumbnail: Option<Vec<u8>>,
    ) -> Result<i64, DeliveryError>;
}

/// Fetch media payload/preview bytes from the transport.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Read up to `limit` bytes of the payload (for content hashing).
    async fn content_bytes(&self, media: &MediaInfo, limit: u64) -> anyhow::Result<Vec<u8>>;

    /// Read the transport's preview image, when one exists.
    async fn preview_bytes(&self, media: &MediaInfo) -> anyhow::Result<Option<Vec<u8>>>;
}
