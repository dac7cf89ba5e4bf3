//! Platform-neutral message and media types.
//!
//! The Telegram adapter maps raw updates into these before handing them to
//! the pipeline, so the core never depends on a platform SDK.

use serde::{Deserialize, Serialize};

/// Kind of relayable media attached to a channel post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Document,
    Animation,
}

impl MediaKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Document => "document",
            Self::Animation => "animation",
        }
    }
}

/// Media attachment metadata as provided by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInfo {
    pub kind: MediaKind,
    /// Transport handle used to fetch the payload bytes.
    pub file_id: String,
    /// Transport identifier that is stable across re-uploads of the same
    /// content. Absent on transports that do not provide one.
    pub file_unique_id: Option<String>,
    pub file_size: Option<u64>,
    /// Transport handle of the preview image, when one exists.
    pub preview_file_id: Option<String>,
}

/// A single button of an inline keyboard attached to a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardButton {
    pub text: String,
    pub url: Option<String>,
}

/// Inline keyboard rows attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<KeyboardButton>>,
}

impl InlineKeyboard {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }
}

/// An inbound post from a source channel, as seen by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPost {
    /// Chat id of the source channel.
    pub source: i64,
    /// Message id within the source channel.
    pub message_id: i32,
    pub media: Option<MediaInfo>,
    pub caption: Option<String>,
    /// Public handle of the source channel, for caption templating.
    pub source_handle: Option<String>,
    pub reply_markup: Option<InlineKeyboard>,
}
