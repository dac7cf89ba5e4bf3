//! Outbound delivery to the target channel and media byte access.

use {
    async_trait::async_trait,
    teloxide::{
        RequestError,
        payloads::{
            CopyMessageSetters, SendAnimationSetters, SendDocumentSetters, SendVideoSetters,
        },
        prelude::*,
        types::{ChatId, InputFile, MessageId, ReplyMarkup},
    },
    tracing::debug,
};

use {
    tgrelay_common::types::{ChannelPost, MediaInfo, MediaKind},
    tgrelay_pipeline::{DeliveryError, MediaDelivery, MediaSource},
};

use crate::markup;

/// Delivers relayed copies to the single target channel.
pub struct TelegramRelay {
    bot: Bot,
    target: ChatId,
}

impl TelegramRelay {
    #[must_use]
    pub fn new(bot: Bot, target: i64) -> Self {
        Self {
            bot,
            target: ChatId(target),
        }
    }

    /// Copy the source message, overriding the caption (an empty caption
    /// clears whatever the original carried).
    async fn copy(
        &self,
        post: &ChannelPost,
        caption: &str,
        keyboard: Option<ReplyMarkup>,
    ) -> Result<MessageId, RequestError> {
        let mut request = self
            .bot
            .copy_message(self.target, ChatId(post.source), MessageId(post.message_id))
            .caption(caption.to_string());
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(keyboard);
        }
        request.await
    }

    /// Re-send by file id so a freshly rendered thumbnail can be attached.
    async fn send_with_thumbnail(
        &self,
        media: &MediaInfo,
        caption: &str,
        keyboard: Option<ReplyMarkup>,
        thumbnail: Vec<u8>,
    ) -> Result<MessageId, RequestError> {
        let file = InputFile::file_id(media.file_id.clone());
        let thumbnail = InputFile::memory(thumbnail).file_name("thumb.jpg");

        let message = match media.kind {
            MediaKind::Video => {
                let mut request = self
                    .bot
                    .send_video(self.target, file)
                    .caption(caption.to_string())
                    .thumbnail(thumbnail);
                if let Some(keyboard) = keyboard {
                    request = request.reply_markup(keyboard);
                }
                request.await?
            },
            MediaKind::Document => {
                let mut request = self
                    .bot
                    .send_document(self.target, file)
                    .caption(caption.to_string())
                    .thumbnail(thumbnail);
                if let Some(keyboard) = keyboard {
                    request = request.reply_markup(keyboard);
                }
                request.await?
            },
            MediaKind::Animation => {
                let mut request = self
                    .bot
                    .send_animation(self.target, file)
                    .caption(caption.to_string())
                    .thumbnail(thumbnail);
                if let Some(keyboard) = keyboard {
                    request = request.reply_markup(keyboard);
                }
                request.await?
            },
        };
        Ok(message.id)
    }

    /// Fetch a file's bytes, reading at most `limit` of them.
    async fn download(&self, file_id: &str, limit: u64) -> anyhow::Result<Vec<u8>> {
        let file = self.bot.get_file(file_id).await?;

        // Telegram file URL format: https://api.telegram.org/file/bot<token>/<path>
        let url = format!(
            "https://api.telegram.org/file/bot{}/{}",
            self.bot.token(),
            file.path
        );
        let mut response = reqwest::get(&url).await?;
        if !response.status().is_success() {
            anyhow::bail!("file download failed: HTTP {}", response.status());
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            bytes.extend_from_slice(&chunk);
            if bytes.len() as u64 >= limit {
                bytes.truncate(limit as usize);
                debug!(file_id, limit, "download capped at byte limit");
                break;
            }
        }
        Ok(bytes)
    }
}

#[async_trait]
impl MediaDelivery for TelegramRelay {
    async fn deliver(
        &self,
        post: &ChannelPost,
        caption: &str,
        thumbnail: Option<Vec<u8>>,
    ) -> Result<i64, DeliveryError> {
        let keyboard = post
            .reply_markup
            .as_ref()
            .and_then(markup::to_telegram)
            .map(ReplyMarkup::InlineKeyboard);

        let result = match (&post.media, thumbnail) {
            (Some(media), Some(thumbnail)) => {
                self.send_with_thumbnail(media, caption, keyboard, thumbnail)
                    .await
            },
            _ => self.copy(post, caption, keyboard).await,
        };

        result
            .map(|message_id| i64::from(message_id.0))
            .map_err(classify)
    }
}

#[async_trait]
impl MediaSource for TelegramRelay {
    async fn content_bytes(&self, media: &MediaInfo, limit: u64) -> anyhow::Result<Vec<u8>> {
        self.download(&media.file_id, limit).await
    }

    async fn preview_bytes(&self, media: &MediaInfo) -> anyhow::Result<Option<Vec<u8>>> {
        let Some(preview_id) = &media.preview_file_id else {
            return Ok(None);
        };
        // Previews are small; cap generously anyway.
        Ok(Some(self.download(preview_id, 4 * 1024 * 1024).await?))
    }
}

/// Split platform failures into the pipeline's retry taxonomy.
fn classify(error: RequestError) -> DeliveryError {
    match error {
        RequestError::RetryAfter(wait) => DeliveryError::Transient {
            message: "rate limited by telegram".into(),
            retry_after: Some(wait.duration()),
        },
        RequestError::Network(e) => DeliveryError::transient(format!("network error: {e}")),
        RequestError::Io(e) => DeliveryError::transient(format!("io error: {e}")),
        RequestError::InvalidJson { source, .. } => {
            DeliveryError::transient(format!("malformed api response: {source}"))
        },
        RequestError::Api(api) => DeliveryError::permanent(format!("telegram api: {api}")),
        RequestError::MigrateToChatId(chat_id) => {
            DeliveryError::permanent(format!("chat migrated to {chat_id}"))
        },
    }
}
