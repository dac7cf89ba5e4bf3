//! Per-message orchestration: gate, sanitize, dedup, deliver, account.

use std::{
    collections::HashSet,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use tracing::{debug, info, warn};

use {
    tgrelay_common::types::{ChannelPost, MediaInfo},
    tgrelay_config::RelayConfig,
    tgrelay_store::{FingerprintStore, MediaIdentity},
};

use crate::{
    dedup::{Decision, DedupEngine},
    delivery::{DeliveryError, MediaDelivery, MediaSource},
    rate::{FixedWindow, Gate},
    runtime::RuntimeState,
    sanitize,
};

/// Result of processing one inbound post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Delivered to the target channel.
    Forwarded { target_message_id: i64 },
    /// Duplicate media; suppressed.
    Suppressed,
    /// Not eligible for processing.
    Skipped(SkipReason),
    /// Rejected by the delivery rate gate.
    RateLimited,
    /// Eligible but undeliverable this pass.
    Failed(FailureReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The post did not originate from a configured source channel.
    ForeignChannel,
    /// The relay is paused.
    Paused,
    /// No relayable media attached.
    NoMedia,
    /// The media identity could not be computed.
    IdentityUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Dedup could not be verified and the policy is fail-closed.
    StoreUnavailable,
    /// Delivery to the target channel failed after retries.
    Delivery,
}

/// The forwarding pipeline. Cheap to share behind an `Arc`; `process` is
/// safe to invoke concurrently from the worker pool.
pub struct RelayPipeline {
    sources: HashSet<i64>,
    template: String,
    use_hash: bool,
    hash_max_bytes: u64,
    fail_open: bool,
    thumbnails: bool,
    delivery_timeout: Duration,
    max_retries: u32,
    engine: DedupEngine,
    throttle: FixedWindow,
    state: Arc<RuntimeState>,
    delivery: Arc<dyn MediaDelivery>,
    media: Arc<dyn MediaSource>,
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

impl RelayPipeline {
    #[must_use]
    pub fn new(
        cfg: &RelayConfig,
        store: Arc<dyn FingerprintStore>,
        delivery: Arc<dyn MediaDelivery>,
        media: Arc<dyn MediaSource>,
        state: Arc<RuntimeState>,
    ) -> Self {
        Self {
            sources: cfg.channels.sources.iter().copied().collect(),
            template: cfg.caption_template.clone(),
            use_hash: cfg.dedup.use_hash,
            hash_max_bytes: cfg.dedup.hash_max_bytes,
            fail_open: cfg.dedup.fail_open,
            thumbnails: cfg.delivery.thumbnails,
            delivery_timeout: Duration::from_secs(cfg.delivery.timeout_secs),
            max_retries: cfg.delivery.max_retries,
            engine: DedupEngine::new(store),
            throttle: FixedWindow::per_minute(cfg.rate_limit_per_minute),
            state,
            delivery,
            media,
        }
    }

    #[must_use]
    pub fn state(&self) -> Arc<RuntimeState> {
        Arc::clone(&self.state)
    }

    /// True once initialization finished and the fingerprint store answers.
    pub async fn is_healthy(&self) -> bool {
        self.state.is_ready() && self.engine.store_reachable().await
    }

    /// Process one inbound post. Never panics and never returns an error:
    /// every failure mode is folded into an [`Outcome`] and counted.
    pub async fn process(&self, post: &ChannelPost) -> Outcome {
        if !self.sources.contains(&post.source) {
            self.state.note_skipped();
            return Outcome::Skipped(SkipReason::ForeignChannel);
        }
        if self.state.is_paused() {
            self.state.note_skipped();
            return Outcome::Skipped(SkipReason::Paused);
        }
        let Some(media) = &post.media else {
            self.state.note_skipped();
            return Outcome::Skipped(SkipReason::NoMedia);
        };

        if let Gate::Exhausted { retry_after } = self.throttle.try_acquire() {
            self.state.note_rate_limited();
            warn!(
                source = post.source,
                message_id = post.message_id,
                retry_after_secs = retry_after.as_secs(),
                "delivery rate limit exhausted, dropping post"
            );
            return Outcome::RateLimited;
        }

        let identity = match self.identity_for(media).await {
            Ok(identity) => identity,
            Err(e) => {
                self.state.note_skipped();
                warn!(
                    source = post.source,
                    message_id = post.message_id,
                    error = %e,
                    "cannot compute media identity, skipping"
                );
                return Outcome::Skipped(SkipReason::IdentityUnavailable);
            },
        };

        let (caption, removed_links) = sanitize::clean_caption(
            post.caption.as_deref().unwrap_or(""),
            &self.template,
            post.source_handle.as_deref(),
        );

        match self
            .engine
            .claim(&identity, post.source, now_ms(), removed_links as i64)
            .await
        {
            Decision::Duplicate { prior_target } => {
                self.state.note_duplicate_blocked();
                info!(
                    identity = %identity,
                    source = post.source,
                    ?prior_target,
                    "duplicate media suppressed"
                );
                Outcome::Suppressed
            },
            Decision::StoreDown if self.fail_open => {
                warn!(identity = %identity, "store down, fail-open: forwarding without dedup");
                self.deliver_unclaimed(post, &caption, media).await
            },
            Decision::StoreDown => {
                self.state.note_error();
                Outcome::Failed(FailureReason::StoreUnavailable)
            },
            Decision::Deliver => self.deliver_claimed(post, &caption, media, &identity).await,
        }
    }

    async fn deliver_claimed(
        &self,
        post: &ChannelPost,
        caption: &str,
        media: &MediaInfo,
        identity: &MediaIdentity,
    ) -> Outcome {
        match self.deliver_with_retries(post, caption, media).await {
            Ok(target_message_id) => {
                self.engine.finalize(identity, target_message_id).await;
                self.state.note_forwarded();
                info!(
                    identity = %identity,
                    source = post.source,
                    target_message_id,
                    "media forwarded"
                );
                Outcome::Forwarded { target_message_id }
            },
            Err(e) => {
                // Release the claim so a later sighting can deliver.
                self.engine.rollback(identity).await;
                self.state.note_error();
                warn!(identity = %identity, error = %e, "delivery failed, claim rolled back");
                Outcome::Failed(FailureReason::Delivery)
            },
        }
    }

    async fn deliver_unclaimed(
        &self,
        post: &ChannelPost,
        caption: &str,
        media: &MediaInfo,
    ) -> Outcome {
        match self.deliver_with_retries(post, caption, media).await {
            Ok(target_message_id) => {
                self.state.note_forwarded();
                Outcome::Forwarded { target_message_id }
            },
            Err(e) => {
                self.state.note_error();
                warn!(source = post.source, error = %e, "fail-open delivery failed");
                Outcome::Failed(FailureReason::Delivery)
            },
        }
    }

    async fn deliver_with_retries(
        &self,
        post: &ChannelPost,
        caption: &str,
        media: &MediaInfo,
    ) -> Result<i64, DeliveryError> {
        let thumbnail = if self.thumbnails {
            self.render_thumbnail(media).await
        } else {
            None
        };

        let mut attempt: u32 = 0;
        loop {
            let result = tokio::time::timeout(
                self.delivery_timeout,
                self.delivery.deliver(post, caption, thumbnail.clone()),
            )
            .await;

            let err = match result {
                Ok(Ok(target_message_id)) => return Ok(target_message_id),
                Ok(Err(e)) => e,
                Err(_) => DeliveryError::Timeout(self.delivery_timeout),
            };

            if !err.is_retryable() || attempt >= self.max_retries {
                return Err(err);
            }

            let backoff = err
                .retry_after()
                .unwrap_or_else(|| Duration::from_millis(500) * 2u32.saturating_pow(attempt));
            warn!(
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %err,
                "transient delivery failure, retrying"
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    async fn identity_for(&self, media: &MediaInfo) -> anyhow::Result<MediaIdentity> {
        if !self.use_hash
            && let Some(uid) = &media.file_unique_id
        {
            return Ok(MediaIdentity::TransportUnique(uid.clone()));
        }
        let bytes = self.media.content_bytes(media, self.hash_max_bytes).await?;
        Ok(MediaIdentity::hash_bytes(&bytes))
    }

    /// Best-effort thumbnail from the transport preview. Failures degrade to
    /// delivering without one.
    async fn render_thumbnail(&self, media: &MediaInfo) -> Option<Vec<u8>> {
        let bytes = match self.media.preview_bytes(media).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                debug!(error = %e, "preview fetch failed, delivering without thumbnail");
                return None;
            },
        };
        match tgrelay_media::render_thumbnail(&bytes) {
            Ok(thumbnail) => Some(thumbnail),
            Err(e) => {
                debug!(error = %e, "thumbnail render failed, delivering without thumbnail");
                None
            },
        }
    }
}
