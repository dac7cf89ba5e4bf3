//! The forwarding pipeline: per-message orchestration of caption
//! sanitization, duplicate suppression, rate limiting, and delivery.
//!
//! Everything here is platform-neutral; the Telegram adapter feeds
//! [`tgrelay_common::types::ChannelPost`] values in through the bounded
//! worker queue and provides the [`MediaDelivery`]/[`MediaSource`]
//! implementations.

pub mod admin;
pub mod dedup;
pub mod delivery;
pub mod pipeline;
pub mod rate;
pub mod runtime;
pub mod sanitize;
pub mod worker;

pub use {
    admin::{AdminCommand, ControlPlane},
    dedup::{DedupEngine, Decision},
    delivery::{DeliveryError, MediaDelivery, MediaSource},
    pipeline::{FailureReason, Outcome, RelayPipeline, SkipReason},
    rate::{FixedWindow, Gate},
    runtime::{RuntimeState, StatsSnapshot},
    worker::{RelayHandle, start_workers},
};
