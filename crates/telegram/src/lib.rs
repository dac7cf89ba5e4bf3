//! Telegram adapter for the relay pipeline.
//!
//! A thin shim over teloxide: the long-polling loop maps channel posts into
//! platform-neutral [`tgrelay_common::types::ChannelPost`] values and feeds
//! the pipeline's intake queue; [`outbound::TelegramRelay`] implements the
//! delivery and media-access seams; admin DMs are parsed into the closed
//! command set. No relay logic lives here.

pub mod bot;
pub mod handlers;
pub mod markup;
pub mod outbound;

pub use {
    bot::{connect, notify_admins, spawn_polling},
    outbound::TelegramRelay,
};
