//! Update mapping and admin-command handling.

use {
    teloxide::{
        Bot,
        prelude::*,
        types::{MediaKind as TgMediaKind, Message, MessageKind},
    },
    tracing::{debug, warn},
};

use {
    tgrelay_common::types::{ChannelPost, MediaInfo, MediaKind},
    tgrelay_pipeline::{AdminCommand, ControlPlane, RelayHandle},
};

use crate::markup;

/// Map a raw channel post into the pipeline's inbound type.
///
/// Returns `None` for posts without relayable media so the polling loop can
/// drop them before they ever touch the queue.
#[must_use]
pub fn map_channel_post(msg: &Message) -> Option<ChannelPost> {
    let media = extract_media(msg)?;
    let reply_markup = msg
        .reply_markup()
        .map(markup::to_common)
        .map(|kb| markup::strip_link_buttons(&kb))
        .filter(|kb| !kb.is_empty());

    Some(ChannelPost {
        source: msg.chat.id.0,
        message_id: msg.id.0,
        media: Some(media),
        caption: msg.caption().or_else(|| msg.text()).map(str::to_string),
        source_handle: msg.chat.username().map(str::to_string),
        reply_markup,
    })
}

fn extract_media(msg: &Message) -> Option<MediaInfo> {
    let MessageKind::Common(common) = &msg.kind else {
        return None;
    };
    match &common.media_kind {
        TgMediaKind::Video(v) => Some(MediaInfo {
            kind: MediaKind::Video,
            file_id: v.video.file.id.clone(),
            file_unique_id: Some(v.video.file.unique_id.clone()),
            file_size: Some(u64::from(v.video.file.size)),
            preview_file_id: v.video.thumbnail.as_ref().map(|ps| ps.file.id.clone()),
        }),
        TgMediaKind::Document(d) => Some(MediaInfo {
            kind: MediaKind::Document,
            file_id: d.document.file.id.clone(),
            file_unique_id: Some(d.document.file.unique_id.clone()),
            file_size: Some(u64::from(d.document.file.size)),
            preview_file_id: d.document.thumbnail.as_ref().map(|ps| ps.file.id.clone()),
        }),
        TgMediaKind::Animation(a) => Some(MediaInfo {
            kind: MediaKind::Animation,
            file_id: a.animation.file.id.clone(),
            file_unique_id: Some(a.animation.file.unique_id.clone()),
            file_size: Some(u64::from(a.animation.file.size)),
            preview_file_id: a.animation.thumbnail.as_ref().map(|ps| ps.file.id.clone()),
        }),
        _ => None,
    }
}

/// Handle a post observed on a source channel.
pub fn handle_channel_post(msg: &Message, handle: &RelayHandle) {
    let Some(post) = map_channel_post(msg) else {
        debug!(
            chat_id = msg.chat.id.0,
            message_id = msg.id.0,
            "ignoring channel post without relayable media"
        );
        return;
    };
    handle.submit(post);
}

/// Handle a private message: admins get the command surface, everyone else
/// is ignored.
pub async fn handle_private_message(
    bot: &Bot,
    msg: &Message,
    admin_ids: &[i64],
    control: &ControlPlane,
) {
    let Some(user) = &msg.from else { return };
    if !admin_ids.contains(&(user.id.0 as i64)) {
        debug!(user_id = user.id.0, "ignoring message from non-admin");
        return;
    }
    let Some(command) = msg.text().and_then(AdminCommand::parse) else {
        return;
    };

    let reply = control.dispatch(command).await;
    if let Err(e) = bot.send_message(msg.chat.id, reply).await {
        warn!(chat_id = msg.chat.id.0, error = %e, "failed to send admin reply");
    }
}
