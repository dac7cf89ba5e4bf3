//! Bot connection and the long-polling intake loop.

use std::{sync::Arc, time::Duration};

use {
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, ChatId, UpdateKind},
    },
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use {
    tgrelay_config::TelegramConfig,
    tgrelay_pipeline::{ControlPlane, RelayHandle},
};

use crate::handlers;

/// Build the bot client and verify the credentials.
///
/// The HTTP client timeout is kept above the long-polling timeout (30s) so
/// the client never aborts a request Telegram is still holding open.
pub async fn connect(cfg: &TelegramConfig) -> anyhow::Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(45))
        .build()?;
    let bot = Bot::with_client(cfg.token.expose_secret(), client);

    let me = bot.get_me().await?;
    // Delete any existing webhook so long polling works.
    bot.delete_webhook().send().await?;
    info!(username = ?me.username, "telegram bot connected (webhook cleared)");

    Ok(bot)
}

/// Best-effort notice to the configured admins (startup/shutdown).
pub async fn notify_admins(bot: &Bot, cfg: &TelegramConfig, text: &str) {
    if !cfg.notify_admin {
        return;
    }
    for admin_id in &cfg.admin_ids {
        if let Err(e) = bot.send_message(ChatId(*admin_id), text).await {
            warn!(admin_id, error = %e, "failed to notify admin");
        }
    }
}

/// Spawn the manual polling loop.
///
/// Channel posts from `sources` are mapped and fed to the pipeline intake;
/// private messages go to the admin command surface. The loop exits on
/// cancellation, or cancels the token itself when another bot instance
/// claims the same token.
pub fn spawn_polling(
    bot: Bot,
    sources: Vec<i64>,
    cfg: TelegramConfig,
    handle: RelayHandle,
    control: Arc<ControlPlane>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("starting telegram polling loop");
        let mut offset: i32 = 0;

        loop {
            if cancel.is_cancelled() {
                info!("telegram polling stopped");
                break;
            }

            let request = bot
                .get_updates()
                .offset(offset)
                .timeout(30)
                .allowed_updates(vec![AllowedUpdate::ChannelPost, AllowedUpdate::Message]);
            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = request.send() => result,
            };

            match result {
                Ok(updates) => {
                    debug!(count = updates.len(), "got telegram updates");
                    for update in updates {
                        offset = update.id.as_offset();
                        match update.kind {
                            UpdateKind::ChannelPost(msg) => {
                                if !sources.contains(&msg.chat.id.0) {
                                    debug!(
                                        chat_id = msg.chat.id.0,
                                        "ignoring post from unconfigured channel"
                                    );
                                    continue;
                                }
                                handlers::handle_channel_post(&msg, &handle);
                            },
                            UpdateKind::Message(msg) => {
                                if msg.chat.is_private() {
                                    handlers::handle_private_message(
                                        &bot,
                                        &msg,
                                        &cfg.admin_ids,
                                        &control,
                                    )
                                    .await;
                                }
                            },
                            other => {
                                debug!("ignoring update: {other:?}");
                            },
                        }
                    }
                },
                Err(e) => {
                    // Another instance polling with the same token is fatal
                    // for this loop; let the process-level shutdown run.
                    if matches!(&e, RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) {
                        error!(
                            "another bot instance is polling with this token, shutting down intake"
                        );
                        cancel.cancel();
                        break;
                    }

                    warn!(error = %e, "telegram getUpdates failed");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                },
            }
        }
    })
}
