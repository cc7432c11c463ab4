use std::time::Duration;

use tokio::{task::JoinHandle, time};

use crate::{controllers::bot_controller, services::telegram::TelegramClient, AppState};

const ERROR_BACKOFF: Duration = Duration::from_secs(5);

pub const BOT_COMMANDS: &[(&str, &str)] = &[
    ("start", "Start the bot"),
    ("help", "Show available commands"),
    ("guide", "Detailed usage guide"),
    ("alert", "Set price alerts: /alert HPG 25500"),
    ("list", "List your alerts"),
    ("edit", "Change an alert target: /edit HPG 26500"),
    ("remove", "Remove alerts: /remove HPG"),
    ("clear", "Remove all your alerts"),
    ("price", "Current price: /price HPG"),
];

/// Long-polls Telegram for chat messages and answers each command in its
/// own task so a slow quote lookup never stalls the poll loop.
pub fn spawn_bot_poller(state: AppState, client: TelegramClient) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut state = state;
        match client.get_me().await {
            Ok(me) => {
                tracing::info!(
                    bot_id = me.id,
                    username = me.username.as_deref().unwrap_or(&me.first_name),
                    "telegram token accepted"
                );
                state.bot_username = me.username;
            }
            Err(e) => tracing::error!(error = %e, "telegram getMe failed, check TELEGRAM_BOT_TOKEN"),
        }

        if let Err(e) = client.set_my_commands(BOT_COMMANDS).await {
            tracing::warn!(error = %e, "failed to register bot command menu");
        }

        let poll_timeout = state.settings.telegram_poll_timeout;
        let mut offset: i64 = 0;

        loop {
            let updates = match client.get_updates(offset, poll_timeout).await {
                Ok(u) => u,
                Err(e) => {
                    tracing::warn!(error = %e, "getUpdates failed, backing off");
                    time::sleep(ERROR_BACKOFF).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);

                let Some(message) = update.message else { continue };
                let Some(text) = message.text else { continue };
                let chat_id = message.chat.id;

                let state = state.clone();
                let client = client.clone();
                tokio::spawn(async move {
                    let Some(reply) = bot_controller::handle_message(&state, chat_id, &text).await else {
                        return;
                    };
                    if let Err(e) = client.send_message(chat_id, &reply).await {
                        tracing::warn!(chat_id, error = %e, "failed to send reply");
                    }
                });
            }
        }
    })
}
