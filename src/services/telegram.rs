use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::{NotifyError, TelegramError},
    models::OwnerId,
    services::notifier::Notifier,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimal Telegram Bot API client.
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    base_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
        timeout: Duration,
    ) -> Result<T, TelegramError> {
        let res = self
            .http
            .post(self.method_url(method))
            .json(&body)
            .timeout(timeout)
            .send()
            .await?;

        // Telegram reports failures in the body as well as via status.
        let envelope = res.json::<ApiResponse<T>>().await?;
        if !envelope.ok {
            return Err(TelegramError::Api(
                envelope
                    .description
                    .unwrap_or_else(|| format!("{method} failed")),
            ));
        }

        envelope
            .result
            .ok_or_else(|| TelegramError::Api(format!("{method} returned no result")))
    }

    pub async fn get_me(&self) -> Result<BotUser, TelegramError> {
        self.call("getMe", json!({}), REQUEST_TIMEOUT).await
    }

    pub async fn set_my_commands(&self, commands: &[(&str, &str)]) -> Result<(), TelegramError> {
        let commands: Vec<BotCommand> = commands
            .iter()
            .map(|(command, description)| BotCommand {
                command: command.to_string(),
                description: description.to_string(),
            })
            .collect();

        let _: bool = self
            .call("setMyCommands", json!({ "commands": commands }), REQUEST_TIMEOUT)
            .await?;
        Ok(())
    }

    /// Long-polls for updates after `offset`.
    pub async fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>, TelegramError> {
        let body = json!({
            "offset": offset,
            "timeout": timeout.as_secs(),
            "allowed_updates": ["message"],
        });
        self.call("getUpdates", body, timeout + REQUEST_TIMEOUT).await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        let body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });
        let _: Message = self.call("sendMessage", body, REQUEST_TIMEOUT).await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn send(&self, owner: OwnerId, text: &str) -> Result<(), NotifyError> {
        self.send_message(owner, text).await.map_err(NotifyError::from)
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct BotCommand {
    command: String,
    description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotUser {
    pub id: i64,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}
