use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shared::{
    domain::{ChatId, MessageHandle},
    protocol::ViewMessage,
};
use url::Url;

use crate::ChatTransport;

/// Client for a Telegram-style Bot HTTP API.
#[derive(Clone)]
pub struct BotApiTransport {
    http: Client,
    api_base: Url,
}

#[derive(Debug, Serialize)]
struct InlineButton<'a> {
    text: &'a str,
    callback_data: &'a str,
}

#[derive(Debug, Serialize)]
struct InlineKeyboard<'a> {
    inline_keyboard: Vec<Vec<InlineButton<'a>>>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<InlineKeyboard<'a>>,
}

#[derive(Debug, Serialize)]
struct DeleteMessageRequest {
    chat_id: i64,
    message_id: i64,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[derive(Debug, Deserialize)]
struct BotApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

impl BotApiTransport {
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        // Tokens contain a colon, so they cannot go through `Url::join`.
        let api_base = Url::parse(&format!("{}/bot{token}/", api_url.trim_end_matches('/')))
            .with_context(|| format!("invalid bot api url '{api_url}'"))?;
        Ok(Self {
            http: Client::new(),
            api_base,
        })
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.api_base.join(method)?;
        let response: BotApiResponse<T> = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("bot api {method} request failed"))?
            .json()
            .await
            .with_context(|| format!("bot api {method} returned an unreadable body"))?;

        if !response.ok {
            return Err(anyhow!(
                "bot api {method} rejected: {}",
                response.description.unwrap_or_else(|| "no description".into())
            ));
        }
        response
            .result
            .ok_or_else(|| anyhow!("bot api {method} returned no result"))
    }

    async fn send_message(&self, chat_id: ChatId, message: &ViewMessage) -> Result<MessageHandle> {
        let reply_markup = (!message.keyboard.is_empty()).then(|| InlineKeyboard {
            inline_keyboard: message
                .keyboard
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|button| InlineButton {
                            text: &button.label,
                            callback_data: &button.callback_data,
                        })
                        .collect()
                })
                .collect(),
        });

        let sent: SentMessage = self
            .call(
                "sendMessage",
                &SendMessageRequest {
                    chat_id: chat_id.0,
                    text: &message.text,
                    reply_markup,
                },
            )
            .await?;
        Ok(MessageHandle(sent.message_id))
    }
}

#[async_trait]
impl ChatTransport for BotApiTransport {
    async fn send_rendered_view(
        &self,
        chat_id: ChatId,
        message: &ViewMessage,
    ) -> Result<MessageHandle> {
        self.send_message(chat_id, message).await
    }

    async fn delete_message(&self, chat_id: ChatId, handle: MessageHandle) -> Result<()> {
        let _: bool = self
            .call(
                "deleteMessage",
                &DeleteMessageRequest {
                    chat_id: chat_id.0,
                    message_id: handle.0,
                },
            )
            .await?;
        Ok(())
    }

    async fn send_to_channel(
        &self,
        channel_id: ChatId,
        message: &ViewMessage,
    ) -> Result<MessageHandle> {
        self.send_message(channel_id, message).await
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
