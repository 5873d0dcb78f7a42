//! Minimal Telegram Bot API client: long polling plus the handful of
//! send/edit methods the bot renders through.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::BotError;

/// Long-poll wait passed to getUpdates.
pub const POLL_TIMEOUT_SECONDS: u64 = 30;

// Must exceed the long-poll wait or every idle poll times out client-side.
const REQUEST_TIMEOUT_SECONDS: u64 = 40;

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
    pub from: Option<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub data: Option<String>,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub resize_keyboard: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Inline(InlineKeyboardMarkup),
    Keyboard(ReplyKeyboardMarkup),
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Clone)]
pub struct Bot {
    base_url: String,
    http_client: reqwest::Client,
}

impl Bot {
    pub fn new(token: &str) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .unwrap_or_default();
        Self {
            base_url: format!("https://api.telegram.org/bot{token}"),
            http_client,
        }
    }

    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        payload: &serde_json::Value,
    ) -> Result<T, BotError> {
        let url = format!("{}/{method}", self.base_url);
        let response: ApiResponse<T> = self
            .http_client
            .post(&url)
            .json(payload)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| BotError::Parse(e.to_string()))?;

        if !response.ok {
            let description = response
                .description
                .unwrap_or_else(|| String::from("no description"));
            return Err(BotError::RemoteUnavailable(format!(
                "{method} failed: {description}"
            )));
        }
        response
            .result
            .ok_or_else(|| BotError::Parse(format!("{method}: ok response without result")))
    }

    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, BotError> {
        self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": POLL_TIMEOUT_SECONDS,
                "allowed_updates": ["message", "callback_query"],
            }),
        )
        .await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<ReplyMarkup>,
        markdown: bool,
    ) -> Result<Message, BotError> {
        let mut payload = json!({ "chat_id": chat_id, "text": text });
        if markdown {
            payload["parse_mode"] = json!("Markdown");
        }
        if let Some(markup) = markup {
            payload["reply_markup"] = to_value(&markup)?;
        }
        self.call("sendMessage", &payload).await
    }

    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
        markdown: bool,
    ) -> Result<(), BotError> {
        let mut payload = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
        });
        if markdown {
            payload["parse_mode"] = json!("Markdown");
        }
        if let Some(markup) = markup {
            payload["reply_markup"] = to_value(&markup)?;
        }
        self.call::<serde_json::Value>("editMessageText", &payload).await?;
        Ok(())
    }

    /// Swap a message's media for a photo with a Markdown caption.
    pub async fn edit_message_media(
        &self,
        chat_id: i64,
        message_id: i64,
        photo_url: &str,
        caption: &str,
    ) -> Result<(), BotError> {
        let payload = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "media": {
                "type": "photo",
                "media": photo_url,
                "caption": caption,
                "parse_mode": "Markdown",
            },
        });
        self.call::<serde_json::Value>("editMessageMedia", &payload).await?;
        Ok(())
    }

    pub async fn edit_message_reply_markup(
        &self,
        chat_id: i64,
        message_id: i64,
        markup: InlineKeyboardMarkup,
    ) -> Result<(), BotError> {
        let payload = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "reply_markup": to_value(&markup)?,
        });
        self.call::<serde_json::Value>("editMessageReplyMarkup", &payload)
            .await?;
        Ok(())
    }

    /// Release the client-side spinner on a pressed button.
    pub async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), BotError> {
        let mut payload = json!({ "callback_query_id": callback_id });
        if let Some(text) = text {
            payload["text"] = json!(text);
        }
        self.call::<serde_json::Value>("answerCallbackQuery", &payload)
            .await?;
        Ok(())
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<serde_json::Value, BotError> {
    serde_json::to_value(value).map_err(|e| BotError::Parse(e.to_string()))
}
