//! Telegram bot flow.
//!
//! Separate from the message pipeline: webhook updates get a canned
//! reply through [`TelegramClient::send_message`].

pub mod client;
pub mod models;
pub mod replies;

pub use client::TelegramClient;
pub use models::{SendMessageRequest, TelegramChat, TelegramMessage, TelegramUpdate, TelegramUser};
pub use replies::reply_for;

use crate::error::Outcome;

/// Path the bot's webhook is served under.
pub const WEBHOOK_PATH: &str = "/telegram/webhook";

/// Handle one webhook update, replying if the message calls for it.
pub async fn process_update(client: &TelegramClient, update: &TelegramUpdate) -> Outcome<String> {
    tracing::info!(
        update_id = update.update_id,
        message_id = update.message.as_ref().map(|m| m.message_id),
        "telegram update received"
    );

    let Some(message) = &update.message else {
        return Ok("Webhook processed successfully".to_string());
    };
    let Some(text) = message.text.as_deref() else {
        return Ok("Webhook processed successfully".to_string());
    };

    let first_name = message.from.as_ref().map(|u| u.first_name.as_str());
    tracing::info!(
        first_name = first_name.unwrap_or("-"),
        username = message.from.as_ref().and_then(|u| u.username.as_deref()).unwrap_or("-"),
        "processing telegram message"
    );

    match reply_for(text, first_name) {
        Some(reply) => client.send_message(&message.chat.id.to_string(), &reply).await,
        None => Ok("Webhook processed successfully".to_string()),
    }
}

/// Register `<public_url>/telegram/webhook` with the Bot API.
///
/// Returns `Ok(None)` without calling out when the URL is empty or points
/// at localhost, since Telegram cannot reach it.
pub async fn setup_webhook(client: &TelegramClient, public_url: &str) -> Outcome<Option<String>> {
    let public_url = public_url.trim().trim_end_matches('/');
    if public_url.is_empty() || public_url.contains("localhost") {
        tracing::info!("webhook URL not configured or is localhost, skipping webhook setup");
        return Ok(None);
    }

    let url = format!("{public_url}{WEBHOOK_PATH}");
    match client.set_webhook(&url).await {
        Ok(_) => {
            tracing::info!(url = %url, "webhook registered");
            Ok(Some(url))
        }
        Err(f) => {
            tracing::warn!(url = %url, message = %f.message, "failed to set up webhook");
            Err(f)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use mockito::Matcher;
    use reqwest::Client;
    use serde_json::json;

    fn update(text: Option<&str>) -> TelegramUpdate {
        serde_json::from_value(json!({
            "update_id": 7,
            "message": {
                "message_id": 8,
                "from": {"id": 99, "first_name": "Ala"},
                "chat": {"id": 99, "type": "private"},
                "date": 0,
                "text": text,
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_start_replies_to_chat() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/botT/sendMessage")
            .match_body(Matcher::PartialJson(json!({"chat_id": "99"})))
            .with_status(200)
            .create_async()
            .await;
        let client = TelegramClient::new(Client::new(), "T").with_api_base(server.url());

        let result = process_update(&client, &update(Some("/start"))).await.unwrap();
        assert_eq!(result, "Message sent successfully");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_no_text_no_call() {
        // unreachable API: any call would fail
        let client = TelegramClient::new(Client::new(), "T").with_api_base("http://127.0.0.1:9");
        let result = process_update(&client, &update(None)).await.unwrap();
        assert_eq!(result, "Webhook processed successfully");

        let blank = process_update(&client, &update(Some("  "))).await.unwrap();
        assert_eq!(blank, "Webhook processed successfully");
    }

    #[tokio::test]
    async fn test_reply_failure_propagates() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/botT/sendMessage")
            .with_status(403)
            .create_async()
            .await;
        let client = TelegramClient::new(Client::new(), "T").with_api_base(server.url());

        let err = process_update(&client, &update(Some("hi"))).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::IoError);
        assert_eq!(err.context["status"], 403);
    }

    #[tokio::test]
    async fn test_setup_webhook_skips_local() {
        let client = TelegramClient::new(Client::new(), "T").with_api_base("http://127.0.0.1:9");
        assert_eq!(setup_webhook(&client, "").await.unwrap(), None);
        assert_eq!(setup_webhook(&client, "http://localhost:8080").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_setup_webhook_registers_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/botT/setWebhook")
            .match_body(Matcher::UrlEncoded(
                "url".into(),
                "https://relay.example.com/telegram/webhook".into(),
            ))
            .with_status(200)
            .create_async()
            .await;
        let client = TelegramClient::new(Client::new(), "T").with_api_base(server.url());

        let url = setup_webhook(&client, "https://relay.example.com/").await.unwrap();
        assert_eq!(url.as_deref(), Some("https://relay.example.com/telegram/webhook"));
        mock.assert_async().await;
    }
}
