//! Thin Bot API client.
//!
//! Every call maps a 2xx status to `Ok`, any other status to an
//! [`IoError`](crate::ErrorKind::IoError) carrying `status`, and a transport
//! error to [`Unknown`](crate::ErrorKind::Unknown) carrying `exception`.
//! A body that cannot be read is an `IoError` as well.

use super::models::SendMessageRequest;
use crate::error::{Failure, Outcome};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

/// Public Bot API host.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    api_base: String,
    token: String,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_base", &self.api_base)
            .field("token", &"***")
            .finish()
    }
}

impl TelegramClient {
    pub fn new(http: Client, token: impl Into<String>) -> Self {
        Self {
            http,
            api_base: DEFAULT_API_BASE.to_string(),
            token: token.into(),
        }
    }

    /// Point at another Bot API server (self-hosted, or a test double).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Send `text` to `chat_id`.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Outcome<String> {
        let body = SendMessageRequest {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
        };
        let req = self.http.post(self.method_url("sendMessage")).json(&body);
        self.call(req, "sendMessage", "Error sending message", "Failed to send message")
            .await?;
        tracing::info!(chat_id, "telegram message sent");
        Ok("Message sent successfully".to_string())
    }

    /// Register `url` as the webhook.
    pub async fn set_webhook(&self, url: &str) -> Outcome<String> {
        let req = self
            .http
            .post(self.method_url("setWebhook"))
            .form(&[("url", url)]);
        self.call(req, "setWebhook", "Error setting webhook", "Failed to set webhook")
            .await?;
        Ok("Webhook set successfully".to_string())
    }

    pub async fn delete_webhook(&self) -> Outcome<String> {
        let req = self.http.post(self.method_url("deleteWebhook"));
        self.call(req, "deleteWebhook", "Error deleting webhook", "Failed to delete webhook")
            .await?;
        Ok("Webhook deleted successfully".to_string())
    }

    /// Current webhook configuration, as returned by the Bot API.
    pub async fn webhook_info(&self) -> Outcome<Value> {
        let req = self.http.get(self.method_url("getWebhookInfo"));
        let body = self
            .call(
                req,
                "getWebhookInfo",
                "Error getting webhook info",
                "Failed to get webhook info",
            )
            .await?;
        serde_json::from_str(&body)
            .map_err(|e| Failure::io(format!("Failed to parse webhook info: {e}")))
    }

    async fn call(
        &self,
        req: RequestBuilder,
        method: &str,
        transport_message: &str,
        status_message: &str,
    ) -> Outcome<String> {
        let resp = req.send().await.map_err(|e| {
            // reqwest errors include the URL, which includes the token
            let detail = e.without_url().to_string();
            tracing::error!(method, error = %detail, "telegram call failed");
            Failure::unknown(transport_message).with("exception", detail)
        })?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(method, status = status.as_u16(), "telegram call rejected");
            return Err(Failure::io(status_message).with("status", status.as_u16()));
        }

        resp.text().await.map_err(|e| {
            let detail = e.without_url().to_string();
            tracing::error!(method, error = %detail, "telegram response unreadable");
            Failure::io(format!("Failed to read {method} response"))
                .with("status", status.as_u16())
                .with("exception", detail)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use mockito::Matcher;
    use serde_json::json;

    fn client(base: &str) -> TelegramClient {
        TelegramClient::new(Client::new(), "TOKEN").with_api_base(base)
    }

    #[tokio::test]
    async fn test_send_message_ok() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/botTOKEN/sendMessage")
            .match_body(Matcher::Json(json!({"chat_id": "42", "text": "hi"})))
            .with_status(200)
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let result = client(&server.url()).send_message("42", "hi").await.unwrap();
        assert_eq!(result, "Message sent successfully");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_message_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/botTOKEN/sendMessage")
            .with_status(400)
            .with_body(r#"{"ok": false, "description": "chat not found"}"#)
            .create_async()
            .await;

        let err = client(&server.url()).send_message("1", "x").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::IoError);
        assert_eq!(err.message, "Failed to send message");
        assert_eq!(err.context["status"], 400);
    }

    #[tokio::test]
    async fn test_transport_error_is_unknown() {
        let err = client("http://127.0.0.1:9")
            .send_message("1", "x")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert_eq!(err.message, "Error sending message");
        let detail = err.context["exception"].as_str().unwrap();
        assert!(!detail.contains("TOKEN"));
    }

    #[tokio::test]
    async fn test_set_webhook_sends_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/botTOKEN/setWebhook")
            .match_body(Matcher::UrlEncoded(
                "url".into(),
                "https://relay.example.com/telegram/webhook".into(),
            ))
            .with_status(200)
            .create_async()
            .await;

        client(&server.url())
            .set_webhook("https://relay.example.com/telegram/webhook")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_webhook() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/botTOKEN/deleteWebhook")
            .with_status(200)
            .create_async()
            .await;
        client(&server.url()).delete_webhook().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_webhook_info() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/botTOKEN/getWebhookInfo")
            .with_status(200)
            .with_body(r#"{"ok": true, "result": {"url": "", "pending_update_count": 0}}"#)
            .create_async()
            .await;
        let info = client(&server.url()).webhook_info().await.unwrap();
        assert_eq!(info["result"]["pending_update_count"], 0);
    }

    #[tokio::test]
    async fn test_truncated_body_is_io_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            // promises 100 bytes, sends 6, hangs up
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\n{\"ok\"")
                .await;
        });

        let err = client(&format!("http://{addr}"))
            .webhook_info()
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::IoError);
        assert_eq!(err.message, "Failed to read getWebhookInfo response");
        assert_eq!(err.context["status"], 200);
        assert!(!err.context["exception"].as_str().unwrap().contains("TOKEN"));
    }

    #[test]
    fn test_debug_hides_token() {
        let debug = format!("{:?}", client("http://x"));
        assert!(!debug.contains("TOKEN"));
    }
}
