//! `/telegram/*` routes.

use super::message::ProcessResponse;
use crate::server::error::{ServerError, ServerResult};
use crate::server::state::AppState;
use crate::telegram::{process_update, TelegramClient, TelegramUpdate};
use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct SendMessageBody {
    #[serde(alias = "chatId")]
    pub chat_id: String,
    pub text: String,
}

/// Parse a JSON body, reporting problems in the common error format.
fn json_body<T: DeserializeOwned>(body: &[u8]) -> ServerResult<T> {
    serde_json::from_slice(body).map_err(|e| ServerError::BadRequest(e.to_string()))
}

fn bot(state: &AppState) -> ServerResult<&TelegramClient> {
    state.telegram.as_ref().ok_or(ServerError::TelegramDisabled)
}

pub async fn send_message(
    State(state): State<AppState>,
    body: Bytes,
) -> ServerResult<Json<ProcessResponse>> {
    let body: SendMessageBody = json_body(&body)?;
    let response = bot(&state)?.send_message(&body.chat_id, &body.text).await?;
    Ok(Json(ProcessResponse { response }))
}

pub async fn webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> ServerResult<Json<ProcessResponse>> {
    let update: TelegramUpdate = json_body(&body)?;
    let response = process_update(bot(&state)?, &update).await?;
    Ok(Json(ProcessResponse { response }))
}

pub async fn webhook_info(State(state): State<AppState>) -> ServerResult<Json<Value>> {
    Ok(Json(bot(&state)?.webhook_info().await?))
}
