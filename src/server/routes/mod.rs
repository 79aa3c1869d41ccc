pub mod health;
pub mod message;
pub mod telegram;

use super::error::ServerError;

/// Fallback for unknown paths.
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
