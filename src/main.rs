//! Message relay server.
//!
//! Configuration comes from `message-relay.toml` (optional), `.env` and
//! `MESSAGE_RELAY__*` environment variables.

use message_relay::server::{self, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    server::start_server(settings).await
}
