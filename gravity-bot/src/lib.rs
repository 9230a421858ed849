//! Telegram-facing surface of the Gravity relay.
//!
//! `routes` hosts the webhook and health endpoints, `update` normalizes
//! raw Bot API updates, `telegram` talks back to the Bot API, and
//! `handler` runs the relay flow over the `gravity-core` engine.

pub mod handler;
pub mod routes;
pub mod telegram;
pub mod update;

pub use handler::Handler;
pub use routes::{build_router, AppState};
pub use telegram::{BotApi, TelegramChannel};
pub use update::{Update, UpdateKind};
