//! Core conversation engine for the Gravity relay.
//!
//! Everything in this crate is transport-agnostic: the Telegram adapter in
//! `gravity-bot` feeds normalized input in and delivers the produced
//! fragments back out. The flow is mode resolution → prompt assembly →
//! completion call → chunk splitting → history append.

pub mod mode;
pub mod prompt;
pub mod provider;
pub mod session;
pub mod split;

pub use mode::{Mode, ModeRouter};
pub use prompt::{assemble, ImageData, ModelRequest};
pub use provider::{CompletionProvider, GroqProvider};
pub use session::{Role, Session, SessionStore, Turn, HISTORY_CAP};
pub use split::split_chunks;
