//! Inbound update handling: the sequential relay flow.
//!
//! Resolve mode → assemble prompt → completion call → split → deliver →
//! record the exchange. Every failure is caught here and answered in chat;
//! nothing propagates to the webhook status code.

use std::sync::Arc;

use gravity_common::config::CHUNK_LIMIT;
use gravity_common::Result;
use gravity_core::mode::ModeRouter;
use gravity_core::prompt::{assemble, ImageData, DEFAULT_IMAGE_CAPTION};
use gravity_core::provider::CompletionProvider;
use gravity_core::session::SessionStore;
use gravity_core::split::split_chunks;

use crate::telegram::BotApi;
use crate::update::{Update, UpdateKind};

const GREETING: &str = "🚀 Antigravity Pro Code Bot ishga tushdi! Menga matn yoki rasm yuboring.";
const RESET_CONFIRMATION: &str = "🆕 Yangi suhbat boshlandi.";
const MODE_PROMPT: &str = "Rejimni tanlang:";

/// Wires the core engine to the Telegram adapter.
pub struct Handler {
    api: Arc<dyn BotApi>,
    provider: Arc<dyn CompletionProvider>,
    store: Arc<SessionStore>,
    router: ModeRouter,
    chunk_limit: usize,
}

impl Handler {
    pub fn new(
        api: Arc<dyn BotApi>,
        provider: Arc<dyn CompletionProvider>,
        store: Arc<SessionStore>,
    ) -> Self {
        let router = ModeRouter::new(store.clone());
        Self {
            api,
            provider,
            store,
            router,
            chunk_limit: CHUNK_LIMIT,
        }
    }

    #[cfg(test)]
    fn with_chunk_limit(mut self, limit: usize) -> Self {
        self.chunk_limit = limit;
        self
    }

    /// Handle one update end to end. Never returns an error: user-visible
    /// failures become a short chat reply, the rest is only logged.
    pub async fn handle(&self, update: Update) {
        if let Err(err) = self.dispatch(&update).await {
            tracing::error!(user_id = update.user_id, "update handling failed: {err}");
            if err.is_user_visible() {
                let language = {
                    let entry = self.store.session(update.user_id);
                    let session = entry.lock().await;
                    session.language.clone()
                };
                let reply = err.user_message(&language);
                if let Err(send_err) = self.api.send_message(update.user_id, reply, false).await {
                    tracing::error!("failed to deliver error reply: {send_err}");
                }
            }
        }
    }

    async fn dispatch(&self, update: &Update) -> Result<()> {
        match &update.kind {
            UpdateKind::Callback { id, data } => {
                self.handle_callback(update.user_id, id, data).await
            }
            UpdateKind::Text(text) => self.handle_text(update.user_id, text).await,
            UpdateKind::Photo { file_id, caption } => {
                self.handle_photo(update.user_id, file_id, caption.as_deref())
                    .await
            }
        }
    }

    async fn handle_callback(&self, user_id: i64, callback_id: &str, data: &str) -> Result<()> {
        self.api.answer_callback_query(callback_id).await;
        match self.router.resolve_callback(user_id, data).await {
            Some(mode) => {
                let confirmation = format!("{} rejimi tanlandi.", mode.label());
                self.api.send_message(user_id, &confirmation, false).await
            }
            None => {
                tracing::debug!("ignoring unknown callback data: {data}");
                Ok(())
            }
        }
    }

    async fn handle_text(&self, user_id: i64, text: &str) -> Result<()> {
        match text.trim() {
            "/start" => {
                self.api.send_message(user_id, GREETING, false).await?;
                return self.api.send_mode_keyboard(user_id, MODE_PROMPT).await;
            }
            "/new" => {
                self.store.reset(user_id).await;
                return self.api.send_message(user_id, RESET_CONFIRMATION, false).await;
            }
            "/mode" => return self.api.send_mode_keyboard(user_id, MODE_PROMPT).await,
            command if command.starts_with('/') => {
                tracing::debug!("ignoring unknown command: {command}");
                return Ok(());
            }
            _ => {}
        }
        self.relay(user_id, Some(text), None).await
    }

    async fn handle_photo(&self, user_id: i64, file_id: &str, caption: Option<&str>) -> Result<()> {
        let (bytes, mime) = self.api.download_file(file_id).await?;
        self.relay(user_id, caption, Some(ImageData { bytes, mime }))
            .await
    }

    /// The core relay sequence. History is appended only after a
    /// successful completion and delivery, so a timeout or upstream error
    /// leaves no partial turn behind.
    async fn relay(
        &self,
        user_id: i64,
        prompt: Option<&str>,
        image: Option<ImageData>,
    ) -> Result<()> {
        self.api.send_chat_action(user_id, "typing").await;

        self.router.resolve_implicit(user_id, image.is_some()).await;

        let request = {
            let entry = self.store.session(user_id);
            let session = entry.lock().await;
            assemble(&session, prompt, image.as_ref())?
        };

        let answer = self.provider.complete(request).await?;

        for chunk in split_chunks(&answer, self.chunk_limit) {
            self.api.send_message(user_id, &chunk, true).await?;
        }

        let recorded_prompt = prompt
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_IMAGE_CAPTION);
        self.store
            .append_exchange(user_id, recorded_prompt, &answer)
            .await;
        Ok(())
    }
}
