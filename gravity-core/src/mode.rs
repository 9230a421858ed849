//! Conversation modes and their system instructions.
//!
//! A mode is a named persona that shapes the system prompt. The
//! enumeration is closed and the instruction mapping is total, so a
//! missing or unknown selection always resolves deterministically to the
//! general default instead of leaking an undefined persona upstream.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::session::SessionStore;

/// Callback token that returns to the default mode without clearing
/// history.
pub const MENU_TOKEN: &str = "menu";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    General,
    Developer,
    Designer,
    Debugger,
    Chat,
    LogoAnalysis,
}

impl Mode {
    pub const ALL: &'static [Mode] = &[
        Mode::General,
        Mode::Developer,
        Mode::Designer,
        Mode::Debugger,
        Mode::Chat,
        Mode::LogoAnalysis,
    ];

    /// Stable callback-data token for this mode.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "mode_general",
            Self::Developer => "mode_developer",
            Self::Designer => "mode_designer",
            Self::Debugger => "mode_debugger",
            Self::Chat => "mode_chat",
            Self::LogoAnalysis => "mode_logo",
        }
    }

    /// Parse a callback-data token. Unknown tokens yield `None`; the
    /// caller decides whether that means "ignore" or "fall back".
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "mode_general" => Some(Self::General),
            "mode_developer" => Some(Self::Developer),
            "mode_designer" => Some(Self::Designer),
            "mode_debugger" => Some(Self::Debugger),
            "mode_chat" => Some(Self::Chat),
            "mode_logo" => Some(Self::LogoAnalysis),
            _ => None,
        }
    }

    /// Button caption shown in the mode-selection keyboard.
    pub const fn label(self) -> &'static str {
        match self {
            Self::General => "🤖 Umumiy yordamchi",
            Self::Developer => "👨‍💻 Dasturchi",
            Self::Designer => "🎨 Dizayner",
            Self::Debugger => "🐞 Xato tuzatuvchi",
            Self::Chat => "💬 Suhbat",
            Self::LogoAnalysis => "🖼 Logo tahlili",
        }
    }

    /// System instruction injected for this mode. Total: every mode has
    /// one.
    pub const fn instruction(self) -> &'static str {
        match self {
            Self::General => {
                "You are 'Antigravity Pro Code Bot', a helpful general assistant. \
                 Answer clearly and concisely."
            }
            Self::Developer => {
                "You are 'Antigravity Pro Code Bot' acting as a senior software \
                 engineer. Provide working code with short explanations and point \
                 out pitfalls."
            }
            Self::Designer => {
                "You are 'Antigravity Pro Code Bot' acting as a product designer. \
                 Analyze visuals and give concrete feedback on layout, color and \
                 typography."
            }
            Self::Debugger => {
                "You are 'Antigravity Pro Code Bot' acting as a debugger. Find the \
                 root cause of the reported problem, explain it, and propose a \
                 minimal fix."
            }
            Self::Chat => {
                "You are 'Antigravity Pro Code Bot' in casual conversation mode. \
                 Keep the tone friendly and the answers short."
            }
            Self::LogoAnalysis => {
                "You are 'Antigravity Pro Code Bot' acting as a brand analyst. \
                 Evaluate the submitted logo: composition, color palette, \
                 typography, and how memorable it is."
            }
        }
    }
}

/// Maps user commands and button presses onto session mode transitions.
pub struct ModeRouter {
    store: Arc<SessionStore>,
}

impl ModeRouter {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// Explicit selection from a button press. The `menu` token drops back
    /// to the default mode without touching history. Returns the mode now
    /// active, or `None` when the token is not a mode transition at all.
    pub async fn resolve_callback(&self, user_id: i64, data: &str) -> Option<Mode> {
        let mode = if data == MENU_TOKEN {
            Mode::default()
        } else {
            Mode::parse(data)?
        };
        self.store.set_mode(user_id, mode).await;
        Some(mode)
    }

    /// Implicit resolution for a message carrying no mode selection.
    ///
    /// An existing session keeps its last explicit mode. First contact
    /// with an image lands in the vision-oriented designer default, first
    /// contact with text in the general default.
    pub async fn resolve_implicit(&self, user_id: i64, has_image: bool) -> Mode {
        if self.store.contains(user_id) {
            return self.store.mode(user_id).await;
        }
        let mode = if has_image {
            Mode::Designer
        } else {
            Mode::General
        };
        self.store.set_mode(user_id, mode).await;
        mode
    }

    pub async fn current_mode(&self, user_id: i64) -> Mode {
        self.store.mode(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip_for_every_mode() {
        for &mode in Mode::ALL {
            assert_eq!(Mode::parse(mode.as_str()), Some(mode));
        }
    }

    #[test]
    fn unknown_token_parses_to_none() {
        assert_eq!(Mode::parse("mode_wizard"), None);
        assert_eq!(Mode::parse(""), None);
    }

    #[test]
    fn every_mode_has_a_distinct_instruction() {
        let mut seen = std::collections::HashSet::new();
        for &mode in Mode::ALL {
            assert!(seen.insert(mode.instruction()));
        }
    }

    #[tokio::test]
    async fn callback_sets_the_session_mode() {
        let store = Arc::new(SessionStore::new());
        let router = ModeRouter::new(store.clone());

        let mode = router.resolve_callback(1, "mode_debugger").await;
        assert_eq!(mode, Some(Mode::Debugger));
        assert_eq!(store.mode(1).await, Mode::Debugger);
    }

    #[tokio::test]
    async fn unknown_callback_changes_nothing() {
        let store = Arc::new(SessionStore::new());
        let router = ModeRouter::new(store.clone());
        store.set_mode(1, Mode::Chat).await;

        assert_eq!(router.resolve_callback(1, "bogus").await, None);
        assert_eq!(store.mode(1).await, Mode::Chat);
    }

    #[tokio::test]
    async fn menu_returns_to_default_but_keeps_history() {
        let store = Arc::new(SessionStore::new());
        let router = ModeRouter::new(store.clone());
        store.set_mode(1, Mode::Developer).await;
        store.append_exchange(1, "q", "a").await;

        assert_eq!(router.resolve_callback(1, MENU_TOKEN).await, Some(Mode::General));
        assert_eq!(store.mode(1).await, Mode::General);

        let entry = store.session(1);
        assert_eq!(entry.lock().await.history.len(), 2);
    }

    #[tokio::test]
    async fn first_contact_photo_defaults_to_designer() {
        let store = Arc::new(SessionStore::new());
        let router = ModeRouter::new(store);

        assert_eq!(router.resolve_implicit(1, true).await, Mode::Designer);
        // The implicit default sticks for the rest of the session
        assert_eq!(router.current_mode(1).await, Mode::Designer);
    }

    #[tokio::test]
    async fn explicit_mode_beats_the_implicit_photo_default() {
        let store = Arc::new(SessionStore::new());
        let router = ModeRouter::new(store.clone());
        router.resolve_callback(1, "mode_debugger").await;

        assert_eq!(router.resolve_implicit(1, true).await, Mode::Debugger);
    }

    #[tokio::test]
    async fn first_contact_text_defaults_to_general() {
        let store = Arc::new(SessionStore::new());
        let router = ModeRouter::new(store);
        assert_eq!(router.resolve_implicit(1, false).await, Mode::General);
    }
}
