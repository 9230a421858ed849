//! Normalized inbound updates.
//!
//! The webhook receives raw Bot API update JSON; only the shapes the
//! relay handles (text, photo, button press) are normalized, everything
//! else is dropped.

use serde_json::Value;

/// One normalized inbound update.
#[derive(Debug, Clone)]
pub struct Update {
    /// Chat id; in private chats this doubles as the user id
    pub user_id: i64,
    pub kind: UpdateKind,
}

#[derive(Debug, Clone)]
pub enum UpdateKind {
    Text(String),
    Photo {
        file_id: String,
        caption: Option<String>,
    },
    Callback {
        id: String,
        data: String,
    },
}

impl Update {
    /// Parse a raw Bot API update. Returns `None` for update types the
    /// relay does not handle (edits, stickers, channel posts, ...).
    pub fn parse(raw: &Value) -> Option<Self> {
        if let Some(callback) = raw.get("callback_query") {
            let id = callback.get("id")?.as_str()?.to_string();
            let data = callback.get("data")?.as_str()?.to_string();
            let user_id = callback
                .get("message")?
                .get("chat")?
                .get("id")?
                .as_i64()?;
            return Some(Self {
                user_id,
                kind: UpdateKind::Callback { id, data },
            });
        }

        let message = raw.get("message")?;
        let user_id = message.get("chat")?.get("id")?.as_i64()?;

        if let Some(photos) = message.get("photo").and_then(Value::as_array) {
            // Telegram lists photo sizes smallest-first; take the largest
            let file_id = photos.last()?.get("file_id")?.as_str()?.to_string();
            let caption = message
                .get("caption")
                .and_then(Value::as_str)
                .map(String::from);
            return Some(Self {
                user_id,
                kind: UpdateKind::Photo { file_id, caption },
            });
        }

        let text = message.get("text")?.as_str()?.to_string();
        Some(Self {
            user_id,
            kind: UpdateKind::Text(text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_a_text_message() {
        let raw = json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "chat": { "id": 555, "type": "private" },
                "text": "Hello"
            }
        });
        let update = Update::parse(&raw).unwrap();
        assert_eq!(update.user_id, 555);
        assert!(matches!(update.kind, UpdateKind::Text(ref t) if t == "Hello"));
    }

    #[test]
    fn parses_a_photo_and_picks_the_largest_size() {
        let raw = json!({
            "message": {
                "chat": { "id": 7 },
                "photo": [
                    { "file_id": "small", "width": 90 },
                    { "file_id": "large", "width": 1280 }
                ],
                "caption": "fix this"
            }
        });
        let update = Update::parse(&raw).unwrap();
        match update.kind {
            UpdateKind::Photo { file_id, caption } => {
                assert_eq!(file_id, "large");
                assert_eq!(caption.as_deref(), Some("fix this"));
            }
            other => panic!("expected photo, got {other:?}"),
        }
    }

    #[test]
    fn parses_a_callback_query() {
        let raw = json!({
            "callback_query": {
                "id": "cb1",
                "data": "mode_debugger",
                "message": { "chat": { "id": 9 } }
            }
        });
        let update = Update::parse(&raw).unwrap();
        assert_eq!(update.user_id, 9);
        assert!(
            matches!(update.kind, UpdateKind::Callback { ref data, .. } if data == "mode_debugger")
        );
    }

    #[test]
    fn unhandled_shapes_are_dropped() {
        assert!(Update::parse(&json!({ "update_id": 1 })).is_none());
        assert!(Update::parse(&json!({
            "message": { "chat": { "id": 1 }, "sticker": {} }
        }))
        .is_none());
        assert!(Update::parse(&json!("garbage")).is_none());
    }
}
