//! Model request assembly.
//!
//! Builds the OpenAI-compatible chat payload sent to the completion API:
//! system instruction derived from the active mode, bounded history in
//! chronological order, and the new user turn. A turn with an image
//! becomes a multi-part payload carrying the caption and a base64 data
//! URI; the mere presence of an image also flips the model id to the
//! vision-capable variant.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use gravity_common::config::{MAX_OUTPUT_TOKENS, TEMPERATURE, TEXT_MODEL, VISION_MODEL};
use gravity_common::{Error, Result};

use crate::session::Session;

/// Caption substituted when a photo arrives without one.
pub const DEFAULT_IMAGE_CAPTION: &str = "Rasm tahlili";

/// Raw image attachment bytes plus their MIME type.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// One content part of a multi-part user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// Message content: a plain string or a multi-part payload. Serializes to
/// exactly the upstream wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

/// Outbound completion request. Transient; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: i64,
    pub temperature: f64,
}

/// Assemble the outbound request for one user turn.
///
/// At least one of `prompt` and `image` must be present; an empty or
/// whitespace-only prompt counts as absent. The image presence is a hard
/// binary switch on the model id.
pub fn assemble(
    session: &Session,
    prompt: Option<&str>,
    image: Option<&ImageData>,
) -> Result<ModelRequest> {
    let prompt = prompt.map(str::trim).filter(|p| !p.is_empty());
    if prompt.is_none() && image.is_none() {
        return Err(Error::MissingInput(
            "a prompt or an image is required".into(),
        ));
    }

    let mut messages = Vec::with_capacity(session.history.len() + 2);
    messages.push(ChatMessage {
        role: "system".into(),
        content: MessageContent::Text(system_prompt(session)),
    });

    for turn in &session.history {
        messages.push(ChatMessage {
            role: turn.role.as_str().into(),
            content: MessageContent::Text(turn.content.clone()),
        });
    }

    let content = match image {
        Some(image) => {
            let caption = prompt.unwrap_or(DEFAULT_IMAGE_CAPTION);
            MessageContent::Parts(vec![
                ContentPart::Text {
                    text: caption.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: data_uri(image),
                    },
                },
            ])
        }
        None => MessageContent::Text(prompt.unwrap_or_default().to_string()),
    };
    messages.push(ChatMessage {
        role: "user".into(),
        content,
    });

    Ok(ModelRequest {
        model: if image.is_some() {
            VISION_MODEL
        } else {
            TEXT_MODEL
        }
        .to_string(),
        messages,
        max_tokens: MAX_OUTPUT_TOKENS,
        temperature: TEMPERATURE,
    })
}

fn system_prompt(session: &Session) -> String {
    format!(
        "{} {}",
        session.mode.instruction(),
        language_directive(&session.language)
    )
}

fn language_directive(language: &str) -> String {
    match language {
        "uz" => "O'zbek tilida javob bering.".to_string(),
        other => format!("Respond in the '{other}' locale."),
    }
}

fn data_uri(image: &ImageData) -> String {
    format!("data:{};base64,{}", image.mime, BASE64.encode(&image.bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Mode;
    use crate::session::{Role, Turn};

    fn session_with(mode: Mode, history: Vec<Turn>) -> Session {
        Session {
            user_id: 1,
            mode,
            history,
            language: "uz".into(),
        }
    }

    fn turn(role: Role, content: &str) -> Turn {
        Turn {
            role,
            content: content.into(),
            timestamp: 0,
        }
    }

    #[test]
    fn text_only_selects_the_text_model() {
        let session = session_with(Mode::General, vec![]);
        let request = assemble(&session, Some("Hello"), None).unwrap();
        assert_eq!(request.model, TEXT_MODEL);
    }

    #[test]
    fn image_always_selects_the_vision_model() {
        let session = session_with(Mode::General, vec![]);
        let image = ImageData {
            bytes: vec![1, 2, 3],
            mime: "image/jpeg".into(),
        };
        let request = assemble(&session, None, Some(&image)).unwrap();
        assert_eq!(request.model, VISION_MODEL);
    }

    #[test]
    fn missing_both_inputs_is_rejected() {
        let session = session_with(Mode::General, vec![]);
        let err = assemble(&session, None, None).unwrap_err();
        assert!(matches!(err, Error::MissingInput(_)));

        // Whitespace-only prompt counts as absent
        let err = assemble(&session, Some("   "), None).unwrap_err();
        assert!(matches!(err, Error::MissingInput(_)));
    }

    #[test]
    fn system_prompt_follows_the_session_mode() {
        let session = session_with(Mode::Debugger, vec![]);
        let request = assemble(&session, Some("fix this"), None).unwrap();

        let MessageContent::Text(system) = &request.messages[0].content else {
            panic!("system message must be plain text");
        };
        assert_eq!(request.messages[0].role, "system");
        assert!(system.contains("debugger"));
        assert!(system.contains("O'zbek tilida"));
    }

    #[test]
    fn history_sits_between_system_and_new_turn_in_order() {
        let history = vec![
            turn(Role::User, "one"),
            turn(Role::Assistant, "two"),
            turn(Role::User, "three"),
            turn(Role::Assistant, "four"),
        ];
        let session = session_with(Mode::General, history);
        let request = assemble(&session, Some("five"), None).unwrap();

        assert_eq!(request.messages.len(), 6);
        let contents: Vec<_> = request.messages[1..5]
            .iter()
            .map(|m| match &m.content {
                MessageContent::Text(t) => t.as_str(),
                MessageContent::Parts(_) => panic!("history is plain text"),
            })
            .collect();
        assert_eq!(contents, vec!["one", "two", "three", "four"]);
        assert_eq!(request.messages[5].role, "user");
    }

    #[test]
    fn image_turn_is_multi_part_with_data_uri() {
        let session = session_with(Mode::Designer, vec![]);
        let image = ImageData {
            bytes: b"fakejpeg".to_vec(),
            mime: "image/jpeg".into(),
        };
        let request = assemble(&session, Some("fix this"), Some(&image)).unwrap();

        let value = serde_json::to_value(&request).unwrap();
        let parts = &value["messages"][1]["content"];
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[0]["text"], "fix this");
        assert_eq!(parts[1]["type"], "image_url");
        let url = parts[1]["image_url"]["url"].as_str().unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn empty_caption_falls_back_to_the_default() {
        let session = session_with(Mode::Designer, vec![]);
        let image = ImageData {
            bytes: vec![0],
            mime: "image/png".into(),
        };
        let request = assemble(&session, Some(""), Some(&image)).unwrap();

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value["messages"][1]["content"][0]["text"],
            DEFAULT_IMAGE_CAPTION
        );
    }

    #[test]
    fn generation_parameters_are_deployment_fixed() {
        let session = session_with(Mode::Chat, vec![]);
        let request = assemble(&session, Some("hi"), None).unwrap();
        assert_eq!(request.max_tokens, MAX_OUTPUT_TOKENS);
        assert!((request.temperature - TEMPERATURE).abs() < f64::EPSILON);
    }
}
