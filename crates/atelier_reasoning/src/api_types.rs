use atelier_core::{Speaker, Turn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(text: &str) -> Self {
        Self {
            role: Role::User,
            content: text.to_string(),
        }
    }

    pub fn assistant(text: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: text.to_string(),
        }
    }
}

impl From<&Turn> for Message {
    fn from(turn: &Turn) -> Self {
        match turn.speaker {
            Speaker::User => Message::user(&turn.text),
            Speaker::Assistant => Message::assistant(&turn.text),
        }
    }
}

// Response payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagesResponse {
    pub text: String,
    pub stop_reason: Option<String>,
}

impl MessagesResponse {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            stop_reason: Some("stop".to_string()),
        }
    }
}
