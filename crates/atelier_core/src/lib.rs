pub mod config;
pub mod error;
pub mod persona;
pub mod session;

pub use config::AtelierConfig;
pub use error::CoreError;
pub use persona::{Persona, PersonaRegistry};
pub use session::{Session, SessionPolicy, SessionStore};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The persona chosen to answer an utterance.
///
/// Every utterance maps to exactly one key; `Chat` is the default when
/// nothing more specific applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaKey {
    #[default]
    Chat,
    SkinToneAnalysis,
    TakePicture,
    WardrobeAnalysis,
    UpdateFilter,
}

impl PersonaKey {
    pub const ALL: [PersonaKey; 5] = [
        PersonaKey::Chat,
        PersonaKey::SkinToneAnalysis,
        PersonaKey::TakePicture,
        PersonaKey::WardrobeAnalysis,
        PersonaKey::UpdateFilter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::SkinToneAnalysis => "skin_tone_analysis",
            Self::TakePicture => "take_picture",
            Self::WardrobeAnalysis => "wardrobe_analysis",
            Self::UpdateFilter => "update_filter",
        }
    }

    /// Whether this persona can work from an attached photo.
    pub fn accepts_image(&self) -> bool {
        matches!(self, Self::SkinToneAnalysis | Self::WardrobeAnalysis)
    }
}

impl fmt::Display for PersonaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonaKey {
    type Err = CoreError;

    /// Parses a label, tolerating surrounding whitespace and quotes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().trim_matches(|c| c == '\'' || c == '"' || c == '`');
        PersonaKey::ALL
            .into_iter()
            .find(|k| k.as_str() == label)
            .ok_or_else(|| CoreError::UnknownPersona(s.to_string()))
    }
}

/// Kind of catalogue filter a user asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Material,
    Store,
    Sustainable,
    #[default]
    Unknown,
}

/// Structured filter request. An `Unknown` type always carries an empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireFilterSpec")]
pub struct FilterSpec {
    #[serde(rename = "type")]
    pub filter_type: FilterType,
    pub value: String,
}

/// Unchecked wire shape; normalized through `FilterSpec::new`.
#[derive(Deserialize)]
struct WireFilterSpec {
    #[serde(rename = "type")]
    filter_type: FilterType,
    #[serde(default)]
    value: String,
}

impl From<WireFilterSpec> for FilterSpec {
    fn from(wire: WireFilterSpec) -> Self {
        FilterSpec::new(wire.filter_type, wire.value)
    }
}

impl FilterSpec {
    pub fn new(filter_type: FilterType, value: impl Into<String>) -> Self {
        let value = value.into().trim().to_string();
        if filter_type == FilterType::Unknown || value.is_empty() {
            return Self::unknown();
        }
        Self { filter_type, value }
    }

    pub fn unknown() -> Self {
        Self {
            filter_type: FilterType::Unknown,
            value: String::new(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.filter_type == FilterType::Unknown
    }
}

/// Identity of one conversation thread. All parts are opaque caller strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    pub app: String,
    pub user_id: String,
    pub session_id: String,
}

impl ConversationKey {
    pub fn new(app: &str, user_id: &str, session_id: &str) -> Self {
        Self {
            app: app.to_string(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
        }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.app, self.user_id, self.session_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

/// One recorded line of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: i64, // Unix timestamp
}

impl Turn {
    pub fn new(speaker: Speaker, text: &str) -> Self {
        Self {
            speaker,
            text: text.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}
