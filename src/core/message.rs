//! Conversation turns.
//!
//! A turn has a role and an ordered list of parts; a part is text with an
//! optional image attachment. Attachments on model turns mirror what landed
//! on the canvas so the log can show where each design came from.

use serde::{Deserialize, Serialize};

use crate::core::assets::ImageData;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TurnRole {
    User,
    Model,
}

impl TurnRole {
    /// The wire spelling of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Model => "model",
        }
    }
}

impl TryFrom<String> for TurnRole {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "user" => Ok(TurnRole::User),
            "model" => Ok(TurnRole::Model),
            other => Err(format!("unknown turn role: {other}")),
        }
    }
}

impl From<TurnRole> for String {
    fn from(role: TurnRole) -> Self {
        role.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePart {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image: Option<ImageData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: TurnRole,
    pub parts: Vec<MessagePart>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            parts: vec![MessagePart {
                text: text.into(),
                image: None,
            }],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            parts: vec![MessagePart {
                text: text.into(),
                image: None,
            }],
        }
    }

    pub fn model_with_image(text: impl Into<String>, image: Option<ImageData>) -> Self {
        Self {
            role: TurnRole::Model,
            parts: vec![MessagePart {
                text: text.into(),
                image,
            }],
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == TurnRole::User
    }

    /// The turn's text, parts joined in order.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("")
    }

    /// A copy of this turn with image attachments dropped. Used when
    /// persisting the conversation log.
    pub fn without_images(&self) -> Self {
        Self {
            role: self.role,
            parts: self
                .parts
                .iter()
                .map(|p| MessagePart {
                    text: p.text.clone(),
                    image: None,
                })
                .collect(),
        }
    }
}
