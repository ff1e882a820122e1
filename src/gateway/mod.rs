//! The model gateway boundary.
//!
//! [`DesignBackend`] is the seam between the orchestrator and the external
//! generation capability. Four operations, each a single request/response
//! round trip: conversational chat, grounded image editing, palette
//! extraction, and carousel planning. The gateway never retries and never
//! synthesizes defaults; transport and parse failures propagate upward
//! unchanged.

use async_trait::async_trait;
use serde::Deserialize;

use crate::core::assets::ImageData;
use crate::core::message::Message;

pub mod gemini;

pub use gemini::GeminiGateway;

/// Errors crossing the gateway boundary.
#[derive(Debug)]
pub enum GatewayError {
    /// The HTTP transport failed before a response was received.
    Transport(reqwest::Error),

    /// The capability answered with a non-success status.
    Api { status: u16, body: String },

    /// The response arrived but its structured content was missing or
    /// malformed (empty candidate list, invalid JSON array, bad plan).
    Structured(String),
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Transport(err) => write!(f, "Request failed: {err}"),
            GatewayError::Api { status, body } => {
                write!(f, "API request failed with status {status}: {body}")
            }
            GatewayError::Structured(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(err)
    }
}

/// What an edit call produced. The capability may return an image, text, or
/// both; zero of each is possible and is passed through as-is.
#[derive(Debug, Clone, Default)]
pub struct EditOutcome {
    pub image: Option<ImageData>,
    pub text: Option<String>,
}

/// One entry of a carousel plan, ordered by `slide_number` starting at 1.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SlidePlan {
    pub slide_number: u32,
    pub visual_description: String,
    pub text_content: String,
}

/// Parameters for a grounded image edit: the baseline image, the edit
/// instruction, the session system instruction, and any reference images
/// (mentioned assets, the logo).
pub struct EditImageRequest<'a> {
    pub base: &'a ImageData,
    pub instruction: &'a str,
    pub system_instruction: &'a str,
    pub references: Vec<&'a ImageData>,
}

#[async_trait]
pub trait DesignBackend: Send + Sync {
    /// Stateless replay of the full turn history (text parts only) plus the
    /// session system instruction; returns free text.
    async fn chat(
        &self,
        history: &[Message],
        system_instruction: &str,
    ) -> Result<String, GatewayError>;

    /// Send the baseline image, reference images, and instruction together;
    /// returns whatever the capability produced.
    async fn edit_image(&self, request: EditImageRequest<'_>)
        -> Result<EditOutcome, GatewayError>;

    /// The five dominant color values of an image as a schema-typed array.
    async fn extract_palette(&self, image: &ImageData) -> Result<Vec<String>, GatewayError>;

    /// A structured multi-slide plan for a carousel request.
    async fn plan_carousel(&self, prompt: &str) -> Result<Vec<SlidePlan>, GatewayError>;
}
