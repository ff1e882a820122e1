//! Gemini-backed implementation of the design backend.
//!
//! Each operation is one `generateContent` round trip. Structured output
//! (palette extraction, carousel planning) is requested with a response
//! schema and decoded with typed deserialization; a response that does not
//! decode into the expected shape fails with [`GatewayError::Structured`].

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::api::{
    Content, ContentPart, GenerateContentRequest, GenerateContentResponse, GenerationConfig,
};
use crate::core::assets::ImageData;
use crate::core::message::Message;

use super::{DesignBackend, EditImageRequest, EditOutcome, GatewayError, SlidePlan};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";

const PALETTE_PROMPT: &str =
    "Extract the 5 most dominant hex color codes from this image. Respond ONLY with a JSON array of strings.";

pub struct GeminiGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    image_model: String,
}

impl GeminiGateway {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        chat_model: impl Into<String>,
        image_model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            chat_model: chat_model.into(),
            image_model: image_model.into(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GatewayError> {
        let url = self.endpoint(model);
        debug!(model, "sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(GatewayError::Api { status, body });
        }

        Ok(response.json::<GenerateContentResponse>().await?)
    }
}

/// The planning brief sent for a carousel request, embedding the raw user
/// prompt.
fn carousel_planning_prompt(prompt: &str) -> String {
    format!(
        "You are a social media expert and content strategist. A user wants to create a carousel post. \
Your task is to break down their request into a structured plan for a multi-slide carousel. \
Each slide should have a clear purpose and contribute to a cohesive narrative.\n\n\
The user's request is: \"{prompt}\"\n\n\
Generate a JSON array of objects, where each object represents a slide. Each object must have three properties:\n\
1. \"slide_number\": An integer for the slide's position (starting from 1).\n\
2. \"visual_description\": A detailed instruction for the graphic designer AI on what to create visually for this slide. Be descriptive about layout, imagery, and style.\n\
3. \"text_content\": The exact text (headings, body text, etc.) that should appear on the slide. Keep it concise for social media.\n\n\
Respond ONLY with the valid JSON array."
    )
}

fn slide_plan_schema() -> serde_json::Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "slide_number": {"type": "INTEGER"},
                "visual_description": {"type": "STRING"},
                "text_content": {"type": "STRING"}
            },
            "required": ["slide_number", "visual_description", "text_content"]
        }
    })
}

fn system_content(instruction: &str) -> Option<Content> {
    if instruction.is_empty() {
        None
    } else {
        Some(Content::unattributed(vec![ContentPart::text(instruction)]))
    }
}

/// Collect the edit result from a response: the last inline image and the
/// last text part, either of which may be absent.
fn parse_edit_outcome(response: &GenerateContentResponse) -> EditOutcome {
    let mut outcome = EditOutcome::default();
    for part in response.first_parts() {
        if let Some(inline) = &part.inline_data {
            outcome.image = Some(ImageData::new(&inline.data, &inline.mime_type));
        } else if let Some(text) = &part.text {
            outcome.text = Some(text.clone());
        }
    }
    outcome
}

fn parse_palette(text: &str) -> Result<Vec<String>, GatewayError> {
    let colors: Vec<String> = serde_json::from_str(text.trim())
        .map_err(|_| GatewayError::Structured("Failed to extract a valid color palette.".into()))?;
    if colors.is_empty() {
        return Err(GatewayError::Structured(
            "Failed to extract a valid color palette.".into(),
        ));
    }
    Ok(colors)
}

/// A usable plan is non-empty and numbered contiguously from 1.
fn validate_plan(plan: Vec<SlidePlan>) -> Result<Vec<SlidePlan>, GatewayError> {
    if plan.is_empty() {
        return Err(GatewayError::Structured(
            "Failed to generate a valid carousel plan.".into(),
        ));
    }
    for (index, slide) in plan.iter().enumerate() {
        if slide.slide_number as usize != index + 1 {
            return Err(GatewayError::Structured(
                "Failed to generate a valid carousel plan.".into(),
            ));
        }
    }
    Ok(plan)
}

#[async_trait]
impl DesignBackend for GeminiGateway {
    async fn chat(
        &self,
        history: &[Message],
        system_instruction: &str,
    ) -> Result<String, GatewayError> {
        let contents = history
            .iter()
            .map(|msg| Content::new(msg.role.as_str(), vec![ContentPart::text(msg.text())]))
            .collect();

        let request = GenerateContentRequest {
            contents,
            system_instruction: system_content(system_instruction),
            generation_config: None,
        };

        let response = self.generate(&self.chat_model, &request).await?;
        response.text().ok_or_else(|| {
            GatewayError::Structured("The model did not return a text reply.".into())
        })
    }

    async fn edit_image(
        &self,
        request: EditImageRequest<'_>,
    ) -> Result<EditOutcome, GatewayError> {
        let mut parts =
            vec![ContentPart::inline_image(&request.base.media_type, &request.base.data)];
        for reference in &request.references {
            parts.push(ContentPart::inline_image(
                &reference.media_type,
                &reference.data,
            ));
        }
        parts.push(ContentPart::text(request.instruction));

        let wire_request = GenerateContentRequest {
            contents: vec![Content::new("user", parts)],
            system_instruction: system_content(request.system_instruction),
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["IMAGE".into(), "TEXT".into()]),
                ..Default::default()
            }),
        };

        let response = self.generate(&self.image_model, &wire_request).await?;
        Ok(parse_edit_outcome(&response))
    }

    async fn extract_palette(&self, image: &ImageData) -> Result<Vec<String>, GatewayError> {
        let request = GenerateContentRequest {
            contents: vec![Content::new(
                "user",
                vec![
                    ContentPart::inline_image(&image.media_type, &image.data),
                    ContentPart::text(PALETTE_PROMPT),
                ],
            )],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".into()),
                response_schema: Some(json!({"type": "ARRAY", "items": {"type": "STRING"}})),
                response_modalities: None,
            }),
        };

        let response = self.generate(&self.chat_model, &request).await?;
        let text = response.text().ok_or_else(|| {
            GatewayError::Structured("Failed to extract a valid color palette.".into())
        })?;
        parse_palette(&text)
    }

    async fn plan_carousel(&self, prompt: &str) -> Result<Vec<SlidePlan>, GatewayError> {
        let request = GenerateContentRequest {
            contents: vec![Content::new(
                "user",
                vec![ContentPart::text(carousel_planning_prompt(prompt))],
            )],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".into()),
                response_schema: Some(slide_plan_schema()),
                response_modalities: None,
            }),
        };

        let response = self.generate(&self.chat_model, &request).await?;
        let text = response.text().ok_or_else(|| {
            GatewayError::Structured("Failed to generate a valid carousel plan.".into())
        })?;
        let plan: Vec<SlidePlan> = serde_json::from_str(text.trim()).map_err(|_| {
            GatewayError::Structured("Failed to generate a valid carousel plan.".into())
        })?;
        validate_plan(plan)
    }
}
