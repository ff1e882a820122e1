//! The conversation-to-action loop.
//!
//! Each submitted user message is classified against the current session
//! state and resolved as one of three actions: a multi-slide carousel run
//! (plan, then render each slide with the previous slide as baseline), a
//! single grounded image edit, or a plain conversational reply. Failures
//! inside a run are caught at the top and converted into a model turn plus
//! the session's latest-error slot; nothing is process-fatal.
//!
//! Runs are strictly serial: the session's run-state guard rejects a new
//! message while one is in flight, and every model round trip is awaited in
//! order.

use tracing::{debug, warn};

use crate::core::assets::ImageData;
use crate::core::message::Message;
use crate::core::palette::Palette;
use crate::core::session::{RunInProgress, SessionContext};
use crate::gateway::{DesignBackend, EditImageRequest, EditOutcome, GatewayError, SlidePlan};

/// Keywords that mark a message as a design action in single-image mode.
const EDIT_KEYWORDS: [&str; 4] = ["design", "create", "add", "change"];

const DEFAULT_EDIT_REPLY: &str = "Here is the updated design.";

#[derive(Debug)]
pub enum OrchestrateError {
    Gateway(GatewayError),

    /// A carousel slide came back without an image; the detail carries any
    /// text the model returned, or a per-slide failure message.
    SlideFailed { slide: u32, detail: String },
}

impl std::fmt::Display for OrchestrateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrchestrateError::Gateway(err) => write!(f, "{err}"),
            OrchestrateError::SlideFailed { detail, .. } => write!(f, "{detail}"),
        }
    }
}

impl std::error::Error for OrchestrateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OrchestrateError::Gateway(err) => Some(err),
            OrchestrateError::SlideFailed { .. } => None,
        }
    }
}

impl From<GatewayError> for OrchestrateError {
    fn from(err: GatewayError) -> Self {
        OrchestrateError::Gateway(err)
    }
}

/// Handle one submitted user message end to end.
///
/// Returns `Err(RunInProgress)` only when another run is active; every other
/// failure is absorbed into the conversation log and the latest-error slot.
pub async fn handle_message(
    session: &mut SessionContext,
    backend: &dyn DesignBackend,
    text: &str,
) -> Result<(), RunInProgress> {
    session.try_begin_run()?;
    session.last_error = None;
    session.push(Message::user(text));

    let result = run_turn(session, backend, text).await;
    if let Err(err) = result {
        warn!(error = %err, "design run failed");
        session.push(Message::model(format!(
            "Sorry, I encountered an error: {err}"
        )));
        session.last_error = Some(err.to_string());
    }

    session.finish_run();
    Ok(())
}

async fn run_turn(
    session: &mut SessionContext,
    backend: &dyn DesignBackend,
    text: &str,
) -> Result<(), OrchestrateError> {
    let system_instruction = build_system_instruction(session);
    if session.shape.is_carousel() {
        run_carousel(session, backend, text, &system_instruction).await
    } else {
        run_single(session, backend, text, &system_instruction).await
    }
}

/// The instruction bound to every model call for this session: the active
/// shape's brief plus the names of the available brand assets.
fn build_system_instruction(session: &SessionContext) -> String {
    format!(
        "{} You have the following brand assets available by name: {}.",
        session.shape.system_instruction,
        session.assets.names().join(", ")
    )
}

fn has_edit_intent(text: &str) -> bool {
    let lowered = text.to_lowercase();
    EDIT_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

fn build_edit_instruction(palette: &Palette, text: &str) -> String {
    format!(
        "Using a color palette of [{}], and the provided image(s), {}. Don't add any conversational text, just output the edited image.",
        palette.colors_joined(),
        text
    )
}

fn build_slide_instruction(palette: &Palette, slide: &SlidePlan, has_logo: bool) -> String {
    let mut instruction = format!(
        "Using a color palette of [{}], create this slide based on the plan:\n- Visuals: {}\n- Text: \"{}\"\nMaintain consistency with the previous slide. Don't add any conversational text, just output the edited image.",
        palette.colors_joined(),
        slide.visual_description,
        slide.text_content
    );
    if has_logo {
        instruction.push_str(
            "\n\nImportant: Ensure the brand logo (provided as an additional image) is included tastefully in the design on every slide.",
        );
    }
    instruction
}

async fn run_carousel(
    session: &mut SessionContext,
    backend: &dyn DesignBackend,
    text: &str,
    system_instruction: &str,
) -> Result<(), OrchestrateError> {
    let Some(mut baseline) = session
        .canvas
        .current_image
        .clone()
        .or_else(|| session.logo.as_ref().map(|l| l.image.clone()))
    else {
        session.push(Message::model(
            "Please upload a logo or have a design on the canvas to start a carousel.",
        ));
        return Ok(());
    };

    session.canvas.clear_slides();
    session.push(Message::model(
        "Great idea! Let me plan out the slides for your carousel...",
    ));

    let plan = backend.plan_carousel(text).await?;
    let total = plan.len();
    debug!(slides = total, "carousel plan ready");
    session.push(Message::model(format!(
        "I've planned {total} slides. Now, let's create them one by one."
    )));

    for slide in &plan {
        session.push(Message::model(format!(
            "Generating slide {} of {total}...",
            slide.slide_number
        )));

        let instruction = build_slide_instruction(
            session.palettes.selected(),
            slide,
            session.logo.is_some(),
        );

        let mentioned = session.assets.mentioned_in(&slide.visual_description);
        let mut references: Vec<&ImageData> = mentioned.iter().map(|a| &a.image).collect();
        if let Some(logo) = &session.logo {
            if !mentioned.iter().any(|a| a.name == logo.name) {
                references.push(&logo.image);
            }
        }

        let outcome = backend
            .edit_image(EditImageRequest {
                base: &baseline,
                instruction: &instruction,
                system_instruction,
                references,
            })
            .await?;

        match outcome.image {
            Some(image) => {
                session.canvas.carousel_slides.push(image.clone());
                session.canvas.current_image = Some(image.clone());
                baseline = image;
            }
            None => {
                // Completed slides stay visible; no retry, no rollback.
                return Err(OrchestrateError::SlideFailed {
                    slide: slide.slide_number,
                    detail: outcome.text.unwrap_or_else(|| {
                        format!(
                            "Failed to generate image for slide {}. The model did not return an image.",
                            slide.slide_number
                        )
                    }),
                });
            }
        }
    }

    session.push(Message::model(
        "Your carousel is complete! Select any slide to view it on the canvas.",
    ));
    Ok(())
}

async fn run_single(
    session: &mut SessionContext,
    backend: &dyn DesignBackend,
    text: &str,
    system_instruction: &str,
) -> Result<(), OrchestrateError> {
    let wants_edit = has_edit_intent(text) || session.canvas.current_image.is_some();
    let baseline = session
        .canvas
        .current_image
        .clone()
        .or_else(|| session.logo.as_ref().map(|l| l.image.clone()));

    match (wants_edit, baseline) {
        (true, Some(base)) => {
            let instruction = build_edit_instruction(session.palettes.selected(), text);
            let mentioned = session.assets.mentioned_in(text);
            let references: Vec<&ImageData> = mentioned.iter().map(|a| &a.image).collect();

            let outcome = backend
                .edit_image(EditImageRequest {
                    base: &base,
                    instruction: &instruction,
                    system_instruction,
                    references,
                })
                .await?;

            apply_edit_outcome(session, outcome);
        }
        _ => {
            let reply = backend.chat(&session.conversation, system_instruction).await?;
            session.push(Message::model(reply));
        }
    }
    Ok(())
}

/// A returned image becomes the canvas image and rides on the reply turn;
/// returned text becomes the reply text, with a default when only an image
/// came back.
fn apply_edit_outcome(session: &mut SessionContext, outcome: EditOutcome) {
    if let Some(image) = &outcome.image {
        session.canvas.current_image = Some(image.clone());
    }
    let reply = outcome
        .text
        .unwrap_or_else(|| DEFAULT_EDIT_REPLY.to_string());
    session.push(Message::model_with_image(reply, outcome.image));
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::core::assets::{ImageAsset, ImageData};
    use crate::core::canvas::find_shape;
    use crate::gateway::GatewayError;

    /// What the mock saw for one edit call.
    #[derive(Debug, Clone)]
    struct RecordedEdit {
        base_data: String,
        instruction: String,
        system_instruction: String,
        reference_count: usize,
    }

    #[derive(Default)]
    struct MockBackend {
        edit_results: Mutex<VecDeque<EditOutcome>>,
        plan: Mutex<Option<Result<Vec<SlidePlan>, GatewayError>>>,
        chat_reply: Mutex<Option<String>>,
        edits: Mutex<Vec<RecordedEdit>>,
        chat_calls: Mutex<usize>,
    }

    impl MockBackend {
        fn with_edits(outcomes: Vec<EditOutcome>) -> Self {
            Self {
                edit_results: Mutex::new(outcomes.into()),
                ..Default::default()
            }
        }

        fn recorded_edits(&self) -> Vec<RecordedEdit> {
            self.edits.lock().unwrap().clone()
        }

        fn model_calls(&self) -> usize {
            self.recorded_edits().len() + *self.chat_calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl DesignBackend for MockBackend {
        async fn chat(
            &self,
            _history: &[Message],
            _system_instruction: &str,
        ) -> Result<String, GatewayError> {
            *self.chat_calls.lock().unwrap() += 1;
            Ok(self
                .chat_reply
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| "Happy to help!".to_string()))
        }

        async fn edit_image(
            &self,
            request: EditImageRequest<'_>,
        ) -> Result<EditOutcome, GatewayError> {
            self.edits.lock().unwrap().push(RecordedEdit {
                base_data: request.base.data.clone(),
                instruction: request.instruction.to_string(),
                system_instruction: request.system_instruction.to_string(),
                reference_count: request.references.len(),
            });
            Ok(self
                .edit_results
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected edit_image call"))
        }

        async fn extract_palette(&self, _image: &ImageData) -> Result<Vec<String>, GatewayError> {
            panic!("unexpected extract_palette call");
        }

        async fn plan_carousel(&self, _prompt: &str) -> Result<Vec<SlidePlan>, GatewayError> {
            self.plan
                .lock()
                .unwrap()
                .take()
                .expect("unexpected plan_carousel call")
        }
    }

    fn image(tag: &str) -> ImageData {
        ImageData::from_bytes(tag.as_bytes(), "image/png")
    }

    fn image_outcome(tag: &str) -> EditOutcome {
        EditOutcome {
            image: Some(image(tag)),
            text: None,
        }
    }

    fn slide(n: u32, visuals: &str) -> SlidePlan {
        SlidePlan {
            slide_number: n,
            visual_description: visuals.to_string(),
            text_content: format!("Slide {n}"),
        }
    }

    fn session_with_logo() -> SessionContext {
        let mut session = SessionContext::new();
        session.set_logo(ImageAsset::new("brand.png", image("logo")));
        session
    }

    fn carousel_session_with_logo() -> SessionContext {
        let mut session = session_with_logo();
        session.set_shape(find_shape("Social Carousel (Square)").unwrap());
        session
    }

    fn last_text(session: &SessionContext) -> &str {
        &session.conversation.last().unwrap().parts[0].text
    }

    #[tokio::test]
    async fn carousel_without_base_image_makes_no_model_call() {
        let mut session = SessionContext::new();
        session.set_shape(find_shape("Social Carousel (Square)").unwrap());
        let backend = MockBackend::default();

        handle_message(&mut session, &backend, "make a carousel about coffee")
            .await
            .unwrap();

        assert_eq!(backend.model_calls(), 0);
        assert!(backend.plan.lock().unwrap().is_none());
        assert_eq!(
            last_text(&session),
            "Please upload a logo or have a design on the canvas to start a carousel."
        );
        assert!(session.last_error.is_none());
    }

    #[tokio::test]
    async fn carousel_renders_each_slide_from_the_previous() {
        let mut session = carousel_session_with_logo();
        let backend = MockBackend::with_edits(vec![image_outcome("s1"), image_outcome("s2")]);
        *backend.plan.lock().unwrap() =
            Some(Ok(vec![slide(1, "an opener"), slide(2, "a closer")]));

        handle_message(&mut session, &backend, "carousel about our launch")
            .await
            .unwrap();

        assert_eq!(session.canvas.carousel_slides.len(), 2);
        assert_eq!(
            session.canvas.current_image.as_ref().unwrap(),
            &session.canvas.carousel_slides[1]
        );

        let edits = backend.recorded_edits();
        // Slide 1 starts from the logo (canvas was seeded with it), slide 2
        // from slide 1's output.
        assert_eq!(edits[0].base_data, image("logo").data);
        assert_eq!(edits[1].base_data, image("s1").data);
        assert!(edits[0].instruction.contains("an opener"));
        assert!(edits[0]
            .instruction
            .contains("included tastefully in the design on every slide"));
        assert!(last_text(&session).starts_with("Your carousel is complete!"));
        assert!(session.last_error.is_none());
    }

    #[tokio::test]
    async fn carousel_failure_keeps_completed_slides_and_stops() {
        let mut session = carousel_session_with_logo();
        let backend = MockBackend::with_edits(vec![
            image_outcome("s1"),
            EditOutcome::default(), // slide 2: no image, no text
        ]);
        *backend.plan.lock().unwrap() = Some(Ok(vec![
            slide(1, "one"),
            slide(2, "two"),
            slide(3, "three"),
        ]));

        handle_message(&mut session, &backend, "three slide story")
            .await
            .unwrap();

        // Exactly one completed slide remains; slide 3 was never attempted.
        assert_eq!(session.canvas.carousel_slides.len(), 1);
        assert_eq!(backend.recorded_edits().len(), 2);
        assert_eq!(
            last_text(&session),
            "Sorry, I encountered an error: Failed to generate image for slide 2. The model did not return an image."
        );
        assert!(session.last_error.is_some());
    }

    #[tokio::test]
    async fn carousel_failure_surfaces_model_text() {
        let mut session = carousel_session_with_logo();
        let backend = MockBackend::with_edits(vec![EditOutcome {
            image: None,
            text: Some("I can't depict that subject.".to_string()),
        }]);
        *backend.plan.lock().unwrap() = Some(Ok(vec![slide(1, "one")]));

        handle_message(&mut session, &backend, "carousel").await.unwrap();

        assert_eq!(
            last_text(&session),
            "Sorry, I encountered an error: I can't depict that subject."
        );
        assert_eq!(
            session.last_error.as_deref(),
            Some("I can't depict that subject.")
        );
    }

    #[tokio::test]
    async fn planning_failure_is_reported_before_any_slide() {
        let mut session = carousel_session_with_logo();
        let backend = MockBackend::default();
        *backend.plan.lock().unwrap() = Some(Err(GatewayError::Structured(
            "Failed to generate a valid carousel plan.".into(),
        )));

        handle_message(&mut session, &backend, "carousel").await.unwrap();

        assert!(session.canvas.carousel_slides.is_empty());
        assert!(backend.recorded_edits().is_empty());
        assert_eq!(
            last_text(&session),
            "Sorry, I encountered an error: Failed to generate a valid carousel plan."
        );
    }

    #[tokio::test]
    async fn carousel_includes_mentioned_assets_plus_logo() {
        let mut session = carousel_session_with_logo();
        session.upload_asset(ImageAsset::new("mascot.png", image("mascot")));
        let backend = MockBackend::with_edits(vec![image_outcome("s1")]);
        *backend.plan.lock().unwrap() = Some(Ok(vec![slide(1, "the mascot waving hello")]));

        handle_message(&mut session, &backend, "carousel").await.unwrap();

        // Mascot matched by stem, logo always added as a reference.
        assert_eq!(backend.recorded_edits()[0].reference_count, 2);
    }

    #[tokio::test]
    async fn sale_announcement_scenario_edits_from_logo() {
        let mut session = session_with_logo();
        session.select_palette("Corporate");
        assert_eq!(session.shape.name, "Social Post (Square)");
        let backend = MockBackend::with_edits(vec![image_outcome("edited")]);

        handle_message(&mut session, &backend, "create a sale announcement")
            .await
            .unwrap();

        let edits = backend.recorded_edits();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].base_data, image("logo").data);
        for color in ["#0D3B66", "#FAF0CA", "#F4D35E", "#EE964B", "#F95738"] {
            assert!(edits[0].instruction.contains(color));
        }
        assert!(edits[0].instruction.contains("create a sale announcement"));
        assert!(edits[0]
            .system_instruction
            .starts_with("You are a graphic designer creating a visually engaging square"));

        assert_eq!(
            session.canvas.current_image.as_ref().unwrap(),
            &image("edited")
        );
        let reply = session.conversation.last().unwrap();
        assert_eq!(reply.parts[0].text, "Here is the updated design.");
        assert_eq!(reply.parts[0].image.as_ref().unwrap(), &image("edited"));
    }

    #[tokio::test]
    async fn text_only_edit_outcome_leaves_canvas_unchanged() {
        let mut session = session_with_logo();
        let before = session.canvas.current_image.clone();
        let backend = MockBackend::with_edits(vec![EditOutcome {
            image: None,
            text: Some("Could you describe the layout you want?".to_string()),
        }]);

        handle_message(&mut session, &backend, "change the headline")
            .await
            .unwrap();

        assert_eq!(session.canvas.current_image, before);
        let reply = session.conversation.last().unwrap();
        assert_eq!(reply.parts[0].text, "Could you describe the layout you want?");
        assert!(reply.parts[0].image.is_none());
    }

    #[tokio::test]
    async fn single_edit_matches_assets_against_full_text_without_logo() {
        let mut session = session_with_logo();
        session.upload_asset(ImageAsset::new("mascot.png", image("mascot")));
        let backend = MockBackend::with_edits(vec![image_outcome("edited")]);

        handle_message(&mut session, &backend, "add the mascot to the corner")
            .await
            .unwrap();

        // Only the mentioned asset; the logo is not force-included here.
        assert_eq!(backend.recorded_edits()[0].reference_count, 1);
    }

    #[tokio::test]
    async fn plain_question_falls_back_to_chat() {
        let mut session = SessionContext::new();
        let backend = MockBackend::default();
        *backend.chat_reply.lock().unwrap() = Some("Carousels work great for tips.".to_string());

        handle_message(&mut session, &backend, "what formats work best?")
            .await
            .unwrap();

        assert_eq!(*backend.chat_calls.lock().unwrap(), 1);
        assert!(backend.recorded_edits().is_empty());
        assert_eq!(last_text(&session), "Carousels work great for tips.");
    }

    #[tokio::test]
    async fn current_image_alone_implies_edit_intent() {
        let mut session = SessionContext::new();
        session.canvas.current_image = Some(image("wip"));
        let backend = MockBackend::with_edits(vec![image_outcome("edited")]);

        handle_message(&mut session, &backend, "make it warmer")
            .await
            .unwrap();

        assert_eq!(backend.recorded_edits().len(), 1);
        assert_eq!(backend.recorded_edits()[0].base_data, image("wip").data);
    }

    #[tokio::test]
    async fn reentrant_submission_is_rejected() {
        let mut session = SessionContext::new();
        session.try_begin_run().unwrap();
        let backend = MockBackend::default();

        let result = handle_message(&mut session, &backend, "hello").await;
        assert_eq!(result, Err(RunInProgress));
    }

    #[tokio::test]
    async fn error_state_clears_on_next_message() {
        let mut session = carousel_session_with_logo();
        let backend = MockBackend::default();
        *backend.plan.lock().unwrap() = Some(Err(GatewayError::Structured(
            "Failed to generate a valid carousel plan.".into(),
        )));
        handle_message(&mut session, &backend, "carousel").await.unwrap();
        assert!(session.last_error.is_some());

        session.set_shape(find_shape("Social Post (Square)").unwrap());
        let backend = MockBackend::with_edits(vec![image_outcome("recovered")]);
        handle_message(&mut session, &backend, "add a headline")
            .await
            .unwrap();
        assert!(session.last_error.is_none());
    }

    #[test]
    fn edit_intent_keywords_are_case_insensitive() {
        assert!(has_edit_intent("please DESIGN something"));
        assert!(has_edit_intent("Create a banner"));
        assert!(has_edit_intent("add a border"));
        assert!(has_edit_intent("change the font"));
        assert!(!has_edit_intent("what do you think?"));
    }
}
