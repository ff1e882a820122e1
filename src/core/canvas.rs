//! Canvas shapes and the working canvas state.
//!
//! Shapes are a fixed enumerated set; each carries the aspect ratio and the
//! generation instruction bound to every model call while it is active. A
//! shape whose name contains "carousel" switches the orchestrator into
//! carousel mode.

use serde::{Deserialize, Serialize};

use crate::core::assets::ImageData;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasShape {
    pub name: String,
    pub aspect_ratio: String,
    pub system_instruction: String,
}

impl CanvasShape {
    pub fn is_carousel(&self) -> bool {
        self.name.to_lowercase().contains("carousel")
    }
}

/// The fixed set of canvas shapes. The first entry is the default.
pub fn builtin_shapes() -> Vec<CanvasShape> {
    let shapes = [
        (
            "Social Post (Square)",
            "1 / 1",
            "You are a graphic designer creating a visually engaging square social media post (1:1 aspect ratio). The design should be bold, eye-catching, and optimized for platforms like Instagram. Text should be minimal and legible.",
        ),
        (
            "Social Story (Portrait)",
            "9 / 16",
            "You are a graphic designer creating a vertical social media story (9:16 aspect ratio). The design must fill the screen and be suitable for Instagram Stories or TikTok. Consider space for interactive elements at the top and bottom.",
        ),
        (
            "Flyer (Portrait)",
            "1 / 1.414",
            "You are a graphic designer creating a professional A4-style portrait flyer. The layout should be well-structured with clear headings, body text, and a call-to-action. It needs to be suitable for printing.",
        ),
        (
            "Web Banner (Landscape)",
            "16 / 9",
            "You are a graphic designer creating a wide landscape banner for a website (16:9 aspect ratio). The design should be clean, impactful, and guide the user's eye towards a key message or button.",
        ),
        (
            "Social Carousel (Square)",
            "1 / 1",
            "You are a graphic designer creating a slide for a social media carousel (1:1 aspect ratio). You will be given instructions for a single slide, and the previous slide as context. Maintain a consistent visual style (fonts, colors, layout) with the previous slide. The design should be clean, engaging, and part of a cohesive multi-slide story.",
        ),
    ];

    shapes
        .into_iter()
        .map(|(name, ratio, instruction)| CanvasShape {
            name: name.to_string(),
            aspect_ratio: ratio.to_string(),
            system_instruction: instruction.to_string(),
        })
        .collect()
}

pub fn default_shape() -> CanvasShape {
    builtin_shapes().remove(0)
}

/// Find a builtin shape by name (case-insensitive).
pub fn find_shape(name: &str) -> Option<CanvasShape> {
    builtin_shapes()
        .into_iter()
        .find(|s| s.name.eq_ignore_ascii_case(name))
}

/// The working image plus any completed carousel slides. Slides are
/// non-empty only while a carousel shape is active and at least one slide
/// has completed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanvasState {
    pub current_image: Option<ImageData>,
    pub carousel_slides: Vec<ImageData>,
}

impl CanvasState {
    pub fn clear_slides(&mut self) {
        self.carousel_slides.clear();
    }

    /// Make a completed slide the visible canvas image.
    pub fn select_slide(&mut self, index: usize) -> bool {
        match self.carousel_slides.get(index) {
            Some(slide) => {
                self.current_image = Some(slide.clone());
                true
            }
            None => false,
        }
    }
}
