//! Color palettes and the selectable palette book.
//!
//! The book is seeded from a fixed preset list. Palettes derived from user
//! images are prepended (replacing any same-named entry) and selected.
//! Exactly one palette is selected at any time and it is always a member of
//! the book, falling back to the first entry.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub name: String,
    pub colors: Vec<String>,
}

impl Palette {
    pub fn new(name: impl Into<String>, colors: Vec<String>) -> Self {
        Self {
            name: name.into(),
            colors,
        }
    }

    /// Colors joined for prompt interpolation: "#AAA, #BBB, ...".
    pub fn colors_joined(&self) -> String {
        self.colors.join(", ")
    }
}

/// The fixed preset palettes every session starts with.
pub fn preset_palettes() -> Vec<Palette> {
    let presets: [(&str, [&str; 5]); 6] = [
        (
            "Vibrant",
            ["#FF5733", "#33FF57", "#3357FF", "#FF33A1", "#A133FF"],
        ),
        (
            "Corporate",
            ["#0D3B66", "#FAF0CA", "#F4D35E", "#EE964B", "#F95738"],
        ),
        (
            "Pastel",
            ["#A8E6CF", "#DCEDC1", "#FFD3B6", "#FFAAA5", "#FF8B94"],
        ),
        (
            "Monochrome",
            ["#222222", "#444444", "#666666", "#999999", "#CCCCCC"],
        ),
        (
            "Ocean",
            ["#00A7E1", "#007EA7", "#003459", "#F0F0F0", "#FFFFFF"],
        ),
        (
            "Sunset",
            ["#FAD02C", "#F7934C", "#CC444B", "#8B2635", "#4B1D3F"],
        ),
    ];

    presets
        .into_iter()
        .map(|(name, colors)| Palette::new(name, colors.iter().map(|c| c.to_string()).collect()))
        .collect()
}

/// Ordered palette list plus the name of the selected entry.
///
/// Deserialization routes through [`PaletteBook::from_parts`] so a restored
/// book always satisfies the invariants: the list is non-empty and the
/// selection resolves to a member.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RawPaletteBook")]
pub struct PaletteBook {
    palettes: Vec<Palette>,
    selected: String,
}

#[derive(Deserialize)]
struct RawPaletteBook {
    #[serde(default)]
    palettes: Vec<Palette>,
    #[serde(default)]
    selected: String,
}

impl From<RawPaletteBook> for PaletteBook {
    fn from(raw: RawPaletteBook) -> Self {
        Self::from_parts(raw.palettes, raw.selected)
    }
}

impl Default for PaletteBook {
    fn default() -> Self {
        let palettes = preset_palettes();
        let selected = palettes[0].name.clone();
        Self { palettes, selected }
    }
}

impl PaletteBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(palettes: Vec<Palette>, selected: String) -> Self {
        let palettes = if palettes.is_empty() {
            preset_palettes()
        } else {
            palettes
        };
        let mut book = Self { palettes, selected };
        if book.find(&book.selected).is_none() {
            book.selected = book.palettes[0].name.clone();
        }
        book
    }

    pub fn palettes(&self) -> &[Palette] {
        &self.palettes
    }

    fn find(&self, name: &str) -> Option<&Palette> {
        self.palettes
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// The currently selected palette. Always resolves to a member of the
    /// book; the first entry is the fallback.
    pub fn selected(&self) -> &Palette {
        self.find(&self.selected).unwrap_or(&self.palettes[0])
    }

    /// Select a palette by name (case-insensitive). Returns whether a match
    /// was found; selection is unchanged otherwise.
    pub fn select(&mut self, name: &str) -> bool {
        match self.find(name) {
            Some(palette) => {
                self.selected = palette.name.clone();
                true
            }
            None => false,
        }
    }

    /// Add a palette extracted from a user image: prepended, replacing any
    /// same-named entry, and selected. Existing palettes are never mutated
    /// in place.
    pub fn add_extracted(&mut self, palette: Palette) {
        self.palettes.retain(|p| p.name != palette.name);
        self.selected = palette.name.clone();
        self.palettes.insert(0, palette);
    }

    /// Reset the selection to the first palette in the book.
    pub fn select_first(&mut self) {
        self.selected = self.palettes[0].name.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_seeded_in_order() {
        let book = PaletteBook::new();
        assert_eq!(book.palettes().len(), 6);
        assert_eq!(book.palettes()[0].name, "Vibrant");
        assert_eq!(book.selected().name, "Vibrant");
        assert_eq!(book.palettes()[1].colors[0], "#0D3B66");
    }

    #[test]
    fn select_is_case_insensitive() {
        let mut book = PaletteBook::new();
        assert!(book.select("corporate"));
        assert_eq!(book.selected().name, "Corporate");
        assert!(!book.select("neon"));
        assert_eq!(book.selected().name, "Corporate");
    }

    #[test]
    fn extracted_palette_is_prepended_and_selected() {
        let mut book = PaletteBook::new();
        let custom = Palette::new(
            "Custom - photo.jpg",
            vec!["#111111".into(), "#222222".into()],
        );
        book.add_extracted(custom.clone());
        assert_eq!(book.palettes()[0], custom);
        assert_eq!(book.selected().name, "Custom - photo.jpg");
        assert_eq!(book.palettes().len(), 7);
    }

    #[test]
    fn extracted_palette_replaces_same_name() {
        let mut book = PaletteBook::new();
        book.add_extracted(Palette::new("Custom - a", vec!["#111111".into()]));
        book.add_extracted(Palette::new("Custom - a", vec!["#333333".into()]));
        assert_eq!(book.palettes().len(), 7);
        assert_eq!(book.selected().colors[0], "#333333");
    }

    #[test]
    fn restored_selection_falls_back_to_member() {
        let book = PaletteBook::from_parts(preset_palettes(), "gone".into());
        assert_eq!(book.selected().name, "Vibrant");
    }

    #[test]
    fn deserialized_book_upholds_invariants() {
        // An empty palette list in a persisted blob falls back to the
        // presets instead of producing a book that cannot resolve a
        // selection.
        let mut book: PaletteBook =
            serde_json::from_str(r#"{"palettes": [], "selected": "Vibrant"}"#).unwrap();
        assert_eq!(book.palettes().len(), 6);
        assert_eq!(book.selected().name, "Vibrant");
        book.select_first();
        assert_eq!(book.selected().name, "Vibrant");

        let book: PaletteBook =
            serde_json::from_str(r#"{"palettes": [], "selected": "gone"}"#).unwrap();
        assert_eq!(book.selected().name, "Vibrant");
    }

    #[test]
    fn colors_joined_formats_for_prompts() {
        let palette = Palette::new("Duo", vec!["#000000".into(), "#FFFFFF".into()]);
        assert_eq!(palette.colors_joined(), "#000000, #FFFFFF");
    }
}
