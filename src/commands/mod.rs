//! Slash-command parsing for the studio loop.
//!
//! Anything starting with `/` is a studio command; everything else goes to
//! the design assistant. Arguments that may contain spaces (palette and
//! shape names, file paths) take the remainder of the line.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Upload the logo from a file path.
    Logo(PathBuf),
    /// Upload a brand asset from a file path.
    Asset(PathBuf),
    /// Delete a brand asset by name.
    RemoveAsset(String),
    /// List the uploaded brand assets.
    ListAssets,
    /// Select a palette by name, or list palettes when no name is given.
    Palette(Option<String>),
    /// Extract a palette from an image file and select it.
    PaletteFrom(PathBuf),
    /// Select a canvas shape by name, or list shapes when no name is given.
    Shape(Option<String>),
    /// Put a completed carousel slide (1-based) on the canvas.
    Slide(usize),
    Save,
    Load,
    Download,
    New,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    Unknown(String),
    MissingArgument { command: &'static str, usage: &'static str },
    BadArgument { command: &'static str, detail: String },
}

impl std::fmt::Display for CommandParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandParseError::Unknown(name) => {
                write!(f, "Unknown command '/{name}'. Try /help.")
            }
            CommandParseError::MissingArgument { command, usage } => {
                write!(f, "/{command} needs an argument. Usage: {usage}")
            }
            CommandParseError::BadArgument { command, detail } => {
                write!(f, "/{command}: {detail}")
            }
        }
    }
}

impl std::error::Error for CommandParseError {}

/// Whether an input line is a command rather than a chat message.
pub fn is_command(input: &str) -> bool {
    input.trim_start().starts_with('/')
}

pub fn parse(input: &str) -> Result<Command, CommandParseError> {
    let trimmed = input.trim();
    let without_slash = trimmed.strip_prefix('/').unwrap_or(trimmed);
    let (name, rest) = match without_slash.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (without_slash, ""),
    };

    let arg = (!rest.is_empty()).then(|| rest.to_string());

    match name {
        "logo" => Ok(Command::Logo(PathBuf::from(required(
            arg,
            "logo",
            "/logo <image file>",
        )?))),
        "asset" => Ok(Command::Asset(PathBuf::from(required(
            arg,
            "asset",
            "/asset <image file>",
        )?))),
        "asset-rm" => Ok(Command::RemoveAsset(required(
            arg,
            "asset-rm",
            "/asset-rm <asset name>",
        )?)),
        "assets" => Ok(Command::ListAssets),
        "palette" => Ok(Command::Palette(arg)),
        "palette-from" => Ok(Command::PaletteFrom(PathBuf::from(required(
            arg,
            "palette-from",
            "/palette-from <image file>",
        )?))),
        "shape" => Ok(Command::Shape(arg)),
        "slide" => {
            let raw = required(arg, "slide", "/slide <number>")?;
            let number: usize = raw.parse().map_err(|_| CommandParseError::BadArgument {
                command: "slide",
                detail: format!("'{raw}' is not a slide number"),
            })?;
            if number == 0 {
                return Err(CommandParseError::BadArgument {
                    command: "slide",
                    detail: "slide numbers start at 1".to_string(),
                });
            }
            Ok(Command::Slide(number))
        }
        "save" => Ok(Command::Save),
        "load" => Ok(Command::Load),
        "download" => Ok(Command::Download),
        "new" => Ok(Command::New),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(CommandParseError::Unknown(other.to_string())),
    }
}

fn required(
    arg: Option<String>,
    command: &'static str,
    usage: &'static str,
) -> Result<String, CommandParseError> {
    arg.ok_or(CommandParseError::MissingArgument { command, usage })
}

pub const HELP_TEXT: &str = "\
Studio commands:
  /logo <file>          Upload your logo (becomes the canvas image)
  /asset <file>         Upload a reusable brand asset
  /asset-rm <name>      Delete a brand asset
  /assets               List brand assets
  /palette [name]       Select a color palette, or list palettes
  /palette-from <file>  Extract a palette from an image and select it
  /shape [name]         Select a canvas shape, or list shapes
  /slide <n>            Put carousel slide n on the canvas
  /save                 Save the session
  /load                 Load the saved session
  /download             Write the canvas image to a file
  /new                  Start a new design
  /quit                 Exit

Anything else is sent to the design assistant.";
