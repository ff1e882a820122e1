//! Command-line entry point and the interactive studio loop.
//!
//! The loop reads lines from stdin: slash commands drive session plumbing
//! (uploads, palette/shape selection, save/load, download), and everything
//! else is handed to the orchestrator. Submissions are sequential; the
//! session's run-state guard is authoritative for reentrancy.

use std::error::Error;
use std::io::{BufRead, Write};
use std::path::Path;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::commands::{self, Command, HELP_TEXT};
use crate::core::config::Config;
use crate::core::orchestrator;
use crate::core::session::{SessionContext, SessionStoreError};
use crate::gateway::{DesignBackend, GeminiGateway};
use crate::utils::image::read_image_file;

#[derive(Parser)]
#[command(name = "maquette")]
#[command(about = "A chat-driven AI graphic design studio")]
#[command(
    long_about = "Maquette is a chat-driven graphic design studio. Upload a logo and brand \
assets, pick a color palette and canvas shape, then tell the assistant what to create. \
Carousel shapes turn a request into a planned multi-slide sequence rendered one slide at a \
time.\n\n\
Environment Variables:\n\
  GEMINI_API_KEY    API key for the generative backend (overrides the config file)\n\n\
Type /help inside the studio for the command list."
)]
pub struct Args {
    /// Override the chat/planning model
    #[arg(long, value_name = "MODEL")]
    pub chat_model: Option<String>,

    /// Override the image editing model
    #[arg(long, value_name = "MODEL")]
    pub image_model: Option<String>,

    /// Load the saved session on startup
    #[arg(long)]
    pub resume: bool,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = Config::load()?;

    let Some(api_key) = config.resolve_api_key() else {
        eprintln!(
            "No API key configured.\n\n\
Set one with:\n  export GEMINI_API_KEY=\"your-api-key-here\"\n\n\
or add `api_key = \"...\"` to {}",
            Config::config_path().display()
        );
        std::process::exit(1);
    };

    let gateway = GeminiGateway::new(
        api_key,
        config.resolve_base_url(),
        args.chat_model.clone().unwrap_or_else(|| config.resolve_chat_model()),
        args.image_model.clone().unwrap_or_else(|| config.resolve_image_model()),
    );

    let mut session = SessionContext::new();
    if args.resume {
        match session.load() {
            Ok(path) => info!(path = %path.display(), "resumed saved session"),
            Err(SessionStoreError::NotFound { .. }) => {
                eprintln!("No saved design found; starting fresh.");
            }
            Err(err) => eprintln!("{err}"),
        }
    }

    run_studio(&mut session, &gateway).await
}

async fn run_studio(
    session: &mut SessionContext,
    backend: &dyn DesignBackend,
) -> Result<(), Box<dyn Error>> {
    let mut printed = 0;
    print_new_turns(session, &mut printed);

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if commands::is_command(input) {
            match commands::parse(input) {
                Ok(Command::Quit) => break,
                Ok(command) => dispatch(session, backend, command).await,
                Err(err) => eprintln!("{err}"),
            }
        } else if let Err(err) = orchestrator::handle_message(session, backend, input).await {
            eprintln!("{err}");
        }

        print_new_turns(session, &mut printed);
    }

    Ok(())
}

async fn dispatch(session: &mut SessionContext, backend: &dyn DesignBackend, command: Command) {
    match command {
        Command::Logo(path) => match read_image_file(&path) {
            Ok(asset) => session.set_logo(asset),
            Err(err) => eprintln!("{err}"),
        },
        Command::Asset(path) => match read_image_file(&path) {
            Ok(asset) => {
                let name = asset.name.clone();
                if session.upload_asset(asset) {
                    println!("Asset '{name}' added.");
                } else {
                    println!("Asset '{name}' already exists.");
                }
            }
            Err(err) => eprintln!("{err}"),
        },
        Command::RemoveAsset(name) => {
            if session.delete_asset(&name) {
                println!("Asset '{name}' removed.");
            } else {
                println!("No asset named '{name}'.");
            }
        }
        Command::ListAssets => {
            if session.assets.is_empty() {
                println!("No brand assets uploaded.");
            } else {
                for name in session.assets.names() {
                    println!("  {name}");
                }
            }
        }
        Command::Palette(None) => {
            let selected = session.palettes.selected().name.clone();
            for palette in session.palettes.palettes() {
                let marker = if palette.name == selected { "*" } else { " " };
                println!("{marker} {} [{}]", palette.name, palette.colors_joined());
            }
        }
        Command::Palette(Some(name)) => {
            if !session.select_palette(&name) {
                println!("No palette named '{name}'. Use /palette to list them.");
            }
        }
        Command::PaletteFrom(path) => extract_palette_into(session, backend, &path).await,
        Command::Shape(None) => {
            for shape in crate::core::canvas::builtin_shapes() {
                let marker = if shape.name == session.shape.name { "*" } else { " " };
                println!("{marker} {} ({})", shape.name, shape.aspect_ratio);
            }
        }
        Command::Shape(Some(name)) => match crate::core::canvas::find_shape(&name) {
            Some(shape) => session.set_shape(shape),
            None => println!("No shape named '{name}'. Use /shape to list them."),
        },
        Command::Slide(number) => {
            if session.select_slide(number - 1) {
                println!("Slide {number} is now on the canvas.");
            } else {
                println!("No carousel slide {number}.");
            }
        }
        Command::Save => match session.save() {
            Ok(path) => println!("Design saved to {}.", path.display()),
            Err(err) => eprintln!("{err}"),
        },
        Command::Load => match session.load() {
            Ok(_) => println!("Previously saved design loaded!"),
            Err(err) => eprintln!("{err}"),
        },
        Command::Download => match session.export_current() {
            Ok((filename, bytes)) => match std::fs::write(&filename, bytes) {
                Ok(()) => println!("Saved {filename}."),
                Err(err) => eprintln!("Failed to write {filename}: {err}"),
            },
            Err(err) => eprintln!("{err}"),
        },
        Command::New => session.new_design(),
        Command::Help => println!("{HELP_TEXT}"),
        Command::Quit => unreachable!("handled by the studio loop"),
    }
}

/// Extract a palette from an image file via the backend and select it.
/// Failures leave the palette book untouched, per the session contract.
async fn extract_palette_into(
    session: &mut SessionContext,
    backend: &dyn DesignBackend,
    path: &Path,
) {
    let asset = match read_image_file(path) {
        Ok(asset) => asset,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };

    session.push(crate::core::message::Message::model(
        "Analyzing your image to extract a color palette...",
    ));

    match backend.extract_palette(&asset.image).await {
        Ok(colors) => session.apply_extracted_palette(&asset.name, colors),
        Err(err) => {
            session.last_error = Some(err.to_string());
            session.push(crate::core::message::Message::model(
                "Sorry, I couldn't extract a palette from that image. Please try another one.",
            ));
        }
    }
}

fn print_new_turns(session: &SessionContext, printed: &mut usize) {
    for message in &session.conversation[*printed..] {
        let prefix = if message.is_user() { "You" } else { "Designer" };
        for part in &message.parts {
            if !part.text.is_empty() {
                println!("{prefix}: {}", part.text);
            }
            if part.image.is_some() {
                println!("{prefix}: [canvas image updated; /download to save it]");
            }
        }
    }
    *printed = session.conversation.len();
}
