//! Maquette is a chat-driven graphic design studio for working with a
//! remote generative image model.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns session state (logo, brand assets, palettes, canvas,
//!   conversation log) and the orchestration loop that turns a user message
//!   into a carousel run, a grounded image edit, or a plain reply.
//! - [`gateway`] is the model boundary: the [`gateway::DesignBackend`] trait
//!   and its Gemini-backed implementation, one request/response round trip
//!   per operation.
//! - [`api`] defines the wire payloads exchanged with the generative
//!   endpoint.
//! - [`commands`] parses the studio's slash commands and [`cli`] runs the
//!   interactive loop.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod gateway;
pub mod utils;
