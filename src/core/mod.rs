pub mod assets;
pub mod canvas;
pub mod config;
pub mod message;
pub mod orchestrator;
pub mod palette;
pub mod session;
