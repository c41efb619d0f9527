pub mod cli;
pub mod compiler;
pub mod config;
pub mod interpreter;
pub mod runner;
pub mod stage;
pub mod storage;

// Re-export main types
pub use compiler::{compile, BlockGraph, JsonWorkspace};
pub use config::Config;
pub use interpreter::{Engine, Program, TickOutcome};
pub use runner::Session;
pub use stage::{SharedSprite, Sprite};
