//! Synthesis core: app and stack model, construct tree, reference
//! resolution, template emission and assembly output.

pub mod app;
pub mod assembly;
pub mod construct;
pub mod error;
pub mod hasher;
pub mod parser;
pub mod resolver;
pub mod stack;
pub mod synth;
pub mod types;
