//! stacksmith: infrastructure-as-code synthesis.
//!
//! Declare stacks of constructs, wire them together with references, and
//! synthesize each stack into a deterministic, dependency-ordered template.

pub mod cli;
pub mod core;
pub mod resources;
