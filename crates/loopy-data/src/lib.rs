//! Loopy Data -- diagram files for the Loopy engine.
//!
//! Reads a diagram description (global settings, named nodes, edges wired by
//! name) from RON, TOML or JSON and resolves it into a ready-to-start
//! [`loopy_core::engine::Engine`].

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, Format, LoadedDiagram, load_diagram, load_diagram_str};
