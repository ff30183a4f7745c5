//! Output renderers for sync events.

pub mod json;

pub use json::JsonRenderer;
