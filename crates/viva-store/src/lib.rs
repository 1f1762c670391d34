//! viva-store — Session persistence backends for viva.
//!
//! Implements the core `SessionStore` trait in memory (tests, embedding) and
//! on disk as one JSON file per session (the CLI default).

pub mod json;
pub mod memory;

pub use json::JsonFileStore;
pub use memory::MemoryStore;
