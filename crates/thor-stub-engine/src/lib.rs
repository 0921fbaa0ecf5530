//! # thor-stub-engine
//!
//! Deterministic stand-in for the simulation engine. It speaks the same
//! field-block protocol as the real engine over a pipe, a Unix socket or
//! HTTP, and resolves actions with the shared signature registry.
//!
//! The world is a flat floor with a fixed set of objects; frames are
//! synthetic byte patterns that depend only on the viewpoint.

pub mod engine;
pub mod http;
pub mod render;
pub mod serve;
pub mod world;

pub use engine::Engine;
pub use http::{SharedEngine, router, serve_http};
pub use serve::serve_pipe;
#[cfg(unix)]
pub use serve::serve_unix;
pub use world::World;
