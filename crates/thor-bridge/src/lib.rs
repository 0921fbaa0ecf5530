//! Wire protocol and transports between the controller and the engine
//!
//! This crate provides:
//! - Field-block envelope codec shared by both ends of the wire
//! - The `Transport` trait the controller drives
//! - Framed pipe transport over any async stream, a Unix socket or a child process
//! - HTTP transport posting envelopes to the engine's step endpoint

pub mod http;
pub mod pipe;
pub mod process;
pub mod protocol;
pub mod transport;

pub use http::HttpTransport;
pub use pipe::PipeTransport;
pub use process::{EngineCommand, EngineProcess};
pub use protocol::{Envelope, Field, FieldType, MAX_FIELD_LEN};
pub use transport::{Transport, TransportKind, read_envelope, write_envelope};
