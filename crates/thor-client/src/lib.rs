//! Controller for the simulation engine
//!
//! Resolves actions against the engine's overloaded action surface, sends
//! them over a pipe or HTTP transport and decodes the multi-frame responses
//! into typed events.
//!
//! ```no_run
//! use thor_client::{Controller, ControllerConfig, TransportConfig};
//! use thor_bridge::EngineCommand;
//! use thor_core::ActionRequest;
//!
//! # async fn run() -> thor_core::Result<()> {
//! let config = ControllerConfig {
//!     transport: Some(TransportConfig::Pipe {
//!         command: EngineCommand::new("thor-stub-engine"),
//!     }),
//!     ..Default::default()
//! };
//! let mut controller = Controller::launch(config).await?;
//! let event = controller
//!     .step(&ActionRequest::new("RotateLook").param("rotation", 90).param("horizon", 30))
//!     .await?;
//! assert!(event.success());
//! controller.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod decoder;
pub mod event;

pub use config::{
    ControllerConfig, RenderFlags, RenderOptions, ResetOptions, TransportConfig,
    normalize_render_aliases,
};
pub use controller::{Controller, ControllerState, StepOptions};
pub use decoder::EventDecoder;
pub use event::{AgentEvent, Event, ThirdPartyFrames};
