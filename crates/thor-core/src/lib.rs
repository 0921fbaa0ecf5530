//! # thor-core
//!
//! Core types shared by the simulation controller, its transports and the
//! stub engine:
//! - Action requests and legacy parameter rewrites
//! - Action signatures, the handler-type registry and dispatch resolution
//! - Per-step metadata, third-party cameras and object filters
//! - Frame buffers
//! - Error taxonomy

pub mod action;
pub mod agent;
pub mod camera;
pub mod catalog;
pub mod dispatch;
pub mod error;
pub mod filter;
pub mod frame;
pub mod metadata;
pub mod signature;

pub use action::{ActionRequest, Params};
pub use agent::{AgentController, AgentMode};
pub use camera::{CameraError, CameraRig, CameraUpdate, NewCamera, ThirdPartyCamera};
pub use dispatch::{ActionRegistry, AmbiguityKind, DispatchError, Resolved};
pub use error::{ErrorCode, Result, ThorError};
pub use filter::ObjectFilter;
pub use frame::{DepthFrame, Frame, FrameKind};
pub use metadata::{
    AgentPatch, AgentPose, AgentStepMetadata, MetadataPatch, MultiAgentMetadata, ObjectList,
    ObjectMetadata, PartialVector3, Vector3,
};
pub use signature::{ActionSignature, ParamSpec, ParamType, SignatureStyle};
