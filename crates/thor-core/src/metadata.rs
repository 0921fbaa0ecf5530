//! Per-step metadata reported by the engine

use crate::camera::ThirdPartyCamera;
use crate::error::ErrorCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Position or Euler rotation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Vector3) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }
}

/// Vector update where each absent component keeps its previous value
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PartialVector3 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl PartialVector3 {
    pub fn apply(&self, base: Vector3) -> Vector3 {
        Vector3 {
            x: self.x.unwrap_or(base.x),
            y: self.y.unwrap_or(base.y),
            z: self.z.unwrap_or(base.z),
        }
    }
}

impl From<Vector3> for PartialVector3 {
    fn from(v: Vector3) -> Self {
        Self {
            x: Some(v.x),
            y: Some(v.y),
            z: Some(v.z),
        }
    }
}

/// Agent body state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPose {
    pub position: Vector3,
    pub rotation: Vector3,
    pub camera_horizon: f64,
    /// Absent for agents without a standing degree of freedom
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_standing: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub object_id: String,
    pub object_type: String,
    #[serde(default)]
    pub openable: bool,
    #[serde(default)]
    pub is_open: bool,
    #[serde(default)]
    pub openness: f64,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub position: Vector3,
}

/// Shared, immutable object list
///
/// Fast-emitted events reuse the previous event's list without copying it.
pub type ObjectList = Arc<Vec<ObjectMetadata>>;

/// Metadata of one agent for one step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStepMetadata {
    #[serde(default)]
    pub scene_name: String,
    #[serde(default)]
    pub last_action: String,
    #[serde(default)]
    pub last_action_success: bool,
    #[serde(default)]
    pub error_message: String,
    /// Set only when dispatch itself failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default)]
    pub action_return: Value,
    #[serde(default)]
    pub screen_width: u32,
    #[serde(default)]
    pub screen_height: u32,
    #[serde(default)]
    pub agent: AgentPose,
    #[serde(default)]
    pub objects: ObjectList,
    #[serde(default)]
    pub agent_id: usize,
}

impl AgentStepMetadata {
    /// Dispatch error code, when the engine reported a known one
    pub fn dispatch_error(&self) -> Option<ErrorCode> {
        self.error_code.as_deref().and_then(|c| c.parse().ok())
    }

    pub fn object(&self, object_id: &str) -> Option<&ObjectMetadata> {
        self.objects.iter().find(|o| o.object_id == object_id)
    }

    /// Overwrite the per-action fields with a patch
    pub fn apply_patch(&mut self, patch: &AgentPatch) {
        self.last_action.clone_from(&patch.last_action);
        self.last_action_success = patch.last_action_success;
        self.error_message.clone_from(&patch.error_message);
        self.error_code.clone_from(&patch.error_code);
        self.action_return = patch.action_return.clone();
    }
}

/// Full metadata document for one step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiAgentMetadata {
    pub agents: Vec<AgentStepMetadata>,
    #[serde(default)]
    pub third_party_cameras: Vec<ThirdPartyCamera>,
    #[serde(default)]
    pub sequence_id: u64,
    #[serde(default)]
    pub active_agent_id: usize,
}

/// Per-action fields of one agent in a fast-emit patch
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPatch {
    #[serde(default)]
    pub last_action: String,
    #[serde(default)]
    pub last_action_success: bool,
    #[serde(default)]
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default)]
    pub action_return: Value,
}

impl From<&AgentStepMetadata> for AgentPatch {
    fn from(meta: &AgentStepMetadata) -> Self {
        Self {
            last_action: meta.last_action.clone(),
            last_action_success: meta.last_action_success,
            error_message: meta.error_message.clone(),
            error_code: meta.error_code.clone(),
            action_return: meta.action_return.clone(),
        }
    }
}

/// Fast-emit metadata: only the fields an action can change without
/// touching the scene
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPatch {
    pub agents: Vec<AgentPatch>,
    #[serde(default)]
    pub sequence_id: u64,
    #[serde(default)]
    pub active_agent_id: usize,
}
