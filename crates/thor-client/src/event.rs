//! Step results

use serde_json::Value;
use std::sync::Arc;
use thor_core::{
    AgentPatch, AgentPose, AgentStepMetadata, DepthFrame, Frame, ObjectList, ObjectMetadata,
    ThirdPartyCamera,
};
use tracing::warn;

/// One agent's view of a step
#[derive(Debug, Clone)]
pub struct AgentEvent {
    pub metadata: AgentStepMetadata,
    pub frame: Arc<Frame>,
    pub depth_frame: Option<Arc<DepthFrame>>,
    pub instance_segmentation_frame: Option<Arc<Frame>>,
    pub semantic_segmentation_frame: Option<Arc<Frame>>,
    pub normals_frame: Option<Arc<Frame>>,
    pub flow_frame: Option<Arc<Frame>>,
}

impl AgentEvent {
    pub fn success(&self) -> bool {
        self.metadata.last_action_success
    }

    /// Empty unless the action failed
    pub fn error_message(&self) -> &str {
        &self.metadata.error_message
    }

    pub fn action_return(&self) -> &Value {
        &self.metadata.action_return
    }

    pub fn pose(&self) -> &AgentPose {
        &self.metadata.agent
    }

    pub fn objects(&self) -> &ObjectList {
        &self.metadata.objects
    }

    pub fn object(&self, object_id: &str) -> Option<&ObjectMetadata> {
        self.metadata.object(object_id)
    }

    #[deprecated(note = "use semantic_segmentation_frame")]
    pub fn class_segmentation_frame(&self) -> Option<&Arc<Frame>> {
        warn!("class_segmentation_frame is deprecated, use semantic_segmentation_frame");
        self.semantic_segmentation_frame.as_ref()
    }
}

/// Everything third-party cameras rendered for a step, index-aligned with
/// the camera list
#[derive(Debug, Clone, Default)]
pub struct ThirdPartyFrames {
    pub rgb: Vec<Arc<Frame>>,
    pub depth: Vec<Arc<DepthFrame>>,
    pub instance_segmentation: Vec<Arc<Frame>>,
    pub semantic_segmentation: Vec<Arc<Frame>>,
    pub normals: Vec<Arc<Frame>>,
    pub flow: Vec<Arc<Frame>>,
}

/// Result of one `step` or `reset`
///
/// Accessors without an agent index refer to agent 0. Events are built only
/// by the decoder, which guarantees at least one agent.
#[derive(Debug, Clone)]
pub struct Event {
    pub(crate) events: Vec<AgentEvent>,
    pub(crate) third_party_cameras: Vec<ThirdPartyCamera>,
    pub(crate) third_party: ThirdPartyFrames,
    pub(crate) sequence_id: u64,
    pub(crate) active_agent_id: usize,
    pub(crate) fast_emitted: bool,
}

impl Event {
    /// Copy with one agent's action fields replaced; frames are shared
    pub(crate) fn with_patch(&self, agent_id: usize, patch: &AgentPatch) -> Event {
        let mut event = self.clone();
        if let Some(agent) = event.events.get_mut(agent_id) {
            agent.metadata.apply_patch(patch);
            event.active_agent_id = agent_id;
        }
        event.fast_emitted = false;
        event
    }

    /// Per-agent events in agent order
    pub fn events(&self) -> &[AgentEvent] {
        &self.events
    }

    pub fn agent(&self, agent_id: usize) -> Option<&AgentEvent> {
        self.events.get(agent_id)
    }

    fn first(&self) -> &AgentEvent {
        &self.events[0]
    }

    pub fn metadata(&self) -> &AgentStepMetadata {
        &self.first().metadata
    }

    pub fn success(&self) -> bool {
        self.first().success()
    }

    pub fn error_message(&self) -> &str {
        self.first().error_message()
    }

    pub fn action_return(&self) -> &Value {
        self.first().action_return()
    }

    pub fn pose(&self) -> &AgentPose {
        self.first().pose()
    }

    pub fn objects(&self) -> &ObjectList {
        self.first().objects()
    }

    pub fn object(&self, object_id: &str) -> Option<&ObjectMetadata> {
        self.first().object(object_id)
    }

    pub fn frame(&self) -> &Arc<Frame> {
        &self.first().frame
    }

    pub fn depth_frame(&self) -> Option<&Arc<DepthFrame>> {
        self.first().depth_frame.as_ref()
    }

    pub fn instance_segmentation_frame(&self) -> Option<&Arc<Frame>> {
        self.first().instance_segmentation_frame.as_ref()
    }

    pub fn semantic_segmentation_frame(&self) -> Option<&Arc<Frame>> {
        self.first().semantic_segmentation_frame.as_ref()
    }

    #[deprecated(note = "use semantic_segmentation_frame")]
    #[allow(deprecated)]
    pub fn class_segmentation_frame(&self) -> Option<&Arc<Frame>> {
        self.first().class_segmentation_frame()
    }

    pub fn normals_frame(&self) -> Option<&Arc<Frame>> {
        self.first().normals_frame.as_ref()
    }

    pub fn flow_frame(&self) -> Option<&Arc<Frame>> {
        self.first().flow_frame.as_ref()
    }

    pub fn third_party_cameras(&self) -> &[ThirdPartyCamera] {
        &self.third_party_cameras
    }

    pub fn third_party_camera_frames(&self) -> &[Arc<Frame>] {
        &self.third_party.rgb
    }

    pub fn third_party_depth_frames(&self) -> &[Arc<DepthFrame>] {
        &self.third_party.depth
    }

    pub fn third_party_instance_segmentation_frames(&self) -> &[Arc<Frame>] {
        &self.third_party.instance_segmentation
    }

    pub fn third_party_semantic_segmentation_frames(&self) -> &[Arc<Frame>] {
        &self.third_party.semantic_segmentation
    }

    pub fn third_party_normals_frames(&self) -> &[Arc<Frame>] {
        &self.third_party.normals
    }

    pub fn third_party_flow_frames(&self) -> &[Arc<Frame>] {
        &self.third_party.flow
    }

    pub fn sequence_id(&self) -> u64 {
        self.sequence_id
    }

    pub fn active_agent_id(&self) -> usize {
        self.active_agent_id
    }

    /// Whether this event was patched from the previous one without a render
    pub fn is_fast_emitted(&self) -> bool {
        self.fast_emitted
    }
}
