//! Response envelope → `Event`

use crate::config::RenderFlags;
use crate::event::{AgentEvent, Event, ThirdPartyFrames};
use std::sync::Arc;
use thor_bridge::{Envelope, Field, FieldType};
use thor_core::{
    DepthFrame, Frame, FrameKind, MetadataPatch, MultiAgentMetadata, Result, ThorError,
};
use tracing::debug;

/// Decodes engine responses for the current render configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventDecoder {
    pub render: RenderFlags,
    pub fast_action_emit: bool,
}

fn protocol(msg: impl Into<String>) -> ThorError {
    ThorError::Protocol(msg.into())
}

/// i-th field of a type, for agent i
fn agent_field(envelope: &Envelope, kind: FieldType, agent: usize) -> Result<&Field> {
    envelope
        .all(kind)
        .nth(agent)
        .ok_or_else(|| protocol(format!("missing {kind:?} field for agent {agent}")))
}

fn agent_image(
    envelope: &Envelope,
    enabled: bool,
    field: FieldType,
    kind: FrameKind,
    agent: usize,
    (width, height): (u32, u32),
) -> Result<Option<Arc<Frame>>> {
    if !enabled {
        return Ok(None);
    }
    let field = agent_field(envelope, field, agent)?;
    Ok(Some(Arc::new(Frame::from_wire(
        kind,
        &field.payload,
        width,
        height,
    )?)))
}

/// All fields of a type, which must pair 1:1 with the camera list
fn camera_fields(envelope: &Envelope, kind: FieldType, cameras: usize) -> Result<Vec<&Field>> {
    let fields: Vec<&Field> = envelope.all(kind).collect();
    if fields.len() != cameras {
        return Err(protocol(format!(
            "{} {kind:?} fields for {cameras} third party cameras",
            fields.len()
        )));
    }
    Ok(fields)
}

fn camera_images(
    envelope: &Envelope,
    enabled: bool,
    field: FieldType,
    kind: FrameKind,
    cameras: usize,
    (width, height): (u32, u32),
) -> Result<Vec<Arc<Frame>>> {
    if !enabled {
        return Ok(Vec::new());
    }
    camera_fields(envelope, field, cameras)?
        .into_iter()
        .map(|f| Frame::from_wire(kind, &f.payload, width, height).map(Arc::new))
        .collect()
}

impl EventDecoder {
    pub fn new(render: RenderFlags, fast_action_emit: bool) -> Self {
        Self {
            render,
            fast_action_emit,
        }
    }

    /// Decode a response; `previous` is needed for fast-emit patches
    pub fn decode(&self, envelope: &Envelope, previous: Option<&Event>) -> Result<Event> {
        if let Some(patch) = envelope.json(FieldType::MetadataPatch)? {
            let patch: MetadataPatch = serde_json::from_value(patch)?;
            let previous = previous
                .ok_or_else(|| protocol("metadata patch received before any full event"))?;
            return self.apply_patch(patch, previous);
        }

        let metadata = envelope
            .json(FieldType::Metadata)?
            .ok_or_else(|| protocol("response carries no metadata"))?;
        let metadata: MultiAgentMetadata = serde_json::from_value(metadata)?;
        self.decode_full(envelope, metadata)
    }

    fn decode_full(&self, envelope: &Envelope, metadata: MultiAgentMetadata) -> Result<Event> {
        if metadata.agents.is_empty() {
            return Err(protocol("metadata lists no agents"));
        }
        let render = &self.render;
        let screen = (
            metadata.agents[0].screen_width,
            metadata.agents[0].screen_height,
        );

        let mut events = Vec::with_capacity(metadata.agents.len());
        for (i, agent) in metadata.agents.into_iter().enumerate() {
            let size = (agent.screen_width, agent.screen_height);
            let rgb = agent_field(envelope, FieldType::RgbImage, i)?;
            let frame = Arc::new(Frame::from_wire(FrameKind::Rgb, &rgb.payload, size.0, size.1)?);

            let depth_frame = if render.render_depth_image {
                let field = agent_field(envelope, FieldType::DepthImage, i)?;
                Some(Arc::new(DepthFrame::from_wire(&field.payload, size.0, size.1)?))
            } else {
                None
            };

            events.push(AgentEvent {
                frame,
                depth_frame,
                instance_segmentation_frame: agent_image(
                    envelope,
                    render.render_instance_segmentation,
                    FieldType::IdsImage,
                    FrameKind::InstanceSegmentation,
                    i,
                    size,
                )?,
                semantic_segmentation_frame: agent_image(
                    envelope,
                    render.render_semantic_segmentation,
                    FieldType::ClassesImage,
                    FrameKind::SemanticSegmentation,
                    i,
                    size,
                )?,
                normals_frame: agent_image(
                    envelope,
                    render.render_normals_image,
                    FieldType::NormalsImage,
                    FrameKind::Normals,
                    i,
                    size,
                )?,
                flow_frame: agent_image(
                    envelope,
                    render.render_flow_image,
                    FieldType::FlowsImage,
                    FrameKind::Flow,
                    i,
                    size,
                )?,
                metadata: agent,
            });
        }

        let cameras = metadata.third_party_cameras.len();
        let depth = if render.render_depth_image {
            camera_fields(envelope, FieldType::ThirdPartyDepth, cameras)?
                .into_iter()
                .map(|f| DepthFrame::from_wire(&f.payload, screen.0, screen.1).map(Arc::new))
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };
        let third_party = ThirdPartyFrames {
            rgb: camera_images(
                envelope,
                true,
                FieldType::ThirdPartyImage,
                FrameKind::Rgb,
                cameras,
                screen,
            )?,
            depth,
            instance_segmentation: camera_images(
                envelope,
                render.render_instance_segmentation,
                FieldType::ThirdPartyImageIds,
                FrameKind::InstanceSegmentation,
                cameras,
                screen,
            )?,
            semantic_segmentation: camera_images(
                envelope,
                render.render_semantic_segmentation,
                FieldType::ThirdPartyClasses,
                FrameKind::SemanticSegmentation,
                cameras,
                screen,
            )?,
            normals: camera_images(
                envelope,
                render.render_normals_image,
                FieldType::ThirdPartyNormals,
                FrameKind::Normals,
                cameras,
                screen,
            )?,
            flow: camera_images(
                envelope,
                render.render_flow_image,
                FieldType::ThirdPartyFlow,
                FrameKind::Flow,
                cameras,
                screen,
            )?,
        };

        debug!(
            "Decoded event seq={} agents={} cameras={}",
            metadata.sequence_id,
            events.len(),
            cameras
        );
        Ok(Event {
            events,
            third_party_cameras: metadata.third_party_cameras,
            third_party,
            sequence_id: metadata.sequence_id,
            active_agent_id: metadata.active_agent_id,
            fast_emitted: false,
        })
    }

    /// Rebuild an event from the previous one plus new action results
    fn apply_patch(&self, patch: MetadataPatch, previous: &Event) -> Result<Event> {
        if patch.agents.len() != previous.events.len() {
            return Err(protocol(format!(
                "metadata patch has {} agents, previous event has {}",
                patch.agents.len(),
                previous.events.len()
            )));
        }

        let mut event = previous.clone();
        for (agent, update) in event.events.iter_mut().zip(&patch.agents) {
            agent.metadata.apply_patch(update);
            if !self.fast_action_emit {
                agent.metadata.objects = Arc::new(agent.metadata.objects.as_ref().clone());
            }
        }
        event.sequence_id = patch.sequence_id;
        event.active_agent_id = patch.active_agent_id;
        event.fast_emitted = true;
        debug!("Applied metadata patch seq={}", event.sequence_id);
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use thor_core::{AgentPatch, Vector3};

    fn metadata(agents: usize, cameras: usize) -> serde_json::Value {
        let agents: Vec<_> = (0..agents)
            .map(|i| {
                json!({
                    "sceneName": "FloorPlan28",
                    "lastAction": "Pass",
                    "lastActionSuccess": true,
                    "screenWidth": 2,
                    "screenHeight": 2,
                    "objects": [{"objectId": "Mug|1", "objectType": "Mug"}],
                    "agentId": i
                })
            })
            .collect();
        let cameras: Vec<_> = (0..cameras)
            .map(|i| {
                json!({
                    "thirdPartyCameraId": i,
                    "position": Vector3::default(),
                    "rotation": Vector3::default(),
                    "fieldOfView": 90.0
                })
            })
            .collect();
        json!({"agents": agents, "thirdPartyCameras": cameras, "sequenceId": 1})
    }

    fn envelope(agents: usize, cameras: usize) -> Envelope {
        let mut envelope =
            Envelope::new().with(FieldType::Metadata, metadata(agents, cameras).to_string().into());
        for i in 0..agents {
            envelope.push(Field::new(FieldType::RgbImage, vec![i as u8; 12]));
            envelope.push(Field::new(FieldType::DepthImage, vec![0; 16]));
        }
        for _ in 0..cameras {
            envelope.push(Field::new(FieldType::ThirdPartyImage, vec![9; 12]));
        }
        envelope
    }

    #[test]
    fn test_agents_get_distinct_frames() {
        let event = EventDecoder::default().decode(&envelope(2, 0), None).unwrap();

        assert_eq!(event.events().len(), 2);
        let a = &event.events()[0].frame;
        let b = &event.events()[1].frame;
        assert!(!Arc::ptr_eq(a, b));
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn test_depth_only_when_requested() {
        let plain = EventDecoder::default().decode(&envelope(1, 0), None).unwrap();
        assert!(plain.depth_frame().is_none());

        let decoder = EventDecoder::new(
            RenderFlags {
                render_depth_image: true,
                ..Default::default()
            },
            true,
        );
        let with_depth = decoder.decode(&envelope(1, 0), None).unwrap();
        assert_eq!(with_depth.depth_frame().unwrap().shape(), (2, 2));
    }

    #[test]
    fn test_camera_frames_index_aligned() {
        let event = EventDecoder::default().decode(&envelope(1, 2), None).unwrap();
        let frames = event.third_party_camera_frames();
        assert_eq!(frames.len(), 2);
        assert!(!Arc::ptr_eq(&frames[0], &frames[1]));

        let mut short = envelope(1, 2);
        short.fields.pop();
        let err = EventDecoder::default().decode(&short, None).unwrap_err();
        assert!(matches!(err, ThorError::Protocol(_)));
    }

    #[test]
    fn test_patch_shares_previous_buffers() {
        let decoder = EventDecoder::new(RenderFlags::default(), true);
        let first = decoder.decode(&envelope(1, 0), None).unwrap();

        let patch = MetadataPatch {
            agents: vec![AgentPatch {
                last_action: "TestFastEmit".into(),
                last_action_success: true,
                action_return: json!("foo"),
                ..Default::default()
            }],
            sequence_id: 2,
            active_agent_id: 0,
        };
        let response = Envelope::new().with(
            FieldType::MetadataPatch,
            serde_json::to_vec(&patch).unwrap(),
        );
        let second = decoder.decode(&response, Some(&first)).unwrap();

        assert!(second.is_fast_emitted());
        assert_eq!(second.action_return(), &json!("foo"));
        assert_eq!(second.sequence_id(), 2);
        assert!(Arc::ptr_eq(second.objects(), first.objects()));
        assert!(Arc::ptr_eq(second.frame(), first.frame()));

        let slow = EventDecoder::new(RenderFlags::default(), false);
        let copied = slow.decode(&response, Some(&first)).unwrap();
        assert!(!Arc::ptr_eq(copied.objects(), first.objects()));
        assert_eq!(copied.objects(), first.objects());
    }

    #[test]
    fn test_patch_without_previous_event() {
        let response = Envelope::new().with(
            FieldType::MetadataPatch,
            br#"{"agents":[{}],"sequenceId":1}"#.to_vec(),
        );
        let err = EventDecoder::default().decode(&response, None).unwrap_err();
        assert!(err.to_string().contains("before any full event"));
    }

    #[test]
    fn test_wrong_frame_size() {
        let mut bad = envelope(1, 0);
        bad.fields[1].payload.truncate(5);
        assert!(EventDecoder::default().decode(&bad, None).is_err());
    }
}
