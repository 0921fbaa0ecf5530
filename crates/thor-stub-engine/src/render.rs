//! Synthetic frames
//!
//! Every frame is a byte pattern derived from a SHA-256 digest of the
//! viewpoint, so distinct viewpoints get distinct buffers and identical
//! viewpoints render identically.

use sha2::{Digest, Sha256};
use thor_core::{AgentPose, FrameKind, ThirdPartyCamera};

/// What a frame is rendered from
#[derive(Debug, Clone, Copy)]
pub enum Viewpoint<'a> {
    Agent { index: usize, pose: &'a AgentPose },
    Camera(&'a ThirdPartyCamera),
}

fn seed(scene: &str, view: Viewpoint<'_>, kind: FrameKind) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(scene.as_bytes());
    hasher.update(kind.to_string().as_bytes());
    match view {
        Viewpoint::Agent { index, pose } => {
            hasher.update(b"agent");
            hasher.update(index.to_le_bytes());
            for v in [
                pose.position.x,
                pose.position.y,
                pose.position.z,
                pose.rotation.y,
                pose.camera_horizon,
            ] {
                hasher.update(v.to_le_bytes());
            }
        }
        Viewpoint::Camera(camera) => {
            hasher.update(b"camera");
            hasher.update(camera.third_party_camera_id.to_le_bytes());
            for v in [
                camera.position.x,
                camera.position.y,
                camera.position.z,
                camera.rotation.x,
                camera.rotation.y,
                camera.rotation.z,
                camera.field_of_view,
            ] {
                hasher.update(v.to_le_bytes());
            }
        }
    }
    hasher.finalize().into()
}

/// 3-channel frame in wire layout
pub fn image(scene: &str, view: Viewpoint<'_>, kind: FrameKind, width: u32, height: u32) -> Vec<u8> {
    let seed = seed(scene, view, kind);
    let len = width as usize * height as usize * 3;
    seed.iter()
        .cycle()
        .enumerate()
        .take(len)
        .map(|(i, b)| b.wrapping_add((i / seed.len()) as u8))
        .collect()
}

/// Depth frame in wire layout: little-endian f32 meters in `[0.5, 5.5)`
pub fn depth(scene: &str, view: Viewpoint<'_>, width: u32, height: u32) -> Vec<u8> {
    let seed = seed(scene, view, FrameKind::Depth);
    let len = width as usize * height as usize;
    seed.iter()
        .cycle()
        .take(len)
        .flat_map(|&b| (0.5 + b as f32 / 51.2).to_le_bytes())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use thor_core::Vector3;

    fn pose(x: f64) -> AgentPose {
        AgentPose {
            position: Vector3::new(x, 0.9, 0.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_sizes() {
        let p = pose(0.0);
        let view = Viewpoint::Agent { index: 0, pose: &p };
        assert_eq!(image("FloorPlan1", view, FrameKind::Rgb, 4, 3).len(), 36);
        assert_eq!(depth("FloorPlan1", view, 4, 3).len(), 48);
    }

    #[test]
    fn test_viewpoints_differ() {
        let a = pose(0.0);
        let b = pose(0.25);
        let frame_a = image("FloorPlan1", Viewpoint::Agent { index: 0, pose: &a }, FrameKind::Rgb, 8, 8);
        let frame_b = image("FloorPlan1", Viewpoint::Agent { index: 0, pose: &b }, FrameKind::Rgb, 8, 8);
        let again = image("FloorPlan1", Viewpoint::Agent { index: 0, pose: &a }, FrameKind::Rgb, 8, 8);

        assert_ne!(frame_a, frame_b);
        assert_eq!(frame_a, again);
    }
}
