//! Scene state of the stub engine
//!
//! A flat square floor, a fixed set of objects and any number of agents.
//! Motion is grid arithmetic; nothing collides.

use std::sync::Arc;
use thor_core::{
    AgentController, AgentMode, AgentPatch, AgentPose, AgentStepMetadata, CameraRig,
    MetadataPatch, MultiAgentMetadata, ObjectFilter, ObjectMetadata, Vector3,
};

/// Height of the agent's body above the floor
pub const AGENT_Y: f64 = 0.9;

/// Floor spans `[-FLOOR_EXTENT, FLOOR_EXTENT]` on x and z
pub const FLOOR_EXTENT: f64 = 2.5;

pub const MIN_HORIZON: f64 = -30.0;
pub const MAX_HORIZON: f64 = 60.0;

/// Allowed deviation of a teleport target from floor height
pub const TELEPORT_Y_TOLERANCE: f64 = 0.05;

pub const SCENES_IN_BUILD: std::ops::RangeInclusive<u32> = 1..=30;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSettings {
    pub depth: bool,
    pub instance_segmentation: bool,
    pub semantic_segmentation: bool,
    pub normals: bool,
    pub flow: bool,
}

/// Values fixed by the last Initialize
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub width: u32,
    pub height: u32,
    pub grid_size: f64,
    pub agent_mode: AgentMode,
    pub controller: AgentController,
    pub agent_count: usize,
    pub render: RenderSettings,
    pub fast_action_emit: bool,
    pub field_of_view: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: 300,
            height: 300,
            grid_size: 0.25,
            agent_mode: AgentMode::Default,
            controller: AgentController::Physics,
            agent_count: 1,
            render: RenderSettings::default(),
            fast_action_emit: true,
            field_of_view: 90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentState {
    pub pose: AgentPose,
    /// Result of the last action this agent executed
    pub last: AgentPatch,
}

#[derive(Debug)]
pub struct World {
    pub scene: String,
    pub settings: Settings,
    pub agents: Vec<AgentState>,
    pub objects: Vec<ObjectMetadata>,
    pub cameras: CameraRig,
    pub filter: ObjectFilter,
}

/// `Fridge|-02.10|+00.00|+01.07`
fn object_id(object_type: &str, p: Vector3) -> String {
    format!("{object_type}|{:+06.2}|{:+06.2}|{:+06.2}", p.x, p.y, p.z)
}

fn scene_objects() -> Vec<ObjectMetadata> {
    const LAYOUT: [(&str, bool, [f64; 3]); 8] = [
        ("Fridge", true, [-2.10, 0.0, 1.07]),
        ("Cabinet", true, [1.25, 0.9, -2.0]),
        ("Microwave", true, [0.5, 1.0, 2.2]),
        ("Drawer", true, [-1.5, 0.5, -2.2]),
        ("Potato", false, [0.3, 0.95, 1.1]),
        ("Mug", false, [-0.7, 0.95, 1.4]),
        ("Apple", false, [1.0, 0.95, 0.6]),
        ("Bread", false, [1.6, 0.95, 1.2]),
    ];
    LAYOUT
        .iter()
        .map(|&(object_type, openable, [x, y, z])| {
            let position = Vector3::new(x, y, z);
            ObjectMetadata {
                object_id: object_id(object_type, position),
                object_type: object_type.to_string(),
                openable,
                is_open: false,
                openness: 0.0,
                visible: true,
                position,
            }
        })
        .collect()
}

impl World {
    pub fn new(scene: &str) -> Self {
        let mut world = Self {
            scene: String::new(),
            settings: Settings::default(),
            agents: Vec::new(),
            objects: Vec::new(),
            cameras: CameraRig::new(),
            filter: ObjectFilter::Unfiltered,
        };
        world.load_scene(scene);
        world
    }

    /// Whether a scene name exists in this build
    pub fn has_scene(scene: &str) -> bool {
        scene
            .strip_prefix("FloorPlan")
            .and_then(|n| n.strip_suffix("_physics").or(Some(n)))
            .and_then(|n| n.parse::<u32>().ok())
            .is_some_and(|n| SCENES_IN_BUILD.contains(&n))
    }

    /// Restore the scene's initial state; settings survive
    pub fn load_scene(&mut self, scene: &str) {
        self.scene = scene.to_string();
        self.objects = scene_objects();
        self.cameras = CameraRig::new();
        self.filter = ObjectFilter::Unfiltered;
        self.spawn_agents();
    }

    /// Place `agent_count` agents side by side at the start pose
    pub fn spawn_agents(&mut self) {
        let standing = self.settings.agent_mode.supports_standing().then_some(true);
        self.agents = (0..self.settings.agent_count)
            .map(|i| AgentState {
                pose: AgentPose {
                    position: Vector3::new(-1.0 + 0.5 * i as f64, AGENT_Y, -1.5),
                    rotation: Vector3::new(0.0, 90.0 * i as f64, 0.0),
                    camera_horizon: 0.0,
                    is_standing: standing,
                },
                last: AgentPatch {
                    last_action_success: true,
                    ..Default::default()
                },
            })
            .collect();
    }

    pub fn in_bounds(position: &Vector3) -> bool {
        position.x.abs() <= FLOOR_EXTENT && position.z.abs() <= FLOOR_EXTENT
    }

    pub fn object(&self, object_id: &str) -> Option<&ObjectMetadata> {
        self.objects.iter().find(|o| o.object_id == object_id)
    }

    pub fn object_mut(&mut self, object_id: &str) -> Option<&mut ObjectMetadata> {
        self.objects.iter_mut().find(|o| o.object_id == object_id)
    }

    /// Object under a normalized screen point
    ///
    /// Objects admitted by `admit` are laid out as equal-width columns in
    /// list order; only `x` selects the column.
    pub fn object_at(&self, x: f64, admit: impl Fn(&ObjectMetadata) -> bool) -> Option<&ObjectMetadata> {
        let candidates: Vec<&ObjectMetadata> = self.objects.iter().filter(|o| admit(o)).collect();
        if candidates.is_empty() {
            return None;
        }
        let column = ((x * candidates.len() as f64) as usize).min(candidates.len() - 1);
        Some(candidates[column])
    }

    /// Full metadata document for the current state
    pub fn metadata(&self, sequence_id: u64, active_agent_id: usize) -> MultiAgentMetadata {
        let objects = Arc::new(self.filter.apply(&self.objects));
        let agents = self
            .agents
            .iter()
            .enumerate()
            .map(|(i, agent)| {
                let mut meta = AgentStepMetadata {
                    scene_name: self.scene.clone(),
                    screen_width: self.settings.width,
                    screen_height: self.settings.height,
                    agent: agent.pose.clone(),
                    objects: Arc::clone(&objects),
                    agent_id: i,
                    ..Default::default()
                };
                meta.apply_patch(&agent.last);
                meta
            })
            .collect();

        MultiAgentMetadata {
            agents,
            third_party_cameras: self.cameras.cameras().to_vec(),
            sequence_id,
            active_agent_id,
        }
    }

    /// Per-action fields only
    pub fn patch(&self, sequence_id: u64, active_agent_id: usize) -> MetadataPatch {
        MetadataPatch {
            agents: self.agents.iter().map(|a| a.last.clone()).collect(),
            sequence_id,
            active_agent_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_ids_encode_position() {
        let world = World::new("FloorPlan28");
        assert!(world.object("Fridge|-02.10|+00.00|+01.07").is_some());
        assert!(world.object("Cabinet|+01.25|+00.90|-02.00").is_some());
    }

    #[test]
    fn test_scene_names() {
        assert!(World::has_scene("FloorPlan28"));
        assert!(World::has_scene("FloorPlan1_physics"));
        assert!(!World::has_scene("FloorPlan99"));
        assert!(!World::has_scene("Kitchen"));
    }

    #[test]
    fn test_filter_applies_to_metadata() {
        let mut world = World::new("FloorPlan28");
        world.filter = ObjectFilter::only(["Fridge|-02.10|+00.00|+01.07"]);
        let meta = world.metadata(1, 0);
        assert_eq!(meta.agents[0].objects.len(), 1);

        world.filter = ObjectFilter::only(Vec::<String>::new());
        assert!(world.metadata(2, 0).agents[0].objects.is_empty());
    }

    #[test]
    fn test_agents_spawn_apart() {
        let mut world = World::new("FloorPlan28");
        world.settings.agent_count = 3;
        world.spawn_agents();
        assert_eq!(world.agents.len(), 3);
        assert_ne!(world.agents[0].pose.position, world.agents[1].pose.position);
        assert_eq!(world.agents[0].pose.is_standing, Some(true));
    }

    #[test]
    fn test_object_at_columns() {
        let world = World::new("FloorPlan28");
        let first = world.object_at(0.0, |o| o.openable).unwrap();
        let last = world.object_at(1.0, |o| o.openable).unwrap();
        assert_eq!(first.object_type, "Fridge");
        assert_eq!(last.object_type, "Drawer");
    }
}
