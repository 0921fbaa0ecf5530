//! Engine-side action dispatch
//!
//! Each request is resolved against the same signature registry the
//! controller uses; resolution failures come back as failed events carrying
//! an `errorCode`, exactly like the real engine reports them.

use crate::render::{self, Viewpoint};
use crate::world::{
    AGENT_Y, MAX_HORIZON, MIN_HORIZON, RenderSettings, SCENES_IN_BUILD, TELEPORT_Y_TOLERANCE,
    World,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thor_bridge::{Envelope, Field, FieldType, MAX_FIELD_LEN};
use thor_core::action::{AGENT_ID_KEY, SEQUENCE_ID_KEY};
use thor_core::{
    ActionRegistry, AgentController, AgentMode, AgentPatch, CameraUpdate, FrameKind, NewCamera,
    ObjectFilter, Params, Resolved, Result, ThorError, Vector3,
};
use tracing::{debug, error, info, warn};

/// Result of executing one action
#[derive(Debug, Clone, PartialEq)]
struct Outcome {
    success: bool,
    error_message: String,
    action_return: Value,
    /// Answer with a metadata patch when fast emit is on
    fast: bool,
}

impl Outcome {
    fn ok(action_return: impl Into<Value>) -> Self {
        Self {
            success: true,
            error_message: String::new(),
            action_return: action_return.into(),
            fast: false,
        }
    }

    fn done() -> Self {
        Self::ok(Value::Null)
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: message.into(),
            action_return: Value::Null,
            fast: false,
        }
    }

    fn fast(mut self) -> Self {
        self.fast = true;
        self
    }
}

/// Deserialize bound arguments into a typed parameter struct
fn args<T: DeserializeOwned>(arguments: &Params) -> std::result::Result<T, String> {
    serde_json::from_value(Value::Object(arguments.clone())).map_err(|e| e.to_string())
}

fn f64_arg(arguments: &Params, name: &str) -> Option<f64> {
    arguments.get(name).and_then(Value::as_f64)
}

fn bool_arg(arguments: &Params, name: &str) -> Option<bool> {
    arguments.get(name).and_then(Value::as_bool)
}

fn str_arg<'a>(arguments: &'a Params, name: &str) -> Option<&'a str> {
    arguments.get(name).and_then(Value::as_str)
}

fn vector_arg(arguments: &Params, name: &str) -> Option<Vector3> {
    arguments
        .get(name)
        .filter(|v| !v.is_null())
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

fn signature_shape(resolved: &Resolved<'_>) -> String {
    resolved
        .signature
        .params
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Every frame at this resolution must fit one field; depth is the widest
fn check_resolution(width: u64, height: u64) -> std::result::Result<(), String> {
    let depth_bytes = width.saturating_mul(height).saturating_mul(4);
    if depth_bytes > MAX_FIELD_LEN as u64 {
        return Err(format!(
            "resolution {width}x{height} exceeds the {MAX_FIELD_LEN} byte frame limit"
        ));
    }
    Ok(())
}

/// Action name and sequence id of a request, read leniently
fn request_ids(request: &Envelope) -> (String, u64) {
    let body = request.json(FieldType::Action).ok().flatten();
    let action = body
        .as_ref()
        .and_then(|b| b.get("action"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let sequence_id = body
        .as_ref()
        .and_then(|b| b.get(SEQUENCE_ID_KEY))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    (action, sequence_id)
}

/// The stub engine: world state plus the action surface
#[derive(Debug)]
pub struct Engine {
    registry: ActionRegistry,
    world: World,
}

impl Engine {
    pub fn new(scene: &str) -> Self {
        Self::with_registry(scene, ActionRegistry::builtin())
    }

    pub fn with_registry(scene: &str, registry: ActionRegistry) -> Self {
        info!("Stub engine loaded {}", scene);
        Self {
            registry,
            world: World::new(scene),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Answer one request envelope
    ///
    /// Malformed requests are answered with a failed event rather than an
    /// error, so a connection survives a bad message.
    pub fn handle(&mut self, request: &Envelope) -> Result<Envelope> {
        match self.dispatch(request) {
            Err(ThorError::Protocol(message)) => {
                warn!("Rejected request: {}", message);
                self.record(0, "", Outcome::fail(message), None);
                self.full_response(0, 0)
            }
            other => other,
        }
    }

    /// Handle and encode one request, never leaving the peer without a reply
    ///
    /// A response that cannot be built or framed is replaced by a failed
    /// event for the same request, so the connection stays usable.
    pub fn answer(&mut self, request: &Envelope) -> Result<Vec<u8>> {
        match self.handle(request).and_then(|response| response.encode()) {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                error!("Failed to answer request: {}", e);
                let (action, sequence_id) = request_ids(request);
                self.record(0, &action, Outcome::fail(e.to_string()), None);
                self.full_response(sequence_id, 0)?.encode()
            }
        }
    }

    fn dispatch(&mut self, request: &Envelope) -> Result<Envelope> {
        let mut body = match request.json(FieldType::Action)? {
            Some(Value::Object(body)) => body,
            Some(other) => {
                return Err(ThorError::Protocol(format!(
                    "action field must be an object, got {other}"
                )));
            }
            None => return Err(ThorError::Protocol("request carries no action".into())),
        };

        let action = match body.remove("action") {
            Some(Value::String(action)) => action,
            _ => return Err(ThorError::Protocol("request has no action name".into())),
        };
        let sequence_id = body
            .remove(SEQUENCE_ID_KEY)
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let agent_id = body
            .remove(AGENT_ID_KEY)
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(0);
        debug!("Engine step {} seq={} agent={}", action, sequence_id, agent_id);

        if agent_id >= self.world.agents.len() {
            let outcome = Outcome::fail(format!(
                "agentId {agent_id} out of range for {} agents",
                self.world.agents.len()
            ));
            self.record(0, &action, outcome, None);
            return self.full_response(sequence_id, 0);
        }

        let resolution = self
            .registry
            .resolve(self.world.settings.controller, &action, &body)
            .map(|resolved| {
                let shape = signature_shape(&resolved);
                (resolved.arguments, shape)
            });
        let outcome = match resolution {
            Ok((arguments, shape)) => self.execute(&action, agent_id, &arguments, &shape),
            Err(err) => {
                warn!("Dispatch failed: {}", err);
                let code = err.error_code().as_str().to_string();
                self.record(agent_id, &action, Outcome::fail(err.to_string()), Some(code));
                return self.full_response(sequence_id, agent_id);
            }
        };

        let fast = outcome.fast && self.world.settings.fast_action_emit;
        self.record(agent_id, &action, outcome, None);
        if fast {
            let patch = self.world.patch(sequence_id, agent_id);
            return Ok(Envelope::new().with(
                FieldType::MetadataPatch,
                serde_json::to_vec(&patch)?,
            ));
        }
        self.full_response(sequence_id, agent_id)
    }

    fn record(&mut self, agent_id: usize, action: &str, outcome: Outcome, code: Option<String>) {
        if let Some(agent) = self.world.agents.get_mut(agent_id) {
            agent.last = AgentPatch {
                last_action: action.to_string(),
                last_action_success: outcome.success,
                error_message: outcome.error_message,
                error_code: code,
                action_return: outcome.action_return,
            };
        }
    }

    fn full_response(&self, sequence_id: u64, active_agent_id: usize) -> Result<Envelope> {
        let world = &self.world;
        let settings = &world.settings;
        let (w, h) = (settings.width, settings.height);
        let flags = settings.render;
        let scene = world.scene.as_str();

        let metadata = world.metadata(sequence_id, active_agent_id);
        let mut envelope = Envelope::new();
        envelope.push(Field::json(FieldType::Metadata, &metadata)?);

        for (index, agent) in world.agents.iter().enumerate() {
            let view = Viewpoint::Agent {
                index,
                pose: &agent.pose,
            };
            envelope.push(Field::new(
                FieldType::RgbImage,
                render::image(scene, view, FrameKind::Rgb, w, h),
            ));
            if flags.depth {
                envelope.push(Field::new(FieldType::DepthImage, render::depth(scene, view, w, h)));
            }
            for field in channel_fields(scene, view, agent_channels(flags), w, h) {
                envelope.push(field);
            }
        }

        for camera in world.cameras.cameras() {
            let view = Viewpoint::Camera(camera);
            envelope.push(Field::new(
                FieldType::ThirdPartyImage,
                render::image(scene, view, FrameKind::Rgb, w, h),
            ));
            if flags.depth {
                envelope.push(Field::new(
                    FieldType::ThirdPartyDepth,
                    render::depth(scene, view, w, h),
                ));
            }
            for field in channel_fields(scene, view, camera_channels(flags), w, h) {
                envelope.push(field);
            }
        }
        Ok(envelope)
    }

    fn execute(&mut self, action: &str, agent_id: usize, arguments: &Params, shape: &str) -> Outcome {
        match action {
            "Reset" => self.reset(arguments),
            "Initialize" => self.initialize(arguments),
            "Pass" => Outcome::done(),
            "RotateLook" => {
                let pose = &mut self.world.agents[agent_id].pose;
                pose.rotation.y = f64_arg(arguments, "rotation").unwrap_or(pose.rotation.y);
                pose.camera_horizon = f64_arg(arguments, "horizon").unwrap_or(pose.camera_horizon);
                Outcome::done()
            }
            "RotateLeft" | "RotateRight" => {
                let degrees = f64_arg(arguments, "degrees").unwrap_or(90.0);
                let sign = if action == "RotateLeft" { -1.0 } else { 1.0 };
                let rotation = &mut self.world.agents[agent_id].pose.rotation;
                rotation.y = (rotation.y + sign * degrees).rem_euclid(360.0);
                Outcome::done()
            }
            "LookUp" | "LookDown" => {
                let degrees = f64_arg(arguments, "degrees").unwrap_or(30.0);
                let sign = if action == "LookUp" { -1.0 } else { 1.0 };
                let pose = &mut self.world.agents[agent_id].pose;
                pose.camera_horizon =
                    (pose.camera_horizon + sign * degrees).clamp(MIN_HORIZON, MAX_HORIZON);
                Outcome::done()
            }
            "MoveAhead" | "MoveBack" | "MoveLeft" | "MoveRight" => {
                self.move_agent(action, agent_id, arguments)
            }
            "ChangeResolution" => {
                let (Some(x), Some(y)) = (f64_arg(arguments, "x"), f64_arg(arguments, "y")) else {
                    return Outcome::fail("ChangeResolution requires x and y");
                };
                if x < 1.0 || y < 1.0 {
                    return Outcome::fail(format!("invalid resolution {x}x{y}"));
                }
                if let Err(message) = check_resolution(x as u64, y as u64) {
                    return Outcome::fail(message);
                }
                self.world.settings.width = x as u32;
                self.world.settings.height = y as u32;
                Outcome::done()
            }
            "Teleport" | "TeleportFull" => self.teleport(action, agent_id, arguments),
            "OpenObject" | "CloseObject" => self.open_close(action, arguments),
            "GetInteractablePoses" => self.interactable_poses(arguments),
            "GetObjectInFrame" => self.object_in_frame(arguments),
            "AddThirdPartyCamera" => match args::<NewCamera>(arguments) {
                Ok(new) => match self.world.cameras.add(new) {
                    Ok(camera) => Outcome::ok(camera.third_party_camera_id),
                    Err(e) => Outcome::fail(e.to_string()),
                },
                Err(e) => Outcome::fail(e),
            },
            "UpdateThirdPartyCamera" => match args::<CameraUpdate>(arguments) {
                Ok(update) => match self.world.cameras.update(&update) {
                    Ok(_) => Outcome::done(),
                    Err(e) => Outcome::fail(e.to_string()),
                },
                Err(e) => Outcome::fail(e),
            },
            "SetObjectFilter" => {
                let ids: Vec<String> = arguments
                    .get("objectIds")
                    .and_then(Value::as_array)
                    .map(|ids| {
                        ids.iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                self.world.filter = ObjectFilter::only(ids);
                Outcome::done()
            }
            "ResetObjectFilter" => {
                self.world.filter = ObjectFilter::Unfiltered;
                Outcome::done()
            }
            "GetScenesInBuild" => {
                let scenes: Vec<String> = SCENES_IN_BUILD.map(|n| format!("FloorPlan{n}")).collect();
                Outcome::ok(scenes)
            }
            "TestFastEmit" => Outcome::ok(arguments.get("rvalue").cloned().unwrap_or_default()).fast(),
            "TestActionReflectParam" => {
                Outcome::ok(arguments.get("rvalue").cloned().unwrap_or_default())
            }
            "TestActionDispatchNoop" | "TestActionDispatchConflict" => {
                if shape.is_empty() {
                    Outcome::ok("emptyargs")
                } else {
                    Outcome::ok(shape)
                }
            }
            "TestActionDispatchNoop2" => Outcome::ok(format!(
                "param3 param4/default {}",
                str_arg(arguments, "param4").unwrap_or_default()
            )),
            "TestActionDispatchNoopServerAction" => Outcome::ok("serveraction"),
            "TestActionDispatchNoopAllDefault" => Outcome::ok("alldefault"),
            "TestActionDispatchNoopAllDefault2" => Outcome::ok("somedefault"),
            "TestActionDispatchSAAmbig" | "TestActionDispatchSAAmbig2" | "ProcessControlCommand" => {
                Outcome::ok(shape)
            }
            "TestActionDispatchFindAmbiguous" | "TestActionDispatchFindConflicts" => {
                let type_name = str_arg(arguments, "typeName").unwrap_or_default();
                let Ok(controller) = type_name.parse::<AgentController>() else {
                    return Outcome::fail(format!("unknown type: {type_name}"));
                };
                if action == "TestActionDispatchFindAmbiguous" {
                    Outcome::ok(json!(self.registry.find_ambiguous(controller)))
                } else {
                    Outcome::ok(json!(self.registry.find_conflicts(controller)))
                }
            }
            other => Outcome::fail(format!("{other} is not supported by this engine")),
        }
    }

    fn reset(&mut self, arguments: &Params) -> Outcome {
        let scene = str_arg(arguments, "sceneName").unwrap_or_default();
        if !World::has_scene(scene) {
            return Outcome::fail(format!("Invalid scene name: {scene}"));
        }
        self.world.load_scene(scene);
        info!("Loaded scene {}", scene);
        Outcome::done()
    }

    fn initialize(&mut self, arguments: &Params) -> Outcome {
        let mode = match str_arg(arguments, "agentMode").unwrap_or("default").parse::<AgentMode>() {
            Ok(mode) => mode,
            Err(e) => return Outcome::fail(e),
        };
        let agent_count = arguments
            .get("agentCount")
            .and_then(Value::as_u64)
            .unwrap_or(1) as usize;
        if agent_count == 0 {
            return Outcome::fail("agentCount must be at least 1");
        }
        let width = arguments.get("width").and_then(Value::as_u64);
        let height = arguments.get("height").and_then(Value::as_u64);
        if let Err(message) = check_resolution(
            width.unwrap_or(u64::from(self.world.settings.width)),
            height.unwrap_or(u64::from(self.world.settings.height)),
        ) {
            return Outcome::fail(message);
        }

        let settings = &mut self.world.settings;
        settings.agent_mode = mode;
        settings.controller =
            AgentController::for_mode(mode, str_arg(arguments, "agentControllerType"));
        settings.agent_count = agent_count;
        settings.grid_size = f64_arg(arguments, "gridSize").unwrap_or(0.25);
        if let Some(width) = width {
            settings.width = width as u32;
        }
        if let Some(height) = height {
            settings.height = height as u32;
        }
        settings.render = RenderSettings {
            depth: bool_arg(arguments, "renderDepthImage").unwrap_or(false),
            instance_segmentation: bool_arg(arguments, "renderInstanceSegmentation")
                .unwrap_or(false),
            semantic_segmentation: bool_arg(arguments, "renderSemanticSegmentation")
                .unwrap_or(false),
            normals: bool_arg(arguments, "renderNormalsImage").unwrap_or(false),
            flow: bool_arg(arguments, "renderFlowImage").unwrap_or(false),
        };
        settings.fast_action_emit = bool_arg(arguments, "fastActionEmit").unwrap_or(true);
        if let Some(fov) = f64_arg(arguments, "fieldOfView") {
            settings.field_of_view = fov;
        }
        info!(
            "Initialized {} agent(s) in {} mode ({}x{})",
            agent_count, mode, settings.width, settings.height
        );
        self.world.spawn_agents();
        Outcome::done()
    }

    fn move_agent(&mut self, action: &str, agent_id: usize, arguments: &Params) -> Outcome {
        let magnitude =
            f64_arg(arguments, "moveMagnitude").unwrap_or(self.world.settings.grid_size);
        let pose = &mut self.world.agents[agent_id].pose;
        let offset = match action {
            "MoveAhead" => 0.0,
            "MoveRight" => 90.0,
            "MoveBack" => 180.0,
            _ => 270.0,
        };
        let heading = (pose.rotation.y + offset).to_radians();
        let target = Vector3::new(
            pose.position.x + magnitude * heading.sin(),
            pose.position.y,
            pose.position.z + magnitude * heading.cos(),
        );
        if !World::in_bounds(&target) {
            return Outcome::fail(format!("{action} blocked: target outside the floor"));
        }
        pose.position = target;
        Outcome::done()
    }

    fn teleport(&mut self, action: &str, agent_id: usize, arguments: &Params) -> Outcome {
        let current = self.world.agents[agent_id].pose.clone();
        let position = vector_arg(arguments, "position")
            .or_else(|| {
                Some(Vector3::new(
                    f64_arg(arguments, "x")?,
                    f64_arg(arguments, "y")?,
                    f64_arg(arguments, "z")?,
                ))
            })
            .unwrap_or(current.position);
        let rotation = match arguments.get("rotation") {
            Some(Value::Number(yaw)) => Vector3::new(0.0, yaw.as_f64().unwrap_or(0.0), 0.0),
            Some(v @ Value::Object(_)) => {
                serde_json::from_value(v.clone()).unwrap_or(current.rotation)
            }
            _ => current.rotation,
        };
        let horizon = f64_arg(arguments, "horizon").unwrap_or(current.camera_horizon);
        let standing = bool_arg(arguments, "standing").or(current.is_standing);

        if (position.y - AGENT_Y).abs() > TELEPORT_Y_TOLERANCE || !World::in_bounds(&position) {
            return Outcome::fail(format!(
                "{action} failed: ({}, {}, {}) is not a reachable position",
                position.x, position.y, position.z
            ));
        }
        if !(MIN_HORIZON..=MAX_HORIZON).contains(&horizon) {
            return Outcome::fail(format!(
                "{action} failed: horizon {horizon} outside [{MIN_HORIZON}, {MAX_HORIZON}]"
            ));
        }

        let pose = &mut self.world.agents[agent_id].pose;
        pose.position = Vector3::new(position.x, AGENT_Y, position.z);
        pose.rotation = rotation;
        pose.camera_horizon = horizon;
        pose.is_standing = standing;
        Outcome::done()
    }

    fn open_close(&mut self, action: &str, arguments: &Params) -> Outcome {
        let openness = if action == "OpenObject" {
            f64_arg(arguments, "openness").unwrap_or(1.0)
        } else {
            0.0
        };
        if !(0.0..=1.0).contains(&openness) {
            return Outcome::fail(format!("openness must be in [0:1], got {openness}"));
        }

        let object_id = match str_arg(arguments, "objectId") {
            Some(id) => id.to_string(),
            None => {
                let x = f64_arg(arguments, "x").unwrap_or(-1.0);
                let y = f64_arg(arguments, "y").unwrap_or(-1.0);
                if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
                    return Outcome::fail(format!(
                        "x/y must be in [0:1], got ({x}, {y})"
                    ));
                }
                match self.world.object_at(x, |o| o.openable && o.visible) {
                    Some(object) => object.object_id.clone(),
                    None => return Outcome::fail("no openable object at that point"),
                }
            }
        };

        let Some(object) = self.world.object_mut(&object_id) else {
            return Outcome::fail(format!("Object ID appears to be invalid: {object_id}"));
        };
        if !object.openable {
            return Outcome::fail(format!("{object_id} is not openable"));
        }
        object.openness = openness;
        object.is_open = openness > 0.0;
        Outcome::done()
    }

    fn interactable_poses(&self, arguments: &Params) -> Outcome {
        let object_id = str_arg(arguments, "objectId").unwrap_or_default();
        let Some(object) = self.world.object(object_id) else {
            return Outcome::fail(format!("Object ID appears to be invalid: {object_id}"));
        };
        let max_distance = f64_arg(arguments, "maxDistance").unwrap_or(1.0);
        let max_poses = arguments
            .get("maxPoses")
            .and_then(Value::as_u64)
            .map(|n| n as usize);
        let horizons: Vec<f64> = arguments
            .get("horizons")
            .and_then(Value::as_array)
            .map(|hs| hs.iter().filter_map(Value::as_f64).collect())
            .unwrap_or_else(|| vec![0.0, 30.0]);
        let rotations: Option<Vec<f64>> = arguments
            .get("rotations")
            .and_then(Value::as_array)
            .map(|rs| rs.iter().filter_map(Value::as_f64).collect());
        let standings: Vec<Option<bool>> = if self.world.settings.agent_mode.supports_standing() {
            arguments
                .get("standings")
                .and_then(Value::as_array)
                .map(|ss| ss.iter().filter_map(Value::as_bool).map(Some).collect())
                .unwrap_or_else(|| vec![Some(true)])
        } else {
            vec![None]
        };

        let grid = self.world.settings.grid_size;
        let distance = (max_distance / grid).floor().max(1.0) * grid;
        let mut poses = Vec::new();
        // Grid-aligned spots around the object, facing it
        for (dx, dz, yaw) in [(0.0, -1.0, 0.0), (-1.0, 0.0, 90.0), (0.0, 1.0, 180.0), (1.0, 0.0, 270.0)] {
            if rotations.as_ref().is_some_and(|r| !r.contains(&yaw)) {
                continue;
            }
            let spot = Vector3::new(
                ((object.position.x + dx * distance) / grid).round() * grid,
                AGENT_Y,
                ((object.position.z + dz * distance) / grid).round() * grid,
            );
            if !World::in_bounds(&spot) {
                continue;
            }
            for &horizon in &horizons {
                for standing in &standings {
                    let mut pose = json!({
                        "x": spot.x,
                        "y": spot.y,
                        "z": spot.z,
                        "rotation": yaw,
                        "horizon": horizon,
                    });
                    if let Some(standing) = standing {
                        pose["standing"] = json!(standing);
                    }
                    poses.push(pose);
                }
            }
        }
        if let Some(max) = max_poses {
            poses.truncate(max);
        }
        Outcome::ok(poses)
    }

    fn object_in_frame(&self, arguments: &Params) -> Outcome {
        let x = f64_arg(arguments, "x").unwrap_or(-1.0);
        let y = f64_arg(arguments, "y").unwrap_or(-1.0);
        if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
            return Outcome::fail(format!("x/y must be in [0:1], got ({x}, {y})"));
        }
        let check_visible = bool_arg(arguments, "checkVisible").unwrap_or(false);
        let filter = &self.world.filter;
        match self
            .world
            .object_at(x, |o| filter.admits(&o.object_id) && (!check_visible || o.visible))
        {
            Some(object) => Outcome::ok(object.object_id.clone()).fast(),
            None => Outcome::fail("no object at that point"),
        }
    }
}

type Channels = [(bool, FieldType, FrameKind); 4];

/// Image fields for the enabled optional channels of one viewpoint
fn channel_fields<'a>(
    scene: &'a str,
    view: Viewpoint<'a>,
    channels: Channels,
    width: u32,
    height: u32,
) -> impl Iterator<Item = Field> + 'a {
    channels
        .into_iter()
        .filter(|(enabled, _, _)| *enabled)
        .map(move |(_, field, kind)| Field::new(field, render::image(scene, view, kind, width, height)))
}

fn agent_channels(render: RenderSettings) -> Channels {
    [
        (render.instance_segmentation, FieldType::IdsImage, FrameKind::InstanceSegmentation),
        (render.semantic_segmentation, FieldType::ClassesImage, FrameKind::SemanticSegmentation),
        (render.normals, FieldType::NormalsImage, FrameKind::Normals),
        (render.flow, FieldType::FlowsImage, FrameKind::Flow),
    ]
}

fn camera_channels(render: RenderSettings) -> Channels {
    [
        (render.instance_segmentation, FieldType::ThirdPartyImageIds, FrameKind::InstanceSegmentation),
        (render.semantic_segmentation, FieldType::ThirdPartyClasses, FrameKind::SemanticSegmentation),
        (render.normals, FieldType::ThirdPartyNormals, FrameKind::Normals),
        (render.flow, FieldType::ThirdPartyFlow, FrameKind::Flow),
    ]
}
