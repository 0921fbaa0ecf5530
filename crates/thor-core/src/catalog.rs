//! Built-in action catalog mirroring the engine's agent handlers

use crate::agent::AgentController;
use crate::dispatch::ActionRegistry;
use crate::signature::{ActionSignature, ParamSpec, ParamType};

fn req(name: &str, kind: ParamType) -> ParamSpec {
    ParamSpec::required(name, kind)
}

fn opt(name: &str, kind: ParamType, default: impl Into<serde_json::Value>) -> ParamSpec {
    ParamSpec::optional(name, kind, default)
}

fn null(name: &str, kind: ParamType) -> ParamSpec {
    ParamSpec::nullable(name, kind)
}

fn force_action() -> ParamSpec {
    opt("forceAction", ParamType::Bool, false)
}

impl ActionRegistry {
    /// Registry with the engine's standard action surface
    pub fn builtin() -> Self {
        let mut registry = ActionRegistry::new();
        declare_base(&mut registry);
        for controller in [AgentController::Physics, AgentController::Stochastic] {
            declare_teleport(&mut registry, controller, true);
        }
        for controller in [AgentController::Locobot, AgentController::Drone] {
            declare_teleport(&mut registry, controller, false);
        }
        declare_object_interaction(&mut registry, AgentController::Physics);
        registry
    }
}

fn declare_base(registry: &mut ActionRegistry) {
    use ParamType::*;
    let base = AgentController::Base;
    let mut add = |sig: ActionSignature| registry.register(base, sig);

    add(ActionSignature::explicit("Reset", vec![req("sceneName", String)]));
    add(ActionSignature::aggregate(
        "Initialize",
        vec![
            opt("gridSize", Float, 0.25),
            null("width", Int),
            null("height", Int),
            opt("agentMode", String, "default"),
            null("agentControllerType", String),
            opt("agentCount", Int, 1),
            opt("renderDepthImage", Bool, false),
            opt("renderInstanceSegmentation", Bool, false),
            opt("renderSemanticSegmentation", Bool, false),
            opt("renderNormalsImage", Bool, false),
            opt("renderFlowImage", Bool, false),
            opt("fastActionEmit", Bool, true),
            opt("visibilityDistance", Float, 1.5),
            null("fieldOfView", Float),
            opt("snapToGrid", Bool, true),
        ],
    ));
    add(ActionSignature::explicit("Pass", vec![]));

    add(ActionSignature::explicit(
        "RotateLook",
        vec![req("rotation", Float), req("horizon", Float)],
    ));
    for name in ["RotateLeft", "RotateRight"] {
        add(ActionSignature::explicit(
            name,
            vec![opt("degrees", Float, 90.0), force_action()],
        ));
    }
    for name in ["LookUp", "LookDown"] {
        add(ActionSignature::explicit(
            name,
            vec![opt("degrees", Float, 30.0), force_action()],
        ));
    }
    for name in ["MoveAhead", "MoveBack", "MoveLeft", "MoveRight"] {
        add(ActionSignature::explicit(
            name,
            vec![null("moveMagnitude", Float), force_action()],
        ));
    }
    add(ActionSignature::explicit(
        "ChangeResolution",
        vec![req("x", Int), req("y", Int)],
    ));

    add(ActionSignature::explicit(
        "AddThirdPartyCamera",
        vec![
            req("position", Vector3),
            req("rotation", Vector3),
            opt("fieldOfView", Float, 90.0),
            opt("orthographic", Bool, false),
            null("orthographicSize", Float),
        ],
    ));
    add(ActionSignature::explicit(
        "UpdateThirdPartyCamera",
        vec![
            opt("thirdPartyCameraId", Int, 0),
            null("position", PartialVector3),
            null("rotation", PartialVector3),
            null("fieldOfView", Float),
            null("orthographic", Bool),
            null("orthographicSize", Float),
        ],
    ));

    add(ActionSignature::explicit(
        "SetObjectFilter",
        vec![req("objectIds", StringList)],
    ));
    add(ActionSignature::explicit("ResetObjectFilter", vec![]));
    add(ActionSignature::explicit("GetScenesInBuild", vec![]));

    add(ActionSignature::explicit("TestFastEmit", vec![req("rvalue", String)]));
    add(ActionSignature::explicit(
        "TestActionReflectParam",
        vec![req("rvalue", Any)],
    ));

    // Dispatch fixtures: overload shapes the resolver must tell apart
    add(ActionSignature::explicit("TestActionDispatchNoop", vec![]));
    add(ActionSignature::explicit(
        "TestActionDispatchNoop",
        vec![req("param1", Bool)],
    ));
    add(ActionSignature::explicit(
        "TestActionDispatchNoop",
        vec![req("param1", Bool), req("param2", Bool)],
    ));
    add(ActionSignature::explicit(
        "TestActionDispatchNoop",
        vec![req("param6", String), req("param7", String)],
    ));
    add(ActionSignature::explicit(
        "TestActionDispatchNoop2",
        vec![req("param3", Bool), opt("param4", String, "foo")],
    ));
    add(ActionSignature::aggregate(
        "TestActionDispatchNoopServerAction",
        vec![null("objectId", String), force_action()],
    ));
    add(ActionSignature::explicit(
        "TestActionDispatchNoopAllDefault",
        vec![opt("param10", Float, 0.0), opt("param11", Float, 0.0)],
    ));
    add(ActionSignature::explicit(
        "TestActionDispatchNoopAllDefault2",
        vec![req("param12", Float), opt("param13", Float, 0.0)],
    ));
    add(ActionSignature::aggregate(
        "TestActionDispatchSAAmbig",
        vec![null("objectId", String)],
    ));
    add(ActionSignature::explicit(
        "TestActionDispatchSAAmbig",
        vec![opt("param14", Int, 0)],
    ));
    add(ActionSignature::explicit(
        "TestActionDispatchSAAmbig2",
        vec![opt("param9", String, "x")],
    ));
    add(ActionSignature::explicit(
        "TestActionDispatchSAAmbig2",
        vec![opt("param10", Bool, true)],
    ));
    add(ActionSignature::explicit(
        "TestActionDispatchConflict",
        vec![req("param22", String), req("param23", String)],
    ));
    add(ActionSignature::explicit(
        "TestActionDispatchConflict",
        vec![req("param22", Bool)],
    ));
    add(ActionSignature::aggregate(
        "ProcessControlCommand",
        vec![null("objectId", String), force_action()],
    ));
    add(ActionSignature::explicit(
        "ProcessControlCommand",
        vec![req("controlCommand", Object)],
    ));
    add(ActionSignature::explicit(
        "TestActionDispatchFindAmbiguous",
        vec![req("typeName", String)],
    ));
    add(ActionSignature::explicit(
        "TestActionDispatchFindConflicts",
        vec![req("typeName", String)],
    ));
}

fn declare_teleport(registry: &mut ActionRegistry, controller: AgentController, standing: bool) {
    use ParamType::*;

    let with_standing = |mut params: Vec<ParamSpec>, required: bool| {
        if standing {
            let spec = if required {
                req("standing", Bool)
            } else {
                null("standing", Bool)
            };
            params.insert(params.len() - 1, spec);
        }
        params
    };

    registry.register(
        controller,
        ActionSignature::explicit(
            "Teleport",
            with_standing(
                vec![
                    null("position", Vector3),
                    null("rotation", Rotation),
                    null("horizon", Float),
                    force_action(),
                ],
                false,
            ),
        ),
    );
    registry.register(
        controller,
        ActionSignature::explicit(
            "Teleport",
            with_standing(
                vec![
                    req("x", Float),
                    req("y", Float),
                    req("z", Float),
                    null("rotation", Rotation),
                    null("horizon", Float),
                    force_action(),
                ],
                false,
            ),
        ),
    );
    registry.register(
        controller,
        ActionSignature::explicit(
            "TeleportFull",
            with_standing(
                vec![
                    req("x", Float),
                    req("y", Float),
                    req("z", Float),
                    req("rotation", Rotation),
                    req("horizon", Float),
                    force_action(),
                ],
                true,
            ),
        ),
    );
    registry.register(
        controller,
        ActionSignature::explicit(
            "TeleportFull",
            with_standing(
                vec![
                    req("position", Vector3),
                    req("rotation", Rotation),
                    req("horizon", Float),
                    force_action(),
                ],
                true,
            ),
        ),
    );
}

fn declare_object_interaction(registry: &mut ActionRegistry, controller: AgentController) {
    use ParamType::*;
    let mut add = |sig: ActionSignature| registry.register(controller, sig);

    add(ActionSignature::explicit(
        "OpenObject",
        vec![
            req("objectId", String),
            opt("openness", Float, 1.0),
            force_action(),
        ],
    ));
    add(ActionSignature::explicit(
        "OpenObject",
        vec![
            req("x", Float),
            req("y", Float),
            opt("openness", Float, 1.0),
            force_action(),
        ],
    ));
    add(ActionSignature::explicit(
        "CloseObject",
        vec![req("objectId", String), force_action()],
    ));
    add(ActionSignature::explicit(
        "CloseObject",
        vec![req("x", Float), req("y", Float), force_action()],
    ));
    add(ActionSignature::explicit(
        "GetInteractablePoses",
        vec![
            req("objectId", String),
            null("positions", Any),
            null("rotations", FloatList),
            null("horizons", FloatList),
            null("standings", Any),
            opt("maxDistance", Float, 1.0),
            null("maxPoses", Int),
        ],
    ));
    add(ActionSignature::explicit(
        "GetObjectInFrame",
        vec![req("x", Float), req("y", Float), opt("checkVisible", Bool, false)],
    ));
}
