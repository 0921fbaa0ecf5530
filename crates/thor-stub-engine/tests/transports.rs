//! The controller against the stub engine over every transport

mod common;

use common::params;
use serde_json::json;
use std::sync::Arc;
use thor_bridge::EngineCommand;
use thor_client::{Controller, ControllerConfig, ControllerState, TransportConfig};
use thor_core::ThorError;
use thor_stub_engine::{Engine, serve_http};
use tokio::sync::Mutex;

async fn exercise(controller: &mut Controller) {
    let event = controller
        .step_action("RotateLook", params(json!({"rotation": 90, "horizon": 30})))
        .await
        .unwrap();
    assert!(event.success());
    assert_eq!(event.pose().rotation.y, 90.0);
    assert_eq!(event.pose().camera_horizon, 30.0);
    assert_eq!(event.frame().shape(), (300, 300, 3));

    let event = controller
        .step_action("MoveAhead", params(json!({})))
        .await
        .unwrap();
    assert!(event.success());
    assert_eq!(event.metadata().last_action, "MoveAhead");
}

#[tokio::test]
async fn test_in_memory_pipe() {
    let mut controller = common::default_controller().await;
    assert_eq!(controller.state(), ControllerState::Running);
    exercise(&mut controller).await;
    controller.stop().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn test_unix_socket() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.sock");
    let engine = Arc::new(Mutex::new(Engine::new("FloorPlan28")));
    let listen_path = path.clone();
    tokio::spawn(async move { thor_stub_engine::serve_unix(engine, &listen_path).await });

    // The listener binds on its first poll
    let mut attempts = 0;
    let mut controller = loop {
        let config = ControllerConfig {
            transport: Some(TransportConfig::Unix { path: path.clone() }),
            ..Default::default()
        };
        match Controller::launch(config).await {
            Ok(controller) => break controller,
            Err(ThorError::Transport(_)) if attempts < 50 => {
                attempts += 1;
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            }
            Err(e) => panic!("connect failed: {e}"),
        }
    };

    exercise(&mut controller).await;
    controller.stop().await.unwrap();
}

#[tokio::test]
async fn test_spawned_engine_process() {
    let command = EngineCommand::new(env!("CARGO_BIN_EXE_thor-stub-engine"))
        .env("RUST_LOG", "warn")
        .env("THOR_STUB_SCENE", "FloorPlan1");
    let config = ControllerConfig {
        scene: "FloorPlan2".into(),
        transport: Some(TransportConfig::Pipe { command }),
        ..Default::default()
    };
    let mut controller = Controller::launch(config).await.unwrap();
    assert_eq!(
        controller.last_event().unwrap().metadata().scene_name,
        "FloorPlan2"
    );

    exercise(&mut controller).await;
    controller.stop().await.unwrap();
    controller.stop().await.unwrap();
    let err = controller
        .step_action("Pass", params(json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, ThorError::ControllerClosed));
}

#[tokio::test]
async fn test_http() {
    let engine = Arc::new(Mutex::new(Engine::new("FloorPlan28")));
    let addr = serve_http(engine, "127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let config = ControllerConfig {
        transport: Some(TransportConfig::Http {
            url: format!("http://{addr}"),
        }),
        ..Default::default()
    };
    let mut controller = Controller::launch(config).await.unwrap();

    exercise(&mut controller).await;
    controller.stop().await.unwrap();
}

#[tokio::test]
async fn test_large_payload_round_trip() {
    use rand::Rng;
    use rand::distr::Alphanumeric;

    let payload: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(16 * 1024)
        .map(char::from)
        .collect();

    let mut controller = common::default_controller().await;
    let event = controller
        .step_action("TestActionReflectParam", params(json!({"rvalue": payload})))
        .await
        .unwrap();
    assert_eq!(event.action_return(), &json!(payload));
}
