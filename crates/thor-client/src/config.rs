//! Controller configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thor_bridge::EngineCommand;
use thor_core::{AgentMode, Params, Result, ThorError};
use tracing::warn;

/// Deprecated option names and their replacements
const RENDER_ALIASES: [(&str, &str); 2] = [
    ("renderObjectImage", "renderInstanceSegmentation"),
    ("renderClassImage", "renderSemanticSegmentation"),
];

/// Rewrite deprecated render option names in place
///
/// When both spellings are present the current name wins.
pub fn normalize_render_aliases(params: &mut Params) {
    for (old, new) in RENDER_ALIASES {
        if let Some(value) = params.remove(old) {
            warn!("{} is deprecated, use {}", old, new);
            params.entry(new).or_insert(value);
        }
    }
}

/// Which auxiliary images the engine renders each step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderFlags {
    #[serde(default)]
    pub render_depth_image: bool,
    #[serde(default)]
    pub render_instance_segmentation: bool,
    #[serde(default)]
    pub render_semantic_segmentation: bool,
    #[serde(default)]
    pub render_normals_image: bool,
    #[serde(default)]
    pub render_flow_image: bool,
}

/// Per-call render overrides; `None` keeps the configured baseline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_depth_image: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_instance_segmentation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_semantic_segmentation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_normals_image: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_flow_image: Option<bool>,
}

impl RenderOptions {
    pub fn apply(&self, baseline: RenderFlags) -> RenderFlags {
        RenderFlags {
            render_depth_image: self.render_depth_image.unwrap_or(baseline.render_depth_image),
            render_instance_segmentation: self
                .render_instance_segmentation
                .unwrap_or(baseline.render_instance_segmentation),
            render_semantic_segmentation: self
                .render_semantic_segmentation
                .unwrap_or(baseline.render_semantic_segmentation),
            render_normals_image: self
                .render_normals_image
                .unwrap_or(baseline.render_normals_image),
            render_flow_image: self.render_flow_image.unwrap_or(baseline.render_flow_image),
        }
    }
}

/// Where the engine lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TransportConfig {
    /// Spawn the engine and use its stdio as the framed pipe
    Pipe { command: EngineCommand },
    /// Framed pipe over an existing Unix domain socket
    Unix { path: PathBuf },
    /// POST envelopes to an engine HTTP server
    Http { url: String },
}

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerConfig {
    #[serde(default = "default_scene")]
    pub scene: String,

    #[serde(default = "default_screen_size")]
    pub width: u32,

    #[serde(default = "default_screen_size")]
    pub height: u32,

    #[serde(default)]
    pub agent_mode: AgentMode,

    /// Handler type override for the default agent mode ("stochastic")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_controller_type: Option<String>,

    #[serde(default = "default_agent_count")]
    pub agent_count: usize,

    #[serde(default = "default_grid_size")]
    pub grid_size: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_of_view: Option<f64>,

    /// Baseline render flags applied on every reset
    #[serde(flatten)]
    pub render: RenderFlags,

    #[serde(default = "default_true")]
    pub fast_action_emit: bool,

    /// Resolve actions against the signature registry before sending
    #[serde(default = "default_true")]
    pub local_dispatch: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportConfig>,
}

fn default_scene() -> String {
    "FloorPlan28".to_string()
}

fn default_screen_size() -> u32 {
    300
}

fn default_agent_count() -> usize {
    1
}

fn default_grid_size() -> f64 {
    0.25
}

fn default_true() -> bool {
    true
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            scene: default_scene(),
            width: default_screen_size(),
            height: default_screen_size(),
            agent_mode: AgentMode::Default,
            agent_controller_type: None,
            agent_count: default_agent_count(),
            grid_size: default_grid_size(),
            field_of_view: None,
            render: RenderFlags::default(),
            fast_action_emit: true,
            local_dispatch: true,
            transport: None,
        }
    }
}

impl ControllerConfig {
    /// Build a configuration from loose keyword options
    pub fn from_params(mut params: Params) -> Result<Self> {
        normalize_render_aliases(&mut params);
        let config: ControllerConfig = serde_json::from_value(params.into())
            .map_err(|e| ThorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ThorError::Config(format!(
                "screen size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.agent_count == 0 {
            return Err(ThorError::Config("agentCount must be at least 1".into()));
        }
        if self.grid_size <= 0.0 {
            return Err(ThorError::Config(format!(
                "gridSize must be positive, got {}",
                self.grid_size
            )));
        }
        Ok(())
    }
}

/// Options of one `reset` call; unset fields fall back to the configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_mode: Option<AgentMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_controller_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fast_action_emit: Option<bool>,
    #[serde(flatten)]
    pub render: RenderOptions,
}

impl ResetOptions {
    pub fn scene(scene: impl Into<String>) -> Self {
        Self {
            scene: Some(scene.into()),
            ..Default::default()
        }
    }

    /// Build options from loose keyword parameters
    pub fn from_params(mut params: Params) -> Result<Self> {
        normalize_render_aliases(&mut params);
        serde_json::from_value(params.into()).map_err(|e| ThorError::Config(e.to_string()))
    }
}
