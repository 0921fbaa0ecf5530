//! Controller facade
//!
//! Owns the transport, the signature registry and the most recent event.
//! Lifecycle: `Created → Running → Stopped`.

use crate::config::{
    ControllerConfig, RenderFlags, ResetOptions, TransportConfig, normalize_render_aliases,
};
use crate::decoder::EventDecoder;
use crate::event::Event;
use serde_json::Value;
use thor_bridge::{Envelope, HttpTransport, PipeTransport, Transport};
use thor_core::{
    ActionRegistry, ActionRequest, AgentController, AgentMode, AgentPatch, DispatchError,
    ObjectFilter, Params, Result, ThorError,
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Created,
    Running,
    Stopped,
}

/// Options of one `step` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOptions {
    /// Raise `ActionFailed` when the engine reports `lastActionSuccess = false`
    pub raise_for_failure: bool,
}

impl StepOptions {
    pub fn raise_for_failure() -> Self {
        Self {
            raise_for_failure: true,
        }
    }
}

/// Controller-side settings implied by one Initialize
#[derive(Debug, Clone)]
struct Initialization {
    params: Params,
    agent_controller: AgentController,
    agent_count: usize,
    render: RenderFlags,
    fast_action_emit: bool,
}

impl Initialization {
    /// Read what the engine adopts from `params`; absent render flags are off
    fn from_params(mut params: Params) -> Result<Self> {
        let agent_mode = match params.get("agentMode") {
            Some(Value::String(mode)) => mode.parse::<AgentMode>().map_err(ThorError::Config)?,
            Some(other) => {
                return Err(ThorError::Config(format!(
                    "agentMode must be a string, got {other}"
                )));
            }
            None => AgentMode::Default,
        };
        params.insert("agentMode".into(), agent_mode.as_str().into());

        let agent_count = match params.get("agentCount") {
            Some(count) => count.as_u64().ok_or_else(|| {
                ThorError::Config(format!("agentCount must be an integer, got {count}"))
            })? as usize,
            None => 1,
        };
        if agent_count == 0 {
            return Err(ThorError::Config("agentCount must be at least 1".into()));
        }

        let controller_type = params.get("agentControllerType").and_then(Value::as_str);
        let agent_controller = AgentController::for_mode(agent_mode, controller_type);
        let render: RenderFlags = serde_json::from_value(Value::Object(params.clone()))?;
        let fast_action_emit = params
            .get("fastActionEmit")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        Ok(Self {
            params,
            agent_controller,
            agent_count,
            render,
            fast_action_emit,
        })
    }
}

pub struct Controller {
    config: ControllerConfig,
    transport: Box<dyn Transport>,
    registry: ActionRegistry,
    decoder: EventDecoder,
    state: ControllerState,
    sequence_id: u64,
    last_event: Option<Event>,
    agent_controller: AgentController,
    agent_count: usize,
    initialization_parameters: Params,
    object_filter: ObjectFilter,
}

impl Controller {
    /// Create a controller over an established transport; call `start` next
    pub fn new(config: ControllerConfig, transport: impl Transport + 'static) -> Self {
        Self::with_registry(config, transport, ActionRegistry::builtin())
    }

    pub fn with_registry(
        config: ControllerConfig,
        transport: impl Transport + 'static,
        registry: ActionRegistry,
    ) -> Self {
        Self::assemble(config, Box::new(transport), registry)
    }

    fn assemble(
        config: ControllerConfig,
        transport: Box<dyn Transport>,
        registry: ActionRegistry,
    ) -> Self {
        let decoder = EventDecoder::new(config.render, config.fast_action_emit);
        let agent_controller = AgentController::for_mode(
            config.agent_mode,
            config.agent_controller_type.as_deref(),
        );
        Self {
            agent_count: config.agent_count,
            config,
            transport,
            registry,
            decoder,
            state: ControllerState::Created,
            sequence_id: 0,
            last_event: None,
            agent_controller,
            initialization_parameters: Params::new(),
            object_filter: ObjectFilter::Unfiltered,
        }
    }

    /// Connect using the configured transport and run the initial reset
    pub async fn launch(config: ControllerConfig) -> Result<Self> {
        config.validate()?;
        let transport: Box<dyn Transport> = match &config.transport {
            Some(TransportConfig::Pipe { command }) => Box::new(PipeTransport::spawn(command)?),
            #[cfg(unix)]
            Some(TransportConfig::Unix { path }) => {
                Box::new(PipeTransport::connect_unix(path).await?)
            }
            #[cfg(not(unix))]
            Some(TransportConfig::Unix { .. }) => {
                return Err(ThorError::Config(
                    "unix sockets are not supported on this platform".into(),
                ));
            }
            Some(TransportConfig::Http { url }) => Box::new(HttpTransport::new(url)?),
            None => return Err(ThorError::Config("no transport configured".into())),
        };

        let mut controller = Self::assemble(config, transport, ActionRegistry::builtin());
        controller.start().await?;
        Ok(controller)
    }

    /// Run the initial reset; a no-op when already running
    pub async fn start(&mut self) -> Result<()> {
        match self.state {
            ControllerState::Running => {
                debug!("Controller already started");
                Ok(())
            }
            ControllerState::Stopped => Err(ThorError::ControllerClosed),
            ControllerState::Created => {
                info!("Starting controller over {} transport", self.transport.kind());
                self.reset_inner(ResetOptions::default()).await?;
                self.state = ControllerState::Running;
                Ok(())
            }
        }
    }

    /// Load a scene and re-initialize the agents
    pub async fn reset(&mut self, options: ResetOptions) -> Result<&Event> {
        self.ensure_running()?;
        self.reset_inner(options).await
    }

    /// Execute one action
    pub async fn step(&mut self, request: &ActionRequest) -> Result<&Event> {
        self.step_with(request, StepOptions::default()).await
    }

    /// Execute an action given by name plus keyword parameters
    pub async fn step_action(&mut self, action: &str, params: Params) -> Result<&Event> {
        let request = ActionRequest::new(action).merged(params);
        self.step(&request).await
    }

    pub async fn step_with(
        &mut self,
        request: &ActionRequest,
        options: StepOptions,
    ) -> Result<&Event> {
        self.ensure_running()?;

        let mut request = request.clone();
        request.normalize_legacy();
        let initializing = request.action == "Initialize";
        if initializing {
            normalize_render_aliases(&mut request.params);
        }
        let agent_id = match request.take_agent_id() {
            Ok(agent_id) => agent_id.unwrap_or(0),
            Err(err) => return Err(self.reject_locally(&request.action, 0, err)),
        };
        if agent_id >= self.agent_count {
            let err = DispatchError::InvalidArgument {
                action: request.action.clone(),
                argument: thor_core::action::AGENT_ID_KEY.into(),
                detail: format!("agent {agent_id} out of range for {} agents", self.agent_count),
            };
            return Err(self.reject_locally(&request.action, 0, err.into()));
        }

        if self.config.local_dispatch {
            let resolution = self
                .registry
                .resolve(self.agent_controller, &request.action, &request.params)
                .map(|_| ());
            if let Err(err) = resolution {
                return Err(self.reject_locally(&request.action, agent_id, err.into()));
            }
        }

        // Initialize replaces the engine's settings, so the reply is decoded
        // under the new ones
        let initialization = if initializing {
            match self.initialization_for(&request.params) {
                Ok(initialization) => Some(initialization),
                Err(err) => return Err(self.reject_locally(&request.action, agent_id, err)),
            }
        } else {
            None
        };
        let previous_decoder = self.decoder;
        if let Some(initialization) = &initialization {
            self.decoder =
                EventDecoder::new(initialization.render, initialization.fast_action_emit);
        }

        let event = match self.exchange(&request, agent_id).await {
            Ok(event) => event,
            Err(err) => {
                self.decoder = previous_decoder;
                return Err(err);
            }
        };
        let agent = event
            .agent(agent_id)
            .ok_or_else(|| ThorError::Protocol(format!("response has no agent {agent_id}")))?;

        let success = agent.success();
        let failure = if let Some(code) = agent.metadata.dispatch_error() {
            Some(ThorError::EngineRejected {
                code,
                message: agent.error_message().to_string(),
            })
        } else if !success && options.raise_for_failure {
            Some(ThorError::ActionFailed {
                action: request.action.clone(),
                message: agent.error_message().to_string(),
            })
        } else {
            None
        };

        if success {
            self.track_object_filter(&request);
            if let Some(initialization) = initialization {
                self.adopt(initialization);
            }
        } else {
            self.decoder = previous_decoder;
        }

        let event = self.last_event.insert(event);
        match failure {
            Some(err) => Err(err),
            None => Ok(&*event),
        }
    }

    /// Close the transport and release the engine; idempotent
    pub async fn stop(&mut self) -> Result<()> {
        if self.state == ControllerState::Stopped {
            return Ok(());
        }
        self.state = ControllerState::Stopped;
        self.transport.close().await?;
        info!("Controller stopped after {} exchanges", self.sequence_id);
        Ok(())
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn last_event(&self) -> Option<&Event> {
        self.last_event.as_ref()
    }

    /// Parameters of the most recent Initialize
    pub fn initialization_parameters(&self) -> &Params {
        &self.initialization_parameters
    }

    pub fn object_filter(&self) -> &ObjectFilter {
        &self.object_filter
    }

    pub fn agent_controller(&self) -> AgentController {
        self.agent_controller
    }

    pub fn agent_count(&self) -> usize {
        self.agent_count
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Render flags in effect since the last Initialize
    pub fn render_flags(&self) -> RenderFlags {
        self.decoder.render
    }

    fn ensure_running(&self) -> Result<()> {
        match self.state {
            ControllerState::Created => Err(ThorError::NotStarted),
            ControllerState::Running => Ok(()),
            ControllerState::Stopped => Err(ThorError::ControllerClosed),
        }
    }

    async fn reset_inner(&mut self, options: ResetOptions) -> Result<&Event> {
        let config = &self.config;
        let scene = options.scene.unwrap_or_else(|| config.scene.clone());
        let width = options.width.unwrap_or(config.width);
        let height = options.height.unwrap_or(config.height);
        let agent_mode = options.agent_mode.unwrap_or(config.agent_mode);
        let controller_type = options
            .agent_controller_type
            .or_else(|| config.agent_controller_type.clone());
        let agent_count = options.agent_count.unwrap_or(config.agent_count);
        let grid_size = options.grid_size.unwrap_or(config.grid_size);
        let fast_action_emit = options.fast_action_emit.unwrap_or(config.fast_action_emit);
        let render = options.render.apply(config.render);
        let field_of_view = config.field_of_view;

        let mut init = Params::new();
        init.insert("gridSize".into(), grid_size.into());
        init.insert("width".into(), width.into());
        init.insert("height".into(), height.into());
        init.insert("agentMode".into(), agent_mode.as_str().into());
        if let Some(controller_type) = &controller_type {
            init.insert("agentControllerType".into(), controller_type.as_str().into());
        }
        init.insert("agentCount".into(), agent_count.into());
        if let Value::Object(flags) = serde_json::to_value(render)? {
            init.extend(flags);
        }
        init.insert("fastActionEmit".into(), fast_action_emit.into());
        if let Some(fov) = field_of_view {
            init.insert("fieldOfView".into(), fov.into());
        }
        let initialization = Initialization::from_params(init)?;

        self.last_event = None;

        // Reset answers under whatever render settings the engine had before;
        // only the RGB frames are certain to be there
        self.decoder = EventDecoder::new(RenderFlags::default(), fast_action_emit);
        let reset = ActionRequest::new("Reset").param("sceneName", scene.as_str());
        let event = self.checked_exchange(&reset).await?;
        self.last_event = Some(event);
        self.decoder = EventDecoder::new(initialization.render, fast_action_emit);

        let initialize = ActionRequest::new("Initialize").merged(initialization.params.clone());
        let event = self.checked_exchange(&initialize).await?;

        self.adopt(initialization);
        self.object_filter = ObjectFilter::Unfiltered;
        info!(
            "Reset {} ({}x{}, {} agent(s), {:?})",
            scene, width, height, agent_count, self.agent_controller
        );
        Ok(&*self.last_event.insert(event))
    }

    /// Settings an Initialize with `params` leaves the engine in
    ///
    /// The engine keeps its resolution when none is given, so the recorded
    /// parameters carry the previous one forward.
    fn initialization_for(&self, params: &Params) -> Result<Initialization> {
        let mut params = params.clone();
        for key in ["width", "height"] {
            if !params.contains_key(key) {
                if let Some(value) = self.initialization_parameters.get(key) {
                    params.insert(key.into(), value.clone());
                }
            }
        }
        Initialization::from_params(params)
    }

    /// Take on the settings of a successful Initialize
    fn adopt(&mut self, initialization: Initialization) {
        self.decoder = EventDecoder::new(initialization.render, initialization.fast_action_emit);
        self.agent_controller = initialization.agent_controller;
        self.agent_count = initialization.agent_count;
        self.initialization_parameters = initialization.params;
        debug!(
            "Initialized {} agent(s) as {:?}",
            self.agent_count, self.agent_controller
        );
    }

    /// Record a request refused before it reached the engine as a failed step
    fn reject_locally(&mut self, action: &str, agent_id: usize, err: ThorError) -> ThorError {
        if let Some(previous) = &self.last_event {
            let patch = AgentPatch {
                last_action: action.to_string(),
                last_action_success: false,
                error_message: err.to_string(),
                error_code: err.error_code().map(|code| code.as_str().to_string()),
                action_return: Value::Null,
            };
            self.last_event = Some(previous.with_patch(agent_id, &patch));
        }
        warn!("Rejected {} locally: {}", action, err);
        err
    }

    /// Exchange that treats any failure as an error
    async fn checked_exchange(&mut self, request: &ActionRequest) -> Result<Event> {
        if self.config.local_dispatch {
            self.registry
                .resolve(self.agent_controller, &request.action, &request.params)?;
        }
        let event = self.exchange(request, 0).await?;
        if let Some(code) = event.metadata().dispatch_error() {
            return Err(ThorError::EngineRejected {
                code,
                message: event.error_message().to_string(),
            });
        }
        if !event.success() {
            return Err(ThorError::ActionFailed {
                action: request.action.clone(),
                message: event.error_message().to_string(),
            });
        }
        Ok(event)
    }

    async fn exchange(&mut self, request: &ActionRequest, agent_id: usize) -> Result<Event> {
        self.sequence_id += 1;
        let sequence_id = self.sequence_id;
        let wire = request.to_wire(sequence_id, agent_id);
        debug!("Step {} seq={} agent={}", request.action, sequence_id, agent_id);

        let response = self.transport.send(Envelope::action(&wire)?).await?;
        let event = self.decoder.decode(&response, self.last_event.as_ref())?;
        if event.sequence_id() != sequence_id {
            return Err(ThorError::Protocol(format!(
                "response sequenceId {} does not match request {}",
                event.sequence_id(),
                sequence_id
            )));
        }
        Ok(event)
    }

    fn track_object_filter(&mut self, request: &ActionRequest) {
        match request.action.as_str() {
            "SetObjectFilter" => {
                let ids = request
                    .params
                    .get("objectIds")
                    .and_then(Value::as_array)
                    .map(|ids| ids.iter().filter_map(Value::as_str).map(str::to_string))
                    .into_iter()
                    .flatten();
                self.object_filter = ObjectFilter::only(ids);
            }
            "ResetObjectFilter" => self.object_filter = ObjectFilter::Unfiltered,
            _ => {}
        }
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("state", &self.state)
            .field("transport", &self.transport.kind())
            .field("agent_controller", &self.agent_controller)
            .field("agent_count", &self.agent_count)
            .field("sequence_id", &self.sequence_id)
            .finish()
    }
}
