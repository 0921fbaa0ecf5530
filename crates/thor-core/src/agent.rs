//! Agent modes and the engine's agent handler types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Agent body selected at initialization
///
/// Deserialization goes through [`FromStr`], so deprecated names warn the
/// same way wherever they arrive from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum AgentMode {
    /// Humanoid agent; can stand or crouch
    #[default]
    Default,
    /// Wheeled robot; no standing degree of freedom
    Locobot,
    /// Flying agent; no standing degree of freedom
    Drone,
}

impl AgentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentMode::Default => "default",
            AgentMode::Locobot => "locobot",
            AgentMode::Drone => "drone",
        }
    }

    /// Whether Teleport-family actions accept `standing`
    pub fn supports_standing(&self) -> bool {
        matches!(self, AgentMode::Default)
    }
}

impl fmt::Display for AgentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(AgentMode::Default),
            "locobot" => Ok(AgentMode::Locobot),
            "bot" => {
                warn!("agentMode 'bot' is deprecated, use 'locobot'");
                Ok(AgentMode::Locobot)
            }
            "drone" => Ok(AgentMode::Drone),
            other => Err(format!("unknown agentMode: {other}")),
        }
    }
}

impl TryFrom<String> for AgentMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Handler type on which engine actions are declared
///
/// Every concrete controller resolves through itself, then `Base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentController {
    Base,
    Physics,
    Stochastic,
    Locobot,
    Drone,
}

const TYPE_NAMESPACE: &str = "UnityStandardAssets.Characters.FirstPerson.";

impl AgentController {
    /// Handler type for an agent mode and optional controller type override
    pub fn for_mode(mode: AgentMode, controller_type: Option<&str>) -> Self {
        match mode {
            AgentMode::Default => match controller_type {
                Some(t) if t.eq_ignore_ascii_case("stochastic") => AgentController::Stochastic,
                _ => AgentController::Physics,
            },
            AgentMode::Locobot => AgentController::Locobot,
            AgentMode::Drone => AgentController::Drone,
        }
    }

    /// Resolution chain, most derived first
    pub fn chain(self) -> Vec<AgentController> {
        match self {
            AgentController::Base => vec![AgentController::Base],
            other => vec![other, AgentController::Base],
        }
    }

    /// Engine-side type name
    pub fn type_name(&self) -> String {
        let short = match self {
            AgentController::Base => "BaseFPSAgentController",
            AgentController::Physics => "PhysicsRemoteFPSAgentController",
            AgentController::Stochastic => "StochasticRemoteFPSAgentController",
            AgentController::Locobot => "LocobotFPSAgentController",
            AgentController::Drone => "DroneFPSAgentController",
        };
        format!("{TYPE_NAMESPACE}{short}")
    }
}

impl FromStr for AgentController {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let short = s.strip_prefix(TYPE_NAMESPACE).unwrap_or(s);
        match short.to_ascii_lowercase().as_str() {
            "base" | "basefpsagentcontroller" => Ok(AgentController::Base),
            "physics" | "physicsremotefpsagentcontroller" => Ok(AgentController::Physics),
            "stochastic" | "stochasticremotefpsagentcontroller" => {
                Ok(AgentController::Stochastic)
            }
            "locobot" | "locobotfpsagentcontroller" => Ok(AgentController::Locobot),
            "drone" | "dronefpsagentcontroller" => Ok(AgentController::Drone),
            _ => Err(format!("unknown agent controller type: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_bot_aliases_locobot() {
        assert_eq!("bot".parse::<AgentMode>().unwrap(), AgentMode::Locobot);
        let mode: AgentMode = serde_json::from_str("\"bot\"").unwrap();
        assert_eq!(mode, AgentMode::Locobot);
        assert_eq!(serde_json::to_string(&mode).unwrap(), "\"locobot\"");
    }

    #[test]
    fn test_deserialize_warns_on_bot() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let mode: AgentMode = tracing::subscriber::with_default(subscriber, || {
            serde_json::from_str("\"bot\"").unwrap()
        });
        assert_eq!(mode, AgentMode::Locobot);
        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("agentMode 'bot' is deprecated"), "{logs}");
    }

    #[test]
    fn test_deserialize_matches_parse() {
        let mode: AgentMode = serde_json::from_str("\"Drone\"").unwrap();
        assert_eq!(mode, AgentMode::Drone);
        let err = serde_json::from_str::<AgentMode>("\"hovercraft\"").unwrap_err();
        assert!(err.to_string().contains("unknown agentMode: hovercraft"));
    }

    #[test]
    fn test_controller_for_mode() {
        assert_eq!(
            AgentController::for_mode(AgentMode::Default, None),
            AgentController::Physics
        );
        assert_eq!(
            AgentController::for_mode(AgentMode::Default, Some("stochastic")),
            AgentController::Stochastic
        );
        assert_eq!(
            AgentController::for_mode(AgentMode::Drone, Some("stochastic")),
            AgentController::Drone
        );
    }

    #[test]
    fn test_type_name_parses_back() {
        for controller in [
            AgentController::Base,
            AgentController::Physics,
            AgentController::Stochastic,
            AgentController::Locobot,
            AgentController::Drone,
        ] {
            assert_eq!(
                controller.type_name().parse::<AgentController>().unwrap(),
                controller
            );
        }
        assert_eq!(
            "UnityStandardAssets.Characters.FirstPerson.StochasticRemoteFPSAgentController"
                .parse::<AgentController>()
                .unwrap(),
            AgentController::Stochastic
        );
    }

    #[test]
    fn test_chain_ends_in_base() {
        assert_eq!(
            AgentController::Locobot.chain(),
            vec![AgentController::Locobot, AgentController::Base]
        );
        assert_eq!(AgentController::Base.chain(), vec![AgentController::Base]);
    }
}
