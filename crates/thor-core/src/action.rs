//! Action requests sent to the engine

use crate::error::{Result, ThorError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Named action parameters
pub type Params = serde_json::Map<String, Value>;

/// Correlation key attached to the wire copy of every request
pub const SEQUENCE_ID_KEY: &str = "sequenceId";

/// Agent addressing key; routed in the envelope, never matched against signatures
pub const AGENT_ID_KEY: &str = "agentId";

/// An action to execute in the simulation
///
/// Serialized flat: `{"action": "OpenObject", "objectId": "Fridge|1|2|3"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Action name
    pub action: String,
    /// All other fields are parameters
    #[serde(flatten, default)]
    pub params: Params,
}

impl ActionRequest {
    /// Create a request with no parameters
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            params: Params::new(),
        }
    }

    /// Add a parameter (builder style)
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Build a request from a `{"action": ..., ...}` object
    pub fn from_value(value: Value) -> Result<Self> {
        let request: ActionRequest = serde_json::from_value(value)?;
        if request.action.is_empty() {
            return Err(ThorError::Protocol("action name must not be empty".into()));
        }
        Ok(request)
    }

    /// Copy of this request with keyword overrides merged in
    pub fn merged(&self, extra: Params) -> Self {
        let mut merged = self.clone();
        merged.params.extend(extra);
        merged
    }

    /// Remove the agent addressing key, returning the addressed agent
    pub fn take_agent_id(&mut self) -> Result<Option<usize>> {
        match self.params.remove(AGENT_ID_KEY) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_u64()
                .map(|id| Some(id as usize))
                .ok_or_else(|| {
                    ThorError::Protocol(format!("agentId must be a non-negative integer, got {value}"))
                }),
        }
    }

    /// Rewrite deprecated parameter spellings in place
    ///
    /// `OpenObject(moveMagnitude)` predates `openness`. A magnitude of 0 used
    /// to mean "fully open", so it maps to `openness = 1`; every other
    /// magnitude is taken as the openness itself.
    pub fn normalize_legacy(&mut self) {
        if self.action != "OpenObject" {
            return;
        }
        let Some(magnitude) = self.params.remove("moveMagnitude") else {
            return;
        };
        warn!("OpenObject(moveMagnitude) is deprecated, use openness instead");
        if self.params.contains_key("openness") {
            return;
        }
        let openness = match magnitude.as_f64() {
            Some(m) if m == 0.0 => Value::from(1.0),
            _ => magnitude,
        };
        self.params.insert("openness".into(), openness);
    }

    /// Wire copy carrying the correlation and addressing keys
    pub fn to_wire(&self, sequence_id: u64, agent_id: usize) -> Value {
        let mut body = self.params.clone();
        body.insert("action".into(), Value::String(self.action.clone()));
        body.insert(SEQUENCE_ID_KEY.into(), Value::from(sequence_id));
        body.insert(AGENT_ID_KEY.into(), Value::from(agent_id));
        Value::Object(body)
    }
}

impl From<&str> for ActionRequest {
    fn from(action: &str) -> Self {
        ActionRequest::new(action)
    }
}

impl TryFrom<Value> for ActionRequest {
    type Error = ThorError;

    fn try_from(value: Value) -> Result<Self> {
        ActionRequest::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_params() {
        let json = r#"{"action": "RotateLook", "rotation": 90, "horizon": 30}"#;
        let request: ActionRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.action, "RotateLook");
        assert_eq!(request.params.get("rotation").unwrap(), 90);
        assert_eq!(request.params.get("horizon").unwrap(), 30);

        let serialized = serde_json::to_string(&request).unwrap();
        assert!(serialized.contains("\"action\":\"RotateLook\""));
        assert!(!serialized.contains("\"params\""));
    }

    #[test]
    fn test_wire_copy_leaves_request_untouched() {
        let request = ActionRequest::new("RotateLook")
            .param("rotation", 0)
            .param("horizon", 0);
        let wire = request.to_wire(7, 0);

        assert_eq!(wire["sequenceId"], 7);
        assert_eq!(wire["action"], "RotateLook");
        assert!(!request.params.contains_key(SEQUENCE_ID_KEY));
    }

    #[test]
    fn test_merged_overrides() {
        let base = ActionRequest::from_value(json!({"action": "Teleport", "horizon": 0})).unwrap();
        let mut extra = Params::new();
        extra.insert("horizon".into(), json!(10));
        extra.insert("standing".into(), json!(true));

        let merged = base.merged(extra);
        assert_eq!(merged.params["horizon"], 10);
        assert_eq!(merged.params["standing"], true);
        assert_eq!(base.params["horizon"], 0);
    }

    #[test]
    fn test_missing_action_name_rejected() {
        assert!(ActionRequest::from_value(json!({"rotation": 0})).is_err());
        assert!(ActionRequest::from_value(json!({"action": ""})).is_err());
    }

    #[test]
    fn test_move_magnitude_zero_means_fully_open() {
        let mut request = ActionRequest::new("OpenObject")
            .param("objectId", "Fridge|1")
            .param("moveMagnitude", 0);
        request.normalize_legacy();

        assert_eq!(request.params["openness"], 1.0);
        assert!(!request.params.contains_key("moveMagnitude"));
    }

    #[test]
    fn test_move_magnitude_passthrough() {
        let mut request = ActionRequest::new("OpenObject").param("moveMagnitude", 0.65);
        request.normalize_legacy();
        assert_eq!(request.params["openness"], 0.65);

        let mut other = ActionRequest::new("MoveAhead").param("moveMagnitude", 0.0);
        other.normalize_legacy();
        assert_eq!(other.params["moveMagnitude"], 0.0);
    }

    #[test]
    fn test_take_agent_id() {
        let mut request = ActionRequest::new("Pass").param("agentId", 1);
        assert_eq!(request.take_agent_id().unwrap(), Some(1));
        assert!(request.params.is_empty());

        let mut bad = ActionRequest::new("Pass").param("agentId", "one");
        assert!(bad.take_agent_id().is_err());
    }
}
