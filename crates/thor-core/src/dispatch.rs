//! Action dispatch: resolving an action name and parameters to one signature
//!
//! The engine overloads action names freely: a handler type may declare
//! several explicit-parameter variants of the same action, a ServerAction
//! style variant taking one aggregate object, and base types contribute
//! variants of their own. Resolution is a pure function of
//! (handler type, action name, supplied keys) over an explicit registry.

use crate::action::Params;
use crate::agent::AgentController;
use crate::error::ErrorCode;
use crate::signature::{ActionSignature, SignatureStyle, value_kind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;

/// Why more than one signature matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbiguityKind {
    /// Two explicit overloads on the same handler type both match
    SameClass,
    /// An aggregate-object method and an explicit overload both match
    MixedServerAction,
}

impl fmt::Display for AmbiguityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmbiguityKind::SameClass => f.write_str("Signature match found in the same class"),
            AmbiguityKind::MixedServerAction => f.write_str(
                "Mixing a ServerAction method with overloaded methods is not permitted",
            ),
        }
    }
}

/// Resolution failures. Message formats are stable; callers match on them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Invalid action: {action}")]
    InvalidAction { action: String },

    #[error("action: {action} is missing the following arguments: {}", .missing.join(","))]
    MissingArguments {
        action: String,
        missing: Vec<String>,
    },

    #[error("Ambiguous action: {action} {kind}")]
    Ambiguous { action: String, kind: AmbiguityKind },

    #[error("action: {action} has an invalid argument: {argument} ({detail})")]
    InvalidArgument {
        action: String,
        argument: String,
        detail: String,
    },
}

impl DispatchError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            DispatchError::InvalidAction { .. } => ErrorCode::InvalidAction,
            DispatchError::MissingArguments { .. } => ErrorCode::MissingArguments,
            DispatchError::Ambiguous { .. } => ErrorCode::AmbiguousAction,
            DispatchError::InvalidArgument { .. } => ErrorCode::InvalidArgument,
        }
    }
}

/// Outcome of a successful resolution
#[derive(Debug, Clone)]
pub struct Resolved<'a> {
    pub signature: &'a ActionSignature,
    pub declared_on: AgentController,
    /// Supplied values plus declared defaults, in declaration order
    pub arguments: Params,
}

#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    signature: &'a ActionSignature,
    declared_on: AgentController,
}

impl Candidate<'_> {
    fn recognizes(&self, supplied: &BTreeSet<&str>) -> bool {
        let names = self.signature.param_names();
        supplied.iter().all(|key| names.contains(key))
    }

    fn matches(&self, supplied: &BTreeSet<&str>) -> bool {
        self.recognizes(supplied)
            && self
                .signature
                .required_names()
                .iter()
                .all(|name| supplied.contains(name))
    }

    fn missing(&self, supplied: &BTreeSet<&str>) -> Vec<String> {
        self.signature
            .required_names()
            .into_iter()
            .filter(|name| !supplied.contains(name))
            .map(str::to_string)
            .collect()
    }

    fn unrecognized<'s>(&self, supplied: &BTreeSet<&'s str>) -> Vec<&'s str> {
        let names = self.signature.param_names();
        supplied
            .iter()
            .copied()
            .filter(|key| !names.contains(key))
            .collect()
    }
}

/// Whether some key set satisfies both signatures at once
fn overlaps(a: &ActionSignature, b: &ActionSignature) -> bool {
    let a_names = a.param_names();
    let b_names = b.param_names();
    a.required_names()
        .union(&b.required_names())
        .all(|name| a_names.contains(name) && b_names.contains(name))
}

/// Registry of action signatures per handler type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionRegistry {
    signatures: HashMap<AgentController, Vec<ActionSignature>>,
}

impl ActionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry from its JSON form: `{"Physics": [signature, ...], ...}`
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Declare a signature on a handler type
    pub fn register(&mut self, controller: AgentController, signature: ActionSignature) {
        self.signatures.entry(controller).or_default().push(signature);
    }

    /// Declare every signature of `other` on top of this registry
    pub fn extend(&mut self, other: ActionRegistry) {
        for (controller, signatures) in other.signatures {
            self.signatures
                .entry(controller)
                .or_default()
                .extend(signatures);
        }
    }

    /// Action names visible to a handler type
    pub fn actions(&self, controller: AgentController) -> BTreeSet<&str> {
        controller
            .chain()
            .into_iter()
            .filter_map(|class| self.signatures.get(&class))
            .flatten()
            .map(|sig| sig.name.as_str())
            .collect()
    }

    /// Number of declared signatures across all handler types
    pub fn len(&self) -> usize {
        self.signatures.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn candidates(&self, controller: AgentController, action: &str) -> Vec<Candidate<'_>> {
        let mut out: Vec<Candidate<'_>> = Vec::new();
        for class in controller.chain() {
            let Some(signatures) = self.signatures.get(&class) else {
                continue;
            };
            for signature in signatures.iter().filter(|sig| sig.name == action) {
                // A derived override hides the base declaration with the same shape
                let names = signature.param_names();
                let shadowed = out.iter().any(|c| {
                    c.declared_on != class
                        && c.signature.style == signature.style
                        && c.signature.param_names() == names
                });
                if !shadowed {
                    out.push(Candidate {
                        signature,
                        declared_on: class,
                    });
                }
            }
        }
        out
    }

    /// Resolve an action for a handler type
    pub fn resolve(
        &self,
        controller: AgentController,
        action: &str,
        params: &Params,
    ) -> Result<Resolved<'_>, DispatchError> {
        let candidates = self.candidates(controller, action);
        if candidates.is_empty() {
            return Err(DispatchError::InvalidAction {
                action: action.to_string(),
            });
        }

        let supplied: BTreeSet<&str> = params.keys().map(String::as_str).collect();
        let matches: Vec<Candidate<'_>> = candidates
            .iter()
            .copied()
            .filter(|c| c.matches(&supplied))
            .collect();

        if matches.is_empty() {
            return Err(mismatch_error(action, &candidates, &supplied));
        }

        let has_aggregate = matches
            .iter()
            .any(|c| c.signature.style == SignatureStyle::Aggregate);
        let has_explicit = matches
            .iter()
            .any(|c| c.signature.style == SignatureStyle::Explicit);
        if has_aggregate && has_explicit {
            return Err(DispatchError::Ambiguous {
                action: action.to_string(),
                kind: AmbiguityKind::MixedServerAction,
            });
        }

        // Candidates are ordered most derived first
        let winner_class = matches[0].declared_on;
        let winners: Vec<Candidate<'_>> = matches
            .into_iter()
            .filter(|c| c.declared_on == winner_class)
            .collect();
        if winners.len() > 1 {
            return Err(DispatchError::Ambiguous {
                action: action.to_string(),
                kind: AmbiguityKind::SameClass,
            });
        }

        bind(action, winners[0], params)
    }

    /// Action names whose overloads can match the same key set
    ///
    /// Static validation: an action is reported when an aggregate-object
    /// method coexists with explicit overloads, or when two signatures on
    /// the same handler type admit a common set of supplied keys.
    pub fn find_ambiguous(&self, controller: AgentController) -> Vec<String> {
        let mut ambiguous = Vec::new();
        for action in self.actions(controller) {
            let candidates = self.candidates(controller, action);
            let has_aggregate = candidates
                .iter()
                .any(|c| c.signature.style == SignatureStyle::Aggregate);
            let has_explicit = candidates
                .iter()
                .any(|c| c.signature.style == SignatureStyle::Explicit);

            let same_class_overlap = candidates.iter().enumerate().any(|(i, a)| {
                candidates[i + 1..].iter().any(|b| {
                    a.declared_on == b.declared_on && overlaps(a.signature, b.signature)
                })
            });

            if (has_aggregate && has_explicit) || same_class_overlap {
                ambiguous.push(action.to_string());
            }
        }
        ambiguous
    }

    /// Parameter names declared with differing type or requiredness across overloads
    pub fn find_conflicts(&self, controller: AgentController) -> BTreeMap<String, Vec<String>> {
        let mut conflicts = BTreeMap::new();
        for action in self.actions(controller) {
            let mut shapes: BTreeMap<&str, Vec<(String, bool)>> = BTreeMap::new();
            for candidate in self.candidates(controller, action) {
                for param in &candidate.signature.params {
                    let shape = (param.kind.to_string(), param.is_required());
                    let seen = shapes.entry(param.name.as_str()).or_default();
                    if !seen.contains(&shape) {
                        seen.push(shape);
                    }
                }
            }

            let conflicting: Vec<String> = shapes
                .into_iter()
                .filter(|(_, seen)| seen.len() > 1)
                .map(|(name, _)| name.to_string())
                .collect();
            if !conflicting.is_empty() {
                conflicts.insert(action.to_string(), conflicting);
            }
        }
        conflicts
    }
}

fn mismatch_error(
    action: &str,
    candidates: &[Candidate<'_>],
    supplied: &BTreeSet<&str>,
) -> DispatchError {
    let closest_missing = candidates
        .iter()
        .filter(|c| c.recognizes(supplied))
        .min_by_key(|c| c.missing(supplied).len());

    if let Some(candidate) = closest_missing {
        return DispatchError::MissingArguments {
            action: action.to_string(),
            missing: candidate.missing(supplied),
        };
    }

    let argument = candidates
        .iter()
        .map(|c| c.unrecognized(supplied))
        .min_by_key(Vec::len)
        .and_then(|keys| keys.first().map(|k| k.to_string()))
        .unwrap_or_default();

    DispatchError::InvalidArgument {
        action: action.to_string(),
        argument,
        detail: "not accepted by any signature".into(),
    }
}

fn bind<'a>(
    action: &str,
    candidate: Candidate<'a>,
    params: &Params,
) -> Result<Resolved<'a>, DispatchError> {
    let mut arguments = Params::new();
    for spec in &candidate.signature.params {
        match params.get(&spec.name) {
            Some(value) => {
                if !spec.accepts(value) {
                    return Err(DispatchError::InvalidArgument {
                        action: action.to_string(),
                        argument: spec.name.clone(),
                        detail: format!("expected {}, got {}", spec.kind, value_kind(value)),
                    });
                }
                arguments.insert(spec.name.clone(), value.clone());
            }
            None => {
                if let Some(default) = &spec.default {
                    arguments.insert(spec.name.clone(), default.clone());
                }
            }
        }
    }

    Ok(Resolved {
        signature: candidate.signature,
        declared_on: candidate.declared_on,
        arguments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{ParamSpec, ParamType};
    use serde_json::json;

    fn params(value: serde_json::Value) -> Params {
        value.as_object().cloned().unwrap_or_default()
    }

    fn registry() -> ActionRegistry {
        let mut registry = ActionRegistry::new();
        registry.register(
            AgentController::Base,
            ActionSignature::explicit("Noop", vec![]),
        );
        registry.register(
            AgentController::Base,
            ActionSignature::explicit(
                "Noop",
                vec![ParamSpec::required("param1", ParamType::Bool)],
            ),
        );
        registry.register(
            AgentController::Base,
            ActionSignature::explicit(
                "Noop",
                vec![
                    ParamSpec::required("param6", ParamType::String),
                    ParamSpec::required("param7", ParamType::String),
                ],
            ),
        );
        registry.register(
            AgentController::Base,
            ActionSignature::explicit(
                "Pair",
                vec![ParamSpec::optional("a", ParamType::String, "x")],
            ),
        );
        registry.register(
            AgentController::Base,
            ActionSignature::explicit(
                "Pair",
                vec![ParamSpec::optional("b", ParamType::Bool, true)],
            ),
        );
        registry.register(
            AgentController::Base,
            ActionSignature::aggregate(
                "Mixed",
                vec![ParamSpec::nullable("objectId", ParamType::String)],
            ),
        );
        registry.register(
            AgentController::Base,
            ActionSignature::explicit(
                "Mixed",
                vec![ParamSpec::optional("count", ParamType::Int, 0)],
            ),
        );
        registry.register(
            AgentController::Base,
            ActionSignature::explicit(
                "Move",
                vec![ParamSpec::optional("distance", ParamType::Float, 0.25)],
            ),
        );
        registry.register(
            AgentController::Physics,
            ActionSignature::explicit(
                "Move",
                vec![ParamSpec::optional("distance", ParamType::Float, 0.5)],
            ),
        );
        registry
    }

    #[test]
    fn test_unknown_action() {
        let err = registry()
            .resolve(AgentController::Physics, "NoopFoo", &Params::new())
            .unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InvalidAction);
        assert_eq!(err.to_string(), "Invalid action: NoopFoo");
    }

    #[test]
    fn test_overload_selection() {
        let registry = registry();
        let empty = registry
            .resolve(AgentController::Physics, "Noop", &Params::new())
            .unwrap();
        assert!(empty.signature.params.is_empty());

        let one = registry
            .resolve(AgentController::Physics, "Noop", &params(json!({"param1": true})))
            .unwrap();
        assert_eq!(one.signature.params.len(), 1);
    }

    #[test]
    fn test_missing_arguments() {
        let err = registry()
            .resolve(AgentController::Physics, "Noop", &params(json!({"param6": "foo"})))
            .unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::MissingArguments);
        assert_eq!(
            err.to_string(),
            "action: Noop is missing the following arguments: param7"
        );
    }

    #[test]
    fn test_unrecognized_argument() {
        let err = registry()
            .resolve(AgentController::Physics, "Noop", &params(json!({"bogus": 1})))
            .unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InvalidArgument);
        assert!(err
            .to_string()
            .starts_with("action: Noop has an invalid argument: bogus"));
    }

    #[test]
    fn test_same_class_ambiguity() {
        let err = registry()
            .resolve(AgentController::Physics, "Pair", &Params::new())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Ambiguous action: Pair Signature match found in the same class"
        );
        assert_eq!(err.error_code(), ErrorCode::AmbiguousAction);
    }

    #[test]
    fn test_mixed_ambiguity() {
        let err = registry()
            .resolve(AgentController::Physics, "Mixed", &Params::new())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Ambiguous action: Mixed Mixing a ServerAction method with overloaded methods is not permitted"
        );

        // Only the aggregate accepts objectId, so this one is not ambiguous
        let reg = registry();
        let resolved = reg
            .resolve(AgentController::Physics, "Mixed", &params(json!({"objectId": "a|1"})))
            .unwrap();
        assert_eq!(resolved.signature.style, SignatureStyle::Aggregate);
    }

    #[test]
    fn test_derived_override_shadows_base() {
        let reg = registry();
        let resolved = reg
            .resolve(AgentController::Physics, "Move", &Params::new())
            .unwrap();
        assert_eq!(resolved.declared_on, AgentController::Physics);
        assert_eq!(resolved.arguments["distance"], 0.5);

        let base = reg
            .resolve(AgentController::Locobot, "Move", &Params::new())
            .unwrap();
        assert_eq!(base.arguments["distance"], 0.25);
    }

    #[test]
    fn test_type_mismatch_names_parameter() {
        let err = registry()
            .resolve(AgentController::Physics, "Noop", &params(json!({"param1": "yes"})))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "action: Noop has an invalid argument: param1 (expected bool, got string)"
        );
    }

    #[test]
    fn test_static_ambiguity_scan() {
        let ambiguous = registry().find_ambiguous(AgentController::Physics);
        assert_eq!(ambiguous, vec!["Mixed".to_string(), "Pair".to_string()]);
    }

    #[test]
    fn test_conflict_scan() {
        let mut registry = registry();
        registry.register(
            AgentController::Base,
            ActionSignature::explicit(
                "Conflict",
                vec![
                    ParamSpec::required("param22", ParamType::String),
                    ParamSpec::required("param23", ParamType::String),
                ],
            ),
        );
        registry.register(
            AgentController::Base,
            ActionSignature::explicit(
                "Conflict",
                vec![ParamSpec::required("param22", ParamType::Bool)],
            ),
        );

        let conflicts = registry.find_conflicts(AgentController::Stochastic);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts["Conflict"], vec!["param22".to_string()]);
    }

    #[test]
    fn test_registry_json_roundtrip() {
        let registry = registry();
        let json = serde_json::to_string(&registry).unwrap();
        let loaded = ActionRegistry::from_json(&json).unwrap();
        assert_eq!(loaded.len(), registry.len());
        assert!(loaded.actions(AgentController::Drone).contains("Noop"));
    }
}
