//! `SCRIPT` dispatch evaluator, backed by an embedded `rhai` engine.
//!
//! Grounded on the `ScriptEvaluator` capability named in spec §9: `eval`
//! plus a `prepare`/compile step for caching. The engine instance is cheap
//! to construct per call here; callers that care about script-compile
//! caching can hold a [`rhai::AST`] themselves via [`RhaiScriptEvaluator::compile`].

use crate::error::{Error, Result};
use crate::repository::ServiceStateRepository;
use async_trait::async_trait;
use rhai::{Dynamic, Engine, Scope};
use std::collections::HashMap;
use std::sync::Arc;

/// Bindings handed to a script: the request, its raw body, a mutable
/// `requestContext` scratchpad, and a handle to the per-service state
/// store.
pub struct ScriptBindings {
    pub request: HashMap<String, serde_json::Value>,
    pub body: String,
    pub request_context: HashMap<String, serde_json::Value>,
    pub service_id: String,
    pub store: Arc<dyn ServiceStateRepository>,
}

/// Result of a script evaluation: the stringified return value (the
/// dispatch criterion) plus whatever the script wrote into
/// `requestContext`, which must be threaded through to response rendering.
pub struct ScriptOutcome {
    pub result: String,
    pub request_context: HashMap<String, serde_json::Value>,
}

/// Capability boundary for script evaluation, so the pipeline does not
/// presuppose a specific embedded language (spec §9 design note).
#[async_trait]
pub trait ScriptEvaluator: Send + Sync {
    async fn eval(&self, source: &str, bindings: ScriptBindings) -> Result<ScriptOutcome>;
}

/// `rhai`-backed implementation.
pub struct RhaiScriptEvaluator {
    engine: Engine,
}

impl Default for RhaiScriptEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl RhaiScriptEvaluator {
    pub fn new() -> Self {
        Self {
            engine: Engine::new(),
        }
    }

    /// Pre-compile a script for reuse across requests (the `prepare` half
    /// of the `ScriptEvaluator` capability named in spec §9).
    pub fn compile(&self, source: &str) -> Result<rhai::AST> {
        self.engine
            .compile(source)
            .map_err(|e| Error::DispatchEvaluation(e.to_string()))
    }
}

#[async_trait]
impl ScriptEvaluator for RhaiScriptEvaluator {
    async fn eval(&self, source: &str, bindings: ScriptBindings) -> Result<ScriptOutcome> {
        let mut scope = Scope::new();

        let request_map = to_rhai_map(&bindings.request);
        scope.push("request", request_map);
        scope.push("body", bindings.body.clone());

        let mut request_context_map = rhai::Map::new();
        for (k, v) in &bindings.request_context {
            request_context_map.insert(k.as_str().into(), json_to_dynamic(v));
        }
        scope.push("requestContext", request_context_map);

        // `store` is exposed as a plain map snapshot of current service
        // state; scripts mutate it in-scope and the mutated map is written
        // back after evaluation, matching the read/write atomicity the
        // state repository is responsible for (spec §5).
        let snapshot = bindings.store.snapshot(&bindings.service_id).await;
        let mut store_map = rhai::Map::new();
        for (k, v) in &snapshot {
            store_map.insert(k.as_str().into(), json_to_dynamic(v));
        }
        scope.push("store", store_map);

        let ast = self.compile(source)?;
        let result: Dynamic = self
            .engine
            .eval_ast_with_scope(&mut scope, &ast)
            .map_err(|e| Error::DispatchEvaluation(e.to_string()))?;

        let request_context = scope
            .get_value::<rhai::Map>("requestContext")
            .map(|m| from_rhai_map(&m))
            .unwrap_or_default();

        if let Some(store_after) = scope.get_value::<rhai::Map>("store") {
            let updated = from_rhai_map(&store_after);
            for (k, v) in updated {
                bindings.store.put(&bindings.service_id, &k, v).await;
            }
        }

        // If the script returned a map with a `dispatchCriteria` member,
        // prefer that (spec SPEC_FULL §4.2); otherwise stringify the value.
        let result_str = if let Some(map) = result.clone().try_cast::<rhai::Map>() {
            map.get("dispatchCriteria")
                .map(|d| d.to_string())
                .unwrap_or_else(|| result.to_string())
        } else {
            result.to_string()
        };

        Ok(ScriptOutcome {
            result: result_str,
            request_context,
        })
    }
}

fn to_rhai_map(src: &HashMap<String, serde_json::Value>) -> rhai::Map {
    let mut map = rhai::Map::new();
    for (k, v) in src {
        map.insert(k.as_str().into(), json_to_dynamic(v));
    }
    map
}

fn json_to_dynamic(v: &serde_json::Value) -> Dynamic {
    match v {
        serde_json::Value::Null => Dynamic::UNIT,
        serde_json::Value::Bool(b) => Dynamic::from(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Dynamic::from(i)
            } else {
                Dynamic::from(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => Dynamic::from(s.clone()),
        other => Dynamic::from(other.to_string()),
    }
}

fn dynamic_to_json(v: &Dynamic) -> serde_json::Value {
    if v.is_unit() {
        serde_json::Value::Null
    } else if let Some(b) = v.clone().try_cast::<bool>() {
        serde_json::Value::Bool(b)
    } else if let Some(i) = v.clone().try_cast::<i64>() {
        serde_json::Value::Number(i.into())
    } else if let Some(f) = v.clone().try_cast::<f64>() {
        serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    } else {
        serde_json::Value::String(v.to_string())
    }
}

fn from_rhai_map(map: &rhai::Map) -> HashMap<String, serde_json::Value> {
    map.iter()
        .map(|(k, v)| (k.to_string(), dynamic_to_json(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryServiceStateRepository;

    #[tokio::test]
    async fn script_returns_string_criterion() {
        let evaluator = RhaiScriptEvaluator::new();
        let bindings = ScriptBindings {
            request: HashMap::new(),
            body: "{}".to_string(),
            request_context: HashMap::new(),
            service_id: "svc".to_string(),
            store: Arc::new(InMemoryServiceStateRepository::default()),
        };
        let outcome = evaluator.eval(r#""ok""#, bindings).await.unwrap();
        assert_eq!(outcome.result, "ok");
    }

    #[tokio::test]
    async fn script_publishes_request_context() {
        let evaluator = RhaiScriptEvaluator::new();
        let bindings = ScriptBindings {
            request: HashMap::new(),
            body: "{}".to_string(),
            request_context: HashMap::new(),
            service_id: "svc".to_string(),
            store: Arc::new(InMemoryServiceStateRepository::default()),
        };
        let script = r#"requestContext["greeting"] = "hi"; "criterion""#;
        let outcome = evaluator.eval(script, bindings).await.unwrap();
        assert_eq!(outcome.result, "criterion");
        assert_eq!(
            outcome.request_context.get("greeting").and_then(|v| v.as_str()),
            Some("hi")
        );
    }

    #[tokio::test]
    async fn script_syntax_error_is_an_error() {
        let evaluator = RhaiScriptEvaluator::new();
        let bindings = ScriptBindings {
            request: HashMap::new(),
            body: "{}".to_string(),
            request_context: HashMap::new(),
            service_id: "svc".to_string(),
            store: Arc::new(InMemoryServiceStateRepository::default()),
        };
        assert!(evaluator.eval("this is not rhai (((", bindings).await.is_err());
    }
}
