//! Dispatch evaluators: reduce a request to a deterministic `dispatchCriteria`
//! string, one strategy per [`crate::model::Dispatcher`] variant.

mod json_body;
pub mod script;

pub use script::{ScriptBindings, ScriptEvaluator, ScriptOutcome};

use crate::model::{DispatchContext, Dispatcher};
use crate::uri;
use std::collections::HashMap;
use std::sync::Arc;

/// Inputs available to a dispatch evaluator. Not every evaluator needs all
/// of them; `SCRIPT` is the only one that reads `body`/`store`.
pub struct DispatchInput<'a> {
    pub pattern: &'a str,
    pub concrete_path: &'a str,
    pub full_uri: &'a str,
    pub body: &'a str,
    pub request_map: HashMap<String, serde_json::Value>,
    pub service_id: &'a str,
    pub store: Arc<dyn crate::repository::ServiceStateRepository>,
}

/// Evaluate `dispatcher`/`rules` against `input`, producing a
/// [`DispatchContext`]. Returns a context with a `None` criterion both when
/// there is no dispatcher and when evaluation fails — failures are logged
/// here and swallowed, per spec §4.2/§7.
pub async fn evaluate(
    dispatcher: &Dispatcher,
    rules: Option<&str>,
    input: DispatchInput<'_>,
) -> DispatchContext {
    let rules = rules.unwrap_or("");
    match dispatcher {
        Dispatcher::Sequence | Dispatcher::UriParts => DispatchContext {
            dispatch_criteria: Some(uri::extract_from_uri_pattern(
                rules,
                input.pattern,
                input.concrete_path,
            )),
            request_context: HashMap::new(),
        },
        Dispatcher::UriParams => DispatchContext {
            dispatch_criteria: Some(uri::extract_from_uri_params(rules, input.full_uri)),
            request_context: HashMap::new(),
        },
        Dispatcher::UriElements => {
            let pattern_part = uri::extract_from_uri_pattern(rules, input.pattern, input.concrete_path);
            let params_part = uri::extract_from_uri_params(rules, input.full_uri);
            DispatchContext {
                dispatch_criteria: Some(format!("{pattern_part}{params_part}")),
                request_context: HashMap::new(),
            }
        }
        Dispatcher::JsonBody => match json_body::evaluate(rules, input.body) {
            Ok(name) => DispatchContext {
                dispatch_criteria: Some(name),
                request_context: HashMap::new(),
            },
            Err(e) => {
                tracing::error!(error = %e, "JSON_BODY dispatch evaluation failed");
                DispatchContext::default()
            }
        },
        Dispatcher::Script => {
            let evaluator = script::RhaiScriptEvaluator::new();
            let bindings = ScriptBindings {
                request: input.request_map,
                body: input.body.to_string(),
                request_context: HashMap::new(),
                service_id: input.service_id.to_string(),
                store: input.store,
            };
            match evaluator.eval(rules, bindings).await {
                Ok(outcome) => DispatchContext {
                    dispatch_criteria: Some(outcome.result),
                    request_context: outcome.request_context,
                },
                Err(e) => {
                    tracing::error!(error = %e, "SCRIPT dispatch evaluation failed");
                    DispatchContext::default()
                }
            }
        }
        Dispatcher::Proxy | Dispatcher::Unknown(_) => DispatchContext::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryServiceStateRepository;

    fn input<'a>(pattern: &'a str, path: &'a str, uri: &'a str, body: &'a str) -> DispatchInput<'a> {
        DispatchInput {
            pattern,
            concrete_path: path,
            full_uri: uri,
            body,
            request_map: HashMap::new(),
            service_id: "svc-1",
            store: Arc::new(InMemoryServiceStateRepository::default()),
        }
    }

    #[tokio::test]
    async fn sequence_dispatch_builds_criteria() {
        let ctx = evaluate(
            &Dispatcher::Sequence,
            Some("id"),
            input("/pets/{id}", "/pets/1", "/pets/1", ""),
        )
        .await;
        assert_eq!(ctx.dispatch_criteria.as_deref(), Some("?id=1"));
    }

    #[tokio::test]
    async fn uri_elements_concatenates_pattern_then_params() {
        let ctx = evaluate(
            &Dispatcher::UriElements,
            Some("id,status"),
            input("/pets/{id}", "/pets/1", "/pets/1?status=ok", ""),
        )
        .await;
        assert_eq!(ctx.dispatch_criteria.as_deref(), Some("?id=1?status=ok"));
    }

    #[tokio::test]
    async fn unknown_dispatcher_yields_null_criteria() {
        let ctx = evaluate(
            &Dispatcher::Unknown("WHATEVER".to_string()),
            None,
            input("/pets/{id}", "/pets/1", "/pets/1", ""),
        )
        .await;
        assert!(ctx.dispatch_criteria.is_none());
    }
}
