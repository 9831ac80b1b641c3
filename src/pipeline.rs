//! Pipeline orchestrator (spec §4.9): the HTTP entry point that sequences
//! operation resolution, constraint validation, dispatch, response
//! selection, proxy decision, rendering, delay, and telemetry.

use crate::config::Config;
use crate::constraints::{self, ConstraintInput};
use crate::delay;
use crate::dispatch::{self, DispatchInput};
use crate::model::Method;
use crate::operation;
use crate::proxy::{self, ProxyClient};
use crate::render::{self, RenderedResponse, RequestOrigin, TemplateEngine};
use crate::repository::{ResponseRepository, ServiceRepository, ServiceStateRepository};
use crate::response_selector;
use crate::telemetry::{self, InvocationEvent, TelemetrySink};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything one incoming request needs, transport-agnostic.
pub struct IncomingRequest {
    pub method: Method,
    pub service_name: String,
    pub service_version: String,
    /// The sub-path after `/rest/{service}/{version}`, percent-decoded.
    pub resource_path: String,
    /// Same sub-path, still percent-encoded, used for literal comparisons
    /// in operation resolution (spec §9 asymmetry).
    pub resource_path_raw: String,
    /// The full request-target including its raw query string.
    pub full_uri: String,
    pub body: String,
    pub headers: HashMap<String, Vec<String>>,
    pub query_params: HashMap<String, Vec<String>>,
    pub delay_override: Option<u64>,
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub context_path: String,
}

/// The outcome of running the pipeline: transport-agnostic status/headers/body.
pub struct PipelineResponse {
    pub status: u16,
    pub headers: Vec<(String, Vec<String>)>,
    pub body: Option<Vec<u8>>,
}

impl PipelineResponse {
    fn empty(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: None,
        }
    }

    fn text(status: u16, message: String) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), vec!["text/plain".to_string()])],
            body: Some(message.into_bytes()),
        }
    }
}

/// Shared engine state, cheap to clone (everything behind an `Arc`) and
/// safe for concurrent use across requests, per spec §5.
#[derive(Clone)]
pub struct Engine {
    pub services: Arc<dyn ServiceRepository>,
    pub responses: Arc<dyn ResponseRepository>,
    pub state_store: Arc<dyn ServiceStateRepository>,
    pub template_engine: Arc<dyn TemplateEngine>,
    pub proxy_client: Arc<dyn ProxyClient>,
    pub telemetry: Arc<dyn TelemetrySink>,
    pub config: Arc<Config>,
}

impl Engine {
    /// Run the full dispatch pipeline for one request.
    pub async fn dispatch(
        &self,
        request: IncomingRequest,
        cancellation: &CancellationToken,
    ) -> PipelineResponse {
        let (start, started_at) = telemetry::record_start();

        let service_name = request.service_name.replace('+', " ");
        let span = tracing::info_span!(
            "dispatch",
            service = %service_name,
            version = %request.service_version,
            method = request.method.name(),
            path = %request.resource_path_raw,
            request_id = tracing::field::Empty,
        );
        let _enter = span.enter();

        // CORS pre-flight is synthesized ahead of any service/operation
        // lookup (spec §8 scenario 4: `OPTIONS /rest/Unknown/0/x` against a
        // service that does not exist still gets a 204, not a 404) — an
        // `OPTIONS` request is never itself a real operation invocation.
        if self.config.enable_cors_policy && request.method == Method::Options {
            return self.cors_preflight(&request);
        }

        let Some(service) = self
            .services
            .find_by_name_and_version(&service_name, &request.service_version)
            .await
        else {
            return PipelineResponse::text(
                404,
                format!(
                    "The service {} with version {} does not exist!",
                    service_name, request.service_version
                ),
            );
        };

        let Some(operation) = operation::resolve(&service, request.method, &request.resource_path_raw)
        else {
            return PipelineResponse::empty(404);
        };

        let pattern = operation.uri_pattern();
        let path_variables = crate::uri::path_variables(pattern, &request.resource_path);

        let constraint_input = ConstraintInput {
            headers: &request.headers,
            query_params: &request.query_params,
            path_variables: &path_variables,
        };
        if let Some(violation) = constraints::validate(&operation.parameter_constraints, &constraint_input)
        {
            return PipelineResponse::text(400, format!("{violation}. Check parameter constraints."));
        }

        let operation_id = format!("{}-{}", service.id, operation.name);
        let dispatcher = crate::model::Dispatcher::parse(operation.dispatcher.as_deref().unwrap_or(""));

        let request_map = build_request_map(&request);
        let dispatch_ctx = dispatch::evaluate(
            &dispatcher,
            operation.dispatcher_rules.as_deref(),
            DispatchInput {
                pattern,
                concrete_path: &request.resource_path,
                full_uri: &request.full_uri,
                body: &request.body,
                request_map,
                service_id: &service.id,
                store: self.state_store.clone(),
            },
        )
        .await;

        let accept = request
            .headers
            .get("Accept")
            .and_then(|v| v.first())
            .map(String::as_str);

        let mut selected = response_selector::select(
            self.responses.as_ref(),
            &operation_id,
            dispatch_ctx.dispatch_criteria.as_deref(),
            operation.fallback.as_ref(),
            accept,
        )
        .await;

        if selected.is_none() && operation.dispatcher.is_none() {
            let candidates = self.responses.find_by_operation_id(&operation_id).await;
            selected = response_selector::negotiate(candidates, accept);
        }

        let proxy_url = proxy::decide_proxy_url(
            operation.dispatcher.as_deref(),
            operation.dispatcher_rules.as_deref(),
            &request.resource_path_raw,
            operation.proxy_fallback.as_ref(),
            selected.as_ref(),
        );

        if let Some(url) = proxy_url {
            return self.proxy(&url, &request).await;
        }

        let Some(response) = selected else {
            return match dispatch_ctx.dispatch_criteria {
                Some(criteria) if operation.dispatcher.is_some() => {
                    PipelineResponse::text(400, format!("The response {criteria} does not exist!"))
                }
                None if operation.dispatcher.is_some() => {
                    PipelineResponse::text(400, "The response null does not exist!".to_string())
                }
                _ => PipelineResponse::empty(400),
            };
        };

        let origin = RequestOrigin {
            scheme: request.scheme.clone(),
            host: request.host.clone(),
            port: request.port,
            context_path: request.context_path.clone(),
        };
        let evaluable = render::build_evaluable_request(
            request.body.clone(),
            request.resource_path.clone(),
            request.method.name().to_string(),
            request.headers.clone(),
            request.query_params.clone(),
            pattern,
            &origin,
        );

        let rendered: RenderedResponse = render::render(
            self.template_engine.as_ref(),
            operation,
            &response,
            &evaluable,
            &dispatch_ctx.request_context,
            &origin,
            &service.name,
            &service.version,
        );

        let mut headers = rendered.headers;
        if self.config.enable_cors_policy {
            headers.push((
                "Access-Control-Allow-Origin".to_string(),
                vec![self.config.cors_allowed_origins.clone()],
            ));
            headers.push(("Vary".to_string(), vec!["Accept-Encoding, Origin".to_string()]));
        }

        delay::enforce(
            start,
            delay::effective_delay_ms(request.delay_override, operation.default_delay),
            cancellation,
        )
        .await;

        if self.config.enable_invocation_stats {
            let extracted_id =
                telemetry::extract_id(operation.id_path.as_deref(), &request.body, &request.resource_path);
            if let Some(id) = extracted_id.as_deref() {
                span.record("request_id", id);
            }
            self.telemetry
                .publish(InvocationEvent {
                    service_id: service.id.clone(),
                    service_name: service.name.clone(),
                    operation_name: operation.name.clone(),
                    response_name: response.name.clone(),
                    status: response.status.unwrap_or(200),
                    request_id: extracted_id.clone(),
                    start_time: started_at,
                    elapsed: start.elapsed(),
                    extracted_id,
                })
                .await;
        }

        PipelineResponse {
            status: response.status.unwrap_or(200),
            headers,
            body: rendered.body,
        }
    }

    fn cors_preflight(&self, request: &IncomingRequest) -> PipelineResponse {
        let requested: Vec<String> = request
            .headers
            .get("Access-Control-Request-Headers")
            .cloned()
            .unwrap_or_default();
        let cors = crate::cors::preflight_headers(&self.config, &requested);
        let mut headers = vec![
            ("Access-Control-Allow-Origin".to_string(), vec![cors.allow_origin]),
            (
                "Access-Control-Allow-Methods".to_string(),
                vec![cors.allow_methods.to_string()],
            ),
            ("Access-Allow-Credentials".to_string(), vec![cors.allow_credentials]),
            ("Access-Control-Max-Age".to_string(), vec![cors.max_age.to_string()]),
            ("Vary".to_string(), vec![cors.vary.to_string()]),
        ];
        if let Some(allow) = cors.allow_headers {
            headers.push(("Access-Control-Allow-Headers".to_string(), vec![allow]));
        }
        if let Some(expose) = cors.expose_headers {
            headers.push(("Access-Control-Expose-Headers".to_string(), vec![expose]));
        }
        PipelineResponse {
            status: 204,
            headers,
            body: None,
        }
    }

    async fn proxy(&self, url: &str, request: &IncomingRequest) -> PipelineResponse {
        let method = http::Method::from_bytes(request.method.name().as_bytes())
            .unwrap_or(http::Method::GET);
        let mut header_map = http::HeaderMap::new();
        for (name, values) in &request.headers {
            if let Ok(header_name) = http::HeaderName::from_bytes(name.as_bytes()) {
                for value in values {
                    if let Ok(header_value) = http::HeaderValue::from_str(value) {
                        header_map.append(&header_name, header_value);
                    }
                }
            }
        }

        match self
            .proxy_client
            .call_external(url, &method, &header_map, request.body.as_bytes())
            .await
        {
            Ok(proxied) => PipelineResponse {
                status: proxied.status,
                headers: proxied
                    .headers
                    .into_iter()
                    .map(|(k, v)| (k, vec![v]))
                    .collect(),
                body: if proxied.body.is_empty() {
                    None
                } else {
                    Some(proxied.body)
                },
            },
            Err(e) => {
                tracing::error!(error = %e, url, "proxy call failed");
                PipelineResponse::empty(502)
            }
        }
    }
}

fn build_request_map(request: &IncomingRequest) -> HashMap<String, serde_json::Value> {
    let mut map = HashMap::new();
    map.insert("method".to_string(), serde_json::json!(request.method.name()));
    map.insert("path".to_string(), serde_json::json!(request.resource_path));
    map.insert(
        "headers".to_string(),
        serde_json::to_value(&request.headers).unwrap_or_default(),
    );
    map.insert(
        "queryParams".to_string(),
        serde_json::to_value(&request.query_params).unwrap_or_default(),
    );
    map
}
