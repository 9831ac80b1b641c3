//! HTTP transport: an `axum` `Router` mounted at `/rest/{service}/{version}/**`,
//! wiring transport concerns (path/query parsing, header collection, body
//! buffering) into the transport-agnostic [`crate::pipeline::Engine`].
//!
//! Grounded on the teacher's `server/streamable_http_server.rs` Router /
//! `State` wiring.

use crate::model::Method;
use crate::pipeline::{Engine, IncomingRequest, PipelineResponse};
use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Build the engine's `axum` router. `/rest/*rest` is caught as a single
/// wildcard and split into `service`/`version`/`resourcePath` by hand,
/// since the service/version segments are not fixed-arity path params from
/// the router's point of view (the remaining path can be arbitrarily deep
/// or empty).
pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/health", any(health))
        .route("/rest/{*rest}", any(handle))
        .with_state(engine)
}

async fn health() -> &'static str {
    "ok"
}

async fn handle(State(engine): State<Arc<Engine>>, req: Request) -> Response {
    let method = match Method::parse(req.method().as_str()) {
        Some(m) => m,
        None => return StatusCode::METHOD_NOT_ALLOWED.into_response(),
    };

    let uri = req.uri().clone();
    let headers = collect_headers(req.headers());

    let Some((service_name, service_version, resource_path_raw)) = split_rest_path(&uri) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let resource_path = urlencoding::decode(&resource_path_raw)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| resource_path_raw.clone());

    let query_params = parse_query(uri.query().unwrap_or(""));
    let delay_override = query_params
        .get("delay")
        .and_then(|v| v.first())
        .and_then(|v| v.parse::<u64>().ok());

    let full_uri = uri.to_string();
    let (parts, body) = req.into_parts();
    let body_bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(b) => b,
        Err(_) => return StatusCode::PAYLOAD_TOO_LARGE.into_response(),
    };
    let body_string = String::from_utf8_lossy(&body_bytes).into_owned();

    let host_header = parts
        .headers
        .get(axum::http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let (host, port) = split_host_port(host_header);

    let incoming = IncomingRequest {
        method,
        service_name,
        service_version,
        resource_path,
        resource_path_raw,
        full_uri,
        body: body_string,
        headers,
        query_params,
        delay_override,
        scheme: "http".to_string(),
        host,
        port,
        context_path: String::new(),
    };

    let cancellation = CancellationToken::new();
    let response = engine.dispatch(incoming, &cancellation).await;
    into_axum_response(response)
}

fn into_axum_response(response: PipelineResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
    let mut builder = axum::http::Response::builder().status(status);
    for (name, values) in response.headers {
        for value in values {
            builder = builder.header(name.clone(), value);
        }
    }
    let body = response.body.unwrap_or_default();
    builder.body(Body::from(body)).unwrap_or_else(|_| {
        axum::http::Response::new(Body::empty())
    })
}

fn collect_headers(headers: &HeaderMap) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            map.entry(name.as_str().to_string())
                .or_default()
                .push(value.to_string());
        }
    }
    map
}

fn parse_query(query: &str) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        map.entry(k.to_string()).or_default().push(v.to_string());
    }
    map
}

/// Split `/rest/{service}/{version}/{...resourcePath}` into its three parts.
/// `resourcePath` may be empty (request against the service root).
fn split_rest_path(uri: &Uri) -> Option<(String, String, String)> {
    let path = uri.path().strip_prefix("/rest/")?;
    let mut parts = path.splitn(3, '/');
    let service = parts.next()?.to_string();
    let version = parts.next().unwrap_or("").to_string();
    let rest = parts.next().unwrap_or("");
    let resource_path = if rest.is_empty() {
        String::new()
    } else {
        format!("/{rest}")
    };
    if service.is_empty() {
        return None;
    }
    Some((service, version, resource_path))
}

fn split_host_port(host_header: &str) -> (String, u16) {
    match host_header.rsplit_once(':') {
        Some((host, port)) => (host.to_string(), port.parse().unwrap_or(80)),
        None => (host_header.to_string(), 80),
    }
}
