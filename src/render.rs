//! Response renderer (spec §4.6): builds the `EvaluableRequest`, renders
//! headers and body through the template engine, and rewrites relative
//! `Location` headers to absolute URLs.

use crate::model::{EvaluableRequest, Operation, ParameterLocation, Response};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// `render(template, context) -> String` contract (spec §6). The context
/// exposes `request`, `requestContext`, and `response` fields; how those
/// are made available to a concrete template language is up to the
/// implementation.
pub trait TemplateEngine: Send + Sync {
    fn render(&self, template: &str, context: &RenderContext) -> String;
}

/// Everything a [`TemplateEngine`] needs to resolve template expressions.
pub struct RenderContext<'a> {
    pub request: &'a EvaluableRequest,
    pub request_context: &'a HashMap<String, serde_json::Value>,
    pub response_name: &'a str,
}

/// Absolute-URL regex: anchored match of `^[a-zA-Z][a-zA-Z0-9+\-.]*://.*`.
static ABSOLUTE_URL: OnceLock<Regex> = OnceLock::new();

fn absolute_url_regex() -> &'static Regex {
    ABSOLUTE_URL.get_or_init(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9+\-.]*://.*").unwrap())
}

/// Where the request came from, needed to absolutize relative `Location`
/// headers (spec §4.6).
pub struct RequestOrigin {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub context_path: String,
}

/// Fully rendered response: status-independent, ready to hand to the
/// transport layer with a status code chosen by the caller.
pub struct RenderedResponse {
    pub headers: Vec<(String, Vec<String>)>,
    pub body: Option<Vec<u8>>,
}

/// Build the [`EvaluableRequest`] view from the raw request parts.
#[allow(clippy::too_many_arguments)]
pub fn build_evaluable_request(
    body: String,
    resource_path: String,
    method: String,
    headers: HashMap<String, Vec<String>>,
    query_params: HashMap<String, Vec<String>>,
    pattern: &str,
    origin: &RequestOrigin,
) -> EvaluableRequest {
    let path_variables = crate::uri::path_variables(pattern, &resource_path)
        .into_iter()
        .collect();
    EvaluableRequest {
        body,
        path: resource_path,
        method,
        headers,
        query_params,
        path_variables,
        scheme: origin.scheme.clone(),
        host: origin.host.clone(),
        port: origin.port,
        context_path: origin.context_path.clone(),
    }
}

/// Render `response`'s headers and body through `engine`, applying header
/// recopy (from parameter constraints), `Content-Type` derivation,
/// `Location` absolutization, and `Transfer-Encoding` dropping, per spec
/// §4.6.
pub fn render(
    engine: &dyn TemplateEngine,
    operation: &Operation,
    response: &Response,
    request: &EvaluableRequest,
    request_context: &HashMap<String, serde_json::Value>,
    origin: &RequestOrigin,
    service_name: &str,
    service_version: &str,
) -> RenderedResponse {
    let mut headers: Vec<(String, Vec<String>)> = Vec::new();

    if let Some(media_type) = &response.media_type {
        headers.push((
            "Content-Type".to_string(),
            vec![format!("{media_type};charset=UTF-8")],
        ));
    }

    // Recopy headers from parameter constraints: header-located,
    // recopy-enabled constraints copy the request header verbatim.
    for constraint in &operation.parameter_constraints {
        if constraint.location != ParameterLocation::Header || !constraint.recopy {
            continue;
        }
        if let Some(values) = request.headers.get(&constraint.name) {
            headers.push((constraint.name.clone(), values.clone()));
        }
    }

    let ctx = RenderContext {
        request,
        request_context,
        response_name: &response.name,
    };

    for header in &response.headers {
        let rendered_values: Vec<String> = header
            .values
            .iter()
            .map(|template| engine.render(template, &ctx))
            .collect();

        if header.name.eq_ignore_ascii_case("transfer-encoding") {
            continue;
        }

        if header.name.eq_ignore_ascii_case("location") {
            let rewritten: Vec<String> = rendered_values
                .into_iter()
                .map(|v| absolutize_location(&v, origin, service_name, service_version))
                .collect();
            replace_header(&mut headers, &header.name, rewritten);
            continue;
        }

        replace_header(&mut headers, &header.name, rendered_values);
    }

    let body = response.content.as_ref().map(|template| {
        engine.render(template, &ctx).into_bytes()
    });

    RenderedResponse { headers, body }
}

fn replace_header(headers: &mut Vec<(String, Vec<String>)>, name: &str, values: Vec<String>) {
    headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    headers.push((name.to_string(), values));
}

/// Rewrite a relative `Location` value to an absolute URL from the client's
/// perspective, per spec §4.6: `<scheme>://<host>:<port><contextPath>/rest/<serviceName>/<version><value>`.
fn absolutize_location(
    value: &str,
    origin: &RequestOrigin,
    service_name: &str,
    service_version: &str,
) -> String {
    if absolute_url_regex().is_match(value) {
        return value.to_string();
    }
    format!(
        "{}://{}:{}{}/rest/{}/{}{}",
        origin.scheme, origin.host, origin.port, origin.context_path, service_name, service_version, value
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ParameterConstraint, ResponseHeader};

    struct EchoTemplateEngine;
    impl TemplateEngine for EchoTemplateEngine {
        fn render(&self, template: &str, _context: &RenderContext) -> String {
            template.to_string()
        }
    }

    fn origin() -> RequestOrigin {
        RequestOrigin {
            scheme: "http".to_string(),
            host: "api.local".to_string(),
            port: 8080,
            context_path: String::new(),
        }
    }

    fn operation() -> Operation {
        Operation {
            name: "POST /pets".to_string(),
            method: "POST".to_string(),
            resource_paths: vec![],
            dispatcher: None,
            dispatcher_rules: None,
            parameter_constraints: vec![ParameterConstraint {
                name: "X-Trace-Id".to_string(),
                location: ParameterLocation::Header,
                required: false,
                recopy: true,
                must_match_regex: None,
            }],
            default_delay: None,
            id_path: None,
            fallback: None,
            proxy_fallback: None,
        }
    }

    fn request() -> EvaluableRequest {
        let mut headers = HashMap::new();
        headers.insert("X-Trace-Id".to_string(), vec!["abc123".to_string()]);
        EvaluableRequest {
            body: String::new(),
            path: "/pets".to_string(),
            method: "POST".to_string(),
            headers,
            query_params: HashMap::new(),
            path_variables: HashMap::new(),
            scheme: "http".to_string(),
            host: "api.local".to_string(),
            port: 8080,
            context_path: String::new(),
        }
    }

    #[test]
    fn location_header_is_absolutized() {
        let response = Response {
            id: "r".to_string(),
            operation_id: "op".to_string(),
            name: "r".to_string(),
            status: Some(201),
            media_type: Some("application/json".to_string()),
            content: Some("{}".to_string()),
            headers: vec![ResponseHeader {
                name: "Location".to_string(),
                values: vec!["/pets/42".to_string()],
            }],
            dispatch_criteria: None,
        };
        let engine = EchoTemplateEngine;
        let req = request();
        let rendered = render(
            &engine,
            &operation(),
            &response,
            &req,
            &HashMap::new(),
            &origin(),
            "Pets",
            "1.0",
        );
        let (_, location_values) = rendered
            .headers
            .iter()
            .find(|(n, _)| n == "Location")
            .unwrap();
        assert_eq!(location_values[0], "http://api.local:8080/rest/Pets/1.0/pets/42");
    }

    #[test]
    fn absolute_location_is_left_unchanged() {
        let response = Response {
            id: "r".to_string(),
            operation_id: "op".to_string(),
            name: "r".to_string(),
            status: Some(201),
            media_type: None,
            content: None,
            headers: vec![ResponseHeader {
                name: "Location".to_string(),
                values: vec!["https://other.example/elsewhere".to_string()],
            }],
            dispatch_criteria: None,
        };
        let engine = EchoTemplateEngine;
        let rendered = render(
            &engine,
            &operation(),
            &response,
            &request(),
            &HashMap::new(),
            &origin(),
            "Pets",
            "1.0",
        );
        let (_, values) = rendered.headers.iter().find(|(n, _)| n == "Location").unwrap();
        assert_eq!(values[0], "https://other.example/elsewhere");
    }

    #[test]
    fn transfer_encoding_is_dropped() {
        let response = Response {
            id: "r".to_string(),
            operation_id: "op".to_string(),
            name: "r".to_string(),
            status: Some(200),
            media_type: None,
            content: None,
            headers: vec![ResponseHeader {
                name: "Transfer-Encoding".to_string(),
                values: vec!["chunked".to_string()],
            }],
            dispatch_criteria: None,
        };
        let engine = EchoTemplateEngine;
        let rendered = render(
            &engine,
            &operation(),
            &response,
            &request(),
            &HashMap::new(),
            &origin(),
            "Pets",
            "1.0",
        );
        assert!(!rendered.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case("transfer-encoding")));
    }

    #[test]
    fn header_recopy_from_parameter_constraints() {
        let response = Response {
            id: "r".to_string(),
            operation_id: "op".to_string(),
            name: "r".to_string(),
            status: Some(200),
            media_type: None,
            content: None,
            headers: vec![],
            dispatch_criteria: None,
        };
        let engine = EchoTemplateEngine;
        let rendered = render(
            &engine,
            &operation(),
            &response,
            &request(),
            &HashMap::new(),
            &origin(),
            "Pets",
            "1.0",
        );
        let (_, values) = rendered
            .headers
            .iter()
            .find(|(n, _)| n == "X-Trace-Id")
            .unwrap();
        assert_eq!(values[0], "abc123");
    }
}
