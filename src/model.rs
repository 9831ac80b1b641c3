//! Core data model: `Service`, `Operation`, `Response` and the value types
//! that travel through the dispatch pipeline.
//!
//! These entities are read-only from the dispatcher's perspective; only
//! [`DispatchContext`] and [`EvaluableRequest`] are constructed per request.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// HTTP verb understood by the operation resolver.
///
/// `HEAD` is accepted on the HTTP surface (spec §6) and treated
/// identically to `GET` for operation resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl Method {
    /// The upper-case verb string, as compared case-sensitively against
    /// `Operation::method`.
    pub fn name(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Options => "OPTIONS",
            Method::Head => "HEAD",
        }
    }

    /// Parse from an upper-case verb string (as found in `Operation::method`
    /// or an incoming request). Returns `None` for anything unrecognized.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::Get),
            "POST" => Some(Method::Post),
            "PUT" => Some(Method::Put),
            "DELETE" => Some(Method::Delete),
            "PATCH" => Some(Method::Patch),
            "OPTIONS" => Some(Method::Options),
            "HEAD" => Some(Method::Head),
            _ => None,
        }
    }
}

/// Where a [`ParameterConstraint`] is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Header,
    Query,
    Path,
}

/// A constraint on one request parameter, enforced before dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterConstraint {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    pub required: bool,
    pub recopy: bool,
    pub must_match_regex: Option<String>,
}

/// Dispatch strategy tag, selected by `Operation::dispatcher`.
///
/// Modeled as a tagged variant per the design note in spec §9 rather than
/// string-keyed branching at every call site; an unrecognized dispatcher
/// string still round-trips through `Dispatcher::Unknown` so it can be
/// logged, but evaluates to a null criterion like "no dispatcher".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatcher {
    Sequence,
    UriParts,
    UriParams,
    UriElements,
    Script,
    JsonBody,
    Proxy,
    Unknown(String),
}

impl Dispatcher {
    /// Parse the dispatcher string stored on an [`Operation`].
    pub fn parse(s: &str) -> Self {
        match s {
            "SEQUENCE" => Dispatcher::Sequence,
            "URI_PARTS" => Dispatcher::UriParts,
            "URI_PARAMS" => Dispatcher::UriParams,
            "URI_ELEMENTS" => Dispatcher::UriElements,
            "SCRIPT" => Dispatcher::Script,
            "JSON_BODY" => Dispatcher::JsonBody,
            "PROXY" => Dispatcher::Proxy,
            other => Dispatcher::Unknown(other.to_string()),
        }
    }
}

/// One HTTP verb + URI pattern of a service, with dispatching rules and a
/// closed set of previously-observed concrete resource paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// `"<VERB> <uriPattern>"`, e.g. `"GET /pets/{id}"`.
    pub name: String,
    /// Upper-case HTTP verb, compared case-sensitively against the request.
    pub method: String,
    /// Concrete paths this operation has literally been observed at.
    pub resource_paths: Vec<String>,
    /// Dispatcher strategy name (`SEQUENCE`, `URI_PARTS`, ...), if any.
    pub dispatcher: Option<String>,
    /// Rules string consumed by the dispatcher (whitelist, script source, ...).
    pub dispatcher_rules: Option<String>,
    pub parameter_constraints: Vec<ParameterConstraint>,
    /// Default artificial delay in milliseconds.
    pub default_delay: Option<u64>,
    /// JSON-pointer-like path used to extract an id for invocation accounting.
    pub id_path: Option<String>,
    pub fallback: Option<FallbackSpecification>,
    pub proxy_fallback: Option<ProxyFallbackSpecification>,
}

impl Operation {
    /// The URI pattern embedded in `name` (the part after the verb).
    pub fn uri_pattern(&self) -> &str {
        crate::uri::uri_pattern_from_operation_name(&self.name)
    }
}

/// A virtualized API identified by `(name, version)`, grouping operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub version: String,
    pub operations: Vec<Operation>,
}

/// One response header: a name plus one or more template-rendered values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseHeader {
    pub name: String,
    pub values: Vec<String>,
}

/// A canned response belonging to one operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    pub operation_id: String,
    pub name: String,
    pub status: Option<u16>,
    pub media_type: Option<String>,
    pub content: Option<String>,
    pub headers: Vec<ResponseHeader>,
    pub dispatch_criteria: Option<String>,
}

/// Named default response consulted when criterion-based lookup misses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackSpecification {
    pub dispatcher: String,
    pub dispatcher_rules: String,
    pub fallback: String,
}

/// Rule directing unmatched (or status-matching) requests to an upstream URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyFallbackSpecification {
    pub dispatcher: String,
    pub dispatcher_rules: String,
    pub proxy_url: String,
}

/// Per-request scratchpad produced by dispatch-criterion computation.
///
/// `request_context` is populated only by the `SCRIPT` strategy and is
/// threaded through to header/body rendering unchanged otherwise.
#[derive(Debug, Clone, Default)]
pub struct DispatchContext {
    pub dispatch_criteria: Option<String>,
    pub request_context: HashMap<String, serde_json::Value>,
}

/// Read-only view of the incoming request exposed to the template engine.
#[derive(Debug, Clone)]
pub struct EvaluableRequest {
    pub body: String,
    pub path: String,
    pub method: String,
    pub headers: HashMap<String, Vec<String>>,
    pub query_params: HashMap<String, Vec<String>>,
    pub path_variables: HashMap<String, String>,
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub context_path: String,
}
