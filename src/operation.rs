//! Operation resolver (spec §4.3): given a service, an HTTP method, and a
//! resource path, finds the operation by exact path first, then by pattern
//! match. First match wins in definition order both passes.

use crate::model::{Method, Operation, Service};
use crate::uri;

/// Resolve the operation within `service` that matches `method`/`resource_path`.
///
/// `resource_path` is compared literally against `Operation::resource_paths`
/// in the exact-match pass (both the original and the trailing-slash-trimmed
/// form are tried), and against each operation's compiled pattern regex in
/// the fallback pass, using the *un-trimmed* path — this asymmetry mirrors
/// the original engine and is intentional (see `DESIGN.md`).
pub fn resolve<'a>(service: &'a Service, method: Method, resource_path: &str) -> Option<&'a Operation> {
    let trimmed = resource_path.strip_suffix('/');
    let method_name = method.name();

    // Pass 1: exact literal path match.
    for op in &service.operations {
        if op.method != method_name {
            continue;
        }
        if op.resource_paths.iter().any(|p| {
            p == resource_path || trimmed.is_some_and(|t| p == t)
        }) {
            return Some(op);
        }
    }

    // Pass 2: pattern regex match, against the original (un-trimmed) path.
    for op in &service.operations {
        if op.method != method_name {
            continue;
        }
        let pattern = op.uri_pattern();
        if uri::pattern_to_regex(pattern).is_match(resource_path) {
            return Some(op);
        }
    }

    None
}
