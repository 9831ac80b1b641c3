//! Response selector (spec §4.4): criterion lookup, response-name lookup,
//! fallback consultation, and content negotiation (§4.4.1).

use crate::model::{FallbackSpecification, Response};
use crate::repository::ResponseRepository;

/// Select a response for `operation_id` given a dispatch criterion
/// (possibly `None`), an optional fallback specification, and the
/// request's `Accept` header.
///
/// Mirrors spec §4.4 exactly:
/// 1. criterion lookup,
/// 2. name lookup (for `SCRIPT`/`JSON_BODY` strategies returning a name),
/// 3. fallback name lookup,
/// 4. (left to the caller — see `crate::pipeline`) `findByOperationId`.
pub async fn select(
    repo: &dyn ResponseRepository,
    operation_id: &str,
    criteria: Option<&str>,
    fallback: Option<&FallbackSpecification>,
    accept: Option<&str>,
) -> Option<Response> {
    if let Some(criteria) = criteria {
        let candidates = repo
            .find_by_operation_id_and_dispatch_criteria(operation_id, criteria)
            .await;
        if let Some(r) = negotiate(candidates, accept) {
            return Some(r);
        }

        let candidates = repo.find_by_operation_id_and_name(operation_id, criteria).await;
        if let Some(r) = negotiate(candidates, accept) {
            return Some(r);
        }
    }

    if let Some(fallback) = fallback {
        let candidates = repo
            .find_by_operation_id_and_name(operation_id, &fallback.fallback)
            .await;
        if let Some(r) = negotiate(candidates, accept) {
            return Some(r);
        }
    }

    None
}

/// Content negotiation over a non-empty response list and the request's
/// `Accept` header (spec §4.4.1): empty/absent `Accept` returns the first
/// element; otherwise the first element whose `mediaType` equals `Accept`
/// exactly, falling back to the first element if none match.
pub fn negotiate(candidates: Vec<Response>, accept: Option<&str>) -> Option<Response> {
    if candidates.is_empty() {
        return None;
    }
    let accept = accept.filter(|a| !a.is_empty());
    match accept {
        None => candidates.into_iter().next(),
        Some(accept) => {
            let mut iter = candidates.into_iter();
            let mut first: Option<Response> = None;
            for r in &mut iter {
                if first.is_none() {
                    first = Some(r.clone());
                }
                if r.media_type.as_deref() == Some(accept) {
                    return Some(r);
                }
            }
            first
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryResponseRepository;

    fn response(op: &str, name: &str, criteria: Option<&str>, media_type: Option<&str>) -> Response {
        Response {
            id: format!("{op}-{name}"),
            operation_id: op.to_string(),
            name: name.to_string(),
            status: None,
            media_type: media_type.map(str::to_string),
            content: None,
            headers: vec![],
            dispatch_criteria: criteria.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn criterion_hit_wins() {
        let repo = InMemoryResponseRepository::default();
        repo.insert(response("op", "r1", Some("?id=1"), None));
        let selected = select(&repo, "op", Some("?id=1"), None, None).await;
        assert_eq!(selected.unwrap().name, "r1");
    }

    #[tokio::test]
    async fn falls_back_to_name_lookup_for_script_results() {
        let repo = InMemoryResponseRepository::default();
        repo.insert(response("op", "named-by-script", None, None));
        let selected = select(&repo, "op", Some("named-by-script"), None, None).await;
        assert_eq!(selected.unwrap().name, "named-by-script");
    }

    #[tokio::test]
    async fn fallback_spec_consulted_on_miss() {
        let repo = InMemoryResponseRepository::default();
        repo.insert(response("op", "default", None, None));
        let fallback = FallbackSpecification {
            dispatcher: "SEQUENCE".to_string(),
            dispatcher_rules: "id".to_string(),
            fallback: "default".to_string(),
        };
        let selected = select(&repo, "op", Some("?id=999"), Some(&fallback), None).await;
        assert_eq!(selected.unwrap().name, "default");
    }

    #[test]
    fn negotiate_returns_first_when_accept_absent() {
        let candidates = vec![
            response("op", "r1", None, Some("application/json")),
            response("op", "r2", None, Some("application/xml")),
        ];
        assert_eq!(negotiate(candidates, None).unwrap().name, "r1");
    }

    #[test]
    fn negotiate_matches_exact_media_type() {
        let candidates = vec![
            response("op", "r1", None, Some("application/json")),
            response("op", "r2", None, Some("application/xml")),
        ];
        let chosen = negotiate(candidates, Some("application/xml")).unwrap();
        assert_eq!(chosen.name, "r2");
    }

    #[test]
    fn negotiate_falls_back_to_first_when_no_media_type_matches() {
        let candidates = vec![response("op", "r1", None, Some("application/json"))];
        let chosen = negotiate(candidates, Some("text/plain")).unwrap();
        assert_eq!(chosen.name, "r1");
    }
}
