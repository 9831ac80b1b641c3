//! URI pattern utilities: operation-name parsing, pattern-to-regex
//! conversion, and dispatch-criteria extraction from a concrete path or
//! query string.
//!
//! Determinism matters here: `dispatchCriteria` is used as a storage key,
//! so every function in this module must produce byte-identical output for
//! identical input.

use regex::Regex;
use std::collections::BTreeMap;

const KNOWN_VERBS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS", "HEAD"];

/// Extract the URI pattern from an operation name of the shape
/// `"<VERB> <uriPattern>"`. Returns the whole name unchanged if it does not
/// start with a known verb followed by a space.
pub fn uri_pattern_from_operation_name(name: &str) -> &str {
    for verb in KNOWN_VERBS {
        let prefix_len = verb.len();
        if name.len() > prefix_len
            && &name[..prefix_len] == *verb
            && name.as_bytes()[prefix_len] == b' '
        {
            return &name[prefix_len + 1..];
        }
    }
    name
}

/// Compile a fully-anchored regex from a URI pattern.
///
/// `{word}` placeholders (word = `[A-Za-z0-9_-]+`) and `/:word` placeholders
/// are both replaced with a single-segment capture group `([^/]+)`. Used
/// only as a fallback to literal resource-path matching (operation
/// resolution §4.3) and is not itself used for criteria extraction.
pub fn pattern_to_regex(pattern: &str) -> Regex {
    let placeholder = Regex::new(r"\{[A-Za-z0-9_-]+\}|/:[A-Za-z0-9_-]+").unwrap();
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    let mut last = 0;
    for m in placeholder.find_iter(pattern) {
        out.push_str(&regex::escape(&pattern[last..m.start()]));
        if pattern.as_bytes()[m.start()] == b'/' {
            // `/:word` -> literal leading slash, then the capture group.
            out.push('/');
        }
        out.push_str("([^/]+)");
        last = m.end();
    }
    out.push_str(&regex::escape(&pattern[last..]));
    out.push('$');
    Regex::new(&out).expect("generated pattern regex must compile")
}

/// Names of the `{word}`/`:word` placeholders in `pattern`, in the order
/// they appear.
fn placeholder_names(pattern: &str) -> Vec<String> {
    let brace = Regex::new(r"\{([A-Za-z0-9_-]+)\}").unwrap();
    let colon = Regex::new(r"/:([A-Za-z0-9_-]+)").unwrap();
    let mut positions: Vec<(usize, String)> = Vec::new();
    for cap in brace.captures_iter(pattern) {
        let m = cap.get(0).unwrap();
        positions.push((m.start(), cap[1].to_string()));
    }
    for cap in colon.captures_iter(pattern) {
        let m = cap.get(0).unwrap();
        positions.push((m.start(), cap[1].to_string()));
    }
    positions.sort_by_key(|(pos, _)| *pos);
    positions.into_iter().map(|(_, name)| name).collect()
}

/// Parse a space- or comma-separated whitelist of parameter names.
fn parse_rules(rules: &str) -> Vec<String> {
    rules
        .split([' ', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build the `?<name>=<value>` criterion string from a `BTreeMap` — the
/// map's natural ordering already gives ascending lexicographic order by
/// name.
fn criteria_string(values: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (k, v) in values {
        out.push('?');
        out.push_str(k);
        out.push('=');
        out.push_str(v);
    }
    out
}

/// Extract path variables from `pattern`/`concrete_path` and build the
/// dispatch criterion string, keeping only the names listed in `rules`.
///
/// Path variables are assumed already URL-decoded by the HTTP layer, per
/// spec §4.1; they are used verbatim.
pub fn extract_from_uri_pattern(rules: &str, pattern: &str, concrete_path: &str) -> String {
    let wanted = parse_rules(rules);
    let names = placeholder_names(pattern);
    let regex = pattern_to_regex(pattern);

    let mut values: BTreeMap<String, String> = BTreeMap::new();
    if let Some(caps) = regex.captures(concrete_path) {
        for (idx, name) in names.iter().enumerate() {
            if !wanted.iter().any(|w| w == name) {
                continue;
            }
            if let Some(m) = caps.get(idx + 1) {
                values.insert(name.clone(), m.as_str().to_string());
            }
        }
    }
    criteria_string(&values)
}

/// Parse path variables from `pattern`/`concrete_path` into a plain map,
/// independent of any rules whitelist. Used by the renderer to populate
/// `EvaluableRequest::path_variables`.
pub fn path_variables(pattern: &str, concrete_path: &str) -> BTreeMap<String, String> {
    let names = placeholder_names(pattern);
    let regex = pattern_to_regex(pattern);
    let mut values = BTreeMap::new();
    if let Some(caps) = regex.captures(concrete_path) {
        for (idx, name) in names.iter().enumerate() {
            if let Some(m) = caps.get(idx + 1) {
                values.insert(name.clone(), m.as_str().to_string());
            }
        }
    }
    values
}

/// Parse the query string of `full_uri`, keep only parameters whose name is
/// in `rules`, and build the `?<k>=<v>` criterion string. Every name listed
/// in `rules` contributes a segment even when the request didn't send it,
/// defaulting to an empty value, so a dispatcher-miss message is still
/// comparable against the same rule set (spec §8 scenario 2).
///
/// Query values are left exactly as they appear in the URI (still
/// percent-encoded) per spec §4.1 — the implementer-documented asymmetry
/// with path-variable decoding.
pub fn extract_from_uri_params(rules: &str, full_uri: &str) -> String {
    let wanted = parse_rules(rules);
    let query = full_uri.split_once('?').map(|(_, q)| q).unwrap_or("");

    // Every rule-listed parameter contributes a segment, defaulting to an
    // empty value when absent from the query string — a rule-listed
    // parameter that the request simply didn't send still needs to produce
    // a distinguishable (and matchable) criterion, e.g. `rules=status`
    // against `?color=red` yields `?status=` rather than `""`.
    let mut values: BTreeMap<String, String> = wanted.iter().map(|name| (name.clone(), String::new())).collect();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        if wanted.iter().any(|w| w == k) {
            values.insert(k.to_string(), v.to_string());
        }
    }
    criteria_string(&values)
}
