//! `JSON_BODY` dispatch evaluator: a JSON pointer evaluated against the
//! request body, branching through an operator and a case table to a
//! response *name* (consumed the same way a `SCRIPT` result is, per spec
//! §4.4 step 2).

use serde::Deserialize;
use serde_json::Value;

/// `{exp, operator, cases}` rules payload, parsed from the operation's
/// `dispatcherRules` JSON string.
#[derive(Debug, Deserialize)]
struct JsonBodyRules {
    exp: String,
    operator: String,
    cases: indexmap::IndexMap<String, String>,
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
}

/// Evaluate `rules` (a JSON string) against `body`, returning the matched
/// response name, or an error describing why evaluation failed (malformed
/// rules, pointer missing with no default case, ...).
pub fn evaluate(rules: &str, body: &str) -> Result<String, String> {
    let rules: JsonBodyRules =
        serde_json::from_str(rules).map_err(|e| format!("malformed JSON_BODY rules: {e}"))?;
    let doc: Value = serde_json::from_str(body).map_err(|e| format!("request body is not JSON: {e}"))?;
    let pointed = doc.pointer(&rules.exp);

    let matched = match rules.operator.as_str() {
        "exists" => {
            if pointed.is_some() {
                rules.cases.get("true").cloned()
            } else {
                rules.cases.get("false").cloned()
            }
        }
        "equals" => pointed.and_then(|v| rules.cases.get(&scalar_to_string(v)).cloned()),
        "contains" => pointed.and_then(|v| {
            rules
                .cases
                .iter()
                .find(|(k, _)| scalar_to_string(v).contains(k.as_str()))
                .map(|(_, v)| v.clone())
        }),
        "matches" => pointed.and_then(|v| {
            let s = scalar_to_string(v);
            rules.cases.iter().find_map(|(pattern, name)| {
                regex::Regex::new(pattern)
                    .ok()
                    .filter(|re| re.is_match(&s))
                    .map(|_| name.clone())
            })
        }),
        "range" => pointed.and_then(Value::as_f64).and_then(|n| {
            let lo = rules.min.unwrap_or(f64::MIN);
            let hi = rules.max.unwrap_or(f64::MAX);
            if n >= lo && n <= hi {
                rules.cases.get("in").cloned()
            } else {
                rules.cases.get("out").cloned()
            }
        }),
        other => return Err(format!("unsupported JSON_BODY operator: {other}")),
    };

    matched
        .or_else(|| rules.cases.get("default").cloned())
        .ok_or_else(|| "no JSON_BODY case matched and no default provided".to_string())
}

fn scalar_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
