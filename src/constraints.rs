//! Parameter constraint validation, enforced before dispatch-criterion
//! evaluation (SPEC_FULL §4, ordering decision recorded in `DESIGN.md`).

use crate::model::{ParameterConstraint, ParameterLocation};
use regex::Regex;
use std::collections::HashMap;

/// Everything constraint validation needs to read from the request.
pub struct ConstraintInput<'a> {
    pub headers: &'a HashMap<String, Vec<String>>,
    pub query_params: &'a HashMap<String, Vec<String>>,
    pub path_variables: &'a HashMap<String, String>,
}

/// Validate `constraints` against `input`. Returns the first violation
/// description, or `None` if every constraint is satisfied.
pub fn validate(constraints: &[ParameterConstraint], input: &ConstraintInput<'_>) -> Option<String> {
    for constraint in constraints {
        let value = lookup(constraint, input);

        match &value {
            None if constraint.required => {
                return Some(format!("Parameter {} is required", constraint.name));
            }
            None => continue,
            Some(v) => {
                if let Some(pattern) = &constraint.must_match_regex {
                    match Regex::new(pattern) {
                        Ok(re) if !re.is_match(v) => {
                            return Some(format!(
                                "Parameter {} does not match {}",
                                constraint.name, pattern
                            ));
                        }
                        Err(_) => {
                            return Some(format!(
                                "Parameter {} has an invalid constraint regex",
                                constraint.name
                            ));
                        }
                        _ => {}
                    }
                }
            }
        }
    }
    None
}

fn lookup(constraint: &ParameterConstraint, input: &ConstraintInput<'_>) -> Option<String> {
    match constraint.location {
        ParameterLocation::Header => input
            .headers
            .get(&constraint.name)
            .and_then(|v| v.first())
            .cloned(),
        ParameterLocation::Query => input
            .query_params
            .get(&constraint.name)
            .and_then(|v| v.first())
            .cloned(),
        ParameterLocation::Path => input.path_variables.get(&constraint.name).cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(
        headers: &'a HashMap<String, Vec<String>>,
        query: &'a HashMap<String, Vec<String>>,
        path: &'a HashMap<String, String>,
    ) -> ConstraintInput<'a> {
        ConstraintInput {
            headers,
            query_params: query,
            path_variables: path,
        }
    }

    #[test]
    fn required_parameter_missing_is_a_violation() {
        let constraints = vec![ParameterConstraint {
            name: "X-Api-Key".to_string(),
            location: ParameterLocation::Header,
            required: true,
            recopy: false,
            must_match_regex: None,
        }];
        let empty = HashMap::new();
        let empty_q = HashMap::new();
        let empty_p = HashMap::new();
        let violation = validate(&constraints, &input(&empty, &empty_q, &empty_p));
        assert!(violation.is_some());
    }

    #[test]
    fn regex_mismatch_is_a_violation() {
        let constraints = vec![ParameterConstraint {
            name: "status".to_string(),
            location: ParameterLocation::Query,
            required: false,
            recopy: false,
            must_match_regex: Some("^(open|closed)$".to_string()),
        }];
        let mut query = HashMap::new();
        query.insert("status".to_string(), vec!["weird".to_string()]);
        let empty_h = HashMap::new();
        let empty_p = HashMap::new();
        assert!(validate(&constraints, &input(&empty_h, &query, &empty_p)).is_some());
    }

    #[test]
    fn satisfied_constraints_produce_no_violation() {
        let constraints = vec![ParameterConstraint {
            name: "status".to_string(),
            location: ParameterLocation::Query,
            required: true,
            recopy: false,
            must_match_regex: Some("^(open|closed)$".to_string()),
        }];
        let mut query = HashMap::new();
        query.insert("status".to_string(), vec!["open".to_string()]);
        let empty_h = HashMap::new();
        let empty_p = HashMap::new();
        assert!(validate(&constraints, &input(&empty_h, &query, &empty_p)).is_none());
    }

    #[test]
    fn optional_missing_parameter_is_not_a_violation() {
        let constraints = vec![ParameterConstraint {
            name: "color".to_string(),
            location: ParameterLocation::Query,
            required: false,
            recopy: false,
            must_match_regex: None,
        }];
        let empty_h = HashMap::new();
        let empty_q = HashMap::new();
        let empty_p = HashMap::new();
        assert!(validate(&constraints, &input(&empty_h, &empty_q, &empty_p)).is_none());
    }
}
