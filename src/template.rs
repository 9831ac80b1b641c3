//! Default `TemplateEngine` implementation, backed by `minijinja`.
//!
//! The template expression language itself is an external collaborator
//! per spec §1 ("Out of scope"); this is the reference implementation used
//! to run the engine standalone and in tests, grounded on `minijinja`'s use
//! elsewhere in the retrieval pack (`golem-cli`).

use crate::render::{RenderContext, TemplateEngine};
use minijinja::{context, Environment};

/// Renders `{{ request.path }}`-style expressions against an
/// [`EvaluableRequest`](crate::model::EvaluableRequest) and the per-request
/// `requestContext` scratchpad.
#[derive(Default)]
pub struct MinijinjaTemplateEngine;

impl TemplateEngine for MinijinjaTemplateEngine {
    fn render(&self, template: &str, ctx: &RenderContext) -> String {
        let env = Environment::new();
        let request_context: std::collections::BTreeMap<_, _> =
            ctx.request_context.iter().collect();
        let rendered = env.render_str(
            template,
            context! {
                request => context! {
                    body => &ctx.request.body,
                    path => &ctx.request.path,
                    method => &ctx.request.method,
                    headers => &ctx.request.headers,
                    queryParams => &ctx.request.query_params,
                    pathVariables => &ctx.request.path_variables,
                    scheme => &ctx.request.scheme,
                    host => &ctx.request.host,
                    port => ctx.request.port,
                    contextPath => &ctx.request.context_path,
                },
                requestContext => request_context,
                response => context! { name => ctx.response_name },
            },
        );
        // Template rendering failure is treated as a rendering of the
        // unrendered template (spec §7 "lenient" choice), rather than
        // surfacing a 500 to the client.
        rendered.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "template rendering failed, returning literal template");
            template.to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EvaluableRequest;
    use std::collections::HashMap;

    fn request() -> EvaluableRequest {
        EvaluableRequest {
            body: "{}".to_string(),
            path: "/pets/1".to_string(),
            method: "GET".to_string(),
            headers: HashMap::new(),
            query_params: HashMap::new(),
            path_variables: HashMap::new(),
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            port: 8080,
            context_path: String::new(),
        }
    }

    #[test]
    fn renders_request_path() {
        let engine = MinijinjaTemplateEngine;
        let req = request();
        let ctx = RenderContext {
            request: &req,
            request_context: &HashMap::new(),
            response_name: "r1",
        };
        assert_eq!(engine.render("path is {{ request.path }}", &ctx), "path is /pets/1");
    }

    #[test]
    fn malformed_template_falls_back_to_literal() {
        let engine = MinijinjaTemplateEngine;
        let req = request();
        let ctx = RenderContext {
            request: &req,
            request_context: &HashMap::new(),
            response_name: "r1",
        };
        let malformed = "{{ request.path ";
        assert_eq!(engine.render(malformed, &ctx), malformed);
    }
}
