//! Request-to-response dispatch engine for a REST service-virtualization
//! mock server: operation resolution, dispatch-criterion computation,
//! response selection with fallback/proxy semantics, header/body
//! templating, CORS pre-flight handling, and invocation accounting.
//!
//! Persistence, mock authoring/import, administrative APIs, and non-HTTP
//! protocols are out of scope — see `SPEC_FULL.md`.

pub mod config;
pub mod constraints;
pub mod cors;
pub mod delay;
pub mod dispatch;
pub mod error;
pub mod http_server;
pub mod model;
pub mod operation;
pub mod pipeline;
pub mod proxy;
pub mod render;
pub mod repository;
pub mod response_selector;
pub mod telemetry;
pub mod template;
pub mod uri;
