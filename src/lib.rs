//! Compiler from declarative scrape targets to ordered agent configuration.
//!
//! The library turns resolved scrape target resources, each with a list of
//! endpoints, into `scrape_configs` job documents for a vmagent or Prometheus
//! compatible collection agent. Output is deterministic: documents keep a
//! fixed key order and relabel rules keep their evaluation order, so the same
//! input always renders to the same bytes.

mod assets;
mod auth;
mod compiler;
mod config;
mod document;
mod error;
mod relabel;
mod scrape;
mod tls;

pub use assets::{DEFAULT_TLS_ASSETS_DIR, TlsAssetPaths};
pub use auth::{AuthReference, Authentication};
pub use compiler::{
    CompiledConfig, FailurePolicy, SkippedEndpoint, compile, load_input, parse_input
};
pub use config::{
    API_SERVER_CREDENTIAL_KEY, ApiServerConfig, BasicAuth, BasicAuthCredentials, Credentials,
    DiscoveryConfig, DiscoveryRole, Endpoint, KeySelector, NamespaceSelector, PortSelector,
    RelabelConfig, ScrapeInput, ScrapeTarget, SecretOrConfigMap, TlsConfig
};
pub use document::{Document, Value};
pub use error::{Error, io_error};
pub use relabel::{RelabelContext, build_relabel_pipeline, custom_rule, sanitize_label_name};
pub use scrape::{CompileOptions, discovery_namespaces, generate_scrape_config};
pub use tls::build_tls_block;
