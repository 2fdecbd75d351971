// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Assembly of the `relabel_configs` pipeline of a scrape job.
//!
//! The agent applies relabel rules in sequence, so the position of every rule
//! is part of its meaning. The pipeline is built append-only: the generated
//! prefix, then the endpoint's own rules, then the enforced namespace label.

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    config::{DiscoveryRole, Endpoint, PortSelector, RelabelConfig, ScrapeTarget},
    document::Document
};

const NAMESPACE_LABEL: &str = "__meta_kubernetes_namespace";
const SERVICE_NAME_LABEL: &str = "__meta_kubernetes_service_name";
const POD_NAME_LABEL: &str = "__meta_kubernetes_pod_name";
const CONTAINER_PORT_NUMBER_LABEL: &str = "__meta_kubernetes_pod_container_port_number";
const SERVICE_LABEL_PREFIX: &str = "__meta_kubernetes_service_label_";
const POD_LABEL_PREFIX: &str = "__meta_kubernetes_pod_label_";
const FIRST_GROUP: &str = "${1}";
const NON_EMPTY: &str = "(.+)";

static INVALID_LABEL_CHARACTERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("[^a-zA-Z0-9_]").expect("label character class is a valid pattern")
});

/// Settings shared by every endpoint of one target.
#[derive(Debug, Clone, Copy)]
pub struct RelabelContext<'a> {
    /// Target owning the endpoint.
    pub target:                   &'a ScrapeTarget,
    /// Discovery role the job enumerates.
    pub role:                     DiscoveryRole,
    /// Label pinned to the target namespace for tenant isolation.
    pub enforced_namespace_label: Option<&'a str>
}

/// Append-only sequence of relabel rules.
#[derive(Debug, Default)]
struct Pipeline {
    rules: Vec<Document>
}

impl Pipeline {
    fn rule(&mut self, rule: Document) -> &mut Self {
        self.rules.push(rule);
        self
    }

    fn copy(&mut self, source: &str, target: &str) -> &mut Self {
        self.rule(Document::new().with("source_labels", [source]).with("target_label", target))
    }

    fn copy_non_empty(&mut self, source: &str, target: &str) -> &mut Self {
        self.rule(
            Document::new()
                .with("source_labels", vec![source.to_owned()])
                .with("target_label", target)
                .with("regex", NON_EMPTY)
                .with("replacement", FIRST_GROUP)
        )
    }

    fn finish(self) -> Vec<Document> {
        self.rules
    }
}

/// Builds the relabel pipeline of `endpoint`.
///
/// Rule order:
///
/// 1. keep only the requested port,
/// 2. rewrite `Node` backed addresses into `node`,
/// 3. rewrite `Pod` backed addresses into `pod`,
/// 4. copy namespace, service and pod names,
/// 5. copy configured service and pod labels,
/// 6. derive `job` from the service name, or from the job label,
/// 7. pin `endpoint` to the port,
/// 8. the endpoint's own rules, in their given order,
/// 9. pin the enforced namespace label, if configured.
///
/// # Examples
///
/// ```
/// use scrapegen::{DiscoveryRole, Endpoint, RelabelContext, ScrapeTarget, build_relabel_pipeline};
///
/// let target = ScrapeTarget {
///     namespace: "default".to_owned(),
///     name: "web".to_owned(),
///     ..ScrapeTarget::default()
/// };
/// let context = RelabelContext {
///     target: &target,
///     role: DiscoveryRole::Endpoints,
///     enforced_namespace_label: None
/// };
/// let rules = build_relabel_pipeline(&context, &Endpoint::on_port("http"));
/// assert_eq!(rules.len(), 8);
/// assert_eq!(rules[0].get("action").and_then(|value| value.as_str()), Some("keep"));
/// ```
pub fn build_relabel_pipeline(context: &RelabelContext<'_>, endpoint: &Endpoint) -> Vec<Document> {
    let role = context.role;
    let port = endpoint.port.to_string();
    let mut pipeline = Pipeline::default();

    let port_label = match endpoint.port {
        PortSelector::Name(_) => role.port_name_label(),
        PortSelector::Number(_) => CONTAINER_PORT_NUMBER_LABEL
    };
    pipeline.rule(
        Document::new()
            .with("action", "keep")
            .with("source_labels", [port_label])
            .with("regex", port.as_str())
    );

    for (kind, label) in [("Node", "node"), ("Pod", "pod")] {
        pipeline.rule(
            Document::new()
                .with("source_labels", [role.target_kind_label(), role.target_name_label()])
                .with("separator", ";")
                .with("regex", format!("{kind};(.*)"))
                .with("replacement", FIRST_GROUP)
                .with("target_label", label)
        );
    }

    pipeline
        .copy(NAMESPACE_LABEL, "namespace")
        .copy(SERVICE_NAME_LABEL, "service")
        .copy(POD_NAME_LABEL, "pod");

    for label in &context.target.target_labels {
        let name = sanitize_label_name(label);
        pipeline.copy_non_empty(&format!("{SERVICE_LABEL_PREFIX}{name}"), &name);
    }
    for label in &context.target.pod_target_labels {
        let name = sanitize_label_name(label);
        pipeline.copy_non_empty(&format!("{POD_LABEL_PREFIX}{name}"), &name);
    }

    pipeline.rule(
        Document::new()
            .with("source_labels", [SERVICE_NAME_LABEL])
            .with("target_label", "job")
            .with("replacement", FIRST_GROUP)
    );
    if let Some(job_label) = context.target.job_label.as_deref().filter(|label| !label.is_empty()) {
        let name = sanitize_label_name(job_label);
        pipeline.copy_non_empty(&format!("{SERVICE_LABEL_PREFIX}{name}"), "job");
    }

    pipeline.rule(Document::new().with("target_label", "endpoint").with("replacement", port));

    for custom in &endpoint.relabel_configs {
        pipeline.rule(custom_rule(custom));
    }

    if let Some(label) = context.enforced_namespace_label.filter(|label| !label.is_empty()) {
        pipeline.rule(
            Document::new()
                .with("target_label", label)
                .with("replacement", context.target.namespace.as_str())
        );
    }

    pipeline.finish()
}

/// Renders a user supplied relabel rule, skipping unset fields.
pub fn custom_rule(rule: &RelabelConfig) -> Document {
    let mut document = Document::new();
    if !rule.source_labels.is_empty() {
        document.push("source_labels", rule.source_labels.clone());
    }
    if let Some(separator) = rule.separator.as_deref().filter(|value| !value.is_empty()) {
        document.push("separator", separator);
    }
    if let Some(target) = rule.target_label.as_deref().filter(|value| !value.is_empty()) {
        document.push("target_label", target);
    }
    if let Some(regex) = rule.regex.as_deref().filter(|value| !value.is_empty()) {
        document.push("regex", regex);
    }
    if let Some(modulus) = rule.modulus.filter(|value| *value != 0) {
        document.push("modulus", modulus);
    }
    if let Some(replacement) = rule.replacement.as_deref().filter(|value| !value.is_empty()) {
        document.push("replacement", replacement);
    }
    if let Some(action) = rule.action.as_deref().filter(|value| !value.is_empty()) {
        document.push("action", action);
    }
    document
}

/// Replaces characters that are invalid in label names with `_`.
///
/// # Examples
///
/// ```
/// use scrapegen::sanitize_label_name;
///
/// assert_eq!(sanitize_label_name("app.kubernetes.io/name"), "app_kubernetes_io_name");
/// ```
pub fn sanitize_label_name(name: &str) -> String {
    INVALID_LABEL_CHARACTERS.replace_all(name, "_").into_owned()
}
