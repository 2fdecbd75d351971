// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Assembly of one scrape job document per target endpoint.
//!
//! The job document combines the discovery block, optional scrape settings,
//! the TLS block, the authentication block and the relabel pipeline. Keys are
//! written in a fixed order so that identical inputs always render to
//! identical bytes.

use tracing::debug;

use crate::{
    assets::TlsAssetPaths,
    auth::Authentication,
    config::{Credentials, DiscoveryConfig, Endpoint, ScrapeTarget},
    document::Document,
    error::Error,
    relabel::{RelabelContext, build_relabel_pipeline, custom_rule},
    tls::build_tls_block
};

/// Cluster-wide settings applied to every compiled job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Discovery role and optional API server connection.
    pub discovery:                  DiscoveryConfig,
    /// Mount root of TLS material.
    pub tls_assets:                 TlsAssetPaths,
    /// Force `honor_labels` to `false` regardless of endpoint settings.
    pub override_honor_labels:      bool,
    /// Force `honor_timestamps` to `false` regardless of endpoint settings.
    pub override_honor_timestamps:  bool,
    /// Discover services in every namespace instead of the selected ones.
    pub ignore_namespace_selectors: bool,
    /// Label pinned to the target namespace on every series.
    pub enforced_namespace_label:   Option<String>
}

/// Generates the scrape job for the endpoint at `index` of `target`.
///
/// # Errors
///
/// Returns [`Error::AmbiguousAuthentication`] when the endpoint (or the API
/// server connection) configures more than one credential source and
/// [`Error::MissingCredential`] when a referenced credential is absent from
/// `credentials`. No partial document is returned on error.
///
/// # Examples
///
/// ```
/// use scrapegen::{CompileOptions, Credentials, Endpoint, ScrapeTarget, generate_scrape_config};
///
/// let target = ScrapeTarget {
///     namespace: "default".to_owned(),
///     name: "web".to_owned(),
///     endpoints: vec![Endpoint::on_port("http")],
///     ..ScrapeTarget::default()
/// };
/// let document = generate_scrape_config(
///     &target,
///     &target.endpoints[0],
///     0,
///     &CompileOptions::default(),
///     &Credentials::default()
/// )?;
/// assert_eq!(document.get("job_name").and_then(|value| value.as_str()), Some("default/web/0"));
/// # Ok::<(), scrapegen::Error>(())
/// ```
pub fn generate_scrape_config(
    target: &ScrapeTarget,
    endpoint: &Endpoint,
    index: usize,
    options: &CompileOptions,
    credentials: &Credentials
) -> Result<Document, Error> {
    let job_name = target.job_name(index);
    debug!("Generating scrape job {}", job_name);

    let authentication = Authentication::for_endpoint(
        endpoint,
        &job_name,
        &target.credential_key(index),
        credentials
    )?;

    let mut document = Document::new()
        .with("job_name", job_name.as_str())
        .with("honor_labels", endpoint.honor_labels && !options.override_honor_labels);

    if endpoint.honor_timestamps.is_some() || options.override_honor_timestamps {
        let honor = endpoint.honor_timestamps.unwrap_or(false);
        document.push("honor_timestamps", honor && !options.override_honor_timestamps);
    }

    document.push(
        "kubernetes_sd_configs",
        vec![discovery_block(target, options, credentials)?]
    );

    push_scrape_settings(&mut document, endpoint);

    let mut document = build_tls_block(
        document,
        &target.namespace,
        endpoint.tls_config.as_ref(),
        &options.tls_assets
    );

    authentication.append_to(&mut document);

    let context = RelabelContext {
        target,
        role: options.discovery.role,
        enforced_namespace_label: options.enforced_namespace_label.as_deref()
    };
    document.push("relabel_configs", build_relabel_pipeline(&context, endpoint));

    if endpoint.sample_limit > 0 {
        document.push("sample_limit", endpoint.sample_limit);
    }
    if !endpoint.metric_relabel_configs.is_empty() {
        let rules: Vec<Document> = endpoint.metric_relabel_configs.iter().map(custom_rule).collect();
        document.push("metric_relabel_configs", rules);
    }

    Ok(document)
}

/// Returns the namespaces the job discovers services in.
///
/// An empty list means every namespace.
pub fn discovery_namespaces(target: &ScrapeTarget, ignore_namespace_selectors: bool) -> Vec<String> {
    if ignore_namespace_selectors || target.namespace_selector.any {
        return Vec::new();
    }
    if target.namespace_selector.match_names.is_empty() {
        return vec![target.namespace.clone()];
    }
    target.namespace_selector.match_names.clone()
}

fn discovery_block(
    target: &ScrapeTarget,
    options: &CompileOptions,
    credentials: &Credentials
) -> Result<Document, Error> {
    let mut block = Document::new().with("role", options.discovery.role.as_str());

    let namespaces = discovery_namespaces(target, options.ignore_namespace_selectors);
    if !namespaces.is_empty() {
        block.push("namespaces", Document::new().with("names", namespaces));
    }

    let Some(api_server) = options.discovery.api_server.as_ref() else {
        return Ok(block);
    };

    block.push("api_server", api_server.host.as_str());
    Authentication::for_api_server(api_server, credentials)?.append_to(&mut block);
    Ok(build_tls_block(block, "", api_server.tls_config.as_ref(), &options.tls_assets))
}

fn push_scrape_settings(document: &mut Document, endpoint: &Endpoint) {
    let settings = [
        ("scrape_interval", &endpoint.interval),
        ("scrape_timeout", &endpoint.scrape_timeout),
        ("metrics_path", &endpoint.path),
        ("proxy_url", &endpoint.proxy_url)
    ];
    for (key, value) in settings {
        if let Some(value) = value.as_deref().filter(|value| !value.is_empty()) {
            document.push(key, value);
        }
    }

    if !endpoint.params.is_empty() {
        let mut params = Document::new();
        for (name, values) in &endpoint.params {
            params.push(name, values.clone());
        }
        document.push("params", params);
    }

    if let Some(scheme) = endpoint.scheme.as_deref().filter(|value| !value.is_empty()) {
        document.push("scheme", scheme);
    }
}
