//! Batch compilation of scrape targets into a complete agent configuration.
//!
//! Input bundles are validated before compilation so that every job name is
//! unique. Targets are compiled in parallel and collected in input order,
//! which keeps the rendered configuration byte-identical across runs.

use std::{collections::HashSet, fs, path::Path};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    config::{ScrapeInput, ScrapeTarget},
    document::Document,
    error::{self, Error},
    scrape::{CompileOptions, generate_scrape_config}
};

/// Reaction to an endpoint that fails to compile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the batch with the first error in input order.
    #[default]
    FailFast,
    /// Drop the offending endpoint and continue.
    SkipEndpoint
}

/// Endpoint left out of a compiled configuration.
#[derive(Debug)]
pub struct SkippedEndpoint {
    /// Job name the endpoint would have produced.
    pub job_name: String,
    /// Reason the endpoint was skipped.
    pub error:    Error
}

/// Result of compiling an input bundle.
#[derive(Debug, Default)]
pub struct CompiledConfig {
    /// Job documents in target order, then endpoint order.
    pub jobs:    Vec<Document>,
    /// Endpoints dropped under [`FailurePolicy::SkipEndpoint`].
    pub skipped: Vec<SkippedEndpoint>
}

impl CompiledConfig {
    /// Wraps the jobs into a `scrape_configs` document.
    pub fn to_document(&self) -> Document {
        Document::new().with("scrape_configs", self.jobs.clone())
    }

    /// Renders the configuration consumed by the agent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Render`](Error::Render) when serialization fails.
    pub fn render(&self) -> Result<String, Error> {
        self.to_document().to_yaml()
    }
}

/// Loads an input bundle from the provided YAML file path.
///
/// # Errors
///
/// Returns an [`Error`] when the file cannot be read, the YAML cannot be
/// deserialized, or the bundle violates invariants.
pub fn load_input(path: &Path) -> Result<ScrapeInput, Error> {
    debug!("Reading scrape input from {}", path.display());
    let contents = fs::read_to_string(path).map_err(|source| error::io_error(path, source))?;
    parse_input(&contents)
}

/// Parses an input bundle from the provided YAML document string.
///
/// # Errors
///
/// Propagates [`Error::Parse`](Error::Parse) when the YAML cannot be decoded
/// and [`Error::Validation`](Error::Validation) when targets are missing,
/// malformed or duplicated.
pub fn parse_input(contents: &str) -> Result<ScrapeInput, Error> {
    let input: ScrapeInput = serde_yaml::from_str(contents)?;
    if input.targets.is_empty() {
        return Err(Error::validation("input must include at least one target"));
    }

    validate_targets(&input.targets)?;
    Ok(input)
}

/// Checks target identities and rejects duplicates.
///
/// # Errors
///
/// Returns [`Error::Validation`](Error::Validation) when a namespace or name
/// is blank or contains whitespace, or when two targets share an identity.
fn validate_targets(targets: &[ScrapeTarget]) -> Result<(), Error> {
    let mut seen = HashSet::with_capacity(targets.len());

    for target in targets {
        validate_identifier(&target.namespace, "namespace")?;
        validate_identifier(&target.name, "name")?;
        if target.endpoints.is_empty() {
            return Err(Error::validation(format!(
                "target '{}/{}' must declare at least one endpoint",
                target.namespace, target.name
            )));
        }
        if !seen.insert((target.namespace.as_str(), target.name.as_str())) {
            return Err(Error::validation(format!(
                "duplicate target '{}/{}'",
                target.namespace, target.name
            )));
        }
    }

    Ok(())
}

/// Validates identifier-like fields such as namespaces or names.
///
/// # Errors
///
/// Returns [`Error::Validation`](Error::Validation) when the value is empty,
/// has surrounding whitespace or contains `/`, which would make job names
/// ambiguous.
fn validate_identifier(input: &str, field: &str) -> Result<(), Error> {
    if input.trim().is_empty() {
        return Err(Error::validation(format!("{field} cannot be empty")));
    }
    if input.chars().any(char::is_whitespace) {
        return Err(Error::validation(format!("{field} cannot contain whitespace")));
    }
    if input.contains('/') {
        return Err(Error::validation(format!("{field} cannot contain '/'")));
    }
    Ok(())
}

/// Compiles every endpoint of every target in `input`.
///
/// # Errors
///
/// Under [`FailurePolicy::FailFast`] returns the first endpoint error in
/// input order. Under [`FailurePolicy::SkipEndpoint`] never fails; offending
/// endpoints are reported in [`CompiledConfig::skipped`].
///
/// # Examples
///
/// ```
/// use scrapegen::{CompileOptions, FailurePolicy, compile, parse_input};
///
/// let input = parse_input(
///     r#"
/// targets:
///   - namespace: default
///     name: web
///     endpoints:
///       - port: http
/// "#,
/// )?;
/// let compiled = compile(&input, &CompileOptions::default(), FailurePolicy::FailFast)?;
/// assert_eq!(compiled.jobs.len(), 1);
/// assert!(compiled.render()?.starts_with("scrape_configs:\n- job_name: default/web/0\n"));
/// # Ok::<(), scrapegen::Error>(())
/// ```
pub fn compile(
    input: &ScrapeInput,
    options: &CompileOptions,
    policy: FailurePolicy
) -> Result<CompiledConfig, Error> {
    info!("Compiling {} scrape targets", input.targets.len());

    let results: Vec<Vec<(String, Result<Document, Error>)>> = input
        .targets
        .par_iter()
        .map(|target| {
            target
                .endpoints
                .iter()
                .enumerate()
                .map(|(index, endpoint)| {
                    let job = target.job_name(index);
                    let result =
                        generate_scrape_config(target, endpoint, index, options, &input.credentials);
                    (job, result)
                })
                .collect()
        })
        .collect();

    let mut compiled = CompiledConfig::default();
    for (job_name, result) in results.into_iter().flatten() {
        match result {
            Ok(document) => compiled.jobs.push(document),
            Err(error) => match policy {
                FailurePolicy::FailFast => return Err(error),
                FailurePolicy::SkipEndpoint => {
                    warn!("Skipping endpoint {}: {}", job_name, error);
                    compiled.skipped.push(SkippedEndpoint {
                        job_name,
                        error
                    });
                }
            }
        }
    }

    info!(
        "Compiled {} scrape jobs, skipped {} endpoints",
        compiled.jobs.len(),
        compiled.skipped.len()
    );
    Ok(compiled)
}
