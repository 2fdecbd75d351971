//! Command-line interface for the scrapegen binary.
//!
//! The CLI compiles a YAML bundle of scrape targets and credential tables
//! into the `scrape_configs` document read by the collection agent, or prints
//! the job document of a single endpoint for inspection.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    process
};

use clap::{ArgAction, Args, Parser, Subcommand};
use scrapegen::{
    CompileOptions, DEFAULT_TLS_ASSETS_DIR, Error, FailurePolicy, ScrapeInput, TlsAssetPaths,
    compile, generate_scrape_config, io_error, load_input
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command line interface for compiling scrape targets.
#[derive(Debug, Parser)]
#[command(name = "scrapegen", version, about = "Compile scrape targets into agent configuration")]
struct Cli {
    #[command(subcommand)]
    command: Command
}

/// Supported commands exposed by the CLI.
#[derive(Debug, Subcommand)]
enum Command {
    /// Compile every target of an input bundle into `scrape_configs`.
    Compile(CompileArgs),
    /// Print the job document of a single endpoint.
    Job(JobArgs)
}

/// Cluster-wide compilation settings shared by all subcommands.
#[derive(Debug, Args)]
struct CompileSettings {
    /// Path to the YAML input bundle.
    #[arg(long = "input", value_name = "PATH")]
    input: PathBuf,

    /// Directory TLS material is mounted under on the agent.
    #[arg(
        long = "tls-assets-dir",
        value_name = "DIR",
        env = "SCRAPEGEN_TLS_ASSETS_DIR",
        default_value = DEFAULT_TLS_ASSETS_DIR
    )]
    tls_assets_dir: String,

    /// Force honor_labels to false on every job.
    #[arg(long = "override-honor-labels", action = ArgAction::SetTrue, env = "SCRAPEGEN_OVERRIDE_HONOR_LABELS")]
    override_honor_labels: bool,

    /// Force honor_timestamps to false on every job.
    #[arg(long = "override-honor-timestamps", action = ArgAction::SetTrue, env = "SCRAPEGEN_OVERRIDE_HONOR_TIMESTAMPS")]
    override_honor_timestamps: bool,

    /// Discover services in every namespace.
    #[arg(long = "ignore-namespace-selectors", action = ArgAction::SetTrue, env = "SCRAPEGEN_IGNORE_NAMESPACE_SELECTORS")]
    ignore_namespace_selectors: bool,

    /// Label pinned to the target namespace on every series.
    #[arg(long = "enforced-namespace-label", value_name = "LABEL", env = "SCRAPEGEN_ENFORCED_NAMESPACE_LABEL")]
    enforced_namespace_label: Option<String>
}

/// Arguments accepted by the `compile` subcommand.
#[derive(Debug, Args)]
struct CompileArgs {
    #[command(flatten)]
    settings: CompileSettings,

    /// File receiving the configuration, stdout when omitted.
    #[arg(long = "output", value_name = "PATH")]
    output: Option<PathBuf>,

    /// Skip endpoints that fail to compile instead of aborting.
    #[arg(long = "skip-invalid", action = ArgAction::SetTrue)]
    skip_invalid: bool
}

/// Arguments accepted by the `job` subcommand.
#[derive(Debug, Args)]
struct JobArgs {
    #[command(flatten)]
    settings: CompileSettings,

    /// Target identity as `<namespace>/<name>`.
    #[arg(long = "target", value_name = "NAMESPACE/NAME")]
    target: String,

    /// Endpoint index within the target.
    #[arg(long = "endpoint", value_name = "INDEX", default_value_t = 0)]
    endpoint: usize
}

impl CompileSettings {
    /// Builds compile options for `input` from the command line settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the TLS assets directory is blank,
    /// since resolved paths would then not match the mounted material.
    fn options(&self, input: &ScrapeInput) -> Result<CompileOptions, Error> {
        if self.tls_assets_dir.trim().is_empty() {
            return Err(Error::validation("tls assets directory cannot be empty"));
        }

        Ok(CompileOptions {
            discovery:                  input.discovery.clone(),
            tls_assets:                 TlsAssetPaths::new(self.tls_assets_dir.as_str()),
            override_honor_labels:      self.override_honor_labels,
            override_honor_timestamps:  self.override_honor_timestamps,
            ignore_namespace_selectors: self.ignore_namespace_selectors,
            enforced_namespace_label:   self
                .enforced_namespace_label
                .as_deref()
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .map(str::to_owned)
        })
    }
}

/// Entry point that reports errors and sets the appropriate exit status.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    if let Err(error) = run() {
        eprintln!("{}", error.to_display_string());
        process::exit(1);
    }
}

/// Executes the CLI using parsed arguments.
///
/// # Errors
///
/// Propagates errors originating from input loading and compilation.
fn run() -> Result<(), Error> {
    let cli = Cli::parse();

    match cli.command {
        Command::Compile(args) => run_compile(&args),
        Command::Job(args) => run_job(&args)
    }
}

fn run_compile(args: &CompileArgs) -> Result<(), Error> {
    let rendered = compile_to_string(args)?;

    match args.output.as_deref() {
        Some(path) => write_output(path, &rendered),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(rendered.as_bytes())
                .map_err(|source| io_error(Path::new("<stdout>"), source))
        }
    }
}

fn compile_to_string(args: &CompileArgs) -> Result<String, Error> {
    let input = load_input(&args.settings.input)?;
    let options = args.settings.options(&input)?;
    let policy = if args.skip_invalid {
        FailurePolicy::SkipEndpoint
    } else {
        FailurePolicy::FailFast
    };

    compile(&input, &options, policy)?.render()
}

fn write_output(path: &Path, rendered: &str) -> Result<(), Error> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
    }
    fs::write(path, rendered).map_err(|source| io_error(path, source))?;
    info!("Wrote scrape configuration to {}", path.display());
    Ok(())
}

fn run_job(args: &JobArgs) -> Result<(), Error> {
    let rendered = render_job(args)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(rendered.as_bytes())
        .map_err(|source| io_error(Path::new("<stdout>"), source))
}

fn render_job(args: &JobArgs) -> Result<String, Error> {
    let input = load_input(&args.settings.input)?;
    let options = args.settings.options(&input)?;

    let (namespace, name) = args.target.split_once('/').ok_or_else(|| {
        Error::validation(format!("target '{}' must have the form <namespace>/<name>", args.target))
    })?;
    let target = input
        .targets
        .iter()
        .find(|candidate| candidate.namespace == namespace && candidate.name == name)
        .ok_or_else(|| Error::validation(format!("target '{}' was not found", args.target)))?;
    let endpoint = target.endpoints.get(args.endpoint).ok_or_else(|| {
        Error::validation(format!(
            "target '{}' has no endpoint at index {}",
            args.target, args.endpoint
        ))
    })?;

    generate_scrape_config(target, endpoint, args.endpoint, &options, &input.credentials)?.to_yaml()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use clap::Parser;
    use tempfile::tempdir;

    use super::{Cli, Command, compile_to_string, render_job, run_compile};

    const INPUT: &str = r#"
targets:
  - namespace: default
    name: test-scrape
    endpoints:
      - port: "8080"
        bearer_token_file: /var/run/tolen
      - port: metrics
        bearer_token_secret:
          name: token
          key: value
"#;

    fn write_input(dir: &std::path::Path) -> String {
        let path = dir.join("scrapes.yaml");
        fs::write(&path, INPUT).expect("failed to write input");
        path.to_str().expect("utf8").to_owned()
    }

    #[test]
    fn compile_defaults_to_fail_fast_and_default_root() {
        let cli = Cli::try_parse_from([env!("CARGO_PKG_NAME"), "compile", "--input", "in.yaml"])
            .expect("failed to parse CLI");

        let args = match cli.command {
            Command::Compile(args) => args,
            other => panic!("unexpected command variant: {other:?}")
        };
        assert!(!args.skip_invalid);
        assert!(args.output.is_none());
        assert_eq!(args.settings.tls_assets_dir, "/etc/vmagent-tls/certs");
        assert!(args.settings.enforced_namespace_label.is_none());
    }

    #[test]
    fn compile_fails_fast_on_missing_token() {
        let temp = tempdir().expect("failed to create tempdir");
        let input = write_input(temp.path());

        let cli = Cli::try_parse_from([env!("CARGO_PKG_NAME"), "compile", "--input", &input])
            .expect("failed to parse CLI");
        let Command::Compile(args) = cli.command else {
            panic!("expected compile command");
        };

        let error = compile_to_string(&args).expect_err("missing token must fail");
        assert!(matches!(error, scrapegen::Error::MissingCredential { .. }));
    }

    #[test]
    fn compile_skip_invalid_writes_remaining_jobs() {
        let temp = tempdir().expect("failed to create tempdir");
        let input = write_input(temp.path());
        let output = temp.path().join("out").join("scrape.yaml");

        let cli = Cli::try_parse_from([
            env!("CARGO_PKG_NAME"),
            "compile",
            "--input",
            &input,
            "--skip-invalid",
            "--tls-assets-dir",
            "/mnt/tls",
            "--output",
            output.to_str().expect("utf8")
        ])
        .expect("failed to parse CLI");
        let Command::Compile(args) = cli.command else {
            panic!("expected compile command");
        };

        run_compile(&args).expect("compile should succeed");
        let rendered = fs::read_to_string(&output).expect("output written");
        assert!(rendered.starts_with("scrape_configs:\n- job_name: default/test-scrape/0\n"));
        assert!(!rendered.contains("default/test-scrape/1"));
    }

    #[test]
    fn compile_rejects_empty_tls_assets_dir() {
        let temp = tempdir().expect("failed to create tempdir");
        let input = write_input(temp.path());

        let cli = Cli::try_parse_from([
            env!("CARGO_PKG_NAME"),
            "compile",
            "--input",
            &input,
            "--skip-invalid",
            "--tls-assets-dir",
            ""
        ])
        .expect("failed to parse CLI");
        let Command::Compile(args) = cli.command else {
            panic!("expected compile command");
        };

        let error = compile_to_string(&args).expect_err("empty root must fail");
        match error {
            scrapegen::Error::Validation {
                message
            } => assert_eq!(message, "tls assets directory cannot be empty"),
            other => panic!("unexpected error variant: {other:?}")
        }
    }

    #[test]
    fn job_renders_single_endpoint() {
        let temp = tempdir().expect("failed to create tempdir");
        let input = write_input(temp.path());

        let cli = Cli::try_parse_from([
            env!("CARGO_PKG_NAME"),
            "job",
            "--input",
            &input,
            "--target",
            "default/test-scrape",
            "--ignore-namespace-selectors"
        ])
        .expect("failed to parse CLI");
        let Command::Job(args) = cli.command else {
            panic!("expected job command");
        };

        let rendered = render_job(&args).expect("job should render");
        assert!(rendered.starts_with(
            "job_name: default/test-scrape/0\nhonor_labels: false\nkubernetes_sd_configs:\n- role: endpoints\nbearer_token_file: /var/run/tolen\n"
        ));
    }

    #[test]
    fn job_reports_unknown_target() {
        let temp = tempdir().expect("failed to create tempdir");
        let input = write_input(temp.path());

        let cli = Cli::try_parse_from([
            env!("CARGO_PKG_NAME"),
            "job",
            "--input",
            &input,
            "--target",
            "default/missing"
        ])
        .expect("failed to parse CLI");
        let Command::Job(args) = cli.command else {
            panic!("expected job command");
        };

        let error = render_job(&args).expect_err("unknown target must fail");
        assert!(error.to_string().contains("target 'default/missing' was not found"));
    }

    #[test]
    fn job_accepts_endpoint_index() {
        let cli = Cli::try_parse_from([
            env!("CARGO_PKG_NAME"),
            "job",
            "--input",
            "in.yaml",
            "--target",
            "just-a-name",
            "--endpoint",
            "2"
        ])
        .expect("failed to parse CLI");
        let Command::Job(args) = cli.command else {
            panic!("expected job command");
        };
        assert_eq!(args.endpoint, 2);
    }
}
