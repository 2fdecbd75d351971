//! Input document types describing scrape targets and their credentials.
//!
//! The types in this module mirror the resolved custom resources handed over
//! by the controller that watches the cluster. Field names follow the
//! snake_case spelling of the generated configuration and accept the
//! camelCase spelling of the resource manifests through serde aliases.

use std::{
    collections::{BTreeMap, HashMap},
    fmt
};

use serde::{Deserialize, Serialize};

/// Root input bundle consumed by the CLI.
///
/// # Examples
///
/// ```
/// use scrapegen::ScrapeInput;
///
/// let yaml = r#"
/// targets:
///   - namespace: default
///     name: web
///     endpoints:
///       - port: http
/// "#;
/// let input: ScrapeInput = serde_yaml::from_str(yaml).expect("valid input");
/// assert_eq!(input.targets.len(), 1);
/// assert_eq!(input.targets[0].endpoints.len(), 1);
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScrapeInput {
    /// Scrape targets to compile, in output order.
    #[serde(default)]
    pub targets: Vec<ScrapeTarget>,

    /// Pre-resolved credential lookup tables.
    #[serde(default)]
    pub credentials: Credentials,

    /// Service discovery settings shared by every target.
    #[serde(default)]
    pub discovery: DiscoveryConfig
}

/// Scrape target selecting services in a namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScrapeTarget {
    /// Namespace owning the target resource.
    pub namespace: String,

    /// Name of the target resource.
    pub name: String,

    /// Namespaces the selected services may live in.
    #[serde(default, alias = "namespaceSelector")]
    pub namespace_selector: NamespaceSelector,

    /// Service label whose value replaces the derived `job` label.
    #[serde(default, alias = "jobLabel")]
    pub job_label: Option<String>,

    /// Service labels copied onto every scraped target.
    #[serde(default, alias = "targetLabels")]
    pub target_labels: Vec<String>,

    /// Pod labels copied onto every scraped target.
    #[serde(default, alias = "podTargetLabels")]
    pub pod_target_labels: Vec<String>,

    /// Endpoints compiled into one job each, in index order.
    #[serde(default)]
    pub endpoints: Vec<Endpoint>
}

impl ScrapeTarget {
    /// Returns the job name of the endpoint at `index`.
    ///
    /// # Examples
    ///
    /// ```
    /// use scrapegen::ScrapeTarget;
    ///
    /// let target = ScrapeTarget {
    ///     namespace: "default".to_owned(),
    ///     name: "test-scrape".to_owned(),
    ///     ..ScrapeTarget::default()
    /// };
    /// assert_eq!(target.job_name(0), "default/test-scrape/0");
    /// ```
    pub fn job_name(&self, index: usize) -> String {
        format!("{}/{}/{index}", self.namespace, self.name)
    }

    /// Returns the credential table key of the endpoint at `index`.
    pub fn credential_key(&self, index: usize) -> String {
        format!("serviceScrape/{}/{}/{index}", self.namespace, self.name)
    }
}

/// Namespace scoping requested by a target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct NamespaceSelector {
    /// Select services in every namespace.
    #[serde(default)]
    pub any: bool,

    /// Explicit namespaces to select services from.
    #[serde(default, alias = "matchNames")]
    pub match_names: Vec<String>
}

/// Single scrape endpoint of a target.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Endpoint {
    /// Port the endpoint is scraped on.
    pub port: PortSelector,

    /// Optional TLS material used when scraping.
    #[serde(default, alias = "tlsConfig")]
    pub tls_config: Option<TlsConfig>,

    /// Literal path to a bearer token file on the agent filesystem.
    #[serde(default, alias = "bearerTokenFile")]
    pub bearer_token_file: Option<String>,

    /// Secret holding the bearer token.
    #[serde(default, alias = "bearerTokenSecret")]
    pub bearer_token_secret: Option<KeySelector>,

    /// Secrets holding basic auth credentials.
    #[serde(default, alias = "basicAuth")]
    pub basic_auth: Option<BasicAuth>,

    /// Keep labels exposed by the target on conflict.
    #[serde(default, alias = "honorLabels")]
    pub honor_labels: bool,

    /// Keep timestamps exposed by the target. Unset leaves the agent default.
    #[serde(default, alias = "honorTimestamps")]
    pub honor_timestamps: Option<bool>,

    /// Scrape interval such as `30s`.
    #[serde(default)]
    pub interval: Option<String>,

    /// Scrape timeout such as `10s`.
    #[serde(default, alias = "scrapeTimeout")]
    pub scrape_timeout: Option<String>,

    /// HTTP path metrics are served on.
    #[serde(default)]
    pub path: Option<String>,

    /// HTTP scheme, `http` or `https`.
    #[serde(default)]
    pub scheme: Option<String>,

    /// Proxy used to reach the target.
    #[serde(default, alias = "proxyURL", alias = "proxyUrl")]
    pub proxy_url: Option<String>,

    /// Query parameters appended to the scrape request.
    #[serde(default)]
    pub params: BTreeMap<String, Vec<String>>,

    /// Per-scrape sample limit, zero disables the limit.
    #[serde(default, alias = "sampleLimit")]
    pub sample_limit: u64,

    /// Relabel rules appended after the generated pipeline.
    #[serde(default, alias = "relabelConfigs")]
    pub relabel_configs: Vec<RelabelConfig>,

    /// Relabel rules applied to scraped samples.
    #[serde(default, alias = "metricRelabelConfigs")]
    pub metric_relabel_configs: Vec<RelabelConfig>
}

impl Endpoint {
    /// Creates an endpoint on `port` with every optional setting unset.
    ///
    /// # Examples
    ///
    /// ```
    /// use scrapegen::{Endpoint, PortSelector};
    ///
    /// let endpoint = Endpoint::on_port("http");
    /// assert_eq!(endpoint.port, PortSelector::Name("http".to_owned()));
    /// assert!(endpoint.tls_config.is_none());
    /// ```
    pub fn on_port<P>(port: P) -> Self
    where
        P: Into<PortSelector>
    {
        Self {
            port:                   port.into(),
            tls_config:             None,
            bearer_token_file:      None,
            bearer_token_secret:    None,
            basic_auth:             None,
            honor_labels:           false,
            honor_timestamps:       None,
            interval:               None,
            scrape_timeout:         None,
            path:                   None,
            scheme:                 None,
            proxy_url:              None,
            params:                 BTreeMap::new(),
            sample_limit:           0,
            relabel_configs:        Vec::new(),
            metric_relabel_configs: Vec::new()
        }
    }
}

/// Port an endpoint is scraped on.
///
/// A YAML string selects the named service port, a YAML integer selects the
/// container port number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PortSelector {
    /// Container port number.
    Number(u16),
    /// Named service port.
    Name(String)
}

impl fmt::Display for PortSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Name(name) => f.write_str(name)
        }
    }
}

impl From<&str> for PortSelector {
    fn from(value: &str) -> Self {
        Self::Name(value.to_owned())
    }
}

impl From<String> for PortSelector {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

impl From<u16> for PortSelector {
    fn from(value: u16) -> Self {
        Self::Number(value)
    }
}

/// Reference to one key of a secret or config map in the target namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct KeySelector {
    /// Object name.
    pub name: String,
    /// Key within the object.
    pub key:  String
}

impl KeySelector {
    /// Creates a selector for `key` inside the object `name`.
    pub fn new<N, K>(name: N, key: K) -> Self
    where
        N: Into<String>,
        K: Into<String>
    {
        Self {
            name: name.into(),
            key:  key.into()
        }
    }
}

/// TLS material sourced either from a secret or from a config map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SecretOrConfigMap {
    /// Secret key holding the material.
    #[serde(default)]
    pub secret: Option<KeySelector>,

    /// Config map key holding the material.
    #[serde(default, alias = "configMap")]
    pub config_map: Option<KeySelector>
}

impl SecretOrConfigMap {
    /// Selector sourcing the material from a secret.
    pub fn secret(selector: KeySelector) -> Self {
        Self {
            secret:     Some(selector),
            config_map: None
        }
    }

    /// Selector sourcing the material from a config map.
    pub fn config_map(selector: KeySelector) -> Self {
        Self {
            secret:     None,
            config_map: Some(selector)
        }
    }

    /// Returns the referenced object, preferring the secret.
    pub fn reference(&self) -> Option<&KeySelector> {
        self.secret.as_ref().or(self.config_map.as_ref())
    }
}

/// TLS settings of an endpoint or of the API server connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Skip verification of the server certificate.
    #[serde(default, alias = "insecureSkipVerify")]
    pub insecure_skip_verify: bool,

    /// Certificate authority bundle.
    #[serde(default)]
    pub ca: SecretOrConfigMap,

    /// Client certificate.
    #[serde(default)]
    pub cert: SecretOrConfigMap,

    /// Secret holding the client key.
    #[serde(default, alias = "keySecret")]
    pub key_secret: Option<KeySelector>,

    /// Server name used for verification.
    #[serde(default, alias = "serverName")]
    pub server_name: Option<String>
}

/// Secret references holding basic auth credentials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BasicAuth {
    /// Secret key holding the username.
    pub username: KeySelector,
    /// Secret key holding the password.
    pub password: KeySelector
}

/// Relabel rule supplied by the target author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RelabelConfig {
    /// Labels whose values are concatenated and matched.
    #[serde(default, alias = "sourceLabels")]
    pub source_labels: Vec<String>,

    /// Separator placed between concatenated source values.
    #[serde(default)]
    pub separator: Option<String>,

    /// Label receiving the replacement.
    #[serde(default, alias = "targetLabel")]
    pub target_label: Option<String>,

    /// Regular expression matched against the concatenated value.
    #[serde(default)]
    pub regex: Option<String>,

    /// Modulus used by the `hashmod` action.
    #[serde(default)]
    pub modulus: Option<u64>,

    /// Replacement template.
    #[serde(default)]
    pub replacement: Option<String>,

    /// Relabel action.
    #[serde(default)]
    pub action: Option<String>
}

/// Resolved basic auth credentials.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BasicAuthCredentials {
    /// Resolved username.
    pub username: String,
    /// Resolved password.
    pub password: String
}

/// Credential lookup tables filled by the secret-reading controller.
///
/// Endpoint credentials are keyed by
/// [`ScrapeTarget::credential_key`]; the API server basic auth entry is
/// keyed by [`API_SERVER_CREDENTIAL_KEY`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Credentials {
    /// Basic auth credentials by lookup key.
    #[serde(default, alias = "basicAuth")]
    pub basic_auth: HashMap<String, BasicAuthCredentials>,

    /// Bearer tokens by lookup key.
    #[serde(default, alias = "bearerTokens")]
    pub bearer_tokens: HashMap<String, String>
}

/// Lookup key of the API server basic auth credentials.
pub const API_SERVER_CREDENTIAL_KEY: &str = "apiserver";

/// Kubernetes service discovery role used to enumerate scrape candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryRole {
    /// Discover targets from `Endpoints` objects.
    #[default]
    Endpoints,
    /// Discover targets from `EndpointSlice` objects.
    #[serde(alias = "endpointslice")]
    EndpointSlices
}

impl DiscoveryRole {
    /// Role name written into `kubernetes_sd_configs`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Endpoints => "endpoints",
            Self::EndpointSlices => "endpointslices"
        }
    }

    /// Meta label holding the discovered port name.
    pub fn port_name_label(self) -> &'static str {
        match self {
            Self::Endpoints => "__meta_kubernetes_endpoint_port_name",
            Self::EndpointSlices => "__meta_kubernetes_endpointslice_port_name"
        }
    }

    /// Meta label holding the kind of the object backing an address.
    pub fn target_kind_label(self) -> &'static str {
        match self {
            Self::Endpoints => "__meta_kubernetes_endpoint_address_target_kind",
            Self::EndpointSlices => "__meta_kubernetes_endpointslice_address_target_kind"
        }
    }

    /// Meta label holding the name of the object backing an address.
    pub fn target_name_label(self) -> &'static str {
        match self {
            Self::Endpoints => "__meta_kubernetes_endpoint_address_target_name",
            Self::EndpointSlices => "__meta_kubernetes_endpointslice_address_target_name"
        }
    }
}

/// Service discovery settings shared by all compiled jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DiscoveryConfig {
    /// Discovery role.
    #[serde(default)]
    pub role: DiscoveryRole,

    /// Explicit API server connection, in-cluster config when unset.
    #[serde(default, alias = "apiServer", alias = "apiserver")]
    pub api_server: Option<ApiServerConfig>
}

/// Connection settings for an out-of-cluster API server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiServerConfig {
    /// API server URL.
    pub host: String,

    /// Secret references holding basic auth credentials.
    #[serde(default, alias = "basicAuth")]
    pub basic_auth: Option<BasicAuth>,

    /// Literal bearer token.
    #[serde(default, alias = "bearerToken")]
    pub bearer_token: Option<String>,

    /// Path to a bearer token file.
    #[serde(default, alias = "bearerTokenFile")]
    pub bearer_token_file: Option<String>,

    /// TLS settings of the API server connection.
    #[serde(default, alias = "tlsConfig")]
    pub tls_config: Option<TlsConfig>
}
