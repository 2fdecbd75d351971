// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Authentication blocks of scrape jobs.
//!
//! Endpoints arrive with three independently optional credential fields.
//! [`AuthReference`] converts them into a single variant, rejecting inputs
//! that set more than one, and [`Authentication`] is the resolved form
//! written into the job document.

use crate::{
    config::{API_SERVER_CREDENTIAL_KEY, ApiServerConfig, Credentials, Endpoint},
    document::Document,
    error::Error
};

/// Unresolved authentication source of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthReference<'input> {
    /// No authentication.
    None,
    /// Literal token file path on the agent filesystem.
    TokenFile(&'input str),
    /// Bearer token stored in a secret.
    TokenSecret,
    /// Basic auth credentials stored in secrets.
    BasicAuth
}

impl<'input> AuthReference<'input> {
    /// Validates the credential fields of `endpoint`.
    ///
    /// Blank token file paths count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AmbiguousAuthentication`] naming `job` when more than
    /// one source is configured.
    pub fn from_endpoint(endpoint: &'input Endpoint, job: &str) -> Result<Self, Error> {
        let token_file = endpoint
            .bearer_token_file
            .as_deref()
            .filter(|path| !path.trim().is_empty());

        let mut sources = [
            token_file.map(Self::TokenFile),
            endpoint.bearer_token_secret.as_ref().map(|_| Self::TokenSecret),
            endpoint.basic_auth.as_ref().map(|_| Self::BasicAuth)
        ]
        .into_iter()
        .flatten();

        let reference = sources.next().unwrap_or(Self::None);
        if sources.next().is_some() {
            return Err(Error::AmbiguousAuthentication {
                job: job.to_owned()
            });
        }
        Ok(reference)
    }

    /// Resolves the reference against the credential tables under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCredential`] when the table has no entry for
    /// `key`. An empty credential block is never produced in its place.
    pub fn resolve(self, key: &str, credentials: &Credentials) -> Result<Authentication, Error> {
        match self {
            Self::None => Ok(Authentication::None),
            Self::TokenFile(path) => Ok(Authentication::TokenFile(path.to_owned())),
            Self::TokenSecret => credentials
                .bearer_tokens
                .get(key)
                .map(|token| Authentication::Token(token.clone()))
                .ok_or_else(|| Error::missing_credential("bearer token", key)),
            Self::BasicAuth => credentials
                .basic_auth
                .get(key)
                .map(|basic| Authentication::BasicAuth {
                    username: basic.username.clone(),
                    password: basic.password.clone()
                })
                .ok_or_else(|| Error::missing_credential("basic auth", key))
        }
    }
}

/// Resolved authentication written into a scrape job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    /// No authentication.
    None,
    /// `bearer_token_file` pass-through.
    TokenFile(String),
    /// Resolved `bearer_token`.
    Token(String),
    /// Resolved `basic_auth` block.
    BasicAuth {
        /// Resolved username.
        username: String,
        /// Resolved password.
        password: String
    }
}

impl Authentication {
    /// Resolves the authentication of the endpoint compiled as `job`.
    ///
    /// # Errors
    ///
    /// See [`AuthReference::from_endpoint`] and [`AuthReference::resolve`].
    pub fn for_endpoint(
        endpoint: &Endpoint,
        job: &str,
        key: &str,
        credentials: &Credentials
    ) -> Result<Self, Error> {
        AuthReference::from_endpoint(endpoint, job)?.resolve(key, credentials)
    }

    /// Resolves the authentication of the API server connection.
    ///
    /// The token is stored inline in the discovery settings; basic auth is
    /// looked up under [`API_SERVER_CREDENTIAL_KEY`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::AmbiguousAuthentication`] when more than one source is
    /// set and [`Error::MissingCredential`] when basic auth is not resolved.
    pub fn for_api_server(config: &ApiServerConfig, credentials: &Credentials) -> Result<Self, Error> {
        let token_file = config
            .bearer_token_file
            .as_deref()
            .filter(|path| !path.trim().is_empty());
        let token = config.bearer_token.as_deref().filter(|token| !token.is_empty());

        let configured = [token_file.is_some(), token.is_some(), config.basic_auth.is_some()];
        if configured.iter().filter(|set| **set).count() > 1 {
            return Err(Error::AmbiguousAuthentication {
                job: API_SERVER_CREDENTIAL_KEY.to_owned()
            });
        }

        if config.basic_auth.is_some() {
            return AuthReference::BasicAuth.resolve(API_SERVER_CREDENTIAL_KEY, credentials);
        }
        Ok(match (token, token_file) {
            (Some(token), _) => Self::Token(token.to_owned()),
            (None, Some(path)) => Self::TokenFile(path.to_owned()),
            (None, None) => Self::None
        })
    }

    /// Appends the authentication entry to `document`, if any.
    pub fn append_to(&self, document: &mut Document) {
        match self {
            Self::None => {}
            Self::TokenFile(path) => document.push("bearer_token_file", path),
            Self::Token(token) => document.push("bearer_token", token),
            Self::BasicAuth {
                username,
                password
            } => document.push(
                "basic_auth",
                Document::new().with("username", username).with("password", password)
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthReference, Authentication};
    use crate::{
        config::{ApiServerConfig, BasicAuth, BasicAuthCredentials, Credentials, Endpoint, KeySelector},
        document::Document,
        error::Error
    };

    const KEY: &str = "serviceScrape/default/web/0";

    fn basic_auth() -> BasicAuth {
        BasicAuth {
            username: KeySelector::new("web-auth", "user"),
            password: KeySelector::new("web-auth", "pass")
        }
    }

    fn credentials() -> Credentials {
        let mut credentials = Credentials::default();
        credentials.basic_auth.insert(
            KEY.to_owned(),
            BasicAuthCredentials {
                username: "admin".to_owned(),
                password: "s3cret".to_owned()
            }
        );
        credentials.bearer_tokens.insert(KEY.to_owned(), "token-value".to_owned());
        credentials
    }

    fn api_server() -> ApiServerConfig {
        ApiServerConfig {
            host:              "https://kubernetes.example:6443".to_owned(),
            basic_auth:        None,
            bearer_token:      None,
            bearer_token_file: None,
            tls_config:        None
        }
    }

    #[test]
    fn endpoint_without_credentials_has_no_authentication() {
        let endpoint = Endpoint::on_port("web");
        let auth = Authentication::for_endpoint(&endpoint, "default/web/0", KEY, &Credentials::default())
            .expect("no authentication is valid");
        assert_eq!(auth, Authentication::None);

        let mut document = Document::new();
        auth.append_to(&mut document);
        assert!(document.is_empty());
    }

    #[test]
    fn token_file_passes_through() {
        let endpoint = Endpoint {
            bearer_token_file: Some("/var/run/token".to_owned()),
            ..Endpoint::on_port("web")
        };
        let auth = Authentication::for_endpoint(&endpoint, "default/web/0", KEY, &Credentials::default())
            .expect("token file needs no lookup");
        assert_eq!(auth, Authentication::TokenFile("/var/run/token".to_owned()));
    }

    #[test]
    fn blank_token_file_counts_as_unset() {
        let endpoint = Endpoint {
            bearer_token_file: Some("  ".to_owned()),
            basic_auth: Some(basic_auth()),
            ..Endpoint::on_port("web")
        };
        let reference = AuthReference::from_endpoint(&endpoint, "default/web/0").expect("single source");
        assert_eq!(reference, AuthReference::BasicAuth);
    }

    #[test]
    fn bearer_token_secret_resolves_from_table() {
        let endpoint = Endpoint {
            bearer_token_secret: Some(KeySelector::new("web-token", "token")),
            ..Endpoint::on_port("web")
        };
        let auth = Authentication::for_endpoint(&endpoint, "default/web/0", KEY, &credentials())
            .expect("token should resolve");

        let mut document = Document::new();
        auth.append_to(&mut document);
        assert_eq!(document.to_yaml().expect("render"), "bearer_token: token-value\n");
    }

    #[test]
    fn basic_auth_resolves_username_then_password() {
        let endpoint = Endpoint {
            basic_auth: Some(basic_auth()),
            ..Endpoint::on_port("web")
        };
        let auth = Authentication::for_endpoint(&endpoint, "default/web/0", KEY, &credentials())
            .expect("basic auth should resolve");

        let mut document = Document::new();
        auth.append_to(&mut document);
        assert_eq!(
            document.to_yaml().expect("render"),
            "basic_auth:\n  username: admin\n  password: s3cret\n"
        );
    }

    #[test]
    fn missing_basic_auth_entry_is_an_error() {
        let endpoint = Endpoint {
            basic_auth: Some(basic_auth()),
            ..Endpoint::on_port("web")
        };
        let error = Authentication::for_endpoint(&endpoint, "default/web/0", KEY, &Credentials::default())
            .expect_err("missing credential must fail");

        match error {
            Error::MissingCredential {
                kind,
                key
            } => {
                assert_eq!(kind, "basic auth");
                assert_eq!(key, KEY);
            }
            other => panic!("unexpected error variant: {other:?}")
        }
    }

    #[test]
    fn missing_bearer_token_entry_is_an_error() {
        let endpoint = Endpoint {
            bearer_token_secret: Some(KeySelector::new("web-token", "token")),
            ..Endpoint::on_port("web")
        };
        let error = Authentication::for_endpoint(&endpoint, "default/web/0", KEY, &Credentials::default())
            .expect_err("missing credential must fail");
        assert!(matches!(error, Error::MissingCredential { kind: "bearer token", .. }));
    }

    #[test]
    fn multiple_sources_are_rejected_with_job_name() {
        let endpoint = Endpoint {
            bearer_token_file: Some("/var/run/token".to_owned()),
            basic_auth: Some(basic_auth()),
            ..Endpoint::on_port("web")
        };
        let error = AuthReference::from_endpoint(&endpoint, "default/web/2")
            .expect_err("ambiguous authentication must fail");

        match error {
            Error::AmbiguousAuthentication {
                job
            } => assert_eq!(job, "default/web/2"),
            other => panic!("unexpected error variant: {other:?}")
        }
    }

    #[test]
    fn ambiguity_is_reported_before_lookup() {
        let endpoint = Endpoint {
            bearer_token_secret: Some(KeySelector::new("web-token", "token")),
            basic_auth: Some(basic_auth()),
            ..Endpoint::on_port("web")
        };
        let error = Authentication::for_endpoint(&endpoint, "default/web/0", KEY, &Credentials::default())
            .expect_err("ambiguous authentication must fail");
        assert!(matches!(error, Error::AmbiguousAuthentication { .. }));
    }

    #[test]
    fn api_server_uses_inline_token() {
        let config = ApiServerConfig {
            bearer_token: Some("inline".to_owned()),
            ..api_server()
        };
        let auth = Authentication::for_api_server(&config, &Credentials::default()).expect("inline token");
        assert_eq!(auth, Authentication::Token("inline".to_owned()));
    }

    #[test]
    fn api_server_basic_auth_uses_apiserver_key() {
        let mut credentials = Credentials::default();
        credentials.basic_auth.insert(
            "apiserver".to_owned(),
            BasicAuthCredentials {
                username: "kube".to_owned(),
                password: "pass".to_owned()
            }
        );
        let config = ApiServerConfig {
            basic_auth: Some(basic_auth()),
            ..api_server()
        };

        let auth = Authentication::for_api_server(&config, &credentials).expect("basic auth resolves");
        assert_eq!(
            auth,
            Authentication::BasicAuth {
                username: "kube".to_owned(),
                password: "pass".to_owned()
            }
        );
    }

    #[test]
    fn api_server_rejects_token_and_token_file() {
        let config = ApiServerConfig {
            bearer_token: Some("inline".to_owned()),
            bearer_token_file: Some("/var/run/token".to_owned()),
            ..api_server()
        };
        let error = Authentication::for_api_server(&config, &Credentials::default())
            .expect_err("ambiguous api server authentication");
        assert!(matches!(error, Error::AmbiguousAuthentication { ref job } if job == "apiserver"));
    }
}
