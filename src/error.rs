#![allow(non_shorthand_field_patterns)]
#![doc = "Error handling primitives shared across the scrape compiler."]
// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! The derive emitted by [`masterror::Error`] expands pattern matches that
//! trigger the `non_shorthand_field_patterns` lint. The lint is disabled for
//! the module to keep the generated implementations warning-free.

use std::path::{Path, PathBuf};

/// Unified error type returned by the compiler, the input loader and the CLI.
///
/// Credential variants carry the lookup key only, never the resolved secret
/// material.
#[derive(Debug, masterror::Error)]
pub enum Error {
    /// Wraps I/O errors that occur while reading inputs or writing output.
    #[error("failed to access {path:?}: {source}")]
    Io {
        /// Location of the file being read or written.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error
    },
    /// Wraps YAML decoding errors for the input bundle.
    #[error("failed to parse scrape input: {source}")]
    Parse {
        /// Source decoding error from serde_yaml.
        source: serde_yaml::Error
    },
    /// Returned when an assembled document cannot be rendered.
    #[error("failed to render scrape configuration: {source}")]
    Render {
        /// Underlying serialization error from serde_yaml.
        source: serde_yaml::Error
    },
    /// Returned when the input violates invariants.
    #[error("invalid scrape input: {message}")]
    Validation {
        /// Human readable message describing the validation problem.
        message: String
    },
    /// Returned when an endpoint references a credential that is absent from
    /// the supplied lookup tables.
    #[error("{kind} credential '{key}' was not found in the lookup table")]
    MissingCredential {
        /// Credential family, either `basic auth` or `bearer token`.
        kind: &'static str,
        /// Lookup key that produced no entry.
        key:  String
    },
    /// Returned when an endpoint configures more than one authentication
    /// source.
    #[error(
        "endpoint '{job}' sets more than one of bearer_token_file, bearer_token_secret and basic_auth"
    )]
    AmbiguousAuthentication {
        /// Job name identifying the offending endpoint.
        job: String
    }
}

impl Error {
    /// Constructs a validation error from the provided displayable value.
    ///
    /// # Parameters
    ///
    /// * `message` - Human-readable description of the validation failure.
    pub fn validation<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Validation {
            message: message.into()
        }
    }

    /// Constructs a missing credential error for the given lookup key.
    pub fn missing_credential<K>(kind: &'static str, key: K) -> Self
    where
        K: Into<String>
    {
        Self::MissingCredential {
            kind,
            key: key.into()
        }
    }

    /// Formats the error for diagnostics without the variant name.
    ///
    /// The returned string matches the [`std::fmt::Display`] implementation.
    pub fn to_display_string(&self) -> String {
        format!("{self}")
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(source: serde_yaml::Error) -> Self {
        Self::Parse {
            source
        }
    }
}

/// Creates an [`Error::Io`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location of the file that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source
    }
}

/// Creates an [`Error::Render`] variant from a serialization failure.
pub fn render_error(source: serde_yaml::Error) -> Error {
    Error::Render {
        source
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn validation_constructor_populates_message() {
        let error = Error::validation("something went wrong");
        match error {
            Error::Validation {
                ref message
            } => {
                assert_eq!(message, "something went wrong");
            }
            other => panic!("expected validation error, got {other:?}")
        }
    }

    #[test]
    fn to_display_string_matches_display() {
        let error = Error::validation("display me");
        assert_eq!(error.to_string(), error.to_display_string());
    }

    #[test]
    fn io_error_helper_wraps_path_and_source() {
        let path = std::path::Path::new("/tmp/scrapes.yaml");
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error = super::io_error(path, io_error);

        match error {
            Error::Io {
                path: ref stored_path,
                ref source
            } => {
                assert_eq!(stored_path, path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected io error, got {other:?}")
        }
    }

    #[test]
    fn serde_yaml_conversion_maps_to_parse_variant() {
        let error = serde_yaml::from_str::<usize>("not-a-number").unwrap_err();
        let mapped: Error = error.into();
        assert!(matches!(mapped, Error::Parse { .. }));
    }

    #[test]
    fn render_error_helper_maps_to_render_variant() {
        let error = serde_yaml::from_str::<usize>("still-not-a-number").unwrap_err();
        assert!(matches!(super::render_error(error), Error::Render { .. }));
    }

    #[test]
    fn missing_credential_message_names_the_key() {
        let error = Error::missing_credential("basic auth", "serviceScrape/default/web/0");
        assert_eq!(
            error.to_string(),
            "basic auth credential 'serviceScrape/default/web/0' was not found in the lookup table"
        );
    }

    #[test]
    fn ambiguous_authentication_names_the_endpoint() {
        let error = Error::AmbiguousAuthentication {
            job: "default/web/1".to_owned()
        };
        assert!(error.to_string().contains("'default/web/1'"));
    }
}
