// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Mount paths of TLS material referenced by scrape endpoints.
//!
//! The component delivering secrets to the agent mounts every referenced key
//! under a shared root using the same naming scheme, so both sides must agree
//! on the root byte for byte.

/// Mount root used when none is configured.
pub const DEFAULT_TLS_ASSETS_DIR: &str = "/etc/vmagent-tls/certs";

/// Resolver of on-disk paths for mounted secret and config map keys.
///
/// Paths have the shape `<root>/<namespace>_<object>_<key>`. Kubernetes
/// namespace and object names never contain `_`, so distinct references map
/// to distinct paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsAssetPaths {
    root: String
}

impl TlsAssetPaths {
    /// Creates a resolver mounting assets below `root`.
    ///
    /// Trailing slashes are dropped so `/certs/` and `/certs` agree.
    pub fn new<R>(root: R) -> Self
    where
        R: Into<String>
    {
        let mut root = root.into();
        while root.len() > 1 && root.ends_with('/') {
            root.pop();
        }
        Self {
            root
        }
    }

    /// Returns the configured mount root.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Resolves the mount path of `key` inside `object` in `namespace`.
    ///
    /// # Examples
    ///
    /// ```
    /// use scrapegen::TlsAssetPaths;
    ///
    /// let paths = TlsAssetPaths::default();
    /// assert_eq!(
    ///     paths.resolve("default", "tls-secret", "ca"),
    ///     "/etc/vmagent-tls/certs/default_tls-secret_ca"
    /// );
    /// ```
    pub fn resolve(&self, namespace: &str, object: &str, key: &str) -> String {
        let separator = if self.root.ends_with('/') { "" } else { "/" };
        format!("{}{separator}{namespace}_{object}_{key}", self.root)
    }
}

impl Default for TlsAssetPaths {
    fn default() -> Self {
        Self::new(DEFAULT_TLS_ASSETS_DIR)
    }
}
