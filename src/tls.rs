// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Construction of the `tls_config` block.

use crate::{assets::TlsAssetPaths, config::TlsConfig, document::Document};

/// Appends a `tls_config` entry describing `tls` to `document`.
///
/// The nested block always starts with `insecure_skip_verify`, followed by
/// `ca_file`, `cert_file` and `key_file` for each reference that is present,
/// and `server_name` when set. Absent references are omitted rather than
/// rendered empty. When `tls` is `None` the document is returned unchanged.
///
/// # Examples
///
/// ```
/// use scrapegen::{Document, KeySelector, SecretOrConfigMap, TlsAssetPaths, TlsConfig, build_tls_block};
///
/// let tls = TlsConfig {
///     ca: SecretOrConfigMap::secret(KeySelector::new("tls-secret", "ca")),
///     ..TlsConfig::default()
/// };
/// let document = build_tls_block(Document::new(), "default", Some(&tls), &TlsAssetPaths::default());
/// assert_eq!(
///     document.to_yaml()?,
///     "tls_config:\n  insecure_skip_verify: false\n  ca_file: /etc/vmagent-tls/certs/default_tls-secret_ca\n"
/// );
/// # Ok::<(), scrapegen::Error>(())
/// ```
pub fn build_tls_block(
    mut document: Document,
    namespace: &str,
    tls: Option<&TlsConfig>,
    paths: &TlsAssetPaths
) -> Document {
    let Some(tls) = tls else {
        return document;
    };

    let mut block = Document::new().with("insecure_skip_verify", tls.insecure_skip_verify);

    if let Some(ca) = tls.ca.reference() {
        block.push("ca_file", paths.resolve(namespace, &ca.name, &ca.key));
    }
    if let Some(cert) = tls.cert.reference() {
        block.push("cert_file", paths.resolve(namespace, &cert.name, &cert.key));
    }
    if let Some(key) = tls.key_secret.as_ref() {
        block.push("key_file", paths.resolve(namespace, &key.name, &key.key));
    }
    if let Some(server_name) = tls.server_name.as_deref().filter(|name| !name.is_empty()) {
        block.push("server_name", server_name);
    }

    document.push("tls_config", block);
    document
}
