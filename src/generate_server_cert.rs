//! Server Certificate Generation Module
//!
//! Generates a server key, a CSR for the requested Common Name, and a leaf
//! certificate built from that CSR and signed by the CA.
//!
//! ```text
//! CA (self-signed)
//!   └── Server Certificate (subject and public key taken from the CSR)
//! ```
//!
//! # Certificate Properties
//! - **Basic Constraints**: CA=false, critical
//! - **Subject Alternative Name**: one DNS entry per requested SAN, non-critical,
//!   omitted entirely when no SANs are requested
//! - **Issuer**: the CA certificate's subject
//! - **Signature**: SHA-256 with the CA's RSA key
//!
//! The CSR is signed with the server key as proof of possession. Its
//! signature is not checked before the certificate is built from it.

use anyhow::{anyhow, bail, Result};
use log::{debug, info};
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::stack::Stack;
use openssl::x509::extension::{BasicConstraints, SubjectAlternativeName};
use openssl::x509::{X509Extension, X509Req, X509ReqRef, X509};

use crate::configs::SubjectDefaults;
use crate::pki_generator::{
    build_name, generate_rsa_key, random_serial, validity_window, RSA_KEY_SIZE_DEFAULT,
    VALIDITY_DAYS_DEFAULT, X509_REQ_VERSION_1, X509_VERSION_3,
};

/// Everything produced for the server side of a run
pub struct ServerArtifacts {
    pub private_key: PKey<Private>,
    pub certificate: X509,
    pub csr: X509Req,
}

// ================= RSA Server Certificate Builder =================

/// Builder for a server key pair, its CSR and the CA-signed certificate
///
/// # Examples
/// ```rust,no_run
/// # use anyhow::Result;
/// # fn example() -> Result<()> {
/// use pki_certgen::configs::SubjectDefaults;
/// use pki_certgen::generate_root_ca::build_ca;
/// use pki_certgen::generate_server_cert::RsaServerCertBuilder;
///
/// let subject = SubjectDefaults::default();
/// let (ca_key, ca_cert) = build_ca(&subject, 365, 2048)?;
/// let server = RsaServerCertBuilder::new(&ca_key, &ca_cert, subject)
///     .subject_common_name("example.com".to_string())
///     .sans(vec!["example.com".to_string(), "www.example.com".to_string()])
///     .key_size(2048)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct RsaServerCertBuilder<'a> {
    subject_common_name: String,
    sans: Vec<String>,
    validity_days: u32,
    key_size: u32,
    subject: SubjectDefaults,
    signing_key: &'a PKey<Private>,
    signing_cert: &'a X509,
}

impl<'a> RsaServerCertBuilder<'a> {
    /// # Arguments
    /// * `ca_key` - CA private key that signs the server certificate
    /// * `ca_cert` - CA certificate, source of the issuer name
    /// * `subject` - Fixed subject fields; the server uses `server_organization`
    pub fn new(ca_key: &'a PKey<Private>, ca_cert: &'a X509, subject: SubjectDefaults) -> Self {
        Self {
            subject_common_name: String::new(),
            sans: Vec::new(),
            validity_days: VALIDITY_DAYS_DEFAULT,
            key_size: RSA_KEY_SIZE_DEFAULT,
            subject,
            signing_key: ca_key,
            signing_cert: ca_cert,
        }
    }

    /// Set the common name (CN) for the server certificate
    pub fn subject_common_name(mut self, cn: String) -> Self {
        self.subject_common_name = cn;
        self
    }

    /// DNS names for the Subject Alternative Name extension, kept in order
    pub fn sans(mut self, sans: Vec<String>) -> Self {
        self.sans = sans;
        self
    }

    pub fn validity_days(mut self, days: u32) -> Self {
        self.validity_days = days;
        self
    }

    pub fn key_size(mut self, bits: u32) -> Self {
        self.key_size = bits;
        self
    }

    /// Generate the server key, sign a CSR with it, then issue the
    /// certificate from the CSR using the CA key
    ///
    /// # Errors
    /// Returns error if:
    /// - The common name or any SAN is empty
    /// - RSA key generation fails
    /// - CSR or certificate construction or signing fails
    pub fn build(self) -> Result<ServerArtifacts> {
        if self.subject_common_name.is_empty() {
            bail!("Server common name must not be empty");
        }
        if self.sans.iter().any(|san| san.is_empty()) {
            bail!("Subject alternative names must not be empty");
        }

        debug!("Generating {}-bit RSA key for the server", self.key_size);
        let private_key = generate_rsa_key(self.key_size)?;

        let csr = self.build_csr(&private_key)?;
        let certificate = self.sign_csr(&csr)?;

        info!(
            "Signed server certificate for '{}' with {} SAN entries",
            self.subject_common_name,
            self.sans.len()
        );
        Ok(ServerArtifacts {
            private_key,
            certificate,
            csr,
        })
    }

    fn build_csr(&self, private_key: &PKey<Private>) -> Result<X509Req> {
        let mut builder =
            X509Req::builder().map_err(|e| anyhow!("Failed to create CSR builder: {}", e))?;

        builder
            .set_version(X509_REQ_VERSION_1)
            .map_err(|e| anyhow!("Failed to set CSR version: {}", e))?;

        let name = build_name(
            &self.subject,
            &self.subject.server_organization,
            &self.subject_common_name,
        )?;
        builder
            .set_subject_name(&name)
            .map_err(|e| anyhow!("Failed to set CSR subject: {}", e))?;

        builder
            .set_pubkey(private_key)
            .map_err(|e| anyhow!("Failed to set CSR public key: {}", e))?;

        // No SANs means no extension at all, not an empty one
        if !self.sans.is_empty() {
            let mut san = SubjectAlternativeName::new();
            for dns in &self.sans {
                san.dns(dns);
            }
            let san = san
                .build(&builder.x509v3_context(None))
                .map_err(|e| anyhow!("Failed to build SubjectAlternativeName: {}", e))?;

            let mut extensions =
                Stack::new().map_err(|e| anyhow!("Failed to create extension stack: {}", e))?;
            extensions
                .push(san)
                .map_err(|e| anyhow!("Failed to push SubjectAlternativeName: {}", e))?;
            builder
                .add_extensions(&extensions)
                .map_err(|e| anyhow!("Failed to add CSR extensions: {}", e))?;
        }

        builder
            .sign(private_key, MessageDigest::sha256())
            .map_err(|e| anyhow!("Failed to sign CSR: {}", e))?;

        Ok(builder.build())
    }

    fn sign_csr(&self, csr: &X509ReqRef) -> Result<X509> {
        let mut builder =
            X509::builder().map_err(|e| anyhow!("Failed to create X509 builder: {}", e))?;

        builder
            .set_version(X509_VERSION_3)
            .map_err(|e| anyhow!("Failed to set version: {}", e))?;

        let serial = random_serial()?;
        builder
            .set_serial_number(&serial)
            .map_err(|e| anyhow!("Failed to set serial number: {}", e))?;

        builder
            .set_subject_name(csr.subject_name())
            .map_err(|e| anyhow!("Failed to set subject from CSR: {}", e))?;

        builder
            .set_issuer_name(self.signing_cert.subject_name())
            .map_err(|e| anyhow!("Failed to set issuer from CA: {}", e))?;

        let public_key = csr
            .public_key()
            .map_err(|e| anyhow!("Failed to read CSR public key: {}", e))?;
        builder
            .set_pubkey(&public_key)
            .map_err(|e| anyhow!("Failed to set public key: {}", e))?;

        let (not_before, not_after) = validity_window(self.validity_days)?;
        builder
            .set_not_before(&not_before)
            .map_err(|e| anyhow!("Failed to set not_before: {}", e))?;
        builder
            .set_not_after(&not_after)
            .map_err(|e| anyhow!("Failed to set not_after: {}", e))?;

        // Basic Constraints: CA=false (end-entity certificate)
        let bc = BasicConstraints::new()
            .critical()
            .build()
            .map_err(|e| anyhow!("Failed to build BasicConstraints: {}", e))?;
        builder
            .append_extension(bc)
            .map_err(|e| anyhow!("Failed to add BasicConstraints: {}", e))?;

        for extension in requested_extensions(csr, !self.sans.is_empty())? {
            builder
                .append_extension(extension)
                .map_err(|e| anyhow!("Failed to copy CSR extension: {}", e))?;
        }

        builder
            .sign(self.signing_key, MessageDigest::sha256())
            .map_err(|e| anyhow!("Failed to sign certificate: {}", e))?;

        Ok(builder.build())
    }
}

/// Extensions carried in the CSR's extension request attribute
///
/// OpenSSL reports a request without that attribute as an error. That is
/// only expected when no SANs were requested; otherwise the error stands.
fn requested_extensions(
    csr: &X509ReqRef,
    expect_extensions: bool,
) -> Result<Vec<X509Extension>> {
    match csr.extensions() {
        Ok(extensions) => Ok(extensions.into_iter().collect()),
        Err(_) if !expect_extensions => {
            debug!("CSR carries no extension request");
            Ok(Vec::new())
        }
        Err(e) => Err(anyhow!("Failed to read CSR extensions: {}", e)),
    }
}

/// Generate the server key, CSR and CA-signed certificate in one call
pub fn build_server_cert(
    common_name: &str,
    sans: &[String],
    ca_certificate: &X509,
    ca_private_key: &PKey<Private>,
    subject: &SubjectDefaults,
    validity_days: u32,
    key_size: u32,
) -> Result<ServerArtifacts> {
    RsaServerCertBuilder::new(ca_private_key, ca_certificate, subject.clone())
        .subject_common_name(common_name.to_string())
        .sans(sans.to_vec())
        .validity_days(validity_days)
        .key_size(key_size)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate_root_ca::build_ca;
    use openssl::nid::Nid;

    fn ca() -> (PKey<Private>, X509) {
        build_ca(&SubjectDefaults::default(), 365, 2048).unwrap()
    }

    fn server(sans: &[&str]) -> (PKey<Private>, X509, ServerArtifacts) {
        let (ca_key, ca_cert) = ca();
        let sans: Vec<String> = sans.iter().map(|s| s.to_string()).collect();
        let artifacts = build_server_cert(
            "example.com",
            &sans,
            &ca_cert,
            &ca_key,
            &SubjectDefaults::default(),
            30,
            2048,
        )
        .unwrap();
        (ca_key, ca_cert, artifacts)
    }

    fn dns_names(cert: &X509) -> Option<Vec<String>> {
        cert.subject_alt_names().map(|names| {
            names
                .iter()
                .filter_map(|name| name.dnsname().map(str::to_string))
                .collect()
        })
    }

    #[test]
    fn test_issuer_is_ca_subject() {
        let (_, ca_cert, artifacts) = server(&[]);
        assert_eq!(
            artifacts.certificate.issuer_name().to_der().unwrap(),
            ca_cert.subject_name().to_der().unwrap()
        );
    }

    #[test]
    fn test_subject_and_key_come_from_csr() {
        let (_, _, artifacts) = server(&[]);
        assert_eq!(
            artifacts.certificate.subject_name().to_der().unwrap(),
            artifacts.csr.subject_name().to_der().unwrap()
        );
        let csr_key = artifacts.csr.public_key().unwrap();
        let cert_key = artifacts.certificate.public_key().unwrap();
        assert!(csr_key.public_eq(&cert_key));
        assert!(cert_key.public_eq(&artifacts.private_key));

        let cn = artifacts
            .certificate
            .subject_name()
            .entries_by_nid(Nid::COMMONNAME)
            .next()
            .unwrap();
        assert_eq!(cn.data().as_utf8().unwrap().to_string(), "example.com");
        let org = artifacts
            .certificate
            .subject_name()
            .entries_by_nid(Nid::ORGANIZATIONNAME)
            .next()
            .unwrap();
        assert_eq!(
            org.data().as_utf8().unwrap().to_string(),
            "My Server Organization"
        );
    }

    #[test]
    fn test_signed_by_ca_only() {
        let (ca_key, _, artifacts) = server(&[]);
        assert!(artifacts.certificate.verify(&ca_key).unwrap());
        assert!(!artifacts.certificate.verify(&artifacts.private_key).unwrap());
    }

    #[test]
    fn test_csr_self_signed() {
        let (_, _, artifacts) = server(&["example.com"]);
        assert!(artifacts.csr.verify(&artifacts.private_key).unwrap());
    }

    #[test]
    fn test_sans_in_order() {
        let (_, _, artifacts) = server(&["example.com", "www.example.com"]);
        assert_eq!(
            dns_names(&artifacts.certificate).unwrap(),
            vec!["example.com".to_string(), "www.example.com".to_string()]
        );
    }

    #[test]
    fn test_sans_in_csr() {
        let (_, _, artifacts) = server(&["api.example.com"]);
        let extensions = artifacts.csr.extensions().unwrap();
        assert_eq!(extensions.len(), 1);
    }

    #[test]
    fn test_requested_extensions() {
        let (_, _, with_sans) = server(&["example.com"]);
        assert_eq!(requested_extensions(&with_sans.csr, true).unwrap().len(), 1);

        let (_, _, without_sans) = server(&[]);
        assert!(requested_extensions(&without_sans.csr, false).unwrap().is_empty());
        // A CSR expected to carry the SAN but lacking it is an error, not an empty list
        assert!(requested_extensions(&without_sans.csr, true).is_err());
    }

    #[test]
    fn test_no_sans_no_extension() {
        let (_, _, artifacts) = server(&[]);
        assert!(artifacts.certificate.subject_alt_names().is_none());
        assert!(artifacts.csr.extensions().is_err());
    }

    #[test]
    fn test_basic_constraints_not_ca() {
        let (_, _, artifacts) = server(&["example.com"]);
        let text = String::from_utf8(artifacts.certificate.to_text().unwrap()).unwrap();
        assert!(text.contains("X509v3 Basic Constraints: critical"));
        assert!(text.contains("CA:FALSE"));
        assert!(text.contains("X509v3 Subject Alternative Name:"));
        assert!(!text.contains("X509v3 Subject Alternative Name: critical"));
    }

    #[test]
    fn test_validity_span() {
        let (_, _, artifacts) = server(&[]);
        let cert = &artifacts.certificate;
        let diff = cert.not_before().diff(cert.not_after()).unwrap();
        assert_eq!(diff.days, 30);
        assert_eq!(diff.secs, 0);
    }

    #[test]
    fn test_serial_differs_from_ca() {
        let (_, ca_cert, artifacts) = server(&[]);
        let ca_serial = ca_cert.serial_number().to_bn().unwrap();
        let server_serial = artifacts.certificate.serial_number().to_bn().unwrap();
        assert_ne!(ca_serial, server_serial);
    }

    #[test]
    fn test_empty_common_name_rejected() {
        let (ca_key, ca_cert) = ca();
        let result = RsaServerCertBuilder::new(&ca_key, &ca_cert, SubjectDefaults::default())
            .key_size(2048)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_san_rejected() {
        let (ca_key, ca_cert) = ca();
        let result = RsaServerCertBuilder::new(&ca_key, &ca_cert, SubjectDefaults::default())
            .subject_common_name("example.com".to_string())
            .sans(vec!["example.com".to_string(), String::new()])
            .key_size(2048)
            .build();
        assert!(result.is_err());
    }
}
