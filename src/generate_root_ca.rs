//! Root CA Certificate Generation Module
//!
//! Generates the self-signed CA certificate that signs the server certificate.
//!
//! # Certificate Properties
//! - **Self-signed**: Issuer and subject are the same
//! - **Basic Constraints**: CA=true, no path length constraint, critical
//! - **Default Key Size**: RSA 4096-bit, exponent 65537
//! - **Default Validity**: 365 days
//! - **Signature**: SHA-256 with RSA
//! - **Version**: X.509v3
//!
//! # Example
//! ```rust,no_run
//! # use anyhow::Result;
//! # fn example() -> Result<()> {
//! use pki_certgen::configs::SubjectDefaults;
//! use pki_certgen::generate_root_ca::RsaRootCABuilder;
//!
//! let (ca_key, ca_cert) = RsaRootCABuilder::new(SubjectDefaults::default())
//!     .validity_days(30)
//!     .key_size(2048)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use anyhow::{anyhow, Result};
use log::{debug, info};
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::x509::extension::BasicConstraints;
use openssl::x509::X509;

use crate::configs::SubjectDefaults;
use crate::pki_generator::{
    build_name, generate_rsa_key, random_serial, validity_window, RSA_KEY_SIZE_DEFAULT,
    VALIDITY_DAYS_DEFAULT, X509_VERSION_3,
};

// ================= RSA Key and Certificate Builder =================

/// Builder for generating an RSA key pair and a self-signed root CA certificate
///
/// The subject is fixed by [`SubjectDefaults`]: country, state, locality,
/// `ca_organization` and `ca_common_name`. Validity and key size default to
/// 365 days and 4096 bits.
pub struct RsaRootCABuilder {
    subject: SubjectDefaults,
    validity_days: u32,
    key_size: u32,
}

impl RsaRootCABuilder {
    pub fn new(subject: SubjectDefaults) -> Self {
        Self {
            subject,
            validity_days: VALIDITY_DAYS_DEFAULT,
            key_size: RSA_KEY_SIZE_DEFAULT,
        }
    }

    /// Set validity period in days
    pub fn validity_days(mut self, days: u32) -> Self {
        self.validity_days = days;
        self
    }

    /// Set the RSA modulus size in bits
    pub fn key_size(mut self, bits: u32) -> Self {
        self.key_size = bits;
        self
    }

    /// Build the RSA key pair and self-signed root CA certificate
    ///
    /// # Returns
    /// * `Ok((PKey<Private>, X509))` - Tuple of (private key, self-signed certificate)
    /// * `Err(anyhow::Error)` - If certificate generation fails
    ///
    /// # Errors
    /// Returns error if:
    /// - The key size is out of range or RSA key generation fails
    /// - The validity period is zero
    /// - A subject field is rejected by OpenSSL
    /// - Certificate signing fails
    pub fn build(self) -> Result<(PKey<Private>, X509)> {
        debug!("Generating {}-bit RSA key for the CA", self.key_size);
        let private_key = generate_rsa_key(self.key_size)?;

        let mut builder =
            X509::builder().map_err(|e| anyhow!("Failed to create X509 builder: {}", e))?;

        builder
            .set_version(X509_VERSION_3)
            .map_err(|e| anyhow!("Failed to set version: {}", e))?;

        let serial = random_serial()?;
        builder
            .set_serial_number(&serial)
            .map_err(|e| anyhow!("Failed to set serial number: {}", e))?;

        let name = build_name(
            &self.subject,
            &self.subject.ca_organization,
            &self.subject.ca_common_name,
        )?;

        builder
            .set_subject_name(&name)
            .map_err(|e| anyhow!("Failed to set subject: {}", e))?;

        // Self-signed: issuer is the subject
        builder
            .set_issuer_name(&name)
            .map_err(|e| anyhow!("Failed to set issuer: {}", e))?;

        let (not_before, not_after) = validity_window(self.validity_days)?;
        builder
            .set_not_before(&not_before)
            .map_err(|e| anyhow!("Failed to set not_before: {}", e))?;
        builder
            .set_not_after(&not_after)
            .map_err(|e| anyhow!("Failed to set not_after: {}", e))?;

        builder
            .set_pubkey(&private_key)
            .map_err(|e| anyhow!("Failed to set public key: {}", e))?;

        let bc = BasicConstraints::new()
            .critical()
            .ca()
            .build()
            .map_err(|e| anyhow!("Failed to build BasicConstraints: {}", e))?;
        builder
            .append_extension(bc)
            .map_err(|e| anyhow!("Failed to add BasicConstraints: {}", e))?;

        builder
            .sign(&private_key, MessageDigest::sha256())
            .map_err(|e| anyhow!("Failed to sign certificate: {}", e))?;

        let x509 = builder.build();
        info!(
            "Generated CA certificate '{}' valid for {} days",
            self.subject.ca_common_name, self.validity_days
        );
        Ok((private_key, x509))
    }
}

/// Generate the CA key and self-signed CA certificate in one call
pub fn build_ca(
    subject: &SubjectDefaults,
    validity_days: u32,
    key_size: u32,
) -> Result<(PKey<Private>, X509)> {
    RsaRootCABuilder::new(subject.clone())
        .validity_days(validity_days)
        .key_size(key_size)
        .build()
}
