//! pki-certgen - one-shot CA and server certificate generator
//!
//! Issues a self-signed RSA Certificate Authority and a server certificate
//! signed by it, then writes every artifact as PEM:
//!
//! ```text
//! <out_dir>/<cn>/ca_private_key.pem
//! <out_dir>/<cn>/ca_certificate.pem
//! <out_dir>/<cn>/server_private_key.pem
//! <out_dir>/<cn>/server_certificate.pem
//! <out_dir>/<cn>/server_csr.pem
//! ```
//!
//! # Architecture
//!
//! - [`generate_root_ca`]: RSA key and self-signed CA certificate
//! - [`generate_server_cert`]: server key, CSR, and CA-signed certificate
//! - [`pem_writer`]: PEM encoding and file output
//! - [`configs`]: fixed subject fields, optionally loaded from TOML
//! - [`cli`]: command-line arguments
//!
//! # Example
//!
//! ```no_run
//! use pki_certgen::{generate, GenerationRequest};
//! use anyhow::Result;
//!
//! fn main() -> Result<()> {
//!     let request = GenerationRequest::new("example.com")
//!         .sans(vec!["example.com".to_string(), "www.example.com".to_string()])
//!         .validity_days(30)
//!         .key_size(2048);
//!     let files = generate(&request)?;
//!     println!("Server certificate at {}", files.server_certificate.display());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod configs;
pub mod generate_root_ca;
pub mod generate_server_cert;
pub mod pem_writer;
pub mod pki_generator;

use anyhow::{bail, Context, Result};
use log::info;
use std::path::{Component, Path, PathBuf};

use configs::SubjectDefaults;
use generate_root_ca::build_ca;
use generate_server_cert::build_server_cert;
use pem_writer::{save_pem, PemArtifact};
use pki_generator::{build_name, validate_key_size, RSA_KEY_SIZE_DEFAULT, VALIDITY_DAYS_DEFAULT};

pub const CA_PRIVATE_KEY_FILE: &str = "ca_private_key.pem";
pub const CA_CERTIFICATE_FILE: &str = "ca_certificate.pem";
pub const SERVER_PRIVATE_KEY_FILE: &str = "server_private_key.pem";
pub const SERVER_CERTIFICATE_FILE: &str = "server_certificate.pem";
pub const SERVER_CSR_FILE: &str = "server_csr.pem";

/// Parameters of a single generation run
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub common_name: String,
    pub sans: Vec<String>,
    pub validity_days: u32,
    pub key_size: u32,
    pub out_dir: PathBuf,
    pub subject: SubjectDefaults,
}

impl GenerationRequest {
    pub fn new(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            sans: Vec::new(),
            validity_days: VALIDITY_DAYS_DEFAULT,
            key_size: RSA_KEY_SIZE_DEFAULT,
            out_dir: PathBuf::from("."),
            subject: SubjectDefaults::default(),
        }
    }

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

    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = dir.into();
        self
    }

    pub fn subject(mut self, subject: SubjectDefaults) -> Self {
        self.subject = subject;
        self
    }

    /// Directory the five files are written to: `<out_dir>/<cn>`
    pub fn output_dir(&self) -> PathBuf {
        self.out_dir.join(&self.common_name)
    }

    /// Checks run before any key is generated or anything touches the disk
    pub fn validate(&self) -> Result<()> {
        validate_common_name(&self.common_name)?;
        if self.sans.iter().any(|san| san.is_empty()) {
            bail!("Subject alternative names must not be empty");
        }
        if self.validity_days == 0 {
            bail!("Validity period must be at least one day");
        }
        validate_key_size(self.key_size)?;

        // Both subjects are built here so a rejected name fails before the CA files exist
        build_name(&self.subject, &self.subject.ca_organization, &self.subject.ca_common_name)
            .context("Invalid CA subject")?;
        build_name(&self.subject, &self.subject.server_organization, &self.common_name)
            .context("Invalid server subject")?;

        Ok(())
    }
}

/// The common name doubles as a directory name, so it must be exactly one
/// normal path component
fn validate_common_name(cn: &str) -> Result<()> {
    if cn.is_empty() {
        bail!("Common name must not be empty");
    }
    let mut components = Path::new(cn).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == cn => Ok(()),
        _ => bail!("Common name '{}' cannot be used as a directory name", cn),
    }
}

/// Paths of the files written by [`generate`]
#[derive(Debug, Clone)]
pub struct GeneratedFiles {
    pub ca_private_key: PathBuf,
    pub ca_certificate: PathBuf,
    pub server_private_key: PathBuf,
    pub server_certificate: PathBuf,
    pub server_csr: PathBuf,
}

/// Run the whole pipeline: CA, then server certificate, writing each
/// artifact as soon as it exists
///
/// Files written before a failure are left in place.
pub fn generate(request: &GenerationRequest) -> Result<GeneratedFiles> {
    request.validate()?;
    let dir = request.output_dir();

    let (ca_key, ca_cert) = build_ca(&request.subject, request.validity_days, request.key_size)
        .context("Failed to generate CA")?;
    let ca_private_key = save_pem(&dir, CA_PRIVATE_KEY_FILE, PemArtifact::PrivateKey(&ca_key))?;
    let ca_certificate = save_pem(&dir, CA_CERTIFICATE_FILE, PemArtifact::Certificate(&ca_cert))?;

    let server = build_server_cert(
        &request.common_name,
        &request.sans,
        &ca_cert,
        &ca_key,
        &request.subject,
        request.validity_days,
        request.key_size,
    )
    .context("Failed to generate server certificate")?;
    let server_private_key = save_pem(
        &dir,
        SERVER_PRIVATE_KEY_FILE,
        PemArtifact::PrivateKey(&server.private_key),
    )?;
    let server_certificate = save_pem(
        &dir,
        SERVER_CERTIFICATE_FILE,
        PemArtifact::Certificate(&server.certificate),
    )?;
    let server_csr = save_pem(&dir, SERVER_CSR_FILE, PemArtifact::Csr(&server.csr))?;

    info!("All artifacts written to {}", dir.display());
    Ok(GeneratedFiles {
        ca_private_key,
        ca_certificate,
        server_private_key,
        server_certificate,
        server_csr,
    })
}
