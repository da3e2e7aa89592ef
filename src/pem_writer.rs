//! PEM serialization and file output.

use anyhow::{anyhow, Context, Result};
use log::debug;
use openssl::pkey::{PKeyRef, Private};
use openssl::x509::{X509Ref, X509ReqRef};
use std::fs;
use std::path::{Path, PathBuf};

/// An artifact that can be written as PEM, tagged by kind
pub enum PemArtifact<'a> {
    /// Written as unencrypted PKCS#1 (`RSA PRIVATE KEY`)
    PrivateKey(&'a PKeyRef<Private>),
    Certificate(&'a X509Ref),
    Csr(&'a X509ReqRef),
}

impl PemArtifact<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            PemArtifact::PrivateKey(_) => "private key",
            PemArtifact::Certificate(_) => "certificate",
            PemArtifact::Csr(_) => "certificate signing request",
        }
    }

    pub fn to_pem(&self) -> Result<Vec<u8>> {
        match self {
            PemArtifact::PrivateKey(key) => {
                let rsa = key
                    .rsa()
                    .map_err(|e| anyhow!("Private key is not an RSA key: {}", e))?;
                rsa.private_key_to_pem()
                    .map_err(|e| anyhow!("Failed to encode private key as PEM: {}", e))
            }
            PemArtifact::Certificate(cert) => cert
                .to_pem()
                .map_err(|e| anyhow!("Failed to encode certificate as PEM: {}", e)),
            PemArtifact::Csr(csr) => csr
                .to_pem()
                .map_err(|e| anyhow!("Failed to encode CSR as PEM: {}", e)),
        }
    }
}

/// Write `artifact` as PEM to `dir_path/file_name`, creating the directory
/// if needed and replacing any existing file
pub fn save_pem(dir_path: &Path, file_name: &str, artifact: PemArtifact<'_>) -> Result<PathBuf> {
    fs::create_dir_all(dir_path)
        .with_context(|| format!("Failed to create directory {}", dir_path.display()))?;

    let file_path = dir_path.join(file_name);
    let pem = artifact.to_pem()?;
    fs::write(&file_path, pem)
        .with_context(|| format!("Failed to write {}", file_path.display()))?;

    debug!("Wrote {} to {}", artifact.kind(), file_path.display());
    println!("File saved: {}", file_path.display());
    Ok(file_path)
}
