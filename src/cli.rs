//! Command-line interface.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::configs::AppConfig;
use crate::pki_generator::{RSA_KEY_SIZE_DEFAULT, VALIDITY_DAYS_DEFAULT};
use crate::GenerationRequest;

#[derive(Parser, Debug)]
#[command(name = "pki-certgen")]
#[command(
    about = "Generate a self-signed CA and a CA-signed server certificate as PEM files",
    long_about = None
)]
pub struct Cli {
    /// Common Name for the server certificate; also the output directory name
    #[arg(long)]
    pub cn: String,

    /// DNS names for the Subject Alternative Name extension
    #[arg(long, num_args = 0..)]
    pub sans: Vec<String>,

    /// Validity period in days for both certificates
    #[arg(long, default_value_t = VALIDITY_DAYS_DEFAULT, value_parser = clap::value_parser!(u32).range(1..))]
    pub days: u32,

    /// RSA modulus size in bits for both keys
    #[arg(long, default_value_t = RSA_KEY_SIZE_DEFAULT)]
    pub key_size: u32,

    /// Parent directory of the <cn> output directory
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// TOML file overriding the fixed subject fields
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Turn parsed arguments into a generation request, loading the
    /// config file if one was given
    pub fn into_request(self) -> Result<GenerationRequest> {
        let config = AppConfig::load(self.config.as_deref())?;

        Ok(GenerationRequest::new(self.cn)
            .sans(self.sans)
            .validity_days(self.days)
            .key_size(self.key_size)
            .out_dir(self.out_dir)
            .subject(config.subject))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["pki-certgen", "--cn", "test"]).unwrap();
        assert_eq!(cli.cn, "test");
        assert!(cli.sans.is_empty());
        assert_eq!(cli.days, 365);
        assert_eq!(cli.key_size, 4096);
        assert_eq!(cli.out_dir, PathBuf::from("."));
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_full_arguments() {
        let cli = Cli::try_parse_from([
            "pki-certgen",
            "--cn",
            "example.com",
            "--sans",
            "example.com",
            "www.example.com",
            "--days",
            "30",
            "--key-size",
            "2048",
        ])
        .unwrap();
        assert_eq!(cli.sans, vec!["example.com", "www.example.com"]);
        assert_eq!(cli.days, 30);
        assert_eq!(cli.key_size, 2048);
    }

    #[test]
    fn test_missing_cn() {
        let err = Cli::try_parse_from(["pki-certgen", "--days", "30"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_zero_days_rejected() {
        let err = Cli::try_parse_from(["pki-certgen", "--cn", "x", "--days", "0"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_malformed_key_size() {
        let err =
            Cli::try_parse_from(["pki-certgen", "--cn", "x", "--key-size", "big"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_into_request() {
        let cli = Cli::try_parse_from(["pki-certgen", "--cn", "test", "--out-dir", "/tmp/out"])
            .unwrap();
        let request = cli.into_request().unwrap();
        assert_eq!(request.common_name, "test");
        assert_eq!(request.output_dir(), PathBuf::from("/tmp/out/test"));
        assert_eq!(request.subject.country, "JP");
    }
}
