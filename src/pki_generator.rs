//! Primitives shared by the CA and server certificate builders: RSA key
//! generation, serial numbers, validity windows and subject names.

use anyhow::{anyhow, bail, Result};
use log::debug;
use openssl::asn1::{Asn1Integer, Asn1Time, Asn1Type};
use openssl::bn::{BigNum, MsbOption};
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::X509Name;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::configs::SubjectDefaults;

pub(crate) const X509_VERSION_3: i32 = 2; // X509 version 3 is represented by 2
pub(crate) const X509_REQ_VERSION_1: i32 = 0;
pub const RSA_KEY_SIZE_DEFAULT: u32 = 4096;
pub const RSA_KEY_SIZE_MIN: u32 = 1024;
pub const RSA_KEY_SIZE_MAX: u32 = 16384;
pub const VALIDITY_DAYS_DEFAULT: u32 = 365;
const RSA_PUBLIC_EXPONENT: u32 = 65537;
const SERIAL_NUMBER_BITS: i32 = 128;
const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Reject modulus sizes outside what OpenSSL will generate
pub fn validate_key_size(bits: u32) -> Result<()> {
    if !(RSA_KEY_SIZE_MIN..=RSA_KEY_SIZE_MAX).contains(&bits) {
        bail!(
            "Invalid RSA key size {}: expected between {} and {} bits",
            bits,
            RSA_KEY_SIZE_MIN,
            RSA_KEY_SIZE_MAX
        );
    }
    Ok(())
}

/// Generate an RSA private key of `bits` bits with public exponent 65537
pub fn generate_rsa_key(bits: u32) -> Result<PKey<Private>> {
    validate_key_size(bits)?;

    let exponent = BigNum::from_u32(RSA_PUBLIC_EXPONENT)
        .map_err(|e| anyhow!("Failed to create public exponent: {}", e))?;
    let rsa = Rsa::generate_with_e(bits, &exponent)
        .map_err(|e| anyhow!("Failed to generate RSA keypair: {}", e))?;

    PKey::from_rsa(rsa).map_err(|e| anyhow!("Failed to create private key: {}", e))
}

/// Random 128-bit serial number
pub(crate) fn random_serial() -> Result<Asn1Integer> {
    let mut serial = BigNum::new()?;
    serial.rand(SERIAL_NUMBER_BITS, MsbOption::MAYBE_ZERO, false)?;
    debug!("Serial number {}", serial.to_hex_str()?);
    serial
        .to_asn1_integer()
        .map_err(|e| anyhow!("Failed to encode serial number: {}", e))
}

/// `[now, now + days]`, both ends taken from a single clock read
pub(crate) fn validity_window(days: u32) -> Result<(Asn1Time, Asn1Time)> {
    if days == 0 {
        bail!("Validity period must be at least one day");
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow!("System clock is before the Unix epoch: {}", e))?
        .as_secs() as i64;

    let not_before =
        Asn1Time::from_unix(now).map_err(|e| anyhow!("Failed to create not_before: {}", e))?;
    let not_after = Asn1Time::from_unix(now + i64::from(days) * SECONDS_PER_DAY)
        .map_err(|e| anyhow!("Failed to create not_after: {}", e))?;

    Ok((not_before, not_after))
}

/// Subject name in C, ST, L, O, CN order
///
/// O and CN are written as UTF8String so they are not held to the X.520
/// upper bounds (64 characters for CN); a hostname may be up to 253.
pub(crate) fn build_name(
    subject: &SubjectDefaults,
    organization: &str,
    common_name: &str,
) -> Result<X509Name> {
    let mut name_builder =
        X509Name::builder().map_err(|e| anyhow!("Failed to create name builder: {}", e))?;

    name_builder
        .append_entry_by_nid(Nid::COUNTRYNAME, &subject.country)
        .map_err(|e| anyhow!("Failed to set country: {}", e))?;

    name_builder
        .append_entry_by_nid(Nid::STATEORPROVINCENAME, &subject.state)
        .map_err(|e| anyhow!("Failed to set state/province: {}", e))?;

    name_builder
        .append_entry_by_nid(Nid::LOCALITYNAME, &subject.locality)
        .map_err(|e| anyhow!("Failed to set locality: {}", e))?;

    name_builder
        .append_entry_by_nid_with_type(
            Nid::ORGANIZATIONNAME,
            organization,
            Asn1Type::UTF8STRING,
        )
        .map_err(|e| anyhow!("Failed to set organization: {}", e))?;

    name_builder
        .append_entry_by_nid_with_type(Nid::COMMONNAME, common_name, Asn1Type::UTF8STRING)
        .map_err(|e| anyhow!("Failed to set CN: {}", e))?;

    Ok(name_builder.build())
}
