pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod lock;
pub mod logging;
pub mod login;
pub mod platform;
pub mod totp;
pub mod ui;
pub(crate) mod uri_helper;

use core::num;
use std::{fmt::Display, str::FromStr};

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

pub use error::{Error, Result};

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("secret is not valid base32: {0}")]
    SecretDecode(data_encoding::DecodeError),
    #[error("secret is empty")]
    EmptySecret,
    #[error("invalid digest of {} bytes", .0.len())]
    InvalidDigest(Vec<u8>),
    #[error("invalid hashing algorithm, found {0}. Expected one of: SHA1, SHA256 or SHA512")]
    InvalidHashingAlgorithm(String),
    #[error("the provided URI is not valid, found {0}. Expected: {1}")]
    InvalidUriType(String, String),
    #[error("could not parse the URI")]
    UriParseError(url::ParseError),
    #[error("could not retrieve the secret from the URI")]
    UriMissingSecret,
    #[error("could not parse an integer. Failed parsing: {1}")]
    IntegerParseError(num::ParseIntError, String),
    #[error("period must be at least one second")]
    InvalidPeriod,
    #[error("digit count must be between 1 and 9, found {0}")]
    InvalidDigits(u32),
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum OtpHashAlgorithm {
    #[default]
    SHA1,
    SHA256,
    SHA512,
}

impl Display for OtpHashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SHA1 => write!(f, "SHA1"),
            Self::SHA256 => write!(f, "SHA256"),
            Self::SHA512 => write!(f, "SHA512"),
        }
    }
}

impl FromStr for OtpHashAlgorithm {
    type Err = OtpError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.to_uppercase();

        match normalized.as_str() {
            "SHA1" => Ok(Self::SHA1),
            "SHA256" => Ok(Self::SHA256),
            "SHA512" => Ok(Self::SHA512),
            _ => Err(OtpError::InvalidHashingAlgorithm(s.to_string())),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct OtpCode {
    code: u32,
    digits: u32,
}

impl OtpCode {
    pub fn integer(&self) -> u32 {
        self.code
    }
}

impl Display for OtpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:0padding$}",
            self.code,
            padding = (self.digits as usize)
        )
    }
}

pub trait Otp {
    /// Decodes a secret (given as an RFC4648 base32-encoded ASCII string)
    /// into a byte string
    ///
    /// Authenticator apps print secrets in lowercase groups separated by
    /// spaces or dashes and sometimes keep the `=` padding, so those are
    /// normalised away first.
    fn decode_secret(secret: &str) -> Result<Vec<u8>, OtpError> {
        let normalized: String = secret
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '=')
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if normalized.is_empty() {
            return Err(OtpError::EmptySecret);
        }

        data_encoding::BASE32_NOPAD
            .decode(normalized.as_bytes())
            .map_err(OtpError::SecretDecode)
    }

    /// Calculates the HMAC digest of the big-endian counter for the given secret.
    fn calc_digest(
        &self,
        decoded_secret: &[u8],
        algorithm: OtpHashAlgorithm,
        data: u64,
    ) -> Vec<u8> {
        let data = data.to_be_bytes();

        match algorithm {
            OtpHashAlgorithm::SHA1 => sign::<Hmac<Sha1>>(decoded_secret, &data),
            OtpHashAlgorithm::SHA256 => sign::<Hmac<Sha256>>(decoded_secret, &data),
            OtpHashAlgorithm::SHA512 => sign::<Hmac<Sha512>>(decoded_secret, &data),
        }
    }

    /// Encodes the HMAC digest into a truncated integer.
    fn encode_digest_truncated(digest: &[u8], target_digits_count: u32) -> Result<u32, OtpError> {
        if !(1..=9).contains(&target_digits_count) {
            return Err(OtpError::InvalidDigits(target_digits_count));
        }

        // The low nibble of the last byte is the offset for any algorithm
        let offset = match digest.last() {
            Some(x) => *x & 0xf,
            None => return Err(OtpError::InvalidDigest(Vec::from(digest))),
        } as usize;

        let code_bytes: [u8; 4] = match digest
            .get(offset..offset + 4)
            .and_then(|bytes| bytes.try_into().ok())
        {
            Some(x) => x,
            None => return Err(OtpError::InvalidDigest(Vec::from(digest))),
        };

        let code = u32::from_be_bytes(code_bytes);
        let truncation_factor = u32::pow(10, target_digits_count);

        Ok((code & 0x7fffffff) % truncation_factor)
    }

    fn from_uri(uri: &str) -> Result<Self, OtpError>
    where
        Self: std::marker::Sized;
}

fn sign<M>(key: &[u8], data: &[u8]) -> Vec<u8>
where
    M: Mac + hmac::digest::KeyInit,
{
    // HMAC hashes oversized keys and pads short ones, every length is valid
    let mut mac = match <M as Mac>::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => return Vec::new(),
    };
    mac.update(data);

    mac.finalize().into_bytes().to_vec()
}
