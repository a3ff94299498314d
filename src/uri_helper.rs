use std::{borrow::Cow, str::FromStr};

use crate::{totp::Totp, OtpError, OtpHashAlgorithm};

const URI_SCHEME: &str = "otpauth";
const TOTP_TYPE: &str = "totp";

pub const TOTP_URI_PREFIX: &str = "otpauth://totp";

const URI_SECRET_QUERY: &str = "secret";
const URI_HASH_QUERY: &str = "algorithm";
const URI_PERIOD_QUERY: &str = "period";
const URI_DIGITS_QUERY: &str = "digits";

/// Parses an `otpauth://totp/<label>?secret=...` key URI.
///
/// Unknown query parameters (issuer, image, ...) are ignored; missing ones
/// fall back to the RFC 6238 defaults.
pub fn totp_from_uri(uri: &str) -> Result<Totp, OtpError> {
    let uri = url::Url::parse(uri).map_err(OtpError::UriParseError)?;

    if uri.scheme() != URI_SCHEME {
        return Err(OtpError::InvalidUriType(
            uri.scheme().into(),
            URI_SCHEME.into(),
        ));
    }

    let domain = uri.domain();
    if !domain.is_some_and(|d| d.eq_ignore_ascii_case(TOTP_TYPE)) {
        return Err(OtpError::InvalidUriType(
            domain.unwrap_or("None").into(),
            TOTP_TYPE.into(),
        ));
    }

    let mut secret = "".to_string();
    let mut algorithm = OtpHashAlgorithm::default();
    let mut period = 30;
    let mut digits = 6;

    for params in uri.query_pairs() {
        match params.0 {
            Cow::Borrowed(URI_SECRET_QUERY) => secret = params.1.to_string(),
            Cow::Borrowed(URI_HASH_QUERY) => {
                algorithm = OtpHashAlgorithm::from_str(params.1.as_ref())?
            }
            Cow::Borrowed(URI_PERIOD_QUERY) => {
                period = u64::from_str(params.1.as_ref())
                    .map_err(|e| OtpError::IntegerParseError(e, URI_PERIOD_QUERY.into()))?
            }
            Cow::Borrowed(URI_DIGITS_QUERY) => {
                digits = u32::from_str(params.1.as_ref())
                    .map_err(|e| OtpError::IntegerParseError(e, URI_DIGITS_QUERY.into()))?
            }
            _ => (),
        }
    }

    if secret.is_empty() {
        return Err(OtpError::UriMissingSecret);
    }

    Ok(Totp {
        secret,
        algorithm,
        period,
        digits,
    })
}
