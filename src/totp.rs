use crate::{
    uri_helper::{self, TOTP_URI_PREFIX},
    Otp, OtpCode, OtpError, OtpHashAlgorithm,
};

#[derive(Clone, PartialEq)]
pub struct Totp {
    pub(crate) secret: String,
    pub(crate) algorithm: OtpHashAlgorithm,
    pub(crate) period: u64,
    pub(crate) digits: u32,
}

impl std::fmt::Debug for Totp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Totp")
            .field("secret", &"***")
            .field("algorithm", &self.algorithm)
            .field("period", &self.period)
            .field("digits", &self.digits)
            .finish()
    }
}

impl Otp for Totp {
    fn from_uri(uri: &str) -> Result<Self, OtpError> {
        let totp = uri_helper::totp_from_uri(uri)?;
        totp.validate()?;

        Ok(totp)
    }
}

impl Totp {
    /// Creates the config for the [Time-based One-time Password Algorithm](http://en.wikipedia.org/wiki/Time-based_One-time_Password_Algorithm)
    /// (TOTP) given an RFC4648 base32 encoded secret.
    ///
    /// Obs.: This method defaults to the SHA1 hash, a 6-digit code and a period of 30 seconds
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            algorithm: OtpHashAlgorithm::SHA1,
            period: 30,
            digits: 6,
        }
    }

    /// Builds a TOTP from either a bare base32 secret or an `otpauth://totp/` URI.
    ///
    /// The secret is decoded once here so a malformed value is rejected before
    /// anything else depends on it.
    pub fn from_secret_or_uri(value: &str) -> Result<Self, OtpError> {
        let value = value.trim();

        let totp = if value
            .get(..TOTP_URI_PREFIX.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(TOTP_URI_PREFIX))
        {
            Self::from_uri(value)?
        } else {
            let totp = Self::new(value.to_string());
            totp.validate()?;
            totp
        };

        Ok(totp)
    }

    ///  Sets hashing algorithm
    pub fn with_algorithm(&mut self, algorithm: OtpHashAlgorithm) -> &mut Self {
        self.algorithm = algorithm;

        self
    }

    ///  Sets the period in seconds
    pub fn with_period(&mut self, period: u64) -> &mut Self {
        self.period = period;

        self
    }

    ///  Sets the number of digits to generate
    pub fn with_digits(&mut self, digits: u32) -> &mut Self {
        self.digits = digits;

        self
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    pub fn algorithm(&self) -> OtpHashAlgorithm {
        self.algorithm
    }

    /// Checks that the secret decodes and that period and digits can produce a code
    pub fn validate(&self) -> Result<(), OtpError> {
        if self.period == 0 {
            return Err(OtpError::InvalidPeriod);
        }

        if !(1..=9).contains(&self.digits) {
            return Err(OtpError::InvalidDigits(self.digits));
        }

        Self::decode_secret(self.secret.as_str()).map(|_| ())
    }

    /// Generates a Totp from the provided seconds since the UNIX epoch
    /// truncated to the specified number of digits
    pub fn generate(&self, seconds_since_epoch: u64) -> Result<OtpCode, OtpError> {
        if self.period == 0 {
            return Err(OtpError::InvalidPeriod);
        }

        let calculated_time = seconds_since_epoch / self.period;

        let decoded = Self::decode_secret(self.secret.as_str())?;
        let digest = self.calc_digest(decoded.as_slice(), self.algorithm, calculated_time);

        let code = Self::encode_digest_truncated(digest.as_ref(), self.digits)?;

        Ok(OtpCode {
            code,
            digits: self.digits,
        })
    }

    /// Seconds until the code generated at `seconds_since_epoch` rotates,
    /// always within `1..=period`
    pub fn remaining_seconds(&self, seconds_since_epoch: u64) -> u64 {
        if self.period == 0 {
            return 0;
        }

        self.period - (seconds_since_epoch % self.period)
    }
}
