//! Security bounds for (degree, total modulus bits).
//!
//! Maximum total coefficient-modulus bit counts for classical security
//! targets, as tabulated by the HomomorphicEncryption.org standard for
//! ternary secrets.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Target classical security level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SecurityLevel {
    Tc128,
    Tc192,
    Tc256,
}

impl SecurityLevel {
    /// Strongest first.
    pub const ALL: [SecurityLevel; 3] = [
        SecurityLevel::Tc256,
        SecurityLevel::Tc192,
        SecurityLevel::Tc128,
    ];

    pub fn bits(self) -> u32 {
        match self {
            SecurityLevel::Tc128 => 128,
            SecurityLevel::Tc192 => 192,
            SecurityLevel::Tc256 => 256,
        }
    }

    pub fn from_bits(bits: u32) -> Result<Self, ConfigurationError> {
        match bits {
            128 => Ok(SecurityLevel::Tc128),
            192 => Ok(SecurityLevel::Tc192),
            256 => Ok(SecurityLevel::Tc256),
            other => Err(ConfigurationError::InvalidSecurityLevel(other)),
        }
    }
}

impl Default for SecurityLevel {
    fn default() -> Self {
        SecurityLevel::Tc128
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit security", self.bits())
    }
}

/// (degree, 128-bit bound, 192-bit bound, 256-bit bound)
const MAX_MODULUS_BITS: [(u64, u32, u32, u32); 6] = [
    (1024, 27, 19, 14),
    (2048, 54, 37, 29),
    (4096, 109, 75, 58),
    (8192, 218, 152, 118),
    (16384, 438, 305, 237),
    (32768, 881, 611, 476),
];

/// Largest total modulus bit count that keeps `degree` at `level`.
///
/// `None` when the degree is not tabulated.
pub fn max_modulus_bits(degree: u64, level: SecurityLevel) -> Option<u32> {
    MAX_MODULUS_BITS
        .iter()
        .find(|(d, ..)| *d == degree)
        .map(|&(_, b128, b192, b256)| match level {
            SecurityLevel::Tc128 => b128,
            SecurityLevel::Tc192 => b192,
            SecurityLevel::Tc256 => b256,
        })
}

/// Strongest tabulated level that `total_bits` at `degree` still meets.
pub fn estimate(degree: u64, total_bits: u32) -> Option<SecurityLevel> {
    SecurityLevel::ALL.into_iter().find(|&level| {
        max_modulus_bits(degree, level).is_some_and(|max| total_bits <= max)
    })
}
