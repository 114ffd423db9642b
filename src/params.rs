//! Plain parameter descriptions, before validation.

use serde::{Deserialize, Serialize};

use crate::modulus::ModulusProfile;
use crate::scheme::SchemeVariant;
use crate::security::SecurityLevel;

/// Ring degrees accepted by the validator.
pub const SUPPORTED_DEGREES: [u64; 6] = [1024, 2048, 4096, 8192, 16384, 32768];

pub fn is_supported_degree(degree: u64) -> bool {
    SUPPORTED_DEGREES.contains(&degree)
}

/// Unvalidated description of the encryption parameters.
///
/// Built once per process from the configuration source. Nothing here is
/// checked; see [`crate::validate`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub variant: SchemeVariant,
    /// Ring dimension N of Z_q[X]/(X^N + 1).
    pub degree: u64,
    pub modulus_profile: ModulusProfile,
    /// Required iff `variant` is Integer.
    pub plaintext_modulus: Option<u64>,
    pub security_level: SecurityLevel,
}

impl ParameterSet {
    /// Integer scheme with the scheme's default chain.
    pub fn integer(degree: u64, plaintext_modulus: u64) -> Self {
        Self {
            variant: SchemeVariant::Integer,
            degree,
            modulus_profile: ModulusProfile::Default,
            plaintext_modulus: Some(plaintext_modulus),
            security_level: SecurityLevel::default(),
        }
    }

    /// Real scheme with an explicit chain of prime bit-lengths.
    pub fn real(degree: u64, chain: Vec<u32>) -> Self {
        Self {
            variant: SchemeVariant::Real,
            degree,
            modulus_profile: ModulusProfile::Explicit(chain),
            plaintext_modulus: None,
            security_level: SecurityLevel::default(),
        }
    }

    pub fn with_profile(mut self, profile: ModulusProfile) -> Self {
        self.modulus_profile = profile;
        self
    }

    pub fn with_security_level(mut self, level: SecurityLevel) -> Self {
        self.security_level = level;
        self
    }
}
