use std::path::PathBuf;

use thiserror::Error;

use crate::fingerprint::FieldGroup;
use crate::scheme::SchemeVariant;
use crate::security::SecurityLevel;

/// The configuration source could not produce a parameter set.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("cannot read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration: {0}")]
    Parse(String),

    #[error("configuration does not select a scheme")]
    MissingScheme,

    #[error("configuration is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("unrecognized scheme: {0:?} (expected \"Integer\" or \"Real\")")]
    UnknownScheme(String),

    #[error("unsupported configuration version {found} (this build reads version {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("plaintext_modulus is only meaningful for the Integer scheme")]
    PlaintextModulusForReal,

    #[error("unknown modulus preset: {0:?}")]
    UnknownPreset(String),

    #[error("unsupported security level: {0} bits (expected 128, 192 or 256)")]
    InvalidSecurityLevel(u32),
}

/// A parameter set violates a structural or security invariant.
///
/// Variants are ordered the way the validator checks them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("unsupported ring degree {0} (must be a power of two in 1024..=32768)")]
    UnsupportedDegree(u64),

    #[error("Integer scheme needs a plaintext modulus: {reason}")]
    MissingPlaintextModulus { reason: PlaintextFault },

    #[error("invalid modulus chain for {variant}: {reason}")]
    InvalidModulusChain {
        variant: SchemeVariant,
        reason: ChainFault,
    },

    #[error(
        "modulus chain totals {total_bits} bits, above the {max_bits}-bit bound for degree {degree} at {target}"
    )]
    SecurityLevelTooLow {
        degree: u64,
        total_bits: u32,
        max_bits: u32,
        target: SecurityLevel,
    },
}

/// Why a plaintext modulus was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaintextFault {
    #[error("none configured")]
    Absent,

    #[error("zero is not a modulus")]
    Zero,

    #[error("{modulus} is not smaller than the smallest chain prime {smallest_prime}")]
    NotBelowChain { modulus: u64, smallest_prime: u64 },
}

/// Why a modulus chain was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainFault {
    #[error("chain has {len} primes, at least {min} required")]
    TooShort { len: usize, min: usize },

    #[error("prime {index} has a non-positive bit-length")]
    ZeroBits { index: usize },

    #[error("prime {index} is {bits} bits, platform maximum is {max}")]
    TooManyBits { index: usize, bits: u32, max: u32 },

    #[error("preset {preset:?} is not defined for {variant}")]
    PresetSchemeMismatch {
        preset: String,
        variant: SchemeVariant,
    },

    #[error("no default chain for degree {degree} at {target}")]
    NoDefault { degree: u64, target: SecurityLevel },

    #[error("not enough {bits}-bit primes congruent to 1 mod {modulus}")]
    NotEnoughPrimes { bits: u32, modulus: u64 },
}

/// Two contexts produced different fingerprints.
///
/// Lists the field groups whose digests differ. Neither side is assumed
/// to be the correct one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("context fingerprint mismatch (suspected groups: {})", describe_groups(.groups))]
pub struct MismatchError {
    pub groups: Vec<FieldGroup>,
}

impl MismatchError {
    pub fn involves(&self, group: FieldGroup) -> bool {
        self.groups.contains(&group)
    }
}

fn describe_groups(groups: &[FieldGroup]) -> String {
    if groups.is_empty() {
        return "unknown".to_string();
    }
    groups
        .iter()
        .map(|g| g.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Fatal error raised while bringing up the process context.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error("startup already ran (state: {0:?})")]
    AlreadyStarted(crate::registry::ProcessState),
}
