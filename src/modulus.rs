//! Coefficient-modulus profiles and scheme-specific default chains.
//!
//! Default chains are looked up per scheme. A preset named for one scheme
//! is never used for the other.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ChainFault, ConfigurationError};
use crate::scheme::SchemeVariant;
use crate::security::SecurityLevel;

/// How the configuration describes the coefficient modulus.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModulusProfile {
    /// The declared scheme's default chain for the degree.
    Default,
    /// A named, scheme-specific default.
    Preset(Preset),
    /// Explicit prime bit-lengths, in chain order.
    Explicit(Vec<u32>),
}

impl Default for ModulusProfile {
    fn default() -> Self {
        ModulusProfile::Default
    }
}

impl From<Vec<u32>> for ModulusProfile {
    fn from(bits: Vec<u32>) -> Self {
        ModulusProfile::Explicit(bits)
    }
}

/// Named chain presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preset {
    IntegerDefault,
    RealDefault,
}

impl Preset {
    pub fn variant(self) -> SchemeVariant {
        match self {
            Preset::IntegerDefault => SchemeVariant::Integer,
            Preset::RealDefault => SchemeVariant::Real,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Preset::IntegerDefault => "integer-default",
            Preset::RealDefault => "real-default",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModulusProfile {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(ModulusProfile::Default),
            "integer-default" | "bfv-default" => Ok(ModulusProfile::Preset(Preset::IntegerDefault)),
            "real-default" | "ckks-default" => Ok(ModulusProfile::Preset(Preset::RealDefault)),
            _ => Err(ConfigurationError::UnknownPreset(s.to_string())),
        }
    }
}

/// Ordered prime bit-lengths making up a coefficient modulus.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModulusChain(Vec<u32>);

impl ModulusChain {
    pub fn new(bit_lengths: Vec<u32>) -> Self {
        Self(bit_lengths)
    }

    pub fn bit_lengths(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total_bits(&self) -> u32 {
        self.0.iter().sum()
    }
}

impl fmt::Display for ModulusChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

// ── Default tables ────────────────────────────────────────────────────

const INTEGER_128: [(u64, &[u32]); 6] = [
    (1024, &[27]),
    (2048, &[54]),
    (4096, &[36, 36, 37]),
    (8192, &[43, 43, 44, 44, 44]),
    (16384, &[48, 48, 48, 49, 49, 49, 49, 49, 49]),
    (32768, &[55; 16]),
];

const INTEGER_192: [(u64, &[u32]); 6] = [
    (1024, &[19]),
    (2048, &[37]),
    (4096, &[25, 25, 25]),
    (8192, &[38, 38, 38, 38]),
    (16384, &[50, 50, 50, 50, 50, 55]),
    (32768, &[55; 11]),
];

const INTEGER_256: [(u64, &[u32]); 6] = [
    (1024, &[14]),
    (2048, &[29]),
    (4096, &[58]),
    (8192, &[39, 39, 40]),
    (16384, &[47, 47, 47, 48, 48]),
    (32768, &[58; 8]),
];

const REAL_32768: [u32; 18] = [
    60, 40, 40, 40, 40, 40, 40, 40, 40, 40, 40, 40, 40, 40, 40, 40, 40, 60,
];

/// Real chains: outer 60-bit primes, 40-bit rescale primes (scale 2^40),
/// narrower at small degrees to stay within the 128-bit bound.
const REAL_128: [(u64, &[u32]); 5] = [
    (2048, &[27, 27]),
    (4096, &[40, 29, 40]),
    (8192, &[60, 40, 40, 60]),
    (16384, &[60, 40, 40, 40, 40, 40, 40, 60]),
    (32768, &REAL_32768),
];

/// Default chain for a scheme at a degree.
///
/// Integer defaults exist per security target. Real defaults are the
/// 128-bit chains regardless of target; a stricter target rejects them
/// at the security check.
pub fn default_chain(variant: SchemeVariant, degree: u64, target: SecurityLevel) -> Option<ModulusChain> {
    let table: &[(u64, &[u32])] = match (variant, target) {
        (SchemeVariant::Integer, SecurityLevel::Tc128) => &INTEGER_128,
        (SchemeVariant::Integer, SecurityLevel::Tc192) => &INTEGER_192,
        (SchemeVariant::Integer, SecurityLevel::Tc256) => &INTEGER_256,
        (SchemeVariant::Real, _) => &REAL_128,
    };
    table
        .iter()
        .find(|(d, _)| *d == degree)
        .map(|(_, bits)| ModulusChain::new(bits.to_vec()))
}

/// Resolve a profile into declared bit-lengths for the given scheme.
pub fn resolve_profile(
    profile: &ModulusProfile,
    variant: SchemeVariant,
    degree: u64,
    target: SecurityLevel,
) -> Result<ModulusChain, ChainFault> {
    match profile {
        ModulusProfile::Explicit(bits) => Ok(ModulusChain::new(bits.clone())),
        ModulusProfile::Preset(preset) if preset.variant() != variant => {
            Err(ChainFault::PresetSchemeMismatch {
                preset: preset.name().to_string(),
                variant,
            })
        }
        ModulusProfile::Default | ModulusProfile::Preset(_) => {
            default_chain(variant, degree, target).ok_or(ChainFault::NoDefault { degree, target })
        }
    }
}
