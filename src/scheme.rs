//! Arithmetic scheme selection.
//!
//! The scheme is data: it is parsed once from configuration and never
//! switched by editing code.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Which arithmetic model ciphertexts use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemeVariant {
    /// Exact modular integer arithmetic (BFV-style).
    Integer,
    /// Approximate fixed-point arithmetic with a rescaling chain (CKKS-style).
    Real,
}

impl SchemeVariant {
    /// Tag byte used in canonical encodings.
    pub fn tag(self) -> u8 {
        match self {
            SchemeVariant::Integer => 0x01,
            SchemeVariant::Real => 0x02,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(SchemeVariant::Integer),
            0x02 => Some(SchemeVariant::Real),
            _ => None,
        }
    }

    /// Minimum number of primes a chain needs under this scheme.
    ///
    /// Real needs one prime to keep after the last rescale and one special
    /// prime for key switching.
    pub fn min_chain_len(self) -> usize {
        match self {
            SchemeVariant::Integer => 1,
            SchemeVariant::Real => 2,
        }
    }

    pub fn needs_plaintext_modulus(self) -> bool {
        matches!(self, SchemeVariant::Integer)
    }
}

impl fmt::Display for SchemeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemeVariant::Integer => write!(f, "Integer"),
            SchemeVariant::Real => write!(f, "Real"),
        }
    }
}

impl FromStr for SchemeVariant {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "integer" | "bfv" => Ok(SchemeVariant::Integer),
            "real" | "ckks" => Ok(SchemeVariant::Real),
            "" => Err(ConfigurationError::MissingScheme),
            _ => Err(ConfigurationError::UnknownScheme(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("Integer".parse::<SchemeVariant>().unwrap(), SchemeVariant::Integer);
        assert_eq!("real".parse::<SchemeVariant>().unwrap(), SchemeVariant::Real);
        assert_eq!("BFV".parse::<SchemeVariant>().unwrap(), SchemeVariant::Integer);
        assert_eq!(" ckks ".parse::<SchemeVariant>().unwrap(), SchemeVariant::Real);
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(matches!(
            "bgv".parse::<SchemeVariant>(),
            Err(ConfigurationError::UnknownScheme(s)) if s == "bgv"
        ));
        assert!(matches!(
            "".parse::<SchemeVariant>(),
            Err(ConfigurationError::MissingScheme)
        ));
    }

    #[test]
    fn tags_are_distinct_and_reversible() {
        for v in [SchemeVariant::Integer, SchemeVariant::Real] {
            assert_eq!(SchemeVariant::from_tag(v.tag()), Some(v));
        }
        assert_ne!(SchemeVariant::Integer.tag(), SchemeVariant::Real.tag());
        assert_eq!(SchemeVariant::from_tag(0x00), None);
    }
}
