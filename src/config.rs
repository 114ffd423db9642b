//! Context configuration (`cdts.toml`).
//!
//! One versioned file, loaded identically by client and server:
//!
//! ```toml
//! version = 1
//! scheme = "Integer"
//! degree = 2048
//! modulus_profile = "default"       # or a preset name, or [60, 40, 40, 60]
//! plaintext_modulus = 1024          # Integer only
//! security_level = 128              # optional: 128, 192 or 256
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigurationError;
use crate::modulus::ModulusProfile;
use crate::params::ParameterSet;
use crate::scheme::SchemeVariant;
use crate::security::SecurityLevel;

/// Configuration format version this build reads.
pub const CONFIG_VERSION: u32 = 1;

/// The scheme and the parameters only that scheme takes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemeConfig {
    /// A missing modulus is kept as `None` and rejected by validation.
    Integer { plaintext_modulus: Option<u64> },
    Real,
}

impl SchemeConfig {
    pub fn variant(&self) -> SchemeVariant {
        match self {
            SchemeConfig::Integer { .. } => SchemeVariant::Integer,
            SchemeConfig::Real => SchemeVariant::Real,
        }
    }
}

/// Parsed context configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextConfig {
    pub scheme: SchemeConfig,
    pub degree: u64,
    pub modulus_profile: ModulusProfile,
    pub security_level: SecurityLevel,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    version: Option<u32>,
    scheme: Option<String>,
    degree: Option<u64>,
    #[serde(alias = "modulusProfile")]
    modulus_profile: Option<RawProfile>,
    #[serde(alias = "plaintextModulus")]
    plaintext_modulus: Option<u64>,
    #[serde(alias = "securityLevel")]
    security_level: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawProfile {
    Named(String),
    Bits(Vec<u32>),
}

impl ContextConfig {
    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigurationError> {
        let raw: RawConfig =
            toml::from_str(content).map_err(|e| ConfigurationError::Parse(e.to_string()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigurationError> {
        let version = raw.version.unwrap_or(CONFIG_VERSION);
        if version != CONFIG_VERSION {
            return Err(ConfigurationError::UnsupportedVersion {
                found: version,
                supported: CONFIG_VERSION,
            });
        }

        let variant: SchemeVariant = raw
            .scheme
            .as_deref()
            .ok_or(ConfigurationError::MissingScheme)?
            .parse()?;

        let scheme = match variant {
            SchemeVariant::Integer => SchemeConfig::Integer {
                plaintext_modulus: raw.plaintext_modulus,
            },
            SchemeVariant::Real => {
                if raw.plaintext_modulus.is_some() {
                    return Err(ConfigurationError::PlaintextModulusForReal);
                }
                SchemeConfig::Real
            }
        };

        let degree = raw.degree.ok_or(ConfigurationError::MissingField("degree"))?;

        let modulus_profile = match raw.modulus_profile {
            None => ModulusProfile::Default,
            Some(RawProfile::Named(name)) => name.parse()?,
            Some(RawProfile::Bits(bits)) => ModulusProfile::Explicit(bits),
        };

        let security_level = match raw.security_level {
            None => SecurityLevel::default(),
            Some(bits) => SecurityLevel::from_bits(bits)?,
        };

        Ok(Self {
            scheme,
            degree,
            modulus_profile,
            security_level,
        })
    }

    /// The single parameter set this configuration describes.
    pub fn parameter_set(&self) -> ParameterSet {
        let plaintext_modulus = match self.scheme {
            SchemeConfig::Integer { plaintext_modulus } => plaintext_modulus,
            SchemeConfig::Real => None,
        };
        ParameterSet {
            variant: self.scheme.variant(),
            degree: self.degree,
            modulus_profile: self.modulus_profile.clone(),
            plaintext_modulus,
            security_level: self.security_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn integer_config() {
        let cfg = ContextConfig::from_toml_str(
            r#"
            version = 1
            scheme = "Integer"
            degree = 2048
            plaintext_modulus = 1024
            "#,
        )
        .unwrap();
        assert_eq!(
            cfg.scheme,
            SchemeConfig::Integer {
                plaintext_modulus: Some(1024)
            }
        );
        assert_eq!(cfg.parameter_set(), ParameterSet::integer(2048, 1024));
    }

    #[test]
    fn real_config_with_explicit_chain() {
        let cfg = ContextConfig::from_toml_str(
            r#"
            scheme = "Real"
            degree = 8192
            modulusProfile = [60, 40, 40, 60]
            securityLevel = 128
            "#,
        )
        .unwrap();
        assert_eq!(cfg.parameter_set(), ParameterSet::real(8192, vec![60, 40, 40, 60]));
    }

    #[test]
    fn named_preset() {
        let cfg = ContextConfig::from_toml_str(
            "scheme = \"ckks\"\ndegree = 4096\nmodulus_profile = \"real-default\"\n",
        )
        .unwrap();
        assert_eq!(
            cfg.modulus_profile,
            ModulusProfile::Preset(crate::modulus::Preset::RealDefault)
        );
    }

    #[test]
    fn real_with_plaintext_is_rejected() {
        let err = ContextConfig::from_toml_str(
            "scheme = \"Real\"\ndegree = 4096\nplaintext_modulus = 17\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::PlaintextModulusForReal));
    }

    #[test]
    fn missing_and_unknown_scheme() {
        assert!(matches!(
            ContextConfig::from_toml_str("degree = 4096\n"),
            Err(ConfigurationError::MissingScheme)
        ));
        assert!(matches!(
            ContextConfig::from_toml_str("scheme = \"bgv\"\ndegree = 4096\n"),
            Err(ConfigurationError::UnknownScheme(_))
        ));
    }

    #[test]
    fn integer_without_plaintext_reaches_validation() {
        let cfg = ContextConfig::from_toml_str("scheme = \"Integer\"\ndegree = 4096\n").unwrap();
        assert_eq!(cfg.parameter_set().plaintext_modulus, None);
    }

    #[test]
    fn malformed_sources() {
        assert!(matches!(
            ContextConfig::from_toml_str("scheme = "),
            Err(ConfigurationError::Parse(_))
        ));
        assert!(matches!(
            ContextConfig::from_toml_str("scheme = \"Real\"\ndegree = 4096\nflavour = 1\n"),
            Err(ConfigurationError::Parse(_))
        ));
        assert!(matches!(
            ContextConfig::from_toml_str("scheme = \"Real\"\n"),
            Err(ConfigurationError::MissingField("degree"))
        ));
        assert!(matches!(
            ContextConfig::from_toml_str("version = 2\nscheme = \"Real\"\ndegree = 4096\n"),
            Err(ConfigurationError::UnsupportedVersion { found: 2, .. })
        ));
        assert!(matches!(
            ContextConfig::from_toml_str("scheme = \"Real\"\ndegree = 4096\nsecurity_level = 80\n"),
            Err(ConfigurationError::InvalidSecurityLevel(80))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "scheme = \"Integer\"\ndegree = 1024\nplaintext_modulus = 257").unwrap();
        let cfg = ContextConfig::load(file.path()).unwrap();
        assert_eq!(cfg.degree, 1024);

        let missing = ContextConfig::load(Path::new("/nonexistent/cdts.toml")).unwrap_err();
        assert!(matches!(missing, ConfigurationError::Io { .. }));
    }
}
