//! Parameter validation.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. degree is supported
//! 2. Integer scheme has a usable plaintext modulus
//! 3. the modulus chain is well formed and resolvable to NTT primes
//! 4. the chain stays within the security bound for the degree
//!
//! Validation is pure: the same `ParameterSet` always produces the same
//! context or the same error.

use crate::context::{Context, ContextBuilder};
use crate::error::{ChainFault, ParameterError, PlaintextFault};
use crate::modulus::{resolve_profile, ModulusChain};
use crate::params::{is_supported_degree, ParameterSet};
use crate::primes::{resolve_chain, MAX_PRIME_BITS};
use crate::scheme::SchemeVariant;
use crate::security::{max_modulus_bits, SecurityLevel};

/// Parameters that passed every check, with the chain resolved to primes.
///
/// Only [`check`] constructs this, so a [`Context`] can only be built from
/// parameters that were validated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedParameters {
    pub(crate) variant: SchemeVariant,
    pub(crate) degree: u64,
    pub(crate) chain: ModulusChain,
    pub(crate) primes: Vec<u64>,
    pub(crate) plaintext_modulus: Option<u64>,
    pub(crate) security_target: SecurityLevel,
}

impl ValidatedParameters {
    pub fn variant(&self) -> SchemeVariant {
        self.variant
    }

    pub fn degree(&self) -> u64 {
        self.degree
    }

    pub fn chain(&self) -> &ModulusChain {
        &self.chain
    }

    pub fn primes(&self) -> &[u64] {
        &self.primes
    }
}

/// Validate a parameter set and build its context.
pub fn validate(params: &ParameterSet) -> Result<Context, ParameterError> {
    let validated = check(params)?;
    Ok(ContextBuilder::build(&validated))
}

/// Run every check without building the context.
pub fn check(params: &ParameterSet) -> Result<ValidatedParameters, ParameterError> {
    let variant = params.variant;
    let degree = params.degree;

    if !is_supported_degree(degree) {
        return Err(ParameterError::UnsupportedDegree(degree));
    }

    // Resolved up front so the plaintext check can compare against the
    // real smallest prime. Faults are reported at step 3. A chain over the
    // loosest bound for the degree fails step 4 whatever the target, so no
    // primes are searched for it.
    let loosest = loosest_bound(degree);
    let resolved = resolve_profile(&params.modulus_profile, variant, degree, params.security_level)
        .and_then(|chain| {
            check_chain_shape(variant, &chain)?;
            if chain.total_bits() > loosest {
                return Ok((chain, None));
            }
            let primes = resolve_chain(degree, chain.bit_lengths())?;
            Ok((chain, Some(primes)))
        });

    let plaintext_modulus = if variant.needs_plaintext_modulus() {
        let smallest = resolved
            .as_ref()
            .ok()
            .and_then(|(_, primes)| primes.as_ref())
            .and_then(|primes| primes.iter().copied().min());
        Some(check_plaintext(params.plaintext_modulus, smallest)?)
    } else {
        None
    };

    let (chain, primes) =
        resolved.map_err(|reason| ParameterError::InvalidModulusChain { variant, reason })?;

    let total_bits = chain.total_bits();
    let target = params.security_level;
    let max_bits = max_modulus_bits(degree, target).unwrap_or(0);
    let primes = match primes {
        Some(primes) if total_bits <= max_bits => primes,
        _ => {
            return Err(ParameterError::SecurityLevelTooLow {
                degree,
                total_bits,
                max_bits,
                target,
            })
        }
    };

    Ok(ValidatedParameters {
        variant,
        degree,
        chain,
        primes,
        plaintext_modulus,
        security_target: target,
    })
}

fn loosest_bound(degree: u64) -> u32 {
    SecurityLevel::ALL
        .iter()
        .filter_map(|&level| max_modulus_bits(degree, level))
        .max()
        .unwrap_or(0)
}

fn check_plaintext(modulus: Option<u64>, smallest_prime: Option<u64>) -> Result<u64, ParameterError> {
    let reason = match (modulus, smallest_prime) {
        (None, _) => PlaintextFault::Absent,
        (Some(0), _) => PlaintextFault::Zero,
        (Some(t), Some(q)) if t >= q => PlaintextFault::NotBelowChain {
            modulus: t,
            smallest_prime: q,
        },
        (Some(t), _) => return Ok(t),
    };
    Err(ParameterError::MissingPlaintextModulus { reason })
}

fn check_chain_shape(variant: SchemeVariant, chain: &ModulusChain) -> Result<(), ChainFault> {
    let min = variant.min_chain_len();
    if chain.len() < min {
        return Err(ChainFault::TooShort {
            len: chain.len(),
            min,
        });
    }
    for (index, &bits) in chain.bit_lengths().iter().enumerate() {
        if bits == 0 {
            return Err(ChainFault::ZeroBits { index });
        }
        if bits > MAX_PRIME_BITS {
            return Err(ChainFault::TooManyBits {
                index,
                bits,
                max: MAX_PRIME_BITS,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulus::{ModulusProfile, Preset};

    #[test]
    fn degree_is_checked_first() {
        let mut params = ParameterSet::integer(3000, 0);
        params.modulus_profile = ModulusProfile::Explicit(vec![]);
        assert_eq!(check(&params), Err(ParameterError::UnsupportedDegree(3000)));
    }

    #[test]
    fn plaintext_checked_before_chain() {
        let mut params = ParameterSet::integer(4096, 0);
        params.plaintext_modulus = None;
        params.modulus_profile = ModulusProfile::Explicit(vec![0, 99]);
        assert_eq!(
            check(&params),
            Err(ParameterError::MissingPlaintextModulus {
                reason: PlaintextFault::Absent
            })
        );
    }

    #[test]
    fn zero_plaintext_rejected() {
        assert_eq!(
            check(&ParameterSet::integer(2048, 0)),
            Err(ParameterError::MissingPlaintextModulus {
                reason: PlaintextFault::Zero
            })
        );
    }

    #[test]
    fn plaintext_must_sit_below_smallest_prime() {
        // 1024 resolves to a single 27-bit prime 134215681
        let err = check(&ParameterSet::integer(1024, 134215681)).unwrap_err();
        assert_eq!(
            err,
            ParameterError::MissingPlaintextModulus {
                reason: PlaintextFault::NotBelowChain {
                    modulus: 134215681,
                    smallest_prime: 134215681,
                }
            }
        );
        assert!(check(&ParameterSet::integer(1024, 134215680)).is_ok());
    }

    #[test]
    fn unresolvable_chain_reported_after_plaintext() {
        let params = ParameterSet::integer(4096, 65537).with_profile(vec![61u32].into());
        assert_eq!(
            check(&params),
            Err(ParameterError::InvalidModulusChain {
                variant: SchemeVariant::Integer,
                reason: ChainFault::TooManyBits {
                    index: 0,
                    bits: 61,
                    max: MAX_PRIME_BITS
                },
            })
        );
    }

    #[test]
    fn real_chain_needs_two_primes() {
        assert_eq!(
            check(&ParameterSet::real(4096, vec![50])),
            Err(ParameterError::InvalidModulusChain {
                variant: SchemeVariant::Real,
                reason: ChainFault::TooShort { len: 1, min: 2 },
            })
        );
    }

    #[test]
    fn zero_bit_prime_rejected() {
        assert_eq!(
            check(&ParameterSet::real(4096, vec![30, 0, 30])),
            Err(ParameterError::InvalidModulusChain {
                variant: SchemeVariant::Real,
                reason: ChainFault::ZeroBits { index: 1 },
            })
        );
    }

    #[test]
    fn integer_preset_not_reused_for_real() {
        let params = ParameterSet::real(4096, vec![])
            .with_profile(ModulusProfile::Preset(Preset::IntegerDefault));
        assert!(matches!(
            check(&params),
            Err(ParameterError::InvalidModulusChain {
                reason: ChainFault::PresetSchemeMismatch { .. },
                ..
            })
        ));
    }

    #[test]
    fn oversized_chain_fails_security() {
        assert_eq!(
            check(&ParameterSet::real(4096, vec![60, 40, 40, 60])),
            Err(ParameterError::SecurityLevelTooLow {
                degree: 4096,
                total_bits: 200,
                max_bits: 109,
                target: SecurityLevel::Tc128,
            })
        );
    }

    #[test]
    fn hopeless_chain_fails_security_without_a_prime_search() {
        // Thousands of 60-bit primes at 32768 would take a long search.
        let params = ParameterSet::real(32768, vec![60; 5000]);
        assert_eq!(
            check(&params),
            Err(ParameterError::SecurityLevelTooLow {
                degree: 32768,
                total_bits: 300_000,
                max_bits: 881,
                target: SecurityLevel::Tc128,
            })
        );

        // Plaintext faults still come first.
        let mut params = ParameterSet::integer(32768, 65537).with_profile(vec![60u32; 5000].into());
        params.plaintext_modulus = None;
        assert_eq!(
            check(&params),
            Err(ParameterError::MissingPlaintextModulus {
                reason: PlaintextFault::Absent
            })
        );
    }

    #[test]
    fn stricter_target_shrinks_the_bound() {
        let params = ParameterSet::real(8192, vec![60, 40, 40, 60])
            .with_security_level(SecurityLevel::Tc192);
        assert!(matches!(
            check(&params),
            Err(ParameterError::SecurityLevelTooLow { max_bits: 152, .. })
        ));

        let params = ParameterSet::integer(8192, 65537).with_security_level(SecurityLevel::Tc192);
        let validated = check(&params).unwrap();
        assert_eq!(validated.chain().bit_lengths(), &[38, 38, 38, 38]);
    }

    #[test]
    fn validation_is_repeatable() {
        let params = ParameterSet::real(4096, vec![60, 40, 40, 60]);
        assert_eq!(check(&params), check(&params));
        let params = ParameterSet::integer(8192, 65537);
        assert_eq!(check(&params), check(&params));
    }
}
