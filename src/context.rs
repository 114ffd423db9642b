//! Immutable encryption context.
//!
//! A `Context` is built once from validated parameters and never mutated.
//! Both endpoints derive it independently; the canonical encoding below is
//! what the session handshake fingerprints.

use std::fmt;

use crate::modulus::ModulusChain;
use crate::scheme::SchemeVariant;
use crate::security::{self, SecurityLevel};
use crate::validate::ValidatedParameters;

/// Validated, derived encryption context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Context {
    variant: SchemeVariant,
    degree: u64,
    chain: ModulusChain,
    primes: Vec<u64>,
    plaintext_modulus: Option<u64>,
    security_target: SecurityLevel,
    security_estimate: SecurityLevel,
    max_depth: usize,
    total_modulus_bits: u32,
}

/// Derives a [`Context`] from validated parameters.
pub struct ContextBuilder;

impl ContextBuilder {
    /// Deterministic: identical inputs give identical contexts.
    pub fn build(params: &ValidatedParameters) -> Context {
        let total_modulus_bits = params.chain.total_bits();
        // Validation guarantees the target bound admits the chain, so the
        // estimate is at least the target.
        let security_estimate =
            security::estimate(params.degree, total_modulus_bits).unwrap_or(params.security_target);

        Context {
            variant: params.variant,
            degree: params.degree,
            chain: params.chain.clone(),
            primes: params.primes.clone(),
            plaintext_modulus: params.plaintext_modulus,
            security_target: params.security_target,
            security_estimate,
            max_depth: max_depth(params.chain.len()),
            total_modulus_bits,
        }
    }
}

/// Depth available for a chain of `chain_len` primes.
///
/// The last prime is reserved for key switching and one prime must remain
/// after the final rescale, so Real gets `chain_len - 2` rescales. Integer
/// reports its modulus-switching levels the same way; a single-prime
/// Integer chain has no special prime and no levels to drop.
pub fn max_depth(chain_len: usize) -> usize {
    chain_len.saturating_sub(2)
}

impl Context {
    pub fn variant(&self) -> SchemeVariant {
        self.variant
    }

    pub fn degree(&self) -> u64 {
        self.degree
    }

    /// Declared prime bit-lengths.
    pub fn chain(&self) -> &ModulusChain {
        &self.chain
    }

    /// Concrete NTT-friendly primes, in chain order.
    pub fn primes(&self) -> &[u64] {
        &self.primes
    }

    pub fn plaintext_modulus(&self) -> Option<u64> {
        self.plaintext_modulus
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn security_target(&self) -> SecurityLevel {
        self.security_target
    }

    /// Strongest standard level the chain meets at this degree.
    pub fn security_estimate(&self) -> SecurityLevel {
        self.security_estimate
    }

    pub fn total_modulus_bits(&self) -> u32 {
        self.total_modulus_bits
    }

    // ── Canonical encoding ────────────────────────────────────────────
    //
    // Little-endian, length-prefixed. Field groups are encoded separately
    // so the fingerprint can hash each one on its own.

    pub fn encode_scheme(&self, out: &mut Vec<u8>) {
        out.push(self.variant.tag());
    }

    pub fn encode_degree(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.degree.to_le_bytes());
    }

    pub fn encode_chain(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.primes.len() as u32).to_le_bytes());
        for (&bits, &q) in self.chain.bit_lengths().iter().zip(&self.primes) {
            out.extend_from_slice(&bits.to_le_bytes());
            out.extend_from_slice(&q.to_le_bytes());
        }
    }

    pub fn encode_plaintext(&self, out: &mut Vec<u8>) {
        match self.plaintext_modulus {
            Some(t) => {
                out.push(1);
                out.extend_from_slice(&t.to_le_bytes());
            }
            None => out.push(0),
        }
    }

    /// Canonical bytes of {scheme, degree, chain, plaintext modulus}.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 8 + 4 + 12 * self.primes.len() + 9);
        self.encode_scheme(&mut out);
        self.encode_degree(&mut out);
        self.encode_chain(&mut out);
        self.encode_plaintext(&mut out);
        out
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} N={} chain={} ({} bits)",
            self.variant, self.degree, self.chain, self.total_modulus_bits
        )?;
        if let Some(t) = self.plaintext_modulus {
            write!(f, " t={}", t)?;
        }
        write!(
            f,
            " depth={} security>={}",
            self.max_depth,
            self.security_estimate.bits()
        )
    }
}
