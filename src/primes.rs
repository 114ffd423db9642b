//! NTT-friendly prime search.
//!
//! Each chain prime q must satisfy q ≡ 1 (mod 2N) so that primitive 2N-th
//! roots of unity exist in Z_q. Primes are searched downward from 2^bits,
//! so the same (degree, bit-lengths) always resolves to the same primes.

use std::collections::HashMap;

use crate::error::ChainFault;

/// Largest bit-length accepted for a single chain prime.
pub const MAX_PRIME_BITS: u32 = 60;

/// Witnesses that make Miller-Rabin deterministic for every u64.
const MR_WITNESSES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

fn mul_mod(a: u64, b: u64, m: u64) -> u64 {
    ((a as u128 * b as u128) % m as u128) as u64
}

/// Modular exponentiation: base^exp mod modulus.
pub fn pow_mod(base: u64, mut exp: u64, modulus: u64) -> u64 {
    if modulus == 1 {
        return 0;
    }
    let mut result = 1u64;
    let mut b = base % modulus;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mul_mod(result, b, modulus);
        }
        exp >>= 1;
        b = mul_mod(b, b, modulus);
    }
    result
}

/// Deterministic Miller-Rabin primality test.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    for &p in &MR_WITNESSES {
        if n % p == 0 {
            return n == p;
        }
    }

    let mut d = n - 1;
    let mut s = 0;
    while d % 2 == 0 {
        d /= 2;
        s += 1;
    }

    'witness: for &a in &MR_WITNESSES {
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..s {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Find `count` primes of exactly `bits` bits with q ≡ 1 (mod 2·degree),
/// largest first.
pub fn find_ntt_primes(degree: u64, bits: u32, count: usize) -> Result<Vec<u64>, ChainFault> {
    let two_n = 2 * degree;
    let not_enough = ChainFault::NotEnoughPrimes {
        bits,
        modulus: two_n,
    };
    if bits < 2 || bits > 63 {
        return Err(not_enough);
    }

    let upper = 1u64 << bits;
    let lower = 1u64 << (bits - 1);
    let mut primes = Vec::with_capacity(count);

    let mut k = (upper - 1) / two_n;
    while primes.len() < count && k > 0 {
        let candidate = two_n * k + 1;
        if candidate < lower {
            break;
        }
        if is_prime(candidate) {
            primes.push(candidate);
        }
        k -= 1;
    }

    if primes.len() < count {
        return Err(not_enough);
    }
    Ok(primes)
}

/// Resolve declared bit-lengths into concrete, pairwise distinct primes.
///
/// Primes of equal bit-length are handed out in the order they appear in
/// the chain. Bit-lengths are assumed to be within `1..=MAX_PRIME_BITS`.
pub fn resolve_chain(degree: u64, bit_lengths: &[u32]) -> Result<Vec<u64>, ChainFault> {
    let mut needed: HashMap<u32, usize> = HashMap::new();
    let mut first_seen = Vec::new();
    for &bits in bit_lengths {
        let count = needed.entry(bits).or_default();
        if *count == 0 {
            first_seen.push(bits);
        }
        *count += 1;
    }

    // Search in chain order so the reported fault is stable.
    let mut pools: HashMap<u32, std::vec::IntoIter<u64>> = HashMap::new();
    for bits in first_seen {
        let primes = find_ntt_primes(degree, bits, needed[&bits])?;
        pools.insert(bits, primes.into_iter());
    }

    let mut primes = Vec::with_capacity(bit_lengths.len());
    for bits in bit_lengths {
        let next = pools.get_mut(bits).and_then(|pool| pool.next()).ok_or(
            ChainFault::NotEnoughPrimes {
                bits: *bits,
                modulus: 2 * degree,
            },
        )?;
        primes.push(next);
    }
    Ok(primes)
}

/// Bit-length of a prime as stored in a resolved chain.
pub fn bit_length(q: u64) -> u32 {
    64 - q.leading_zeros()
}
