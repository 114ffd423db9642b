//! End-to-end checks for parameter validation, context derivation and
//! fingerprint comparison.

use cdts::error::{ChainFault, ParameterError};
use cdts::params::SUPPORTED_DEGREES;
use cdts::primes::{bit_length, is_prime};
use cdts::{
    validate, ContextConfig, FieldGroup, Fingerprint, ModulusProfile, ParameterSet, SchemeVariant,
    SecurityLevel, Startup,
};

// ─── Reference scenarios ────────────────────────────────────────────────────

#[test]
fn integer_2048_with_default_chain() {
    let ctx = validate(&ParameterSet::integer(2048, 1024)).unwrap();
    assert_eq!(ctx.variant(), SchemeVariant::Integer);
    assert_eq!(ctx.degree(), 2048);
    assert_eq!(ctx.plaintext_modulus(), Some(1024));
}

#[test]
fn real_four_prime_chain_gives_depth_two() {
    // [60, 40, 40, 60] is 200 bits: above the 109-bit bound at 4096,
    // within the 218-bit bound at 8192.
    assert!(matches!(
        validate(&ParameterSet::real(4096, vec![60, 40, 40, 60])),
        Err(ParameterError::SecurityLevelTooLow { degree: 4096, .. })
    ));
    let ctx = validate(&ParameterSet::real(8192, vec![60, 40, 40, 60])).unwrap();
    assert_eq!(ctx.max_depth(), 2);
    assert_eq!(ctx.total_modulus_bits(), 200);

    let ctx = validate(&ParameterSet::real(4096, vec![30, 20, 20, 30])).unwrap();
    assert_eq!(ctx.max_depth(), 2);
    assert_eq!(ctx.primes(), &[1073692673, 1032193, 974849, 1073668097]);
}

#[test]
fn non_power_of_two_degree_rejected_for_both_schemes() {
    for params in [
        ParameterSet::integer(3000, 1024),
        ParameterSet::real(3000, vec![60, 40, 40, 60]),
    ] {
        assert_eq!(validate(&params), Err(ParameterError::UnsupportedDegree(3000)));
    }
}

#[test]
fn integer_and_real_contexts_disagree_on_scheme_and_degree() {
    let client = validate(&ParameterSet::integer(2048, 1024)).unwrap();
    let server = validate(&ParameterSet::real(8192, vec![60, 40, 40, 60])).unwrap();
    let err = Fingerprint::of(&client)
        .compare(&Fingerprint::of(&server))
        .unwrap_err();
    assert!(err.involves(FieldGroup::Scheme));
    assert!(err.involves(FieldGroup::Degree));
}

// ─── Properties over the supported range ────────────────────────────────────

#[test]
fn every_integer_default_validates_at_every_level() {
    for degree in SUPPORTED_DEGREES {
        for level in SecurityLevel::ALL {
            let params = ParameterSet::integer(degree, 257).with_security_level(level);
            let ctx = validate(&params)
                .unwrap_or_else(|e| panic!("N={degree} at {level}: {e}"));
            assert!(ctx.security_estimate() >= level);
            assert_eq!(ctx.security_target(), level);
        }
    }
}

#[test]
fn real_defaults_cover_all_but_the_smallest_degree() {
    for degree in SUPPORTED_DEGREES {
        let params = ParameterSet::real(degree, vec![]).with_profile(ModulusProfile::Default);
        let result = validate(&params);
        if degree == 1024 {
            assert!(matches!(
                result,
                Err(ParameterError::InvalidModulusChain {
                    reason: ChainFault::NoDefault { degree: 1024, .. },
                    ..
                })
            ));
        } else {
            let ctx = result.unwrap();
            assert!(ctx.chain().len() >= 2);
            assert_eq!(ctx.max_depth(), ctx.chain().len() - 2);
        }
    }
}

#[test]
fn resolved_primes_are_ntt_friendly() {
    for degree in SUPPORTED_DEGREES {
        let ctx = validate(&ParameterSet::integer(degree, 257)).unwrap();
        let mut seen = std::collections::HashSet::new();
        for (&q, &bits) in ctx.primes().iter().zip(ctx.chain().bit_lengths()) {
            assert!(is_prime(q));
            assert_eq!(q % (2 * degree), 1);
            assert_eq!(bit_length(q), bits);
            assert!(seen.insert(q), "duplicate prime {q} at N={degree}");
        }
    }
}

#[test]
fn one_bit_over_the_bound_is_rejected() {
    for degree in SUPPORTED_DEGREES {
        let max = cdts::security::max_modulus_bits(degree, SecurityLevel::Tc128).unwrap();
        // Spread max + 1 bits over as few primes of at most 60 bits as possible.
        let total = max + 1;
        let count = total.div_ceil(60);
        let bits: Vec<u32> = (0..count)
            .map(|i| total / count + u32::from(i < total % count))
            .collect();
        assert_eq!(bits.iter().sum::<u32>(), total);

        let params = ParameterSet::integer(degree, 2).with_profile(bits.into());
        assert_eq!(
            validate(&params),
            Err(ParameterError::SecurityLevelTooLow {
                degree,
                total_bits: total,
                max_bits: max,
                target: SecurityLevel::Tc128,
            })
        );
    }
}

// ─── Determinism and fingerprint sensitivity ────────────────────────────────

#[test]
fn independent_derivations_match_byte_for_byte() {
    let configs = [
        "scheme = \"Integer\"\ndegree = 4096\nplaintext_modulus = 65537\n",
        "scheme = \"Real\"\ndegree = 16384\n",
        "scheme = \"Real\"\ndegree = 8192\nmodulus_profile = [60, 40, 40, 60]\n",
    ];
    for toml in configs {
        let a = ContextConfig::from_toml_str(toml).unwrap().parameter_set();
        let b = ContextConfig::from_toml_str(toml).unwrap().parameter_set();
        let ca = validate(&a).unwrap();
        let cb = validate(&b).unwrap();
        assert_eq!(ca.canonical_bytes(), cb.canonical_bytes());
        assert_eq!(Fingerprint::of(&ca), Fingerprint::of(&cb));
    }
}

#[test]
fn every_single_field_change_changes_the_fingerprint() {
    let base = validate(&ParameterSet::integer(8192, 65537)).unwrap();
    let base_fp = Fingerprint::of(&base);

    let cases = [
        (ParameterSet::integer(8192, 65539), FieldGroup::PlaintextModulus),
        (ParameterSet::integer(16384, 65537), FieldGroup::Degree),
        (
            ParameterSet::integer(8192, 65537).with_profile(vec![43u32, 43, 44, 44].into()),
            FieldGroup::Chain,
        ),
    ];
    for (params, group) in cases {
        let other = Fingerprint::of(&validate(&params).unwrap());
        let err = base_fp.compare(&other).unwrap_err();
        assert!(err.involves(group), "{group} not flagged: {err}");
    }

    // Same chain bits, other scheme: scheme and plaintext both differ.
    let real = validate(&ParameterSet::real(8192, vec![43, 43, 44, 44, 44])).unwrap();
    let err = base_fp.compare(&Fingerprint::of(&real)).unwrap_err();
    assert!(err.involves(FieldGroup::Scheme));
    assert!(err.involves(FieldGroup::PlaintextModulus));
    assert!(!err.involves(FieldGroup::Degree));
    assert!(!err.involves(FieldGroup::Chain));
}

#[test]
fn startup_from_file_builds_shared_context() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "version = 1\nscheme = \"Integer\"\ndegree = 2048\nplaintext_modulus = 1024\n"
    )
    .unwrap();

    let registry = Startup::new().start_from_file(file.path()).unwrap();
    let ctx = registry.current();
    assert_eq!(
        registry.fingerprint(),
        Fingerprint::of(&validate(&ParameterSet::integer(2048, 1024)).unwrap())
    );
    assert_eq!(ctx.degree(), 2048);
}
