//! # cdts — Context Definition and Transport Safety
//!
//! Validates homomorphic encryption parameters, derives an immutable
//! encryption context from them, and fingerprints that context so two
//! endpoints can prove they derived the same one before exchanging
//! ciphertext.
//!
//! ## Architecture
//!
//! - **`scheme`** — Integer (exact) and Real (approximate) scheme variants
//! - **`params`** — Requested parameter sets and supported ring degrees
//! - **`modulus`** — Modulus profiles, presets and per-degree default chains
//! - **`primes`** — NTT-friendly prime search for a chain of bit sizes
//! - **`security`** — Standard security bounds on total modulus size
//! - **`validate`** — Ordered structural and security checks
//! - **`context`** — Immutable derived context and its canonical encoding
//! - **`fingerprint`** — SHA-256 context fingerprints and mismatch hints
//! - **`config`** — Versioned TOML configuration
//! - **`registry`** — Startup state machine and the shared process context

pub mod config;
pub mod context;
pub mod error;
pub mod fingerprint;
pub mod modulus;
pub mod params;
pub mod primes;
pub mod registry;
pub mod scheme;
pub mod security;
pub mod validate;

pub use config::ContextConfig;
pub use context::{Context, ContextBuilder};
pub use error::{ConfigurationError, MismatchError, ParameterError, StartupError};
pub use fingerprint::{FieldGroup, Fingerprint};
pub use modulus::{ModulusChain, ModulusProfile};
pub use params::ParameterSet;
pub use registry::{ContextRegistry, ProcessState, Startup};
pub use scheme::SchemeVariant;
pub use security::SecurityLevel;
pub use validate::validate;
