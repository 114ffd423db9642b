//! Context fingerprints for the session handshake.
//!
//! A fingerprint is a fixed-size digest of a context's canonical encoding
//! plus one digest per field group. Peers compare the full digest; the
//! group digests only narrow down what differs.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::context::Context;
use crate::error::MismatchError;

pub type Hash = [u8; 32];

/// Domain separation for the full digest.
const FINGERPRINT_DOMAIN: &[u8] = b"cdts/context/v1\0";

/// Serialized size of a fingerprint: full digest plus four group digests.
pub const FINGERPRINT_LEN: usize = 32 * (1 + FieldGroup::ALL.len());

/// Logical field groups of a context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldGroup {
    Scheme,
    Degree,
    Chain,
    PlaintextModulus,
}

impl FieldGroup {
    pub const ALL: [FieldGroup; 4] = [
        FieldGroup::Scheme,
        FieldGroup::Degree,
        FieldGroup::Chain,
        FieldGroup::PlaintextModulus,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldGroup::Scheme => "scheme",
            FieldGroup::Degree => "degree",
            FieldGroup::Chain => "chain",
            FieldGroup::PlaintextModulus => "plaintext",
        }
    }

    fn domain_tag(self) -> u8 {
        match self {
            FieldGroup::Scheme => 0x10,
            FieldGroup::Degree => 0x11,
            FieldGroup::Chain => 0x12,
            FieldGroup::PlaintextModulus => 0x13,
        }
    }

    fn encode(self, ctx: &Context, out: &mut Vec<u8>) {
        match self {
            FieldGroup::Scheme => ctx.encode_scheme(out),
            FieldGroup::Degree => ctx.encode_degree(out),
            FieldGroup::Chain => ctx.encode_chain(out),
            FieldGroup::PlaintextModulus => ctx.encode_plaintext(out),
        }
    }
}

impl fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed-size fingerprint of a [`Context`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    /// SHA-256 over the domain tag and the full canonical encoding.
    pub digest: Hash,
    /// SHA-256 per field group, in [`FieldGroup::ALL`] order.
    pub groups: [Hash; 4],
}

impl Fingerprint {
    pub fn of(ctx: &Context) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(FINGERPRINT_DOMAIN);
        hasher.update(ctx.canonical_bytes());
        let digest: Hash = hasher.finalize().into();

        let mut groups = [[0u8; 32]; 4];
        let mut buf = Vec::new();
        for (slot, group) in groups.iter_mut().zip(FieldGroup::ALL) {
            buf.clear();
            group.encode(ctx, &mut buf);
            let mut hasher = Sha256::new();
            hasher.update([group.domain_tag()]);
            hasher.update(&buf);
            *slot = hasher.finalize().into();
        }

        Self { digest, groups }
    }

    pub fn group(&self, group: FieldGroup) -> &Hash {
        match group {
            FieldGroup::Scheme => &self.groups[0],
            FieldGroup::Degree => &self.groups[1],
            FieldGroup::Chain => &self.groups[2],
            FieldGroup::PlaintextModulus => &self.groups[3],
        }
    }

    /// Compare a peer's fingerprint against ours.
    ///
    /// Agreement requires the full digests to be byte-identical. On
    /// disagreement every group whose digest differs is reported.
    pub fn compare(&self, peer: &Fingerprint) -> Result<(), MismatchError> {
        if self.digest == peer.digest {
            return Ok(());
        }
        let groups = FieldGroup::ALL
            .into_iter()
            .filter(|&g| self.group(g) != peer.group(g))
            .collect();
        Err(MismatchError { groups })
    }

    pub fn to_bytes(&self) -> [u8; FINGERPRINT_LEN] {
        let mut out = [0u8; FINGERPRINT_LEN];
        out[..32].copy_from_slice(&self.digest);
        for (i, g) in self.groups.iter().enumerate() {
            out[32 * (i + 1)..32 * (i + 2)].copy_from_slice(g);
        }
        out
    }

    pub fn from_bytes(bytes: &[u8; FINGERPRINT_LEN]) -> Self {
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&bytes[..32]);
        let mut groups = [[0u8; 32]; 4];
        for (i, g) in groups.iter_mut().enumerate() {
            g.copy_from_slice(&bytes[32 * (i + 1)..32 * (i + 2)]);
        }
        Self { digest, groups }
    }

    /// Short hex form of the full digest, for logs.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.digest[..8])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.digest))
    }
}
