use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use voting_crypto::{fingerprint, Fingerprint, PublicKey};

/// A lightweight, read-only record of a peer's identity in one ledger's PKI
/// (Design Notes §9: "the PKI maps fingerprint to a lightweight peer
/// handle"). The node lookup needed for gossip dispatch is a separate
/// concern, owned by `voting-network`'s `NodeNetwork`, so this type carries
/// no reference back to the node itself and breaks the cyclic
/// node<->PKI reference the original design had.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerHandle {
    pub fingerprint: Fingerprint,
    pub public_key: PublicKey,
    pub is_adversary: bool,
}

/// Fixed-at-setup mapping from public-key fingerprint to peer identity (spec
/// §4.4). Each ledger owns its own independent `Pki`; lookups are O(log n)
/// via a `BTreeMap`, close enough to the spec's "constant-time" requirement
/// at demo scale and, unlike a `HashMap`, gives deterministic iteration order
/// for free wherever the PKI is walked in full (tip-hash partitioning, cohort
/// tallying).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pki {
    peers: BTreeMap<Fingerprint, PeerHandle>,
}

impl Pki {
    pub fn new(peers: impl IntoIterator<Item = PeerHandle>) -> Self {
        Self {
            peers: peers.into_iter().map(|p| (p.fingerprint, p)).collect(),
        }
    }

    pub fn from_public_keys(keys: impl IntoIterator<Item = (PublicKey, bool)>) -> Self {
        Self::new(keys.into_iter().map(|(public_key, is_adversary)| PeerHandle {
            fingerprint: fingerprint(&public_key),
            public_key,
            is_adversary,
        }))
    }

    pub fn lookup(&self, fp: Fingerprint) -> Option<&PeerHandle> {
        self.peers.get(&fp)
    }

    pub fn lookup_key(&self, key: &PublicKey) -> Option<&PeerHandle> {
        self.peers.get(&fingerprint(key))
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerHandle> {
        self.peers.values()
    }

    pub fn fingerprints(&self) -> impl Iterator<Item = &Fingerprint> {
        self.peers.keys()
    }
}
