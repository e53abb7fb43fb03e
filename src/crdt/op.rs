// model = "claude-opus-4-5"
// created = "2026-01-30"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! Operations on mutable containers.
//!
//! An operation is the unit of change: "add this element", "remove this
//! element", or "set the value". Each one names the container it targets,
//! carries its payload, and lists the operations its author had already
//! seen when issuing it (its causal predecessors). The identity of an
//! operation is a hash over all of that plus the author, so an operation
//! can be referenced but never edited. The signature covers the identity.
//!
//! Payloads are stored twice over: `element` is the content hash of the
//! value, `payload` is its serialized form. Receivers check that the two
//! agree before trusting either.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::key::Hash;
use crate::key::KeyPair;
use crate::key::KeyPub;
use crate::key::Signature;

/// Type constant for operation identity hashes.
pub const TYPE_OPERATION: u8 = 0x12;

/// What an operation does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OpKind {
    Add,
    Remove,
    Set,
}

impl OpKind {
    pub fn name(&self) -> &'static str {
        return match self {
            OpKind::Add => "add",
            OpKind::Remove => "remove",
            OpKind::Set => "set",
        };
    }

    fn tag(&self) -> u8 {
        return match self {
            OpKind::Add => 0,
            OpKind::Remove => 1,
            OpKind::Set => 2,
        };
    }
}

/// A signed change to a container.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OpKind,
    /// The container this operation changes.
    pub target: Hash,
    /// Content hash of the value carried.
    pub element: Hash,
    /// The value carried, serialized.
    pub payload: Vec<u8>,
    /// Operations observed by the author before issuing this one.
    pub preds: BTreeSet<Hash>,
    pub author: KeyPub,
    pub signature: Signature,
}

/// Hash everything but the signature.
fn identity(
    kind: OpKind,
    target: &Hash,
    element: &Hash,
    payload: &[u8],
    preds: &BTreeSet<Hash>,
    author: &KeyPub,
) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[TYPE_OPERATION, kind.tag()]);
    hasher.update(&target.0);
    hasher.update(&element.0);
    hasher.update(&(payload.len() as u64).to_le_bytes());
    hasher.update(payload);
    // BTreeSet iterates in order, so the encoding is canonical.
    hasher.update(&(preds.len() as u64).to_le_bytes());
    for pred in preds {
        hasher.update(&pred.0);
    }
    hasher.update(&author.0);
    return Hash(*hasher.finalize().as_bytes());
}

impl Operation {
    /// Build and sign an operation.
    pub fn sign(
        keypair: &KeyPair,
        kind: OpKind,
        target: Hash,
        element: Hash,
        payload: Vec<u8>,
        preds: BTreeSet<Hash>,
    ) -> Operation {
        let id = identity(kind, &target, &element, &payload, &preds, &keypair.key_pub);
        let signature = keypair.sign(&id.0);
        return Operation {
            kind,
            target,
            element,
            payload,
            preds,
            author: keypair.key_pub,
            signature,
        };
    }

    /// The identity of this operation.
    pub fn id(&self) -> Hash {
        return identity(
            self.kind,
            &self.target,
            &self.element,
            &self.payload,
            &self.preds,
            &self.author,
        );
    }

    /// Check the signature against the author.
    pub fn verify(&self) -> bool {
        return self.author.verify(&self.id().0, &self.signature);
    }
}
