// model = "claude-opus-4-5"
// created = "2026-01-30"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! Conflict-free mutable containers.
//!
//! A container's logical value is a pure function of the operations it
//! holds. Local writes become signed operations whose predecessors are the
//! current frontier; remote operations go through the same checks as
//! local ones before they reach the history.

use std::collections::BTreeSet;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ApplyError;
use crate::error::FormatError;
use crate::error::StoreError;
use crate::error::ValidationError;
use crate::key::Hash;
use crate::object::Content;
use crate::object::Validate;
use crate::object::content_hash;
use crate::store::Record;
use crate::store::Store;

pub mod history;
pub mod op;
pub mod policy;
pub mod reference;
pub mod set;

use history::Insert;
use op::OpKind;
use op::Operation;
use policy::Policy;

/// A CRDT is a data type with a merge operator that is commutative,
/// associative, and idempotent.
pub trait Crdt {
    /// Merge another instance into this one.
    fn merge(&mut self, other: &Self);
}

/// Anything that can live in a container.
pub trait Element: Content + Validate + Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Element for T where T: Content + Validate + Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// The surface every container shares, independent of its element type.
pub trait Container {
    /// The derived identity of this container.
    fn id(&self) -> Hash;

    /// Check an operation and, if it passes, hand it to the history.
    fn apply(&mut self, op: Operation) -> Result<Insert, ApplyError>;

    /// Identities of every operation held, applied or pending.
    fn known(&self) -> BTreeSet<Hash>;

    /// Look up a held operation.
    fn operation(&self, id: &Hash) -> Option<&Operation>;

    /// Locally issued operations not yet flushed.
    fn queued(&self) -> &[Operation];

    /// Flush local operations to the store. Until this succeeds they are
    /// visible only to this replica.
    fn save_queued_ops(&mut self, store: &dyn Store) -> Result<usize, StoreError>;
}

/// Serialize a value and compute its identity.
pub(crate) fn encode_value<T: Element>(value: &T) -> Result<(Hash, Vec<u8>), FormatError> {
    let payload = postcard::to_stdvec(value).map_err(|e| FormatError::Payload(e.to_string()))?;
    return Ok((content_hash(value), payload));
}

/// Checks every operation passes before it touches a history: right
/// container, right kind, valid signature, a payload that decodes to a
/// valid value with the claimed hash, and an author the policy accepts.
pub(crate) fn admit<T: Element>(
    container: &'static str,
    target: &Hash,
    allowed: &[OpKind],
    policy: &dyn Policy<T>,
    op: &Operation,
) -> Result<T, ApplyError> {
    if op.target != *target {
        return Err(ValidationError::WrongTarget { expected: *target, found: op.target }.into());
    }
    if !allowed.contains(&op.kind) {
        return Err(FormatError::UnsupportedKind { kind: op.kind.name(), container }.into());
    }
    if !op.verify() {
        return Err(ValidationError::BadSignature(op.author).into());
    }

    let value: T = postcard::from_bytes(&op.payload).map_err(|e| FormatError::Payload(e.to_string()))?;
    let computed = content_hash(&value);
    if computed != op.element {
        return Err(ValidationError::HashMismatch { claimed: op.element, computed }.into());
    }
    value.validate()?;
    policy.authorize(op.kind, &op.author, &value)?;
    return Ok(value);
}

/// Save queued operations in order. On failure the unsaved tail stays
/// queued; saving is idempotent so retrying the whole queue is safe.
pub(crate) fn flush(queued: &mut Vec<Operation>, store: &dyn Store) -> Result<usize, StoreError> {
    let mut saved = 0;
    let mut failure = None;
    for op in queued.iter() {
        if let Err(err) = store.save(&Record::Operation(op.clone())) {
            failure = Some(err);
            break;
        }
        saved += 1;
    }
    *queued = queued.split_off(saved);
    return match failure {
        Some(err) => Err(err),
        None => Ok(saved),
    };
}
