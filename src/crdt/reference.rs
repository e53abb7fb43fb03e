// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! A single-value register.
//!
//! The value is carried by the causally maximal set operations. When more
//! than one is maximal (concurrent writes), the one with the highest
//! operation hash wins, so every replica picks the same winner without
//! talking to the others.

use std::collections::BTreeSet;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::trace;

use super::Container;
use super::Crdt;
use super::Element;
use super::admit;
use super::encode_value;
use super::flush;
use super::history::History;
use super::history::Insert;
use super::op::OpKind;
use super::op::Operation;
use super::policy::Open;
use super::policy::Policy;
use crate::error::ApplyError;
use crate::error::StoreError;
use crate::key::Hash;
use crate::key::KeyPair;
use crate::store::Store;

const CONTAINER: &str = "reference";

/// A replicated register holding one `T`.
#[derive(Clone)]
pub struct MutableReference<T: Element> {
    id: Hash,
    history: History,
    values: FxHashMap<Hash, T>,
    /// Set operations no applied operation follows.
    heads: BTreeSet<Hash>,
    queued: Vec<Operation>,
    policy: Arc<dyn Policy<T>>,
}

impl<T: Element> MutableReference<T> {
    /// Create an empty register anyone may write to.
    pub fn new(id: Hash) -> MutableReference<T> {
        return MutableReference::with_policy(id, Arc::new(Open));
    }

    /// Create an empty register guarded by a policy.
    pub fn with_policy(id: Hash, policy: Arc<dyn Policy<T>>) -> MutableReference<T> {
        return MutableReference {
            id,
            history: History::new(),
            values: FxHashMap::default(),
            heads: BTreeSet::new(),
            queued: Vec::new(),
            policy,
        };
    }

    /// Replace the value. The operation is queued until flushed.
    pub fn set_value(&mut self, author: &KeyPair, value: T) -> Result<Hash, ApplyError> {
        let (element, payload) = encode_value(&value)?;
        let preds = self.history.frontier().clone();
        let op = Operation::sign(author, OpKind::Set, self.id, element, payload, preds);
        let id = op.id();
        if let Insert::Applied(_) = self.apply(op.clone())? {
            self.queued.push(op);
        }
        return Ok(id);
    }

    /// The winning set operation, if any.
    pub fn winner(&self) -> Option<&Operation> {
        let id = self.heads.iter().next_back()?;
        return self.history.get(id);
    }

    /// The current value.
    pub fn value(&self) -> Option<&T> {
        let op = self.winner()?;
        return self.values.get(&op.element);
    }

    /// The concurrent set operations currently competing for the value.
    pub fn heads(&self) -> &BTreeSet<Hash> {
        return &self.heads;
    }

    pub fn history(&self) -> &History {
        return &self.history;
    }
}

impl<T: Element> Container for MutableReference<T> {
    fn id(&self) -> Hash {
        return self.id;
    }

    fn apply(&mut self, op: Operation) -> Result<Insert, ApplyError> {
        if self.history.contains(&op.id()) {
            return Ok(Insert::Known);
        }
        let value = admit(CONTAINER, &self.id, &[OpKind::Set], self.policy.as_ref(), &op)?;
        self.values.entry(op.element).or_insert(value);

        let inserted = self.history.insert(op);
        if let Insert::Applied(ids) = &inserted {
            // Released in causal order, so nothing applied later precedes `id`.
            for id in ids {
                let history = &self.history;
                self.heads.retain(|head| !history.happens_before(head, id));
                self.heads.insert(*id);
            }
        }
        return Ok(inserted);
    }

    fn known(&self) -> BTreeSet<Hash> {
        return self.history.known();
    }

    fn operation(&self, id: &Hash) -> Option<&Operation> {
        return self.history.get(id);
    }

    fn queued(&self) -> &[Operation] {
        return &self.queued;
    }

    fn save_queued_ops(&mut self, store: &dyn Store) -> Result<usize, StoreError> {
        return flush(&mut self.queued, store);
    }
}

impl<T: Element> Crdt for MutableReference<T> {
    fn merge(&mut self, other: &Self) {
        for op in other.history.operations() {
            if let Err(err) = self.apply(op.clone()) {
                trace!(%err, "merge skipped operation");
            }
        }
    }
}

impl<T: Element> std::fmt::Debug for MutableReference<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(
            f,
            "MutableReference {{ id: {}, heads: {}, applied: {} }}",
            self.id.short(),
            self.heads.len(),
            self.history.applied_len()
        );
    }
}
