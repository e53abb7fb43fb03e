// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! A causally ordered add/remove set.
//!
//! An element is present iff some add of it is causally after every
//! remove of it. A remove that is concurrent with an add therefore wins:
//! a message deleted on one replica while re-added on another stays gone.
//! Duplicate adds collapse because elements are keyed by content hash.

use std::collections::BTreeSet;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
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
use crate::object::content_hash;
use crate::store::Store;

const CONTAINER: &str = "set";

/// A replicated set of `T`.
#[derive(Clone)]
pub struct MutableSet<T: Element> {
    id: Hash,
    history: History,
    /// Every element any held operation carries, by content hash.
    elements: FxHashMap<Hash, T>,
    /// Applied add operations per element.
    adds: FxHashMap<Hash, SmallVec<[Hash; 1]>>,
    /// Applied remove operations per element.
    removes: FxHashMap<Hash, SmallVec<[Hash; 1]>>,
    queued: Vec<Operation>,
    policy: Arc<dyn Policy<T>>,
}

impl<T: Element> MutableSet<T> {
    /// Create an empty set anyone may write to.
    pub fn new(id: Hash) -> MutableSet<T> {
        return MutableSet::with_policy(id, Arc::new(Open));
    }

    /// Create an empty set guarded by a policy.
    pub fn with_policy(id: Hash, policy: Arc<dyn Policy<T>>) -> MutableSet<T> {
        return MutableSet {
            id,
            history: History::new(),
            elements: FxHashMap::default(),
            adds: FxHashMap::default(),
            removes: FxHashMap::default(),
            queued: Vec::new(),
            policy,
        };
    }

    /// Add an element. The operation is queued until flushed.
    pub fn add(&mut self, author: &KeyPair, value: T) -> Result<Hash, ApplyError> {
        let (element, payload) = encode_value(&value)?;
        let preds = self.history.frontier().clone();
        let op = Operation::sign(author, OpKind::Add, self.id, element, payload, preds);
        return self.issue(op);
    }

    /// Remove an element. Returns `None` if it was not present.
    pub fn delete(&mut self, author: &KeyPair, value: &T) -> Result<Option<Hash>, ApplyError> {
        let (element, payload) = encode_value(value)?;
        if !self.present(&element) {
            return Ok(None);
        }
        let preds = self.history.frontier().clone();
        let op = Operation::sign(author, OpKind::Remove, self.id, element, payload, preds);
        return self.issue(op).map(Some);
    }

    fn issue(&mut self, op: Operation) -> Result<Hash, ApplyError> {
        let id = op.id();
        if let Insert::Applied(_) = self.apply(op.clone())? {
            self.queued.push(op);
        }
        return Ok(id);
    }

    fn present(&self, element: &Hash) -> bool {
        let Some(adds) = self.adds.get(element) else {
            return false;
        };
        let Some(removes) = self.removes.get(element) else {
            return true;
        };
        return adds.iter().any(|add| {
            removes.iter().all(|remove| self.history.happens_before(remove, add))
        });
    }

    /// True if the element is in the logical value.
    pub fn contains(&self, value: &T) -> bool {
        return self.present(&content_hash(value));
    }

    /// Any element a held operation carries, present or not.
    pub fn get(&self, element: &Hash) -> Option<&T> {
        return self.elements.get(element);
    }

    /// Content hashes of the present elements, in order.
    pub fn element_ids(&self) -> BTreeSet<Hash> {
        return self.adds.keys().filter(|e| self.present(e)).copied().collect();
    }

    /// The logical value, ordered by element hash.
    pub fn values(&self) -> Vec<&T> {
        return self
            .element_ids()
            .iter()
            .filter_map(|element| self.elements.get(element))
            .collect();
    }

    pub fn len(&self) -> usize {
        return self.element_ids().len();
    }

    pub fn is_empty(&self) -> bool {
        return self.len() == 0;
    }

    pub fn history(&self) -> &History {
        return &self.history;
    }
}

impl<T: Element> Container for MutableSet<T> {
    fn id(&self) -> Hash {
        return self.id;
    }

    fn apply(&mut self, op: Operation) -> Result<Insert, ApplyError> {
        if self.history.contains(&op.id()) {
            return Ok(Insert::Known);
        }
        let value = admit(CONTAINER, &self.id, &[OpKind::Add, OpKind::Remove], self.policy.as_ref(), &op)?;
        self.elements.entry(op.element).or_insert(value);

        let inserted = self.history.insert(op);
        if let Insert::Applied(ids) = &inserted {
            for id in ids {
                let Some(op) = self.history.get(id) else {
                    continue;
                };
                let index = match op.kind {
                    OpKind::Remove => &mut self.removes,
                    _ => &mut self.adds,
                };
                index.entry(op.element).or_default().push(*id);
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

impl<T: Element> Crdt for MutableSet<T> {
    fn merge(&mut self, other: &Self) {
        for op in other.history.operations() {
            if let Err(err) = self.apply(op.clone()) {
                trace!(%err, "merge skipped operation");
            }
        }
    }
}

impl<T: Element> std::fmt::Debug for MutableSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(
            f,
            "MutableSet {{ id: {}, len: {}, applied: {}, pending: {} }}",
            self.id.short(),
            self.len(),
            self.history.applied_len(),
            self.history.pending_len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crdt::policy::SelfOnly;
    use crate::error::AuthorizationError;
    use crate::error::FormatError;
    use crate::error::ValidationError;
    use crate::key::KeyPub;
    use crate::key::hash;
    use crate::room::Topic;
    use crate::store::MemoryStore;

    fn topic(text: &str) -> Topic {
        return Topic(text.to_string());
    }

    fn set() -> MutableSet<Topic> {
        return MutableSet::new(hash(b"set"));
    }

    #[test]
    fn add_then_contains() {
        let alice = KeyPair::generate();
        let mut s = set();
        s.add(&alice, topic("a")).unwrap();
        assert!(s.contains(&topic("a")));
        assert!(!s.contains(&topic("b")));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn delete_removes() {
        let alice = KeyPair::generate();
        let mut s = set();
        s.add(&alice, topic("a")).unwrap();
        assert!(s.delete(&alice, &topic("a")).unwrap().is_some());
        assert!(!s.contains(&topic("a")));
        assert!(s.is_empty());
    }

    #[test]
    fn delete_of_absent_element_issues_nothing() {
        let alice = KeyPair::generate();
        let mut s = set();
        assert_eq!(s.delete(&alice, &topic("a")).unwrap(), None);
        assert!(s.queued().is_empty());
    }

    #[test]
    fn re_add_after_delete_is_present() {
        let alice = KeyPair::generate();
        let mut s = set();
        s.add(&alice, topic("a")).unwrap();
        s.delete(&alice, &topic("a")).unwrap();
        s.add(&alice, topic("a")).unwrap();
        assert!(s.contains(&topic("a")));
    }

    #[test]
    fn local_operations_chain_on_the_frontier() {
        let alice = KeyPair::generate();
        let mut s = set();
        let first = s.add(&alice, topic("a")).unwrap();
        let second = s.add(&alice, topic("b")).unwrap();
        assert!(s.history().happens_before(&first, &second));
        assert_eq!(s.history().frontier(), &BTreeSet::from([second]));
    }

    #[test]
    fn concurrent_remove_wins() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let mut a = set();
        a.add(&alice, topic("x")).unwrap();

        let mut b = set();
        b.merge(&a);
        // alice removes while bob re-adds, neither seeing the other
        a.delete(&alice, &topic("x")).unwrap();
        b.add(&bob, topic("x")).unwrap();

        a.merge(&b);
        b.merge(&a);
        assert!(!a.contains(&topic("x")));
        assert!(!b.contains(&topic("x")));
    }

    #[test]
    fn reapplying_is_a_no_op() {
        let alice = KeyPair::generate();
        let mut s = set();
        s.add(&alice, topic("a")).unwrap();
        let op = s.queued()[0].clone();
        assert_eq!(s.apply(op).unwrap(), Insert::Known);
        assert_eq!(s.len(), 1);
        assert_eq!(s.history().applied_len(), 1);
    }

    #[test]
    fn rejects_wrong_target() {
        let alice = KeyPair::generate();
        let mut other = MutableSet::<Topic>::new(hash(b"other"));
        other.add(&alice, topic("a")).unwrap();
        let op = other.queued()[0].clone();

        let mut s = set();
        let err = s.apply(op).unwrap_err();
        assert!(matches!(err, ApplyError::Validation(ValidationError::WrongTarget { .. })));
        assert!(s.is_empty());
    }

    #[test]
    fn rejects_set_operations() {
        let alice = KeyPair::generate();
        let (element, payload) = encode_value(&topic("a")).unwrap();
        let op = Operation::sign(&alice, OpKind::Set, hash(b"set"), element, payload, BTreeSet::new());
        let err = set().apply(op).unwrap_err();
        assert!(matches!(err, ApplyError::Format(FormatError::UnsupportedKind { .. })));
    }

    #[test]
    fn rejects_forged_signature() {
        let alice = KeyPair::generate();
        let mallory = KeyPair::generate();
        let mut s = set();
        s.add(&alice, topic("a")).unwrap();
        let mut op = s.queued()[0].clone();
        op.author = mallory.key_pub;
        let err = set().apply(op).unwrap_err();
        assert!(matches!(err, ApplyError::Validation(ValidationError::BadSignature(_))));
    }

    #[test]
    fn rejects_element_hash_mismatch() {
        let alice = KeyPair::generate();
        let (_, payload) = encode_value(&topic("a")).unwrap();
        let op = Operation::sign(&alice, OpKind::Add, hash(b"set"), hash(b"lie"), payload, BTreeSet::new());
        let err = set().apply(op).unwrap_err();
        assert!(matches!(err, ApplyError::Validation(ValidationError::HashMismatch { .. })));
    }

    #[test]
    fn rejects_garbage_payload() {
        let alice = KeyPair::generate();
        let op = Operation::sign(&alice, OpKind::Add, hash(b"set"), hash(b"x"), vec![0xff; 3], BTreeSet::new());
        let err = set().apply(op).unwrap_err();
        assert!(matches!(err, ApplyError::Format(FormatError::Payload(_))));
    }

    #[test]
    fn policy_rejects_and_leaves_value_untouched() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let mut s: MutableSet<KeyPub> = MutableSet::with_policy(hash(b"people"), Arc::new(SelfOnly));
        s.add(&alice, alice.key_pub).unwrap();

        let err = s.add(&alice, bob.key_pub).unwrap_err();
        assert_eq!(
            err,
            ApplyError::Authorization(AuthorizationError {
                author: alice.key_pub,
                action: "add another participant",
            })
        );
        assert_eq!(s.values(), vec![&alice.key_pub]);
        assert_eq!(s.queued().len(), 1);
    }

    #[test]
    fn flush_moves_queue_into_store() {
        let alice = KeyPair::generate();
        let store = MemoryStore::new();
        let mut s = set();
        let id = s.add(&alice, topic("a")).unwrap();
        assert_eq!(s.save_queued_ops(&store).unwrap(), 1);
        assert!(s.queued().is_empty());
        assert_eq!(store.operations(&s.id()).unwrap(), BTreeSet::from([id]));
    }

    #[test]
    fn failed_flush_keeps_queue() {
        let alice = KeyPair::generate();
        let store = MemoryStore::new();
        let mut s = set();
        s.add(&alice, topic("a")).unwrap();
        store.fail_writes(true);
        assert_eq!(s.save_queued_ops(&store), Err(StoreError::Unavailable));
        assert_eq!(s.queued().len(), 1);
        store.fail_writes(false);
        assert_eq!(s.save_queued_ops(&store), Ok(1));
    }

    #[test]
    fn buffered_until_predecessors_arrive() {
        let alice = KeyPair::generate();
        let mut source = set();
        source.add(&alice, topic("a")).unwrap();
        source.add(&alice, topic("b")).unwrap();
        let first = source.queued()[0].clone();
        let second = source.queued()[1].clone();

        let mut s = set();
        assert!(matches!(s.apply(second).unwrap(), Insert::Buffered(_)));
        assert!(s.is_empty());
        s.apply(first).unwrap();
        assert_eq!(s.len(), 2);
    }
}
