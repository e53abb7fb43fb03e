// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! Causal history of a container.
//!
//! Operations may arrive before their predecessors. Those wait in a
//! bounded pending buffer and are released, in causal order, once
//! everything they name has been applied.
//!
//! Only direct predecessors are kept. Each applied operation also gets a
//! depth, one more than its deepest predecessor, so a happens-before walk
//! from the later operation never descends below the earlier one.
//!
//! Complexity:
//! - insert: O(p) where p is predecessor count, plus released operations
//! - happens_before: O(k) where k is the number of operations between the two
//! - memory: O(n)

use std::collections::BTreeSet;
use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tracing::debug;

use super::op::Operation;
use crate::key::Hash;

/// Operations buffered per container before the oldest are dropped.
pub const PENDING_LIMIT: usize = 4096;

/// What inserting an operation did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Insert {
    /// Already applied or already waiting.
    Known,
    /// Waiting on these predecessors.
    Buffered(Vec<Hash>),
    /// Applied, along with any buffered operations it released, in the
    /// order they were applied.
    Applied(Vec<Hash>),
}

/// Applied operations, pending operations, and the frontier.
#[derive(Clone, Debug)]
pub struct History {
    applied: FxHashMap<Hash, Operation>,
    /// Longest predecessor chain below every applied operation.
    depth: FxHashMap<Hash, u64>,
    pending: FxHashMap<Hash, Operation>,
    /// Pending operations in arrival order. May hold ids already released.
    arrivals: VecDeque<Hash>,
    /// Missing predecessor -> pending operations waiting on it.
    waiting: FxHashMap<Hash, SmallVec<[Hash; 2]>>,
    /// Causally maximal applied operations.
    frontier: BTreeSet<Hash>,
    limit: usize,
}

impl Default for History {
    fn default() -> History {
        return History::with_limit(PENDING_LIMIT);
    }
}

impl History {
    /// Create an empty history.
    pub fn new() -> History {
        return History::default();
    }

    /// Create an empty history buffering at most `limit` operations.
    pub fn with_limit(limit: usize) -> History {
        return History {
            applied: FxHashMap::default(),
            depth: FxHashMap::default(),
            pending: FxHashMap::default(),
            arrivals: VecDeque::new(),
            waiting: FxHashMap::default(),
            frontier: BTreeSet::new(),
            limit: limit.max(1),
        };
    }

    /// Insert an operation, applying it if its predecessors are present.
    pub fn insert(&mut self, op: Operation) -> Insert {
        let id = op.id();
        if self.applied.contains_key(&id) || self.pending.contains_key(&id) {
            return Insert::Known;
        }

        let missing: Vec<Hash> = op
            .preds
            .iter()
            .filter(|pred| !self.applied.contains_key(*pred))
            .copied()
            .collect();
        if !missing.is_empty() {
            for pred in &missing {
                self.waiting.entry(*pred).or_default().push(id);
            }
            self.pending.insert(id, op);
            self.arrivals.push_back(id);
            self.evict();
            return Insert::Buffered(missing);
        }

        let mut released = Vec::new();
        let mut ready = vec![(id, op)];
        while let Some((id, op)) = ready.pop() {
            self.apply_ready(id, op);
            released.push(id);

            let Some(waiters) = self.waiting.remove(&id) else {
                continue;
            };
            for waiter in waiters {
                let Some(op) = self.pending.remove(&waiter) else {
                    continue;
                };
                if op.preds.iter().all(|pred| self.applied.contains_key(pred)) {
                    ready.push((waiter, op));
                } else {
                    self.pending.insert(waiter, op);
                }
            }
        }
        return Insert::Applied(released);
    }

    fn apply_ready(&mut self, id: Hash, op: Operation) {
        let mut depth = 0;
        for pred in &op.preds {
            if let Some(theirs) = self.depth.get(pred) {
                depth = depth.max(theirs + 1);
            }
            self.frontier.remove(pred);
        }
        self.frontier.insert(id);
        self.depth.insert(id, depth);
        self.applied.insert(id, op);
    }

    /// Drop the oldest pending operations until the buffer fits.
    fn evict(&mut self) {
        while self.pending.len() > self.limit {
            let Some(oldest) = self.arrivals.pop_front() else {
                return;
            };
            let Some(op) = self.pending.remove(&oldest) else {
                continue;
            };
            for pred in &op.preds {
                if let Some(waiters) = self.waiting.get_mut(pred) {
                    waiters.retain(|waiter| *waiter != oldest);
                    if waiters.is_empty() {
                        self.waiting.remove(pred);
                    }
                }
            }
            debug!(op = %oldest.short(), "pending buffer full, dropped oldest operation");
        }
        if self.arrivals.len() > 2 * self.limit {
            let pending = &self.pending;
            self.arrivals.retain(|id| pending.contains_key(id));
        }
    }

    /// True if `earlier` is a strict causal ancestor of `later`.
    pub fn happens_before(&self, earlier: &Hash, later: &Hash) -> bool {
        let (Some(&floor), Some(&top)) = (self.depth.get(earlier), self.depth.get(later)) else {
            return false;
        };
        if floor >= top {
            return false;
        }
        let mut visited = FxHashSet::default();
        let mut stack = vec![*later];
        while let Some(id) = stack.pop() {
            let Some(op) = self.applied.get(&id) else {
                continue;
            };
            for pred in &op.preds {
                if pred == earlier {
                    return true;
                }
                // Anything no deeper than `earlier` cannot lead back to it.
                let deeper = self.depth.get(pred).is_some_and(|depth| *depth > floor);
                if deeper && visited.insert(*pred) {
                    stack.push(*pred);
                }
            }
        }
        return false;
    }

    /// True if neither operation precedes the other.
    pub fn concurrent(&self, a: &Hash, b: &Hash) -> bool {
        return a != b && !self.happens_before(a, b) && !self.happens_before(b, a);
    }

    /// The causally maximal applied operations.
    pub fn frontier(&self) -> &BTreeSet<Hash> {
        return &self.frontier;
    }

    /// True if the operation is applied or pending.
    pub fn contains(&self, id: &Hash) -> bool {
        return self.applied.contains_key(id) || self.pending.contains_key(id);
    }

    /// True if the operation has been applied.
    pub fn is_applied(&self, id: &Hash) -> bool {
        return self.applied.contains_key(id);
    }

    /// Look up an applied or pending operation.
    pub fn get(&self, id: &Hash) -> Option<&Operation> {
        return self.applied.get(id).or_else(|| self.pending.get(id));
    }

    /// Every operation held, applied or pending.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        return self.applied.values().chain(self.pending.values());
    }

    /// Identities of every operation held.
    pub fn known(&self) -> BTreeSet<Hash> {
        return self.applied.keys().chain(self.pending.keys()).copied().collect();
    }

    /// Predecessors some pending operation is still waiting for.
    pub fn missing(&self) -> BTreeSet<Hash> {
        return self
            .waiting
            .keys()
            .filter(|id| !self.pending.contains_key(*id))
            .copied()
            .collect();
    }

    pub fn applied_len(&self) -> usize {
        return self.applied.len();
    }

    pub fn pending_len(&self) -> usize {
        return self.pending.len();
    }
}
