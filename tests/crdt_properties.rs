// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! Property-based tests for the replicated containers and the word code.

use std::collections::BTreeSet;

use parlor::crdt::Container;
use parlor::crdt::Crdt;
use parlor::crdt::op::Operation;
use parlor::crdt::reference::MutableReference;
use parlor::crdt::set::MutableSet;
use parlor::key::Hash;
use parlor::key::KeyPair;
use parlor::key::hash;
use parlor::room::Topic;
use parlor::wordcode;
use parlor::wordcode::Suffix;
use proptest::prelude::*;

// =============================================================================
// Test helpers
// =============================================================================

const REPLICAS: usize = 3;
const WORDS: [&str; 4] = ["food", "pets", "music", "books"];

/// One step of a random editing session across replicas.
#[derive(Clone, Debug)]
enum Step {
    Add { replica: usize, word: usize },
    Delete { replica: usize, word: usize },
    Sync { from: usize, to: usize },
}

fn arbitrary_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0..REPLICAS, 0..WORDS.len()).prop_map(|(replica, word)| Step::Add { replica, word }),
        (0..REPLICAS, 0..WORDS.len()).prop_map(|(replica, word)| Step::Delete { replica, word }),
        (0..REPLICAS, 0..REPLICAS).prop_map(|(from, to)| Step::Sync { from, to }),
    ]
}

fn topic(word: usize) -> Topic {
    return Topic(WORDS[word].to_string());
}

fn container_id() -> Hash {
    return hash(b"container");
}

/// Run a session of set edits and return the replicas as they ended up.
fn run_set(steps: &[Step], users: &[KeyPair]) -> Vec<MutableSet<Topic>> {
    let mut replicas: Vec<MutableSet<Topic>> = (0..REPLICAS).map(|_| MutableSet::new(container_id())).collect();
    for step in steps {
        match step {
            Step::Add { replica, word } => {
                replicas[*replica].add(&users[*replica], topic(*word)).unwrap();
            }
            Step::Delete { replica, word } => {
                replicas[*replica].delete(&users[*replica], &topic(*word)).unwrap();
            }
            Step::Sync { from, to } => {
                if from != to {
                    let source = replicas[*from].clone();
                    replicas[*to].merge(&source);
                }
            }
        }
    }
    return replicas;
}

/// Run a session of register writes. Deletes are writes too here.
fn run_reference(steps: &[Step], users: &[KeyPair]) -> Vec<MutableReference<Topic>> {
    let mut replicas: Vec<MutableReference<Topic>> =
        (0..REPLICAS).map(|_| MutableReference::new(container_id())).collect();
    for step in steps {
        match step {
            Step::Add { replica, word } | Step::Delete { replica, word } => {
                replicas[*replica].set_value(&users[*replica], topic(*word)).unwrap();
            }
            Step::Sync { from, to } => {
                if from != to {
                    let source = replicas[*from].clone();
                    replicas[*to].merge(&source);
                }
            }
        }
    }
    return replicas;
}

fn all_operations<C: Container>(replicas: &[C]) -> Vec<Operation> {
    let mut seen = BTreeSet::new();
    let mut ops = Vec::new();
    for replica in replicas {
        for id in replica.known() {
            if seen.insert(id) {
                ops.push(replica.operation(&id).unwrap().clone());
            }
        }
    }
    return ops;
}

/// The same operations in several delivery orders.
fn orderings(ops: &[Operation]) -> Vec<Vec<Operation>> {
    let mut by_id = ops.to_vec();
    by_id.sort_by_key(|op| op.id());
    let mut reversed = by_id.clone();
    reversed.reverse();
    let mut backwards = ops.to_vec();
    backwards.reverse();
    return vec![ops.to_vec(), by_id, reversed, backwards];
}

fn users() -> Vec<KeyPair> {
    return (0..REPLICAS).map(|_| KeyPair::generate()).collect();
}

// =============================================================================
// MutableSet properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Any delivery order of the same operations gives the same set.
    #[test]
    fn set_is_order_independent(steps in prop::collection::vec(arbitrary_step(), 1..40)) {
        let users = users();
        let ops = all_operations(&run_set(&steps, &users));

        let mut values = Vec::new();
        for order in orderings(&ops) {
            let mut set = MutableSet::<Topic>::new(container_id());
            for op in order {
                set.apply(op).unwrap();
            }
            prop_assert_eq!(set.history().pending_len(), 0);
            values.push(set.element_ids());
        }
        for value in &values[1..] {
            prop_assert_eq!(value, &values[0]);
        }
    }

    /// Applying everything twice is the same as once.
    #[test]
    fn set_reapply_is_idempotent(steps in prop::collection::vec(arbitrary_step(), 1..40)) {
        let users = users();
        let ops = all_operations(&run_set(&steps, &users));

        let mut once = MutableSet::<Topic>::new(container_id());
        for op in &ops {
            once.apply(op.clone()).unwrap();
        }
        let mut twice = once.clone();
        for op in &ops {
            twice.apply(op.clone()).unwrap();
        }
        prop_assert_eq!(once.element_ids(), twice.element_ids());
        prop_assert_eq!(once.known(), twice.known());
    }

    /// Replicas that exchange everything agree, whatever they did before.
    #[test]
    fn set_replicas_converge(steps in prop::collection::vec(arbitrary_step(), 1..40)) {
        let users = users();
        let mut replicas = run_set(&steps, &users);
        let snapshot = replicas.clone();
        for replica in replicas.iter_mut() {
            for other in &snapshot {
                replica.merge(other);
            }
        }
        for replica in &replicas[1..] {
            prop_assert_eq!(replica.element_ids(), replicas[0].element_ids());
        }
    }

    /// A delete removes exactly what its author had observed.
    #[test]
    fn set_delete_after_observing_removes(word in 0..WORDS.len()) {
        let users = users();
        let mut set = MutableSet::<Topic>::new(container_id());
        set.add(&users[0], topic(word)).unwrap();
        set.delete(&users[1], &topic(word)).unwrap();
        prop_assert!(!set.contains(&topic(word)));
        set.add(&users[2], topic(word)).unwrap();
        prop_assert!(set.contains(&topic(word)));
    }
}

// =============================================================================
// MutableReference properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn reference_is_order_independent(steps in prop::collection::vec(arbitrary_step(), 1..40)) {
        let users = users();
        let ops = all_operations(&run_reference(&steps, &users));

        let mut winners = Vec::new();
        for order in orderings(&ops) {
            let mut register = MutableReference::<Topic>::new(container_id());
            for op in order {
                register.apply(op).unwrap();
            }
            winners.push(register.winner().map(|op| op.id()));
        }
        for winner in &winners[1..] {
            prop_assert_eq!(winner, &winners[0]);
        }
    }

    #[test]
    fn reference_replicas_converge(steps in prop::collection::vec(arbitrary_step(), 1..40)) {
        let users = users();
        let mut replicas = run_reference(&steps, &users);
        let snapshot = replicas.clone();
        for replica in replicas.iter_mut() {
            for other in &snapshot {
                replica.merge(other);
            }
        }
        for replica in &replicas[1..] {
            prop_assert_eq!(replica.value(), replicas[0].value());
            prop_assert_eq!(replica.heads(), replicas[0].heads());
        }
        // The winner is the highest of the competing heads.
        if let Some(winner) = replicas[0].winner() {
            prop_assert_eq!(Some(&winner.id()), replicas[0].heads().iter().max());
        }
    }
}

// =============================================================================
// Word code properties
// =============================================================================

#[test]
fn word_code_round_trip_sweep() {
    for i in 0..10_000u32 {
        let h = hash(&i.to_le_bytes());
        let suffix = wordcode::parse(&wordcode::token(&h)).unwrap();
        assert!(suffix.matches(&h), "suffix mismatch for hash {}", h);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Encoding a hash and decoding the words gives back its suffix.
    #[test]
    fn word_code_round_trip(bytes in prop::array::uniform32(any::<u8>())) {
        let hash = Hash(bytes);
        let words = wordcode::encode(&hash);
        let suffix = wordcode::decode(&words).unwrap();
        prop_assert!(suffix.matches(&hash));
        prop_assert_eq!(wordcode::parse(&wordcode::token(&hash)).unwrap(), suffix);
    }

    /// Every suffix has exactly one code.
    #[test]
    fn every_suffix_is_encodable(bits in 0u32..(1 << wordcode::SUFFIX_BITS)) {
        let suffix = Suffix::from_bits(bits);
        let words = wordcode::encode_suffix(suffix);
        prop_assert_eq!(wordcode::decode(&words).unwrap(), suffix);
    }

    /// Arbitrary input parses or fails cleanly.
    #[test]
    fn arbitrary_tokens_never_panic(token in ".{0,64}") {
        let _ = wordcode::parse(&token);
    }

    /// Three arbitrary lowercase words either decode or name the bad word.
    #[test]
    fn three_words_decode_or_fail(words in prop::collection::vec("[a-z]{1,8}", 3)) {
        match wordcode::decode(&words) {
            Ok(suffix) => prop_assert!(suffix.bits() < (1 << wordcode::SUFFIX_BITS)),
            Err(parlor::error::FormatError::UnknownWord(word)) => prop_assert!(words.contains(&word)),
            Err(other) => prop_assert!(false, "unexpected error {}", other),
        }
    }
}
