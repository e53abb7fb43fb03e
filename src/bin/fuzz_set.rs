//! AFL fuzz harness for the replicated set and the decoders
//!
//! This harness tests:
//! 1. Convergence: replicas that see the same operations converge
//! 2. Robustness: arbitrary bytes fed to the object, operation, and
//!    word-code decoders fail cleanly instead of panicking
//!
//! Model: each user has their own replica. They edit locally and
//! periodically broadcast their state to other users.

use afl::fuzz;
use parlor::crdt::Container;
use parlor::crdt::Crdt;
use parlor::crdt::op::Operation;
use parlor::crdt::set::MutableSet;
use parlor::key::KeyPair;
use parlor::key::hash;
use parlor::object::Object;
use parlor::room::Topic;
use parlor::wordcode;

const NUM_USERS: usize = 3;

/// Operation types the fuzzer can generate
#[derive(Debug, Clone, Copy)]
enum FuzzOp {
    /// User adds one of a few values
    Add { user: u8, value: u8 },
    /// User removes one of a few values
    Delete { user: u8, value: u8 },
    /// User A receives broadcast from user B (merges B into A)
    Broadcast { from: u8, to: u8 },
    /// All users sync (full mesh broadcast)
    FullSync,
}

impl FuzzOp {
    fn from_bytes(bytes: &[u8]) -> Option<(FuzzOp, &[u8])> {
        if bytes.is_empty() {
            return None;
        }

        let op_type = bytes[0] % 4;
        let rest = &bytes[1..];

        match op_type {
            0 if rest.len() >= 2 => {
                let op = FuzzOp::Add {
                    user: rest[0] % NUM_USERS as u8,
                    value: rest[1] % 8,
                };
                Some((op, &rest[2..]))
            }
            1 if rest.len() >= 2 => {
                let op = FuzzOp::Delete {
                    user: rest[0] % NUM_USERS as u8,
                    value: rest[1] % 8,
                };
                Some((op, &rest[2..]))
            }
            2 if rest.len() >= 2 => {
                let op = FuzzOp::Broadcast {
                    from: rest[0] % NUM_USERS as u8,
                    to: rest[1] % NUM_USERS as u8,
                };
                Some((op, &rest[2..]))
            }
            3 => Some((FuzzOp::FullSync, rest)),
            _ => None,
        }
    }
}

fn full_sync(replicas: &mut [MutableSet<Topic>]) {
    for i in 0..replicas.len() {
        for j in 0..replicas.len() {
            if i != j {
                let source = replicas[j].clone();
                replicas[i].merge(&source);
            }
        }
    }
}

fn main() {
    // Use deterministic keys for reproducible crashes
    let users: Vec<KeyPair> = (0..NUM_USERS).map(|i| KeyPair::from_secret([i as u8 + 1; 32])).collect();

    fuzz!(|data: &[u8]| {
        // None of these may panic on arbitrary input.
        let _ = Object::from_bytes(data);
        let _ = postcard::from_bytes::<Operation>(data);
        if let Ok(text) = std::str::from_utf8(data) {
            let _ = wordcode::parse(text);
        }

        let mut replicas: Vec<MutableSet<Topic>> =
            (0..NUM_USERS).map(|_| MutableSet::new(hash(b"fuzz"))).collect();
        let mut remaining = data;

        while let Some((op, rest)) = FuzzOp::from_bytes(remaining) {
            remaining = rest;

            match op {
                FuzzOp::Add { user, value } => {
                    let topic = Topic(format!("v{}", value));
                    replicas[user as usize].add(&users[user as usize], topic).unwrap();
                }
                FuzzOp::Delete { user, value } => {
                    let topic = Topic(format!("v{}", value));
                    replicas[user as usize].delete(&users[user as usize], &topic).unwrap();
                }
                FuzzOp::Broadcast { from, to } => {
                    if from != to {
                        let source = replicas[from as usize].clone();
                        replicas[to as usize].merge(&source);
                    }
                }
                FuzzOp::FullSync => {
                    full_sync(&mut replicas);
                    let first = replicas[0].element_ids();
                    for (i, r) in replicas.iter().enumerate().skip(1) {
                        assert_eq!(r.element_ids(), first, "Convergence failure! User {} != User 0 after full sync", i);
                    }
                }
            }
        }

        full_sync(&mut replicas);
        let first = replicas[0].element_ids();
        for (i, r) in replicas.iter().enumerate().skip(1) {
            assert_eq!(r.element_ids(), first, "Final convergence failure! User {} != User 0", i);
            assert_eq!(r.known(), replicas[0].known(), "Operation sets differ for user {}", i);
        }
    });
}
