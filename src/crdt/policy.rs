// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! Authorization policies for container operations.
//!
//! A policy sees only the operation itself: its kind, its author, and the
//! value it carries. It must not look at container state, or replicas that
//! receive operations in different orders would disagree about what was
//! authorized.

use super::op::OpKind;
use crate::error::AuthorizationError;
use crate::key::KeyPub;

/// Decides whether an author may issue an operation carrying `value`.
pub trait Policy<T>: Send + Sync {
    fn authorize(&self, kind: OpKind, author: &KeyPub, value: &T) -> Result<(), AuthorizationError>;
}

/// Anyone may do anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct Open;

impl<T> Policy<T> for Open {
    fn authorize(&self, _kind: OpKind, _author: &KeyPub, _value: &T) -> Result<(), AuthorizationError> {
        return Ok(());
    }
}

/// An identity may only add or remove itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct SelfOnly;

impl Policy<KeyPub> for SelfOnly {
    fn authorize(&self, kind: OpKind, author: &KeyPub, value: &KeyPub) -> Result<(), AuthorizationError> {
        if author != value {
            return Err(AuthorizationError {
                author: *author,
                action: match kind {
                    OpKind::Remove => "remove another participant",
                    _ => "add another participant",
                },
            });
        }
        return Ok(());
    }
}

/// A value that names its author.
pub trait Authored {
    fn author(&self) -> &KeyPub;
}

/// Only the author of a value may add or remove it.
#[derive(Clone, Copy, Debug, Default)]
pub struct AuthorOnly;

impl<T: Authored> Policy<T> for AuthorOnly {
    fn authorize(&self, kind: OpKind, author: &KeyPub, value: &T) -> Result<(), AuthorizationError> {
        if author != value.author() {
            return Err(AuthorizationError {
                author: *author,
                action: match kind {
                    OpKind::Remove => "remove a value authored by someone else",
                    _ => "add a value authored by someone else",
                },
            });
        }
        return Ok(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyPair;

    struct Note {
        author: KeyPub,
    }

    impl Authored for Note {
        fn author(&self) -> &KeyPub {
            return &self.author;
        }
    }

    #[test]
    fn open_allows_everything() {
        let alice = KeyPair::generate().key_pub;
        let bob = KeyPair::generate().key_pub;
        assert!(Open.authorize(OpKind::Remove, &alice, &bob).is_ok());
    }

    #[test]
    fn self_only() {
        let alice = KeyPair::generate().key_pub;
        let bob = KeyPair::generate().key_pub;
        assert!(SelfOnly.authorize(OpKind::Add, &alice, &alice).is_ok());
        let err = SelfOnly.authorize(OpKind::Remove, &alice, &bob).unwrap_err();
        assert_eq!(err.author, alice);
    }

    #[test]
    fn author_only() {
        let alice = KeyPair::generate().key_pub;
        let bob = KeyPair::generate().key_pub;
        let note = Note { author: alice };
        assert!(AuthorOnly.authorize(OpKind::Add, &alice, &note).is_ok());
        assert!(AuthorOnly.authorize(OpKind::Add, &bob, &note).is_err());
        assert!(AuthorOnly.authorize(OpKind::Remove, &bob, &note).is_err());
    }
}
