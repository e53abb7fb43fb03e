// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! Error taxonomy.
//!
//! Validation and authorization failures are recovered locally: the
//! offending object or operation is dropped and processing continues.
//! Store and network failures surface to whoever triggered them, and
//! never touch state that was already applied.

use crate::key::Hash;
use crate::key::KeyPub;

/// An object or operation failed its structural checks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("content hash mismatch: claimed {claimed}, computed {computed}")]
    HashMismatch { claimed: Hash, computed: Hash },
    #[error("derived field `{field}` does not match its parent")]
    DerivedField { field: &'static str },
    #[error("signature does not verify for author {0}")]
    BadSignature(KeyPub),
    #[error("operation targets {found} but container is {expected}")]
    WrongTarget { expected: Hash, found: Hash },
    #[error("invalid {class}: {reason}")]
    Invalid { class: &'static str, reason: &'static str },
}

/// The author of an operation has no rights over what it touches.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{author} may not {action}")]
pub struct AuthorizationError {
    pub author: KeyPub,
    pub action: &'static str,
}

/// Malformed input, rejected before any processing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("expected 3 words, got {0}")]
    WordCount(usize),
    #[error("unknown word `{0}`")]
    UnknownWord(String),
    #[error("payload does not decode: {0}")]
    Payload(String),
    #[error("{kind} operation is not valid for a {container}")]
    UnsupportedKind { kind: &'static str, container: &'static str },
    #[error("unknown class tag `{0}`")]
    UnknownClass(String),
}

/// Persistence failed; the write is not durable and may be retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store is unavailable")]
    Unavailable,
    #[error("record {0} is corrupt")]
    Corrupt(Hash),
    #[error("encoding failed: {0}")]
    Encode(String),
}

/// A peer could not be reached. Transient by assumption.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    #[error("peer {0} is unreachable")]
    Unreachable(String),
    #[error("peer {0} hung up")]
    Disconnected(String),
}

/// Why an operation was not applied to a container.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Crate-level error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("no peer offered a valid object for the join code")]
    DiscoveryTimeout,
    #[error("sync session has shut down")]
    SessionClosed,
}

impl From<ApplyError> for Error {
    fn from(err: ApplyError) -> Error {
        return match err {
            ApplyError::Validation(e) => Error::Validation(e),
            ApplyError::Authorization(e) => Error::Authorization(e),
            ApplyError::Format(e) => Error::Format(e),
        };
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
