// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! Content-addressed objects.
//!
//! An object's identity is a blake3 hash over a canonical encoding of its
//! declared fields, its class tag, and an optional random discriminator.
//! The encoding never goes through serde: every field is written with a
//! length prefix behind a type byte, so the hash is stable regardless of
//! how records travel.
//!
//! Derived references (see `derive`) are not declared fields. They are a
//! function of the identity, so they cannot feed into it.
//!
//! Received objects arrive as a tagged record (class tag plus body) and
//! are decoded through the closed `Object` registry below.

use rand_core::OsRng;
use rand_core::RngCore;
use serde::Deserialize;
use serde::Serialize;

use crate::error::FormatError;
use crate::error::StoreError;
use crate::error::ValidationError;
use crate::key::Hash;
use crate::key::KeyPub;
use crate::room::MESSAGE_CLASS;
use crate::room::Message;
use crate::room::ROOM_CLASS;
use crate::room::RoomRecord;
use crate::room::TOPIC_CLASS;
use crate::room::Topic;

/// Type constant for object identity hashes.
pub const TYPE_OBJECT: u8 = 0x10;

/// Class tag for identities used as set elements.
pub const IDENTITY_CLASS: &str = "parlor/v0/Identity";

/// A canonical field encoder feeding a blake3 hasher.
pub struct Canonical {
    hasher: blake3::Hasher,
}

impl Canonical {
    /// Start an encoding under a type byte and a class tag.
    pub fn new(domain: u8, class: &str) -> Canonical {
        let mut canonical = Canonical {
            hasher: blake3::Hasher::new(),
        };
        canonical.hasher.update(&[domain]);
        canonical.str(class);
        return canonical;
    }

    /// Write a length-prefixed byte string.
    pub fn bytes(&mut self, data: &[u8]) -> &mut Canonical {
        self.hasher.update(&(data.len() as u64).to_le_bytes());
        self.hasher.update(data);
        return self;
    }

    /// Write a length-prefixed string.
    pub fn str(&mut self, data: &str) -> &mut Canonical {
        return self.bytes(data.as_bytes());
    }

    /// Write a fixed-width integer.
    pub fn u64(&mut self, value: u64) -> &mut Canonical {
        self.hasher.update(&value.to_le_bytes());
        return self;
    }

    /// Write a single tag byte.
    pub fn u8(&mut self, value: u8) -> &mut Canonical {
        self.hasher.update(&[value]);
        return self;
    }

    /// Write a hash.
    pub fn hash(&mut self, value: &Hash) -> &mut Canonical {
        self.hasher.update(&value.0);
        return self;
    }

    /// Finish and return the identity.
    pub fn finish(&self) -> Hash {
        return Hash(*self.hasher.finalize().as_bytes());
    }
}

/// A random value that keeps otherwise identical objects distinct.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discriminator(pub [u8; 16]);

impl Discriminator {
    /// Draw a fresh discriminator from the OS.
    pub fn random() -> Discriminator {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        return Discriminator(bytes);
    }
}

/// A type whose values are identified by their content.
pub trait Content {
    /// Stable class tag. Part of the identity.
    const CLASS: &'static str;

    /// Write the declared fields.
    fn encode(&self, out: &mut Canonical);

    /// An explicit discriminator, if this value carries one.
    fn discriminator(&self) -> Option<&Discriminator> {
        return None;
    }
}

/// Structural checks run before accepting a value from an untrusted source.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Compute the identity of a value.
pub fn content_hash<T: Content>(value: &T) -> Hash {
    let mut out = Canonical::new(TYPE_OBJECT, T::CLASS);
    match value.discriminator() {
        Some(discriminator) => {
            out.u8(1).bytes(&discriminator.0);
        }
        None => {
            out.u8(0);
        }
    }
    value.encode(&mut out);
    return out.finish();
}

/// A value paired with its identity, computed once.
///
/// There is no way to get a mutable reference to the inner value, so the
/// identity can never drift from the content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hashed<T> {
    id: Hash,
    value: T,
}

impl<T: Content> Hashed<T> {
    /// Hash a locally built value.
    pub fn new(value: T) -> Hashed<T> {
        let id = content_hash(&value);
        return Hashed { id, value };
    }

    /// Accept a value that came with a claimed identity.
    pub fn verify(value: T, claimed: Hash) -> Result<Hashed<T>, ValidationError> {
        let computed = content_hash(&value);
        if computed != claimed {
            return Err(ValidationError::HashMismatch { claimed, computed });
        }
        return Ok(Hashed { id: computed, value });
    }

    pub fn id(&self) -> Hash {
        return self.id;
    }

    pub fn get(&self) -> &T {
        return &self.value;
    }

    pub fn into_inner(self) -> T {
        return self.value;
    }
}

impl Content for KeyPub {
    const CLASS: &'static str = IDENTITY_CLASS;

    fn encode(&self, out: &mut Canonical) {
        out.bytes(&self.0);
    }
}

impl Validate for KeyPub {
    fn validate(&self) -> Result<(), ValidationError> {
        if ed25519_dalek::VerifyingKey::from_bytes(&self.0).is_err() {
            return Err(ValidationError::Invalid {
                class: IDENTITY_CLASS,
                reason: "not a point on the curve",
            });
        }
        return Ok(());
    }
}

/// Every kind of object that can be stored or received whole.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Object {
    ChatRoom(RoomRecord),
    Message(Message),
    Topic(Topic),
}

/// The tagged form an object takes on the wire and on disk.
#[derive(Serialize, Deserialize)]
struct Tagged {
    class: String,
    body: Vec<u8>,
}

impl Object {
    /// The class tag of the underlying value.
    pub fn class(&self) -> &'static str {
        return match self {
            Object::ChatRoom(_) => RoomRecord::CLASS,
            Object::Message(_) => Message::CLASS,
            Object::Topic(_) => Topic::CLASS,
        };
    }

    /// The identity of the underlying value.
    pub fn id(&self) -> Hash {
        return match self {
            Object::ChatRoom(room) => content_hash(room),
            Object::Message(message) => content_hash(message),
            Object::Topic(topic) => content_hash(topic),
        };
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        return match self {
            Object::ChatRoom(room) => room.validate(),
            Object::Message(message) => message.validate(),
            Object::Topic(topic) => topic.validate(),
        };
    }

    /// Encode as a tagged record.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        let body = match self {
            Object::ChatRoom(room) => postcard::to_stdvec(room),
            Object::Message(message) => postcard::to_stdvec(message),
            Object::Topic(topic) => postcard::to_stdvec(topic),
        };
        let tagged = Tagged {
            class: self.class().to_string(),
            body: body.map_err(|e| StoreError::Encode(e.to_string()))?,
        };
        return postcard::to_stdvec(&tagged).map_err(|e| StoreError::Encode(e.to_string()));
    }

    /// Decode a tagged record, dispatching on its class tag.
    pub fn from_bytes(bytes: &[u8]) -> Result<Object, FormatError> {
        let tagged: Tagged = postcard::from_bytes(bytes).map_err(payload_error)?;
        let object = match tagged.class.as_str() {
            ROOM_CLASS => Object::ChatRoom(postcard::from_bytes(&tagged.body).map_err(payload_error)?),
            MESSAGE_CLASS => Object::Message(postcard::from_bytes(&tagged.body).map_err(payload_error)?),
            TOPIC_CLASS => Object::Topic(postcard::from_bytes(&tagged.body).map_err(payload_error)?),
            other => return Err(FormatError::UnknownClass(other.to_string())),
        };
        return Ok(object);
    }
}

fn payload_error(err: postcard::Error) -> FormatError {
    return FormatError::Payload(err.to_string());
}
