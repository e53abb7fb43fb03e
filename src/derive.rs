// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! Derived fields.
//!
//! A mutable child of an immutable object gets its identity from the
//! parent's identity and the field name, so every replica that holds the
//! parent can address the child without being told about it.

use crate::key::Hash;
use crate::object::Content;
use crate::object::Hashed;

/// Type constant for derived identities.
pub const TYPE_DERIVED: u8 = 0x11;

/// Compute the identity of a field derived from `parent`.
pub fn derive(parent: &Hash, field: &str) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[TYPE_DERIVED]);
    hasher.update(&parent.0);
    hasher.update(&(field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
    return Hash(*hasher.finalize().as_bytes());
}

/// An object carrying derived references.
pub trait Derived {
    /// Names of every derived field.
    const FIELDS: &'static [&'static str];

    /// The identity the object claims for a field.
    fn field(&self, name: &str) -> Option<Hash>;
}

/// Check that the field an object carries is the one its identity implies.
pub fn check_derived_field<T: Content + Derived>(object: &Hashed<T>, name: &str) -> bool {
    return match object.get().field(name) {
        Some(actual) => actual == derive(&object.id(), name),
        None => false,
    };
}
