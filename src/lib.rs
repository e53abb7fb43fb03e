// model = "claude-opus-4-5"
// created = "2026-01-30"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! Parlor - A serverless chat room replicated between peers with CRDTs.
//!
//! Rooms are content-addressed records whose topic, participants, and
//! messages live in containers derived from the room's identity. Peers
//! find a room by a three-word code and keep it in sync by exchanging
//! operation digests.
//!
//! # Quick Start
//!
//! ```
//! use parlor::key::KeyPair;
//! use parlor::room::ChatRoom;
//! use parlor::store::MemoryStore;
//! use parlor::wordcode;
//!
//! // Create a user identity
//! let alice = KeyPair::generate();
//! let store = MemoryStore::new();
//!
//! // Create a room and say something in it
//! let mut room = ChatRoom::create(&alice, "general").unwrap();
//! room.join(&alice, &store).unwrap();
//! room.say(&alice, "hello", &store).unwrap();
//! assert_eq!(room.transcript()[0].text, "hello");
//!
//! // Three words are enough for someone else to find it
//! let code = wordcode::token(&room.id());
//! assert_eq!(code.split(' ').count(), 3);
//! ```

pub mod config;
pub mod crdt;
pub mod derive;
pub mod error;
pub mod key;
pub mod mesh;
pub mod node;
pub mod object;
pub mod room;
pub mod store;
pub mod sync;
pub mod wordcode;
mod words;

pub use config::Config;
pub use error::Error;
pub use error::Result;
pub use node::Node;
pub use node::Room;
