// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! Chat rooms.
//!
//! A room is an immutable record made distinct by a random discriminator,
//! plus three containers derived from its identity: the topic register,
//! the participants set, and the messages set. The record never changes;
//! everything that happens in the room is an operation on one of the
//! containers.
//!
//! Participants may only add or remove themselves, and a message may only
//! be added or removed by its author. Both rules depend on the operation
//! alone, so every replica agrees on what was allowed.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;
use tracing::warn;

use crate::crdt::Container;
use crate::crdt::history::Insert;
use crate::crdt::op::Operation;
use crate::crdt::policy::AuthorOnly;
use crate::crdt::policy::Authored;
use crate::crdt::policy::SelfOnly;
use crate::crdt::reference::MutableReference;
use crate::crdt::set::MutableSet;
use crate::derive::Derived;
use crate::derive::check_derived_field;
use crate::derive::derive;
use crate::error::ApplyError;
use crate::error::AuthorizationError;
use crate::error::Result;
use crate::error::StoreError;
use crate::error::ValidationError;
use crate::key::Hash;
use crate::key::KeyPair;
use crate::key::KeyPub;
use crate::object::Canonical;
use crate::object::Content;
use crate::object::Discriminator;
use crate::object::Hashed;
use crate::object::Object;
use crate::object::Validate;
use crate::object::content_hash;
use crate::store::Store;
use crate::sync::Replicated;

pub const ROOM_CLASS: &str = "parlor/v0/ChatRoom";
pub const MESSAGE_CLASS: &str = "parlor/v0/Message";
pub const TOPIC_CLASS: &str = "parlor/v0/Topic";

pub const TOPIC: &str = "topic";
pub const PARTICIPANTS: &str = "participants";
pub const MESSAGES: &str = "messages";

/// Buffered room events per subscriber before the slowest one lags.
const EVENT_CAPACITY: usize = 256;

/// The text of a room topic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic(pub String);

impl Content for Topic {
    const CLASS: &'static str = TOPIC_CLASS;

    fn encode(&self, out: &mut Canonical) {
        out.str(&self.0);
    }
}

impl Validate for Topic {
    fn validate(&self) -> Result<(), ValidationError> {
        return Ok(());
    }
}

/// A chat message. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub author: KeyPub,
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl Message {
    pub fn new(author: KeyPub, text: &str, timestamp: u64) -> Message {
        return Message {
            author,
            text: text.to_string(),
            timestamp,
        };
    }

    /// A message stamped with the current time.
    pub fn now(author: KeyPub, text: &str) -> Message {
        return Message::new(author, text, now_millis());
    }
}

impl Content for Message {
    const CLASS: &'static str = MESSAGE_CLASS;

    fn encode(&self, out: &mut Canonical) {
        out.bytes(&self.author.0).str(&self.text).u64(self.timestamp);
    }
}

impl Validate for Message {
    fn validate(&self) -> Result<(), ValidationError> {
        return self.author.validate();
    }
}

impl Authored for Message {
    fn author(&self) -> &KeyPub {
        return &self.author;
    }
}

/// The immutable part of a room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRecord {
    pub discriminator: Discriminator,
    pub topic: Hash,
    pub participants: Hash,
    pub messages: Hash,
}

impl RoomRecord {
    /// Build a record with its derived fields filled in.
    pub fn new(discriminator: Discriminator) -> RoomRecord {
        let unset = Hash([0; 32]);
        let mut record = RoomRecord {
            discriminator,
            topic: unset,
            participants: unset,
            messages: unset,
        };
        let id = content_hash(&record);
        record.topic = derive(&id, TOPIC);
        record.participants = derive(&id, PARTICIPANTS);
        record.messages = derive(&id, MESSAGES);
        return record;
    }
}

impl Content for RoomRecord {
    const CLASS: &'static str = ROOM_CLASS;

    // Only the discriminator is declared; the derived fields follow from it.
    fn encode(&self, _out: &mut Canonical) {}

    fn discriminator(&self) -> Option<&Discriminator> {
        return Some(&self.discriminator);
    }
}

impl Derived for RoomRecord {
    const FIELDS: &'static [&'static str] = &[TOPIC, PARTICIPANTS, MESSAGES];

    fn field(&self, name: &str) -> Option<Hash> {
        return match name {
            TOPIC => Some(self.topic),
            PARTICIPANTS => Some(self.participants),
            MESSAGES => Some(self.messages),
            _ => None,
        };
    }
}

impl Validate for RoomRecord {
    fn validate(&self) -> Result<(), ValidationError> {
        let hashed = Hashed::new(self.clone());
        for &field in Self::FIELDS {
            if !check_derived_field(&hashed, field) {
                return Err(ValidationError::DerivedField { field });
            }
        }
        return Ok(());
    }
}

/// Something that changed in a room's logical state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoomEvent {
    TopicChanged(String),
    ParticipantJoined(KeyPub),
    ParticipantLeft(KeyPub),
    MessageAdded(Message),
    MessageRemoved(Message),
}

/// What events are computed against.
struct Snapshot {
    topic: Option<Hash>,
    participants: BTreeSet<Hash>,
    messages: BTreeSet<Hash>,
}

/// A room and its containers.
pub struct ChatRoom {
    record: Hashed<RoomRecord>,
    topic: MutableReference<Topic>,
    participants: MutableSet<KeyPub>,
    messages: MutableSet<Message>,
    events: broadcast::Sender<RoomEvent>,
}

impl ChatRoom {
    /// Create a fresh room with an initial topic. The topic operation is
    /// queued until the room is flushed.
    pub fn create(author: &KeyPair, topic: &str) -> Result<ChatRoom, ApplyError> {
        let record = RoomRecord::new(Discriminator::random());
        let mut room = ChatRoom::build(Hashed::new(record));
        room.set_topic(author, topic)?;
        return Ok(room);
    }

    /// Rebuild a room from a record received from elsewhere.
    pub fn from_record(record: RoomRecord) -> Result<ChatRoom, ValidationError> {
        record.validate()?;
        return Ok(ChatRoom::build(Hashed::new(record)));
    }

    fn build(record: Hashed<RoomRecord>) -> ChatRoom {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let fields = record.get();
        return ChatRoom {
            topic: MutableReference::new(fields.topic),
            participants: MutableSet::with_policy(fields.participants, Arc::new(SelfOnly)),
            messages: MutableSet::with_policy(fields.messages, Arc::new(AuthorOnly)),
            record,
            events,
        };
    }

    pub fn id(&self) -> Hash {
        return self.record.id();
    }

    pub fn record(&self) -> &RoomRecord {
        return self.record.get();
    }

    /// The record as a storable object.
    pub fn object(&self) -> Object {
        return Object::ChatRoom(self.record.get().clone());
    }

    /// The current topic text.
    pub fn topic(&self) -> Option<&str> {
        return self.topic.value().map(|topic| topic.0.as_str());
    }

    pub fn topic_register(&self) -> &MutableReference<Topic> {
        return &self.topic;
    }

    pub fn participants(&self) -> &MutableSet<KeyPub> {
        return &self.participants;
    }

    pub fn messages(&self) -> &MutableSet<Message> {
        return &self.messages;
    }

    /// Present messages in chat order: by timestamp, then by hash.
    pub fn transcript(&self) -> Vec<&Message> {
        let mut messages = self.messages.values();
        messages.sort_by_key(|message| (message.timestamp, content_hash(*message)));
        return messages;
    }

    /// Identities of the three derived containers.
    pub fn containers(&self) -> [Hash; 3] {
        return [self.topic.id(), self.participants.id(), self.messages.id()];
    }

    pub fn container(&self, id: &Hash) -> Option<&dyn Container> {
        if *id == self.topic.id() {
            return Some(&self.topic);
        }
        if *id == self.participants.id() {
            return Some(&self.participants);
        }
        if *id == self.messages.id() {
            return Some(&self.messages);
        }
        return None;
    }

    fn container_mut(&mut self, id: &Hash) -> Option<&mut dyn Container> {
        if *id == self.topic.id() {
            return Some(&mut self.topic);
        }
        if *id == self.participants.id() {
            return Some(&mut self.participants);
        }
        if *id == self.messages.id() {
            return Some(&mut self.messages);
        }
        return None;
    }

    /// Listen for changes to the logical state.
    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        return self.events.subscribe();
    }

    /// Replace the topic. Queued until flushed.
    pub fn set_topic(&mut self, author: &KeyPair, text: &str) -> Result<Hash, ApplyError> {
        let before = self.snapshot();
        let id = self.topic.set_value(author, Topic(text.to_string()))?;
        self.publish(before);
        return Ok(id);
    }

    /// Add an identity to the participants and flush.
    pub fn join(&mut self, identity: &KeyPair, store: &dyn Store) -> Result<()> {
        let before = self.snapshot();
        self.participants.add(identity, identity.key_pub)?;
        self.publish(before);
        self.participants.save_queued_ops(store)?;
        return Ok(());
    }

    /// Remove an identity from the participants and flush.
    pub fn leave(&mut self, identity: &KeyPair, store: &dyn Store) -> Result<()> {
        let before = self.snapshot();
        self.participants.delete(identity, &identity.key_pub)?;
        self.publish(before);
        self.participants.save_queued_ops(store)?;
        return Ok(());
    }

    /// Post a message and flush. Only participants may speak.
    pub fn say(&mut self, author: &KeyPair, text: &str, store: &dyn Store) -> Result<Hash> {
        if !self.participants.contains(&author.key_pub) {
            return Err(AuthorizationError {
                author: author.key_pub,
                action: "speak without joining",
            }
            .into());
        }
        let message = Message::now(author.key_pub, text);
        let id = content_hash(&message);
        let before = self.snapshot();
        self.messages.add(author, message)?;
        self.publish(before);
        self.messages.save_queued_ops(store)?;
        return Ok(id);
    }

    /// Retract one of our own messages and flush.
    pub fn unsay(&mut self, author: &KeyPair, message: &Message, store: &dyn Store) -> Result<bool> {
        let before = self.snapshot();
        let removed = self.messages.delete(author, message)?.is_some();
        self.publish(before);
        self.messages.save_queued_ops(store)?;
        return Ok(removed);
    }

    /// Flush every container's queued operations.
    pub fn save_queued_ops(&mut self, store: &dyn Store) -> Result<usize, StoreError> {
        let mut saved = self.topic.save_queued_ops(store)?;
        saved += self.participants.save_queued_ops(store)?;
        saved += self.messages.save_queued_ops(store)?;
        return Ok(saved);
    }

    /// Apply operations that came from elsewhere. Returns every operation
    /// that became applied, in order, including buffered ones they
    /// released. Those are the ones worth persisting. Buffered operations
    /// are held back, and rejected ones are logged and dropped.
    pub fn apply_remote(&mut self, ops: Vec<Operation>) -> Vec<Operation> {
        let before = self.snapshot();
        let mut accepted = Vec::new();
        for op in ops {
            let target = op.target;
            let Some(container) = self.container_mut(&target) else {
                warn!(target = %target.short(), "operation for a container this room does not have");
                continue;
            };
            match container.apply(op.clone()) {
                Ok(Insert::Known) => {}
                Ok(Insert::Buffered(missing)) => {
                    // Held back from the store and from peers until applied.
                    debug!(op = %op.id().short(), missing = missing.len(), "buffered operation");
                }
                Ok(Insert::Applied(ids)) => {
                    debug!(op = %op.id().short(), released = ids.len(), "applied operation");
                    accepted.extend(ids.iter().filter_map(|id| container.operation(id)).cloned());
                }
                Err(err) => {
                    warn!(op = %op.id().short(), author = %op.author.short(), %err, "rejected operation");
                }
            }
        }
        self.publish(before);
        return accepted;
    }

    fn snapshot(&self) -> Snapshot {
        return Snapshot {
            topic: self.topic.winner().map(|op| op.element),
            participants: self.participants.element_ids(),
            messages: self.messages.element_ids(),
        };
    }

    fn publish(&self, before: Snapshot) {
        if self.events.receiver_count() == 0 {
            return;
        }
        let after = self.snapshot();
        let mut events = Vec::new();

        if after.topic != before.topic {
            if let Some(topic) = self.topic() {
                events.push(RoomEvent::TopicChanged(topic.to_string()));
            }
        }
        for id in after.participants.difference(&before.participants) {
            if let Some(key) = self.participants.get(id) {
                events.push(RoomEvent::ParticipantJoined(*key));
            }
        }
        for id in before.participants.difference(&after.participants) {
            if let Some(key) = self.participants.get(id) {
                events.push(RoomEvent::ParticipantLeft(*key));
            }
        }
        let mut added: Vec<&Message> = after
            .messages
            .difference(&before.messages)
            .filter_map(|id| self.messages.get(id))
            .collect();
        added.sort_by_key(|message| message.timestamp);
        events.extend(added.into_iter().cloned().map(RoomEvent::MessageAdded));
        for id in before.messages.difference(&after.messages) {
            if let Some(message) = self.messages.get(id) {
                events.push(RoomEvent::MessageRemoved(message.clone()));
            }
        }

        for event in events {
            // Only fails when every receiver has been dropped.
            let _ = self.events.send(event);
        }
    }
}

impl std::fmt::Debug for ChatRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return f
            .debug_struct("ChatRoom")
            .field("id", &self.id().short())
            .field("topic", &self.topic())
            .field("participants", &self.participants.len())
            .field("messages", &self.messages.len())
            .finish();
    }
}

impl Replicated for ChatRoom {
    fn id(&self) -> Hash {
        return ChatRoom::id(self);
    }

    fn containers(&self) -> Vec<Hash> {
        return ChatRoom::containers(self).to_vec();
    }

    fn apply_remote(&mut self, ops: Vec<Operation>) -> Vec<Operation> {
        return ChatRoom::apply_remote(self, ops);
    }
}

fn now_millis() -> u64 {
    return SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| to_millis(elapsed))
        .unwrap_or(0);
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn to_millis(elapsed: Duration) -> u64 {
    return u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::MemoryStore;

    fn room(author: &KeyPair, topic: &str) -> ChatRoom {
        return ChatRoom::create(author, topic).unwrap();
    }

    #[test]
    fn create_sets_topic_and_derives_containers() {
        let alice = KeyPair::generate();
        let r = room(&alice, "general");
        assert_eq!(r.topic(), Some("general"));
        let id = r.id();
        assert_eq!(r.containers(), [
            derive(&id, TOPIC),
            derive(&id, PARTICIPANTS),
            derive(&id, MESSAGES),
        ]);
        assert!(r.record().validate().is_ok());
    }

    #[test]
    fn rooms_with_same_topic_are_distinct() {
        let alice = KeyPair::generate();
        assert_ne!(room(&alice, "").id(), room(&alice, "").id());
    }

    #[test]
    fn forged_record_is_rejected() {
        let alice = KeyPair::generate();
        let mut record = room(&alice, "general").record().clone();
        record.messages = crate::key::hash(b"elsewhere");
        assert_eq!(
            ChatRoom::from_record(record).unwrap_err(),
            ValidationError::DerivedField { field: MESSAGES }
        );
    }

    #[test]
    fn record_identity_ignores_derived_fields() {
        let alice = KeyPair::generate();
        let record = room(&alice, "general").record().clone();
        let mut forged = record.clone();
        forged.topic = crate::key::hash(b"x");
        assert_eq!(content_hash(&record), content_hash(&forged));
        assert!(forged.validate().is_err());
    }

    #[test]
    fn join_say_leave() {
        let alice = KeyPair::generate();
        let store = MemoryStore::new();
        let mut r = room(&alice, "general");
        r.save_queued_ops(&store).unwrap();

        r.join(&alice, &store).unwrap();
        assert!(r.participants().contains(&alice.key_pub));

        r.say(&alice, "hello", &store).unwrap();
        let transcript = r.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].text, "hello");
        assert_eq!(transcript[0].author, alice.key_pub);

        r.leave(&alice, &store).unwrap();
        assert!(r.participants().is_empty());
        // Everything was flushed.
        for id in r.containers() {
            assert!(r.container(&id).unwrap().queued().is_empty());
        }
    }

    #[test]
    fn say_requires_joining() {
        let alice = KeyPair::generate();
        let store = MemoryStore::new();
        let mut r = room(&alice, "general");
        let err = r.say(&alice, "hello", &store).unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));
        assert!(r.messages().is_empty());
    }

    #[test]
    fn unsay_removes_own_message() {
        let alice = KeyPair::generate();
        let store = MemoryStore::new();
        let mut r = room(&alice, "general");
        r.join(&alice, &store).unwrap();
        r.say(&alice, "oops", &store).unwrap();
        let message = r.transcript()[0].clone();
        assert!(r.unsay(&alice, &message, &store).unwrap());
        assert!(r.messages().is_empty());
    }

    #[test]
    fn say_fails_cleanly_when_store_is_down() {
        let alice = KeyPair::generate();
        let store = MemoryStore::new();
        let mut r = room(&alice, "general");
        r.save_queued_ops(&store).unwrap();
        r.join(&alice, &store).unwrap();
        store.fail_writes(true);
        let err = r.say(&alice, "hello", &store).unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::Unavailable)));
        // Applied locally, waiting to be flushed.
        assert_eq!(r.messages().len(), 1);
        assert_eq!(r.container(&r.record().messages).unwrap().queued().len(), 1);
        store.fail_writes(false);
        assert_eq!(r.save_queued_ops(&store).unwrap(), 1);
    }

    #[test]
    fn apply_remote_emits_events() {
        let alice = KeyPair::generate();
        let store = MemoryStore::new();
        let mut a = room(&alice, "general");
        let mut b = ChatRoom::from_record(a.record().clone()).unwrap();
        let mut events = b.subscribe();

        a.join(&alice, &store).unwrap();
        a.say(&alice, "hi bob", &store).unwrap();

        let mut ops = Vec::new();
        for id in a.containers() {
            for op_id in a.container(&id).unwrap().known() {
                ops.push(a.container(&id).unwrap().operation(&op_id).unwrap().clone());
            }
        }
        let accepted = b.apply_remote(ops);
        assert_eq!(accepted.len(), 3);

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert!(seen.contains(&RoomEvent::TopicChanged("general".to_string())));
        assert!(seen.contains(&RoomEvent::ParticipantJoined(alice.key_pub)));
        assert!(seen.iter().any(|e| matches!(e, RoomEvent::MessageAdded(m) if m.text == "hi bob")));
    }

    #[test]
    fn remote_forgeries_are_dropped() {
        let alice = KeyPair::generate();
        let mallory = KeyPair::generate();
        let mut a = room(&alice, "general");
        let mut forged = MutableSet::<KeyPub>::new(a.record().participants);
        // mallory tries to sign alice into the room
        forged.add(&mallory, alice.key_pub).unwrap();
        let accepted = a.apply_remote(forged.queued().to_vec());
        assert!(accepted.is_empty());
        assert!(a.participants().is_empty());
    }

    #[test]
    fn concurrent_topic_writes_agree() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let mut a = room(&alice, "general");
        let mut b = ChatRoom::from_record(a.record().clone()).unwrap();
        b.apply_remote(a.topic_register().queued().to_vec());

        a.set_topic(&alice, "food").unwrap();
        b.set_topic(&bob, "pets").unwrap();

        b.apply_remote(a.topic_register().history().operations().cloned().collect());
        a.apply_remote(b.topic_register().history().operations().cloned().collect());
        assert_eq!(a.topic(), b.topic());
        assert!(matches!(a.topic(), Some("food") | Some("pets")));
    }

    #[test]
    fn buffered_operations_are_accepted_once_released() {
        let alice = KeyPair::generate();
        let store = MemoryStore::new();
        let mut a = room(&alice, "general");
        let mut b = ChatRoom::from_record(a.record().clone()).unwrap();
        a.join(&alice, &store).unwrap();
        a.say(&alice, "first", &store).unwrap();
        a.say(&alice, "second", &store).unwrap();

        let messages = a.messages().history().operations().cloned().collect::<Vec<_>>();
        let (first, second): (Vec<_>, Vec<_>) = messages.into_iter().partition(|op| op.preds.is_empty());
        assert_eq!((first.len(), second.len()), (1, 1));

        // the later message waits for its predecessor
        assert!(b.apply_remote(second.clone()).is_empty());
        assert!(b.transcript().is_empty());

        let accepted: Vec<Hash> = b.apply_remote(first.clone()).iter().map(|op| op.id()).collect();
        assert_eq!(accepted, vec![first[0].id(), second[0].id()]);
        assert_eq!(b.transcript().len(), 2);
    }

    #[test]
    fn timestamps_saturate() {
        assert_eq!(to_millis(Duration::from_millis(1_500)), 1_500);
        assert_eq!(to_millis(Duration::MAX), u64::MAX);
    }
}
