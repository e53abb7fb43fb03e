// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! A participant in the mesh.
//!
//! A [`Node`] bundles an identity with the store and mesh it works
//! against. Creating or joining a room starts a sync session for it and
//! hands back a [`Room`], through which every later action flows.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::Config;
use crate::error::Error;
use crate::error::Result;
use crate::key::Hash;
use crate::key::KeyPair;
use crate::key::KeyPub;
use crate::mesh::Mesh;
use crate::mesh::PeerHandle;
use crate::object::Object;
use crate::object::Validate;
use crate::object::content_hash;
use crate::room::ChatRoom;
use crate::room::Message;
use crate::room::RoomEvent;
use crate::room::RoomRecord;
use crate::store::Record;
use crate::store::Store;
use crate::sync::SyncHandle;
use crate::wordcode;
use crate::wordcode::Suffix;

pub struct Node<M: Mesh> {
    identity: KeyPair,
    store: Arc<dyn Store>,
    mesh: M,
    config: Config,
}

impl<M: Mesh> Node<M> {
    pub fn new(identity: KeyPair, store: Arc<dyn Store>, mesh: M, config: Config) -> Node<M> {
        return Node {
            identity,
            store,
            mesh,
            config,
        };
    }

    pub fn identity(&self) -> KeyPub {
        return self.identity.key_pub;
    }

    pub fn config(&self) -> &Config {
        return &self.config;
    }

    /// Create a room, join it, and start announcing it. The room's code is
    /// what others pass to [`Node::join`].
    pub async fn create_room(&self, topic: &str) -> Result<Room> {
        let mut room = ChatRoom::create(&self.identity, topic)?;
        self.store.save(&Record::Object(room.object()))?;
        room.save_queued_ops(self.store.as_ref())?;
        room.join(&self.identity, self.store.as_ref())?;

        let room = self.open(room).await?;
        info!(room = %room.id().short(), code = %room.code(), "created room");
        return Ok(room);
    }

    /// Find a room by its three-word code, adopt it, and join it.
    ///
    /// Waits until some peer offers a room that validates, or fails with
    /// [`Error::DiscoveryTimeout`].
    pub async fn join(&self, code: &str) -> Result<Room> {
        let suffix = wordcode::parse(code)?;
        let record = self.discover(suffix).await?;
        self.store.save(&Record::Object(Object::ChatRoom(record.clone())))?;
        let room = ChatRoom::from_record(record)?;

        let room = self.open(room).await?;
        let report = room.session.sync_now().await?;
        debug!(peers = report.peers, received = report.received, "initial sync");
        room.join().await?;
        info!(room = %room.id().short(), "joined room");
        return Ok(room);
    }

    async fn discover(&self, suffix: Suffix) -> Result<RoomRecord> {
        let search = async {
            loop {
                match self.mesh.lookup(suffix).await {
                    Ok(candidates) => {
                        if let Some(record) = adopt(suffix, candidates) {
                            return record;
                        }
                    }
                    Err(err) => warn!(%err, "lookup failed, will retry"),
                }
                tokio::time::sleep(self.config.discovery_retry).await;
            }
        };
        return tokio::time::timeout(self.config.discovery_timeout, search)
            .await
            .map_err(|_| Error::DiscoveryTimeout);
    }

    async fn open(&self, room: ChatRoom) -> Result<Room> {
        let session = SyncHandle::spawn(room, self.store.clone(), self.mesh.clone(), &self.config);
        session.start_broadcast().await?;
        session.start_sync().await?;
        return Ok(Room {
            identity: self.identity.clone(),
            session,
        });
    }
}

/// Choose which discovered room to trust. Candidates whose hash does not
/// end in the suffix or that fail validation are dropped; of the rest the
/// one with the lowest hash wins, so every node picks the same room.
pub fn adopt(suffix: Suffix, candidates: Vec<PeerHandle>) -> Option<RoomRecord> {
    return candidates
        .into_iter()
        .filter_map(|candidate| match candidate.object {
            Object::ChatRoom(record) => Some((candidate.peer, record)),
            other => {
                debug!(peer = %candidate.peer, class = other.class(), "candidate is not a room");
                None
            }
        })
        .filter(|(peer, record)| {
            let id = content_hash(record);
            if !suffix.matches(&id) {
                warn!(%peer, id = %id.short(), "candidate does not match the code");
                return false;
            }
            if let Err(err) = record.validate() {
                warn!(%peer, %err, "rejected candidate");
                return false;
            }
            return true;
        })
        .min_by_key(|(_, record)| content_hash(record))
        .map(|(_, record)| record);
}

/// A room this node takes part in.
#[derive(Clone)]
pub struct Room {
    identity: KeyPair,
    session: SyncHandle<ChatRoom>,
}

impl Room {
    pub fn id(&self) -> Hash {
        return self.session.object();
    }

    /// The three-word code others join with.
    pub fn code(&self) -> String {
        return wordcode::token(&self.id());
    }

    pub fn session(&self) -> &SyncHandle<ChatRoom> {
        return &self.session;
    }

    /// Add ourselves to the participants.
    pub async fn join(&self) -> Result<()> {
        let identity = self.identity.clone();
        return self.session.with(move |room, store| room.join(&identity, store)).await?;
    }

    /// Remove ourselves from the participants.
    pub async fn leave(&self) -> Result<()> {
        let identity = self.identity.clone();
        return self.session.with(move |room, store| room.leave(&identity, store)).await?;
    }

    /// Post a message, returning its hash.
    pub async fn say(&self, text: &str) -> Result<Hash> {
        let identity = self.identity.clone();
        let text = text.to_string();
        return self.session.with(move |room, store| room.say(&identity, &text, store)).await?;
    }

    /// Retract one of our messages.
    pub async fn unsay(&self, message: Message) -> Result<bool> {
        let identity = self.identity.clone();
        return self.session.with(move |room, store| room.unsay(&identity, &message, store)).await?;
    }

    pub async fn set_topic(&self, text: &str) -> Result<()> {
        let identity = self.identity.clone();
        let text = text.to_string();
        return self
            .session
            .with(move |room, store| -> Result<()> {
                room.set_topic(&identity, &text)?;
                room.save_queued_ops(store)?;
                return Ok(());
            })
            .await?;
    }

    pub async fn topic(&self) -> Result<Option<String>> {
        return self.session.with(|room, _| room.topic().map(str::to_string)).await;
    }

    pub async fn participants(&self) -> Result<Vec<KeyPub>> {
        return self.session.with(|room, _| room.participants().values().into_iter().copied().collect()).await;
    }

    /// Present messages in chat order.
    pub async fn messages(&self) -> Result<Vec<Message>> {
        return self.session.with(|room, _| room.transcript().into_iter().cloned().collect()).await;
    }

    pub async fn subscribe(&self) -> Result<broadcast::Receiver<RoomEvent>> {
        return self.session.with(|room, _| room.subscribe()).await;
    }

    /// Stop syncing and hand back the room state.
    pub async fn close(&self) -> Result<ChatRoom> {
        return self.session.shutdown().await;
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "Room {{ id: {}, me: {} }}", self.id().short(), self.identity.key_pub.short());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::PeerId;
    use crate::object::Discriminator;

    fn candidate(record: RoomRecord) -> PeerHandle {
        return PeerHandle {
            peer: PeerId(KeyPair::generate().key_pub),
            object: Object::ChatRoom(record),
        };
    }

    #[test]
    fn adopt_prefers_valid_lowest_hash() {
        let a = RoomRecord::new(Discriminator::random());
        let b = RoomRecord::new(Discriminator::random());
        let (low, high) = if content_hash(&a) < content_hash(&b) { (a, b) } else { (b, a) };

        // Pretend both share a suffix by searching with each one's own.
        let suffix = Suffix::of(&content_hash(&high));
        assert_eq!(adopt(suffix, vec![candidate(high.clone())]), Some(high.clone()));
        assert_eq!(adopt(suffix, vec![candidate(low.clone())]), None);

        let mut forged = high.clone();
        forged.participants = content_hash(&low);
        assert_eq!(adopt(suffix, vec![candidate(forged), candidate(high.clone())]), Some(high));
    }

    #[test]
    fn adopt_ignores_other_objects() {
        let alice = KeyPair::generate();
        let message = Message::new(alice.key_pub, "hi", 1);
        let suffix = Suffix::of(&content_hash(&message));
        let offered = PeerHandle {
            peer: PeerId(alice.key_pub),
            object: Object::Message(message),
        };
        assert_eq!(adopt(suffix, vec![offered]), None);
    }
}
