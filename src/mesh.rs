// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! The peer mesh.
//!
//! A mesh lets a peer announce the objects it holds, find other peers that
//! hold them (by full hash or by word-code suffix), compare operation
//! digests, and move operations back and forth. [`MemoryMesh`] connects
//! peers living in one process; peers answer queries straight from their
//! stores.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;
use tracing::trace;

use crate::crdt::op::Operation;
use crate::error::NetworkError;
use crate::key::Hash;
use crate::key::KeyPub;
use crate::object::Object;
use crate::store::Record;
use crate::store::Store;
use crate::wordcode::Suffix;

/// A peer on the mesh, named by its key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct PeerId(pub KeyPub);

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "{}", self.0.short());
    }
}

/// A candidate found during discovery. Not trusted until validated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerHandle {
    pub peer: PeerId,
    pub object: Object,
}

/// The result of comparing digests for one container.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DigestReply {
    /// Operations the remote peer has and we lack.
    pub missing_here: BTreeSet<Hash>,
    /// Operations we have and the remote peer lacks.
    pub missing_there: BTreeSet<Hash>,
}

/// Operations pushed to us by a peer.
#[derive(Clone, Debug)]
pub struct Inbound {
    pub from: PeerId,
    pub ops: Vec<Operation>,
}

/// How peers reach each other.
pub trait Mesh: Clone + Send + Sync + 'static {
    /// Who we are on the mesh.
    fn local(&self) -> PeerId;

    /// Announce that we hold an object.
    fn advertise(&self, object: Hash) -> impl Future<Output = Result<(), NetworkError>> + Send;

    /// Stop announcing an object.
    fn withdraw(&self, object: &Hash);

    /// Peers currently announcing an object.
    fn find_peers(&self, object: &Hash) -> impl Future<Output = Result<Vec<PeerId>, NetworkError>> + Send;

    /// Ask every reachable peer for announced objects ending in `suffix`.
    fn lookup(&self, suffix: Suffix) -> impl Future<Output = Result<Vec<PeerHandle>, NetworkError>> + Send;

    /// Compare what we know about a container with what a peer stores.
    fn exchange_digest(
        &self,
        peer: &PeerId,
        container: &Hash,
        known: &BTreeSet<Hash>,
    ) -> impl Future<Output = Result<DigestReply, NetworkError>> + Send;

    /// Fetch operations from a peer by identity.
    fn fetch_operations(
        &self,
        peer: &PeerId,
        ids: &[Hash],
    ) -> impl Future<Output = Result<Vec<Operation>, NetworkError>> + Send;

    /// Hand operations for an object to a peer.
    fn push_operations(
        &self,
        peer: &PeerId,
        object: &Hash,
        ops: Vec<Operation>,
    ) -> impl Future<Output = Result<(), NetworkError>> + Send;

    /// Receive operations peers push for an object.
    fn subscribe(&self, object: Hash, capacity: usize) -> mpsc::Receiver<Inbound>;
}

struct Member {
    store: Arc<dyn Store>,
    connected: bool,
    advertised: BTreeSet<Hash>,
    inboxes: FxHashMap<Hash, mpsc::Sender<Inbound>>,
}

#[derive(Default)]
struct Hub {
    members: FxHashMap<PeerId, Member>,
}

impl Hub {
    /// A connected peer other than ourselves.
    fn reachable(&self, peer: &PeerId) -> Result<&Member, NetworkError> {
        return match self.members.get(peer) {
            Some(member) if member.connected => Ok(member),
            _ => Err(NetworkError::Unreachable(peer.to_string())),
        };
    }

    fn check_connected(&self, local: &PeerId) -> Result<(), NetworkError> {
        return match self.members.get(local) {
            Some(member) if member.connected => Ok(()),
            _ => Err(NetworkError::Disconnected(local.to_string())),
        };
    }
}

/// Every peer in one process, sharing a hub.
#[derive(Clone, Default)]
pub struct MemoryMesh {
    hub: Arc<Mutex<Hub>>,
}

impl MemoryMesh {
    pub fn new() -> MemoryMesh {
        return MemoryMesh::default();
    }

    /// Attach a peer whose queries are answered from `store`.
    pub fn join(&self, peer: PeerId, store: Arc<dyn Store>) -> MeshHandle {
        if let Ok(mut hub) = self.hub.lock() {
            hub.members.insert(peer, Member {
                store,
                connected: true,
                advertised: BTreeSet::new(),
                inboxes: FxHashMap::default(),
            });
        }
        return MeshHandle {
            local: peer,
            hub: self.hub.clone(),
        };
    }

    /// Cut a peer off. Its calls fail and calls to it fail until it
    /// reconnects. Its announcements survive.
    pub fn disconnect(&self, peer: &PeerId) {
        self.set_connected(peer, false);
    }

    pub fn reconnect(&self, peer: &PeerId) {
        self.set_connected(peer, true);
    }

    fn set_connected(&self, peer: &PeerId, connected: bool) {
        if let Ok(mut hub) = self.hub.lock() {
            if let Some(member) = hub.members.get_mut(peer) {
                debug!(%peer, connected, "peer link changed");
                member.connected = connected;
            }
        }
    }
}

/// One peer's view of a [`MemoryMesh`].
#[derive(Clone)]
pub struct MeshHandle {
    local: PeerId,
    hub: Arc<Mutex<Hub>>,
}

impl MeshHandle {
    fn hub(&self) -> Result<MutexGuard<'_, Hub>, NetworkError> {
        let hub = self.hub.lock().map_err(|_| NetworkError::Disconnected(self.local.to_string()))?;
        hub.check_connected(&self.local)?;
        return Ok(hub);
    }
}

impl Mesh for MeshHandle {
    fn local(&self) -> PeerId {
        return self.local;
    }

    async fn advertise(&self, object: Hash) -> Result<(), NetworkError> {
        let mut hub = self.hub()?;
        if let Some(member) = hub.members.get_mut(&self.local) {
            if member.advertised.insert(object) {
                debug!(object = %object.short(), "advertising");
            }
        }
        return Ok(());
    }

    fn withdraw(&self, object: &Hash) {
        if let Ok(mut hub) = self.hub.lock() {
            if let Some(member) = hub.members.get_mut(&self.local) {
                member.advertised.remove(object);
            }
        }
    }

    async fn find_peers(&self, object: &Hash) -> Result<Vec<PeerId>, NetworkError> {
        let hub = self.hub()?;
        let peers = hub
            .members
            .iter()
            .filter(|(peer, member)| **peer != self.local && member.connected && member.advertised.contains(object))
            .map(|(peer, _)| *peer)
            .collect();
        return Ok(peers);
    }

    async fn lookup(&self, suffix: Suffix) -> Result<Vec<PeerHandle>, NetworkError> {
        let hub = self.hub()?;
        let mut found = Vec::new();
        for (peer, member) in &hub.members {
            if *peer == self.local || !member.connected {
                continue;
            }
            let objects = match member.store.find_suffix(&suffix) {
                Ok(objects) => objects,
                Err(err) => {
                    debug!(%peer, %err, "peer could not answer lookup");
                    continue;
                }
            };
            // Peers only answer for what they announce.
            for object in objects {
                if member.advertised.contains(&object.id()) {
                    found.push(PeerHandle { peer: *peer, object });
                }
            }
        }
        return Ok(found);
    }

    async fn exchange_digest(
        &self,
        peer: &PeerId,
        container: &Hash,
        known: &BTreeSet<Hash>,
    ) -> Result<DigestReply, NetworkError> {
        let hub = self.hub()?;
        let member = hub.reachable(peer)?;
        let theirs = member
            .store
            .operations(container)
            .map_err(|_| NetworkError::Unreachable(peer.to_string()))?;
        let reply = DigestReply {
            missing_here: theirs.difference(known).copied().collect(),
            missing_there: known.difference(&theirs).copied().collect(),
        };
        trace!(
            %peer,
            container = %container.short(),
            here = reply.missing_here.len(),
            there = reply.missing_there.len(),
            "digest"
        );
        return Ok(reply);
    }

    async fn fetch_operations(&self, peer: &PeerId, ids: &[Hash]) -> Result<Vec<Operation>, NetworkError> {
        let hub = self.hub()?;
        let member = hub.reachable(peer)?;
        let mut ops = Vec::with_capacity(ids.len());
        for id in ids {
            match member.store.load(id) {
                Ok(Some(Record::Operation(op))) => ops.push(op),
                Ok(_) => {}
                Err(err) => debug!(%peer, id = %id.short(), %err, "peer could not load operation"),
            }
        }
        return Ok(ops);
    }

    async fn push_operations(&self, peer: &PeerId, object: &Hash, ops: Vec<Operation>) -> Result<(), NetworkError> {
        let hub = self.hub()?;
        let member = hub.reachable(peer)?;
        let Some(inbox) = member.inboxes.get(object) else {
            trace!(%peer, object = %object.short(), "peer is not listening");
            return Ok(());
        };
        let count = ops.len();
        match inbox.try_send(Inbound { from: self.local, ops }) {
            Ok(()) => trace!(%peer, count, "pushed operations"),
            // The next digest exchange repairs whatever is dropped here.
            Err(TrySendError::Full(_)) => debug!(%peer, count, "peer inbox full, dropped push"),
            Err(TrySendError::Closed(_)) => trace!(%peer, "peer stopped listening"),
        }
        return Ok(());
    }

    fn subscribe(&self, object: Hash, capacity: usize) -> mpsc::Receiver<Inbound> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        if let Ok(mut hub) = self.hub.lock() {
            if let Some(member) = hub.members.get_mut(&self.local) {
                member.inboxes.insert(object, tx);
            }
        }
        return rx;
    }
}

impl std::fmt::Debug for MeshHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "MeshHandle {{ local: {} }}", self.local);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crdt::op::OpKind;
    use crate::key::KeyPair;
    use crate::key::hash;
    use crate::object::Discriminator;
    use crate::room::RoomRecord;
    use crate::store::MemoryStore;

    fn peer(mesh: &MemoryMesh) -> (MeshHandle, Arc<MemoryStore>, KeyPair) {
        let keys = KeyPair::generate();
        let store = Arc::new(MemoryStore::new());
        let handle = mesh.join(PeerId(keys.key_pub), store.clone());
        return (handle, store, keys);
    }

    fn op(author: &KeyPair, target: Hash) -> Operation {
        return Operation::sign(author, OpKind::Add, target, hash(b"e"), vec![], BTreeSet::new());
    }

    #[tokio::test]
    async fn find_peers_sees_advertisers_only() {
        let mesh = MemoryMesh::new();
        let (a, _, _) = peer(&mesh);
        let (b, _, _) = peer(&mesh);
        let (_quiet, _, _) = peer(&mesh);
        let object = hash(b"room");
        b.advertise(object).await.unwrap();
        assert_eq!(a.find_peers(&object).await.unwrap(), vec![b.local()]);
        b.withdraw(&object);
        assert!(a.find_peers(&object).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lookup_answers_from_store() {
        let mesh = MemoryMesh::new();
        let (a, _, _) = peer(&mesh);
        let (b, store, _) = peer(&mesh);
        let room = Object::ChatRoom(RoomRecord::new(Discriminator::random()));
        let id = store.save(&Record::Object(room.clone())).unwrap();

        // Stored but not announced.
        assert!(a.lookup(Suffix::of(&id)).await.unwrap().is_empty());

        b.advertise(id).await.unwrap();
        let found = a.lookup(Suffix::of(&id)).await.unwrap();
        assert_eq!(found, vec![PeerHandle { peer: b.local(), object: room }]);
    }

    #[tokio::test]
    async fn digest_and_fetch() {
        let mesh = MemoryMesh::new();
        let (a, _, keys) = peer(&mesh);
        let (b, store, _) = peer(&mesh);
        let container = hash(b"container");
        let theirs = op(&keys, container);
        let theirs_id = store.save(&Record::Operation(theirs.clone())).unwrap();
        let ours = hash(b"ours");

        let reply = a.exchange_digest(&b.local(), &container, &BTreeSet::from([ours])).await.unwrap();
        assert_eq!(reply.missing_here, BTreeSet::from([theirs_id]));
        assert_eq!(reply.missing_there, BTreeSet::from([ours]));

        let fetched = a.fetch_operations(&b.local(), &[theirs_id, ours]).await.unwrap();
        assert_eq!(fetched, vec![theirs]);
    }

    #[tokio::test]
    async fn push_reaches_subscriber() {
        let mesh = MemoryMesh::new();
        let (a, _, keys) = peer(&mesh);
        let (b, _, _) = peer(&mesh);
        let object = hash(b"room");
        let mut inbox = b.subscribe(object, 4);
        a.push_operations(&b.local(), &object, vec![op(&keys, object)]).await.unwrap();
        let inbound = inbox.recv().await.unwrap();
        assert_eq!(inbound.from, a.local());
        assert_eq!(inbound.ops.len(), 1);
    }

    #[tokio::test]
    async fn disconnected_peers_are_unreachable() {
        let mesh = MemoryMesh::new();
        let (a, _, _) = peer(&mesh);
        let (b, _, _) = peer(&mesh);
        let object = hash(b"room");
        b.advertise(object).await.unwrap();

        mesh.disconnect(&b.local());
        assert!(a.find_peers(&object).await.unwrap().is_empty());
        let err = a.exchange_digest(&b.local(), &object, &BTreeSet::new()).await.unwrap_err();
        assert_eq!(err, NetworkError::Unreachable(b.local().to_string()));
        assert!(matches!(b.find_peers(&object).await, Err(NetworkError::Disconnected(_))));

        mesh.reconnect(&b.local());
        assert_eq!(a.find_peers(&object).await.unwrap(), vec![b.local()]);
    }
}
