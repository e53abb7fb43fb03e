// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! Per-object sync sessions.
//!
//! A session is an actor that owns one replicated object. It announces the
//! object on the mesh while broadcasting, and while syncing it runs a
//! digest exchange with every peer announcing the same object on each
//! interval tick: compare the operation hashes each side stores for each
//! container, fetch what we lack, push what they lack. Operations peers
//! push unprompted are applied as they arrive.
//!
//! The store is the source of truth for what this replica has to offer.
//! Every applied remote operation is saved, or queued and retried before
//! the next digest when the store refuses it. Local operations only become
//! visible to peers once they are flushed.
//!
//! All access to the object goes through the actor, so local writers are
//! serialized and never race on a container's frontier.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::Instrument;
use tracing::debug;
use tracing::error_span;
use tracing::trace;
use tracing::warn;

use crate::config::Config;
use crate::crdt::op::Operation;
use crate::error::Error;
use crate::error::Result;
use crate::key::Hash;
use crate::mesh::Inbound;
use crate::mesh::Mesh;
use crate::mesh::PeerId;
use crate::store::Record;
use crate::store::Store;

/// Commands buffered per session before senders wait.
const COMMAND_CAPACITY: usize = 64;

/// An object a session can keep in sync.
pub trait Replicated: Send + 'static {
    /// The identity peers agree on.
    fn id(&self) -> Hash;

    /// The containers whose operations are exchanged.
    fn containers(&self) -> Vec<Hash>;

    /// Apply operations from elsewhere, returning every operation that
    /// became applied, including buffered ones they released.
    fn apply_remote(&mut self, ops: Vec<Operation>) -> Vec<Operation>;
}

/// Where a session is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Neither announcing nor exchanging.
    Idle,
    /// Announcing, not exchanging.
    Broadcasting,
    /// Exchanging, but no peer has been found yet.
    Discovering,
    /// Exchanging with at least one peer.
    Syncing,
}

/// What one sync round did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Peers a full digest exchange completed with.
    pub peers: usize,
    /// Peers dropped from the round because they could not be reached.
    pub failed: usize,
    /// Operations accepted from peers.
    pub received: usize,
    /// Operations pushed to peers.
    pub sent: usize,
}

type Job<R> = Box<dyn FnOnce(&mut R, &dyn Store) + Send>;

enum ToSession<R> {
    With(Job<R>),
    SyncNow { reply: oneshot::Sender<Result<SyncReport>> },
    Broadcast { on: bool, reply: oneshot::Sender<()> },
    Sync { on: bool, reply: oneshot::Sender<()> },
    State { reply: oneshot::Sender<SessionState> },
    Shutdown { reply: oneshot::Sender<R> },
}

/// Talks to a running session.
pub struct SyncHandle<R> {
    object: Hash,
    tx: mpsc::Sender<ToSession<R>>,
}

impl<R> Clone for SyncHandle<R> {
    fn clone(&self) -> Self {
        return SyncHandle {
            object: self.object,
            tx: self.tx.clone(),
        };
    }
}

impl<R: Replicated> SyncHandle<R> {
    /// Start a session for `replica`. It begins idle.
    pub fn spawn<M: Mesh>(replica: R, store: Arc<dyn Store>, mesh: M, config: &Config) -> SyncHandle<R> {
        let object = replica.id();
        let (tx, inbox) = mpsc::channel(COMMAND_CAPACITY);
        let inbound = mesh.subscribe(object, config.inbox_capacity);
        let span = error_span!("session", object = %object.short(), me = %mesh.local());
        let session = Session {
            replica,
            store,
            mesh,
            inbox,
            inbound,
            interval: config.broadcast_interval,
            broadcasting: false,
            syncing: false,
            last_peers: 0,
            unsaved: Vec::new(),
        };
        tokio::spawn(session.run().instrument(span));
        return SyncHandle { object, tx };
    }

    /// The object this session keeps in sync.
    pub fn object(&self) -> Hash {
        return self.object;
    }

    /// Run `f` against the object inside the session. Operations it
    /// flushes are pushed to peers right away while syncing.
    pub async fn with<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut R, &dyn Store) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        let job: Job<R> = Box::new(move |replica: &mut R, store: &dyn Store| {
            reply.send(f(replica, store)).ok();
        });
        self.tx.send(ToSession::With(job)).await.map_err(|_| Error::SessionClosed)?;
        return rx.await.map_err(|_| Error::SessionClosed);
    }

    /// Run one sync round now instead of waiting for the next tick.
    pub async fn sync_now(&self) -> Result<SyncReport> {
        return self.request(|reply| ToSession::SyncNow { reply }).await?;
    }

    pub async fn start_broadcast(&self) -> Result<()> {
        return self.request(|reply| ToSession::Broadcast { on: true, reply }).await;
    }

    pub async fn stop_broadcast(&self) -> Result<()> {
        return self.request(|reply| ToSession::Broadcast { on: false, reply }).await;
    }

    pub async fn start_sync(&self) -> Result<()> {
        return self.request(|reply| ToSession::Sync { on: true, reply }).await;
    }

    /// Stop exchanging. The object keeps its state.
    pub async fn stop_sync(&self) -> Result<()> {
        return self.request(|reply| ToSession::Sync { on: false, reply }).await;
    }

    pub async fn state(&self) -> Result<SessionState> {
        return self.request(|reply| ToSession::State { reply }).await;
    }

    /// Stop the session and take the object back.
    pub async fn shutdown(&self) -> Result<R> {
        return self.request(|reply| ToSession::Shutdown { reply }).await;
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> ToSession<R>) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).await.map_err(|_| Error::SessionClosed)?;
        return rx.await.map_err(|_| Error::SessionClosed);
    }
}

struct Session<R, M> {
    replica: R,
    store: Arc<dyn Store>,
    mesh: M,
    inbox: mpsc::Receiver<ToSession<R>>,
    inbound: mpsc::Receiver<Inbound>,
    interval: Duration,
    broadcasting: bool,
    syncing: bool,
    /// Peers found by the most recent round.
    last_peers: usize,
    /// Applied remote operations the store has not taken yet.
    unsaved: Vec<Operation>,
}

impl<R: Replicated, M: Mesh> Session<R, M> {
    async fn run(mut self) {
        self.load_stored();
        let mut tick = tokio::time::interval(self.interval.max(Duration::from_millis(1)));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let shutdown = loop {
            tokio::select! {
                biased;
                msg = self.inbox.recv() => match msg {
                    Some(msg) => {
                        if let Some(reply) = self.on_message(msg).await {
                            break Some(reply);
                        }
                    }
                    None => break None,
                },
                Some(inbound) = self.inbound.recv() => {
                    self.on_inbound(inbound);
                }
                _ = tick.tick(), if self.broadcasting || self.syncing => {
                    self.on_tick().await;
                }
            }
        };

        self.mesh.withdraw(&self.replica.id());
        debug!("session stopped");
        if let Some(reply) = shutdown {
            reply.send(self.replica).ok();
        }
    }

    /// Handle a command. Returns the reply channel once asked to shut down.
    async fn on_message(&mut self, msg: ToSession<R>) -> Option<oneshot::Sender<R>> {
        match msg {
            ToSession::With(job) => {
                let before = self.stored();
                job(&mut self.replica, self.store.as_ref());
                if self.syncing {
                    let fresh: BTreeSet<Hash> = self.stored().difference(&before).copied().collect();
                    self.push_fresh(fresh).await;
                }
            }
            ToSession::SyncNow { reply } => {
                let report = self.sync_round().await;
                reply.send(report).ok();
            }
            ToSession::Broadcast { on, reply } => {
                self.broadcasting = on;
                if on {
                    self.advertise().await;
                } else {
                    self.mesh.withdraw(&self.replica.id());
                }
                reply.send(()).ok();
            }
            ToSession::Sync { on, reply } => {
                self.syncing = on;
                reply.send(()).ok();
            }
            ToSession::State { reply } => {
                reply.send(self.state()).ok();
            }
            ToSession::Shutdown { reply } => return Some(reply),
        }
        return None;
    }

    fn state(&self) -> SessionState {
        return match (self.broadcasting, self.syncing) {
            (_, true) if self.last_peers > 0 => SessionState::Syncing,
            (_, true) => SessionState::Discovering,
            (true, false) => SessionState::Broadcasting,
            (false, false) => SessionState::Idle,
        };
    }

    async fn on_tick(&mut self) {
        if self.broadcasting {
            self.advertise().await;
        }
        if self.syncing {
            match self.sync_round().await {
                Ok(report) => trace!(?report, "tick"),
                Err(err) => warn!(%err, "sync round failed, will retry"),
            }
        }
    }

    async fn advertise(&mut self) {
        if let Err(err) = self.mesh.advertise(self.replica.id()).await {
            warn!(%err, "advertise failed, will retry");
        }
    }

    fn on_inbound(&mut self, inbound: Inbound) {
        let offered = inbound.ops.len();
        let accepted = self.accept(inbound.ops);
        debug!(from = %inbound.from, offered, accepted, "pushed operations");
    }

    /// Replay what the store already holds, so a restarted session picks
    /// up where it left off.
    fn load_stored(&mut self) {
        let ids = self.stored();
        if ids.is_empty() {
            return;
        }
        let ops = self.load_operations(&ids);
        let applied = self.replica.apply_remote(ops).len();
        debug!(stored = ids.len(), applied, "loaded stored operations");
    }

    async fn sync_round(&mut self) -> Result<SyncReport> {
        self.retry_unsaved();
        let object = self.replica.id();
        let peers = self.mesh.find_peers(&object).await?;
        self.last_peers = peers.len();

        let mut report = SyncReport::default();
        for peer in peers {
            match self.sync_with(&peer).await {
                Ok((received, sent)) => {
                    report.peers += 1;
                    report.received += received;
                    report.sent += sent;
                }
                Err(err) => {
                    warn!(%peer, %err, "dropping peer from this round");
                    report.failed += 1;
                }
            }
        }
        if report.received > 0 || report.sent > 0 {
            debug!(peers = report.peers, received = report.received, sent = report.sent, "sync round");
        }
        return Ok(report);
    }

    /// Exchange digests with one peer for every container.
    async fn sync_with(&mut self, peer: &PeerId) -> Result<(usize, usize)> {
        let object = self.replica.id();
        let mut received = 0;
        let mut sent = 0;
        for container in self.replica.containers() {
            let known = self.store.operations(&container)?;
            let reply = self.mesh.exchange_digest(peer, &container, &known).await?;

            if !reply.missing_here.is_empty() {
                let ids: Vec<Hash> = reply.missing_here.iter().copied().collect();
                let ops = self.mesh.fetch_operations(peer, &ids).await?;
                received += self.accept(ops);
            }
            if !reply.missing_there.is_empty() {
                let ops = self.load_operations(&reply.missing_there);
                sent += ops.len();
                self.mesh.push_operations(peer, &object, ops).await?;
            }
        }
        return Ok((received, sent));
    }

    /// Apply remote operations and persist the ones applied.
    fn accept(&mut self, ops: Vec<Operation>) -> usize {
        if ops.is_empty() {
            return 0;
        }
        self.retry_unsaved();
        let accepted = self.replica.apply_remote(ops);
        let count = accepted.len();
        for op in accepted {
            if let Err(err) = self.store.save(&Record::Operation(op.clone())) {
                warn!(op = %op.id().short(), %err, "could not persist remote operation, will retry");
                self.unsaved.push(op);
            }
        }
        return count;
    }

    /// Save what the store refused earlier. Whatever still fails stays queued.
    fn retry_unsaved(&mut self) {
        if self.unsaved.is_empty() {
            return;
        }
        let before = self.unsaved.len();
        let store = &self.store;
        self.unsaved.retain(|op| store.save(&Record::Operation(op.clone())).is_err());
        debug!(saved = before - self.unsaved.len(), left = self.unsaved.len(), "retried unsaved operations");
    }

    async fn push_fresh(&mut self, fresh: BTreeSet<Hash>) {
        if fresh.is_empty() {
            return;
        }
        let object = self.replica.id();
        let peers = match self.mesh.find_peers(&object).await {
            Ok(peers) => peers,
            Err(err) => {
                debug!(%err, "no peers to push to, next round will catch up");
                return;
            }
        };
        let ops = self.load_operations(&fresh);
        for peer in peers {
            if let Err(err) = self.mesh.push_operations(&peer, &object, ops.clone()).await {
                debug!(%peer, %err, "push failed, next round will catch up");
            }
        }
    }

    /// Every operation the store holds for this object's containers.
    fn stored(&self) -> BTreeSet<Hash> {
        let mut ids = BTreeSet::new();
        for container in self.replica.containers() {
            match self.store.operations(&container) {
                Ok(found) => ids.extend(found),
                Err(err) => warn!(container = %container.short(), %err, "could not read stored operations"),
            }
        }
        return ids;
    }

    fn load_operations(&self, ids: &BTreeSet<Hash>) -> Vec<Operation> {
        let mut ops = Vec::with_capacity(ids.len());
        for id in ids {
            match self.store.load(id) {
                Ok(Some(Record::Operation(op))) => ops.push(op),
                Ok(_) => trace!(id = %id.short(), "not an operation"),
                Err(err) => warn!(id = %id.short(), %err, "could not load operation"),
            }
        }
        return ops;
    }
}
