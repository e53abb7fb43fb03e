// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

//! Chat in a room replicated between in-process peers.
//!
//! Creates a room, prints its three-word code, and optionally starts a
//! guest peer that finds the room by that code alone. Every line typed is
//! posted to the room. `/topic <text>` changes the topic, `/quit` leaves.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use parlor::Config;
use parlor::Node;
use parlor::Room;
use parlor::key::KeyPair;
use parlor::key::KeyPub;
use parlor::mesh::MemoryMesh;
use parlor::mesh::MeshHandle;
use parlor::mesh::PeerId;
use parlor::room::RoomEvent;
use parlor::store::MemoryStore;
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Args {
    /// Name shown next to your messages.
    #[clap(short, long, default_value = "you")]
    name: String,
    /// Initial room topic.
    #[clap(short, long, default_value = "")]
    topic: String,
    /// Start a second peer with this name that joins by word code.
    #[clap(short, long)]
    guest: Option<String>,
    /// Milliseconds between sync rounds.
    #[clap(long)]
    broadcast_interval_ms: Option<u64>,
    /// Seconds to search for a room before giving up.
    #[clap(long)]
    discovery_timeout_secs: Option<u64>,
}

impl Args {
    fn config(&self) -> Config {
        let mut config = Config::default();
        if let Some(ms) = self.broadcast_interval_ms {
            config.broadcast_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = self.discovery_timeout_secs {
            config.discovery_timeout = Duration::from_secs(secs);
        }
        return config;
    }
}

type Names = Arc<HashMap<KeyPub, String>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
    let args = Args::parse();
    let config = args.config();
    let mesh = MemoryMesh::new();

    let host = KeyPair::generate();
    let guest = args.guest.as_ref().map(|name| (KeyPair::generate(), name.clone()));

    let mut names = HashMap::new();
    names.insert(host.key_pub, args.name.clone());
    if let Some((keys, name)) = &guest {
        names.insert(keys.key_pub, name.clone());
    }
    let names: Names = Arc::new(names);

    let node = local_node(&mesh, &host, config.clone());
    let room = node.create_room(&args.topic).await.context("creating room")?;
    println!("> created room, word code is:");
    println!();
    println!("    {}", room.code());
    println!();

    tokio::spawn(event_loop(room.subscribe().await?, names.clone()));

    if let Some((keys, name)) = guest {
        let node = local_node(&mesh, &keys, config);
        let code = room.code();
        tokio::spawn(async move {
            if let Err(err) = guest_loop(node, &code, &name).await {
                println!("> guest could not join: {err:#}");
            }
        });
    }

    println!("> type and press enter to send a message, /quit to leave");

    // spawn an input thread that reads stdin
    let (line_tx, mut line_rx) = mpsc::channel(1);
    std::thread::spawn(move || input_loop(line_tx));

    while let Some(line) = line_rx.recv().await {
        let line = line.trim();
        if line == "/quit" {
            break;
        }
        if let Some(topic) = line.strip_prefix("/topic ") {
            room.set_topic(topic).await?;
            continue;
        }
        if !line.is_empty() {
            room.say(line).await?;
        }
    }

    room.leave().await?;
    room.close().await?;
    return Ok(());
}

/// A node whose mesh answers from the same store it writes to.
fn local_node(mesh: &MemoryMesh, keys: &KeyPair, config: Config) -> Node<MeshHandle> {
    let store = Arc::new(MemoryStore::new());
    let handle = mesh.join(PeerId(keys.key_pub), store.clone());
    return Node::new(keys.clone(), store, handle, config);
}

async fn guest_loop(node: Node<MeshHandle>, code: &str, name: &str) -> anyhow::Result<()> {
    let room: Room = node.join(code).await?;
    room.say(&format!("hi, {name} here")).await?;
    // keep the session alive for as long as the process runs
    std::future::pending::<()>().await;
    return Ok(());
}

async fn event_loop(mut events: broadcast::Receiver<RoomEvent>, names: Names) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                println!("> missed {skipped} events");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return,
        };
        match event {
            RoomEvent::MessageAdded(message) => println!("{}: {}", fmt_author(&names, &message.author), message.text),
            RoomEvent::MessageRemoved(message) => println!("> {} retracted a message", fmt_author(&names, &message.author)),
            RoomEvent::ParticipantJoined(key) => println!("> {} joined", fmt_author(&names, &key)),
            RoomEvent::ParticipantLeft(key) => println!("> {} left", fmt_author(&names, &key)),
            RoomEvent::TopicChanged(topic) => println!("> topic is now \"{topic}\""),
        }
    }
}

fn input_loop(line_tx: mpsc::Sender<String>) -> anyhow::Result<()> {
    let mut buffer = String::new();
    let stdin = std::io::stdin();
    loop {
        if stdin.read_line(&mut buffer)? == 0 {
            // eof: quit as if typed
            line_tx.blocking_send("/quit".to_string())?;
            return Ok(());
        }
        line_tx.blocking_send(buffer.clone())?;
        buffer.clear();
    }
}

fn fmt_author(names: &Names, key: &KeyPub) -> String {
    return names.get(key).cloned().unwrap_or_else(|| key.short());
}
