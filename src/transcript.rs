//! Display surface
//!
//! The server-side list of rendered message nodes. Browsers mirror it over
//! SSE; the exporter reads it directly. Nodes are addressed by id so a
//! typing placeholder can be removed exactly, whatever was appended after it.

use serde::Serialize;
use std::sync::Mutex;
use tokio::sync::broadcast;

pub type NodeId = u64;

/// Who a rendered node speaks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    User,
    Bot,
}

impl Author {
    /// Label used in exported transcripts
    pub fn label(self) -> &'static str {
        match self {
            Author::User => "You: ",
            Author::Bot => "Bot: ",
        }
    }
}

/// A node on the display surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedMessage {
    pub id: NodeId,
    pub author: Author,
    /// Formatted markup, already escaped
    pub html: String,
    /// Transient "typing" placeholder rather than a message
    pub typing: bool,
}

/// Changes pushed to connected widgets
#[derive(Debug, Clone)]
pub enum SurfaceEvent {
    /// Node appended; widgets scroll to the bottom
    Append { message: RenderedMessage },
    Remove { id: NodeId },
    SendControl { enabled: bool },
    Cleared,
}

#[derive(Default)]
struct Nodes {
    list: Vec<RenderedMessage>,
    next_id: NodeId,
}

pub struct Transcript {
    nodes: Mutex<Nodes>,
    events: broadcast::Sender<SurfaceEvent>,
}

impl Transcript {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            nodes: Mutex::new(Nodes::default()),
            events,
        }
    }

    fn push(&self, author: Author, html: String, typing: bool) -> NodeId {
        let message = {
            let mut nodes = self.nodes.lock().unwrap();
            nodes.next_id += 1;
            let message = RenderedMessage {
                id: nodes.next_id,
                author,
                html,
                typing,
            };
            nodes.list.push(message.clone());
            message
        };
        let id = message.id;
        let _ = self.events.send(SurfaceEvent::Append { message });
        id
    }

    /// Append a formatted message node
    pub fn append(&self, author: Author, html: String) -> NodeId {
        self.push(author, html, false)
    }

    /// Append the transient typing placeholder
    pub fn insert_typing(&self) -> NodeId {
        self.push(Author::Bot, String::new(), true)
    }

    /// Remove exactly the node with this id. Returns false if it is gone.
    pub fn remove(&self, id: NodeId) -> bool {
        let removed = {
            let mut nodes = self.nodes.lock().unwrap();
            let before = nodes.list.len();
            nodes.list.retain(|m| m.id != id);
            nodes.list.len() != before
        };
        if removed {
            let _ = self.events.send(SurfaceEvent::Remove { id });
        }
        removed
    }

    pub fn clear(&self) {
        self.nodes.lock().unwrap().list.clear();
        let _ = self.events.send(SurfaceEvent::Cleared);
    }

    /// Snapshot of every node in display order
    pub fn nodes(&self) -> Vec<RenderedMessage> {
        self.nodes.lock().unwrap().list.clone()
    }

    /// Snapshot of real messages, placeholders skipped
    pub fn messages(&self) -> Vec<RenderedMessage> {
        self.nodes
            .lock()
            .unwrap()
            .list
            .iter()
            .filter(|m| !m.typing)
            .cloned()
            .collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SurfaceEvent> {
        self.events.subscribe()
    }

    pub fn event_sender(&self) -> broadcast::Sender<SurfaceEvent> {
        self.events.clone()
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}
