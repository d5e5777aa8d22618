//! In-memory coordination provider.
//!
//! Models the parts of a ZooKeeper-like store the registry relies on:
//! a node tree with persistent and ephemeral nodes, a single simulated
//! session owning the ephemeral nodes, and asynchronous watch delivery.
//! Also records call statistics so tests can assert on provider traffic.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{CoordinationProvider, ProviderUri, Result};
use crate::error::ProviderError;
use crate::notify::{MessageMode, NotifyEvent, NotifyHandler, NotifyMessage};

#[derive(Debug, Clone)]
struct Node {
    data: String,
    mode: MessageMode,
}

/// Coordination provider backed by process memory.
pub struct InMemoryProvider {
    nodes: DashMap<String, Node>,
    handlers: DashMap<String, Vec<Arc<dyn NotifyHandler>>>,
    connected: AtomicBool,
    latency: Option<Duration>,
    pushed: Mutex<Vec<NotifyMessage>>,
    deleted: Mutex<Vec<String>>,
    children_queries: DashMap<String, usize>,
}

impl InMemoryProvider {
    /// Creates an empty, connected provider.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: DashMap::new(),
            handlers: DashMap::new(),
            connected: AtomicBool::new(true),
            latency: None,
            pushed: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            children_queries: DashMap::new(),
        }
    }

    /// Creates a provider that delays every remote call by `latency`.
    #[must_use]
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::new()
        }
    }

    /// Builds a provider from a `memory://` URI. The optional `latency_ms`
    /// parameter sets a per-call delay.
    pub(crate) fn from_uri(uri: &ProviderUri) -> Result<Self> {
        match uri.param("latency_ms") {
            None => Ok(Self::new()),
            Some(ms) => ms
                .parse::<u64>()
                .map(|ms| Self::with_latency(Duration::from_millis(ms)))
                .map_err(|_| ProviderError::InvalidUri(uri.to_string())),
        }
    }

    /// Makes every subsequent call fail with [`ProviderError::ConnectionLoss`].
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Restores connectivity after [`disconnect`](Self::disconnect).
    pub fn reconnect(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    /// Ends the simulated session: every ephemeral node is removed and the
    /// usual delete notifications are delivered. Returns the number of
    /// nodes removed.
    pub async fn expire_session(&self) -> usize {
        let ephemeral: Vec<String> = self
            .nodes
            .iter()
            .filter(|entry| entry.mode == MessageMode::Ephemeral)
            .map(|entry| entry.key().clone())
            .collect();

        for path in &ephemeral {
            self.nodes.remove(path);
        }
        for path in &ephemeral {
            self.dispatch(path, NotifyEvent::NodeDeleted);
            if let Some(parent) = parent(path) {
                self.dispatch(parent, NotifyEvent::NodeChildrenChanged);
            }
        }

        debug!(removed = ephemeral.len(), "Session expired");
        ephemeral.len()
    }

    /// Returns true if a node exists at `path`.
    pub fn exists(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    /// Payload of the node at `path`.
    pub fn data(&self, path: &str) -> Option<String> {
        self.nodes.get(path).map(|node| node.data.clone())
    }

    /// Persistence of the node at `path`.
    pub fn mode(&self, path: &str) -> Option<MessageMode> {
        self.nodes.get(path).map(|node| node.mode)
    }

    /// Every message accepted by [`push`](CoordinationProvider::push), in order.
    pub fn pushed(&self) -> Vec<NotifyMessage> {
        self.pushed.lock().clone()
    }

    /// Every path passed to [`delete`](CoordinationProvider::delete), in order.
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }

    /// Number of child listings requested for `path`.
    pub fn children_queries(&self, path: &str) -> usize {
        self.children_queries.get(path).map_or(0, |count| *count)
    }

    /// Number of child listings requested across all paths.
    pub fn total_children_queries(&self) -> usize {
        self.children_queries.iter().map(|entry| *entry.value()).sum()
    }

    /// Number of handlers registered at `path`.
    pub fn handler_count(&self, path: &str) -> usize {
        self.handlers.get(path).map_or(0, |list| list.len())
    }

    async fn begin(&self) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ProviderError::ConnectionLoss(
                "in-memory provider is disconnected".to_owned(),
            ));
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }

    /// Delivers `event` for `path` to its handlers on spawned tasks.
    fn dispatch(&self, path: &str, event: NotifyEvent) {
        let handlers = match self.handlers.get(path) {
            Some(list) if !list.is_empty() => list.value().clone(),
            _ => return,
        };

        let message = match self.nodes.get(path) {
            Some(node) => NotifyMessage {
                path: path.to_owned(),
                data: node.data.clone(),
                mode: node.mode,
            },
            None => NotifyMessage::persistent(path, ""),
        };

        for handler in handlers {
            if event == NotifyEvent::NodeChildrenChanged && !handler.receive_child_notify() {
                continue;
            }
            let message = message.clone();
            tokio::spawn(async move {
                if let Err(e) = handler.handle_notify(event, &message).await {
                    warn!(path = %message.path, ?event, error = %e, "Notify handler failed");
                }
            });
        }
    }
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryProvider")
            .field("nodes", &self.nodes.len())
            .field("connected", &self.connected.load(Ordering::SeqCst))
            .field("latency", &self.latency)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CoordinationProvider for InMemoryProvider {
    async fn push(&self, message: &NotifyMessage) -> Result<()> {
        self.begin().await?;
        validate_path(&message.path)?;
        self.pushed.lock().push(message.clone());

        let mut created = Vec::new();
        for ancestor in ancestors(&message.path) {
            if let Entry::Vacant(entry) = self.nodes.entry(ancestor.to_owned()) {
                entry.insert(Node {
                    data: String::new(),
                    mode: MessageMode::Persistent,
                });
                created.push(ancestor.to_owned());
            }
        }

        let is_new = match self.nodes.entry(message.path.clone()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().data.clone_from(&message.data);
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(Node {
                    data: message.data.clone(),
                    mode: message.mode,
                });
                true
            }
        };

        if is_new {
            created.push(message.path.clone());
        } else {
            self.dispatch(&message.path, NotifyEvent::NodeDataChanged);
        }

        for path in &created {
            self.dispatch(path, NotifyEvent::NodeCreated);
            if let Some(parent) = parent(path) {
                self.dispatch(parent, NotifyEvent::NodeChildrenChanged);
            }
        }

        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.begin().await?;
        validate_path(path)?;
        self.deleted.lock().push(path.to_owned());

        let prefix = format!("{path}/");
        let mut removed: Vec<String> = self
            .nodes
            .iter()
            .filter(|entry| entry.key() == path || entry.key().starts_with(&prefix))
            .map(|entry| entry.key().clone())
            .collect();

        if removed.is_empty() {
            debug!(path, "Delete of missing node");
            return Ok(());
        }

        // Deepest first, as a recursive delete would.
        removed.sort_by(|a, b| b.len().cmp(&a.len()));
        for node in &removed {
            self.nodes.remove(node);
        }
        for node in &removed {
            self.dispatch(node, NotifyEvent::NodeDeleted);
        }
        if let Some(parent) = parent(path) {
            self.dispatch(parent, NotifyEvent::NodeChildrenChanged);
        }

        Ok(())
    }

    async fn get_children(&self, path: &str) -> Result<Vec<String>> {
        self.begin().await?;
        validate_path(path)?;
        *self.children_queries.entry(path.to_owned()).or_default() += 1;

        let prefix = format!("{path}/");
        let mut children: Vec<String> = self
            .nodes
            .iter()
            .filter_map(|entry| {
                entry
                    .key()
                    .strip_prefix(&prefix)
                    .filter(|rest| !rest.contains('/'))
                    .map(str::to_owned)
            })
            .collect();
        children.sort();

        Ok(children)
    }

    async fn register_handler(&self, path: &str, handler: Arc<dyn NotifyHandler>) -> Result<()> {
        self.begin().await?;
        validate_path(path)?;
        self.handlers.entry(path.to_owned()).or_default().push(handler);
        Ok(())
    }

    async fn unregister(&self, path: &str, handler: Arc<dyn NotifyHandler>) -> Result<()> {
        self.begin().await?;
        validate_path(path)?;

        if handler.matches_any() {
            self.handlers.remove(path);
        } else if let Some(mut list) = self.handlers.get_mut(path) {
            list.retain(|registered| !same_handler(registered, &handler));
        }
        Ok(())
    }
}

fn validate_path(path: &str) -> Result<()> {
    let valid = path.len() > 1
        && path.starts_with('/')
        && !path.ends_with('/')
        && !path.contains("//");
    if valid {
        Ok(())
    } else {
        Err(ProviderError::InvalidPath(path.to_owned()))
    }
}

/// Proper ancestors of `path`, outermost first, excluding `/`.
fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/').skip(1).map(move |(idx, _)| &path[..idx])
}

fn parent(path: &str) -> Option<&str> {
    path.rsplit_once('/')
        .map(|(parent, _)| parent)
        .filter(|parent| !parent.is_empty())
}

fn same_handler(a: &Arc<dyn NotifyHandler>, b: &Arc<dyn NotifyHandler>) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}
