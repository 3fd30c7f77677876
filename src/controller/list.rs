//! Shared list engine behind both list controllers.
//!
//! A [`ListController`] is a handle to an actor task that owns one in-memory
//! list. Commands from handles and completions of remote calls are processed
//! one at a time by that task, so the list has a single writer and needs no
//! locking.
//!
//! Remote calls run concurrently inside the actor and can complete in any
//! order. Overlapping loads are last-completion-wins, and a slow load that
//! finishes after a delete will put the deleted entry back. Neither race is
//! mitigated: the store is the source of truth and the next load converges.
//!
//! # Lifecycle of an operation
//!
//! - load: `RefreshStarted`, then `Reloaded` (or `OperationFailed`), then
//!   `RefreshEnded` once no load is in flight
//! - create: name validated locally, remote save, then `Inserted` at index 0
//! - delete: `Removed` immediately, remote delete in the background, no
//!   rollback if it fails

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

use super::error::ListError;
use crate::models::{Record, RecordError, RecordId};
use crate::store::{Query, RecordStore, StoreError};

const EVENT_CAPACITY: usize = 256;

/// An entity that can be shown in a list.
pub trait ListEntity: Clone + Send + Sync + fmt::Debug + 'static {
    fn id(&self) -> &RecordId;
    fn name(&self) -> &str;
    fn from_record(record: &Record) -> Result<Self, RecordError>;
}

/// What a list shows and how new entries are built.
pub trait ListKind: Send + Sync + 'static {
    type Item: ListEntity;

    /// Human-readable entity name, used in logs and validation messages.
    const LABEL: &'static str;

    /// Query answering a full reload of the list.
    fn query(&self) -> Query;

    /// Unsaved record for a new entry named `name`.
    fn new_record(&self, name: &str) -> Record;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Load,
    Create,
    Delete,
    /// Background menu-item save started by a restaurant create.
    CreateMenuItem,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Load => write!(f, "load"),
            Operation::Create => write!(f, "create"),
            Operation::Delete => write!(f, "delete"),
            Operation::CreateMenuItem => write!(f, "create menu item"),
        }
    }
}

/// Change notifications published to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum ListEvent<T> {
    RefreshStarted,
    /// The list was replaced wholesale by a load.
    Reloaded(Vec<T>),
    Inserted { index: usize, item: T },
    Removed { index: usize, item: T },
    RefreshEnded,
    OperationFailed { operation: Operation, error: ListError },
}

enum DeleteTarget {
    Id(RecordId),
    Index(usize),
}

impl fmt::Display for DeleteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteTarget::Id(id) => write!(f, "{}", id),
            DeleteTarget::Index(index) => write!(f, "index {}", index),
        }
    }
}

enum Command<T> {
    Load {
        reply: oneshot::Sender<Result<Vec<T>, ListError>>,
    },
    Create {
        name: String,
        reply: oneshot::Sender<Result<T, ListError>>,
    },
    Delete {
        target: DeleteTarget,
        reply: oneshot::Sender<Result<T, ListError>>,
    },
    Snapshot {
        reply: oneshot::Sender<(Vec<T>, LoadState)>,
    },
    Settle {
        reply: oneshot::Sender<()>,
    },
}

enum Completion<T> {
    Loaded {
        result: Result<Vec<Record>, StoreError>,
        reply: oneshot::Sender<Result<Vec<T>, ListError>>,
    },
    Saved {
        result: Result<Record, StoreError>,
        reply: oneshot::Sender<Result<T, ListError>>,
    },
    Deleted {
        item: T,
        result: Result<RecordId, StoreError>,
    },
}

type Remote<T> = BoxFuture<'static, Completion<T>>;

struct ListActor<K: ListKind> {
    kind: Arc<K>,
    store: Arc<dyn RecordStore>,
    items: Vec<K::Item>,
    loads_in_flight: usize,
    settle_waiters: Vec<oneshot::Sender<()>>,
    events: broadcast::Sender<ListEvent<K::Item>>,
}

impl<K: ListKind> ListActor<K> {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command<K::Item>>) {
        let mut pending: FuturesUnordered<Remote<K::Item>> = FuturesUnordered::new();
        let mut open = true;

        loop {
            tokio::select! {
                command = commands.recv(), if open => match command {
                    Some(command) => {
                        if let Some(remote) = self.handle(command) {
                            pending.push(remote);
                        }
                    }
                    None => open = false,
                },
                Some(done) = pending.next(), if !pending.is_empty() => self.complete(done),
                else => break,
            }

            if pending.is_empty() {
                for waiter in self.settle_waiters.drain(..) {
                    let _ = waiter.send(());
                }
            }
        }

        tracing::debug!("{} list controller stopped", K::LABEL);
    }

    fn state(&self) -> LoadState {
        if self.loads_in_flight > 0 {
            LoadState::Loading
        } else {
            LoadState::Idle
        }
    }

    fn publish(&self, event: ListEvent<K::Item>) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn handle(&mut self, command: Command<K::Item>) -> Option<Remote<K::Item>> {
        match command {
            Command::Load { reply } => {
                self.loads_in_flight += 1;
                if self.loads_in_flight == 1 {
                    self.publish(ListEvent::RefreshStarted);
                }
                tracing::debug!("Loading {} list", K::LABEL);

                let store = Arc::clone(&self.store);
                let query = self.kind.query();
                Some(
                    async move {
                        let result = store.query(&query).await;
                        Completion::Loaded { result, reply }
                    }
                    .boxed(),
                )
            }

            Command::Create { name, reply } => {
                if name.is_empty() {
                    let message = format!("{} name cannot be empty", K::LABEL);
                    tracing::debug!("{}", message);
                    let _ = reply.send(Err(ListError::Validation(message)));
                    return None;
                }

                let store = Arc::clone(&self.store);
                let record = self.kind.new_record(&name);
                Some(
                    async move {
                        let result = store.save(record).await;
                        Completion::Saved { result, reply }
                    }
                    .boxed(),
                )
            }

            Command::Delete { target, reply } => {
                let index = match &target {
                    DeleteTarget::Id(id) => self.items.iter().position(|item| item.id() == id),
                    DeleteTarget::Index(index) => Some(*index).filter(|i| *i < self.items.len()),
                };
                let Some(index) = index else {
                    let _ = reply.send(Err(ListError::NotFound(target.to_string())));
                    return None;
                };

                let item = self.items.remove(index);
                self.publish(ListEvent::Removed {
                    index,
                    item: item.clone(),
                });
                let _ = reply.send(Ok(item.clone()));

                let store = Arc::clone(&self.store);
                Some(
                    async move {
                        let result = store.delete(item.id()).await;
                        Completion::Deleted { item, result }
                    }
                    .boxed(),
                )
            }

            Command::Snapshot { reply } => {
                let _ = reply.send((self.items.clone(), self.state()));
                None
            }

            Command::Settle { reply } => {
                self.settle_waiters.push(reply);
                None
            }
        }
    }

    fn complete(&mut self, done: Completion<K::Item>) {
        match done {
            Completion::Loaded { result, reply } => {
                let outcome = match result {
                    Ok(records) => {
                        let items = self.replace_items(&records);
                        Ok(items)
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load {} list: {}", K::LABEL, e);
                        let error = ListError::from(e);
                        self.publish(ListEvent::OperationFailed {
                            operation: Operation::Load,
                            error: error.clone(),
                        });
                        Err(error)
                    }
                };

                self.loads_in_flight = self.loads_in_flight.saturating_sub(1);
                if self.loads_in_flight == 0 {
                    self.publish(ListEvent::RefreshEnded);
                }
                let _ = reply.send(outcome);
            }

            Completion::Saved { result, reply } => {
                let outcome = result
                    .map_err(ListError::from)
                    .and_then(|record| K::Item::from_record(&record).map_err(ListError::from));

                match outcome {
                    Ok(item) => {
                        tracing::info!("Saved {} '{}'", K::LABEL, item.name());
                        self.items.insert(0, item.clone());
                        self.publish(ListEvent::Inserted {
                            index: 0,
                            item: item.clone(),
                        });
                        let _ = reply.send(Ok(item));
                    }
                    Err(error) => {
                        tracing::warn!("Failed to save {}: {}", K::LABEL, error);
                        self.publish(ListEvent::OperationFailed {
                            operation: Operation::Create,
                            error: error.clone(),
                        });
                        let _ = reply.send(Err(error));
                    }
                }
            }

            Completion::Deleted { item, result } => match result {
                Ok(_) => tracing::info!("Deleted {} '{}'", K::LABEL, item.name()),
                Err(e) => {
                    tracing::warn!(
                        "Failed to delete {} '{}' from store: {}",
                        K::LABEL,
                        item.name(),
                        e
                    );
                    self.publish(ListEvent::OperationFailed {
                        operation: Operation::Delete,
                        error: e.into(),
                    });
                }
            },
        }
    }

    /// Decodes, sorts and installs a load result.
    fn replace_items(&mut self, records: &[Record]) -> Vec<K::Item> {
        let mut items: Vec<K::Item> = records
            .iter()
            .filter_map(|record| match K::Item::from_record(record) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!("Skipping unreadable {} record: {}", K::LABEL, e);
                    None
                }
            })
            .collect();
        items.sort_by(|a, b| a.name().cmp(b.name()));

        tracing::info!("Loaded {} {} record(s)", items.len(), K::LABEL);
        self.items = items.clone();
        self.publish(ListEvent::Reloaded(items.clone()));
        items
    }
}

/// Handle to a list actor.
///
/// Cloning the handle shares the same list. The actor stops once every
/// handle is dropped and its in-flight remote calls have finished.
pub struct ListController<K: ListKind> {
    kind: Arc<K>,
    store: Arc<dyn RecordStore>,
    commands: mpsc::UnboundedSender<Command<K::Item>>,
    events: broadcast::Sender<ListEvent<K::Item>>,
}

impl<K: ListKind> Clone for ListController<K> {
    fn clone(&self) -> Self {
        Self {
            kind: Arc::clone(&self.kind),
            store: Arc::clone(&self.store),
            commands: self.commands.clone(),
            events: self.events.clone(),
        }
    }
}

impl<K: ListKind> ListController<K> {
    /// Spawns the list actor on the current tokio runtime.
    ///
    /// The list starts empty; call [`load`](Self::load) to fill it.
    pub fn spawn(kind: K, store: Arc<dyn RecordStore>) -> Self {
        let kind = Arc::new(kind);
        let (commands, receiver) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let actor = ListActor {
            kind: Arc::clone(&kind),
            store: Arc::clone(&store),
            items: Vec::new(),
            loads_in_flight: 0,
            settle_waiters: Vec::new(),
            events: events.clone(),
        };
        tokio::spawn(actor.run(receiver));

        Self {
            kind,
            store,
            commands,
            events,
        }
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub(crate) fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub(crate) fn publish(&self, event: ListEvent<K::Item>) {
        let _ = self.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ListEvent<K::Item>> {
        self.events.subscribe()
    }

    async fn request<R>(
        &self,
        command: impl FnOnce(oneshot::Sender<R>) -> Command<K::Item>,
    ) -> Result<R, ListError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| ListError::Closed)?;
        response.await.map_err(|_| ListError::Closed)
    }

    /// Reloads the list from the store, sorted ascending by name.
    ///
    /// On failure the previous list is kept.
    pub async fn load(&self) -> Result<Vec<K::Item>, ListError> {
        self.request(|reply| Command::Load { reply }).await?
    }

    /// Saves a new entry and inserts it at the head of the list.
    ///
    /// The entry goes to index 0 whatever its name; the list is only sorted
    /// again by the next load.
    pub async fn create(&self, name: &str) -> Result<K::Item, ListError> {
        let name = name.to_string();
        self.request(|reply| Command::Create { name, reply })
            .await?
    }

    /// Removes the entry with `id` locally and deletes it remotely in the
    /// background. Returns the removed entry.
    pub async fn delete(&self, id: &RecordId) -> Result<K::Item, ListError> {
        let target = DeleteTarget::Id(id.clone());
        self.request(|reply| Command::Delete { target, reply })
            .await?
    }

    /// Like [`delete`](Self::delete), addressing the entry by list position.
    pub async fn delete_at(&self, index: usize) -> Result<K::Item, ListError> {
        let target = DeleteTarget::Index(index);
        self.request(|reply| Command::Delete { target, reply })
            .await?
    }

    pub async fn snapshot(&self) -> Result<Vec<K::Item>, ListError> {
        let (items, _) = self.request(|reply| Command::Snapshot { reply }).await?;
        Ok(items)
    }

    pub async fn state(&self) -> Result<LoadState, ListError> {
        let (_, state) = self.request(|reply| Command::Snapshot { reply }).await?;
        Ok(state)
    }

    /// Waits until no remote call issued by this list is in flight.
    pub async fn settle(&self) -> Result<(), ListError> {
        self.request(|reply| Command::Settle { reply }).await
    }
}
