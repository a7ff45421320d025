//! View-state controller.
//!
//! [`TodoViewModel`] turns the repository's live queries into published
//! values a presentation layer can read at any time, and turns user intents
//! into fire-and-forget writes.
//!
//! # Lifecycle
//!
//! ```text
//! open ──► subscribed ──► close ──► closed
//!  │         │  ▲
//!  │         │  └── snapshots pushed by the store
//!  │         └───── commands spawn writes
//!  └─ published values start empty
//! ```
//!
//! Dropping the view model without `close` aborts the forwarding tasks but
//! leaves in-flight writes to finish on their own.

use crate::config::ViewModelConfig;
use crate::error::ViewModelError;
use crate::repository::TodoRepository;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use todo_store_core::dao::{DaoError, LiveQuery};
use todo_store_core::environment::Clock;
use todo_store_core::query::{SortOrder, sort_todos};
use todo_store_core::{Priority, Todo, TodoId};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Handle for a write issued by a view model command.
///
/// Dropping the handle does not cancel the write. Await it only when the
/// caller needs to know the write has been attempted (tests, shutdown).
#[derive(Debug)]
pub struct WriteHandle {
    task: Option<JoinHandle<()>>,
}

impl WriteHandle {
    /// A handle for a command that issued no write
    #[must_use]
    pub const fn completed() -> Self {
        Self { task: None }
    }

    /// Whether the write is still running
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Waits until the write has been attempted.
    ///
    /// Success or failure has already been logged by the time this returns.
    pub async fn wait(self) {
        if let Some(task) = self.task {
            if let Err(error) = task.await {
                tracing::error!(%error, "Write task did not complete");
            }
        }
    }

    /// Waits for the write with a timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ViewModelError::WriteTimeout`] if the write is still running
    /// when `timeout` elapses.
    pub async fn wait_with_timeout(self, timeout: Duration) -> Result<(), ViewModelError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| ViewModelError::WriteTimeout)
    }
}

/// Decrements the pending-write counter on drop, even if the write panics.
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Published todo views plus the commands that change them.
pub struct TodoViewModel {
    repository: TodoRepository,
    clock: Arc<dyn Clock>,
    config: ViewModelConfig,
    runtime: Handle,
    all_todos: watch::Receiver<Vec<Todo>>,
    high_priority_todos: watch::Receiver<Vec<Todo>>,
    incomplete_todos: watch::Receiver<Vec<Todo>>,
    subscriptions: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
    pending_writes: Arc<AtomicUsize>,
}

impl TodoViewModel {
    /// Subscribes to the repository and starts publishing.
    ///
    /// Must be called from within a tokio runtime; commands issued later are
    /// spawned onto that runtime from any thread.
    ///
    /// # Errors
    ///
    /// Returns [`ViewModelError::Subscribe`] if a live query cannot be opened.
    pub async fn open(
        repository: TodoRepository,
        clock: Arc<dyn Clock>,
        config: ViewModelConfig,
    ) -> Result<Self, ViewModelError> {
        let all = repository.observe_all().await?;
        let high = repository.observe_by_priority(Priority::High).await?;

        let (all_tx, all_todos) = watch::channel(Vec::new());
        let (high_tx, high_priority_todos) = watch::channel(Vec::new());
        let (incomplete_tx, incomplete_todos) = watch::channel(Vec::new());

        let subscriptions = vec![
            forward("all_todos", all, move |snapshot| {
                let incomplete = snapshot.iter().filter(|t| !t.completed).cloned().collect();
                incomplete_tx.send_replace(incomplete);
                all_tx.send_replace(snapshot);
            }),
            forward("high_priority_todos", high, move |snapshot| {
                high_tx.send_replace(snapshot);
            }),
        ];

        tracing::debug!("View model opened");

        Ok(Self {
            repository,
            clock,
            config,
            runtime: Handle::current(),
            all_todos,
            high_priority_todos,
            incomplete_todos,
            subscriptions: Mutex::new(subscriptions),
            closed: AtomicBool::new(false),
            pending_writes: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Every todo, newest first
    #[must_use]
    pub fn all_todos(&self) -> watch::Receiver<Vec<Todo>> {
        self.all_todos.clone()
    }

    /// High priority todos, newest first
    #[must_use]
    pub fn high_priority_todos(&self) -> watch::Receiver<Vec<Todo>> {
        self.high_priority_todos.clone()
    }

    /// Todos not yet completed, newest first
    #[must_use]
    pub fn incomplete_todos(&self) -> watch::Receiver<Vec<Todo>> {
        self.incomplete_todos.clone()
    }

    /// The current list of all todos in `order`
    #[must_use]
    pub fn sorted_todos(&self, order: SortOrder) -> Vec<Todo> {
        let mut todos = self.all_todos.borrow().clone();
        sort_todos(&mut todos, order);
        todos
    }

    /// Adds a todo created now. Blank content is ignored.
    pub fn add_todo(&self, content: &str, priority: Priority) -> WriteHandle {
        if content.trim().is_empty() {
            tracing::debug!("Ignoring todo with blank content");
            return WriteHandle::completed();
        }

        let todo = Todo::new(content, priority, self.clock.now());
        self.spawn_write("add_todo", move |repository| async move {
            let id = repository.insert(todo).await?;
            tracing::debug!(%id, "Added todo");
            Ok(())
        })
    }

    /// Replaces a stored todo.
    pub fn update_todo(&self, todo: Todo) -> WriteHandle {
        self.spawn_write("update_todo", move |repository| async move {
            repository.update(todo).await
        })
    }

    /// Deletes a todo.
    pub fn delete_todo(&self, todo: &Todo) -> WriteHandle {
        let todo = todo.clone();
        self.spawn_write("delete_todo", move |repository| async move {
            repository.delete(&todo).await
        })
    }

    /// Flips a todo's completed flag.
    pub fn toggle_complete(&self, todo: &Todo) -> WriteHandle {
        let todo = todo.clone();
        self.spawn_write("toggle_complete", move |repository| async move {
            let completed = repository.toggle_complete(&todo).await?;
            tracing::debug!(id = %todo.id, completed, "Toggled todo");
            Ok(())
        })
    }

    /// One-shot lookup, for edit screens.
    ///
    /// Storage errors are logged and reported as absent.
    pub async fn get_todo_by_id(&self, id: TodoId) -> Option<Todo> {
        match self.repository.get_by_id(id).await {
            Ok(todo) => todo,
            Err(error) => {
                tracing::error!(%id, %error, "Lookup failed");
                None
            }
        }
    }

    /// Whether `close` has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stops accepting commands, waits for in-flight writes, then
    /// unsubscribes from the repository.
    ///
    /// # Errors
    ///
    /// Returns [`ViewModelError::ShutdownTimeout`] if writes are still running
    /// after the configured timeout. The subscriptions are released anyway.
    pub async fn close(&self) -> Result<(), ViewModelError> {
        self.closed.store(true, Ordering::SeqCst);

        let timeout = self.config.shutdown_timeout;
        let start = std::time::Instant::now();
        let poll_interval = Duration::from_millis(10);

        let result = loop {
            let pending = self.pending_writes.load(Ordering::SeqCst);
            if pending == 0 {
                break Ok(());
            }
            if start.elapsed() >= timeout {
                tracing::error!(
                    pending_writes = pending,
                    "Close timed out with writes still running"
                );
                break Err(ViewModelError::ShutdownTimeout(pending));
            }
            tokio::time::sleep(poll_interval).await;
        };

        self.unsubscribe();
        tracing::debug!("View model closed");
        result
    }

    fn unsubscribe(&self) {
        let mut subscriptions = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for task in subscriptions.drain(..) {
            task.abort();
        }
    }

    fn spawn_write<F, Fut>(&self, op: &'static str, write: F) -> WriteHandle
    where
        F: FnOnce(TodoRepository) -> Fut,
        Fut: Future<Output = Result<(), DaoError>> + Send + 'static,
    {
        // Count first so that `close` either sees this write or we see `closed`.
        self.pending_writes.fetch_add(1, Ordering::SeqCst);
        let guard = PendingGuard(Arc::clone(&self.pending_writes));

        if self.is_closed() {
            tracing::warn!(op, "Ignoring command on closed view model");
            metrics::counter!("view_model.dropped_commands", "op" => op)
                .increment(1);
            return WriteHandle::completed();
        }

        let write = write(self.repository.clone());
        let span = tracing::debug_span!("view_model_write", op);
        let task = self.runtime.spawn(
            async move {
                let _guard = guard;
                match write.await {
                    Ok(()) => {}
                    Err(error) if error.is_not_found() => {
                        tracing::debug!(%error, "Write addressed a missing todo, ignored");
                    }
                    Err(error) => {
                        tracing::error!(%error, "Write failed");
                    }
                }
            }
            .instrument(span),
        );

        WriteHandle { task: Some(task) }
    }
}

impl Drop for TodoViewModel {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for TodoViewModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TodoViewModel")
            .field("closed", &self.is_closed())
            .field(
                "pending_writes",
                &self.pending_writes.load(Ordering::SeqCst),
            )
            .finish_non_exhaustive()
    }
}

/// Pushes every snapshot of `query` into `publish` until the store goes away
/// or the task is aborted.
fn forward<P>(name: &'static str, mut query: LiveQuery, mut publish: P) -> JoinHandle<()>
where
    P: FnMut(Vec<Todo>) + Send + 'static,
{
    tokio::spawn(
        async move {
            while let Some(snapshot) = query.next().await {
                tracing::trace!(rows = snapshot.len(), "Publishing snapshot");
                publish(snapshot);
            }
            tracing::debug!("Live query ended");
        }
        .instrument(tracing::debug_span!("view_model_subscription", query = name)),
    )
}
