//! Registry of active live queries.
//!
//! Each distinct [`QueryFilter`] owns one `watch` channel. Subscribers to the
//! same filter share it, so a write recomputes each affected query once no
//! matter how many subscribers it has.

use crate::table::{Change, TodoTable};
use todo_store_core::Todo;
use todo_store_core::dao::LiveQuery;
use todo_store_core::query::QueryFilter;
use tokio::sync::watch;

struct Registration {
    filter: QueryFilter,
    sender: watch::Sender<Vec<Todo>>,
}

/// Active live queries, keyed by filter.
#[derive(Default)]
pub struct QueryRegistry {
    entries: Vec<Registration>,
}

impl QueryRegistry {
    /// Creates an empty registry
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of registered queries, including ones whose last subscriber
    /// has gone but which have not been pruned yet
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no query is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds a subscriber for `filter`, seeded with the current result.
    pub fn subscribe(&mut self, filter: QueryFilter, table: &TodoTable) -> LiveQuery {
        if let Some(entry) = self
            .entries
            .iter()
            .find(|entry| entry.filter == filter && !entry.sender.is_closed())
        {
            return LiveQuery::new(entry.sender.subscribe());
        }

        self.entries.retain(|entry| entry.filter != filter);
        let (sender, receiver) = watch::channel(table.select(&filter));
        self.entries.push(Registration { filter, sender });

        tracing::debug!(%filter, "Registered live query");
        metrics::gauge!("todo_store.live_queries")
            .set(self.entries.len() as f64);

        LiveQuery::new(receiver)
    }

    /// Re-runs every query `change` can affect and pushes the new results.
    ///
    /// Queries without subscribers are dropped here. Returns the number of
    /// queries that were republished.
    pub fn notify(&mut self, change: &Change, table: &TodoTable) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| !entry.sender.is_closed());
        if self.entries.len() != before {
            tracing::debug!(
                pruned = before - self.entries.len(),
                "Pruned idle live queries"
            );
            metrics::gauge!("todo_store.live_queries")
            .set(self.entries.len() as f64);
        }

        let mut published = 0;
        for entry in self
            .entries
            .iter()
            .filter(|entry| change.affects(&entry.filter))
        {
            entry.sender.send_replace(table.select(&entry.filter));
            published += 1;
        }

        if published > 0 {
            tracing::trace!(published, "Republished live queries");
            metrics::counter!("todo_store.notifications")
                .increment(published as u64);
        }
        published
    }
}

impl std::fmt::Debug for QueryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| entry.filter))
            .finish()
    }
}
