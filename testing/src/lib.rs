//! # Todo Store Testing
//!
//! Testing utilities and helpers for the todo store.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`SteppingClock`])
//! - A query layer that rejects writes ([`FailingDao`])
//! - Helpers for waiting on published view-model values
//!
//! ## Example
//!
//! ```ignore
//! use todo_store_testing::{SteppingClock, helpers::wait_until};
//!
//! #[tokio::test]
//! async fn test_add() {
//!     let view_model = open_view_model(Arc::new(SteppingClock::default())).await;
//!     view_model.add_todo("Buy milk", Priority::Medium);
//!
//!     let todos = wait_until(&mut view_model.all_todos(), |t| t.len() == 1).await;
//!     assert_eq!(todos[0].content, "Buy milk");
//! }
//! ```

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;
use todo_store_core::environment::Clock;

/// In-memory query layer test doubles
pub mod dao_mocks;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Duration, Mutex, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use todo_store_testing::mocks::FixedClock;
    /// use todo_store_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that advances by a fixed step on every reading
    ///
    /// Gives every todo created through it a distinct `created_at`, so
    /// ordering assertions do not depend on insertion-order tiebreaks.
    ///
    /// # Example
    ///
    /// ```
    /// use todo_store_testing::mocks::SteppingClock;
    /// use todo_store_core::environment::Clock;
    ///
    /// let clock = SteppingClock::default();
    /// assert!(clock.now() < clock.now());
    /// ```
    #[derive(Debug)]
    pub struct SteppingClock {
        next: Mutex<DateTime<Utc>>,
        step: Duration,
    }

    impl SteppingClock {
        /// Starts at `start` and advances by `step` per reading
        #[must_use]
        pub const fn new(start: DateTime<Utc>, step: Duration) -> Self {
            Self {
                next: Mutex::new(start),
                step,
            }
        }
    }

    impl Default for SteppingClock {
        /// Starts at [`test_clock`]'s time, one second per reading
        fn default() -> Self {
            Self::new(test_clock().now(), Duration::seconds(1))
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let mut next = self
                .next
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let now = *next;
            *next = now + self.step;
            now
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Test helpers and utilities
pub mod helpers {
    use std::time::Duration;
    use todo_store_core::Todo;
    use tokio::sync::watch;

    /// How long [`wait_until`] waits before failing the test.
    pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Waits until a published list satisfies `predicate` and returns it.
    ///
    /// # Panics
    ///
    /// Panics if the condition is not met within [`WAIT_TIMEOUT`] or the
    /// publisher is gone.
    #[allow(clippy::panic)]
    pub async fn wait_until<F>(
        receiver: &mut watch::Receiver<Vec<Todo>>,
        mut predicate: F,
    ) -> Vec<Todo>
    where
        F: FnMut(&[Todo]) -> bool,
    {
        let condition = receiver.wait_for(|todos| predicate(todos));
        let waited = tokio::time::timeout(WAIT_TIMEOUT, condition)
            .await
            .map(|result| result.map(|todos| todos.clone()));

        match waited {
            Ok(Ok(todos)) => todos,
            Ok(Err(_)) => panic!("publisher dropped before condition was met"),
            Err(_) => panic!(
                "condition not met within {WAIT_TIMEOUT:?}; last value: {:?}",
                *receiver.borrow()
            ),
        }
    }

    /// Content of each todo, in list order
    #[must_use]
    pub fn contents(todos: &[Todo]) -> Vec<&str> {
        todos.iter().map(|t| t.content.as_str()).collect()
    }
}

// Re-export commonly used items
pub use dao_mocks::FailingDao;
pub use mocks::{FixedClock, SteppingClock, test_clock};
