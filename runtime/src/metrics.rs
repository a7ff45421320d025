//! Prometheus metrics for the todo store.
//!
//! Metrics are emitted through the `metrics` facade and go nowhere until a
//! recorder is installed. [`install_recorder`] installs a Prometheus
//! recorder and returns a handle that renders the scrape text.
//!
//! | metric                                   | kind      | labels |
//! |------------------------------------------|-----------|--------|
//! | `todo_store.writes`                      | counter   | `op`   |
//! | `todo_store.write_failures`              | counter   | `op`   |
//! | `todo_store.write_duration_seconds`      | histogram | `op`   |
//! | `todo_store.rows`                        | gauge     |        |
//! | `todo_store.live_queries`                | gauge     |        |
//! | `todo_store.notifications`               | counter   |        |
//! | `view_model.dropped_commands`            | counter   | `op`   |
//!
//! # Example
//!
//! ```rust,no_run
//! use todo_store_runtime::metrics::install_recorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = install_recorder()?;
//! // ... run the store ...
//! println!("{}", handle.render());
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Installs a global Prometheus recorder and describes every store metric.
///
/// # Errors
///
/// Returns [`MetricsError::Install`] if a global recorder is already
/// installed, or [`MetricsError::Build`] if the exporter is misconfigured.
pub fn install_recorder() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    register_metrics();
    tracing::debug!("Prometheus recorder installed");
    Ok(handle)
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!("todo_store.writes", "Committed writes to the todo table");
    describe_counter!(
        "todo_store.write_failures",
        "Writes rolled back because the snapshot could not be persisted"
    );
    describe_histogram!(
        "todo_store.write_duration_seconds",
        "Time from acquiring the table lock to releasing it"
    );
    describe_gauge!("todo_store.rows", "Rows currently stored");
    describe_gauge!("todo_store.live_queries", "Registered live queries");
    describe_counter!(
        "todo_store.notifications",
        "Live-query snapshots republished after writes"
    );
    describe_counter!(
        "view_model.dropped_commands",
        "Commands ignored because the view model was closed"
    );
}
