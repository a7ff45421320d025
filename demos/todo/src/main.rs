//! Command-line walkthrough of the todo store.
//!
//! Runs the add / toggle / delete flow against a view model and prints the
//! published lists after each step.
//!
//! ```text
//! cargo run -p todo-demo                    # in-memory
//! cargo run -p todo-demo -- todos.bin       # persisted to todos.bin
//! RUST_LOG=todo_store_runtime=debug cargo run -p todo-demo
//! ```

use std::sync::Arc;
use todo_store_core::environment::{Clock, SystemClock};
use todo_store_core::format::relative_age;
use todo_store_core::query::SortOrder;
use todo_store_core::{Priority, Todo};
use todo_store_runtime::metrics::install_recorder;
use todo_store_runtime::{
    DatabaseConfig, TodoDatabase, TodoRepository, TodoViewModel, ViewModelConfig,
};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

fn print_list(title: &str, todos: &[Todo], clock: &dyn Clock) {
    println!("\n{title} ({}):", todos.len());
    for todo in todos {
        let status = if todo.completed { "✓" } else { " " };
        println!(
            "  [{status}] #{:<3} {:<6} {:<20} {}",
            todo.id,
            todo.priority,
            todo.content,
            relative_age(todo.created_at, clock.now())
        );
    }
}

async fn settle(
    receiver: &mut watch::Receiver<Vec<Todo>>,
    predicate: impl FnMut(&Vec<Todo>) -> bool,
) -> anyhow::Result<Vec<Todo>> {
    Ok(receiver.wait_for(predicate).await?.clone())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let metrics = install_recorder()?;

    println!("=== Todo Store Demo ===");

    let config = std::env::args()
        .nth(1)
        .map_or_else(DatabaseConfig::in_memory, |path| {
            DatabaseConfig::default().with_path(path)
        });
    let db = Arc::new(TodoDatabase::open(config).await?);
    tracing::info!(rows = db.len().await, "Database ready");
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let view_model = TodoViewModel::open(
        TodoRepository::new(db),
        Arc::clone(&clock),
        ViewModelConfig::default(),
    )
    .await?;

    let mut all = view_model.all_todos();
    let mut high = view_model.high_priority_todos();
    let start = all.borrow().len();

    println!("\nAdding todos...");
    for (content, priority) in [
        ("Buy milk", Priority::Medium),
        ("Ship release", Priority::High),
        ("Water plants", Priority::Low),
        ("   ", Priority::High),
    ] {
        view_model.add_todo(content, priority).wait().await;
    }

    let todos = settle(&mut all, |t| t.len() == start + 3).await?;
    tracing::info!(added = 3, "Blank todo ignored, three todos stored");
    print_list("All todos", &todos, clock.as_ref());
    print_list("High priority", &high.borrow(), clock.as_ref());

    println!("\nCompleting 'Buy milk'...");
    if let Some(milk) = todos.iter().find(|t| t.content == "Buy milk") {
        view_model.toggle_complete(milk).wait().await;
        let id = milk.id;
        let done = |t: &Vec<Todo>| t.iter().any(|todo| todo.id == id && todo.completed);
        settle(&mut all, done).await?;
        tracing::info!(%id, "Todo completed");
    }
    print_list(
        "Incomplete",
        &view_model.incomplete_todos().borrow(),
        clock.as_ref(),
    );
    print_list(
        "By priority",
        &view_model.sorted_todos(SortOrder::Priority),
        clock.as_ref(),
    );

    println!("\nDeleting 'Ship release'...");
    if let Some(release) = todos.iter().find(|t| t.content == "Ship release") {
        view_model.delete_todo(release).wait().await;
        let id = release.id;
        let gone = |t: &Vec<Todo>| t.iter().all(|todo| todo.id != id);
        settle(&mut high, gone).await?;
        tracing::info!(%id, "Todo deleted");
    }
    let todos = all.borrow().clone();
    print_list("Final todos", &todos, clock.as_ref());

    println!("\nAs JSON:\n{}", serde_json::to_string_pretty(&todos)?);

    view_model.close().await?;
    tracing::info!("View model closed");
    println!("\nMetrics:\n{}", metrics.render());
    println!("=== Demo Complete ===");
    Ok(())
}
