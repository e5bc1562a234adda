//! Counter demo: a store with a logging middleware and an async service
//! middleware that reacts to intent.
//!
//! `StartIncrement` flips the state to loading and triggers a background
//! "service call"; when the service finishes it dispatches `Increment`,
//! which lands the count and clears the loading flag. A subscriber renders
//! every observed state to stdout.
//!
//! ```sh
//! RUST_LOG=debug cargo run -p sluice-demo
//! ```

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use sluice::{
    Dispatcher, LoggingMiddleware, Middleware, StateReader, Store, StoreError,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq)]
enum CountAction {
    StartIncrement,
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CountState {
    count: i64,
    loading: bool,
}

fn count_reducer(state: &CountState, action: &CountAction) -> CountState {
    match action {
        CountAction::StartIncrement => CountState {
            loading: true,
            ..*state
        },
        CountAction::Increment => CountState {
            count: state.count + 1,
            loading: false,
        },
        CountAction::Decrement => CountState {
            count: state.count - 1,
            loading: false,
        },
    }
}

/// Reacts to `StartIncrement` by dispatching a delayed `Increment`, the way
/// a service middleware would wrap a network call.
struct CountServiceMiddleware;

#[async_trait]
impl Middleware<CountAction, CountState> for CountServiceMiddleware {
    async fn dispatch(
        &self,
        action: CountAction,
        _state: &StateReader<CountState>,
        next: &dyn Dispatcher<CountAction>,
    ) -> Result<(), StoreError> {
        // Forward the intent first so subscribers see the loading state.
        next.dispatch(action).await?;

        if action == CountAction::StartIncrement {
            info!("service call started");
            tokio::time::sleep(Duration::from_millis(300)).await;
            info!("service call finished");
            next.dispatch(CountAction::Increment).await?;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let store = Store::builder(
        CountState {
            count: 0,
            loading: false,
        },
        count_reducer,
    )
    .with_middleware(LoggingMiddleware)
    .with_middleware(CountServiceMiddleware)
    .build();

    // Render every observed state, like a view binding would.
    let mut changes = store.changes()?;
    let view = tokio::spawn(async move {
        while let Some(state) = changes.next().await {
            println!(
                "counter = {} {}",
                state.count,
                if state.loading { "(loading)" } else { "" }
            );
        }
        println!("store closed, view done");
    });

    store.dispatch(CountAction::StartIncrement).await?;
    store.dispatch(CountAction::StartIncrement).await?;
    store.dispatch(CountAction::Decrement).await?;

    info!(state = ?store.current_state(), "final state");
    store.close().await;
    view.await?;

    Ok(())
}
