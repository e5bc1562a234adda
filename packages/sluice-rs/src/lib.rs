//! # Sluice
//!
//! A reactive, unidirectional state store where actions queue, a pure
//! reducer folds, and subscribers observe ordered state.
//!
//! ## Core Concepts
//!
//! Sluice carries exactly **one evolving value** per store:
//! - [`Action`] = something happened (opaque input)
//! - [`State`] = the entire application state at one instant (opaque output)
//! - [`Reducer`] = the pure transition `(state, action) -> next state`
//!
//! The key principle: **one queue, one worker, one authoritative state**.
//! Every accepted action is reduced against the state produced by its
//! predecessor and published exactly once, in dispatch order.
//!
//! ## Architecture
//!
//! ```text
//! Producers (any task)
//!     │
//!     ▼ dispatch()
//! Middleware chain ──► op queue ──► worker (serial)
//!                                      │
//!                     reduce(current, action)
//!                                      │
//!                                      ▼
//!                          watch cell (atomic replace)
//!                             │              │
//!                 current_state()       changes()
//!                             │              │
//!                             ▼              ▼
//!                        Readers        Subscribers (fan-out, ordered)
//! ```
//!
//! ## Key Invariants
//!
//! 1. **Actions are opaque** - the store never inspects them, only orders them
//! 2. **States are immutable** - replaced, never mutated; shareable across
//!    subscribers
//! 3. **Reducers are pure** - no IO, no async, called serially by the worker
//!    and by nothing else
//! 4. **Total order** - one global sequence over accepted actions, obeyed by
//!    state and every subscriber
//! 5. **Rejection, not corruption** - a failing (or panicking) reducer
//!    rejects one dispatch and leaves the prior state intact
//!
//! ## Delivery Guarantees
//!
//! - **Initial value**: a subscriber's first observation is the current state
//! - **Latest-wins**: slow subscribers may skip intermediate states but
//!   always converge on the latest, never out of order
//! - **Completion**: disposing the store ends every subscription with a
//!   terminal `None`, never an error
//!
//! ## Example
//!
//! ```ignore
//! use sluice::{LoggingMiddleware, Store};
//!
//! #[derive(Debug, Clone)]
//! enum CounterAction { Increment, Decrement }
//!
//! let store = Store::builder(0i64, |state: &i64, action: &CounterAction| {
//!     match action {
//!         CounterAction::Increment => state + 1,
//!         CounterAction::Decrement => state - 1,
//!     }
//! })
//! .with_middleware(LoggingMiddleware)
//! .build();
//!
//! let mut changes = store.changes()?;
//! assert_eq!(changes.next().await, Some(0));
//!
//! store.dispatch(CounterAction::Increment).await?;
//! assert_eq!(changes.next().await, Some(1));
//! assert_eq!(store.current_state(), 1);
//!
//! store.close().await;
//! assert_eq!(changes.next().await, None);
//! ```
//!
//! ## What This Is Not
//!
//! Sluice is **not**:
//! - A general pub/sub bus (one evolving state value, not arbitrary topics)
//! - A persistent or durable log
//! - A distributed store
//!
//! Sluice **is**:
//! > A single-process, in-memory coordination primitive: dispatch an action,
//! > read the current state, subscribe to the ordered change stream.

// Core modules
mod changes;
mod core;
mod error;
mod middleware;
mod reducer;
mod store;

// Testing utilities (feature-gated, also compiled for the crate's own tests)
#[cfg(any(test, feature = "testing"))]
pub mod testing;


// Re-export core traits
pub use crate::core::{Action, ChangeStream, Dispatcher, State, StateHolder};

// Re-export reducer types
pub use crate::reducer::{fallible, Reducer};

// Re-export subscription types
pub use crate::changes::{Changes, StateReader};

// Re-export middleware types
pub use crate::middleware::{LoggingMiddleware, Middleware};

// Re-export error types
pub use crate::error::StoreError;

// Re-export store types (primary entry point)
pub use crate::store::{Store, StoreBuilder};

// Re-export commonly used external types
pub use async_trait::async_trait;
