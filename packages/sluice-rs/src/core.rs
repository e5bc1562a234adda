//! Core traits for the store: the value markers and the three capability
//! faces.
//!
//! # Overview
//!
//! The store separates **what flows** from **who may do what**:
//! - [`Action`] = something happened (opaque, immutable input)
//! - [`State`] = the entire application state at one instant (opaque,
//!   immutable output)
//!
//! Capability is split across three narrow traits so callers depend only on
//! what they actually use:
//! - [`Dispatcher`] — submit actions
//! - [`StateHolder`] — read the current state
//! - [`ChangeStream`] — observe every published state in order
//!
//! A [`Store`](crate::Store) implements all three; a component that only
//! dispatches should be typed against `Dispatcher<A>`, not the concrete
//! store.

use async_trait::async_trait;

use crate::changes::Changes;
use crate::error::StoreError;

/// Something that happened.
///
/// Actions are opaque to the store: it never inspects their shape, only
/// hands them to the reducer in dispatch order. Immutability is by
/// convention; the store takes ownership and never hands an action back.
pub trait Action: Send + 'static {}

// Blanket implementation for any type that meets the requirements
impl<T: Send + 'static> Action for T {}

/// The entire application state at one instant.
///
/// States are immutable values: the store clones and replaces, never mutates
/// in place, so a published value can be shared freely across subscribers.
/// Wrap large states in `Arc<Inner>` to make the clone cheap.
pub trait State: Clone + Send + Sync + 'static {}

// Blanket implementation for any type that meets the requirements
impl<T: Clone + Send + Sync + 'static> State for T {}

/// Capability to submit actions into the store's sequential pipeline.
///
/// Concurrent callers are serialized at a single point; once an order is
/// chosen among simultaneously arriving actions it is never revised.
///
/// `dispatch` resolves with the outcome of that action's reduction:
/// `Ok(())` once the new state has been published, or a [`StoreError`]
/// describing why the action was rejected. It never blocks for longer than
/// its own action takes to reach the front of the queue.
#[async_trait]
pub trait Dispatcher<A: Action>: Send + Sync {
    /// Submit an action for sequential processing.
    async fn dispatch(&self, action: A) -> Result<(), StoreError>;
}

/// Capability to read the current state synchronously.
///
/// Always returns a value: the initial state before any dispatch, the last
/// good state after disposal. Reads that race an in-flight dispatch return
/// either the pre- or post-dispatch state, never a torn value.
pub trait StateHolder<S: State>: Send + Sync {
    /// Read the state reflecting every publication completed so far.
    fn current_state(&self) -> S;
}

/// Capability to observe the ordered sequence of published states.
///
/// See [`Changes`] for the delivery contract (initial value, latest-wins
/// backpressure, completion on disposal).
pub trait ChangeStream<S: State>: Send + Sync {
    /// Open a new subscription.
    ///
    /// Fails with [`StoreError::Closed`] if the store has been disposed.
    fn changes(&self) -> Result<Changes<S>, StoreError>;
}
