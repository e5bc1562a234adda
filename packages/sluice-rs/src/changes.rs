//! Change subscriptions - observe the ordered sequence of published states.
//!
//! # Guarantees
//!
//! - **Initial delivery**: the first value a subscriber observes is the
//!   state current when it first polls, so subscribers never start blind
//! - **Ordering**: every observation is a prefix-consistent subsequence of
//!   the true publication order; no subscriber ever sees an inversion
//! - **Latest-wins backpressure**: a slow subscriber may skip intermediate
//!   states but always converges on the latest published state
//! - **Completion**: when the store is disposed, every subscription yields
//!   any final unseen state and then ends (`None`) - completion, never an
//!   error
//!
//! A subscription never stalls the store: publication is an atomic value
//! replacement, independent of how fast (or whether) any subscriber reads.
//!
//! # Example
//!
//! ```ignore
//! let mut changes = store.changes()?;
//!
//! while let Some(state) = changes.next().await {
//!     render(&state);
//! }
//! // None: the store was disposed.
//! ```

use futures::Stream;
use tokio::sync::watch;

use crate::core::{State, StateHolder};

/// A live subscription to the store's published states.
///
/// Obtained from [`Store::changes`](crate::Store::changes). Dropping the
/// handle unsubscribes; after the store is disposed and the final state has
/// been observed, [`next`](Self::next) keeps returning `None`.
#[derive(Debug)]
pub struct Changes<S> {
    rx: watch::Receiver<S>,
    /// The first poll replays the current state so subscribers never start
    /// blind.
    pending_initial: bool,
}

impl<S: State> Changes<S> {
    pub(crate) fn new(rx: watch::Receiver<S>) -> Self {
        Self {
            rx,
            pending_initial: true,
        }
    }

    /// Wait for the next state.
    ///
    /// The first call returns the state current at that moment (marking it
    /// seen); subsequent calls return each newly published state, skipping
    /// to the latest if more than one was published since the last poll.
    /// Returns `None` once the store is disposed and every published state
    /// has been observed - `changed()` yields a final unseen value before
    /// reporting the channel closed, so the last state is never lost.
    pub async fn next(&mut self) -> Option<S> {
        if self.pending_initial {
            self.pending_initial = false;
            return Some(self.rx.borrow_and_update().clone());
        }
        match self.rx.changed().await {
            Ok(()) => Some(self.rx.borrow_and_update().clone()),
            Err(_) => None,
        }
    }

    /// Read the latest published state without waiting or consuming it.
    pub fn latest(&self) -> S {
        self.rx.borrow().clone()
    }

    /// End this subscription.
    ///
    /// Equivalent to dropping the handle; no further deliveries occur.
    pub fn unsubscribe(self) {}

    /// Adapt this subscription to a [`futures::Stream`] of states.
    pub fn into_stream(self) -> impl Stream<Item = S> {
        futures::stream::unfold(self, |mut changes| async move {
            changes.next().await.map(|state| (state, changes))
        })
    }
}

/// A cheap, cloneable read-only handle on the store's current state.
///
/// Handed to middleware so interceptors can read state without holding a
/// full store reference (and without the ability to dispatch or subscribe).
#[derive(Clone)]
pub struct StateReader<S> {
    rx: watch::Receiver<S>,
}

impl<S: State> StateReader<S> {
    pub(crate) fn new(rx: watch::Receiver<S>) -> Self {
        Self { rx }
    }

    /// Read the state reflecting every publication completed so far.
    pub fn get(&self) -> S {
        self.rx.borrow().clone()
    }
}

impl<S: State> StateHolder<S> for StateReader<S> {
    fn current_state(&self) -> S {
        self.get()
    }
}
