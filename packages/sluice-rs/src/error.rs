//! Structured error types for the store.
//!
//! `StoreError` provides pattern-matchable errors instead of generic
//! `anyhow::Error`.
//!
//! # The Error Boundary Rule
//!
//! > **No error ever crosses the change stream.**
//!
//! - `anyhow` is internal transport (ergonomic for reducers)
//! - Dispatch failures surface to the dispatch caller, structured as
//!   `StoreError`
//! - The change stream carries valid states only; its one terminal signal is
//!   completion, never an error
//!
//! # Example
//!
//! ```ignore
//! use sluice::StoreError;
//!
//! match store.dispatch(action).await {
//!     Ok(()) => {}
//!     Err(StoreError::ReducerFailed(e)) => {
//!         // That dispatch was rejected; the store kept its prior state.
//!         eprintln!("rejected: {e}");
//!     }
//!     Err(StoreError::InvalidAction(reason)) => {
//!         // A middleware refused the action before it reached the reducer.
//!         eprintln!("invalid: {reason}");
//!     }
//!     Err(StoreError::Closed) => {
//!         // The store was disposed; re-create it or abandon the work.
//!     }
//! }
//! ```

use thiserror::Error;

/// Errors surfaced by dispatch, subscription, and disposal.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The reducer returned an error or panicked while processing an action.
    ///
    /// Only the offending dispatch is rejected: the store keeps its prior
    /// state, existing subscriptions stay live, and later dispatches are
    /// unaffected. Nothing is published on the change stream for a rejected
    /// dispatch.
    #[error("reducer failed: {0}")]
    ReducerFailed(anyhow::Error),

    /// An action was refused before it reached the reducer.
    ///
    /// The core never produces this itself; validation layers (middleware)
    /// use it to reject malformed actions with a distinct failure kind.
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// The store has been disposed.
    ///
    /// Returned by `dispatch` and `changes` after `close()`. Deterministic
    /// and immediate; `current_state()` still returns the last good state.
    #[error("store is closed")]
    Closed,
}

impl StoreError {
    /// True if this error means the store has been disposed.
    pub fn is_closed(&self) -> bool {
        matches!(self, StoreError::Closed)
    }

    /// True if this error rejected a single dispatch while leaving the
    /// store intact.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            StoreError::ReducerFailed(_) | StoreError::InvalidAction(_)
        )
    }
}
