//! Reducer trait and the panic-guarded runner.
//!
//! Reducers are pure transition functions: given the current state and an
//! action, they return the next state. State lives in the store, not the
//! reducer, and the store's worker is the only caller.
//!
//! # Key Properties
//!
//! - **Pure**: no IO, no async, no external state reference
//! - **Referentially transparent**: the same `(state, action)` pair must
//!   always produce the same result
//! - **Called serially**: never invoked concurrently, always against the
//!   state produced by the previous accepted action
//! - **Rejection, not corruption**: an `Err` (or a panic, which the runner
//!   catches) rejects that one dispatch and leaves the prior state intact

use std::panic::{catch_unwind, AssertUnwindSafe};

use anyhow::{anyhow, Result};
use tracing::error;

use crate::error::StoreError;

/// A pure transition function `(state, action) -> next state`.
///
/// Most reducers are plain closures, covered by the blanket impl:
///
/// ```ignore
/// let store = Store::new(0i64, |state: &i64, action: &CounterAction| {
///     match action {
///         CounterAction::Increment => state + 1,
///         CounterAction::Decrement => state - 1,
///     }
/// });
/// ```
///
/// Implement the trait directly (or use [`fallible`]) when a reducer can
/// reject actions:
///
/// ```ignore
/// struct BalanceReducer;
///
/// impl Reducer<Withdrawal, Balance> for BalanceReducer {
///     fn reduce(&self, state: &Balance, action: &Withdrawal) -> anyhow::Result<Balance> {
///         if action.amount > state.available {
///             anyhow::bail!("insufficient funds");
///         }
///         Ok(state.debited(action.amount))
///     }
/// }
/// ```
pub trait Reducer<A, S>: Send + 'static {
    /// Compute the next state, or reject the action with an error.
    ///
    /// Must not mutate `state` in place; return a new (possibly
    /// structurally shared) value.
    fn reduce(&self, state: &S, action: &A) -> Result<S>;
}

// Blanket implementation: any infallible pure closure is a reducer.
impl<A, S, F> Reducer<A, S> for F
where
    F: Fn(&S, &A) -> S + Send + 'static,
{
    fn reduce(&self, state: &S, action: &A) -> Result<S> {
        Ok(self(state, action))
    }
}

/// Wrap a fallible closure as a [`Reducer`].
///
/// Exists because a second blanket impl over `Fn(&S, &A) -> Result<S>`
/// closures would conflict with the infallible one.
pub fn fallible<A, S, F>(f: F) -> impl Reducer<A, S>
where
    F: Fn(&S, &A) -> Result<S> + Send + 'static,
{
    FallibleFn(f)
}

struct FallibleFn<F>(F);

impl<A, S, F> Reducer<A, S> for FallibleFn<F>
where
    F: Fn(&S, &A) -> Result<S> + Send + 'static,
{
    fn reduce(&self, state: &S, action: &A) -> Result<S> {
        (self.0)(state, action)
    }
}

/// Panic-guarded wrapper around a boxed reducer.
///
/// The worker calls reducers through this runner so a panicking reducer
/// rejects one dispatch instead of killing the worker task.
pub(crate) struct ReducerRunner<A, S> {
    inner: Box<dyn Reducer<A, S>>,
    /// Human-readable name for logging.
    name: &'static str,
}

impl<A: 'static, S: 'static> ReducerRunner<A, S> {
    pub(crate) fn new<R: Reducer<A, S>>(reducer: R) -> Self {
        Self {
            inner: Box::new(reducer),
            name: std::any::type_name::<R>(),
        }
    }

    /// Run the reducer, converting an `Err` return or a panic into
    /// [`StoreError::ReducerFailed`].
    ///
    /// # Panic Safety
    ///
    /// `AssertUnwindSafe` is fine here: the reducer is only reachable
    /// through `&self` and we never rely on its interior state after a
    /// panic.
    pub(crate) fn reduce(&self, state: &S, action: &A) -> Result<S, StoreError> {
        let result = catch_unwind(AssertUnwindSafe(|| self.inner.reduce(state, action)));

        match result {
            Ok(Ok(next)) => Ok(next),
            Ok(Err(e)) => Err(StoreError::ReducerFailed(e)),
            Err(panic_info) => {
                // Extract panic message if available
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    (*s).to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };

                error!(
                    reducer = self.name,
                    panic = %panic_msg,
                    "reducer panicked in reduce()"
                );
                Err(StoreError::ReducerFailed(anyhow!(
                    "reducer '{}' panicked: {}",
                    self.name,
                    panic_msg
                )))
            }
        }
    }

    /// Returns the reducer's name for logging.
    pub(crate) fn name(&self) -> &'static str {
        self.name
    }
}
