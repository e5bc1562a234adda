//! Testing utilities for reducers and stores.
//!
//! # Feature Flag
//!
//! This module is available with the `testing` feature (and to the crate's
//! own tests):
//!
//! ```toml
//! [dev-dependencies]
//! sluice = { version = "0.1", features = ["testing"] }
//! ```
//!
//! # Reducer tests
//!
//! [`ReducerTest`] folds actions through a reducer outside any store, so
//! transition logic is testable without a runtime:
//!
//! ```ignore
//! use sluice::testing::ReducerTest;
//!
//! ReducerTest::new(counter, 0)
//!     .given(CounterAction::Increment)
//!     .given(CounterAction::Increment)
//!     .expect_state(2)
//!     .given(CounterAction::Decrement)
//!     .expect(|state| *state == 1);
//! ```
//!
//! # Stream assertions
//!
//! [`ChangeRecorder`] drains a subscription on a background task until the
//! store completes it, then hands back everything observed:
//!
//! ```ignore
//! use sluice::testing::ChangeRecorder;
//!
//! let recorder = ChangeRecorder::spawn(store.changes()?);
//! // ... dispatch ...
//! store.close().await;
//! let observed = recorder.finish().await;
//! assert_eq!(observed.last(), Some(&expected));
//! ```

use std::fmt;

use tokio::task::JoinHandle;

use crate::changes::Changes;
use crate::core::State;
use crate::reducer::Reducer;

/// Fluent given/expect harness for a reducer.
///
/// Panics (with the failing action's position) if the reducer rejects an
/// action, since rejection inside a `given` chain is a test bug; use
/// [`expect_rejection`](Self::expect_rejection) to assert rejections.
pub struct ReducerTest<A, S, R> {
    reducer: R,
    state: S,
    step: usize,
    _marker: std::marker::PhantomData<fn(A)>,
}

impl<A, S, R> ReducerTest<A, S, R>
where
    S: State,
    R: Reducer<A, S>,
{
    /// Start from an initial state.
    pub fn new(reducer: R, initial: S) -> Self {
        Self {
            reducer,
            state: initial,
            step: 0,
            _marker: std::marker::PhantomData,
        }
    }

    /// Apply one action, folding the result into the running state.
    #[track_caller]
    pub fn given(mut self, action: A) -> Self {
        self.step += 1;
        match self.reducer.reduce(&self.state, &action) {
            Ok(next) => self.state = next,
            Err(e) => panic!("reducer rejected action at step {}: {e}", self.step),
        }
        self
    }

    /// Assert the reducer rejects this action; state is left unchanged.
    #[track_caller]
    pub fn expect_rejection(self, action: A) -> Self {
        if self.reducer.reduce(&self.state, &action).is_ok() {
            panic!("expected rejection at step {}", self.step + 1);
        }
        self
    }

    /// Assert a predicate over the current state.
    #[track_caller]
    pub fn expect(self, predicate: impl FnOnce(&S) -> bool) -> Self {
        assert!(
            predicate(&self.state),
            "state predicate failed at step {}",
            self.step
        );
        self
    }

    /// Assert the current state equals `expected`.
    #[track_caller]
    pub fn expect_state(self, expected: S) -> Self
    where
        S: PartialEq + fmt::Debug,
    {
        assert_eq!(self.state, expected, "state mismatch at step {}", self.step);
        self
    }

    /// Finish, returning the folded state.
    pub fn into_state(self) -> S {
        self.state
    }
}

/// Drains a subscription on a background task until it completes.
///
/// Observations follow the latest-wins contract: intermediate states may be
/// skipped, order is never inverted, and the final published state is always
/// present.
pub struct ChangeRecorder<S> {
    handle: JoinHandle<Vec<S>>,
}

impl<S: State> ChangeRecorder<S> {
    /// Start recording. Must be called within a tokio runtime.
    pub fn spawn(mut changes: Changes<S>) -> Self {
        let handle = tokio::spawn(async move {
            let mut observed = Vec::new();
            while let Some(state) = changes.next().await {
                observed.push(state);
            }
            observed
        });
        Self { handle }
    }

    /// Wait for the subscription to complete and return every observed
    /// state. Call after disposing the store, or this waits forever.
    pub async fn finish(self) -> Vec<S> {
        self.handle
            .await
            .expect("change recorder task should not panic")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::fallible;
    use crate::store::Store;

    #[derive(Debug, Clone, Copy)]
    enum CounterAction {
        Increment,
        Decrement,
    }

    fn counter(state: &i64, action: &CounterAction) -> i64 {
        match action {
            CounterAction::Increment => state + 1,
            CounterAction::Decrement => state - 1,
        }
    }

    #[test]
    fn test_reducer_test_folds_and_asserts() {
        let end = ReducerTest::new(counter, 0)
            .given(CounterAction::Increment)
            .given(CounterAction::Increment)
            .expect_state(2)
            .given(CounterAction::Decrement)
            .expect(|state| *state == 1)
            .into_state();
        assert_eq!(end, 1);
    }

    #[test]
    fn test_reducer_test_expect_rejection() {
        let bounded = fallible(|state: &i64, action: &i64| {
            if state + action > 10 {
                anyhow::bail!("over limit");
            }
            Ok(state + action)
        });

        ReducerTest::new(bounded, 0)
            .given(8)
            .expect_rejection(5)
            .given(2)
            .expect_state(10);
    }

    #[test]
    #[should_panic(expected = "reducer rejected action at step 1")]
    fn test_reducer_test_panics_on_unexpected_rejection() {
        let strict = fallible(|_: &i64, _: &i64| anyhow::bail!("always"));
        let _ = ReducerTest::new(strict, 0).given(1);
    }

    #[tokio::test]
    async fn test_recorder_collects_until_completion() {
        let store = Store::new(0i64, counter);
        let mut changes = store.changes().unwrap();

        // Handshake on the initial value so the recorder starts from a
        // known point.
        assert_eq!(changes.next().await, Some(0));
        let recorder = ChangeRecorder::spawn(changes);

        store.dispatch(CounterAction::Increment).await.unwrap();
        store.close().await;

        let observed = recorder.finish().await;
        assert_eq!(observed.last(), Some(&1));
    }
}
