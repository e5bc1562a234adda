//! The store engine - one queue, one worker, one authoritative state.
//!
//! ```text
//! dispatch() ──► middleware chain ──► op queue ──► worker
//!                                                    │
//!                            reduce(current, action) │ serial
//!                                                    ▼
//! current_state() ◄──── watch cell ◄──── send_replace(next)
//! changes()       ◄──────┘
//! ```
//!
//! The worker task is the single serialization point: it drains the queue in
//! FIFO order, reduces each action against the current state, atomically
//! replaces the state, and replies to the dispatcher. Concurrent `dispatch`
//! calls are ordered by arrival at the queue and that order is never revised.
//!
//! # Usage
//!
//! ```ignore
//! use sluice::Store;
//!
//! #[derive(Debug)]
//! enum CounterAction { Increment, Decrement }
//!
//! let store = Store::new(0i64, |state: &i64, action: &CounterAction| {
//!     match action {
//!         CounterAction::Increment => state + 1,
//!         CounterAction::Decrement => state - 1,
//!     }
//! });
//!
//! let mut changes = store.changes()?;        // observes 0 first
//! store.dispatch(CounterAction::Increment).await?;
//! assert_eq!(store.current_state(), 1);
//!
//! store.close().await;                       // completes all subscriptions
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, trace, warn};

use crate::changes::{Changes, StateReader};
use crate::core::{Action, ChangeStream, Dispatcher, State, StateHolder};
use crate::error::StoreError;
use crate::middleware::{Chain, Middleware};
use crate::reducer::{Reducer, ReducerRunner};

/// Messages on the store's sequential processing queue.
enum Op<A> {
    /// Reduce one action; the reply resolves the caller's dispatch.
    Dispatch {
        action: A,
        reply: oneshot::Sender<Result<(), StoreError>>,
    },
    /// Dispose the store; acknowledged once the queue is sealed.
    Close { ack: oneshot::Sender<()> },
}

/// A reactive, unidirectional state store.
///
/// Composes the three capability faces ([`Dispatcher`], [`StateHolder`],
/// [`ChangeStream`]) over a single worker task that owns the authoritative
/// state. Cheap to clone: every clone is a handle onto the same store, so
/// producers and observers on different tasks share one instance. Multiple
/// independent stores coexist freely; there is no global state.
///
/// The store lives until [`close`](Self::close) is called or every handle is
/// dropped; either way the worker stops and all subscriptions complete.
pub struct Store<A, S> {
    /// Entry point of the middleware chain (the queue dispatcher when no
    /// middleware is installed).
    dispatcher: Arc<dyn Dispatcher<A>>,
    ops: mpsc::UnboundedSender<Op<A>>,
    state: watch::Receiver<S>,
}

impl<A: Action, S: State> Store<A, S> {
    /// Create a store with no middleware.
    ///
    /// Shorthand for `Store::builder(initial, reducer).build()`. Must be
    /// called within a tokio runtime.
    pub fn new<R: Reducer<A, S>>(initial: S, reducer: R) -> Self {
        Self::builder(initial, reducer).build()
    }

    /// Start building a store from an initial state and a reducer.
    ///
    /// The reducer is not invoked during construction; the first reduction
    /// happens on the first dispatch.
    pub fn builder<R: Reducer<A, S>>(initial: S, reducer: R) -> StoreBuilder<A, S> {
        StoreBuilder::new(initial, reducer)
    }

    /// Submit an action for sequential processing.
    ///
    /// Resolves once this action's reduction has completed: `Ok(())` after
    /// the new state is published, or an error if the action was rejected
    /// (state unchanged) or the store is closed.
    pub async fn dispatch(&self, action: A) -> Result<(), StoreError> {
        self.dispatcher.dispatch(action).await
    }

    /// Read the current state.
    ///
    /// Synchronous and non-blocking; reflects every publication completed so
    /// far. Still serves the last good state after the store is closed.
    pub fn current_state(&self) -> S {
        self.state.borrow().clone()
    }

    /// Open a subscription to the ordered stream of published states.
    ///
    /// The subscription's first value is the state current at its first
    /// poll; see [`Changes`] for the full delivery contract. Fails with
    /// [`StoreError::Closed`] once the store has been disposed.
    pub fn changes(&self) -> Result<Changes<S>, StoreError> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(Changes::new(self.state.clone()))
    }

    /// A read-only handle on the current state.
    ///
    /// Useful for components that should be able to read but neither
    /// dispatch nor subscribe.
    pub fn state_reader(&self) -> StateReader<S> {
        StateReader::new(self.state.clone())
    }

    /// Dispose the store.
    ///
    /// Seals the queue, fails queued-but-unprocessed dispatches with
    /// [`StoreError::Closed`], stops the worker, and completes every
    /// subscription. Idempotent; returns once the queue is sealed.
    pub async fn close(&self) {
        let (ack, acked) = oneshot::channel();
        if self.ops.send(Op::Close { ack }).is_err() {
            // Worker already gone.
            return;
        }
        let _ = acked.await;
    }

    /// True once the store has been disposed.
    pub fn is_closed(&self) -> bool {
        self.ops.is_closed()
    }
}

// Handle semantics: clones share the worker, state, and middleware chain.
impl<A, S> Clone for Store<A, S> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            ops: self.ops.clone(),
            state: self.state.clone(),
        }
    }
}

#[async_trait]
impl<A: Action, S: State> Dispatcher<A> for Store<A, S> {
    async fn dispatch(&self, action: A) -> Result<(), StoreError> {
        Store::dispatch(self, action).await
    }
}

impl<A: Action, S: State> StateHolder<S> for Store<A, S> {
    fn current_state(&self) -> S {
        Store::current_state(self)
    }
}

impl<A: Action, S: State> ChangeStream<S> for Store<A, S> {
    fn changes(&self) -> Result<Changes<S>, StoreError> {
        Store::changes(self)
    }
}

impl<A, S> std::fmt::Debug for Store<A, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("closed", &self.ops.is_closed())
            .finish_non_exhaustive()
    }
}

/// Binds an initial state, a reducer, and optional middleware into a running
/// [`Store`].
///
/// # Example
///
/// ```ignore
/// let store = Store::builder(AppState::default(), app_reducer)
///     .with_middleware(LoggingMiddleware)
///     .with_middleware(AuthMiddleware::new(policy))
///     .build();
/// ```
pub struct StoreBuilder<A, S> {
    initial: S,
    reducer: ReducerRunner<A, S>,
    middleware: Vec<Arc<dyn Middleware<A, S>>>,
}

impl<A: Action, S: State> StoreBuilder<A, S> {
    /// Start a builder from an initial state and a reducer.
    pub fn new<R: Reducer<A, S>>(initial: S, reducer: R) -> Self {
        Self {
            initial,
            reducer: ReducerRunner::new(reducer),
            middleware: Vec::new(),
        }
    }

    /// Add a middleware to the dispatch chain.
    ///
    /// The first middleware added is the outermost interceptor.
    pub fn with_middleware<M: Middleware<A, S>>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Spawn the worker and return the store handle.
    ///
    /// Seeds the state cell with the initial state without invoking the
    /// reducer. Must be called within a tokio runtime.
    pub fn build(self) -> Store<A, S> {
        let (state_tx, state_rx) = watch::channel(self.initial);
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();

        tokio::spawn(run(ops_rx, state_tx, self.reducer));

        // Fold middleware around the queue dispatcher, last added innermost.
        let reader = StateReader::new(state_rx.clone());
        let mut dispatcher: Arc<dyn Dispatcher<A>> = Arc::new(QueueDispatcher {
            ops: ops_tx.clone(),
        });
        for middleware in self.middleware.into_iter().rev() {
            dispatcher = Chain::link(middleware, reader.clone(), dispatcher);
        }

        Store {
            dispatcher,
            ops: ops_tx,
            state: state_rx,
        }
    }
}

/// The innermost dispatcher: enqueue, then await this action's outcome.
struct QueueDispatcher<A> {
    ops: mpsc::UnboundedSender<Op<A>>,
}

#[async_trait]
impl<A: Action> Dispatcher<A> for QueueDispatcher<A> {
    async fn dispatch(&self, action: A) -> Result<(), StoreError> {
        let (reply, outcome) = oneshot::channel();
        self.ops
            .send(Op::Dispatch { action, reply })
            .map_err(|_| StoreError::Closed)?;
        // A dropped reply means the worker shut down before processing.
        outcome.await.unwrap_or(Err(StoreError::Closed))
    }
}

/// The worker: drains the queue in order, reduces, publishes, replies.
///
/// Exits when a close op arrives or every store handle is dropped. Dropping
/// the watch sender on exit is what completes the subscriptions.
async fn run<A: Action, S: State>(
    mut ops: mpsc::UnboundedReceiver<Op<A>>,
    state: watch::Sender<S>,
    reducer: ReducerRunner<A, S>,
) {
    trace!(reducer = reducer.name(), "store worker started");

    while let Some(op) = ops.recv().await {
        match op {
            Op::Dispatch { action, reply } => {
                let current = state.borrow().clone();
                let result = match reducer.reduce(&current, &action) {
                    Ok(next) => {
                        // Atomic replacement; exactly one publication per
                        // accepted action, whether or not anyone listens.
                        state.send_replace(next);
                        trace!("state published");
                        Ok(())
                    }
                    Err(e) => {
                        warn!(error = %e, "dispatch rejected; state unchanged");
                        Err(e)
                    }
                };
                // The caller may have gone away; the transition stands
                // regardless.
                let _ = reply.send(result);
            }
            Op::Close { ack } => {
                // Seal the queue, then fail anything already buffered.
                ops.close();
                while let Ok(op) = ops.try_recv() {
                    match op {
                        Op::Dispatch { reply, .. } => {
                            let _ = reply.send(Err(StoreError::Closed));
                        }
                        Op::Close { ack } => {
                            let _ = ack.send(());
                        }
                    }
                }
                let _ = ack.send(());
                break;
            }
        }
    }

    debug!("store worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::fallible;
    use crate::testing::ChangeRecorder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Copy, PartialEq)]
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

    #[tokio::test]
    async fn test_initial_state_before_any_dispatch() {
        let store = Store::new(42i64, counter);
        assert_eq!(store.current_state(), 42);

        let mut changes = store.changes().unwrap();
        assert_eq!(changes.next().await, Some(42));
    }

    #[tokio::test]
    async fn test_fold_equivalence_sequential() {
        let actions = vec![
            CounterAction::Increment,
            CounterAction::Increment,
            CounterAction::Decrement,
            CounterAction::Increment,
        ];

        let store = Store::new(0i64, counter);
        for action in &actions {
            store.dispatch(*action).await.unwrap();
        }

        let expected = actions.iter().fold(0i64, |s, a| counter(&s, a));
        assert_eq!(store.current_state(), expected);
        assert_eq!(expected, 2);
    }

    #[tokio::test]
    async fn test_lockstep_subscriber_observes_every_transition() {
        let store = Store::new(0i64, counter);
        let mut changes = store.changes().unwrap();

        // Consuming between dispatches means no coalescing can occur, so
        // the full sequence is observable.
        assert_eq!(changes.next().await, Some(0));
        for (action, expected) in [
            (CounterAction::Increment, 1),
            (CounterAction::Increment, 2),
            (CounterAction::Decrement, 1),
            (CounterAction::Increment, 2),
        ] {
            store.dispatch(action).await.unwrap();
            assert_eq!(changes.next().await, Some(expected));
        }
    }

    #[tokio::test]
    async fn test_builder_does_not_invoke_reducer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();

        let store = Store::builder(0i64, move |state: &i64, _action: &CounterAction| {
            seen.fetch_add(1, Ordering::SeqCst);
            *state
        })
        .build();

        assert_eq!(calls.load(Ordering::SeqCst), 0);

        store.dispatch(CounterAction::Increment).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reducer_failure_rejects_only_that_dispatch() {
        let store = Store::new(
            10i64,
            fallible(|state: &i64, action: &i64| {
                if *action == 0 {
                    anyhow::bail!("zero step");
                }
                Ok(state + action)
            }),
        );
        let mut changes = store.changes().unwrap();
        assert_eq!(changes.next().await, Some(10));

        store.dispatch(5).await.unwrap();
        assert_eq!(changes.next().await, Some(15));

        // Rejected: error surfaced to the caller, state retained, nothing
        // published on the stream.
        let err = store.dispatch(0).await.unwrap_err();
        assert!(matches!(err, StoreError::ReducerFailed(_)));
        assert_eq!(store.current_state(), 15);

        // The store and the subscription both keep working.
        store.dispatch(1).await.unwrap();
        assert_eq!(changes.next().await, Some(16));
    }

    #[tokio::test]
    async fn test_reducer_panic_behaves_like_failure() {
        let store = Store::new(7i64, |state: &i64, action: &i64| {
            if *action < 0 {
                panic!("negative step");
            }
            state + action
        });

        let err = store.dispatch(-1).await.unwrap_err();
        assert!(matches!(err, StoreError::ReducerFailed(_)));
        assert_eq!(store.current_state(), 7);

        // The worker survived the panic.
        store.dispatch(3).await.unwrap();
        assert_eq!(store.current_state(), 10);
    }

    #[tokio::test]
    async fn test_close_is_terminal_and_idempotent() {
        let store = Store::new(0i64, counter);
        store.dispatch(CounterAction::Increment).await.unwrap();

        let mut changes = store.changes().unwrap();

        store.close().await;
        store.close().await; // idempotent
        assert!(store.is_closed());

        // Dispatch after disposal fails fast and deterministically.
        let err = store.dispatch(CounterAction::Increment).await.unwrap_err();
        assert!(err.is_closed());

        // The last good state is still readable.
        assert_eq!(store.current_state(), 1);

        // The subscription yields the final state, then completes - once.
        assert_eq!(changes.next().await, Some(1));
        assert_eq!(changes.next().await, None);
        assert_eq!(changes.next().await, None);
    }

    #[tokio::test]
    async fn test_subscribe_after_close_fails() {
        let store = Store::new(0i64, counter);
        store.close().await;

        let err = store.changes().unwrap_err();
        assert!(err.is_closed());
    }

    #[tokio::test]
    async fn test_dropping_every_handle_completes_subscribers() {
        let store = Store::new(0i64, counter);
        store.dispatch(CounterAction::Increment).await.unwrap();
        let mut changes = store.changes().unwrap();

        drop(store);

        assert_eq!(changes.next().await, Some(1));
        assert_eq!(changes.next().await, None);
    }

    #[tokio::test]
    async fn test_published_states_are_never_mutated() {
        let store = Store::new(vec![1i64], |state: &Vec<i64>, action: &i64| {
            let mut next = state.clone();
            next.push(*action);
            next
        });

        let captured = store.current_state();
        store.dispatch(2).await.unwrap();
        store.dispatch(3).await.unwrap();

        // The value captured before the dispatches is untouched.
        assert_eq!(captured, vec![1]);
        assert_eq!(store.current_state(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_clone_is_a_handle_onto_the_same_store() {
        let store = Store::new(0i64, counter);
        let clone = store.clone();

        clone.dispatch(CounterAction::Increment).await.unwrap();
        assert_eq!(store.current_state(), 1);

        store.close().await;
        assert!(clone.is_closed());
    }

    #[tokio::test]
    async fn test_multiple_stores_are_independent() {
        let a = Store::new(0i64, counter);
        let b = Store::new(100i64, counter);

        a.dispatch(CounterAction::Increment).await.unwrap();
        b.dispatch(CounterAction::Decrement).await.unwrap();

        assert_eq!(a.current_state(), 1);
        assert_eq!(b.current_state(), 99);

        a.close().await;
        assert!(!b.is_closed());
        b.dispatch(CounterAction::Increment).await.unwrap();
        assert_eq!(b.current_state(), 100);
    }

    #[tokio::test]
    async fn test_recorder_sees_full_lifecycle() {
        let store = Store::new(0i64, counter);
        let recorder = ChangeRecorder::spawn(store.changes().unwrap());

        // Intermediate values may coalesce under latest-wins, but the final
        // state is always delivered and order is never inverted.
        store.dispatch(CounterAction::Increment).await.unwrap();
        store.dispatch(CounterAction::Increment).await.unwrap();
        store.close().await;

        let observed = recorder.finish().await;
        assert!(!observed.is_empty());
        assert_eq!(observed.last(), Some(&2));
        assert!(observed.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_capability_traits_are_object_safe() {
        let store = Store::new(0i64, counter);

        let dispatcher: Arc<dyn Dispatcher<CounterAction>> = Arc::new(store.clone());
        let holder: Arc<dyn StateHolder<i64>> = Arc::new(store.clone());
        let stream: Arc<dyn ChangeStream<i64>> = Arc::new(store.clone());

        dispatcher.dispatch(CounterAction::Increment).await.unwrap();
        assert_eq!(holder.current_state(), 1);

        let mut changes = stream.changes().unwrap();
        assert_eq!(changes.next().await, Some(1));
    }
}
