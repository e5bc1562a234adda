//! Middleware - intercept actions on their way to the store.
//!
//! A middleware wraps the dispatcher face: it receives each action together
//! with a read-only state handle and the next dispatcher in the chain, and
//! decides whether (and how) to forward. Middleware runs on the caller's
//! side of the store's queue, so the queue remains the single serialization
//! point for reduction and publication.
//!
//! Use middleware for:
//! - Logging and auditing dispatches
//! - Validating actions before they reach the reducer
//!   ([`StoreError::InvalidAction`])
//! - Triggering follow-up dispatches (async services reacting to intent
//!   actions)
//!
//! # Chain Order
//!
//! The first middleware added to the builder is the outermost interceptor:
//!
//! ```text
//! caller -> mw1 -> mw2 -> queue -> reducer -> publish
//! ```
//!
//! # Example
//!
//! ```ignore
//! struct RejectEmpty;
//!
//! #[async_trait]
//! impl Middleware<String, Vec<String>> for RejectEmpty {
//!     async fn dispatch(
//!         &self,
//!         action: String,
//!         _state: &StateReader<Vec<String>>,
//!         next: &dyn Dispatcher<String>,
//!     ) -> Result<(), StoreError> {
//!         if action.is_empty() {
//!             return Err(StoreError::InvalidAction("empty entry".into()));
//!         }
//!         next.dispatch(action).await
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::changes::StateReader;
use crate::core::{Action, Dispatcher, State};
use crate::error::StoreError;

/// An interceptor on the dispatch path.
///
/// Implementations forward via `next.dispatch(action).await`, short-circuit
/// with an error, or swallow the action entirely (returning `Ok` without
/// forwarding). The state handle reads the latest *published* state; inside
/// a middleware the action being intercepted has not been reduced yet.
#[async_trait]
pub trait Middleware<A: Action, S: State>: Send + Sync + 'static {
    /// Intercept one action.
    async fn dispatch(
        &self,
        action: A,
        state: &StateReader<S>,
        next: &dyn Dispatcher<A>,
    ) -> Result<(), StoreError>;
}

/// One link of the middleware chain, itself a [`Dispatcher`].
pub(crate) struct Chain<A, S> {
    middleware: Arc<dyn Middleware<A, S>>,
    state: StateReader<S>,
    next: Arc<dyn Dispatcher<A>>,
}

impl<A: Action, S: State> Chain<A, S> {
    pub(crate) fn link(
        middleware: Arc<dyn Middleware<A, S>>,
        state: StateReader<S>,
        next: Arc<dyn Dispatcher<A>>,
    ) -> Arc<dyn Dispatcher<A>> {
        Arc::new(Self {
            middleware,
            state,
            next,
        })
    }
}

#[async_trait]
impl<A: Action, S: State> Dispatcher<A> for Chain<A, S> {
    async fn dispatch(&self, action: A) -> Result<(), StoreError> {
        self.middleware
            .dispatch(action, &self.state, self.next.as_ref())
            .await
    }
}

/// Logs every dispatch: the action on the way in, the resulting state (or
/// the failure) on the way out.
pub struct LoggingMiddleware;

#[async_trait]
impl<A, S> Middleware<A, S> for LoggingMiddleware
where
    A: Action + fmt::Debug,
    S: State + fmt::Debug,
{
    async fn dispatch(
        &self,
        action: A,
        state: &StateReader<S>,
        next: &dyn Dispatcher<A>,
    ) -> Result<(), StoreError> {
        debug!(action = ?action, "dispatching");
        let result = next.dispatch(action).await;
        match &result {
            Ok(()) => debug!(state = ?state.get(), "state published"),
            Err(e) => warn!(error = %e, "dispatch failed"),
        }
        result
    }
}
