// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The message bus: subscriber table plus a correlation map of pending waiters.

use crate::{BusError, EventName, HandlerError};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Synchronous handler: receives the emitted arguments, returns the reply value.
pub type SyncHandler = Arc<dyn Fn(&[Value]) -> Result<Value, HandlerError> + Send + Sync>;

/// Asynchronous handler: the returned future is driven on the tokio runtime.
pub type AsyncHandler =
	Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, Result<Value, HandlerError>> + Send + Sync>;

/// Identifies a registration so it can be removed with [`MessageBus::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "sub-{}", self.0)
	}
}

#[derive(Clone)]
enum Handler {
	Sync(SyncHandler),
	Async(AsyncHandler),
}

struct Subscriber {
	id: SubscriptionId,
	once: bool,
	handler: Handler,
}

type Waiter = oneshot::Sender<Result<Value, BusError>>;

#[derive(Default)]
struct BusState {
	subscribers: HashMap<EventName, Vec<Subscriber>>,
	/// Waiters per event in arrival order. An absent key means nothing is pending;
	/// entries are removed as soon as they are resolved.
	pending: HashMap<EventName, Vec<Waiter>>,
	next_subscription: u64,
}

/// Process-wide bus turning broadcast emission into request/response.
///
/// Cloning is cheap; all clones share the same subscriber table and waiter
/// registry. Handlers are never invoked while the internal lock is held, so a
/// handler may itself call [`MessageBus::send`] or [`MessageBus::emit`].
#[derive(Clone, Default)]
pub struct MessageBus {
	state: Arc<Mutex<BusState>>,
}

impl fmt::Debug for MessageBus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.lock();
		f.debug_struct("MessageBus")
			.field("events_with_subscribers", &state.subscribers.len())
			.field("events_with_waiters", &state.pending.len())
			.finish()
	}
}

impl MessageBus {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `handler` to run every time `event` is emitted.
	pub fn subscribe<F>(&self, event: impl Into<EventName>, handler: F) -> SubscriptionId
	where
		F: Fn(&[Value]) -> Result<Value, HandlerError> + Send + Sync + 'static,
	{
		self.register(event.into(), false, Handler::Sync(Arc::new(handler)))
	}

	/// Registers `handler` for the next emission of `event` only.
	pub fn subscribe_once<F>(&self, event: impl Into<EventName>, handler: F) -> SubscriptionId
	where
		F: Fn(&[Value]) -> Result<Value, HandlerError> + Send + Sync + 'static,
	{
		self.register(event.into(), true, Handler::Sync(Arc::new(handler)))
	}

	/// Registers an asynchronous handler.
	///
	/// On emission the handler's future is spawned on the current tokio runtime.
	/// When it completes, its result resolves whichever waiters are pending for
	/// the event at that moment.
	pub fn subscribe_async<F, Fut>(&self, event: impl Into<EventName>, handler: F) -> SubscriptionId
	where
		F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
	{
		let handler: AsyncHandler = Arc::new(move |args| handler(args).boxed());
		self.register(event.into(), false, Handler::Async(handler))
	}

	/// Removes a registration. Returns `false` if it was already gone.
	pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
		let mut state = self.state.lock();
		let mut removed = false;
		state.subscribers.retain(|_, subscribers| {
			let before = subscribers.len();
			subscribers.retain(|s| s.id != id);
			removed |= subscribers.len() != before;
			!subscribers.is_empty()
		});
		if removed {
			debug!(subscription = %id, "unsubscribed");
		}
		removed
	}

	/// Registers a waiter for `event`, emits it with `args`, and returns the
	/// deferred reply.
	///
	/// The reply never completes if no handler is subscribed; see
	/// [`MessageBus::send_timeout`].
	pub fn send(&self, event: impl Into<EventName>, args: Vec<Value>) -> Reply {
		let event = event.into();
		let reply = self.wait(&event);
		self.emit(&event, &args);
		reply
	}

	/// Like [`MessageBus::send`] but gives up after `timeout`.
	///
	/// The abandoned waiter is removed from the registry when the timeout fires.
	pub async fn send_timeout(
		&self,
		event: impl Into<EventName>,
		args: Vec<Value>,
		timeout: Duration,
	) -> Result<Value, BusError> {
		let event = event.into();
		let reply = self.send(&event, args);
		match tokio::time::timeout(timeout, reply).await {
			Ok(result) => result,
			Err(_) => {
				warn!(event = %event, timeout_ms = timeout.as_millis() as u64, "bus send timed out");
				Err(BusError::Timeout { event, timeout })
			}
		}
	}

	/// Registers a waiter for the next resolution of `event` without emitting it.
	pub fn wait(&self, event: impl Into<EventName>) -> Reply {
		let event = event.into();
		let (tx, rx) = oneshot::channel();
		let mut state = self.state.lock();
		let waiters = state.pending.entry(event.clone()).or_default();
		waiters.retain(|w| !w.is_closed());
		waiters.push(tx);
		debug!(event = %event, waiters = waiters.len(), "waiter registered");
		Reply {
			event,
			rx,
			state: Arc::downgrade(&self.state),
		}
	}

	/// Emits `event` to every subscriber without registering a waiter.
	///
	/// Synchronous handlers run on the caller's thread before this returns.
	/// Returns the number of handlers invoked.
	pub fn emit(&self, event: impl Into<EventName>, args: &[Value]) -> usize {
		let event = event.into();
		let handlers = self.take_handlers(&event);
		let invoked = handlers.len();

		if invoked == 0 {
			debug!(event = %event, "event emitted with no subscribers");
		}

		for handler in handlers {
			match handler {
				Handler::Sync(handler) => {
					let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(args)))
						.unwrap_or_else(|payload| Err(HandlerError::panicked(payload)));
					self.resolve(&event, outcome);
				}
				Handler::Async(handler) => self.spawn_async(&event, handler, args.to_vec()),
			}
		}

		invoked
	}

	/// Number of live waiters currently pending for `event`.
	pub fn pending_waiters(&self, event: impl Into<EventName>) -> usize {
		let event = event.into();
		self
			.state
			.lock()
			.pending
			.get(&event)
			.map(|waiters| waiters.iter().filter(|w| !w.is_closed()).count())
			.unwrap_or(0)
	}

	/// Number of handlers currently subscribed to `event`.
	pub fn subscriber_count(&self, event: impl Into<EventName>) -> usize {
		let event = event.into();
		self
			.state
			.lock()
			.subscribers
			.get(&event)
			.map(Vec::len)
			.unwrap_or(0)
	}

	fn register(&self, event: EventName, once: bool, handler: Handler) -> SubscriptionId {
		let mut state = self.state.lock();
		state.next_subscription += 1;
		let id = SubscriptionId(state.next_subscription);
		state
			.subscribers
			.entry(event.clone())
			.or_default()
			.push(Subscriber { id, once, handler });
		debug!(event = %event, subscription = %id, once, "subscribed");
		id
	}

	/// Snapshots the handlers for `event`, dropping one-shot registrations.
	fn take_handlers(&self, event: &EventName) -> Vec<Handler> {
		let mut state = self.state.lock();
		let Some(subscribers) = state.subscribers.get_mut(event) else {
			return Vec::new();
		};
		let handlers = subscribers.iter().map(|s| s.handler.clone()).collect();
		subscribers.retain(|s| !s.once);
		if subscribers.is_empty() {
			state.subscribers.remove(event);
		}
		handlers
	}

	fn spawn_async(&self, event: &EventName, handler: AsyncHandler, args: Vec<Value>) {
		let Ok(runtime) = tokio::runtime::Handle::try_current() else {
			self.resolve(
				event,
				Err(HandlerError::new("async handler requires a tokio runtime")),
			);
			return;
		};

		let future = match panic::catch_unwind(AssertUnwindSafe(|| handler(args))) {
			Ok(future) => future,
			Err(payload) => {
				self.resolve(event, Err(HandlerError::panicked(payload)));
				return;
			}
		};

		let bus = self.clone();
		let event = event.clone();
		runtime.spawn(async move {
			let outcome = AssertUnwindSafe(future)
				.catch_unwind()
				.await
				.unwrap_or_else(|payload| Err(HandlerError::panicked(payload)));
			bus.resolve(&event, outcome);
		});
	}

	/// Drains the waiter list for `event` and fulfils every waiter with `outcome`.
	fn resolve(&self, event: &EventName, outcome: Result<Value, HandlerError>) -> usize {
		let waiters = self
			.state
			.lock()
			.pending
			.remove(event)
			.unwrap_or_default();

		let outcome = outcome.map_err(|source| {
			warn!(event = %event, error = %source, "bus handler failed");
			BusError::Handler {
				event: event.clone(),
				source,
			}
		});

		let delivered = waiters.len();
		for waiter in waiters {
			let _ = waiter.send(outcome.clone());
		}

		debug!(
			event = %event,
			waiters = delivered,
			ok = outcome.is_ok(),
			"event resolved"
		);
		delivered
	}
}

/// Deferred result of [`MessageBus::send`] or [`MessageBus::wait`].
///
/// Resolves at most once, with the first handler result delivered to the
/// waiter list it belongs to.
///
/// Dropping an unresolved reply withdraws its waiter; an event left with no
/// waiters is removed from the registry.
#[must_use = "a Reply does nothing unless awaited"]
pub struct Reply {
	event: EventName,
	rx: oneshot::Receiver<Result<Value, BusError>>,
	state: Weak<Mutex<BusState>>,
}

impl fmt::Debug for Reply {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Reply")
			.field("event", &self.event)
			.finish_non_exhaustive()
	}
}

impl Drop for Reply {
	fn drop(&mut self) {
		// Closing first marks this waiter's sender as closed for the prune below.
		self.rx.close();
		let Some(state) = self.state.upgrade() else {
			return;
		};
		let mut state = state.lock();
		if let Some(waiters) = state.pending.get_mut(&self.event) {
			waiters.retain(|w| !w.is_closed());
			if waiters.is_empty() {
				state.pending.remove(&self.event);
			}
		}
	}
}

impl Reply {
	pub fn event(&self) -> &EventName {
		&self.event
	}
}

impl Future for Reply {
	type Output = Result<Value, BusError>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.rx)
			.poll(cx)
			.map(|received| received.unwrap_or(Err(BusError::Closed)))
	}
}
