//! Single-flight credential refresh with a FIFO waiter queue.
//!
//! [`RefreshCoordinator`] guarantees that at most one refresh exchange is in flight. The first
//! caller to arrive while the coordinator is [`RefreshState::Idle`] becomes the leader and runs
//! the exchange; everyone arriving while it is [`RefreshState::Refreshing`] parks a
//! [`PendingWaiter`] in the queue. When the exchange settles the coordinator flips back to idle
//! and empties the queue inside one critical section, then hands every waiter the same outcome
//! in arrival order.
//!
//! The state transitions never span an `.await`, so no second exchange can start between
//! "detect expiry" and "begin refresh", and no waiter can slip in between "exchange settled" and
//! "drain queue". If the leader's future is dropped before the exchange settles, the queue is
//! released without an outcome and the woken waiters race to lead a fresh cycle.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::mem;
// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	obs::{self, CallKind, CallOutcome, CallSpan, event},
};

/// Outcome shared with every caller of one refresh cycle.
pub type RefreshOutcome = std::result::Result<TokenSecret, RefreshFailure>;

/// Coordinator state; at most one exchange runs while [`Refreshing`](Self::Refreshing).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefreshState {
	/// No exchange in flight.
	Idle,
	/// An exchange is in flight; newcomers must queue.
	Refreshing,
}

/// Cloneable failure broadcast to every caller of a failed cycle.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("{reason}")]
pub struct RefreshFailure {
	/// Human-readable explanation.
	pub reason: String,
}
impl RefreshFailure {
	/// Creates a failure with the provided reason.
	pub fn new(reason: impl Into<String>) -> Self {
		Self { reason: reason.into() }
	}

	fn from_error(err: &Error) -> Self {
		match err {
			Error::AuthenticationFailed { reason } => Self::new(reason.clone()),
			// `AuthenticationFailed` supplies the closing period.
			other => Self::new(other.to_string().trim_end_matches('.')),
		}
	}
}
impl From<RefreshFailure> for Error {
	fn from(failure: RefreshFailure) -> Self {
		Error::AuthenticationFailed { reason: failure.reason }
	}
}

/// Continuation for a caller blocked on an in-flight refresh.
#[derive(Debug)]
pub struct PendingWaiter {
	sender: oneshot::Sender<RefreshOutcome>,
}
impl PendingWaiter {
	/// Creates a waiter plus the ticket its owner awaits.
	pub fn new() -> (Self, WaiterTicket) {
		let (sender, receiver) = oneshot::channel();

		(Self { sender }, WaiterTicket(receiver))
	}

	/// Releases the waiter with the new access token.
	pub fn resolve(self, token: TokenSecret) {
		self.settle(Ok(token));
	}

	/// Releases the waiter with a failure.
	pub fn reject(self, failure: RefreshFailure) {
		self.settle(Err(failure));
	}

	fn settle(self, outcome: RefreshOutcome) {
		// The owner may have been cancelled; nobody is left to tell.
		let _ = self.sender.send(outcome);
	}
}

/// Receiving half of a [`PendingWaiter`].
#[derive(Debug)]
pub struct WaiterTicket(oneshot::Receiver<RefreshOutcome>);
impl WaiterTicket {
	/// Waits for the cycle to settle; `None` means the cycle was abandoned without an outcome.
	pub async fn wait(self) -> Option<RefreshOutcome> {
		self.0.await.ok()
	}
}

#[derive(Debug)]
struct CoordinatorInner {
	state: RefreshState,
	queue: VecDeque<PendingWaiter>,
}

/// Owns the refresh state machine (`Idle → Refreshing → Idle`) and its waiter queue.
#[derive(Debug)]
pub struct RefreshCoordinator {
	inner: Mutex<CoordinatorInner>,
	metrics: Arc<RefreshMetrics>,
}
impl RefreshCoordinator {
	/// Creates an idle coordinator with an empty queue.
	pub fn new() -> Self {
		let inner = CoordinatorInner { state: RefreshState::Idle, queue: VecDeque::new() };

		Self { inner: Mutex::new(inner), metrics: Default::default() }
	}

	/// Current state.
	pub fn state(&self) -> RefreshState {
		self.inner.lock().state
	}

	/// Number of waiters parked behind the in-flight exchange.
	pub fn queued(&self) -> usize {
		self.inner.lock().queue.len()
	}

	/// Counters describing past refresh cycles.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Parks `waiter` behind the in-flight exchange.
	///
	/// Hands the waiter back when no exchange is running, since nothing would ever release it.
	pub fn enqueue(&self, waiter: PendingWaiter) -> std::result::Result<(), PendingWaiter> {
		let mut inner = self.inner.lock();

		match inner.state {
			RefreshState::Refreshing => {
				inner.queue.push_back(waiter);

				Ok(())
			},
			RefreshState::Idle => Err(waiter),
		}
	}

	/// Returns a fresh access token, running `exchange` only if no refresh is in flight.
	///
	/// Every caller of one cycle observes the same outcome. Failures surface as
	/// [`Error::AuthenticationFailed`].
	pub async fn obtain_fresh_token<F, Fut>(&self, exchange: F) -> Result<TokenSecret>
	where
		F: Fn() -> Fut,
		Fut: Future<Output = Result<TokenSecret>>,
	{
		loop {
			let ticket = {
				let mut inner = self.inner.lock();

				match inner.state {
					RefreshState::Idle => {
						inner.state = RefreshState::Refreshing;

						None
					},
					RefreshState::Refreshing => {
						let (waiter, ticket) = PendingWaiter::new();

						inner.queue.push_back(waiter);

						Some(ticket)
					},
				}
			};
			let Some(ticket) = ticket else {
				return self.lead(&exchange).await;
			};

			self.metrics.record_joined();
			event!(debug, "joined in-flight refresh");

			match ticket.wait().await {
				Some(outcome) => return outcome.map_err(Error::from),
				None => event!(warn, "refresh leader went away; retrying the cycle"),
			}
		}
	}

	async fn lead<F, Fut>(&self, exchange: &F) -> Result<TokenSecret>
	where
		F: Fn() -> Fut,
		Fut: Future<Output = Result<TokenSecret>>,
	{
		const KIND: CallKind = CallKind::Refresh;

		let lease = RefreshLease { coordinator: self, settled: false };
		let span = CallSpan::new(KIND, "obtain_fresh_token");

		self.metrics.record_exchange();
		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let outcome = match span.instrument(exchange()).await {
			Ok(token) if token.is_empty() =>
				Err(RefreshFailure::new("Refresh exchange produced an empty access token")),
			Ok(token) => Ok(token),
			Err(err) => Err(RefreshFailure::from_error(&err)),
		};

		lease.settle(&outcome);

		outcome.map_err(Error::from)
	}

	/// Flips back to idle and takes the queue in one critical section.
	fn finish(&self) -> VecDeque<PendingWaiter> {
		let mut inner = self.inner.lock();

		inner.state = RefreshState::Idle;

		mem::take(&mut inner.queue)
	}
}
impl Default for RefreshCoordinator {
	fn default() -> Self {
		Self::new()
	}
}

/// Held by the leader for the duration of an exchange.
struct RefreshLease<'a> {
	coordinator: &'a RefreshCoordinator,
	settled: bool,
}
impl RefreshLease<'_> {
	fn settle(mut self, outcome: &RefreshOutcome) {
		self.settled = true;

		let waiters = self.coordinator.finish();
		let metrics = &self.coordinator.metrics;

		match outcome {
			Ok(_) => {
				metrics.record_success();
				obs::record_call_outcome(CallKind::Refresh, CallOutcome::Success);
			},
			Err(failure) => {
				metrics.record_failure();
				obs::record_call_outcome(CallKind::Refresh, CallOutcome::Failure);
				event!(warn, reason = %failure, "refresh exchange failed");
			},
		}

		event!(debug, waiters = waiters.len(), "refresh settled; releasing waiters");

		for waiter in waiters {
			match outcome {
				Ok(token) => waiter.resolve(token.clone()),
				Err(failure) => waiter.reject(failure.clone()),
			}
		}
	}
}
impl Drop for RefreshLease<'_> {
	fn drop(&mut self) {
		if self.settled {
			return;
		}

		let waiters = self.coordinator.finish();

		event!(warn, waiters = waiters.len(), "refresh abandoned before settling");

		drop(waiters);
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	fn counting_exchange(
		calls: &Arc<AtomicUsize>,
		delay: StdDuration,
		result: fn() -> Result<TokenSecret>,
	) -> impl Fn() -> Pin<Box<dyn Future<Output = Result<TokenSecret>> + Send>> + use<> {
		let calls = calls.clone();

		move || {
			let calls = calls.clone();

			Box::pin(async move {
				calls.fetch_add(1, Ordering::SeqCst);
				tokio::time::sleep(delay).await;

				result()
			})
		}
	}

	#[tokio::test]
	async fn concurrent_callers_share_one_exchange() {
		let coordinator = RefreshCoordinator::new();
		let calls = Arc::new(AtomicUsize::new(0));
		let exchange =
			counting_exchange(&calls, StdDuration::from_millis(20), || Ok(TokenSecret::new("A2")));
		let (a, b, c, d) = tokio::join!(
			coordinator.obtain_fresh_token(&exchange),
			coordinator.obtain_fresh_token(&exchange),
			coordinator.obtain_fresh_token(&exchange),
			coordinator.obtain_fresh_token(&exchange),
		);

		for outcome in [a, b, c, d] {
			assert_eq!(outcome.expect("Every caller should receive the token.").expose(), "A2");
		}

		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(coordinator.metrics().exchanges(), 1);
		assert_eq!(coordinator.metrics().joined(), 3);
		assert_eq!(coordinator.state(), RefreshState::Idle);
		assert_eq!(coordinator.queued(), 0);
	}

	#[tokio::test]
	async fn failure_is_broadcast_to_every_waiter() {
		let coordinator = RefreshCoordinator::new();
		let calls = Arc::new(AtomicUsize::new(0));
		let exchange = counting_exchange(&calls, StdDuration::from_millis(10), || {
			Err(Error::HttpStatus { status: 400, body: Value::Null })
		});
		let (a, b, c) = tokio::join!(
			coordinator.obtain_fresh_token(&exchange),
			coordinator.obtain_fresh_token(&exchange),
			coordinator.obtain_fresh_token(&exchange),
		);
		let reasons: Vec<_> = [a, b, c]
			.into_iter()
			.map(|outcome| match outcome {
				Err(Error::AuthenticationFailed { reason }) => reason,
				other => panic!("Unexpected refresh outcome: {other:?}."),
			})
			.collect();

		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert!(reasons.iter().all(|reason| reason == &reasons[0]));
		assert_eq!(reasons[0], "Request failed with status code 400");
		assert_eq!(
			Error::from(RefreshFailure::new(reasons[0].clone())).to_string(),
			"Authentication failed: Request failed with status code 400."
		);
		assert_eq!(coordinator.metrics().failures(), 1);
		assert_eq!(coordinator.state(), RefreshState::Idle);
	}

	#[tokio::test]
	async fn empty_token_counts_as_failure() {
		let coordinator = RefreshCoordinator::new();
		let calls = Arc::new(AtomicUsize::new(0));
		let exchange = counting_exchange(&calls, StdDuration::ZERO, || Ok(TokenSecret::new("")));
		let err = coordinator
			.obtain_fresh_token(&exchange)
			.await
			.expect_err("Empty token must not be handed out.");

		assert!(matches!(err, Error::AuthenticationFailed { .. }));
	}

	#[tokio::test]
	async fn settled_cycle_allows_a_new_one() {
		let coordinator = RefreshCoordinator::new();
		let calls = Arc::new(AtomicUsize::new(0));
		let exchange =
			counting_exchange(&calls, StdDuration::ZERO, || Ok(TokenSecret::new("A2")));

		coordinator.obtain_fresh_token(&exchange).await.expect("First cycle should succeed.");
		coordinator.obtain_fresh_token(&exchange).await.expect("Second cycle should succeed.");

		assert_eq!(calls.load(Ordering::SeqCst), 2);
		assert_eq!(coordinator.metrics().successes(), 2);
	}

	#[tokio::test]
	async fn dropped_leader_hands_over_to_a_waiter() {
		let coordinator = RefreshCoordinator::new();
		let slow_calls = Arc::new(AtomicUsize::new(0));
		let fast_calls = Arc::new(AtomicUsize::new(0));
		let slow =
			counting_exchange(&slow_calls, StdDuration::from_secs(60), || Ok(TokenSecret::new("X")));
		let fast =
			counting_exchange(&fast_calls, StdDuration::ZERO, || Ok(TokenSecret::new("A3")));
		let cancelled_leader =
			tokio::time::timeout(StdDuration::from_millis(20), coordinator.obtain_fresh_token(&slow));
		let (leader, follower) =
			tokio::join!(cancelled_leader, coordinator.obtain_fresh_token(&fast));

		assert!(leader.is_err(), "Leader should be cancelled by its timeout.");
		assert_eq!(follower.expect("Follower should lead the next cycle.").expose(), "A3");
		assert_eq!(slow_calls.load(Ordering::SeqCst), 1);
		assert_eq!(fast_calls.load(Ordering::SeqCst), 1);
		assert_eq!(coordinator.metrics().exchanges(), 2);
		assert_eq!(coordinator.state(), RefreshState::Idle);
	}

	#[tokio::test]
	async fn enqueue_requires_an_in_flight_exchange() {
		let coordinator = RefreshCoordinator::new();
		let (waiter, _ticket) = PendingWaiter::new();

		assert!(coordinator.enqueue(waiter).is_err());
		assert_eq!(coordinator.queued(), 0);
	}

	#[tokio::test]
	async fn manually_enqueued_waiters_receive_the_leader_outcome() {
		let coordinator = RefreshCoordinator::new();
		let calls = Arc::new(AtomicUsize::new(0));
		let exchange =
			counting_exchange(&calls, StdDuration::from_millis(20), || Ok(TokenSecret::new("A2")));
		let watcher = async {
			tokio::task::yield_now().await;

			let mut tickets = Vec::new();

			for _ in 0..3 {
				let (waiter, ticket) = PendingWaiter::new();

				coordinator.enqueue(waiter).expect("Leader should still be refreshing.");
				tickets.push(ticket);
			}

			assert_eq!(coordinator.queued(), 3);

			for ticket in tickets {
				let outcome = ticket.wait().await.expect("Ticket should be settled.");

				assert_eq!(outcome.expect("Waiter should receive the token.").expose(), "A2");
			}
		};
		let (leader, ()) = tokio::join!(coordinator.obtain_fresh_token(&exchange), watcher);

		leader.expect("Leader should succeed.");

		assert_eq!(coordinator.queued(), 0);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn waiters_are_released_in_arrival_order() {
		let coordinator = Arc::new(RefreshCoordinator::new());
		let calls = Arc::new(AtomicUsize::new(0));
		let exchange =
			counting_exchange(&calls, StdDuration::from_millis(30), || Ok(TokenSecret::new("A2")));
		let leader = tokio::spawn({
			let coordinator = coordinator.clone();

			async move { coordinator.obtain_fresh_token(&exchange).await }
		});

		while coordinator.state() == RefreshState::Idle {
			tokio::task::yield_now().await;
		}

		let tickets = (0..5)
			.map(|_| {
				let (waiter, ticket) = PendingWaiter::new();

				coordinator.enqueue(waiter).expect("Leader should still be refreshing.");

				ticket
			})
			.collect::<Vec<_>>();
		let released = Arc::new(Mutex::new(Vec::new()));
		// Spawned last-first, so only the release order can put them back in sequence.
		let waits = tickets
			.into_iter()
			.enumerate()
			.rev()
			.map(|(index, ticket)| {
				let released = released.clone();

				tokio::spawn(async move {
					let outcome = ticket.wait().await;

					released.lock().push(index);

					outcome
				})
			})
			.collect::<Vec<_>>();

		leader.await.expect("Leader task should not panic.").expect("Leader should succeed.");

		for wait in waits {
			let outcome = wait
				.await
				.expect("Waiter task should not panic.")
				.expect("Waiter should be settled.");

			assert_eq!(outcome.expect("Waiter should receive the token.").expose(), "A2");
		}

		assert_eq!(*released.lock(), vec![0, 1, 2, 3, 4]);
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}
}
