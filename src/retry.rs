//! Per-request retry bookkeeping for the 401 refresh-and-replay path.
//!
//! Every logical call receives a fresh [`RequestId`] from a monotonically increasing counter, so
//! repeated calls to the same endpoint never share a marker. A marker flips from not-retried to
//! retried at most once and is dropped as soon as the call settles.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{_prelude::*, http::Method};

/// Opaque identity of one logical call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);
impl RequestId {
	/// Raw counter value.
	pub fn get(self) -> u64 {
		self.0
	}
}
impl Display for RequestId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "req-{}", self.0)
	}
}

/// Identity plus the descriptive fields used in logs.
#[derive(Clone, Debug)]
pub struct RequestIdentity {
	/// Unique id assigned at call start.
	pub id: RequestId,
	/// Verb of the logical call.
	pub method: Method,
	/// Resolved URL of the logical call.
	pub url: Url,
	/// Instant the call was issued.
	pub issued_at: OffsetDateTime,
}

/// Tracks which logical calls already spent their single refresh-triggered retry.
#[derive(Debug, Default)]
pub struct RetryTracker {
	next_id: AtomicU64,
	retried: Mutex<HashSet<RequestId>>,
}
impl RetryTracker {
	/// Assigns a new identity to a call that is about to start.
	pub fn issue(&self, method: Method, url: &Url) -> RequestIdentity {
		let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));

		RequestIdentity { id, method, url: url.clone(), issued_at: OffsetDateTime::now_utc() }
	}

	/// Returns `false` once [`mark_retried`](Self::mark_retried) has been called for `id`.
	pub fn should_retry(&self, id: RequestId) -> bool {
		!self.retried.lock().contains(&id)
	}

	/// Records that `id` spent its retry.
	pub fn mark_retried(&self, id: RequestId) {
		self.retried.lock().insert(id);
	}

	/// Forgets the marker for `id`.
	pub fn clear(&self, id: RequestId) {
		self.retried.lock().remove(&id);
	}

	/// Number of markers currently held.
	pub fn outstanding(&self) -> usize {
		self.retried.lock().len()
	}

	/// Returns a guard that clears the marker for `id` when dropped, covering every exit path
	/// including cancellation of the calling future.
	pub fn track(&self, id: RequestId) -> RetryMarkerGuard<'_> {
		RetryMarkerGuard { tracker: self, id }
	}
}

/// RAII guard returned by [`RetryTracker::track`].
#[derive(Debug)]
pub struct RetryMarkerGuard<'a> {
	tracker: &'a RetryTracker,
	id: RequestId,
}
impl Drop for RetryMarkerGuard<'_> {
	fn drop(&mut self) {
		self.tracker.clear(self.id);
	}
}
