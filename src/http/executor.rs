//! Deadline-bounded execution of a single [`RequestAttempt`].

// self
use crate::{
	_prelude::*,
	error::TransportError,
	http::{HttpTransport, RawResponse, RequestAttempt},
	obs::event,
};

/// Issues one HTTP request with a bounded lifetime and normalizes the outcome.
///
/// The executor never touches credentials. On success it yields the raw 2xx response; every
/// other outcome becomes an [`Error::Timeout`], [`Error::Transport`], or [`Error::HttpStatus`].
pub struct RequestExecutor<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
}
impl<T> RequestExecutor<T>
where
	T: ?Sized + HttpTransport,
{
	/// Wraps a shared transport.
	pub fn new(transport: Arc<T>) -> Self {
		Self { transport }
	}

	/// Borrows the underlying transport.
	pub fn transport(&self) -> &Arc<T> {
		&self.transport
	}

	/// Executes the attempt, cancelling the transport future once the deadline elapses.
	pub async fn execute(&self, attempt: RequestAttempt) -> Result<RawResponse> {
		let timeout = attempt.timeout;
		let method = attempt.method;
		let response = match tokio::time::timeout(timeout, self.transport.send(attempt)).await {
			Ok(Ok(response)) => response,
			Ok(Err(TransportError::TimedOut)) | Err(_) => {
				event!(
					debug,
					%method,
					timeout_ms = timeout.as_millis() as u64,
					"attempt timed out; transport cancelled"
				);

				return Err(Error::Timeout { timeout });
			},
			Ok(Err(err)) => return Err(err.into()),
		};

		if response.is_success() {
			Ok(response)
		} else {
			Err(Error::HttpStatus { status: response.status, body: response.json_or_null() })
		}
	}
}
impl<T> Clone for RequestExecutor<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self { transport: self.transport.clone() }
	}
}
impl<T> Debug for RequestExecutor<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("RequestExecutor(..)")
	}
}
