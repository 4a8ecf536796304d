//! Client-level error types: the internal taxonomy and the uniform shape handed to callers.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical internal error produced while executing or replaying a request.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The attempt exceeded its deadline and the transport call was cancelled.
	#[error("Request timed out after {}ms.", .timeout.as_millis())]
	Timeout {
		/// Deadline that elapsed.
		timeout: StdDuration,
	},
	/// Transport failure without any HTTP response (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Server responded with a non-2xx status.
	#[error("Request failed with status code {status}.")]
	HttpStatus {
		/// HTTP status code.
		status: u16,
		/// Parsed JSON body, or [`Value::Null`] when the body is empty or not JSON.
		body: Value,
	},
	/// Refresh exchange failed or produced no usable token; the session has ended.
	#[error("Authentication failed: {reason}.")]
	AuthenticationFailed {
		/// Human-readable explanation.
		reason: String,
	},
	/// A 2xx response body could not be decoded into the requested type.
	///
	/// The server accepted the call, so no failing status is reported to callers.
	#[error("Response body (status {status}) could not be decoded.")]
	Decode {
		/// HTTP status of the response whose body failed to decode.
		status: u16,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl Error {
	/// HTTP status reported to callers for this error, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Timeout { .. } => Some(408),
			Self::HttpStatus { status, .. } => Some(*status),
			Self::AuthenticationFailed { .. } => Some(401),
			Self::Transport(_) | Self::Decode { .. } | Self::Config(_) => None,
		}
	}

	/// Returns `true` for a `401` answered by the server.
	pub fn is_unauthorized(&self) -> bool {
		matches!(self, Self::HttpStatus { status: 401, .. })
	}

	/// Returns the [`ErrorKind`] label for this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Timeout { .. } => ErrorKind::Timeout,
			Self::Transport(_) => ErrorKind::NetworkFailure,
			Self::HttpStatus { .. } => ErrorKind::HttpStatus,
			Self::AuthenticationFailed { .. } => ErrorKind::AuthenticationFailed,
			Self::Decode { .. } => ErrorKind::Decode,
			Self::Config(_) => ErrorKind::Config,
		}
	}
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL or endpoint could not be parsed.
	#[error("URL `{value}` is invalid.")]
	InvalidUrl {
		/// Offending input.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses a scheme other than http/https or cannot act as a base.
	#[error("Base URL `{value}` must be an absolute http(s) URL.")]
	UnsupportedBaseUrl {
		/// Offending input.
		value: String,
	},
	/// Default timeout was zero.
	#[error("Timeout must be greater than zero.")]
	ZeroTimeout,
	/// Refresh endpoint path was empty.
	#[error("Refresh endpoint path must not be empty.")]
	EmptyRefreshPath,
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	BodySerialize(#[source] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, deadline).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error: {source}")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client gave up on its own deadline.
	#[error("Transport deadline elapsed.")]
	TimedOut,
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::TimedOut } else { Self::network(e) }
	}
}

/// Error categories surfaced to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	/// Attempt exceeded its deadline (status 408).
	Timeout,
	/// No response was received.
	NetworkFailure,
	/// Server answered with a non-2xx status.
	HttpStatus,
	/// Session ended; the user must authenticate again (status 401).
	AuthenticationFailed,
	/// Response payload did not match the expected shape.
	Decode,
	/// Client-side configuration problem.
	Config,
}

/// Uniform error shape returned by every public call.
#[derive(Clone, Debug, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct ApiError {
	/// Error category.
	pub kind: ErrorKind,
	/// Human-readable message, taken from the server body when it supplies one.
	pub message: String,
	/// HTTP status, when one applies.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub status: Option<u16>,
	/// Server-supplied error code.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub code: Option<String>,
	/// Server-supplied validation errors.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub errors: Option<Value>,
}
impl ApiError {
	/// Returns `true` when the caller should route the user back to sign-in.
	pub fn is_session_ended(&self) -> bool {
		self.kind == ErrorKind::AuthenticationFailed
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let kind = err.kind();
		let status = err.status();

		match err {
			Error::HttpStatus { body, .. } => {
				let message = body
					.get("message")
					.and_then(Value::as_str)
					.map(ToOwned::to_owned)
					.unwrap_or_else(|| {
						format!("Request failed with status code {}.", status.unwrap_or_default())
					});
				let code = body.get("code").and_then(|code| match code {
					Value::String(s) => Some(s.clone()),
					Value::Number(n) => Some(n.to_string()),
					_ => None,
				});
				let errors = body.get("errors").filter(|v| !v.is_null()).cloned();

				Self { kind, message, status, code, errors }
			},
			Error::Transport(inner) => {
				let message = match &inner {
					TransportError::Network { source } => source.to_string(),
					other => other.to_string(),
				};

				Self { kind, message, status, code: None, errors: None }
			},
			other => Self { kind, message: other.to_string(), status, code: None, errors: None },
		}
	}
}
