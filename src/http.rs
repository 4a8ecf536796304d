//! Transport primitives for API calls.
//!
//! The module exposes [`HttpTransport`] so downstream crates can integrate custom HTTP stacks
//! (or in-process fakes) while [`RequestExecutor`] keeps deadline enforcement and status
//! normalization in one place. A transport only moves bytes: it never reads credentials, never
//! retries, and reports every HTTP status it receives as a successful [`RawResponse`].

mod executor;

pub use executor::RequestExecutor;

// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing one [`RequestAttempt`].
///
/// Dropping the returned future must abort the underlying request; [`RequestExecutor`] relies on
/// this to cancel attempts that outlive their deadline.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Dispatches the attempt and resolves with whatever status the server answered.
	fn send(&self, attempt: RequestAttempt) -> TransportFuture<'_>;
}

/// HTTP verbs exposed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the canonical upper-case verb.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Get => "GET",
			Self::Post => "POST",
			Self::Put => "PUT",
			Self::Patch => "PATCH",
			Self::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One HTTP call, including a replay; discarded once the call settles.
#[derive(Clone, Debug)]
pub struct RequestAttempt {
	/// Verb to send.
	pub method: Method,
	/// Fully resolved URL, query included.
	pub url: Url,
	/// Header map; names are stored lower-case.
	pub headers: BTreeMap<String, String>,
	/// JSON body, if any.
	pub body: Option<Value>,
	/// Deadline for this attempt.
	pub timeout: StdDuration,
}
impl RequestAttempt {
	/// Creates an attempt without headers or body.
	pub fn new(method: Method, url: Url, timeout: StdDuration) -> Self {
		Self { method, url, headers: BTreeMap::new(), body: None, timeout }
	}

	/// Sets (or replaces) a header; the name is normalized to lower-case.
	pub fn set_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
		self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
	}

	/// Removes a header by name.
	pub fn remove_header(&mut self, name: &str) {
		self.headers.remove(&name.to_ascii_lowercase());
	}

	/// Looks up a header by name.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Value of the `authorization` header, if present.
	pub fn authorization(&self) -> Option<&str> {
		self.header(AUTHORIZATION)
	}

	/// Attaches a JSON body.
	pub fn with_body(mut self, body: Option<Value>) -> Self {
		self.body = body;

		self
	}
}

/// Lower-case `Authorization` header name.
pub const AUTHORIZATION: &str = "authorization";

/// Response handed back by a transport before status normalization.
#[derive(Clone, Debug, Default)]
pub struct RawResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers with lower-case names.
	pub headers: BTreeMap<String, String>,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl RawResponse {
	/// Builds a response carrying a JSON body.
	pub fn json(status: u16, body: &Value) -> Self {
		let mut headers = BTreeMap::new();

		headers.insert("content-type".to_owned(), "application/json".to_owned());

		Self { status, headers, body: body.to_string().into_bytes() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Parses the body as JSON, falling back to [`Value::Null`] when empty or malformed.
	pub fn json_or_null(&self) -> Value {
		if self.body.iter().all(u8::is_ascii_whitespace) {
			return Value::Null;
		}

		serde_json::from_slice(&self.body).unwrap_or(Value::Null)
	}

	/// Decodes the body into `T`, reporting the failing path on mismatch.
	pub fn decode<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let value = self.json_or_null();

		serde_path_to_error::deserialize(value)
			.map_err(|source| Error::Decode { status: self.status, source })
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Each attempt also carries its deadline into reqwest, so the connection is torn down even if
/// the surrounding future is polled past the executor's own timer.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, attempt: RequestAttempt) -> TransportFuture<'_> {
		Box::pin(async move {
			let method = match attempt.method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
				Method::Put => reqwest::Method::PUT,
				Method::Patch => reqwest::Method::PATCH,
				Method::Delete => reqwest::Method::DELETE,
			};
			let mut builder = self.0.request(method, attempt.url).timeout(attempt.timeout);

			for (name, value) in &attempt.headers {
				builder = builder.header(name.as_str(), value.as_str());
			}
			if let Some(body) = &attempt.body {
				builder = builder.body(body.to_string());
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|v| (name.as_str().to_owned(), v.to_owned()))
				})
				.collect();
			let body = response.bytes().await?.to_vec();

			Ok(RawResponse { status, headers, body })
		})
	}
}
