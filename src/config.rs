//! Client configuration, per-call options, and endpoint URL resolution.

// self
use crate::{_prelude::*, error::ConfigError};

/// Immutable client configuration produced by [`ClientConfigBuilder`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// API root every endpoint path is appended to.
	pub base_url: Url,
	/// Default per-attempt deadline.
	pub timeout: StdDuration,
	/// Path of the refresh-token exchange, relative to [`base_url`](Self::base_url).
	pub refresh_path: String,
	/// Headers sent with every request; names are lower-case.
	pub default_headers: BTreeMap<String, String>,
}
impl ClientConfig {
	/// Default attempt deadline, generous enough for slow mobile links.
	pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(300);
	/// Default refresh endpoint path.
	pub const DEFAULT_REFRESH_PATH: &'static str = "/auth/refresh-tokens";

	/// Returns a builder rooted at `base_url`.
	pub fn builder(base_url: impl Into<String>) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Resolves `endpoint` against the base URL and appends `params` to the query.
	///
	/// Absolute http(s) endpoints are used as-is.
	pub fn endpoint_url(&self, endpoint: &str, params: &[(String, String)]) -> Url {
		let mut url = match Url::parse(endpoint) {
			Ok(absolute) if matches!(absolute.scheme(), "http" | "https") => absolute,
			_ => {
				let (path, query) = match endpoint.split_once('?') {
					Some((path, query)) => (path, Some(query)),
					None => (endpoint, None),
				};
				let mut url = self.base_url.clone();
				let joined = format!(
					"{}/{}",
					self.base_url.path().trim_end_matches('/'),
					path.trim_start_matches('/')
				);

				url.set_path(&joined);
				url.set_query(query);

				url
			},
		};

		if !params.is_empty() {
			url.query_pairs_mut().extend_pairs(params);
		}

		url
	}

	/// Fully resolved refresh endpoint.
	pub fn refresh_url(&self) -> Url {
		self.endpoint_url(&self.refresh_path, &[])
	}

	/// Returns `true` when `endpoint` addresses the refresh exchange, ignoring any query.
	pub fn is_refresh_endpoint(&self, endpoint: &str) -> bool {
		let mut target = self.endpoint_url(endpoint, &[]);
		let mut refresh = self.refresh_url();

		target.set_query(None);
		refresh.set_query(None);

		target.path().trim_end_matches('/') == refresh.path().trim_end_matches('/')
			&& target.origin() == refresh.origin()
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	/// Raw base URL, validated on [`build`](Self::build).
	pub base_url: String,
	/// Default attempt deadline.
	pub timeout: StdDuration,
	/// Refresh endpoint path.
	pub refresh_path: String,
	/// Headers sent with every request.
	pub default_headers: BTreeMap<String, String>,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with JSON defaults.
	pub fn new(base_url: impl Into<String>) -> Self {
		let mut default_headers = BTreeMap::new();

		default_headers.insert("accept".to_owned(), "application/json".to_owned());
		default_headers.insert("content-type".to_owned(), "application/json".to_owned());

		Self {
			base_url: base_url.into(),
			timeout: ClientConfig::DEFAULT_TIMEOUT,
			refresh_path: ClientConfig::DEFAULT_REFRESH_PATH.to_owned(),
			default_headers,
		}
	}

	/// Overrides the default attempt deadline.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Adds (or replaces) a default header.
	pub fn default_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.default_headers.insert(name.as_ref().to_ascii_lowercase(), value.into());

		self
	}

	/// Validates the configuration.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		let base_url = Url::parse(&self.base_url)
			.map_err(|source| ConfigError::InvalidUrl { value: self.base_url.clone(), source })?;

		if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
			return Err(ConfigError::UnsupportedBaseUrl { value: self.base_url });
		}
		if self.timeout.is_zero() {
			return Err(ConfigError::ZeroTimeout);
		}
		if self.refresh_path.trim().is_empty() {
			return Err(ConfigError::EmptyRefreshPath);
		}

		Ok(ClientConfig {
			base_url,
			timeout: self.timeout,
			refresh_path: self.refresh_path,
			default_headers: self.default_headers,
		})
	}
}

/// Per-call options; the client reads them but never mutates them.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
	/// Extra headers; they override the client's defaults.
	pub headers: BTreeMap<String, String>,
	/// Query parameters appended in order.
	pub params: Vec<(String, String)>,
	/// Deadline override for this call (applies to the replay too).
	pub timeout: Option<StdDuration>,
}
impl RequestOptions {
	/// Adds a header.
	pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());

		self
	}

	/// Appends a query parameter.
	pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.params.push((key.into(), value.to_string()));

		self
	}

	/// Overrides the deadline for this call.
	pub fn timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}
}
