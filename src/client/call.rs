//! Authenticated request orchestration: attach credentials, detect `401`, refresh, replay once.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	client::{ApiResponse, AuthenticatedClient},
	config::RequestOptions,
	error::{ApiError, ConfigError},
	http::{AUTHORIZATION, HttpTransport, Method, RawResponse, RequestAttempt},
	obs::{self, CallKind, CallOutcome, CallSpan, event},
	retry::RequestIdentity,
};

impl<T> AuthenticatedClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Issues a `GET`.
	pub async fn get<R>(
		&self,
		endpoint: &str,
		options: &RequestOptions,
	) -> Result<ApiResponse<R>, ApiError>
	where
		R: DeserializeOwned,
	{
		self.call(Method::Get, endpoint, None, options).await
	}

	/// Issues a `POST` with a JSON body.
	pub async fn post<B, R>(
		&self,
		endpoint: &str,
		body: &B,
		options: &RequestOptions,
	) -> Result<ApiResponse<R>, ApiError>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		let body = serialize_body(body)?;

		self.call(Method::Post, endpoint, Some(body), options).await
	}

	/// Issues a `PUT` with a JSON body.
	pub async fn put<B, R>(
		&self,
		endpoint: &str,
		body: &B,
		options: &RequestOptions,
	) -> Result<ApiResponse<R>, ApiError>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		let body = serialize_body(body)?;

		self.call(Method::Put, endpoint, Some(body), options).await
	}

	/// Issues a `PATCH` with a JSON body.
	pub async fn patch<B, R>(
		&self,
		endpoint: &str,
		body: &B,
		options: &RequestOptions,
	) -> Result<ApiResponse<R>, ApiError>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		let body = serialize_body(body)?;

		self.call(Method::Patch, endpoint, Some(body), options).await
	}

	/// Issues a `DELETE`.
	pub async fn delete<R>(
		&self,
		endpoint: &str,
		options: &RequestOptions,
	) -> Result<ApiResponse<R>, ApiError>
	where
		R: DeserializeOwned,
	{
		self.call(Method::Delete, endpoint, None, options).await
	}

	/// Issues any verb with an optional pre-serialized body.
	///
	/// A `401` triggers at most one refresh-and-replay for this call; a second `401`, a `401`
	/// from the refresh endpoint itself, and every other failure surface unchanged.
	pub async fn call<R>(
		&self,
		method: Method,
		endpoint: &str,
		body: Option<Value>,
		options: &RequestOptions,
	) -> Result<ApiResponse<R>, ApiError>
	where
		R: DeserializeOwned,
	{
		const KIND: CallKind = CallKind::Request;

		let span = CallSpan::new(KIND, method.as_str());

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				let raw = self.dispatch(method, endpoint, body, options).await?;

				ApiResponse::from_raw(&raw)
			})
			.await;

		match &result {
			Ok(_) => obs::record_call_outcome(KIND, CallOutcome::Success),
			Err(_) => obs::record_call_outcome(KIND, CallOutcome::Failure),
		}

		result.map_err(ApiError::from)
	}

	async fn dispatch(
		&self,
		method: Method,
		endpoint: &str,
		body: Option<Value>,
		options: &RequestOptions,
	) -> Result<RawResponse> {
		let url = self.config.endpoint_url(endpoint, &options.params);
		let identity = self.retry_tracker.issue(method, &url);
		// Cleared on every exit path, cancellation included.
		let _marker = self.retry_tracker.track(identity.id);
		let authenticated = !self.config.is_refresh_endpoint(endpoint);
		let sent_with = if authenticated { self.access_token() } else { None };
		let attempt = self.build_attempt(&identity, body, options, sent_with.as_ref());
		let err = match self.executor.execute(attempt.clone()).await {
			Ok(response) => return Ok(response),
			Err(err) => err,
		};
		let retryable =
			err.is_unauthorized() && authenticated && self.retry_tracker.should_retry(identity.id);

		if !retryable {
			return Err(err);
		}

		self.retry_tracker.mark_retried(identity.id);
		obs::record_call_outcome(CallKind::Request, CallOutcome::Retried);

		let fresh = match self.access_token() {
			// Another call already rotated the token after this attempt went out.
			Some(current) if sent_with.as_ref() != Some(&current) => current,
			_ => self.refresh.obtain_fresh_token(|| self.refresh_exchange()).await?,
		};
		let mut replay = attempt;

		replay.set_header(AUTHORIZATION, fresh.bearer());
		event!(
			debug,
			request = %identity.id,
			method = %identity.method,
			url = %identity.url,
			"replaying request with refreshed credentials"
		);

		self.executor.execute(replay).await
	}

	fn build_attempt(
		&self,
		identity: &RequestIdentity,
		body: Option<Value>,
		options: &RequestOptions,
		token: Option<&TokenSecret>,
	) -> RequestAttempt {
		let timeout = options.timeout.unwrap_or(self.config.timeout);
		let mut attempt =
			RequestAttempt::new(identity.method, identity.url.clone(), timeout).with_body(body);

		for (name, value) in &self.config.default_headers {
			attempt.set_header(name, value.clone());
		}
		if let Some(token) = token {
			attempt.set_header(AUTHORIZATION, token.bearer());
		}
		for (name, value) in &options.headers {
			attempt.set_header(name, value.clone());
		}

		attempt
	}
}

fn serialize_body<B>(body: &B) -> Result<Value, ApiError>
where
	B: ?Sized + Serialize,
{
	serde_json::to_value(body)
		.map_err(|err| ApiError::from(Error::from(ConfigError::BodySerialize(err))))
}
