//! Session lifecycle and the refresh-token exchange.
//!
//! Only this module writes credentials. Store failures are logged and treated as an empty slot;
//! they never reach the caller.

// self
use crate::{
	_prelude::*,
	auth::{Credential, RefreshRequest, RefreshResponse, TokenSecret, UserRecord},
	client::AuthenticatedClient,
	error::ConfigError,
	http::{HttpTransport, Method, RequestAttempt},
	obs::event,
	store::CredentialSlot,
};

impl<T> AuthenticatedClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Cached access token used for the next request, if a session is active.
	pub fn access_token(&self) -> Option<TokenSecret> {
		self.access_token.read().clone()
	}

	/// Stores a freshly issued credential (after sign-in) and starts using it.
	pub async fn establish_session(&self, credential: &Credential) {
		self.persist_credential(credential).await;

		*self.access_token.write() = Some(credential.access_token.clone());
	}

	/// Loads the stored access token into the cache; returns whether one was found.
	pub async fn restore_session(&self) -> bool {
		let token = self
			.load_slot(CredentialSlot::AccessToken)
			.await
			.map(TokenSecret::new)
			.filter(|token| !token.is_empty());
		let found = token.is_some();

		*self.access_token.write() = token;

		found
	}

	/// Signs out locally: clears every credential slot and the cached token.
	pub async fn end_session(&self) {
		self.clear_credentials().await;
	}

	/// Stored user record, if present and valid JSON.
	pub async fn current_user(&self) -> Option<UserRecord> {
		let raw = self.load_slot(CredentialSlot::UserRecord).await?;

		match serde_json::from_str::<UserRecord>(&raw) {
			Ok(user) if !user.is_null() => Some(user),
			Ok(_) => None,
			Err(err) => {
				event!(warn, error = %err, "stored user record is not valid JSON");

				None
			},
		}
	}

	/// Performs one refresh exchange and applies its outcome to the session.
	///
	/// Runs only as the leader of a [`RefreshCoordinator`](crate::refresh::RefreshCoordinator)
	/// cycle and bypasses the authenticated path, so a `401` here is never refreshed again.
	pub(crate) async fn refresh_exchange(&self) -> Result<TokenSecret> {
		event!(info, "refreshing access token");

		match self.exchange_refresh_token().await {
			Ok(credential) => {
				self.persist_credential(&credential).await;

				*self.access_token.write() = Some(credential.access_token.clone());

				Ok(credential.access_token)
			},
			Err(err) => {
				event!(warn, error = %err, "refresh exchange failed; clearing session");
				self.clear_credentials().await;

				Err(err)
			},
		}
	}

	async fn exchange_refresh_token(&self) -> Result<Credential> {
		let refresh_token = self
			.load_slot(CredentialSlot::RefreshToken)
			.await
			.filter(|token| !token.trim().is_empty())
			.ok_or_else(|| Error::AuthenticationFailed {
				reason: "No refresh token is stored".into(),
			})?;
		let body = serde_json::to_value(RefreshRequest { refresh_token: &refresh_token })
			.map_err(ConfigError::BodySerialize)?;
		let mut attempt =
			RequestAttempt::new(Method::Post, self.config.refresh_url(), self.config.timeout)
				.with_body(Some(body));

		for (name, value) in &self.config.default_headers {
			attempt.set_header(name, value.clone());
		}

		let response = self.executor.execute(attempt).await?;
		let payload: RefreshResponse = response.decode()?;

		Credential::try_from(payload)
			.map_err(|err| Error::AuthenticationFailed { reason: err.to_string() })
	}

	async fn persist_credential(&self, credential: &Credential) {
		self.save_slot(CredentialSlot::AccessToken, credential.access_token.expose().to_owned())
			.await;
		self.save_slot(CredentialSlot::RefreshToken, credential.refresh_token.expose().to_owned())
			.await;

		if credential.user.is_null() {
			self.remove_slot(CredentialSlot::UserRecord).await;
		} else {
			self.save_slot(CredentialSlot::UserRecord, credential.user.to_string()).await;
		}
	}

	async fn clear_credentials(&self) {
		*self.access_token.write() = None;

		for slot in CredentialSlot::ALL {
			self.remove_slot(slot).await;
		}
	}

	async fn load_slot(&self, slot: CredentialSlot) -> Option<String> {
		match self.store.get(slot).await {
			Ok(value) => value,
			Err(err) => {
				event!(warn, %slot, error = %err, "credential store read failed; treating as empty");

				None
			},
		}
	}

	async fn save_slot(&self, slot: CredentialSlot, value: String) {
		if let Err(err) = self.store.set(slot, value).await {
			event!(warn, %slot, error = %err, "credential store write failed");
		}
	}

	async fn remove_slot(&self, slot: CredentialSlot) {
		if let Err(err) = self.store.remove(slot).await {
			event!(warn, %slot, error = %err, "credential store delete failed");
		}
	}
}
