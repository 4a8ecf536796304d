//! Session credentials and the refresh endpoint's wire payloads.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Opaque user record returned by the API alongside a token pair.
pub type UserRecord = Value;

/// Errors produced when a refresh or login payload cannot become a [`Credential`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CredentialError {
	/// Issued when the access token is missing or blank.
	#[error("Access token is empty.")]
	EmptyAccessToken,
	/// Issued when the refresh token is missing or blank.
	#[error("Refresh token is empty.")]
	EmptyRefreshToken,
}

/// Access/refresh token pair plus the user record they belong to.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
	/// Short-lived token attached to every authenticated call.
	pub access_token: TokenSecret,
	/// Long-lived token used only against the refresh endpoint.
	pub refresh_token: TokenSecret,
	/// User record returned with the tokens.
	pub user: UserRecord,
	/// Instant the client received this credential.
	#[serde(with = "time::serde::rfc3339")]
	pub obtained_at: OffsetDateTime,
}
impl Credential {
	/// Builds a credential stamped with the current clock, rejecting blank tokens.
	pub fn new(
		access_token: impl Into<String>,
		refresh_token: impl Into<String>,
		user: UserRecord,
	) -> Result<Self, CredentialError> {
		let access_token = TokenSecret::new(access_token);
		let refresh_token = TokenSecret::new(refresh_token);

		if access_token.is_empty() {
			return Err(CredentialError::EmptyAccessToken);
		}
		if refresh_token.is_empty() {
			return Err(CredentialError::EmptyRefreshToken);
		}

		Ok(Self { access_token, refresh_token, user, obtained_at: OffsetDateTime::now_utc() })
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("user", &self.user)
			.field("obtained_at", &self.obtained_at)
			.finish()
	}
}
impl TryFrom<RefreshResponse> for Credential {
	type Error = CredentialError;

	fn try_from(response: RefreshResponse) -> Result<Self, Self::Error> {
		Self::new(response.tokens.access.token, response.tokens.refresh.token, response.user)
	}
}

/// Body posted to the refresh endpoint.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
	/// Stored refresh token.
	pub refresh_token: &'a str,
}

/// Successful refresh endpoint payload: `{ user, tokens: { access: { token }, refresh: { token } } }`.
#[derive(Clone, Debug, Deserialize)]
pub struct RefreshResponse {
	/// Updated user record; absent in some deployments.
	#[serde(default)]
	pub user: UserRecord,
	/// Rotated token pair.
	pub tokens: TokenPair,
}

/// Token pair nested in [`RefreshResponse`].
#[derive(Clone, Debug, Deserialize)]
pub struct TokenPair {
	/// New access token.
	pub access: IssuedToken,
	/// New refresh token.
	pub refresh: IssuedToken,
}

/// Single issued token entry.
#[derive(Clone, Debug, Deserialize)]
pub struct IssuedToken {
	/// Raw token string.
	#[serde(default)]
	pub token: String,
}
