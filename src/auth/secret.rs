//! Bearer token wrapper that keeps raw credentials out of logs.

// self
use crate::_prelude::*;

/// Access or refresh token. Formatting never prints the raw value.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a raw token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Raw token; only header construction and persistence should read it.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` for blank tokens, which the server would reject anyway.
	pub fn is_empty(&self) -> bool {
		self.0.trim().is_empty()
	}

	/// `Authorization` header value for this token.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.0)
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "TokenSecret(<{} chars redacted>)", self.0.chars().count())
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("Bearer <redacted>")
	}
}
