//! Success envelope returned by every public call.

// self
use crate::{_prelude::*, http::RawResponse};

/// Uniform success shape: `{ data, message?, success: true }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
	/// Decoded response body.
	pub data: T,
	/// Top-level `message` string from the body, when the API sends one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	/// Always `true`; failures are reported through [`ApiError`](crate::error::ApiError).
	pub success: bool,
}
impl<T> ApiResponse<T>
where
	T: DeserializeOwned,
{
	/// Decodes a 2xx response. Empty bodies decode from `null` (so `()` and `Option<_>` work).
	pub fn from_raw(raw: &RawResponse) -> Result<Self> {
		let body = raw.json_or_null();
		let message = body.get("message").and_then(Value::as_str).map(ToOwned::to_owned);
		let data = serde_path_to_error::deserialize(body)
			.map_err(|source| Error::Decode { status: raw.status, source })?;

		Ok(Self { data, message, success: true })
	}
}
