//! Credential storage contract and built-in key-value stores.
//!
//! The client treats the store as an opaque async key-value interface over three named
//! [`CredentialSlot`]s. Store failures never reach callers: the client logs them and behaves as
//! if the slot were empty.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Async key-value storage for session secrets (keychain, encrypted prefs, files, memory).
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Reads the value stored in `slot`, if any.
	fn get(&self, slot: CredentialSlot) -> StoreFuture<'_, Option<String>>;

	/// Persists or replaces the value stored in `slot`.
	fn set(&self, slot: CredentialSlot, value: String) -> StoreFuture<'_, ()>;

	/// Deletes the value stored in `slot`; deleting an empty slot succeeds.
	fn remove(&self, slot: CredentialSlot) -> StoreFuture<'_, ()>;
}

/// Named slots the client reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CredentialSlot {
	/// Current access token.
	#[serde(rename = "accessToken")]
	AccessToken,
	/// Current refresh token.
	#[serde(rename = "refreshToken")]
	RefreshToken,
	/// JSON-encoded user record.
	#[serde(rename = "user")]
	UserRecord,
}
impl CredentialSlot {
	/// Every slot, in the order the client writes them.
	pub const ALL: [CredentialSlot; 3] = [Self::AccessToken, Self::RefreshToken, Self::UserRecord];

	/// Returns the stable storage key for this slot.
	pub const fn key(self) -> &'static str {
		match self {
			Self::AccessToken => "accessToken",
			Self::RefreshToken => "refreshToken",
			Self::UserRecord => "user",
		}
	}
}
impl Display for CredentialSlot {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.key())
	}
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
