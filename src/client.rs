//! Authenticated API client: the public facade over transport, retry, and refresh coordination.
//!
//! [`AuthenticatedClient`] owns one [`RefreshCoordinator`] and one [`RetryTracker`]; nothing is
//! process-global, so independent clients (and tests) never share refresh state.

pub mod response;

mod call;
mod session;

pub use response::ApiResponse;

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::ClientConfig,
	http::{HttpTransport, RequestExecutor},
	refresh::RefreshCoordinator,
	retry::RetryTracker,
	store::CredentialStore,
};
#[cfg(feature = "reqwest")] use crate::{error::ConfigError, http::ReqwestTransport};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestAuthenticatedClient = AuthenticatedClient<ReqwestTransport>;

/// Bearer-authenticated client with single-flight refresh and replay-once semantics.
///
/// The client keeps only a cached projection of the access token for header construction; the
/// [`CredentialStore`] stays the source of truth. Share one instance (behind an `Arc`) across
/// every in-flight call so they coordinate on the same refresh cycle.
pub struct AuthenticatedClient<T>
where
	T: ?Sized + HttpTransport,
{
	config: ClientConfig,
	executor: RequestExecutor<T>,
	store: Arc<dyn CredentialStore>,
	access_token: RwLock<Option<TokenSecret>>,
	retry_tracker: RetryTracker,
	refresh: RefreshCoordinator,
}
impl<T> AuthenticatedClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	///
	/// The cached access token starts empty; call
	/// [`restore_session`](Self::restore_session) to load it from the store.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		transport: Arc<T>,
	) -> Self {
		Self {
			config,
			executor: RequestExecutor::new(transport),
			store,
			access_token: RwLock::new(None),
			retry_tracker: RetryTracker::default(),
			refresh: RefreshCoordinator::new(),
		}
	}

	/// Active configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Per-request retry markers; empty whenever no call is in flight.
	pub fn retry_tracker(&self) -> &RetryTracker {
		&self.retry_tracker
	}

	/// Refresh coordinator shared by every call on this client.
	pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
		&self.refresh
	}

	/// Credential store backing this client.
	pub fn store(&self) -> &Arc<dyn CredentialStore> {
		&self.store
	}
}
#[cfg(feature = "reqwest")]
impl AuthenticatedClient<ReqwestTransport> {
	/// Creates a client with its own reqwest transport.
	///
	/// Redirects are not followed so a redirected `401` can never strip the bearer header
	/// silently.
	pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ConfigError> {
		let client =
			ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self::with_transport(config, store, Arc::new(ReqwestTransport::with_client(client))))
	}
}
impl<T> Debug for AuthenticatedClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatedClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("session_cached", &self.access_token.read().is_some())
			.field("refresh_state", &self.refresh.state())
			.finish()
	}
}
