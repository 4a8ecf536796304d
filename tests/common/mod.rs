//! Scripted in-process transport shared by the integration suites.

#![allow(dead_code)]

// std
use std::{
	sync::{Arc, Mutex},
	time::Duration as StdDuration,
};
// crates.io
use serde_json::{Value, json};
// self
use bearer_client::{
	client::AuthenticatedClient,
	config::ClientConfig,
	http::{HttpTransport, RawResponse, RequestAttempt, TransportFuture},
	store::{CredentialSlot, CredentialStore, MemoryStore},
};

pub const BASE_URL: &str = "https://api.mobile.test/v1";
pub const REFRESH_PATH: &str = "/v1/auth/refresh-tokens";

type Handler = Box<dyn Fn(&RequestAttempt) -> Scripted + Send + Sync>;

/// Reply produced by a [`ScriptedTransport`] handler.
pub struct Scripted {
	pub response: RawResponse,
	pub delay: StdDuration,
}
impl Scripted {
	pub fn now(status: u16, body: Value) -> Self {
		Self { response: RawResponse::json(status, &body), delay: StdDuration::ZERO }
	}

	pub fn after(delay: StdDuration, status: u16, body: Value) -> Self {
		Self { response: RawResponse::json(status, &body), delay }
	}
}

/// Transport that answers from a closure and records every attempt it sees.
pub struct ScriptedTransport {
	handler: Handler,
	log: Mutex<Vec<RequestAttempt>>,
}
impl ScriptedTransport {
	pub fn new(handler: impl Fn(&RequestAttempt) -> Scripted + Send + Sync + 'static) -> Arc<Self> {
		Arc::new(Self { handler: Box::new(handler), log: Mutex::new(Vec::new()) })
	}

	pub fn attempts(&self) -> Vec<RequestAttempt> {
		self.log.lock().expect("Attempt log lock should not be poisoned.").clone()
	}

	pub fn attempts_to(&self, path: &str) -> Vec<RequestAttempt> {
		self.attempts().into_iter().filter(|attempt| attempt.url.path() == path).collect()
	}
}
impl HttpTransport for ScriptedTransport {
	fn send(&self, attempt: RequestAttempt) -> TransportFuture<'_> {
		Box::pin(async move {
			let reply = (self.handler)(&attempt);

			self.log.lock().expect("Attempt log lock should not be poisoned.").push(attempt);

			if !reply.delay.is_zero() {
				tokio::time::sleep(reply.delay).await;
			}

			Ok(reply.response)
		})
	}
}

/// Seeds an expired-session store: access `A1`, refresh `R1`, and a user record.
pub fn expired_session_store() -> Arc<MemoryStore> {
	Arc::new(MemoryStore::seeded([
		(CredentialSlot::AccessToken, "A1".to_owned()),
		(CredentialSlot::RefreshToken, "R1".to_owned()),
		(CredentialSlot::UserRecord, json!({ "id": 1, "name": "Ada" }).to_string()),
	]))
}

/// Builds a client over the scripted transport and restores the stored session.
pub async fn build_client(
	transport: Arc<ScriptedTransport>,
	store: Arc<MemoryStore>,
) -> AuthenticatedClient<ScriptedTransport> {
	let config = ClientConfig::builder(BASE_URL).build().expect("Test client config should build.");
	let store: Arc<dyn CredentialStore> = store;
	let client = AuthenticatedClient::with_transport(config, store, transport);

	client.restore_session().await;

	client
}

/// Successful refresh payload rotating to `A2`/`R2`.
pub fn rotated_tokens() -> Value {
	json!({
		"user": { "id": 1, "name": "Ada" },
		"tokens": { "access": { "token": "A2" }, "refresh": { "token": "R2" } },
	})
}
