#![cfg(feature = "reqwest")]

// std
use std::{
	env,
	sync::Arc,
	time::{SystemTime, UNIX_EPOCH},
};
// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use bearer_client::{
	auth::Credential,
	client::ReqwestAuthenticatedClient,
	config::{ClientConfig, RequestOptions},
	store::{CredentialSlot, CredentialStore, FileStore, MemoryStore},
};

fn build_config(server: &MockServer) -> ClientConfig {
	ClientConfig::builder(server.url("/v1"))
		.build()
		.expect("Mock server base URL should produce a valid client config.")
}

#[tokio::test]
async fn expired_access_token_is_refreshed_once_over_http() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;
	let expired = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/users/me").header("authorization", "Bearer A1");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"message\":\"jwt expired\"}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v1/auth/refresh-tokens")
				.json_body(json!({ "refreshToken": "R1" }));
			then.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"user\":{\"id\":7},\"tokens\":{\"access\":{\"token\":\"A2\"},\"refresh\":{\"token\":\"R2\"}}}",
				);
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/users/me").header("authorization", "Bearer A2");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":7,\"message\":\"ok\"}");
		})
		.await;
	let store = Arc::new(MemoryStore::seeded([
		(CredentialSlot::AccessToken, "A1".to_owned()),
		(CredentialSlot::RefreshToken, "R1".to_owned()),
	]));
	let client = ReqwestAuthenticatedClient::new(build_config(&server), store.clone())?;

	assert!(client.restore_session().await);

	let options = RequestOptions::default();
	let (first, second, third) = tokio::join!(
		client.get::<Value>("/users/me", &options),
		client.get::<Value>("/users/me", &options),
		client.get::<Value>("/users/me", &options),
	);

	for result in [first, second, third] {
		let response = result?;

		assert_eq!(response.data["id"], 7);
		assert_eq!(response.message.as_deref(), Some("ok"));
	}

	refresh.assert_calls_async(1).await;
	expired.assert_calls_async(3).await;
	accepted.assert_calls_async(3).await;

	assert_eq!(store.peek(CredentialSlot::AccessToken).as_deref(), Some("A2"));
	assert_eq!(store.peek(CredentialSlot::RefreshToken).as_deref(), Some("R2"));
	assert_eq!(client.current_user().await, Some(json!({ "id": 7 })));

	Ok(())
}

#[tokio::test]
async fn empty_success_body_decodes_as_unit() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/v1/sessions/42").header("authorization", "Bearer A1");
			then.status(204);
		})
		.await;
	let store = Arc::new(MemoryStore::default());
	let client = ReqwestAuthenticatedClient::new(build_config(&server), store)?;
	let credential = Credential::new("A1", "R1", Value::Null)?;

	client.establish_session(&credential).await;

	let response = client.delete::<()>("/sessions/42", &RequestOptions::default()).await?;

	assert!(response.success);
	assert!(response.message.is_none());

	mock.assert_calls_async(1).await;

	Ok(())
}

#[tokio::test]
async fn file_store_session_survives_a_new_client() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/orders").header("authorization", "Bearer A1");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let nanos = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
	let path = env::temp_dir().join(format!("bearer_client_it_{nanos}.json"));

	{
		let store: Arc<dyn CredentialStore> = Arc::new(FileStore::open(&path)?);
		let client = ReqwestAuthenticatedClient::new(build_config(&server), store)?;
		let credential = Credential::new("A1", "R1", json!({ "id": 3 }))?;

		client.establish_session(&credential).await;
	}

	let store: Arc<dyn CredentialStore> = Arc::new(FileStore::open(&path)?);
	let client = ReqwestAuthenticatedClient::new(build_config(&server), store)?;

	assert!(client.restore_session().await);
	assert_eq!(client.current_user().await, Some(json!({ "id": 3 })));

	let orders = client.get::<Vec<Value>>("/orders", &RequestOptions::default()).await?;

	assert!(orders.data.is_empty());

	mock.assert_calls_async(1).await;
	client.end_session().await;

	assert!(client.access_token().is_none());
	assert!(FileStore::open(&path)?.get(CredentialSlot::AccessToken).await?.is_none());

	std::fs::remove_file(&path)?;

	Ok(())
}
