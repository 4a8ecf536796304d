//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{CredentialSlot, CredentialStore, StoreFuture},
};

type SlotMap = Arc<RwLock<HashMap<CredentialSlot, String>>>;

/// Storage backend that keeps slots in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(SlotMap);
impl MemoryStore {
	/// Returns a store pre-populated with the provided slot values.
	pub fn seeded(entries: impl IntoIterator<Item = (CredentialSlot, String)>) -> Self {
		Self(Arc::new(RwLock::new(entries.into_iter().collect())))
	}

	/// Synchronously reads a slot; handy for assertions.
	pub fn peek(&self, slot: CredentialSlot) -> Option<String> {
		self.0.read().get(&slot).cloned()
	}

	/// Returns `true` when no slot holds a value.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl CredentialStore for MemoryStore {
	fn get(&self, slot: CredentialSlot) -> StoreFuture<'_, Option<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(&slot).cloned()) })
	}

	fn set(&self, slot: CredentialSlot, value: String) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(slot, value);

			Ok(())
		})
	}

	fn remove(&self, slot: CredentialSlot) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().remove(&slot);

			Ok(())
		})
	}
}
