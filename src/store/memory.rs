//! Thread-safe in-memory [`TokenStore`] that lives for the process lifetime.

// self
use crate::{
	_prelude::*,
	auth::{SubjectId, TokenRecord},
	store::{StoreFuture, TokenStore},
};

type StoreMap = Arc<RwLock<HashMap<SubjectId, TokenRecord>>>;

/// Process-local token store. Records are lost on restart.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of stored subjects.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns true when nothing has been stored yet.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn put_now(map: StoreMap, record: TokenRecord) {
		map.write().insert(record.subject.clone(), record);
	}

	fn get_now(map: StoreMap, subject: &str) -> Option<TokenRecord> {
		map.read().get(subject).cloned()
	}

	fn snapshot_now(map: StoreMap) -> Vec<TokenRecord> {
		let mut records = map.read().values().cloned().collect::<Vec<_>>();

		records.sort_by(|a, b| a.subject.cmp(&b.subject));

		records
	}
}
impl TokenStore for MemoryStore {
	fn put(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			Self::put_now(map, record);

			Ok(())
		})
	}

	fn get<'a>(&'a self, subject: &'a SubjectId) -> StoreFuture<'a, Option<TokenRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::get_now(map, subject)) })
	}

	fn snapshot(&self) -> StoreFuture<'_, Vec<TokenRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::snapshot_now(map)) })
	}
}
