//! Storage contract and the built-in in-memory token store.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{SubjectId, TokenRecord},
};

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for subject-keyed token records.
///
/// Writes are unconditional overwrites; concurrent writers for the same subject resolve as
/// last-writer-wins. Backends never evict expired records on their own.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Stores `record` under its subject, replacing any previous record wholesale.
	fn put(&self, record: TokenRecord) -> StoreFuture<'_, ()>;

	/// Fetches the record stored for `subject`, if any.
	fn get<'a>(&'a self, subject: &'a SubjectId) -> StoreFuture<'a, Option<TokenRecord>>;

	/// Returns every stored record, ordered by subject.
	fn snapshot(&self) -> StoreFuture<'_, Vec<TokenRecord>>;
}

/// Error type produced by [`TokenStore`] implementations.
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

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// self
	use super::*;

	#[test]
	fn store_error_converts_into_relay_error_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let relay_error: Error = store_error.clone().into();

		assert!(matches!(relay_error, Error::Storage(_)));
		assert!(relay_error.to_string().contains("database unreachable"));

		let source = StdError::source(&relay_error)
			.expect("Relay error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
