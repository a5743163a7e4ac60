//! Persisted state: the regulation corpus and admin credentials

pub mod corpus;
pub mod credentials;
pub mod kv;

pub use corpus::CorpusStore;
pub use credentials::CredentialStore;
pub use kv::{FileStore, KeyValueStore, MemoryStore};
