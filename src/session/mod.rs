pub mod claims;
pub mod gate;
pub mod storage;
pub mod store;

pub use gate::SessionGate;
pub use storage::{FileStorage, MemoryStorage, NoopStorage, StorageBackend, StorageOp};
pub use store::{CredentialStore, SessionMarker, TokenPair};
