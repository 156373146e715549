pub mod memory;
pub mod models;
pub mod redb_store;
mod store;
mod tables;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;
pub use store::{Store, StoreError};
