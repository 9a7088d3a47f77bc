pub mod dedupe;
pub mod group_key;
pub mod group_store;
pub mod message_store;
pub mod multipart;
pub mod persistence;
pub mod read_store;
pub mod shared;

pub use group_store::GroupStore;
pub use message_store::MessageStore;
pub use persistence::{FilePersistence, MemoryPersistence, PersistenceError, PersistencePort};
pub use read_store::{PendingWrite, ReadStore};
pub use shared::SharedMessageStore;
