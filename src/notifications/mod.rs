pub mod read_tracker;
pub mod storage;

pub use read_tracker::NotificationReadTracker;
pub use storage::{FileStorage, LocalStorage, MemoryStorage, RedisStorage, StorageError};
