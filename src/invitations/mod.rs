//! Project invitation lifecycle: pending invitations are accepted, declined
//! or left to expire. Persistence is delegated to an [`InvitationStore`].

pub mod lifecycle;
pub mod memory_store;
pub mod postgres_store;
pub mod store;
pub mod token;

pub use lifecycle::{InvitationError, InvitationLifecycle, DEFAULT_CACHE_CAPACITY};
pub use memory_store::MemoryInvitationStore;
pub use postgres_store::PgInvitationStore;
pub use store::{InvitationStore, StoreError};
