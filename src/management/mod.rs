mod auth;
mod store;

pub use auth::TokenAuthority;
pub use store::FileStore;
pub use store::MemoryStore;
pub use store::SecretStore;
pub use store::keys;
