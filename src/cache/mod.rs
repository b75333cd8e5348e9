//! Cache construction, the four-operation surface, and the entry guard.

pub mod config;
pub mod guard;
pub mod manager;

pub use config::CacheConfig;
pub use guard::BlockGuard;
pub use manager::BufferCache;
