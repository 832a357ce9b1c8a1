//! Session-scoped caching.
//!
//! This cache lives in memory only and holds data that is cheap to refetch
//! but nice to keep around between screens (profile, news pages). It is
//! wiped as part of credential teardown so nothing identity-derived outlives
//! the session that produced it.

pub mod session;

pub use session::SessionCache;
