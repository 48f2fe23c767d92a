//! In-memory reference stores
//!
//! Trait-based storage keeps backends pluggable; these implementations
//! carry the full contract (idempotent fingerprint insert, versioned
//! CAS updates, pending-session supersession) without persistence
//! across restarts.

pub mod order;
pub mod session;

pub use order::InMemoryOrderStore;
pub use session::InMemorySessionStore;
