//! Real-time chat relay for the ordertalk backend.
//!
//! The crate keeps an in-memory registry of live WebSocket connections,
//! probes them for liveness, and relays chat envelopes between users,
//! admins and anonymous visitors.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
