//! # Synchronization Primitives
//!
//! Every suspension point in the protocol is a counting semaphore:
//!
//! ```text
//! Worker ── going to queue ──> [turnstile] ──> [oxygen_queue / hydrogen_queue]
//!                                                  │
//!                          creating ──> [all_present] (oxygen only)
//!                                                  │
//!                          bonding  ──> [bonded] x3
//!                                                  │
//!                          staging  ──> [release] x3 ──> [bookkeeping] (oxygen only)
//! ```
//!
//! Counters live elsewhere (see [`crate::state`]). These primitives only park
//! and wake threads, and each wakeup corresponds to exactly one permit.

mod semaphore;

pub use semaphore::{Closed, Semaphore};
