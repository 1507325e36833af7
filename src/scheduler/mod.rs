//! Discrete-event scheduling.
//!
//! The simulation is driven by a single [`EventQueue`] of pending net
//! changes. Each net has at most one live event; scheduling a net again
//! either keeps the earlier event ([`EventQueue::push`]) or replaces it
//! ([`EventQueue::reschedule`]).

mod queue;

pub use queue::EventQueue;
