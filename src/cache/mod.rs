//! Local batch cache for template records.
//!
//! `BatchCache` is the index-addressable slot store (slot = serial_no - 1)
//! the fetch coordinator merges window results into. It distinguishes
//! "not fetched yet" from "server confirmed absent" so end-of-data is a
//! representable state, not an error.

pub mod batch;

pub use batch::{BatchCache, CacheSlot, MergeOutcome, Window};
