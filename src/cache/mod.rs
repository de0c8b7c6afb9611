//! Layered caches
//!
//! A [`LayeredCache`] owns an in-memory mapping and borrows an ordered list
//! of [`Layer`]s from whoever opened them. Lookups fall through the chain
//! from cheapest to most authoritative.
//!
//! # Operations
//!
//! | Operation | Memory | Layers | Refusals |
//! |-----------|--------|--------|----------|
//! | `get` | read, filled on a deeper hit | scanned in order, earlier ones back-filled | `NotWritable` skipped |
//! | `set` | written | every layer written | `NotWritable` skipped |
//! | `delete` | removed if present | only when memory missed | `NotWritable`, `NotFound` skipped |
//! | `purge` | removed | always | `NotWritable`, `NotFound` skipped |
//!
//! Only the memory mapping belongs to the cache. Saving and closing stores
//! is the job of their owner, usually through an [`OpenMap`].

pub mod layer;
pub mod layered;
pub mod open;
pub mod persistent;

pub use layer::{Layer, LayerHandle};
pub use layered::LayeredCache;
pub use open::OpenMap;
pub use persistent::PersistentMap;
