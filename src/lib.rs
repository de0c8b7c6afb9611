//! tiercache - layered key-value caches for slow lookups
//!
//! Keys resolve through an in-memory mapping, then local stores (SQLite
//! tables, CSV side-files), then throttled remote sources. Every answer
//! found deep in the chain is copied into the cheaper layers in front of it.
//!
//! ```rust,no_run
//! use tiercache::cache::{Layer, LayeredCache};
//! use tiercache::persist::{PersistOptions, SaveGuard};
//! use tiercache::remote::{FixtureSource, RemoteAdapter};
//! use tiercache::store::{FlatFileStore, SharedStore};
//! use tiercache::value::Scalar;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! # fn main() -> tiercache::CacheResult<()> {
//! let file: SharedStore<Scalar> = Rc::new(RefCell::new(
//!     FlatFileStore::<Scalar>::open(PersistOptions::at("gi2kegg.csv"))?,
//! ));
//! let _guard = SaveGuard::new(file.clone());
//!
//! let source = FixtureSource::new("stub").with_entry("16130957", Some("eco:b3061".to_string()));
//! let remote = RemoteAdapter::new(source).shared();
//!
//! let mut cache = LayeredCache::new(vec![Layer::store(file), Layer::remote(remote)]);
//! assert_eq!(cache.get("16130957")?, Some("eco:b3061".to_string()));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod persist;
pub mod remote;
pub mod store;
pub mod value;

pub use error::{CacheError, CacheResult};
