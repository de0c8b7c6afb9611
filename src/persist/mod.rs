//! Persistence lifecycle for flat-file stores
//!
//! Decides whether a side-file is used, where it lives, and when it is
//! written:
//!
//! - load happens once, when the store is opened (a missing file means empty)
//! - save happens on an explicit call, or when a [`SaveGuard`] goes out of scope
//!
//! The row format lives in [`codec`].

pub mod codec;
pub mod guard;

pub use codec::{decode_field, encode_field, Columns, NULL_TOKEN};
pub use guard::SaveGuard;

use std::path::PathBuf;

/// File extension of flat-file stores
pub const FLAT_FILE_EXTENSION: &str = "csv";

/// Whether and where a store keeps its side-file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistOptions {
    /// Use a side-file at all
    pub use_cache: bool,

    /// Side-file location (derived from the owner's type name when unset)
    pub path: Option<PathBuf>,
}

impl Default for PersistOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            path: None,
        }
    }
}

impl PersistOptions {
    /// Persist to an explicit path
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            use_cache: true,
            path: Some(path.into()),
        }
    }

    /// Keep everything in memory
    pub fn disabled() -> Self {
        Self {
            use_cache: false,
            path: None,
        }
    }

    /// Side-file path for an owner of type `T`, or `None` when disabled
    pub fn resolve<T: ?Sized>(&self) -> Option<PathBuf> {
        if !self.use_cache {
            return None;
        }
        Some(
            self.path
                .clone()
                .unwrap_or_else(default_cache_path::<T>),
        )
    }
}

/// Default side-file for an owner type: `<TypeName>.csv` in the working directory
pub fn default_cache_path<T: ?Sized>() -> PathBuf {
    PathBuf::from(format!("{}.{}", short_type_name::<T>(), FLAT_FILE_EXTENSION))
}

/// Last path segment of a type name, without generic arguments
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
