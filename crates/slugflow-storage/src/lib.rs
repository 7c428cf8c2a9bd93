//! Object storage gateway for the build engine.
//!
//! Build inputs and outputs (source tarballs, slugs, Procfiles, buildpack
//! caches) live under string keys in an object store. This crate defines the
//! storage contract, the key grammar shared with the builder images, and two
//! backends: a filesystem driver for single-node installs and an in-memory
//! driver with operation tracing for tests.

pub mod error;
pub mod filesystem;
pub mod gateway;
pub mod memory;

pub use error::{Result, StorageError};
pub use filesystem::FilesystemStorage;
pub use gateway::{validate_key, ObjectState, ObjectStorage};
pub use memory::{MemoryStorage, StorageOp};
