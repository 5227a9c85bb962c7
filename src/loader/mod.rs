//! The batching primitive and the loader definitions resolvers depend on.
//!
//! - [`DataLoader`] batches, deduplicates and caches concurrent `load` calls
//! - [`BatchLoad`] and [`LoaderDepend`] declare which loader a resolver needs
//! - [`Loader`] is the handle a resolver receives for the duration of one resolve call
//! - [`LoaderConfig`] supplies config fields to [`BatchLoad`] types
//! - [`build_list`] and [`build_object`] align batch rows with requested keys

pub mod build;
pub mod config;
pub mod dataloader;
pub mod depend;
pub mod handle;

pub use build::{build_list, build_object};
pub use config::LoaderConfig;
pub use dataloader::{BatchFn, DataLoader};
pub use depend::{BatchLoad, Dependency, LoaderDepend, LoaderKey};
pub use handle::Loader;
