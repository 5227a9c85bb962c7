//! # Resolvent
//!
//! Declarative, batched resolution of nested object graphs.
//!
//! A [`Resolvable`] type declares which of its fields are filled in by async
//! resolvers and which are derived afterwards by post hooks. Handing a root value
//! (an object, a `Vec` of objects, an `Option`, a tuple...) to [`resolve`] walks the
//! whole graph concurrently. Resolvers that need a data source declare a
//! [`LoaderDepend`], and every load issued against the same loader definition in
//! the same scheduling window is coalesced into a single batch call.
//!
//! ## Features
//!
//! - **Batched Loading**: One batch per loader per window, no matter how many objects ask
//! - **Per-Call Isolation**: Every resolve call gets its own loader instances and caches
//! - **Post Hooks**: Derived fields run once the subtree below them has settled
//! - **Injected Loader Config**: Loader types receive their settings from a [`LoaderConfig`]
//! - **Optional Traces**: Plug a [`Telemetry`] sink into the [`Resolver`] to time every field
//!
//! ## Quick Start
//!
//! ```rust
//! use resolvent::prelude::*;
//! use async_trait::async_trait;
//!
//! #[derive(Default)]
//! struct BookLoader;
//!
//! #[async_trait]
//! impl BatchLoad for BookLoader {
//!     type Key = u32;
//!     type Value = Vec<String>;
//!
//!     async fn batch_load(&self, keys: &[u32]) -> Result<Vec<Vec<String>>, ResolveError> {
//!         Ok(keys.iter().map(|id| vec![format!("book of #{}", id)]).collect())
//!     }
//! }
//!
//! #[derive(Debug, Default)]
//! struct Student {
//!     id: u32,
//!     books: Vec<String>,
//!     book_count: usize,
//! }
//!
//! impl Resolvable for Student {
//!     const FIELDS: &'static [&'static str] = &["id", "books", "book_count"];
//!
//!     fn schema() -> Schema<Self> {
//!         Schema::new()
//!             .resolve(
//!                 "books",
//!                 LoaderDepend::class::<BookLoader>(),
//!                 |student: &Self, loader| {
//!                     let id = student.id;
//!                     async move { loader.load(id).await }
//!                 },
//!                 |student, books| student.books = books,
//!             )
//!             .post("book_count", |student| student.book_count = student.books.len())
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let students = vec![
//!     Student { id: 1, ..Default::default() },
//!     Student { id: 2, ..Default::default() },
//! ];
//! let (students, report) = Resolver::new().resolve_with_report(students).await.unwrap();
//!
//! assert_eq!(students[1].books, vec!["book of #2".to_string()]);
//! assert_eq!(students[0].book_count, 1);
//! assert_eq!(report.usage_of::<BookLoader>().unwrap().batches, 1);
//! # });
//! ```
//!
//! ## Module Organization
//!
//! - [`loader`]: The batching primitive, loader definitions and loader config
//! - [`prelude`]: Commonly used types and traits (import with `use resolvent::prelude::*`)
//! - [`loader_prelude`]: Only what is needed to write loaders (import with `use resolvent::loader_prelude::*`)

// ============================================================================
// Core Module
// ============================================================================

mod core;

pub mod loader;

// ============================================================================
// Public Re-exports - Granular Imports
// ============================================================================

// Errors
pub use core::error::{ResolveError, Result};

// Declaring resolvable types
pub use core::resolve::Resolve;
pub use core::schema::{FieldResolver, PostHook, Resolvable, Schema};

// Running a resolve call
pub use core::context::{Context, LoaderUsage, ResolveReport};
pub use core::deferred::{Completer, Deferred, deferred};
pub use core::resolver::{Resolver, resolve};

// Traces
pub use core::telemetry::{MemoryTelemetry, Outcome, Telemetry, TraceEntry};

// Loaders
pub use loader::{
    BatchFn, BatchLoad, DataLoader, Dependency, Loader, LoaderConfig, LoaderDepend, LoaderKey,
    build_list, build_object,
};

// ============================================================================
// Prelude Modules - Convenient Bulk Imports
// ============================================================================

/// The main prelude: imports everything you need to declare and resolve graphs.
///
/// # Example
/// ```rust
/// use resolvent::prelude::*;
/// ```
pub mod prelude {
    pub use super::{
        // Loaders
        BatchFn,
        BatchLoad,
        Completer,
        // Resolving
        Context,
        DataLoader,
        Deferred,
        Loader,
        LoaderConfig,
        LoaderDepend,
        LoaderKey,
        // Traces
        MemoryTelemetry,
        Outcome,
        // Declaring
        Resolvable,
        Resolve,
        ResolveError,
        ResolveReport,
        Resolver,
        Schema,
        Telemetry,
        TraceEntry,
        build_list,
        build_object,
        deferred,
        resolve,
    };
}

/// Prelude for code that only defines loaders.
///
/// # Example
/// ```rust
/// use resolvent::loader_prelude::*;
/// ```
pub mod loader_prelude {
    pub use super::{
        BatchFn, BatchLoad, DataLoader, Loader, LoaderConfig, LoaderDepend, LoaderKey,
        ResolveError, build_list, build_object,
    };
}

// ============================================================================
// Re-export commonly used external types for convenience
// ============================================================================

pub use serde_json::Value as JsonValue;

// ============================================================================
// Library Metadata
// ============================================================================

/// The version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate.
pub const NAME: &str = env!("CARGO_PKG_NAME");
