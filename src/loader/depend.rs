use std::any::TypeId;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::context::Context;
use crate::core::error::{ResolveError, Result};
use crate::loader::config::LoaderConfig;
use crate::loader::dataloader::{BatchFn, DataLoader, FnBatch};
use crate::loader::handle::Loader;

/// Stable identity of a loader definition.
///
/// Built from the definition's `TypeId` and its fully qualified name, so two
/// definitions that share a name but live in different modules never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoaderKey {
    id: TypeId,
    name: &'static str,
}

impl LoaderKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        LoaderKey {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Module path and name of the definition.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for LoaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A loader defined as a type, the equivalent of a loader class.
///
/// The resolver builds one with `Default`, then injects every field listed in
/// [`CONFIG_FIELDS`](BatchLoad::CONFIG_FIELDS) from its [`LoaderConfig`] through
/// [`configure`](BatchLoad::configure) before the first batch is dispatched.
#[async_trait]
pub trait BatchLoad: Default + Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Send + Sync + 'static;
    type Value: Clone + Send + Sync + 'static;

    /// Config fields that must be supplied for every resolve call using this loader.
    const CONFIG_FIELDS: &'static [&'static str] = &[];

    /// Assigns one config field. Only called for names in `CONFIG_FIELDS`.
    fn configure(&mut self, field: &str, value: &Value) -> Result<(), serde_json::Error> {
        let _ = (field, value);
        Ok(())
    }

    /// Fetches one value per key, in key order.
    async fn batch_load(&self, keys: &[Self::Key]) -> Result<Vec<Self::Value>>;
}

struct ClassBatch<L>(L);

#[async_trait]
impl<L: BatchLoad> BatchFn<L::Key, L::Value> for ClassBatch<L> {
    async fn load(&self, keys: &[L::Key]) -> Result<Vec<L::Value>> {
        self.0.batch_load(keys).await
    }
}

type ClassBuilder<K, V> = fn(LoaderKey, &LoaderConfig) -> Result<Arc<dyn BatchFn<K, V>>>;

enum LoaderSource<K, V> {
    Class {
        config_fields: &'static [&'static str],
        build: ClassBuilder<K, V>,
    },
    Function {
        batch: Arc<dyn BatchFn<K, V>>,
    },
}

/// Declares that a resolver needs a loader.
///
/// Whether the loader is a [`BatchLoad`] type or a bare batch function is decided
/// here, once, when the schema is declared.
pub struct LoaderDepend<K, V> {
    key: LoaderKey,
    source: LoaderSource<K, V>,
}

impl<K, V> Clone for LoaderDepend<K, V> {
    fn clone(&self) -> Self {
        let source = match &self.source {
            LoaderSource::Class {
                config_fields,
                build,
            } => LoaderSource::Class {
                config_fields: *config_fields,
                build: *build,
            },
            LoaderSource::Function { batch } => LoaderSource::Function {
                batch: Arc::clone(batch),
            },
        };
        LoaderDepend {
            key: self.key,
            source,
        }
    }
}

impl<K, V> fmt::Debug for LoaderDepend<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.source {
            LoaderSource::Class { .. } => "class",
            LoaderSource::Function { .. } => "function",
        };
        f.debug_struct("LoaderDepend")
            .field("key", &self.key.name())
            .field("kind", &kind)
            .finish()
    }
}

impl<K, V> LoaderDepend<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Depends on a [`BatchLoad`] type.
    pub fn class<L>() -> Self
    where
        L: BatchLoad<Key = K, Value = V>,
    {
        LoaderDepend {
            key: LoaderKey::of::<L>(),
            source: LoaderSource::Class {
                config_fields: L::CONFIG_FIELDS,
                build: build_class::<L>,
            },
        }
    }

    /// Depends on a bare async batch function. No config is injected.
    pub fn function<F, Fut>(batch: F) -> Self
    where
        F: Fn(Vec<K>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<V>>> + Send + 'static,
    {
        LoaderDepend {
            key: LoaderKey::of::<F>(),
            source: LoaderSource::Function {
                batch: Arc::new(FnBatch(batch)),
            },
        }
    }

    pub fn key(&self) -> LoaderKey {
        self.key
    }

    /// Config fields the definition requires; always empty for functions.
    pub fn config_fields(&self) -> &'static [&'static str] {
        match self.source {
            LoaderSource::Class { config_fields, .. } => config_fields,
            LoaderSource::Function { .. } => &[],
        }
    }

    /// Builds a fresh loader instance, injecting config for class definitions.
    pub(crate) fn instantiate(&self, config: &LoaderConfig) -> Result<DataLoader<K, V>> {
        let batch = match &self.source {
            LoaderSource::Class { build, .. } => build(self.key, config)?,
            LoaderSource::Function { batch } => Arc::clone(batch),
        };
        Ok(DataLoader::from_shared(self.key.name(), batch))
    }
}

fn build_class<L: BatchLoad>(
    key: LoaderKey,
    config: &LoaderConfig,
) -> Result<Arc<dyn BatchFn<L::Key, L::Value>>> {
    let mut loader = L::default();
    let values = config.values_for(key);

    for &field in L::CONFIG_FIELDS {
        let value = values.and_then(|values| values.get(field)).ok_or(
            ResolveError::LoaderConfigValueMissing {
                loader: key.name(),
                field,
            },
        )?;
        loader
            .configure(field, value)
            .map_err(|err| ResolveError::LoaderConfigInvalid {
                loader: key.name(),
                field,
                reason: err.to_string(),
            })?;
    }

    Ok(Arc::new(ClassBatch(loader)))
}

/// What a resolver function receives besides its object.
///
/// Implemented for `()` (no dependency), [`LoaderDepend`] (one loader handle)
/// and tuples of dependencies.
pub trait Dependency: Send + Sync + 'static {
    type Handle: Send + 'static;

    fn provision(&self, ctx: &Context) -> Result<Self::Handle>;
}

impl Dependency for () {
    type Handle = ();

    fn provision(&self, _ctx: &Context) -> Result<()> {
        Ok(())
    }
}

impl<K, V> Dependency for LoaderDepend<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Handle = Loader<K, V>;

    fn provision(&self, ctx: &Context) -> Result<Loader<K, V>> {
        ctx.provision(self)
    }
}

impl<A: Dependency, B: Dependency> Dependency for (A, B) {
    type Handle = (A::Handle, B::Handle);

    fn provision(&self, ctx: &Context) -> Result<Self::Handle> {
        Ok((self.0.provision(ctx)?, self.1.provision(ctx)?))
    }
}

impl<A: Dependency, B: Dependency, C: Dependency> Dependency for (A, B, C) {
    type Handle = (A::Handle, B::Handle, C::Handle);

    fn provision(&self, ctx: &Context) -> Result<Self::Handle> {
        Ok((
            self.0.provision(ctx)?,
            self.1.provision(ctx)?,
            self.2.provision(ctx)?,
        ))
    }
}
