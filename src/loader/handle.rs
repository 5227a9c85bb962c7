use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use crate::core::error::{ResolveError, Result};
use crate::loader::dataloader::DataLoader;

/// Handle to a loader provisioned for one resolve call.
///
/// The loader itself is owned by the call's context. Once the call returns the
/// handle is dangling and every method fails with
/// [`ResolveError::DependencyOutsideInvocation`].
pub struct Loader<K, V> {
    name: &'static str,
    inner: Weak<DataLoader<K, V>>,
}

impl<K, V> Clone for Loader<K, V> {
    fn clone(&self) -> Self {
        Loader {
            name: self.name,
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<K, V> fmt::Debug for Loader<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("name", &self.name)
            .field("bound", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl<K, V> Loader<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn bound(loader: &Arc<DataLoader<K, V>>) -> Self {
        Loader {
            name: loader.name(),
            inner: Arc::downgrade(loader),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the resolve call that provisioned this loader is still running.
    pub fn is_active(&self) -> bool {
        self.inner.strong_count() > 0
    }

    fn upgrade(&self) -> Result<Arc<DataLoader<K, V>>> {
        self.inner
            .upgrade()
            .ok_or(ResolveError::DependencyOutsideInvocation { loader: self.name })
    }

    pub async fn load(&self, key: K) -> Result<V> {
        let loader = self.upgrade()?;
        loader.load(key).await
    }

    pub async fn load_many(&self, keys: Vec<K>) -> Result<Vec<V>> {
        let loader = self.upgrade()?;
        loader.load_many(keys).await
    }

    pub async fn prime(&self, key: K, value: V) -> Result<()> {
        let loader = self.upgrade()?;
        loader.prime(key, value).await;
        Ok(())
    }

    pub async fn clear(&self, key: &K) -> Result<()> {
        let loader = self.upgrade()?;
        loader.clear(key).await;
        Ok(())
    }
}
