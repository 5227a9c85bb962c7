use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use uuid::Uuid;

use crate::core::error::{ResolveError, Result};
use crate::core::telemetry::{Outcome, Telemetry, TraceEntry};
use crate::loader::config::LoaderConfig;
use crate::loader::dataloader::{DataLoader, LoaderStats};
use crate::loader::depend::{LoaderDepend, LoaderKey};
use crate::loader::handle::Loader;

struct Provisioned {
    instance: Arc<dyn Any + Send + Sync>,
    stats: Arc<dyn LoaderStats>,
}

struct Invocation {
    id: Uuid,
    strict: bool,
    config: Arc<LoaderConfig>,
    loaders: Mutex<HashMap<LoaderKey, Provisioned>>,
    telemetry: Option<Arc<dyn Telemetry>>,
}

/// State of one top-level resolve call.
///
/// Owns the loader instances provisioned during the call, at most one per loader
/// definition, and the config they are built from. Cloning the context clones a
/// handle to the same call. Loaders die with the last clone.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Invocation>,
}

impl Context {
    pub(crate) fn new(
        strict: bool,
        config: Arc<LoaderConfig>,
        telemetry: Option<Arc<dyn Telemetry>>,
    ) -> Self {
        Context {
            inner: Arc::new(Invocation {
                id: Uuid::new_v4(),
                strict,
                config,
                loaders: Mutex::new(HashMap::new()),
                telemetry,
            }),
        }
    }

    /// Identifier of the resolve call, as it appears in logs and traces.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn is_strict(&self) -> bool {
        self.inner.strict
    }

    /// Returns the call's instance of the loader `depend` describes, building it on first use.
    ///
    /// The lookup and the store happen under one lock with no await in between,
    /// so concurrent steps can never build two instances of the same definition.
    pub fn provision<K, V>(&self, depend: &LoaderDepend<K, V>) -> Result<Loader<K, V>>
    where
        K: Clone + Eq + Hash + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let key = depend.key();
        let mut loaders = self
            .inner
            .loaders
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(hit) = loaders.get(&key) {
            return match Arc::clone(&hit.instance).downcast::<DataLoader<K, V>>() {
                Ok(loader) => Ok(Loader::bound(&loader)),
                Err(_) => Err(ResolveError::LoaderTypeMismatch { loader: key.name() }),
            };
        }

        let loader = Arc::new(depend.instantiate(&self.inner.config)?);
        log::debug!("[{}] provisioned loader `{}`", self.inner.id, key);
        loaders.insert(
            key,
            Provisioned {
                instance: Arc::clone(&loader) as Arc<dyn Any + Send + Sync>,
                stats: Arc::clone(&loader) as Arc<dyn LoaderStats>,
            },
        );
        Ok(Loader::bound(&loader))
    }

    pub(crate) fn record_field(
        &self,
        object: &'static str,
        field: &'static str,
        started: Instant,
        outcome: Outcome,
    ) {
        if let Some(telemetry) = &self.inner.telemetry {
            telemetry.record(TraceEntry {
                invocation: self.inner.id,
                object: object.to_string(),
                field: field.to_string(),
                elapsed_us: started.elapsed().as_micros() as u64,
                outcome,
            });
        }
    }

    pub(crate) fn flush_telemetry(&self) {
        if let Some(telemetry) = &self.inner.telemetry {
            telemetry.flush();
        }
    }

    /// Warns about config entries for loaders this call never provisioned.
    pub(crate) fn warn_unused_config(&self) {
        let loaders = self
            .inner
            .loaders
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let used: HashSet<&str> = loaders.keys().map(LoaderKey::name).collect();
        for name in self.inner.config.loader_names() {
            if !used.contains(name) {
                log::warn!(
                    "[{}] config supplied for loader `{}` which was never used",
                    self.inner.id,
                    name
                );
            }
        }
    }

    pub(crate) fn report(&self) -> ResolveReport {
        let loaders = self
            .inner
            .loaders
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut usage: Vec<LoaderUsage> = loaders
            .iter()
            .map(|(key, provisioned)| LoaderUsage {
                key: *key,
                batches: provisioned.stats.batches(),
                keys: provisioned.stats.keys(),
            })
            .collect();
        usage.sort_by_key(|u| u.key.name());
        ResolveReport {
            invocation: self.inner.id,
            loaders: usage,
        }
    }
}

/// How one loader was used during a resolve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderUsage {
    pub key: LoaderKey,
    /// Batches dispatched.
    pub batches: usize,
    /// Distinct keys handed to the batch function.
    pub keys: usize,
}

/// Summary of a finished resolve call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveReport {
    pub invocation: Uuid,
    /// One entry per loader instance the call provisioned, ordered by name.
    pub loaders: Vec<LoaderUsage>,
}

impl ResolveReport {
    pub fn usage(&self, key: LoaderKey) -> Option<&LoaderUsage> {
        self.loaders.iter().find(|u| u.key == key)
    }

    /// Usage of the loader type `L`.
    pub fn usage_of<L: 'static>(&self) -> Option<&LoaderUsage> {
        self.usage(LoaderKey::of::<L>())
    }
}
