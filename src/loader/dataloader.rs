use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::future::try_join_all;
use tokio::sync::Mutex;

use crate::core::error::{ResolveError, Result};

const DEFAULT_MAX_BATCH_SIZE: usize = 1000;
const DEFAULT_YIELD_COUNT: usize = 10;

/// A batch fetch: given distinct keys, returns exactly one value per key, in key order.
#[async_trait]
pub trait BatchFn<K, V>: Send + Sync + 'static {
    async fn load(&self, keys: &[K]) -> Result<Vec<V>>;
}

/// Adapts a bare async function `Fn(Vec<K>) -> Future<Output = Result<Vec<V>>>`.
pub(crate) struct FnBatch<F>(pub(crate) F);

#[async_trait]
impl<K, V, F, Fut> BatchFn<K, V> for FnBatch<F>
where
    K: Clone + Send + Sync + 'static,
    V: Send + 'static,
    F: Fn(Vec<K>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<V>>> + Send + 'static,
{
    async fn load(&self, keys: &[K]) -> Result<Vec<V>> {
        (self.0)(keys.to_vec()).await
    }
}

struct LoaderState<K, V> {
    completed: HashMap<K, V>,
    failed: HashMap<K, ResolveError>,
    pending: Vec<K>,
    queued: HashSet<K>,
}

impl<K, V> LoaderState<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    fn lookup(&self, key: &K) -> Option<Result<V>> {
        if let Some(value) = self.completed.get(key) {
            return Some(Ok(value.clone()));
        }
        self.failed.get(key).map(|err| Err(err.clone()))
    }

    fn enqueue(&mut self, key: K) {
        if self.queued.insert(key.clone()) {
            self.pending.push(key);
        }
    }
}

/// Batches and deduplicates concurrent `load` calls.
///
/// Keys requested while other steps are still running are queued. The loader then
/// yields to the scheduler `yield_count` times so sibling steps get a chance to queue
/// their own keys, and the first caller to wake dispatches every queued key as one
/// batch. Values are cached for the lifetime of the loader.
pub struct DataLoader<K, V> {
    name: &'static str,
    batch: Arc<dyn BatchFn<K, V>>,
    state: Mutex<LoaderState<K, V>>,
    max_batch_size: usize,
    yield_count: usize,
    batches: AtomicUsize,
    keys_fetched: AtomicUsize,
}

impl<K, V> DataLoader<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a loader around any [`BatchFn`] implementation.
    pub fn new<F: BatchFn<K, V>>(batch: F) -> Self {
        Self::from_shared(std::any::type_name::<F>(), Arc::new(batch))
    }

    /// Creates a loader around a bare async batch function.
    pub fn from_fn<F, Fut>(batch: F) -> Self
    where
        F: Fn(Vec<K>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<V>>> + Send + 'static,
    {
        Self::from_shared(std::any::type_name::<F>(), Arc::new(FnBatch(batch)))
    }

    pub(crate) fn from_shared(name: &'static str, batch: Arc<dyn BatchFn<K, V>>) -> Self {
        DataLoader {
            name,
            batch,
            state: Mutex::new(LoaderState {
                completed: HashMap::new(),
                failed: HashMap::new(),
                pending: Vec::new(),
                queued: HashSet::new(),
            }),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            yield_count: DEFAULT_YIELD_COUNT,
            batches: AtomicUsize::new(0),
            keys_fetched: AtomicUsize::new(0),
        }
    }

    /// Caps how many keys a single batch may carry; larger windows are split.
    pub fn with_max_batch_size(self, max_batch_size: usize) -> Self {
        assert!(
            max_batch_size > 0,
            "Max batch size must be greater than 0"
        );
        DataLoader {
            max_batch_size,
            ..self
        }
    }

    /// Sets how many scheduler turns a load waits before dispatching its window.
    pub fn with_yield_count(self, yield_count: usize) -> Self {
        DataLoader {
            yield_count,
            ..self
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of batches dispatched so far.
    pub fn batch_count(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    /// Number of keys handed to the batch function so far.
    pub fn keys_fetched(&self) -> usize {
        self.keys_fetched.load(Ordering::SeqCst)
    }

    /// Loads one key, sharing the batch window with every concurrent caller.
    pub async fn load(&self, key: K) -> Result<V> {
        {
            let mut state = self.state.lock().await;
            if let Some(hit) = state.lookup(&key) {
                return hit;
            }
            state.enqueue(key.clone());
            if state.pending.len() >= self.max_batch_size {
                self.dispatch(&mut state).await;
                return self.settled(&state, &key);
            }
        }

        for _ in 0..self.yield_count {
            tokio::task::yield_now().await;
        }

        let mut state = self.state.lock().await;
        if let Some(hit) = state.lookup(&key) {
            return hit;
        }
        self.dispatch(&mut state).await;
        self.settled(&state, &key)
    }

    /// Loads several keys through the same batch window, preserving their order.
    pub async fn load_many(&self, keys: Vec<K>) -> Result<Vec<V>> {
        try_join_all(keys.into_iter().map(|key| self.load(key))).await
    }

    /// Seeds the cache. An existing entry for `key` is kept.
    pub async fn prime(&self, key: K, value: V) {
        let mut state = self.state.lock().await;
        state.failed.remove(&key);
        state.completed.entry(key).or_insert(value);
    }

    /// Forgets a cached value or failure so the next load fetches it again.
    pub async fn clear(&self, key: &K) {
        let mut state = self.state.lock().await;
        state.completed.remove(key);
        state.failed.remove(key);
    }

    fn settled(&self, state: &LoaderState<K, V>, key: &K) -> Result<V> {
        state.lookup(key).unwrap_or_else(|| {
            Err(ResolveError::BatchLoad(format!(
                "loader `{}` produced no value for a requested key",
                self.name
            )))
        })
    }

    async fn dispatch(&self, state: &mut LoaderState<K, V>) {
        while !state.pending.is_empty() {
            let mut batch = InFlight::take(self.name, state, self.max_batch_size);

            self.batches.fetch_add(1, Ordering::SeqCst);
            self.keys_fetched.fetch_add(batch.keys.len(), Ordering::SeqCst);
            log::debug!("loader `{}` dispatching {} keys", self.name, batch.keys.len());

            let outcome = self.batch.load(&batch.keys).await;
            batch.settle(outcome);
        }
    }
}

/// Keys drained from the queue for a batch that has not settled yet.
///
/// The dispatching caller can be dropped mid-batch, e.g. by a timeout. Dropping an
/// unsettled batch puts its keys back at the front of the queue so the remaining
/// waiters dispatch them again.
struct InFlight<'a, K: Clone + Eq + Hash, V> {
    loader: &'static str,
    state: &'a mut LoaderState<K, V>,
    keys: Vec<K>,
}

impl<'a, K: Clone + Eq + Hash, V> InFlight<'a, K, V> {
    fn take(loader: &'static str, state: &'a mut LoaderState<K, V>, max_batch_size: usize) -> Self {
        let take = state.pending.len().min(max_batch_size);
        let keys: Vec<K> = state.pending.drain(..take).collect();
        for key in &keys {
            state.queued.remove(key);
        }
        InFlight { loader, state, keys }
    }

    fn settle(&mut self, outcome: Result<Vec<V>>) {
        let keys = std::mem::take(&mut self.keys);
        match outcome {
            Ok(values) if values.len() == keys.len() => {
                self.state.completed.extend(keys.into_iter().zip(values));
            }
            Ok(values) => {
                let err = ResolveError::BatchLengthMismatch {
                    loader: self.loader,
                    expected: keys.len(),
                    actual: values.len(),
                };
                self.state.failed.extend(keys.into_iter().map(|key| (key, err.clone())));
            }
            Err(err) => {
                log::warn!("loader `{}` batch failed: {}", self.loader, err);
                self.state.failed.extend(keys.into_iter().map(|key| (key, err.clone())));
            }
        }
    }
}

impl<K: Clone + Eq + Hash, V> Drop for InFlight<'_, K, V> {
    fn drop(&mut self) {
        if self.keys.is_empty() {
            return;
        }
        log::debug!(
            "loader `{}` batch of {} keys abandoned, re-queueing",
            self.loader,
            self.keys.len()
        );
        let mut requeued = Vec::with_capacity(self.keys.len() + self.state.pending.len());
        for key in std::mem::take(&mut self.keys) {
            if self.state.queued.insert(key.clone()) {
                requeued.push(key);
            }
        }
        requeued.append(&mut self.state.pending);
        self.state.pending = requeued;
    }
}

/// Read-only counters of a provisioned loader, independent of its key and value types.
pub(crate) trait LoaderStats: Send + Sync {
    fn batches(&self) -> usize;
    fn keys(&self) -> usize;
}

impl<K, V> LoaderStats for DataLoader<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn batches(&self) -> usize {
        self.batch_count()
    }

    fn keys(&self) -> usize {
        self.keys_fetched()
    }
}
