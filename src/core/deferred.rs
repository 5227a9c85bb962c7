use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::core::error::{ResolveError, Result};

/// Creates a pending value and the handle that completes it.
///
/// A resolver can hand the [`Deferred`] back as its result while some other task
/// finishes the work and calls [`Completer::complete`]. The field settles to the
/// completed value.
pub fn deferred<V>() -> (Completer<V>, Deferred<V>) {
    let (tx, rx) = oneshot::channel();
    (Completer { tx: Some(tx) }, Deferred { rx })
}

/// The pending side of [`deferred`]. Resolves to the completed value.
#[derive(Debug)]
pub struct Deferred<V> {
    rx: oneshot::Receiver<V>,
}

impl<V> Future for Deferred<V> {
    type Output = Result<V>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|settled| settled.map_err(|_| ResolveError::DeferredDropped))
    }
}

/// The completing side of [`deferred`].
#[derive(Debug)]
pub struct Completer<V> {
    tx: Option<oneshot::Sender<V>>,
}

impl<V> Completer<V> {
    /// Settles the deferred value. Returns `false` if nobody is waiting for it anymore.
    pub fn complete(mut self, value: V) -> bool {
        match self.tx.take() {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }
}

impl<V> Drop for Completer<V> {
    fn drop(&mut self) {
        if self.tx.is_some() {
            log::warn!("deferred value dropped before completion");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Duration};

    #[tokio::test]
    async fn test_deferred_settles_from_another_task() {
        let (completer, pending) = deferred();

        tokio::spawn(async move {
            sleep(Duration::from_millis(5)).await;
            completer.complete("hello");
        });

        assert_eq!(pending.await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_dropped_completer_fails_the_value() {
        let (completer, pending) = deferred::<u32>();
        drop(completer);

        assert_eq!(pending.await.unwrap_err(), ResolveError::DeferredDropped);
    }

    #[test]
    fn test_complete_without_waiter_reports_false() {
        let (completer, pending) = deferred::<u32>();
        drop(pending);

        assert!(!completer.complete(1));
    }
}
