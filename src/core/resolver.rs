use std::sync::Arc;

use crate::core::context::{Context, ResolveReport};
use crate::core::error::Result;
use crate::core::resolve::Resolve;
use crate::core::telemetry::Telemetry;
use crate::loader::config::LoaderConfig;

/// Entry point of a resolve action.
///
/// A `Resolver` only carries options. Every call to [`resolve`](Resolver::resolve)
/// gets a fresh [`Context`], so loader instances are never shared between calls,
/// even concurrent ones made through the same `Resolver`.
#[derive(Clone, Default)]
pub struct Resolver {
    config: Arc<LoaderConfig>,
    strict: bool,
    telemetry: Option<Arc<dyn Telemetry>>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies config fields for [`BatchLoad`](crate::loader::BatchLoad) types.
    pub fn loader_config(self, config: LoaderConfig) -> Self {
        Resolver {
            config: Arc::new(config),
            ..self
        }
    }

    /// Requires every resolver to produce a statically typed value.
    pub fn strict(self, strict: bool) -> Self {
        Resolver { strict, ..self }
    }

    /// Records one trace entry per resolved field.
    pub fn telemetry(self, telemetry: Arc<dyn Telemetry>) -> Self {
        Resolver {
            telemetry: Some(telemetry),
            ..self
        }
    }

    /// Resolves `root` and hands it back.
    pub async fn resolve<T: Resolve>(&self, mut root: T) -> Result<T> {
        self.run(&mut root).await?;
        Ok(root)
    }

    /// Resolves `root` where it lives.
    pub async fn resolve_in_place<T: Resolve + ?Sized>(&self, root: &mut T) -> Result<()> {
        self.run(root).await.map(|_| ())
    }

    /// Resolves `root` and reports how every loader was used.
    pub async fn resolve_with_report<T: Resolve>(&self, mut root: T) -> Result<(T, ResolveReport)> {
        let report = self.run(&mut root).await?;
        Ok((root, report))
    }

    async fn run<T: Resolve + ?Sized>(&self, root: &mut T) -> Result<ResolveReport> {
        let ctx = Context::new(self.strict, Arc::clone(&self.config), self.telemetry.clone());
        log::debug!("[{}] resolve started", ctx.id());

        let outcome = root.resolve(&ctx).await;

        ctx.warn_unused_config();
        ctx.flush_telemetry();
        match &outcome {
            Ok(()) => log::debug!("[{}] resolve finished", ctx.id()),
            Err(err) => log::debug!("[{}] resolve aborted: {}", ctx.id(), err),
        }
        outcome.map(|()| ctx.report())
    }
}

/// Resolves `root` with default options.
pub async fn resolve<T: Resolve>(root: T) -> Result<T> {
    Resolver::new().resolve(root).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ResolveError;
    use crate::core::schema::{Resolvable, Schema};
    use crate::loader::depend::{BatchLoad, LoaderDepend};
    use crate::loader::handle::Loader;
    use async_trait::async_trait;

    #[derive(Default)]
    struct SquareLoader;

    #[async_trait]
    impl BatchLoad for SquareLoader {
        type Key = u32;
        type Value = u32;

        async fn batch_load(&self, keys: &[u32]) -> Result<Vec<u32>> {
            Ok(keys.iter().map(|k| k * k).collect())
        }
    }

    #[derive(Debug, Default)]
    struct Tile {
        side: u32,
        area: u32,
        loader: Option<Loader<u32, u32>>,
    }

    impl Resolvable for Tile {
        const FIELDS: &'static [&'static str] = &["side", "area", "loader"];

        fn schema() -> Schema<Self> {
            Schema::new()
                .resolve(
                    "area",
                    LoaderDepend::class::<SquareLoader>(),
                    |tile: &Self, loader| {
                        let side = tile.side;
                        async move { loader.load(side).await }
                    },
                    |tile, area| tile.area = area,
                )
                .resolve(
                    "loader",
                    LoaderDepend::class::<SquareLoader>(),
                    |_: &Self, loader| async move { Ok(Some(loader)) },
                    |tile, loader| tile.loader = loader,
                )
        }
    }

    fn tile(side: u32) -> Tile {
        Tile {
            side,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_resolve_returns_the_root() {
        let tiles = resolve(vec![tile(2), tile(3)]).await.unwrap();

        assert_eq!(tiles[0].area, 4);
        assert_eq!(tiles[1].area, 9);
    }

    #[tokio::test]
    async fn test_resolve_in_place() {
        let mut single = tile(5);

        Resolver::new().resolve_in_place(&mut single).await.unwrap();

        assert_eq!(single.area, 25);
    }

    #[tokio::test]
    async fn test_report_counts_batches_per_call() {
        let resolver = Resolver::new();

        let (_, first) = resolver
            .resolve_with_report(vec![tile(1), tile(2), tile(3)])
            .await
            .unwrap();
        let (_, second) = resolver.resolve_with_report(vec![tile(4)]).await.unwrap();

        let usage = first.usage_of::<SquareLoader>().unwrap();
        assert_eq!((usage.batches, usage.keys), (1, 3));
        let usage = second.usage_of::<SquareLoader>().unwrap();
        assert_eq!((usage.batches, usage.keys), (1, 1));
        assert_ne!(first.invocation, second.invocation);
    }

    #[tokio::test]
    async fn test_loader_is_dangling_after_the_call() {
        let resolved = resolve(tile(6)).await.unwrap();
        let loader = resolved.loader.unwrap();

        assert_eq!(
            loader.load(6).await.unwrap_err(),
            ResolveError::DependencyOutsideInvocation {
                loader: std::any::type_name::<SquareLoader>(),
            }
        );
    }
}
