use std::collections::VecDeque;

use futures::future::{self, BoxFuture, try_join_all};
use serde_json::Value;

use crate::core::context::Context;
use crate::core::engine;
use crate::core::error::Result;
use crate::core::schema::Resolvable;
use crate::loader::handle::Loader;

/// A value that can sit in a resolvable graph.
///
/// Every implementation falls in exactly one class:
/// - plain values (numbers, strings, JSON, loader handles) resolve as no-ops
/// - collections (`Vec`, `VecDeque`, arrays, `Option`, tuples) resolve every element
///   concurrently and never change their own shape
/// - [`Resolvable`] objects resolve their declared fields, then run their post hooks
pub trait Resolve: Send {
    fn resolve<'a>(&'a mut self, ctx: &'a Context) -> BoxFuture<'a, Result<()>>;
}

impl<T: Resolvable> Resolve for T {
    fn resolve<'a>(&'a mut self, ctx: &'a Context) -> BoxFuture<'a, Result<()>> {
        engine::resolve_object(self, ctx)
    }
}

/// Waits for every step, failing as soon as one fails.
///
/// Steps still pending when a sibling fails are dropped.
fn join_steps<'a>(steps: Vec<BoxFuture<'a, Result<()>>>) -> BoxFuture<'a, Result<()>> {
    match steps.len() {
        0 => Box::pin(future::ready(Ok(()))),
        _ => Box::pin(async move {
            try_join_all(steps).await?;
            Ok(())
        }),
    }
}

fn resolve_each<'a, T, I>(items: I, ctx: &'a Context) -> BoxFuture<'a, Result<()>>
where
    T: Resolve + 'a,
    I: IntoIterator<Item = &'a mut T>,
{
    join_steps(items.into_iter().map(|item| item.resolve(ctx)).collect())
}

impl<T: Resolve> Resolve for Vec<T> {
    fn resolve<'a>(&'a mut self, ctx: &'a Context) -> BoxFuture<'a, Result<()>> {
        resolve_each(self.iter_mut(), ctx)
    }
}

impl<T: Resolve> Resolve for VecDeque<T> {
    fn resolve<'a>(&'a mut self, ctx: &'a Context) -> BoxFuture<'a, Result<()>> {
        resolve_each(self.iter_mut(), ctx)
    }
}

impl<T: Resolve, const N: usize> Resolve for [T; N] {
    fn resolve<'a>(&'a mut self, ctx: &'a Context) -> BoxFuture<'a, Result<()>> {
        resolve_each(self.iter_mut(), ctx)
    }
}

impl<T: Resolve> Resolve for Option<T> {
    fn resolve<'a>(&'a mut self, ctx: &'a Context) -> BoxFuture<'a, Result<()>> {
        match self {
            Some(value) => value.resolve(ctx),
            None => Box::pin(future::ready(Ok(()))),
        }
    }
}

macro_rules! resolve_tuple {
    ($($name:ident),+) => {
        impl<$($name: Resolve),+> Resolve for ($($name,)+) {
            #[allow(non_snake_case)]
            fn resolve<'a>(&'a mut self, ctx: &'a Context) -> BoxFuture<'a, Result<()>> {
                let ($($name,)+) = self;
                join_steps(vec![$($name.resolve(ctx)),+])
            }
        }
    };
}

resolve_tuple!(A);
resolve_tuple!(A, B);
resolve_tuple!(A, B, C);
resolve_tuple!(A, B, C, D);

macro_rules! resolve_plain {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Resolve for $ty {
                fn resolve<'a>(&'a mut self, _ctx: &'a Context) -> BoxFuture<'a, Result<()>> {
                    Box::pin(future::ready(Ok(())))
                }
            }
        )+
    };
}

resolve_plain!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
    String, &'static str, Value,
);

impl<K: Send + Sync, V: Send + Sync> Resolve for Loader<K, V> {
    fn resolve<'a>(&'a mut self, _ctx: &'a Context) -> BoxFuture<'a, Result<()>> {
        Box::pin(future::ready(Ok(())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::Schema;
    use crate::loader::config::LoaderConfig;
    use std::sync::Arc;

    #[derive(Debug, Default, PartialEq)]
    struct Counter {
        seed: u32,
        doubled: u32,
    }

    impl Resolvable for Counter {
        const FIELDS: &'static [&'static str] = &["seed", "doubled"];

        fn schema() -> Schema<Self> {
            Schema::new().resolve(
                "doubled",
                (),
                |c: &Self, ()| {
                    let seed = c.seed;
                    async move { Ok(seed * 2) }
                },
                |c, doubled| c.doubled = doubled,
            )
        }
    }

    fn counter(seed: u32) -> Counter {
        Counter { seed, doubled: 0 }
    }

    fn context() -> Context {
        Context::new(false, Arc::new(LoaderConfig::new()), None)
    }

    #[tokio::test]
    async fn test_plain_values_are_untouched() {
        let ctx = context();
        let mut plain = (7u32, "text".to_string(), Value::Null);

        plain.resolve(&ctx).await.unwrap();

        assert_eq!(plain, (7, "text".to_string(), Value::Null));
    }

    #[tokio::test]
    async fn test_collections_resolve_every_element_in_place() {
        let ctx = context();
        let mut list = vec![counter(1), counter(2)];
        let mut array = [counter(3)];
        let mut deque: VecDeque<Counter> = VecDeque::from(vec![counter(4)]);
        let mut nested = (Some(counter(5)), None::<Counter>);

        list.resolve(&ctx).await.unwrap();
        array.resolve(&ctx).await.unwrap();
        deque.resolve(&ctx).await.unwrap();
        nested.resolve(&ctx).await.unwrap();

        assert_eq!(list.iter().map(|c| c.doubled).collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(array[0].doubled, 6);
        assert_eq!(deque[0].doubled, 8);
        assert_eq!(nested.0.map(|c| c.doubled), Some(10));
        assert!(nested.1.is_none());
    }

    #[tokio::test]
    async fn test_empty_collection_is_a_no_op() {
        let ctx = context();
        let mut empty: Vec<Counter> = Vec::new();

        empty.resolve(&ctx).await.unwrap();

        assert!(empty.is_empty());
    }
}
