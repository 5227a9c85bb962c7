use std::any::type_name;
use std::time::Instant;

use futures::future::{BoxFuture, try_join_all};

use crate::core::context::Context;
use crate::core::error::{ResolveError, Result};
use crate::core::schema::{FieldResolver, PendingWrite, Resolvable, schema_of};
use crate::core::telemetry::Outcome;

/// Resolves every declared field of `object` concurrently, then runs its post hooks in order.
///
/// Field writes are held back until the whole fan-out has succeeded, and every hook
/// target is checked before the first write, so a failing field or a misdeclared
/// hook leaves the object untouched. Hooks only run once every field, and the
/// subtree below it, has settled.
pub(crate) fn resolve_object<'a, T: Resolvable>(
    object: &'a mut T,
    ctx: &'a Context,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let schema = schema_of::<T>();

        let writes: Vec<PendingWrite<T>> = {
            let snapshot: &T = object;
            try_join_all(
                schema
                    .resolvers
                    .iter()
                    .map(|field| resolve_field(snapshot, field, ctx)),
            )
            .await?
        };
        for hook in &schema.hooks {
            ensure_target::<T>(hook.target)?;
        }
        for write in writes {
            write(object);
        }

        for hook in &schema.hooks {
            log::trace!("[{}] {}: post `{}`", ctx.id(), type_name::<T>(), hook.target);
            (hook.run)(object);
        }
        Ok(())
    })
}

/// Runs one resolver of `object` and resolves what it produced.
async fn resolve_field<T: Resolvable>(
    object: &T,
    field: &FieldResolver<T>,
    ctx: &Context,
) -> Result<PendingWrite<T>> {
    let object_name = type_name::<T>();
    ensure_target::<T>(field.target)?;
    if ctx.is_strict() && field.annotation.is_none() {
        return Err(ResolveError::MissingReturnAnnotation {
            object: object_name,
            field: field.target,
        });
    }

    log::trace!("[{}] {}: resolving `{}`", ctx.id(), object_name, field.target);
    let started = Instant::now();
    let settled = match (field.step)(object, ctx) {
        Ok(pending) => pending.await,
        Err(err) => Err(err),
    };

    let outcome = match &settled {
        Ok(_) => Outcome::Resolved,
        Err(err) => {
            log::error!(
                "[{}] {}: field `{}` failed: {}",
                ctx.id(),
                object_name,
                field.target,
                err
            );
            Outcome::Failed(err.to_string())
        }
    };
    ctx.record_field(object_name, field.target, started, outcome);
    settled
}

fn ensure_target<T: Resolvable>(target: &'static str) -> Result<()> {
    if T::FIELDS.contains(&target) {
        Ok(())
    } else {
        Err(ResolveError::TargetAttributeNotFound {
            object: type_name::<T>(),
            target,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resolve::Resolve;
    use crate::core::schema::Schema;
    use crate::core::telemetry::{MemoryTelemetry, Telemetry};
    use crate::loader::config::LoaderConfig;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tokio::time::{Duration, sleep};

    #[derive(Debug, Default)]
    struct Leaf {
        id: u32,
        score: u32,
    }

    impl Resolvable for Leaf {
        const FIELDS: &'static [&'static str] = &["id", "score"];

        fn schema() -> Schema<Self> {
            Schema::new().resolve(
                "score",
                (),
                |leaf: &Self, ()| {
                    let id = leaf.id;
                    async move {
                        sleep(Duration::from_millis(u64::from(5 - id))).await;
                        Ok(id * 10)
                    }
                },
                |leaf, score| leaf.score = score,
            )
        }
    }

    #[derive(Debug, Default)]
    struct Branch {
        leaves: Vec<Leaf>,
        total: u32,
        hook_order: Vec<&'static str>,
    }

    impl Resolvable for Branch {
        const FIELDS: &'static [&'static str] = &["leaves", "total", "hook_order"];

        fn schema() -> Schema<Self> {
            Schema::new()
                .resolve(
                    "leaves",
                    (),
                    |_: &Self, ()| async { Ok((1..=3).map(|id| Leaf { id, score: 0 }).collect::<Vec<Leaf>>()) },
                    |branch, leaves| branch.leaves = leaves,
                )
                .post("total", |branch| {
                    branch.total = branch.leaves.iter().map(|leaf| leaf.score).sum();
                    branch.hook_order.push("total");
                })
                .post("hook_order", |branch| branch.hook_order.push("hook_order"))
        }
    }

    #[derive(Debug, Default)]
    struct Broken {
        name: String,
        extra: Value,
    }

    impl Resolvable for Broken {
        const FIELDS: &'static [&'static str] = &["name", "extra"];

        fn schema() -> Schema<Self> {
            Schema::new()
                .resolve(
                    "name",
                    (),
                    |_: &Self, ()| async { Ok("set".to_string()) },
                    |b, name| b.name = name,
                )
                .resolve_untyped(
                    "extra",
                    (),
                    |_: &Self, ()| async { Ok(json!({ "k": 1 })) },
                    |b, extra| b.extra = extra,
                )
        }
    }

    fn context(strict: bool) -> Context {
        Context::new(strict, Arc::new(LoaderConfig::new()), None)
    }

    #[tokio::test]
    async fn test_hooks_see_the_resolved_subtree() {
        let ctx = context(false);
        let mut branch = Branch::default();

        branch.resolve(&ctx).await.unwrap();

        let scores: Vec<u32> = branch.leaves.iter().map(|leaf| leaf.score).collect();
        assert_eq!(scores, vec![10, 20, 30]);
        assert_eq!(branch.total, 60);
        assert_eq!(branch.hook_order, vec!["total", "hook_order"]);
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_untyped_fields_without_writing() {
        let ctx = context(true);
        let mut broken = Broken::default();

        let err = broken.resolve(&ctx).await.unwrap_err();

        assert!(matches!(
            err,
            ResolveError::MissingReturnAnnotation { field: "extra", .. }
        ));
        assert_eq!(broken.name, "");
        assert_eq!(broken.extra, Value::Null);
    }

    #[tokio::test]
    async fn test_lenient_mode_accepts_untyped_fields() {
        let ctx = context(false);
        let mut broken = Broken::default();

        broken.resolve(&ctx).await.unwrap();

        assert_eq!(broken.name, "set");
        assert_eq!(broken.extra, json!({ "k": 1 }));
    }

    #[tokio::test]
    async fn test_each_field_is_traced() {
        let telemetry = Arc::new(MemoryTelemetry::new());
        let ctx = Context::new(
            false,
            Arc::new(LoaderConfig::new()),
            Some(telemetry.clone() as Arc<dyn Telemetry>),
        );
        let mut branch = Branch::default();

        branch.resolve(&ctx).await.unwrap();

        let traces = telemetry.get_traces();
        assert_eq!(traces.len(), 4);
        assert!(traces.iter().all(|t| t.outcome == Outcome::Resolved));
        assert_eq!(traces.iter().filter(|t| t.field == "score").count(), 3);
    }
}
