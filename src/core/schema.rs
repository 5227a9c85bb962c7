use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use futures::future::BoxFuture;
use serde_json::Value;

use crate::core::context::Context;
use crate::core::error::{ResolveError, Result};
use crate::core::resolve::Resolve;
use crate::loader::depend::Dependency;

/// A write produced by a finished field step, applied once all siblings succeeded.
pub(crate) type PendingWrite<T> = Box<dyn FnOnce(&mut T) + Send>;

type FieldStep<T> =
    Box<dyn Fn(&T, &Context) -> Result<BoxFuture<'static, Result<PendingWrite<T>>>> + Send + Sync>;

/// A typed record whose fields are filled in by resolvers.
///
/// ```rust
/// use resolvent::prelude::*;
///
/// #[derive(Debug, Default)]
/// struct Student {
///     id: u32,
///     greeting: String,
///     shout: String,
/// }
///
/// impl Resolvable for Student {
///     const FIELDS: &'static [&'static str] = &["id", "greeting", "shout"];
///
///     fn schema() -> Schema<Self> {
///         Schema::new()
///             .resolve(
///                 "greeting",
///                 (),
///                 |student: &Self, ()| {
///                     let id = student.id;
///                     async move { Ok(format!("hello #{}", id)) }
///                 },
///                 |student, greeting| student.greeting = greeting,
///             )
///             .post("shout", |student| student.shout = student.greeting.to_uppercase())
///     }
/// }
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let student = resolve(Student { id: 7, ..Default::default() }).await.unwrap();
/// assert_eq!(student.shout, "HELLO #7");
/// # });
/// ```
pub trait Resolvable: Send + Sync + Sized + 'static {
    /// Every attribute the type declares. Resolver and hook targets must be listed here.
    const FIELDS: &'static [&'static str];

    /// The resolvers and post hooks of the type, in the order they are declared.
    ///
    /// Built once per type on first use and shared by every later resolve call.
    fn schema() -> Schema<Self>;
}

type SchemaCache = Mutex<HashMap<TypeId, &'static (dyn Any + Send + Sync)>>;

/// The schema of `T`, built on first use and kept for the life of the process.
pub(crate) fn schema_of<T: Resolvable>() -> &'static Schema<T> {
    static SCHEMAS: OnceLock<SchemaCache> = OnceLock::new();

    let entry = *SCHEMAS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(TypeId::of::<T>())
        .or_insert_with(|| {
            let schema: &'static Schema<T> = Box::leak(Box::new(T::schema()));
            schema as &'static (dyn Any + Send + Sync)
        });
    // Entries are keyed by `TypeId::of::<T>()`, so the cast always holds.
    entry
        .downcast_ref::<Schema<T>>()
        .unwrap_or_else(|| &*Box::leak(Box::new(T::schema())))
}

/// One resolver field of `T`.
pub struct FieldResolver<T> {
    pub(crate) target: &'static str,
    pub(crate) annotation: Option<&'static str>,
    pub(crate) step: FieldStep<T>,
}

impl<T> FieldResolver<T> {
    pub fn target(&self) -> &'static str {
        self.target
    }

    /// Type name of the value the resolver produces; `None` for untyped resolvers.
    pub fn annotation(&self) -> Option<&'static str> {
        self.annotation
    }
}

/// One post hook of `T`.
pub struct PostHook<T> {
    pub(crate) target: &'static str,
    pub(crate) run: Box<dyn Fn(&mut T) + Send + Sync>,
}

impl<T> PostHook<T> {
    pub fn target(&self) -> &'static str {
        self.target
    }
}

/// The resolvers and post hooks declared by a [`Resolvable`] type.
pub struct Schema<T> {
    pub(crate) resolvers: Vec<FieldResolver<T>>,
    pub(crate) hooks: Vec<PostHook<T>>,
}

impl<T> Default for Schema<T> {
    fn default() -> Self {
        Schema {
            resolvers: Vec::new(),
            hooks: Vec::new(),
        }
    }
}

impl<T: Resolvable> Schema<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a resolver for `target`.
    ///
    /// `resolver` receives the object and whatever `depend` provisions, and returns a
    /// future of the value. The value is resolved recursively, then handed to `write`.
    pub fn resolve<D, F, Fut, V>(
        self,
        target: &'static str,
        depend: D,
        resolver: F,
        write: fn(&mut T, V),
    ) -> Self
    where
        D: Dependency,
        F: Fn(&T, D::Handle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
        V: Resolve + 'static,
    {
        self.push(target, Some(type_name::<V>()), depend, resolver, |value| value, write)
    }

    /// Like [`resolve`](Schema::resolve), with `map` applied to the awaited value before
    /// it is resolved recursively. Typically used to turn fetched rows into resolvable objects.
    pub fn resolve_mapped<D, F, Fut, R, M, V>(
        self,
        target: &'static str,
        depend: D,
        resolver: F,
        map: M,
        write: fn(&mut T, V),
    ) -> Self
    where
        D: Dependency,
        F: Fn(&T, D::Handle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
        R: Send + 'static,
        M: Fn(R) -> V + Send + Sync + 'static,
        V: Resolve + 'static,
    {
        self.push(target, Some(type_name::<V>()), depend, resolver, map, write)
    }

    /// Declares a resolver producing a dynamic JSON value.
    ///
    /// Such resolvers carry no return annotation and are rejected in strict mode.
    pub fn resolve_untyped<D, F, Fut>(
        self,
        target: &'static str,
        depend: D,
        resolver: F,
        write: fn(&mut T, Value),
    ) -> Self
    where
        D: Dependency,
        F: Fn(&T, D::Handle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.push(target, None, depend, resolver, |value| value, write)
    }

    /// Declares a hook run after every field of the object, and everything below
    /// them, has resolved.
    pub fn post<H>(mut self, target: &'static str, hook: H) -> Self
    where
        H: Fn(&mut T) + Send + Sync + 'static,
    {
        self.hooks.push(PostHook {
            target,
            run: Box::new(hook),
        });
        self
    }

    pub fn resolvers(&self) -> &[FieldResolver<T>] {
        &self.resolvers
    }

    pub fn hooks(&self) -> &[PostHook<T>] {
        &self.hooks
    }

    fn push<D, F, Fut, R, M, V>(
        mut self,
        target: &'static str,
        annotation: Option<&'static str>,
        depend: D,
        resolver: F,
        map: M,
        write: fn(&mut T, V),
    ) -> Self
    where
        D: Dependency,
        F: Fn(&T, D::Handle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
        R: Send + 'static,
        M: Fn(R) -> V + Send + Sync + 'static,
        V: Resolve + 'static,
    {
        let map = Arc::new(map);
        let step = move |object: &T, ctx: &Context| -> Result<BoxFuture<'static, Result<PendingWrite<T>>>> {
            let handle = depend.provision(ctx)?;
            let pending = resolver(object, handle);
            let map = Arc::clone(&map);
            let ctx = ctx.clone();
            Ok(Box::pin(async move {
                let mut value = map(pending.await?);
                value.resolve(&ctx).await?;
                let write: PendingWrite<T> = Box::new(move |object: &mut T| write(object, value));
                Ok::<_, ResolveError>(write)
            }))
        };
        self.resolvers.push(FieldResolver {
            target,
            annotation,
            step: Box::new(step),
        });
        self
    }
}
