//! Providers — zero-argument factories behind every resolution.
//!
//! A [`Provider`] produces one instance per call. Three kinds exist:
//!
//! - *factory provider* — runs a fallible constructor closure every call;
//! - *instance provider* — returns the same pre-built value every call,
//!   never a copy;
//! - *invoker provider* — resolves an owning instance through the full
//!   resolver, then calls a method on it ([`Invoker`]).
//!
//! Scope caches key their entries by [`ProviderId`], so a provider created
//! once at binding/declaration time keeps a stable cache identity for the
//! life of the binding.

use std::any::{Any, TypeId};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::error::Result;
use crate::point::InjectionPoint;
use crate::scope::Scope;

/// A type-erased, reference-counted resolved value.
pub type Instance = Arc<dyn Any + Send + Sync>;

type ProduceFn = Arc<dyn Fn() -> Result<Instance> + Send + Sync>;

/// Cache identity of a provider.
///
/// Allocated from a process-wide counter; clones of a [`Provider`] share
/// the id, distinct providers never do.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ProviderId(u64);

fn next_provider_id() -> ProviderId {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    ProviderId(COUNTER.fetch_add(1, Ordering::Relaxed))
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum ProviderKind {
    Factory,
    Fixed,
    Invoker,
}

/// A zero-argument factory producing instances of one target type.
///
/// Owns no external resources; invoking it either constructs a fresh value
/// (factory/invoker kind) or hands back the same pre-existing value (fixed
/// kind). Cloning is cheap and preserves the cache identity.
#[derive(Clone)]
pub struct Provider {
    id: ProviderId,
    kind: ProviderKind,
    target: &'static str,
    default_scope: Option<Scope>,
    produce: ProduceFn,
}

impl Provider {
    /// Wraps a fallible constructor closure.
    pub fn factory<T: Send + Sync + 'static>(
        f: impl Fn() -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: next_provider_id(),
            kind: ProviderKind::Factory,
            target: std::any::type_name::<T>(),
            default_scope: None,
            produce: Arc::new(move || Ok(Arc::new(f()?) as Instance)),
        }
    }

    /// Wraps a pre-built value; every call returns the identical `Arc`.
    pub fn instance<T: Send + Sync + 'static>(value: T) -> Self {
        let shared: Arc<T> = Arc::new(value);
        Self {
            id: next_provider_id(),
            kind: ProviderKind::Fixed,
            target: std::any::type_name::<T>(),
            default_scope: None,
            produce: Arc::new(move || Ok(shared.clone() as Instance)),
        }
    }

    /// Wraps an [`Invoker`]: each call resolves the owning instance and
    /// invokes the method on it.
    pub fn invoker<O: Injectable, R: Send + Sync + 'static>(invoker: Invoker<O, R>) -> Self {
        Self {
            id: next_provider_id(),
            kind: ProviderKind::Invoker,
            target: std::any::type_name::<R>(),
            default_scope: None,
            produce: Arc::new(move || Ok(Arc::new(invoker.call()?) as Instance)),
        }
    }

    /// Declares the scope this provider prefers when neither the injection
    /// point nor the binding names one.
    pub fn with_default_scope(mut self, scope: Scope) -> Self {
        self.default_scope = Some(scope);
        self
    }

    /// Produces one instance.
    pub fn call(&self) -> Result<Instance> {
        (self.produce)()
    }

    /// Returns the cache identity.
    #[inline]
    pub fn id(&self) -> ProviderId {
        self.id
    }

    /// Full name of the produced type, for diagnostics.
    #[inline]
    pub fn target(&self) -> &'static str {
        self.target
    }

    #[inline]
    pub(crate) fn is_fixed_instance(&self) -> bool {
        self.kind == ProviderKind::Fixed
    }

    #[inline]
    pub(crate) fn default_scope(&self) -> Option<Scope> {
        self.default_scope
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("target", &self.target)
            .field("default_scope", &self.default_scope)
            .finish()
    }
}

// ═══════════════════════════════════════════
// Injectable
// ═══════════════════════════════════════════

/// A type that can act as its own provider.
///
/// Implementing this gives injection points a default factory when no
/// binding overrides them, and lets the type declare the scope it should
/// be cached under when injected:
///
/// ```rust,ignore
/// impl Injectable for ConnectionPool {
///     fn construct() -> Result<Self> {
///         Ok(ConnectionPool::connect()?)
///     }
///
///     fn default_scope() -> Scope {
///         Scope::Process
///     }
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Builds a fresh instance, resolving any dependencies of its own
    /// through the active injector.
    fn construct() -> Result<Self>;

    /// The scope used when neither the injection point nor a binding
    /// names one.
    fn default_scope() -> Scope {
        Scope::None
    }
}

// One canonical provider per Injectable type. Interning keeps the cache
// identity stable across independently declared injection points, so
// process scope still means "once per type" for default resolution.
static TYPE_PROVIDERS: Lazy<DashMap<TypeId, Provider>> = Lazy::new(DashMap::new);

pub(crate) fn type_provider<T: Injectable>() -> Provider {
    TYPE_PROVIDERS
        .entry(TypeId::of::<T>())
        .or_insert_with(|| {
            Provider::factory(T::construct).with_default_scope(T::default_scope())
        })
        .clone()
}

// ═══════════════════════════════════════════
// Invoker
// ═══════════════════════════════════════════

/// Adapts an unbound method into a zero-argument provider.
///
/// Calling the invoker resolves an `Arc<O>` through the full resolver —
/// honoring bindings and using the invoker's own scope, or `O`'s declared
/// default when unset — then calls the method on it.
///
/// An invoker is a transparent stand-in for the method it wraps: it
/// compares and hashes identically to the bare `fn` pointer, so either can
/// be used as a map key interchangeably. Only `fn(&O) -> R` methods are
/// wrappable; a zero-argument function needs no adapting and goes straight
/// into [`Provider::factory`].
pub struct Invoker<O: Injectable, R: Send + Sync + 'static> {
    method: fn(&O) -> R,
    scope: Option<Scope>,
}

impl<O: Injectable, R: Send + Sync + 'static> Invoker<O, R> {
    /// Wraps an unbound method.
    pub fn new(method: fn(&O) -> R) -> Self {
        Self {
            method,
            scope: None,
        }
    }

    /// Sets the scope used when resolving the owning instance.
    pub fn in_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Resolves the owning instance and calls the method on it.
    pub fn call(&self) -> Result<R> {
        let owner = self.owner()?;
        Ok((self.method)(owner.as_ref()))
    }

    fn owner(&self) -> Result<Arc<O>> {
        let mut point = InjectionPoint::<O>::of("invoker.owner");
        if let Some(scope) = self.scope {
            point = point.in_scope(scope)?;
        }
        point.resolve()
    }
}

impl<O: Injectable, R: Send + Sync + 'static> Clone for Invoker<O, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O: Injectable, R: Send + Sync + 'static> Copy for Invoker<O, R> {}

impl<O: Injectable, R: Send + Sync + 'static> PartialEq for Invoker<O, R> {
    fn eq(&self, other: &Self) -> bool {
        self.method == other.method
    }
}

impl<O: Injectable, R: Send + Sync + 'static> Eq for Invoker<O, R> {}

impl<O: Injectable, R: Send + Sync + 'static> PartialEq<fn(&O) -> R> for Invoker<O, R> {
    fn eq(&self, other: &fn(&O) -> R) -> bool {
        self.method == *other
    }
}

impl<O: Injectable, R: Send + Sync + 'static> Hash for Invoker<O, R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.method.hash(state);
    }
}

// Lets a HashMap keyed by Invoker be queried with the bare method.
impl<O: Injectable, R: Send + Sync + 'static> Borrow<fn(&O) -> R> for Invoker<O, R> {
    fn borrow(&self) -> &fn(&O) -> R {
        &self.method
    }
}

impl<O: Injectable, R: Send + Sync + 'static> fmt::Debug for Invoker<O, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invoker({}::<method>, scope={:?})",
            std::any::type_name::<O>(),
            self.scope
        )
    }
}
