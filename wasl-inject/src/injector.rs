//! The injector — a registry of bindings — and the process-wide
//! active-injector registry.
//!
//! # Architecture
//! ```text
//! Injector::builder()  ──build()──>  Injector
//!                                       │
//!                                  register(arc)
//!                                       │
//!                                       ▼
//!                              active() ── consulted by every
//!                                          injection point
//! ```
//!
//! # Examples
//! ```rust,ignore
//! let injector = Injector::builder()
//!     .bind::<Config>().to_instance(Config::load())?
//!     .bind::<Database>().annotated("users").in_scope(Scope::Process)
//!         .to_factory(|| Ok(Database::connect("users")))
//!     .build();
//!
//! wasl_inject::register(Arc::new(injector));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{CantBeScopedError, InjectError, Result};
use crate::key::BindingKey;
use crate::provider::{Injectable, Invoker, Provider};
use crate::scope::Scope;

/// A registered `(provider, scope)` pair.
pub(crate) struct Binding {
    pub(crate) provider: Provider,
    pub(crate) scope: Option<Scope>,
}

/// An immutable registry mapping [`BindingKey`]s to providers and scopes.
///
/// Built with [`Injector::builder`]; activated process-wide with
/// [`register`].
pub struct Injector {
    bindings: HashMap<BindingKey, Binding>,
}

impl Injector {
    /// Creates a new builder.
    pub fn builder() -> InjectorBuilder {
        InjectorBuilder {
            bindings: HashMap::new(),
        }
    }

    /// Looks up a binding, falling back from `(type, annotation)` to
    /// `(type, None)` when the annotated key misses.
    pub(crate) fn binding(&self, key: &BindingKey) -> Option<&Binding> {
        if let Some(binding) = self.bindings.get(key) {
            return Some(binding);
        }
        if key.annotation().is_some() {
            return self.bindings.get(&key.without_annotation());
        }
        None
    }

    /// Returns `true` if a binding exists for `key` (without fallback).
    pub fn contains(&self, key: &BindingKey) -> bool {
        self.bindings.contains_key(key)
    }

    /// Number of registered bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if no bindings are registered.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Type names of every bound key, for "did you mean?" suggestions.
    pub(crate) fn bound_type_names(&self) -> Vec<&'static str> {
        self.bindings.keys().map(|k| k.type_name()).collect()
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("bindings", &self.bindings.len())
            .finish()
    }
}

// ═══════════════════════════════════════════
// InjectorBuilder
// ═══════════════════════════════════════════

/// Collects bindings for an [`Injector`].
///
/// Each `bind::<T>()` opens a [`Bind`] step that names the key and scope
/// and closes with the bound target. Rebinding a key overwrites the
/// previous binding.
pub struct InjectorBuilder {
    bindings: HashMap<BindingKey, Binding>,
}

impl InjectorBuilder {
    /// Starts a binding for type `T`.
    pub fn bind<T: Send + Sync + 'static>(self) -> Bind<T> {
        Bind {
            builder: self,
            key: BindingKey::of::<T>(),
            scope: None,
            _marker: PhantomData,
        }
    }

    /// Finalizes the injector.
    pub fn build(self) -> Injector {
        debug!(bindings = self.bindings.len(), "injector built");
        Injector {
            bindings: self.bindings,
        }
    }

    fn insert(mut self, key: BindingKey, binding: Binding) -> Self {
        if self.bindings.contains_key(&key) {
            debug!(key = %key, "rebinding overwrites previous binding");
        } else {
            debug!(key = %key, scope = ?binding.scope, "binding registered");
        }
        self.bindings.insert(key, binding);
        self
    }
}

/// One in-flight binding: key refinement, scope, then the target.
pub struct Bind<T: Send + Sync + 'static> {
    builder: InjectorBuilder,
    key: BindingKey,
    scope: Option<Scope>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> Bind<T> {
    /// Adds an annotation discriminator to the key.
    pub fn annotated(mut self, annotation: &'static str) -> Self {
        self.key = self.key.with_annotation(annotation);
        self
    }

    /// Names the scope for this binding.
    pub fn in_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Binds to a fallible constructor closure.
    pub fn to_factory(
        self,
        factory: impl Fn() -> Result<T> + Send + Sync + 'static,
    ) -> InjectorBuilder {
        let (builder, key, scope) = (self.builder, self.key, self.scope);
        builder.insert(
            key,
            Binding {
                provider: Provider::factory(factory),
                scope,
            },
        )
    }

    /// Binds to a pre-built value; every resolution returns the identical
    /// instance.
    ///
    /// # Errors
    /// [`InjectError::CantBeScoped`] if the binding names a caching scope.
    pub fn to_instance(self, value: T) -> Result<InjectorBuilder> {
        self.to_provider(Provider::instance(value))
    }

    /// Binds to an [`Invoker`] producing `T` from a method on `O`.
    pub fn to_invoker<O: Injectable>(self, invoker: Invoker<O, T>) -> InjectorBuilder {
        let (builder, key, scope) = (self.builder, self.key, self.scope);
        builder.insert(
            key,
            Binding {
                provider: Provider::invoker(invoker),
                scope,
            },
        )
    }

    /// Binds to an already-constructed provider.
    ///
    /// # Errors
    /// [`InjectError::CantBeScoped`] if `provider` is a fixed instance and
    /// the binding names a caching scope.
    pub fn to_provider(self, provider: Provider) -> Result<InjectorBuilder> {
        if let Some(scope) = self.scope {
            if scope.is_cached() && provider.is_fixed_instance() {
                return Err(InjectError::CantBeScoped(CantBeScopedError {
                    target: provider.target(),
                    scope,
                }));
            }
        }
        let (builder, key, scope) = (self.builder, self.key, self.scope);
        Ok(builder.insert(key, Binding { provider, scope }))
    }
}

// ═══════════════════════════════════════════
// Active-injector registry
// ═══════════════════════════════════════════

static ACTIVE: Lazy<RwLock<Option<Arc<Injector>>>> = Lazy::new(|| RwLock::new(None));

/// Makes `injector` the process-wide active injector.
///
/// Last-register-wins: a previously active injector is silently replaced,
/// with no stacking and no merging of bindings.
pub fn register(injector: Arc<Injector>) {
    debug!(bindings = injector.len(), "injector activated");
    *ACTIVE.write() = Some(injector);
}

/// Clears the active injector.
///
/// Afterwards every injection point falls back to its own provider-derived
/// default resolution.
pub fn unregister() {
    if ACTIVE.write().take().is_some() {
        debug!("injector deactivated");
    }
}

/// Returns the currently active injector, if any.
pub fn active() -> Option<Arc<Injector>> {
    ACTIVE.read().clone()
}
