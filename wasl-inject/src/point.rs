//! Injection points and the resolution algorithm.
//!
//! An [`InjectionPoint`] is a declarative descriptor: a member name, a
//! [`BindingKey`], an optional explicit provider, an optional scope. Two
//! surface forms share its `resolve`:
//!
//! - [`Attr`] — a lazy struct field, resolved on first read and cached on
//!   the owning instance. Lazy points can close dependency cycles.
//! - [`provide`] / [`fill`] — parameter-style resolution, fresh on every
//!   call, immediately before the function body runs. Eager points cannot
//!   close a cycle on their own.
//!
//! Resolution order: a binding in the active injector always wins, then
//! the point's explicit provider, then the type's own [`Injectable`]
//! constructor; otherwise the point fails with
//! [`InjectError::NoProvider`].

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::trace;

use wasl_support::rendering::suggest_similar;

use crate::error::{CantBeScopedError, InjectError, NoProviderError, Result};
use crate::injector::{Injector, active};
use crate::key::BindingKey;
use crate::provider::{Injectable, Provider, type_provider};
use crate::scope::{self, Scope};

const MAX_SUGGESTIONS: usize = 3;

/// A declared dependency: where it sits, what it needs, how to cache it.
///
/// Immutable once declared; the builder methods consume `self` and are
/// meant to run at declaration time.
pub struct InjectionPoint<T: Send + Sync + 'static> {
    member: &'static str,
    key: BindingKey,
    provider: Option<Provider>,
    scope: Option<Scope>,
    fallback: Option<Provider>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> InjectionPoint<T> {
    /// Declares a point for an [`Injectable`] type.
    ///
    /// When no binding and no explicit provider apply, the type constructs
    /// itself via [`Injectable::construct`].
    pub fn of(member: &'static str) -> Self {
        Self {
            member,
            key: BindingKey::of::<T>(),
            provider: None,
            scope: None,
            fallback: Some(type_provider::<T>()),
            _marker: PhantomData,
        }
    }
}

impl<T: Send + Sync + 'static> InjectionPoint<T> {
    /// Declares a point with no default provider.
    ///
    /// Resolution requires a binding in the active injector or an explicit
    /// provider on the point.
    pub fn new(member: &'static str) -> Self {
        Self {
            member,
            key: BindingKey::of::<T>(),
            provider: None,
            scope: None,
            fallback: None,
            _marker: PhantomData,
        }
    }

    /// Adds an annotation discriminator to the key.
    pub fn annotated(mut self, annotation: &'static str) -> Self {
        self.key = self.key.with_annotation(annotation);
        self
    }

    /// Names an explicit scope, overriding a binding's scope and the
    /// provider type's default.
    ///
    /// # Errors
    /// [`InjectError::CantBeScoped`] if the point already carries a fixed
    /// instance and `scope` caches.
    pub fn in_scope(mut self, scope: Scope) -> Result<Self> {
        if scope.is_cached() {
            if let Some(provider) = &self.provider {
                if provider.is_fixed_instance() {
                    return Err(InjectError::CantBeScoped(CantBeScopedError {
                        target: provider.target(),
                        scope,
                    }));
                }
            }
        }
        self.scope = Some(scope);
        Ok(self)
    }

    /// Supplies an explicit constructor closure.
    pub fn with_factory(mut self, factory: impl Fn() -> Result<T> + Send + Sync + 'static) -> Self {
        self.provider = Some(Provider::factory(factory));
        self
    }

    /// Supplies a fixed value; resolution returns the identical instance
    /// every time.
    ///
    /// # Errors
    /// [`InjectError::CantBeScoped`] if the point already names a caching
    /// scope.
    pub fn with_value(self, value: T) -> Result<Self> {
        self.with_provider(Provider::instance(value))
    }

    /// Supplies an explicit provider.
    ///
    /// # Errors
    /// [`InjectError::CantBeScoped`] for a fixed instance paired with a
    /// caching scope.
    pub fn with_provider(mut self, provider: Provider) -> Result<Self> {
        if let Some(scope) = self.scope {
            if scope.is_cached() && provider.is_fixed_instance() {
                return Err(InjectError::CantBeScoped(CantBeScopedError {
                    target: provider.target(),
                    scope,
                }));
            }
        }
        self.provider = Some(provider);
        Ok(self)
    }

    /// Member name this point was declared under.
    pub fn member(&self) -> &'static str {
        self.member
    }

    /// The resolution key.
    pub fn key(&self) -> &BindingKey {
        &self.key
    }

    /// Resolves one instance.
    ///
    /// Consults the active injector first (annotated lookup falling back
    /// to the plain key), then the point's own provider or the type's
    /// constructor; wraps the chosen provider in the chosen scope and
    /// invokes it.
    pub fn resolve(&self) -> Result<Arc<T>> {
        let injector = active();
        let (provider, scope) = self.select(injector.as_deref())?;

        trace!(
            member = self.member,
            key = %self.key,
            %scope,
            "resolving injection point"
        );

        let instance = scope::apply(scope, &provider)?;
        instance
            .downcast::<T>()
            .map_err(|_| InjectError::ConstructionFailed {
                key: self.key.clone(),
                source: format!(
                    "type mismatch: expected {}, provider produced {}",
                    std::any::type_name::<T>(),
                    provider.target()
                )
                .into(),
            })
    }

    /// Picks `(provider, scope)` per the precedence rules.
    ///
    /// Scope precedence: point's explicit scope, else the binding's, else
    /// the provider's declared default, else no-scope.
    fn select(&self, injector: Option<&Injector>) -> Result<(Provider, Scope)> {
        if let Some(injector) = injector {
            if let Some(binding) = injector.binding(&self.key) {
                let scope = self
                    .scope
                    .or(binding.scope)
                    .or(binding.provider.default_scope())
                    .unwrap_or(Scope::None);
                return Self::checked(binding.provider.clone(), scope);
            }
        }

        if let Some(provider) = self.provider.clone().or_else(|| self.fallback.clone()) {
            let scope = self
                .scope
                .or(provider.default_scope())
                .unwrap_or(Scope::None);
            return Self::checked(provider, scope);
        }

        Err(InjectError::NoProvider(NoProviderError {
            requested: self.key.clone(),
            member: self.member,
            suggestions: injector
                .map(|i| {
                    suggest_similar(
                        self.key.type_name(),
                        &i.bound_type_names(),
                        MAX_SUGGESTIONS,
                    )
                })
                .unwrap_or_default(),
        }))
    }

    // Cross-site combinations (point scope x binding provider) can only be
    // seen here, so the fixed-instance rule is enforced once more.
    fn checked(provider: Provider, scope: Scope) -> Result<(Provider, Scope)> {
        if scope.is_cached() && provider.is_fixed_instance() {
            return Err(InjectError::CantBeScoped(CantBeScopedError {
                target: provider.target(),
                scope,
            }));
        }
        Ok((provider, scope))
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for InjectionPoint<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionPoint")
            .field("member", &self.member)
            .field("key", &self.key)
            .field("scope", &self.scope)
            .field("explicit_provider", &self.provider.is_some())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Attr — attribute-style (lazy) form
// ═══════════════════════════════════════════

/// A lazily injected struct field.
///
/// The field only carries the descriptor; the dependency is not requested
/// until the first [`get`](Attr::get), and the resolved instance is then
/// cached on this owner. The per-owner cache is independent of scope:
/// scope governs provider reuse *across* owners, the cell governs reuse
/// *within* one owner.
///
/// Because the referenced instance is requested only after both ends of an
/// edge exist, `Attr` edges can close dependency cycles.
///
/// ```rust,ignore
/// struct OrderService {
///     mailer: Attr<Mailer>,
/// }
///
/// impl Injectable for OrderService {
///     fn construct() -> Result<Self> {
///         Ok(OrderService { mailer: Attr::of("mailer") })
///     }
/// }
/// ```
pub struct Attr<T: Send + Sync + 'static> {
    point: InjectionPoint<T>,
    cell: OnceCell<Arc<T>>,
}

impl<T: Injectable> Attr<T> {
    /// Declares a lazy field for an [`Injectable`] type.
    pub fn of(member: &'static str) -> Self {
        Self {
            point: InjectionPoint::of(member),
            cell: OnceCell::new(),
        }
    }
}

impl<T: Send + Sync + 'static> Attr<T> {
    /// Declares a lazy field with no default provider.
    pub fn new(member: &'static str) -> Self {
        Self {
            point: InjectionPoint::new(member),
            cell: OnceCell::new(),
        }
    }

    /// See [`InjectionPoint::annotated`].
    pub fn annotated(self, annotation: &'static str) -> Self {
        Self {
            point: self.point.annotated(annotation),
            cell: self.cell,
        }
    }

    /// See [`InjectionPoint::in_scope`].
    pub fn in_scope(self, scope: Scope) -> Result<Self> {
        Ok(Self {
            point: self.point.in_scope(scope)?,
            cell: self.cell,
        })
    }

    /// See [`InjectionPoint::with_factory`].
    pub fn with_factory(self, factory: impl Fn() -> Result<T> + Send + Sync + 'static) -> Self {
        Self {
            point: self.point.with_factory(factory),
            cell: self.cell,
        }
    }

    /// See [`InjectionPoint::with_value`].
    pub fn with_value(self, value: T) -> Result<Self> {
        Ok(Self {
            point: self.point.with_value(value)?,
            cell: self.cell,
        })
    }

    /// Resolves on first access, afterwards returns the cached instance.
    ///
    /// A failed resolution is not cached; the next read retries.
    pub fn get(&self) -> Result<Arc<T>> {
        self.cell
            .get_or_try_init(|| self.point.resolve())
            .map(Arc::clone)
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for Attr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attr")
            .field("point", &self.point)
            .field("resolved", &self.cell.get().is_some())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Parameter-style (eager) form
// ═══════════════════════════════════════════

/// Resolves a fresh `Arc<T>` for a call-site parameter.
///
/// Runs the full resolution every call; nothing is cached at the call
/// site (scopes still apply to the chosen provider).
pub fn provide<T: Injectable>() -> Result<Arc<T>> {
    InjectionPoint::<T>::of("<param>").resolve()
}

/// Like [`provide`], with an annotated key.
pub fn provide_annotated<T: Injectable>(annotation: &'static str) -> Result<Arc<T>> {
    InjectionPoint::<T>::of("<param>").annotated(annotation).resolve()
}

/// Resolves a parameter for a type without an [`Injectable`] impl.
///
/// Requires a binding in the active injector.
pub fn provide_bound<T: Send + Sync + 'static>() -> Result<Arc<T>> {
    InjectionPoint::<T>::new("<param>").resolve()
}

/// Fills a parameter only when the caller did not supply one.
///
/// The automatic-injection counterpart for functions whose callers may
/// override individual arguments:
///
/// ```rust,ignore
/// fn send_report(mailer: Option<Arc<Mailer>>) -> Result<()> {
///     let mailer = fill(mailer)?;
///     mailer.send("report")
/// }
/// ```
pub fn fill<T: Injectable>(explicit: Option<Arc<T>>) -> Result<Arc<T>> {
    match explicit {
        Some(value) => Ok(value),
        None => provide::<T>(),
    }
}
