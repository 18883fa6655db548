//! Caching scopes wrapped around providers.
//!
//! A scope decides whether a resolution may return a previously produced
//! instance instead of invoking the provider again:
//! - [`Scope::None`] — invoke every time
//! - [`Scope::Process`] — memoize forever, once per provider
//! - [`Scope::CallContext`] — memoize per registered unit of work
//!
//! Scope caches are keyed by provider identity, so two bindings sharing a
//! provider share its cached instance and two providers of the same type
//! do not.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use dashmap::DashMap;
use once_cell::sync::{Lazy, OnceCell};
use tracing::{debug, trace};

use crate::error::{InjectError, NoContextRegisteredError, Result};
use crate::provider::{Instance, Provider, ProviderId};

/// Instance-reuse policy for one injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// No caching; every resolution invokes the provider.
    None,

    /// One instance per provider for the remaining process lifetime.
    ///
    /// Concurrent first-resolutions serialize so the provider runs at most
    /// once; every caller observes the same instance.
    Process,

    /// One instance per provider per registered call context (e.g. one
    /// HTTP request), isolated per thread.
    ///
    /// Resolving with no context registered is an error, not a silent
    /// fallback.
    CallContext,
}

impl Scope {
    /// Returns `true` if this scope reuses instances.
    #[inline]
    pub fn is_cached(&self) -> bool {
        !matches!(self, Scope::None)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::None => write!(f, "no-scope"),
            Scope::Process => write!(f, "process"),
            Scope::CallContext => write!(f, "call-context"),
        }
    }
}

/// Invokes `provider` under `scope`.
pub(crate) fn apply(scope: Scope, provider: &Provider) -> Result<Instance> {
    match scope {
        Scope::None => provider.call(),
        Scope::Process => process_scoped(provider),
        Scope::CallContext => context_scoped(provider),
    }
}

// ═══════════════════════════════════════════
// Process scope
// ═══════════════════════════════════════════

static PROCESS_CACHE: Lazy<DashMap<ProviderId, std::sync::Arc<OnceCell<Instance>>>> =
    Lazy::new(DashMap::new);

fn process_scoped(provider: &Provider) -> Result<Instance> {
    // The shard lock is released before construction; the cell serializes
    // concurrent first-resolutions of the same provider.
    let cell = PROCESS_CACHE.entry(provider.id()).or_default().clone();

    let value = cell.get_or_try_init(|| {
        trace!(target_type = provider.target(), "process scope miss, constructing");
        provider.call()
    })?;

    Ok(value.clone())
}

#[cfg(test)]
pub(crate) fn reset_process_cache() {
    PROCESS_CACHE.clear();
}

// ═══════════════════════════════════════════
// Call-context scope
// ═══════════════════════════════════════════

thread_local! {
    static CALL_CONTEXT: RefCell<Option<HashMap<ProviderId, Instance>>> =
        const { RefCell::new(None) };
}

fn context_scoped(provider: &Provider) -> Result<Instance> {
    let no_context = || {
        InjectError::NoContextRegistered(NoContextRegisteredError {
            target: provider.target(),
        })
    };

    let cached = CALL_CONTEXT.with(|ctx| match &*ctx.borrow() {
        Option::None => Err(no_context()),
        Some(map) => Ok(map.get(&provider.id()).cloned()),
    })?;

    if let Some(value) = cached {
        return Ok(value);
    }

    // Construct with the borrow released: the provider may itself resolve
    // other context-scoped dependencies.
    trace!(target_type = provider.target(), "call-context miss, constructing");
    let value = provider.call()?;

    CALL_CONTEXT.with(|ctx| {
        let mut slot = ctx.borrow_mut();
        let map = slot.as_mut().ok_or_else(no_context)?;
        Ok(map.entry(provider.id()).or_insert(value).clone())
    })
}

/// The call-context lifecycle: one unit of work at a time per thread.
///
/// Host frameworks call [`CallContext::register`] before a unit of work
/// begins and [`CallContext::unregister`] after it ends; the RAII
/// [`CallContext::enter`] form guarantees the unregister on every exit
/// path, including panics:
///
/// ```rust,ignore
/// let _ctx = CallContext::enter();
/// handle_request(req)?;
/// // context discarded here, cached instances dropped
/// ```
pub struct CallContext;

impl CallContext {
    /// Opens a fresh, empty context for the current thread.
    ///
    /// Registering while a context is live replaces it (the previous
    /// context's cached instances are dropped).
    pub fn register() {
        CALL_CONTEXT.with(|ctx| {
            let previous = ctx.borrow_mut().replace(HashMap::new());
            if previous.is_some() {
                debug!("replacing a live call context");
            } else {
                debug!("call context registered");
            }
        });
    }

    /// Discards the current thread's context and everything cached in it.
    pub fn unregister() {
        CALL_CONTEXT.with(|ctx| {
            if ctx.borrow_mut().take().is_some() {
                debug!("call context unregistered");
            }
        });
    }

    /// Returns `true` if the current thread has a registered context.
    pub fn is_registered() -> bool {
        CALL_CONTEXT.with(|ctx| ctx.borrow().is_some())
    }

    /// Registers a context and returns a guard that unregisters it when
    /// dropped.
    #[must_use = "the context is discarded as soon as the guard drops"]
    pub fn enter() -> ContextGuard {
        Self::register();
        ContextGuard {
            _not_send: PhantomData,
        }
    }
}

/// Unregisters the current thread's call context on drop.
///
/// `!Send`: a context belongs to the thread that opened it.
pub struct ContextGuard {
    _not_send: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CallContext::unregister();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_provider(counter: &Arc<AtomicU32>) -> Provider {
        let counter = counter.clone();
        Provider::factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(String::from("constructed"))
        })
    }

    #[test]
    fn scope_is_cached() {
        assert!(!Scope::None.is_cached());
        assert!(Scope::Process.is_cached());
        assert!(Scope::CallContext.is_cached());
    }

    #[test]
    fn scope_display() {
        assert_eq!(format!("{}", Scope::None), "no-scope");
        assert_eq!(format!("{}", Scope::Process), "process");
        assert_eq!(format!("{}", Scope::CallContext), "call-context");
    }

    #[test]
    fn no_scope_invokes_every_time() {
        let counter = Arc::new(AtomicU32::new(0));
        let provider = counting_provider(&counter);

        let a = apply(Scope::None, &provider).unwrap();
        let b = apply(Scope::None, &provider).unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    #[serial]
    fn process_scope_memoizes_per_provider() {
        reset_process_cache();
        let counter = Arc::new(AtomicU32::new(0));
        let provider = counting_provider(&counter);

        let a = apply(Scope::Process, &provider).unwrap();
        let b = apply(Scope::Process, &provider).unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));

        // A different provider of the same type gets its own slot.
        let other = counting_provider(&counter);
        let c = apply(Scope::Process, &other).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    #[serial]
    fn process_scope_constructs_once_across_threads() {
        reset_process_cache();
        let counter = Arc::new(AtomicU32::new(0));
        let provider = counting_provider(&counter);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let provider = provider.clone();
                std::thread::spawn(move || apply(Scope::Process, &provider).unwrap())
            })
            .collect();

        let instances: Vec<Instance> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        for instance in &instances[1..] {
            assert!(Arc::ptr_eq(&instances[0], instance));
        }
    }

    #[test]
    #[serial]
    fn context_scope_requires_registration() {
        CallContext::unregister();
        let provider = Provider::factory(|| Ok(1u32));

        let result = apply(Scope::CallContext, &provider);
        match result {
            Err(InjectError::NoContextRegistered(err)) => {
                assert!(err.target.contains("u32"));
            }
            other => panic!("Expected NoContextRegistered, got: {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn context_scope_memoizes_within_context() {
        let counter = Arc::new(AtomicU32::new(0));
        let provider = counting_provider(&counter);

        CallContext::register();
        let a = apply(Scope::CallContext, &provider).unwrap();
        let b = apply(Scope::CallContext, &provider).unwrap();
        CallContext::unregister();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    #[serial]
    fn context_scope_isolates_contexts() {
        let counter = Arc::new(AtomicU32::new(0));
        let provider = counting_provider(&counter);

        CallContext::register();
        let first = apply(Scope::CallContext, &provider).unwrap();
        CallContext::unregister();

        CallContext::register();
        let second = apply(Scope::CallContext, &provider).unwrap();
        CallContext::unregister();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    #[serial]
    fn context_scope_isolates_threads() {
        let counter = Arc::new(AtomicU32::new(0));
        let provider = counting_provider(&counter);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let provider = provider.clone();
                std::thread::spawn(move || {
                    let _ctx = CallContext::enter();
                    apply(Scope::CallContext, &provider).unwrap()
                })
            })
            .collect();

        let instances: Vec<Instance> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(!Arc::ptr_eq(&instances[0], &instances[1]));
    }

    #[test]
    #[serial]
    fn guard_unregisters_on_drop() {
        assert!(!CallContext::is_registered());
        {
            let _ctx = CallContext::enter();
            assert!(CallContext::is_registered());
        }
        assert!(!CallContext::is_registered());
    }

    #[test]
    #[serial]
    fn reregistering_replaces_cached_instances() {
        let counter = Arc::new(AtomicU32::new(0));
        let provider = counting_provider(&counter);

        CallContext::register();
        let first = apply(Scope::CallContext, &provider).unwrap();

        // Fresh context on the same thread: previous cache is gone.
        CallContext::register();
        let second = apply(Scope::CallContext, &provider).unwrap();
        CallContext::unregister();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(!Arc::ptr_eq(&first, &second));
    }
}
