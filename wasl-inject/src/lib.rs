//! Core resolution engine for Wasl DI.
//!
//! Declare dependencies as lazy [`Attr`] fields or resolve them as call
//! parameters with [`provide`]/[`fill`]; override any of them by binding
//! providers and scopes in an [`Injector`] and activating it with
//! [`register`].

pub mod error;
pub mod injector;
pub mod key;
pub mod point;
pub mod provider;
pub mod scope;

pub use error::{InjectError, Result};
pub use injector::{Injector, InjectorBuilder, active, register, unregister};
pub use key::BindingKey;
pub use point::{Attr, InjectionPoint, fill, provide, provide_annotated, provide_bound};
pub use provider::{Injectable, Instance, Invoker, Provider, ProviderId};
pub use scope::{CallContext, ContextGuard, Scope};

pub mod prelude {
    pub use crate::error::{InjectError, Result};
    pub use crate::injector::{Injector, active, register, unregister};
    pub use crate::key::BindingKey;
    pub use crate::point::{Attr, InjectionPoint, fill, provide, provide_annotated, provide_bound};
    pub use crate::provider::{Injectable, Invoker, Provider};
    pub use crate::scope::{CallContext, Scope};
}
