//! # Wasl — lazy dependency injection for Rust
//!
//! A runtime DI container with lazy attribute injection, parameter
//! filling, annotated bindings, and pluggable caching scopes.
//!
//! ```rust
//! use std::sync::Arc;
//! use wasl::prelude::*;
//!
//! struct Mailer {
//!     from: &'static str,
//! }
//!
//! impl Injectable for Mailer {
//!     fn construct() -> Result<Self> {
//!         Ok(Mailer { from: "noreply@example.com" })
//!     }
//! }
//!
//! // No injector registered: the type constructs itself.
//! let mailer: Arc<Mailer> = provide()?;
//! assert_eq!(mailer.from, "noreply@example.com");
//! # Ok::<(), InjectError>(())
//! ```

pub use wasl_inject::*;
pub use wasl_support::rendering;
