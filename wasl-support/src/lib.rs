//! # Wasl Support
//!
//! Shared utilities for the Wasl DI framework.
//!
//! This crate provides:
//! - Type-name rendering for error messages
//! - "Did you mean?" suggestion ranking

pub mod rendering;
