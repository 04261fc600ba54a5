//! monoforge core - specification model, resolver, and naming derivations.
//!
//! This crate owns the first third of the generation pipeline: decoding the
//! YAML specification into a normalized in-memory model ([`spec::Spec`]),
//! cross-validating every reference ([`resolver::validate`]), and deriving
//! the per-service view every emitter consumes ([`resolver::derive`]). All of
//! it is pure: the only byte-level input is [`loader::load`], and the same
//! document always produces the same views.

#![deny(missing_docs)]

pub mod error;
pub mod loader;
pub mod naming;
pub mod resolver;
pub mod spec;

pub use error::SpecError;
pub use loader::load;
pub use resolver::{derive, derive_all, validate, ServiceView};
pub use spec::Spec;
