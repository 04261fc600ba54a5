//! # monoforge
//!
//! **Declarative monorepo generator**
//!
//! monoforge consumes a single YAML specification describing a multi-service
//! repository (services, domain models, aggregate roots with child
//! collections, HTTP handlers, storage backends, deployment descriptors) and
//! produces a complete, buildable multi-module Go workspace: shared
//! libraries, per-service source trees, module/workspace files, and platform
//! deployment descriptors.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! monoforge = "0.3"
//! ```
//!
//! The CLI front-end lives in `monoforge-forge`:
//!
//! ```text
//! monoforge generate stack.yaml --output ./out --dev
//! ```
//!
//! ## What's Included
//!
//! - **Specification model & resolver** - strict YAML decoding, cross-reference
//!   validation with document paths, deterministic name derivation
//! - **Template registry** - precompiled templates over an embedded asset tree
//! - **Emission pipeline** - staged per-service generation, including a
//!   transactional unit-of-work relational adapter with deterministic child
//!   collection diffs
//! - **Workspace assembly** - module manifests, `go.work`, development-mode
//!   replacements, final workspace synchronization
//!
//! See the [GitHub repository](https://github.com/monoforge/monoforge) for examples.

// Re-export everything from monoforge-core
pub use monoforge_core::*;
