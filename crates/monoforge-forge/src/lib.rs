//! monoforge forge - the generation side of monoforge.
//!
//! This crate turns a validated specification into a complete Go workspace:
//! a precompiled [`registry::Registry`] of templates, per-artifact emitters
//! under [`emit`], the staged [`pipeline::Pipeline`], the
//! [`assembler`] owning module and workspace manifests, and the external
//! [`collab::Collaborator`] seam for the formatter, dependency tidy, and
//! workspace sync. The `monoforge` binary is a thin wrapper over
//! [`run`].

#![deny(missing_docs)]

pub mod assembler;
pub mod cli;
pub mod collab;
pub mod emit;
pub mod error;
pub mod layout;
pub mod pipeline;
pub mod registry;

pub use cli::run;
pub use error::ForgeError;
pub use layout::Layout;
pub use pipeline::{GenerateOptions, Pipeline};
pub use registry::Registry;
