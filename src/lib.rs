//! # Patch Controller Library
//!
//! Core functionality for the patch controller: the `Patch` custom resource,
//! the reconciliation engine, and the observability surface. The binaries in
//! `src/main.rs` (controller) and `src/bin/crdgen.rs` (CRD YAML generator)
//! are thin shells over this library, which keeps the whole pipeline
//! reachable from integration tests.

pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod server;

pub use controller::reconciler::Reconciler;
pub use crd::{Condition, ObjectRef, Patch, PatchSpec, PatchStatus};
