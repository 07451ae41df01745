//! # Controller
//!
//! Core controller modules for the patch controller.
//!
//! - `reconciler`: reconciliation engine and its collaborators

pub mod reconciler;
