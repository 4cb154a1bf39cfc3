//! # Reconcile
//!
//! A framework for declarative configuration reconciliation.
//!
//! This crate models configuration as a tree of typed sections and
//! named collections, diffs a desired tree against the actual state
//! fetched from a remote API, and drives the resulting changeset back
//! through that API in dependency-safe order.
//!
//! ## Core Concepts
//!
//! - **Value / FieldSchema**: a typed configuration value and the
//!   descriptor that knows how to compare local against remote
//!   representations (numeric coercion, set vs sequence semantics,
//!   secret placeholders, null/absent equivalence).
//! - **Resource**: an ordered bundle of field values for one section or
//!   one collection entry, diffable field-by-field.
//! - **NamedCollection**: a keyed set of resources reconciled by
//!   partitioning keys into creates, updates, and deletes.
//! - **ConfigTree**: one full desired-or-actual state.
//! - **Plan / Changeset**: the ordered operations needed to converge,
//!   plus a report of everything that could not be planned.
//! - **RemoteClient**: the narrow trait a transport implementation
//!   provides; the engine knows nothing about HTTP or wire formats.
//!
//! ## Example
//!
//! ```ignore
//! use reconcile::{executor, planner, Registry};
//!
//! let registry: Registry = build_registry();
//! let desired = parse_document(&registry)?;
//! let actual = executor::fetch_actual(&registry, &desired, &client)?;
//! let plan = planner::plan(&registry, &desired, &actual)?;
//! if !plan.is_empty() {
//!     let outcome = executor::apply(&registry, &plan.changeset, &client, &mut progress)?;
//!     if outcome.is_success() {
//!         executor::verify(&registry, &desired, &client)?;
//!     }
//! }
//! ```
//!
//! Reconciliation is idempotent: applying a plan and planning again
//! against freshly fetched state yields an empty changeset, so retrying
//! after partial failures is always safe.

pub mod changeset;
pub mod client;
pub mod collection;
pub mod error;
pub mod executor;
pub mod field;
pub mod planner;
pub mod resource;
pub mod schema;
pub mod tree;
pub mod value;

// Re-export main types at crate root
pub use changeset::{Changeset, CreateOp, DeleteOp, Plan, PlanIssue, PlanReport, UpdateOp};
pub use client::RemoteClient;
pub use collection::NamedCollection;
pub use error::{Error, RemoteError, Result};
pub use executor::{ApplyOutcome, ApplyProgress, NoProgress, OpKind, OpRecord};
pub use field::{FieldChange, FieldDefault, FieldKind, FieldSchema};
pub use resource::{FieldDelta, Resource};
pub use schema::{KeyRule, Registry, ResourceSchema, SectionLayout, SectionSchema};
pub use tree::{ConfigTree, SectionState};
pub use value::{SECRET_PLACEHOLDER, Value};
