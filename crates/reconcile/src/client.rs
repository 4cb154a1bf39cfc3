//! Remote API client boundary.
//!
//! The engine drives create/update/delete operations through this
//! trait without knowing anything about transport, authentication, or
//! wire formats. Implementations translate between engine resources
//! and whatever the remote actually speaks.

use crate::changeset::{CreateOp, DeleteOp, UpdateOp};
use crate::error::RemoteError;
use crate::schema::SectionSchema;
use crate::tree::SectionState;

/// Narrow contract the Instance Reconciler consumes.
///
/// All methods fail with [`RemoteError::Unavailable`] for transient
/// connection-level problems and [`RemoteError::Rejected`] for
/// structural validation failures; the engine retries neither.
pub trait RemoteClient {
    /// Read the current remote state of one section.
    fn fetch_section(&self, section: &SectionSchema) -> Result<SectionState, RemoteError>;

    /// Create a resource, returning its new remote identity when the
    /// remote reports one.
    fn create(
        &self,
        section: &SectionSchema,
        op: &CreateOp,
    ) -> Result<Option<i64>, RemoteError>;

    /// Apply field deltas to an existing resource.
    fn update(&self, section: &SectionSchema, op: &UpdateOp) -> Result<(), RemoteError>;

    /// Delete a resource.
    fn delete(&self, section: &SectionSchema, op: &DeleteOp) -> Result<(), RemoteError>;
}
