use chrono::{DateTime, Utc};

use super::consent::Consent;
use super::details::VerificationDetails;
use super::domain::{
    DeclineReason, ReferenceId, ReferenceRequest, ReferenceStatus, TenantId,
};

/// Storage abstraction for reference requests so the service module can be
/// exercised against in-memory fakes and real stores alike.
///
/// `fetch_actionable` and `resolve_pending` are the referee-facing lookups:
/// both match on token AND pending status AND an unexpired window, and both
/// report a miss the same way regardless of which condition failed.
pub trait ReferenceRepository: Send + Sync {
    fn insert(&self, record: ReferenceRequest) -> Result<ReferenceRequest, RepositoryError>;
    fn update(&self, record: ReferenceRequest) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ReferenceId) -> Result<Option<ReferenceRequest>, RepositoryError>;

    /// Read the record addressed by `token` if it is still pending and
    /// unexpired at `now`. A bad token, an expired window, and an
    /// already-resolved request are indistinguishable in the result.
    fn fetch_actionable(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ReferenceRequest>, RepositoryError>;

    /// Atomically transition the record addressed by `token` out of the
    /// pending state. Implementations must apply the resolution only while
    /// the record is still pending and unexpired at `now`, and return `None`
    /// when nothing matched — two callers racing on the same token must not
    /// both observe success.
    fn resolve_pending(
        &self,
        token: &str,
        now: DateTime<Utc>,
        resolution: ReferenceResolution,
    ) -> Result<Option<ReferenceRequest>, RepositoryError>;

    fn list_for_tenant(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<ReferenceRequest>, RepositoryError>;
}

/// Terminal transition applied through [`ReferenceRepository::resolve_pending`].
#[derive(Debug, Clone)]
pub enum ReferenceResolution {
    Complete {
        rating: u8,
        feedback: String,
        details: VerificationDetails,
        at: DateTime<Utc>,
    },
    Decline {
        reason: DeclineReason,
        comment: Option<String>,
        at: DateTime<Utc>,
    },
}

impl ReferenceResolution {
    /// Write the resolution onto a record. Shared by store adapters so they
    /// all persist the same field set for each terminal state.
    pub fn apply(self, record: &mut ReferenceRequest) {
        match self {
            ReferenceResolution::Complete {
                rating,
                feedback,
                details,
                at,
            } => {
                record.status = ReferenceStatus::Completed;
                record.rating = Some(rating);
                record.feedback = Some(feedback);
                record.details = Some(details);
                record.completed_at = Some(at);
            }
            ReferenceResolution::Decline {
                reason,
                comment,
                at,
            } => {
                record.status = ReferenceStatus::Declined;
                record.decline_reason = Some(reason);
                record.decline_comment = comment;
                record.declined_at = Some(at);
            }
        }
    }
}

/// Storage abstraction for consent grants.
pub trait ConsentRepository: Send + Sync {
    /// Insert `consent` as the tenant's single active grant, revoking any
    /// currently active grants in the same logical step. Implementations must
    /// serialize this per tenant; concurrent creations for the same tenant
    /// must never leave two grants active.
    fn create_active(
        &self,
        consent: Consent,
        now: DateTime<Utc>,
    ) -> Result<Consent, RepositoryError>;

    fn active_for_tenant(&self, tenant_id: &TenantId)
        -> Result<Option<Consent>, RepositoryError>;

    fn list_for_tenant(&self, tenant_id: &TenantId) -> Result<Vec<Consent>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
