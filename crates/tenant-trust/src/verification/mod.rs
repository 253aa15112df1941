//! Tenant reference verification: consent ledger, token-addressed reference
//! lifecycle, and the weighted trust scoring gate.
//!
//! Referees are unauthenticated third parties; the secret token on each
//! request, combined with the pending-and-unexpired guard, is the sole
//! access-control mechanism on their endpoints. Storage and delivery live
//! behind the trait boundaries in `repository`, `directory`, and `notify`.

pub mod consent;
pub mod details;
pub mod directory;
pub mod domain;
pub mod notify;
pub mod policy;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
mod token;

#[cfg(test)]
mod tests;

pub use consent::{
    Consent, ConsentId, ConsentPermissions, ConsentStatus, DataRetention,
    SUPERSEDED_BY_NEW_CONSENT,
};
pub use details::{CommunityStanding, CrbStatus, DetailsError, VerificationDetails};
pub use directory::{
    DirectoryError, PersonalInfo, TenantDirectory, TenantProfile, VerificationState,
};
pub use domain::{
    DeclineReason, DeliveryStatus, ReferenceCategory, ReferenceId, ReferenceProvider,
    ReferenceRequest, ReferenceStatus, ReferenceStatusView, ReferenceType, ReferenceView,
    RequestAttempt, TenantId,
};
pub use notify::{Notification, NotificationGateway};
pub use policy::VerificationPolicy;
pub use repository::{
    ConsentRepository, ReferenceRepository, ReferenceResolution, RepositoryError,
};
pub use router::verification_router;
pub use scoring::{score_references, ScoreCard, ScoreComponent};
pub use service::{ResendOutcome, VerificationError, VerificationReport, VerificationService};
