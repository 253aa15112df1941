use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::details::VerificationDetails;

/// Identifier wrapper for tenants resolved through the tenant directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for reference requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceId(pub String);

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The nine referee roles a tenant can nominate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    Employer,
    PreviousLandlord,
    Character,
    BusinessPartner,
    FamilyGuarantor,
    SaccosMember,
    ChamaMember,
    ReligiousLeader,
    CommunityElder,
}

impl ReferenceType {
    pub const fn label(self) -> &'static str {
        match self {
            ReferenceType::Employer => "employer",
            ReferenceType::PreviousLandlord => "previous_landlord",
            ReferenceType::Character => "character",
            ReferenceType::BusinessPartner => "business_partner",
            ReferenceType::FamilyGuarantor => "family_guarantor",
            ReferenceType::SaccosMember => "saccos_member",
            ReferenceType::ChamaMember => "chama_member",
            ReferenceType::ReligiousLeader => "religious_leader",
            ReferenceType::CommunityElder => "community_elder",
        }
    }

    /// Payload category a referee of this type must submit when completing
    /// the request. Total mapping; every type belongs to exactly one group.
    pub const fn category(self) -> ReferenceCategory {
        match self {
            ReferenceType::Employer => ReferenceCategory::Employment,
            ReferenceType::PreviousLandlord => ReferenceCategory::Tenancy,
            ReferenceType::Character
            | ReferenceType::ReligiousLeader
            | ReferenceType::CommunityElder => ReferenceCategory::Community,
            ReferenceType::SaccosMember
            | ReferenceType::ChamaMember
            | ReferenceType::BusinessPartner => ReferenceCategory::FinancialGroup,
            ReferenceType::FamilyGuarantor => ReferenceCategory::Guarantor,
        }
    }
}

/// The five mutually exclusive payload groups over the nine reference types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceCategory {
    Employment,
    Tenancy,
    Community,
    FinancialGroup,
    Guarantor,
}

/// Contact details for the third party asked to vouch for the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceProvider {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub relationship: String,
}

/// Stored lifecycle state. Expiry is never written; it is derived from
/// `expires_at` at read time so no background sweeper is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceStatus {
    Pending,
    Completed,
    Declined,
}

impl ReferenceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ReferenceStatus::Pending => "pending",
            ReferenceStatus::Completed => "completed",
            ReferenceStatus::Declined => "declined",
        }
    }
}

/// Four-way status exposed to callers, with expiry computed at query time so
/// clients never have to reverse-engineer it from timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceStatusView {
    Pending,
    Completed,
    Declined,
    Expired,
}

impl ReferenceStatusView {
    pub const fn label(self) -> &'static str {
        match self {
            ReferenceStatusView::Pending => "pending",
            ReferenceStatusView::Completed => "completed",
            ReferenceStatusView::Declined => "declined",
            ReferenceStatusView::Expired => "expired",
        }
    }
}

/// Delivery outcome recorded against a single send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Failed,
    Bounced,
}

/// One notification send recorded against the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestAttempt {
    pub attempt_number: u8,
    pub sent_at: DateTime<Utc>,
    pub delivery_status: DeliveryStatus,
    pub delivery_details: Option<String>,
}

/// Reasons a referee can give for refusing to vouch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclineReason {
    Unreachable,
    NotAcquainted,
    ConflictOfInterest,
    InsufficientInformation,
    Other,
}

impl DeclineReason {
    pub const fn label(self) -> &'static str {
        match self {
            DeclineReason::Unreachable => "unreachable",
            DeclineReason::NotAcquainted => "not_acquainted",
            DeclineReason::ConflictOfInterest => "conflict_of_interest",
            DeclineReason::InsufficientInformation => "insufficient_information",
            DeclineReason::Other => "other",
        }
    }
}

/// One token-addressable attestation request about a tenant.
///
/// The `token` stands in for authentication on referee-facing endpoints and
/// must never be exposed through tenant-facing views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRequest {
    pub id: ReferenceId,
    pub tenant_id: TenantId,
    pub reference_type: ReferenceType,
    pub provider: ReferenceProvider,
    pub token: String,
    pub status: ReferenceStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub attempts: Vec<RequestAttempt>,
    pub reminder_count: u8,
    pub last_reminder_sent: Option<DateTime<Utc>>,
    pub details: Option<VerificationDetails>,
    pub rating: Option<u8>,
    pub feedback: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub decline_reason: Option<DeclineReason>,
    pub decline_comment: Option<String>,
    pub declined_at: Option<DateTime<Utc>>,
}

impl ReferenceRequest {
    /// Whether an otherwise pending record is past its actionable window.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == ReferenceStatus::Pending && now > self.expires_at
    }

    pub fn status_view(&self, now: DateTime<Utc>) -> ReferenceStatusView {
        match self.status {
            ReferenceStatus::Completed => ReferenceStatusView::Completed,
            ReferenceStatus::Declined => ReferenceStatusView::Declined,
            ReferenceStatus::Pending if now > self.expires_at => ReferenceStatusView::Expired,
            ReferenceStatus::Pending => ReferenceStatusView::Pending,
        }
    }

    pub fn last_sent_at(&self) -> Option<DateTime<Utc>> {
        self.attempts.last().map(|attempt| attempt.sent_at)
    }

    /// Sanitized representation for tenant-facing responses. The provider
    /// token is deliberately absent.
    pub fn view(&self, now: DateTime<Utc>) -> ReferenceView {
        ReferenceView {
            reference_id: self.id.clone(),
            tenant_id: self.tenant_id.clone(),
            reference_type: self.reference_type,
            provider_name: self.provider.name.clone(),
            status: self.status_view(now).label(),
            expires_at: self.expires_at,
            send_attempts: self.attempts.len() as u8,
            reminder_count: self.reminder_count,
            rating: self.rating,
            completed_at: self.completed_at,
            declined_at: self.declined_at,
        }
    }
}

/// Tenant-facing projection of a reference request.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceView {
    pub reference_id: ReferenceId,
    pub tenant_id: TenantId,
    pub reference_type: ReferenceType,
    pub provider_name: String,
    pub status: &'static str,
    pub expires_at: DateTime<Utc>,
    pub send_attempts: u8,
    pub reminder_count: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declined_at: Option<DateTime<Utc>>,
}
