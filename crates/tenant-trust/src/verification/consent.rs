use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ReferenceType, TenantId};

/// Reason recorded on a consent that was superseded by a newer grant.
pub const SUPERSEDED_BY_NEW_CONSENT: &str = "new_consent_created";

pub const MIN_RETENTION_MONTHS: u8 = 6;
pub const MAX_RETENTION_MONTHS: u8 = 60;

/// Identifier wrapper for consent grants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsentId(pub String);

impl fmt::Display for ConsentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named verification capabilities a tenant can authorize. Fields omitted
/// from a submitted grant fall back to the defaults below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentPermissions {
    pub employer_verification: bool,
    pub credit_bureau_check: bool,
    pub mobile_money_analysis: bool,
    pub utility_bill_verification: bool,
    pub community_group_verification: bool,
    pub guarantor_verification: bool,
}

impl Default for ConsentPermissions {
    /// Routine checks are on by default; financial-footprint checks (credit
    /// bureau, mobile money) require an explicit opt-in.
    fn default() -> Self {
        Self {
            employer_verification: true,
            credit_bureau_check: false,
            mobile_money_analysis: false,
            utility_bill_verification: true,
            community_group_verification: true,
            guarantor_verification: true,
        }
    }
}

impl ConsentPermissions {
    /// Whether the grant covers collecting the given reference type.
    ///
    /// Character-style references carry no capability of their own and are
    /// always covered.
    pub const fn covers(&self, reference_type: ReferenceType) -> bool {
        match reference_type {
            ReferenceType::Employer => self.employer_verification,
            ReferenceType::PreviousLandlord => self.utility_bill_verification,
            ReferenceType::SaccosMember | ReferenceType::ChamaMember => {
                self.community_group_verification
            }
            ReferenceType::FamilyGuarantor => self.guarantor_verification,
            ReferenceType::Character
            | ReferenceType::BusinessPartner
            | ReferenceType::ReligiousLeader
            | ReferenceType::CommunityElder => true,
        }
    }
}

/// Retention terms attached to a consent grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataRetention {
    pub retention_period_months: u8,
    pub allow_data_sharing: bool,
    pub allow_analytics: bool,
}

impl Default for DataRetention {
    fn default() -> Self {
        Self {
            retention_period_months: 24,
            allow_data_sharing: false,
            allow_analytics: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentStatus {
    Active,
    Revoked,
}

impl ConsentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ConsentStatus::Active => "active",
            ConsentStatus::Revoked => "revoked",
        }
    }
}

/// A tenant's authorization to run third-party verification checks.
///
/// At most one consent per tenant is active at any time; creating a new one
/// supersedes (revokes) every prior active grant in the same logical step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consent {
    pub id: ConsentId,
    pub tenant_id: TenantId,
    pub requester_id: String,
    pub permissions: ConsentPermissions,
    pub data_retention: DataRetention,
    pub status: ConsentStatus,
    pub granted_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<String>,
}
