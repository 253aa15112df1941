use serde::{Deserialize, Serialize};

use super::domain::ReferenceCategory;

/// Community reputation as reported by a character referee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunityStanding {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// Credit reference bureau standing reported for group-finance referees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrbStatus {
    Good,
    Fair,
    Adverse,
}

/// Category-specific payload a referee submits when completing a request.
///
/// The discriminant must agree with the category implied by the stored
/// reference type; mismatches are rejected before anything is persisted.
/// Unknown fields in the submitted JSON are ignored, so a referee form that
/// posts extra material cannot smuggle it into storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum VerificationDetails {
    Employment {
        position: Option<String>,
        employment_duration_months: Option<u16>,
        gross_monthly_salary: Option<u32>,
        employer_kra_pin: Option<String>,
        #[serde(default)]
        salary_slip_verified: bool,
    },
    Tenancy {
        property_name: Option<String>,
        tenancy_duration_months: Option<u16>,
        monthly_rent: Option<u32>,
        #[serde(default)]
        water_bills_paid: bool,
        #[serde(default)]
        electrical_bills_paid: bool,
        deposit_returned: Option<bool>,
    },
    Community {
        years_known: Option<u8>,
        community_role: Option<String>,
        community_standing: Option<CommunityStanding>,
    },
    FinancialGroup {
        group_name: Option<String>,
        membership_duration_months: Option<u16>,
        contribution_consistency: Option<String>,
        crb_status: Option<CrbStatus>,
    },
    Guarantor {
        relationship_years: Option<u8>,
        guarantor_income: Option<u32>,
        guarantor_property: Option<String>,
        #[serde(default)]
        willingness_to_guarantee: bool,
    },
}

impl VerificationDetails {
    pub const fn category(&self) -> ReferenceCategory {
        match self {
            VerificationDetails::Employment { .. } => ReferenceCategory::Employment,
            VerificationDetails::Tenancy { .. } => ReferenceCategory::Tenancy,
            VerificationDetails::Community { .. } => ReferenceCategory::Community,
            VerificationDetails::FinancialGroup { .. } => ReferenceCategory::FinancialGroup,
            VerificationDetails::Guarantor { .. } => ReferenceCategory::Guarantor,
        }
    }

    /// Boundary check run before a response is persisted.
    pub fn validate_for(&self, expected: ReferenceCategory) -> Result<(), DetailsError> {
        let submitted = self.category();
        if submitted == expected {
            Ok(())
        } else {
            Err(DetailsError::CategoryMismatch {
                expected,
                submitted,
            })
        }
    }
}

/// Validation errors for referee-submitted payloads.
#[derive(Debug, thiserror::Error)]
pub enum DetailsError {
    #[error("details category {submitted:?} does not match reference category {expected:?}")]
    CategoryMismatch {
        expected: ReferenceCategory,
        submitted: ReferenceCategory,
    },
}
