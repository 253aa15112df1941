use super::super::details::{CommunityStanding, CrbStatus, VerificationDetails};
use super::super::domain::ReferenceType;

/// Base weight per reference type. Institutional attestations (landlord,
/// employer) carry the most signal; unverifiable personal vouches the least.
pub(crate) const fn base_weight(reference_type: ReferenceType) -> f64 {
    match reference_type {
        ReferenceType::PreviousLandlord => 4.0,
        ReferenceType::Employer => 3.0,
        ReferenceType::SaccosMember | ReferenceType::ChamaMember => 2.5,
        ReferenceType::FamilyGuarantor => 2.2,
        ReferenceType::ReligiousLeader | ReferenceType::CommunityElder => 1.8,
        ReferenceType::BusinessPartner => 1.5,
        ReferenceType::Character => 1.2,
    }
}

/// Conditional multiplier applied when the referee corroborated the claims
/// that matter most for the category. 1.0 when no bonus condition holds.
///
/// Business partners share the financial-group payload but earn no CRB bonus,
/// and plain character referees earn no standing bonus; only the types listed
/// in each arm qualify.
pub(crate) fn bonus_multiplier(
    reference_type: ReferenceType,
    details: Option<&VerificationDetails>,
) -> f64 {
    let Some(details) = details else {
        return 1.0;
    };

    match (reference_type, details) {
        (
            ReferenceType::PreviousLandlord,
            VerificationDetails::Tenancy {
                water_bills_paid: true,
                electrical_bills_paid: true,
                ..
            },
        ) => 1.20,
        (
            ReferenceType::Employer,
            VerificationDetails::Employment {
                employer_kra_pin: Some(pin),
                salary_slip_verified: true,
                ..
            },
        ) if !pin.is_empty() => 1.15,
        (
            ReferenceType::SaccosMember | ReferenceType::ChamaMember,
            VerificationDetails::FinancialGroup {
                crb_status: Some(CrbStatus::Good),
                ..
            },
        ) => 1.10,
        (
            ReferenceType::FamilyGuarantor,
            VerificationDetails::Guarantor {
                guarantor_property: Some(property),
                willingness_to_guarantee: true,
                ..
            },
        ) if !property.is_empty() => 1.25,
        (
            ReferenceType::ReligiousLeader | ReferenceType::CommunityElder,
            VerificationDetails::Community {
                community_standing: Some(CommunityStanding::Excellent),
                ..
            },
        ) => 1.10,
        _ => 1.0,
    }
}
