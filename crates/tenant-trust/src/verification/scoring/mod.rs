mod weights;

use serde::Serialize;

use super::domain::{ReferenceId, ReferenceRequest, ReferenceStatus, ReferenceType};

pub(crate) const MAX_RATING: f64 = 5.0;

/// Per-reference contribution, kept so score reviews can be audited.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreComponent {
    pub reference_id: ReferenceId,
    pub reference_type: ReferenceType,
    pub rating: u8,
    pub weight: f64,
    pub bonus_multiplier: f64,
    pub points: f64,
}

/// Aggregated weighted trust score over a tenant's completed references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    pub verification_score: f64,
    pub total_possible_score: f64,
    pub verification_percentage: u8,
    pub components: Vec<ScoreComponent>,
}

/// Compute the weighted trust percentage from a tenant's references.
///
/// Only completed records carrying a rating participate. Accumulation is a
/// plain sum, so the result is independent of input order. An empty
/// contribution set yields a zero card; callers gate on that before treating
/// the percentage as meaningful.
pub fn score_references(references: &[ReferenceRequest]) -> ScoreCard {
    let mut components = Vec::new();
    let mut verification_score = 0.0;
    let mut total_possible_score = 0.0;

    for reference in references {
        if reference.status != ReferenceStatus::Completed {
            continue;
        }
        let Some(rating) = reference.rating else {
            continue;
        };

        let weight = weights::base_weight(reference.reference_type);
        let bonus = weights::bonus_multiplier(reference.reference_type, reference.details.as_ref());
        let points = f64::from(rating) * weight * bonus;

        verification_score += points;
        total_possible_score += MAX_RATING * weight * bonus;

        components.push(ScoreComponent {
            reference_id: reference.id.clone(),
            reference_type: reference.reference_type,
            rating,
            weight,
            bonus_multiplier: bonus,
            points,
        });
    }

    let verification_percentage = if total_possible_score > 0.0 {
        (100.0 * verification_score / total_possible_score).round() as u8
    } else {
        0
    };

    ScoreCard {
        verification_score,
        total_possible_score,
        verification_percentage,
        components,
    }
}
