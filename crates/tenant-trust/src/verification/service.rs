use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::warn;

use super::consent::{
    Consent, ConsentId, ConsentPermissions, ConsentStatus, DataRetention, MAX_RETENTION_MONTHS,
    MIN_RETENTION_MONTHS,
};
use super::details::{DetailsError, VerificationDetails};
use super::directory::{DirectoryError, TenantDirectory, TenantProfile, VerificationState};
use super::domain::{
    DeclineReason, DeliveryStatus, ReferenceId, ReferenceProvider, ReferenceRequest,
    ReferenceStatus, ReferenceType, RequestAttempt, TenantId,
};
use super::notify::{Notification, NotificationGateway};
use super::policy::VerificationPolicy;
use super::repository::{
    ConsentRepository, ReferenceRepository, ReferenceResolution, RepositoryError,
};
use super::scoring::{self, ScoreComponent};
use super::token;

/// Facade composing the consent ledger, the request lifecycle, and the
/// scoring engine over pluggable storage and collaborator boundaries.
///
/// The service holds no per-request state; correctness under concurrency
/// rests on the repository contracts (`create_active`, `resolve_pending`).
pub struct VerificationService<R, C, T, N> {
    references: Arc<R>,
    consents: Arc<C>,
    directory: Arc<T>,
    notifier: Arc<N>,
    policy: VerificationPolicy,
}

static CONSENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static REFERENCE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_consent_id() -> ConsentId {
    let id = CONSENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ConsentId(format!("consent-{id:06}"))
}

fn next_reference_id() -> ReferenceId {
    let id = REFERENCE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ReferenceId(format!("ref-{id:06}"))
}

impl<R, C, T, N> VerificationService<R, C, T, N>
where
    R: ReferenceRepository + 'static,
    C: ConsentRepository + 'static,
    T: TenantDirectory + 'static,
    N: NotificationGateway + 'static,
{
    pub fn new(
        references: Arc<R>,
        consents: Arc<C>,
        directory: Arc<T>,
        notifier: Arc<N>,
        policy: VerificationPolicy,
    ) -> Self {
        Self {
            references,
            consents,
            directory,
            notifier,
            policy,
        }
    }

    pub fn policy(&self) -> &VerificationPolicy {
        &self.policy
    }

    fn require_tenant(&self, tenant_id: &TenantId) -> Result<TenantProfile, VerificationError> {
        self.directory
            .fetch(tenant_id)?
            .ok_or_else(|| VerificationError::TenantNotFound(tenant_id.clone()))
    }

    /// Grant a new consent, superseding any active grant for the tenant.
    ///
    /// The revoke-then-insert happens in one repository step so two
    /// concurrent grants for the same tenant cannot both stay active.
    pub fn create_consent(
        &self,
        tenant_id: &TenantId,
        requester_id: &str,
        permissions: ConsentPermissions,
        retention: Option<DataRetention>,
    ) -> Result<Consent, VerificationError> {
        self.require_tenant(tenant_id)?;

        let retention = retention.unwrap_or_default();
        if !(MIN_RETENTION_MONTHS..=MAX_RETENTION_MONTHS)
            .contains(&retention.retention_period_months)
        {
            return Err(VerificationError::RetentionOutOfRange(
                retention.retention_period_months,
            ));
        }

        let now = Utc::now();
        let consent = Consent {
            id: next_consent_id(),
            tenant_id: tenant_id.clone(),
            requester_id: requester_id.to_string(),
            permissions,
            data_retention: retention,
            status: ConsentStatus::Active,
            granted_at: now,
            revoked_at: None,
            revoked_reason: None,
        };

        Ok(self.consents.create_active(consent, now)?)
    }

    pub fn active_consent(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<Consent>, VerificationError> {
        Ok(self.consents.active_for_tenant(tenant_id)?)
    }

    /// Open a reference request and ask the gateway to deliver the token.
    ///
    /// Delivery is best-effort: a gateway failure downgrades attempt #1 to
    /// `Failed` and is logged, but the request itself stands.
    pub fn request_reference(
        &self,
        tenant_id: &TenantId,
        reference_type: ReferenceType,
        provider: ReferenceProvider,
    ) -> Result<ReferenceRequest, VerificationError> {
        let tenant = self.require_tenant(tenant_id)?;

        match self.consents.active_for_tenant(tenant_id)? {
            Some(consent) if consent.permissions.covers(reference_type) => {}
            Some(_) => warn!(
                tenant = %tenant_id,
                reference_type = reference_type.label(),
                "active consent does not cover this reference type"
            ),
            None => warn!(tenant = %tenant_id, "no active consent on file for reference request"),
        }

        let now = Utc::now();
        let record = ReferenceRequest {
            id: next_reference_id(),
            tenant_id: tenant_id.clone(),
            reference_type,
            provider,
            token: token::generate_token(),
            status: ReferenceStatus::Pending,
            created_at: now,
            expires_at: now + Duration::days(self.policy.request_ttl_days),
            attempts: vec![RequestAttempt {
                attempt_number: 1,
                sent_at: now,
                delivery_status: DeliveryStatus::Sent,
                delivery_details: None,
            }],
            reminder_count: 0,
            last_reminder_sent: None,
            details: None,
            rating: None,
            feedback: None,
            completed_at: None,
            decline_reason: None,
            decline_comment: None,
            declined_at: None,
        };

        let mut stored = self.references.insert(record)?;

        let delivered = self.notifier.send(Notification::ReferenceRequest {
            provider_name: stored.provider.name.clone(),
            provider_email: stored.provider.email.clone(),
            tenant_name: tenant.personal.full_name(),
            reference_type,
            token: stored.token.clone(),
            expires_at: stored.expires_at,
        });

        if let Some(first) = stored.attempts.first_mut() {
            first.delivery_status = if delivered {
                DeliveryStatus::Delivered
            } else {
                DeliveryStatus::Failed
            };
        }
        if !delivered {
            warn!(
                reference = %stored.id,
                "reference request notification failed; request remains actionable"
            );
        }
        self.references.update(stored.clone())?;

        Ok(stored)
    }

    /// Re-deliver the token to the referee, rate-limited per request.
    pub fn resend_reference(
        &self,
        reference_id: &ReferenceId,
    ) -> Result<ResendOutcome, VerificationError> {
        let mut record = self
            .references
            .fetch(reference_id)?
            .ok_or(VerificationError::RequestNotFound)?;

        let now = Utc::now();
        if record.status != ReferenceStatus::Pending {
            return Err(VerificationError::NotPending {
                status: record.status.label(),
            });
        }
        if now > record.expires_at {
            return Err(VerificationError::Expired);
        }

        let attempts_used = record.attempts.len() as u8;
        if attempts_used >= self.policy.max_send_attempts {
            return Err(VerificationError::AttemptsExhausted {
                max: self.policy.max_send_attempts,
            });
        }
        if let Some(last_sent) = record.last_sent_at() {
            let elapsed = now.signed_duration_since(last_sent);
            if elapsed < Duration::minutes(self.policy.resend_cooldown_minutes) {
                return Err(VerificationError::ResendCooldown {
                    minutes_since_last: elapsed.num_minutes(),
                    cooldown_minutes: self.policy.resend_cooldown_minutes,
                });
            }
        }

        let tenant = self.require_tenant(&record.tenant_id)?;

        let attempt_number = attempts_used + 1;
        let email_sent = self.notifier.send(Notification::ReferenceReminder {
            provider_name: record.provider.name.clone(),
            provider_email: record.provider.email.clone(),
            tenant_name: tenant.personal.full_name(),
            reference_type: record.reference_type,
            token: record.token.clone(),
            attempt_number,
            days_until_expiry: (record.expires_at - now).num_days(),
        });
        if !email_sent {
            warn!(reference = %record.id, "reference reminder delivery failed");
        }

        record.attempts.push(RequestAttempt {
            attempt_number,
            sent_at: now,
            delivery_status: if email_sent {
                DeliveryStatus::Delivered
            } else {
                DeliveryStatus::Failed
            },
            delivery_details: None,
        });
        record.reminder_count += 1;
        record.last_reminder_sent = Some(now);
        self.references.update(record.clone())?;

        Ok(ResendOutcome {
            email_sent,
            attempt_number,
            remaining_attempts: self.policy.max_send_attempts - attempt_number,
            reference: record,
        })
    }

    /// Referee declines to vouch. The token is the only credential; any
    /// guard miss (bad token, expired, already resolved) reads the same.
    pub fn decline_reference(
        &self,
        token: &str,
        reason: DeclineReason,
        comment: Option<String>,
    ) -> Result<ReferenceRequest, VerificationError> {
        let now = Utc::now();
        let record = self
            .references
            .resolve_pending(
                token,
                now,
                ReferenceResolution::Decline {
                    reason,
                    comment,
                    at: now,
                },
            )?
            .ok_or(VerificationError::RequestNotFound)?;

        self.notify_tenant(&record.tenant_id, |profile| {
            Notification::ReferenceDeclined {
                tenant_name: profile.personal.full_name(),
                tenant_email: profile.personal.email.clone(),
                provider_name: record.provider.name.clone(),
                reference_type: record.reference_type,
                reason,
            }
        });

        Ok(record)
    }

    /// Referee completes the request with a rating and category details.
    ///
    /// The payload is validated against the category implied by the stored
    /// reference type before the terminal transition; the transition itself
    /// re-checks the pending guard atomically, so a concurrent resolve of the
    /// same token surfaces as the uniform not-found outcome.
    pub fn respond_reference(
        &self,
        token: &str,
        feedback: String,
        rating: u8,
        details: VerificationDetails,
    ) -> Result<ReferenceRequest, VerificationError> {
        if !(1..=5).contains(&rating) {
            return Err(VerificationError::InvalidRating(rating));
        }

        let now = Utc::now();
        let pending = self
            .references
            .fetch_actionable(token, now)?
            .ok_or(VerificationError::RequestNotFound)?;
        details.validate_for(pending.reference_type.category())?;

        let record = self
            .references
            .resolve_pending(
                token,
                now,
                ReferenceResolution::Complete {
                    rating,
                    feedback,
                    details,
                    at: now,
                },
            )?
            .ok_or(VerificationError::RequestNotFound)?;

        self.notify_tenant(&record.tenant_id, |profile| {
            Notification::ReferenceCompleted {
                tenant_name: profile.personal.full_name(),
                tenant_email: profile.personal.email.clone(),
                provider_name: record.provider.name.clone(),
                reference_type: record.reference_type,
                rating,
            }
        });

        Ok(record)
    }

    /// Recompute the tenant's weighted trust percentage and persist it.
    ///
    /// The verified flag is monotonic: once a tenant crosses the threshold,
    /// later recomputations never clear it. The tenant is notified only when
    /// newly verified or after a progress gain worth reporting.
    pub fn verify_tenant(
        &self,
        tenant_id: &TenantId,
    ) -> Result<VerificationReport, VerificationError> {
        let tenant = self.require_tenant(tenant_id)?;

        let references = self.references.list_for_tenant(tenant_id)?;
        let card = scoring::score_references(&references);
        if card.components.is_empty() {
            return Err(VerificationError::NoCompletedReferences);
        }

        let previous = tenant.verification;
        let percentage = card.verification_percentage;
        let newly_verified = !previous.is_verified && percentage >= self.policy.verified_threshold;
        let state = VerificationState {
            progress: percentage,
            is_verified: previous.is_verified || percentage >= self.policy.verified_threshold,
        };
        self.directory.store_verification_state(tenant_id, state)?;

        let gained = percentage.saturating_sub(previous.progress);
        if newly_verified || gained >= self.policy.notify_progress_delta {
            self.notify_tenant(tenant_id, |profile| Notification::VerificationStatus {
                tenant_name: profile.personal.full_name(),
                tenant_email: profile.personal.email.clone(),
                percentage,
                newly_verified,
            });
        }

        Ok(VerificationReport {
            tenant_id: tenant_id.clone(),
            verification_score: card.verification_score,
            total_possible_score: card.total_possible_score,
            verification_percentage: percentage,
            references: card.components,
            is_verified: state.is_verified,
        })
    }

    pub fn list_references(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<ReferenceRequest>, VerificationError> {
        Ok(self.references.list_for_tenant(tenant_id)?)
    }

    /// Best-effort tenant notification; every failure path is logged and
    /// swallowed so the caller's state transition stands.
    fn notify_tenant<F>(&self, tenant_id: &TenantId, message: F)
    where
        F: FnOnce(&TenantProfile) -> Notification,
    {
        let profile = match self.directory.fetch(tenant_id) {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                warn!(tenant = %tenant_id, "skipping notification for unknown tenant");
                return;
            }
            Err(err) => {
                warn!(tenant = %tenant_id, error = %err, "tenant lookup failed while notifying");
                return;
            }
        };

        let notification = message(&profile);
        let kind = notification.kind();
        if !self.notifier.send(notification) {
            warn!(tenant = %tenant_id, kind, "notification delivery failed");
        }
    }
}

/// Outcome envelope returned by [`VerificationService::resend_reference`].
#[derive(Debug, Clone, Serialize)]
pub struct ResendOutcome {
    pub reference: ReferenceRequest,
    pub email_sent: bool,
    pub attempt_number: u8,
    pub remaining_attempts: u8,
}

/// Scoring result plus the verification gate decision for a tenant.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub tenant_id: TenantId,
    pub verification_score: f64,
    pub total_possible_score: f64,
    pub verification_percentage: u8,
    pub references: Vec<ScoreComponent>,
    pub is_verified: bool,
}

/// Error raised by the verification service.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("tenant {0} not found")]
    TenantNotFound(TenantId),
    /// Referee-facing guard failure. Deliberately identical for a bad token,
    /// an expired window, and an already-resolved request.
    #[error("reference request not found or expired")]
    RequestNotFound,
    #[error("reference request is {status}, expected pending")]
    NotPending { status: &'static str },
    #[error("reference request expired")]
    Expired,
    #[error("maximum of {max} send attempts reached")]
    AttemptsExhausted { max: u8 },
    #[error("last send was {minutes_since_last} minute(s) ago; wait {cooldown_minutes} between sends")]
    ResendCooldown {
        minutes_since_last: i64,
        cooldown_minutes: i64,
    },
    #[error("rating {0} outside the 1-5 scale")]
    InvalidRating(u8),
    #[error(transparent)]
    InvalidDetails(#[from] DetailsError),
    #[error("retention period of {0} months outside the {MIN_RETENTION_MONTHS}-{MAX_RETENTION_MONTHS} month range")]
    RetentionOutOfRange(u8),
    #[error("no completed references to score")]
    NoCompletedReferences,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
