use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use crate::verification::consent::Consent;
use crate::verification::details::{CommunityStanding, CrbStatus, VerificationDetails};
use crate::verification::directory::{
    DirectoryError, PersonalInfo, TenantDirectory, TenantProfile, VerificationState,
};
use crate::verification::domain::{
    ReferenceId, ReferenceProvider, ReferenceRequest, ReferenceStatus, TenantId,
};
use crate::verification::notify::{Notification, NotificationGateway};
use crate::verification::policy::VerificationPolicy;
use crate::verification::repository::{
    ConsentRepository, ReferenceRepository, ReferenceResolution, RepositoryError,
};
use crate::verification::router::verification_router;
use crate::verification::service::VerificationService;
use crate::verification::ConsentStatus;
use crate::verification::SUPERSEDED_BY_NEW_CONSENT;

pub(super) type TestService =
    VerificationService<MemoryReferences, MemoryConsents, MemoryDirectory, RecordingGateway>;

pub(super) fn tenant_id() -> TenantId {
    TenantId("tenant-001".to_string())
}

pub(super) fn provider() -> ReferenceProvider {
    ReferenceProvider {
        name: "Grace Mwangi".to_string(),
        email: "grace.mwangi@example.co.ke".to_string(),
        phone: Some("+254700111222".to_string()),
        relationship: "former landlord".to_string(),
    }
}

pub(super) fn policy() -> VerificationPolicy {
    VerificationPolicy::default()
}

pub(super) fn landlord_details() -> VerificationDetails {
    VerificationDetails::Tenancy {
        property_name: Some("Makadara Court".to_string()),
        tenancy_duration_months: Some(30),
        monthly_rent: Some(42_000),
        water_bills_paid: true,
        electrical_bills_paid: true,
        deposit_returned: Some(true),
    }
}

pub(super) fn employer_details() -> VerificationDetails {
    VerificationDetails::Employment {
        position: Some("Accounts Assistant".to_string()),
        employment_duration_months: Some(28),
        gross_monthly_salary: Some(85_000),
        employer_kra_pin: Some("P051234567X".to_string()),
        salary_slip_verified: true,
    }
}

pub(super) fn community_details(standing: CommunityStanding) -> VerificationDetails {
    VerificationDetails::Community {
        years_known: Some(6),
        community_role: Some("congregation member".to_string()),
        community_standing: Some(standing),
    }
}

pub(super) fn financial_group_details(crb_status: Option<CrbStatus>) -> VerificationDetails {
    VerificationDetails::FinancialGroup {
        group_name: Some("Umoja SACCO".to_string()),
        membership_duration_months: Some(40),
        contribution_consistency: Some("monthly, no arrears".to_string()),
        crb_status,
    }
}

pub(super) fn guarantor_details() -> VerificationDetails {
    VerificationDetails::Guarantor {
        relationship_years: Some(20),
        guarantor_income: Some(120_000),
        guarantor_property: Some("LR 209/1234, Nairobi".to_string()),
        willingness_to_guarantee: true,
    }
}

pub(super) fn build_service() -> (
    Arc<TestService>,
    Arc<MemoryReferences>,
    Arc<MemoryConsents>,
    Arc<MemoryDirectory>,
    Arc<RecordingGateway>,
) {
    let references = Arc::new(MemoryReferences::default());
    let consents = Arc::new(MemoryConsents::default());
    let directory = Arc::new(MemoryDirectory::with_tenant(tenant_id(), "Amina", "Otieno"));
    let gateway = Arc::new(RecordingGateway::default());
    let service = Arc::new(VerificationService::new(
        references.clone(),
        consents.clone(),
        directory.clone(),
        gateway.clone(),
        policy(),
    ));
    (service, references, consents, directory, gateway)
}

pub(super) fn router_for(service: Arc<TestService>) -> axum::Router {
    verification_router(service)
}

/// Rewrite a stored record through the repository handle. Tests use this to
/// age attempts or expire windows without a clock abstraction.
pub(super) fn mutate_reference<F>(references: &MemoryReferences, id: &ReferenceId, mutate: F)
where
    F: FnOnce(&mut ReferenceRequest),
{
    let mut record = references
        .fetch(id)
        .expect("repository fetch")
        .expect("record present");
    mutate(&mut record);
    references.update(record).expect("repository update");
}

pub(super) fn backdate_last_attempt(
    references: &MemoryReferences,
    id: &ReferenceId,
    by: Duration,
) {
    mutate_reference(references, id, |record| {
        if let Some(attempt) = record.attempts.last_mut() {
            attempt.sent_at -= by;
        }
        if let Some(last) = record.last_reminder_sent.as_mut() {
            *last -= by;
        }
    });
}

#[derive(Default, Clone)]
pub(super) struct MemoryReferences {
    records: Arc<Mutex<HashMap<ReferenceId, ReferenceRequest>>>,
}

impl ReferenceRepository for MemoryReferences {
    fn insert(&self, record: ReferenceRequest) -> Result<ReferenceRequest, RepositoryError> {
        let mut guard = self.records.lock().expect("reference mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, record: ReferenceRequest) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("reference mutex poisoned");
        if guard.contains_key(&record.id) {
            guard.insert(record.id.clone(), record);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &ReferenceId) -> Result<Option<ReferenceRequest>, RepositoryError> {
        let guard = self.records.lock().expect("reference mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn fetch_actionable(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ReferenceRequest>, RepositoryError> {
        let guard = self.records.lock().expect("reference mutex poisoned");
        Ok(guard
            .values()
            .find(|record| {
                record.token == token
                    && record.status == ReferenceStatus::Pending
                    && record.expires_at > now
            })
            .cloned())
    }

    fn resolve_pending(
        &self,
        token: &str,
        now: DateTime<Utc>,
        resolution: ReferenceResolution,
    ) -> Result<Option<ReferenceRequest>, RepositoryError> {
        let mut guard = self.records.lock().expect("reference mutex poisoned");
        let Some(record) = guard.values_mut().find(|record| {
            record.token == token
                && record.status == ReferenceStatus::Pending
                && record.expires_at > now
        }) else {
            return Ok(None);
        };
        resolution.apply(record);
        Ok(Some(record.clone()))
    }

    fn list_for_tenant(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<ReferenceRequest>, RepositoryError> {
        let guard = self.records.lock().expect("reference mutex poisoned");
        let mut records: Vec<_> = guard
            .values()
            .filter(|record| &record.tenant_id == tenant_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(records)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryConsents {
    records: Arc<Mutex<Vec<Consent>>>,
}

impl ConsentRepository for MemoryConsents {
    fn create_active(
        &self,
        consent: Consent,
        now: DateTime<Utc>,
    ) -> Result<Consent, RepositoryError> {
        let mut guard = self.records.lock().expect("consent mutex poisoned");
        for existing in guard
            .iter_mut()
            .filter(|existing| existing.tenant_id == consent.tenant_id)
            .filter(|existing| existing.status == ConsentStatus::Active)
        {
            existing.status = ConsentStatus::Revoked;
            existing.revoked_at = Some(now);
            existing.revoked_reason = Some(SUPERSEDED_BY_NEW_CONSENT.to_string());
        }
        guard.push(consent.clone());
        Ok(consent)
    }

    fn active_for_tenant(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<Consent>, RepositoryError> {
        let guard = self.records.lock().expect("consent mutex poisoned");
        Ok(guard
            .iter()
            .find(|consent| {
                &consent.tenant_id == tenant_id && consent.status == ConsentStatus::Active
            })
            .cloned())
    }

    fn list_for_tenant(&self, tenant_id: &TenantId) -> Result<Vec<Consent>, RepositoryError> {
        let guard = self.records.lock().expect("consent mutex poisoned");
        Ok(guard
            .iter()
            .filter(|consent| &consent.tenant_id == tenant_id)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryDirectory {
    profiles: Arc<Mutex<HashMap<TenantId, TenantProfile>>>,
}

impl MemoryDirectory {
    pub(super) fn with_tenant(id: TenantId, first_name: &str, last_name: &str) -> Self {
        let directory = Self::default();
        directory.insert(TenantProfile {
            id: id.clone(),
            personal: PersonalInfo {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email: format!(
                    "{}.{}@example.co.ke",
                    first_name.to_ascii_lowercase(),
                    last_name.to_ascii_lowercase()
                ),
            },
            verification: VerificationState::default(),
        });
        directory
    }

    pub(super) fn insert(&self, profile: TenantProfile) {
        self.profiles
            .lock()
            .expect("directory mutex poisoned")
            .insert(profile.id.clone(), profile);
    }

    pub(super) fn verification_state(&self, id: &TenantId) -> Option<VerificationState> {
        self.profiles
            .lock()
            .expect("directory mutex poisoned")
            .get(id)
            .map(|profile| profile.verification)
    }
}

impl TenantDirectory for MemoryDirectory {
    fn fetch(&self, id: &TenantId) -> Result<Option<TenantProfile>, DirectoryError> {
        let guard = self.profiles.lock().expect("directory mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn store_verification_state(
        &self,
        id: &TenantId,
        state: VerificationState,
    ) -> Result<(), DirectoryError> {
        let mut guard = self.profiles.lock().expect("directory mutex poisoned");
        match guard.get_mut(id) {
            Some(profile) => {
                profile.verification = state;
                Ok(())
            }
            None => Err(DirectoryError::Unavailable(format!(
                "tenant {} missing from directory",
                id
            ))),
        }
    }
}

/// Gateway fake that records every message and can be flipped unhealthy to
/// exercise the best-effort delivery paths.
#[derive(Default, Clone)]
pub(super) struct RecordingGateway {
    sent: Arc<Mutex<Vec<Notification>>>,
    unhealthy: Arc<AtomicBool>,
}

impl RecordingGateway {
    pub(super) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("gateway mutex poisoned").clone()
    }

    pub(super) fn set_unhealthy(&self, unhealthy: bool) {
        self.unhealthy.store(unhealthy, Ordering::Relaxed);
    }
}

impl NotificationGateway for RecordingGateway {
    fn send(&self, notification: Notification) -> bool {
        if self.unhealthy.load(Ordering::Relaxed) {
            return false;
        }
        self.sent
            .lock()
            .expect("gateway mutex poisoned")
            .push(notification);
        true
    }
}
