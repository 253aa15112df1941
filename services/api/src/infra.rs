use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use tenant_trust::verification::{
    Consent, ConsentRepository, ConsentStatus, DirectoryError, Notification, NotificationGateway,
    PersonalInfo, ReferenceId, ReferenceRepository, ReferenceRequest, ReferenceResolution,
    ReferenceStatus, RepositoryError, TenantDirectory, TenantId, TenantProfile,
    VerificationPolicy, VerificationState, SUPERSEDED_BY_NEW_CONSENT,
};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryReferenceRepository {
    records: Arc<Mutex<HashMap<ReferenceId, ReferenceRequest>>>,
}

impl ReferenceRepository for InMemoryReferenceRepository {
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
        // The whole check-and-write runs under one lock; that is what makes
        // the single-use token guarantee hold for concurrent callers.
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
pub(crate) struct InMemoryConsentRepository {
    records: Arc<Mutex<Vec<Consent>>>,
}

impl ConsentRepository for InMemoryConsentRepository {
    fn create_active(
        &self,
        consent: Consent,
        now: DateTime<Utc>,
    ) -> Result<Consent, RepositoryError> {
        // Revoke-then-insert under one lock keeps the single-active-consent
        // invariant for concurrent grants on the same tenant.
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
pub(crate) struct InMemoryTenantDirectory {
    profiles: Arc<Mutex<HashMap<TenantId, TenantProfile>>>,
}

impl InMemoryTenantDirectory {
    pub(crate) fn insert(&self, profile: TenantProfile) {
        self.profiles
            .lock()
            .expect("directory mutex poisoned")
            .insert(profile.id.clone(), profile);
    }
}

impl TenantDirectory for InMemoryTenantDirectory {
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
                "tenant {id} missing from directory"
            ))),
        }
    }
}

/// Gateway adapter that records dispatches and logs them. A production
/// deployment swaps in the real email/SMS channel here.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotificationGateway {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl InMemoryNotificationGateway {
    pub(crate) fn events(&self) -> Vec<Notification> {
        self.sent.lock().expect("gateway mutex poisoned").clone()
    }
}

impl NotificationGateway for InMemoryNotificationGateway {
    fn send(&self, notification: Notification) -> bool {
        info!(kind = notification.kind(), "dispatching notification");
        self.sent
            .lock()
            .expect("gateway mutex poisoned")
            .push(notification);
        true
    }
}

pub(crate) fn default_verification_policy() -> VerificationPolicy {
    VerificationPolicy::default()
}

/// Stage a handful of tenants so the in-memory deployment has someone to
/// verify out of the box.
pub(crate) fn seed_sample_tenants(directory: &InMemoryTenantDirectory) {
    let samples = [
        ("tenant-001", "Wanjiku", "Kamau"),
        ("tenant-002", "Brian", "Ochieng"),
    ];
    for (id, first_name, last_name) in samples {
        directory.insert(TenantProfile {
            id: TenantId(id.to_string()),
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
    }
    info!(
        count = samples.len(),
        "seeded sample tenants into the in-memory directory"
    );
}
