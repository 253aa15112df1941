//! Integration scenarios for the reference verification workflow.
//!
//! Scenarios run end-to-end through the public service facade: consent,
//! request, referee callbacks by token, and the scoring gate, using in-memory
//! collaborators so nothing reaches outside the process.

mod common {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Utc};

    use tenant_trust::verification::{
        Consent, ConsentRepository, ConsentStatus, DirectoryError, Notification,
        NotificationGateway, PersonalInfo, ReferenceId, ReferenceProvider, ReferenceRepository,
        ReferenceRequest, ReferenceResolution, ReferenceStatus, RepositoryError, TenantDirectory,
        TenantId, TenantProfile, VerificationPolicy, VerificationService, VerificationState,
        SUPERSEDED_BY_NEW_CONSENT,
    };

    pub type Service =
        VerificationService<MemoryReferences, MemoryConsents, MemoryDirectory, MemoryGateway>;

    pub fn tenant_id() -> TenantId {
        TenantId("tenant-e2e".to_string())
    }

    pub fn provider(name: &str) -> ReferenceProvider {
        ReferenceProvider {
            name: name.to_string(),
            email: format!(
                "{}@example.co.ke",
                name.to_ascii_lowercase().replace(' ', ".")
            ),
            phone: None,
            relationship: "referee".to_string(),
        }
    }

    pub fn build_service() -> (
        Arc<Service>,
        Arc<MemoryReferences>,
        Arc<MemoryConsents>,
        Arc<MemoryDirectory>,
        Arc<MemoryGateway>,
    ) {
        let references = Arc::new(MemoryReferences::default());
        let consents = Arc::new(MemoryConsents::default());
        let directory = Arc::new(MemoryDirectory::default());
        directory.insert(TenantProfile {
            id: tenant_id(),
            personal: PersonalInfo {
                first_name: "Wanjiku".to_string(),
                last_name: "Kamau".to_string(),
                email: "wanjiku.kamau@example.co.ke".to_string(),
            },
            verification: VerificationState::default(),
        });
        let gateway = Arc::new(MemoryGateway::default());
        let service = Arc::new(VerificationService::new(
            references.clone(),
            consents.clone(),
            directory.clone(),
            gateway.clone(),
            VerificationPolicy::default(),
        ));
        (service, references, consents, directory, gateway)
    }

    #[derive(Default, Clone)]
    pub struct MemoryReferences {
        records: Arc<Mutex<HashMap<ReferenceId, ReferenceRequest>>>,
    }

    impl MemoryReferences {
        /// Rewrites a record in place; scenarios use it to age timestamps.
        pub fn mutate<F>(&self, id: &ReferenceId, mutate: F)
        where
            F: FnOnce(&mut ReferenceRequest),
        {
            let mut guard = self.records.lock().expect("lock");
            let record = guard.get_mut(id).expect("record present");
            mutate(record);
        }
    }

    impl ReferenceRepository for MemoryReferences {
        fn insert(&self, record: ReferenceRequest) -> Result<ReferenceRequest, RepositoryError> {
            let mut guard = self.records.lock().expect("lock");
            if guard.contains_key(&record.id) {
                return Err(RepositoryError::Conflict);
            }
            guard.insert(record.id.clone(), record.clone());
            Ok(record)
        }

        fn update(&self, record: ReferenceRequest) -> Result<(), RepositoryError> {
            let mut guard = self.records.lock().expect("lock");
            guard.insert(record.id.clone(), record);
            Ok(())
        }

        fn fetch(&self, id: &ReferenceId) -> Result<Option<ReferenceRequest>, RepositoryError> {
            let guard = self.records.lock().expect("lock");
            Ok(guard.get(id).cloned())
        }

        fn fetch_actionable(
            &self,
            token: &str,
            now: DateTime<Utc>,
        ) -> Result<Option<ReferenceRequest>, RepositoryError> {
            let guard = self.records.lock().expect("lock");
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
            let mut guard = self.records.lock().expect("lock");
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
            let guard = self.records.lock().expect("lock");
            Ok(guard
                .values()
                .filter(|record| &record.tenant_id == tenant_id)
                .cloned()
                .collect())
        }
    }

    #[derive(Default, Clone)]
    pub struct MemoryConsents {
        records: Arc<Mutex<Vec<Consent>>>,
    }

    impl MemoryConsents {
        pub fn all_for(&self, tenant_id: &TenantId) -> Vec<Consent> {
            self.records
                .lock()
                .expect("lock")
                .iter()
                .filter(|consent| &consent.tenant_id == tenant_id)
                .cloned()
                .collect()
        }
    }

    impl ConsentRepository for MemoryConsents {
        fn create_active(
            &self,
            consent: Consent,
            now: DateTime<Utc>,
        ) -> Result<Consent, RepositoryError> {
            let mut guard = self.records.lock().expect("lock");
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
            let guard = self.records.lock().expect("lock");
            Ok(guard
                .iter()
                .find(|consent| {
                    &consent.tenant_id == tenant_id && consent.status == ConsentStatus::Active
                })
                .cloned())
        }

        fn list_for_tenant(
            &self,
            tenant_id: &TenantId,
        ) -> Result<Vec<Consent>, RepositoryError> {
            Ok(self.all_for(tenant_id))
        }
    }

    #[derive(Default, Clone)]
    pub struct MemoryDirectory {
        profiles: Arc<Mutex<HashMap<TenantId, TenantProfile>>>,
    }

    impl MemoryDirectory {
        pub fn insert(&self, profile: TenantProfile) {
            self.profiles
                .lock()
                .expect("lock")
                .insert(profile.id.clone(), profile);
        }

        pub fn verification_state(&self, id: &TenantId) -> Option<VerificationState> {
            self.profiles
                .lock()
                .expect("lock")
                .get(id)
                .map(|profile| profile.verification)
        }
    }

    impl TenantDirectory for MemoryDirectory {
        fn fetch(&self, id: &TenantId) -> Result<Option<TenantProfile>, DirectoryError> {
            Ok(self.profiles.lock().expect("lock").get(id).cloned())
        }

        fn store_verification_state(
            &self,
            id: &TenantId,
            state: VerificationState,
        ) -> Result<(), DirectoryError> {
            let mut guard = self.profiles.lock().expect("lock");
            match guard.get_mut(id) {
                Some(profile) => {
                    profile.verification = state;
                    Ok(())
                }
                None => Err(DirectoryError::Unavailable("tenant missing".to_string())),
            }
        }
    }

    #[derive(Default, Clone)]
    pub struct MemoryGateway {
        sent: Arc<Mutex<Vec<Notification>>>,
    }

    impl MemoryGateway {
        pub fn sent(&self) -> Vec<Notification> {
            self.sent.lock().expect("lock").clone()
        }
    }

    impl NotificationGateway for MemoryGateway {
        fn send(&self, notification: Notification) -> bool {
            self.sent.lock().expect("lock").push(notification);
            true
        }
    }
}

mod scenarios {
    use super::common::*;
    use chrono::{Duration, Utc};
    use tenant_trust::verification::{
        ConsentPermissions, ConsentStatus, DeclineReason, ReferenceStatus, ReferenceType,
        VerificationDetails, VerificationError,
    };

    #[test]
    fn fresh_consent_is_the_only_active_grant() {
        let (service, _, consents, _, _) = build_service();

        service
            .create_consent(&tenant_id(), "agent-001", ConsentPermissions::default(), None)
            .expect("first consent");
        service
            .create_consent(&tenant_id(), "agent-001", ConsentPermissions::default(), None)
            .expect("superseding consent");

        let all = consents.all_for(&tenant_id());
        let active = all
            .iter()
            .filter(|consent| consent.status == ConsentStatus::Active)
            .count();
        assert_eq!(active, 1);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn landlord_reference_drives_full_verification() {
        let (service, _, _, directory, _) = build_service();

        service
            .create_consent(&tenant_id(), "agent-001", ConsentPermissions::default(), None)
            .expect("consent");

        let record = service
            .request_reference(&tenant_id(), ReferenceType::PreviousLandlord, provider("Grace Mwangi"))
            .expect("reference created");
        assert_eq!(record.attempts.len(), 1);
        assert_eq!((record.expires_at - record.created_at).num_days(), 14);

        let completed = service
            .respond_reference(
                &record.token,
                "Two years, rent always on the first.".to_string(),
                5,
                VerificationDetails::Tenancy {
                    property_name: Some("Makadara Court".to_string()),
                    tenancy_duration_months: Some(24),
                    monthly_rent: Some(45_000),
                    water_bills_paid: true,
                    electrical_bills_paid: true,
                    deposit_returned: Some(true),
                },
            )
            .expect("response accepted");
        assert_eq!(completed.status, ReferenceStatus::Completed);

        let report = service.verify_tenant(&tenant_id()).expect("scored");
        assert!((report.verification_score - 24.0).abs() < 1e-9);
        assert!((report.total_possible_score - 24.0).abs() < 1e-9);
        assert_eq!(report.verification_percentage, 100);
        assert!(report.is_verified);

        let state = directory
            .verification_state(&tenant_id())
            .expect("tenant present");
        assert_eq!(state.progress, 100);
        assert!(state.is_verified);

        // Scenario 4: resending a completed request is an invalid state.
        match service.resend_reference(&completed.id) {
            Err(VerificationError::NotPending { status }) => assert_eq!(status, "completed"),
            other => panic!("expected invalid state, got {other:?}"),
        }
    }

    #[test]
    fn resend_rate_limits_inside_the_first_hour() {
        let (service, references, _, _, _) = build_service();

        let record = service
            .request_reference(&tenant_id(), ReferenceType::Employer, provider("Daniel Njoroge"))
            .expect("reference created");

        // Age the original send so the first manual resend is allowed.
        references.mutate(&record.id, |record| {
            if let Some(attempt) = record.attempts.last_mut() {
                attempt.sent_at -= Duration::hours(2);
            }
        });

        let outcome = service
            .resend_reference(&record.id)
            .expect("first resend succeeds");
        assert_eq!(outcome.attempt_number, 2);
        assert_eq!(outcome.remaining_attempts, 1);

        // Second and third resends inside the hour are both rejected.
        for _ in 0..2 {
            match service.resend_reference(&record.id) {
                Err(VerificationError::ResendCooldown { .. }) => {}
                other => panic!("expected cooldown, got {other:?}"),
            }
        }

        // Even outside the cooldown the third send is the last one allowed.
        references.mutate(&record.id, |record| {
            if let Some(attempt) = record.attempts.last_mut() {
                attempt.sent_at -= Duration::hours(2);
            }
            if let Some(last) = record.last_reminder_sent.as_mut() {
                *last -= Duration::hours(2);
            }
        });
        service.resend_reference(&record.id).expect("third send");
        references.mutate(&record.id, |record| {
            if let Some(attempt) = record.attempts.last_mut() {
                attempt.sent_at -= Duration::hours(2);
            }
        });
        match service.resend_reference(&record.id) {
            Err(VerificationError::AttemptsExhausted { max }) => assert_eq!(max, 3),
            other => panic!("expected attempts exhausted, got {other:?}"),
        }
    }

    #[test]
    fn declined_token_cannot_be_replayed_into_a_response() {
        let (service, _, _, _, _) = build_service();

        let record = service
            .request_reference(&tenant_id(), ReferenceType::Character, provider("Peter Kariuki"))
            .expect("reference created");

        let declined = service
            .decline_reference(
                &record.token,
                DeclineReason::NotAcquainted,
                Some("Moved away years ago.".to_string()),
            )
            .expect("decline accepted");
        assert_eq!(declined.status, ReferenceStatus::Declined);

        match service.respond_reference(
            &record.token,
            "changed my mind".to_string(),
            4,
            VerificationDetails::Community {
                years_known: Some(3),
                community_role: None,
                community_standing: None,
            },
        ) {
            Err(VerificationError::RequestNotFound) => {}
            other => panic!("expected uniform not found, got {other:?}"),
        }
    }

    #[test]
    fn expired_window_blocks_referee_callbacks() {
        let (service, references, _, _, _) = build_service();

        let record = service
            .request_reference(&tenant_id(), ReferenceType::Character, provider("Peter Kariuki"))
            .expect("reference created");
        references.mutate(&record.id, |record| {
            record.expires_at = Utc::now() - Duration::days(1);
        });

        match service.respond_reference(
            &record.token,
            "too late".to_string(),
            5,
            VerificationDetails::Community {
                years_known: Some(3),
                community_role: None,
                community_standing: None,
            },
        ) {
            Err(VerificationError::RequestNotFound) => {}
            other => panic!("expected uniform not found, got {other:?}"),
        }
    }

    #[test]
    fn mixed_reference_portfolio_accumulates_weighted_score() {
        let (service, _, _, _, gateway) = build_service();

        let landlord = service
            .request_reference(&tenant_id(), ReferenceType::PreviousLandlord, provider("Grace Mwangi"))
            .expect("landlord reference");
        service
            .respond_reference(
                &landlord.token,
                "Excellent tenant.".to_string(),
                5,
                VerificationDetails::Tenancy {
                    property_name: Some("Makadara Court".to_string()),
                    tenancy_duration_months: Some(24),
                    monthly_rent: Some(45_000),
                    water_bills_paid: true,
                    electrical_bills_paid: true,
                    deposit_returned: Some(true),
                },
            )
            .expect("landlord response");

        let employer = service
            .request_reference(&tenant_id(), ReferenceType::Employer, provider("Daniel Njoroge"))
            .expect("employer reference");
        service
            .respond_reference(
                &employer.token,
                "Permanent staff, four years.".to_string(),
                4,
                VerificationDetails::Employment {
                    position: Some("Logistics Coordinator".to_string()),
                    employment_duration_months: Some(48),
                    gross_monthly_salary: Some(90_000),
                    employer_kra_pin: Some("P051234567X".to_string()),
                    salary_slip_verified: true,
                },
            )
            .expect("employer response");

        let report = service.verify_tenant(&tenant_id()).expect("scored");
        // landlord: 5 x 4.0 x 1.2 = 24 of 24; employer: 4 x 3.0 x 1.15 = 13.8 of 17.25
        assert!((report.verification_score - 37.8).abs() < 1e-9);
        assert!((report.total_possible_score - 41.25).abs() < 1e-9);
        assert_eq!(report.verification_percentage, 92);
        assert!(report.is_verified);
        assert_eq!(report.references.len(), 2);

        let kinds: Vec<_> = gateway
            .sent()
            .iter()
            .map(|notification| notification.kind().to_string())
            .collect();
        assert!(kinds.contains(&"verification_status".to_string()));
    }
}
