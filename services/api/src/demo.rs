use std::sync::Arc;

use clap::Args;
use tenant_trust::error::AppError;
use tenant_trust::verification::{
    ConsentPermissions, DeclineReason, ReferenceProvider, ReferenceType, TenantId,
    VerificationDetails, VerificationService,
};

use crate::infra::{
    default_verification_policy, seed_sample_tenants, InMemoryConsentRepository,
    InMemoryNotificationGateway, InMemoryReferenceRepository, InMemoryTenantDirectory,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Rating the demo landlord referee submits (1-5)
    #[arg(long, default_value_t = 5)]
    pub(crate) rating: u8,
    /// Skip the employer reference and score on the landlord alone
    #[arg(long)]
    pub(crate) skip_employer: bool,
}

/// End-to-end walk of the engine: consent, two reference requests, one
/// referee response each, one decline, and the scoring gate.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let references = Arc::new(InMemoryReferenceRepository::default());
    let consents = Arc::new(InMemoryConsentRepository::default());
    let directory = Arc::new(InMemoryTenantDirectory::default());
    seed_sample_tenants(&directory);
    let gateway = Arc::new(InMemoryNotificationGateway::default());
    let service = VerificationService::new(
        references,
        consents,
        directory,
        gateway.clone(),
        default_verification_policy(),
    );

    let tenant = TenantId("tenant-001".to_string());
    println!("Reference verification demo for {}", tenant.0);

    let consent = service.create_consent(&tenant, "agent-demo", ConsentPermissions::default(), None)?;
    println!(
        "- consent {} granted ({} month retention)",
        consent.id, consent.data_retention.retention_period_months
    );

    let landlord = service.request_reference(
        &tenant,
        ReferenceType::PreviousLandlord,
        ReferenceProvider {
            name: "Grace Mwangi".to_string(),
            email: "grace.mwangi@example.co.ke".to_string(),
            phone: Some("+254700111222".to_string()),
            relationship: "former landlord".to_string(),
        },
    )?;
    println!(
        "- landlord reference {} requested, token expires {}",
        landlord.id,
        landlord.expires_at.format("%Y-%m-%d")
    );

    let completed = service.respond_reference(
        &landlord.token,
        "Rent always arrived by the first of the month.".to_string(),
        args.rating,
        VerificationDetails::Tenancy {
            property_name: Some("Makadara Court".to_string()),
            tenancy_duration_months: Some(30),
            monthly_rent: Some(42_000),
            water_bills_paid: true,
            electrical_bills_paid: true,
            deposit_returned: Some(true),
        },
    )?;
    println!(
        "- landlord responded with rating {}/5",
        completed.rating.unwrap_or_default()
    );

    if !args.skip_employer {
        let employer = service.request_reference(
            &tenant,
            ReferenceType::Employer,
            ReferenceProvider {
                name: "Daniel Njoroge".to_string(),
                email: "hr@example.co.ke".to_string(),
                phone: None,
                relationship: "HR manager".to_string(),
            },
        )?;
        service.respond_reference(
            &employer.token,
            "Permanent staff for four years.".to_string(),
            4,
            VerificationDetails::Employment {
                position: Some("Logistics Coordinator".to_string()),
                employment_duration_months: Some(48),
                gross_monthly_salary: Some(90_000),
                employer_kra_pin: Some("P051234567X".to_string()),
                salary_slip_verified: true,
            },
        )?;
        println!("- employer responded with rating 4/5 (KRA pin and salary slip corroborated)");
    }

    let character = service.request_reference(
        &tenant,
        ReferenceType::Character,
        ReferenceProvider {
            name: "Peter Kariuki".to_string(),
            email: "peter.kariuki@example.co.ke".to_string(),
            phone: None,
            relationship: "neighbor".to_string(),
        },
    )?;
    service.decline_reference(
        &character.token,
        DeclineReason::NotAcquainted,
        Some("Moved away before the tenancy started.".to_string()),
    )?;
    println!("- character referee declined (not acquainted); excluded from scoring");

    let report = service.verify_tenant(&tenant)?;
    println!(
        "\nScore {:.2} of {:.2} -> {}%{}",
        report.verification_score,
        report.total_possible_score,
        report.verification_percentage,
        if report.is_verified {
            " (verified)"
        } else {
            ""
        }
    );
    for component in &report.references {
        println!(
            "  {} {} rated {}/5, weight {:.1} x bonus {:.2} = {:.2} points",
            component.reference_id,
            component.reference_type.label(),
            component.rating,
            component.weight,
            component.bonus_multiplier,
            component.points
        );
    }

    println!("\nNotifications dispatched: {}", gateway.events().len());
    for event in gateway.events() {
        println!("  - {}", event.kind());
    }

    Ok(())
}
