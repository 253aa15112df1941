use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{DeclineReason, ReferenceType};

/// Typed message descriptors handed to the delivery channel.
///
/// The gateway owns templating and transport; the engine only enumerates the
/// payload each call site provides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    ReferenceRequest {
        provider_name: String,
        provider_email: String,
        tenant_name: String,
        reference_type: ReferenceType,
        token: String,
        expires_at: DateTime<Utc>,
    },
    ReferenceReminder {
        provider_name: String,
        provider_email: String,
        tenant_name: String,
        reference_type: ReferenceType,
        token: String,
        attempt_number: u8,
        days_until_expiry: i64,
    },
    ReferenceCompleted {
        tenant_name: String,
        tenant_email: String,
        provider_name: String,
        reference_type: ReferenceType,
        rating: u8,
    },
    ReferenceDeclined {
        tenant_name: String,
        tenant_email: String,
        provider_name: String,
        reference_type: ReferenceType,
        reason: DeclineReason,
    },
    VerificationStatus {
        tenant_name: String,
        tenant_email: String,
        percentage: u8,
        newly_verified: bool,
    },
}

impl Notification {
    pub const fn kind(&self) -> &'static str {
        match self {
            Notification::ReferenceRequest { .. } => "reference_request",
            Notification::ReferenceReminder { .. } => "reference_reminder",
            Notification::ReferenceCompleted { .. } => "reference_completed",
            Notification::ReferenceDeclined { .. } => "reference_declined",
            Notification::VerificationStatus { .. } => "verification_status",
        }
    }
}

/// Outbound delivery channel.
///
/// Implementations report success as `true` and map every transport failure
/// to `false`; they never propagate errors. Delivery is best-effort by
/// policy: a failed send must not undo the state transition that produced it.
pub trait NotificationGateway: Send + Sync {
    fn send(&self, notification: Notification) -> bool;
}
