use serde::{Deserialize, Serialize};

/// Operational dials for the reference lifecycle and the verification gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationPolicy {
    /// Days a request stays actionable after creation.
    pub request_ttl_days: i64,
    /// Total sends allowed per request, the original included.
    pub max_send_attempts: u8,
    /// Minimum spacing between two sends for the same request.
    pub resend_cooldown_minutes: i64,
    /// Percentage at which a tenant crosses into verified status.
    pub verified_threshold: u8,
    /// Progress gain (in points) large enough to notify the tenant about.
    pub notify_progress_delta: u8,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            request_ttl_days: 14,
            max_send_attempts: 3,
            resend_cooldown_minutes: 60,
            verified_threshold: 70,
            notify_progress_delta: 10,
        }
    }
}
