use serde::{Deserialize, Serialize};

use super::domain::TenantId;

/// Contact fields resolved for notification payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl PersonalInfo {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Verification summary owned by the tenant record. Only the scoring engine
/// writes it; the verified flag is a one-way gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationState {
    pub progress: u8,
    pub is_verified: bool,
}

/// Tenant profile snapshot resolved from the tenant directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantProfile {
    pub id: TenantId,
    pub personal: PersonalInfo,
    #[serde(default)]
    pub verification: VerificationState,
}

/// External tenant directory. Profile CRUD lives outside this crate; the
/// engine only resolves contact fields and persists the verification summary.
pub trait TenantDirectory: Send + Sync {
    fn fetch(&self, id: &TenantId) -> Result<Option<TenantProfile>, DirectoryError>;

    fn store_verification_state(
        &self,
        id: &TenantId,
        state: VerificationState,
    ) -> Result<(), DirectoryError>;
}

/// Error enumeration for directory failures.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("tenant directory unavailable: {0}")]
    Unavailable(String),
}
