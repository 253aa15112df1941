use rand::rngs::OsRng;
use rand::RngCore;

const TOKEN_BYTES: usize = 32;

/// Generate an opaque, single-use referee token.
///
/// Tokens stand in for authentication on the referee-facing endpoints, so
/// they are drawn from the operating system CSPRNG and hex-encoded. A 32-byte
/// source leaves a 2^256 space; guessing is not a practical attack.
pub(crate) fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
