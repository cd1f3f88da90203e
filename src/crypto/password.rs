//! Password hashing for user accounts.
//!
//! PBKDF2-HMAC-SHA256 over a per-account random salt. Hash and salt are
//! stored base64-encoded in `users_accounts`; comparison is constant-time.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::CryptoError;

pub const PBKDF2_ITERATIONS: u32 = if cfg!(test) { 1_000 } else { 600_000 };
pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 32;

/// Encoded password material as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    pub hash: String,
    pub salt: String,
}

/// Generate a cryptographically random salt
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

fn derive(password: &str, salt: &[u8]) -> Zeroizing<[u8; HASH_LENGTH]> {
    let mut out = Zeroizing::new([0u8; HASH_LENGTH]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, out.as_mut());
    out
}

/// Hash a password with a fresh salt.
pub fn hash_password(password: &str) -> PasswordHash {
    let salt = generate_salt();
    let derived = derive(password, &salt);
    PasswordHash {
        hash: BASE64.encode(derived.as_ref()),
        salt: BASE64.encode(salt),
    }
}

/// Check a password against stored hash + salt.
pub fn verify_password(
    password: &str,
    stored_hash: &str,
    stored_salt: &str,
) -> Result<bool, CryptoError> {
    let salt = BASE64
        .decode(stored_salt)
        .map_err(|_| CryptoError::CorruptedHash)?;
    if salt.len() != SALT_LENGTH {
        return Err(CryptoError::InvalidSaltLength(salt.len()));
    }
    let expected = Zeroizing::new(
        BASE64
            .decode(stored_hash)
            .map_err(|_| CryptoError::CorruptedHash)?,
    );
    let derived = derive(password, &salt);
    Ok(derived.as_ref().ct_eq(expected.as_slice()).into())
}
