//! One-time codes for email verification and password reset.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Six-digit numeric code, zero padded.
pub fn generate_numeric_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", code)
}

/// Codes are stored hashed; this is a lookup digest, not a password hash.
pub fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.trim().as_bytes());
    hex::encode(hasher.finalize())
}
