//! Password hashing and verification.
//!
//! New hashes are always Argon2id PHC strings. Accounts migrated from the
//! previous platform still carry PBKDF2-SHA256 or scrypt hashes in the
//! `method$salt$hex` layout, so verification walks an ordered list of
//! schemes and the first one that accepts the password wins.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString},
    Argon2, PasswordVerifier as _,
};
use sha2::Sha256;
use std::sync::OnceLock;
use subtle::ConstantTimeEq;

/// Newtype for password to prevent accidental logging
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

/// Newtype for password hash
#[derive(Clone)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for PasswordHashString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHashString(<redacted>)")
    }
}

/// One stored-hash encoding the service can check passwords against.
pub trait PasswordScheme: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns false for hashes in a foreign format as well as for wrong passwords.
    fn verify(&self, password: &Password, hash: &str) -> bool;
}

/// Argon2id PHC strings (`$argon2id$v=19$...`).
pub struct Argon2Scheme;

impl PasswordScheme for Argon2Scheme {
    fn name(&self) -> &'static str {
        "argon2"
    }

    fn verify(&self, password: &Password, hash: &str) -> bool {
        if !hash.starts_with("$argon2") {
            return false;
        }
        match PasswordHash::new(hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_str().as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

/// Legacy `pbkdf2:sha256:<iterations>$<salt>$<hex digest>`.
pub struct Pbkdf2Sha256Scheme;

impl Pbkdf2Sha256Scheme {
    const PREFIX: &'static str = "pbkdf2:sha256:";

    /// Encode a hash in the legacy layout.
    pub fn encode(password: &Password, salt: &str, iterations: u32) -> String {
        let digest = Self::derive(password, salt, iterations);
        format!("{}{}${}${}", Self::PREFIX, iterations, salt, hex::encode(digest))
    }

    fn derive(password: &Password, salt: &str, iterations: u32) -> [u8; 32] {
        let mut out = [0u8; 32];
        pbkdf2::pbkdf2_hmac::<Sha256>(
            password.as_str().as_bytes(),
            salt.as_bytes(),
            iterations,
            &mut out,
        );
        out
    }
}

impl PasswordScheme for Pbkdf2Sha256Scheme {
    fn name(&self) -> &'static str {
        "pbkdf2_sha256"
    }

    fn verify(&self, password: &Password, hash: &str) -> bool {
        let Some(rest) = hash.strip_prefix(Self::PREFIX) else {
            return false;
        };
        let Some((method, salt, expected)) = split_legacy(rest) else {
            return false;
        };
        let Ok(iterations) = method.parse::<u32>() else {
            return false;
        };
        if iterations == 0 {
            return false;
        }

        let digest = Self::derive(password, salt, iterations);
        constant_time_eq(&digest, &expected)
    }
}

/// Legacy `scrypt:<N>:<r>:<p>$<salt>$<hex digest>` with a 64-byte key.
pub struct ScryptScheme;

impl ScryptScheme {
    const PREFIX: &'static str = "scrypt:";
    const KEY_LEN: usize = 64;

    /// Encode a hash in the legacy layout. `n` must be a power of two.
    pub fn encode(
        password: &Password,
        salt: &str,
        n: u64,
        r: u32,
        p: u32,
    ) -> Result<String, anyhow::Error> {
        let digest = Self::derive(password, salt, n, r, p)?;
        Ok(format!(
            "{}{}:{}:{}${}${}",
            Self::PREFIX,
            n,
            r,
            p,
            salt,
            hex::encode(digest)
        ))
    }

    fn derive(
        password: &Password,
        salt: &str,
        n: u64,
        r: u32,
        p: u32,
    ) -> Result<Vec<u8>, anyhow::Error> {
        if n < 2 || !n.is_power_of_two() {
            return Err(anyhow::anyhow!("scrypt N must be a power of two"));
        }
        let log_n = n.trailing_zeros() as u8;
        let params = scrypt::Params::new(log_n, r, p, Self::KEY_LEN)
            .map_err(|e| anyhow::anyhow!("Invalid scrypt parameters: {}", e))?;

        let mut out = vec![0u8; Self::KEY_LEN];
        scrypt::scrypt(password.as_str().as_bytes(), salt.as_bytes(), &params, &mut out)
            .map_err(|e| anyhow::anyhow!("scrypt failed: {}", e))?;
        Ok(out)
    }
}

impl PasswordScheme for ScryptScheme {
    fn name(&self) -> &'static str {
        "scrypt"
    }

    fn verify(&self, password: &Password, hash: &str) -> bool {
        let Some(rest) = hash.strip_prefix(Self::PREFIX) else {
            return false;
        };
        let Some((method, salt, expected)) = split_legacy(rest) else {
            return false;
        };

        let mut parts = method.split(':').map(str::parse::<u64>);
        let (Some(Ok(n)), Some(Ok(r)), Some(Ok(p)), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        let (Ok(r), Ok(p)) = (u32::try_from(r), u32::try_from(p)) else {
            return false;
        };

        match Self::derive(password, salt, n, r, p) {
            Ok(digest) => constant_time_eq(&digest, &expected),
            Err(_) => false,
        }
    }
}

/// Split `<params>$<salt>$<hex>` and decode the digest.
fn split_legacy(rest: &str) -> Option<(&str, &str, Vec<u8>)> {
    let mut parts = rest.splitn(3, '$');
    let method = parts.next()?;
    let salt = parts.next()?;
    let digest = hex::decode(parts.next()?).ok()?;
    if salt.is_empty() || digest.is_empty() {
        return None;
    }
    Some((method, salt, digest))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

/// Ordered list of schemes; the first one that accepts the password wins.
pub struct PasswordVerifier {
    schemes: Vec<Box<dyn PasswordScheme>>,
    /// Argon2 hash burned through when there is no account to check against.
    dummy_hash: OnceLock<Option<PasswordHashString>>,
}

impl Default for PasswordVerifier {
    fn default() -> Self {
        Self::new(vec![
            Box::new(Argon2Scheme),
            Box::new(Pbkdf2Sha256Scheme),
            Box::new(ScryptScheme),
        ])
    }
}

impl PasswordVerifier {
    pub fn new(schemes: Vec<Box<dyn PasswordScheme>>) -> Self {
        Self {
            schemes,
            dummy_hash: OnceLock::new(),
        }
    }

    /// Name of the matching scheme, or `None` if no scheme accepts the password.
    pub fn verify(&self, password: &Password, hash: &PasswordHashString) -> Option<&'static str> {
        self.schemes
            .iter()
            .find(|scheme| scheme.verify(password, hash.as_str()))
            .map(|scheme| scheme.name())
    }

    /// Verify against an account's stored hash, if there is an account.
    ///
    /// A missing account still runs the chain against a fixed Argon2 hash and
    /// always fails, so unknown emails cost the same as wrong passwords.
    pub fn verify_account(
        &self,
        password: &Password,
        stored: Option<&PasswordHashString>,
    ) -> Option<&'static str> {
        match stored {
            Some(hash) => self.verify(password, hash),
            None => {
                if let Some(dummy) = self.dummy_hash() {
                    let _ = self.verify(password, dummy);
                }
                None
            }
        }
    }

    fn dummy_hash(&self) -> Option<&PasswordHashString> {
        self.dummy_hash
            .get_or_init(|| {
                hash_password(&Password::new("no-such-account".to_string()))
                    .map_err(|e| tracing::error!(error = %e, "Failed to build dummy password hash"))
                    .ok()
            })
            .as_ref()
    }

    /// Whether a hash matched by `scheme_name` should be rewritten as Argon2.
    pub fn needs_rehash(scheme_name: &str) -> bool {
        scheme_name != Argon2Scheme.name()
    }
}

/// Hash a password using Argon2
///
/// Uses Argon2id variant with secure default parameters.
/// Salt is automatically generated and included in the hash.
pub fn hash_password(password: &Password) -> Result<PasswordHashString, anyhow::Error> {
    let argon2 = Argon2::default();
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = argon2
        .hash_password(password.as_str().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(PasswordHashString::new(password_hash))
}

/// Verify a password against any supported hash format.
pub fn verify_password(
    password: &Password,
    password_hash: &PasswordHashString,
) -> Result<(), anyhow::Error> {
    PasswordVerifier::default()
        .verify(password, password_hash)
        .map(|_| ())
        .ok_or_else(|| anyhow::anyhow!("Password verification failed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pw(s: &str) -> Password {
        Password::new(s.to_string())
    }

    #[test]
    fn test_hash_password() {
        let password = pw("mySecurePassword123");
        let hash = hash_password(&password).expect("Failed to hash password");

        assert!(hash.as_str().starts_with("$argon2"));
    }

    #[test]
    fn test_argon2_scheme() {
        let password = pw("mySecurePassword123");
        let hash = hash_password(&password).unwrap();

        assert!(Argon2Scheme.verify(&password, hash.as_str()));
        assert!(!Argon2Scheme.verify(&pw("wrongPassword"), hash.as_str()));
        assert!(!Argon2Scheme.verify(&password, "pbkdf2:sha256:1000$salt$00"));
    }

    #[test]
    fn test_pbkdf2_scheme() {
        let password = pw("legacy-secret");
        let hash = Pbkdf2Sha256Scheme::encode(&password, "NaClNaCl", 1000);

        assert!(hash.starts_with("pbkdf2:sha256:1000$NaClNaCl$"));
        assert!(Pbkdf2Sha256Scheme.verify(&password, &hash));
        assert!(!Pbkdf2Sha256Scheme.verify(&pw("legacy-secreT"), &hash));
        assert!(!Pbkdf2Sha256Scheme.verify(&password, "pbkdf2:sha256:abc$salt$00ff"));
        assert!(!Pbkdf2Sha256Scheme.verify(&password, "scrypt:1024:8:1$salt$00ff"));
    }

    #[test]
    fn test_pbkdf2_known_vector() {
        // RFC 7914 section 11 test vector for PBKDF2-HMAC-SHA256, c = 1.
        let expected = "55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc";
        let hash = format!("pbkdf2:sha256:1$salt${}", expected);
        assert!(Pbkdf2Sha256Scheme.verify(&pw("passwd"), &hash));
    }

    #[test]
    fn test_scrypt_scheme() {
        let password = pw("older-secret");
        let hash = ScryptScheme::encode(&password, "pepper", 1024, 8, 1).unwrap();

        assert!(hash.starts_with("scrypt:1024:8:1$pepper$"));
        assert!(ScryptScheme.verify(&password, &hash));
        assert!(!ScryptScheme.verify(&pw("older-secreT"), &hash));
        assert!(!ScryptScheme.verify(&password, "scrypt:1000:8:1$pepper$00ff"));
    }

    #[test]
    fn test_scrypt_rejects_non_power_of_two() {
        assert!(ScryptScheme::encode(&pw("x"), "salt", 1000, 8, 1).is_err());
    }

    #[test]
    fn test_verifier_chain_first_match_wins() {
        let verifier = PasswordVerifier::default();
        let password = pw("chain-secret");

        let argon = hash_password(&password).unwrap();
        let pbkdf2 = PasswordHashString::new(Pbkdf2Sha256Scheme::encode(&password, "s1", 1000));
        let scrypt =
            PasswordHashString::new(ScryptScheme::encode(&password, "s2", 1024, 8, 1).unwrap());

        assert_eq!(verifier.verify(&password, &argon), Some("argon2"));
        assert_eq!(verifier.verify(&password, &pbkdf2), Some("pbkdf2_sha256"));
        assert_eq!(verifier.verify(&password, &scrypt), Some("scrypt"));
        assert_eq!(verifier.verify(&pw("nope"), &pbkdf2), None);
        assert_eq!(
            verifier.verify(&password, &PasswordHashString::new("garbage".to_string())),
            None
        );
    }

    struct CountingScheme(std::sync::Arc<std::sync::atomic::AtomicUsize>);

    impl PasswordScheme for CountingScheme {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn verify(&self, password: &Password, hash: &str) -> bool {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Argon2Scheme.verify(password, hash)
        }
    }

    #[test]
    fn test_missing_account_still_runs_the_chain() {
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let verifier = PasswordVerifier::new(vec![Box::new(CountingScheme(calls.clone()))]);
        let password = pw("no-such-account");
        let hash = hash_password(&pw("real-secret")).unwrap();

        assert_eq!(verifier.verify_account(&password, Some(&hash)), None);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);

        // Even the dummy's own password never authenticates a missing account
        assert_eq!(verifier.verify_account(&password, None), None);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);

        assert_eq!(
            verifier.verify_account(&pw("real-secret"), Some(&hash)),
            Some("counting")
        );
    }

    #[test]
    fn test_needs_rehash() {
        assert!(!PasswordVerifier::needs_rehash("argon2"));
        assert!(PasswordVerifier::needs_rehash("pbkdf2_sha256"));
        assert!(PasswordVerifier::needs_rehash("scrypt"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let password = pw("super-secret");
        assert!(!format!("{:?}", password).contains("super-secret"));
        let hash = PasswordHashString::new("$argon2id$abc".to_string());
        assert!(!format!("{:?}", hash).contains("argon2id"));
    }
}
