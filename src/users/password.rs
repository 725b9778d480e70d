use std::fmt;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use serde::{ser, Serialize, Serializer};
use tracing::error;

use crate::config::HashingConfig;

pub const HASH_NOT_VIEWABLE: &str = "Password hashes may not be viewed.";

/// Salted Argon2id hash of a user's password, in PHC string form.
///
/// Write-only: there is no accessor for the hash, `Debug` is redacted and
/// serializing it always fails, so a `User` cannot leak its credential
/// through generic serialization.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Rehydrate a digest read back from the store.
    pub(crate) fn from_stored(phc: String) -> Self {
        Self(phc)
    }

    /// The PHC string, for the store to persist.
    pub(crate) fn as_stored(&self) -> &str {
        &self.0
    }

    /// Check a plaintext against this digest. A wrong password is `false`,
    /// never an error.
    pub fn verify(&self, plain: &str) -> bool {
        let parsed = match PasswordHash::new(&self.0) {
            Ok(p) => p,
            Err(e) => {
                error!(error = %e, "argon2 parse hash error");
                return false;
            }
        };
        Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordDigest(<redacted>)")
    }
}

impl Serialize for PasswordDigest {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(ser::Error::custom(HASH_NOT_VIEWABLE))
    }
}

/// Hashes plaintext passwords with the configured Argon2id cost.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(cfg: &HashingConfig) -> anyhow::Result<Self> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 params: {e}"))?;
        Ok(Self { params })
    }

    pub fn hash(&self, plain: &str) -> anyhow::Result<PasswordDigest> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        let hash = argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(PasswordDigest(hash))
    }
}

#[cfg(test)]
pub(crate) fn cheap_hasher() -> PasswordHasher {
    PasswordHasher::new(&HashingConfig {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    })
    .expect("cheap argon2 params are valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let digest = cheap_hasher().hash("Secur3P@ssw0rd!").expect("hashing should succeed");
        assert!(digest.verify("Secur3P@ssw0rd!"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let digest = cheap_hasher()
            .hash("correct-horse-battery-staple")
            .expect("hashing should succeed");
        assert!(!digest.verify("wrong-password"));
        assert!(!digest.verify("correct-horse-battery-stapl"));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let hasher = cheap_hasher();
        let a = hasher.hash("abc123").unwrap();
        let b = hasher.hash("abc123").unwrap();
        assert_ne!(a.as_stored(), b.as_stored());
        assert!(a.verify("abc123") && b.verify("abc123"));
    }

    #[test]
    fn stored_hash_is_argon2id_phc_without_plaintext() {
        let digest = cheap_hasher().hash("abc123").unwrap();
        assert!(digest.as_stored().starts_with("$argon2id$"));
        assert!(!digest.as_stored().contains("abc123"));
    }

    #[test]
    fn empty_password_is_hashed_at_this_layer() {
        let digest = cheap_hasher().hash("").unwrap();
        assert!(digest.verify(""));
        assert!(!digest.verify(" "));
    }

    #[test]
    fn malformed_stored_hash_verifies_false() {
        let digest = PasswordDigest::from_stored("not-a-valid-hash".into());
        assert!(!digest.verify("anything"));
    }

    #[test]
    fn digest_cannot_be_serialized_or_debug_printed() {
        let digest = cheap_hasher().hash("abc123").unwrap();
        let err = serde_json::to_string(&digest).unwrap_err();
        assert!(err.to_string().contains(HASH_NOT_VIEWABLE));
        assert_eq!(format!("{digest:?}"), "PasswordDigest(<redacted>)");
    }

    #[test]
    fn invalid_cost_params_are_rejected() {
        let err = PasswordHasher::new(&HashingConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        })
        .unwrap_err();
        assert!(err.to_string().contains("invalid argon2 params"));
    }
}
