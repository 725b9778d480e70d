use anyhow::Context;
use serde::Deserialize;

/// Argon2 cost parameters applied when hashing new passwords.
#[derive(Debug, Clone, Deserialize)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        // argon2 crate defaults (OWASP minimum for Argon2id)
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub hashing: HashingConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL is not set")?;
        let defaults = HashingConfig::default();
        let hashing = HashingConfig {
            memory_kib: parse_or(&lookup, "PASSWORD_HASH_MEMORY_KIB", defaults.memory_kib),
            iterations: parse_or(&lookup, "PASSWORD_HASH_ITERATIONS", defaults.iterations),
            parallelism: parse_or(&lookup, "PASSWORD_HASH_PARALLELISM", defaults.parallelism),
        };
        Ok(Self {
            database_url,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10),
            hashing,
        })
    }
}

fn parse_or<F>(lookup: &F, key: &str, default: u32) -> u32
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let cfg = AppConfig::from_lookup(lookup_from(&[(
            "DATABASE_URL",
            "postgres://localhost/recipes",
        )]))
        .expect("config should load");
        assert_eq!(cfg.database_url, "postgres://localhost/recipes");
        assert_eq!(cfg.max_connections, 10);
        assert_eq!(cfg.hashing.memory_kib, 19456);
        assert_eq!(cfg.hashing.iterations, 2);
        assert_eq!(cfg.hashing.parallelism, 1);
    }

    #[test]
    fn overrides_and_unparsable_values() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/recipes"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("PASSWORD_HASH_ITERATIONS", "3"),
            ("PASSWORD_HASH_MEMORY_KIB", "lots"),
        ]))
        .expect("config should load");
        assert_eq!(cfg.max_connections, 4);
        assert_eq!(cfg.hashing.iterations, 3);
        assert_eq!(cfg.hashing.memory_kib, 19456);
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }
}
