use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;

use crate::error::{Error, Result};

const ARGON2_MEMORY: u32 = 64 * 1024; // 64KB
const ARGON2_ITERATIONS: u32 = 1;
const ARGON2_PARALLELISM: u32 = 4;
const ARGON2_OUTPUT_LEN: usize = 32;

const TOKEN_PREFIX: &str = "devdir";
const LOOKUP_LENGTH: usize = 8;
const SECRET_LENGTH: usize = 24;
const SECRET_BYTES: usize = 12;

/// A freshly minted session token. Only `raw` ever leaves the server; the
/// database stores the lookup key and the Argon2id hash.
pub struct IssuedToken {
    pub raw: String,
    pub lookup: String,
    pub hash: String,
}

pub struct TokenGenerator {
    argon2: Argon2<'static>,
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenGenerator {
    #[must_use]
    pub fn new() -> Self {
        let params = Params::new(
            ARGON2_MEMORY,
            ARGON2_ITERATIONS,
            ARGON2_PARALLELISM,
            Some(ARGON2_OUTPUT_LEN),
        )
        .expect("invalid argon2 params");

        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Mints a session token of the form `devdir_<lookup>_<secret>`.
    pub fn issue(&self) -> Result<IssuedToken> {
        let lookup = uuid::Uuid::new_v4().to_string()[..LOOKUP_LENGTH].to_string();

        let mut bytes = [0u8; SECRET_BYTES];
        rand::thread_rng().fill(&mut bytes);
        let secret = &hex::encode(&bytes)[..SECRET_LENGTH];

        let raw = format!("{TOKEN_PREFIX}_{lookup}_{secret}");
        let hash = self.hash(&raw)?;
        Ok(IssuedToken { raw, lookup, hash })
    }

    fn hash(&self, token: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(token.as_bytes(), &salt)
            .map_err(|e| Error::Config(format!("failed to hash token: {e}")))?;
        Ok(hash.to_string())
    }

    /// Verifies a raw token against its stored hash. A mismatch is a normal
    /// `false`; only malformed hashes are errors.
    pub fn verify(&self, token: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| Error::Config(format!("invalid hash format: {e}")))?;

        match self.argon2.verify_password(token.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Config(format!("failed to verify token: {e}"))),
        }
    }
}

/// Splits a presented token into (lookup, secret), rejecting anything that
/// does not match the issued shape exactly.
pub fn parse_token(token: &str) -> Result<(String, String)> {
    let mut parts = token.split('_');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(TOKEN_PREFIX), Some(lookup), Some(secret), None)
            if lookup.len() == LOOKUP_LENGTH && secret.len() == SECRET_LENGTH =>
        {
            Ok((lookup.to_string(), secret.to_string()))
        }
        _ => Err(Error::InvalidTokenFormat),
    }
}

mod hex {
    const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

    pub fn encode(bytes: &[u8]) -> String {
        let mut s = String::with_capacity(bytes.len() * 2);
        for &b in bytes {
            s.push(HEX_CHARS[(b >> 4) as usize] as char);
            s.push(HEX_CHARS[(b & 0x0f) as usize] as char);
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_token_shape() {
        let generator = TokenGenerator::new();
        let token = generator.issue().unwrap();

        assert!(token.raw.starts_with("devdir_"));
        assert_eq!(token.lookup.len(), 8);

        let (lookup, secret) = parse_token(&token.raw).unwrap();
        assert_eq!(lookup, token.lookup);
        assert_eq!(secret.len(), 24);
    }

    #[test]
    fn test_verify_accepts_issued_token() {
        let generator = TokenGenerator::new();
        let token = generator.issue().unwrap();

        assert!(generator.verify(&token.raw, &token.hash).unwrap());
    }

    #[test]
    fn test_verify_rejects_tampered_secret() {
        let generator = TokenGenerator::new();
        let token = generator.issue().unwrap();

        let tampered = format!("{}abcde", &token.raw[..token.raw.len() - 5]);
        assert!(!generator.verify(&tampered, &token.hash).unwrap());
    }

    #[test]
    fn test_parse_token_valid() {
        let (lookup, secret) = parse_token("devdir_12345678_123456789012345678901234").unwrap();
        assert_eq!(lookup, "12345678");
        assert_eq!(secret, "123456789012345678901234");
    }

    #[test]
    fn test_parse_token_rejects_bad_shapes() {
        assert!(parse_token("invalid_12345678_123456789012345678901234").is_err());
        assert!(parse_token("devdir_12345678").is_err());
        assert!(parse_token("devdir_123_123456789012345678901234").is_err());
        assert!(parse_token("devdir_12345678_123456789012345678901234_x").is_err());
    }

    #[test]
    fn test_hash_is_phc_format() {
        let generator = TokenGenerator::new();
        let token = generator.issue().unwrap();

        assert!(token.hash.starts_with("$argon2id$"));
    }
}
